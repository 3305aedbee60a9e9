mod config;
mod game_state;
mod message;

pub use config::*;
pub use game_state::*;
pub use message::*;
