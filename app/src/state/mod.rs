pub mod config;
mod session;
pub mod store;

pub use session::{PhaseWriter, SessionState};
pub use store::{MemoryStore, Profile, SettingsStore, StoreError, TomlStore};
