//! Collaborator interfaces: everything the round controller drives but
//! does not own: splash screen, input, HUD, flag palette, treasure tracker,
//! cannons, continue menu and ads.
//!
//! Long-running operations return a `BoxFuture` that resolves when the
//! collaborator's own timeline finishes. The controller awaits each one to
//! completion before moving on.

pub mod sim;

use futures_util::future::BoxFuture;

use broadside::{AdKind, ContinueChoice, Panel};

/// Splash screen shown by the platform before the game takes over.
pub trait Splash: Send + Sync {
    /// Polled once per frame during boot.
    fn is_finished(&self) -> bool;
}

/// Click-wait primitive.
pub trait Input: Send + Sync {
    /// Resolves on the next confirming click/tap. Never times out.
    fn wait_for_click(&self) -> BoxFuture<'_, ()>;
}

/// Score, high score, message panels, settings button and crow's nest.
pub trait Hud: Send + Sync {
    fn initialize_high_score(&self, high_score: u32);
    fn update_high_score(&self, high_score: u32);
    fn update_score(&self, score: u32);
    fn set_panel(&self, panel: Panel, visible: bool);
    fn set_settings_button(&self, visible: bool);
    /// Crow's nest speech bubble announcing the round's flag color.
    fn update_crows_nest(&self, color: u32) -> BoxFuture<'_, ()>;
}

/// Flag/lantern color switcher.
pub trait Palette: Send + Sync {
    /// Pick the color for the next round given the current one.
    fn switch_color(&self, current: u32) -> u32;
}

/// Treasure chests and the bags currently in flight.
pub trait Treasure: Send + Sync {
    fn set_materials(&self, color: u32);
    /// Resolves once every transient object of the round is disabled.
    fn all_objects_cleared(&self) -> BoxFuture<'_, ()>;
    /// Hide every floating score text.
    fn disable_all_text(&self);
}

/// Cannon fire controller.
pub trait Cannons: Send + Sync {
    /// Slow tutorial volley used for the first round after a reset.
    fn practice_firing(&self) -> BoxFuture<'_, ()>;
    fn firing(&self) -> BoxFuture<'_, ()>;
    fn increase_difficulty(&self);
    fn reset(&self);
}

/// Paid continue menu.
pub trait ContinueOffer: Send + Sync {
    fn is_available(&self) -> bool;
    /// Whether the player already took a continue since the last reset.
    fn pressed_continue(&self) -> bool;
    fn display(&self) -> BoxFuture<'_, ContinueChoice>;
    fn reset(&self);
}

/// Ad network facade.
pub trait Ads: Send + Sync {
    fn is_ready(&self, ad: AdKind) -> bool;
    fn show(&self, ad: AdKind) -> BoxFuture<'_, ()>;
}

/// Every collaborator the controller needs, injected at construction.
pub struct Subsystems {
    pub splash: Box<dyn Splash>,
    pub input: Box<dyn Input>,
    pub hud: Box<dyn Hud>,
    pub palette: Box<dyn Palette>,
    pub treasure: Box<dyn Treasure>,
    pub cannons: Box<dyn Cannons>,
    pub continue_offer: Box<dyn ContinueOffer>,
    pub ads: Box<dyn Ads>,
}
