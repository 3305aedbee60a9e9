//! Session state types: game phase, ad kinds, continue choices and the
//! read-only snapshot handed to UI-side consumers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Externally observable game phase.
///
/// Exactly one phase is active at a time. `Setting` is an overlay entered
/// from the settings menu, never by the round controller itself. `None` is
/// the value before boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Start,
    Gameplay,
    Setting,
    Continue,
    End,
    #[default]
    None,
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Gameplay => write!(f, "gameplay"),
            Self::Setting => write!(f, "setting"),
            Self::Continue => write!(f, "continue"),
            Self::End => write!(f, "end"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Ad placement. Serializes to the placement IDs used by the ad network
/// (`"rewardedVideo"`, `"video"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdKind {
    /// Paid continue.
    #[serde(rename = "rewardedVideo")]
    RewardedVideo,
    /// Skippable interstitial shown every few finished sessions.
    #[serde(rename = "video")]
    Video,
}

impl AdKind {
    pub const ALL: &[AdKind] = &[AdKind::RewardedVideo, AdKind::Video];

    pub fn placement_id(self) -> &'static str {
        match self {
            Self::RewardedVideo => "rewardedVideo",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for AdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.placement_id())
    }
}

/// What the player picked on the continue menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContinueChoice {
    Accepted,
    Declined,
}

/// Full-screen message panels toggled by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Panel {
    Start,
    HowTo,
    End,
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::HowTo => write!(f, "how-to"),
            Self::End => write!(f, "end"),
        }
    }
}

/// How a play session finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionOutcome {
    /// The player paid for a continue; score and round state carry over.
    Continued,
    /// The end screen was shown and the session state was reset.
    Ended { score: u32, high_score: u32 },
}

/// Immutable snapshot of the shared session state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: GamePhase,
    #[serde(default)]
    pub score: u32,
    /// Index of the flag color the cannons are currently firing.
    #[serde(default)]
    pub color: u32,
    #[serde(default)]
    pub settings_open: bool,
    #[serde(default)]
    pub interrupt_pending: bool,
}
