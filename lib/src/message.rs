//! Unified `BroadsideMessage` bus types.
//!
//! Everything the round controller publishes flows through a single
//! `broadcast<BroadsideMessage>` channel. Each message has a source (the
//! publisher's ID), a timestamp and a typed event. UI, ad and logging code
//! subscribe and filter.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AdKind, ContinueChoice, GamePhase, SessionOutcome};

// ---------------------------------------------------------------------------
// Top-level message
// ---------------------------------------------------------------------------

/// A single event on the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadsideMessage {
    #[serde(default)]
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub event: BroadsideEvent,
}

impl BroadsideMessage {
    /// Create a new message with the current UTC timestamp.
    pub fn new(event: impl Into<BroadsideEvent>) -> Self {
        Self {
            source: String::new(),
            timestamp: Utc::now(),
            event: event.into(),
        }
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// The typed event payload carried by a `BroadsideMessage`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BroadsideEvent {
    /// The observable game phase changed.
    PhaseChanged { from: GamePhase, to: GamePhase },
    /// A round was set up and firing is about to begin.
    RoundStarted(RoundInfo),
    /// Every object of the round was cleared and difficulty went up.
    RoundCleared(RoundInfo),
    /// An ad finished (or was skipped because none was loaded).
    AdShown { ad: AdKind, ready: bool },
    /// The player answered the continue menu.
    ContinueResolved { choice: ContinueChoice },
    /// A play session finished.
    SessionFinished { session: u32, outcome: SessionOutcome },
    /// User-visible warn/error condition.
    Alert(AlertMessage),
}

impl From<RoundInfo> for BroadsideEvent {
    fn from(info: RoundInfo) -> Self {
        BroadsideEvent::RoundStarted(info)
    }
}

impl From<AlertMessage> for BroadsideEvent {
    fn from(alert: AlertMessage) -> Self {
        BroadsideEvent::Alert(alert)
    }
}

// ---------------------------------------------------------------------------
// Round info
// ---------------------------------------------------------------------------

/// Identifies one iteration of the core loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundInfo {
    /// Round number within the current session, starting at 1.
    pub round: u32,
    pub color: u32,
    /// First round after a reset uses the practice volley.
    pub practice: bool,
}

// ---------------------------------------------------------------------------
// AlertMessage
// ---------------------------------------------------------------------------

/// Severity level for alert messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Warn,
    Error,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertLevel::Warn => write!(f, "warn"),
            AlertLevel::Error => write!(f, "error"),
        }
    }
}

/// A user-visible alert. Info/debug/trace stays in the tracing backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertMessage {
    pub level: AlertLevel,
    pub message: String,
}
