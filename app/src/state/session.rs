//! Shared session state: phase, score, flag color, settings overlay and the
//! interrupt token.
//!
//! `SessionState` is readable (and, for the score and interrupt, writable)
//! by gameplay and UI code. The phase can only be moved by the holder of the
//! `PhaseWriter`, which the round controller owns.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use broadside::{GamePhase, SessionSnapshot};

/// Shared interior state backing both `SessionState` and `PhaseWriter`.
struct SessionInner {
    phase: RwLock<PhaseSlot>,
    score: AtomicU32,
    color: AtomicU32,
    interrupt: Interrupt,
}

#[derive(Default)]
struct PhaseSlot {
    current: GamePhase,
    /// Phase to restore when the settings overlay closes.
    under_overlay: Option<GamePhase>,
}

/// Shared session state. Cheap to clone; all clones observe the same state.
#[derive(Clone)]
pub struct SessionState {
    inner: Arc<SessionInner>,
}

/// Write handle for the game phase. Only the round controller holds one.
pub struct PhaseWriter {
    inner: Arc<SessionInner>,
}

impl SessionState {
    /// Create a new session state (phase `None`) and its companion writer.
    pub fn new() -> (Self, PhaseWriter) {
        let inner = Arc::new(SessionInner {
            phase: RwLock::new(PhaseSlot::default()),
            score: AtomicU32::new(0),
            color: AtomicU32::new(0),
            interrupt: Interrupt::default(),
        });
        (
            Self {
                inner: Arc::clone(&inner),
            },
            PhaseWriter { inner },
        )
    }

    pub fn phase(&self) -> GamePhase {
        self.inner
            .phase
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .current
    }

    pub fn score(&self) -> u32 {
        self.inner.score.load(Ordering::Relaxed)
    }

    pub fn set_score(&self, score: u32) {
        self.inner.score.store(score, Ordering::Relaxed);
    }

    /// Add points, saturating at `u32::MAX`. Returns the new score.
    pub fn add_score(&self, points: u32) -> u32 {
        let prev = self
            .inner
            .score
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |s| {
                Some(s.saturating_add(points))
            })
            .unwrap_or_default();
        prev.saturating_add(points)
    }

    /// Flag color of the current round.
    pub fn color(&self) -> u32 {
        self.inner.color.load(Ordering::Relaxed)
    }

    pub(crate) fn set_color(&self, color: u32) {
        self.inner.color.store(color, Ordering::Relaxed);
    }

    pub fn interrupt(&self) -> &Interrupt {
        &self.inner.interrupt
    }

    pub fn settings_open(&self) -> bool {
        self.inner
            .phase
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .under_overlay
            .is_some()
    }

    /// Enter the `Setting` overlay. No-op if it is already open.
    pub fn open_settings(&self) {
        let mut slot = self.inner.phase.write().unwrap_or_else(|e| e.into_inner());
        if slot.under_overlay.is_none() {
            slot.under_overlay = Some(slot.current);
            slot.current = GamePhase::Setting;
        }
    }

    /// Leave the `Setting` overlay, restoring the phase that was active when
    /// it opened. If the controller moved the phase in the meantime, its
    /// phase is kept.
    pub fn close_settings(&self) {
        let mut slot = self.inner.phase.write().unwrap_or_else(|e| e.into_inner());
        if let Some(prev) = slot.under_overlay.take()
            && slot.current == GamePhase::Setting
        {
            slot.current = prev;
        }
    }

    /// Take an immutable snapshot of the shared state.
    pub fn snapshot(&self) -> SessionSnapshot {
        let slot = self.inner.phase.read().unwrap_or_else(|e| e.into_inner());
        SessionSnapshot {
            phase: slot.current,
            score: self.score(),
            color: self.color(),
            settings_open: slot.under_overlay.is_some(),
            interrupt_pending: self.inner.interrupt.is_pending(),
        }
    }
}

impl PhaseWriter {
    /// Set the phase, returning the previous one.
    pub fn set(&self, phase: GamePhase) -> GamePhase {
        let mut slot = self.inner.phase.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut slot.current, phase)
    }
}

// ---------------------------------------------------------------------------
// Interrupt
// ---------------------------------------------------------------------------

/// Single-slot request to stop the core loop after the current round.
///
/// Any number of `request()` calls before the loop consumes the slot
/// collapse into one.
#[derive(Debug, Default)]
pub struct Interrupt {
    pending: AtomicBool,
}

impl Interrupt {
    pub fn request(&self) {
        self.pending.store(true, Ordering::Release);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Consume the request. Returns whether one was pending.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }
}
