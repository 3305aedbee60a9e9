//! Round controller: boot, the endless session loop, the core round loop,
//! the continue/end branch and the reset protocol.
//!
//! Every phase is an `async fn` awaited to completion by its parent, so
//! only one phase is ever running. Each phase yields once on entry, the
//! same way the game loop hands control back once per frame.


use tokio::task::yield_now;
use tokio::time::{MissedTickBehavior, interval, sleep};

use broadside::{
    AdKind, AlertLevel, AlertMessage, BroadsideConfig, BroadsideEvent, BroadsideMessage,
    ContinueChoice, GamePhase, Panel, RoundInfo, RulesSection, SessionOutcome, TimingSection,
};

use crate::bus::BusSender;
use crate::crew::Subsystems;
use crate::state::{PhaseWriter, Profile, SessionState, SettingsStore, StoreError};

pub struct RoundController {
    session: SessionState,
    phase: PhaseWriter,
    profile: Profile,
    crew: Subsystems,
    bus: BusSender,
    timing: TimingSection,
    rules: RulesSection,
    practice_firing: bool,
    /// Sessions that ended without a continue since the last interstitial.
    ad_tracker: u32,
    sessions: u32,
}

impl RoundController {
    /// Build the controller and load the persisted profile from `store`.
    pub fn new(
        session: SessionState,
        phase: PhaseWriter,
        store: Box<dyn SettingsStore>,
        crew: Subsystems,
        bus: BusSender,
        config: &BroadsideConfig,
    ) -> Self {
        let (profile, flushed) = Profile::load(store);
        let controller = Self {
            session,
            phase,
            profile,
            crew,
            bus,
            timing: config.timing.clone(),
            rules: config.rules.clone(),
            practice_firing: true,
            ad_tracker: 0,
            sessions: 0,
        };
        controller.report_store(flushed);
        controller
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    #[cfg(test)]
    pub fn practice_firing(&self) -> bool {
        self.practice_firing
    }

    #[cfg(test)]
    pub fn ad_tracker(&self) -> u32 {
        self.ad_tracker
    }

    /// Number of play sessions started so far.
    pub fn sessions(&self) -> u32 {
        self.sessions
    }

    /// Boot once, then play sessions until the task is dropped.
    pub async fn run(&mut self) {
        self.boot().await;
        loop {
            self.session_cycle().await;
        }
    }

    // ------------------------------------------------------------------
    // Boot
    // ------------------------------------------------------------------

    /// Start screen and, on the very first run, the how-to screen.
    pub async fn boot(&mut self) {
        yield_now().await;
        self.set_phase(GamePhase::Start);
        self.crew
            .hud
            .initialize_high_score(self.profile.high_score());

        let mut frames = interval(self.timing.frame());
        frames.set_missed_tick_behavior(MissedTickBehavior::Delay);
        while !self.crew.splash.is_finished() {
            frames.tick().await;
        }

        self.show_panel_until_click(Panel::Start).await;

        if !self.profile.tutorial_seen() {
            let saved = self.profile.mark_tutorial_seen();
            self.report_store(saved);
            self.show_panel_until_click(Panel::HowTo).await;
        }
        tracing::info!(
            "boot complete (high score {})",
            self.profile.high_score()
        );
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// One iteration of the session loop: a play session plus the settle delay.
    pub async fn session_cycle(&mut self) -> SessionOutcome {
        yield_now().await;
        let outcome = self.play_session().await;
        sleep(self.timing.settle_delay()).await;
        outcome
    }

    pub async fn play_session(&mut self) -> SessionOutcome {
        yield_now().await;
        self.sessions += 1;
        let session = self.sessions;
        self.set_phase(GamePhase::Gameplay);

        let rounds = self.core_loop().await;
        tracing::info!(
            "session {session}: core loop stopped after {rounds} round(s), score {}",
            self.session.score()
        );

        sleep(self.timing.session_pause()).await;

        let outcome = self.end_of_session().await;
        tracing::info!("session {session}: {outcome:?}");
        self.bus.send(BroadsideMessage::new(BroadsideEvent::SessionFinished {
            session,
            outcome,
        }));
        outcome
    }

    /// Play rounds until an interrupt is pending at the top of an iteration.
    /// Returns the number of rounds played. The interrupt is consumed.
    pub async fn core_loop(&mut self) -> u32 {
        yield_now().await;
        let mut round = 0;
        while !self.session.interrupt().take() {
            yield_now().await;
            round += 1;

            let info = self.round_setup(round).await;
            self.bus.send(BroadsideMessage::new(info));

            self.fire().await;
            self.crew.treasure.all_objects_cleared().await;
            self.crew.cannons.increase_difficulty();

            tracing::debug!("round {round} cleared");
            self.bus
                .send(BroadsideMessage::new(BroadsideEvent::RoundCleared(info)));
        }
        round
    }

    /// Pick the next flag color and announce it from the crow's nest.
    async fn round_setup(&mut self, round: u32) -> RoundInfo {
        yield_now().await;
        let color = self.crew.palette.switch_color(self.session.color());
        self.session.set_color(color);
        self.crew.treasure.set_materials(color);
        self.crew.hud.update_crows_nest(color).await;
        RoundInfo {
            round,
            color,
            practice: self.practice_firing,
        }
    }

    async fn fire(&mut self) {
        self.set_phase(GamePhase::Gameplay);
        if self.practice_firing {
            self.crew.cannons.practice_firing().await;
            self.practice_firing = false;
        } else {
            self.crew.cannons.firing().await;
        }
    }

    // ------------------------------------------------------------------
    // End of session
    // ------------------------------------------------------------------

    /// Offer a paid continue when the player earned one, otherwise go to
    /// the end screen.
    pub async fn end_of_session(&mut self) -> SessionOutcome {
        yield_now().await;
        if self.continue_eligible() {
            self.set_phase(GamePhase::Continue);
            self.continue_offer().await
        } else {
            if !self.crew.continue_offer.pressed_continue() {
                self.count_toward_interstitial().await;
            }
            self.set_phase(GamePhase::End);
            self.end().await
        }
    }

    fn continue_eligible(&self) -> bool {
        self.session.score() >= self.rules.continue_min_score
            && self.crew.continue_offer.is_available()
            && self.crew.ads.is_ready(AdKind::RewardedVideo)
    }

    async fn continue_offer(&mut self) -> SessionOutcome {
        yield_now().await;
        self.crew.hud.set_settings_button(false);
        let choice = self.crew.continue_offer.display().await;
        self.crew.hud.set_settings_button(true);

        tracing::info!("continue offer: {choice:?}");
        self.bus
            .send(BroadsideMessage::new(BroadsideEvent::ContinueResolved {
                choice,
            }));

        match choice {
            ContinueChoice::Accepted => {
                self.show_ad(AdKind::RewardedVideo).await;
                self.crew.treasure.disable_all_text();
                SessionOutcome::Continued
            }
            ContinueChoice::Declined => {
                self.set_phase(GamePhase::End);
                self.count_toward_interstitial().await;
                self.end().await
            }
        }
    }

    /// Interstitial pacing: every `interstitial_every` counted sessions.
    async fn count_toward_interstitial(&mut self) {
        self.ad_tracker += 1;
        if self.ad_tracker >= self.rules.interstitial_every {
            self.ad_tracker = 0;
            self.show_ad(AdKind::Video).await;
        }
    }

    async fn end(&mut self) -> SessionOutcome {
        yield_now().await;
        let score = self.session.score();
        if score > self.profile.high_score() {
            let saved = self.profile.set_high_score(score);
            self.report_store(saved);
        }
        self.crew.hud.update_high_score(self.profile.high_score());
        self.crew.hud.update_score(score);

        self.show_panel_until_click(Panel::End).await;

        let high_score = self.profile.high_score();
        self.reset();
        SessionOutcome::Ended { score, high_score }
    }

    /// Restore round-scoped state for the next session. The ad counter and
    /// persisted values are left alone.
    pub fn reset(&mut self) {
        self.session.set_score(0);
        self.practice_firing = true;
        self.crew.hud.update_score(0);
        self.crew.continue_offer.reset();
        self.crew.treasure.disable_all_text();
        self.crew.cannons.reset();
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn set_phase(&self, to: GamePhase) {
        let from = self.phase.set(to);
        if from != to {
            tracing::debug!("phase: {from} -> {to}");
            self.bus
                .send(BroadsideMessage::new(BroadsideEvent::PhaseChanged { from, to }));
        }
    }

    async fn show_panel_until_click(&self, panel: Panel) {
        self.crew.hud.set_panel(panel, true);
        self.crew.input.wait_for_click().await;
        self.crew.hud.set_panel(panel, false);
    }

    /// Show an ad if one is loaded. An unready ad completes immediately.
    async fn show_ad(&self, ad: AdKind) {
        let ready = self.crew.ads.is_ready(ad);
        if ready {
            self.crew.ads.show(ad).await;
        } else {
            tracing::debug!("ad '{ad}' not ready, skipping");
        }
        self.bus
            .send(BroadsideMessage::new(BroadsideEvent::AdShown { ad, ready }));
    }

    fn report_store(&self, result: Result<(), StoreError>) {
        if let Err(e) = result {
            tracing::warn!("settings store: {e}");
            self.bus.send(BroadsideMessage::new(AlertMessage {
                level: AlertLevel::Warn,
                message: format!("progress could not be saved: {e}"),
            }));
        }
    }
}
