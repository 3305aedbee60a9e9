//! Simulated collaborators for headless runs.
//!
//! A seeded RNG drives a tiny stand-in for the real game: the cannons lob
//! treasure bags, each bag is caught (+10 points) or missed after its
//! flight time, and the first miss requests an interrupt so the core loop
//! stops after the round. The simulated player clicks after a short
//! reaction delay, now and then opens the settings overlay first, and
//! accepts continue offers some of the time.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use tokio::sync::watch;
use tokio::time::{Instant, sleep};

use broadside::{AdKind, ContinueChoice, Panel, SIM_MAX_DELAY_MS, SimSection};

use super::{Ads, Cannons, ContinueOffer, Hud, Input, Palette, Splash, Subsystems, Treasure};
use crate::state::SessionState;

const POINTS_PER_BAG: u32 = 10;
const PRACTICE_VOLLEY: u32 = 3;
const PRACTICE_SPACING: Duration = Duration::from_millis(800);
const CROWS_NEST_ANNOUNCE: Duration = Duration::from_millis(400);
/// Difficulty never pushes the catch chance below this.
const MIN_CATCH_PCT: f64 = 40.0;

/// Build the full simulated crew around one shared world.
pub fn crew(config: &SimSection, session: SessionState) -> Subsystems {
    let seed = config.seed.unwrap_or_else(now_seed);
    tracing::info!("sim: seed {seed}");
    let world = Arc::new(World::new(config.clone(), seed, session));
    Subsystems {
        splash: Box::new(SimSplash {
            until: Instant::now() + clamped(config.splash_ms),
        }),
        input: Box::new(SimInput(Arc::clone(&world))),
        hud: Box::new(SimHud),
        palette: Box::new(SimPalette(Arc::clone(&world))),
        treasure: Box::new(SimTreasure(Arc::clone(&world))),
        cannons: Box::new(SimCannons(Arc::clone(&world))),
        continue_offer: Box::new(SimContinue {
            world: Arc::clone(&world),
            pressed: AtomicBool::new(false),
        }),
        ads: Box::new(SimAds {
            world,
            loaded: Mutex::new(HashSet::new()),
        }),
    }
}

fn clamped(ms: u64) -> Duration {
    Duration::from_millis(ms.min(SIM_MAX_DELAY_MS))
}

fn now_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

// ---------------------------------------------------------------------------
// Shared world
// ---------------------------------------------------------------------------

struct World {
    config: SimSection,
    rng: Mutex<Pcg64>,
    session: SessionState,
    /// Bags currently in the air.
    airborne: watch::Sender<u32>,
    difficulty: AtomicU32,
}

impl World {
    fn new(config: SimSection, seed: u64, session: SessionState) -> Self {
        let (airborne, _) = watch::channel(0);
        Self {
            config,
            rng: Mutex::new(Pcg64::seed_from_u64(seed)),
            session,
            airborne,
            difficulty: AtomicU32::new(0),
        }
    }

    fn roll(&self, pct: f64) -> bool {
        if pct.is_nan() {
            return false;
        }
        let p = (pct / 100.0).clamp(0.0, 1.0);
        self.rng
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .random_bool(p)
    }

    /// `ms` +/- 50%.
    fn jitter(&self, ms: u64) -> Duration {
        let ms = ms.min(SIM_MAX_DELAY_MS);
        if ms == 0 {
            return Duration::ZERO;
        }
        let ms = self
            .rng
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .random_range(ms / 2..=ms + ms / 2);
        Duration::from_millis(ms)
    }

    fn below(&self, n: u32) -> u32 {
        self.rng
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .random_range(0..n)
    }

    fn difficulty(&self) -> u32 {
        self.difficulty.load(Ordering::Relaxed)
    }

    /// Launch one bag. It lands after the flight time; a miss asks the
    /// controller to stop after this round.
    fn launch(self: &Arc<Self>, practice: bool) {
        self.airborne.send_modify(|n| *n += 1);
        let world = Arc::clone(self);
        tokio::spawn(async move {
            sleep(world.jitter(world.config.flight_ms)).await;
            let base = world.config.catch_pct;
            let catch_pct =
                (base - 2.0 * world.difficulty() as f64).max(base.min(MIN_CATCH_PCT));
            if practice || world.roll(catch_pct) {
                let score = world.session.add_score(POINTS_PER_BAG);
                tracing::debug!("sim: bag caught, score {score}");
            } else {
                tracing::info!("sim: bag missed, requesting interrupt");
                world.session.interrupt().request();
            }
            world.airborne.send_modify(|n| *n = n.saturating_sub(1));
        });
    }
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

struct SimSplash {
    until: Instant,
}

impl Splash for SimSplash {
    fn is_finished(&self) -> bool {
        Instant::now() >= self.until
    }
}

struct SimInput(Arc<World>);

impl SimInput {
    /// Open the settings overlay, leave it up for a while and close it.
    async fn browse_settings(&self) {
        let session = &self.0.session;
        if session.settings_open() {
            return;
        }
        let under = session.phase();
        session.open_settings();
        tracing::info!("sim: settings opened over {under}");
        sleep(clamped(self.0.config.settings_ms)).await;
        session.close_settings();
        tracing::info!("sim: settings closed, back to {}", session.phase());
    }
}

impl Input for SimInput {
    fn wait_for_click(&self) -> BoxFuture<'_, ()> {
        async move {
            if self.0.roll(self.0.config.settings_pct) {
                self.browse_settings().await;
            }
            sleep(self.0.jitter(self.0.config.reaction_ms)).await;
            tracing::debug!("sim: click");
        }
        .boxed()
    }
}

struct SimHud;

impl Hud for SimHud {
    fn initialize_high_score(&self, high_score: u32) {
        tracing::info!("hud: high score {high_score}");
    }

    fn update_high_score(&self, high_score: u32) {
        tracing::info!("hud: high score {high_score}");
    }

    fn update_score(&self, score: u32) {
        tracing::info!("hud: score {score}");
    }

    fn set_panel(&self, panel: Panel, visible: bool) {
        let verb = if visible { "show" } else { "hide" };
        tracing::info!("hud: {verb} {panel} message");
    }

    fn set_settings_button(&self, visible: bool) {
        tracing::debug!("hud: settings button visible={visible}");
    }

    fn update_crows_nest(&self, color: u32) -> BoxFuture<'_, ()> {
        async move {
            tracing::info!("hud: crow's nest calls flag color {color}");
            sleep(CROWS_NEST_ANNOUNCE).await;
        }
        .boxed()
    }
}

struct SimPalette(Arc<World>);

impl Palette for SimPalette {
    /// Random color different from the current one.
    fn switch_color(&self, current: u32) -> u32 {
        let colors = self.0.config.colors;
        if colors <= 1 {
            return 0;
        }
        (current + 1 + self.0.below(colors - 1)) % colors
    }
}

struct SimTreasure(Arc<World>);

impl Treasure for SimTreasure {
    fn set_materials(&self, color: u32) {
        tracing::debug!("sim: chests painted color {color}");
    }

    fn all_objects_cleared(&self) -> BoxFuture<'_, ()> {
        let mut airborne = self.0.airborne.subscribe();
        async move {
            let _ = airborne.wait_for(|n| *n == 0).await;
        }
        .boxed()
    }

    fn disable_all_text(&self) {
        tracing::debug!("sim: score texts cleared");
    }
}

struct SimCannons(Arc<World>);

impl SimCannons {
    async fn volley(&self, bags: u32, spacing: Duration, practice: bool) {
        for i in 0..bags {
            if i > 0 {
                sleep(spacing).await;
            }
            self.0.launch(practice);
        }
    }
}

impl Cannons for SimCannons {
    fn practice_firing(&self) -> BoxFuture<'_, ()> {
        async move {
            tracing::info!("sim: practice volley");
            self.volley(PRACTICE_VOLLEY, PRACTICE_SPACING, true).await;
        }
        .boxed()
    }

    fn firing(&self) -> BoxFuture<'_, ()> {
        async move {
            let difficulty = self.0.difficulty();
            let bags = 3 + difficulty;
            let spacing_ms = 600u64.saturating_sub(40 * difficulty as u64).max(150);
            let spacing = Duration::from_millis(spacing_ms);
            tracing::info!("sim: volley of {bags} bags (difficulty {difficulty})");
            self.volley(bags, spacing, false).await;
        }
        .boxed()
    }

    fn increase_difficulty(&self) {
        self.0.difficulty.fetch_add(1, Ordering::Relaxed);
    }

    fn reset(&self) {
        self.0.difficulty.store(0, Ordering::Relaxed);
    }
}

struct SimContinue {
    world: Arc<World>,
    pressed: AtomicBool,
}

impl ContinueOffer for SimContinue {
    /// One continue per game.
    fn is_available(&self) -> bool {
        !self.pressed.load(Ordering::Relaxed)
    }

    fn pressed_continue(&self) -> bool {
        self.pressed.load(Ordering::Relaxed)
    }

    fn display(&self) -> BoxFuture<'_, ContinueChoice> {
        async move {
            let think_ms = self.world.config.reaction_ms.saturating_mul(2);
            sleep(self.world.jitter(think_ms)).await;
            if self.world.roll(self.world.config.accept_pct) {
                self.pressed.store(true, Ordering::Relaxed);
                ContinueChoice::Accepted
            } else {
                ContinueChoice::Declined
            }
        }
        .boxed()
    }

    fn reset(&self) {
        self.pressed.store(false, Ordering::Relaxed);
    }
}

/// A placement without an ad requests one on every query. A filled
/// placement stays loaded until the ad is shown.
struct SimAds {
    world: Arc<World>,
    loaded: Mutex<HashSet<AdKind>>,
}

impl Ads for SimAds {
    fn is_ready(&self, ad: AdKind) -> bool {
        let mut loaded = self.loaded.lock().unwrap_or_else(|e| e.into_inner());
        if loaded.contains(&ad) {
            return true;
        }
        let filled = self.world.roll(self.world.config.ad_fill_pct);
        if filled {
            loaded.insert(ad);
        } else {
            tracing::debug!("ads: no fill for '{ad}'");
        }
        filled
    }

    fn show(&self, ad: AdKind) -> BoxFuture<'_, ()> {
        async move {
            tracing::info!("ads: showing '{ad}'");
            sleep(clamped(self.world.config.ad_ms)).await;
            self.loaded
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&ad);
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use broadside::GamePhase;

    fn sim(config: SimSection) -> (Subsystems, SessionState) {
        let (session, _writer) = SessionState::new();
        (crew(&config, session.clone()), session)
    }

    fn seeded() -> SimSection {
        SimSection {
            seed: Some(7),
            ..SimSection::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn practice_volley_is_always_caught() {
        let (crew, session) = sim(SimSection {
            catch_pct: 0.0,
            ..seeded()
        });
        crew.cannons.practice_firing().await;
        crew.treasure.all_objects_cleared().await;
        assert_eq!(session.score(), PRACTICE_VOLLEY * POINTS_PER_BAG);
        assert!(!session.interrupt().is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn missed_bag_requests_interrupt() {
        let (crew, session) = sim(SimSection {
            catch_pct: 0.0,
            ..seeded()
        });
        crew.cannons.firing().await;
        crew.treasure.all_objects_cleared().await;
        assert!(session.interrupt().take());
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn palette_never_repeats_a_color() {
        let (crew, _session) = sim(seeded());
        let mut color = 0;
        for _ in 0..50 {
            let next = crew.palette.switch_color(color);
            assert_ne!(next, color);
            assert!(next < 4);
            color = next;
        }
    }

    #[test]
    fn ad_fill_is_sticky_until_shown() {
        let (crew, _session) = sim(SimSection {
            ad_fill_pct: 100.0,
            ..seeded()
        });
        assert!(crew.ads.is_ready(AdKind::Video));
        assert!(crew.ads.is_ready(AdKind::Video));

        let (crew, _session) = sim(SimSection {
            ad_fill_pct: 0.0,
            ..seeded()
        });
        assert!(!crew.ads.is_ready(AdKind::RewardedVideo));
    }

    #[tokio::test(start_paused = true)]
    async fn placement_refills_after_no_fill() {
        let (crew, _session) = sim(SimSection {
            ad_fill_pct: 50.0,
            seed: Some(1),
            ..SimSection::default()
        });
        let mut answers = Vec::new();
        for _ in 0..200 {
            let ready = crew.ads.is_ready(AdKind::RewardedVideo);
            if ready {
                crew.ads.show(AdKind::RewardedVideo).await;
            }
            answers.push(ready);
        }
        let first_miss = answers.iter().position(|ready| !ready);
        let first_miss = first_miss.expect("half of the requests go unfilled");
        assert!(answers[first_miss..].iter().any(|ready| *ready));
    }

    #[tokio::test(start_paused = true)]
    async fn player_opens_settings_while_a_panel_waits() {
        let (session, writer) = SessionState::new();
        writer.set(GamePhase::End);
        let crew = crew(
            &SimSection {
                settings_pct: 100.0,
                ..seeded()
            },
            session.clone(),
        );
        let click = tokio::spawn(async move { crew.input.wait_for_click().await });

        sleep(Duration::from_millis(10)).await;
        assert_eq!(session.phase(), GamePhase::Setting);
        assert!(session.settings_open());

        click.await.unwrap();
        assert_eq!(session.phase(), GamePhase::End);
        assert!(!session.settings_open());
    }

    #[test]
    fn extreme_values_do_not_panic() {
        let (session, _writer) = SessionState::new();
        let world = World::new(
            SimSection {
                reaction_ms: u64::MAX,
                ..seeded()
            },
            3,
            session,
        );
        assert!(!world.roll(f64::NAN));
        let limit = Duration::from_millis(SIM_MAX_DELAY_MS);
        assert_eq!(clamped(u64::MAX), limit);
        assert!(world.jitter(u64::MAX) <= limit * 3 / 2);
    }

    #[tokio::test(start_paused = true)]
    async fn accepted_continue_is_one_per_game() {
        let (crew, _session) = sim(SimSection {
            accept_pct: 100.0,
            ..seeded()
        });
        assert!(crew.continue_offer.is_available());
        assert_eq!(crew.continue_offer.display().await, ContinueChoice::Accepted);
        assert!(crew.continue_offer.pressed_continue());
        assert!(!crew.continue_offer.is_available());
        crew.continue_offer.reset();
        assert!(crew.continue_offer.is_available());
    }
}
