use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Persisted config types
// ---------------------------------------------------------------------------

/// Top-level persisted config. Durations are stored as plain milliseconds so
/// the TOML file stays hand-editable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BroadsideConfig {
    #[serde(default)]
    pub timing: TimingSection,
    #[serde(default)]
    pub rules: RulesSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub sim: SimSection,
}

/// Fixed pacing delays of the session loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSection {
    /// Pause between two play sessions.
    pub settle_delay_ms: u64,
    /// Pause between the end of the core loop and the end-of-session branch.
    pub session_pause_ms: u64,
    /// Frames per second used when polling the splash screen.
    pub frame_rate: u32,
}

impl TimingSection {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn session_pause(&self) -> Duration {
        Duration::from_millis(self.session_pause_ms)
    }

    /// Duration of one frame. The rate is clamped to 1..=1000 fps.
    pub fn frame(&self) -> Duration {
        Duration::from_secs(1) / self.frame_rate.clamp(1, 1000)
    }
}

impl Default for TimingSection {
    fn default() -> Self {
        Self {
            settle_delay_ms: 1,
            session_pause_ms: 1000,
            frame_rate: 60,
        }
    }
}

/// Monetization rules applied at the end of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesSection {
    /// Minimum score before a paid continue is offered.
    pub continue_min_score: u32,
    /// Show an interstitial every N finished sessions.
    pub interstitial_every: u32,
}

impl Default for RulesSection {
    fn default() -> Self {
        Self {
            continue_min_score: 100,
            interstitial_every: 2,
        }
    }
}

/// Location of the persistent settings store. `None` = user data dir.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Knobs for the simulated collaborators used by headless runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSection {
    /// RNG seed. `None` seeds from the clock.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// How long the splash screen stays up.
    pub splash_ms: u64,
    /// Average delay before the simulated player clicks.
    pub reaction_ms: u64,
    /// Number of flag colors the palette cycles through.
    pub colors: u32,
    /// Time a treasure bag spends in the air.
    pub flight_ms: u64,
    /// Base catch probability in percent, before difficulty scaling.
    pub catch_pct: f64,
    /// Percent of ad requests that have an ad loaded.
    pub ad_fill_pct: f64,
    /// Length of a simulated ad.
    pub ad_ms: u64,
    /// Percent chance the simulated player accepts a continue offer.
    pub accept_pct: f64,
    /// Percent chance the simulated player opens the settings overlay
    /// instead of clicking straight away.
    pub settings_pct: f64,
    /// How long the settings overlay stays open.
    pub settings_ms: u64,
}

impl Default for SimSection {
    fn default() -> Self {
        Self {
            seed: None,
            splash_ms: 1500,
            reaction_ms: 600,
            colors: 4,
            flight_ms: 1200,
            catch_pct: 92.0,
            ad_fill_pct: 80.0,
            ad_ms: 3000,
            accept_pct: 50.0,
            settings_pct: 5.0,
            settings_ms: 2000,
        }
    }
}

/// Upper bound for every simulated delay.
pub const SIM_MAX_DELAY_MS: u64 = 10 * 60 * 1000;

impl SimSection {
    /// Clamp hand-edited values into range: percentages to 0..=100 (NaN
    /// falls back to the default), delays to `SIM_MAX_DELAY_MS`.
    pub fn sanitize(&mut self) {
        let defaults = Self::default();
        for (pct, default) in [
            (&mut self.catch_pct, defaults.catch_pct),
            (&mut self.ad_fill_pct, defaults.ad_fill_pct),
            (&mut self.accept_pct, defaults.accept_pct),
            (&mut self.settings_pct, defaults.settings_pct),
        ] {
            *pct = if pct.is_nan() {
                default
            } else {
                (*pct).clamp(0.0, 100.0)
            };
        }
        for ms in [
            &mut self.splash_ms,
            &mut self.reaction_ms,
            &mut self.flight_ms,
            &mut self.ad_ms,
            &mut self.settings_ms,
        ] {
            *ms = (*ms).min(SIM_MAX_DELAY_MS);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let config = BroadsideConfig::default();
        assert_eq!(config.timing.settle_delay(), Duration::from_millis(1));
        assert_eq!(config.timing.session_pause(), Duration::from_secs(1));
        assert_eq!(config.rules.continue_min_score, 100);
        assert_eq!(config.rules.interstitial_every, 2);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: BroadsideConfig = toml::from_str(
            r#"
            [rules]
            continue_min_score = 250

            [sim]
            seed = 7
            "#,
        )
        .unwrap();
        assert_eq!(config.rules.continue_min_score, 250);
        assert_eq!(config.rules.interstitial_every, 2);
        assert_eq!(config.sim.seed, Some(7));
        assert_eq!(config.sim.colors, 4);
        assert_eq!(config.timing, TimingSection::default());
        assert_eq!(config.store.path, None);
    }

    #[test]
    fn toml_round_trip() {
        let mut config = BroadsideConfig::default();
        config.store.path = Some("/tmp/prefs.toml".into());
        config.timing.frame_rate = 30;
        let text = toml::to_string_pretty(&config).unwrap();
        let back: BroadsideConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn sanitize_clamps_hand_edited_sim_values() {
        let mut config: BroadsideConfig = toml::from_str(
            r#"
            [sim]
            catch_pct = nan
            ad_fill_pct = 250.0
            accept_pct = -3.0
            flight_ms = 9223372036854775807
            "#,
        )
        .unwrap();
        assert!(config.sim.catch_pct.is_nan());

        config.sim.sanitize();
        assert_eq!(config.sim.catch_pct, SimSection::default().catch_pct);
        assert_eq!(config.sim.ad_fill_pct, 100.0);
        assert_eq!(config.sim.accept_pct, 0.0);
        assert_eq!(config.sim.flight_ms, SIM_MAX_DELAY_MS);
        assert_eq!(config.sim.reaction_ms, 600);
    }

    #[test]
    fn frame_rate_is_clamped() {
        let mut timing = TimingSection {
            frame_rate: 0,
            ..TimingSection::default()
        };
        assert_eq!(timing.frame(), Duration::from_secs(1));
        timing.frame_rate = u32::MAX;
        assert_eq!(timing.frame(), Duration::from_millis(1));
    }
}
