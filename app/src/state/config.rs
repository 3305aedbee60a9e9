//! Configuration loading and persistence.
//!
//! Handles the TOML config file (~/.config/broadside/config.toml) with
//! `[timing]`, `[rules]`, `[store]` and `[sim]` sections.

use std::path::{Path, PathBuf};

pub use broadside::BroadsideConfig;

/// Returns `~/.config/broadside/config.toml`.
pub fn default_config_path() -> PathBuf {
    let dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("broadside");
    dir.join("config.toml")
}

/// Load persisted config from disk. If the file does not exist, creates it
/// with all-defaults and returns that.
pub fn load(path: &Path) -> BroadsideConfig {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<BroadsideConfig>(&contents) {
            Ok(mut config) => {
                tracing::info!("loaded config from {}", path.display());
                config.sim.sanitize();
                config
            }
            Err(e) => {
                tracing::warn!("failed to parse {}: {e}", path.display());
                BroadsideConfig::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let defaults = BroadsideConfig::default();
            tracing::info!("no config file found, creating {}", path.display());
            save_to(path, &defaults);
            defaults
        }
        Err(e) => {
            tracing::warn!("failed to read {}: {e}", path.display());
            BroadsideConfig::default()
        }
    }
}

/// Write config to a specific path. Creates parent dirs if needed. Never panics.
pub fn save_to(path: &Path, config: &BroadsideConfig) {
    if let Some(dir) = path.parent()
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        tracing::warn!("failed to create config dir {}: {e}", dir.display());
        return;
    }
    match toml::to_string_pretty(config) {
        Ok(contents) => {
            if let Err(e) = std::fs::write(path, contents) {
                tracing::warn!("failed to write {}: {e}", path.display());
            }
        }
        Err(e) => {
            tracing::warn!("failed to serialize config: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("broadside-config-{}-{name}", std::process::id()))
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = temp_dir("missing");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("nested").join("config.toml");

        let config = load(&path);
        assert_eq!(config, BroadsideConfig::default());
        assert!(path.exists());
        assert_eq!(load(&path), BroadsideConfig::default());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unparsable_file_falls_back_to_defaults() {
        let dir = temp_dir("broken");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[rules\ncontinue_min_score = ").unwrap();

        assert_eq!(load(&path), BroadsideConfig::default());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = temp_dir("saved");
        let path = dir.join("config.toml");
        let mut config = BroadsideConfig::default();
        config.rules.interstitial_every = 3;
        config.sim.seed = Some(42);

        save_to(&path, &config);
        assert_eq!(load(&path), config);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn loaded_sim_values_are_clamped() {
        let dir = temp_dir("clamped");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[sim]\nad_fill_pct = nan\nreaction_ms = 9223372036854775807\n").unwrap();

        let config = load(&path);
        assert_eq!(config.sim.ad_fill_pct, 80.0);
        assert_eq!(config.sim.reaction_ms, broadside::SIM_MAX_DELAY_MS);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
