//! Persistent settings store and the player profile built on top of it.
//!
//! The store is an opaque durable key-value map of integers. `TomlStore`
//! keeps it as a flat TOML table (`~/.local/share/broadside/prefs.toml`).

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Store key for the best score.
pub const HIGH_SCORE_KEY: &str = "highscore";
/// Store key whose presence means the how-to screen was already shown.
pub const TUTORIAL_KEY: &str = "tutorial";

// ---------------------------------------------------------------------------
// Store contract
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Serialize(toml::ser::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Serialize(e) => write!(f, "serialize error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Durable integer key-value store. `set` may buffer; `flush` persists.
pub trait SettingsStore: Send + Sync {
    /// Value for `key`, or 0 when the key was never written.
    fn get(&self, key: &str) -> i64;
    fn set(&mut self, key: &str, value: i64);
    fn has(&self, key: &str) -> bool;
    fn flush(&mut self) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Non-durable store. Used by tests and `--store :memory:`.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: BTreeMap<String, i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with(mut self, key: &str, value: i64) -> Self {
        self.values.insert(key.into(), value);
        self
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> i64 {
        self.values.get(key).copied().unwrap_or(0)
    }

    fn set(&mut self, key: &str, value: i64) {
        self.values.insert(key.into(), value);
    }

    fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TomlStore
// ---------------------------------------------------------------------------

/// Returns `~/.local/share/broadside/prefs.toml` (platform data dir).
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("broadside")
        .join("prefs.toml")
}

/// File-backed store. Reads the whole table on open; `flush` rewrites it.
pub struct TomlStore {
    path: PathBuf,
    values: BTreeMap<String, i64>,
    dirty: bool,
}

impl TomlStore {
    /// Open the store at `path`. A missing or unreadable file starts empty
    /// (logged, never fatal).
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<BTreeMap<String, i64>>(&contents) {
                Ok(values) => {
                    tracing::info!("loaded settings store from {}", path.display());
                    values
                }
                Err(e) => {
                    tracing::warn!("failed to parse {}: {e}", path.display());
                    back_up(&path);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no settings store at {}, starting fresh", path.display());
                BTreeMap::new()
            }
            Err(e) => {
                tracing::warn!("failed to read {}: {e}", path.display());
                BTreeMap::new()
            }
        };
        Self {
            path,
            values,
            dirty: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Path an unreadable store file is moved to: `prefs.toml` -> `prefs.toml.bak`.
fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Move an unparsable store file aside so the next flush cannot clobber it.
fn back_up(path: &Path) {
    let backup = backup_path(path);
    match std::fs::rename(path, &backup) {
        Ok(()) => tracing::warn!("moved unreadable settings to {}", backup.display()),
        Err(e) => tracing::warn!("failed to back up {}: {e}", path.display()),
    }
}

impl SettingsStore for TomlStore {
    fn get(&self, key: &str) -> i64 {
        self.values.get(key).copied().unwrap_or(0)
    }

    fn set(&mut self, key: &str, value: i64) {
        if self.values.insert(key.into(), value) != Some(value) {
            self.dirty = true;
        }
    }

    fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(StoreError::Io)?;
        }
        let contents = toml::to_string(&self.values).map_err(StoreError::Serialize)?;
        std::fs::write(&self.path, contents).map_err(StoreError::Io)?;
        self.dirty = false;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Persisted player values with explicit load/save points.
///
/// Reads come from the cached fields; every mutation writes through to the
/// store and flushes.
pub struct Profile {
    store: Box<dyn SettingsStore>,
    high_score: u32,
    tutorial_seen: bool,
}

impl Profile {
    /// Load the profile. A missing high score key is initialized to 0 and
    /// flushed so later reads see a stored value.
    pub fn load(mut store: Box<dyn SettingsStore>) -> (Self, Result<(), StoreError>) {
        let mut flushed = Ok(());
        if !store.has(HIGH_SCORE_KEY) {
            let current = store.get(HIGH_SCORE_KEY);
            store.set(HIGH_SCORE_KEY, current);
            flushed = store.flush();
        }
        let high_score = u32::try_from(store.get(HIGH_SCORE_KEY).max(0)).unwrap_or(u32::MAX);
        let tutorial_seen = store.has(TUTORIAL_KEY);
        (
            Self {
                store,
                high_score,
                tutorial_seen,
            },
            flushed,
        )
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    /// Overwrite the stored high score unconditionally.
    pub fn set_high_score(&mut self, value: u32) -> Result<(), StoreError> {
        self.high_score = value;
        self.store.set(HIGH_SCORE_KEY, i64::from(value));
        self.store.flush()
    }

    /// Whether the how-to screen was shown on any earlier run.
    pub fn tutorial_seen(&self) -> bool {
        self.tutorial_seen
    }

    pub fn mark_tutorial_seen(&mut self) -> Result<(), StoreError> {
        self.tutorial_seen = true;
        self.store.set(TUTORIAL_KEY, 1);
        self.store.flush()
    }

    #[cfg(test)]
    pub fn store(&self) -> &dyn SettingsStore {
        self.store.as_ref()
    }
}
