use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod bus;
mod controller;
mod crew;
mod state;

use broadside::{AlertLevel, BroadsideEvent};
use bus::PollError;
use controller::RoundController;
use state::{MemoryStore, SessionState, SettingsStore, TomlStore};

/// Store path that keeps the profile in memory only.
const MEMORY_STORE: &str = ":memory:";

#[derive(Parser, Debug, Clone)]
#[command(name = "broadside", about = "Headless round controller for Broadside")]
struct Config {
    /// Config file path (default: ~/.config/broadside/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Settings store path, or ":memory:" for a throwaway profile
    #[arg(long)]
    store: Option<String>,

    /// Seed for the simulated crew (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// Delete the stored high score and tutorial flag before starting
    #[arg(long)]
    reset_profile: bool,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new("broadside=info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::debug!("debug logging enabled");

    let cli = Config::parse();

    // Load (or create) config file
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(state::config::default_config_path);
    let mut config = state::config::load(&config_path);
    if let Some(seed) = cli.seed {
        config.sim.seed = Some(seed);
    }

    let store = open_store(&cli, config.store.path.as_deref())?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let bus = bus::channel("controller");

        // Log everything published on the bus
        let mut log_rx = bus.subscribe();
        let log_handle = tokio::spawn(async move {
            loop {
                match log_rx.recv().await {
                    Ok(msg) => log_event(&msg.source, &msg.event),
                    Err(PollError::Closed) => break,
                }
            }
        });

        let (session, phase) = SessionState::new();
        let crew = crew::sim::crew(&config.sim, session.clone());
        let mut controller = RoundController::new(session, phase, store, crew, bus, &config);

        tokio::select! {
            _ = controller.run() => {}
            signal = tokio::signal::ctrl_c() => signal?,
        }

        tracing::info!("shutting down...");
        tracing::info!(
            "played {} session(s), high score {}, final state {}",
            controller.sessions(),
            controller.profile().high_score(),
            serde_json::to_string(&controller.session().snapshot())?
        );
        drop(controller);
        log_handle.abort();
        Ok::<_, anyhow::Error>(())
    })
}

fn open_store(cli: &Config, configured: Option<&str>) -> anyhow::Result<Box<dyn SettingsStore>> {
    let path = match cli.store.as_deref().or(configured) {
        Some(MEMORY_STORE) => {
            tracing::info!("using in-memory settings store");
            return Ok(Box::new(MemoryStore::new()));
        }
        Some(path) => PathBuf::from(path),
        None => state::store::default_store_path(),
    };
    if cli.reset_profile {
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::info!("removed profile at {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => anyhow::bail!("failed to reset profile at {}: {e}", path.display()),
        }
    }
    let store = TomlStore::open(path);
    tracing::info!("settings store: {}", store.path().display());
    Ok(Box::new(store))
}

fn log_event(source: &str, event: &BroadsideEvent) {
    match event {
        BroadsideEvent::Alert(alert) => match alert.level {
            AlertLevel::Warn => tracing::warn!("[{source}] {}", alert.message),
            AlertLevel::Error => tracing::error!("[{source}] {}", alert.message),
        },
        BroadsideEvent::SessionFinished { session, outcome } => {
            tracing::info!("[{source}] session {session} finished: {outcome:?}");
        }
        other => tracing::debug!("[{source}] {other:?}"),
    }
}
