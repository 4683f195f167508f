//! Host bridge binary for xpstream.
//!
//! Reads spawn events and commands as JSON lines on stdin, answers with
//! decisions and chat lines on stdout, and keeps lifetime stats on disk.
//! Logs go to stderr so they never interleave with replies.
//!
//! # Startup Sequence
//!
//! 1. Read raw settings from `XPSTREAM_CONFIG` (default `xpstream.yaml`)
//! 2. Initialize structured logging (tracing)
//! 3. Validate settings into a config snapshot
//! 4. Build the reward service
//! 5. Restore stats from the stats file when stats are enabled
//! 6. Spawn the maintenance task
//! 7. Serve the host until it disconnects, asks to stop, or Ctrl-C
//! 8. Stop maintenance, which writes the final save

mod command;
mod directory;
mod error;
mod host;
mod protocol;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::BufReader;
use tokio::sync::Notify;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use xpstream_core::clock::SystemTimeSource;
use xpstream_core::config::ConfigSnapshot;
use xpstream_core::maintenance::{StatsSink, run_maintenance};
use xpstream_core::service::RewardService;
use xpstream_store::StatsFile;

use crate::error::EngineError;
use crate::host::Host;

/// Config file used when `XPSTREAM_CONFIG` is not set.
const DEFAULT_CONFIG_PATH: &str = "xpstream.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the config file is unreadable or the host
/// connection fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Read raw settings.
    let config_path = std::env::var("XPSTREAM_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let settings = host::load_settings(&config_path).map_err(EngineError::from)?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level)),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!(path = %config_path.display(), "xpstream-engine starting");

    // 3. Validate.
    let config = ConfigSnapshot::from_settings(&settings);
    info!(
        enabled = config.enabled(),
        range = config.range(),
        multiplier = config.multiplier(),
        stats_enabled = config.stats_enabled(),
        auto_save_secs = config.auto_save_interval().as_secs(),
        "Configuration loaded"
    );

    // 4. Build the service.
    let stats_file = Arc::new(StatsFile::new(config.stats_file()));
    let service = Arc::new(RewardService::new(
        config,
        Arc::new(SystemTimeSource::new()),
    ));

    // 5. Restore stats.
    if service.config().stats_enabled() {
        match stats_file.load_into(&service) {
            Ok(report) => info!(
                path = %stats_file.path().display(),
                loaded = report.loaded,
                skipped = report.skipped.len(),
                "Stats loaded"
            ),
            Err(e) => warn!(
                error = %e,
                path = %stats_file.path().display(),
                "Could not read stats file, starting empty"
            ),
        }
    }

    // 6. Spawn maintenance.
    let shutdown = Arc::new(Notify::new());
    let sink: Arc<dyn StatsSink> = stats_file;
    let maintenance = tokio::spawn(run_maintenance(
        Arc::clone(&service),
        sink,
        Arc::clone(&shutdown),
    ));

    // 7. Serve the host.
    let mut bridge = Host::new(Arc::clone(&service), config_path);
    let served = tokio::select! {
        result = host::run(&mut bridge, BufReader::new(tokio::io::stdin()), tokio::io::stdout()) => result,
        signal = tokio::signal::ctrl_c() => {
            info!("Interrupt received");
            signal.map_err(EngineError::from)
        }
    };

    // 8. Stop maintenance and write the final save.
    shutdown.notify_one();
    maintenance.await.map_err(|e| EngineError::Maintenance {
        message: e.to_string(),
    })?;

    served?;
    info!("xpstream-engine shutdown complete");
    Ok(())
}
