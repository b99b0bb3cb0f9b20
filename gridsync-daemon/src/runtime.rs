use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;

use gridsync_core::settings::{self, LogFormat};
use gridsync_core::Settings;
use gridsync_sync::Engine;

use crate::error::{io_err, DaemonError};
use crate::scheduler::{Scheduler, SchedulerConfig, SYNC_COMPLETED_EVENT};

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(home: &Path) -> Result<(), DaemonError> {
    let settings = settings::load_at(home)?;
    init_tracing(&settings);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf()))
}

/// Run the scheduler until ctrl-c.
pub async fn run(home: PathBuf) -> Result<(), DaemonError> {
    let engine = Arc::new(Engine::open_at(&home)?);
    let config = SchedulerConfig::from_settings(engine.settings());
    let scheduler = Scheduler::spawn(engine, config);
    let mut events = scheduler.subscribe();
    tracing::info!(home = %home.display(), "daemon started");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            signal = &mut ctrl_c => {
                signal.map_err(|err| DaemonError::Signal(err.to_string()))?;
                tracing::info!("received ctrl-c, shutting down daemon");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => {
                    let payload = serde_json::to_string(&event)?;
                    tracing::info!(event = SYNC_COMPLETED_EVENT, %payload, "background sync completed");
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "sync events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    scheduler.shutdown().await
}

/// Install the global subscriber. `RUST_LOG` wins over the settings level;
/// a second call is a no-op.
pub fn init_tracing(settings: &Settings) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = match settings.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
}
