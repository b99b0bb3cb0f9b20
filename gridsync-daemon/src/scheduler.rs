//! Periodic background reconciliation.
//!
//! After the warm-up delay, every tick runs [`Engine::reconcile_all`] on the
//! blocking pool. Failures are logged and never stop the loop; each project
//! that pushed records produces one [`SyncEvent`] on the broadcast channel.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use gridsync_core::{ProjectId, Settings};
use gridsync_sync::Engine;

use crate::error::DaemonError;

/// Name under which [`SyncEvent`]s are published.
pub const SYNC_COMPLETED_EVENT: &str = "background-sync-completed";

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub warmup: Duration,
}

impl SchedulerConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            interval: settings.sync_interval(),
            warmup: settings.warmup(),
        }
    }
}

/// Emitted after a background push that sent at least one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEvent {
    pub project_id: ProjectId,
    pub records_sent: usize,
    pub timestamp: DateTime<Utc>,
}

impl SyncEvent {
    pub fn name(&self) -> &'static str {
        SYNC_COMPLETED_EVENT
    }
}

pub struct Scheduler {
    engine: Arc<Engine>,
    config: SchedulerConfig,
    events: broadcast::Sender<SyncEvent>,
    shutdown_rx: broadcast::Receiver<()>,
}

/// Owner of a running scheduler loop.
pub struct SchedulerHandle {
    events: broadcast::Sender<SyncEvent>,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl Scheduler {
    /// Start the loop on the current tokio runtime.
    pub fn spawn(engine: Arc<Engine>, config: SchedulerConfig) -> SchedulerHandle {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
        let scheduler = Scheduler {
            engine,
            config,
            events: events.clone(),
            shutdown_rx,
        };
        let task = tokio::spawn(scheduler.run());
        SchedulerHandle {
            events,
            shutdown_tx,
            task,
        }
    }

    async fn run(mut self) {
        let start = Instant::now() + self.config.warmup;
        let mut interval = tokio::time::interval_at(start, self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            warmup_secs = self.config.warmup.as_secs(),
            "scheduler started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown_rx.recv() => break,
                _ = interval.tick() => self.tick().await,
            }
        }
        tracing::info!("scheduler stopped");
    }

    async fn tick(&self) {
        let engine = self.engine.clone();
        let results = match tokio::task::spawn_blocking(move || engine.reconcile_all()).await {
            Ok(Ok(results)) => results,
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "could not list projects for background sync");
                return;
            }
            Err(err) => {
                tracing::error!(error = %err, "background sync task panicked");
                return;
            }
        };

        for (project_id, result) in results {
            let Ok(outcome) = result else { continue };
            if outcome.records_sent == 0 {
                continue;
            }
            let event = SyncEvent {
                project_id,
                records_sent: outcome.records_sent,
                timestamp: Utc::now(),
            };
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
    }
}

impl SchedulerHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Stop the loop and wait for an in-flight tick to finish.
    pub async fn shutdown(self) -> Result<(), DaemonError> {
        let _ = self.shutdown_tx.send(());
        self.task.await.map_err(|err| DaemonError::Join {
            task: "scheduler",
            message: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_serializes_camel_case() {
        let event = SyncEvent {
            project_id: ProjectId::from("site"),
            records_sent: 4,
            timestamp: DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
                .expect("timestamp")
                .with_timezone(&Utc),
        };
        assert_eq!(event.name(), "background-sync-completed");
        assert_eq!(
            serde_json::to_value(&event).expect("json"),
            json!({
                "projectId": "site",
                "recordsSent": 4,
                "timestamp": "2024-05-01T12:00:00Z"
            })
        );
    }

    #[test]
    fn config_follows_settings() {
        let settings = Settings {
            sync_interval_secs: 90,
            warmup_secs: 5,
            ..Settings::default()
        };
        assert_eq!(
            SchedulerConfig::from_settings(&settings),
            SchedulerConfig {
                interval: Duration::from_secs(90),
                warmup: Duration::from_secs(5),
            }
        );
    }
}
