//! Session orchestrator - connects, spawns, waits for shutdown, tears down.
//!
//! The backend transport is not part of this tool; sessions run against the
//! in-memory `MockCarlaClient`.

use std::future::Future;
use std::time::Instant;

use actor_factory::{CarlaClient, MockCarlaClient, MockConfig, RetryPolicy, SpawnOrchestrator};
use contracts::{ObjectsDefinition, RuntimeSettings};
use tracing::{info, warn};

use super::SessionStats;
use crate::error::{CliError, Result};

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Loaded and validated objects definition
    pub definition: ObjectsDefinition,

    /// Sensors-only flag and spawn point overrides
    pub settings: RuntimeSettings,

    /// Entity spawn retry policy
    pub retry: RetryPolicy,

    /// CARLA server host
    pub host: String,

    /// CARLA server port
    pub port: u16,

    /// Mock backend behaviour
    pub backend: MockConfig,
}

/// One spawn / teardown session
pub struct Session {
    config: SessionConfig,
}

impl Session {
    /// Create a new session with the given configuration
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Run the session until `shutdown` resolves.
    ///
    /// Teardown always runs: after shutdown, after a failed spawn, and when
    /// shutdown arrives while a spawn is still being retried.
    pub async fn run<F>(self, shutdown: F) -> Result<SessionStats>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let SessionConfig {
            definition,
            settings,
            retry,
            host,
            port,
            backend,
        } = self.config;

        info!(host = %host, port, "Connecting to CARLA server...");
        let mut client = MockCarlaClient::with_config(backend);
        client
            .connect(&host, port)
            .await
            .map_err(|e| CliError::carla_connection(&host, port, e.to_string()))?;
        client
            .wait_for_services()
            .await
            .map_err(|e| CliError::carla_connection(&host, port, e.to_string()))?;
        info!("Connected to CARLA server");

        let mut orchestrator = SpawnOrchestrator::new(client, settings).with_retry_policy(retry);

        tokio::pin!(shutdown);
        let outcome = tokio::select! {
            biased;
            result = orchestrator.spawn(definition) => Some(result),
            _ = &mut shutdown => None,
        };

        let mut stats = SessionStats::default();
        let spawn_error = match outcome {
            Some(Ok(summary)) => {
                for issue in &summary.issues {
                    warn!(issue = %issue, "object skipped");
                }
                info!(
                    players = summary.players.len(),
                    global_sensors = summary.global_sensors.len(),
                    sensors = summary.sensors_spawned,
                    "All objects spawned, waiting for shutdown signal (Ctrl+C)"
                );
                stats.summary = Some(summary);
                shutdown.await;
                info!("Received shutdown signal");
                None
            }
            Some(Err(e)) => Some(e),
            None => {
                warn!("Shutdown requested while spawning, aborting");
                stats.cancelled = true;
                None
            }
        };

        stats.teardown = orchestrator.teardown().await;
        stats.metrics = orchestrator.stats().summary();
        stats.duration = start_time.elapsed();

        match spawn_error {
            Some(e) => Err(CliError::Spawn(e)),
            None => Ok(stats),
        }
    }
}
