//! Session statistics.

use std::time::Duration;

use actor_factory::{SpawnSummary, TeardownReport};
use observability::MetricsSummary;

/// Statistics from one session
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Spawn result, `None` when shutdown arrived first
    pub summary: Option<SpawnSummary>,

    /// Shutdown arrived while spawning
    pub cancelled: bool,

    /// Final teardown
    pub teardown: TeardownReport,

    /// Aggregated spawn / destroy counters
    pub metrics: MetricsSummary,

    /// Total duration of the session
    pub duration: Duration,
}

impl SessionStats {
    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== CARLA Spawner Session ===\n");
        println!("Duration: {:.2}s", self.duration.as_secs_f64());
        if self.cancelled {
            println!("Spawn was interrupted by shutdown");
        }

        if let Some(ref summary) = self.summary {
            println!("Players: {:?}", summary.players);
            println!("Global sensors: {:?}", summary.global_sensors);
            println!("Attached sensors: {}", summary.sensors_spawned);
            if !summary.issues.is_empty() {
                println!("\nIssues ({}):", summary.issues.len());
                for issue in &summary.issues {
                    println!("  - {}", issue);
                }
            }
        }

        println!("\n{}", self.metrics);

        if !self.teardown.failed.is_empty() {
            println!("Actors that could not be destroyed:");
            for (actor_id, error) in &self.teardown.failed {
                println!("  - {}: {}", actor_id, error);
            }
            println!();
        }
    }
}
