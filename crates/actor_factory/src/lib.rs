//! # Actor Factory
//!
//! CARLA actor lifecycle module.
//!
//! Responsibilities:
//! - Classify configured objects (world sensors / vehicles & walkers / ignored)
//! - Resolve spawn points (runtime override -> config -> random)
//! - Spawn vehicles and walkers with a blocking retry, then attach their sensors
//! - Record everything spawned and tear it down in reverse hierarchy order
//!
//! The backend is reached through the [`CarlaClient`] trait; [`MockCarlaClient`]
//! is an in-memory implementation for tests and dry runs.

pub mod actors;
pub mod classifier;
pub mod client;
pub mod error;
pub mod factory;
pub mod ledger;
pub mod mock_client;
pub mod retry;
pub mod sensors;
pub mod spawn_point;

pub use actors::{ActorProvisioner, ProvisionIssue, ProvisionReport, SpawnMode};
pub use classifier::{classify, Classification};
pub use client::CarlaClient;
pub use contracts::{ActorId, ObjectsDefinition, RuntimeSettings};
pub use error::{ActorFactoryError, Result};
pub use factory::{SpawnOrchestrator, SpawnSummary};
pub use ledger::{LifecycleLedger, TeardownReport};
pub use mock_client::{BackendCall, MockCarlaClient, MockConfig};
pub use retry::{Attempt, Backoff, RetryError, RetryPolicy};
pub use sensors::{SensorBatch, SensorFailurePolicy, SensorProvisioner, SensorSpawnError};
pub use spawn_point::{
    parse_override, resolve, Resolution, SpawnPointError, SpawnPointResolver, SpawnPointSource,
};
