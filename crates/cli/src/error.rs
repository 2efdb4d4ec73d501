//! Error types for CLI operations.

use std::path::Path;

use actor_factory::ActorFactoryError;
use contracts::ContractError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Objects definition could not be loaded or classified
    #[error("Failed to load objects definition from {path}: {reason}")]
    ConfigLoad { path: String, reason: ContractError },

    /// CARLA connection error
    #[error("Failed to connect to CARLA server at {host}:{port}: {message}")]
    CarlaConnection {
        host: String,
        port: u16,
        message: String,
    },

    /// Spawn failed; everything already created has been destroyed
    #[error("Spawning failed: {0}")]
    Spawn(#[from] ActorFactoryError),
}

impl CliError {
    pub fn config_load(path: &Path, reason: ContractError) -> Self {
        Self::ConfigLoad {
            path: path.display().to_string(),
            reason,
        }
    }

    pub fn carla_connection(
        host: impl Into<String>,
        port: u16,
        message: impl Into<String>,
    ) -> Self {
        Self::CarlaConnection {
            host: host.into(),
            port,
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
