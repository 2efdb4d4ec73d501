//! Actor Factory error types

use contracts::ContractError;
use thiserror::Error;

/// Actor Factory specific error
#[derive(Debug, Error)]
pub enum ActorFactoryError {
    /// A backend service call could not be completed
    #[error("service '{service}' unavailable: {message}")]
    ServiceUnavailable { service: String, message: String },

    /// Sensor setup of a vehicle/walker failed on the backend side
    #[error("setting up sensors of '{entity_id}' failed: {message}")]
    SensorSetupFailed { entity_id: String, message: String },

    /// Bounded retry policy gave up
    #[error("gave up spawning '{object_id}' after {attempts} attempts: {message}")]
    RetryExhausted {
        object_id: String,
        attempts: u32,
        message: String,
    },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl ActorFactoryError {
    /// Create service unavailable error
    pub fn service_unavailable(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Create sensor setup error
    pub fn sensor_setup(entity_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SensorSetupFailed {
            entity_id: entity_id.into(),
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, ActorFactoryError>;
