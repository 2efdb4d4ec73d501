//! SensorProvisioner
//!
//! 逐个 spawn 一批传感器 (全局或挂载到某个 vehicle/walker)，单个传感器失败不影响其他传感器。

use std::collections::HashSet;

use contracts::{ActorId, ObjectCategory, ObjectSpec, Pose, SpawnRequest, SpawnedActor, UNATTACHED};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::client::CarlaClient;
use crate::ledger::LifecycleLedger;

/// Per-sensor failure; never aborts the batch by itself
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SensorSpawnError {
    #[error("sensor name '{name}' is only allowed to be used once per batch")]
    DuplicateName { name: String },

    #[error("sensor '{name}' will not be spawned, the mandatory attribute '{field}' is missing")]
    MissingField { name: String, field: String },

    #[error("sensor '{name}' rejected by the backend: {message}")]
    Rejected { name: String, message: String },

    #[error("sensor '{name}' could not be spawned: {message}")]
    Service { name: String, message: String },
}

impl SensorSpawnError {
    /// Configuration problem of this one sensor (as opposed to a backend failure)
    pub fn is_field_error(&self) -> bool {
        matches!(self, Self::DuplicateName { .. } | Self::MissingField { .. })
    }

    /// `type/id` of the failed sensor
    pub fn name(&self) -> &str {
        match self {
            Self::DuplicateName { name }
            | Self::MissingField { name, .. }
            | Self::Rejected { name, .. }
            | Self::Service { name, .. } => name,
        }
    }
}

/// What to do after a backend failure inside a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorFailurePolicy {
    /// Skip the sensor and keep going (global sensors)
    #[default]
    Continue,
    /// Stop the batch; the caller escalates (sensors of a vehicle/walker)
    StopOnBackendError,
}

/// Result of one batch: successes in input order plus per-sensor errors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorBatch {
    pub spawned: Vec<SpawnedActor>,
    pub errors: Vec<SensorSpawnError>,
}

impl SensorBatch {
    pub fn actor_ids(&self) -> Vec<ActorId> {
        self.spawned.iter().map(|a| a.actor_id).collect()
    }

    /// First backend failure, if the batch hit one
    pub fn backend_error(&self) -> Option<&SensorSpawnError> {
        self.errors.iter().find(|e| !e.is_field_error())
    }
}

/// Spawns sensors one at a time through a backend client
pub struct SensorProvisioner<'a, C: CarlaClient> {
    client: &'a C,
}

impl<'a, C: CarlaClient> SensorProvisioner<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Spawn `specs` in order, attached to `attach_to` (`UNATTACHED` for world sensors).
    ///
    /// Names (`type/id`) must be unique within the batch. A world sensor that
    /// is not a pseudo sensor needs a spawn point with x, y and z; everything
    /// else defaults to the zero pose. Sensors never ask for random placement.
    ///
    /// Each sensor is recorded in `ledger` as soon as the backend returns its
    /// id: world sensors as global sensors, attached ones into the current
    /// vehicle sensor group. Dropping the future mid-batch leaves nothing
    /// unrecorded.
    #[instrument(
        name = "sensor_provisioner_spawn_sensors",
        skip(self, specs, ledger),
        fields(count = specs.len(), attach_to)
    )]
    pub async fn spawn_sensors(
        &self,
        specs: &[ObjectSpec],
        attach_to: ActorId,
        policy: SensorFailurePolicy,
        ledger: &mut LifecycleLedger,
    ) -> SensorBatch {
        let mut batch = SensorBatch::default();
        let mut names = HashSet::new();

        for spec in specs {
            match self.spawn_sensor(spec, attach_to, &mut names).await {
                Ok(actor) => {
                    info!(
                        sensor = %spec.sensor_name(),
                        actor_id = actor.actor_id,
                        "sensor spawned"
                    );
                    if attach_to == UNATTACHED {
                        ledger.record_global_sensor(actor.actor_id);
                    } else {
                        ledger.record_vehicle_sensor(actor.actor_id);
                    }
                    batch.spawned.push(actor);
                }
                Err(e) => {
                    warn!(error = %e, "sensor will not be spawned");
                    let stop = policy == SensorFailurePolicy::StopOnBackendError
                        && !e.is_field_error();
                    batch.errors.push(e);
                    if stop {
                        debug!("stopping sensor batch after backend failure");
                        break;
                    }
                }
            }
        }

        batch
    }

    async fn spawn_sensor(
        &self,
        spec: &ObjectSpec,
        attach_to: ActorId,
        names: &mut HashSet<String>,
    ) -> Result<SpawnedActor, SensorSpawnError> {
        let name = spec.sensor_name();
        // 名字先占用，即使后面的位姿检查失败
        if !names.insert(name.clone()) {
            return Err(SensorSpawnError::DuplicateName { name });
        }

        let transform = sensor_pose(spec, attach_to, &name)?;

        let request = SpawnRequest {
            object_type: spec.object_type.clone(),
            id: spec.id.clone(),
            attach_to,
            transform,
            random_pose: false,
            attributes: spec.attributes.clone().into_inner(),
        };

        observability::record_spawn_attempt(ObjectCategory::Sensor);
        let response = self
            .client
            .spawn_object(&request)
            .await
            .map_err(|e| SensorSpawnError::Service {
                name: name.clone(),
                message: e.to_string(),
            })?;

        match response.actor_id() {
            Some(actor_id) => {
                observability::record_actor_spawned(ObjectCategory::Sensor);
                Ok(SpawnedActor {
                    actor_id,
                    object_type: spec.object_type.clone(),
                    role_name: spec.id.clone(),
                    parent: (attach_to != UNATTACHED).then_some(attach_to),
                })
            }
            None => {
                observability::record_spawn_rejection(ObjectCategory::Sensor);
                Err(SensorSpawnError::Rejected {
                    name,
                    message: response.error_string,
                })
            }
        }
    }
}

/// Mount pose of one sensor
fn sensor_pose(spec: &ObjectSpec, attach_to: ActorId, name: &str) -> Result<Pose, SensorSpawnError> {
    let strict = attach_to == UNATTACHED && !spec.is_pseudo();

    match (&spec.spawn_point, strict) {
        (Some(spawn_point), true) => {
            spawn_point
                .to_pose_strict(name)
                .map_err(|e| match e {
                    contracts::ContractError::MissingField { field, .. } => {
                        SensorSpawnError::MissingField {
                            name: name.to_string(),
                            field,
                        }
                    }
                    other => SensorSpawnError::MissingField {
                        name: name.to_string(),
                        field: other.to_string(),
                    },
                })
        }
        (Some(spawn_point), false) => Ok(spawn_point.to_pose_lenient()),
        (None, true) => Err(SensorSpawnError::MissingField {
            name: name.to_string(),
            field: "spawn_point".to_string(),
        }),
        (None, false) => Ok(Pose::ZERO),
    }
}
