//! ActorProvisioner
//!
//! Spawn vehicles/walkers (或在 sensors-only 模式下复用已存在的 actor)，再为其挂载传感器。
//! 一次只处理一个 entity，一次只发出一个 spawn 请求。

use std::collections::HashMap;
use std::fmt;

use contracts::{ActorId, ObjectSpec, SpawnPointOverrides, SpawnRequest, UNATTACHED};
use tracing::{debug, error, info, instrument, warn};

use crate::client::CarlaClient;
use crate::error::{ActorFactoryError, Result};
use crate::ledger::LifecycleLedger;
use crate::retry::{Attempt, RetryError, RetryPolicy};
use crate::sensors::{SensorFailurePolicy, SensorProvisioner, SensorSpawnError};
use crate::spawn_point::{SpawnPointError, SpawnPointResolver};

/// Operating mode, chosen once per run
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SpawnMode {
    /// Spawn vehicles/walkers, then their sensors
    #[default]
    Normal,
    /// Vehicles/walkers already exist; only attach sensors to them.
    /// `known_actors` maps role name to backend id, looked up beforehand.
    SensorsOnly { known_actors: HashMap<String, ActorId> },
}

/// Recoverable problem reported during provisioning
#[derive(Debug, Clone, PartialEq)]
pub enum ProvisionIssue {
    /// Unknown type prefix, entry skipped
    IgnoredObject { object_type: String, id: String },
    /// A placement source was unusable; resolution fell through
    SpawnPoint { entity_id: String, error: SpawnPointError },
    /// One sensor skipped; `owner` is `None` for world sensors
    Sensor { owner: Option<String>, error: SensorSpawnError },
    /// Sensors-only mode: no backend id for this entity
    UnknownActor { entity_id: String },
}

impl fmt::Display for ProvisionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IgnoredObject { object_type, id } => {
                write!(f, "object '{id}' of type '{object_type}' ignored")
            }
            Self::SpawnPoint { entity_id, error } => write!(f, "{entity_id}: {error}"),
            Self::Sensor { owner: Some(owner), error } => write!(f, "{owner}: {error}"),
            Self::Sensor { owner: None, error } => write!(f, "{error}"),
            Self::UnknownActor { entity_id } => write!(
                f,
                "could not spawn sensors of '{entity_id}', its backend id is not known"
            ),
        }
    }
}

/// Result of `spawn_entities`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProvisionReport {
    /// Spawned vehicles/walkers, in spawn order
    pub players: Vec<ActorId>,
    /// Attached sensors spawned across all entities
    pub sensors_spawned: usize,
    /// Attempts each player needed, parallel to `players`
    pub attempts: Vec<u32>,
    pub issues: Vec<ProvisionIssue>,
}

impl ProvisionReport {
    /// Backend refusals absorbed by the retry loop
    pub fn rejections(&self) -> u64 {
        self.attempts.iter().map(|&a| u64::from(a.saturating_sub(1))).sum()
    }
}

/// Provisions vehicles/walkers and their sensors
pub struct ActorProvisioner<'a, C: CarlaClient> {
    client: &'a C,
    overrides: &'a SpawnPointOverrides,
    retry: RetryPolicy,
}

impl<'a, C: CarlaClient> ActorProvisioner<'a, C> {
    pub fn new(client: &'a C, overrides: &'a SpawnPointOverrides, retry: RetryPolicy) -> Self {
        Self {
            client,
            overrides,
            retry,
        }
    }

    /// Provision every entity in order, recording each actor in `ledger`
    /// as soon as it exists.
    ///
    /// # Errors
    /// - a backend failure while spawning an entity's sensors (`SensorSetupFailed`);
    ///   the partial sensor group is still recorded
    /// - a transport error from the spawn service
    /// - `RetryExhausted` when a bounded retry policy gives up
    #[instrument(
        name = "actor_provisioner_spawn_entities",
        skip(self, entities, mode, ledger),
        fields(count = entities.len(), sensors_only = matches!(mode, SpawnMode::SensorsOnly { .. }))
    )]
    pub async fn spawn_entities(
        &self,
        entities: &[ObjectSpec],
        mode: &SpawnMode,
        ledger: &mut LifecycleLedger,
    ) -> Result<ProvisionReport> {
        let mut report = ProvisionReport::default();

        for entity in entities {
            let parent = match mode {
                SpawnMode::Normal => {
                    let (actor_id, attempts) = self.spawn_entity(entity, &mut report).await?;
                    ledger.record_player(actor_id);
                    report.players.push(actor_id);
                    report.attempts.push(attempts);
                    actor_id
                }
                SpawnMode::SensorsOnly { known_actors } => match known_actors.get(&entity.id) {
                    Some(&actor_id) => {
                        debug!(entity_id = %entity.id, actor_id, "reusing existing actor");
                        actor_id
                    }
                    None => {
                        error!(
                            entity_id = %entity.id,
                            "could not spawn sensors, the backend id of the entity is not known"
                        );
                        report.issues.push(ProvisionIssue::UnknownActor {
                            entity_id: entity.id.clone(),
                        });
                        continue;
                    }
                },
            };

            self.spawn_attached_sensors(entity, parent, ledger, &mut report)
                .await?;
        }

        info!(
            players = report.players.len(),
            sensors = report.sensors_spawned,
            issues = report.issues.len(),
            "entities provisioned"
        );
        Ok(report)
    }

    /// Resolve the spawn point and retry until the backend accepts.
    /// Returns the actor id and the number of attempts.
    #[instrument(
        name = "actor_provisioner_spawn_entity",
        skip(self, entity, report),
        fields(entity_id = %entity.id, object_type = %entity.object_type)
    )]
    async fn spawn_entity(
        &self,
        entity: &ObjectSpec,
        report: &mut ProvisionReport,
    ) -> Result<(ActorId, u32)> {
        let resolution = SpawnPointResolver::new(self.overrides).resolve(entity);
        for error in resolution.errors {
            error!(entity_id = %entity.id, error = %error, "could not use spawn point, falling back");
            report.issues.push(ProvisionIssue::SpawnPoint {
                entity_id: entity.id.clone(),
                error,
            });
        }
        info!(source = resolution.source.as_str(), "spawn point selected");

        let request = SpawnRequest {
            object_type: entity.object_type.clone(),
            id: entity.id.clone(),
            attach_to: UNATTACHED,
            transform: resolution.spawn_point.wire_pose(),
            random_pose: resolution.spawn_point.is_random(),
            attributes: entity.attributes.clone().into_inner(),
        };

        let category = entity.category();
        let client = self.client;
        let request = &request;
        let outcome: std::result::Result<(ActorId, u32), RetryError<ActorFactoryError>> = self
            .retry
            .run(move |attempt| async move {
                observability::record_spawn_attempt(category);
                let response = match client.spawn_object(request).await {
                    Ok(response) => response,
                    Err(e) => return Err(e),
                };
                match response.actor_id() {
                    Some(actor_id) => {
                        observability::record_actor_spawned(category);
                        Ok(Attempt::Ready((actor_id, attempt)))
                    }
                    None => {
                        observability::record_spawn_rejection(category);
                        if attempt == 1 {
                            warn!(reason = %response.error_string, "spawn rejected, retrying until accepted");
                        } else {
                            debug!(attempt, reason = %response.error_string, "spawn rejected");
                        }
                        Ok(Attempt::NotYet(response.error_string))
                    }
                }
            })
            .await;

        match outcome {
            Ok((actor_id, attempts)) => {
                info!(actor_id, attempts, "entity spawned");
                Ok((actor_id, attempts))
            }
            Err(RetryError::Failed(e)) => Err(e),
            Err(RetryError::Exhausted {
                attempts,
                last_reason,
            }) => Err(ActorFactoryError::RetryExhausted {
                object_id: entity.id.clone(),
                attempts,
                message: last_reason,
            }),
        }
    }

    async fn spawn_attached_sensors(
        &self,
        entity: &ObjectSpec,
        parent: ActorId,
        ledger: &mut LifecycleLedger,
        report: &mut ProvisionReport,
    ) -> Result<()> {
        let Some(sensors) = &entity.sensors else {
            warn!(
                entity_id = %entity.id,
                "entity has no 'sensors' field in the definition, none will be spawned"
            );
            ledger.open_vehicle_sensor_group();
            return Ok(());
        };

        ledger.open_vehicle_sensor_group();
        let batch = SensorProvisioner::new(self.client)
            .spawn_sensors(
                sensors,
                parent,
                SensorFailurePolicy::StopOnBackendError,
                ledger,
            )
            .await;

        report.sensors_spawned += batch.spawned.len();

        let failure = batch.backend_error().cloned();
        report
            .issues
            .extend(batch.errors.into_iter().map(|error| ProvisionIssue::Sensor {
                owner: Some(entity.id.clone()),
                error,
            }));

        match failure {
            Some(e) => Err(ActorFactoryError::sensor_setup(&entity.id, e.to_string())),
            None => Ok(()),
        }
    }
}
