//! Partition of configuration entries by type prefix.

use contracts::{ContractError, ObjectCategory, ObjectSpec, ACTOR_LIST_SENSOR_TYPE};
use tracing::{debug, warn};

/// Classified configuration entries
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// World-anchored sensors, in configuration order
    pub global_sensors: Vec<ObjectSpec>,
    /// Vehicles and walkers, in configuration order
    pub entities: Vec<ObjectSpec>,
    /// Entries with an unknown type prefix
    pub ignored: Vec<ObjectSpec>,
    /// Only set in sensors-only mode
    pub found_actor_list_sensor: bool,
}

/// Partition `entries` into global sensors, entities and ignored entries.
///
/// # Errors
/// `ConfigValidation` when `sensors_only` is set but no
/// `sensor.pseudo.actor_list` entry exists: already spawned actors can only
/// be discovered through that sensor.
pub fn classify(
    entries: Vec<ObjectSpec>,
    sensors_only: bool,
) -> Result<Classification, ContractError> {
    let mut classification = Classification::default();

    for entry in entries {
        match entry.category() {
            ObjectCategory::Sensor => {
                if entry.is_actor_list_sensor() && sensors_only {
                    classification.found_actor_list_sensor = true;
                }
                debug!(object_type = %entry.object_type, id = %entry.id, "global sensor");
                classification.global_sensors.push(entry);
            }
            ObjectCategory::Vehicle | ObjectCategory::Walker => {
                debug!(object_type = %entry.object_type, id = %entry.id, "entity");
                classification.entities.push(entry);
            }
            ObjectCategory::Unknown => {
                warn!(
                    object_type = %entry.object_type,
                    id = %entry.id,
                    "object is not a vehicle, a walker or a sensor, ignoring"
                );
                classification.ignored.push(entry);
            }
        }
    }

    if sensors_only && !classification.found_actor_list_sensor {
        return Err(ContractError::config_validation(
            "spawn_sensors_only",
            format!(
                "sensors-only mode is enabled, but '{ACTOR_LIST_SENSOR_TYPE}' is not instantiated, add it to your config file"
            ),
        ));
    }

    Ok(classification)
}
