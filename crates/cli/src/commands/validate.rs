//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use actor_factory::{classify, Classification};
use contracts::{ObjectSpec, SpawnPointSpec};

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    object_count: usize,
    global_sensor_count: usize,
    entity_count: usize,
    attached_sensor_count: usize,
    ignored_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(file = %args.objects_definition_file.display(), "Validating objects definition");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Objects definition validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.objects_definition_file.display().to_string();
    let invalid = |config_path: String, error: String| ValidationResult {
        valid: false,
        config_path,
        error: Some(error),
        warnings: None,
        summary: None,
    };

    let definition = match config_loader::ConfigLoader::load_from_path(&args.objects_definition_file)
    {
        Ok(definition) => definition,
        Err(e) => return invalid(config_path, e.to_string()),
    };
    let object_count = definition.objects.len();

    match classify(definition.objects, args.spawn_sensors_only) {
        Ok(classification) => {
            let warnings = collect_warnings(&classification);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    object_count,
                    global_sensor_count: classification.global_sensors.len(),
                    entity_count: classification.entities.len(),
                    attached_sensor_count: classification
                        .entities
                        .iter()
                        .map(|e| e.sensors.as_ref().map_or(0, Vec::len))
                        .sum(),
                    ignored_count: classification.ignored.len(),
                }),
            }
        }
        Err(e) => invalid(config_path, e.to_string()),
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(classification: &Classification) -> Vec<String> {
    let mut warnings = Vec::new();

    for object in &classification.ignored {
        warnings.push(format!(
            "Object '{}' of type '{}' is not a vehicle, a walker or a sensor and will be ignored",
            object.id, object.object_type
        ));
    }

    for sensor in &classification.global_sensors {
        if !sensor.is_pseudo() && !has_position(sensor.spawn_point.as_ref()) {
            warnings.push(format!(
                "Sensor '{}' has no complete spawn point (x, y, z) and will not be spawned",
                sensor.sensor_name()
            ));
        }
    }

    for entity in &classification.entities {
        match &entity.sensors {
            None => warnings.push(format!(
                "'{}' has no 'sensors' field, none will be spawned",
                entity.id
            )),
            Some(sensors) => warnings.extend(duplicate_sensor_names(sensors).into_iter().map(
                |name| format!("'{}': sensor name '{}' is used more than once", entity.id, name),
            )),
        }

        if entity.spawn_point.is_some() && !has_position(entity.spawn_point.as_ref()) {
            warnings.push(format!(
                "'{}' has an incomplete spawn point, a random one will be used",
                entity.id
            ));
        }
    }

    warnings.extend(
        duplicate_sensor_names(&classification.global_sensors)
            .into_iter()
            .map(|name| format!("Global sensor name '{}' is used more than once", name)),
    );

    warnings
}

fn has_position(spawn_point: Option<&SpawnPointSpec>) -> bool {
    spawn_point.is_some_and(|sp| sp.x.is_some() && sp.y.is_some() && sp.z.is_some())
}

fn duplicate_sensor_names(sensors: &[ObjectSpec]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut duplicates = Vec::new();
    for sensor in sensors {
        let name = sensor.sensor_name();
        if !seen.insert(name.clone()) && !duplicates.contains(&name) {
            duplicates.push(name);
        }
    }
    duplicates
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Objects definition is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Objects: {}", summary.object_count);
            println!("  Global sensors: {}", summary.global_sensor_count);
            println!("  Vehicles / walkers: {}", summary.entity_count);
            println!("  Attached sensors: {}", summary.attached_sensor_count);
            println!("  Ignored: {}", summary.ignored_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Objects definition is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
