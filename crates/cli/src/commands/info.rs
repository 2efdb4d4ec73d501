//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{ObjectSpec, ObjectsDefinition, SpawnPointSpec};

use crate::cli::InfoArgs;

/// Objects tree for JSON output
#[derive(Serialize)]
struct DefinitionInfo {
    global_sensors: Vec<ObjectInfo>,
    entities: Vec<EntityInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    ignored: Vec<ObjectInfo>,
}

#[derive(Serialize)]
struct ObjectInfo {
    id: String,
    #[serde(rename = "type")]
    object_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    spawn_point: Option<SpawnPointSpec>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    attributes: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct EntityInfo {
    #[serde(flatten)]
    object: ObjectInfo,
    /// `None` when the entry has no `sensors` field at all
    sensors: Option<Vec<ObjectInfo>>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let path = &args.objects_definition_file;
    info!(file = %path.display(), "Loading objects definition info");

    if !path.exists() {
        anyhow::bail!("Objects definition file not found: {}", path.display());
    }

    let definition = config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load objects definition from {}", path.display()))?;

    let info = build_definition_info(&definition, args.attributes);
    if args.json {
        let json = serde_json::to_string_pretty(&info)
            .context("Failed to serialize objects definition info")?;
        println!("{}", json);
    } else {
        print_definition_info(&info);
    }

    Ok(())
}

fn object_info(object: &ObjectSpec, with_attributes: bool) -> ObjectInfo {
    ObjectInfo {
        id: object.id.clone(),
        object_type: object.object_type.clone(),
        spawn_point: object.spawn_point,
        attributes: if with_attributes {
            (*object.attributes).clone()
        } else {
            BTreeMap::new()
        },
    }
}

fn build_definition_info(definition: &ObjectsDefinition, with_attributes: bool) -> DefinitionInfo {
    let mut info = DefinitionInfo {
        global_sensors: Vec::new(),
        entities: Vec::new(),
        ignored: Vec::new(),
    };

    for object in &definition.objects {
        let category = object.category();
        if category.is_entity() {
            info.entities.push(EntityInfo {
                object: object_info(object, with_attributes),
                sensors: object.sensors.as_ref().map(|sensors| {
                    sensors
                        .iter()
                        .map(|s| object_info(s, with_attributes))
                        .collect()
                }),
            });
        } else if category == contracts::ObjectCategory::Sensor {
            info.global_sensors.push(object_info(object, with_attributes));
        } else {
            info.ignored.push(object_info(object, with_attributes));
        }
    }

    info
}

fn format_spawn_point(spawn_point: Option<&SpawnPointSpec>) -> String {
    let Some(sp) = spawn_point else {
        return "none".to_string();
    };
    let component = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| v.to_string());
    format!(
        "({}, {}, {}) rpy ({}, {}, {})",
        component(sp.x),
        component(sp.y),
        component(sp.z),
        component(sp.roll),
        component(sp.pitch),
        component(sp.yaw)
    )
}

fn print_attributes(indent: &str, attributes: &BTreeMap<String, String>) {
    for (key, value) in attributes {
        println!("{}  · {} = {}", indent, key, value);
    }
}

fn print_definition_info(info: &DefinitionInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 CARLA Objects Definition                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    // Global sensors
    println!("📷 Global sensors ({})", info.global_sensors.len());
    for (i, sensor) in info.global_sensors.iter().enumerate() {
        let is_last = i == info.global_sensors.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };
        println!(
            "   {} {} ({}) at {}",
            prefix,
            sensor.id,
            sensor.object_type,
            format_spawn_point(sensor.spawn_point.as_ref())
        );
        print_attributes(&format!("   {}", child_prefix), &sensor.attributes);
    }

    // Vehicles and walkers
    println!("\n🚗 Vehicles / walkers ({})", info.entities.len());
    for (i, entity) in info.entities.iter().enumerate() {
        let is_last = i == info.entities.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!(
            "   {} {} ({}) at {}",
            prefix,
            entity.object.id,
            entity.object.object_type,
            format_spawn_point(entity.object.spawn_point.as_ref())
        );
        print_attributes(&format!("   {}", child_prefix), &entity.object.attributes);

        match &entity.sensors {
            None => println!("   {}  └─ no 'sensors' field", child_prefix),
            Some(sensors) => {
                println!("   {}  📷 Sensors ({}):", child_prefix, sensors.len());
                for (j, sensor) in sensors.iter().enumerate() {
                    let sensor_prefix = if j == sensors.len() - 1 { "└─" } else { "├─" };
                    println!(
                        "   {}     {} {} ({}) at {}",
                        child_prefix,
                        sensor_prefix,
                        sensor.id,
                        sensor.object_type,
                        format_spawn_point(sensor.spawn_point.as_ref())
                    );
                    print_attributes(&format!("   {}        ", child_prefix), &sensor.attributes);
                }
            }
        }
    }

    if !info.ignored.is_empty() {
        println!("\n⚠ Ignored ({})", info.ignored.len());
        for object in &info.ignored {
            println!("   - {} ({})", object.id, object.object_type);
        }
    }

    println!();
}
