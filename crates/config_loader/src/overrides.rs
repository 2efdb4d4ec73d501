//! Spawn point overrides from the command line and the environment.
//!
//! Two sources feed the same `SpawnPointOverrides` map:
//! - `ID=x,y,z,roll,pitch,yaw` assignments (the `--spawn-point` flag)
//! - `CARLA_SPAWNER_SPAWN_POINT_<ID>` environment variables
//!
//! Only the `ID=value` shape is checked here. The six-float payload is parsed
//! when the entity is spawned, so a bad value degrades to the next placement
//! source instead of aborting startup.

use std::ffi::OsString;

use contracts::SpawnPointOverrides;
use thiserror::Error;
use tracing::debug;

/// Environment variable prefix for per-entity overrides
pub const SPAWN_POINT_ENV_PREFIX: &str = "CARLA_SPAWNER_SPAWN_POINT_";

/// Malformed `ID=value` assignment
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OverrideError {
    #[error("expected ID=x,y,z,roll,pitch,yaw, got '{0}'")]
    MissingSeparator(String),

    #[error("empty entity id in '{0}'")]
    EmptyId(String),

    #[error("empty spawn point for entity '{0}'")]
    EmptyValue(String),
}

/// Parse a single `ID=x,y,z,roll,pitch,yaw` assignment
pub fn parse_assignment(raw: &str) -> Result<(String, String), OverrideError> {
    let (id, value) = raw
        .split_once('=')
        .ok_or_else(|| OverrideError::MissingSeparator(raw.to_string()))?;
    let (id, value) = (id.trim(), value.trim());

    if id.is_empty() {
        return Err(OverrideError::EmptyId(raw.to_string()));
    }
    if value.is_empty() {
        return Err(OverrideError::EmptyValue(id.to_string()));
    }
    Ok((id.to_string(), value.to_string()))
}

/// Collect overrides from `(name, value)` pairs carrying the env prefix
pub fn overrides_from_vars<I, K, V>(vars: I) -> SpawnPointOverrides
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    vars.into_iter()
        .filter_map(|(name, value)| {
            let id = name.as_ref().strip_prefix(SPAWN_POINT_ENV_PREFIX)?;
            if id.is_empty() {
                return None;
            }
            debug!(entity_id = id, "spawn point override from environment");
            Some((id.to_string(), value.as_ref().trim().to_string()))
        })
        .collect()
}

/// Collect overrides from the process environment
///
/// Variables whose name or value is not valid UTF-8 are skipped.
pub fn overrides_from_env() -> SpawnPointOverrides {
    overrides_from_vars(utf8_vars(std::env::vars_os()))
}

fn utf8_vars(
    vars: impl IntoIterator<Item = (OsString, OsString)>,
) -> impl Iterator<Item = (String, String)> {
    vars.into_iter().filter_map(|(name, value)| {
        match (name.into_string(), value.into_string()) {
            (Ok(name), Ok(value)) => Some((name, value)),
            (name, _) => {
                debug!(
                    name = %name.unwrap_or_else(|raw| raw.to_string_lossy().into_owned()),
                    "skipping environment variable that is not valid UTF-8"
                );
                None
            }
        }
    })
}
