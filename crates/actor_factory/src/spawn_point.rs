//! Spawn point resolution for vehicles and walkers.
//!
//! Precedence, first success wins:
//! 1. runtime override string `x,y,z,roll,pitch,yaw`
//! 2. `spawn_point` from the objects definition (x, y, z mandatory)
//! 3. random placement chosen by the backend
//!
//! A failing source is reported and resolution falls through to the next one.

use contracts::{ContractError, ObjectSpec, Pose, SpawnPoint, SpawnPointOverrides};
use thiserror::Error;

/// Why a placement source was skipped
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SpawnPointError {
    #[error("invalid spawn point '{raw}': expected 6 comma-separated values, got {count}")]
    WrongArity { raw: String, count: usize },

    #[error("invalid spawn point '{raw}': '{component}' is not a finite number")]
    NotANumber { raw: String, component: String },

    #[error("config spawn point is missing the mandatory attribute '{field}'")]
    MissingComponent { field: String },
}

/// Where the resolved spawn point came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnPointSource {
    Override,
    Config,
    Random,
}

impl SpawnPointSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Override => "override",
            Self::Config => "config",
            Self::Random => "random",
        }
    }
}

/// Resolution result with the fall-through reasons
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub spawn_point: SpawnPoint,
    pub source: SpawnPointSource,
    pub errors: Vec<SpawnPointError>,
}

/// Parse `x,y,z,roll,pitch,yaw` (angles in degrees)
pub fn parse_override(raw: &str) -> Result<Pose, SpawnPointError> {
    let components: Vec<&str> = raw.split(',').map(str::trim).collect();
    if components.len() != 6 {
        return Err(SpawnPointError::WrongArity {
            raw: raw.to_string(),
            count: components.len(),
        });
    }

    let mut values = [0.0_f64; 6];
    for (slot, component) in values.iter_mut().zip(&components) {
        *slot = component
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| SpawnPointError::NotANumber {
                raw: raw.to_string(),
                component: component.to_string(),
            })?;
    }

    let [x, y, z, roll, pitch, yaw] = values;
    Ok(Pose::from_components(x, y, z, roll, pitch, yaw))
}

/// Resolve the spawn point of one entity given its optional override
pub fn resolve(entity: &ObjectSpec, runtime_override: Option<&str>) -> Resolution {
    let mut errors = Vec::new();

    if let Some(raw) = runtime_override {
        match parse_override(raw) {
            Ok(pose) => {
                return Resolution {
                    spawn_point: SpawnPoint::Pose(pose),
                    source: SpawnPointSource::Override,
                    errors,
                }
            }
            Err(e) => errors.push(e),
        }
    }

    if let Some(spec) = &entity.spawn_point {
        match spec.to_pose_strict(&entity.id) {
            Ok(pose) => {
                return Resolution {
                    spawn_point: SpawnPoint::Pose(pose),
                    source: SpawnPointSource::Config,
                    errors,
                }
            }
            Err(ContractError::MissingField { field, .. }) => {
                errors.push(SpawnPointError::MissingComponent { field })
            }
            Err(other) => errors.push(SpawnPointError::MissingComponent {
                field: other.to_string(),
            }),
        }
    }

    Resolution {
        spawn_point: SpawnPoint::Random,
        source: SpawnPointSource::Random,
        errors,
    }
}

/// Resolver bound to the run's override table
#[derive(Debug, Clone, Copy)]
pub struct SpawnPointResolver<'a> {
    overrides: &'a SpawnPointOverrides,
}

impl<'a> SpawnPointResolver<'a> {
    pub fn new(overrides: &'a SpawnPointOverrides) -> Self {
        Self { overrides }
    }

    /// Resolve using the override registered for the entity's id
    pub fn resolve(&self, entity: &ObjectSpec) -> Resolution {
        resolve(entity, self.overrides.get(&entity.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Location, Quaternion, SpawnPointSpec};

    fn vehicle() -> ObjectSpec {
        ObjectSpec::new("vehicle.tesla.model3", "ego")
    }

    fn position(resolution: &Resolution) -> Location {
        match resolution.spawn_point {
            SpawnPoint::Pose(pose) => pose.position,
            SpawnPoint::Random => panic!("expected a pose, got random"),
        }
    }

    #[test]
    fn override_beats_config_beats_random() {
        let configured = vehicle().with_spawn_point(SpawnPointSpec::at(1.0, 2.0, 3.0));

        let r = resolve(&configured, Some("10,20,30,0,0,0"));
        assert_eq!(r.source, SpawnPointSource::Override);
        assert_eq!(position(&r), Location { x: 10.0, y: 20.0, z: 30.0 });
        assert!(r.errors.is_empty());

        let r = resolve(&configured, None);
        assert_eq!(r.source, SpawnPointSource::Config);
        assert_eq!(position(&r), Location { x: 1.0, y: 2.0, z: 3.0 });

        let r = resolve(&vehicle(), None);
        assert_eq!(r.source, SpawnPointSource::Random);
        assert!(r.spawn_point.is_random());
        assert!(r.errors.is_empty());
    }

    #[test]
    fn override_without_config_wins_over_random() {
        let r = resolve(&vehicle(), Some("1,1,1,0,0,90"));
        assert_eq!(r.source, SpawnPointSource::Override);
    }

    #[test]
    fn wrong_arity_falls_back_to_config() {
        let configured = vehicle().with_spawn_point(SpawnPointSpec::at(1.0, 2.0, 3.0));

        for raw in ["1,2,3,4,5", "1,2,3,4,5,6,7", ""] {
            let r = resolve(&configured, Some(raw));
            assert_eq!(r.source, SpawnPointSource::Config, "override {raw:?}");
            assert!(matches!(r.errors[..], [SpawnPointError::WrongArity { .. }]));
        }
    }

    #[test]
    fn unparsable_override_falls_back_to_random() {
        let r = resolve(&vehicle(), Some("1,2,three,0,0,0"));
        assert_eq!(r.source, SpawnPointSource::Random);
        assert_eq!(
            r.errors,
            vec![SpawnPointError::NotANumber {
                raw: "1,2,three,0,0,0".into(),
                component: "three".into(),
            }]
        );

        let r = resolve(&vehicle(), Some("1,2,inf,0,0,0"));
        assert_eq!(r.source, SpawnPointSource::Random);
    }

    #[test]
    fn config_missing_position_falls_back_to_random() {
        let partial = vehicle().with_spawn_point(SpawnPointSpec {
            x: Some(1.0),
            z: Some(0.5),
            yaw: Some(90.0),
            ..Default::default()
        });
        let r = resolve(&partial, Some("bad"));
        assert_eq!(r.source, SpawnPointSource::Random);
        assert_eq!(r.errors.len(), 2);
        assert_eq!(
            r.errors[1],
            SpawnPointError::MissingComponent { field: "y".into() }
        );
    }

    #[test]
    fn config_angles_default_to_zero() {
        let r = resolve(
            &vehicle().with_spawn_point(SpawnPointSpec::at(0.0, 0.0, 0.0)),
            None,
        );
        match r.spawn_point {
            SpawnPoint::Pose(pose) => assert_eq!(pose.orientation, Quaternion::IDENTITY),
            SpawnPoint::Random => panic!("expected a pose"),
        }
    }

    #[test]
    fn override_angles_are_degrees() {
        let pose = parse_override(" 1.5, -2, 0.3 , 0, 0, 180").unwrap();
        assert_eq!(pose.position, Location { x: 1.5, y: -2.0, z: 0.3 });
        assert!(pose.orientation.z.abs() > 0.999_999);
        assert!(pose.orientation.w.abs() < 1e-9);
    }

    #[test]
    fn resolver_uses_entity_id() {
        let overrides: SpawnPointOverrides =
            [("hero", "5,5,5,0,0,0")].into_iter().collect();
        let resolver = SpawnPointResolver::new(&overrides);

        assert_eq!(resolver.resolve(&vehicle()).source, SpawnPointSource::Random);
        let hero = ObjectSpec::new("vehicle.audi.tt", "hero");
        assert_eq!(resolver.resolve(&hero).source, SpawnPointSource::Override);
    }
}
