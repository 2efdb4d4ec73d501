//! ObjectsDefinition - Config Loader 输出
//!
//! 描述需要创建的对象：类型、ID、初始位姿、挂载的传感器以及透传给后端的属性。

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::{ContractError, Location, Pose, Rotation};

/// Type of the pseudo sensor that publishes the backend's actor list
pub const ACTOR_LIST_SENSOR_TYPE: &str = "sensor.pseudo.actor_list";

/// 完整的对象定义文件
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectsDefinition {
    /// 对象列表，顺序即 spawn 顺序
    #[serde(default)]
    pub objects: Vec<ObjectSpec>,
}

/// 单个对象的配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSpec {
    /// 点分类型 (e.g., "vehicle.tesla.model3", "sensor.camera.rgb")
    #[serde(rename = "type")]
    pub object_type: String,

    /// 作用域内唯一的标识符 (vehicle/walker 的 role name)
    pub id: String,

    /// 初始位姿 (可选)
    #[serde(
        default,
        alias = "spawnPoint",
        skip_serializing_if = "Option::is_none"
    )]
    pub spawn_point: Option<SpawnPointSpec>,

    /// 挂载的传感器 (仅 vehicle/walker 有意义)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensors: Option<Vec<ObjectSpec>>,

    /// 其余字段，原样透传给后端
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl ObjectSpec {
    /// Create a bare spec with no spawn point, sensors or attributes
    pub fn new(object_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            id: id.into(),
            spawn_point: None,
            sensors: None,
            attributes: Attributes::default(),
        }
    }

    /// Builder-style spawn point setter
    pub fn with_spawn_point(mut self, spawn_point: SpawnPointSpec) -> Self {
        self.spawn_point = Some(spawn_point);
        self
    }

    /// Builder-style sensors setter
    pub fn with_sensors(mut self, sensors: Vec<ObjectSpec>) -> Self {
        self.sensors = Some(sensors);
        self
    }

    /// Builder-style attribute setter
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Category derived from the type prefix before the first '.'
    pub fn category(&self) -> ObjectCategory {
        ObjectCategory::from_type(&self.object_type)
    }

    /// Whether this is the actor-list pseudo sensor
    pub fn is_actor_list_sensor(&self) -> bool {
        self.object_type == ACTOR_LIST_SENSOR_TYPE
    }

    /// Pseudo actors have no physical representation and no mandatory pose
    pub fn is_pseudo(&self) -> bool {
        self.object_type.contains("pseudo")
    }

    /// Unique name of a sensor within one spawn batch
    pub fn sensor_name(&self) -> String {
        format!("{}/{}", self.object_type, self.id)
    }
}

/// Object category by type prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectCategory {
    Sensor,
    Vehicle,
    Walker,
    /// Anything else; ignored with a warning
    Unknown,
}

impl ObjectCategory {
    pub fn from_type(object_type: &str) -> Self {
        let prefix = object_type.split('.').next().unwrap_or_default();
        match prefix {
            "sensor" => Self::Sensor,
            "vehicle" => Self::Vehicle,
            "walker" => Self::Walker,
            _ => Self::Unknown,
        }
    }

    /// Vehicles and walkers own sensor groups
    pub fn is_entity(&self) -> bool {
        matches!(self, Self::Vehicle | Self::Walker)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sensor => "sensor",
            Self::Vehicle => "vehicle",
            Self::Walker => "walker",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ObjectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 配置文件中的初始位姿，每个分量都可能缺失
///
/// 缺失的 roll / pitch / yaw 默认为 0.0；x / y / z 是否必填由调用方决定。
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpawnPointSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yaw: Option<f64>,
}

impl SpawnPointSpec {
    /// Fully specified spawn point
    pub fn new(x: f64, y: f64, z: f64, roll: f64, pitch: f64, yaw: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
            roll: Some(roll),
            pitch: Some(pitch),
            yaw: Some(yaw),
        }
    }

    /// Position only; angles default to zero
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
            ..Default::default()
        }
    }

    /// Pose requiring x, y and z; `object` names the owner in the error
    pub fn to_pose_strict(&self, object: &str) -> Result<Pose, ContractError> {
        let field = |value: Option<f64>, name: &str| {
            value.ok_or_else(|| ContractError::missing_field(object, name))
        };
        let location = Location {
            x: field(self.x, "x")?,
            y: field(self.y, "y")?,
            z: field(self.z, "z")?,
        };
        Ok(Pose::new(location, self.rotation()))
    }

    /// Pose where every missing component defaults to 0.0
    pub fn to_pose_lenient(&self) -> Pose {
        let location = Location {
            x: self.x.unwrap_or(0.0),
            y: self.y.unwrap_or(0.0),
            z: self.z.unwrap_or(0.0),
        };
        Pose::new(location, self.rotation())
    }

    fn rotation(&self) -> Rotation {
        Rotation {
            roll: self.roll.unwrap_or(0.0),
            pitch: self.pitch.unwrap_or(0.0),
            yaw: self.yaw.unwrap_or(0.0),
        }
    }
}

/// Extra per-object attributes forwarded to the backend as strings
///
/// Values in the definition file are stringified on load: scalars by their
/// display form, anything else as compact JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl Deref for Attributes {
    type Target = BTreeMap<String, String>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Attributes {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Attributes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, AttributeValue>::deserialize(deserializer)?;
        Ok(Self(
            raw.into_iter()
                .map(|(key, value)| (key, value.to_string()))
                .collect(),
        ))
    }
}

/// Scalar attribute value as it appears in a definition file
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// null, arrays and tables; forwarded as compact JSON text
    Structured(serde_json::Value),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            // keep a decimal point on whole floats ("90.0", not "90")
            Self::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{v:.1}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Structured(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_from_type_prefix() {
        assert_eq!(
            ObjectCategory::from_type("sensor.camera.rgb"),
            ObjectCategory::Sensor
        );
        assert_eq!(
            ObjectCategory::from_type("vehicle.tesla.model3"),
            ObjectCategory::Vehicle
        );
        assert_eq!(
            ObjectCategory::from_type("walker.pedestrian.0001"),
            ObjectCategory::Walker
        );
        assert_eq!(
            ObjectCategory::from_type("static.prop.barrel"),
            ObjectCategory::Unknown
        );
        assert_eq!(ObjectCategory::from_type(""), ObjectCategory::Unknown);
        // only the first segment counts
        assert_eq!(
            ObjectCategory::from_type("props.vehicle"),
            ObjectCategory::Unknown
        );
    }

    #[test]
    fn extra_fields_become_string_attributes() {
        let spec: ObjectSpec = serde_json::from_str(
            r#"{
                "type": "sensor.camera.rgb",
                "id": "front",
                "spawn_point": {"x": 2.0, "y": 0, "z": 1.5},
                "image_size_x": 800,
                "fov": 90.0,
                "sensor_tick": 0.05,
                "enable_postprocess_effects": true,
                "role": "main"
            }"#,
        )
        .unwrap();

        assert_eq!(spec.object_type, "sensor.camera.rgb");
        assert_eq!(spec.id, "front");
        assert_eq!(spec.spawn_point, Some(SpawnPointSpec::at(2.0, 0.0, 1.5)));
        assert!(spec.sensors.is_none());
        assert_eq!(spec.attributes.len(), 5);
        assert_eq!(spec.attributes["image_size_x"], "800");
        assert_eq!(spec.attributes["fov"], "90.0");
        assert_eq!(spec.attributes["sensor_tick"], "0.05");
        assert_eq!(spec.attributes["enable_postprocess_effects"], "true");
        assert_eq!(spec.attributes["role"], "main");
    }

    #[test]
    fn non_scalar_attributes_are_stringified() {
        let spec: ObjectSpec = serde_json::from_str(
            r#"{
                "type": "sensor.camera.rgb",
                "id": "front",
                "lens": null,
                "channels": [1, 2],
                "noise": {"stddev": 0.5}
            }"#,
        )
        .unwrap();

        assert_eq!(spec.attributes.len(), 3);
        assert_eq!(spec.attributes["lens"], "null");
        assert_eq!(spec.attributes["channels"], "[1,2]");
        assert_eq!(spec.attributes["noise"], r#"{"stddev":0.5}"#);
    }

    #[test]
    fn camel_case_spawn_point_is_accepted() {
        let spec: ObjectSpec = serde_json::from_str(
            r#"{"type": "vehicle.audi.tt", "id": "ego", "spawnPoint": {"x": 1, "y": 2, "z": 3}}"#,
        )
        .unwrap();
        assert_eq!(spec.spawn_point, Some(SpawnPointSpec::at(1.0, 2.0, 3.0)));
        assert!(spec.attributes.is_empty());
    }

    #[test]
    fn nested_sensors_parse_from_toml() {
        let def: ObjectsDefinition = toml::from_str(
            r#"
[[objects]]
type = "vehicle.tesla.model3"
id = "ego"
color = "255,0,0"

[[objects.sensors]]
type = "sensor.other.gnss"
id = "gnss"
noise_alt_stddev = 0.0
"#,
        )
        .unwrap();

        let ego = &def.objects[0];
        assert_eq!(ego.category(), ObjectCategory::Vehicle);
        assert_eq!(ego.attributes["color"], "255,0,0");
        let sensors = ego.sensors.as_ref().unwrap();
        assert_eq!(sensors.len(), 1);
        assert_eq!(sensors[0].sensor_name(), "sensor.other.gnss/gnss");
        assert_eq!(sensors[0].attributes["noise_alt_stddev"], "0.0");
    }

    #[test]
    fn strict_pose_requires_position() {
        let partial = SpawnPointSpec {
            x: Some(1.0),
            y: Some(2.0),
            ..Default::default()
        };
        let err = partial.to_pose_strict("ego").unwrap_err();
        assert!(
            matches!(err, ContractError::MissingField { ref field, .. } if field == "z"),
            "got: {err}"
        );

        let lenient = partial.to_pose_lenient();
        assert_eq!(lenient.position, Location { x: 1.0, y: 2.0, z: 0.0 });
    }

    #[test]
    fn pseudo_and_actor_list_detection() {
        let actor_list = ObjectSpec::new(ACTOR_LIST_SENSOR_TYPE, "actor_list");
        assert!(actor_list.is_actor_list_sensor());
        assert!(actor_list.is_pseudo());

        let odom = ObjectSpec::new("sensor.pseudo.odom", "odometry");
        assert!(!odom.is_actor_list_sensor());
        assert!(odom.is_pseudo());

        assert!(!ObjectSpec::new("sensor.camera.rgb", "cam").is_pseudo());
    }
}
