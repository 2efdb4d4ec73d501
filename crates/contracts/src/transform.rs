//! Poses and placement decisions
//!
//! 配置中的角度为 roll / pitch / yaw (度)，发往后端的位姿使用单位四元数。

use nalgebra::UnitQuaternion;
use serde::{Deserialize, Serialize};

/// 位置 (x, y, z) 单位：米
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// 旋转 (roll, pitch, yaw) 单位：度
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl Rotation {
    /// Convert to a unit quaternion.
    ///
    /// Rotations are applied about the static axes in the order roll (x),
    /// pitch (y), yaw (z). The backend relies on this exact convention.
    pub fn to_quaternion(&self) -> Quaternion {
        let unit = UnitQuaternion::from_euler_angles(
            self.roll.to_radians(),
            self.pitch.to_radians(),
            self.yaw.to_radians(),
        );
        // nalgebra stores coordinates as [i, j, k, w]
        let coords = unit.into_inner().coords;
        Quaternion {
            x: coords.x,
            y: coords.y,
            z: coords.z,
            w: coords.w,
        }
    }
}

/// Orientation as a unit quaternion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// 发往后端的位姿：位置 + 四元数
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Location,
    pub orientation: Quaternion,
}

impl Pose {
    /// Identity pose at the origin (also the default sensor mount)
    pub const ZERO: Self = Self {
        position: Location {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        },
        orientation: Quaternion::IDENTITY,
    };

    /// Build a pose from a location and roll / pitch / yaw in degrees
    pub fn new(location: Location, rotation: Rotation) -> Self {
        Self {
            position: location,
            orientation: rotation.to_quaternion(),
        }
    }

    /// Build a pose from the six raw components, angles in degrees
    pub fn from_components(x: f64, y: f64, z: f64, roll: f64, pitch: f64, yaw: f64) -> Self {
        Self::new(Location { x, y, z }, Rotation { roll, pitch, yaw })
    }
}

/// Resolved placement decision
///
/// Exactly one of: a concrete pose, or a request for the backend to choose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnPoint {
    /// Explicit pose
    Pose(Pose),
    /// Let the backend pick one of its spawn points
    Random,
}

impl SpawnPoint {
    pub fn is_random(&self) -> bool {
        matches!(self, Self::Random)
    }

    /// Pose to put on the wire. Random placement carries the identity pose,
    /// which the backend ignores when `random_pose` is set.
    pub fn wire_pose(&self) -> Pose {
        match self {
            Self::Pose(pose) => *pose,
            Self::Random => Pose::ZERO,
        }
    }
}
