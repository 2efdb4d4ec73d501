//! Spawn requests, responses and actor handles
//!
//! The request / response shapes mirror the backend's spawn service.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Pose;

/// Backend actor handle type
pub type ActorId = i32;

/// `attach_to` value meaning "not attached to any actor"
pub const UNATTACHED: ActorId = 0;

/// Id returned by the backend when a spawn request fails
pub const SPAWN_FAILED: ActorId = -1;

/// Spawn-object request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnRequest {
    /// Blueprint type, e.g. "sensor.camera.rgb"
    pub object_type: String,

    /// Role name of the new actor
    pub id: String,

    /// Parent actor, `UNATTACHED` for world-anchored actors
    pub attach_to: ActorId,

    /// Pose, relative to the parent when attached
    pub transform: Pose,

    /// Ask the backend to choose the pose
    pub random_pose: bool,

    /// Blueprint attributes
    pub attributes: BTreeMap<String, String>,
}

impl SpawnRequest {
    pub fn is_attached(&self) -> bool {
        self.attach_to != UNATTACHED
    }
}

/// Spawn-object response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnResponse {
    /// New actor id, or `SPAWN_FAILED`
    pub id: ActorId,

    /// Backend error description when the spawn failed
    #[serde(default)]
    pub error_string: String,
}

impl SpawnResponse {
    pub fn spawned(id: ActorId) -> Self {
        Self {
            id,
            error_string: String::new(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            id: SPAWN_FAILED,
            error_string: error.into(),
        }
    }

    /// The spawned actor id, `None` when the backend reported failure
    pub fn actor_id(&self) -> Option<ActorId> {
        (self.id != SPAWN_FAILED).then_some(self.id)
    }
}

/// A successfully created actor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnedActor {
    /// Backend handle
    pub actor_id: ActorId,

    /// Configured type
    pub object_type: String,

    /// Configured id
    pub role_name: String,

    /// Parent handle, `None` when unattached
    pub parent: Option<ActorId>,
}
