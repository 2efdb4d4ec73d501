//! CARLA client abstraction
//!
//! Defines the trait for the three backend services the spawner consumes,
//! supporting real implementations and mock testing.

use std::future::Future;

use contracts::{ActorId, SpawnRequest, SpawnResponse};

use crate::error::Result;

/// Service names, used in logs and errors
pub const SPAWN_OBJECT_SERVICE: &str = "/carla/spawn_object";
pub const DESTROY_OBJECT_SERVICE: &str = "/carla/destroy_object";
pub const GET_ACTOR_SERVICE: &str = "/carla/get_actor";

/// CARLA client trait
///
/// Abstracts the spawn / destroy / get-actor services.
/// `Err` means the call itself could not be completed (transport, service
/// down). A backend that answers with a failure is reported in-band.
pub trait CarlaClient: Send + Sync {
    /// Connect to CARLA server
    fn connect(&mut self, host: &str, port: u16) -> impl Future<Output = Result<()>> + Send;

    /// Check that the spawn, destroy and get-actor services answer
    fn wait_for_services(&self) -> impl Future<Output = Result<()>> + Send;

    /// Spawn an object
    ///
    /// # Returns
    /// A response whose `id` is the new actor, or `SPAWN_FAILED` together
    /// with the backend's error string. Each call is atomic.
    fn spawn_object(
        &self,
        request: &SpawnRequest,
    ) -> impl Future<Output = Result<SpawnResponse>> + Send;

    /// Destroy actor
    ///
    /// Safe to call on an id that is already gone; returns `Ok(false)` then.
    fn destroy_object(&self, actor_id: ActorId) -> impl Future<Output = Result<bool>> + Send;

    /// Find an already spawned actor by its role name
    fn get_actor_by_role(
        &self,
        role_name: &str,
    ) -> impl Future<Output = Result<Option<ActorId>>> + Send;
}
