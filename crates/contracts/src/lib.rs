//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the spawner.
//! Business crates only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Coordinate Model
//! - Positions are in meters, in the simulator's world (or parent) frame
//! - Configured angles are roll / pitch / yaw in degrees
//! - Poses sent to the backend carry a unit quaternion (x, y, z, w)

mod blueprint;
mod error;
mod runtime;
mod settings;
mod transform;

pub use blueprint::*;
pub use error::*;
pub use runtime::*;
pub use settings::*;
pub use transform::*;
