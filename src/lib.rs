//! Rein Physics
//!
//! Collision detection and rigid body integration for `hecs` worlds.
//!
//! # Architecture
//!
//! The library is organized into two layers:
//!
//! 1. **ecs** - Components the physics module reads and writes (transform, rigid body, collider)
//! 2. **physics** - Broadphase, GJK/EPA narrowphase, fixed-step integrator and collision response

pub mod ecs;
pub mod physics;

// Re-export commonly used types
pub use ecs::prelude::*;

pub use physics::broadphase::BroadphaseCollision;
pub use physics::contact::{IntersectionInfo, NarrowphaseCollision};
pub use physics::error::PhysicsError;
pub use physics::narrowphase::{intersect, intersect_generic, NarrowphaseConfig};
pub use physics::raycast::RaycastInfo;
pub use physics::rigid_body::RigidbodyState;
pub use physics::{PhysicsConfig, PhysicsWorld};

// Re-export glam and hecs for convenience
pub use glam;
pub use hecs;
