//! Entity Component System integration with hecs.
//!
//! The physics core never spawns or despawns entities. It reads [`Transform`],
//! [`Collider`] and [`RigidBody`] components from the host's `hecs::World` and
//! writes back positions.
//!
//! [`Transform`]: components::Transform
//! [`Collider`]: components::Collider
//! [`RigidBody`]: components::RigidBody

pub mod components;

pub mod prelude {
    pub use super::components::*;
}
