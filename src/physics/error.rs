//! Error type for physics configuration and component validation.
//!
//! Geometry queries never fail: degenerate input resolves to a fallback
//! axis or to "no intersection".

use thiserror::Error;

/// Errors reported when building a [`PhysicsWorld`](super::PhysicsWorld) or a collider.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    #[error("fixed timestep must be finite and positive, got {0}")]
    InvalidTimestep(f64),
    #[error("maximum sub-step count must be at least 1")]
    InvalidSubstepCap,
    #[error("{0} iteration cap must be at least 1")]
    InvalidIterationCap(&'static str),
    #[error("EPA tolerance must be finite and positive, got {0}")]
    InvalidTolerance(f32),
    #[error("gravity must be finite")]
    InvalidGravity,
    #[error("invalid collider shape: {0}")]
    InvalidShape(&'static str),
}
