//! Physics components for ECS entities.

use bitflags::bitflags;
use glam::{Quat, Vec3};

use crate::physics::error::PhysicsError;

/// Rigid body component.
///
/// Entities carrying one are simulated: gravity moves them and collision
/// response pushes them. Entities with only a [`Collider`] are static and
/// behave as if they had infinite mass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidBody {
    /// Mass in kilograms. A non-positive mass is treated as infinite.
    pub mass: f32,
    /// Coefficient of restitution (0.0 - 1.0). Default: 0.0.
    pub restitution: f32,
}

impl RigidBody {
    /// Create a new rigid body with the given mass.
    pub fn new(mass: f32) -> Self {
        Self {
            mass,
            restitution: 0.0,
        }
    }

    /// Inverse mass, zero for non-positive masses.
    #[inline]
    pub fn inverse_mass(&self) -> f32 {
        if self.mass > 0.0 {
            1.0 / self.mass
        } else {
            0.0
        }
    }
}

impl Default for RigidBody {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Collider shape.
///
/// Stored in entity-local space on a [`Collider`]; the physics world
/// transforms it into world space every step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    Sphere {
        center: Vec3,
        radius: f32,
    },
    /// Axis-aligned box given by its corners.
    Aabb {
        min: Vec3,
        max: Vec3,
    },
    /// Oriented box.
    Obb {
        center: Vec3,
        half_extents: Vec3,
        rotation: Quat,
    },
    /// Segment from `base` to `tip` swept by a sphere of `radius`.
    Capsule {
        base: Vec3,
        tip: Vec3,
        radius: f32,
    },
}

impl ColliderShape {
    /// Sphere centered at the origin.
    pub fn sphere(radius: f32) -> Self {
        ColliderShape::Sphere {
            center: Vec3::ZERO,
            radius,
        }
    }

    /// Axis-aligned box centered at the origin.
    pub fn aabb(half_extents: Vec3) -> Self {
        ColliderShape::Aabb {
            min: -half_extents,
            max: half_extents,
        }
    }

    /// Oriented box centered at the origin.
    pub fn obb(half_extents: Vec3, rotation: Quat) -> Self {
        ColliderShape::Obb {
            center: Vec3::ZERO,
            half_extents,
            rotation,
        }
    }

    /// Capsule along the Y axis, centered at the origin.
    pub fn capsule(half_height: f32, radius: f32) -> Self {
        ColliderShape::Capsule {
            base: Vec3::new(0.0, -half_height, 0.0),
            tip: Vec3::new(0.0, half_height, 0.0),
            radius,
        }
    }

    /// Reject NaN/infinite parameters, negative radii and inverted boxes.
    ///
    /// Zero radii and zero extents are valid degenerate shapes.
    pub fn validate(&self) -> Result<(), PhysicsError> {
        let (finite, reason) = match *self {
            ColliderShape::Sphere { center, radius } => (
                center.is_finite() && radius.is_finite(),
                (radius < 0.0).then_some("sphere radius is negative"),
            ),
            ColliderShape::Aabb { min, max } => (
                min.is_finite() && max.is_finite(),
                min.cmpgt(max).any().then_some("aabb min exceeds max"),
            ),
            ColliderShape::Obb {
                center,
                half_extents,
                rotation,
            } => (
                center.is_finite() && half_extents.is_finite() && rotation.is_finite(),
                half_extents
                    .cmplt(Vec3::ZERO)
                    .any()
                    .then_some("obb half extents are negative"),
            ),
            ColliderShape::Capsule { base, tip, radius } => (
                base.is_finite() && tip.is_finite() && radius.is_finite(),
                (radius < 0.0).then_some("capsule radius is negative"),
            ),
        };

        if !finite {
            return Err(PhysicsError::InvalidShape("non-finite shape parameter"));
        }
        match reason {
            Some(reason) => Err(PhysicsError::InvalidShape(reason)),
            None => Ok(()),
        }
    }
}

/// Collision detection component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider {
    pub shape: ColliderShape,
}

impl Collider {
    /// Create a collider, validating the shape parameters.
    pub fn new(shape: ColliderShape) -> Result<Self, PhysicsError> {
        shape.validate()?;
        Ok(Self { shape })
    }
}

impl Default for Collider {
    fn default() -> Self {
        Self {
            shape: ColliderShape::sphere(0.5),
        }
    }
}

/// Component kinds the physics world is notified about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Transform,
    RigidBody,
    Collider,
}

bitflags! {
    /// Set of component kinds an entity needs to be simulated.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ComponentMask: u32 {
        const TRANSFORM = 1 << 0;
        const RIGIDBODY = 1 << 1;
        const COLLIDER = 1 << 2;
    }
}

impl From<ComponentKind> for ComponentMask {
    fn from(kind: ComponentKind) -> Self {
        match kind {
            ComponentKind::Transform => ComponentMask::TRANSFORM,
            ComponentKind::RigidBody => ComponentMask::RIGIDBODY,
            ComponentKind::Collider => ComponentMask::COLLIDER,
        }
    }
}
