//! Contact data structures for collision response.

use glam::Vec3;

/// Result of a successful intersection test between two shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionInfo {
    /// Unit contact normal (from shape 1 toward shape 2).
    pub normal: Vec3,
    /// Penetration depth, never negative.
    pub depth: f32,
}

impl IntersectionInfo {
    /// The same contact seen from the other shape.
    #[inline]
    pub fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            depth: self.depth,
        }
    }
}

/// A contact between two entities found by the narrowphase this step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NarrowphaseCollision {
    pub entity1: hecs::Entity,
    pub entity2: hecs::Entity,
    /// Contact normal (from entity1 toward entity2).
    pub normal: Vec3,
    /// Penetration depth.
    pub depth: f32,
}

impl NarrowphaseCollision {
    pub fn new(entity1: hecs::Entity, entity2: hecs::Entity, info: IntersectionInfo) -> Self {
        Self {
            entity1,
            entity2,
            normal: info.normal,
            depth: info.depth,
        }
    }

    /// Whether this contact references `entity`.
    #[inline]
    pub fn involves(&self, entity: hecs::Entity) -> bool {
        self.entity1 == entity || self.entity2 == entity
    }
}
