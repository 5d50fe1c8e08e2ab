//! Broadphase collision detection using sort-and-sweep over entity AABBs.

use std::collections::BTreeSet;

use tracing::trace;

use crate::ecs::components::physics::Collider;
use crate::ecs::components::transform::Transform;

use super::collider::EntityAabb;

/// Unordered pair of distinct entities whose bounding boxes overlap.
///
/// The entities are stored in ascending order, so `(a, b)` and `(b, a)`
/// compare, hash and sort as the same pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BroadphaseCollision {
    entity1: hecs::Entity,
    entity2: hecs::Entity,
}

impl BroadphaseCollision {
    /// Build the canonical pair, or `None` for an entity paired with itself.
    pub fn new(a: hecs::Entity, b: hecs::Entity) -> Option<Self> {
        if a == b {
            return None;
        }
        Some(Self {
            entity1: a.min(b),
            entity2: a.max(b),
        })
    }

    #[inline]
    pub fn entity1(&self) -> hecs::Entity {
        self.entity1
    }

    #[inline]
    pub fn entity2(&self) -> hecs::Entity {
        self.entity2
    }

    #[inline]
    pub fn involves(&self, entity: hecs::Entity) -> bool {
        self.entity1 == entity || self.entity2 == entity
    }
}

/// Sort-and-sweep broadphase along the x axis.
///
/// Keeps its entry buffer between steps to avoid reallocating.
#[derive(Debug, Default)]
pub struct SweepAndPrune {
    entries: Vec<(hecs::Entity, EntityAabb)>,
}

impl SweepAndPrune {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find all pairs of collider entities whose AABBs overlap.
    ///
    /// Every collider takes part, with or without a rigid body; touching
    /// boxes count as overlapping.
    pub fn find_pairs(&mut self, world: &hecs::World) -> BTreeSet<BroadphaseCollision> {
        self.entries.clear();
        for (entity, (collider, transform)) in
            world.query::<(&Collider, Option<&Transform>)>().iter()
        {
            self.entries
                .push((entity, collider.placed(transform).bounding_box()));
        }

        self.entries.sort_by(|(entity_a, aabb_a), (entity_b, aabb_b)| {
            aabb_a
                .min()
                .x
                .total_cmp(&aabb_b.min().x)
                .then_with(|| entity_a.cmp(entity_b))
        });

        let mut pairs = BTreeSet::new();
        for (i, (entity_a, aabb_a)) in self.entries.iter().enumerate() {
            let max_x = aabb_a.max().x;
            for (entity_b, aabb_b) in &self.entries[i + 1..] {
                // Sorted by min x: nothing further along can overlap
                if aabb_b.min().x > max_x {
                    break;
                }
                if aabb_a.overlaps(aabb_b) {
                    pairs.extend(BroadphaseCollision::new(*entity_a, *entity_b));
                }
            }
        }

        trace!(
            entities = self.entries.len(),
            pairs = pairs.len(),
            "broadphase"
        );
        pairs
    }
}
