//! Collision response: positional correction and velocity impulses.
//!
//! Each contact pushes its two entities apart along the normal and removes
//! the approaching part of their relative velocity. Both are split by
//! inverse mass; entities without a tracked rigid body never move.

use glam::Vec3;

use crate::ecs::components::physics::RigidBody;
use crate::ecs::components::transform::Transform;

use super::contact::NarrowphaseCollision;
use super::rigid_body::RigidbodyStates;

/// Fraction of the penetration removed per step.
pub const POSITION_CORRECTION_PERCENT: f32 = 0.8;
/// Penetration left uncorrected to avoid jitter between resting bodies.
pub const PENETRATION_SLOP: f32 = 0.005;

/// Per-entity response parameters.
#[derive(Debug, Clone, Copy)]
struct BodyResponse {
    inverse_mass: f32,
    restitution: f32,
}

fn body_response(
    world: &hecs::World,
    states: &RigidbodyStates,
    entity: hecs::Entity,
) -> BodyResponse {
    let body = world.get::<&RigidBody>(entity).ok().map(|rb| *rb);
    let tracked = states.contains_key(&entity);
    BodyResponse {
        inverse_mass: match body {
            Some(rb) if tracked => rb.inverse_mass(),
            _ => 0.0,
        },
        restitution: body.map_or(0.0, |rb| rb.restitution),
    }
}

/// Apply the response for every contact, in order.
pub fn resolve_collisions(
    world: &mut hecs::World,
    states: &mut RigidbodyStates,
    collisions: &[NarrowphaseCollision],
) {
    for collision in collisions {
        resolve_collision(world, states, collision);
    }
}

fn resolve_collision(
    world: &mut hecs::World,
    states: &mut RigidbodyStates,
    collision: &NarrowphaseCollision,
) {
    let body1 = body_response(world, states, collision.entity1);
    let body2 = body_response(world, states, collision.entity2);
    let inverse_mass_sum = body1.inverse_mass + body2.inverse_mass;
    if inverse_mass_sum <= 0.0 {
        return;
    }

    let normal = collision.normal;

    let correction = normal
        * ((collision.depth - PENETRATION_SLOP).max(0.0) * POSITION_CORRECTION_PERCENT
            / inverse_mass_sum);
    translate(world, collision.entity1, -correction * body1.inverse_mass);
    translate(world, collision.entity2, correction * body2.inverse_mass);

    let velocity = |entity: hecs::Entity| states.get(&entity).map_or(Vec3::ZERO, |s| s.velocity);
    let approach = (velocity(collision.entity2) - velocity(collision.entity1)).dot(normal);
    // Already separating
    if approach >= 0.0 {
        return;
    }

    let restitution = 0.5 * (body1.restitution + body2.restitution);
    let impulse = normal * (-(1.0 + restitution) * approach / inverse_mass_sum);
    if let Some(state) = states.get_mut(&collision.entity1) {
        state.velocity -= impulse * body1.inverse_mass;
    }
    if let Some(state) = states.get_mut(&collision.entity2) {
        state.velocity += impulse * body2.inverse_mass;
    }
}

fn translate(world: &mut hecs::World, entity: hecs::Entity, offset: Vec3) {
    if offset == Vec3::ZERO {
        return;
    }
    if let Ok(mut transform) = world.get::<&mut Transform>(entity) {
        transform.position += offset;
    }
}
