//! Rigid body state and semi-implicit Euler integration.

use std::collections::HashMap;

use glam::Vec3;

use crate::ecs::components::physics::RigidBody;
use crate::ecs::components::transform::Transform;

/// Kinematic state the physics world keeps for each rigid body.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RigidbodyState {
    pub acceleration: Vec3,
    pub velocity: Vec3,
}

/// Rigid body states keyed by entity.
pub type RigidbodyStates = HashMap<hecs::Entity, RigidbodyState>;

/// Advance every tracked body by one sub-step of `dt` seconds.
///
/// Acceleration is reset to `gravity`, velocity is integrated first and the
/// position then moves with the updated velocity. Bodies without a
/// [`Transform`] keep their velocity but have nothing to move.
pub fn integrate(world: &mut hecs::World, states: &mut RigidbodyStates, gravity: Vec3, dt: f32) {
    for (entity, state) in states.iter_mut() {
        state.acceleration = gravity;
        state.velocity += state.acceleration * dt;

        if let Ok(mut transform) = world.get::<&mut Transform>(*entity) {
            transform.position += state.velocity * dt;
        }
    }
}

/// Reconcile `states` with the [`RigidBody`] components present in `world`.
///
/// New bodies start at rest; entries for entities that lost their rigid body
/// (or no longer exist) are dropped. Returns the removed entities.
pub fn sync_states(world: &hecs::World, states: &mut RigidbodyStates) -> Vec<hecs::Entity> {
    let removed: Vec<hecs::Entity> = states
        .keys()
        .copied()
        .filter(|entity| world.get::<&RigidBody>(*entity).is_err())
        .collect();
    for entity in &removed {
        states.remove(entity);
    }

    for (entity, _) in world.query::<&RigidBody>().iter() {
        states.entry(entity).or_default();
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

    #[test]
    fn test_integrate_single_step() {
        let mut world = hecs::World::new();
        let entity = world.spawn((
            Transform::from_position(Vec3::new(0.0, 10.0, 0.0)),
            RigidBody::new(1.0),
        ));
        let mut states = RigidbodyStates::new();
        states.insert(entity, RigidbodyState::default());

        let dt = 0.5;
        integrate(&mut world, &mut states, GRAVITY, dt);

        let state = states[&entity];
        assert_eq!(state.acceleration, GRAVITY);
        assert_abs_diff_eq!(state.velocity.y, -9.81 * dt, epsilon = 1e-6);
        // Position uses the already updated velocity
        let transform = world.get::<&Transform>(entity).unwrap();
        assert_abs_diff_eq!(transform.position.y, 10.0 - 9.81 * dt * dt, epsilon = 1e-5);
    }

    #[test]
    fn test_untracked_bodies_do_not_move() {
        let mut world = hecs::World::new();
        let entity = world.spawn((Transform::identity(), RigidBody::new(1.0)));
        let mut states = RigidbodyStates::new();

        integrate(&mut world, &mut states, GRAVITY, 1.0 / 60.0);
        assert_eq!(world.get::<&Transform>(entity).unwrap().position, Vec3::ZERO);
    }

    #[test]
    fn test_body_without_transform_keeps_velocity() {
        let mut world = hecs::World::new();
        let entity = world.spawn((RigidBody::new(1.0),));
        let mut states = RigidbodyStates::new();
        states.insert(entity, RigidbodyState::default());

        integrate(&mut world, &mut states, GRAVITY, 1.0);
        assert_abs_diff_eq!(states[&entity].velocity.y, -9.81, epsilon = 1e-6);
    }

    #[test]
    fn test_sync_states() {
        let mut world = hecs::World::new();
        let body = world.spawn((RigidBody::new(1.0),));
        let stripped = world.spawn((RigidBody::new(1.0),));
        let despawned = world.spawn((RigidBody::new(1.0),));
        let static_only = world.spawn((Transform::identity(),));

        let mut states = RigidbodyStates::new();
        assert!(sync_states(&world, &mut states).is_empty());
        assert_eq!(states.len(), 3);
        assert!(!states.contains_key(&static_only));

        states.get_mut(&body).unwrap().velocity = Vec3::X;
        world.remove_one::<RigidBody>(stripped).unwrap();
        world.despawn(despawned).unwrap();

        let mut removed = sync_states(&world, &mut states);
        removed.sort();
        let mut expected = vec![stripped, despawned];
        expected.sort();
        assert_eq!(removed, expected);
        assert_eq!(states.len(), 1);
        // Existing state survives a sync
        assert_eq!(states[&body].velocity, Vec3::X);
    }
}
