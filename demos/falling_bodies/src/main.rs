//! Drops a handful of bodies onto a static floor and logs where they settle.
//!
//!   cargo run --manifest-path demos/falling_bodies/Cargo.toml

use anyhow::{Context, Result};
use glam::{Quat, Vec3};
use rein_physics::{
    Collider, ColliderShape, ComponentKind, PhysicsConfig, PhysicsWorld, RigidBody, Transform,
};
use tracing::info;

const FRAME_TIME: f64 = 1.0 / 60.0;
const FRAMES: usize = 240;

fn spawn_body(
    world: &mut hecs::World,
    physics: &mut PhysicsWorld,
    transform: Transform,
    shape: ColliderShape,
    restitution: f32,
) -> Result<hecs::Entity> {
    let collider = Collider::new(shape).context("invalid collider shape")?;
    let entity = world.spawn((
        transform,
        RigidBody {
            mass: 1.0,
            restitution,
        },
        collider,
    ));
    physics.on_entity_component_added(entity, ComponentKind::RigidBody);
    Ok(entity)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .without_time()
        .init();

    let mut world = hecs::World::new();
    let mut physics = PhysicsWorld::new(PhysicsConfig::default())?;
    physics.init();

    // Floor: top face at y = 0
    world.spawn((
        Transform::from_position(Vec3::new(0.0, -0.5, 0.0)),
        Collider::new(ColliderShape::aabb(Vec3::new(10.0, 0.5, 10.0)))?,
    ));

    let bodies = [
        (
            "sphere",
            spawn_body(
                &mut world,
                &mut physics,
                Transform::from_position(Vec3::new(-2.0, 4.0, 0.0)),
                ColliderShape::sphere(0.5),
                0.6,
            )?,
        ),
        (
            "box",
            spawn_body(
                &mut world,
                &mut physics,
                // Tilted by its transform; the collider stays axis-aligned locally
                Transform::from_position_rotation(
                    Vec3::new(0.0, 6.0, 0.0),
                    Quat::from_rotation_y(0.4) * Quat::from_rotation_x(0.3),
                ),
                ColliderShape::obb(Vec3::splat(0.5), Quat::IDENTITY),
                0.1,
            )?,
        ),
        (
            "capsule",
            spawn_body(
                &mut world,
                &mut physics,
                Transform::from_position(Vec3::new(2.0, 5.0, 0.0)),
                ColliderShape::capsule(0.5, 0.3),
                0.2,
            )?,
        ),
    ];

    if let Some(state) = physics.rigidbody_state_mut(bodies[0].1) {
        state.velocity = Vec3::new(1.0, 0.0, 0.0);
    }

    for frame in 0..FRAMES {
        physics.update(&mut world, FRAME_TIME);

        if frame % 30 == 0 {
            for (name, entity) in &bodies {
                let transform = world.get::<&Transform>(*entity)?;
                info!(
                    frame,
                    body = *name,
                    position = ?transform.position,
                    contacts = physics.narrowphase_collisions().len(),
                );
            }
        }
    }

    let hits = physics.raycast(&world, Vec3::new(0.0, 10.0, 0.0), -Vec3::Y, 0.0, 20.0);
    for hit in &hits {
        info!(entity = ?hit.entity, distance = hit.distance, normal = ?hit.normal, "ray hit");
    }

    physics.destroy();
    Ok(())
}
