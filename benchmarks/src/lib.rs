//! Shared setup helpers for rein-physics benchmarks.
//!
//! ## Running
//!
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench physics
//!
//! Filter by group:
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench physics -- broadphase

use glam::{Quat, Vec3};
use rein_physics::ecs::components::physics::{Collider, ColliderShape, RigidBody};
use rein_physics::ecs::components::transform::Transform;
use rein_physics::physics::{PhysicsConfig, PhysicsWorld};

// ---------------------------------------------------------------------------
// Basic scenes
// ---------------------------------------------------------------------------

fn grid_position(i: usize, cols: usize, spacing: f32) -> Vec3 {
    Vec3::new(
        (i % cols) as f32 * spacing,
        0.0,
        (i / cols) as f32 * spacing,
    )
}

fn columns(n: usize) -> usize {
    ((n as f32).sqrt().ceil() as usize).max(1)
}

/// Spawn `n` sphere bodies in a grid layout so neighbours overlap.
pub fn setup_sphere_world(n: usize) -> hecs::World {
    let mut world = hecs::World::new();
    let cols = columns(n);

    for i in 0..n {
        world.spawn((
            Transform::from_position(grid_position(i, cols, 1.5)),
            RigidBody::new(1.0),
            Collider {
                shape: ColliderShape::sphere(1.0),
            },
        ));
    }
    world
}

/// Mixed scene cycling through every shape variant; boxes are static.
pub fn setup_mixed_world(n: usize) -> hecs::World {
    let mut world = hecs::World::new();
    let cols = columns(n);

    for i in 0..n {
        let transform = Transform::from_position(grid_position(i, cols, 1.5));
        match i % 4 {
            0 => {
                world.spawn((
                    transform,
                    RigidBody::new(1.0),
                    Collider {
                        shape: ColliderShape::sphere(1.0),
                    },
                ));
            }
            1 => {
                world.spawn((
                    transform,
                    Collider {
                        shape: ColliderShape::aabb(Vec3::splat(0.5)),
                    },
                ));
            }
            2 => {
                world.spawn((
                    transform,
                    Collider {
                        shape: ColliderShape::obb(Vec3::splat(0.5), Quat::from_rotation_y(0.6)),
                    },
                ));
            }
            _ => {
                world.spawn((
                    transform,
                    RigidBody::new(1.0),
                    Collider {
                        shape: ColliderShape::capsule(0.5, 0.4),
                    },
                ));
            }
        }
    }
    world
}

/// Sparse scene: bodies spread far apart (no overlaps).
pub fn setup_sparse_world(n: usize) -> hecs::World {
    let mut world = hecs::World::new();
    let cols = columns(n);

    for i in 0..n {
        world.spawn((
            Transform::from_position(grid_position(i, cols, 10.0)),
            RigidBody::new(1.0),
            Collider {
                shape: ColliderShape::sphere(0.5),
            },
        ));
    }
    world
}

fn running_physics(world: &hecs::World) -> PhysicsWorld {
    let mut physics =
        PhysicsWorld::new(PhysicsConfig::default()).expect("default physics config");
    physics.init();
    physics.sync_rigidbodies(world);
    physics
}

/// Ground plane + `n` bodies above it (spheres, capsules and boxes).
pub fn setup_scene(n: usize) -> (hecs::World, PhysicsWorld) {
    let mut world = hecs::World::new();

    world.spawn((
        Transform::from_position(Vec3::new(0.0, -0.5, 0.0)),
        Collider {
            shape: ColliderShape::aabb(Vec3::new(100.0, 0.5, 100.0)),
        },
    ));

    let cols = columns(n);
    for i in 0..n {
        let x = (i % cols) as f32 * 2.0 - (cols as f32);
        let z = (i / cols) as f32 * 2.0 - (cols as f32);
        let y = 1.0 + (i % 5) as f32 * 1.5;
        let shape = match i % 3 {
            0 => ColliderShape::sphere(0.5),
            1 => ColliderShape::capsule(0.3, 0.3),
            _ => ColliderShape::obb(Vec3::splat(0.4), Quat::from_rotation_x(0.3)),
        };

        world.spawn((
            Transform::from_position(Vec3::new(x, y, z)),
            RigidBody::new(1.0),
            Collider { shape },
        ));
    }

    let physics = running_physics(&world);
    (world, physics)
}

// ---------------------------------------------------------------------------
// Mass physics scenario (mirrors the falling_bodies demo)
// ---------------------------------------------------------------------------

const SPAWN_RADIUS: f32 = 8.0;
const SPAWN_HEIGHT: f32 = 15.0;

/// Spawn a single physics object at a deterministic position.
pub fn spawn_object(world: &mut hecs::World, index: usize) -> hecs::Entity {
    let angle = (index * 137) as f32 * 0.01;
    let r = SPAWN_RADIUS * (((index * 73 + 17) % 100) as f32 / 100.0).sqrt();
    let height_jitter = (index % 5) as f32 * 0.6;
    let pos = Vec3::new(
        r * angle.cos(),
        SPAWN_HEIGHT + height_jitter,
        r * angle.sin(),
    );

    let shape = if index % 2 == 0 {
        ColliderShape::sphere(0.4)
    } else {
        ColliderShape::obb(Vec3::splat(0.4), Quat::from_rotation_y(angle))
    };

    world.spawn((
        Transform::from_position(pos),
        RigidBody::new(1.0),
        Collider { shape },
    ))
}

/// Ground + `initial` pre-existing falling bodies.
pub fn setup_mass_scene(initial: usize) -> (hecs::World, PhysicsWorld) {
    let mut world = hecs::World::new();

    world.spawn((
        Transform::from_position(Vec3::new(0.0, -5.0, 0.0)),
        Collider {
            shape: ColliderShape::aabb(Vec3::new(20.0, 5.0, 20.0)),
        },
    ));

    for i in 0..initial {
        spawn_object(&mut world, i);
    }

    let physics = running_physics(&world);
    (world, physics)
}

/// Run `frames` frames, spawning `spawn_per_frame` objects each frame + physics update.
pub fn run_mass_physics(
    world: &mut hecs::World,
    physics: &mut PhysicsWorld,
    frames: usize,
    spawn_per_frame: usize,
    start_index: usize,
) {
    let mut idx = start_index;
    for _ in 0..frames {
        for _ in 0..spawn_per_frame {
            let entity = spawn_object(world, idx);
            physics.on_entity_component_added(entity, rein_physics::ComponentKind::RigidBody);
            idx += 1;
        }
        physics.update(world, 1.0 / 60.0);
    }
}
