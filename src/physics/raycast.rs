//! Ray queries against collider shapes.
//!
//! A ray hits a shape where it enters it. Shapes the ray starts inside
//! report an entry point behind the origin, so they only show up when
//! `t_min` reaches back that far.

use glam::{Quat, Vec3};
use tracing::warn;

use crate::ecs::components::physics::{Collider, ColliderShape};
use crate::ecs::components::transform::Transform;

use super::geometry::{direction_or_fallback, slab_interval, DIRECTION_EPSILON};

/// A single ray hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastInfo {
    pub entity: hecs::Entity,
    /// Distance from the ray origin along the normalized direction.
    pub distance: f32,
    /// Outward surface normal at the hit point.
    pub normal: Vec3,
}

/// Cast a ray against every collider in `world`.
///
/// `direction` is normalized first; a zero direction hits nothing. Hits with
/// a distance in `[t_min, t_max]` are returned nearest first.
pub fn raycast(
    world: &hecs::World,
    origin: Vec3,
    direction: Vec3,
    t_min: f32,
    t_max: f32,
) -> Vec<RaycastInfo> {
    let direction = direction.normalize_or_zero();
    if direction == Vec3::ZERO {
        warn!("raycast with a zero-length direction");
        return Vec::new();
    }

    let mut hits: Vec<RaycastInfo> = world
        .query::<(&Collider, Option<&Transform>)>()
        .iter()
        .filter_map(|(entity, (collider, transform))| {
            let (distance, normal) = ray_shape(&collider.placed(transform), origin, direction)?;
            (distance >= t_min && distance <= t_max).then_some(RaycastInfo {
                entity,
                distance,
                normal,
            })
        })
        .collect();

    hits.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a.entity.cmp(&b.entity))
    });
    hits
}

/// Entry distance and outward normal of a ray against a world-space shape.
///
/// `direction` must be unit length.
pub fn ray_shape(shape: &ColliderShape, origin: Vec3, direction: Vec3) -> Option<(f32, Vec3)> {
    match *shape {
        ColliderShape::Sphere { center, radius } => ray_sphere(origin, direction, center, radius),
        ColliderShape::Aabb { min, max } => ray_box(
            origin,
            direction,
            (min + max) * 0.5,
            (max - min) * 0.5,
            Quat::IDENTITY,
        ),
        ColliderShape::Obb {
            center,
            half_extents,
            rotation,
        } => ray_box(origin, direction, center, half_extents, rotation),
        ColliderShape::Capsule { base, tip, radius } => {
            ray_capsule(origin, direction, base, tip, radius)
        }
    }
}

fn ray_sphere(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<(f32, Vec3)> {
    let offset = origin - center;
    let b = offset.dot(direction);
    let c = offset.length_squared() - radius * radius;
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }

    let t = -b - discriminant.sqrt();
    let normal = direction_or_fallback(origin + direction * t - center);
    Some((t, normal))
}

fn ray_box(
    origin: Vec3,
    direction: Vec3,
    center: Vec3,
    half_extents: Vec3,
    rotation: Quat,
) -> Option<(f32, Vec3)> {
    let inverse = rotation.inverse();
    let local_origin = inverse * (origin - center);
    let local_dir = inverse * direction;

    let (enter, _) = slab_interval(
        local_origin,
        local_dir,
        half_extents,
        f32::NEG_INFINITY,
        f32::INFINITY,
    )?;

    // The entry face is the one the hit point lies on
    let point = local_origin + local_dir * enter;
    let outside = point.abs() - half_extents;
    let axis = if outside.x >= outside.y && outside.x >= outside.z {
        0
    } else if outside.y >= outside.z {
        1
    } else {
        2
    };
    let sign = if local_dir[axis] != 0.0 {
        -local_dir[axis].signum()
    } else {
        point[axis].signum()
    };

    Some((enter, rotation * (Vec3::AXES[axis] * sign)))
}

fn ray_capsule(
    origin: Vec3,
    direction: Vec3,
    base: Vec3,
    tip: Vec3,
    radius: f32,
) -> Option<(f32, Vec3)> {
    let axis = tip - base;
    let axis_len_sq = axis.length_squared();

    // Side of the cylinder between the two cap centers
    let mut best: Option<(f32, Vec3)> = None;
    if axis_len_sq > DIRECTION_EPSILON {
        let offset = origin - base;
        let dir_along = direction.dot(axis) / axis_len_sq;
        let offset_along = offset.dot(axis) / axis_len_sq;
        // Components perpendicular to the axis
        let d = direction - axis * dir_along;
        let o = offset - axis * offset_along;

        let a = d.length_squared();
        if a > DIRECTION_EPSILON {
            let b = o.dot(d);
            let c = o.length_squared() - radius * radius;
            let discriminant = b * b - a * c;
            if discriminant >= 0.0 {
                let t = (-b - discriminant.sqrt()) / a;
                let along = offset_along + t * dir_along;
                if (0.0..=1.0).contains(&along) {
                    let normal = direction_or_fallback(o + d * t);
                    best = Some((t, normal));
                }
            }
        }
    }

    // The two end caps
    for cap in [base, tip] {
        if let Some(hit) = ray_sphere(origin, direction, cap, radius) {
            if best.map_or(true, |(t, _)| hit.0 < t) {
                best = Some(hit);
            }
        }
    }

    best
}
