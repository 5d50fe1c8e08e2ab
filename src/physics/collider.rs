//! Collider shape support functions for collision detection.

use glam::{Mat3, Quat, Vec3};

use crate::ecs::components::physics::{Collider, ColliderShape};
use crate::ecs::components::transform::Transform;

use super::geometry::direction_or_fallback;

/// Axis-aligned bounding volume computed per entity for the broadphase.
///
/// Rebuilt every step from the entity's shape and transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityAabb {
    /// Center of the box.
    pub position: Vec3,
    /// Full extent along each axis.
    pub size: Vec3,
}

impl EntityAabb {
    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        Self {
            position: (min + max) * 0.5,
            size: max - min,
        }
    }

    #[inline]
    pub fn min(&self) -> Vec3 {
        self.position - self.size * 0.5
    }

    #[inline]
    pub fn max(&self) -> Vec3 {
        self.position + self.size * 0.5
    }

    /// Test whether two boxes overlap on all three axes. Touching counts.
    #[inline]
    pub fn overlaps(&self, other: &EntityAabb) -> bool {
        let (min_a, max_a) = (self.min(), self.max());
        let (min_b, max_b) = (other.min(), other.max());
        min_a.x <= max_b.x
            && max_a.x >= min_b.x
            && min_a.y <= max_b.y
            && max_a.y >= min_b.y
            && min_a.z <= max_b.z
            && max_a.z >= min_b.z
    }
}

impl ColliderShape {
    /// Geometric center, used to seed GJK and to orient normals.
    pub fn center(&self) -> Vec3 {
        match *self {
            ColliderShape::Sphere { center, .. } => center,
            ColliderShape::Aabb { min, max } => (min + max) * 0.5,
            ColliderShape::Obb { center, .. } => center,
            ColliderShape::Capsule { base, tip, .. } => (base + tip) * 0.5,
        }
    }

    /// GJK/EPA support function. Returns the farthest point in the given direction.
    ///
    /// A zero direction falls back to +X instead of producing NaNs.
    #[inline]
    pub fn farthest_point(&self, direction: Vec3) -> Vec3 {
        match *self {
            ColliderShape::Sphere { center, radius } => {
                center + direction_or_fallback(direction) * radius
            }
            ColliderShape::Aabb { min, max } => Vec3::new(
                if direction.x >= 0.0 { max.x } else { min.x },
                if direction.y >= 0.0 { max.y } else { min.y },
                if direction.z >= 0.0 { max.z } else { min.z },
            ),
            ColliderShape::Obb {
                center,
                half_extents,
                rotation,
            } => {
                // Pick the corner in local space, then rotate it back
                let local_dir = rotation.inverse() * direction;
                let corner = Vec3::new(
                    if local_dir.x >= 0.0 { half_extents.x } else { -half_extents.x },
                    if local_dir.y >= 0.0 { half_extents.y } else { -half_extents.y },
                    if local_dir.z >= 0.0 { half_extents.z } else { -half_extents.z },
                );
                center + rotation * corner
            }
            ColliderShape::Capsule { base, tip, radius } => {
                let endpoint = if base.dot(direction) > tip.dot(direction) {
                    base
                } else {
                    tip
                };
                endpoint + direction_or_fallback(direction) * radius
            }
        }
    }

    /// Support point of the shape with its rounding radius stripped.
    ///
    /// Spheres shrink to their center and capsules to their segment; boxes
    /// have no rounding. `farthest_point(d)` is `core_point(d)` pushed out by
    /// [`margin`](Self::margin) along the unit direction.
    #[inline]
    pub fn core_point(&self, direction: Vec3) -> Vec3 {
        match *self {
            ColliderShape::Sphere { center, .. } => center,
            ColliderShape::Capsule { base, tip, .. } => {
                if base.dot(direction) > tip.dot(direction) {
                    base
                } else {
                    tip
                }
            }
            ColliderShape::Aabb { .. } | ColliderShape::Obb { .. } => {
                self.farthest_point(direction)
            }
        }
    }

    /// Rounding radius around [`core_point`](Self::core_point).
    #[inline]
    pub fn margin(&self) -> f32 {
        match *self {
            ColliderShape::Sphere { radius, .. } | ColliderShape::Capsule { radius, .. } => radius,
            ColliderShape::Aabb { .. } | ColliderShape::Obb { .. } => 0.0,
        }
    }

    /// Move a local-space shape into world space.
    ///
    /// Radii scale by the largest scale factor. AABBs stay axis-aligned and
    /// grow to enclose their rotated corners. OBB axes are scaled in the
    /// transform's frame, after the box's own rotation.
    pub fn transformed(&self, transform: &Transform) -> ColliderShape {
        match *self {
            ColliderShape::Sphere { center, radius } => ColliderShape::Sphere {
                center: transform.transform_point(center),
                radius: radius * transform.max_scale(),
            },
            ColliderShape::Aabb { min, max } => {
                let mut world_min = Vec3::splat(f32::MAX);
                let mut world_max = Vec3::splat(f32::MIN);
                for i in 0..8 {
                    let corner = Vec3::new(
                        if i & 1 == 0 { min.x } else { max.x },
                        if i & 2 == 0 { min.y } else { max.y },
                        if i & 4 == 0 { min.z } else { max.z },
                    );
                    let p = transform.transform_point(corner);
                    world_min = world_min.min(p);
                    world_max = world_max.max(p);
                }
                ColliderShape::Aabb {
                    min: world_min,
                    max: world_max,
                }
            }
            ColliderShape::Obb {
                center,
                half_extents,
                rotation,
            } => {
                let (axis_scale, orientation) = scaled_box_frame(rotation, transform.scale);
                ColliderShape::Obb {
                    center: transform.transform_point(center),
                    half_extents: half_extents * axis_scale,
                    rotation: (transform.rotation * orientation).normalize(),
                }
            }
            ColliderShape::Capsule { base, tip, radius } => ColliderShape::Capsule {
                base: transform.transform_point(base),
                tip: transform.transform_point(tip),
                radius: radius * transform.max_scale(),
            },
        }
    }

    /// Compute the axis-aligned bounds of this (world-space) shape.
    #[inline]
    pub fn bounding_box(&self) -> EntityAabb {
        match *self {
            ColliderShape::Sphere { center, radius } => EntityAabb {
                position: center,
                size: Vec3::splat(radius * 2.0),
            },
            ColliderShape::Aabb { min, max } => EntityAabb::from_min_max(min, max),
            ColliderShape::Obb {
                center,
                half_extents,
                rotation,
            } => {
                // Project the box axes onto each world axis
                let basis = Mat3::from_quat(rotation);
                let extent = basis.x_axis.abs() * half_extents.x
                    + basis.y_axis.abs() * half_extents.y
                    + basis.z_axis.abs() * half_extents.z;
                EntityAabb {
                    position: center,
                    size: extent * 2.0,
                }
            }
            ColliderShape::Capsule { base, tip, radius } => EntityAabb::from_min_max(
                base.min(tip) - Vec3::splat(radius),
                base.max(tip) + Vec3::splat(radius),
            ),
        }
    }
}

/// Apply a (possibly non-uniform) `scale` to box axes oriented by `rotation`.
///
/// Returns the length each box axis is stretched by and the orientation of
/// the stretched axes. Scaling a rotated box along other axes shears it; the
/// stretched axes are re-orthogonalized from the first one.
fn scaled_box_frame(rotation: Quat, scale: Vec3) -> (Vec3, Quat) {
    let axes = [Vec3::X, Vec3::Y, Vec3::Z].map(|axis| scale * (rotation * axis));
    let stretch = Vec3::new(axes[0].length(), axes[1].length(), axes[2].length());

    let x = axes[0].try_normalize().unwrap_or(rotation * Vec3::X);
    let y = (axes[1] - x * x.dot(axes[1]))
        .try_normalize()
        .unwrap_or_else(|| x.any_orthonormal_vector());
    let z = x.cross(y);

    (stretch, Quat::from_mat3(&Mat3::from_cols(x, y, z)))
}

/// World-space shape of an entity's collider.
///
/// Entities without a [`Transform`] use their shape as-is.
pub fn world_shape(world: &hecs::World, entity: hecs::Entity) -> Option<ColliderShape> {
    let collider = world.get::<&Collider>(entity).ok()?;
    let transform = world.get::<&Transform>(entity).ok();
    Some(collider.placed(transform.as_deref()))
}

impl Collider {
    /// The collider's shape placed by `transform`, or as stored without one.
    #[inline]
    pub fn placed(&self, transform: Option<&Transform>) -> ColliderShape {
        match transform {
            Some(transform) => self.shape.transformed(transform),
            None => self.shape,
        }
    }
}
