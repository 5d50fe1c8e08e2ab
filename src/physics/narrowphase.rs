//! Narrowphase collision detection.
//!
//! Every pair of shape variants has a closed-form test. Cases a closed form
//! cannot resolve (a capsule axis passing through a box, touching capsule
//! axes, a sphere centered on a capsule axis) defer to GJK/EPA, which is also
//! exposed directly through [`intersect_generic`].

use std::cmp::Ordering;

use glam::{Mat3, Quat, Vec3};

use crate::ecs::components::physics::ColliderShape;

use super::broadphase::BroadphaseCollision;
use super::collider::world_shape;
use super::contact::{IntersectionInfo, NarrowphaseCollision};
use super::epa::epa;
use super::geometry::{
    closest_point_on_segment, closest_points_segment_segment, slab_interval, DIRECTION_EPSILON,
};
use super::gjk::gjk;

/// Iteration caps and tolerance for the GJK/EPA path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NarrowphaseConfig {
    /// GJK iteration cap. Default: 64.
    pub gjk_max_iterations: u32,
    /// EPA iteration cap. Default: 128.
    pub epa_max_iterations: u32,
    /// EPA convergence tolerance, relative to the size of the Minkowski
    /// difference. Default: 1e-5.
    pub epa_tolerance: f32,
}

impl Default for NarrowphaseConfig {
    fn default() -> Self {
        Self {
            gjk_max_iterations: 64,
            epa_max_iterations: 128,
            epa_tolerance: 1e-5,
        }
    }
}

/// Outcome of a closed-form test that may defer to GJK/EPA.
enum ClosedForm {
    Hit(IntersectionInfo),
    Miss,
    Degenerate,
}

/// Test two world-space shapes for intersection.
///
/// The normal points from `shape1` toward `shape2`. Swapping the arguments
/// yields the same depth and the negated normal. Touching shapes do not
/// intersect.
pub fn intersect(
    shape1: &ColliderShape,
    shape2: &ColliderShape,
    config: &NarrowphaseConfig,
) -> Option<IntersectionInfo> {
    if canonical_order(shape1, shape2) == Ordering::Greater {
        dispatch(shape2, shape1, config).map(IntersectionInfo::flipped)
    } else {
        dispatch(shape1, shape2, config)
    }
}

/// Same as [`intersect`] but always runs GJK followed by EPA.
pub fn intersect_generic(
    shape1: &ColliderShape,
    shape2: &ColliderShape,
    config: &NarrowphaseConfig,
) -> Option<IntersectionInfo> {
    if canonical_order(shape1, shape2) == Ordering::Greater {
        gjk_epa(shape2, shape1, config).map(IntersectionInfo::flipped)
    } else {
        gjk_epa(shape1, shape2, config)
    }
}

/// Run the exact test on every broadphase candidate, keeping the pairs that
/// intersect. Pairs whose entities lost their collider are skipped.
pub fn detect_collisions<'a>(
    world: &hecs::World,
    pairs: impl IntoIterator<Item = &'a BroadphaseCollision>,
    config: &NarrowphaseConfig,
) -> Vec<NarrowphaseCollision> {
    pairs
        .into_iter()
        .filter_map(|pair| {
            let shape1 = world_shape(world, pair.entity1())?;
            let shape2 = world_shape(world, pair.entity2())?;
            intersect(&shape1, &shape2, config)
                .map(|info| NarrowphaseCollision::new(pair.entity1(), pair.entity2(), info))
        })
        .collect()
}

fn gjk_epa(
    shape1: &ColliderShape,
    shape2: &ColliderShape,
    config: &NarrowphaseConfig,
) -> Option<IntersectionInfo> {
    let simplex = gjk(shape1, shape2, config.gjk_max_iterations)?;
    let info = epa(
        shape1,
        shape2,
        &simplex,
        config.epa_max_iterations,
        config.epa_tolerance,
    )?;
    // A zero-depth result is a touching contact
    (info.depth > 0.0).then_some(info)
}

fn variant_rank(shape: &ColliderShape) -> u8 {
    match shape {
        ColliderShape::Sphere { .. } => 0,
        ColliderShape::Aabb { .. } => 1,
        ColliderShape::Obb { .. } => 2,
        ColliderShape::Capsule { .. } => 3,
    }
}

fn shape_key(shape: &ColliderShape) -> [f32; 10] {
    let (first, second, rest) = match *shape {
        ColliderShape::Sphere { center, radius } => (center, Vec3::ZERO, [radius, 0.0, 0.0, 0.0]),
        ColliderShape::Aabb { min, max } => (min, max, [0.0; 4]),
        ColliderShape::Obb {
            center,
            half_extents,
            rotation,
        } => (center, half_extents, rotation.to_array()),
        ColliderShape::Capsule { base, tip, radius } => (base, tip, [radius, 0.0, 0.0, 0.0]),
    };

    let mut key = [0.0; 10];
    key[..3].copy_from_slice(&first.to_array());
    key[3..6].copy_from_slice(&second.to_array());
    key[6..].copy_from_slice(&rest);
    key
}

/// Total order over shapes used to pick which side of a pair is evaluated.
fn canonical_order(a: &ColliderShape, b: &ColliderShape) -> Ordering {
    variant_rank(a).cmp(&variant_rank(b)).then_with(|| {
        shape_key(a)
            .iter()
            .zip(shape_key(b).iter())
            .map(|(x, y)| x.total_cmp(y))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    })
}

/// Evaluate a pair whose first shape has the lower variant rank.
fn dispatch(
    shape1: &ColliderShape,
    shape2: &ColliderShape,
    config: &NarrowphaseConfig,
) -> Option<IntersectionInfo> {
    let outcome = match (*shape1, *shape2) {
        (
            ColliderShape::Sphere {
                center: center1,
                radius: radius1,
            },
            ColliderShape::Sphere {
                center: center2,
                radius: radius2,
            },
        ) => return sphere_sphere(center1, radius1, center2, radius2),
        (ColliderShape::Sphere { center, radius }, ColliderShape::Aabb { min, max }) => {
            return box_sphere(
                (min + max) * 0.5,
                (max - min) * 0.5,
                Quat::IDENTITY,
                center,
                radius,
            )
            .map(IntersectionInfo::flipped)
        }
        (
            ColliderShape::Sphere { center, radius },
            ColliderShape::Obb {
                center: box_center,
                half_extents,
                rotation,
            },
        ) => {
            return box_sphere(box_center, half_extents, rotation, center, radius)
                .map(IntersectionInfo::flipped)
        }
        (
            ColliderShape::Sphere { center, radius },
            ColliderShape::Capsule {
                base,
                tip,
                radius: capsule_radius,
            },
        ) => sphere_capsule(center, radius, base, tip, capsule_radius),
        (
            ColliderShape::Aabb {
                min: min1,
                max: max1,
            },
            ColliderShape::Aabb {
                min: min2,
                max: max2,
            },
        ) => return aabb_aabb(min1, max1, min2, max2),
        (
            ColliderShape::Aabb { min, max },
            ColliderShape::Obb {
                center,
                half_extents,
                rotation,
            },
        ) => {
            return box_box(
                (min + max) * 0.5,
                (max - min) * 0.5,
                Quat::IDENTITY,
                center,
                half_extents,
                rotation,
            )
        }
        (ColliderShape::Aabb { min, max }, ColliderShape::Capsule { base, tip, radius }) => {
            box_capsule(
                (min + max) * 0.5,
                (max - min) * 0.5,
                Quat::IDENTITY,
                base,
                tip,
                radius,
            )
        }
        (
            ColliderShape::Obb {
                center: center1,
                half_extents: half1,
                rotation: rotation1,
            },
            ColliderShape::Obb {
                center: center2,
                half_extents: half2,
                rotation: rotation2,
            },
        ) => return box_box(center1, half1, rotation1, center2, half2, rotation2),
        (
            ColliderShape::Obb {
                center,
                half_extents,
                rotation,
            },
            ColliderShape::Capsule { base, tip, radius },
        ) => box_capsule(center, half_extents, rotation, base, tip, radius),
        (
            ColliderShape::Capsule {
                base: base1,
                tip: tip1,
                radius: radius1,
            },
            ColliderShape::Capsule {
                base: base2,
                tip: tip2,
                radius: radius2,
            },
        ) => capsule_capsule(base1, tip1, radius1, base2, tip2, radius2),
        _ => ClosedForm::Degenerate,
    };

    match outcome {
        ClosedForm::Hit(info) => Some(info),
        ClosedForm::Miss => None,
        ClosedForm::Degenerate => gjk_epa(shape1, shape2, config),
    }
}

/// Sphere-sphere test. Concentric spheres report +Y.
pub fn sphere_sphere(
    center1: Vec3,
    radius1: f32,
    center2: Vec3,
    radius2: f32,
) -> Option<IntersectionInfo> {
    let diff = center2 - center1;
    let dist_sq = diff.length_squared();
    let min_dist = radius1 + radius2;

    if dist_sq >= min_dist * min_dist {
        return None;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > 1e-6 { diff / dist } else { Vec3::Y };

    Some(IntersectionInfo {
        normal,
        depth: min_dist - dist,
    })
}

/// Box-sphere test. The normal points from the box toward the sphere.
///
/// A sphere centered inside the box is pushed out through the nearest face.
pub fn box_sphere(
    box_center: Vec3,
    half_extents: Vec3,
    rotation: Quat,
    sphere_center: Vec3,
    radius: f32,
) -> Option<IntersectionInfo> {
    let local = rotation.inverse() * (sphere_center - box_center);
    let delta = local - clamp_to_box(local, half_extents);
    let dist_sq = delta.length_squared();

    if dist_sq > DIRECTION_EPSILON {
        if dist_sq >= radius * radius {
            return None;
        }
        let dist = dist_sq.sqrt();
        return Some(IntersectionInfo {
            normal: rotation * (delta / dist),
            depth: radius - dist,
        });
    }

    let (normal, face_distance) = nearest_face(local, half_extents);
    let depth = face_distance + radius;
    (depth > 0.0).then(|| IntersectionInfo {
        normal: rotation * normal,
        depth,
    })
}

/// AABB-AABB test: the axis needing the smallest slide wins.
pub fn aabb_aabb(min1: Vec3, max1: Vec3, min2: Vec3, max2: Vec3) -> Option<IntersectionInfo> {
    let mut best: Option<IntersectionInfo> = None;

    for (axis, unit) in Vec3::AXES.iter().enumerate() {
        // Slide box 2 out toward +axis or -axis
        let positive = max1[axis] - min2[axis];
        let negative = max2[axis] - min1[axis];
        if positive <= 0.0 || negative <= 0.0 {
            return None;
        }

        let (normal, depth) = if positive <= negative {
            (*unit, positive)
        } else {
            (-*unit, negative)
        };
        if best.map_or(true, |b| depth < b.depth) {
            best = Some(IntersectionInfo { normal, depth });
        }
    }

    best
}

/// SAT (Separating Axis Theorem) test for two boxes.
pub fn box_box(
    center1: Vec3,
    half1: Vec3,
    rotation1: Quat,
    center2: Vec3,
    half2: Vec3,
    rotation2: Quat,
) -> Option<IntersectionInfo> {
    let axes1 = box_axes(rotation1);
    let axes2 = box_axes(rotation2);
    let t = center2 - center1;

    // 3 face normals per box, then the 9 edge-edge cross products
    let face_axes = axes1.iter().chain(axes2.iter()).copied();
    let edge_axes = axes1
        .iter()
        .flat_map(|a| axes2.iter().map(move |b| a.cross(*b)))
        .filter_map(|axis| {
            let len = axis.length();
            // Parallel edges
            (len >= 1e-6).then(|| axis / len)
        });

    let mut best = IntersectionInfo {
        normal: Vec3::X,
        depth: f32::MAX,
    };
    for axis in face_axes.chain(edge_axes) {
        let overlap = sat_overlap(axis, &axes1, half1, &axes2, half2, t)?;
        if overlap < best.depth {
            best = IntersectionInfo {
                normal: axis,
                depth: overlap,
            };
        }
    }

    if best.normal.dot(t) < 0.0 {
        best.normal = -best.normal;
    }
    Some(best)
}

fn box_axes(rotation: Quat) -> [Vec3; 3] {
    let m = Mat3::from_quat(rotation);
    [m.x_axis, m.y_axis, m.z_axis]
}

/// Overlap of both boxes projected on `axis`; `None` when it separates them.
fn sat_overlap(
    axis: Vec3,
    axes1: &[Vec3; 3],
    half1: Vec3,
    axes2: &[Vec3; 3],
    half2: Vec3,
    t: Vec3,
) -> Option<f32> {
    let proj1: f32 = (0..3).map(|i| half1[i] * axes1[i].dot(axis).abs()).sum();
    let proj2: f32 = (0..3).map(|i| half2[i] * axes2[i].dot(axis).abs()).sum();
    let overlap = proj1 + proj2 - t.dot(axis).abs();
    (overlap > 0.0).then_some(overlap)
}

fn sphere_capsule(
    center: Vec3,
    radius: f32,
    base: Vec3,
    tip: Vec3,
    capsule_radius: f32,
) -> ClosedForm {
    let closest = closest_point_on_segment(center, base, tip);
    rounded_contact(center, closest, radius, capsule_radius)
}

fn capsule_capsule(
    base1: Vec3,
    tip1: Vec3,
    radius1: f32,
    base2: Vec3,
    tip2: Vec3,
    radius2: f32,
) -> ClosedForm {
    let (on_first, on_second) = closest_points_segment_segment(base1, tip1, base2, tip2);
    rounded_contact(on_first, on_second, radius1, radius2)
}

/// Contact between two spheres placed at the closest core points.
///
/// Coincident core points have no meaningful direction.
fn rounded_contact(point1: Vec3, point2: Vec3, radius1: f32, radius2: f32) -> ClosedForm {
    let dist_sq = (point2 - point1).length_squared();
    let radii = radius1 + radius2;
    if dist_sq >= radii * radii {
        return ClosedForm::Miss;
    }
    if dist_sq <= DIRECTION_EPSILON {
        return ClosedForm::Degenerate;
    }
    match sphere_sphere(point1, radius1, point2, radius2) {
        Some(info) => ClosedForm::Hit(info),
        None => ClosedForm::Miss,
    }
}

/// Box-capsule test in the box's local frame. The normal points from the box
/// toward the capsule.
fn box_capsule(
    box_center: Vec3,
    half_extents: Vec3,
    rotation: Quat,
    base: Vec3,
    tip: Vec3,
    radius: f32,
) -> ClosedForm {
    let inverse = rotation.inverse();
    let p0 = inverse * (base - box_center);
    let p1 = inverse * (tip - box_center);

    if slab_interval(p0, p1 - p0, half_extents, 0.0, 1.0).is_some() {
        return ClosedForm::Degenerate;
    }

    // Outside the box the closest pair involves an endpoint or a box edge
    let endpoints = [p0, p1]
        .into_iter()
        .map(|p| (p, clamp_to_box(p, half_extents)));
    let edges = box_edges(half_extents)
        .into_iter()
        .map(|(start, end)| closest_points_segment_segment(p0, p1, start, end));
    let closest = endpoints.chain(edges).min_by(|a, b| {
        (a.0 - a.1)
            .length_squared()
            .total_cmp(&(b.0 - b.1).length_squared())
    });
    let Some((on_segment, on_box)) = closest else {
        return ClosedForm::Degenerate;
    };

    let delta = on_segment - on_box;
    let dist_sq = delta.length_squared();
    if dist_sq >= radius * radius {
        return ClosedForm::Miss;
    }
    if dist_sq <= DIRECTION_EPSILON {
        return ClosedForm::Degenerate;
    }

    let dist = dist_sq.sqrt();
    ClosedForm::Hit(IntersectionInfo {
        normal: rotation * (delta / dist),
        depth: radius - dist,
    })
}

#[inline]
fn clamp_to_box(point: Vec3, half_extents: Vec3) -> Vec3 {
    point.max(-half_extents).min(half_extents)
}

/// Outward normal and distance of the box face nearest to an interior point.
fn nearest_face(local: Vec3, half_extents: Vec3) -> (Vec3, f32) {
    let mut best = (Vec3::X, f32::INFINITY);
    for (axis, unit) in Vec3::AXES.iter().enumerate() {
        let positive = half_extents[axis] - local[axis];
        let negative = half_extents[axis] + local[axis];
        if positive < best.1 {
            best = (*unit, positive);
        }
        if negative < best.1 {
            best = (-*unit, negative);
        }
    }
    best
}

/// The 12 edges of a box centered at the origin.
fn box_edges(half_extents: Vec3) -> [(Vec3, Vec3); 12] {
    const SIGNS: [(f32, f32); 4] = [(-1.0, -1.0), (-1.0, 1.0), (1.0, -1.0), (1.0, 1.0)];

    let mut edges = [(Vec3::ZERO, Vec3::ZERO); 12];
    for axis in 0..3 {
        let (u, v) = ((axis + 1) % 3, (axis + 2) % 3);
        for (k, &(su, sv)) in SIGNS.iter().enumerate() {
            let mut start = Vec3::ZERO;
            start[u] = su * half_extents[u];
            start[v] = sv * half_extents[v];
            let mut end = start;
            start[axis] = -half_extents[axis];
            end[axis] = half_extents[axis];
            edges[axis * 4 + k] = (start, end);
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::physics::Collider;
    use crate::ecs::components::transform::Transform;
    use crate::physics::test_util::{seeded, unit_vec3, vec3_in};
    use approx::assert_abs_diff_eq;
    use glam::EulerRot;
    use rand::Rng;

    fn config() -> NarrowphaseConfig {
        NarrowphaseConfig::default()
    }

    fn sphere_at(center: Vec3, radius: f32) -> ColliderShape {
        ColliderShape::Sphere { center, radius }
    }

    fn aabb_at(center: Vec3, half: Vec3) -> ColliderShape {
        ColliderShape::Aabb {
            min: center - half,
            max: center + half,
        }
    }

    #[test]
    fn test_sphere_sphere_intersection() {
        let a = sphere_at(Vec3::ZERO, 1.0);
        let b = sphere_at(Vec3::new(1.5, 0.0, 0.0), 1.0);

        let info = intersect(&a, &b, &config()).unwrap();
        assert!(info.normal.abs_diff_eq(Vec3::X, 1e-5));
        assert_abs_diff_eq!(info.depth, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_sphere_sphere_no_intersection() {
        let a = sphere_at(Vec3::ZERO, 1.0);
        for distance in [2.0, 3.0] {
            let b = sphere_at(Vec3::new(distance, 0.0, 0.0), 1.0);
            assert!(intersect(&a, &b, &config()).is_none());
            assert!(intersect_generic(&a, &b, &config()).is_none());
        }
    }

    #[test]
    fn test_concentric_spheres() {
        let a = sphere_at(Vec3::ZERO, 1.0);
        let b = sphere_at(Vec3::ZERO, 0.5);

        let info = intersect(&a, &b, &config()).unwrap();
        assert_abs_diff_eq!(info.normal.length(), 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(info.depth, 1.5, epsilon = 1e-5);
    }

    #[test]
    fn test_box_sphere_face() {
        let block = aabb_at(Vec3::ZERO, Vec3::ONE);
        let ball = sphere_at(Vec3::new(1.5, 0.0, 0.0), 1.0);

        let info = intersect(&block, &ball, &config()).unwrap();
        assert!(info.normal.abs_diff_eq(Vec3::X, 1e-5));
        assert_abs_diff_eq!(info.depth, 0.5, epsilon = 1e-5);

        let info = intersect(&ball, &block, &config()).unwrap();
        assert!(info.normal.abs_diff_eq(-Vec3::X, 1e-5));
    }

    #[test]
    fn test_box_sphere_center_inside() {
        let info = box_sphere(
            Vec3::ZERO,
            Vec3::ONE,
            Quat::IDENTITY,
            Vec3::new(0.8, 0.0, 0.0),
            0.5,
        )
        .unwrap();
        assert!(info.normal.abs_diff_eq(Vec3::X, 1e-5));
        assert_abs_diff_eq!(info.depth, 0.7, epsilon = 1e-5);
    }

    #[test]
    fn test_rotated_box_sphere() {
        let rotation = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let block = ColliderShape::Obb {
            center: Vec3::ZERO,
            half_extents: Vec3::new(2.0, 0.5, 0.5),
            rotation,
        };
        // The long axis now points along Y
        let ball = sphere_at(Vec3::new(0.0, 2.4, 0.0), 0.5);

        let info = intersect(&block, &ball, &config()).unwrap();
        assert!(info.normal.abs_diff_eq(Vec3::Y, 1e-4));
        assert_abs_diff_eq!(info.depth, 0.1, epsilon = 1e-4);
    }

    #[test]
    fn test_aabb_aabb() {
        let a = aabb_at(Vec3::ZERO, Vec3::ONE);
        let b = aabb_at(Vec3::new(1.5, 0.2, 0.0), Vec3::ONE);

        let info = intersect(&a, &b, &config()).unwrap();
        assert!(info.normal.abs_diff_eq(Vec3::X, 1e-6));
        assert_abs_diff_eq!(info.depth, 0.5, epsilon = 1e-6);

        let apart = aabb_at(Vec3::new(2.0, 0.0, 0.0), Vec3::ONE);
        assert!(intersect(&a, &apart, &config()).is_none());
    }

    #[test]
    fn test_aabb_obb_sat() {
        let a = aabb_at(Vec3::ZERO, Vec3::ONE);
        let b = ColliderShape::Obb {
            center: Vec3::new(2.2, 0.0, 0.0),
            half_extents: Vec3::ONE,
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_4),
        };

        let info = intersect(&a, &b, &config()).unwrap();
        assert!(info.normal.abs_diff_eq(Vec3::X, 1e-4));
        assert_abs_diff_eq!(info.depth, 1.0 + 2.0f32.sqrt() - 2.2, epsilon = 1e-4);

        let far = ColliderShape::Obb {
            center: Vec3::new(2.5, 0.0, 0.0),
            half_extents: Vec3::ONE,
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_4),
        };
        assert!(intersect(&a, &far, &config()).is_none());
    }

    #[test]
    fn test_capsule_capsule_parallel() {
        let a = ColliderShape::capsule(1.0, 0.5);
        let b = ColliderShape::capsule(1.0, 0.5).transformed(&Transform::from_position(
            Vec3::new(0.8, 0.0, 0.0),
        ));

        let info = intersect(&a, &b, &config()).unwrap();
        assert!(info.normal.abs_diff_eq(Vec3::X, 1e-5));
        assert_abs_diff_eq!(info.depth, 0.2, epsilon = 1e-5);
    }

    #[test]
    fn test_box_capsule_near_edge() {
        let block = aabb_at(Vec3::ZERO, Vec3::ONE);
        let capsule = ColliderShape::Capsule {
            base: Vec3::new(0.0, 1.3, -2.0),
            tip: Vec3::new(0.0, 1.3, 2.0),
            radius: 0.5,
        };

        let info = intersect(&block, &capsule, &config()).unwrap();
        assert!(info.normal.abs_diff_eq(Vec3::Y, 1e-5));
        assert_abs_diff_eq!(info.depth, 0.2, epsilon = 1e-5);

        let above = ColliderShape::Capsule {
            base: Vec3::new(0.0, 1.6, -2.0),
            tip: Vec3::new(0.0, 1.6, 2.0),
            radius: 0.5,
        };
        assert!(intersect(&block, &above, &config()).is_none());
    }

    #[test]
    fn test_capsule_through_box_falls_back() {
        let block = aabb_at(Vec3::ZERO, Vec3::ONE);
        let capsule = ColliderShape::Capsule {
            base: Vec3::new(-2.0, 0.0, 0.0),
            tip: Vec3::new(2.0, 0.0, 0.0),
            radius: 0.25,
        };

        let info = intersect(&block, &capsule, &config()).unwrap();
        assert_abs_diff_eq!(info.depth, 1.25, epsilon = 1e-3);
        assert!(info.normal.x.abs() < 1e-3);

        let generic = intersect_generic(&block, &capsule, &config()).unwrap();
        assert_abs_diff_eq!(info.depth, generic.depth, epsilon = 1e-6);
    }

    #[test]
    fn test_intersect_is_commutative() {
        let tilt = Quat::from_euler(EulerRot::XYZ, 0.3, 0.5, 0.1);
        let shapes = [
            sphere_at(Vec3::new(0.3, 0.1, 0.0), 1.0),
            sphere_at(Vec3::new(1.2, 0.5, 0.2), 0.7),
            ColliderShape::Aabb {
                min: Vec3::new(-0.5, -0.5, -0.5),
                max: Vec3::new(0.8, 1.0, 0.6),
            },
            aabb_at(Vec3::new(1.3, -0.3, 0.0), Vec3::new(0.7, 0.7, 1.0)),
            ColliderShape::Obb {
                center: Vec3::new(0.9, 0.2, -0.3),
                half_extents: Vec3::new(0.6, 0.4, 0.5),
                rotation: tilt,
            },
            ColliderShape::Obb {
                center: Vec3::new(-0.4, 0.6, 0.4),
                half_extents: Vec3::new(0.3, 0.9, 0.3),
                rotation: tilt.inverse(),
            },
            ColliderShape::Capsule {
                base: Vec3::new(-1.0, 0.4, 0.0),
                tip: Vec3::new(1.0, 0.6, 0.3),
                radius: 0.4,
            },
            ColliderShape::Capsule {
                base: Vec3::new(0.5, -1.0, 0.2),
                tip: Vec3::new(0.6, 1.5, -0.1),
                radius: 0.3,
            },
        ];

        let mut hits = 0;
        for (i, a) in shapes.iter().enumerate() {
            for b in shapes.iter().skip(i + 1) {
                match (intersect(a, b, &config()), intersect(b, a, &config())) {
                    (None, None) => {}
                    (Some(ab), Some(ba)) => {
                        hits += 1;
                        assert_abs_diff_eq!(ab.depth, ba.depth, epsilon = 1e-6);
                        assert!(ab.normal.abs_diff_eq(-ba.normal, 1e-6));
                        assert_abs_diff_eq!(ab.normal.length(), 1.0, epsilon = 1e-4);
                        assert!(ab.depth >= 0.0);
                    }
                    other => panic!("asymmetric result for {:?} / {:?}: {:?}", a, b, other),
                }
            }
        }
        assert!(hits > 0);
    }

    #[test]
    fn test_closed_forms_agree_with_gjk_epa() {
        let pairs = [
            (
                sphere_at(Vec3::ZERO, 1.0),
                sphere_at(Vec3::new(1.5, 0.0, 0.0), 1.0),
            ),
            (
                sphere_at(Vec3::new(0.3, -0.2, 0.1), 0.8),
                sphere_at(Vec3::new(0.9, 0.6, -0.4), 0.6),
            ),
            (
                aabb_at(Vec3::ZERO, Vec3::ONE),
                sphere_at(Vec3::new(1.5, 0.2, 0.1), 1.0),
            ),
            (
                aabb_at(Vec3::ZERO, Vec3::ONE),
                aabb_at(Vec3::new(1.5, 0.2, 0.0), Vec3::ONE),
            ),
            (
                aabb_at(Vec3::ZERO, Vec3::ONE),
                ColliderShape::Obb {
                    center: Vec3::new(2.2, 0.0, 0.0),
                    half_extents: Vec3::ONE,
                    rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_4),
                },
            ),
            (
                ColliderShape::capsule(1.0, 0.5),
                ColliderShape::capsule(1.0, 0.5)
                    .transformed(&Transform::from_position(Vec3::new(0.8, 0.0, 0.0))),
            ),
            (
                sphere_at(Vec3::new(0.0, 0.3, 0.7), 0.5),
                ColliderShape::capsule(1.0, 0.5),
            ),
        ];

        for (a, b) in &pairs {
            let closed = intersect(a, b, &config()).unwrap();
            let generic = intersect_generic(a, b, &config()).unwrap();
            assert_abs_diff_eq!(closed.depth, generic.depth, epsilon = 1e-4);
            assert!(
                closed.normal.abs_diff_eq(generic.normal, 1e-4),
                "{:?} vs {:?}",
                closed,
                generic
            );
        }
    }

    #[test]
    fn test_sphere_sweep_agrees_with_gjk_epa() {
        let mut rng = seeded(11);
        let mut checked = 0;
        while checked < 400 {
            let r1 = rng.gen_range(0.1..2.0);
            let r2 = rng.gen_range(0.1..2.0);
            let distance = rng.gen_range(0.1..(r1 + r2));
            // Skip grazing pairs that fall inside the touching tolerance
            if r1 + r2 - distance < 1e-3 {
                continue;
            }
            let c1 = vec3_in(&mut rng, -5.0, 5.0);
            let a = sphere_at(c1, r1);
            let b = sphere_at(c1 + unit_vec3(&mut rng) * distance, r2);

            let closed = intersect(&a, &b, &config()).expect("closed form overlap");
            let generic = intersect_generic(&a, &b, &config())
                .unwrap_or_else(|| panic!("GJK/EPA missed {:?} / {:?}", a, b));
            assert_abs_diff_eq!(closed.depth, generic.depth, epsilon = 1e-4);
            assert!(
                closed.normal.abs_diff_eq(generic.normal, 1e-4),
                "{:?} vs {:?} for {:?} / {:?}",
                closed,
                generic,
                a,
                b
            );
            checked += 1;
        }
    }

    #[test]
    fn test_offset_spheres_through_gjk_epa() {
        // Off-axis pair that used to exhaust the GJK iteration cap
        let a = sphere_at(Vec3::new(0.405, -0.635, 2.797), 0.653);
        let b = sphere_at(Vec3::new(1.338, 0.136, 2.332), 1.264);
        let closed = intersect(&a, &b, &config()).unwrap();
        let generic = intersect_generic(&a, &b, &config()).expect("spheres overlap");
        assert_abs_diff_eq!(closed.depth, generic.depth, epsilon = 1e-4);
        assert!(closed.normal.abs_diff_eq(generic.normal, 1e-4));
    }

    #[test]
    fn test_sphere_nearly_on_capsule_axis() {
        // The sphere center sits within 1e-3 of the capsule segment
        let ball = sphere_at(Vec3::new(-0.254, -0.481, 0.353), 0.5);
        let capsule = ColliderShape::Capsule {
            base: Vec3::new(-1.487, -1.108, 0.563),
            tip: Vec3::new(2.037, 0.685, -0.039),
            radius: 0.2,
        };

        let info = intersect(&ball, &capsule, &config()).expect("sphere sits on the capsule axis");
        assert_abs_diff_eq!(info.depth, 0.7, epsilon = 1e-3);
        assert_abs_diff_eq!(info.normal.length(), 1.0, epsilon = 1e-5);

        let generic = intersect_generic(&ball, &capsule, &config()).expect("GJK/EPA overlap");
        assert_abs_diff_eq!(info.depth, generic.depth, epsilon = 1e-4);
    }

    #[test]
    fn test_box_edges() {
        let edges = box_edges(Vec3::new(1.0, 2.0, 3.0));
        for (start, end) in edges {
            let along = end - start;
            // Each edge is parallel to exactly one axis
            assert_eq!(along.cmpne(Vec3::ZERO).bitmask().count_ones(), 1);
            assert!(start.abs().abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1e-6));
            assert!(end.abs().abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1e-6));
        }
    }

    #[test]
    fn test_detect_collisions() {
        let mut world = hecs::World::new();
        let a = world.spawn((Transform::identity(), Collider::default()));
        let b = world.spawn((
            Transform::from_position(Vec3::new(0.8, 0.0, 0.0)),
            Collider::default(),
        ));
        let c = world.spawn((
            Transform::from_position(Vec3::new(5.0, 0.0, 0.0)),
            Collider::default(),
        ));

        let pairs = [
            BroadphaseCollision::new(a, b).unwrap(),
            BroadphaseCollision::new(a, c).unwrap(),
        ];
        let contacts = detect_collisions(&world, &pairs, &config());

        assert_eq!(contacts.len(), 1);
        assert!(contacts[0].involves(a) && contacts[0].involves(b));
        assert_abs_diff_eq!(contacts[0].depth, 0.2, epsilon = 1e-5);
    }
}
