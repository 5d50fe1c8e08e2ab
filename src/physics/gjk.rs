//! GJK over the Minkowski difference of two convex shapes.
//!
//! [`gjk`] answers the boolean intersection query and hands its enclosing
//! tetrahedron to EPA. [`closest_point`] is the distance variant, used to
//! polish penetration results for rounded shapes.

use std::ops::Index;

use glam::Vec3;
use tracing::warn;

use crate::ecs::components::physics::ColliderShape;

use super::geometry::direction_or_fallback;

/// Tolerance relative to the size of the Minkowski difference.
///
/// Every geometric test in the iteration (separation, edge and face regions)
/// is a signed distance compared against `GJK_TOLERANCE * scale`.
pub const GJK_TOLERANCE: f32 = 1e-5;

/// Squared sine of the angle below which a triangle is treated as a segment.
const FLAT_TRIANGLE_SIN_SQ: f32 = 1e-10;

/// A simplex used by the GJK algorithm (up to 4 vertices in 3D).
///
/// The newest point is always at index 0; pushing past capacity drops the
/// oldest point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Simplex {
    points: [Vec3; 4],
    len: usize,
}

impl Simplex {
    pub fn new() -> Self {
        Self {
            points: [Vec3::ZERO; 4],
            len: 0,
        }
    }

    /// Insert a point at the front, shifting the others back.
    pub fn push_front(&mut self, point: Vec3) {
        self.points = [point, self.points[0], self.points[1], self.points[2]];
        self.len = (self.len + 1).min(4);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn points(&self) -> &[Vec3] {
        &self.points[..self.len]
    }

    /// Replace the contents with `points` (newest first).
    fn set(&mut self, points: &[Vec3]) {
        debug_assert!(points.len() <= 4);
        self.points[..points.len()].copy_from_slice(points);
        self.len = points.len();
    }

    fn contains_near(&self, point: Vec3, tolerance: f32) -> bool {
        self.points()
            .iter()
            .any(|p| p.distance_squared(point) <= tolerance * tolerance)
    }
}

impl Default for Simplex {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<usize> for Simplex {
    type Output = Vec3;

    fn index(&self, index: usize) -> &Vec3 {
        &self.points()[index]
    }
}

/// Minkowski difference support function.
#[inline]
pub fn minkowski_support(shape1: &ColliderShape, shape2: &ColliderShape, direction: Vec3) -> Vec3 {
    shape1.farthest_point(direction) - shape2.farthest_point(-direction)
}

/// GJK intersection test. Returns the enclosing tetrahedron if the shapes
/// intersect, `None` otherwise.
///
/// Running out of iterations is reported as `None`. Touching shapes, and
/// overlaps shallower than the relative tolerance, do not intersect.
pub fn gjk(shape1: &ColliderShape, shape2: &ColliderShape, max_iterations: u32) -> Option<Simplex> {
    let mut direction = direction_or_fallback(shape2.center() - shape1.center());

    let first = minkowski_support(shape1, shape2, direction);
    let opposite = minkowski_support(shape1, shape2, -direction);
    let tolerance = GJK_TOLERANCE * first.length().max(opposite.length());

    let mut simplex = Simplex::new();
    simplex.push_front(first);

    // The first support lies on the boundary: an origin this close is touching
    let first_len = first.length();
    if first_len <= tolerance {
        return None;
    }
    direction = -first / first_len;

    for _ in 0..max_iterations {
        let support = minkowski_support(shape1, shape2, direction);
        if support.dot(direction) <= tolerance {
            return None;
        }
        simplex.push_front(support);

        if next_simplex(&mut simplex, &mut direction, tolerance) {
            return Some(simplex);
        }
        if direction == Vec3::ZERO {
            return None;
        }
    }

    if max_iterations > 0 {
        warn!(max_iterations, "GJK hit its iteration cap, reporting no intersection");
    }
    None
}

/// Process the simplex and update the (unit) search direction.
/// Returns true if the origin is contained in the simplex.
fn next_simplex(simplex: &mut Simplex, direction: &mut Vec3, tolerance: f32) -> bool {
    match simplex.len() {
        2 => line(simplex, direction, tolerance),
        3 => triangle(simplex, direction, tolerance),
        4 => tetrahedron(simplex, direction, tolerance),
        _ => false,
    }
}

fn line(simplex: &mut Simplex, direction: &mut Vec3, tolerance: f32) -> bool {
    let a = simplex[0];
    let b = simplex[1];
    let ab = b - a;
    let ao = -a;
    let t = ab.dot(ao);
    let len_sq = ab.length_squared();

    if t <= 0.0 || len_sq <= tolerance * tolerance {
        simplex.set(&[a]);
        *direction = ao.normalize_or_zero();
        return false;
    }

    let perpendicular = ao - ab * (t / len_sq);
    *direction = if perpendicular.length_squared() <= tolerance * tolerance {
        // Origin sits on the edge itself
        ab.any_orthogonal_vector().normalize_or_zero()
    } else {
        perpendicular.normalize_or_zero()
    };
    false
}

fn triangle(simplex: &mut Simplex, direction: &mut Vec3, tolerance: f32) -> bool {
    let a = simplex[0];
    let b = simplex[1];
    let c = simplex[2];
    let ab = b - a;
    let ac = c - a;
    let ao = -a;
    let abc = ab.cross(ac);

    let ab_sq = ab.length_squared();
    let ac_sq = ac.length_squared();
    if abc.length_squared() <= FLAT_TRIANGLE_SIN_SQ * ab_sq * ac_sq {
        // Collinear points: keep the longer edge
        let far = if ab_sq >= ac_sq { b } else { c };
        simplex.set(&[a, far]);
        return line(simplex, direction, tolerance);
    }

    let abc_len = abc.length();
    let beyond_ac = abc.cross(ac).dot(ao) > tolerance * abc_len * ac_sq.sqrt();
    let beyond_ab = ab.cross(abc).dot(ao) > tolerance * abc_len * ab_sq.sqrt();

    if beyond_ac {
        if ac.dot(ao) > 0.0 {
            simplex.set(&[a, c]);
        } else {
            simplex.set(&[a, b]);
        }
        return line(simplex, direction, tolerance);
    }
    if beyond_ab {
        simplex.set(&[a, b]);
        return line(simplex, direction, tolerance);
    }

    if abc.dot(ao) >= 0.0 {
        *direction = abc / abc_len;
    } else {
        simplex.set(&[a, c, b]);
        *direction = -abc / abc_len;
    }
    false
}

fn tetrahedron(simplex: &mut Simplex, direction: &mut Vec3, tolerance: f32) -> bool {
    let a = simplex[0];
    let b = simplex[1];
    let c = simplex[2];
    let d = simplex[3];
    let ao = -a;

    // Faces through the newest point, each with the vertex it faces away from
    for (p, q, opposite) in [(b, c, d), (c, d, b), (d, b, c)] {
        let mut normal = (p - a).cross(q - a);
        let len = normal.length();
        if len <= f32::MIN_POSITIVE {
            continue;
        }
        if normal.dot(opposite - a) > 0.0 {
            normal = -normal;
        }
        if normal.dot(ao) > tolerance * len {
            simplex.set(&[a, p, q]);
            return triangle(simplex, direction, tolerance);
        }
    }

    // Origin is inside the tetrahedron, or within tolerance of a face
    true
}

/// Closest point to the origin of the convex set described by `support`.
///
/// Returns `None` when the origin lies inside the set or within the relative
/// tolerance of its boundary. Hitting `max_iterations` returns the best
/// point found.
pub fn closest_point(support: impl Fn(Vec3) -> Vec3, max_iterations: u32) -> Option<Vec3> {
    let mut closest = support(Vec3::X);
    let scale = closest.length().max(support(Vec3::NEG_X).length());
    let tolerance = GJK_TOLERANCE * scale;

    let mut simplex = Simplex::new();
    simplex.push_front(closest);

    for _ in 0..max_iterations {
        let dist_sq = closest.length_squared();
        if dist_sq <= tolerance * tolerance {
            return None;
        }

        let candidate = support(-closest);
        // No point of the set is closer along -closest: converged
        if dist_sq - closest.dot(candidate) <= GJK_TOLERANCE * dist_sq
            || simplex.contains_near(candidate, tolerance)
        {
            return Some(closest);
        }

        simplex.push_front(candidate);
        closest = reduce_to_closest(&mut simplex)?;
    }

    warn!(max_iterations, "GJK distance hit its iteration cap, using the best point");
    Some(closest)
}

/// Replace `simplex` with the smallest sub-simplex containing its closest
/// point to the origin, and return that point. `None` when a tetrahedron
/// encloses the origin.
fn reduce_to_closest(simplex: &mut Simplex) -> Option<Vec3> {
    match simplex.len() {
        1 => Some(simplex[0]),
        2 => Some(closest_on_segment(simplex, simplex[0], simplex[1])),
        3 => Some(closest_on_triangle(simplex, simplex[0], simplex[1], simplex[2])),
        _ => closest_on_tetrahedron(simplex),
    }
}

fn closest_on_segment(simplex: &mut Simplex, a: Vec3, b: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    let t = if len_sq > 0.0 { -a.dot(ab) / len_sq } else { 0.0 };

    if t <= 0.0 {
        simplex.set(&[a]);
        a
    } else if t >= 1.0 {
        simplex.set(&[b]);
        b
    } else {
        simplex.set(&[a, b]);
        a + ab * t
    }
}

/// Voronoi-region walk over the triangle's vertices, edges and interior.
fn closest_on_triangle(simplex: &mut Simplex, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;

    let d1 = ab.dot(-a);
    let d2 = ac.dot(-a);
    if d1 <= 0.0 && d2 <= 0.0 {
        simplex.set(&[a]);
        return a;
    }

    let d3 = ab.dot(-b);
    let d4 = ac.dot(-b);
    if d3 >= 0.0 && d4 <= d3 {
        simplex.set(&[b]);
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        simplex.set(&[a, b]);
        return a + ab * (d1 / (d1 - d3));
    }

    let d5 = ab.dot(-c);
    let d6 = ac.dot(-c);
    if d6 >= 0.0 && d5 <= d6 {
        simplex.set(&[c]);
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        simplex.set(&[a, c]);
        return a + ac * (d2 / (d2 - d6));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && d4 - d3 >= 0.0 && d5 - d6 >= 0.0 {
        simplex.set(&[b, c]);
        return b + (c - b) * ((d4 - d3) / ((d4 - d3) + (d5 - d6)));
    }

    let sum = va + vb + vc;
    if sum <= 0.0 {
        // Flat triangle: the nearest of its edges
        let mut best = Simplex::new();
        let mut best_point = a;
        for (p, q) in [(a, b), (a, c), (b, c)] {
            let mut edge = Simplex::new();
            let point = closest_on_segment(&mut edge, p, q);
            if best.is_empty() || point.length_squared() < best_point.length_squared() {
                best = edge;
                best_point = point;
            }
        }
        *simplex = best;
        return best_point;
    }

    simplex.set(&[a, b, c]);
    a + ab * (vb / sum) + ac * (vc / sum)
}

fn closest_on_tetrahedron(simplex: &mut Simplex) -> Option<Vec3> {
    let [a, b, c, d] = [simplex[0], simplex[1], simplex[2], simplex[3]];
    let mut best: Option<(Simplex, Vec3)> = None;

    for (p, q, r, opposite) in [(a, b, c, d), (a, c, d, b), (a, d, b, c), (b, d, c, a)] {
        let normal = (q - p).cross(r - p);
        // Skip faces with the origin on the same side as the opposite vertex
        if normal.dot(-p) * normal.dot(opposite - p) >= 0.0 {
            continue;
        }
        let mut face = Simplex::new();
        let point = closest_on_triangle(&mut face, p, q, r);
        if best.map_or(true, |(_, best_point)| {
            point.length_squared() < best_point.length_squared()
        }) {
            best = Some((face, point));
        }
    }

    let (face, point) = best?;
    *simplex = face;
    Some(point)
}
