//! EPA (Expanding Polytope Algorithm) for penetration depth and contact normal.

use std::collections::BTreeMap;

use glam::Vec3;
use tracing::{debug, warn};

use crate::ecs::components::physics::ColliderShape;

use super::contact::IntersectionInfo;
use super::gjk::{closest_point, minkowski_support, Simplex};

/// Faces with a smaller doubled area are treated as degenerate.
const AREA_EPSILON: f32 = 1e-10;

/// Iteration cap for the closest-point query between rounded shape cores.
const CORE_ITERATIONS: u32 = 32;

/// A triangle of the polytope with its cached outward normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolytopeFace {
    pub indices: [usize; 3],
    /// Unit outward normal, zero for degenerate faces.
    pub normal: Vec3,
    /// Signed distance of the face plane from the origin, infinite for degenerate faces.
    pub distance: f32,
}

impl PolytopeFace {
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        !self.distance.is_finite()
    }
}

/// Convex polytope in Minkowski-difference space, grown one support point at a time.
#[derive(Debug, Clone)]
pub struct Polytope {
    vertices: Vec<Vec3>,
    faces: Vec<PolytopeFace>,
}

impl Polytope {
    /// Build the initial polytope from a GJK tetrahedron.
    ///
    /// Faces are wound so their normals point away from the tetrahedron's
    /// centroid, which stays correct even when the origin lies on a face.
    pub fn from_tetrahedron(simplex: &Simplex) -> Option<Self> {
        if simplex.len() < 4 {
            return None;
        }

        let vertices = simplex.points().to_vec();
        let centroid = vertices.iter().copied().sum::<Vec3>() * 0.25;

        let mut polytope = Self {
            vertices,
            faces: Vec::with_capacity(4),
        };

        for [i, j, k] in [[0, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2]] {
            let mut face = polytope.make_face([i, j, k]);
            if !face.is_degenerate() && face.normal.dot(polytope.vertices[i] - centroid) < 0.0 {
                face = polytope.make_face([i, k, j]);
            }
            polytope.faces.push(face);
        }

        Some(polytope)
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn faces(&self) -> &[PolytopeFace] {
        &self.faces
    }

    fn make_face(&self, indices: [usize; 3]) -> PolytopeFace {
        let a = self.vertices[indices[0]];
        let b = self.vertices[indices[1]];
        let c = self.vertices[indices[2]];
        let normal = (b - a).cross(c - a);
        let len = normal.length();

        if len <= AREA_EPSILON || !len.is_finite() {
            return PolytopeFace {
                indices,
                normal: Vec3::ZERO,
                distance: f32::INFINITY,
            };
        }

        let normal = normal / len;
        PolytopeFace {
            indices,
            normal,
            distance: normal.dot(a),
        }
    }

    /// Whether `point` lies in front of `face`.
    ///
    /// Degenerate faces have no unit normal; their raw winding decides, and a
    /// zero-area face is seen from everywhere so it never survives an
    /// expansion that touches it.
    fn sees(&self, face: &PolytopeFace, point: Vec3) -> bool {
        let [a, b, c] = face.indices.map(|i| self.vertices[i]);
        if face.is_degenerate() {
            (b - a).cross(c - a).dot(point - a) >= 0.0
        } else {
            face.normal.dot(point - a) > 0.0
        }
    }

    fn has_vertex_near(&self, point: Vec3, tolerance: f32) -> bool {
        self.vertices
            .iter()
            .any(|v| v.distance_squared(point) <= tolerance * tolerance)
    }

    /// Index of the non-degenerate face nearest to the origin.
    pub fn closest_face(&self) -> Option<usize> {
        self.faces
            .iter()
            .enumerate()
            .filter(|(_, face)| !face.is_degenerate())
            .min_by(|(_, a), (_, b)| a.distance.total_cmp(&b.distance))
            .map(|(i, _)| i)
    }

    /// Add `point` to the polytope: drop every face that sees it and stitch
    /// the hole's boundary to the new vertex.
    pub fn expand(&mut self, point: Vec3) {
        let new_index = self.vertices.len();
        self.vertices.push(point);

        // Silhouette edges keyed by sorted vertex pair; an edge shared by two
        // removed faces cancels out.
        let mut edges: BTreeMap<(usize, usize), (usize, usize)> = BTreeMap::new();

        let mut i = 0;
        while i < self.faces.len() {
            let face = self.faces[i];
            if self.sees(&face, point) {
                let [a, b, c] = face.indices;
                toggle_edge(&mut edges, a, b);
                toggle_edge(&mut edges, b, c);
                toggle_edge(&mut edges, c, a);
                self.faces.swap_remove(i);
            } else {
                i += 1;
            }
        }

        for (a, b) in edges.into_values() {
            let face = self.make_face([a, b, new_index]);
            self.faces.push(face);
        }
    }
}

fn toggle_edge(edges: &mut BTreeMap<(usize, usize), (usize, usize)>, a: usize, b: usize) {
    let key = (a.min(b), a.max(b));
    if edges.remove(&key).is_none() {
        edges.insert(key, (a, b));
    }
}

/// EPA penetration query seeded with the tetrahedron returned by GJK.
///
/// Returns the closest face's normal (from shape 1 toward shape 2) and
/// distance. `tolerance` is relative to the size of the initial polytope.
/// Expansion stops when the support point no longer moves past the face or
/// repeats a vertex; running out of iterations returns the face with the
/// smallest support gap seen so far. `None` only when the polytope has no
/// usable face.
///
/// Spheres and capsules are then polished: when the origin lies outside the
/// difference of their cores, depth and normal come from the exact core
/// distance instead of the faceted approximation.
pub fn epa(
    shape1: &ColliderShape,
    shape2: &ColliderShape,
    simplex: &Simplex,
    max_iterations: u32,
    tolerance: f32,
) -> Option<IntersectionInfo> {
    let mut polytope = Polytope::from_tetrahedron(simplex)?;
    let scale = polytope
        .vertices
        .iter()
        .map(|v| v.length())
        .fold(0.0, f32::max);
    let threshold = tolerance * scale;

    let mut best: Option<(PolytopeFace, f32)> = None;
    let mut settled = false;

    for _ in 0..max_iterations {
        let Some(index) = polytope.closest_face() else {
            break;
        };
        let face = polytope.faces[index];
        let support = minkowski_support(shape1, shape2, face.normal);
        let gap = face.normal.dot(support) - face.distance;

        if best.map_or(true, |(_, best_gap)| gap < best_gap) {
            best = Some((face, gap));
        }
        if gap <= threshold {
            settled = true;
            break;
        }
        if polytope.has_vertex_near(support, threshold) {
            debug!(gap, "EPA support repeats a polytope vertex, stopping");
            settled = true;
            break;
        }

        polytope.expand(support);
    }

    let face = match best {
        Some((face, _)) => face,
        None => polytope.faces[polytope.closest_face()?],
    };
    if !settled {
        warn!(
            max_iterations,
            depth = face.distance,
            "EPA hit its iteration cap, using the tightest face found"
        );
    }

    Some(polish_rounded(shape1, shape2, face_to_info(&face)))
}

fn face_to_info(face: &PolytopeFace) -> IntersectionInfo {
    IntersectionInfo {
        normal: face.normal,
        depth: face.distance.max(0.0),
    }
}

/// Exact result for shapes with a rounding margin whose cores do not overlap.
fn polish_rounded(
    shape1: &ColliderShape,
    shape2: &ColliderShape,
    info: IntersectionInfo,
) -> IntersectionInfo {
    let margin = shape1.margin() + shape2.margin();
    if margin <= 0.0 {
        return info;
    }

    let core = |direction: Vec3| shape1.core_point(direction) - shape2.core_point(-direction);
    match closest_point(core, CORE_ITERATIONS) {
        Some(closest) => {
            let distance = closest.length();
            if distance < margin {
                IntersectionInfo {
                    normal: -closest / distance,
                    depth: margin - distance,
                }
            } else {
                info
            }
        }
        // Cores overlap: the polytope face is the answer
        None => info,
    }
}
