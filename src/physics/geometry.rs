//! Small geometric helpers shared by the narrowphase, GJK/EPA and raycasts.

use glam::Vec3;

/// Squared length below which a vector is treated as having no direction.
pub(crate) const DIRECTION_EPSILON: f32 = 1e-12;

/// Normalize `v`, substituting +X when it has no usable direction.
#[inline]
pub fn direction_or_fallback(v: Vec3) -> Vec3 {
    let n = v.normalize_or_zero();
    if n == Vec3::ZERO {
        Vec3::X
    } else {
        n
    }
}

/// Closest point to `point` on the segment `a`-`b`.
pub fn closest_point_on_segment(point: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= DIRECTION_EPSILON {
        return a;
    }
    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Closest points between segments `p1`-`q1` and `p2`-`q2`.
///
/// Returns `(point on first, point on second)`. Degenerate segments are
/// handled as points.
pub fn closest_points_segment_segment(p1: Vec3, q1: Vec3, p2: Vec3, q2: Vec3) -> (Vec3, Vec3) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.length_squared();
    let e = d2.length_squared();
    let f = d2.dot(r);

    if a <= DIRECTION_EPSILON && e <= DIRECTION_EPSILON {
        return (p1, p2);
    }

    let (s, t) = if a <= DIRECTION_EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(r);
        if e <= DIRECTION_EPSILON {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            // Parallel segments: any s works, start from p1
            let s = if denom > DIRECTION_EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let t = (b * s + f) / e;
            if t < 0.0 {
                ((-c / a).clamp(0.0, 1.0), 0.0)
            } else if t > 1.0 {
                (((b - c) / a).clamp(0.0, 1.0), 1.0)
            } else {
                (s, t)
            }
        }
    };

    (p1 + d1 * s, p2 + d2 * t)
}

/// Clip the parametric line `origin + dir * t`, `t` in `[t_min, t_max]`,
/// against a box centered at the origin with the given half extents.
///
/// Returns the surviving `(enter, exit)` interval, if any.
pub fn slab_interval(
    origin: Vec3,
    dir: Vec3,
    half_extents: Vec3,
    t_min: f32,
    t_max: f32,
) -> Option<(f32, f32)> {
    let mut enter = t_min;
    let mut exit = t_max;

    for axis in 0..3 {
        if dir[axis].abs() < 1e-8 {
            if origin[axis] < -half_extents[axis] || origin[axis] > half_extents[axis] {
                return None;
            }
            continue;
        }
        let inv = 1.0 / dir[axis];
        let t1 = (-half_extents[axis] - origin[axis]) * inv;
        let t2 = (half_extents[axis] - origin[axis]) * inv;
        enter = enter.max(t1.min(t2));
        exit = exit.min(t1.max(t2));
        if enter > exit {
            return None;
        }
    }

    Some((enter, exit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_fallback() {
        assert_eq!(direction_or_fallback(Vec3::ZERO), Vec3::X);
        assert_eq!(direction_or_fallback(Vec3::new(0.0, 3.0, 0.0)), Vec3::Y);
    }

    #[test]
    fn test_closest_point_on_segment() {
        let a = Vec3::ZERO;
        let b = Vec3::new(2.0, 0.0, 0.0);
        assert_eq!(closest_point_on_segment(Vec3::new(1.0, 5.0, 0.0), a, b), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(closest_point_on_segment(Vec3::new(-3.0, 1.0, 0.0), a, b), a);
        assert_eq!(closest_point_on_segment(Vec3::new(9.0, 1.0, 0.0), a, b), b);
        assert_eq!(closest_point_on_segment(Vec3::ONE, a, a), a);
    }

    #[test]
    fn test_closest_points_crossing_segments() {
        let (p, q) = closest_points_segment_segment(
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, -1.0, 2.0),
            Vec3::new(0.0, 1.0, 2.0),
        );
        assert!(p.abs_diff_eq(Vec3::ZERO, 1e-6));
        assert!(q.abs_diff_eq(Vec3::new(0.0, 0.0, 2.0), 1e-6));
    }

    #[test]
    fn test_closest_points_parallel_segments() {
        let (p, q) = closest_points_segment_segment(
            Vec3::ZERO,
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(3.0, 1.0, 0.0),
        );
        assert!(((p - q).length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_closest_points_endpoint_region() {
        let (p, q) = closest_points_segment_segment(
            Vec3::ZERO,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(3.0, -1.0, 0.0),
            Vec3::new(3.0, 1.0, 0.0),
        );
        assert!(p.abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1e-6));
        assert!(q.abs_diff_eq(Vec3::new(3.0, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn test_slab_interval() {
        let half = Vec3::ONE;
        let hit = slab_interval(Vec3::new(-5.0, 0.0, 0.0), Vec3::X, half, 0.0, 100.0);
        assert_eq!(hit, Some((4.0, 6.0)));

        let miss = slab_interval(Vec3::new(-5.0, 2.0, 0.0), Vec3::X, half, 0.0, 100.0);
        assert_eq!(miss, None);

        let short = slab_interval(Vec3::new(-5.0, 0.0, 0.0), Vec3::X, half, 0.0, 3.0);
        assert_eq!(short, None);
    }
}
