//! Transform component for ECS entities.

use glam::{Mat4, Quat, Vec3};

/// Entity transform. Stores position, rotation, and scale separately.
///
/// Collider shapes are authored relative to this transform and moved into
/// world space with [`ColliderShape::transformed`](super::ColliderShape::transformed).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Create an identity transform.
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    /// Create a transform from a position.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }

    /// Create a transform from a position and a rotation.
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            scale: Vec3::ONE,
        }
    }

    /// Convert to a 4x4 matrix (translation * rotation * scale).
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Map a local-space point to world space.
    #[inline]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * (self.scale * point)
    }

    /// Largest absolute scale factor, used to scale radii.
    #[inline]
    pub fn max_scale(&self) -> f32 {
        self.scale.abs().max_element()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let t = Transform::identity();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.rotation, Quat::IDENTITY);
        assert_eq!(t.scale, Vec3::ONE);
        assert_eq!(t.to_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn test_transform_point_matches_matrix() {
        let t = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_4),
            scale: Vec3::new(2.0, 1.5, 0.5),
        };
        let p = Vec3::new(0.3, -1.0, 4.0);
        let expected = t.to_matrix().transform_point3(p);
        assert!(t.transform_point(p).abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn test_from_position_rotation() {
        let t = Transform::from_position_rotation(
            Vec3::new(0.0, 2.0, 0.0),
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
        );
        assert_eq!(t.scale, Vec3::ONE);
        // +X turns onto +Y, then the offset applies
        assert!(t.transform_point(Vec3::X).abs_diff_eq(Vec3::new(0.0, 3.0, 0.0), 1e-6));
    }

    #[test]
    fn test_max_scale() {
        let t = Transform {
            scale: Vec3::new(1.0, -3.0, 2.0),
            ..Transform::identity()
        };
        assert_eq!(t.max_scale(), 3.0);
    }
}
