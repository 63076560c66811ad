use crate::{EulerRot, Mat4, Quat, Vec3};

/// Object-to-world placement of a model (Euler XYZ rotation).
#[derive(Clone, Copy, Debug)]
pub struct Transform {
    pub translation: Vec3,
    /// Euler angles in radians (XYZ order).
    pub rotation_euler: Vec3,
    pub scale: Vec3,
}

impl Transform {
    #[inline]
    pub const fn identity() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation_euler: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }

    #[inline]
    pub fn from_trs(translation: Vec3, rotation_euler: Vec3, scale: Vec3) -> Self {
        Self {
            translation,
            rotation_euler,
            scale,
        }
    }

    /// Pivot a model around `center`: moves the centre to the origin first.
    pub fn centered_on(center: Vec3) -> Self {
        Self::from_trs(-center, Vec3::ZERO, Vec3::ONE)
    }

    #[inline]
    fn rotation(&self) -> Quat {
        Quat::from_euler(
            EulerRot::XYZ,
            self.rotation_euler.x,
            self.rotation_euler.y,
            self.rotation_euler.z,
        )
    }

    /// R * S * T: rotation about the origin after translating.
    #[inline]
    pub fn pivot_matrix(&self) -> Mat4 {
        Mat4::from_quat(self.rotation())
            * Mat4::from_scale(self.scale)
            * Mat4::from_translation(self.translation)
    }

    /// Inverse-transpose of `m`, for transforming normals under non-uniform scale.
    #[inline]
    pub fn normal_matrix(m: Mat4) -> Mat4 {
        m.inverse().transpose()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
