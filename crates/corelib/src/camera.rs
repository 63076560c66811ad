use crate::{Mat4, Vec3, bounds::Aabb};

/// Simple perspective camera (right-handed).
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_rad: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub aspect: f32,
}

impl Camera {
    #[allow(clippy::too_many_arguments)]
    pub fn new_perspective(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        fov_y_rad: f32,
        z_near: f32,
        z_far: f32,
        aspect: f32,
    ) -> Self {
        Self {
            eye,
            target,
            up,
            fov_y_rad,
            z_near,
            z_far,
            aspect,
        }
    }

    /// Camera on +Z looking at the centre of `bounds`, far enough back that
    /// the bounding sphere fits the vertical field of view.
    pub fn framing(bounds: &Aabb, fov_y_rad: f32, aspect: f32) -> Self {
        let radius = bounds.radius().max(1e-3);
        let distance = radius / (fov_y_rad * 0.5).sin();
        let target = bounds.center();
        Self::new_perspective(
            target + Vec3::Z * distance,
            target,
            Vec3::Y,
            fov_y_rad,
            (distance - radius).max(distance * 0.01),
            distance + radius * 2.0,
            aspect,
        )
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// glam's `perspective_rh` maps depth to [0, 1], which is what wgpu expects.
    #[inline]
    pub fn proj(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_rad,
            self.aspect.max(1e-6),
            self.z_near,
            self.z_far,
        )
    }

    #[inline]
    pub fn proj_view(&self) -> Mat4 {
        self.proj() * self.view()
    }

    #[inline]
    pub fn with_aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec3;
    use approx::assert_relative_eq;

    #[test]
    fn framing_keeps_bounds_between_clip_planes() {
        let bounds = Aabb::new(vec3(-1.0, -1.0, -1.0), vec3(1.0, 1.0, 1.0));
        let cam = Camera::framing(&bounds, 60f32.to_radians(), 1.0);
        assert_eq!(cam.target, Vec3::ZERO);

        let dist = cam.eye.distance(cam.target);
        assert_relative_eq!(dist, bounds.radius() / 30f32.to_radians().sin(), epsilon = 1e-4);
        assert!(cam.z_near < dist - bounds.radius() + 1e-4);
        assert!(cam.z_far > dist + bounds.radius());
    }
}
