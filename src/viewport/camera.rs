use glam::{Mat4, Vec3};

use crate::config::ViewerConfig;

/// Perspective camera that always looks at the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    /// Vertical field of view (radians)
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    home: Vec3,
    min_distance: f32,
    max_distance: f32,
}

impl Camera {
    pub fn new(config: &ViewerConfig, aspect: f32) -> Self {
        let home = Vec3::from_array(config.default_camera_position);
        Self {
            position: home,
            fov: config.fov_degrees.to_radians(),
            aspect,
            near: config.near,
            far: config.far,
            home,
            min_distance: config.min_camera_distance,
            max_distance: config.max_camera_distance,
        }
    }

    /// Back to the default position, looking at the origin.
    pub fn reset(&mut self) {
        self.position = self.home;
    }

    pub fn distance(&self) -> f32 {
        self.position.length()
    }

    /// Scales the distance to the origin by `factor`, clamped to the configured
    /// range. Non-finite factors are ignored.
    pub fn zoom(&mut self, factor: f32) {
        if !factor.is_finite() {
            return;
        }
        let direction = self
            .position
            .try_normalize()
            .or_else(|| self.home.try_normalize())
            .unwrap_or(Vec3::Z);
        let distance = (self.distance() * factor).clamp(self.min_distance, self.max_distance);
        self.position = direction * distance;
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    /// View matrix (world -> camera)
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, Vec3::ZERO, Vec3::Y)
    }

    /// Projection matrix (camera -> clip)
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn camera() -> Camera {
        Camera::new(&ViewerConfig::default(), 4.0 / 3.0)
    }

    #[test]
    fn zoom_is_multiplicative() {
        let mut cam = camera();
        let d0 = cam.distance();
        cam.zoom(1.5);
        assert_relative_eq!(cam.distance(), d0 * 1.5, epsilon = 1e-3);
        cam.zoom(0.5);
        assert_relative_eq!(cam.distance(), d0 * 0.75, epsilon = 1e-3);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut cam = camera();
        cam.zoom(0.0);
        assert_relative_eq!(cam.distance(), 1.0, epsilon = 1e-5);
        cam.zoom(-3.0);
        assert_relative_eq!(cam.distance(), 1.0, epsilon = 1e-5);
        cam.zoom(1e9);
        assert_relative_eq!(cam.distance(), 900.0, epsilon = 1e-2);
        cam.zoom(f32::NAN);
        assert_relative_eq!(cam.distance(), 900.0, epsilon = 1e-2);
    }

    #[test]
    fn reset_restores_home() {
        let mut cam = camera();
        cam.zoom(3.0);
        cam.reset();
        assert_eq!(cam.position, Vec3::splat(50.0));
    }

    #[test]
    fn origin_projects_to_screen_center() {
        let cam = camera();
        let clip = cam.view_projection() * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(clip.x / clip.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(clip.y / clip.w, 0.0, epsilon = 1e-5);
    }
}
