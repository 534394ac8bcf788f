//! Keeps the 3D camera and the world group aligned with the map's view.
//!
//! The map camera looks at the map center from `camera_to_center_distance`
//! pixels away. The 3D camera is placed the same way around the origin, and
//! the world group is translated and scaled so that the projected map center
//! lands on the origin in screen-pixel units.

use std::f64::consts::{FRAC_PI_2, PI};

use foundation::math::mercator::WORLD_SIZE;
use foundation::math::{Mat4, Vec3};
use gpu::camera::PerspectiveCamera;
use tracing::debug;

use crate::host::MapTransform;

/// Slack on the far plane so the horizon is not clipped.
const FAR_PLANE_SLACK: f64 = 1.01;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraSync {
    fov_rad: f64,
    /// Moves the world origin from the map center to the map's top-left corner.
    translate_center: Mat4,
    world_size_ratio: f64,
    camera_to_center_distance: f64,
    camera_translate_z: Mat4,
    far_z: f64,
}

impl CameraSync {
    pub fn new(fov_rad: f64) -> Self {
        Self {
            fov_rad,
            translate_center: Mat4::translation(Vec3::new(
                WORLD_SIZE / 2.0,
                -WORLD_SIZE / 2.0,
                0.0,
            )),
            world_size_ratio: 1.0,
            camera_to_center_distance: 0.0,
            camera_translate_z: Mat4::IDENTITY,
            far_z: 0.0,
        }
    }

    pub fn fov_rad(&self) -> f64 {
        self.fov_rad
    }

    pub fn camera_to_center_distance(&self) -> f64 {
        self.camera_to_center_distance
    }

    pub fn far_z(&self) -> f64 {
        self.far_z
    }

    /// Recomputes the viewport-dependent constants, then syncs.
    ///
    /// Returns the world-group matrix, or `None` when the viewport has no area.
    pub fn setup_camera(&mut self, t: &MapTransform, camera: &mut PerspectiveCamera) -> Option<Mat4> {
        if !t.has_area() {
            debug!(width = t.width, height = t.height, "skipping camera setup for empty viewport");
            return None;
        }
        self.camera_to_center_distance = 0.5 / (self.fov_rad / 2.0).tan() * t.height;
        self.camera_translate_z =
            Mat4::translation(Vec3::new(0.0, 0.0, self.camera_to_center_distance));
        self.update_camera(t, camera)
    }

    /// Writes the camera's projection and placement for the current view.
    ///
    /// Returns the world-group matrix, or `None` when the viewport has no area.
    pub fn update_camera(&mut self, t: &MapTransform, camera: &mut PerspectiveCamera) -> Option<Mat4> {
        if !t.has_area() {
            return None;
        }
        let half_fov = self.fov_rad / 2.0;
        let ground_angle = FRAC_PI_2 + t.pitch_rad;
        let top_half_surface_distance = half_fov.sin() * self.camera_to_center_distance
            / (PI - ground_angle - half_fov).sin();
        self.far_z = ((FRAC_PI_2 - t.pitch_rad).cos() * top_half_surface_distance
            + self.camera_to_center_distance)
            * FAR_PLANE_SLACK;

        let aspect = t.width / t.height;
        camera.fov_y_rad = self.fov_rad;
        camera.aspect = aspect;
        camera.near = 1.0;
        camera.far = self.far_z;
        camera.projection = Mat4::perspective_gl(self.fov_rad, aspect, 1.0, self.far_z);
        camera.world = Mat4::rotation_z(t.angle_rad)
            * Mat4::rotation_x(t.pitch_rad)
            * self.camera_translate_z;

        Some(self.world_matrix(t))
    }

    /// Maps projected world units onto screen pixels around the origin.
    pub fn world_matrix(&self, t: &MapTransform) -> Mat4 {
        let zoom_pow = t.scale * self.world_size_ratio;
        Mat4::translation(Vec3::new(-t.center_px.x, t.center_px.y, 0.0))
            * Mat4::scale(Vec3::splat(zoom_pow))
            * self.translate_center
            * Mat4::rotation_z(PI)
    }
}
