use foundation::math::{Mat4, Vec3};

/// Perspective camera whose matrices are driven from outside.
///
/// Nothing here derives the matrices from position/target: the camera
/// synchronizer writes both `projection` and `world` every time the map view
/// changes.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PerspectiveCamera {
    pub fov_y_rad: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
    /// Camera-to-clip transform.
    pub projection: Mat4,
    /// Camera-to-world transform (camera placement).
    pub world: Mat4,
}

impl PerspectiveCamera {
    pub fn new(fov_y_rad: f64, aspect: f64, near: f64, far: f64) -> Self {
        Self {
            fov_y_rad,
            aspect,
            near,
            far,
            projection: Mat4::perspective_gl(fov_y_rad, aspect, near, far),
            world: Mat4::IDENTITY,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.world.translation_part()
    }

    /// World-to-camera transform; identity if the placement is singular.
    pub fn view(&self) -> Mat4 {
        self.world.inverse().unwrap_or(Mat4::IDENTITY)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view()
    }
}

#[cfg(test)]
mod tests {
    use super::PerspectiveCamera;
    use foundation::math::{Mat4, Vec3};

    #[test]
    fn view_is_inverse_of_placement() {
        let mut camera = PerspectiveCamera::new(0.5, 1.0, 1.0, 100.0);
        camera.world = Mat4::translation(Vec3::new(0.0, 0.0, 10.0));
        assert_eq!(camera.position(), Vec3::new(0.0, 0.0, 10.0));
        assert_eq!(camera.view().transform_point(Vec3::ZERO), Vec3::new(0.0, 0.0, -10.0));
    }
}
