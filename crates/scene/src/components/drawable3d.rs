use foundation::bounds::Aabb3;

/// Mesh shape in model units (meters once placed with latitude scaling).
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Shape3D {
    Cube { size: f64 },
    Sphere { radius: f64 },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Drawable3D {
    pub shape: Shape3D,
}

impl Drawable3D {
    pub fn cube(size: f64) -> Self {
        Self {
            shape: Shape3D::Cube { size },
        }
    }

    pub fn sphere(radius: f64) -> Self {
        Self {
            shape: Shape3D::Sphere { radius },
        }
    }

    /// Model-space bounds centered on the node origin.
    pub fn local_bounds(&self) -> Aabb3 {
        match self.shape {
            Shape3D::Cube { size } => Aabb3::cube(0.5 * size),
            Shape3D::Sphere { radius } => Aabb3::cube(radius),
        }
    }
}
