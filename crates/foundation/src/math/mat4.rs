use super::Vec3;

/// Column-major 4x4 matrix in `f64`.
///
/// `cols[c][r]` is column `c`, row `r`, matching the flat element order used
/// by WebGL-style matrix arrays.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mat4 {
    pub cols: [[f64; 4]; 4],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4 {
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub fn from_cols(cols: [[f64; 4]; 4]) -> Self {
        Self { cols }
    }

    pub fn to_cols_array(&self) -> [f64; 16] {
        let mut out = [0.0; 16];
        for (c, col) in self.cols.iter().enumerate() {
            out[c * 4..c * 4 + 4].copy_from_slice(col);
        }
        out
    }

    pub fn from_cols_array(a: [f64; 16]) -> Self {
        let mut cols = [[0.0; 4]; 4];
        for (c, col) in cols.iter_mut().enumerate() {
            col.copy_from_slice(&a[c * 4..c * 4 + 4]);
        }
        Self { cols }
    }

    pub fn translation(t: Vec3) -> Self {
        let mut m = Self::IDENTITY;
        m.cols[3] = [t.x, t.y, t.z, 1.0];
        m
    }

    pub fn scale(s: Vec3) -> Self {
        let mut m = Self::IDENTITY;
        m.cols[0][0] = s.x;
        m.cols[1][1] = s.y;
        m.cols[2][2] = s.z;
        m
    }

    pub fn rotation_x(angle_rad: f64) -> Self {
        let (s, c) = angle_rad.sin_cos();
        Self::from_cols([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, c, s, 0.0],
            [0.0, -s, c, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn rotation_z(angle_rad: f64) -> Self {
        let (s, c) = angle_rad.sin_cos();
        Self::from_cols([
            [c, s, 0.0, 0.0],
            [-s, c, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Translation followed by per-axis scale: `T(position) * S(scale)`.
    pub fn from_translation_scale(position: Vec3, scale: Vec3) -> Self {
        let mut m = Self::scale(scale);
        m.cols[3] = [position.x, position.y, position.z, 1.0];
        m
    }

    /// Right-handed perspective projection with clip depth in `[-1, 1]`.
    pub fn perspective_gl(fov_y_rad: f64, aspect: f64, near: f64, far: f64) -> Self {
        let f = 1.0 / (0.5 * fov_y_rad).tan();
        let nf = 1.0 / (near - far);
        Self::from_cols([
            [f / aspect, 0.0, 0.0, 0.0],
            [0.0, f, 0.0, 0.0],
            [0.0, 0.0, (far + near) * nf, -1.0],
            [0.0, 0.0, 2.0 * far * near * nf, 0.0],
        ])
    }

    pub fn translation_part(&self) -> Vec3 {
        Vec3::new(self.cols[3][0], self.cols[3][1], self.cols[3][2])
    }

    /// Transforms a point, including the perspective divide.
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        let m = &self.cols;
        let x = m[0][0] * p.x + m[1][0] * p.y + m[2][0] * p.z + m[3][0];
        let y = m[0][1] * p.x + m[1][1] * p.y + m[2][1] * p.z + m[3][1];
        let z = m[0][2] * p.x + m[1][2] * p.y + m[2][2] * p.z + m[3][2];
        let w = m[0][3] * p.x + m[1][3] * p.y + m[2][3] * p.z + m[3][3];
        let inv_w = if w != 0.0 { 1.0 / w } else { 1.0 };
        Vec3::new(x * inv_w, y * inv_w, z * inv_w)
    }

    /// General inverse. Returns `None` for singular matrices.
    pub fn inverse(&self) -> Option<Self> {
        let a = self.to_cols_array();
        let (a00, a01, a02, a03) = (a[0], a[1], a[2], a[3]);
        let (a10, a11, a12, a13) = (a[4], a[5], a[6], a[7]);
        let (a20, a21, a22, a23) = (a[8], a[9], a[10], a[11]);
        let (a30, a31, a32, a33) = (a[12], a[13], a[14], a[15]);

        let b00 = a00 * a11 - a01 * a10;
        let b01 = a00 * a12 - a02 * a10;
        let b02 = a00 * a13 - a03 * a10;
        let b03 = a01 * a12 - a02 * a11;
        let b04 = a01 * a13 - a03 * a11;
        let b05 = a02 * a13 - a03 * a12;
        let b06 = a20 * a31 - a21 * a30;
        let b07 = a20 * a32 - a22 * a30;
        let b08 = a20 * a33 - a23 * a30;
        let b09 = a21 * a32 - a22 * a31;
        let b10 = a21 * a33 - a23 * a31;
        let b11 = a22 * a33 - a23 * a32;

        let det = b00 * b11 - b01 * b10 + b02 * b09 + b03 * b08 - b04 * b07 + b05 * b06;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let inv = 1.0 / det;

        Some(Self::from_cols_array([
            (a11 * b11 - a12 * b10 + a13 * b09) * inv,
            (a02 * b10 - a01 * b11 - a03 * b09) * inv,
            (a31 * b05 - a32 * b04 + a33 * b03) * inv,
            (a22 * b04 - a21 * b05 - a23 * b03) * inv,
            (a12 * b08 - a10 * b11 - a13 * b07) * inv,
            (a00 * b11 - a02 * b08 + a03 * b07) * inv,
            (a32 * b02 - a30 * b05 - a33 * b01) * inv,
            (a20 * b05 - a22 * b02 + a23 * b01) * inv,
            (a10 * b10 - a11 * b08 + a13 * b06) * inv,
            (a01 * b08 - a00 * b10 - a03 * b06) * inv,
            (a30 * b04 - a31 * b02 + a33 * b00) * inv,
            (a21 * b02 - a20 * b04 - a23 * b00) * inv,
            (a11 * b07 - a10 * b09 - a12 * b06) * inv,
            (a00 * b09 - a01 * b07 + a02 * b06) * inv,
            (a31 * b01 - a30 * b03 - a32 * b00) * inv,
            (a20 * b03 - a21 * b01 + a22 * b00) * inv,
        ]))
    }
}

impl std::ops::Mul for Mat4 {
    type Output = Self;

    fn mul(self, b: Self) -> Self::Output {
        // c = a * b
        let a = &self.cols;
        let mut c = [[0.0f64; 4]; 4];
        for col in 0..4 {
            for row in 0..4 {
                c[col][row] = a[0][row] * b.cols[col][0]
                    + a[1][row] * b.cols[col][1]
                    + a[2][row] * b.cols[col][2]
                    + a[3][row] * b.cols[col][3];
            }
        }
        Self { cols: c }
    }
}

#[cfg(test)]
mod tests {
    use super::Mat4;
    use crate::math::Vec3;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn assert_mat_close(a: &Mat4, b: &Mat4, eps: f64) {
        for (x, y) in a.to_cols_array().iter().zip(b.to_cols_array().iter()) {
            assert_close(*x, *y, eps);
        }
    }

    #[test]
    fn translation_scale_compose() {
        let m = Mat4::translation(Vec3::new(1.0, 2.0, 3.0)) * Mat4::scale(Vec3::splat(2.0));
        assert_eq!(m.transform_point(Vec3::new(1.0, 1.0, 1.0)), Vec3::new(3.0, 4.0, 5.0));
        assert_eq!(m, Mat4::from_translation_scale(Vec3::new(1.0, 2.0, 3.0), Vec3::splat(2.0)));
    }

    #[test]
    fn rotation_z_quarter_turn() {
        let p = Mat4::rotation_z(std::f64::consts::FRAC_PI_2).transform_point(Vec3::new(1.0, 0.0, 0.0));
        assert_close(p.x, 0.0, 1e-12);
        assert_close(p.y, 1.0, 1e-12);
    }

    #[test]
    fn rotation_x_quarter_turn() {
        let p = Mat4::rotation_x(std::f64::consts::FRAC_PI_2).transform_point(Vec3::new(0.0, 1.0, 0.0));
        assert_close(p.y, 0.0, 1e-12);
        assert_close(p.z, 1.0, 1e-12);
    }

    #[test]
    fn inverse_round_trips() {
        let m = Mat4::translation(Vec3::new(-4.0, 9.5, 2.0))
            * Mat4::rotation_z(0.7)
            * Mat4::rotation_x(-0.3)
            * Mat4::scale(Vec3::new(2.0, 3.0, 0.5));
        let inv = m.inverse().expect("invertible");
        assert_mat_close(&(m * inv), &Mat4::IDENTITY, 1e-12);
        assert_mat_close(&(inv * m), &Mat4::IDENTITY, 1e-12);
    }

    #[test]
    fn singular_has_no_inverse() {
        assert!(Mat4::scale(Vec3::new(1.0, 0.0, 1.0)).inverse().is_none());
    }

    #[test]
    fn perspective_maps_near_and_far_planes() {
        let p = Mat4::perspective_gl(1.0, 1.5, 1.0, 100.0);
        assert_close(p.transform_point(Vec3::new(0.0, 0.0, -1.0)).z, -1.0, 1e-12);
        assert_close(p.transform_point(Vec3::new(0.0, 0.0, -100.0)).z, 1.0, 1e-12);
    }
}
