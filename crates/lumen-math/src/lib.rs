#![warn(missing_docs)]

//! Math types for the lumen ray tracing core.
//!
//! Thin wrappers around nalgebra providing the points, vectors and
//! affine transforms the acceleration structures are expressed in,
//! plus the floating-point error bounds used when rays change space.

use nalgebra::{Matrix4, Vector3, Vector4};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// Conservative bound on the relative rounding error of `n` chained
/// floating-point operations (Higham's gamma).
#[inline]
pub fn gamma(n: u32) -> f64 {
    let n_eps = n as f64 * (f64::EPSILON * 0.5);
    n_eps / (1.0 - n_eps)
}

/// A 4x4 affine transformation with its inverse kept alongside.
///
/// Every constructor produces the inverse analytically, so applying
/// either direction never requires a matrix inversion at trace time.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// The model-to-world matrix.
    pub matrix: Matrix4<f64>,
    /// The world-to-model matrix.
    pub inverse: Matrix4<f64>,
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
            inverse: Matrix4::identity(),
        }
    }

    /// Wrap an arbitrary matrix, failing if it is singular.
    pub fn from_matrix(matrix: Matrix4<f64>) -> Option<Self> {
        matrix
            .try_inverse()
            .map(|inverse| Self { matrix, inverse })
    }

    /// Translation by `(dx, dy, dz)`.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            matrix: translation_matrix(dx, dy, dz),
            inverse: translation_matrix(-dx, -dy, -dz),
        }
    }

    /// Non-uniform scale by `(sx, sy, sz)`.
    ///
    /// A zero factor yields an infinite inverse; callers are expected to
    /// reject degenerate scales before they reach the scene.
    pub fn scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            matrix: scale_matrix(sx, sy, sz),
            inverse: scale_matrix(1.0 / sx, 1.0 / sy, 1.0 / sz),
        }
    }

    /// Rotation about the Z axis by `angle` radians.
    pub fn rotation_z(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix4::identity();
        m[(0, 0)] = c;
        m[(0, 1)] = -s;
        m[(1, 0)] = s;
        m[(1, 1)] = c;
        Self::rotation(m)
    }

    // Pure rotations are orthonormal: the inverse is the transpose.
    fn rotation(m: Matrix4<f64>) -> Self {
        Self {
            matrix: m,
            inverse: m.transpose(),
        }
    }

    /// Compose: `self` then `other` (self * other).
    ///
    /// The result applies `other` first, then `self`.
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
            inverse: other.inverse * self.inverse,
        }
    }

    /// The inverse transform.
    pub fn inverse(&self) -> Self {
        Self {
            matrix: self.inverse,
            inverse: self.matrix,
        }
    }

    /// Whether this transform is exactly the identity.
    pub fn is_identity(&self) -> bool {
        self.matrix == Matrix4::identity()
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let v = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        Point3::new(v.x, v.y, v.z)
    }

    /// Transform a direction vector (ignores translation, applies rotation/scale).
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        let r = self.matrix * Vector4::new(v.x, v.y, v.z, 0.0);
        Vec3::new(r.x, r.y, r.z)
    }

    /// Transform a normal vector (inverse transpose of the upper-left 3x3).
    pub fn apply_normal(&self, n: &Vec3) -> Vec3 {
        let inv = self.inverse.fixed_view::<3, 3>(0, 0);
        inv.transpose() * n
    }

    /// Transform a point, also returning a per-component bound on the
    /// absolute rounding error of the result.
    pub fn apply_point_with_error(&self, p: &Point3) -> (Point3, Vec3) {
        let m = &self.matrix;
        let mut error = Vec3::zeros();
        for row in 0..3 {
            error[row] = (m[(row, 0)] * p.x).abs()
                + (m[(row, 1)] * p.y).abs()
                + (m[(row, 2)] * p.z).abs()
                + m[(row, 3)].abs();
        }
        (self.apply_point(p), error * gamma(3))
    }

    /// Transform a vector, also returning a per-component bound on the
    /// absolute rounding error of the result.
    pub fn apply_vec_with_error(&self, v: &Vec3) -> (Vec3, Vec3) {
        let m = &self.matrix;
        let mut error = Vec3::zeros();
        for row in 0..3 {
            error[row] = (m[(row, 0)] * v.x).abs()
                + (m[(row, 1)] * v.y).abs()
                + (m[(row, 2)] * v.z).abs();
        }
        (self.apply_vec(v), error * gamma(3))
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

fn translation_matrix(dx: f64, dy: f64, dz: f64) -> Matrix4<f64> {
    let mut m = Matrix4::identity();
    m[(0, 3)] = dx;
    m[(1, 3)] = dy;
    m[(2, 3)] = dz;
    m
}

fn scale_matrix(sx: f64, sy: f64, sz: f64) -> Matrix4<f64> {
    let mut m = Matrix4::identity();
    m[(0, 0)] = sx;
    m[(1, 1)] = sy;
    m[(2, 2)] = sz;
    m
}
