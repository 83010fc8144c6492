//! Viewer transform value.

use glam::{DAffine3, DMat3, DVec3};
use serde::{Deserialize, Serialize};

/// A 3D affine transform from global to viewer coordinates.
///
/// The viewer state treats this as an opaque value: it is copied in and out
/// and compared for equality to decide whether a change happened.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform3D(DAffine3);

impl Default for AffineTransform3D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl AffineTransform3D {
    /// The identity transform.
    pub const IDENTITY: Self = Self(DAffine3::IDENTITY);

    /// Build from the top three rows of a 4x4 row-major matrix.
    pub fn from_row_major(rows: [[f64; 4]; 3]) -> Self {
        let linear = DMat3::from_cols(
            DVec3::new(rows[0][0], rows[1][0], rows[2][0]),
            DVec3::new(rows[0][1], rows[1][1], rows[2][1]),
            DVec3::new(rows[0][2], rows[1][2], rows[2][2]),
        );
        let translation = DVec3::new(rows[0][3], rows[1][3], rows[2][3]);
        Self(DAffine3::from_mat3_translation(linear, translation))
    }

    /// Pure translation.
    pub fn from_translation(translation: DVec3) -> Self {
        Self(DAffine3::from_translation(translation))
    }

    /// Uniform or per-axis scaling.
    pub fn from_scale(scale: DVec3) -> Self {
        Self(DAffine3::from_scale(scale))
    }

    /// Overwrite this transform with another.
    pub fn set(&mut self, other: &Self) {
        self.0 = other.0;
    }

    /// Translation component.
    pub fn translation(&self) -> DVec3 {
        self.0.translation
    }

    /// `self * other`: apply `other` first, then `self`.
    pub fn concatenate(&self, other: &Self) -> Self {
        Self(self.0 * other.0)
    }

    /// `other * self`: apply `self` first, then `other`.
    pub fn preconcatenate(&self, other: &Self) -> Self {
        Self(other.0 * self.0)
    }

    /// Inverse transform.
    pub fn inverse(&self) -> Self {
        Self(self.0.inverse())
    }

    /// Map a point.
    pub fn apply(&self, point: DVec3) -> DVec3 {
        self.0.transform_point3(point)
    }
}

impl From<DAffine3> for AffineTransform3D {
    fn from(affine: DAffine3) -> Self {
        Self(affine)
    }
}
