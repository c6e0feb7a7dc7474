//! 2D affine transform
//!
//! Six scalars `(a, b, c, d, tx, ty)` describing the matrix
//!
//! ```text
//! | a  c  tx |
//! | b  d  ty |
//! | 0  0  1  |
//! ```
//!
//! Points are column vectors, so `append` composes a transform that is applied
//! *before* the accumulated one (walking root-first while drawing) and
//! `prepend` composes one that is applied *after* it (walking leaf-first while
//! computing a world transform).
//!
//! # Example
//!
//! ```ignore
//! let mut m = Affine::IDENTITY;
//! m.append_transform(10.0, 20.0, 2.0, 2.0, FRAC_PI_2, 0.0, 0.0);
//!
//! let parts = m.decomposed();
//! assert!((parts.scale_x - 2.0).abs() < 1e-9);
//! ```

use std::f64::consts::TAU;

use glam::{DAffine2, DMat2, DVec2};
use serde::{Deserialize, Serialize};

// ============================================================================
// Affine
// ============================================================================

/// A 2x3 affine matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Affine {
    /// The identity map.
    pub const IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    /// Create a matrix from its six scalars.
    #[must_use]
    pub const fn new(a: f64, b: f64, c: f64, d: f64, tx: f64, ty: f64) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    /// Reset to the identity map.
    pub fn identity(&mut self) -> &mut Self {
        *self = Self::IDENTITY;
        self
    }

    /// Check for the exact identity map.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// `self = self * m`
    pub fn append(&mut self, a: f64, b: f64, c: f64, d: f64, tx: f64, ty: f64) -> &mut Self {
        let (a1, b1, c1, d1) = (self.a, self.b, self.c, self.d);

        self.a = a * a1 + b * c1;
        self.b = a * b1 + b * d1;
        self.c = c * a1 + d * c1;
        self.d = c * b1 + d * d1;
        self.tx = tx * a1 + ty * c1 + self.tx;
        self.ty = tx * b1 + ty * d1 + self.ty;
        self
    }

    /// `self = m * self`
    pub fn prepend(&mut self, a: f64, b: f64, c: f64, d: f64, tx: f64, ty: f64) -> &mut Self {
        let (a1, b1, c1, d1) = (self.a, self.b, self.c, self.d);
        let (tx1, ty1) = (self.tx, self.ty);

        self.a = a * a1 + c * b1;
        self.b = b * a1 + d * b1;
        self.c = a * c1 + c * d1;
        self.d = b * c1 + d * d1;
        self.tx = a * tx1 + c * ty1 + tx;
        self.ty = b * tx1 + d * ty1 + ty;
        self
    }

    /// Append the local transform `T(x, y) * R(rotation) * S(scale) * T(-pivot)`.
    ///
    /// The running matrix maps the parent's space to the root, so after this
    /// call it maps the local space of the node described by the arguments.
    #[allow(clippy::too_many_arguments)]
    pub fn append_transform(
        &mut self,
        x: f64,
        y: f64,
        scale_x: f64,
        scale_y: f64,
        rotation: f64,
        pivot_x: f64,
        pivot_y: f64,
    ) -> &mut Self {
        let (cos, sin) = rotation_terms(rotation);

        self.append(cos * scale_x, sin * scale_x, -sin * scale_y, cos * scale_y, x, y);

        if pivot_x != 0.0 || pivot_y != 0.0 {
            self.tx -= pivot_x * self.a + pivot_y * self.c;
            self.ty -= pivot_x * self.b + pivot_y * self.d;
        }

        self
    }

    /// Prepend the local transform `T(x, y) * R(rotation) * S(scale) * T(-pivot)`.
    ///
    /// Used while ascending from a node to the root: each ancestor is applied
    /// after everything accumulated so far.
    #[allow(clippy::too_many_arguments)]
    pub fn prepend_transform(
        &mut self,
        x: f64,
        y: f64,
        scale_x: f64,
        scale_y: f64,
        rotation: f64,
        pivot_x: f64,
        pivot_y: f64,
    ) -> &mut Self {
        let (cos, sin) = rotation_terms(rotation);

        if pivot_x != 0.0 || pivot_y != 0.0 {
            self.tx -= pivot_x;
            self.ty -= pivot_y;
        }

        self.prepend(cos * scale_x, sin * scale_x, -sin * scale_y, cos * scale_y, x, y)
    }

    /// Append another matrix.
    pub fn append_matrix(&mut self, m: &Self) -> &mut Self {
        self.append(m.a, m.b, m.c, m.d, m.tx, m.ty)
    }

    /// Prepend another matrix.
    pub fn prepend_matrix(&mut self, m: &Self) -> &mut Self {
        self.prepend(m.a, m.b, m.c, m.d, m.tx, m.ty)
    }

    /// Extract position, rotation and scale.
    ///
    /// Assumes the matrix has no shear. The sign of the determinant is carried
    /// by `scale_y`, so a reflected transform keeps a positive `scale_x`.
    pub fn decompose(&self, out: &mut Decomposed) {
        out.x = self.tx;
        out.y = self.ty;
        out.rotation = self.b.atan2(self.a);
        out.scale_x = self.a.hypot(self.b);

        let scale_y = self.c.hypot(self.d);
        out.scale_y = if self.determinant() < 0.0 { -scale_y } else { scale_y };
    }

    /// Owned variant of [`Self::decompose`].
    #[must_use]
    pub fn decomposed(&self) -> Decomposed {
        let mut out = Decomposed::default();
        self.decompose(&mut out);
        out
    }

    /// Determinant of the linear part.
    #[must_use]
    #[inline]
    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// Inverse map, or `None` when the matrix is singular.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }

        let a = self.d / det;
        let b = -self.b / det;
        let c = -self.c / det;
        let d = self.a / det;

        Some(Self {
            a,
            b,
            c,
            d,
            tx: -(a * self.tx + c * self.ty),
            ty: -(b * self.tx + d * self.ty),
        })
    }

    /// Map a point through this transform.
    #[must_use]
    #[inline]
    pub fn transform_point(&self, point: DVec2) -> DVec2 {
        DVec2::new(
            self.a * point.x + self.c * point.y + self.tx,
            self.b * point.x + self.d * point.y + self.ty,
        )
    }

    /// Map a direction through this transform (ignores translation).
    #[must_use]
    #[inline]
    pub fn transform_vector(&self, vector: DVec2) -> DVec2 {
        DVec2::new(
            self.a * vector.x + self.c * vector.y,
            self.b * vector.x + self.d * vector.y,
        )
    }

    /// Component-wise comparison within `epsilon`.
    #[must_use]
    pub fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        (self.a - other.a).abs() <= epsilon
            && (self.b - other.b).abs() <= epsilon
            && (self.c - other.c).abs() <= epsilon
            && (self.d - other.d).abs() <= epsilon
            && (self.tx - other.tx).abs() <= epsilon
            && (self.ty - other.ty).abs() <= epsilon
    }
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<Affine> for DAffine2 {
    fn from(m: Affine) -> Self {
        DAffine2::from_mat2_translation(
            DMat2::from_cols(DVec2::new(m.a, m.b), DVec2::new(m.c, m.d)),
            DVec2::new(m.tx, m.ty),
        )
    }
}

impl From<DAffine2> for Affine {
    fn from(m: DAffine2) -> Self {
        Self {
            a: m.matrix2.x_axis.x,
            b: m.matrix2.x_axis.y,
            c: m.matrix2.y_axis.x,
            d: m.matrix2.y_axis.y,
            tx: m.translation.x,
            ty: m.translation.y,
        }
    }
}

/// Whole turns (including zero) use exact terms so that an unrotated node
/// composes without rounding noise.
#[inline]
fn rotation_terms(rotation: f64) -> (f64, f64) {
    if rotation % TAU != 0.0 {
        (rotation.cos(), rotation.sin())
    } else {
        (1.0, 0.0)
    }
}

// ============================================================================
// Decomposed
// ============================================================================

/// Position, rotation and scale recovered from an [`Affine`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decomposed {
    pub x: f64,
    pub y: f64,
    /// Radians, in `(-PI, PI]`
    pub rotation: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl Default for Decomposed {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    const EPSILON: f64 = 1e-9;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < EPSILON,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_identity_resets() {
        let mut m = Affine::new(2.0, 3.0, 4.0, 5.0, 6.0, 7.0);
        assert!(m.identity().is_identity());
    }

    #[test]
    fn test_zero_rotation_is_exact() {
        let mut m = Affine::IDENTITY;
        m.append_transform(0.0, 0.0, 1.0, 1.0, TAU, 0.0, 0.0);
        assert!(m.is_identity());
    }

    #[test]
    fn test_append_translates_then_rotates() {
        let mut m = Affine::IDENTITY;
        m.append_transform(10.0, 0.0, 1.0, 1.0, FRAC_PI_2, 0.0, 0.0);

        // Local (1, 0) rotates onto +Y, then moves by the position
        let p = m.transform_point(DVec2::new(1.0, 0.0));
        assert_close(p.x, 10.0);
        assert_close(p.y, 1.0);
    }

    #[test]
    fn test_pivot_maps_to_position() {
        let mut m = Affine::IDENTITY;
        m.append_transform(50.0, 60.0, 2.0, 3.0, 0.7, 5.0, -4.0);

        // The pivot point is the one that lands on (x, y)
        let p = m.transform_point(DVec2::new(5.0, -4.0));
        assert_close(p.x, 50.0);
        assert_close(p.y, 60.0);
    }

    #[test]
    fn test_append_and_prepend_agree_on_single_step() {
        let mut appended = Affine::IDENTITY;
        appended.append_transform(3.0, -2.0, 1.5, 0.5, 1.2, 4.0, 1.0);

        let mut prepended = Affine::IDENTITY;
        prepended.prepend_transform(3.0, -2.0, 1.5, 0.5, 1.2, 4.0, 1.0);

        assert!(appended.abs_diff_eq(&prepended, EPSILON));
    }

    #[test]
    fn test_prepend_ascending_matches_append_descending() {
        let steps = [
            (100.0, 50.0, 2.0, 2.0, FRAC_PI_4, 0.0, 0.0),
            (10.0, -5.0, 1.0, 0.5, -1.0, 3.0, 3.0),
            (-7.0, 2.0, 0.25, 4.0, 2.5, -1.0, 0.0),
        ];

        let mut descending = Affine::IDENTITY;
        for &(x, y, sx, sy, r, px, py) in &steps {
            descending.append_transform(x, y, sx, sy, r, px, py);
        }

        let mut ascending = Affine::IDENTITY;
        for &(x, y, sx, sy, r, px, py) in steps.iter().rev() {
            ascending.prepend_transform(x, y, sx, sy, r, px, py);
        }

        assert!(descending.abs_diff_eq(&ascending, 1e-9));
    }

    #[test]
    fn test_decompose_round_trip() {
        let cases = [
            (0.0, 0.0, 1.0, 1.0, 0.0),
            (12.5, -3.0, 2.0, 0.5, FRAC_PI_4),
            (-40.0, 8.0, 0.1, 3.0, -2.0),
            (1.0, 1.0, 1.0, -2.0, 1.0),
            (5.0, 6.0, 3.0, 3.0, PI),
        ];

        for (x, y, scale_x, scale_y, rotation) in cases {
            let mut m = Affine::IDENTITY;
            m.append_transform(x, y, scale_x, scale_y, rotation, 0.0, 0.0);
            let parts = m.decomposed();

            assert_close(parts.x, x);
            assert_close(parts.y, y);
            assert_close(parts.scale_x, scale_x);
            assert_close(parts.scale_y, scale_y);
            assert_close(parts.rotation, rotation);
        }
    }

    #[test]
    fn test_decompose_negative_scale_x_is_equivalent() {
        let mut m = Affine::IDENTITY;
        m.append_transform(0.0, 0.0, -2.0, 1.0, 0.0, 0.0, 0.0);
        let parts = m.decomposed();

        // Same map expressed as a half turn with the reflection on Y
        assert_close(parts.scale_x, 2.0);
        assert_close(parts.scale_y, -1.0);
        assert_close(parts.rotation.abs(), PI);
    }

    #[test]
    fn test_non_finite_propagates() {
        let mut m = Affine::IDENTITY;
        m.append_transform(f64::NAN, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0);
        assert!(m.tx.is_nan());

        let mut r = Affine::IDENTITY;
        r.append_transform(0.0, 0.0, 1.0, 1.0, f64::INFINITY, 0.0, 0.0);
        assert!(r.a.is_nan());
    }

    #[test]
    fn test_inverse() {
        let mut m = Affine::IDENTITY;
        m.append_transform(30.0, -10.0, 2.0, 4.0, 0.3, 1.0, 2.0);

        let inverse = m.inverse().unwrap();
        let p = DVec2::new(7.0, -3.0);
        let back = inverse.transform_point(m.transform_point(p));
        assert_close(back.x, p.x);
        assert_close(back.y, p.y);

        let singular = Affine::new(0.0, 0.0, 0.0, 0.0, 1.0, 1.0);
        assert!(singular.inverse().is_none());
    }

    #[test]
    fn test_glam_conversion() {
        let mut m = Affine::IDENTITY;
        m.append_transform(4.0, 5.0, 2.0, 3.0, 0.5, 0.0, 0.0);

        let glam: DAffine2 = m.into();
        let p = DVec2::new(1.0, 2.0);
        let expected = m.transform_point(p);
        let actual = glam.transform_point2(p);
        assert_close(actual.x, expected.x);
        assert_close(actual.y, expected.y);

        assert!(Affine::from(glam).abs_diff_eq(&m, EPSILON));
    }

    #[test]
    fn test_serializes_as_plain_fields() {
        let m = Affine::new(2.0, 0.0, 0.0, 3.0, 4.0, 5.0);

        let text = ron::to_string(&m).unwrap();
        assert!(text.contains("tx") && text.contains("ty"));
        assert!(!text.contains("matrix2"));
        assert_eq!(ron::from_str::<Affine>(&text).unwrap(), m);
    }
}
