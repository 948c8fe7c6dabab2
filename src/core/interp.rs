//! Perspective-correct (rational-linear) interpolation.
//!
//! Under a perspective projection an attribute `A` is *not* linear in screen
//! space, but `A / z` and `1 / z` are. The cursor below walks those two
//! screen-linear quantities and recovers the true attribute as their ratio:
//!
//! ```text
//!   A(t) = (A0/z0 + t·(A1/z1 − A0/z0)/D) / (1/z0 + t·(1/z1 − 1/z0)/D)
//!   z(t) = 1 / (1/z0 + t·(1/z1 − 1/z0)/D)
//! ```
//!
//! Values are evaluated as `base + delta * position` rather than by repeated
//! addition, and whole steps are counted separately from the fractional
//! displacement, so a cursor advanced straight to step `n` yields exactly the
//! same bits as one stepped there. Row-partitioned workers depend on this.

use std::ops::{Add, Mul, Sub};

/// Anything that can be interpolated: closed under addition, subtraction and
/// scaling by `f32`. Covers `f32` and the nalgebra vector types.
pub trait Attribute: Copy + Add<Output = Self> + Sub<Output = Self> + Mul<f32, Output = Self> {}

impl<T> Attribute for T where T: Copy + Add<Output = T> + Sub<Output = T> + Mul<f32, Output = T> {}

/// A cursor over a span of `distance` units between two endpoints.
#[derive(Clone, Copy, Debug)]
pub struct PerspectiveLerp<A: Attribute> {
    /// `A0 / z0`
    numerator: A,
    /// Per-unit change of `A / z`
    d_numerator: A,
    /// `1 / z0`
    inv_depth: f32,
    /// Per-unit change of `1 / z`
    d_inv_depth: f32,
    /// Fractional/explicit displacement from the first endpoint.
    offset: f32,
    /// Whole steps taken since initialization.
    steps: u32,
}

impl<A: Attribute> PerspectiveLerp<A> {
    /// Set up a span of length `distance` from `(a0, z0)` to `(a1, z1)`.
    ///
    /// Depths must be non-zero; callers clip against the near plane first.
    /// A non-positive distance produces a constant cursor at the first
    /// endpoint.
    pub fn new(distance: f32, a0: A, z0: f32, a1: A, z1: f32) -> Self {
        let inv_z0 = 1.0 / z0;
        let inv_z1 = 1.0 / z1;
        let numerator = a0 * inv_z0;
        let (d_numerator, d_inv_depth) = if distance > 0.0 {
            let inv_d = 1.0 / distance;
            ((a1 * inv_z1 - numerator) * inv_d, (inv_z1 - inv_z0) * inv_d)
        } else {
            (numerator - numerator, 0.0)
        };
        Self {
            numerator,
            d_numerator,
            inv_depth: inv_z0,
            d_inv_depth,
            offset: 0.0,
            steps: 0,
        }
    }

    /// Move the cursor by `offset` units without replaying steps.
    ///
    /// Used to align the cursor to the first pixel center or to the first
    /// scanline of a clipped walk.
    #[inline]
    pub fn displace(&mut self, offset: f32) {
        self.offset += offset;
    }

    /// Advance by one unit.
    #[inline]
    pub fn step(&mut self) {
        self.steps += 1;
    }

    /// Advance by `n` whole units at once. Equivalent, bit for bit, to `n`
    /// calls to [`step`](Self::step).
    #[inline]
    pub fn advance(&mut self, n: u32) {
        self.steps += n;
    }

    /// Current position along the span, in units.
    #[inline]
    pub fn position(&self) -> f32 {
        self.offset + self.steps as f32
    }

    /// The perspective-correct attribute and true depth at the cursor.
    #[inline]
    pub fn value(&self) -> (A, f32) {
        let t = self.position();
        let inv_depth = self.inv_depth + self.d_inv_depth * t;
        let depth = 1.0 / inv_depth;
        ((self.numerator + self.d_numerator * t) * depth, depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector2;

    #[test]
    fn test_equal_depths_is_linear() {
        let mut it = PerspectiveLerp::new(4.0, 0.0f32, 3.0, 8.0, 3.0);
        for i in 0..=4 {
            let (a, z) = it.value();
            assert_relative_eq!(a, 2.0 * i as f32, epsilon = 1e-5);
            assert_relative_eq!(z, 3.0, epsilon = 1e-5);
            it.step();
        }
    }

    #[test]
    fn test_advance_matches_stepping_bitwise() {
        let mut stepped = PerspectiveLerp::new(7.3, 1.5f32, 0.7, -4.0, 9.1);
        stepped.displace(0.35);
        for _ in 0..5 {
            stepped.step();
        }
        let mut jumped = PerspectiveLerp::new(7.3, 1.5f32, 0.7, -4.0, 9.1);
        jumped.displace(0.35);
        jumped.advance(3);
        jumped.step();
        jumped.step();
        assert_eq!(stepped.value().0.to_bits(), jumped.value().0.to_bits());
        assert_eq!(stepped.value().1.to_bits(), jumped.value().1.to_bits());
    }

    #[test]
    fn test_vector_attribute_endpoints() {
        let a0 = Vector2::new(0.0f32, 1.0);
        let a1 = Vector2::new(1.0f32, 0.0);
        let mut it = PerspectiveLerp::new(2.0, a0, 1.0, a1, 4.0);
        assert_relative_eq!(it.value().0, a0, epsilon = 1e-6);
        it.step();
        it.step();
        assert_relative_eq!(it.value().0, a1, epsilon = 1e-5);
        assert_relative_eq!(it.value().1, 4.0, epsilon = 1e-5);
    }

    #[test]
    fn test_zero_distance_is_constant() {
        let mut it = PerspectiveLerp::new(0.0, 5.0f32, 2.0, 9.0, 3.0);
        it.step();
        let (a, z) = it.value();
        assert_relative_eq!(a, 5.0, epsilon = 1e-6);
        assert_relative_eq!(z, 2.0, epsilon = 1e-6);
    }
}
