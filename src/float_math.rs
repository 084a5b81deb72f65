//! Math operations that work in both std and no-std environments.
//!
//! This module provides a unified interface for mathematical operations that can use either
//! the standard library (when the `std` feature is enabled) or `libm` (in no-std environments).

#[cfg(not(any(feature = "std", feature = "libm")))]
compile_error!(
    "misclose requires floating-point math support. \
     Enable either the `std` feature (default) or the `libm` feature for no-std environments."
);

/// Extension trait for f64 to provide math operations in a no-std compatible way
pub(crate) trait FloatMath {
    fn sin(self) -> Self;
    fn cos(self) -> Self;
    fn atan(self) -> Self;
    fn sqrt(self) -> Self;
    fn round(self) -> Self;
    fn abs(self) -> Self;
    fn powi(self, n: i32) -> Self;
}

#[cfg(feature = "std")]
impl FloatMath for f64 {
    #[inline]
    fn sin(self) -> Self {
        f64::sin(self)
    }

    #[inline]
    fn cos(self) -> Self {
        f64::cos(self)
    }

    #[inline]
    fn atan(self) -> Self {
        f64::atan(self)
    }

    #[inline]
    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }

    #[inline]
    fn round(self) -> Self {
        f64::round(self)
    }

    #[inline]
    fn abs(self) -> Self {
        f64::abs(self)
    }

    #[inline]
    fn powi(self, n: i32) -> Self {
        f64::powi(self, n)
    }
}

#[cfg(all(not(feature = "std"), feature = "libm"))]
impl FloatMath for f64 {
    #[inline]
    fn sin(self) -> Self {
        libm::sin(self)
    }

    #[inline]
    fn cos(self) -> Self {
        libm::cos(self)
    }

    #[inline]
    fn atan(self) -> Self {
        libm::atan(self)
    }

    #[inline]
    fn sqrt(self) -> Self {
        libm::sqrt(self)
    }

    #[inline]
    fn round(self) -> Self {
        libm::round(self)
    }

    #[inline]
    fn abs(self) -> Self {
        libm::fabs(self)
    }

    #[inline]
    fn powi(self, n: i32) -> Self {
        libm::pow(self, n as f64)
    }
}

/// Rounds to the fixed 8-decimal precision applied at every reduction-stage boundary.
///
/// Long traverses chain many multiplications of near-unity factors; rounding each stage
/// keeps floating noise from drifting between otherwise identical reductions.
#[inline]
pub(crate) fn round8(value: f64) -> f64 {
    FloatMath::round(value * 1e8) / 1e8
}

/// Rounds emitted coordinates to 6 decimals (micrometers on a projected grid).
#[inline]
pub(crate) fn round6(value: f64) -> f64 {
    FloatMath::round(value * 1e6) / 1e6
}

/// Rounds mean elevations to 3 decimals (millimeters).
#[inline]
pub(crate) fn round3(value: f64) -> f64 {
    FloatMath::round(value * 1e3) / 1e3
}

#[cfg(test)]
mod tests {
    use super::{round3, round6, round8};

    #[test]
    fn rounding_is_exact_at_each_precision() {
        assert_eq!(round8(1.234_567_894_9), 1.234_567_89);
        assert_eq!(round8(1.234_567_895_1), 1.234_567_9);
        assert_eq!(round6(-0.000_000_4), -0.0);
        assert_eq!(round3(12.345_6), 12.346);
    }

    #[test]
    fn rounding_preserves_already_rounded_values() {
        let v = round8(123.456_789_12);
        assert_eq!(round8(v), v);
    }
}
