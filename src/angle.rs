use core::f64::consts::PI;
use core::fmt;
use core::ops::{Add, Sub};

use uom::si::angle::gon;
use uom::si::f64::Angle as UomAngle;

use crate::float_math::{round8, FloatMath};

#[cfg(any(test, feature = "approx"))]
use approx::{AbsDiffEq, RelativeEq};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A horizontal or vertical circle reading in gradians, normalized to `[0, 400)`.
///
/// Total stations used on projected national grids read angles in gradians (also called
/// "gon"; 400 gon = 360°), and every value handed to or produced by this crate is kept in
/// that unit. Construction normalizes with plain modular arithmetic
/// (`value.rem_euclid(400)`) and rounds the result to 8 decimals, so chained turned-angle
/// sums stay reproducible no matter how many legs a traverse has.
///
/// ```
/// use misclose::Angle;
///
/// assert_eq!(Angle::new(450.0).gon(), 50.0);
/// assert_eq!(Angle::new(-50.0).gon(), 350.0);
/// assert_eq!((Angle::new(350.0) + Angle::new(100.0)).gon(), 50.0);
/// ```
///
/// The value can also be built from (and converted back into) a [`uom`] angle, which takes
/// care of unit conversions for callers holding degrees or radians:
///
/// ```
/// use misclose::Angle;
/// use uom::si::f64::Angle as UomAngle;
/// use uom::si::angle::degree;
///
/// assert_eq!(Angle::from(UomAngle::new::<degree>(180.0)).gon(), 200.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(from = "f64", into = "f64")
)]
pub struct Angle {
    gon: f64,
}

impl Angle {
    /// Constructs an angle from a raw gradian reading, normalizing it into `[0, 400)`.
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self {
            gon: resolve(value),
        }
    }

    /// Returns the normalized value in gradians, in `[0, 400)`.
    #[must_use]
    pub fn gon(&self) -> f64 {
        self.gon
    }

    /// Returns the same direction expressed in `(-200, 200]` gradians.
    ///
    /// Useful for signed differences such as angular misclosures, where `399.9` and `-0.1`
    /// must compare as a tenth of a gradian, not as nearly a full turn.
    #[must_use]
    pub fn to_signed(&self) -> f64 {
        if self.gon > 200.0 {
            self.gon - 400.0
        } else {
            self.gon
        }
    }

    /// The value converted to radians (`gon * π / 200`), rounded to 8 decimals.
    #[must_use]
    pub fn to_radians(&self) -> f64 {
        round8(self.gon * PI / 200.0)
    }

    /// Sine of the reading, rounded to 8 decimals.
    #[must_use]
    pub fn sin(&self) -> f64 {
        round8(FloatMath::sin(self.to_radians()))
    }

    /// Cosine of the reading, rounded to 8 decimals.
    #[must_use]
    pub fn cos(&self) -> f64 {
        round8(FloatMath::cos(self.to_radians()))
    }

    /// The explement of the reading (`400 - value`), normalized.
    ///
    /// For an azimuth-like reading this is the same direction measured the other way
    /// around the circle.
    #[must_use]
    pub fn reverse(&self) -> Self {
        Self::new(400.0 - self.gon)
    }

    /// Converts into a [`uom`] angle for interop with unit-aware callers.
    #[must_use]
    pub fn to_uom(&self) -> UomAngle {
        UomAngle::new::<gon>(self.gon)
    }
}

/// Normalization rule shared by every constructor: wrap into `[0, 400)`, then round to
/// 8 decimals, re-wrapping the single case where rounding lands exactly on 400.
fn resolve(value: f64) -> f64 {
    let bounded = value.rem_euclid(400.0);
    let rounded = round8(bounded);
    if rounded >= 400.0 {
        rounded - 400.0
    } else {
        rounded
    }
}

/// Converts radians to gradians (`rad * 200 / π`), rounded to 8 decimals.
pub(crate) fn rad_to_gon(radians: f64) -> f64 {
    round8(radians * 200.0 / PI)
}

impl From<f64> for Angle {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<Angle> for f64 {
    fn from(angle: Angle) -> Self {
        angle.gon
    }
}

impl From<UomAngle> for Angle {
    fn from(angle: UomAngle) -> Self {
        Self::new(angle.get::<gon>())
    }
}

impl From<Angle> for UomAngle {
    fn from(angle: Angle) -> Self {
        angle.to_uom()
    }
}

impl Add for Angle {
    type Output = Angle;

    fn add(self, rhs: Angle) -> Angle {
        Angle::new(self.gon + rhs.gon)
    }
}

impl Add<f64> for Angle {
    type Output = Angle;

    fn add(self, rhs: f64) -> Angle {
        Angle::new(self.gon + rhs)
    }
}

impl Sub for Angle {
    type Output = Angle;

    fn sub(self, rhs: Angle) -> Angle {
        Angle::new(self.gon - rhs.gon)
    }
}

impl Sub<f64> for Angle {
    type Output = Angle;

    fn sub(self, rhs: f64) -> Angle {
        Angle::new(self.gon - rhs)
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} gon", self.gon)
    }
}

#[cfg(any(test, feature = "approx"))]
impl AbsDiffEq for Angle {
    type Epsilon = <f64 as AbsDiffEq>::Epsilon;

    fn default_epsilon() -> Self::Epsilon {
        // the stage rounding quantizes at 1e-8 gon, so anything tighter is noise
        1e-8
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        // compare along the shortest arc so 399.999... and 0.000... are equal
        Angle::new(self.gon - other.gon).to_signed().abs() <= epsilon
    }
}

#[cfg(any(test, feature = "approx"))]
impl RelativeEq for Angle {
    fn default_max_relative() -> Self::Epsilon {
        f64::default_max_relative()
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        let min = f64::min(self.gon, other.gon);
        let max = f64::max(self.gon, other.gon);

        f64::relative_eq(&min, &max, epsilon, max_relative)
            || f64::relative_eq(&(min + 400.0), &max, epsilon, max_relative)
    }
}

#[cfg(test)]
mod tests {
    use super::Angle;
    use approx::assert_abs_diff_eq;
    use quickcheck::{quickcheck, TestResult};
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(400.0, 0.0)]
    #[case(450.0, 50.0)]
    #[case(800.0, 0.0)]
    #[case(1350.0, 150.0)]
    #[case(-50.0, 350.0)]
    #[case(-450.0, 350.0)]
    #[case(123.456_789_014, 123.456_789_01)]
    #[case(399.999_999_999, 0.0)]
    fn resolves_into_range(#[case] raw: f64, #[case] expected: f64) {
        assert_eq!(Angle::new(raw).gon(), expected);
    }

    quickcheck! {
        fn resolve_is_idempotent_and_in_range(value: f64) -> TestResult {
            if !value.is_finite() {
                return TestResult::discard();
            }
            let once = Angle::new(value);
            if !(0.0..400.0).contains(&once.gon()) {
                return TestResult::failed();
            }
            TestResult::from_bool(Angle::new(once.gon()) == once)
        }
    }

    #[rstest]
    #[case(350.0, 100.0, 50.0)]
    #[case(200.0, 200.0, 0.0)]
    #[case(123.4567, 0.0, 123.4567)]
    fn addition_wraps(#[case] lhs: f64, #[case] rhs: f64, #[case] expected: f64) {
        assert_eq!((Angle::new(lhs) + Angle::new(rhs)).gon(), expected);
        assert_eq!((Angle::new(lhs) + rhs).gon(), expected);
    }

    #[rstest]
    #[case(50.0, 100.0, 350.0)]
    #[case(0.0, 0.1, 399.9)]
    fn subtraction_wraps(#[case] lhs: f64, #[case] rhs: f64, #[case] expected: f64) {
        assert_eq!((Angle::new(lhs) - Angle::new(rhs)).gon(), expected);
        assert_eq!((Angle::new(lhs) - rhs).gon(), expected);
    }

    #[rstest]
    #[case(150.0, 250.0)]
    #[case(0.0, 0.0)]
    #[case(399.9, 0.1)]
    fn reverse_reads_the_other_way(#[case] raw: f64, #[case] expected: f64) {
        assert_abs_diff_eq!(Angle::new(raw).reverse(), Angle::new(expected));
    }

    #[rstest]
    #[case(100.0, 1.0, 0.0)]
    #[case(300.0, -1.0, 0.0)]
    #[case(200.0, 0.0, -1.0)]
    #[case(0.0, 0.0, 1.0)]
    #[case(50.0, 0.707_106_78, 0.707_106_78)]
    fn trig_matches_the_cardinal_readings(
        #[case] raw: f64,
        #[case] expected_sin: f64,
        #[case] expected_cos: f64,
    ) {
        let angle = Angle::new(raw);
        assert_eq!(angle.sin(), expected_sin);
        assert_eq!(angle.cos(), expected_cos);
    }

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(200.0, 200.0)]
    #[case(300.0, -100.0)]
    #[case(399.9, -0.1)]
    fn signed_form_takes_the_short_way(#[case] raw: f64, #[case] expected: f64) {
        assert_abs_diff_eq!(Angle::new(raw).to_signed(), expected, epsilon = 1e-9);
    }

    #[test]
    fn uom_interop_round_trips() {
        use uom::si::angle::degree;
        use uom::si::f64::Angle as UomAngle;

        let angle = Angle::from(UomAngle::new::<degree>(90.0));
        assert_eq!(angle.gon(), 100.0);
        assert_abs_diff_eq!(Angle::from(angle.to_uom()), angle);
    }
}
