use core::fmt;

use crate::angle::{rad_to_gon, Angle};
use crate::error::SurveyError;
use crate::float_math::{round8, FloatMath};
use crate::point::Point;

#[cfg(any(test, feature = "approx"))]
use approx::AbsDiffEq;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A grad-valued bearing from one survey point towards another, measured clockwise from
/// the grid-north axis of the projected plane.
///
/// Azimuths are ordinary [`Angle`]s with direction semantics attached: they can be derived
/// from two known points ([`Azimuth::between`]) or propagated along a chain of turned
/// horizontal angles ([`Azimuth::from_measurement`], [`Azimuth::for_traverse`]). The
/// propagation rule is the classic total-station one: occupying a station and turning the
/// horizontal circle by `β` relative to the backsight direction points the telescope at
/// `previous azimuth + β + 200` gradians.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct Azimuth {
    angle: Angle,
}

impl Azimuth {
    /// Constructs an azimuth from any angle-like value (normalized into `[0, 400)`).
    #[must_use]
    pub fn new(angle: impl Into<Angle>) -> Self {
        Self {
            angle: angle.into(),
        }
    }

    /// The underlying normalized angle.
    #[must_use]
    pub fn angle(&self) -> Angle {
        self.angle
    }

    /// The bearing in gradians, in `[0, 400)`.
    #[must_use]
    pub fn gon(&self) -> f64 {
        self.angle.gon()
    }

    /// Sine of the bearing (rounded to 8 decimals); the easting direction cosine.
    #[must_use]
    pub fn sin(&self) -> f64 {
        self.angle.sin()
    }

    /// Cosine of the bearing (rounded to 8 decimals); the northing direction cosine.
    #[must_use]
    pub fn cos(&self) -> f64 {
        self.angle.cos()
    }

    /// The back-azimuth: the same line sighted from its far end (`value + 200`).
    ///
    /// For any two points with distinct northings,
    /// `Azimuth::between(a, b)?.back() == Azimuth::between(b, a)?` within rounding.
    #[must_use]
    pub fn back(&self) -> Self {
        Self::new(self.gon() + 200.0)
    }

    /// Derives the azimuth of the line `from → to` on the projected plane.
    ///
    /// The quadrant is picked from the signs of the coordinate differences around
    /// `δ = atan(|Δx| / |Δy|)`:
    ///
    /// | Δx | Δy | azimuth |
    /// |----|----|---------|
    /// | +  | +  | δ       |
    /// | +  | −  | 200 − δ |
    /// | −  | −  | 200 + δ |
    /// | −  | +  | 400 − δ |
    ///
    /// # Errors
    ///
    /// Returns [`SurveyError::DegenerateGeometry`] when the points are coincident, share a
    /// northing (`Δy == 0`, which would divide by zero), or carry undefined coordinates
    /// (for example the sentinel produced by resolving an unknown station). Failing here
    /// keeps an undefined bearing from silently contaminating every downstream coordinate
    /// sum.
    pub fn between(from: &Point, to: &Point) -> Result<Self, SurveyError> {
        let dx = to.x() - from.x();
        let dy = to.y() - from.y();

        if !dx.is_finite() || !dy.is_finite() || dy == 0.0 {
            return Err(SurveyError::DegenerateGeometry {
                from: from.name().to_owned(),
                to: to.name().to_owned(),
            });
        }

        let delta = rad_to_gon(round8(FloatMath::atan(dx.abs() / dy.abs())));
        let gon = match (dx >= 0.0, dy > 0.0) {
            (true, true) => delta,
            (true, false) => 200.0 - delta,
            (false, false) => 200.0 + delta,
            (false, true) => 400.0 - delta,
        };

        Ok(Self::new(gon))
    }

    /// Advances a known azimuth by a single turned horizontal angle.
    #[must_use]
    pub fn from_measurement(start: Azimuth, turned: Angle) -> Self {
        Self::new(start.gon() + turned.gon() + 200.0)
    }

    /// The closing azimuth implied by a whole chain of turned angles:
    /// `start + Σβ + n·200`, normalized.
    ///
    /// Comparing this against the azimuth of the known closing baseline yields the angular
    /// misclosure of a traverse.
    #[must_use]
    pub fn from_measurements(start: Azimuth, turned: &[Angle]) -> Self {
        let sum: f64 = turned.iter().map(|angle| angle.gon()).sum();
        Self::new(start.gon() + sum + turned.len() as f64 * 200.0)
    }

    /// Propagates an azimuth through every turned angle of a traverse, in order.
    ///
    /// Element `i` is the bearing of the leg leaving the `i`-th occupied station. The
    /// recurrence is strictly sequential; each bearing depends on the previous one.
    #[must_use]
    pub fn for_traverse(start: Azimuth, turned: &[Angle]) -> Vec<Self> {
        let mut bearings = Vec::with_capacity(turned.len());
        let mut previous = start;
        for angle in turned {
            let next = Self::from_measurement(previous, *angle);
            bearings.push(next);
            previous = next;
        }
        bearings
    }
}

impl From<Angle> for Azimuth {
    fn from(angle: Angle) -> Self {
        Self { angle }
    }
}

impl fmt::Display for Azimuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} gon", self.gon())
    }
}

#[cfg(any(test, feature = "approx"))]
impl AbsDiffEq for Azimuth {
    type Epsilon = <Angle as AbsDiffEq>::Epsilon;

    fn default_epsilon() -> Self::Epsilon {
        Angle::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.angle.abs_diff_eq(&other.angle, epsilon)
    }
}

#[cfg(test)]
mod tests {
    use super::Azimuth;
    use crate::angle::Angle;
    use crate::error::SurveyError;
    use crate::point::Point;
    use approx::{assert_abs_diff_eq, AbsDiffEq};
    use quickcheck::{quickcheck, TestResult};
    use rstest::rstest;

    fn p(name: &str, x: f64, y: f64) -> Point {
        Point::new(name, x, y, 0.0)
    }

    #[rstest]
    #[case(100.0, 100.0, 50.0)]
    #[case(100.0, -100.0, 150.0)]
    #[case(-100.0, -100.0, 250.0)]
    #[case(-100.0, 100.0, 350.0)]
    #[case(0.0, 100.0, 0.0)]
    #[case(0.0, -100.0, 200.0)]
    fn quadrants_resolve_clockwise_from_north(
        #[case] dx: f64,
        #[case] dy: f64,
        #[case] expected: f64,
    ) {
        let azimuth = Azimuth::between(&p("A", 0.0, 0.0), &p("B", dx, dy)).unwrap();
        assert_abs_diff_eq!(azimuth, Azimuth::new(expected), epsilon = 1e-6);
    }

    #[rstest]
    #[case(p("A", 0.0, 0.0), p("B", 100.0, 0.0))]
    #[case(p("A", 0.0, 0.0), p("B", 0.0, 0.0))]
    #[case(p("A", 0.0, 0.0), Point::unknown("B"))]
    fn degenerate_lines_are_rejected(#[case] from: Point, #[case] to: Point) {
        assert_eq!(
            Azimuth::between(&from, &to),
            Err(SurveyError::DegenerateGeometry {
                from: "A".to_owned(),
                to: "B".to_owned(),
            })
        );
    }

    quickcheck! {
        fn reciprocity(ax: i16, ay: i16, bx: i16, by: i16) -> TestResult {
            if ay == by {
                return TestResult::discard();
            }
            let a = p("A", ax as f64, ay as f64);
            let b = p("B", bx as f64, by as f64);

            let forward = Azimuth::between(&a, &b).unwrap();
            let backward = Azimuth::between(&b, &a).unwrap();

            TestResult::from_bool(forward.back().abs_diff_eq(&backward, 1e-6))
        }
    }

    #[test]
    fn chain_of_turned_angles_implies_the_closing_azimuth() {
        let turned = [
            Angle::new(250.0),
            Angle::new(350.0),
            Angle::new(350.0),
            Angle::new(50.0),
        ];
        let measured = Azimuth::from_measurements(Azimuth::new(0.0), &turned);
        assert_abs_diff_eq!(measured, Azimuth::new(200.0));
    }

    #[test]
    fn propagation_is_sequential() {
        let turned = [
            Angle::new(250.0),
            Angle::new(350.0),
            Angle::new(350.0),
            Angle::new(50.0),
        ];
        let bearings = Azimuth::for_traverse(Azimuth::new(0.0), &turned);
        let expected = [50.0, 200.0, 350.0, 200.0];

        assert_eq!(bearings.len(), expected.len());
        for (bearing, expected) in bearings.iter().zip(expected) {
            assert_abs_diff_eq!(*bearing, Azimuth::new(expected));
        }

        // the last propagated bearing and the whole-chain form must agree
        assert_abs_diff_eq!(
            bearings[3],
            Azimuth::from_measurements(Azimuth::new(0.0), &turned)
        );
    }

    #[test]
    fn single_measurement_orientation() {
        let oriented = Azimuth::from_measurement(Azimuth::new(0.0), Angle::new(100.0));
        assert_eq!(oriented.gon(), 300.0);
    }
}
