use core::fmt;

use uom::si::f64::Length;
use uom::si::length::meter;

use crate::angle::Angle;
use crate::float_math::{round8, FloatMath};
use crate::point::Point;

#[cfg(any(test, feature = "approx"))]
use approx::AbsDiffEq;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Mean earth radius in meters, used for the sea-level (reference-surface) reduction.
#[doc(alias = "R")]
pub const MEAN_EARTH_RADIUS: f64 = 6_371_000.0;

/// Local scale factor of the projection plane, computed from the eastings of the two
/// stations bounding a reduction.
///
/// This is the empirical polynomial for the EGSA'87 transverse-Mercator grid,
///
/// ```text
/// k = 1 + (12311 · (x̄·10⁻⁶ − 0.5)² − 400) · 10⁻⁶,    x̄ = (x₁ + x₂) / 2
/// ```
///
/// and is deliberately not configurable; reductions on that grid must reproduce it bit
/// for bit. It is evaluated once per traverse or sideshot group, not per shot.
#[must_use]
pub fn scale_factor(x1: f64, x2: f64) -> f64 {
    let mean = (x1 + x2) / 2.0;
    round8(1.0 + (12_311.0 * FloatMath::powi(mean * 1e-6 - 0.5, 2) - 400.0) * 1e-6)
}

macro_rules! distance_stage {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq)]
        #[cfg_attr(
            feature = "serde",
            derive(Serialize, Deserialize),
            serde(transparent)
        )]
        pub struct $name {
            length: Length,
        }

        impl $name {
            /// Wraps a length in this reduction stage.
            #[must_use]
            pub fn new(length: impl Into<Length>) -> Self {
                Self {
                    length: length.into(),
                }
            }

            pub(crate) fn from_meters(meters: f64) -> Self {
                Self {
                    length: Length::new::<meter>(meters),
                }
            }

            /// The value in meters.
            #[must_use]
            pub fn meters(&self) -> f64 {
                self.length.get::<meter>()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:.4} m", self.meters())
            }
        }

        #[cfg(any(test, feature = "approx"))]
        impl AbsDiffEq for $name {
            type Epsilon = <f64 as AbsDiffEq>::Epsilon;

            fn default_epsilon() -> Self::Epsilon {
                f64::default_epsilon()
            }

            fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
                f64::abs_diff_eq(&self.meters(), &other.meters(), epsilon)
            }
        }
    };
}

distance_stage! {
    /// A raw slope distance as read off the instrument, before any reduction.
    SlopeDistance
}

distance_stage! {
    /// A slope distance projected onto the horizontal plane of the instrument.
    HorizontalDistance
}

distance_stage! {
    /// A horizontal distance reduced to the sea-level reference surface.
    #[doc(alias = "surface distance")]
    ReferenceDistance
}

distance_stage! {
    /// A reference distance scaled onto the projection plane; the metric actually plotted.
    #[doc(alias = "EGSA distance")]
    GridDistance
}

distance_stage! {
    /// A signed elevation difference between the two endpoints of a shot.
    DeltaHeight
}

impl SlopeDistance {
    /// Projects the slope reading onto the horizontal plane: `slope · sin(v)`.
    ///
    /// The vertical circle reads zero at the zenith, so a level sight is `v = 100` gon and
    /// `sin(v) = 1`; any other pointing shortens the horizontal component.
    #[must_use]
    pub fn to_horizontal(&self, vertical: Angle) -> HorizontalDistance {
        HorizontalDistance::from_meters(round8(self.meters() * vertical.sin()))
    }

    /// Elevation difference between the occupied station and the sighted target:
    /// `slope · cos(v) + instrument height − target height`.
    #[must_use]
    pub fn to_delta_height(
        &self,
        vertical: Angle,
        station_height: impl Into<Length>,
        target_height: impl Into<Length>,
    ) -> DeltaHeight {
        let station_height = station_height.into().get::<meter>();
        let target_height = target_height.into().get::<meter>();
        DeltaHeight::from_meters(round8(
            self.meters() * vertical.cos() + station_height - target_height,
        ))
    }
}

impl HorizontalDistance {
    /// Reduces to the sea-level reference surface: `horizontal · R / (R + elevation)`.
    ///
    /// `mean_elevation` is the mean of the two known station elevations bounding the
    /// reduction, not something re-derived per shot.
    #[must_use]
    pub fn to_reference(&self, mean_elevation: impl Into<Length>) -> ReferenceDistance {
        let elevation = mean_elevation.into().get::<meter>();
        ReferenceDistance::from_meters(round8(
            self.meters() * MEAN_EARTH_RADIUS / (MEAN_EARTH_RADIUS + elevation),
        ))
    }
}

impl ReferenceDistance {
    /// Scales onto the projection plane with the local [`scale_factor`]: `reference · k`.
    #[must_use]
    pub fn to_grid(&self, k: f64) -> GridDistance {
        GridDistance::from_meters(round8(self.meters() * k))
    }
}

impl GridDistance {
    /// The planar distance between two already-projected points.
    #[must_use]
    pub fn between(a: &Point, b: &Point) -> Self {
        let dx = b.x() - a.x();
        let dy = b.y() - a.y();
        Self::from_meters(round8(FloatMath::sqrt(dx * dx + dy * dy)))
    }
}

#[cfg(test)]
mod tests {
    use super::{scale_factor, GridDistance, SlopeDistance, MEAN_EARTH_RADIUS};
    use crate::angle::Angle;
    use crate::point::Point;
    use approx::assert_abs_diff_eq;
    use quickcheck::{quickcheck, TestResult};
    use rstest::rstest;
    use uom::si::f64::Length;
    use uom::si::length::meter;

    fn m(meters: f64) -> Length {
        Length::new::<meter>(meters)
    }

    #[test]
    fn level_sight_keeps_the_full_slope_length() {
        let horizontal = SlopeDistance::new(m(50.0)).to_horizontal(Angle::new(100.0));
        assert_eq!(horizontal.meters(), 50.0);
    }

    #[rstest]
    #[case(100.0, 50.0)] // level
    #[case(50.0, 35.355_339)] // 45° above level: 100·sin(50 gon)
    #[case(150.0, 35.355_339)] // 45° below level
    fn slope_reduction_follows_the_vertical_circle(#[case] vertical: f64, #[case] expected: f64) {
        let horizontal = SlopeDistance::new(m(50.0)).to_horizontal(Angle::new(vertical));
        assert_abs_diff_eq!(horizontal.meters(), expected, epsilon = 1e-6);
    }

    quickcheck! {
        fn horizontal_never_exceeds_slope(slope: u16, vertical: u16) -> TestResult {
            let slope = f64::from(slope);
            let vertical = f64::from(vertical) % 200.0;
            if slope == 0.0 || vertical == 0.0 {
                return TestResult::discard();
            }

            let horizontal = SlopeDistance::new(m(slope))
                .to_horizontal(Angle::new(vertical))
                .meters();
            TestResult::from_bool(horizontal <= slope)
        }
    }

    #[test]
    fn reference_reduction_shrinks_with_elevation() {
        let horizontal = SlopeDistance::new(m(1000.0)).to_horizontal(Angle::new(100.0));
        let reference = horizontal.to_reference(m(500.0));

        let expected = 1000.0 * MEAN_EARTH_RADIUS / (MEAN_EARTH_RADIUS + 500.0);
        assert_abs_diff_eq!(reference.meters(), expected, epsilon = 1e-6);
        assert!(reference.meters() < horizontal.meters());
    }

    #[test]
    fn grid_scaling_applies_the_factor() {
        let reference = SlopeDistance::new(m(100.0))
            .to_horizontal(Angle::new(100.0))
            .to_reference(m(0.0));
        let grid = reference.to_grid(1.000_2);
        assert_abs_diff_eq!(grid.meters(), 100.02, epsilon = 1e-6);
    }

    #[rstest]
    // at x̄ = 500 km the grid sits on the central meridian: k = 1 − 400e-6
    #[case(500_000.0, 500_000.0, 0.999_6)]
    #[case(0.0, 0.0, 1.002_677_75)]
    #[case(1000.0, 1000.0, 1.002_665_45)]
    fn scale_factor_matches_the_grid_polynomial(
        #[case] x1: f64,
        #[case] x2: f64,
        #[case] expected: f64,
    ) {
        assert_abs_diff_eq!(scale_factor(x1, x2), expected, epsilon = 1e-8);
    }

    #[rstest]
    #[case(100.0, 1.5, 1.5, 0.0)] // level sight, equal heights
    #[case(100.0, 1.5, 1.8, -0.3)] // level sight, taller target
    #[case(50.0, 0.0, 0.0, 35.355_339)] // steep upward sight: 50·cos(50 gon)
    fn delta_height_combines_slope_and_heights(
        #[case] vertical: f64,
        #[case] station_height: f64,
        #[case] target_height: f64,
        #[case] expected: f64,
    ) {
        let delta = SlopeDistance::new(m(50.0)).to_delta_height(
            Angle::new(vertical),
            m(station_height),
            m(target_height),
        );
        assert_abs_diff_eq!(delta.meters(), expected, epsilon = 1e-6);
    }

    #[test]
    fn planar_distance_between_points() {
        let a = Point::new("A", 0.0, 0.0, 0.0);
        let b = Point::new("B", 30.0, 40.0, 12.0);
        assert_eq!(GridDistance::between(&a, &b).meters(), 50.0);
    }
}
