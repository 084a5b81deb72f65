use core::fmt;

use crate::azimuth::Azimuth;
use crate::distance::{DeltaHeight, GridDistance};
use crate::error::SurveyError;
use crate::float_math::round6;
use crate::Point3;

#[cfg(any(test, feature = "approx"))]
use approx::AbsDiffEq;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A named survey point on the projected plane: easting `x`, northing `y`, elevation `z`.
///
/// The name is the point's identity -- registries key on it and observation rows refer to
/// it -- and is immutable. Coordinates only ever change through explicit copy-style
/// operations ([`Point::offset`], [`Point::with_name`]); the reduction pipeline never
/// mutates a point in place.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point {
    name: String,
    point: Point3,
}

impl Point {
    /// Constructs a point from projected-grid coordinates in meters.
    #[must_use]
    pub fn new(name: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            name: name.into(),
            point: Point3::new(x, y, z),
        }
    }

    /// The sentinel returned when a station id cannot be resolved: a named point whose
    /// coordinates are all undefined.
    ///
    /// Sentinels keep batch processing of many groups alive -- a lookup miss poisons only
    /// the unit that touches it, and [`Point::is_known`] (or the [`Azimuth::between`]
    /// degeneracy check) stops it from reaching coordinate sums.
    #[must_use]
    pub fn unknown(name: impl Into<String>) -> Self {
        Self::new(name, f64::NAN, f64::NAN, f64::NAN)
    }

    /// The station id.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Easting in meters.
    #[must_use]
    pub fn x(&self) -> f64 {
        self.point.x
    }

    /// Northing in meters.
    #[must_use]
    pub fn y(&self) -> f64 {
        self.point.y
    }

    /// Elevation in meters.
    #[must_use]
    pub fn z(&self) -> f64 {
        self.point.z
    }

    /// Whether all three coordinates are defined (ie, this is not a sentinel).
    #[must_use]
    pub fn is_known(&self) -> bool {
        self.point.coords.iter().all(|coordinate| coordinate.is_finite())
    }

    /// The azimuth of the line from this point towards `other`.
    ///
    /// # Errors
    ///
    /// See [`Azimuth::between`].
    pub fn azimuth_to(&self, other: &Point) -> Result<Azimuth, SurveyError> {
        Azimuth::between(self, other)
    }

    /// The planar grid distance from this point to `other`.
    #[must_use]
    pub fn distance_to(&self, other: &Point) -> GridDistance {
        GridDistance::between(self, other)
    }

    /// Projects a new point by polar coordinates from this one:
    /// `x + d·sin(azimuth)`, `y + d·cos(azimuth)`, `z + Δh`.
    ///
    /// This is the radiation formula used by sideshots and by traverse integration;
    /// emitted coordinates are rounded to 6 decimals.
    #[must_use]
    pub fn polar_to(
        &self,
        name: impl Into<String>,
        azimuth: Azimuth,
        distance: GridDistance,
        delta_height: DeltaHeight,
    ) -> Point {
        Point::new(
            name,
            round6(self.x() + distance.meters() * azimuth.sin()),
            round6(self.y() + distance.meters() * azimuth.cos()),
            round6(self.z() + delta_height.meters()),
        )
    }

    /// A copy of this point shifted by the given coordinate deltas.
    #[must_use]
    pub fn offset(&self, dx: f64, dy: f64, dz: f64) -> Point {
        Point::new(self.name.clone(), self.x() + dx, self.y() + dy, self.z() + dz)
    }

    /// A copy of this point under a different station id.
    #[must_use]
    pub fn with_name(&self, name: impl Into<String>) -> Point {
        Point::new(name, self.x(), self.y(), self.z())
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.3}, {:.3}, {:.3})",
            self.name,
            self.x(),
            self.y(),
            self.z()
        )
    }
}

/// Compares coordinates only; point names are identity, not geometry.
#[cfg(any(test, feature = "approx"))]
impl AbsDiffEq for Point {
    type Epsilon = <f64 as AbsDiffEq>::Epsilon;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        f64::abs_diff_eq(&self.x(), &other.x(), epsilon)
            && f64::abs_diff_eq(&self.y(), &other.y(), epsilon)
            && f64::abs_diff_eq(&self.z(), &other.z(), epsilon)
    }
}

#[cfg(test)]
mod tests {
    use super::Point;
    use crate::azimuth::Azimuth;
    use crate::distance::{DeltaHeight, GridDistance};
    use approx::assert_abs_diff_eq;
    use uom::si::f64::Length;
    use uom::si::length::meter;

    fn m(meters: f64) -> Length {
        Length::new::<meter>(meters)
    }

    #[test]
    fn polar_projection_radiates_from_the_station() {
        let station = Point::new("S1", 1000.0, 2000.0, 150.0);
        let projected = station.polar_to(
            "P1",
            Azimuth::new(50.0),
            GridDistance::new(m(100.0)),
            DeltaHeight::new(m(-2.5)),
        );

        assert_eq!(projected.name(), "P1");
        assert_abs_diff_eq!(projected.x(), 1000.0 + 100.0 * 0.707_106_78, epsilon = 1e-6);
        assert_abs_diff_eq!(projected.y(), 2000.0 + 100.0 * 0.707_106_78, epsilon = 1e-6);
        assert_abs_diff_eq!(projected.z(), 147.5, epsilon = 1e-6);

        // radiating and re-measuring must agree on the planar distance
        assert_abs_diff_eq!(
            station.distance_to(&projected).meters(),
            100.0,
            epsilon = 1e-4
        );
    }

    #[test]
    fn offset_and_rename_leave_the_original_untouched() {
        let original = Point::new("A", 1.0, 2.0, 3.0);
        let shifted = original.offset(0.5, -0.5, 0.0);
        let renamed = original.with_name("B");

        assert_eq!(original, Point::new("A", 1.0, 2.0, 3.0));
        assert_eq!(shifted, Point::new("A", 1.5, 1.5, 3.0));
        assert_eq!(renamed, Point::new("B", 1.0, 2.0, 3.0));
    }

    #[test]
    fn sentinel_points_are_not_known() {
        assert!(!Point::unknown("missing").is_known());
        assert!(Point::new("fine", 0.0, 0.0, 0.0).is_known());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn points_round_trip_through_serde() {
        let point = Point::new("A1", 1234.5678, 8765.4321, 101.25);
        let yaml = serde_yaml::to_string(&point).unwrap();
        let back: Point = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, point);
    }
}
