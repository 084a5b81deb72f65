use uom::si::f64::Length;
use uom::si::length::meter;

use crate::azimuth::Azimuth;
use crate::distance::{scale_factor, GridDistance, HorizontalDistance, ReferenceDistance};
use crate::error::SurveyError;
use crate::float_math::round3;
use crate::measurement::Measurement;
use crate::point::Point;
use crate::registry::StationRegistry;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A fan of radial shots from one known station, oriented on one known backsight.
///
/// Sideshots have no closure constraint: nothing is adjusted, nothing is distributed.
/// Every shot is reduced and radiated independently, so a malformed row can only poison
/// its own resolved point, never its neighbors'.
#[derive(Debug, Clone)]
pub struct Sideshot {
    station: Point,
    backsight: Point,
    rows: Vec<Measurement>,
}

impl Sideshot {
    /// Sets up a radial group observed from `station` with the circle zeroed at
    /// `backsight`.
    #[must_use]
    pub fn new(
        station: Point,
        backsight: Point,
        rows: impl IntoIterator<Item = Measurement>,
    ) -> Self {
        Self {
            station,
            backsight,
            rows: rows.into_iter().collect(),
        }
    }

    /// The occupied station.
    #[must_use]
    pub fn station(&self) -> &Point {
        &self.station
    }

    /// The orientation backsight.
    #[must_use]
    pub fn backsight(&self) -> &Point {
        &self.backsight
    }

    /// Resolves every shot of the group into an absolute point.
    ///
    /// The station azimuth, mean elevation, and projection scale factor are derived once
    /// from the station/backsight pair; each shot then runs the full distance reduction
    /// chain and is radiated by `station + (d·sin a, d·cos a, Δh)`.
    ///
    /// # Errors
    ///
    /// [`SurveyError::DegenerateGeometry`] if the station/backsight pair admits no
    /// azimuth (coincident, equal northing, or sentinel coordinates).
    pub fn compute(&self) -> Result<SideshotSolution, SurveyError> {
        let orientation = self.station.azimuth_to(&self.backsight)?;
        let mean_elevation =
            Length::new::<meter>(round3((self.station.z() + self.backsight.z()) / 2.0));
        let k = scale_factor(self.station.x(), self.backsight.x());

        let rows: Vec<SideshotRow> = self
            .rows
            .iter()
            .map(|shot| {
                let horizontal = shot.slope_distance.to_horizontal(shot.v_angle);
                let reference = horizontal.to_reference(mean_elevation);
                let grid = reference.to_grid(k);
                let azimuth = Azimuth::from_measurement(orientation, shot.h_angle);
                let delta_height = shot.slope_distance.to_delta_height(
                    shot.v_angle,
                    shot.station_height,
                    shot.target_height,
                );
                let point = self
                    .station
                    .polar_to(shot.fs.clone(), azimuth, grid, delta_height);

                SideshotRow {
                    target: shot.fs.clone(),
                    horizontal,
                    reference,
                    grid,
                    azimuth,
                    point,
                }
            })
            .collect();

        let points = rows.iter().map(|row| row.point.clone()).collect();

        Ok(SideshotSolution {
            station: self.station.name().to_owned(),
            backsight: self.backsight.name().to_owned(),
            rows,
            points,
        })
    }
}

/// One resolved radial shot.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SideshotRow {
    /// The foresight id; the resolved point carries the same name.
    pub target: String,
    pub horizontal: HorizontalDistance,
    pub reference: ReferenceDistance,
    pub grid: GridDistance,
    pub azimuth: Azimuth,
    pub point: Point,
}

/// The resolved points of one radial group.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SideshotSolution {
    station: String,
    backsight: String,
    rows: Vec<SideshotRow>,
    points: StationRegistry,
}

impl SideshotSolution {
    /// The occupied station id.
    #[must_use]
    pub fn station(&self) -> &str {
        &self.station
    }

    /// The backsight id.
    #[must_use]
    pub fn backsight(&self) -> &str {
        &self.backsight
    }

    /// The per-shot detail rows, in observation order.
    #[must_use]
    pub fn rows(&self) -> &[SideshotRow] {
        &self.rows
    }

    /// The resolved points, keyed by foresight id.
    #[must_use]
    pub fn points(&self) -> &StationRegistry {
        &self.points
    }
}

#[cfg(test)]
mod tests {
    use super::Sideshot;
    use crate::angle::Angle;
    use crate::distance::{scale_factor, SlopeDistance, MEAN_EARTH_RADIUS};
    use crate::error::SurveyError;
    use crate::measurement::Measurement;
    use crate::point::Point;
    use approx::assert_abs_diff_eq;
    use uom::si::f64::Length;
    use uom::si::length::meter;

    fn m(meters: f64) -> Length {
        Length::new::<meter>(meters)
    }

    fn shot(fs: &str, h_angle: f64, v_angle: f64, slope: f64) -> Measurement {
        Measurement {
            bs: "B".to_owned(),
            station: "A".to_owned(),
            fs: fs.to_owned(),
            h_angle: Angle::new(h_angle),
            v_angle: Angle::new(v_angle),
            slope_distance: SlopeDistance::new(m(slope)),
            station_height: m(1.6),
            target_height: m(1.6),
        }
    }

    fn station() -> Point {
        Point::new("A", 1000.0, 1000.0, 100.0)
    }

    fn backsight() -> Point {
        Point::new("B", 1000.0, 1100.0, 100.0)
    }

    #[test]
    fn quarter_turn_level_shot_radiates_due_west() {
        let group = Sideshot::new(station(), backsight(), [shot("P1", 100.0, 100.0, 50.0)]);
        assert_eq!(group.station().name(), "A");
        assert_eq!(group.backsight().name(), "B");

        let solution = group.compute().unwrap();
        assert_eq!(solution.station(), "A");

        let row = &solution.rows()[0];
        // due-north backsight, quarter turn: 0 + 100 + 200
        assert_eq!(row.azimuth.gon(), 300.0);

        // expected straight from the reduction formulas
        let k = scale_factor(1000.0, 1000.0);
        let expected_grid = 50.0 * MEAN_EARTH_RADIUS / (MEAN_EARTH_RADIUS + 100.0) * k;

        assert_abs_diff_eq!(row.grid.meters(), expected_grid, epsilon = 1e-4);
        assert_abs_diff_eq!(row.point.x(), 1000.0 - expected_grid, epsilon = 1e-4);
        assert_abs_diff_eq!(row.point.y(), 1000.0, epsilon = 1e-4);
        assert_abs_diff_eq!(row.point.z(), 100.0, epsilon = 1e-4);

        assert_eq!(solution.points().resolve("P1"), row.point);
    }

    #[test]
    fn shots_resolve_independently() {
        let good = shot("P1", 100.0, 100.0, 50.0);
        let poisoned = shot("P2", 100.0, 100.0, f64::NAN);

        let alone = Sideshot::new(station(), backsight(), [good.clone()])
            .compute()
            .unwrap();
        let together = Sideshot::new(station(), backsight(), [good, poisoned])
            .compute()
            .unwrap();

        // the malformed row poisons only its own output
        assert_eq!(together.rows()[0].point, alone.rows()[0].point);
        assert!(!together.rows()[1].point.is_known());
        assert!(together.points().resolve("P1").is_known());
    }

    #[test]
    fn degenerate_orientation_fails_the_whole_group() {
        let east_backsight = Point::new("B", 1100.0, 1000.0, 100.0);
        let error = Sideshot::new(station(), east_backsight, [shot("P1", 100.0, 100.0, 50.0)])
            .compute()
            .unwrap_err();

        assert_eq!(
            error,
            SurveyError::DegenerateGeometry {
                from: "A".to_owned(),
                to: "B".to_owned(),
            }
        );
    }
}
