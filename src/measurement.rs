use std::collections::{BTreeMap, HashMap};

use uom::si::f64::Length;

use crate::angle::Angle;
use crate::distance::{DeltaHeight, HorizontalDistance, SlopeDistance};
use crate::float_math::round8;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One raw total-station observation row: occupying `station`, sighted at `bs` to zero
/// the circle, pointing at `fs`.
///
/// Angles are gradian circle readings, the slope distance is the untouched instrument
/// reading, and the two heights are instrument and target (prism) heights above their
/// ground marks.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Measurement {
    /// Backsight station id.
    pub bs: String,
    /// Occupied station id.
    pub station: String,
    /// Foresight (target) id.
    pub fs: String,
    /// Turned horizontal angle.
    pub h_angle: Angle,
    /// Vertical (zenith) angle.
    pub v_angle: Angle,
    /// Raw slope distance.
    #[cfg_attr(feature = "serde", serde(alias = "slope_dist"))]
    pub slope_distance: SlopeDistance,
    /// Instrument height above the station mark.
    #[cfg_attr(feature = "serde", serde(alias = "station_h"))]
    pub station_height: Length,
    /// Target height above the foresight mark.
    #[cfg_attr(feature = "serde", serde(alias = "target_h"))]
    pub target_height: Length,
}

impl Measurement {
    /// The join key identifying this row's turned angle: `bs-station-fs`.
    #[must_use]
    pub fn angle_key(&self) -> String {
        format!("{}-{}-{}", self.bs, self.station, self.fs)
    }

    /// The join key identifying this row's leg, direction-independent
    /// (the station pair, sorted).
    #[must_use]
    pub fn dist_key(&self) -> String {
        dist_key(&self.station, &self.fs)
    }

    /// Whether this is a circle-zeroing shot at the backsight rather than a real
    /// traverse observation.
    #[must_use]
    pub fn is_orientation(&self) -> bool {
        self.h_angle.gon() == 0.0
    }
}

/// Direction-independent leg key for a station pair.
pub(crate) fn dist_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}-{b}")
    } else {
        format!("{b}-{a}")
    }
}

/// One traverse-ready observation: the turned angle of a stop triple together with the
/// working (reciprocally averaged) horizontal distance and height difference of its leg.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LegObservation {
    pub bs: String,
    pub station: String,
    pub fs: String,
    pub h_angle: Angle,
    pub horizontal: HorizontalDistance,
    pub delta_height: DeltaHeight,
}

impl LegObservation {
    /// The join key of the turned angle: `bs-station-fs`.
    #[must_use]
    pub fn angle_key(&self) -> String {
        format!("{}-{}-{}", self.bs, self.station, self.fs)
    }

    /// The direction-independent leg key.
    #[must_use]
    pub fn dist_key(&self) -> String {
        dist_key(&self.station, &self.fs)
    }
}

/// The full measurement table of a project, as loaded from the instrument dump.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct MeasurementSet {
    rows: Vec<Measurement>,
}

impl MeasurementSet {
    /// Wraps a table of raw rows.
    #[must_use]
    pub fn new(rows: Vec<Measurement>) -> Self {
        Self { rows }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends a row.
    pub fn push(&mut self, row: Measurement) {
        self.rows.push(row);
    }

    /// Iterates over the raw rows in table order.
    pub fn iter(&self) -> impl Iterator<Item = &Measurement> {
        self.rows.iter()
    }

    /// Turns the raw table into traverse-ready observations.
    ///
    /// Legs are usually measured from both ends; the two rows share a
    /// [`Measurement::dist_key`] and their horizontal reductions are averaged into a
    /// single working distance. Height
    /// differences are likewise averaged by magnitude and re-signed per row, so the
    /// forward and backward shots of one leg report the same |Δh| with opposite signs.
    /// Circle-zeroing rows (`h_angle == 0`) are dropped.
    #[must_use]
    pub fn reduce(&self) -> ReducedObservations {
        struct LegAccumulator {
            horizontal_sum: f64,
            delta_abs_sum: f64,
            count: usize,
        }

        let raw: Vec<(HorizontalDistance, DeltaHeight)> = self
            .rows
            .iter()
            .map(|row| {
                (
                    row.slope_distance.to_horizontal(row.v_angle),
                    row.slope_distance.to_delta_height(
                        row.v_angle,
                        row.station_height,
                        row.target_height,
                    ),
                )
            })
            .collect();

        let mut legs: HashMap<String, LegAccumulator> = HashMap::new();
        for (row, (horizontal, delta)) in self.rows.iter().zip(&raw) {
            let acc = legs.entry(row.dist_key()).or_insert(LegAccumulator {
                horizontal_sum: 0.0,
                delta_abs_sum: 0.0,
                count: 0,
            });
            acc.horizontal_sum += horizontal.meters();
            acc.delta_abs_sum += delta.meters().abs();
            acc.count += 1;
        }

        let rows = self
            .rows
            .iter()
            .zip(&raw)
            .filter(|(row, _)| !row.is_orientation())
            .map(|(row, (_, delta))| {
                let acc = &legs[&row.dist_key()];
                let horizontal = round8(acc.horizontal_sum / acc.count as f64);
                let delta_magnitude = round8(acc.delta_abs_sum / acc.count as f64);
                let delta = if delta.meters() > 0.0 {
                    delta_magnitude
                } else {
                    -delta_magnitude
                };

                LegObservation {
                    bs: row.bs.clone(),
                    station: row.station.clone(),
                    fs: row.fs.clone(),
                    h_angle: row.h_angle,
                    horizontal: HorizontalDistance::from_meters(horizontal),
                    delta_height: DeltaHeight::from_meters(delta),
                }
            })
            .collect();

        ReducedObservations { rows }
    }

    /// Groups the raw rows by `(station, bs)` pair for sideshot resolution.
    ///
    /// The map is ordered so batch runs visit groups deterministically.
    #[must_use]
    pub fn radial_groups(&self) -> BTreeMap<(String, String), Vec<Measurement>> {
        let mut groups: BTreeMap<(String, String), Vec<Measurement>> = BTreeMap::new();
        for row in &self.rows {
            groups
                .entry((row.station.clone(), row.bs.clone()))
                .or_default()
                .push(row.clone());
        }
        groups
    }
}

impl FromIterator<Measurement> for MeasurementSet {
    fn from_iter<T: IntoIterator<Item = Measurement>>(iter: T) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

/// Traverse-ready observations, joinable on their angle keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReducedObservations {
    rows: Vec<LegObservation>,
}

impl ReducedObservations {
    /// Number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterates in table order.
    pub fn iter(&self) -> impl Iterator<Item = &LegObservation> {
        self.rows.iter()
    }

    /// Finds the observation for a `bs-station-fs` angle key, if present.
    #[must_use]
    pub fn find(&self, angle_key: &str) -> Option<&LegObservation> {
        self.rows.iter().find(|row| row.angle_key() == angle_key)
    }
}
