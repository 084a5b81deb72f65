use core::fmt;

use uom::si::f64::Length;
use uom::si::length::meter;

use crate::angle::Angle;
use crate::azimuth::Azimuth;
use crate::distance::{
    scale_factor, DeltaHeight, GridDistance, HorizontalDistance, ReferenceDistance,
};
use crate::error::SurveyError;
use crate::float_math::{round3, round6, round8, FloatMath};
use crate::measurement::{LegObservation, ReducedObservations};
use crate::point::Point;
use crate::registry::StationRegistry;
use crate::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Angular misclosures above this magnitude (in gradians) are flagged as suspicious.
///
/// This is a warning threshold for reports, not a hard failure: the traverse still
/// computes and distributes the correction.
pub const ANGULAR_TOLERANCE: f64 = 0.1;

/// How a traverse is constrained at its far end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TraverseKind {
    /// Starts from a known baseline, ends unconstrained. No misclosure can be measured
    /// and observed angles are used unmodified.
    #[cfg_attr(feature = "serde", serde(alias = "OpenTraverse"))]
    Open,
    /// Starts from a known baseline and loops back onto its own starting station.
    #[cfg_attr(feature = "serde", serde(alias = "ClosedTraverse"))]
    Closed,
    /// Starts from one known baseline and independently ends on a second one.
    #[cfg_attr(feature = "serde", serde(alias = "LinkTraverse"))]
    Link,
}

impl TraverseKind {
    fn minimum_stops(self) -> usize {
        match self {
            TraverseKind::Open => 3,
            TraverseKind::Link => 4,
            TraverseKind::Closed => 5,
        }
    }

    fn station_count(self, stops: usize) -> usize {
        match self {
            TraverseKind::Open => stops - 1,
            TraverseKind::Link => stops - 2,
            TraverseKind::Closed => stops - 3,
        }
    }
}

impl fmt::Display for TraverseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraverseKind::Open => write!(f, "open"),
            TraverseKind::Closed => write!(f, "closed"),
            TraverseKind::Link => write!(f, "link"),
        }
    }
}

/// The required angle keys of a stop list: one `prev-cur-next` triple per occupied
/// station, in marching order.
fn required_angle_keys(stops: &[String]) -> Vec<String> {
    stops
        .windows(3)
        .map(|triple| format!("{}-{}-{}", triple[0], triple[1], triple[2]))
        .collect()
}

/// A traverse as defined but not yet checked against the measurement table.
///
/// The life cycle is `Traverse` → [`Traverse::validate`] → [`ValidatedTraverse`] →
/// [`ValidatedTraverse::compute`] → [`TraverseSolution`]. A traverse that fails
/// validation stays failed -- there is no way to ask an unvalidated traverse for
/// coordinates, so a missing observation can never silently produce garbage output.
///
/// Each traverse owns its copy of the matching observation rows; computing one traverse
/// never touches the tables of another.
#[derive(Debug, Clone)]
pub struct Traverse {
    name: String,
    kind: TraverseKind,
    stops: Vec<String>,
    start: [Point; 2],
    finish: Option<[Point; 2]>,
    rows: Vec<Option<LegObservation>>,
}

impl Traverse {
    /// Defines an open traverse from the known baseline `start = [f1, f2]` along `stops`
    /// (which begin with `f1, f2`).
    pub fn open(
        stops: Vec<String>,
        start: [Point; 2],
        observations: &ReducedObservations,
    ) -> Result<Self, SurveyError> {
        Self::build(TraverseKind::Open, stops, start, None, observations)
    }

    /// Defines a closed-loop traverse: `stops` leave `f2`, loop back onto it, and close
    /// the orientation at `f1` (ie, the list ends with `…, f2, f1`).
    pub fn closed(
        stops: Vec<String>,
        start: [Point; 2],
        observations: &ReducedObservations,
    ) -> Result<Self, SurveyError> {
        let finish = [start[1].clone(), start[0].clone()];
        Self::build(TraverseKind::Closed, stops, start, Some(finish), observations)
    }

    /// Defines a link traverse from the known baseline `start = [f1, f2]` to the known
    /// baseline `finish = [l1, l2]` (the stop list ends with `…, l1, l2`).
    pub fn link(
        stops: Vec<String>,
        start: [Point; 2],
        finish: [Point; 2],
        observations: &ReducedObservations,
    ) -> Result<Self, SurveyError> {
        Self::build(TraverseKind::Link, stops, start, Some(finish), observations)
    }

    fn build(
        kind: TraverseKind,
        stops: Vec<String>,
        start: [Point; 2],
        finish: Option<[Point; 2]>,
        observations: &ReducedObservations,
    ) -> Result<Self, SurveyError> {
        let name = stops.join("-");
        let needed = kind.minimum_stops();
        if stops.len() < needed {
            return Err(SurveyError::InvalidStopList {
                traverse: name,
                kind,
                needed,
                got: stops.len(),
            });
        }

        // join against the measurement table; gaps are allowed here and caught by
        // validate() so they can all be reported at once
        let rows = required_angle_keys(&stops)
            .iter()
            .map(|key| observations.find(key).cloned())
            .collect();

        Ok(Self {
            name,
            kind,
            stops,
            start,
            finish,
            rows,
        })
    }

    /// The dash-joined stop list, used as the traverse's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The closure variant of this traverse.
    #[must_use]
    pub fn kind(&self) -> TraverseKind {
        self.kind
    }

    /// The ordered stop list.
    #[must_use]
    pub fn stops(&self) -> &[String] {
        &self.stops
    }

    /// Number of stations this traverse occupies.
    #[must_use]
    pub fn station_count(&self) -> usize {
        self.kind.station_count(self.stops.len())
    }

    /// Checks that the baselines are known and that every required turned angle is
    /// present in the joined observations.
    ///
    /// # Errors
    ///
    /// [`SurveyError::UnknownStations`] if a baseline point is a sentinel, or
    /// [`SurveyError::MissingObservations`] listing every absent `bs-station-fs` key.
    pub fn validate(self) -> Result<ValidatedTraverse, SurveyError> {
        let unknown: Vec<String> = self
            .start
            .iter()
            .chain(self.finish.iter().flatten())
            .filter(|point| !point.is_known())
            .map(|point| point.name().to_owned())
            .collect();
        if !unknown.is_empty() {
            tracing::warn!(
                traverse = %self.name,
                stations = ?unknown,
                "traverse baseline references unknown stations"
            );
            return Err(SurveyError::UnknownStations {
                traverse: self.name,
                stations: unknown,
            });
        }

        let missing: Vec<String> = required_angle_keys(&self.stops)
            .into_iter()
            .zip(&self.rows)
            .filter(|(_, row)| row.is_none())
            .map(|(key, _)| key)
            .collect();
        if !missing.is_empty() {
            tracing::warn!(
                traverse = %self.name,
                missing = ?missing,
                "traverse cannot be computed, angle observations are missing"
            );
            return Err(SurveyError::MissingObservations {
                traverse: self.name,
                keys: missing,
            });
        }

        let legs = self.rows.into_iter().flatten().collect();
        Ok(ValidatedTraverse {
            name: self.name,
            kind: self.kind,
            stops: self.stops,
            start: self.start,
            finish: self.finish,
            legs,
        })
    }
}

/// A traverse whose observations are complete; the only thing left to do is compute.
#[derive(Debug, Clone)]
pub struct ValidatedTraverse {
    name: String,
    kind: TraverseKind,
    stops: Vec<String>,
    start: [Point; 2],
    finish: Option<[Point; 2]>,
    legs: Vec<LegObservation>,
}

struct ReducedLeg {
    horizontal: HorizontalDistance,
    reference: ReferenceDistance,
    grid: GridDistance,
    delta: DeltaHeight,
}

impl ValidatedTraverse {
    /// The dash-joined stop list.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The closure variant.
    #[must_use]
    pub fn kind(&self) -> TraverseKind {
        self.kind
    }

    /// Number of stations this traverse occupies.
    #[must_use]
    pub fn station_count(&self) -> usize {
        self.kind.station_count(self.stops.len())
    }

    /// Runs the adjustment: azimuth propagation, distance reduction, misclosure
    /// computation, compass-rule distribution, and coordinate integration.
    ///
    /// The computation is pure -- calling it twice on unchanged inputs produces identical
    /// solutions.
    ///
    /// # Errors
    ///
    /// [`SurveyError::DegenerateGeometry`] if a baseline azimuth cannot be derived.
    pub fn compute(&self) -> Result<TraverseSolution, SurveyError> {
        let [f1, f2] = &self.start;
        let a_start = f1.azimuth_to(f2)?;

        // the closing constraint: known terminal point and known closing azimuth
        let closing = match &self.finish {
            None => None,
            Some([terminal, orient]) => Some((terminal, terminal.azimuth_to(orient)?)),
        };

        // reduction bounds: open/closed traverses are bounded by their start baseline,
        // link traverses by their two integration endpoints
        let (bound_a, bound_b) = match (self.kind, &self.finish) {
            (TraverseKind::Link, Some([l1, _])) => (f2, l1),
            _ => (f1, f2),
        };
        let mean_elevation = round3((bound_a.z() + bound_b.z()) / 2.0);
        let k = scale_factor(bound_a.x(), bound_b.x());

        let n = self.legs.len();
        let closes = closing.is_some();

        // distance reduction chain; the closing row of a closed/link traverse is the
        // known baseline itself, not an observed leg, so its reductions are undefined
        let reduced: Vec<Option<ReducedLeg>> = self
            .legs
            .iter()
            .enumerate()
            .map(|(i, leg)| {
                if closes && i == n - 1 {
                    return None;
                }
                let horizontal = leg.horizontal;
                let reference =
                    horizontal.to_reference(Length::new::<meter>(mean_elevation));
                let grid = reference.to_grid(k);
                Some(ReducedLeg {
                    horizontal,
                    reference,
                    grid,
                    delta: leg.delta_height,
                })
            })
            .collect();

        let length = round8(
            reduced
                .iter()
                .flatten()
                .map(|leg| leg.grid.meters())
                .sum::<f64>(),
        );

        // angular misclosure: compare the closing azimuth implied by the turned angles
        // against the one derived from the known terminal baseline, and spread the
        // difference equally over the observed angles
        let observed: Vec<Angle> = self.legs.iter().map(|leg| leg.h_angle).collect();
        let (angular_misclosure, angular_correction, adjusted) = match &closing {
            Some((_, a_finish)) => {
                let measured = Azimuth::from_measurements(a_start, &observed);
                let misclosure = round8((a_finish.angle() - measured.angle()).to_signed());
                let correction = round8(misclosure / n as f64);
                let adjusted: Vec<Angle> =
                    observed.iter().map(|angle| *angle + correction).collect();
                (Some(misclosure), Some(correction), Some(adjusted))
            }
            None => (None, None, None),
        };
        let working = adjusted.as_ref().unwrap_or(&observed);
        let azimuths = Azimuth::for_traverse(a_start, working);

        // raw coordinate increments per leg
        let raw: Vec<Option<Vector3>> = reduced
            .iter()
            .zip(&azimuths)
            .map(|(leg, azimuth)| {
                leg.as_ref().map(|leg| {
                    Vector3::new(
                        leg.grid.meters() * azimuth.sin(),
                        leg.grid.meters() * azimuth.cos(),
                        leg.delta.meters(),
                    )
                })
            })
            .collect();

        // linear misclosure against the known terminal, distributed proportionally to
        // each leg's share of the total length (zero length means nothing to correct)
        let start_position = Vector3::new(f2.x(), f2.y(), f2.z());
        let summed: Vector3 = raw
            .iter()
            .flatten()
            .fold(Vector3::zeros(), |acc, increment| acc + increment);
        let (misclosure_vector, correction_ratio) = match &closing {
            Some((terminal, _)) => {
                let implied = start_position + summed;
                let w = Vector3::new(
                    round8(terminal.x() - implied.x),
                    round8(terminal.y() - implied.y),
                    round8(terminal.z() - implied.z),
                );
                let ratio = if length == 0.0 {
                    Vector3::zeros()
                } else {
                    Vector3::new(
                        round8(w.x / length),
                        round8(w.y / length),
                        round8(w.z / length),
                    )
                };
                (Some(w), ratio)
            }
            None => (None, Vector3::zeros()),
        };
        let horizontal_misclosure = misclosure_vector
            .map(|w| round8(FloatMath::sqrt(w.x * w.x + w.y * w.y)));

        let corrected: Vec<Option<Vector3>> = raw
            .iter()
            .zip(&reduced)
            .map(|(raw, leg)| match (raw, leg) {
                (Some(increment), Some(leg)) => {
                    Some(increment + correction_ratio * leg.grid.meters())
                }
                _ => None,
            })
            .collect();

        // integrate absolute positions station by station from f2; the terminal of a
        // closed/link traverse takes the known coordinates verbatim so the chain closes
        // exactly on the control
        let mut positions = Vec::with_capacity(n + 1);
        positions.push(start_position);
        for increment in &corrected {
            let previous = positions[positions.len() - 1];
            let next = match increment {
                Some(increment) => previous + increment,
                None => Vector3::new(f64::NAN, f64::NAN, f64::NAN),
            };
            positions.push(next);
        }
        if let Some((terminal, _)) = &closing {
            positions[n - 1] = Vector3::new(terminal.x(), terminal.y(), terminal.z());
        }

        let mut stations = StationRegistry::new();
        let legs: Vec<TraverseLeg> = self
            .legs
            .iter()
            .enumerate()
            .map(|(i, leg)| {
                let position = positions[i];
                let station = Point::new(
                    leg.station.clone(),
                    round6(position.x),
                    round6(position.y),
                    round6(position.z),
                );
                stations.insert(station.clone());

                TraverseLeg {
                    bs: leg.bs.clone(),
                    station: leg.station.clone(),
                    fs: leg.fs.clone(),
                    h_angle: leg.h_angle,
                    adjusted_angle: adjusted.as_ref().map(|angles| angles[i]),
                    azimuth: azimuths[i],
                    horizontal: reduced[i].as_ref().map(|leg| leg.horizontal),
                    reference: reduced[i].as_ref().map(|leg| leg.reference),
                    grid: reduced[i].as_ref().map(|leg| leg.grid),
                    dx: corrected[i].as_ref().map(|v| v.x),
                    dy: corrected[i].as_ref().map(|v| v.y),
                    dz: corrected[i].as_ref().map(|v| v.z),
                    x: station.x(),
                    y: station.y(),
                    z: station.z(),
                }
            })
            .collect();

        // an open traverse ends on a brand-new station: the terminal foresight
        if !closes {
            if let Some(last) = self.legs.last() {
                let position = positions[n];
                stations.insert(Point::new(
                    last.fs.clone(),
                    round6(position.x),
                    round6(position.y),
                    round6(position.z),
                ));
            }
        }

        let metrics = TraverseMetrics {
            traverse: self.name.clone(),
            stations: self.station_count(),
            length,
            mean_elevation,
            angular_misclosure,
            angular_correction,
            horizontal_misclosure,
            wx: misclosure_vector.map(|w| w.x),
            wy: misclosure_vector.map(|w| w.y),
            wz: misclosure_vector.map(|w| w.z),
        };
        if !metrics.angular_within_tolerance() {
            tracing::warn!(
                traverse = %self.name,
                angular = metrics.angular_misclosure,
                "angular misclosure exceeds tolerance"
            );
        }

        Ok(TraverseSolution {
            name: self.name.clone(),
            kind: self.kind,
            legs,
            metrics,
            stations,
        })
    }
}

/// One adjusted leg of a computed traverse: the occupation of `station`, sighting back
/// at `bs` and forward at `fs`.
///
/// Reductions and increments are `None` on the closing row of a closed/link traverse,
/// whose "leg" is the known baseline rather than an observed line. `x`, `y`, `z` are the
/// adjusted absolute coordinates of the occupied station.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraverseLeg {
    pub bs: String,
    pub station: String,
    pub fs: String,
    pub h_angle: Angle,
    pub adjusted_angle: Option<Angle>,
    pub azimuth: Azimuth,
    pub horizontal: Option<HorizontalDistance>,
    pub reference: Option<ReferenceDistance>,
    pub grid: Option<GridDistance>,
    pub dx: Option<f64>,
    pub dy: Option<f64>,
    pub dz: Option<f64>,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// The one-row summary of a computed traverse.
///
/// Misclosure fields are `None` for open traverses, which have nothing to close against.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraverseMetrics {
    pub traverse: String,
    pub stations: usize,
    pub length: f64,
    pub mean_elevation: f64,
    pub angular_misclosure: Option<f64>,
    pub angular_correction: Option<f64>,
    pub horizontal_misclosure: Option<f64>,
    pub wx: Option<f64>,
    pub wy: Option<f64>,
    pub wz: Option<f64>,
}

impl TraverseMetrics {
    /// Whether the angular misclosure is within [`ANGULAR_TOLERANCE`].
    ///
    /// Open traverses have no angular constraint and always pass.
    #[must_use]
    pub fn angular_within_tolerance(&self) -> bool {
        match self.angular_misclosure {
            Some(misclosure) => FloatMath::abs(misclosure) <= ANGULAR_TOLERANCE,
            None => true,
        }
    }
}

impl fmt::Display for TraverseMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} stations, length {:.4} m, mean elevation {:.3} m",
            self.traverse, self.stations, self.length, self.mean_elevation
        )?;
        if let (Some(angular), Some(horizontal), Some(wx), Some(wy), Some(wz)) = (
            self.angular_misclosure,
            self.horizontal_misclosure,
            self.wx,
            self.wy,
            self.wz,
        ) {
            write!(
                f,
                ", angular {angular:+.4} gon, horizontal {horizontal:.4} m, \
                 w ({wx:+.4}, {wy:+.4}, {wz:+.4}) m"
            )?;
        }
        Ok(())
    }
}

/// Everything a computed traverse produces: the per-leg detail table, the metrics
/// summary, and the resolved stations ready to merge into the project registry.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraverseSolution {
    name: String,
    kind: TraverseKind,
    legs: Vec<TraverseLeg>,
    metrics: TraverseMetrics,
    stations: StationRegistry,
}

impl TraverseSolution {
    /// The dash-joined stop list.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The closure variant.
    #[must_use]
    pub fn kind(&self) -> TraverseKind {
        self.kind
    }

    /// The per-leg detail table, in marching order.
    #[must_use]
    pub fn legs(&self) -> &[TraverseLeg] {
        &self.legs
    }

    /// The one-row metrics summary.
    #[must_use]
    pub fn metrics(&self) -> &TraverseMetrics {
        &self.metrics
    }

    /// The stations resolved by this traverse (including its known endpoints).
    #[must_use]
    pub fn stations(&self) -> &StationRegistry {
        &self.stations
    }
}
