//! Traverse adjustment and radial survey computation for total-station observations
//! measured in gradians.
//!
//! This library turns a table of raw angle/distance observations into closed, internally
//! consistent 3-D coordinates on a projected national grid. The moving parts, leaves
//! first:
//!
//! - [`Angle`] and [`Azimuth`]: gradian circle readings normalized to `[0, 400)`, and
//!   bearings derived from points or propagated along chains of turned angles.
//! - The distance reduction chain: [`SlopeDistance`] → [`HorizontalDistance`] →
//!   [`ReferenceDistance`] → [`GridDistance`], each stage a distinct type so a raw
//!   instrument reading can never be mistaken for a plottable grid length, plus
//!   [`DeltaHeight`] for the vertical component.
//! - [`Point`] and [`StationRegistry`]: named grid positions and the project-wide,
//!   last-writer-wins station lookup.
//! - [`Traverse`]: the adjustment engine. Open, closed-loop, and link traverses share
//!   one algorithm -- validate observations, propagate azimuths, reduce distances,
//!   measure angular and linear misclosure against the known control, distribute the
//!   corrections (equal shares per angle, distance-proportional for coordinates, the
//!   classic compass-rule convention), and integrate station by station.
//! - [`Sideshot`]: uncorrected single-station radiation of detail points.
//! - [`SurveyProject`]: batch orchestration with partial-success semantics -- a traverse
//!   with missing observations is skipped and reported while the rest of the job
//!   computes.
//!
//! This is deliberately *not* a least-squares network adjustment: corrections are
//! distributed linearly, the way the field books do it, and results are reproducible
//! against manual computation sheets.
//!
//! # Example
//!
//! Chaining one new station off a known baseline and radiating a detail point from it:
//!
//! ```
//! use misclose::{
//!     Angle, Measurement, MeasurementSet, Point, SlopeDistance, StationRegistry,
//!     SurveyProject, TraverseDefinition, TraverseKind,
//! };
//! use uom::si::f64::Length;
//! use uom::si::length::meter;
//!
//! fn meters(value: f64) -> Length {
//!     Length::new::<meter>(value)
//! }
//!
//! // two known control points, F2 due north of F1
//! let known: StationRegistry = [
//!     Point::new("F1", 0.0, -100.0, 0.0),
//!     Point::new("F2", 0.0, 0.0, 0.0),
//! ]
//! .into_iter()
//! .collect();
//!
//! // occupy F2, zero on F1, turn 250 gon onto the new station S1
//! let measurements = MeasurementSet::new(vec![Measurement {
//!     bs: "F1".into(),
//!     station: "F2".into(),
//!     fs: "S1".into(),
//!     h_angle: Angle::new(250.0),
//!     v_angle: Angle::new(100.0), // level sight
//!     slope_distance: SlopeDistance::new(meters(141.42)),
//!     station_height: meters(1.5),
//!     target_height: meters(1.5),
//! }]);
//!
//! let mut project = SurveyProject::new(
//!     "example",
//!     measurements,
//!     vec![TraverseDefinition {
//!         stations: "F1-F2-S1".into(),
//!         kind: TraverseKind::Open,
//!         compute: true,
//!     }],
//!     known,
//! );
//!
//! let batch = project.compute_traverses();
//! assert_eq!(batch.computed().len(), 1);
//!
//! // a 250 gon turn off a due-south backsight marches northeast
//! let s1 = project.stations().resolve("S1");
//! assert!(s1.x() > 99.0 && s1.y() > 99.0);
//! ```
//!
//! # Features
//!
//! - `serde` (default): `Serialize`/`Deserialize` on every record-like type, with
//!   aliases for the legacy spreadsheet column names (`slope_dist`, `t_type`, …).
//! - `approx` (default): `AbsDiffEq` implementations for angles, distances, and points.
//! - `std` (default) / `libm`: which floating-point implementation backs the math;
//!   exactly one must be enabled.

mod angle;
mod azimuth;
mod distance;
mod error;
mod float_math;
mod measurement;
mod point;
mod project;
mod registry;
mod sideshot;
mod traverse;

pub(crate) type Point3 = nalgebra::Point3<f64>;
pub(crate) type Vector3 = nalgebra::Vector3<f64>;

pub use angle::Angle;
pub use azimuth::Azimuth;
pub use distance::{
    scale_factor, DeltaHeight, GridDistance, HorizontalDistance, ReferenceDistance,
    SlopeDistance, MEAN_EARTH_RADIUS,
};
pub use error::SurveyError;
pub use measurement::{LegObservation, Measurement, MeasurementSet, ReducedObservations};
pub use point::Point;
pub use project::{
    parse_stops, SideshotBatch, SkippedUnit, SurveyProject, TraverseBatch, TraverseDefinition,
};
pub use registry::StationRegistry;
pub use sideshot::{Sideshot, SideshotRow, SideshotSolution};
pub use traverse::{
    Traverse, TraverseKind, TraverseLeg, TraverseMetrics, TraverseSolution, ValidatedTraverse,
    ANGULAR_TOLERANCE,
};
