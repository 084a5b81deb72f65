use thiserror::Error;

use crate::traverse::TraverseKind;

/// Everything that can go wrong while validating or computing a survey unit.
///
/// Validation failures ([`SurveyError::MissingObservations`],
/// [`SurveyError::UnknownStations`], [`SurveyError::InvalidStopList`]) are detected before
/// any computation and only ever block the offending traverse or sideshot group; batch
/// processing continues with the remaining units. Geometric failures
/// ([`SurveyError::DegenerateGeometry`]) abort the unit's computation so that an undefined
/// azimuth can never leak into downstream coordinate sums.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SurveyError {
    #[error("traverse {traverse} is missing angle observations: {}", keys.join(", "))]
    MissingObservations { traverse: String, keys: Vec<String> },

    #[error("traverse {traverse} references unknown stations: {}", stations.join(", "))]
    UnknownStations {
        traverse: String,
        stations: Vec<String>,
    },

    #[error("station {station} is not present in the registry")]
    UnknownStation { station: String },

    #[error(
        "cannot derive an azimuth from {from} to {to}: \
         the points are coincident, share a northing, or have undefined coordinates"
    )]
    DegenerateGeometry { from: String, to: String },

    #[error("{kind} traverse {traverse} needs at least {needed} stops, got {got}")]
    InvalidStopList {
        traverse: String,
        kind: TraverseKind,
        needed: usize,
        got: usize,
    },
}
