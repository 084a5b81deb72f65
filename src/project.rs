use core::fmt;

use crate::error::SurveyError;
use crate::measurement::{MeasurementSet, ReducedObservations};
use crate::registry::StationRegistry;
use crate::sideshot::{Sideshot, SideshotSolution};
use crate::traverse::{Traverse, TraverseKind, TraverseSolution};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Splits a dash-joined stop list (`"F1-F2-S1-S2"`) into station ids.
#[must_use]
pub fn parse_stops(stations: &str) -> Vec<String> {
    stations.split('-').map(str::to_owned).collect()
}

/// One row of the traverse definition table: which stops to chain, how the traverse
/// closes, and whether this run should compute it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraverseDefinition {
    /// Dash-joined stop list; the first two ids are the start baseline and, for link
    /// traverses, the last two are the finish baseline.
    pub stations: String,
    #[cfg_attr(feature = "serde", serde(alias = "t_type"))]
    pub kind: TraverseKind,
    pub compute: bool,
}

/// A whole survey job: the measurement table, the traverse definitions, and the registry
/// of known control points.
///
/// Units are computed sequentially in definition order, and each solution is merged into
/// the registry as soon as it lands, so a traverse can hang off stations resolved by an
/// earlier one. Failing units are skipped and reported; they never block the rest of the
/// batch.
#[derive(Debug, Clone)]
pub struct SurveyProject {
    name: String,
    measurements: MeasurementSet,
    definitions: Vec<TraverseDefinition>,
    stations: StationRegistry,
    sideshots: StationRegistry,
}

impl SurveyProject {
    /// Assembles a project from its loaded input tables.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        measurements: MeasurementSet,
        definitions: Vec<TraverseDefinition>,
        known_points: StationRegistry,
    ) -> Self {
        Self {
            name: name.into(),
            measurements,
            definitions,
            stations: known_points,
            sideshots: StationRegistry::new(),
        }
    }

    /// The project name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The station registry: known control plus everything resolved so far.
    #[must_use]
    pub fn stations(&self) -> &StationRegistry {
        &self.stations
    }

    /// The accumulated sideshot points.
    #[must_use]
    pub fn sideshot_points(&self) -> &StationRegistry {
        &self.sideshots
    }

    /// Computes every traverse definition flagged for computation, in order.
    ///
    /// Each computed traverse's stations are merged into the registry immediately
    /// (last writer wins), becoming available as baselines for the definitions that
    /// follow. Definitions that fail validation or computation are collected as skipped
    /// units with their error, and the batch carries on.
    pub fn compute_traverses(&mut self) -> TraverseBatch {
        let active: Vec<TraverseDefinition> = self
            .definitions
            .iter()
            .filter(|definition| definition.compute)
            .cloned()
            .collect();

        let reduced = self.measurements.reduce();
        let mut computed = Vec::new();
        let mut skipped = Vec::new();

        for definition in active {
            match self.run_traverse(&definition, &reduced) {
                Ok(solution) => {
                    tracing::info!(traverse = %solution.name(), "traverse computed");
                    self.stations.merge(solution.stations().clone());
                    computed.push(solution);
                }
                Err(error) => {
                    skipped.push(SkippedUnit {
                        name: definition.stations.clone(),
                        error,
                    });
                }
            }
        }

        tracing::info!(
            computed = computed.len(),
            skipped = skipped.len(),
            "traverse batch finished"
        );
        TraverseBatch { computed, skipped }
    }

    fn run_traverse(
        &self,
        definition: &TraverseDefinition,
        reduced: &ReducedObservations,
    ) -> Result<TraverseSolution, SurveyError> {
        let stops = parse_stops(&definition.stations);
        if stops.len() < 2 {
            return Err(SurveyError::InvalidStopList {
                traverse: definition.stations.clone(),
                kind: definition.kind,
                needed: 2,
                got: stops.len(),
            });
        }

        let start = [
            self.stations.resolve(&stops[0]),
            self.stations.resolve(&stops[1]),
        ];

        let traverse = match definition.kind {
            TraverseKind::Open => Traverse::open(stops, start, reduced)?,
            TraverseKind::Closed => Traverse::closed(stops, start, reduced)?,
            TraverseKind::Link => {
                let finish = [
                    self.stations.resolve(&stops[stops.len() - 2]),
                    self.stations.resolve(&stops[stops.len() - 1]),
                ];
                Traverse::link(stops, start, finish, reduced)?
            }
        };

        traverse.validate()?.compute()
    }

    /// Resolves every radial `(station, backsight)` group whose pair is known.
    ///
    /// Groups touching a station id in `exclude` are left out (typically the traverse
    /// stops already adjusted), and groups whose pair is not in the registry are not
    /// sideshot groups at all. Resolved points accumulate in
    /// [`SurveyProject::sideshot_points`].
    pub fn compute_sideshots(&mut self, exclude: &[&str]) -> SideshotBatch {
        let mut computed = Vec::new();
        let mut skipped = Vec::new();

        for ((station, backsight), rows) in self.measurements.radial_groups() {
            if exclude.contains(&station.as_str()) || exclude.contains(&backsight.as_str()) {
                continue;
            }
            if !self
                .stations
                .contains_all([station.as_str(), backsight.as_str()])
            {
                tracing::debug!(
                    station = %station,
                    backsight = %backsight,
                    "pair not fully known, not a sideshot group"
                );
                continue;
            }

            let sideshot = Sideshot::new(
                self.stations.resolve(&station),
                self.stations.resolve(&backsight),
                rows,
            );
            match sideshot.compute() {
                Ok(solution) => {
                    self.sideshots.merge(solution.points().clone());
                    computed.push(solution);
                }
                Err(error) => {
                    skipped.push(SkippedUnit {
                        name: format!("{station}/{backsight}"),
                        error,
                    });
                }
            }
        }

        tracing::info!(
            groups = computed.len(),
            points = self.sideshots.len(),
            skipped = skipped.len(),
            "sideshot batch finished"
        );
        SideshotBatch { computed, skipped }
    }
}

/// A unit the batch had to skip, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedUnit {
    pub name: String,
    pub error: SurveyError,
}

/// Outcome of a traverse batch run: full solutions for the units that computed, errors
/// for the units that did not.
///
/// The `Display` form is the human-readable run report.
#[derive(Debug, Clone)]
pub struct TraverseBatch {
    computed: Vec<TraverseSolution>,
    skipped: Vec<SkippedUnit>,
}

impl TraverseBatch {
    /// The solutions that computed, in definition order.
    #[must_use]
    pub fn computed(&self) -> &[TraverseSolution] {
        &self.computed
    }

    /// The definitions that were skipped, with their errors.
    #[must_use]
    pub fn skipped(&self) -> &[SkippedUnit] {
        &self.skipped
    }
}

impl fmt::Display for TraverseBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "computed traverses: {}", self.computed.len())?;
        for solution in &self.computed {
            write!(f, "\n  {}", solution.metrics())?;
            if !solution.metrics().angular_within_tolerance() {
                write!(f, "  [angular misclosure over tolerance]")?;
            }
        }
        write!(f, "\nskipped traverses: {}", self.skipped.len())?;
        for unit in &self.skipped {
            write!(f, "\n  - {}: {}", unit.name, unit.error)?;
        }
        Ok(())
    }
}

/// Outcome of a sideshot batch run.
#[derive(Debug, Clone)]
pub struct SideshotBatch {
    computed: Vec<SideshotSolution>,
    skipped: Vec<SkippedUnit>,
}

impl SideshotBatch {
    /// The groups that resolved, in `(station, backsight)` order.
    #[must_use]
    pub fn computed(&self) -> &[SideshotSolution] {
        &self.computed
    }

    /// The groups that failed, with their errors.
    #[must_use]
    pub fn skipped(&self) -> &[SkippedUnit] {
        &self.skipped
    }
}

impl fmt::Display for SideshotBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "computed sideshot groups: {}", self.computed.len())?;
        for solution in &self.computed {
            write!(
                f,
                "\n  {} (backsight {}): {} points",
                solution.station(),
                solution.backsight(),
                solution.rows().len()
            )?;
        }
        write!(f, "\nskipped sideshot groups: {}", self.skipped.len())?;
        for unit in &self.skipped {
            write!(f, "\n  - {}: {}", unit.name, unit.error)?;
        }
        Ok(())
    }
}
