use std::collections::HashMap;

use crate::point::Point;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The project-wide set of resolved survey points, keyed by station id.
///
/// Known control points seed the registry; every computed traverse or sideshot merges its
/// resolved points back in, making them available as baselines for the units that follow.
/// Duplicate ids follow last-writer-wins: a point inserted later replaces an earlier one
/// of the same name, so fresh observations override stale coordinates.
///
/// An empty registry is a perfectly valid state -- it is how output accumulators start.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct StationRegistry {
    points: HashMap<String, Point>,
}

impl StationRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the registry holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Registers a point under its own name, returning the point it replaced, if any.
    pub fn insert(&mut self, point: Point) -> Option<Point> {
        self.points.insert(point.name().to_owned(), point)
    }

    /// Looks up a station by id.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Point> {
        self.points.get(name)
    }

    /// Looks up a station by id, falling back to the [`Point::unknown`] sentinel.
    ///
    /// A miss is reported through `tracing` so it stays visible, but it does not abort:
    /// batch callers carry on and the sentinel's undefined coordinates surface in (only)
    /// the unit that consumed it.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Point {
        match self.points.get(name) {
            Some(point) => point.clone(),
            None => {
                tracing::warn!(station = name, "station not in registry, using sentinel");
                Point::unknown(name)
            }
        }
    }

    /// Whether a station id is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.points.contains_key(name)
    }

    /// Whether every one of the given station ids is registered.
    pub fn contains_all<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> bool {
        names.into_iter().all(|name| self.contains(name))
    }

    /// Absorbs another registry; on duplicate ids the incoming point wins.
    pub fn merge(&mut self, other: StationRegistry) {
        self.points.extend(other.points);
    }

    /// Iterates over the registered points in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &Point> {
        self.points.values()
    }

    /// The registered station ids, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.points.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl FromIterator<Point> for StationRegistry {
    fn from_iter<T: IntoIterator<Item = Point>>(iter: T) -> Self {
        let mut registry = Self::new();
        registry.extend(iter);
        registry
    }
}

impl Extend<Point> for StationRegistry {
    fn extend<T: IntoIterator<Item = Point>>(&mut self, iter: T) {
        for point in iter {
            self.insert(point);
        }
    }
}
