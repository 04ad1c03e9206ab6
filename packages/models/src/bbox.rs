//! Axis-aligned bounding box parsed from the `bounding_box` query parameter.

use std::fmt;

use geo::{LineString, Polygon};
use serde::{Deserialize, Serialize};

/// A rectangle given by two opposite corners `(west, south)` and
/// `(east, north)`, with x as the longitude-like axis.
///
/// The corners are kept as given; they are not reordered into min/max.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// x of the first corner.
    pub west: f64,
    /// y of the first corner.
    pub south: f64,
    /// x of the opposite corner.
    pub east: f64,
    /// y of the opposite corner.
    pub north: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Parses `"west,south,east,north"`.
    ///
    /// Returns `None` unless the string holds exactly four comma-separated
    /// finite numbers. Surrounding whitespace of each token is ignored.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = Vec::with_capacity(4);
        for token in s.split(',') {
            let value: f64 = token.trim().parse().ok()?;
            if !value.is_finite() {
                return None;
            }
            parts.push(value);
        }

        match parts.as_slice() {
            &[west, south, east, north] => Some(Self::new(west, south, east, north)),
            _ => None,
        }
    }

    /// Builds the closed ring `p0, (p0.x, p1.y), p1, (p1.x, p0.y), p0`.
    #[must_use]
    pub fn to_polygon(&self) -> Polygon<f64> {
        let ring = LineString::from(vec![
            (self.west, self.south),
            (self.west, self.north),
            (self.east, self.north),
            (self.east, self.south),
            (self.west, self.south),
        ]);
        Polygon::new(ring, vec![])
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}
