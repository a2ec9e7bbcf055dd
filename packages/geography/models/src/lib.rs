#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! School district boundary types.
//!
//! A [`BoundaryFeature`] is one raw record from a boundary dataset, with
//! whatever geometry the dataset carried. A [`DistrictBoundary`] is the
//! resolved, polygon-only district that a simulation request samples
//! stops from.

use geo::{Geometry, MultiPolygon};
use serde::{Deserialize, Serialize};

/// One record from a boundary dataset, in geographic coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryFeature {
    /// Raw geometry. Usually a polygon or multipolygon, but datasets
    /// occasionally ship geometry collections.
    pub geometry: Geometry<f64>,
    /// Human-readable district name (e.g. "Northville Public Schools").
    pub name: String,
    /// District code (e.g. "82390", or "0123" after zero-padding).
    pub code: String,
    /// Optional priority; higher wins when several districts contain a point.
    pub priority: Option<i64>,
}

/// A resolved district polygon. Never mutated after resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct DistrictBoundary {
    name: String,
    code: String,
    polygon: MultiPolygon<f64>,
}

impl DistrictBoundary {
    /// Creates a boundary from its parts.
    #[must_use]
    pub const fn new(name: String, code: String, polygon: MultiPolygon<f64>) -> Self {
        Self {
            name,
            code,
            polygon,
        }
    }

    /// Human-readable district name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// District code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// The district polygon in geographic coordinates.
    #[must_use]
    pub const fn polygon(&self) -> &MultiPolygon<f64> {
        &self.polygon
    }

    /// Serializable summary for reporting.
    #[must_use]
    pub fn summary(&self) -> DistrictSummary {
        DistrictSummary {
            name: self.name.clone(),
            code: self.code.clone(),
            polygon_count: self.polygon.0.len(),
        }
    }
}

/// What the presentation layer needs to know about a district.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictSummary {
    /// District name.
    pub name: String,
    /// District code.
    pub code: String,
    /// Number of disjoint polygon parts.
    pub polygon_count: usize,
}

/// Left-pads a district code with zeros to `width` characters.
///
/// Codes that are already at least `width` long are returned unchanged.
#[must_use]
pub fn pad_code(code: &str, width: usize) -> String {
    format!("{code:0>width$}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn pads_short_codes() {
        assert_eq!(pad_code("123", 4), "0123");
        assert_eq!(pad_code("82390", 4), "82390");
        assert_eq!(pad_code("", 2), "00");
    }

    #[test]
    fn summarizes_boundary() {
        let square = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)];
        let boundary = DistrictBoundary::new(
            "Test District".to_string(),
            "0042".to_string(),
            MultiPolygon(vec![square]),
        );
        let summary = boundary.summary();
        assert_eq!(summary.name, "Test District");
        assert_eq!(summary.code, "0042");
        assert_eq!(summary.polygon_count, 1);
    }
}
