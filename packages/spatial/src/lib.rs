#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! School district resolution.
//!
//! Loads district polygons from a [`BoundaryDataSource`], builds an
//! R-tree over their envelopes, and answers "which district contains
//! this point" with an exact point-in-polygon test on the envelope hits.
//! A point outside every district is an error, never an empty boundary:
//! everything downstream samples from the resolved polygon.

pub mod geometry;
pub mod source;

use fleetlab_geography_models::{BoundaryFeature, DistrictBoundary};
use fleetlab_projection::{GeoPoint, ProjectionError};
use geo::{BoundingRect, Contains, Geometry, Intersects, MultiPolygon};
use rstar::{AABB, RTree, RTreeObject};
use thiserror::Error;

pub use source::{BoundaryFields, GeojsonBoundarySource, StaticBoundarySource};

/// Errors from loading boundaries or resolving a district.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// No district polygon contains the point.
    #[error("No school district found containing ({lat:.5}, {lon:.5})")]
    NoDistrictFound {
        /// Longitude of the query point.
        lon: f64,
        /// Latitude of the query point.
        lat: f64,
    },

    /// The matched district has no polygonal geometry.
    #[error("District boundary '{name}' is not a Polygon or MultiPolygon")]
    InvalidBoundaryGeometry {
        /// Name of the offending district.
        name: String,
    },

    /// The boundary file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The boundary file is not usable `GeoJSON`.
    #[error("GeoJSON error: {message}")]
    GeoJson {
        /// Description of what went wrong.
        message: String,
    },

    /// Reprojecting boundary coordinates failed.
    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),
}

/// A provider of district boundary records in geographic coordinates.
pub trait BoundaryDataSource: Send + Sync {
    /// Loads every boundary record.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError`] if the dataset cannot be read or parsed.
    fn load(&self) -> Result<Vec<BoundaryFeature>, SpatialError>;
}

/// A district stored in the R-tree with its metadata.
struct DistrictEntry {
    name: String,
    code: String,
    priority: Option<i64>,
    /// Position in the source dataset, used to break ties.
    ordinal: usize,
    envelope: AABB<[f64; 2]>,
    geometry: Geometry<f64>,
    /// Polygonal parts of `geometry`, unioned. `None` if there are none.
    polygon: Option<MultiPolygon<f64>>,
}

impl RTreeObject for DistrictEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl DistrictEntry {
    /// Whether the query point falls in this district's geometry.
    fn matches(&self, point: &geo::Point<f64>) -> bool {
        self.polygon.as_ref().map_or_else(
            || self.geometry.intersects(point),
            |polygon| polygon.contains(point),
        )
    }

    /// Whether this entry should replace `current` as the best match.
    ///
    /// Higher priority wins; without priorities (or on a tie) the entry
    /// that came first in the dataset wins.
    fn outranks(&self, current: &Self) -> bool {
        match (self.priority, current.priority) {
            (Some(a), Some(b)) if a != b => a > b,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            _ => self.ordinal < current.ordinal,
        }
    }
}

/// Pre-built spatial index over district boundaries.
///
/// Build once per process (or per request) and share; lookups do not
/// mutate the index.
pub struct DistrictIndex {
    districts: RTree<DistrictEntry>,
}

impl DistrictIndex {
    /// Builds the index from boundary records.
    ///
    /// Records whose geometry has no bounding box (empty geometries) are
    /// skipped with a warning.
    #[must_use]
    pub fn build(features: Vec<BoundaryFeature>) -> Self {
        let mut entries = Vec::with_capacity(features.len());

        for (ordinal, feature) in features.into_iter().enumerate() {
            let Some(envelope) = compute_envelope(&feature.geometry) else {
                log::warn!("Skipping district '{}' with empty geometry", feature.name);
                continue;
            };

            let polygon = geometry::district_polygon(&feature.geometry);

            entries.push(DistrictEntry {
                name: feature.name,
                code: feature.code,
                priority: feature.priority,
                ordinal,
                envelope,
                geometry: feature.geometry,
                polygon,
            });
        }

        Self {
            districts: RTree::bulk_load(entries),
        }
    }

    /// Loads every record from `source` and builds the index.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError`] if the source fails to load.
    pub fn load(source: &dyn BoundaryDataSource) -> Result<Self, SpatialError> {
        let index = Self::build(source.load()?);
        log::info!("Loaded {} district boundaries into spatial index", index.len());
        Ok(index)
    }

    /// Number of indexed districts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.districts.size()
    }

    /// Whether the index holds no districts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finds the district containing `point`.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::NoDistrictFound`] if no district contains
    /// the point, or [`SpatialError::InvalidBoundaryGeometry`] if the
    /// matching district has no polygonal part.
    pub fn resolve(&self, point: GeoPoint) -> Result<DistrictBoundary, SpatialError> {
        let not_found = || SpatialError::NoDistrictFound {
            lon: point.lon,
            lat: point.lat,
        };
        if !point.is_valid() {
            return Err(not_found());
        }

        let query = geo::Point::from(point);
        let query_env = AABB::from_point([point.lon, point.lat]);

        let mut best: Option<&DistrictEntry> = None;
        for entry in self.districts.locate_in_envelope_intersecting(&query_env) {
            if !entry.matches(&query) {
                continue;
            }
            match best {
                Some(current) if !entry.outranks(current) => {}
                _ => best = Some(entry),
            }
        }

        let entry = best.ok_or_else(not_found)?;
        let polygon = entry
            .polygon
            .clone()
            .ok_or_else(|| SpatialError::InvalidBoundaryGeometry {
                name: entry.name.clone(),
            })?;

        log::debug!(
            "Resolved {point} to district '{}' ({})",
            entry.name,
            entry.code
        );

        Ok(DistrictBoundary::new(
            entry.name.clone(),
            entry.code.clone(),
            polygon,
        ))
    }
}

/// Loads `source` and resolves the district containing `point`.
///
/// Convenience for one-off lookups; long-running processes should build a
/// [`DistrictIndex`] once and reuse it.
///
/// # Errors
///
/// Returns [`SpatialError`] if loading fails or no usable district
/// contains the point.
pub fn resolve(
    point: GeoPoint,
    source: &dyn BoundaryDataSource,
) -> Result<DistrictBoundary, SpatialError> {
    DistrictIndex::load(source)?.resolve(point)
}

/// Compute the bounding box envelope for a geometry.
fn compute_envelope(geometry: &Geometry<f64>) -> Option<AABB<[f64; 2]>> {
    geometry.bounding_rect().map(|rect| {
        AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Geometry, GeometryCollection, LineString, Polygon, polygon};

    fn square(min_x: f64, min_y: f64, size: f64) -> Polygon<f64> {
        polygon![
            (x: min_x, y: min_y),
            (x: min_x + size, y: min_y),
            (x: min_x + size, y: min_y + size),
            (x: min_x, y: min_y + size),
        ]
    }

    fn feature(name: &str, geometry: Geometry<f64>, priority: Option<i64>) -> BoundaryFeature {
        BoundaryFeature {
            geometry,
            name: name.to_string(),
            code: format!("{:0>4}", name.len()),
            priority,
        }
    }

    #[test]
    fn resolves_containing_district() {
        let index = DistrictIndex::build(vec![
            feature("West", Geometry::Polygon(square(-84.0, 42.0, 1.0)), None),
            feature("East", Geometry::Polygon(square(-83.0, 42.0, 1.0)), None),
        ]);

        let district = index.resolve(GeoPoint::new(-82.5, 42.5)).unwrap();
        assert_eq!(district.name(), "East");
        assert_eq!(district.polygon().0.len(), 1);
    }

    #[test]
    fn point_outside_every_district_is_an_error() {
        let index = DistrictIndex::build(vec![
            feature("West", Geometry::Polygon(square(-84.0, 42.0, 1.0)), None),
            feature("East", Geometry::Polygon(square(-83.0, 42.0, 1.0)), None),
        ]);

        assert!(matches!(
            index.resolve(GeoPoint::new(-80.0, 40.0)),
            Err(SpatialError::NoDistrictFound { .. })
        ));
        assert!(matches!(
            index.resolve(GeoPoint::new(f64::NAN, 42.5)),
            Err(SpatialError::NoDistrictFound { .. })
        ));
    }

    #[test]
    fn empty_index_finds_nothing() {
        let index = DistrictIndex::build(Vec::new());
        assert!(index.is_empty());
        assert!(matches!(
            index.resolve(GeoPoint::new(-83.5, 42.5)),
            Err(SpatialError::NoDistrictFound { .. })
        ));
    }

    #[test]
    fn first_in_source_order_wins_without_priority() {
        let index = DistrictIndex::build(vec![
            feature("Outer", Geometry::Polygon(square(-84.0, 42.0, 2.0)), None),
            feature("Inner", Geometry::Polygon(square(-83.5, 42.5, 0.5)), None),
        ]);

        let district = index.resolve(GeoPoint::new(-83.25, 42.75)).unwrap();
        assert_eq!(district.name(), "Outer");
    }

    #[test]
    fn highest_priority_wins() {
        let index = DistrictIndex::build(vec![
            feature("Outer", Geometry::Polygon(square(-84.0, 42.0, 2.0)), Some(1)),
            feature("Inner", Geometry::Polygon(square(-83.5, 42.5, 0.5)), Some(5)),
            feature("Unranked", Geometry::Polygon(square(-84.0, 42.0, 2.0)), None),
        ]);

        let district = index.resolve(GeoPoint::new(-83.25, 42.75)).unwrap();
        assert_eq!(district.name(), "Inner");
    }

    #[test]
    fn collection_keeps_only_polygonal_parts() {
        let line: LineString<f64> = vec![(-90.0, 40.0), (-89.0, 41.0)].into();
        let collection = GeometryCollection(vec![
            Geometry::Polygon(square(-84.0, 42.0, 1.0)),
            Geometry::LineString(line),
        ]);
        let index = DistrictIndex::build(vec![feature(
            "Mixed",
            Geometry::GeometryCollection(collection),
            None,
        )]);

        let district = index.resolve(GeoPoint::new(-83.5, 42.5)).unwrap();
        assert_eq!(district.polygon().0.len(), 1);
    }

    #[test]
    fn collection_without_polygons_is_invalid() {
        let line: LineString<f64> = vec![(-84.0, 42.0), (-83.0, 43.0)].into();
        let index = DistrictIndex::build(vec![feature(
            "Lines",
            Geometry::GeometryCollection(GeometryCollection(vec![Geometry::LineString(line)])),
            None,
        )]);

        assert!(matches!(
            index.resolve(GeoPoint::new(-83.5, 42.5)),
            Err(SpatialError::InvalidBoundaryGeometry { name }) if name == "Lines"
        ));
    }

    #[test]
    fn resolve_loads_from_source() {
        let source = StaticBoundarySource::new(vec![feature(
            "Only",
            Geometry::Polygon(square(-84.0, 42.0, 1.0)),
            None,
        )]);
        let district = resolve(GeoPoint::new(-83.5, 42.5), &source).unwrap();
        assert_eq!(district.name(), "Only");
        assert_eq!(district.code(), "0004");
    }
}
