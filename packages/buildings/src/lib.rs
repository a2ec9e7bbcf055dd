#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Building footprint providers.
//!
//! Candidate stop locations are drawn from the centroids of buildings
//! inside a district. Two providers are supplied:
//!
//! - [`OverpassProvider`] queries `OpenStreetMap` through the Overpass API.
//! - [`GeojsonBuildingSource`] reads footprints from a local `GeoJSON` file.
//!
//! Both return centroids in the order the underlying data lists them and
//! only those strictly inside the query polygon (holes excluded).

pub mod geojson_file;
pub mod overpass;

use fleetlab_projection::GeoPoint;
use geo::{Contains, MultiPolygon, Point};
use thiserror::Error;

pub use geojson_file::GeojsonBuildingSource;
pub use overpass::OverpassProvider;

/// Errors from building footprint queries.
#[derive(Debug, Error)]
pub enum BuildingError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("Building query failed with status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// I/O error reading a local footprint file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The response or file could not be parsed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },
}

/// Source of building centroids within a polygon.
#[async_trait::async_trait]
pub trait BuildingFeatureProvider: Send + Sync {
    /// Returns the centroid of every building inside `area`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildingError`] if the underlying data cannot be fetched
    /// or parsed. An area with no buildings is `Ok(vec![])`.
    async fn query(&self, area: &MultiPolygon<f64>) -> Result<Vec<GeoPoint>, BuildingError>;
}

/// Centroids held in memory, filtered by the query area like any other
/// provider.
#[derive(Debug, Clone, Default)]
pub struct StaticBuildings {
    centroids: Vec<GeoPoint>,
}

impl StaticBuildings {
    #[must_use]
    pub const fn new(centroids: Vec<GeoPoint>) -> Self {
        Self { centroids }
    }
}

#[async_trait::async_trait]
impl BuildingFeatureProvider for StaticBuildings {
    async fn query(&self, area: &MultiPolygon<f64>) -> Result<Vec<GeoPoint>, BuildingError> {
        Ok(within(area, self.centroids.iter().copied()))
    }
}

/// Keeps the points of `centroids` that lie inside `area`, in order.
pub(crate) fn within(
    area: &MultiPolygon<f64>,
    centroids: impl IntoIterator<Item = GeoPoint>,
) -> Vec<GeoPoint> {
    centroids
        .into_iter()
        .filter(|c| c.is_valid() && area.contains(&Point::from(*c)))
        .collect()
}
