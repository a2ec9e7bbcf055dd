//! Boundary data sources.
//!
//! [`GeojsonBoundarySource`] reads a `GeoJSON` `FeatureCollection` of
//! district polygons from disk and maps the configured properties onto
//! name, code and priority. Files carrying a legacy `crs` member that
//! names a supported projected frame are reprojected to longitude/latitude
//! on load.

use std::path::PathBuf;

use fleetlab_geography_models::{BoundaryFeature, pad_code};
use fleetlab_projection::{Frame, GeoPoint, Projector};
use geo::{Coord, Geometry, MapCoords};
use geojson::{FeatureCollection, GeoJson, JsonObject};
use serde::{Deserialize, Serialize};

use crate::{BoundaryDataSource, SpatialError};

/// Which feature properties hold the district name, code and priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryFields {
    /// Property holding the district name.
    pub name: String,
    /// Property holding the district code.
    pub code: String,
    /// Optional property holding a numeric priority.
    pub priority: Option<String>,
    /// Codes are zero-padded to this many characters.
    pub code_width: usize,
}

impl Default for BoundaryFields {
    fn default() -> Self {
        Self {
            name: "Name".to_string(),
            code: "DCode".to_string(),
            priority: None,
            code_width: 4,
        }
    }
}

/// District boundaries stored in a `GeoJSON` file.
#[derive(Debug, Clone)]
pub struct GeojsonBoundarySource {
    path: PathBuf,
    fields: BoundaryFields,
}

impl GeojsonBoundarySource {
    /// Creates a source reading `path` with the given property mapping.
    #[must_use]
    pub const fn new(path: PathBuf, fields: BoundaryFields) -> Self {
        Self { path, fields }
    }
}

impl BoundaryDataSource for GeojsonBoundarySource {
    fn load(&self) -> Result<Vec<BoundaryFeature>, SpatialError> {
        log::debug!("Reading district boundaries from {}", self.path.display());
        let text = std::fs::read_to_string(&self.path)?;
        parse_boundaries(&text, &self.fields)
    }
}

/// Boundaries held in memory. Useful for tests and for callers that load
/// boundaries some other way.
#[derive(Debug, Clone, Default)]
pub struct StaticBoundarySource {
    features: Vec<BoundaryFeature>,
}

impl StaticBoundarySource {
    /// Wraps an already-loaded set of boundaries.
    #[must_use]
    pub const fn new(features: Vec<BoundaryFeature>) -> Self {
        Self { features }
    }
}

impl BoundaryDataSource for StaticBoundarySource {
    fn load(&self) -> Result<Vec<BoundaryFeature>, SpatialError> {
        Ok(self.features.clone())
    }
}

/// Parses a `GeoJSON` `FeatureCollection` into boundary records.
///
/// Skips features with missing geometry or an empty name.
///
/// # Errors
///
/// Returns [`SpatialError::GeoJson`] if the text is not a feature
/// collection or a geometry cannot be converted, and
/// [`SpatialError::Projection`] if a declared projected frame is
/// unsupported or a coordinate cannot be reprojected.
pub fn parse_boundaries(
    text: &str,
    fields: &BoundaryFields,
) -> Result<Vec<BoundaryFeature>, SpatialError> {
    let geojson: GeoJson = text.parse().map_err(|e| SpatialError::GeoJson {
        message: format!("Failed to parse boundary file: {e}"),
    })?;

    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(SpatialError::GeoJson {
            message: "Boundary file is not a FeatureCollection".to_string(),
        });
    };

    let projector = declared_projector(&collection)?;
    let mut boundaries = Vec::with_capacity(collection.features.len());

    for feature in collection.features {
        let Some(name) = feature
            .property(&fields.name)
            .and_then(property_to_string)
            .filter(|s| !s.is_empty())
        else {
            log::warn!("Skipping boundary feature without '{}'", fields.name);
            continue;
        };

        let code = feature
            .property(&fields.code)
            .and_then(property_to_string)
            .map(|code| pad_code(&code, fields.code_width))
            .unwrap_or_default();

        let priority = fields
            .priority
            .as_ref()
            .and_then(|field| feature.property(field))
            .and_then(serde_json::Value::as_i64);

        let Some(geometry) = feature.geometry else {
            log::warn!("Skipping boundary '{name}' without geometry");
            continue;
        };

        let geometry: Geometry<f64> =
            geometry
                .try_into()
                .map_err(|e: geojson::Error| SpatialError::GeoJson {
                    message: format!("Invalid geometry for boundary '{name}': {e}"),
                })?;

        let geometry = match &projector {
            Some(projector) => unproject(&geometry, projector)?,
            None => geometry,
        };

        boundaries.push(BoundaryFeature {
            geometry,
            name,
            code,
            priority,
        });
    }

    log::debug!("Parsed {} district boundaries", boundaries.len());
    Ok(boundaries)
}

/// Reads a property as a string; numeric codes are rendered without a
/// fractional part when they are whole numbers.
fn property_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => n.as_i64().map_or_else(
            || {
                n.as_f64().map(|f| {
                    if f.fract() == 0.0 {
                        format!("{f:.0}")
                    } else {
                        f.to_string()
                    }
                })
            },
            |i| Some(i.to_string()),
        ),
        _ => None,
    }
}

/// Returns a projector if the collection declares a projected `crs`.
///
/// RFC 7946 dropped the `crs` member and mandates WGS 84, but many
/// exports (including state district files) still carry it.
fn declared_projector(collection: &FeatureCollection) -> Result<Option<Projector>, SpatialError> {
    let Some(code) = collection
        .foreign_members
        .as_ref()
        .and_then(declared_epsg)
    else {
        return Ok(None);
    };

    let frame = Frame::from_epsg(code)?;
    if frame.is_geographic() {
        return Ok(None);
    }

    log::info!("Boundary file declares {frame}, reprojecting to EPSG:4326");
    Ok(Some(Projector::new(Frame::WGS84, frame)?))
}

/// Extracts the EPSG code from `{"crs": {"properties": {"name": "...:26917"}}}`.
fn declared_epsg(members: &JsonObject) -> Option<u32> {
    let name = members
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()?;

    if name.ends_with("CRS84") {
        return Some(4326);
    }

    name.rsplit(':').next()?.parse().ok()
}

fn unproject(
    geometry: &Geometry<f64>,
    projector: &Projector,
) -> Result<Geometry<f64>, SpatialError> {
    let converted = geometry.try_map_coords(|coord: Coord<f64>| {
        projector
            .inverse(projector.metric_point(coord.x, coord.y))
            .map(|p: GeoPoint| Coord { x: p.lon, y: p.lat })
    })?;
    Ok(converted)
}
