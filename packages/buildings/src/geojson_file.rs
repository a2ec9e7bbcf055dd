//! Building footprints from a local `GeoJSON` file.

use std::path::PathBuf;

use fleetlab_projection::GeoPoint;
use geo::{Centroid, Geometry, MultiPolygon};
use geojson::GeoJson;

use crate::{BuildingError, BuildingFeatureProvider, within};

/// Reads a `FeatureCollection` of building footprints (longitude/latitude)
/// and serves their centroids.
#[derive(Debug, Clone)]
pub struct GeojsonBuildingSource {
    path: PathBuf,
}

impl GeojsonBuildingSource {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

/// Centroid of every feature geometry in `text`. Features without
/// geometry are skipped.
fn parse_centroids(text: &str) -> Result<Vec<GeoPoint>, BuildingError> {
    let geojson: GeoJson = text.parse().map_err(|e| BuildingError::Parse {
        message: format!("Failed to parse building file: {e}"),
    })?;

    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(BuildingError::Parse {
            message: "Building file is not a FeatureCollection".to_string(),
        });
    };

    let mut centroids = Vec::with_capacity(collection.features.len());
    for feature in collection.features {
        let Some(geometry) = feature.geometry else {
            continue;
        };
        let geometry: Geometry<f64> =
            geometry
                .try_into()
                .map_err(|e: geojson::Error| BuildingError::Parse {
                    message: format!("Invalid building geometry: {e}"),
                })?;
        if let Some(centroid) = geometry.centroid() {
            centroids.push(GeoPoint::from(centroid));
        }
    }
    Ok(centroids)
}

#[async_trait::async_trait]
impl BuildingFeatureProvider for GeojsonBuildingSource {
    async fn query(&self, area: &MultiPolygon<f64>) -> Result<Vec<GeoPoint>, BuildingError> {
        log::debug!("Reading building footprints from {}", self.path.display());
        let text = tokio::fs::read_to_string(&self.path).await?;
        let centroids = parse_centroids(&text)?;
        Ok(within(area, centroids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    const FOOTPRINTS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "building": "house" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.1, 0.1], [0.3, 0.1], [0.3, 0.3], [0.1, 0.3], [0.1, 0.1]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "building": "yes" },
                "geometry": { "type": "Point", "coordinates": [5.0, 5.0] }
            },
            {
                "type": "Feature",
                "properties": {},
                "geometry": null
            }
        ]
    }"#;

    #[test]
    fn computes_footprint_centroids() {
        let centroids = parse_centroids(FOOTPRINTS).unwrap();
        assert_eq!(centroids.len(), 2);
        assert!((centroids[0].lon - 0.2).abs() < 1e-9);
        assert!((centroids[0].lat - 0.2).abs() < 1e-9);
        assert_eq!(centroids[1], GeoPoint::new(5.0, 5.0));
    }

    #[test]
    fn rejects_bare_geometry() {
        let text = r#"{ "type": "Point", "coordinates": [0.0, 0.0] }"#;
        assert!(matches!(
            parse_centroids(text),
            Err(BuildingError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn reads_file_and_filters_by_area() {
        let path = std::env::temp_dir().join(format!(
            "fleetlab_buildings_{}.geojson",
            std::process::id()
        ));
        tokio::fs::write(&path, FOOTPRINTS).await.unwrap();

        let source = GeojsonBuildingSource::new(path.clone());
        let area = MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
        ]]);
        let found = source.query(&area).await;
        let _ = tokio::fs::remove_file(&path).await;

        let found = found.unwrap();
        assert_eq!(found.len(), 1);
        assert!((found[0].lon - 0.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let source = GeojsonBuildingSource::new(PathBuf::from("/nonexistent/buildings.geojson"));
        let area = MultiPolygon(Vec::new());
        assert!(matches!(
            source.query(&area).await,
            Err(BuildingError::Io(_))
        ));
    }
}
