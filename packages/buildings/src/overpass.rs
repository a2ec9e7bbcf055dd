//! Overpass API building query.
//!
//! Asks `OpenStreetMap` for every `building`-tagged node, way and relation
//! inside the exterior ring of each polygon, with `out center` so ways and
//! relations come back with a centroid. Overpass `poly:` filters ignore
//! holes, so results are post-filtered against the full polygon.
//!
//! See <https://wiki.openstreetmap.org/wiki/Overpass_API/Overpass_QL>

use std::fmt::Write as _;

use fleetlab_projection::GeoPoint;
use geo::{MultiPolygon, Polygon};
use serde::Deserialize;

use crate::{BuildingError, BuildingFeatureProvider, within};

/// Public Overpass endpoint.
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Server-side query timeout in seconds.
const QUERY_TIMEOUT_SECS: u32 = 180;

/// Building centroids from the Overpass API.
pub struct OverpassProvider {
    client: reqwest::Client,
    url: String,
}

impl OverpassProvider {
    /// Creates a provider posting queries to `url`.
    #[must_use]
    pub const fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
struct Element {
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    center: Option<Center>,
}

#[derive(Debug, Deserialize)]
struct Center {
    lat: f64,
    lon: f64,
}

impl Element {
    /// Node coordinates, or the server-computed center of a way/relation.
    fn centroid(&self) -> Option<GeoPoint> {
        match (self.lat, self.lon, &self.center) {
            (Some(lat), Some(lon), _) => Some(GeoPoint::new(lon, lat)),
            (_, _, Some(center)) => Some(GeoPoint::new(center.lon, center.lat)),
            _ => None,
        }
    }
}

/// Renders a polygon's exterior ring as an Overpass `poly:` filter
/// (`"lat lon lat lon ..."`).
fn poly_filter(polygon: &Polygon<f64>) -> String {
    let mut coords = String::new();
    for coord in polygon.exterior().coords() {
        if !coords.is_empty() {
            coords.push(' ');
        }
        let _ = write!(coords, "{:.6} {:.6}", coord.y, coord.x);
    }
    format!("poly:\"{coords}\"")
}

/// Builds the Overpass QL query for every polygon in `area`.
fn build_query(area: &MultiPolygon<f64>) -> String {
    let mut query = format!("[out:json][timeout:{QUERY_TIMEOUT_SECS}];\n(\n");
    for polygon in &area.0 {
        let filter = poly_filter(polygon);
        for kind in ["node", "way", "relation"] {
            let _ = writeln!(query, "  {kind}[\"building\"]({filter});");
        }
    }
    query.push_str(");\nout center;\n");
    query
}

fn parse_response(body: &str) -> Result<Vec<GeoPoint>, BuildingError> {
    let response: OverpassResponse =
        serde_json::from_str(body).map_err(|e| BuildingError::Parse {
            message: format!("Failed to parse Overpass response: {e}"),
        })?;

    Ok(response
        .elements
        .iter()
        .filter_map(Element::centroid)
        .collect())
}

#[async_trait::async_trait]
impl BuildingFeatureProvider for OverpassProvider {
    async fn query(&self, area: &MultiPolygon<f64>) -> Result<Vec<GeoPoint>, BuildingError> {
        if area.0.is_empty() {
            return Ok(Vec::new());
        }

        let query = build_query(area);
        log::debug!("Querying Overpass for buildings in {} polygon(s)", area.0.len());

        let resp = self
            .client
            .post(&self.url)
            .form(&[("data", query)])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(BuildingError::Status {
                status: resp.status().as_u16(),
            });
        }

        let body = resp.text().await?;
        let centroids = parse_response(&body)?;
        let total = centroids.len();
        let inside = within(area, centroids);

        log::debug!(
            "Overpass returned {total} buildings, {} inside the district",
            inside.len()
        );
        Ok(inside)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn query_covers_all_element_kinds_per_polygon() {
        let area = MultiPolygon(vec![
            polygon![(x: -83.6, y: 42.3), (x: -83.4, y: 42.3), (x: -83.4, y: 42.5)],
            polygon![(x: -83.0, y: 42.0), (x: -82.9, y: 42.0), (x: -82.9, y: 42.1)],
        ]);
        let query = build_query(&area);
        assert!(query.starts_with("[out:json][timeout:180];"));
        assert!(query.trim_end().ends_with("out center;"));
        assert_eq!(query.matches("node[\"building\"]").count(), 2);
        assert_eq!(query.matches("way[\"building\"]").count(), 2);
        assert_eq!(query.matches("relation[\"building\"]").count(), 2);
        assert!(query.contains("poly:\"42.300000 -83.600000 42.300000 -83.400000"));
    }

    #[test]
    fn parses_nodes_and_centers() {
        let body = serde_json::json!({
            "elements": [
                { "type": "node", "id": 1, "lat": 42.41, "lon": -83.51 },
                { "type": "way", "id": 2, "center": { "lat": 42.42, "lon": -83.52 } },
                { "type": "relation", "id": 3 }
            ]
        })
        .to_string();
        let centroids = parse_response(&body).unwrap();
        assert_eq!(
            centroids,
            vec![GeoPoint::new(-83.51, 42.41), GeoPoint::new(-83.52, 42.42)]
        );
    }

    #[test]
    fn rejects_non_json() {
        assert!(matches!(
            parse_response("<html>busy</html>"),
            Err(BuildingError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn empty_area_skips_request() {
        let provider = OverpassProvider::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/unreachable".to_string(),
        );
        let found = provider.query(&MultiPolygon(Vec::new())).await.unwrap();
        assert!(found.is_empty());
    }
}
