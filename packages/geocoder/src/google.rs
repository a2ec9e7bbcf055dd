//! Google Maps Platform client (Geocoding and Directions APIs).
//!
//! Requires an API key. Response bodies carry their own `status` field
//! alongside the HTTP status, so both are checked.
//!
//! See <https://developers.google.com/maps/documentation/geocoding/requests-geocoding>

use serde::Deserialize;

use crate::{
    DirectionsProvider, GeocodeError, GeocodedAddress, Geocoder, GeocodingProvider, MatchQuality,
    Waypoint,
};

/// Geocoding and directions via Google Maps.
pub struct GoogleMapsClient {
    client: reqwest::Client,
    api_key: String,
    geocode_url: String,
    directions_url: String,
}

impl GoogleMapsClient {
    /// Creates a client for the given endpoints.
    #[must_use]
    pub const fn new(
        client: reqwest::Client,
        api_key: String,
        geocode_url: String,
        directions_url: String,
    ) -> Self {
        Self {
            client,
            api_key,
            geocode_url,
            directions_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: Option<String>,
    geometry: ResultGeometry,
}

#[derive(Debug, Deserialize)]
struct ResultGeometry {
    location: Location,
    #[serde(default)]
    location_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
    #[serde(default)]
    legs: Vec<Leg>,
}

#[derive(Debug, Deserialize)]
struct Leg {
    #[serde(default)]
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
struct Step {
    #[serde(default)]
    maneuver: Option<String>,
}

/// Maps a non-`OK` API status to an error.
fn status_error(status: &str, message: Option<String>, address: &str) -> GeocodeError {
    match status {
        "ZERO_RESULTS" | "NOT_FOUND" => GeocodeError::NotFound {
            address: address.to_string(),
        },
        "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => GeocodeError::RateLimited,
        other => GeocodeError::Provider {
            status: other.to_string(),
            message: message.unwrap_or_default(),
        },
    }
}

fn parse_geocode(body: GeocodeResponse, address: &str) -> Result<GeocodedAddress, GeocodeError> {
    if body.status != "OK" {
        return Err(status_error(&body.status, body.error_message, address));
    }

    let first = body
        .results
        .into_iter()
        .next()
        .ok_or_else(|| GeocodeError::NotFound {
            address: address.to_string(),
        })?;

    let match_quality = if first.geometry.location_type.as_deref() == Some("ROOFTOP") {
        MatchQuality::Exact
    } else {
        MatchQuality::Approximate
    };

    Ok(GeocodedAddress {
        latitude: first.geometry.location.lat,
        longitude: first.geometry.location.lng,
        matched_address: first.formatted_address,
        provider: GeocodingProvider::Google,
        match_quality,
    })
}

/// Collects the maneuvers of the first leg of every returned route.
fn parse_directions(
    body: DirectionsResponse,
    destination: &str,
) -> Result<Vec<String>, GeocodeError> {
    if body.status != "OK" {
        return Err(status_error(&body.status, body.error_message, destination));
    }

    Ok(body
        .routes
        .into_iter()
        .filter_map(|route| route.legs.into_iter().next())
        .flat_map(|leg| leg.steps)
        .filter_map(|step| step.maneuver)
        .collect())
}

#[async_trait::async_trait]
impl Geocoder for GoogleMapsClient {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn geocode(&self, address: &str) -> Result<GeocodedAddress, GeocodeError> {
        let resp = self
            .client
            .get(&self.geocode_url)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }

        let body: GeocodeResponse = resp.error_for_status()?.json().await?;
        parse_geocode(body, address)
    }
}

#[async_trait::async_trait]
impl DirectionsProvider for GoogleMapsClient {
    async fn route(
        &self,
        origin: &Waypoint,
        destination: &Waypoint,
    ) -> Result<Vec<String>, GeocodeError> {
        let origin = origin.to_query();
        let destination = destination.to_query();
        log::trace!("Requesting directions {origin} -> {destination}");

        let resp = self
            .client
            .get(&self.directions_url)
            .query(&[
                ("origin", origin.as_str()),
                ("destination", destination.as_str()),
                ("mode", "driving"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }

        let body: DirectionsResponse = resp.error_for_status()?.json().await?;
        parse_directions(body, &destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geocode_body(value: serde_json::Value) -> GeocodeResponse {
        serde_json::from_value(value).unwrap()
    }

    fn directions_body(value: serde_json::Value) -> DirectionsResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parses_rooftop_match_as_exact() {
        let body = geocode_body(serde_json::json!({
            "status": "OK",
            "results": [{
                "formatted_address": "45700 6 Mile Rd, Northville, MI 48168, USA",
                "geometry": {
                    "location": { "lat": 42.4311, "lng": -83.4833 },
                    "location_type": "ROOFTOP"
                }
            }]
        }));
        let result = parse_geocode(body, "45700 6 Mile Rd").unwrap();
        assert_eq!(result.provider, GeocodingProvider::Google);
        assert_eq!(result.match_quality, MatchQuality::Exact);
        assert!((result.longitude - -83.4833).abs() < 1e-9);
    }

    #[test]
    fn parses_interpolated_match_as_approximate() {
        let body = geocode_body(serde_json::json!({
            "status": "OK",
            "results": [{
                "geometry": {
                    "location": { "lat": 1.0, "lng": 2.0 },
                    "location_type": "RANGE_INTERPOLATED"
                }
            }]
        }));
        let result = parse_geocode(body, "x").unwrap();
        assert_eq!(result.match_quality, MatchQuality::Approximate);
        assert!(result.matched_address.is_none());
    }

    #[test]
    fn maps_api_statuses_to_errors() {
        let zero = geocode_body(serde_json::json!({ "status": "ZERO_RESULTS", "results": [] }));
        assert!(matches!(
            parse_geocode(zero, "nowhere"),
            Err(GeocodeError::NotFound { address }) if address == "nowhere"
        ));

        let limited = geocode_body(serde_json::json!({ "status": "OVER_QUERY_LIMIT" }));
        assert!(matches!(
            parse_geocode(limited, "x"),
            Err(GeocodeError::RateLimited)
        ));

        let denied = geocode_body(serde_json::json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid."
        }));
        assert!(matches!(
            parse_geocode(denied, "x"),
            Err(GeocodeError::Provider { status, .. }) if status == "REQUEST_DENIED"
        ));
    }

    #[test]
    fn collects_first_leg_maneuvers_of_each_route() {
        let body = directions_body(serde_json::json!({
            "status": "OK",
            "routes": [
                { "legs": [
                    { "steps": [{ "maneuver": "turn-left" }, {}, { "maneuver": "uturn-right" }] },
                    { "steps": [{ "maneuver": "ignored-second-leg" }] }
                ]},
                { "legs": [{ "steps": [{ "maneuver": "merge" }] }] }
            ]
        }));
        let maneuvers = parse_directions(body, "dest").unwrap();
        assert_eq!(maneuvers, vec!["turn-left", "uturn-right", "merge"]);
    }

    #[test]
    fn no_route_is_not_found() {
        let body = directions_body(serde_json::json!({ "status": "ZERO_RESULTS", "routes": [] }));
        assert!(matches!(
            parse_directions(body, "dest"),
            Err(GeocodeError::NotFound { .. })
        ));
    }
}
