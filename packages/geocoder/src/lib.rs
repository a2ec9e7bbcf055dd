#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geocoding and driving-directions providers.
//!
//! Converts school and stop addresses to coordinates, and fetches driving
//! routes so stops can be checked for U-turn maneuvers. Providers are
//! configured via TOML files in `services/`:
//!
//! 1. **Google Maps Platform** (priority 1): geocoding and directions.
//!    Needs an API key in `GOOGLE_MAPS_API_KEY`; skipped without one.
//! 2. **Nominatim / OpenStreetMap** (priority 2): free geocoding with a
//!    1 req/sec rate limit. No directions.
//!
//! Clients are plain values built by the caller and passed to whichever
//! component needs them; nothing here is process-global.

pub mod google;
pub mod nominatim;
pub mod service_registry;

use std::sync::Arc;

use fleetlab_projection::GeoPoint;
use thiserror::Error;

pub use google::GoogleMapsClient;
pub use nominatim::NominatimGeocoder;

/// A geocoding result with coordinates and metadata.
#[derive(Debug, Clone)]
pub struct GeocodedAddress {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// The matched/canonical address returned by the geocoder.
    pub matched_address: Option<String>,
    /// Which provider resolved this address.
    pub provider: GeocodingProvider,
    /// Whether this was an exact or approximate match.
    pub match_quality: MatchQuality,
}

impl GeocodedAddress {
    /// The result as a longitude/latitude point.
    #[must_use]
    pub const fn point(&self) -> GeoPoint {
        GeoPoint::new(self.longitude, self.latitude)
    }
}

/// Which geocoding provider resolved an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeocodingProvider {
    /// Google Maps Geocoding API.
    Google,
    /// Nominatim / OpenStreetMap.
    Nominatim,
}

/// Quality of the geocoding match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchQuality {
    /// Exact address match.
    Exact,
    /// Approximate / non-exact match.
    Approximate,
}

/// Errors from geocoding and directions operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// The provider returned no result for the address.
    #[error("Could not geocode address: {address}")]
    NotFound {
        /// The address that was queried.
        address: String,
    },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// The provider rejected the request (bad key, denied, invalid request).
    #[error("Provider returned {status}: {message}")]
    Provider {
        /// Provider status code (e.g. `REQUEST_DENIED`).
        status: String,
        /// Provider error message, if any.
        message: String,
    },

    /// No usable provider is configured.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what is missing.
        message: String,
    },
}

/// Turns an address into coordinates.
#[async_trait::async_trait]
pub trait Geocoder: Send + Sync {
    /// Short provider identifier for logs.
    fn name(&self) -> &str;

    /// Geocodes a free-form address.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::NotFound`] if the provider has no result,
    /// or another [`GeocodeError`] if the request fails.
    async fn geocode(&self, address: &str) -> Result<GeocodedAddress, GeocodeError>;
}

/// One end of a driving route.
#[derive(Debug, Clone, PartialEq)]
pub enum Waypoint {
    /// A free-form address.
    Address(String),
    /// A longitude/latitude point.
    Coordinates(GeoPoint),
}

impl Waypoint {
    /// Renders the waypoint the way directions APIs expect it
    /// (`"lat,lon"` for coordinates).
    #[must_use]
    pub fn to_query(&self) -> String {
        match self {
            Self::Address(address) => address.clone(),
            Self::Coordinates(point) => format!("{},{}", point.lat, point.lon),
        }
    }
}

/// Fetches driving routes as a list of maneuver labels.
#[async_trait::async_trait]
pub trait DirectionsProvider: Send + Sync {
    /// Returns the maneuver label of every step on the route from
    /// `origin` to `destination` (e.g. `"turn-left"`, `"uturn-right"`).
    /// Steps without a maneuver are omitted.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the request fails or the provider finds
    /// no route.
    async fn route(
        &self,
        origin: &Waypoint,
        destination: &Waypoint,
    ) -> Result<Vec<String>, GeocodeError>;
}

/// Builds the highest-priority usable geocoder from the service registry.
///
/// # Errors
///
/// Returns [`GeocodeError::Config`] if no enabled service can be built
/// (for example, Google is the only one enabled and no API key is set).
pub fn geocoder_from_registry(client: &reqwest::Client) -> Result<Arc<dyn Geocoder>, GeocodeError> {
    for service in service_registry::enabled_services() {
        match service.build_geocoder(client) {
            Some(geocoder) => {
                log::info!("Using {} for geocoding", service.name);
                return Ok(geocoder);
            }
            None => log::info!("Skipping geocoding service {} (not configured)", service.id),
        }
    }

    Err(GeocodeError::Config {
        message: "No geocoding service is enabled and configured".to_string(),
    })
}

/// Builds the highest-priority usable directions provider, if any.
#[must_use]
pub fn directions_from_registry(client: &reqwest::Client) -> Option<Arc<dyn DirectionsProvider>> {
    service_registry::enabled_services()
        .into_iter()
        .find_map(|service| service.build_directions(client))
}
