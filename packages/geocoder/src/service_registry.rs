//! Compile-time registry of geocoding service configurations.
//!
//! Each provider is defined in a TOML file under `services/`. The
//! registry embeds these at compile time and exposes them via
//! [`all_services`] and [`enabled_services`].

use std::{sync::Arc, time::Duration};

use serde::Deserialize;

use crate::{DirectionsProvider, Geocoder, GoogleMapsClient, NominatimGeocoder};

/// A geocoding service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingService {
    /// Unique identifier (e.g., `"google"`, `"nominatim"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether this service may be selected.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Selection order: lower values are tried first.
    pub priority: u32,
    /// Provider-specific configuration.
    pub provider: ProviderConfig,
}

/// Provider-specific configuration, tagged by `type` in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Google Maps Geocoding and Directions APIs.
    Google {
        /// Geocoding endpoint.
        geocode_url: String,
        /// Directions endpoint.
        directions_url: String,
        /// Environment variable holding the API key.
        api_key_env: String,
    },
    /// Nominatim / `OpenStreetMap` geocoder.
    Nominatim {
        /// API base URL (e.g., `"https://nominatim.openstreetmap.org/search"`).
        base_url: String,
        /// Minimum delay between requests in milliseconds.
        rate_limit_ms: u64,
        /// Comma-separated ISO country codes to restrict results to.
        #[serde(default)]
        country_codes: Option<String>,
    },
}

const fn default_true() -> bool {
    true
}

impl GeocodingService {
    /// Returns the provider's primary endpoint regardless of variant.
    #[must_use]
    pub fn base_url(&self) -> &str {
        match &self.provider {
            ProviderConfig::Google { geocode_url, .. } => geocode_url,
            ProviderConfig::Nominatim { base_url, .. } => base_url,
        }
    }

    /// Builds a geocoder for this service, or `None` if it needs an API
    /// key that is not set.
    #[must_use]
    pub fn build_geocoder(&self, client: &reqwest::Client) -> Option<Arc<dyn Geocoder>> {
        match &self.provider {
            ProviderConfig::Google { .. } => self
                .google_client(client)
                .map(|c| Arc::new(c) as Arc<dyn Geocoder>),
            ProviderConfig::Nominatim {
                base_url,
                rate_limit_ms,
                country_codes,
            } => Some(Arc::new(NominatimGeocoder::new(
                client.clone(),
                base_url.clone(),
                country_codes.clone(),
                Duration::from_millis(*rate_limit_ms),
            ))),
        }
    }

    /// Builds a directions provider for this service, or `None` if the
    /// provider has no directions API or is not configured.
    #[must_use]
    pub fn build_directions(&self, client: &reqwest::Client) -> Option<Arc<dyn DirectionsProvider>> {
        match &self.provider {
            ProviderConfig::Google { .. } => self
                .google_client(client)
                .map(|c| Arc::new(c) as Arc<dyn DirectionsProvider>),
            ProviderConfig::Nominatim { .. } => None,
        }
    }

    fn google_client(&self, client: &reqwest::Client) -> Option<GoogleMapsClient> {
        let ProviderConfig::Google {
            geocode_url,
            directions_url,
            api_key_env,
        } = &self.provider
        else {
            return None;
        };

        let api_key = std::env::var(api_key_env).ok().filter(|k| !k.is_empty())?;
        Some(GoogleMapsClient::new(
            client.clone(),
            api_key,
            geocode_url.clone(),
            directions_url.clone(),
        ))
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const SERVICE_TOMLS: &[(&str, &str)] = &[
    ("google", include_str!("../services/google.toml")),
    ("nominatim", include_str!("../services/nominatim.toml")),
];

#[cfg(test)]
const EXPECTED_SERVICE_COUNT: usize = 2;

/// Returns all geocoding service configurations (enabled and disabled).
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_services() -> Vec<GeocodingService> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse geocoding service '{name}': {e}"))
        })
        .collect()
}

/// Returns only enabled services, sorted by priority (ascending).
#[must_use]
pub fn enabled_services() -> Vec<GeocodingService> {
    let mut services: Vec<GeocodingService> =
        all_services().into_iter().filter(|s| s.enabled).collect();
    services.sort_by_key(|s| s.priority);
    services
}
