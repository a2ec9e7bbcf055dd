//! Nominatim / OpenStreetMap geocoder client.
//!
//! Used when no Google Maps key is available. Nominatim has strict rate
//! limits: **1 request per second** maximum on the public instance, so
//! the client spaces out its own requests.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::{GeocodeError, GeocodedAddress, Geocoder, GeocodingProvider, MatchQuality};

/// Free-form Nominatim search client.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    country_codes: Option<String>,
    rate_limit: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl NominatimGeocoder {
    /// Creates a client for the search endpoint at `base_url`.
    ///
    /// The `client` should carry a descriptive User-Agent; the public
    /// instance rejects anonymous traffic.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        country_codes: Option<String>,
        rate_limit: Duration,
    ) -> Self {
        Self {
            client,
            base_url,
            country_codes,
            rate_limit,
            last_request: Mutex::new(None),
        }
    }

    /// Waits until at least `rate_limit` has passed since the previous
    /// request.
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.rate_limit {
                tokio::time::sleep(self.rate_limit - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[async_trait::async_trait]
impl Geocoder for NominatimGeocoder {
    fn name(&self) -> &'static str {
        "nominatim"
    }

    async fn geocode(&self, address: &str) -> Result<GeocodedAddress, GeocodeError> {
        self.throttle().await;

        let mut params = vec![("q", address), ("format", "jsonv2"), ("limit", "1")];
        if let Some(codes) = &self.country_codes {
            params.push(("countrycodes", codes));
        }

        let resp = self.client.get(&self.base_url).query(&params).send().await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }

        let body: serde_json::Value = resp.json().await?;
        parse_response(&body)?.ok_or_else(|| GeocodeError::NotFound {
            address: address.to_string(),
        })
    }
}

/// Parses Nominatim JSON response.
fn parse_response(body: &serde_json::Value) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = first["lat"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lat in Nominatim response".to_string(),
        })?;

    let lon = first["lon"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lon in Nominatim response".to_string(),
        })?;

    let display_name = first["display_name"].as_str().map(String::from);

    Ok(Some(GeocodedAddress {
        latitude: lat,
        longitude: lon,
        matched_address: display_name,
        provider: GeocodingProvider::Nominatim,
        match_quality: MatchQuality::Approximate,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_school_result() {
        let body = serde_json::json!([{
            "lat": "42.4311",
            "lon": "-83.4833",
            "display_name": "Northville High School, 45700, Six Mile Road, Northville, MI, USA"
        }]);
        let result = parse_response(&body).unwrap().unwrap();
        assert!((result.latitude - 42.4311).abs() < 1e-4);
        assert!((result.longitude - -83.4833).abs() < 1e-4);
        assert_eq!(result.provider, GeocodingProvider::Nominatim);
        assert!(result.matched_address.unwrap().starts_with("Northville"));
    }

    #[test]
    fn parses_empty_result() {
        let body = serde_json::json!([]);
        assert!(parse_response(&body).unwrap().is_none());
    }

    #[test]
    fn rejects_malformed_result() {
        let body = serde_json::json!({ "error": "bad request" });
        assert!(matches!(
            parse_response(&body),
            Err(GeocodeError::Parse { .. })
        ));

        let body = serde_json::json!([{ "lat": "not a number", "lon": "-83.0" }]);
        assert!(matches!(
            parse_response(&body),
            Err(GeocodeError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn throttle_spaces_requests() {
        let geocoder = NominatimGeocoder::new(
            reqwest::Client::new(),
            "http://localhost/search".to_string(),
            None,
            Duration::from_millis(50),
        );
        let start = Instant::now();
        geocoder.throttle().await;
        geocoder.throttle().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
