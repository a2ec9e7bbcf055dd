//! Best-effort U-turn detection from driving directions.

use fleetlab_geocoder::{DirectionsProvider, Waypoint};
use fleetlab_stop_models::Stop;

use crate::{SafetyProfile, autofill};

/// Maneuver labels that mean the driver turns around.
const UTURN_MANEUVERS: [&str; 2] = ["uturn-left", "uturn-right"];

/// Whether any maneuver in a route is a U-turn.
#[must_use]
pub fn requires_uturn<S: AsRef<str>>(maneuvers: &[S]) -> bool {
    maneuvers
        .iter()
        .any(|m| UTURN_MANEUVERS.contains(&m.as_ref()))
}

/// Like [`autofill`], but derives an absent U-turn flag from a driving
/// route between `origin` and the stop (its address if it has one,
/// otherwise its coordinates).
///
/// A failed route lookup is logged and treated as "no U-turn".
pub async fn autofill_with_directions(
    stop: &Stop,
    profile: &SafetyProfile,
    directions: &dyn DirectionsProvider,
    origin: &Waypoint,
) -> Stop {
    if stop.attributes.uturn_required.is_some() {
        return autofill(stop, profile);
    }

    let destination = stop.address.as_ref().map_or_else(
        || Waypoint::Coordinates(stop.position),
        |address| Waypoint::Address(address.clone()),
    );

    let uturn = match directions.route(origin, &destination).await {
        Ok(maneuvers) => requires_uturn(&maneuvers),
        Err(e) => {
            log::warn!(
                "U-turn lookup failed for {}, assuming none: {e}",
                stop.label()
            );
            false
        }
    };

    let mut enriched = stop.clone();
    enriched.attributes.uturn_required = Some(uturn);
    autofill(&enriched, profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetlab_geocoder::GeocodeError;
    use fleetlab_projection::GeoPoint;
    use std::sync::Mutex;

    /// Returns canned maneuvers and records every destination it was
    /// asked for.
    struct FakeDirections {
        maneuvers: Option<Vec<String>>,
        requests: Mutex<Vec<Waypoint>>,
    }

    impl FakeDirections {
        fn new(maneuvers: Option<&[&str]>) -> Self {
            Self {
                maneuvers: maneuvers.map(|m| m.iter().map(ToString::to_string).collect()),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl DirectionsProvider for FakeDirections {
        async fn route(
            &self,
            _origin: &Waypoint,
            destination: &Waypoint,
        ) -> Result<Vec<String>, GeocodeError> {
            self.requests.lock().unwrap().push(destination.clone());
            self.maneuvers.clone().ok_or(GeocodeError::RateLimited)
        }
    }

    fn origin() -> Waypoint {
        Waypoint::Address("Northville High School".to_string())
    }

    fn stop() -> Stop {
        Stop::new(GeoPoint::new(-83.5, 42.4)).with_name("Stop 1")
    }

    #[test]
    fn detects_uturn_labels() {
        assert!(requires_uturn(&["turn-left", "uturn-right"]));
        assert!(requires_uturn(&["uturn-left"]));
        assert!(!requires_uturn(&["turn-left", "merge", "u-turn"]));
        assert!(!requires_uturn::<&str>(&[]));
    }

    #[tokio::test]
    async fn route_with_uturn_sets_flag() {
        let directions = FakeDirections::new(Some(&["straight", "uturn-left"]));
        let filled =
            autofill_with_directions(&stop(), &SafetyProfile::default(), &directions, &origin())
                .await;
        assert_eq!(filled.attributes.uturn_required, Some(true));
        assert_eq!(filled.attributes.visibility, Some(0.6));
        assert_eq!(
            directions.requests.lock().unwrap().as_slice(),
            &[Waypoint::Coordinates(GeoPoint::new(-83.5, 42.4))]
        );
    }

    #[tokio::test]
    async fn routes_to_address_when_present() {
        let directions = FakeDirections::new(Some(&["turn-right"]));
        let with_address = stop().with_address("123 Main St");
        let filled = autofill_with_directions(
            &with_address,
            &SafetyProfile::default(),
            &directions,
            &origin(),
        )
        .await;
        assert_eq!(filled.attributes.uturn_required, Some(false));
        assert_eq!(
            directions.requests.lock().unwrap().as_slice(),
            &[Waypoint::Address("123 Main St".to_string())]
        );
    }

    #[tokio::test]
    async fn provider_failure_defaults_to_no_uturn() {
        let directions = FakeDirections::new(None);
        let filled =
            autofill_with_directions(&stop(), &SafetyProfile::default(), &directions, &origin())
                .await;
        assert_eq!(filled.attributes.uturn_required, Some(false));
    }

    #[tokio::test]
    async fn present_flag_skips_lookup() {
        let directions = FakeDirections::new(Some(&["uturn-left"]));
        let mut known = stop();
        known.attributes.uturn_required = Some(false);
        let filled =
            autofill_with_directions(&known, &SafetyProfile::default(), &directions, &origin())
                .await;
        assert_eq!(filled.attributes.uturn_required, Some(false));
        assert!(directions.requests.lock().unwrap().is_empty());
    }
}
