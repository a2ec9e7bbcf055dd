#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Stop simulation pipeline.
//!
//! Ties the components together for one school:
//!
//! 1. Geocode the school address.
//! 2. Resolve the enclosing school district.
//! 3. Sample candidate stops from building centroids outside the walk zone.
//! 4. Optionally look up U-turns, then score every stop.
//! 5. Find the cheapest fleet that covers the stops.
//!
//! The result is a serializable [`Proposal`]. Uploaded stop lists skip
//! steps 1–3 and go through [`Simulator::evaluate_stops`] instead.

pub mod config;
pub mod pipeline;
pub mod progress;

use fleetlab_fleet_models::FleetReport;
use fleetlab_geocoder::GeocodeError;
use fleetlab_geography_models::DistrictSummary;
use fleetlab_projection::{GeoPoint, ProjectionError};
use fleetlab_safety::{SafetyError, SafetySummary};
use fleetlab_sampler::SamplerError;
use fleetlab_spatial::SpatialError;
use fleetlab_stop_models::Stop;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use config::{ConfigError, FleetlabConfig};
pub use pipeline::Simulator;
pub use progress::{NullProgress, ProgressCallback, null_progress};

/// Errors that abort a simulation request.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error(transparent)]
    Spatial(#[from] SpatialError),

    #[error(transparent)]
    Sampler(#[from] SamplerError),

    #[error(transparent)]
    Safety(#[from] SafetyError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

/// The geocoded school.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolLocation {
    /// The address or name that was searched for.
    pub query: String,
    pub position: GeoPoint,
    /// Canonical address reported by the geocoder.
    pub matched_address: Option<String>,
}

/// Counts from the stop draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingStats {
    pub requested: usize,
    pub population: usize,
    pub returned: usize,
    pub underfilled: bool,
    pub discarded: usize,
}

/// A non-fatal data problem, reported alongside the result instead of
/// silently dropping data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Anomaly {
    /// An uploaded row has out-of-range or incomplete coordinates.
    #[serde(rename_all = "camelCase")]
    InvalidCoordinates {
        row: usize,
        lat: Option<f64>,
        lon: Option<f64>,
    },
    /// An uploaded row has neither coordinates nor an address.
    #[serde(rename_all = "camelCase")]
    MissingLocation { row: usize },
    /// An uploaded row's address could not be geocoded.
    #[serde(rename_all = "camelCase")]
    GeocodeFailed {
        row: usize,
        address: String,
        message: String,
    },
    /// Fewer candidate stops existed than were requested.
    #[serde(rename_all = "camelCase")]
    Underfilled { requested: usize, returned: usize },
    /// Sampled points dropped because they could not be reprojected.
    #[serde(rename_all = "camelCase")]
    StopsDiscarded { count: usize },
}

impl std::fmt::Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCoordinates { row, lat, lon } => {
                write!(f, "row {row}: invalid coordinates (lat {lat:?}, lon {lon:?})")
            }
            Self::MissingLocation { row } => write!(f, "row {row}: no coordinates or address"),
            Self::GeocodeFailed {
                row,
                address,
                message,
            } => write!(f, "row {row}: could not geocode '{address}': {message}"),
            Self::Underfilled {
                requested,
                returned,
            } => write!(
                f,
                "only {returned} of {requested} requested stops could be placed"
            ),
            Self::StopsDiscarded { count } => {
                write!(f, "{count} sampled points dropped after failed reprojection")
            }
        }
    }
}

/// Headline numbers for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalSummary {
    pub stop_count: usize,
    /// Daily cost of the assigned fleet; absent when infeasible.
    pub total_cost: Option<f64>,
    pub drivers_needed: Option<u32>,
    /// "N Buses, M Vans", or a note that no fleet fits.
    pub fleet_mix: String,
}

impl ProposalSummary {
    #[must_use]
    pub fn new(stop_count: usize, fleet: &FleetReport) -> Self {
        match fleet {
            FleetReport::Assigned { mix } => Self {
                stop_count,
                total_cost: Some(mix.total_cost),
                drivers_needed: Some(mix.drivers),
                fleet_mix: mix.to_string(),
            },
            FleetReport::Infeasible {
                required,
                max_capacity,
            } => Self {
                stop_count,
                total_cost: None,
                drivers_needed: None,
                fleet_mix: format!(
                    "No feasible fleet ({required} stops, max capacity {max_capacity})"
                ),
            },
        }
    }
}

/// Everything the presentation layer needs for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    /// Absent for uploaded stop lists.
    pub school: Option<SchoolLocation>,
    /// Absent for uploaded stop lists.
    pub district: Option<DistrictSummary>,
    /// Absent for uploaded stop lists.
    pub sampling: Option<SamplingStats>,
    /// Scored stops in order.
    pub stops: Vec<Stop>,
    pub safety: SafetySummary,
    pub fleet: FleetReport,
    pub summary: ProposalSummary,
    pub anomalies: Vec<Anomaly>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetlab_fleet_models::{CostModel, FleetMix, VehicleCapacities};

    #[test]
    fn summary_of_assigned_fleet() {
        let mix = FleetMix::price(2, 1, &VehicleCapacities::default(), &CostModel::default());
        let summary = ProposalSummary::new(40, &FleetReport::Assigned { mix });
        assert_eq!(summary.fleet_mix, "2 Buses, 1 Vans");
        assert_eq!(summary.drivers_needed, Some(3));
        assert_eq!(summary.total_cost, Some(595.0));
    }

    #[test]
    fn summary_of_infeasible_fleet() {
        let summary = ProposalSummary::new(
            90,
            &FleetReport::Infeasible {
                required: 90,
                max_capacity: 75,
            },
        );
        assert!(summary.total_cost.is_none());
        assert!(summary.fleet_mix.starts_with("No feasible fleet"));
    }

    #[test]
    fn anomalies_serialize_with_kind_tag() {
        let anomaly = Anomaly::GeocodeFailed {
            row: 3,
            address: "nowhere".to_string(),
            message: "not found".to_string(),
        };
        let value = serde_json::to_value(&anomaly).unwrap();
        assert_eq!(value["kind"], "geocodeFailed");
        assert_eq!(value["row"], 3);
        assert_eq!(
            anomaly.to_string(),
            "row 3: could not geocode 'nowhere': not found"
        );
    }
}
