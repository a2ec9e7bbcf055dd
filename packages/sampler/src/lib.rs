#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Candidate bus stop sampling.
//!
//! Stops are drawn from building centroids inside the district, excluding
//! everything within walking distance of the school. Distances are
//! measured in the projector's metric frame. The draw is uniform without
//! replacement and uses the caller's random source, so a seeded RNG gives
//! reproducible stops.

use fleetlab_buildings::{BuildingError, BuildingFeatureProvider};
use fleetlab_geography_models::DistrictBoundary;
use fleetlab_projection::{GeoPoint, ProjectionError, Projector};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from stop sampling.
#[derive(Debug, Error)]
pub enum SamplerError {
    /// The building provider found nothing inside the district.
    #[error("No building data found in district '{district}'")]
    NoBuildingData {
        /// District name.
        district: String,
    },

    /// Every building is inside the walk zone (or failed to project).
    #[error("No candidate stops beyond {walk_buffer_meters} m of the school ({buildings} buildings checked)")]
    NoCandidateStops {
        /// The walk buffer that was applied.
        walk_buffer_meters: f64,
        /// Buildings returned by the provider.
        buildings: usize,
    },

    /// A sampling parameter is out of range.
    #[error("Invalid sampling parameter: {message}")]
    InvalidParameter {
        /// What is wrong.
        message: String,
    },

    /// The building provider failed.
    #[error("Building provider error: {0}")]
    Provider(#[from] BuildingError),

    /// The school location could not be projected.
    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),
}

/// How many stops to draw and how far from the school they must be.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleParams {
    /// Stops to draw. Advisory: fewer are returned when fewer qualify.
    pub stop_count: usize,
    /// Radius around the school with no stops, in metres.
    pub walk_buffer_meters: f64,
}

impl Default for SampleParams {
    fn default() -> Self {
        Self {
            stop_count: 50,
            walk_buffer_meters: 400.0,
        }
    }
}

impl SampleParams {
    /// # Errors
    ///
    /// Returns [`SamplerError::InvalidParameter`] if `stop_count` is zero
    /// or the buffer is negative or non-finite.
    pub fn validate(&self) -> Result<(), SamplerError> {
        if self.stop_count == 0 {
            return Err(SamplerError::InvalidParameter {
                message: "stop count must be at least 1".to_string(),
            });
        }
        if !self.walk_buffer_meters.is_finite() || self.walk_buffer_meters < 0.0 {
            return Err(SamplerError::InvalidParameter {
                message: format!(
                    "walk buffer must be a non-negative distance, got {}",
                    self.walk_buffer_meters
                ),
            });
        }
        Ok(())
    }
}

/// Result of one sampling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleOutcome {
    /// Sampled stop locations, in provider order.
    pub stops: Vec<GeoPoint>,
    /// Stops that were asked for.
    pub requested: usize,
    /// Candidates left after the walk-zone filter.
    pub population: usize,
    /// Whether fewer than `requested` candidates were available.
    pub underfilled: bool,
    /// Centroids dropped because they could not be projected or
    /// unprojected.
    pub discarded: usize,
}

/// Queries `provider` for buildings in `boundary` and draws stops from
/// them.
///
/// # Errors
///
/// Returns [`SamplerError::NoBuildingData`] if the provider returns no
/// buildings, [`SamplerError::Provider`] if it fails, and any error of
/// [`select`].
pub async fn sample<R: Rng + ?Sized>(
    boundary: &DistrictBoundary,
    reference: GeoPoint,
    params: &SampleParams,
    provider: &dyn BuildingFeatureProvider,
    projector: &Projector,
    rng: &mut R,
) -> Result<SampleOutcome, SamplerError> {
    params.validate()?;

    let centroids = provider.query(boundary.polygon()).await?;
    log::debug!(
        "Found {} buildings in district '{}'",
        centroids.len(),
        boundary.name()
    );

    if centroids.is_empty() {
        return Err(SamplerError::NoBuildingData {
            district: boundary.name().to_string(),
        });
    }

    select(&centroids, reference, params, projector, rng)
}

/// Filters `centroids` to those beyond the walk buffer around `reference`
/// and draws up to `params.stop_count` of them.
///
/// # Errors
///
/// Returns [`SamplerError::InvalidParameter`] for bad parameters,
/// [`SamplerError::Projection`] if `reference` cannot be projected and
/// [`SamplerError::NoCandidateStops`] if nothing lies beyond the buffer.
pub fn select<R: Rng + ?Sized>(
    centroids: &[GeoPoint],
    reference: GeoPoint,
    params: &SampleParams,
    projector: &Projector,
    rng: &mut R,
) -> Result<SampleOutcome, SamplerError> {
    params.validate()?;

    let school = projector.forward(reference)?;
    let mut discarded = 0;
    let mut candidates: Vec<GeoPoint> = Vec::with_capacity(centroids.len());

    for projected in projector.forward_all(centroids) {
        let Ok(point) = projected else {
            discarded += 1;
            continue;
        };
        if point.distance(&school)? <= params.walk_buffer_meters {
            continue;
        }
        // Stops are reported in the unprojected frame, so a point that
        // cannot come back is not a candidate.
        match projector.inverse(point) {
            Ok(stop) => candidates.push(stop),
            Err(e) => {
                log::debug!("Dropping candidate stop that failed to unproject: {e}");
                discarded += 1;
            }
        }
    }

    if candidates.is_empty() {
        return Err(SamplerError::NoCandidateStops {
            walk_buffer_meters: params.walk_buffer_meters,
            buildings: centroids.len(),
        });
    }

    let population = candidates.len();
    let underfilled = population < params.stop_count;
    let stops: Vec<GeoPoint> = if underfilled {
        log::warn!(
            "Only {population} candidate stops beyond {} m, fewer than the {} requested",
            params.walk_buffer_meters,
            params.stop_count
        );
        candidates
    } else {
        let mut indices = rand::seq::index::sample(rng, population, params.stop_count).into_vec();
        indices.sort_unstable();
        indices.into_iter().map(|i| candidates[i]).collect()
    };

    log::debug!(
        "Sampled {} of {population} candidate stops ({discarded} discarded)",
        stops.len()
    );

    Ok(SampleOutcome {
        stops,
        requested: params.stop_count,
        population,
        underfilled,
        discarded,
    })
}
