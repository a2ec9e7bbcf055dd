#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Stop safety scoring.
//!
//! Every stop gets a composite score in `[0, 1]`: a weighted sum over the
//! seven safety attributes, where benefit factors count as-is and cost
//! factors (traffic risk, construction risk, U-turn) count as `1 − value`.
//! Absent attributes fall back to the [`SafetyProfile`] defaults. Scores
//! map to a [`SafetyRating`] tier by inclusive lower thresholds.

pub mod directions;
pub mod profile;

use fleetlab_stop_models::{SafetyAttributes, SafetyFactor, SafetyRating, Stop};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use directions::{autofill_with_directions, requires_uturn};
pub use profile::{
    FactorTable, SafetyProfile, Thresholds, deserialize_defaults, deserialize_weights,
};

/// Errors from safety scoring.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SafetyError {
    /// A stop attribute is non-finite or outside `[0, 1]`.
    #[error("Stop '{stop}' has {factor} = {value}, expected a value in [0, 1]")]
    AttributeOutOfRange {
        /// Label of the offending stop.
        stop: String,
        /// The offending attribute.
        factor: SafetyFactor,
        /// The offending value.
        value: f64,
    },

    /// The safety profile is inconsistent.
    #[error("Invalid safety profile: {message}")]
    InvalidProfile {
        /// What is wrong with the profile.
        message: String,
    },
}

/// Returns a copy of `stop` with every absent attribute set to its profile
/// default. Present attributes, score and rating are untouched.
#[must_use]
pub fn autofill(stop: &Stop, profile: &SafetyProfile) -> Stop {
    let mut filled = stop.clone();
    for factor in SafetyFactor::ALL {
        if filled.attributes.get(factor).is_none() {
            filled.attributes.set(factor, profile.defaults.get(factor));
        }
    }
    filled
}

/// Composite safety score of `attributes` under `profile`.
///
/// The weighted sum is divided by the weight total, so the score is in
/// `[0, 1]` whatever the weights add up to.
#[must_use]
pub fn score(attributes: &SafetyAttributes, profile: &SafetyProfile) -> f64 {
    let weighted: f64 = SafetyFactor::ALL
        .iter()
        .map(|&factor| {
            let value = attributes
                .get(factor)
                .unwrap_or_else(|| profile.defaults.get(factor));
            let adjusted = if factor.is_cost() { 1.0 - value } else { value };
            profile.weights.get(factor) * adjusted
        })
        .sum();
    (weighted / profile.weights.sum()).clamp(0.0, 1.0)
}

/// Tier of `score` under `profile`.
#[must_use]
pub fn classify(score: f64, profile: &SafetyProfile) -> SafetyRating {
    profile.rating_for(score)
}

/// Checks that every present attribute of `stop` is finite and in `[0, 1]`.
///
/// # Errors
///
/// Returns [`SafetyError::AttributeOutOfRange`] for the first offending
/// attribute.
pub fn validate_attributes(stop: &Stop) -> Result<(), SafetyError> {
    for factor in SafetyFactor::ALL {
        let Some(value) = stop.attributes.get(factor) else {
            continue;
        };
        if !(value.is_finite() && (0.0..=1.0).contains(&value)) {
            return Err(SafetyError::AttributeOutOfRange {
                stop: stop.label(),
                factor,
                value,
            });
        }
    }
    Ok(())
}

/// Validates, autofills, scores and classifies one stop.
///
/// # Errors
///
/// Returns [`SafetyError::AttributeOutOfRange`] if an attribute is invalid.
pub fn score_stop(stop: &Stop, profile: &SafetyProfile) -> Result<Stop, SafetyError> {
    validate_attributes(stop)?;
    let mut scored = autofill(stop, profile);
    let value = score(&scored.attributes, profile);
    scored.score = Some(value);
    scored.rating = Some(classify(value, profile));
    Ok(scored)
}

/// Scores every stop, preserving order.
///
/// # Errors
///
/// Returns [`SafetyError::AttributeOutOfRange`] for the first stop with an
/// invalid attribute; no partial result is returned.
pub fn score_stops(stops: &[Stop], profile: &SafetyProfile) -> Result<Vec<Stop>, SafetyError> {
    let scored = stops
        .iter()
        .map(|stop| score_stop(stop, profile))
        .collect::<Result<Vec<_>, _>>()?;
    log::debug!("Scored {} stops", scored.len());
    Ok(scored)
}

/// Stop counts per safety tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetySummary {
    pub safe_stops: usize,
    pub acceptable_stops: usize,
    pub unsafe_stops: usize,
    /// Stops without a rating.
    pub unscored_stops: usize,
}

impl SafetySummary {
    /// Tallies the ratings of `stops`.
    #[must_use]
    pub fn from_stops(stops: &[Stop]) -> Self {
        stops.iter().fold(Self::default(), |mut summary, stop| {
            match stop.rating {
                Some(SafetyRating::Safe) => summary.safe_stops += 1,
                Some(SafetyRating::Acceptable) => summary.acceptable_stops += 1,
                Some(SafetyRating::Unsafe) => summary.unsafe_stops += 1,
                None => summary.unscored_stops += 1,
            }
            summary
        })
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.safe_stops + self.acceptable_stops + self.unsafe_stops + self.unscored_stops
    }
}
