//! The canonical safety weight, default and threshold tables.
//!
//! The published weights sum to 1.05. Scores divide by the weight total,
//! so the composite stays in `[0, 1]` and the effective weights sum to one.

use fleetlab_stop_models::{SafetyFactor, SafetyRating};
use serde::{Deserialize, Deserializer, Serialize};

use crate::SafetyError;

/// One value per safety factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorTable {
    pub visibility: f64,
    pub lighting: f64,
    pub traffic_risk: f64,
    pub pedestrian_safety: f64,
    pub sidewalk_quality: f64,
    pub construction_risk: f64,
    pub uturn_required: f64,
}

impl FactorTable {
    #[must_use]
    pub const fn get(&self, factor: SafetyFactor) -> f64 {
        match factor {
            SafetyFactor::Visibility => self.visibility,
            SafetyFactor::Lighting => self.lighting,
            SafetyFactor::TrafficRisk => self.traffic_risk,
            SafetyFactor::PedestrianSafety => self.pedestrian_safety,
            SafetyFactor::SidewalkQuality => self.sidewalk_quality,
            SafetyFactor::ConstructionRisk => self.construction_risk,
            SafetyFactor::UturnRequired => self.uturn_required,
        }
    }

    /// Sum over every factor.
    #[must_use]
    pub fn sum(&self) -> f64 {
        SafetyFactor::ALL.iter().map(|f| self.get(*f)).sum()
    }
}

/// A partial [`FactorTable`] as written in configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FactorOverrides {
    visibility: Option<f64>,
    lighting: Option<f64>,
    traffic_risk: Option<f64>,
    pedestrian_safety: Option<f64>,
    sidewalk_quality: Option<f64>,
    construction_risk: Option<f64>,
    uturn_required: Option<f64>,
}

impl FactorOverrides {
    fn over(self, base: FactorTable) -> FactorTable {
        FactorTable {
            visibility: self.visibility.unwrap_or(base.visibility),
            lighting: self.lighting.unwrap_or(base.lighting),
            traffic_risk: self.traffic_risk.unwrap_or(base.traffic_risk),
            pedestrian_safety: self.pedestrian_safety.unwrap_or(base.pedestrian_safety),
            sidewalk_quality: self.sidewalk_quality.unwrap_or(base.sidewalk_quality),
            construction_risk: self.construction_risk.unwrap_or(base.construction_risk),
            uturn_required: self.uturn_required.unwrap_or(base.uturn_required),
        }
    }
}

/// Reads a weights table, taking omitted factors from the canonical weights.
///
/// # Errors
///
/// Returns the deserializer's error for non-numeric values or unknown keys.
pub fn deserialize_weights<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<FactorTable, D::Error> {
    Ok(FactorOverrides::deserialize(deserializer)?.over(SafetyProfile::default().weights))
}

/// Reads a defaults table, taking omitted factors from the canonical
/// defaults.
///
/// # Errors
///
/// Returns the deserializer's error for non-numeric values or unknown keys.
pub fn deserialize_defaults<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<FactorTable, D::Error> {
    Ok(FactorOverrides::deserialize(deserializer)?.over(SafetyProfile::default().defaults))
}

/// Lower bounds of the upper two tiers. Each bound is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub safe: f64,
    pub acceptable: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            safe: 0.7,
            acceptable: 0.5,
        }
    }
}

/// Weights, fallback defaults and tier thresholds used to score stops.
///
/// [`SafetyProfile::default`] is the one canonical configuration; every
/// field may be overridden from the `[safety]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyProfile {
    #[serde(deserialize_with = "deserialize_weights")]
    pub weights: FactorTable,
    #[serde(deserialize_with = "deserialize_defaults")]
    pub defaults: FactorTable,
    pub thresholds: Thresholds,
}

impl Default for SafetyProfile {
    fn default() -> Self {
        Self {
            weights: FactorTable {
                visibility: 0.25,
                lighting: 0.15,
                traffic_risk: 0.25,
                pedestrian_safety: 0.20,
                sidewalk_quality: 0.10,
                construction_risk: 0.05,
                uturn_required: 0.05,
            },
            defaults: FactorTable {
                visibility: 0.6,
                lighting: 0.5,
                traffic_risk: 0.5,
                pedestrian_safety: 0.5,
                sidewalk_quality: 0.5,
                construction_risk: 0.2,
                uturn_required: 0.0,
            },
            thresholds: Thresholds::default(),
        }
    }
}

impl SafetyProfile {
    /// Checks that the profile produces scores in `[0, 1]` and an ordered
    /// tier scale.
    ///
    /// # Errors
    ///
    /// Returns [`SafetyError::InvalidProfile`] if a weight or default is
    /// outside `[0, 1]`, every weight is zero, the U-turn default is not
    /// 0 or 1, or the `acceptable` threshold is above the `safe` one.
    pub fn validate(&self) -> Result<(), SafetyError> {
        for factor in SafetyFactor::ALL {
            let weight = self.weights.get(factor);
            if !(0.0..=1.0).contains(&weight) {
                return Err(SafetyError::InvalidProfile {
                    message: format!("weight for {factor} is {weight}, expected [0, 1]"),
                });
            }
            let default = self.defaults.get(factor);
            if !(0.0..=1.0).contains(&default) {
                return Err(SafetyError::InvalidProfile {
                    message: format!("default for {factor} is {default}, expected [0, 1]"),
                });
            }
        }

        if self.weights.sum() <= 0.0 {
            return Err(SafetyError::InvalidProfile {
                message: "at least one weight must be positive".to_string(),
            });
        }

        // Autofill stores the U-turn default as a flag.
        let uturn = self.defaults.uturn_required;
        if uturn.abs() > f64::EPSILON && (uturn - 1.0).abs() > f64::EPSILON {
            return Err(SafetyError::InvalidProfile {
                message: format!("default for uturn_required is {uturn}, expected 0 or 1"),
            });
        }

        let Thresholds { safe, acceptable } = self.thresholds;
        if !(acceptable.is_finite() && safe.is_finite() && acceptable <= safe) {
            return Err(SafetyError::InvalidProfile {
                message: format!("acceptable threshold {acceptable} must not exceed safe threshold {safe}"),
            });
        }

        Ok(())
    }

    /// The weight of `factor` relative to the weight total.
    #[must_use]
    pub fn effective_weight(&self, factor: SafetyFactor) -> f64 {
        self.weights.get(factor) / self.weights.sum()
    }

    /// The tier a score falls in.
    #[must_use]
    pub fn rating_for(&self, score: f64) -> SafetyRating {
        if score >= self.thresholds.safe {
            SafetyRating::Safe
        } else if score >= self.thresholds.acceptable {
            SafetyRating::Acceptable
        } else {
            SafetyRating::Unsafe
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_is_valid() {
        SafetyProfile::default().validate().unwrap();
    }

    #[test]
    fn effective_weights_sum_to_one() {
        let profile = SafetyProfile::default();
        assert!((profile.weights.sum() - 1.05).abs() < 1e-12);
        let sum: f64 = SafetyFactor::ALL
            .iter()
            .map(|f| profile.effective_weight(*f))
            .sum();
        assert!((sum - 1.0).abs() < 1e-12, "effective weights sum to {sum}");
    }

    #[test]
    fn rejects_out_of_range_or_all_zero_weights() {
        let mut profile = SafetyProfile::default();
        profile.weights.lighting = 1.3;
        assert!(matches!(
            profile.validate(),
            Err(SafetyError::InvalidProfile { .. })
        ));

        let zero = FactorTable {
            visibility: 0.0,
            lighting: 0.0,
            traffic_risk: 0.0,
            pedestrian_safety: 0.0,
            sidewalk_quality: 0.0,
            construction_risk: 0.0,
            uturn_required: 0.0,
        };
        profile.weights = zero;
        assert!(profile.validate().is_err());
    }

    #[test]
    fn uturn_default_must_be_a_flag() {
        let mut profile = SafetyProfile::default();
        profile.defaults.uturn_required = 0.3;
        assert!(profile.validate().is_err());

        profile.defaults.uturn_required = 1.0;
        profile.validate().unwrap();
    }

    #[test]
    fn rejects_out_of_range_default() {
        let mut profile = SafetyProfile::default();
        profile.defaults.visibility = 1.2;
        assert!(profile.validate().is_err());
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let mut profile = SafetyProfile::default();
        profile.thresholds.acceptable = 0.8;
        assert!(profile.validate().is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let profile: SafetyProfile = toml::from_str(
            r"
            [thresholds]
            safe = 0.75
            acceptable = 0.55
            ",
        )
        .unwrap();
        assert!((profile.thresholds.safe - 0.75).abs() < f64::EPSILON);
        assert_eq!(profile.weights, SafetyProfile::default().weights);
    }

    #[test]
    fn partial_tables_keep_other_factors() {
        let profile: SafetyProfile = toml::from_str(
            r"
            [weights]
            visibility = 0.4

            [defaults]
            lighting = 0.3

            [thresholds]
            safe = 0.8
            ",
        )
        .unwrap();
        let canonical = SafetyProfile::default();

        assert!((profile.weights.visibility - 0.4).abs() < f64::EPSILON);
        assert_eq!(profile.weights.lighting, canonical.weights.lighting);
        assert!((profile.defaults.lighting - 0.3).abs() < f64::EPSILON);
        assert_eq!(profile.defaults.visibility, canonical.defaults.visibility);
        assert!((profile.thresholds.acceptable - 0.5).abs() < f64::EPSILON);
        profile.validate().unwrap();
    }

    #[test]
    fn unknown_factor_is_rejected() {
        assert!(toml::from_str::<SafetyProfile>("[weights]\nvisibilty = 0.4").is_err());
    }
}
