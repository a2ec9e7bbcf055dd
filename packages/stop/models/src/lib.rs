#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Bus stop and stop safety types.
//!
//! A [`Stop`] is a candidate pickup location with the seven pedestrian
//! safety attributes used to score it. Stops come either from the
//! simulated sampler or from uploaded [`StopInput`] rows.

use fleetlab_projection::GeoPoint;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// One of the seven attributes that make up a stop's safety score.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SafetyFactor {
    /// How visible waiting students are to drivers.
    Visibility,
    /// Street lighting quality.
    Lighting,
    /// Vehicle traffic danger. Higher is worse.
    TrafficRisk,
    /// Pedestrian infrastructure (crosswalks, signals).
    PedestrianSafety,
    /// Sidewalk presence and condition.
    SidewalkQuality,
    /// Nearby construction. Higher is worse.
    ConstructionRisk,
    /// Whether the bus must make a U-turn to serve the stop. Higher is worse.
    UturnRequired,
}

impl SafetyFactor {
    /// Every factor, in scoring order.
    pub const ALL: [Self; 7] = [
        Self::Visibility,
        Self::Lighting,
        Self::TrafficRisk,
        Self::PedestrianSafety,
        Self::SidewalkQuality,
        Self::ConstructionRisk,
        Self::UturnRequired,
    ];

    /// Whether a higher value makes the stop less safe.
    #[must_use]
    pub const fn is_cost(self) -> bool {
        matches!(
            self,
            Self::TrafficRisk | Self::ConstructionRisk | Self::UturnRequired
        )
    }
}

/// Three-tier safety rating.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum SafetyRating {
    Safe,
    Acceptable,
    Unsafe,
}

/// Per-stop safety attributes. Absent values are filled from defaults
/// before scoring.
///
/// Continuous attributes are in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyAttributes {
    #[serde(default)]
    pub visibility: Option<f64>,
    #[serde(default)]
    pub lighting: Option<f64>,
    #[serde(default)]
    pub traffic_risk: Option<f64>,
    #[serde(default)]
    pub pedestrian_safety: Option<f64>,
    #[serde(default)]
    pub sidewalk_quality: Option<f64>,
    #[serde(default)]
    pub construction_risk: Option<f64>,
    #[serde(default)]
    pub uturn_required: Option<bool>,
}

impl SafetyAttributes {
    /// The value of `factor`, with the U-turn flag as `0.0`/`1.0`.
    #[must_use]
    pub fn get(&self, factor: SafetyFactor) -> Option<f64> {
        match factor {
            SafetyFactor::Visibility => self.visibility,
            SafetyFactor::Lighting => self.lighting,
            SafetyFactor::TrafficRisk => self.traffic_risk,
            SafetyFactor::PedestrianSafety => self.pedestrian_safety,
            SafetyFactor::SidewalkQuality => self.sidewalk_quality,
            SafetyFactor::ConstructionRisk => self.construction_risk,
            SafetyFactor::UturnRequired => self.uturn_required.map(|u| if u { 1.0 } else { 0.0 }),
        }
    }

    /// Sets `factor` to `value`. For the U-turn flag any value of `0.5` or
    /// more means a U-turn is required.
    pub fn set(&mut self, factor: SafetyFactor, value: f64) {
        match factor {
            SafetyFactor::Visibility => self.visibility = Some(value),
            SafetyFactor::Lighting => self.lighting = Some(value),
            SafetyFactor::TrafficRisk => self.traffic_risk = Some(value),
            SafetyFactor::PedestrianSafety => self.pedestrian_safety = Some(value),
            SafetyFactor::SidewalkQuality => self.sidewalk_quality = Some(value),
            SafetyFactor::ConstructionRisk => self.construction_risk = Some(value),
            SafetyFactor::UturnRequired => self.uturn_required = Some(value >= 0.5),
        }
    }

    /// Whether every attribute is present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        SafetyFactor::ALL.iter().all(|f| self.get(*f).is_some())
    }
}

/// A bus stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    /// Location in longitude/latitude.
    pub position: GeoPoint,
    /// Display name (e.g. "Stop 3").
    pub name: Option<String>,
    /// Source address, if the stop came from one.
    pub address: Option<String>,
    pub attributes: SafetyAttributes,
    /// Composite safety score, set once scored.
    pub score: Option<f64>,
    /// Tier for `score`, set once scored.
    pub rating: Option<SafetyRating>,
}

impl Stop {
    /// An unnamed, unscored stop with no attributes.
    #[must_use]
    pub fn new(position: GeoPoint) -> Self {
        Self {
            position,
            name: None,
            address: None,
            attributes: SafetyAttributes::default(),
            score: None,
            rating: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    #[must_use]
    pub const fn with_attributes(mut self, attributes: SafetyAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// The name if set, otherwise the coordinates.
    #[must_use]
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.position.to_string())
    }
}

/// One uploaded stop row, before geocoding or validation.
///
/// Either the coordinates or the address must be present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopInput {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub attributes: SafetyAttributes,
}

impl StopInput {
    /// The row's coordinates if both are present.
    #[must_use]
    pub const fn coordinates(&self) -> Option<GeoPoint> {
        match (self.lon, self.lat) {
            (Some(lon), Some(lat)) => Some(GeoPoint::new(lon, lat)),
            _ => None,
        }
    }
}
