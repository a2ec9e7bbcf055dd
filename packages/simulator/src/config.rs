//! Simulation configuration.
//!
//! Defaults are embedded from `config/default.toml` at compile time. A user
//! file replaces them wholesale; any section or key it omits falls back to
//! the same defaults.

use std::path::{Path, PathBuf};

use fleetlab_fleet_models::{CostModel, FleetBounds, VehicleCapacities};
use fleetlab_projection::{Frame, GeoPoint, ProjectionError, Projector, UtmZone};
use fleetlab_safety::{
    FactorTable, SafetyProfile, Thresholds, deserialize_defaults, deserialize_weights,
};
use fleetlab_sampler::SampleParams;
use fleetlab_spatial::BoundaryFields;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "FLEETLAB_CONFIG";

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range or inconsistent.
    #[error("Invalid config: {message}")]
    Invalid {
        /// What is wrong.
        message: String,
    },
}

/// `[projection]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub geographic_epsg: u32,
    /// Metric frame; when absent the UTM zone of the school is used.
    pub metric_epsg: Option<u32>,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            geographic_epsg: 4326,
            metric_epsg: None,
        }
    }
}

impl ProjectionConfig {
    /// The projector to use around `anchor`.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`] if a configured code is unsupported or of
    /// the wrong kind, or `anchor` is not a valid location.
    pub fn projector_for(&self, anchor: GeoPoint) -> Result<Projector, ProjectionError> {
        let geographic = Frame::from_epsg(self.geographic_epsg)?;
        let metric = match self.metric_epsg {
            Some(code) => Frame::from_epsg(code)?,
            None => Frame::Utm(UtmZone::for_point(anchor)?),
        };
        Projector::new(geographic, metric)
    }
}

/// `[sampling]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub stop_count: usize,
    pub walk_buffer_meters: f64,
    /// Seed for the stop draw; random when absent.
    pub seed: Option<u64>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        let params = SampleParams::default();
        Self {
            stop_count: params.stop_count,
            walk_buffer_meters: params.walk_buffer_meters,
            seed: None,
        }
    }
}

impl SamplingConfig {
    #[must_use]
    pub const fn params(&self) -> SampleParams {
        SampleParams {
            stop_count: self.stop_count,
            walk_buffer_meters: self.walk_buffer_meters,
        }
    }
}

/// `[boundaries]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundariesConfig {
    /// District boundary `GeoJSON` file.
    pub path: PathBuf,
    pub name_field: String,
    pub code_field: String,
    pub code_width: usize,
    pub priority_field: Option<String>,
}

impl Default for BoundariesConfig {
    fn default() -> Self {
        let fields = BoundaryFields::default();
        Self {
            path: PathBuf::from("data/School_District.geojson"),
            name_field: fields.name,
            code_field: fields.code,
            code_width: fields.code_width,
            priority_field: fields.priority,
        }
    }
}

impl BoundariesConfig {
    #[must_use]
    pub fn fields(&self) -> BoundaryFields {
        BoundaryFields {
            name: self.name_field.clone(),
            code: self.code_field.clone(),
            priority: self.priority_field.clone(),
            code_width: self.code_width,
        }
    }
}

/// Where building footprints come from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BuildingProviderKind {
    /// `OpenStreetMap` via the Overpass API.
    Overpass,
    /// A local `GeoJSON` file.
    Geojson,
}

/// `[buildings]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildingsConfig {
    pub provider: BuildingProviderKind,
    pub overpass_url: String,
    /// Footprint file for the `geojson` provider.
    pub path: Option<PathBuf>,
}

impl Default for BuildingsConfig {
    fn default() -> Self {
        Self {
            provider: BuildingProviderKind::Overpass,
            overpass_url: fleetlab_buildings::overpass::DEFAULT_OVERPASS_URL.to_string(),
            path: None,
        }
    }
}

/// `[safety.directions]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionsConfig {
    /// Look up U-turns from driving directions.
    pub enabled: bool,
    /// Route origin. The school address is used when absent.
    pub origin: Option<String>,
}

/// `[safety]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    #[serde(deserialize_with = "deserialize_weights")]
    pub weights: FactorTable,
    #[serde(deserialize_with = "deserialize_defaults")]
    pub defaults: FactorTable,
    pub thresholds: Thresholds,
    pub directions: DirectionsConfig,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        let profile = SafetyProfile::default();
        Self {
            weights: profile.weights,
            defaults: profile.defaults,
            thresholds: profile.thresholds,
            directions: DirectionsConfig::default(),
        }
    }
}

impl SafetyConfig {
    #[must_use]
    pub const fn profile(&self) -> SafetyProfile {
        SafetyProfile {
            weights: self.weights,
            defaults: self.defaults,
            thresholds: self.thresholds,
        }
    }
}

/// `[fleet]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    pub max_buses: u32,
    pub max_vans: u32,
    pub bus_capacity: u32,
    pub van_capacity: u32,
}

impl Default for FleetConfig {
    fn default() -> Self {
        let bounds = FleetBounds::default();
        let capacities = VehicleCapacities::default();
        Self {
            max_buses: bounds.max_buses,
            max_vans: bounds.max_vans,
            bus_capacity: capacities.bus,
            van_capacity: capacities.van,
        }
    }
}

impl FleetConfig {
    #[must_use]
    pub const fn bounds(&self) -> FleetBounds {
        FleetBounds {
            max_buses: self.max_buses,
            max_vans: self.max_vans,
        }
    }

    #[must_use]
    pub const fn capacities(&self) -> VehicleCapacities {
        VehicleCapacities {
            bus: self.bus_capacity,
            van: self.van_capacity,
        }
    }
}

/// Complete simulation configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetlabConfig {
    pub projection: ProjectionConfig,
    pub sampling: SamplingConfig,
    pub boundaries: BoundariesConfig,
    pub buildings: BuildingsConfig,
    pub safety: SafetyConfig,
    pub fleet: FleetConfig,
    pub cost: CostModel,
}

impl FleetlabConfig {
    /// The embedded default configuration.
    ///
    /// # Panics
    ///
    /// Panics if the embedded `config/default.toml` is malformed (this is
    /// a compile-time guarantee since the file is embedded).
    #[must_use]
    pub fn embedded() -> Self {
        Self::parse(DEFAULT_CONFIG)
            .unwrap_or_else(|e| panic!("Embedded default config is invalid: {e}"))
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`FleetlabConfig::parse`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loading config from {}", path.display());
        Self::parse(&text)
    }

    /// Loads `path` if given, else the file named by `FLEETLAB_CONFIG`,
    /// else the embedded defaults.
    ///
    /// # Errors
    ///
    /// As [`FleetlabConfig::from_file`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => Self::from_file(Path::new(&path)),
            _ => Ok(Self::embedded()),
        }
    }

    /// Checks cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::Invalid { message };

        let geographic = Frame::from_epsg(self.projection.geographic_epsg)
            .map_err(|e| invalid(format!("projection.geographic_epsg: {e}")))?;
        if !geographic.is_geographic() {
            return Err(invalid(format!(
                "projection.geographic_epsg: {geographic} is not a geographic frame"
            )));
        }
        if let Some(code) = self.projection.metric_epsg {
            let metric =
                Frame::from_epsg(code).map_err(|e| invalid(format!("projection.metric_epsg: {e}")))?;
            if metric.is_geographic() {
                return Err(invalid(format!(
                    "projection.metric_epsg: {metric} is not a projected frame"
                )));
            }
        }

        self.sampling
            .params()
            .validate()
            .map_err(|e| invalid(format!("sampling: {e}")))?;

        if self.buildings.provider == BuildingProviderKind::Geojson && self.buildings.path.is_none()
        {
            return Err(invalid(
                "buildings.path is required for the geojson provider".to_string(),
            ));
        }

        self.safety
            .profile()
            .validate()
            .map_err(|e| invalid(format!("safety: {e}")))?;

        for (name, bound) in [
            ("max_buses", self.fleet.max_buses),
            ("max_vans", self.fleet.max_vans),
        ] {
            if bound > FleetBounds::MAX_PER_TYPE {
                return Err(invalid(format!(
                    "fleet.{name} is {bound}, at most {} is supported",
                    FleetBounds::MAX_PER_TYPE
                )));
            }
        }

        if self.fleet.bus_capacity == 0 && self.fleet.van_capacity == 0 {
            return Err(invalid(
                "fleet: at least one vehicle type needs a non-zero capacity".to_string(),
            ));
        }

        let cost = &self.cost;
        for (name, value) in [
            ("bus_daily_cost", cost.bus_daily_cost),
            ("van_daily_cost", cost.van_daily_cost),
            ("driver_hourly_rate", cost.driver_hourly_rate),
            ("hours_per_trip", cost.hours_per_trip),
            ("miles_per_trip", cost.miles_per_trip),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("cost.{name} must be non-negative, got {value}")));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_config_matches_code_defaults() {
        assert_eq!(FleetlabConfig::embedded(), FleetlabConfig::default());
    }

    #[test]
    fn embedded_file_passes_validation() {
        FleetlabConfig::parse(DEFAULT_CONFIG).unwrap();
        FleetlabConfig::embedded().validate().unwrap();
    }

    #[test]
    fn partial_safety_tables_keep_other_factors() {
        let config = FleetlabConfig::parse(
            r"
            [safety.weights]
            visibility = 0.4

            [safety.defaults]
            construction_risk = 0.1

            [safety.thresholds]
            acceptable = 0.45
            ",
        )
        .unwrap();
        let canonical = SafetyProfile::default();
        let profile = config.safety.profile();
        assert!((profile.weights.visibility - 0.4).abs() < f64::EPSILON);
        assert_eq!(profile.weights.traffic_risk, canonical.weights.traffic_risk);
        assert!((profile.defaults.construction_risk - 0.1).abs() < f64::EPSILON);
        assert_eq!(profile.defaults.visibility, canonical.defaults.visibility);
        assert!((profile.thresholds.safe - 0.7).abs() < f64::EPSILON);
        assert!((profile.thresholds.acceptable - 0.45).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(
            FleetlabConfig::parse("").unwrap(),
            FleetlabConfig::default()
        );
    }

    #[test]
    fn partial_overrides_keep_other_defaults() {
        let config = FleetlabConfig::parse(
            r#"
            [projection]
            metric_epsg = 26917

            [sampling]
            stop_count = 10
            seed = 7

            [cost]
            include_driver_cost = false

            [boundaries]
            code_field = "DistrictCode"
            "#,
        )
        .unwrap();
        assert_eq!(config.projection.metric_epsg, Some(26917));
        assert_eq!(config.sampling.params().stop_count, 10);
        assert!((config.sampling.walk_buffer_meters - 400.0).abs() < f64::EPSILON);
        assert_eq!(config.sampling.seed, Some(7));
        assert!(!config.cost.include_driver_cost);
        assert!((config.cost.bus_daily_cost - 200.0).abs() < f64::EPSILON);
        assert_eq!(config.boundaries.fields().code, "DistrictCode");
        assert_eq!(config.boundaries.fields().name, "Name");
        assert_eq!(config.fleet.bounds(), FleetBounds::default());
    }

    #[test]
    fn rejects_bad_values() {
        for text in [
            "[projection]\ngeographic_epsg = 26917",
            "[projection]\nmetric_epsg = 4326",
            "[projection]\nmetric_epsg = 3857",
            "[sampling]\nstop_count = 0",
            "[sampling]\nwalk_buffer_meters = -5.0",
            "[buildings]\nprovider = \"geojson\"",
            "[safety.weights]\nvisibility = 1.5",
            "[safety.defaults]\nuturn_required = 0.3",
            "[safety.thresholds]\nsafe = 0.4\nacceptable = 0.5",
            "[cost]\nbus_daily_cost = -1.0",
            "[fleet]\nbus_capacity = 0\nvan_capacity = 0",
            "[fleet]\nmax_buses = 4294967295",
            "[fleet]\nmax_vans = 1001",
        ] {
            assert!(
                matches!(FleetlabConfig::parse(text), Err(ConfigError::Invalid { .. })),
                "accepted: {text}"
            );
        }
    }

    #[test]
    fn rejects_unknown_provider() {
        assert!(matches!(
            FleetlabConfig::parse("[buildings]\nprovider = \"bing\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn auto_zone_follows_the_school() {
        let config = ProjectionConfig::default();
        let projector = config.projector_for(GeoPoint::new(-83.5, 42.4)).unwrap();
        assert_eq!(projector.metric().epsg(), 32617);

        let fixed = ProjectionConfig {
            geographic_epsg: 4269,
            metric_epsg: Some(26917),
        };
        let projector = fixed.projector_for(GeoPoint::new(-120.0, 42.4)).unwrap();
        assert_eq!(projector.metric().epsg(), 26917);
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            FleetlabConfig::from_file(Path::new("/nonexistent/fleetlab.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
