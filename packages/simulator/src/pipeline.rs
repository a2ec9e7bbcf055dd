//! The [`Simulator`]: one school (or one uploaded stop list) in, one
//! [`Proposal`] out.

use std::sync::Arc;

use fleetlab_buildings::{BuildingFeatureProvider, GeojsonBuildingSource, OverpassProvider};
use fleetlab_geocoder::{DirectionsProvider, Geocoder, Waypoint};
use fleetlab_projection::GeoPoint;
use fleetlab_safety::{SafetySummary, autofill_with_directions, score_stops};
use fleetlab_sampler::SampleParams;
use fleetlab_spatial::{DistrictIndex, GeojsonBoundarySource};
use fleetlab_stop_models::{Stop, StopInput};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::{BuildingProviderKind, ConfigError, FleetlabConfig};
use crate::progress::{ProgressCallback, null_progress};
use crate::{Anomaly, Proposal, ProposalSummary, SamplingStats, SchoolLocation, SimulationError};

/// Runs simulation requests against a fixed set of providers.
///
/// District boundaries are indexed once at construction and shared by
/// every request.
pub struct Simulator {
    config: FleetlabConfig,
    geocoder: Arc<dyn Geocoder>,
    districts: Arc<DistrictIndex>,
    buildings: Arc<dyn BuildingFeatureProvider>,
    directions: Option<Arc<dyn DirectionsProvider>>,
    progress: Arc<dyn ProgressCallback>,
}

impl Simulator {
    /// Creates a simulator from explicit providers. U-turn lookups are off
    /// until [`Simulator::with_directions`] is called.
    #[must_use]
    pub fn new(
        config: FleetlabConfig,
        geocoder: Arc<dyn Geocoder>,
        districts: Arc<DistrictIndex>,
        buildings: Arc<dyn BuildingFeatureProvider>,
    ) -> Self {
        Self {
            config,
            geocoder,
            districts,
            buildings,
            directions: None,
            progress: null_progress(),
        }
    }

    /// Builds every provider `config` asks for.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Geocode`] if no geocoding service is
    /// usable and [`SimulationError::Spatial`] if the boundary file cannot
    /// be loaded.
    pub fn from_config(
        config: FleetlabConfig,
        client: &reqwest::Client,
    ) -> Result<Self, SimulationError> {
        let geocoder = fleetlab_geocoder::geocoder_from_registry(client)?;

        let source = GeojsonBoundarySource::new(
            config.boundaries.path.clone(),
            config.boundaries.fields(),
        );
        let districts = DistrictIndex::load(&source)?;

        let buildings: Arc<dyn BuildingFeatureProvider> = match config.buildings.provider {
            BuildingProviderKind::Overpass => Arc::new(OverpassProvider::new(
                client.clone(),
                config.buildings.overpass_url.clone(),
            )),
            BuildingProviderKind::Geojson => {
                let path = config.buildings.path.clone().ok_or_else(|| ConfigError::Invalid {
                    message: "buildings.path is required for the geojson provider".to_string(),
                })?;
                Arc::new(GeojsonBuildingSource::new(path))
            }
        };

        let directions = if config.safety.directions.enabled {
            let directions = fleetlab_geocoder::directions_from_registry(client);
            if directions.is_none() {
                log::warn!("U-turn lookup is enabled but no directions service is configured");
            }
            directions
        } else {
            None
        };

        let mut simulator = Self::new(config, geocoder, Arc::new(districts), buildings);
        simulator.directions = directions;
        Ok(simulator)
    }

    /// Enables U-turn lookups through `directions`.
    #[must_use]
    pub fn with_directions(mut self, directions: Arc<dyn DirectionsProvider>) -> Self {
        self.directions = Some(directions);
        self
    }

    /// Reports per-stop progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &FleetlabConfig {
        &self.config
    }

    /// Simulates stops for `school` with the configured sampling
    /// parameters and seed.
    ///
    /// # Errors
    ///
    /// As [`Simulator::simulate_with`].
    pub async fn simulate(&self, school: &str) -> Result<Proposal, SimulationError> {
        let params = self.config.sampling.params();
        let mut rng = self
            .config
            .sampling
            .seed
            .map_or_else(ChaCha8Rng::from_entropy, ChaCha8Rng::seed_from_u64);
        self.simulate_with(school, &params, &mut rng).await
    }

    /// Simulates stops for `school`, drawing with `rng`.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError`] if the school cannot be geocoded, lies
    /// outside every district, no stops can be sampled, or a stop has an
    /// invalid attribute. An infeasible fleet is not an error; it is
    /// reported in the proposal.
    pub async fn simulate_with<R: Rng + ?Sized>(
        &self,
        school: &str,
        params: &SampleParams,
        rng: &mut R,
    ) -> Result<Proposal, SimulationError> {
        self.progress.set_message(format!("Simulating stops for {school}"));
        let geocoded = self.geocoder.geocode(school).await?;
        let position = geocoded.point();
        log::info!(
            "Geocoded '{school}' to {position} via {}",
            self.geocoder.name()
        );

        let district = self.districts.resolve(position)?;
        log::info!("School is in {} ({})", district.name(), district.code());

        let projector = self.config.projection.projector_for(position)?;
        log::debug!("Measuring distances in {}", projector.metric());

        let outcome = fleetlab_sampler::sample(
            &district,
            position,
            params,
            self.buildings.as_ref(),
            &projector,
            rng,
        )
        .await?;

        let mut anomalies = Vec::new();
        if outcome.underfilled {
            anomalies.push(Anomaly::Underfilled {
                requested: outcome.requested,
                returned: outcome.stops.len(),
            });
        }
        if outcome.discarded > 0 {
            anomalies.push(Anomaly::StopsDiscarded {
                count: outcome.discarded,
            });
        }

        let sampling = SamplingStats {
            requested: outcome.requested,
            population: outcome.population,
            returned: outcome.stops.len(),
            underfilled: outcome.underfilled,
            discarded: outcome.discarded,
        };

        let stops: Vec<Stop> = outcome
            .stops
            .into_iter()
            .enumerate()
            .map(|(i, position)| Stop::new(position).with_name(format!("Stop {}", i + 1)))
            .collect();
        log::info!("Placed {} stops", stops.len());

        let origin = self
            .config
            .safety
            .directions
            .origin
            .clone()
            .unwrap_or_else(|| school.to_string());
        let stops = self.assess(stops, Some(&origin)).await?;

        let mut proposal = self.propose(stops, anomalies);
        proposal.school = Some(SchoolLocation {
            query: school.to_string(),
            position,
            matched_address: geocoded.matched_address,
        });
        proposal.district = Some(district.summary());
        proposal.sampling = Some(sampling);
        Ok(proposal)
    }

    /// Scores an uploaded stop list and sizes a fleet for it.
    ///
    /// Rows with only an address are geocoded. Rows that cannot be placed
    /// are left out and recorded as anomalies.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Safety`] if a stop has an invalid
    /// attribute.
    pub async fn evaluate_stops(&self, inputs: &[StopInput]) -> Result<Proposal, SimulationError> {
        let mut anomalies = Vec::new();
        let mut stops = Vec::with_capacity(inputs.len());

        let to_geocode = inputs
            .iter()
            .filter(|i| i.coordinates().is_none() && i.address.is_some())
            .count();
        if to_geocode > 0 {
            self.progress.set_total(to_geocode as u64);
            self.progress.set_message("Geocoding stops".to_string());
        }

        for (row, input) in inputs.iter().enumerate() {
            match self.locate(row, input).await {
                Ok(position) => {
                    let mut stop = Stop::new(position).with_attributes(input.attributes);
                    stop.name.clone_from(&input.name);
                    stop.address.clone_from(&input.address);
                    stops.push(stop);
                }
                Err(anomaly) => {
                    log::warn!("Skipping uploaded stop: {anomaly}");
                    anomalies.push(anomaly);
                }
            }
        }

        if to_geocode > 0 {
            self.progress.finish(format!("Geocoded {to_geocode} stops"));
        }
        log::info!(
            "Accepted {} of {} uploaded stops",
            stops.len(),
            inputs.len()
        );

        let origin = self.config.safety.directions.origin.clone();
        if self.directions.is_some() && origin.is_none() {
            log::info!("No route origin configured; skipping U-turn lookups for uploaded stops");
        }
        let stops = self.assess(stops, origin.as_deref()).await?;

        Ok(self.propose(stops, anomalies))
    }

    /// Position of one uploaded row, or the anomaly explaining why it has
    /// none.
    async fn locate(&self, row: usize, input: &StopInput) -> Result<GeoPoint, Anomaly> {
        if let Some(position) = input.coordinates() {
            return if position.is_valid() {
                Ok(position)
            } else {
                Err(Anomaly::InvalidCoordinates {
                    row,
                    lat: input.lat,
                    lon: input.lon,
                })
            };
        }

        let Some(address) = &input.address else {
            return Err(if input.lat.is_some() || input.lon.is_some() {
                Anomaly::InvalidCoordinates {
                    row,
                    lat: input.lat,
                    lon: input.lon,
                }
            } else {
                Anomaly::MissingLocation { row }
            });
        };

        let result = self.geocoder.geocode(address).await;
        self.progress.inc(1);
        result
            .map(|geocoded| geocoded.point())
            .map_err(|e| Anomaly::GeocodeFailed {
                row,
                address: address.clone(),
                message: e.to_string(),
            })
    }

    /// Looks up U-turns (when a directions provider and origin are
    /// available), then scores every stop.
    async fn assess(
        &self,
        stops: Vec<Stop>,
        origin: Option<&str>,
    ) -> Result<Vec<Stop>, SimulationError> {
        let profile = self.config.safety.profile();

        let stops = match (&self.directions, origin) {
            (Some(directions), Some(origin)) => {
                let origin = Waypoint::Address(origin.to_string());
                self.progress.set_total(stops.len() as u64);
                self.progress.set_message("Checking routes for U-turns".to_string());

                let mut enriched = Vec::with_capacity(stops.len());
                for stop in &stops {
                    enriched.push(
                        autofill_with_directions(stop, &profile, directions.as_ref(), &origin)
                            .await,
                    );
                    self.progress.inc(1);
                }

                let uturns = enriched
                    .iter()
                    .filter(|s| s.attributes.uturn_required == Some(true))
                    .count();
                self.progress
                    .finish(format!("{uturns} of {} stops need a U-turn", enriched.len()));
                enriched
            }
            _ => stops,
        };

        Ok(score_stops(&stops, &profile)?)
    }

    /// Sizes the fleet for `stops` and assembles the proposal.
    fn propose(&self, stops: Vec<Stop>, anomalies: Vec<Anomaly>) -> Proposal {
        let fleet = fleetlab_fleet::report(
            stops.len() as u64,
            &self.config.fleet.bounds(),
            &self.config.fleet.capacities(),
            &self.config.cost,
        );
        let safety = SafetySummary::from_stops(&stops);
        let summary = ProposalSummary::new(stops.len(), &fleet);
        log::info!("Fleet: {}", summary.fleet_mix);
        self.progress.finish(format!(
            "Proposal ready: {} stops, {}",
            stops.len(),
            summary.fleet_mix
        ));

        Proposal {
            school: None,
            district: None,
            sampling: None,
            stops,
            safety,
            fleet,
            summary,
            anomalies,
        }
    }
}
