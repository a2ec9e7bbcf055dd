#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `fleetlab`: simulate school bus stops and size the fleet that serves
//! them.
//!
//! Every subcommand reads the same configuration (`--config`, then
//! `FLEETLAB_CONFIG`, then built-in defaults). Without a subcommand an
//! interactive menu is shown.

mod interactive;
mod output;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use fleetlab_cli_utils::{IndicatifProgress, MultiProgress};
use fleetlab_projection::GeoPoint;
use fleetlab_simulator::{FleetlabConfig, ProgressCallback, Simulator};
use fleetlab_spatial::{DistrictIndex, GeojsonBoundarySource};
use fleetlab_stop_models::{SafetyAttributes, Stop, StopInput};

#[derive(Parser)]
#[command(name = "fleetlab", about = "School bus stop simulator and fleet sizer")]
struct Cli {
    /// Configuration file (overrides `FLEETLAB_CONFIG`)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate stops around a school, score them and size the fleet
    Simulate {
        /// School name or address
        #[arg(long)]
        school: String,
        /// Number of stops to place
        #[arg(long)]
        stops: Option<usize>,
        /// Walk-zone radius around the school in metres
        #[arg(long)]
        buffer: Option<f64>,
        /// Random seed for a reproducible draw
        #[arg(long)]
        seed: Option<u64>,
        /// Print the proposal as JSON
        #[arg(long)]
        json: bool,
    },
    /// Score an uploaded stop list (JSON array of stops) and size the fleet
    Evaluate {
        /// Path to the stop list
        file: PathBuf,
        /// Print the proposal as JSON
        #[arg(long)]
        json: bool,
    },
    /// Find the school district containing a point
    District {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
    },
    /// Find the cheapest bus/van mix for a number of stops
    Fleet {
        /// One student per stop
        #[arg(long)]
        stops: u64,
        #[arg(long)]
        max_buses: Option<u32>,
        #[arg(long)]
        max_vans: Option<u32>,
        /// Leave driver wages out of the cost
        #[arg(long)]
        no_driver_cost: bool,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Score a single stop from its safety attributes (absent ones use defaults)
    Score {
        #[arg(long)]
        visibility: Option<f64>,
        #[arg(long)]
        lighting: Option<f64>,
        #[arg(long)]
        traffic_risk: Option<f64>,
        #[arg(long)]
        pedestrian_safety: Option<f64>,
        #[arg(long)]
        sidewalk_quality: Option<f64>,
        #[arg(long)]
        construction_risk: Option<f64>,
        #[arg(long)]
        uturn: Option<bool>,
        /// Print the scored stop as JSON
        #[arg(long)]
        json: bool,
    },
    /// Project a WGS84 point into a metric frame and back
    Project {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        /// Metric EPSG code (defaults to the configured or local UTM zone)
        #[arg(long)]
        epsg: Option<u32>,
    },
}

#[allow(clippy::too_many_lines)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = fleetlab_cli_utils::init_logger();
    let cli = Cli::parse();
    let mut config = FleetlabConfig::load(cli.config.as_deref())?;

    let Some(command) = cli.command else {
        return interactive::run(config, &multi).await;
    };

    match command {
        Commands::Simulate {
            school,
            stops,
            buffer,
            seed,
            json,
        } => {
            if let Some(stops) = stops {
                config.sampling.stop_count = stops;
            }
            if let Some(buffer) = buffer {
                config.sampling.walk_buffer_meters = buffer;
            }
            if seed.is_some() {
                config.sampling.seed = seed;
            }
            config.validate()?;

            let simulator = build_simulator(config, &multi)?;
            let proposal = simulator.simulate(&school).await?;
            if json {
                output::print_json(&proposal)?;
            } else {
                output::print_proposal(&proposal);
            }
        }
        Commands::Evaluate { file, json } => {
            let inputs = read_stop_inputs(&file)?;
            log::info!("Read {} stops from {}", inputs.len(), file.display());

            let simulator = build_simulator(config, &multi)?;
            let proposal = simulator.evaluate_stops(&inputs).await?;
            if json {
                output::print_json(&proposal)?;
            } else {
                output::print_proposal(&proposal);
            }
        }
        Commands::District { lat, lon } => {
            let source = GeojsonBoundarySource::new(
                config.boundaries.path.clone(),
                config.boundaries.fields(),
            );
            let index = DistrictIndex::load(&source)?;
            let district = index.resolve(GeoPoint::new(lon, lat))?;
            println!("{} ({})", district.name(), district.code());
        }
        Commands::Fleet {
            stops,
            max_buses,
            max_vans,
            no_driver_cost,
            json,
        } => {
            if let Some(max_buses) = max_buses {
                config.fleet.max_buses = max_buses;
            }
            if let Some(max_vans) = max_vans {
                config.fleet.max_vans = max_vans;
            }
            if no_driver_cost {
                config.cost.include_driver_cost = false;
            }
            config.validate()?;

            let report = fleetlab_fleet::report(
                stops,
                &config.fleet.bounds(),
                &config.fleet.capacities(),
                &config.cost,
            );
            if json {
                output::print_json(&report)?;
            } else {
                output::print_fleet(&report);
            }
        }
        Commands::Score {
            visibility,
            lighting,
            traffic_risk,
            pedestrian_safety,
            sidewalk_quality,
            construction_risk,
            uturn,
            json,
        } => {
            let attributes = SafetyAttributes {
                visibility,
                lighting,
                traffic_risk,
                pedestrian_safety,
                sidewalk_quality,
                construction_risk,
                uturn_required: uturn,
            };
            let stop = Stop::new(GeoPoint::new(0.0, 0.0)).with_attributes(attributes);
            let scored = fleetlab_safety::score_stop(&stop, &config.safety.profile())?;
            if json {
                output::print_json(&scored)?;
            } else {
                output::print_score(&scored);
            }
        }
        Commands::Project { lat, lon, epsg } => {
            let point = GeoPoint::new(lon, lat);
            if let Some(epsg) = epsg {
                config.projection.metric_epsg = Some(epsg);
            }
            let projector = config.projection.projector_for(point)?;

            let metric = fleetlab_projection::to_metric(
                point,
                projector.geographic(),
                projector.metric(),
            )?;
            let back = fleetlab_projection::to_geographic(
                metric,
                projector.metric(),
                projector.geographic(),
            )?;
            println!("{} -> {}", projector.geographic(), projector.metric());
            println!("x = {:.3}, y = {:.3}", metric.x, metric.y);
            println!("round trip: {back}");
        }
    }

    Ok(())
}

/// Shared HTTP client for geocoding, directions and Overpass.
fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(concat!("fleetlab/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(300))
        .build()
}

/// Builds a [`Simulator`] from `config` with a progress bar on `multi`.
fn build_simulator(
    config: FleetlabConfig,
    multi: &MultiProgress,
) -> Result<Simulator, Box<dyn std::error::Error>> {
    let client = http_client()?;
    let progress: Arc<dyn ProgressCallback> = IndicatifProgress::stops_bar(multi, "Preparing");
    Ok(Simulator::from_config(config, &client)?.with_progress(progress))
}

/// Reads a JSON array of uploaded stops.
fn read_stop_inputs(path: &Path) -> Result<Vec<StopInput>, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

