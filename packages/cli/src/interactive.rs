//! Menu-driven front end for running fleetlab without memorizing flags.

use std::path::PathBuf;

use dialoguer::{Confirm, Input, Select};
use fleetlab_cli_utils::MultiProgress;
use fleetlab_simulator::FleetlabConfig;

use crate::output;

/// Top-level actions in the interactive menu.
enum Action {
    Simulate,
    Evaluate,
    Fleet,
}

impl Action {
    const ALL: &[Self] = &[Self::Simulate, Self::Evaluate, Self::Fleet];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Simulate => "Simulate stops for a school",
            Self::Evaluate => "Score an uploaded stop list",
            Self::Fleet => "Size a fleet for a stop count",
        }
    }
}

/// Prompts for an action and its inputs, then runs it.
///
/// # Errors
///
/// Returns an error if a prompt fails or the selected operation fails.
pub async fn run(
    mut config: FleetlabConfig,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("FleetLab");
    println!();

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Action::ALL[idx] {
        Action::Simulate => {
            let school: String = Input::new()
                .with_prompt("School name or address")
                .interact_text()?;
            config.sampling.stop_count = Input::new()
                .with_prompt("Number of stops")
                .default(config.sampling.stop_count)
                .interact_text()?;
            config.validate()?;

            let simulator = crate::build_simulator(config, multi)?;
            let proposal = simulator.simulate(school.trim()).await?;
            output::print_proposal(&proposal);
            offer_json(&proposal)?;
        }
        Action::Evaluate => {
            let path: String = Input::new()
                .with_prompt("Path to stop list (JSON)")
                .interact_text()?;
            let inputs = crate::read_stop_inputs(&PathBuf::from(path.trim()))?;

            let simulator = crate::build_simulator(config, multi)?;
            let proposal = simulator.evaluate_stops(&inputs).await?;
            output::print_proposal(&proposal);
            offer_json(&proposal)?;
        }
        Action::Fleet => {
            let stops: u64 = Input::new()
                .with_prompt("Number of stops")
                .default(config.sampling.stop_count as u64)
                .interact_text()?;
            let report = fleetlab_fleet::report(
                stops,
                &config.fleet.bounds(),
                &config.fleet.capacities(),
                &config.cost,
            );
            output::print_fleet(&report);
        }
    }

    Ok(())
}

fn offer_json(proposal: &fleetlab_simulator::Proposal) -> Result<(), Box<dyn std::error::Error>> {
    let show = Confirm::new()
        .with_prompt("Print the full proposal as JSON?")
        .default(false)
        .interact()?;
    if show {
        output::print_json(proposal)?;
    }
    Ok(())
}
