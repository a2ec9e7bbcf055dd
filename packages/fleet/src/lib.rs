#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Least-cost fleet mix search.
//!
//! The search space is every `(buses, vans)` pair within [`FleetBounds`],
//! which is small enough to enumerate exhaustively. Among feasible pairs
//! (capacity covers every stop) the cheapest wins; ties go to the pair
//! seen first in ascending `(buses, vans)` order.

use fleetlab_fleet_models::{CostModel, FleetBounds, FleetMix, FleetReport, VehicleCapacities};
use thiserror::Error;

/// Errors from the fleet search.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum FleetError {
    /// Even the largest fleet within the bounds cannot carry every stop.
    #[error("No fleet within bounds covers {required} stops (largest fleet carries {max_capacity})")]
    NoFeasibleFleet {
        /// Stops that need covering.
        required: u64,
        /// Capacity of the largest fleet within the bounds.
        max_capacity: u64,
    },
}

/// Finds the cheapest fleet whose capacity covers `stop_count`.
///
/// # Errors
///
/// Returns [`FleetError::NoFeasibleFleet`] if no pair within `bounds`
/// reaches `stop_count`.
pub fn optimize(
    stop_count: u64,
    bounds: &FleetBounds,
    capacities: &VehicleCapacities,
    cost: &CostModel,
) -> Result<FleetMix, FleetError> {
    let mut best: Option<FleetMix> = None;

    for buses in 0..=bounds.max_buses {
        for vans in 0..=bounds.max_vans {
            let candidate = FleetMix::price(buses, vans, capacities, cost);
            if candidate.capacity < stop_count {
                continue;
            }
            if best.is_none_or(|b| candidate.total_cost < b.total_cost) {
                best = Some(candidate);
            }
        }
    }

    let mix = best.ok_or_else(|| FleetError::NoFeasibleFleet {
        required: stop_count,
        max_capacity: bounds.max_capacity(capacities),
    })?;

    log::debug!(
        "Cheapest fleet for {stop_count} stops: {mix} at ${:.2}",
        mix.total_cost
    );
    Ok(mix)
}

/// Runs [`optimize`] and folds an infeasible result into the report
/// instead of an error.
#[must_use]
pub fn report(
    stop_count: u64,
    bounds: &FleetBounds,
    capacities: &VehicleCapacities,
    cost: &CostModel,
) -> FleetReport {
    match optimize(stop_count, bounds, capacities, cost) {
        Ok(mix) => FleetReport::Assigned { mix },
        Err(FleetError::NoFeasibleFleet {
            required,
            max_capacity,
        }) => {
            log::warn!(
                "No feasible fleet: {required} stops exceed the maximum capacity of {max_capacity}"
            );
            FleetReport::Infeasible {
                required,
                max_capacity,
            }
        }
    }
}
