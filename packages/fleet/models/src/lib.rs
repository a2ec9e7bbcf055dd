#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Fleet mix, vehicle capacity and cost model types.

use serde::{Deserialize, Serialize};

/// Students each vehicle type can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleCapacities {
    pub bus: u32,
    pub van: u32,
}

impl Default for VehicleCapacities {
    fn default() -> Self {
        Self { bus: 20, van: 7 }
    }
}

/// Inclusive upper bounds of the fleet search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetBounds {
    pub max_buses: u32,
    pub max_vans: u32,
}

impl Default for FleetBounds {
    fn default() -> Self {
        Self {
            max_buses: 2,
            max_vans: 5,
        }
    }
}

impl FleetBounds {
    /// Largest accepted bound for either vehicle type.
    pub const MAX_PER_TYPE: u32 = 1_000;

    /// Capacity of the largest fleet within the bounds.
    #[must_use]
    pub fn max_capacity(&self, capacities: &VehicleCapacities) -> u64 {
        u64::from(self.max_buses) * u64::from(capacities.bus)
            + u64::from(self.max_vans) * u64::from(capacities.van)
    }
}

/// Daily operating costs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModel {
    pub bus_daily_cost: f64,
    pub van_daily_cost: f64,
    pub driver_hourly_rate: f64,
    pub hours_per_trip: f64,
    pub miles_per_trip: f64,
    /// Whether driver wages are part of the total.
    pub include_driver_cost: bool,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            bus_daily_cost: 200.0,
            van_daily_cost: 120.0,
            driver_hourly_rate: 25.0,
            hours_per_trip: 1.0,
            miles_per_trip: 20.0,
            include_driver_cost: true,
        }
    }
}

impl CostModel {
    /// Vehicle cost of `buses` buses and `vans` vans.
    #[must_use]
    #[allow(clippy::suboptimal_flops)]
    pub fn vehicle_cost(&self, buses: u32, vans: u32) -> f64 {
        f64::from(buses) * self.bus_daily_cost + f64::from(vans) * self.van_daily_cost
    }

    /// Driver wages for `vehicles` vehicles, or zero when driver cost is
    /// excluded.
    #[must_use]
    pub fn driver_cost(&self, vehicles: u32) -> f64 {
        if self.include_driver_cost {
            f64::from(vehicles) * self.driver_hourly_rate * self.hours_per_trip
        } else {
            0.0
        }
    }
}

/// A priced bus/van assignment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetMix {
    pub buses: u32,
    pub vans: u32,
    /// Students the fleet can carry.
    pub capacity: u64,
    pub vehicle_cost: f64,
    pub driver_cost: f64,
    pub total_cost: f64,
    /// One driver per vehicle.
    pub drivers: u32,
    /// Daily miles across the fleet.
    pub total_miles: f64,
}

impl FleetMix {
    /// Prices `buses` buses and `vans` vans.
    #[must_use]
    pub fn price(
        buses: u32,
        vans: u32,
        capacities: &VehicleCapacities,
        cost: &CostModel,
    ) -> Self {
        let drivers = buses.saturating_add(vans);
        let vehicle_cost = cost.vehicle_cost(buses, vans);
        let driver_cost = cost.driver_cost(drivers);
        Self {
            buses,
            vans,
            capacity: u64::from(buses) * u64::from(capacities.bus)
                + u64::from(vans) * u64::from(capacities.van),
            vehicle_cost,
            driver_cost,
            total_cost: vehicle_cost + driver_cost,
            drivers,
            total_miles: f64::from(drivers) * cost.miles_per_trip,
        }
    }
}

impl std::fmt::Display for FleetMix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} Buses, {} Vans", self.buses, self.vans)
    }
}

/// Outcome of a fleet search, suitable for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum FleetReport {
    /// A feasible least-cost fleet was found.
    Assigned {
        #[serde(flatten)]
        mix: FleetMix,
    },
    /// No fleet within the bounds carries every stop.
    #[serde(rename_all = "camelCase")]
    Infeasible {
        required: u64,
        max_capacity: u64,
    },
}

impl FleetReport {
    /// The assigned fleet, if any.
    #[must_use]
    pub const fn mix(&self) -> Option<&FleetMix> {
        match self {
            Self::Assigned { mix } => Some(mix),
            Self::Infeasible { .. } => None,
        }
    }
}
