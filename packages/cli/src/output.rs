//! Human-readable and JSON rendering of command results.

use fleetlab_fleet_models::FleetReport;
use fleetlab_simulator::Proposal;
use fleetlab_stop_models::{SafetyFactor, Stop};
use serde::Serialize;

/// Prints `value` as pretty JSON on stdout.
///
/// # Errors
///
/// Returns an error if `value` cannot be serialized.
pub fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_proposal(proposal: &Proposal) {
    if let Some(school) = &proposal.school {
        println!("School:    {} {}", school.query, school.position);
        if let Some(matched) = &school.matched_address {
            println!("           {matched}");
        }
    }
    if let Some(district) = &proposal.district {
        println!("District:  {} ({})", district.name, district.code);
    }
    if let Some(sampling) = &proposal.sampling {
        println!(
            "Sampling:  {} of {} requested from {} candidates",
            sampling.returned, sampling.requested, sampling.population
        );
    }
    println!();

    println!(
        "{:<12} {:>11} {:>11} {:>6}  RATING",
        "STOP", "LAT", "LON", "SCORE"
    );
    println!("{}", "-".repeat(56));
    for stop in &proposal.stops {
        print_stop_row(stop);
    }
    println!();

    let safety = &proposal.safety;
    println!(
        "Safety:    {} safe, {} acceptable, {} unsafe",
        safety.safe_stops, safety.acceptable_stops, safety.unsafe_stops
    );
    print_fleet(&proposal.fleet);

    if !proposal.anomalies.is_empty() {
        println!();
        println!("Warnings:");
        for anomaly in &proposal.anomalies {
            println!("  - {anomaly}");
        }
    }
}

fn print_stop_row(stop: &Stop) {
    let score = stop
        .score
        .map_or_else(|| "-".to_string(), |s| format!("{s:.3}"));
    let rating = stop
        .rating
        .map_or_else(|| "-".to_string(), |r| r.to_string());
    println!(
        "{:<12} {:>11.6} {:>11.6} {score:>6}  {rating}",
        stop.label(),
        stop.position.lat,
        stop.position.lon,
    );
}

pub fn print_fleet(report: &FleetReport) {
    match report {
        FleetReport::Assigned { mix } => {
            println!("Fleet:     {mix} ({} seats)", mix.capacity);
            println!(
                "Cost:      ${:.2}/day (vehicles ${:.2}, drivers ${:.2})",
                mix.total_cost, mix.vehicle_cost, mix.driver_cost
            );
            println!(
                "Drivers:   {}, {:.0} miles/day",
                mix.drivers, mix.total_miles
            );
        }
        FleetReport::Infeasible {
            required,
            max_capacity,
        } => {
            println!(
                "Fleet:     none fits {required} stops (largest fleet carries {max_capacity})"
            );
        }
    }
}

/// Prints every attribute of a scored stop followed by its score.
pub fn print_score(stop: &Stop) {
    for factor in SafetyFactor::ALL {
        let value = stop
            .attributes
            .get(factor)
            .map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
        println!("{:<20} {value:>5}", factor.as_ref());
    }
    println!("{}", "-".repeat(26));
    if let (Some(score), Some(rating)) = (stop.score, stop.rating) {
        println!("{:<20} {score:>5.3}  {rating}", "score");
    }
}
