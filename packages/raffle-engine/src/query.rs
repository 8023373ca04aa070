//! Human-readable rendering of a finished raffle.

use raffle_common::types::GiveawayKind;

use crate::raffle::{RaffleReport, WinnerLine};
use crate::LOVELACE_PER_ADA;

const CLOSING_LINE: &str = "Done! Well done to the winners, best of luck next time to everyone else!";
const BECH32_HINT: &str = "You may need to use bech32 to convert winning addresses to 'addr...' format.";

/// Undampened delegator tickets are lovelace; show them as ADA.
pub fn ticket_divisor(kind: GiveawayKind, dampened: bool) -> f64 {
    match (kind, dampened) {
        (GiveawayKind::Delegator, false) => LOVELACE_PER_ADA as f64,
        _ => 1.0,
    }
}

/// Winning chance in percent, two decimals.
pub fn calculate_chance(weight: f64, total_weight: f64) -> f64 {
    if total_weight <= 0.0 {
        return 0.0;
    }
    (weight / total_weight * 10_000.0).round() / 100.0
}

pub fn congrats_message(display: &str, weight: f64, total_weight: f64, divisor: f64) -> String {
    format!(
        "Congrats to {} ({} out of {} tickets, {}% chance)!",
        display,
        (weight / divisor).round(),
        (total_weight / divisor).round(),
        calculate_chance(weight, total_weight)
    )
}

/// Lovelace as an exact ADA decimal.
pub fn format_ada(lovelace: u128) -> String {
    let per_ada = LOVELACE_PER_ADA as u128;
    format!("{}.{:06}", lovelace / per_ada, lovelace % per_ada)
}

pub fn winner_lines(winner: &WinnerLine, divisor: f64) -> Vec<String> {
    vec![
        format!(
            "Prize #{} Winning number: {}",
            winner.outcome.prize, winner.outcome.winning_number
        ),
        congrats_message(
            &winner.display,
            winner.outcome.weight,
            winner.outcome.total_weight,
            divisor,
        ),
    ]
}

pub fn summary_lines(report: &RaffleReport) -> Vec<String> {
    let mut lines = Vec::new();
    match report.kind {
        GiveawayKind::Delegator => {
            if let Some(epoch) = report.epoch {
                lines.push(format!("Current Epoch: {}", epoch));
            }
            if let Some(recorded) = report.recorded_total {
                lines.push(format!("Total pool stake on record (ADA): {}", format_ada(recorded)));
            }
            lines.push(format!(
                "Total calculated pool stake (ADA): {}",
                format_ada(report.observed_total)
            ));
            lines.push(format!(
                "Total # of eligible addresses: {}",
                report.eligible_participants
            ));
            lines.push(format!(
                "Total eligible stake (ADA): {}",
                format_ada(report.eligible_raw_total)
            ));
            lines.push(format!(
                "Total excluded stake (ADA): {}",
                format_ada(report.excluded_raw_total)
            ));
        }
        GiveawayKind::TokenHolder => {
            lines.push(format!(
                "Total # token holders: {}",
                report.eligible_participants + report.excluded_participants
            ));
            lines.push(format!("Total # tokens held: {}", report.observed_total));
            lines.push(format!(
                "Total # eligible token holders: {}",
                report.eligible_participants
            ));
            lines.push(format!("Total # eligible tokens: {}", report.eligible_raw_total));
        }
    }
    if report.loyalty {
        lines.push("Tickets summed over every epoch delegated to the pool".to_string());
    }
    if report.dampened || report.loyalty {
        let divisor = ticket_divisor(report.kind, report.dampened);
        lines.push(format!(
            "Total eligible tickets: {}",
            (report.eligible_weight_total / divisor).round()
        ));
    }
    lines.push(format!("Eligibility root: {}", report.eligibility_root));
    if let Some(commitment) = &report.seed_commitment {
        lines.push(format!("Seed commitment: {}", commitment));
    }
    lines
}

pub fn closing_lines(report: &RaffleReport) -> Vec<String> {
    let mut lines = Vec::new();
    if !report.failures.is_empty() {
        lines.push(format!(
            "A number of problems occurred: {}",
            report.failures.len()
        ));
        for failure in &report.failures {
            lines.push(format!("  prize #{}: {}", failure.prize, failure.error));
        }
    }
    if report.kind == GiveawayKind::TokenHolder && report.converter_failed {
        lines.push(BECH32_HINT.to_string());
    }
    lines.push(CLOSING_LINE.to_string());
    lines
}

/// Full plain-text report: summary, one block per winner, closing lines.
pub fn render(report: &RaffleReport) -> String {
    let divisor = ticket_divisor(report.kind, report.dampened);
    let mut lines = summary_lines(report);
    lines.push(String::new());
    for winner in &report.winners {
        lines.extend(winner_lines(winner, divisor));
        lines.push(String::new());
    }
    lines.extend(closing_lines(report));
    lines.join("\n")
}
