use raffle_common::merkle::MerkleTree;
use raffle_common::types::{DrawOutcome, GiveawayKind};
use serde::Serialize;
use tracing::{info, warn};

use crate::convert::{AddressConverter, DisplayNames};
use crate::error::RaffleError;
use crate::execute::{run_draws, DrawFailure, DrawSettings, TicketSource};
use crate::filter::{self, Eligibility};
use crate::msg::RaffleConfig;
use crate::snapshot::{Extraction, Extractor};
use crate::state::TicketLedger;

/// Recorded and calculated totals may drift apart by snapshot timing; beyond this it is worth a warning.
const RECONCILIATION_TOLERANCE: f64 = 0.01;

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct WinnerLine {
    #[serde(flatten)]
    pub outcome: DrawOutcome,
    /// Identifier as shown to people, after address conversion.
    pub display: String,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct RaffleReport {
    pub kind: GiveawayKind,
    pub selector_id: String,
    pub epoch: Option<u64>,
    pub dampened: bool,
    /// Weights were summed over every epoch delegated to the pool.
    pub loyalty: bool,
    pub unique: bool,
    pub raw_threshold: u128,
    pub eligible_participants: usize,
    pub excluded_participants: usize,
    pub eligible_raw_total: u128,
    pub eligible_weight_total: f64,
    pub excluded_raw_total: u128,
    pub observed_total: u128,
    pub recorded_total: Option<u128>,
    /// Merkle root over the eligible ticket ranges before the first draw.
    pub eligibility_root: String,
    pub seed_commitment: Option<String>,
    pub winners: Vec<WinnerLine>,
    pub failures: Vec<DrawFailure>,
    pub converter_failed: bool,
}

/// Whether a recorded total differs materially from the calculated one.
pub fn recorded_mismatch(calculated: u128, recorded: u128) -> bool {
    let larger = calculated.max(recorded) as f64;
    if larger == 0.0 {
        return false;
    }
    (calculated as f64 - recorded as f64).abs() / larger > RECONCILIATION_TOLERANCE
}

/// Everything the draw needs, before the first winning number is taken.
pub struct Prepared {
    pub extraction: Extraction,
    pub eligibility: Eligibility,
    pub raw_threshold: u128,
    pub ledger: TicketLedger,
}

/// Extract and filter, producing the ticket ledger the draw runs over.
pub fn prepare(config: &RaffleConfig, extractor: &dyn Extractor) -> Result<Prepared, RaffleError> {
    config.validate()?;
    if extractor.kind() != config.selector.kind() {
        return Err(RaffleError::InvalidConfig {
            reason: format!(
                "extractor reads {} giveaways but the selector asks for {}",
                extractor.kind().as_str(),
                config.selector.kind().as_str()
            ),
        });
    }

    let extraction = extractor.extract(&config.exclude)?;
    let raw_threshold = config.raw_threshold();
    let history = match (config.loyalty, extraction.history.as_ref()) {
        (false, _) => None,
        (true, Some(history)) => Some(history),
        (true, None) => {
            return Err(RaffleError::InvalidConfig {
                reason: "loyalty weighting needs per-epoch delegation history, which this source does not carry"
                    .to_string(),
            })
        }
    };
    let eligibility = filter::apply_weighted(
        &extraction.balances,
        history,
        &extraction.exclusions,
        raw_threshold,
        config.dampen,
    );

    if eligibility.reconciled_total() != extraction.observed_total {
        warn!(
            reconciled = %eligibility.reconciled_total(),
            observed = %extraction.observed_total,
            "eligible plus excluded balance does not match the extracted total"
        );
    }
    if let Some(recorded) = extraction.recorded_total {
        if recorded_mismatch(extraction.observed_total, recorded) {
            warn!(
                calculated = %extraction.observed_total,
                %recorded,
                "calculated total differs from the recorded total"
            );
        }
    }
    info!(
        eligible = eligibility.eligible_count(),
        excluded = eligibility.excluded_count,
        tickets = eligibility.eligible_weight_total,
        "eligibility computed"
    );

    let ledger = TicketLedger::from_records(&eligibility.records);
    Ok(Prepared {
        extraction,
        eligibility,
        raw_threshold,
        ledger,
    })
}

/// Extract, filter, and draw.
///
/// Fatal errors come back as `Err` before any prize is drawn; per-prize failures
/// are listed in the report.
pub fn run_raffle(
    config: &RaffleConfig,
    extractor: &dyn Extractor,
    source: &mut dyn TicketSource,
    converter: Option<&dyn AddressConverter>,
) -> Result<RaffleReport, RaffleError> {
    let Prepared {
        extraction,
        eligibility,
        raw_threshold,
        mut ledger,
    } = prepare(config, extractor)?;
    let eligibility_root = MerkleTree::from_ranges(&ledger.ranges()).root_hex();

    let settings = DrawSettings {
        prizes: config.winners,
        unique: config.unique,
    };
    let draws = run_draws(&mut ledger, source, &settings)?;

    let mut names = DisplayNames::new(converter);
    let winners = draws
        .outcomes
        .into_iter()
        .map(|outcome| WinnerLine {
            display: names.resolve(&outcome.participant),
            outcome,
        })
        .collect();

    Ok(RaffleReport {
        kind: extraction.kind,
        selector_id: config.selector.id().to_string(),
        epoch: extraction.epoch,
        dampened: config.dampen,
        loyalty: config.loyalty,
        unique: config.unique,
        raw_threshold,
        eligible_participants: eligibility.eligible_count(),
        excluded_participants: eligibility.excluded_count,
        eligible_raw_total: eligibility.eligible_raw_total,
        eligible_weight_total: eligibility.eligible_weight_total,
        excluded_raw_total: eligibility.excluded_raw_total,
        observed_total: extraction.observed_total,
        recorded_total: extraction.recorded_total,
        eligibility_root,
        seed_commitment: None,
        winners,
        failures: draws.failures,
        converter_failed: names.converter_failed(),
    })
}
