use std::collections::VecDeque;

use raffle_common::types::{DrawOutcome, ParticipantId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::{DrawError, RaffleError};
use crate::state::TicketLedger;

const RNG_DOMAIN: &[u8] = b"stake-raffle/rng/";

/// Supplies winning numbers for the draw.
pub trait TicketSource {
    /// A winning number in `[1, upper]`; `upper` is at least 1.
    fn winning_number(&mut self, upper: u64) -> Result<u64, DrawError>;
}

/// Uniform numbers from any `rand` generator.
pub struct RngSource<R> {
    rng: R,
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> TicketSource for RngSource<R> {
    fn winning_number(&mut self, upper: u64) -> Result<u64, DrawError> {
        Ok(self.rng.gen_range(1..=upper))
    }
}

/// Generator seeded from `sha256(domain || seed)`, so a published seed reproduces the draw.
pub fn seeded_rng(seed: &str) -> StdRng {
    let mut hasher = Sha256::new();
    hasher.update(RNG_DOMAIN);
    hasher.update(seed.as_bytes());
    StdRng::from_seed(hasher.finalize().into())
}

/// `sha256(seed)`, hex-encoded. Can be published before the draw without revealing the seed.
pub fn seed_commitment(seed: &str) -> String {
    hex::encode(Sha256::digest(seed.as_bytes()))
}

/// Replays a fixed sequence of winning numbers, e.g. from a published draw.
#[derive(Clone, Debug, Default)]
pub struct ReplaySource {
    numbers: VecDeque<u64>,
}

impl ReplaySource {
    pub fn new(numbers: impl IntoIterator<Item = u64>) -> Self {
        Self {
            numbers: numbers.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.numbers.len()
    }
}

impl TicketSource for ReplaySource {
    fn winning_number(&mut self, upper: u64) -> Result<u64, DrawError> {
        let winning_number = self.numbers.pop_front().ok_or(DrawError::SourceExhausted)?;
        if winning_number == 0 || winning_number > upper {
            return Err(DrawError::OutOfRange {
                winning_number,
                upper,
            });
        }
        Ok(winning_number)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawSettings {
    pub prizes: u32,
    pub unique: bool,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct DrawFailure {
    pub prize: u32,
    pub error: DrawError,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct DrawReport {
    pub outcomes: Vec<DrawOutcome>,
    pub failures: Vec<DrawFailure>,
}

/// Highest winning number for a ticket total. Totals are rounded here, never during accumulation.
pub fn draw_upper_bound(total_weight: f64) -> Result<u64, DrawError> {
    let upper = total_weight.round();
    if !(upper >= 1.0) {
        return Err(DrawError::EmptyRange { total_weight });
    }
    Ok(upper as u64)
}

/// Find the first live participant whose cumulative weight reaches `winning_number`.
///
/// Weights are accumulated unrounded; the running sum is rounded only for the comparison,
/// matching how the upper bound was derived.
pub fn scan(ledger: &TicketLedger, winning_number: u64) -> Result<(ParticipantId, f64), DrawError> {
    let mut cumulative = 0.0;
    for (participant, weight) in ledger.iter() {
        if weight == 0.0 {
            continue;
        }
        cumulative += weight;
        if cumulative.round() >= winning_number as f64 {
            return Ok((participant.to_string(), weight));
        }
    }
    Err(DrawError::ScanExhausted {
        winning_number,
        cumulative,
    })
}

/// Abort before any draw when the run cannot be satisfied.
pub fn check_preconditions(ledger: &TicketLedger, settings: &DrawSettings) -> Result<(), RaffleError> {
    let eligible = ledger.live_count();
    if settings.unique && eligible < settings.prizes as usize {
        return Err(RaffleError::TooFewParticipants {
            eligible,
            prizes: settings.prizes,
        });
    }
    if eligible == 0 || ledger.total_weight() <= 0.0 {
        return Err(RaffleError::EmptyPool);
    }
    Ok(())
}

/// Draw one prize. The winner is resolved by a complete scan before the ledger is touched;
/// on failure the ledger is left as it was.
pub fn draw_prize<S: TicketSource + ?Sized>(
    ledger: &mut TicketLedger,
    source: &mut S,
    prize: u32,
    unique: bool,
) -> Result<DrawOutcome, DrawError> {
    let total_weight = ledger.total_weight();
    let upper = draw_upper_bound(total_weight)?;
    let winning_number = source.winning_number(upper)?;
    info!(prize, winning_number, "winning number drawn");

    let (participant, weight) = scan(ledger, winning_number)?;

    if unique {
        // scan only lands on live entries, so the winner is always still there to remove
        let removed = ledger.zero_out(&participant);
        debug_assert_eq!(removed, Some(weight));
    }

    Ok(DrawOutcome {
        prize,
        winning_number,
        participant,
        weight,
        total_weight,
    })
}

/// Draw every prize in order. Per-prize failures are recorded and the run moves on.
pub fn run_draws<S: TicketSource + ?Sized>(
    ledger: &mut TicketLedger,
    source: &mut S,
    settings: &DrawSettings,
) -> Result<DrawReport, RaffleError> {
    check_preconditions(ledger, settings)?;

    let mut report = DrawReport::default();
    for prize in 1..=settings.prizes {
        match draw_prize(ledger, source, prize, settings.unique) {
            Ok(outcome) => report.outcomes.push(outcome),
            Err(error) => {
                warn!(prize, %error, "draw failed");
                report.failures.push(DrawFailure { prize, error });
            }
        }
    }
    Ok(report)
}
