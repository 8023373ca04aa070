use std::collections::HashSet;

use raffle_common::types::{EligibilityRecord, ParticipantId};
use serde::{Deserialize, Serialize};

use crate::snapshot::{EpochBalances, RawBalances};

/// Filter output: the ticket-ledger-ready records plus reconciliation figures.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Eligibility {
    pub records: Vec<EligibilityRecord>,
    /// Sum of raw balances of eligible participants (undampened).
    pub eligible_raw_total: u128,
    /// Sum of eligible ticket weights, accumulated unrounded.
    pub eligible_weight_total: f64,
    pub excluded_count: usize,
    /// Sum of raw balances of excluded or below-threshold participants.
    pub excluded_raw_total: u128,
}

impl Eligibility {
    pub fn eligible_count(&self) -> usize {
        self.records.len()
    }

    /// Eligible plus excluded raw balance; equals the extraction's observed total.
    pub fn reconciled_total(&self) -> u128 {
        self.eligible_raw_total + self.excluded_raw_total
    }
}

/// Ticket weight for a raw balance.
pub fn ticket_weight(raw_balance: u128, dampen: bool) -> f64 {
    let weight = raw_balance as f64;
    if dampen {
        weight.sqrt()
    } else {
        weight
    }
}

/// Loyalty weight: every epoch's stake is weighted on its own, then summed.
pub fn cumulative_weight(epoch_balances: &[u128], dampen: bool) -> f64 {
    epoch_balances
        .iter()
        .fold(0.0, |total, amount| total + ticket_weight(*amount, dampen))
}

/// Apply exclusion and threshold policy.
///
/// A participant is excluded when it is in `exclusions` or its balance is `<= min_balance`;
/// a balance exactly at the threshold is not eligible. Input order is preserved.
pub fn apply(
    balances: &RawBalances,
    exclusions: &HashSet<ParticipantId>,
    min_balance: u128,
    dampen: bool,
) -> Eligibility {
    apply_weighted(balances, None, exclusions, min_balance, dampen)
}

/// Like [`apply`], but participants listed in `history` are weighted by
/// [`cumulative_weight`] over their epochs. The threshold still compares `balances`.
pub fn apply_weighted(
    balances: &RawBalances,
    history: Option<&EpochBalances>,
    exclusions: &HashSet<ParticipantId>,
    min_balance: u128,
    dampen: bool,
) -> Eligibility {
    let mut eligibility = Eligibility {
        records: Vec::with_capacity(balances.len()),
        eligible_raw_total: 0,
        eligible_weight_total: 0.0,
        excluded_count: 0,
        excluded_raw_total: 0,
    };

    for (participant, &raw_balance) in balances {
        if exclusions.contains(participant) || raw_balance <= min_balance {
            eligibility.excluded_count += 1;
            eligibility.excluded_raw_total += raw_balance;
            continue;
        }
        let weight = match history.and_then(|h| h.get(participant)) {
            Some(epochs) => cumulative_weight(epochs, dampen),
            None => ticket_weight(raw_balance, dampen),
        };
        eligibility.eligible_raw_total += raw_balance;
        eligibility.eligible_weight_total += weight;
        eligibility.records.push(EligibilityRecord {
            participant: participant.clone(),
            raw_balance,
            weight,
        });
    }

    eligibility
}
