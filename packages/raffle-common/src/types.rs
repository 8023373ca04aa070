use serde::{Deserialize, Serialize};

/// Opaque participant key: a staking-credential hash or a UTXO address.
pub type ParticipantId = String;

/// What the raffle is weighted by: delegated stake or held tokens of one policy.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GiveawayKind {
    Delegator,
    TokenHolder,
}

impl GiveawayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GiveawayKind::Delegator => "delegator",
            GiveawayKind::TokenHolder => "token_holder",
        }
    }
}

/// A participant that passed the eligibility filter together with its ticket weight.
/// The weight is always > 0.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EligibilityRecord {
    pub participant: ParticipantId,
    pub raw_balance: u128,
    pub weight: f64,
}

/// A participant's half-open ticket range `[cumulative_start, cumulative_end)`
/// in ledger scan order. Used to build the eligibility commitment.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TicketRange {
    pub participant: ParticipantId,
    pub weight: f64,
    pub cumulative_start: f64,
    pub cumulative_end: f64,
}

/// Result of one prize draw. Weights are the values at draw time,
/// before any unique-mode removal of the winner.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DrawOutcome {
    pub prize: u32,
    pub winning_number: u64,
    pub participant: ParticipantId,
    pub weight: f64,
    pub total_weight: f64,
}
