//! Snapshot extraction: nested ledger/API data → flat participant balances.

mod remote;
mod stake;
mod token;

use std::collections::HashSet;

use indexmap::IndexMap;
use raffle_common::types::{GiveawayKind, ParticipantId};
use serde_json::Value;

use crate::error::RaffleError;
use crate::msg::Selector;

pub use remote::{AccountHistoryEntry, PoolDelegator, RemoteDelegator, RemoteStakeExtractor};
pub use stake::StakeExtractor;
pub use token::TokenExtractor;

/// Raw balances in first-seen order. Order determines ledger scan order.
pub type RawBalances = IndexMap<ParticipantId, u128>;

/// Per-participant stake of every epoch delegated to the pool, oldest first.
pub type EpochBalances = IndexMap<ParticipantId, Vec<u128>>;

#[derive(Clone, Debug, PartialEq)]
pub struct Extraction {
    pub kind: GiveawayKind,
    pub balances: RawBalances,
    /// Extractor-derived exclusions merged with the caller's list.
    pub exclusions: HashSet<ParticipantId>,
    /// Sum of every raw balance in `balances`.
    pub observed_total: u128,
    /// Independently recorded total for reconciliation, when the source has one.
    pub recorded_total: Option<u128>,
    pub epoch: Option<u64>,
    /// Present only for sources that carry delegation history.
    pub history: Option<EpochBalances>,
}

impl Extraction {
    pub fn new(kind: GiveawayKind) -> Self {
        Self {
            kind,
            balances: RawBalances::new(),
            exclusions: HashSet::new(),
            observed_total: 0,
            recorded_total: None,
            epoch: None,
            history: None,
        }
    }

    /// Add to a participant's balance, merging repeated entries.
    pub fn credit(&mut self, participant: &str, amount: u128) {
        *self.balances.entry(participant.to_string()).or_insert(0) += amount;
        self.observed_total += amount;
    }
}

/// One input mode's way of reading participants out of its source.
pub trait Extractor {
    fn kind(&self) -> GiveawayKind;

    /// `exclude` is the caller-supplied exclusion list.
    fn extract(&self, exclude: &[ParticipantId]) -> Result<Extraction, RaffleError>;
}

impl<T: Extractor + ?Sized> Extractor for &T {
    fn kind(&self) -> GiveawayKind {
        (**self).kind()
    }

    fn extract(&self, exclude: &[ParticipantId]) -> Result<Extraction, RaffleError> {
        (**self).extract(exclude)
    }
}

/// Pick the ledger-file extractor for a selector.
pub fn ledger_extractor<'a>(ledger: &'a Value, selector: &'a Selector) -> Box<dyn Extractor + 'a> {
    match selector {
        Selector::Pool(pool_id) => Box::new(StakeExtractor::new(ledger, pool_id)),
        Selector::Policy(policy_id) => Box::new(TokenExtractor::new(ledger, policy_id)),
    }
}

// ─── JSON walking helpers ───

fn join_path(base: &str, key: &str) -> String {
    if base.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", base, key)
    }
}

/// Descend `keys` from `value`, failing with the full dotted path of the first absent key.
pub(crate) fn field<'v>(value: &'v Value, base: &str, keys: &[&str]) -> Result<&'v Value, RaffleError> {
    let mut current = value;
    let mut path = base.to_string();
    for key in keys {
        path = join_path(&path, key);
        current = current
            .get(*key)
            .ok_or_else(|| RaffleError::MissingField { path: path.clone() })?;
    }
    Ok(current)
}

pub(crate) fn malformed(path: &str, expected: &str) -> RaffleError {
    RaffleError::MalformedField {
        path: path.to_string(),
        expected: expected.to_string(),
    }
}

pub(crate) fn as_array<'v>(value: &'v Value, path: &str) -> Result<&'v Vec<Value>, RaffleError> {
    value.as_array().ok_or_else(|| malformed(path, "an array"))
}

pub(crate) fn as_object<'v>(
    value: &'v Value,
    path: &str,
) -> Result<&'v serde_json::Map<String, Value>, RaffleError> {
    value.as_object().ok_or_else(|| malformed(path, "an object"))
}

pub(crate) fn as_str<'v>(value: &'v Value, path: &str) -> Result<&'v str, RaffleError> {
    value.as_str().ok_or_else(|| malformed(path, "a string"))
}

/// Non-negative integer, given either as a JSON number or a decimal string.
pub(crate) fn as_amount(value: &Value, path: &str) -> Result<u128, RaffleError> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| malformed(path, "a non-negative integer")),
        Value::String(s) => s
            .parse::<u128>()
            .map_err(|_| malformed(path, "a non-negative integer")),
        _ => Err(malformed(path, "a non-negative integer")),
    }
}

/// Credential object such as `{"key hash": "..."}` or `{"script hash": "..."}`.
pub(crate) fn credential_hash(value: &Value) -> Option<&str> {
    value
        .get("key hash")
        .or_else(|| value.get("script hash"))
        .and_then(Value::as_str)
}
