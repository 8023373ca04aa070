use serde::Serialize;
use thiserror::Error;

/// Fatal errors: the run stops before (or instead of) drawing.
#[derive(Error, Debug, PartialEq)]
pub enum RaffleError {
    #[error("neither --pool-id nor --policy-id was specified")]
    NoSelector,

    #[error("--pool-id and --policy-id are not supported together, please use only one of them")]
    ConflictingSelectors,

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("snapshot field `{path}` is missing")]
    MissingField { path: String },

    #[error("snapshot field `{path}` is malformed: expected {expected}")]
    MalformedField { path: String, expected: String },

    #[error("no tickets to draw from: the eligible ticket total is zero")]
    EmptyPool,

    #[error("too few participants to pick from: {eligible} eligible for {prizes} unique prizes. Try a lower number of winners or omit --unique")]
    TooFewParticipants { eligible: usize, prizes: u32 },

    #[error("invalid hex: {field}")]
    InvalidHex { field: String },
}

/// Non-fatal errors for a single prize. The draw is skipped, counted, and the run continues.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawError {
    #[error("cumulative scan ended at {cumulative} without reaching winning number {winning_number}")]
    ScanExhausted { winning_number: u64, cumulative: f64 },

    #[error("ticket total {total_weight} leaves no winning number to draw")]
    EmptyRange { total_weight: f64 },

    #[error("no winning numbers left to replay")]
    SourceExhausted,

    #[error("winning number {winning_number} is outside [1, {upper}]")]
    OutOfRange { winning_number: u64, upper: u64 },
}
