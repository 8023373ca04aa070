//! Stake- and token-weighted raffle engine.
//!
//! Data flows strictly downward: a [`snapshot::Extractor`] turns a ledger
//! snapshot (or remote delegator listing) into raw balances, [`filter`] applies
//! exclusion and threshold policy, the resulting [`state::TicketLedger`] is the
//! substrate [`execute`] draws from, and [`query`] renders the outcome.
//! [`raffle::run_raffle`] drives the whole pipeline; [`audit`] proves a
//! participant's range against the published eligibility root.

pub mod audit;
pub mod convert;
pub mod error;
pub mod execute;
pub mod filter;
pub mod msg;
pub mod query;
pub mod raffle;
pub mod snapshot;
pub mod state;

pub use error::{DrawError, RaffleError};
pub use msg::{RaffleConfig, Selector};
pub use raffle::{prepare, run_raffle, RaffleReport};
pub use state::TicketLedger;

/// Lovelace per ADA.
pub const LOVELACE_PER_ADA: u64 = 1_000_000;
