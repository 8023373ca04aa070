use raffle_common::types::{GiveawayKind, ParticipantId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{malformed, EpochBalances, Extraction, Extractor};
use crate::error::RaffleError;

/// One entry of a pool's paginated delegator listing.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PoolDelegator {
    pub address: String,
    /// Current stake in lovelace, as a decimal string.
    #[serde(default)]
    pub live_stake: Option<String>,
}

/// One epoch of an account's delegation history.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AccountHistoryEntry {
    pub active_epoch: u64,
    /// Active stake in lovelace, as a decimal string.
    pub amount: String,
    pub pool_id: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RemoteDelegator {
    pub delegator: PoolDelegator,
    pub history: Vec<AccountHistoryEntry>,
}

/// Stake-mode extraction over records fetched from a remote API instead of a ledger dump.
///
/// A delegator's raw balance is its active stake in the most recent epoch it was
/// delegated to the pool. Every epoch with the pool is kept in `history` for
/// loyalty weighting. There are no automatic exclusions in this mode.
pub struct RemoteStakeExtractor {
    pool_id: String,
    delegators: Vec<RemoteDelegator>,
}

fn parse_lovelace(raw: &str, path: &str) -> Result<u128, RaffleError> {
    raw.parse::<u128>()
        .map_err(|_| malformed(path, "a lovelace amount"))
}

impl RemoteStakeExtractor {
    pub fn new(pool_id: impl Into<String>, delegators: Vec<RemoteDelegator>) -> Self {
        Self {
            pool_id: pool_id.into(),
            delegators,
        }
    }
}

impl Extractor for RemoteStakeExtractor {
    fn kind(&self) -> GiveawayKind {
        GiveawayKind::Delegator
    }

    fn extract(&self, exclude: &[ParticipantId]) -> Result<Extraction, RaffleError> {
        let mut extraction = Extraction::new(GiveawayKind::Delegator);
        extraction.exclusions.extend(exclude.iter().cloned());

        let mut recorded = 0u128;
        let mut epochs = EpochBalances::new();
        for RemoteDelegator { delegator, history } in &self.delegators {
            if let Some(live) = &delegator.live_stake {
                recorded += parse_lovelace(live, &format!("delegators.{}.live_stake", delegator.address))?;
            }

            let mut with_pool: Vec<_> = history
                .iter()
                .filter(|entry| entry.pool_id == self.pool_id)
                .collect();
            with_pool.sort_by_key(|entry| entry.active_epoch);
            let Some(latest) = with_pool.last() else {
                debug!(delegator = %delegator.address, "no history with pool, skipped");
                continue;
            };

            let amounts = with_pool
                .iter()
                .map(|entry| {
                    let path = format!("history.{}.{}.amount", delegator.address, entry.active_epoch);
                    parse_lovelace(&entry.amount, &path)
                })
                .collect::<Result<Vec<_>, _>>()?;
            let latest_amount = amounts.last().copied().unwrap_or_default();

            extraction.credit(&delegator.address, latest_amount);
            extraction.epoch = extraction.epoch.max(Some(latest.active_epoch));
            epochs
                .entry(delegator.address.clone())
                .or_default()
                .extend(amounts);
        }
        extraction.recorded_total = Some(recorded);
        extraction.history = Some(epochs);

        info!(
            delegators = self.delegators.len(),
            with_stake = extraction.balances.len(),
            "remote delegator listing extracted"
        );
        Ok(extraction)
    }
}
