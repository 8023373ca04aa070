use std::collections::{HashMap, HashSet};

use raffle_common::types::{GiveawayKind, ParticipantId};
use serde_json::Value;
use tracing::{debug, info};

use super::{as_amount, as_array, as_str, credential_hash, field, malformed, Extraction, Extractor};
use crate::error::RaffleError;

const STAKE_SNAPSHOT: &str = "pstakeSet";

/// Delegators of one pool, weighted by their stake in the ledger's stake snapshot.
pub struct StakeExtractor<'a> {
    ledger: &'a Value,
    pool_id: &'a str,
}

impl<'a> StakeExtractor<'a> {
    pub fn new(ledger: &'a Value, pool_id: &'a str) -> Self {
        Self { ledger, pool_id }
    }

    /// Pool owners and the reward account. These never take part.
    fn pool_principals(&self) -> Result<Vec<ParticipantId>, RaffleError> {
        let base = "stateBefore.esLState.delegationState.pstate.pParams pState";
        let pool = field(
            self.ledger,
            "",
            &["stateBefore", "esLState", "delegationState", "pstate", "pParams pState", self.pool_id],
        )?;
        let pool_path = format!("{}.{}", base, self.pool_id);

        let owners_path = format!("{}.owners", pool_path);
        let mut principals = as_array(field(pool, &pool_path, &["owners"])?, &owners_path)?
            .iter()
            .map(|owner| as_str(owner, &owners_path).map(str::to_string))
            .collect::<Result<Vec<_>, _>>()?;

        let credential = field(pool, &pool_path, &["rewardAccount", "credential"])?;
        let reward = credential_hash(credential).ok_or_else(|| RaffleError::MissingField {
            path: format!("{}.rewardAccount.credential.key hash", pool_path),
        })?;
        principals.push(reward.to_string());
        Ok(principals)
    }

    /// Delegators assigned to the target pool, in snapshot order, without duplicates.
    fn pool_delegators(&self, snapshot: &Value, base: &str) -> Result<Vec<ParticipantId>, RaffleError> {
        let path = format!("{}.delegations", base);
        let mut seen = HashSet::new();
        let mut delegators = Vec::new();

        for (idx, entry) in as_array(field(snapshot, base, &["delegations"])?, &path)?
            .iter()
            .enumerate()
        {
            let entry_path = format!("{}[{}]", path, idx);
            let pair = as_array(entry, &entry_path)?;
            let delegator = pair.iter().find_map(credential_hash);
            let pool = pair.iter().find_map(Value::as_str);
            let (delegator, pool) = match (delegator, pool) {
                (Some(d), Some(p)) => (d, p),
                _ => return Err(malformed(&entry_path, "a [credential, pool id] pair")),
            };
            if pool == self.pool_id && seen.insert(delegator.to_string()) {
                delegators.push(delegator.to_string());
            }
        }
        Ok(delegators)
    }

    /// Stake per credential, summing repeated entries.
    fn stake_amounts(&self, snapshot: &Value, base: &str) -> Result<HashMap<String, u128>, RaffleError> {
        let path = format!("{}.stake", base);
        let mut amounts: HashMap<String, u128> = HashMap::new();

        for (idx, entry) in as_array(field(snapshot, base, &["stake"])?, &path)?
            .iter()
            .enumerate()
        {
            let entry_path = format!("{}[{}]", path, idx);
            let pair = as_array(entry, &entry_path)?;
            let amount = pair
                .iter()
                .find(|v| v.is_number())
                .ok_or_else(|| malformed(&entry_path, "a [credential, amount] pair"))?;
            let amount = as_amount(amount, &entry_path)?;
            match pair.iter().find_map(credential_hash) {
                Some(credential) => *amounts.entry(credential.to_string()).or_insert(0) += amount,
                None => debug!(entry = %entry_path, "stake entry without a credential hash skipped"),
            }
        }
        Ok(amounts)
    }
}

impl Extractor for StakeExtractor<'_> {
    fn kind(&self) -> GiveawayKind {
        GiveawayKind::Delegator
    }

    fn extract(&self, exclude: &[ParticipantId]) -> Result<Extraction, RaffleError> {
        let mut extraction = Extraction::new(GiveawayKind::Delegator);

        let epoch = field(self.ledger, "", &["lastEpoch"])?;
        extraction.epoch = Some(
            epoch
                .as_u64()
                .ok_or_else(|| malformed("lastEpoch", "an epoch number"))?,
        );
        info!(epoch = ?extraction.epoch, "current epoch");

        let recorded_path = format!("stakeDistrib.{}.individualPoolStake.numerator", self.pool_id);
        let recorded = field(
            self.ledger,
            "",
            &["stakeDistrib", self.pool_id, "individualPoolStake", "numerator"],
        )?;
        extraction.recorded_total = Some(as_amount(recorded, &recorded_path)?);

        extraction.exclusions.extend(exclude.iter().cloned());
        extraction.exclusions.extend(self.pool_principals()?);
        let mut excluded: Vec<_> = extraction.exclusions.iter().cloned().collect();
        excluded.sort();
        info!(addresses = %excluded.join(","), "excluding the following addresses");

        let base = format!("stateBefore.esSnapshots.{}", STAKE_SNAPSHOT);
        let snapshot = field(self.ledger, "", &["stateBefore", "esSnapshots", STAKE_SNAPSHOT])?;
        let delegators = self.pool_delegators(snapshot, &base)?;
        let amounts = self.stake_amounts(snapshot, &base)?;

        for delegator in &delegators {
            match amounts.get(delegator) {
                Some(amount) => extraction.credit(delegator, *amount),
                None => debug!(%delegator, "delegator has no stake entry, skipped"),
            }
        }

        info!(
            delegators = delegators.len(),
            with_stake = extraction.balances.len(),
            "stake snapshot extracted"
        );
        Ok(extraction)
    }
}
