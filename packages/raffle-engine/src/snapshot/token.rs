use raffle_common::types::{GiveawayKind, ParticipantId};
use serde_json::Value;
use tracing::{info, warn};

use super::{as_amount, as_object, as_str, field, Extraction, Extractor};
use crate::error::RaffleError;

const UTXO_PATH: &str = "stateBefore.esLState.utxoState.utxo";

/// Holders of one token policy, weighted by the total quantity of that policy's assets
/// across all of an address's unspent outputs.
pub struct TokenExtractor<'a> {
    ledger: &'a Value,
    policy_id: &'a str,
}

impl<'a> TokenExtractor<'a> {
    pub fn new(ledger: &'a Value, policy_id: &'a str) -> Self {
        Self { ledger, policy_id }
    }

    /// Quantity of the target policy held by one output, if any.
    fn policy_quantity(&self, output: &Value, path: &str) -> Result<Option<u128>, RaffleError> {
        let amount = field(output, path, &["amount"])?;
        // A bare number is an ADA-only output
        if amount.is_number() {
            return Ok(None);
        }
        let amount_path = format!("{}.amount", path);
        let amount = as_object(amount, &amount_path)?;
        let Some(policies) = amount.get("policies") else {
            return Ok(None);
        };
        let policies_path = format!("{}.policies", amount_path);
        let Some(assets) = as_object(policies, &policies_path)?.get(self.policy_id) else {
            return Ok(None);
        };

        let assets_path = format!("{}.{}", policies_path, self.policy_id);
        let mut total = 0u128;
        for (asset_name, quantity) in as_object(assets, &assets_path)? {
            total += as_amount(quantity, &format!("{}.{}", assets_path, asset_name))?;
        }
        Ok(Some(total))
    }
}

impl Extractor for TokenExtractor<'_> {
    fn kind(&self) -> GiveawayKind {
        GiveawayKind::TokenHolder
    }

    fn extract(&self, exclude: &[ParticipantId]) -> Result<Extraction, RaffleError> {
        if !exclude.is_empty() {
            warn!("exclusions are not supported for token giveaways and will be ignored");
        }
        let mut extraction = Extraction::new(GiveawayKind::TokenHolder);

        let utxos = field(self.ledger, "", &["stateBefore", "esLState", "utxoState", "utxo"])?;
        let mut outputs_with_policy = 0usize;
        for (reference, output) in as_object(utxos, UTXO_PATH)? {
            let path = format!("{}.{}", UTXO_PATH, reference);
            if let Some(quantity) = self.policy_quantity(output, &path)? {
                let address = as_str(field(output, &path, &["address"])?, &format!("{}.address", path))?;
                extraction.credit(address, quantity);
                outputs_with_policy += 1;
            }
        }

        info!(
            outputs = outputs_with_policy,
            holders = extraction.balances.len(),
            tokens = %extraction.observed_total,
            "token holders extracted"
        );
        Ok(extraction)
    }
}
