use raffle_common::types::{GiveawayKind, ParticipantId};
use serde::{Deserialize, Serialize};

use crate::error::RaffleError;
use crate::LOVELACE_PER_ADA;

/// Which population the raffle is drawn from. Exactly one per run.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    /// Delegators of this stake pool.
    Pool(String),
    /// Holders of tokens minted under this policy.
    Policy(String),
}

impl Selector {
    pub fn from_options(pool_id: Option<String>, policy_id: Option<String>) -> Result<Self, RaffleError> {
        match (pool_id, policy_id) {
            (Some(_), Some(_)) => Err(RaffleError::ConflictingSelectors),
            (None, None) => Err(RaffleError::NoSelector),
            (Some(pool), None) => Ok(Selector::Pool(pool)),
            (None, Some(policy)) => Ok(Selector::Policy(policy)),
        }
    }

    pub fn kind(&self) -> GiveawayKind {
        match self {
            Selector::Pool(_) => GiveawayKind::Delegator,
            Selector::Policy(_) => GiveawayKind::TokenHolder,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Selector::Pool(id) | Selector::Policy(id) => id,
        }
    }
}

fn default_winners() -> u32 {
    1
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RaffleConfig {
    pub selector: Selector,
    /// Participants that may never win, in addition to any the extractor excludes itself.
    #[serde(default)]
    pub exclude: Vec<ParticipantId>,
    /// Exclusive lower bound: ADA for delegator giveaways, raw token count otherwise.
    #[serde(default)]
    pub min_balance: u64,
    #[serde(default = "default_winners")]
    pub winners: u32,
    /// Draw without replacement: at most one prize per participant.
    #[serde(default)]
    pub unique: bool,
    /// Weight by the square root of the balance.
    #[serde(default)]
    pub dampen: bool,
    /// Weight delegators by their stake summed over every epoch delegated to the pool.
    /// The threshold still applies to the latest epoch's stake.
    #[serde(default)]
    pub loyalty: bool,
}

impl RaffleConfig {
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            exclude: vec![],
            min_balance: 0,
            winners: default_winners(),
            unique: false,
            dampen: false,
            loyalty: false,
        }
    }

    pub fn validate(&self) -> Result<(), RaffleError> {
        if self.selector.id().trim().is_empty() {
            return Err(RaffleError::InvalidConfig {
                reason: "selector id is empty".to_string(),
            });
        }
        if self.winners == 0 {
            return Err(RaffleError::InvalidConfig {
                reason: "number of winners must be at least 1".to_string(),
            });
        }
        if self.loyalty && self.selector.kind() != GiveawayKind::Delegator {
            return Err(RaffleError::InvalidConfig {
                reason: "loyalty weighting only applies to pool giveaways".to_string(),
            });
        }
        Ok(())
    }

    /// Threshold in the raw on-chain unit of the giveaway.
    pub fn raw_threshold(&self) -> u128 {
        match self.selector.kind() {
            GiveawayKind::Delegator => self.min_balance as u128 * LOVELACE_PER_ADA as u128,
            GiveawayKind::TokenHolder => self.min_balance as u128,
        }
    }
}

/// Split a comma separated exclusion argument into identifiers.
pub fn parse_exclude_list(raw: &str) -> Vec<ParticipantId> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_requires_exactly_one() {
        assert_eq!(
            Selector::from_options(None, None).unwrap_err(),
            RaffleError::NoSelector
        );
        assert_eq!(
            Selector::from_options(Some("pool".into()), Some("policy".into())).unwrap_err(),
            RaffleError::ConflictingSelectors
        );
        assert_eq!(
            Selector::from_options(Some("pool".into()), None).unwrap(),
            Selector::Pool("pool".into())
        );
        assert_eq!(
            Selector::from_options(None, Some("policy".into())).unwrap().kind(),
            GiveawayKind::TokenHolder
        );
    }

    #[test]
    fn test_raw_threshold_scaling() {
        let mut config = RaffleConfig::new(Selector::Pool("pool".into()));
        config.min_balance = 50;
        assert_eq!(config.raw_threshold(), 50_000_000);

        config.selector = Selector::Policy("policy".into());
        assert_eq!(config.raw_threshold(), 50);
    }

    #[test]
    fn test_validate() {
        let mut config = RaffleConfig::new(Selector::Pool("pool".into()));
        assert!(config.validate().is_ok());

        config.winners = 0;
        assert!(matches!(
            config.validate(),
            Err(RaffleError::InvalidConfig { .. })
        ));

        let config = RaffleConfig::new(Selector::Policy("  ".into()));
        assert!(config.validate().is_err());

        let mut config = RaffleConfig::new(Selector::Policy("policy".into()));
        config.loyalty = true;
        assert!(matches!(
            config.validate(),
            Err(RaffleError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_config_defaults_from_json() {
        let config: RaffleConfig =
            serde_json::from_value(serde_json::json!({ "selector": { "pool": "abc" } })).unwrap();
        assert_eq!(config.winners, 1);
        assert_eq!(config.min_balance, 0);
        assert!(!config.unique);
        assert!(!config.loyalty);
        assert!(config.exclude.is_empty());
    }

    #[test]
    fn test_parse_exclude_list() {
        assert_eq!(
            parse_exclude_list("aa, bb,,cc "),
            vec!["aa".to_string(), "bb".to_string(), "cc".to_string()]
        );
        assert!(parse_exclude_list("").is_empty());
    }
}
