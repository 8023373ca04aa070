use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use rand::rngs::StdRng;
use rand::SeedableRng;
use raffle_engine::execute::{seed_commitment, seeded_rng, ReplaySource, RngSource, TicketSource};
use raffle_engine::msg::parse_exclude_list;
use raffle_engine::{RaffleConfig, Selector};

pub const DEFAULT_BLOCKFROST_URL: &str = "https://cardano-mainnet.blockfrost.io";

/// Options shared by drawing and proving: where participants come from and who is eligible.
#[derive(Args, Debug, Clone)]
pub struct DrawArgs {
    /// Stake pool ID (hex); draws among the pool's delegators
    #[arg(short = 'i', long)]
    pub pool_id: Option<String>,

    /// Policy ID (hex); draws among holders of the policy's tokens
    #[arg(short = 'p', long)]
    pub policy_id: Option<String>,

    /// Ledger state dump from cardano-cli
    #[arg(short = 'l', long, default_value = "ledger.json")]
    pub ledger: PathBuf,

    /// Comma separated identifiers that may never win
    #[arg(short = 'e', long)]
    pub exclude: Option<String>,

    /// Number of prizes to draw
    #[arg(short = 'w', long, default_value_t = 1, allow_negative_numbers = true)]
    pub winners: i64,

    /// Minimum balance to qualify (exclusive): ADA for delegators, tokens for holders
    #[arg(short = 'm', long, default_value_t = 0, allow_negative_numbers = true)]
    pub min_tokens: i64,

    /// At most one prize per participant
    #[arg(short = 'u', long)]
    pub unique: bool,

    /// Weight by the square root of each balance
    #[arg(short = 's', long)]
    pub sqrt: bool,

    /// Fetch delegators from Blockfrost instead of the ledger file (pool giveaways only)
    #[arg(long)]
    pub remote: bool,

    /// Weight by stake summed over every epoch delegated to the pool
    #[arg(long, requires = "remote")]
    pub loyalty: bool,

    /// Blockfrost base URL
    #[arg(long, env = "BLOCKFROST_URL", default_value = DEFAULT_BLOCKFROST_URL)]
    pub blockfrost_url: String,

    /// Blockfrost project ID
    #[arg(long, env = "BLOCKFROST_PROJECT_ID", hide_env_values = true)]
    pub project_id: Option<String>,

    /// Program that turns a raw address into bech32 form
    #[arg(long, default_value = "./runbech32.sh")]
    pub converter: PathBuf,

    /// Seed for a reproducible draw; its sha256 is printed with the results
    #[arg(long, conflicts_with = "winning_numbers")]
    pub seed: Option<String>,

    /// Replay a published comma separated sequence of winning numbers
    #[arg(long)]
    pub winning_numbers: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

fn to_u32(value: i64, name: &str) -> Result<u32> {
    u32::try_from(value.unsigned_abs()).with_context(|| format!("{} is too large: {}", name, value))
}

pub fn parse_winning_numbers(raw: &str) -> Result<Vec<u64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>()
                .with_context(|| format!("invalid winning number: {:?}", s))
        })
        .collect()
}

impl DrawArgs {
    /// Negative counts are taken by absolute value.
    pub fn raffle_config(&self) -> Result<RaffleConfig> {
        let selector = Selector::from_options(self.pool_id.clone(), self.policy_id.clone())?;
        if self.remote && !matches!(selector, Selector::Pool(_)) {
            bail!("--remote only supports pool giveaways (--pool-id)");
        }

        let mut config = RaffleConfig::new(selector);
        config.exclude = self
            .exclude
            .as_deref()
            .map(parse_exclude_list)
            .unwrap_or_default();
        config.winners = to_u32(self.winners, "--winners")?;
        config.min_balance = self.min_tokens.unsigned_abs();
        config.unique = self.unique;
        config.dampen = self.sqrt;
        config.loyalty = self.loyalty;
        config.validate()?;
        Ok(config)
    }

    pub fn project_id(&self) -> Result<&str> {
        self.project_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .context("--remote needs a Blockfrost project ID (--project-id or BLOCKFROST_PROJECT_ID)")
    }

    /// Where winning numbers come from, plus the seed commitment when seeded.
    pub fn ticket_source(&self) -> Result<(Box<dyn TicketSource>, Option<String>)> {
        if let Some(raw) = &self.winning_numbers {
            let numbers = parse_winning_numbers(raw)?;
            return Ok((Box::new(ReplaySource::new(numbers)), None));
        }
        if let Some(seed) = &self.seed {
            return Ok((
                Box::new(RngSource::new(seeded_rng(seed))),
                Some(seed_commitment(seed)),
            ));
        }
        Ok((Box::new(RngSource::new(StdRng::from_entropy())), None))
    }
}
