mod bech32;
mod blockfrost;
mod config;
mod ledger;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use raffle_common::types::GiveawayKind;
use raffle_engine::audit::{self, EligibilityProof};
use raffle_engine::convert::AddressConverter;
use raffle_engine::raffle::{prepare, run_raffle};
use raffle_engine::{query, RaffleConfig, Selector};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::bech32::ScriptConverter;
use crate::blockfrost::BlockfrostClient;
use crate::config::DrawArgs;
use crate::ledger::{load_ledger, Snapshot};

/// Stake- and token-weighted raffles over a Cardano ledger snapshot
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    draw: DrawArgs,

    /// Log as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the eligibility proof for one participant (uses the draw options given before it)
    Prove {
        /// Raw participant identifier as it appears in the snapshot
        #[arg(long)]
        participant: String,
    },
    /// Check a proof printed by `prove` against a published eligibility root
    Verify {
        /// File holding the proof JSON
        #[arg(long)]
        proof: PathBuf,

        /// Root to check against; defaults to the root stored in the proof file
        #[arg(long)]
        root: Option<String>,
    },
}

/// Output of `prove`, input of `verify`.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ProofDocument {
    root: String,
    #[serde(flatten)]
    proof: EligibilityProof,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn load_snapshot(args: &DrawArgs, config: &RaffleConfig) -> Result<Snapshot> {
    if !args.remote {
        return Ok(Snapshot::Ledger(load_ledger(&args.ledger)?));
    }
    let Selector::Pool(pool_id) = &config.selector else {
        bail!("--remote only supports pool giveaways (--pool-id)");
    };
    let client = BlockfrostClient::new(&args.blockfrost_url, args.project_id()?)?;
    let delegators = client
        .remote_delegators(pool_id)
        .await
        .with_context(|| format!("fetching delegators of {} from {}", pool_id, args.blockfrost_url))?;
    Ok(Snapshot::remote(pool_id, delegators))
}

async fn draw(args: &DrawArgs) -> Result<()> {
    let config = args.raffle_config()?;
    let snapshot = load_snapshot(args, &config).await?;
    let extractor = snapshot.extractor(&config.selector);

    let (mut source, commitment) = args.ticket_source()?;
    if let Some(commitment) = &commitment {
        info!(%commitment, "seeded draw");
    }

    let script = ScriptConverter::new(&args.converter);
    let converter: Option<&dyn AddressConverter> = match config.selector.kind() {
        GiveawayKind::TokenHolder => Some(&script),
        GiveawayKind::Delegator => None,
    };

    let mut report = run_raffle(&config, extractor.as_ref(), source.as_mut(), converter)?;
    report.seed_commitment = commitment;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", query::render(&report));
    }
    Ok(())
}

async fn prove(args: &DrawArgs, participant: &str) -> Result<()> {
    let config = args.raffle_config()?;
    let snapshot = load_snapshot(args, &config).await?;
    let prepared = prepare(&config, snapshot.extractor(&config.selector).as_ref())?;

    let root = raffle_common::MerkleTree::from_ranges(&prepared.ledger.ranges()).root_hex();
    let proof = audit::prove(&prepared.ledger, participant)
        .with_context(|| format!("{} holds no tickets in this raffle", participant))?;
    println!("{}", serde_json::to_string_pretty(&ProofDocument { root, proof })?);
    Ok(())
}

fn verify(proof_path: &Path, root: Option<&str>) -> Result<()> {
    let raw = std::fs::read_to_string(proof_path)
        .with_context(|| format!("reading {}", proof_path.display()))?;
    let document: ProofDocument = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", proof_path.display()))?;

    let root = root.unwrap_or(&document.root);
    if !audit::verify(root, &document.proof)? {
        bail!(
            "proof for {} does not match root {}",
            document.proof.participant,
            root
        );
    }
    println!(
        "valid: {} holds tickets [{}, {}) under root {}",
        document.proof.participant,
        document.proof.cumulative_start,
        document.proof.cumulative_end,
        root
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match &cli.command {
        None => draw(&cli.draw).await,
        Some(Command::Prove { participant }) => prove(&cli.draw, participant).await,
        Some(Command::Verify { proof, root }) => verify(proof, root.as_deref()),
    }
}
