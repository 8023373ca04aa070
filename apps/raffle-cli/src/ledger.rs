use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{bail, Context, Result};
use raffle_engine::snapshot::{ledger_extractor, Extractor, RemoteDelegator, RemoteStakeExtractor};
use raffle_engine::Selector;
use serde_json::Value;
use tracing::info;

pub const LEDGER_HINT: &str = "cardano-cli query ledger-state --mainnet --out-file ledger.json";

/// Read a ledger state dump. Key order is preserved, so UTXOs are visited as they appear.
pub fn load_ledger(path: &Path) -> Result<Value> {
    if !path.exists() {
        bail!(
            "ledger file {} not found; generate it with:\n  {}",
            path.display(),
            LEDGER_HINT
        );
    }
    info!(path = %path.display(), "reading ledger state");
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {} as JSON", path.display()))
}

/// Participant source for one run.
pub enum Snapshot {
    Ledger(Value),
    Remote(RemoteStakeExtractor),
}

impl Snapshot {
    pub fn remote(pool_id: &str, delegators: Vec<RemoteDelegator>) -> Self {
        Snapshot::Remote(RemoteStakeExtractor::new(pool_id, delegators))
    }

    pub fn extractor<'a>(&'a self, selector: &'a Selector) -> Box<dyn Extractor + 'a> {
        match self {
            Snapshot::Ledger(ledger) => ledger_extractor(ledger, selector),
            Snapshot::Remote(extractor) => Box::new(extractor),
        }
    }
}
