//! Proofs against the eligibility root printed with every raffle.

use raffle_common::merkle::{compute_leaf_hash, verify_merkle_proof, MerkleTree};
use raffle_common::types::{ParticipantId, TicketRange};
use serde::{Deserialize, Serialize};

use crate::error::RaffleError;
use crate::state::TicketLedger;

/// A participant's ticket range plus the sibling path up to the eligibility root.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EligibilityProof {
    pub participant: ParticipantId,
    pub cumulative_start: f64,
    pub cumulative_end: f64,
    pub proof: Vec<String>,
}

/// Proof for `participant`, or `None` if it holds no live tickets.
pub fn prove(ledger: &TicketLedger, participant: &str) -> Option<EligibilityProof> {
    let ranges = ledger.ranges();
    let index = ranges.iter().position(|r| r.participant == participant)?;
    let tree = MerkleTree::from_ranges(&ranges);
    let TicketRange {
        participant,
        cumulative_start,
        cumulative_end,
        ..
    } = ranges[index].clone();

    Some(EligibilityProof {
        participant,
        cumulative_start,
        cumulative_end,
        proof: tree.proof(index)?,
    })
}

fn check_hash(field: &str, value: &str) -> Result<(), RaffleError> {
    match hex::decode(value) {
        Ok(bytes) if bytes.len() == 32 => Ok(()),
        _ => Err(RaffleError::InvalidHex {
            field: field.to_string(),
        }),
    }
}

/// Check a proof against a published root. Malformed hex is an error rather than a
/// plain mismatch.
pub fn verify(root_hex: &str, proof: &EligibilityProof) -> Result<bool, RaffleError> {
    check_hash("root", root_hex)?;
    for (i, sibling) in proof.proof.iter().enumerate() {
        check_hash(&format!("proof[{}]", i), sibling)?;
    }

    let leaf = compute_leaf_hash(&proof.participant, proof.cumulative_start, proof.cumulative_end);
    Ok(verify_merkle_proof(root_hex, &proof.proof, &leaf))
}
