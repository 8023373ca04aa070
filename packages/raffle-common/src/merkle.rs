use sha2::{Digest, Sha256};

use crate::types::TicketRange;

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

/// Compute the leaf hash for one participant's ticket range.
///
/// `leaf_hash = sha256( 0x00 || participant_bytes || cumulative_start_f64_be || cumulative_end_f64_be )`
///
/// The participant is hashed as the raw identifier string, before any address conversion.
pub fn compute_leaf_hash(participant: &str, cumulative_start: f64, cumulative_end: f64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(participant.as_bytes());
    hasher.update(cumulative_start.to_be_bytes());
    hasher.update(cumulative_end.to_be_bytes());
    hasher.finalize().into()
}

fn hash_pair(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([NODE_PREFIX]);
    // Sorted pair hashing: smaller value first
    if a.as_slice() <= b.as_slice() {
        hasher.update(a);
        hasher.update(b);
    } else {
        hasher.update(b);
        hasher.update(a);
    }
    hasher.finalize().into()
}

/// Verify a Merkle proof against a known root.
///
/// Uses sorted-pair hashing: for each sibling in the proof,
/// if current <= sibling then hash(current || sibling), else hash(sibling || current).
///
/// Root and siblings are 32-byte hashes represented as hex strings.
pub fn verify_merkle_proof(root_hex: &str, proof_hex: &[String], leaf_hash: &[u8; 32]) -> bool {
    let expected_root = match hex::decode(root_hex) {
        Ok(v) => v,
        Err(_) => return false,
    };
    if expected_root.len() != 32 {
        return false;
    }

    let mut current = *leaf_hash;

    for sibling_hex in proof_hex {
        let sibling: [u8; 32] = match hex::decode(sibling_hex).map(<[u8; 32]>::try_from) {
            Ok(Ok(v)) => v,
            _ => return false,
        };
        current = hash_pair(&current, &sibling);
    }

    current.as_slice() == expected_root.as_slice()
}

/// Sorted-pair Merkle tree over ticket-range leaves.
///
/// An odd node at the end of a level is carried up unchanged.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    levels: Vec<Vec<[u8; 32]>>,
}

impl MerkleTree {
    pub fn from_leaves(leaves: Vec<[u8; 32]>) -> Self {
        let mut levels = vec![leaves];
        while levels.last().map_or(false, |level| level.len() > 1) {
            let next: Vec<[u8; 32]> = levels[levels.len() - 1]
                .chunks(2)
                .map(|pair| match pair {
                    [a, b] => hash_pair(a, b),
                    [single] => *single,
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                })
                .collect();
            levels.push(next);
        }
        Self { levels }
    }

    pub fn from_ranges(ranges: &[TicketRange]) -> Self {
        Self::from_leaves(
            ranges
                .iter()
                .map(|r| compute_leaf_hash(&r.participant, r.cumulative_start, r.cumulative_end))
                .collect(),
        )
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Hex root; 32 zero bytes for an empty tree.
    pub fn root_hex(&self) -> String {
        let root = self
            .levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or([0u8; 32]);
        hex::encode(root)
    }

    /// Sibling hashes from the leaf at `index` up to the root.
    pub fn proof(&self, index: usize) -> Option<Vec<String>> {
        if index >= self.leaf_count() {
            return None;
        }
        let mut proof = Vec::new();
        let mut idx = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = idx ^ 1;
            if let Some(node) = level.get(sibling) {
                proof.push(hex::encode(node));
            }
            idx /= 2;
        }
        Some(proof)
    }
}
