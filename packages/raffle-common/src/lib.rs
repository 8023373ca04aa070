pub mod merkle;
pub mod types;

pub use merkle::{compute_leaf_hash, verify_merkle_proof, MerkleTree};
pub use types::{DrawOutcome, EligibilityRecord, GiveawayKind, ParticipantId, TicketRange};
