use indexmap::IndexMap;
use raffle_common::types::{EligibilityRecord, ParticipantId, TicketRange};

/// The mutable draw substrate: participant weights in insertion order plus their running total.
///
/// Winners removed in unique mode keep their slot with weight 0, so scan order never changes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TicketLedger {
    tickets: IndexMap<ParticipantId, f64>,
    total_weight: f64,
}

impl TicketLedger {
    pub fn from_records(records: &[EligibilityRecord]) -> Self {
        let mut ledger = Self::default();
        for record in records {
            *ledger.tickets.entry(record.participant.clone()).or_insert(0.0) += record.weight;
        }
        ledger.total_weight = ledger.live_sum();
        ledger
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// (participant, weight) in insertion order, zeroed entries included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.tickets.iter().map(|(p, w)| (p.as_str(), *w))
    }

    pub fn weight_of(&self, participant: &str) -> Option<f64> {
        self.tickets.get(participant).copied()
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    /// Participants that can still win.
    pub fn live_count(&self) -> usize {
        self.tickets.values().filter(|w| **w > 0.0).count()
    }

    /// Sum of weights accumulated in scan order, so it matches the scan's final cumulative exactly.
    fn live_sum(&self) -> f64 {
        self.tickets.values().fold(0.0, |total, w| total + w)
    }

    /// Set a participant's weight to 0 and recompute the total from the remaining weights.
    ///
    /// Returns the weight removed; `None` for unknown or already-zeroed participants,
    /// which leaves the total untouched.
    pub fn zero_out(&mut self, participant: &str) -> Option<f64> {
        let weight = self.tickets.get_mut(participant)?;
        if *weight == 0.0 {
            return None;
        }
        let removed = std::mem::replace(weight, 0.0);
        self.total_weight = self.live_sum();
        Some(removed)
    }

    /// Cumulative ticket ranges of live participants, in scan order.
    pub fn ranges(&self) -> Vec<TicketRange> {
        let mut cumulative = 0.0;
        self.iter()
            .filter(|(_, weight)| *weight > 0.0)
            .map(|(participant, weight)| {
                let start = cumulative;
                cumulative += weight;
                TicketRange {
                    participant: participant.to_string(),
                    weight,
                    cumulative_start: start,
                    cumulative_end: cumulative,
                }
            })
            .collect()
    }
}
