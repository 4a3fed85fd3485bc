use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// A governed outcome space: an oracle, the question it will answer, and a
/// fixed number of mutually exclusive outcome slots.
///
/// `condition_id` is always the recomputed value, never the one reported by
/// the preparing event — the two are compared before a `Condition` is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub condition_id: B256,
    pub oracle: Address,
    pub question_id: B256,
    pub outcome_slot_count: u32,
}
