use std::fmt;

use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// Real-world truth label of one outcome slot. On-chain events alone cannot
/// distinguish Yes from No, so assets stay `Unknown` until an
/// `OutcomeLabeler` supplies ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Yes,
    No,
    Unknown,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Yes => "YES",
            Outcome::No => "NO",
            Outcome::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the assets table. `asset_id` is the ERC-1155 position id in
/// its canonical decimal-string form — the same representation exchanges and
/// order books use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub asset_id: String,
    pub question_id: B256,
    pub outcome: Outcome,
    pub slot_index: u32,
    pub collateral_token: Address,
    pub parent_collection_id: B256,
}
