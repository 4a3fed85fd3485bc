use std::fmt;

use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// Market family a question belongs to. Only the NegRisk family is indexed
/// today; plain CTF markets would slot in as a second variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketType {
    NegRisk,
}

impl MarketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketType::NegRisk => "NEGRISK",
        }
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolution progress of a question.
///
/// Transitions move forward only: `Pending → Resolved`, or
/// `Pending → Unresolvable` on timeout (late evidence may still resolve an
/// unresolvable question). The only way back is a reorg retraction, which
/// removes the question entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionState {
    Pending,
    Resolved,
    Unresolvable,
}

impl QuestionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionState::Pending => "pending",
            QuestionState::Resolved => "resolved",
            QuestionState::Unresolvable => "unresolvable",
        }
    }
}

impl fmt::Display for QuestionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the questions table.
///
/// `market_id`, `description` and `question_index` stay `None` until the
/// matching `QuestionPrepared` evidence is observed; the condition-derived
/// fields are present from the moment the row exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question_id: B256,
    pub market_id: Option<B256>,
    pub market_type: MarketType,
    pub description: Option<String>,
    pub question_index: Option<u32>,
    pub oracle: Address,
    pub condition_id: B256,
    pub outcome_slot_count: u32,
    pub state: QuestionState,
}
