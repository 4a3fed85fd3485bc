use alloy::primitives::B256;

/// Errors raised by the indexing core.
///
/// The integrity variants (`DerivationMismatch`, `ConflictingQuestionData`,
/// `CatalogConflict`) are recorded against the entity that produced them and
/// exclude that entity from further trust; they never abort ingestion of the
/// rest of the feed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    #[error("condition id mismatch for question {question_id}: event reports {reported}, recomputed {derived}")]
    DerivationMismatch {
        question_id: B256,
        reported: B256,
        derived: B256,
    },

    #[error("conflicting QuestionPrepared payloads for question {question_id}: {field} differs")]
    ConflictingQuestionData {
        question_id: B256,
        field: &'static str,
    },

    #[error("catalog conflict on {table} row {key}: {field} differs from stored value")]
    CatalogConflict {
        table: &'static str,
        key: String,
        field: &'static str,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("question {question_id} still pending after {elapsed_secs}s, marked unresolvable")]
    Unresolvable {
        question_id: B256,
        elapsed_secs: u64,
    },
}

impl IndexError {
    /// Metric label for the taxonomy branch, used by the pipeline counters.
    pub fn kind(&self) -> &'static str {
        match self {
            IndexError::DerivationMismatch { .. } => "derivation_mismatch",
            IndexError::ConflictingQuestionData { .. } => "conflicting_question_data",
            IndexError::CatalogConflict { .. } => "catalog_conflict",
            IndexError::InvalidInput(_) => "invalid_input",
            IndexError::Unresolvable { .. } => "unresolvable",
        }
    }
}
