//! Normalized catalog: the externally visible product of the indexer.
//!
//! Two tables — questions and assets — with point-query lookups in both
//! directions. Writes are upserts with strict semantics: content-identical
//! writes are no-ops, monotonic enrichment of a pending row is permitted,
//! anything else is a `CatalogConflict` (silent overwrites would mask
//! indexing bugs upstream).

use std::collections::HashMap;

use alloy::primitives::{Address, B256};
use serde::Serialize;

use crate::errors::IndexError;
use crate::models::{Asset, Outcome, Question, QuestionState};

/// What an upsert did, so the pipeline only writes real changes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

/// Denormalized market context for one asset id — the answer to "what does
/// this opaque token represent?".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetContext {
    pub asset_id: String,
    pub question_id: B256,
    pub market_id: Option<B256>,
    pub description: Option<String>,
    pub outcome: Outcome,
    pub slot_index: u32,
    pub condition_id: B256,
    pub oracle: Address,
    pub state: QuestionState,
}

#[derive(Debug, Default)]
pub struct Catalog {
    questions: HashMap<B256, Question>,
    assets: HashMap<String, Asset>,
    assets_by_question: HashMap<B256, Vec<String>>,
}

fn state_rank(state: QuestionState) -> u8 {
    match state {
        QuestionState::Pending => 0,
        QuestionState::Unresolvable => 1,
        QuestionState::Resolved => 2,
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    pub fn question(&self, question_id: &B256) -> Option<&Question> {
        self.questions.get(question_id)
    }

    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.questions.values()
    }

    /// Upsert one question row. `Unchanged` on identical content, `Updated`
    /// when a pending row is enriched (absent fields filled in, state moved
    /// forward), `CatalogConflict` when stored content would be rewritten.
    pub fn upsert_question(&mut self, question: Question) -> Result<UpsertOutcome, IndexError> {
        let Some(existing) = self.questions.get_mut(&question.question_id) else {
            self.questions.insert(question.question_id, question);
            return Ok(UpsertOutcome::Inserted);
        };

        let key = question.question_id.to_string();
        let conflict = |field: &'static str| IndexError::CatalogConflict {
            table: "questions",
            key: key.clone(),
            field,
        };

        if existing.oracle != question.oracle {
            return Err(conflict("oracle"));
        }
        if existing.condition_id != question.condition_id {
            return Err(conflict("condition_id"));
        }
        if existing.outcome_slot_count != question.outcome_slot_count {
            return Err(conflict("outcome_slot_count"));
        }
        if existing.market_type != question.market_type {
            return Err(conflict("market_type"));
        }

        let mut changed = false;
        changed |= merge_field(&mut existing.market_id, question.market_id)
            .map_err(|_| conflict("market_id"))?;
        changed |= merge_field(&mut existing.description, question.description)
            .map_err(|_| conflict("description"))?;
        changed |= merge_field(&mut existing.question_index, question.question_index)
            .map_err(|_| conflict("question_index"))?;

        if question.state != existing.state {
            if state_rank(question.state) < state_rank(existing.state) {
                return Err(conflict("state"));
            }
            existing.state = question.state;
            changed = true;
        }

        Ok(if changed { UpsertOutcome::Updated } else { UpsertOutcome::Unchanged })
    }

    /// Upsert one asset row. The owning question must already exist — an
    /// orphan asset is an upstream ordering bug, not valid catalog state.
    pub fn upsert_asset(&mut self, asset: Asset) -> Result<UpsertOutcome, IndexError> {
        if !self.questions.contains_key(&asset.question_id) {
            return Err(IndexError::InvalidInput(format!(
                "asset {} references unknown question {}",
                asset.asset_id, asset.question_id
            )));
        }

        if let Some(existing) = self.assets.get_mut(&asset.asset_id) {
            let conflict = |field: &'static str| IndexError::CatalogConflict {
                table: "assets",
                key: asset.asset_id.clone(),
                field,
            };

            if existing.question_id != asset.question_id {
                return Err(conflict("question_id"));
            }
            if existing.slot_index != asset.slot_index {
                return Err(conflict("slot_index"));
            }
            if existing.collateral_token != asset.collateral_token {
                return Err(conflict("collateral_token"));
            }
            if existing.parent_collection_id != asset.parent_collection_id {
                return Err(conflict("parent_collection_id"));
            }

            return match (existing.outcome, asset.outcome) {
                (a, b) if a == b => Ok(UpsertOutcome::Unchanged),
                // Labeling an unknown outcome is the one permitted enrichment.
                (Outcome::Unknown, _) => {
                    existing.outcome = asset.outcome;
                    Ok(UpsertOutcome::Updated)
                }
                // A labeled outcome never silently flips or un-labels.
                (_, Outcome::Unknown) => Ok(UpsertOutcome::Unchanged),
                _ => Err(conflict("outcome")),
            };
        }

        let question_id = asset.question_id;
        let asset_id = asset.asset_id.clone();
        self.assets.insert(asset_id.clone(), asset);
        let assets = &self.assets;
        let siblings = self.assets_by_question.entry(question_id).or_default();
        siblings.push(asset_id);
        siblings.sort_by_key(|id| assets.get(id).map(|a| a.slot_index).unwrap_or(u32::MAX));
        Ok(UpsertOutcome::Inserted)
    }

    /// Retract a question and everything that hangs off it (reorg path).
    pub fn remove_question(&mut self, question_id: &B256) -> Option<(Question, Vec<Asset>)> {
        let question = self.questions.remove(question_id)?;
        let asset_ids = self.assets_by_question.remove(question_id).unwrap_or_default();
        let assets = asset_ids
            .into_iter()
            .filter_map(|id| self.assets.remove(&id))
            .collect();
        Some((question, assets))
    }

    /// Point lookup: asset id → full denormalized market context.
    pub fn asset_context(&self, asset_id: &str) -> Option<AssetContext> {
        let asset = self.assets.get(asset_id)?;
        let question = self.questions.get(&asset.question_id)?;
        Some(AssetContext {
            asset_id: asset.asset_id.clone(),
            question_id: question.question_id,
            market_id: question.market_id,
            description: question.description.clone(),
            outcome: asset.outcome,
            slot_index: asset.slot_index,
            condition_id: question.condition_id,
            oracle: question.oracle,
            state: question.state,
        })
    }

    /// Point lookup: question id → sibling assets ordered by slot index.
    /// Empty when the question is unknown or has no registered assets.
    pub fn question_assets(&self, question_id: &B256) -> Vec<&Asset> {
        self.assets_by_question
            .get(question_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.assets.get(id))
            .collect()
    }
}

/// Merge an optional field: filling in an absent value is enrichment, an
/// absent incoming value leaves the stored one alone, and two differing
/// present values are a conflict.
fn merge_field<T: PartialEq>(existing: &mut Option<T>, incoming: Option<T>) -> Result<bool, ()> {
    match (existing.as_ref(), incoming) {
        (_, None) => Ok(false),
        (None, Some(value)) => {
            *existing = Some(value);
            Ok(true)
        }
        (Some(old), Some(new)) => {
            if *old == new {
                Ok(false)
            } else {
                Err(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, b256};
    use crate::models::MarketType;

    const QID: B256 =
        b256!("0cb37cfe26e53cf4ed4edb0dfd3c88379ddaab9244aed0ac64ea1ecfb050b900");
    const COND: B256 =
        b256!("383f8266f40728c7b01e2f1fdf6bf36838b74329e6b3b4c05a616aa966a988a2");

    fn pending_question() -> Question {
        Question {
            question_id: QID,
            market_id: None,
            market_type: MarketType::NegRisk,
            description: None,
            question_index: None,
            oracle: address!("d91e80cf2e7be2e162c6513ced06f1dd0da35296"),
            condition_id: COND,
            outcome_slot_count: 2,
            state: QuestionState::Pending,
        }
    }

    fn resolved_question() -> Question {
        Question {
            market_id: Some(b256!(
                "0cb37cfe26e53cf4ed4edb0dfd3c88379ddaab9244aed0ac64ea1ecfb050b900"
            )),
            description: Some("Will the incumbent win the 2026 election?".into()),
            question_index: Some(0),
            state: QuestionState::Resolved,
            ..pending_question()
        }
    }

    fn asset(slot: u32) -> Asset {
        Asset {
            asset_id: format!("1000{slot}"),
            question_id: QID,
            outcome: Outcome::Unknown,
            slot_index: slot,
            collateral_token: address!("2791bca1f2de4661ed88a30c99a7a9449aa84174"),
            parent_collection_id: B256::ZERO,
        }
    }

    #[test]
    fn test_identical_upsert_is_noop() {
        let mut catalog = Catalog::new();
        assert_eq!(
            catalog.upsert_question(resolved_question()).unwrap(),
            UpsertOutcome::Inserted
        );
        assert_eq!(
            catalog.upsert_question(resolved_question()).unwrap(),
            UpsertOutcome::Unchanged
        );
        assert_eq!(catalog.question_count(), 1);
    }

    #[test]
    fn test_pending_row_enriches_to_resolved() {
        let mut catalog = Catalog::new();
        catalog.upsert_question(pending_question()).unwrap();
        assert_eq!(
            catalog.upsert_question(resolved_question()).unwrap(),
            UpsertOutcome::Updated
        );
        let stored = catalog.question(&QID).unwrap();
        assert_eq!(stored.state, QuestionState::Resolved);
        assert!(stored.description.is_some());
    }

    #[test]
    fn test_differing_description_is_conflict() {
        let mut catalog = Catalog::new();
        catalog.upsert_question(resolved_question()).unwrap();
        let mut rewrite = resolved_question();
        rewrite.description = Some("a different question entirely".into());
        let err = catalog.upsert_question(rewrite).unwrap_err();
        assert_eq!(err.kind(), "catalog_conflict");
        // First version retained.
        assert_eq!(
            catalog.question(&QID).unwrap().description.as_deref(),
            Some("Will the incumbent win the 2026 election?")
        );
    }

    #[test]
    fn test_resolved_never_regresses_to_pending() {
        let mut catalog = Catalog::new();
        catalog.upsert_question(resolved_question()).unwrap();
        let err = catalog.upsert_question(pending_question()).unwrap_err();
        assert_eq!(err.kind(), "catalog_conflict");
    }

    #[test]
    fn test_orphan_asset_rejected() {
        let mut catalog = Catalog::new();
        let err = catalog.upsert_asset(asset(0)).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn test_asset_outcome_labels_once() {
        let mut catalog = Catalog::new();
        catalog.upsert_question(pending_question()).unwrap();
        catalog.upsert_asset(asset(0)).unwrap();

        let mut labeled = asset(0);
        labeled.outcome = Outcome::Yes;
        assert_eq!(catalog.upsert_asset(labeled).unwrap(), UpsertOutcome::Updated);

        // Unknown never un-labels.
        assert_eq!(catalog.upsert_asset(asset(0)).unwrap(), UpsertOutcome::Unchanged);

        let mut flipped = asset(0);
        flipped.outcome = Outcome::No;
        assert!(catalog.upsert_asset(flipped).is_err());
    }

    #[test]
    fn test_lookups_join_both_directions() {
        let mut catalog = Catalog::new();
        catalog.upsert_question(resolved_question()).unwrap();
        catalog.upsert_asset(asset(1)).unwrap();
        catalog.upsert_asset(asset(0)).unwrap();

        let context = catalog.asset_context("10001").unwrap();
        assert_eq!(context.question_id, QID);
        assert_eq!(context.slot_index, 1);
        assert_eq!(
            context.description.as_deref(),
            Some("Will the incumbent win the 2026 election?")
        );

        let siblings = catalog.question_assets(&QID);
        assert_eq!(siblings.len(), 2);
        // Ordered by slot index regardless of insertion order.
        assert_eq!(siblings[0].slot_index, 0);
        assert_eq!(siblings[1].slot_index, 1);

        assert!(catalog.asset_context("999").is_none());
        assert!(catalog.question_assets(&B256::ZERO).is_empty());
    }

    #[test]
    fn test_remove_question_cascades_assets() {
        let mut catalog = Catalog::new();
        catalog.upsert_question(resolved_question()).unwrap();
        catalog.upsert_asset(asset(0)).unwrap();
        catalog.upsert_asset(asset(1)).unwrap();

        let (question, assets) = catalog.remove_question(&QID).unwrap();
        assert_eq!(question.question_id, QID);
        assert_eq!(assets.len(), 2);
        assert_eq!(catalog.question_count(), 0);
        assert_eq!(catalog.asset_count(), 0);
        assert!(catalog.asset_context("10000").is_none());
    }
}
