//! Market graph resolver.
//!
//! Correlates the event families two contracts emit — condition preparation
//! on the conditional-tokens contract, question preparation on the NegRisk
//! oracle, splits and ERC-1155 mints — into one verified chain per question:
//! mint/split -> condition -> question -> market grouping.
//!
//! Every correlation is proven by recomputing the protocol identifiers
//! (`crate::derive`), never assumed from shared keys alone. Per-question
//! state lives in independent map entries and is applied in arrival order;
//! order-insensitivity comes from re-scanning the event store for earlier
//! evidence the moment a condition is first verified.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::{Address, B256};

use crate::derive;
use crate::errors::IndexError;
use crate::models::{
    Asset, Condition, DecodedEvent, EventKey, MarketType, Outcome, Question, QuestionState,
};
use crate::store::EventStore;

pub const EVENT_CONDITION_PREPARATION: &str = "ConditionPreparation";
pub const EVENT_QUESTION_PREPARED: &str = "QuestionPrepared";
pub const EVENT_POSITION_SPLIT: &str = "PositionSplit";
pub const EVENT_TRANSFER_SINGLE: &str = "TransferSingle";
pub const EVENT_TRANSFER_BATCH: &str = "TransferBatch";

/// Maps an outcome slot of a condition to its real-world truth label.
///
/// The canonical slot→truth mapping is not recoverable from the events this
/// indexer consumes, so labeling stays a pluggable capability supplied by an
/// oracle/settlement collaborator. `None` leaves the asset `Unknown`.
pub trait OutcomeLabeler: Send + Sync {
    fn label(&self, condition_id: B256, slot_index: u32) -> Option<Outcome>;
}

/// Labeler that never labels.
pub struct NullLabeler;

impl OutcomeLabeler for NullLabeler {
    fn label(&self, _condition_id: B256, _slot_index: u32) -> Option<Outcome> {
        None
    }
}

/// Table-driven labeler fed from operator-supplied ground truth.
#[derive(Default)]
pub struct StaticLabeler {
    labels: HashMap<(B256, u32), Outcome>,
}

impl StaticLabeler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, condition_id: B256, slot_index: u32, outcome: Outcome) {
        self.labels.insert((condition_id, slot_index), outcome);
    }
}

impl OutcomeLabeler for StaticLabeler {
    fn label(&self, condition_id: B256, slot_index: u32) -> Option<Outcome> {
        self.labels.get(&(condition_id, slot_index)).copied()
    }
}

/// A catalog write produced by applying events.
#[derive(Debug, Clone)]
pub enum CatalogUpdate {
    Question(Question),
    Asset(Asset),
}

/// Everything one `apply` produced: rows to upsert and faults to surface.
#[derive(Debug, Default)]
pub struct ApplyOutcome {
    pub updates: Vec<CatalogUpdate>,
    pub faults: Vec<IndexError>,
}

/// The question-side payload once a `QuestionPrepared` has been accepted.
#[derive(Debug, Clone)]
struct PreparedPayload {
    key: EventKey,
    timestamp: u64,
    market_id: B256,
    question_index: u32,
    description: String,
}

struct QuestionRecord {
    condition: Condition,
    first_seen: u64,
    prepared: Option<PreparedPayload>,
    earliest_mint: Option<u64>,
    state: QuestionState,
    assets: Vec<Asset>,
}

pub struct MarketGraphResolver {
    collateral_token: Address,
    resolution_timeout_secs: u64,
    labeler: Arc<dyn OutcomeLabeler>,
    questions: HashMap<B256, QuestionRecord>,
    by_condition: HashMap<B256, B256>,
    asset_index: HashMap<String, B256>,
    faults: Vec<IndexError>,
}

impl MarketGraphResolver {
    pub fn new(
        collateral_token: Address,
        resolution_timeout_secs: u64,
        labeler: Arc<dyn OutcomeLabeler>,
    ) -> Self {
        Self {
            collateral_token,
            resolution_timeout_secs,
            labeler,
            questions: HashMap::new(),
            by_condition: HashMap::new(),
            asset_index: HashMap::new(),
            faults: Vec::new(),
        }
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn question_state(&self, question_id: &B256) -> Option<QuestionState> {
        self.questions.get(question_id).map(|r| r.state)
    }

    /// Integrity faults recorded so far, in observation order.
    pub fn faults(&self) -> &[IndexError] {
        &self.faults
    }

    /// Apply one event in arrival order. The event is expected to already be
    /// in `store`; the store is also consulted for earlier evidence when a
    /// condition is first verified.
    pub fn apply(&mut self, event: &DecodedEvent, store: &EventStore) -> ApplyOutcome {
        let mut out = ApplyOutcome::default();
        let result = match event.event_name.as_str() {
            EVENT_CONDITION_PREPARATION => self.on_condition_preparation(event, store, &mut out),
            EVENT_QUESTION_PREPARED => self.on_question_prepared(event, &mut out),
            EVENT_POSITION_SPLIT => self.on_position_split(event),
            EVENT_TRANSFER_SINGLE | EVENT_TRANSFER_BATCH => self.on_transfer(event),
            // Other families are buffered in the store but carry no signal.
            _ => Ok(()),
        };
        if let Err(fault) = result {
            tracing::warn!(
                error = %fault,
                event = %event.event_name,
                block = event.block_number,
                log_index = event.log_index,
                "event rejected"
            );
            self.faults.push(fault.clone());
            out.faults.push(fault);
        }
        out
    }

    /// Promote questions stuck in `Pending` past the resolution timeout to
    /// `Unresolvable` — reported for operator attention, never fatal, and
    /// still resolvable should late evidence arrive.
    pub fn sweep_unresolvable(&mut self, horizon_ts: u64) -> ApplyOutcome {
        let mut out = ApplyOutcome::default();
        if self.resolution_timeout_secs == 0 {
            return out;
        }
        for record in self.questions.values_mut() {
            if record.state != QuestionState::Pending {
                continue;
            }
            let elapsed = horizon_ts.saturating_sub(record.first_seen);
            if elapsed >= self.resolution_timeout_secs {
                record.state = QuestionState::Unresolvable;
                let fault = IndexError::Unresolvable {
                    question_id: record.condition.question_id,
                    elapsed_secs: elapsed,
                };
                tracing::warn!(
                    question_id = %record.condition.question_id,
                    elapsed_secs = elapsed,
                    "question marked unresolvable"
                );
                self.faults.push(fault.clone());
                out.faults.push(fault);
                out.updates.push(CatalogUpdate::Question(question_row(record)));
            }
        }
        out
    }

    /// Question ids whose derived state rests on any of `events`; used by
    /// reorg invalidation to size the retraction cascade before replay.
    pub fn affected_questions(&self, events: &[DecodedEvent]) -> Vec<B256> {
        let mut question_ids: Vec<B256> = Vec::new();
        let mut push = |qid: B256, acc: &mut Vec<B256>| {
            if !acc.contains(&qid) {
                acc.push(qid);
            }
        };
        for event in events {
            match event.event_name.as_str() {
                EVENT_CONDITION_PREPARATION | EVENT_QUESTION_PREPARED => {
                    if let Ok(qid) = event.param_b256("questionId") {
                        push(qid, &mut question_ids);
                    }
                }
                EVENT_POSITION_SPLIT => {
                    if let Some(qid) = event
                        .param_b256("conditionId")
                        .ok()
                        .and_then(|c| self.by_condition.get(&c).copied())
                    {
                        push(qid, &mut question_ids);
                    }
                }
                EVENT_TRANSFER_SINGLE => {
                    if let Some(qid) = event
                        .param_u256("id")
                        .ok()
                        .and_then(|id| self.asset_index.get(&id.to_string()).copied())
                    {
                        push(qid, &mut question_ids);
                    }
                }
                EVENT_TRANSFER_BATCH => {
                    for id in event.param_u256_array("ids").unwrap_or_default() {
                        if let Some(qid) = self.asset_index.get(&id.to_string()).copied() {
                            push(qid, &mut question_ids);
                        }
                    }
                }
                _ => {}
            }
        }
        question_ids
    }

    /// Drop the derived state of the given questions (reorg retraction).
    /// The caller retracts the matching catalog rows and replays surviving
    /// evidence afterwards.
    pub fn retract_questions(&mut self, question_ids: &[B256]) {
        for question_id in question_ids {
            if let Some(record) = self.questions.remove(question_id) {
                self.by_condition.remove(&record.condition.condition_id);
                for asset in &record.assets {
                    self.asset_index.remove(&asset.asset_id);
                }
                tracing::info!(question_id = %question_id, "question retracted");
            }
        }
    }

    fn on_condition_preparation(
        &mut self,
        event: &DecodedEvent,
        store: &EventStore,
        out: &mut ApplyOutcome,
    ) -> Result<(), IndexError> {
        let reported = event.param_b256("conditionId")?;
        let oracle = event.param_address("oracle")?;
        let question_id = event.param_b256("questionId")?;
        let slot_count = event.param_u32("outcomeSlotCount")?;

        // Never trust the reported id; prove it.
        let condition_id = derive::verify_condition_id(reported, oracle, question_id, slot_count)?;

        if let Some(record) = self.questions.get(&question_id) {
            if record.condition.condition_id == condition_id {
                // Redelivered preparation, idempotent.
                return Ok(());
            }
            return Err(IndexError::ConflictingQuestionData {
                question_id,
                field: "condition_id",
            });
        }

        tracing::info!(
            question_id = %question_id,
            condition_id = %condition_id,
            oracle = %oracle,
            slots = slot_count,
            "condition verified"
        );

        // The full outcome set is derivable the moment the condition is
        // known; register every slot's asset up front.
        let mut assets = Vec::with_capacity(slot_count as usize);
        for slot in 0..slot_count {
            let collection =
                derive::collection_id(B256::ZERO, condition_id, derive::slot_index_set(slot))?;
            let asset_id = derive::position_id(self.collateral_token, collection).to_string();
            let outcome = self
                .labeler
                .label(condition_id, slot)
                .unwrap_or(Outcome::Unknown);
            assets.push(Asset {
                asset_id,
                question_id,
                outcome,
                slot_index: slot,
                collateral_token: self.collateral_token,
                parent_collection_id: B256::ZERO,
            });
        }

        let mut record = QuestionRecord {
            condition: Condition {
                condition_id,
                oracle,
                question_id,
                outcome_slot_count: slot_count,
            },
            first_seen: event.block_timestamp,
            prepared: None,
            earliest_mint: earliest_mint_in(store, condition_id, &assets),
            state: QuestionState::Pending,
            assets,
        };

        // Pick up question evidence delivered before its condition.
        for candidate in scan_prepared(store, oracle, question_id, record.earliest_mint) {
            if let Err(fault) = merge_prepared(&mut record, candidate) {
                tracing::warn!(error = %fault, "buffered question evidence conflicts");
                self.faults.push(fault.clone());
                out.faults.push(fault);
            }
        }

        out.updates.push(CatalogUpdate::Question(question_row(&record)));
        for asset in &record.assets {
            self.asset_index.insert(asset.asset_id.clone(), question_id);
            out.updates.push(CatalogUpdate::Asset(asset.clone()));
        }

        self.by_condition.insert(condition_id, question_id);
        self.questions.insert(question_id, record);
        Ok(())
    }

    fn on_question_prepared(
        &mut self,
        event: &DecodedEvent,
        out: &mut ApplyOutcome,
    ) -> Result<(), IndexError> {
        let question_id = event.param_b256("questionId")?;
        let market_id = event.param_b256("marketId")?;
        let question_index = event.param_u32("index")?;
        let data = event.param_bytes("data")?;

        let emitter = event.contract_address;
        let Some(record) = self.questions.get_mut(&question_id) else {
            // Condition not verified yet; the store scan picks this up later.
            tracing::debug!(question_id = %question_id, "question evidence precedes its condition");
            return Ok(());
        };
        if record.condition.oracle != emitter {
            tracing::debug!(
                question_id = %question_id,
                emitter = %emitter,
                oracle = %record.condition.oracle,
                "QuestionPrepared from non-oracle emitter ignored"
            );
            return Ok(());
        }
        if let Some(mint_ts) = record.earliest_mint {
            // The question must exist before tokens referencing its
            // condition can be minted.
            if event.block_timestamp > mint_ts {
                tracing::warn!(
                    question_id = %question_id,
                    prepared_ts = event.block_timestamp,
                    earliest_mint_ts = mint_ts,
                    "QuestionPrepared postdates the earliest mint, ignored"
                );
                return Ok(());
            }
        }

        let candidate = PreparedPayload {
            key: event.key(),
            timestamp: event.block_timestamp,
            market_id,
            question_index,
            description: String::from_utf8_lossy(&data).into_owned(),
        };

        let was_unprepared = record.prepared.is_none();
        let result = merge_prepared(record, candidate);
        if was_unprepared && record.prepared.is_some() {
            tracing::info!(
                question_id = %question_id,
                market_id = %market_id,
                index = question_index,
                "question resolved"
            );
            out.updates.push(CatalogUpdate::Question(question_row(record)));
        }
        result
    }

    fn on_position_split(&mut self, event: &DecodedEvent) -> Result<(), IndexError> {
        let condition_id = event.param_b256("conditionId")?;

        if let Ok(token) = event.param_address("collateralToken") {
            if token != self.collateral_token {
                tracing::warn!(
                    reported = %token,
                    configured = %self.collateral_token,
                    condition_id = %condition_id,
                    "split reports an unexpected collateral token"
                );
            }
        }

        let Some(question_id) = self.by_condition.get(&condition_id).copied() else {
            return Ok(());
        };
        if let Some(record) = self.questions.get_mut(&question_id) {
            anchor_mint(record, event.block_timestamp, question_id);
        }
        Ok(())
    }

    fn on_transfer(&mut self, event: &DecodedEvent) -> Result<(), IndexError> {
        let from = event.param_address("from")?;
        if from != Address::ZERO {
            // Only mints anchor asset creation; secondary transfers carry
            // no catalog signal.
            return Ok(());
        }
        let ids = if event.event_name == EVENT_TRANSFER_SINGLE {
            vec![event.param_u256("id")?]
        } else {
            event.param_u256_array("ids")?
        };
        for id in ids {
            if let Some(question_id) = self.asset_index.get(&id.to_string()).copied() {
                if let Some(record) = self.questions.get_mut(&question_id) {
                    anchor_mint(record, event.block_timestamp, question_id);
                }
            }
        }
        Ok(())
    }
}

fn anchor_mint(record: &mut QuestionRecord, timestamp: u64, question_id: B256) {
    record.earliest_mint = Some(
        record
            .earliest_mint
            .map_or(timestamp, |current| current.min(timestamp)),
    );
    if let Some(prepared) = &record.prepared {
        if prepared.timestamp > timestamp {
            tracing::warn!(
                question_id = %question_id,
                "accepted question evidence postdates a newly observed mint"
            );
        }
    }
}

/// Earliest split/mint timestamp for a condition already present in the
/// store — evidence that may have been delivered before the condition was.
fn earliest_mint_in(store: &EventStore, condition_id: B256, assets: &[Asset]) -> Option<u64> {
    let mut earliest: Option<u64> = None;
    let mut fold = |ts: u64| {
        earliest = Some(earliest.map_or(ts, |current| current.min(ts)));
    };
    for event in store.by_name(EVENT_POSITION_SPLIT) {
        if event.param_b256("conditionId").ok() == Some(condition_id) {
            fold(event.block_timestamp);
        }
    }
    for name in [EVENT_TRANSFER_SINGLE, EVENT_TRANSFER_BATCH] {
        for event in store.by_name(name) {
            if event.param_address("from").ok() != Some(Address::ZERO) {
                continue;
            }
            let ids = if name == EVENT_TRANSFER_SINGLE {
                event.param_u256("id").map(|id| vec![id]).unwrap_or_default()
            } else {
                event.param_u256_array("ids").unwrap_or_default()
            };
            let minted: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
            if assets.iter().any(|a| minted.contains(&a.asset_id)) {
                fold(event.block_timestamp);
            }
        }
    }
    earliest
}

/// Buffered `QuestionPrepared` candidates for `(oracle, question_id)` in
/// chain order, respecting the earliest-mint constraint.
fn scan_prepared(
    store: &EventStore,
    oracle: Address,
    question_id: B256,
    earliest_mint: Option<u64>,
) -> Vec<PreparedPayload> {
    store
        .by_name(EVENT_QUESTION_PREPARED)
        .filter(|event| event.contract_address == oracle)
        .filter(|event| event.param_b256("questionId").ok() == Some(question_id))
        .filter(|event| earliest_mint.map_or(true, |ts| event.block_timestamp <= ts))
        .filter_map(|event| {
            let market_id = event.param_b256("marketId").ok()?;
            let question_index = event.param_u32("index").ok()?;
            let data = event.param_bytes("data").ok()?;
            Some(PreparedPayload {
                key: event.key(),
                timestamp: event.block_timestamp,
                market_id,
                question_index,
                description: String::from_utf8_lossy(&data).into_owned(),
            })
        })
        .collect()
}

/// Fold a `QuestionPrepared` payload into the record. The first accepted
/// payload wins; identical redeliveries are no-ops (keeping the earliest
/// chain position for the books); differing payloads are conflicts.
fn merge_prepared(record: &mut QuestionRecord, candidate: PreparedPayload) -> Result<(), IndexError> {
    let Some(existing) = record.prepared.as_mut() else {
        record.prepared = Some(candidate);
        record.state = QuestionState::Resolved;
        return Ok(());
    };

    if let Some(field) = differing_field(existing, &candidate) {
        return Err(IndexError::ConflictingQuestionData {
            question_id: record.condition.question_id,
            field,
        });
    }

    if candidate.key < existing.key {
        existing.key = candidate.key;
        existing.timestamp = candidate.timestamp;
    }
    Ok(())
}

fn differing_field(a: &PreparedPayload, b: &PreparedPayload) -> Option<&'static str> {
    if a.market_id != b.market_id {
        Some("market_id")
    } else if a.question_index != b.question_index {
        Some("question_index")
    } else if a.description != b.description {
        Some("description")
    } else {
        None
    }
}

fn question_row(record: &QuestionRecord) -> Question {
    Question {
        question_id: record.condition.question_id,
        market_id: record.prepared.as_ref().map(|p| p.market_id),
        market_type: MarketType::NegRisk,
        description: record.prepared.as_ref().map(|p| p.description.clone()),
        question_index: record.prepared.as_ref().map(|p| p.question_index),
        oracle: record.condition.oracle,
        condition_id: record.condition.condition_id,
        outcome_slot_count: record.condition.outcome_slot_count,
        state: record.state,
    }
}
