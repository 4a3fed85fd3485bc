//! Indexer facade: event store, resolver and catalog behind one ingest
//! surface. Synchronous and self-contained — the async pipeline drives it
//! and handles persistence and metrics around it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use alloy::primitives::{Address, B256};

use crate::catalog::{Catalog, UpsertOutcome};
use crate::errors::IndexError;
use crate::models::{Asset, DecodedEvent, Question};
use crate::resolver::{CatalogUpdate, MarketGraphResolver, NullLabeler, OutcomeLabeler};
use crate::store::EventStore;

#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Collateral token position ids are derived against.
    pub collateral_token: Address,
    /// Block-time seconds a question may stay `Pending` before it is
    /// reported `Unresolvable`. Zero disables the sweep.
    pub resolution_timeout_secs: u64,
}

/// Catalog changes produced by one ingest or invalidation call. Rows appear
/// only when they actually changed, so write-through stays cheap.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// False when the event was a duplicate delivery (nothing was done).
    pub inserted: bool,
    pub questions: Vec<Question>,
    pub assets: Vec<Asset>,
    /// Questions removed by a reorg retraction.
    pub retracted: Vec<B256>,
    pub faults: Vec<IndexError>,
}

impl IngestReport {
    fn merge(&mut self, other: IngestReport) {
        self.questions.extend(other.questions);
        self.assets.extend(other.assets);
        self.retracted.extend(other.retracted);
        self.faults.extend(other.faults);
    }
}

pub struct Indexer {
    store: EventStore,
    resolver: MarketGraphResolver,
    catalog: Catalog,
}

impl Indexer {
    pub fn new(config: IndexerConfig) -> Self {
        Self::with_labeler(config, Arc::new(NullLabeler))
    }

    pub fn with_labeler(config: IndexerConfig, labeler: Arc<dyn OutcomeLabeler>) -> Self {
        Self {
            store: EventStore::new(),
            resolver: MarketGraphResolver::new(
                config.collateral_token,
                config.resolution_timeout_secs,
                labeler,
            ),
            catalog: Catalog::new(),
        }
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn resolver(&self) -> &MarketGraphResolver {
        &self.resolver
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Ingest one event: dedup into the store, resolve, fold the resulting
    /// rows into the catalog.
    pub fn ingest(&mut self, event: DecodedEvent) -> IngestReport {
        let mut report = IngestReport::default();
        let horizon = event.block_timestamp;

        if !self.store.insert(event.clone()) {
            return report;
        }
        report.inserted = true;

        let outcome = self.resolver.apply(&event, &self.store);
        report.faults.extend(outcome.faults);
        self.fold_updates(outcome.updates, &mut report);

        let swept = self.resolver.sweep_unresolvable(horizon);
        report.faults.extend(swept.faults);
        self.fold_updates(swept.updates, &mut report);

        report
    }

    /// Ingest a batch, stopping between events when `cancel` is raised.
    /// A question row is always folded before its assets, so a cancelled
    /// batch never leaves an asset without at least a pending question.
    pub fn ingest_batch(
        &mut self,
        events: impl IntoIterator<Item = DecodedEvent>,
        cancel: &AtomicBool,
    ) -> IngestReport {
        let mut report = IngestReport::default();
        for event in events {
            if cancel.load(Ordering::Relaxed) {
                tracing::info!("batch ingest cancelled");
                break;
            }
            let one = self.ingest(event);
            report.inserted |= one.inserted;
            report.merge(one);
        }
        report
    }

    /// Reorg invalidation: drop every event of a no-longer-canonical
    /// transaction, retract the questions whose evidence included them, then
    /// replay the surviving preparation events so state corroborated by
    /// still-canonical evidence is rebuilt.
    pub fn invalidate_transaction(&mut self, transaction_hash: B256) -> IngestReport {
        let mut report = IngestReport::default();

        let removed = self.store.remove_transaction(transaction_hash);
        if removed.is_empty() {
            return report;
        }
        report.inserted = true;

        let affected = self.resolver.affected_questions(&removed);
        tracing::info!(
            tx = %transaction_hash,
            events = removed.len(),
            questions = affected.len(),
            "transaction invalidated"
        );

        self.resolver.retract_questions(&affected);
        for question_id in &affected {
            if self.catalog.remove_question(question_id).is_some() {
                report.retracted.push(*question_id);
            }
        }

        // Replay: re-verifying a surviving ConditionPreparation re-scans the
        // store, so question/mint evidence is rediscovered along the way.
        let replayable: Vec<DecodedEvent> = self
            .store
            .by_name(crate::resolver::EVENT_CONDITION_PREPARATION)
            .filter(|event| {
                event
                    .param_b256("questionId")
                    .map(|qid| affected.contains(&qid))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        for event in replayable {
            let outcome = self.resolver.apply(&event, &self.store);
            report.faults.extend(outcome.faults);
            self.fold_updates(outcome.updates, &mut report);
        }

        report
    }

    fn fold_updates(&mut self, updates: Vec<CatalogUpdate>, report: &mut IngestReport) {
        for update in updates {
            match update {
                CatalogUpdate::Question(question) => {
                    match self.catalog.upsert_question(question.clone()) {
                        Ok(UpsertOutcome::Unchanged) => {}
                        Ok(_) => report.questions.push(question),
                        Err(fault) => {
                            tracing::warn!(error = %fault, "catalog write rejected");
                            report.faults.push(fault);
                        }
                    }
                }
                CatalogUpdate::Asset(asset) => {
                    match self.catalog.upsert_asset(asset.clone()) {
                        Ok(UpsertOutcome::Unchanged) => {}
                        Ok(_) => report.assets.push(asset),
                        Err(fault) => {
                            tracing::warn!(error = %fault, "catalog write rejected");
                            report.faults.push(fault);
                        }
                    }
                }
            }
        }
    }
}
