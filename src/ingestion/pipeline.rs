use metrics::{counter, gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;
use tokio::sync::mpsc;

use alloy::primitives::B256;

use crate::db::catalog_repo;
use crate::indexer::{Indexer, IngestReport};
use crate::models::{DecodedEvent, QuestionState};

/// Apply a single decoded event to the indexer and write the resulting
/// catalog changes through to Postgres when a pool is configured.
pub async fn process_event(
    event: DecodedEvent,
    indexer: &mut Indexer,
    pool: Option<&PgPool>,
) -> anyhow::Result<()> {
    let start = Instant::now();

    tracing::debug!(
        event = %event.event_name,
        block = event.block_number,
        log_index = event.log_index,
        "event received in pipeline"
    );

    let report = indexer.ingest(event);
    if !report.inserted {
        counter!("events_duplicate_total").increment(1);
        return Ok(());
    }
    counter!("events_ingested_total").increment(1);

    record_report(&report);
    write_through(&report, pool).await?;

    gauge!("catalog_questions").set(indexer.catalog().question_count() as f64);
    gauge!("catalog_assets").set(indexer.catalog().asset_count() as f64);
    histogram!("ingest_latency_seconds").record(start.elapsed().as_secs_f64());

    Ok(())
}

/// Reorg notification from the chain-data collaborator: the transaction is
/// no longer canonical. Retract dependent state and persist the result.
pub async fn process_invalidation(
    transaction_hash: B256,
    indexer: &mut Indexer,
    pool: Option<&PgPool>,
) -> anyhow::Result<()> {
    let report = indexer.invalidate_transaction(transaction_hash);
    if !report.inserted {
        tracing::debug!(tx = %transaction_hash, "invalidated transaction was not indexed");
        return Ok(());
    }
    counter!("reorg_retractions_total").increment(report.retracted.len() as u64);

    record_report(&report);
    write_through(&report, pool).await?;

    gauge!("catalog_questions").set(indexer.catalog().question_count() as f64);
    gauge!("catalog_assets").set(indexer.catalog().asset_count() as f64);

    Ok(())
}

/// Pipeline consumer: drains the decoded-event channel into the indexer.
/// Returns the indexer once the feed closes so the caller can inspect the
/// final catalog.
pub async fn run_pipeline(
    mut event_rx: mpsc::Receiver<DecodedEvent>,
    mut indexer: Indexer,
    pool: Option<PgPool>,
) -> Indexer {
    while let Some(event) = event_rx.recv().await {
        if let Err(e) = process_event(event, &mut indexer, pool.as_ref()).await {
            tracing::error!(error = %e, "event processing failed");
        }
    }
    tracing::info!("event feed closed");
    indexer
}

fn record_report(report: &IngestReport) {
    for fault in &report.faults {
        tracing::warn!(error = %fault, "integrity fault recorded");
        counter!("index_faults_total", "kind" => fault.kind()).increment(1);
    }
    let resolved = report
        .questions
        .iter()
        .filter(|q| q.state == QuestionState::Resolved)
        .count();
    if resolved > 0 {
        counter!("questions_resolved_total").increment(resolved as u64);
    }
    if !report.assets.is_empty() {
        counter!("assets_registered_total").increment(report.assets.len() as u64);
    }
}

async fn write_through(report: &IngestReport, pool: Option<&PgPool>) -> anyhow::Result<()> {
    let Some(pool) = pool else {
        return Ok(());
    };
    for question_id in &report.retracted {
        catalog_repo::delete_question(pool, question_id).await?;
    }
    for question in &report.questions {
        catalog_repo::upsert_question(pool, question).await?;
    }
    for asset in &report.assets {
        catalog_repo::upsert_asset(pool, asset).await?;
    }
    Ok(())
}
