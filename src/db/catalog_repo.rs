use alloy::primitives::B256;
use chrono::Utc;
use sqlx::PgPool;

use crate::models::{Asset, Question};

/// Insert or refresh a question row. The in-memory catalog enforces the
/// conflict rules before anything reaches this write, so the mutable columns
/// here are exactly the ones enrichment may touch.
pub async fn upsert_question(pool: &PgPool, question: &Question) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO questions (
            question_id, market_id, market_type, description, question_index,
            oracle, condition_id, outcome_slot_count, state, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (question_id) DO UPDATE
            SET market_id = EXCLUDED.market_id,
                description = EXCLUDED.description,
                question_index = EXCLUDED.question_index,
                state = EXCLUDED.state,
                updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(question.question_id.to_string())
    .bind(question.market_id.map(|m| m.to_string()))
    .bind(question.market_type.as_str())
    .bind(question.description.as_deref())
    .bind(question.question_index.map(|i| i as i32))
    .bind(format!("{:#x}", question.oracle))
    .bind(question.condition_id.to_string())
    .bind(question.outcome_slot_count as i32)
    .bind(question.state.as_str())
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert or refresh an asset row. Only the outcome label ever changes.
pub async fn upsert_asset(pool: &PgPool, asset: &Asset) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO assets (
            asset_id, question_id, outcome, slot_index,
            collateral_token, parent_collection_id, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (asset_id) DO UPDATE
            SET outcome = EXCLUDED.outcome,
                updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(&asset.asset_id)
    .bind(asset.question_id.to_string())
    .bind(asset.outcome.as_str())
    .bind(asset.slot_index as i32)
    .bind(format!("{:#x}", asset.collateral_token))
    .bind(asset.parent_collection_id.to_string())
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Retract a question; the FK cascade removes its assets.
pub async fn delete_question(pool: &PgPool, question_id: &B256) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM questions WHERE question_id = $1")
        .bind(question_id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}
