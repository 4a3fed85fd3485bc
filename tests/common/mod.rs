//! Shared fixtures: a two-question NegRisk market group with identifiers
//! derived by the same construction the contracts use, plus builders for
//! the decoded events the indexer consumes.

use std::collections::HashMap;

use alloy::primitives::{address, b256, Address, B256};
use serde_json::json;

use ctfindex::indexer::{Indexer, IndexerConfig};
use ctfindex::models::DecodedEvent;

/// NegRisk adapter: oracle of every condition in the group and emitter of
/// `QuestionPrepared`.
pub const ORACLE: Address = address!("d91e80cf2e7be2e162c6513ced06f1dd0da35296");
/// Conditional tokens contract: emitter of `ConditionPreparation`,
/// `PositionSplit` and the ERC-1155 transfers.
pub const CTF: Address = address!("4d97dcd97ec945f40cf65f87097ace5ea0476045");
pub const USDC: Address = address!("2791bca1f2de4661ed88a30c99a7a9449aa84174");

pub const MARKET: B256 =
    b256!("0cb37cfe26e53cf4ed4edb0dfd3c88379ddaab9244aed0ac64ea1ecfb050b900");
pub const QUESTION_0: B256 =
    b256!("0cb37cfe26e53cf4ed4edb0dfd3c88379ddaab9244aed0ac64ea1ecfb050b900");
pub const QUESTION_1: B256 =
    b256!("0cb37cfe26e53cf4ed4edb0dfd3c88379ddaab9244aed0ac64ea1ecfb050b901");

pub const CONDITION_0: B256 =
    b256!("383f8266f40728c7b01e2f1fdf6bf36838b74329e6b3b4c05a616aa966a988a2");
pub const CONDITION_1: B256 =
    b256!("b4d41e76b6f6263b24233511929fa0f4e57c374b2745c2228579ab62c7b70025");

/// Position ids of question 0's outcome slots (USDC collateral, no parent).
pub const ASSET_0_SLOT_0: &str =
    "27803075767959391872413522010578772306897299940366007246855117606257107750882";
pub const ASSET_0_SLOT_1: &str =
    "86061070789695089842656460990976525101345453192629758943082798786265403322306";

pub const DESCRIPTION: &str = "Will the incumbent win the 2026 election?";

/// Block timestamps in the fixtures follow a 2-second cadence.
#[allow(dead_code)]
pub fn ts(block: u64) -> u64 {
    1_700_000_000 + block * 2
}

fn event(
    block: u64,
    log_index: u64,
    contract: Address,
    name: &str,
    params: serde_json::Value,
) -> DecodedEvent {
    let params: HashMap<String, serde_json::Value> = serde_json::from_value(params).unwrap();
    DecodedEvent {
        contract_address: contract,
        event_name: name.into(),
        transaction_hash: B256::with_last_byte(block as u8),
        log_index,
        block_number: block,
        block_timestamp: ts(block),
        params,
    }
}

#[allow(dead_code)]
pub fn indexer() -> Indexer {
    Indexer::new(IndexerConfig {
        collateral_token: USDC,
        resolution_timeout_secs: 0,
    })
}

#[allow(dead_code)]
pub fn condition_preparation(
    block: u64,
    log_index: u64,
    condition_id: B256,
    question_id: B256,
    slot_count: u32,
) -> DecodedEvent {
    event(
        block,
        log_index,
        CTF,
        "ConditionPreparation",
        json!({
            "conditionId": condition_id.to_string(),
            "oracle": ORACLE.to_string(),
            "questionId": question_id.to_string(),
            "outcomeSlotCount": slot_count,
        }),
    )
}

#[allow(dead_code)]
pub fn question_prepared(
    block: u64,
    log_index: u64,
    question_id: B256,
    index: u32,
    description: &str,
) -> DecodedEvent {
    event(
        block,
        log_index,
        ORACLE,
        "QuestionPrepared",
        json!({
            "marketId": MARKET.to_string(),
            "questionId": question_id.to_string(),
            "index": index,
            "data": format!("0x{}", alloy::hex::encode(description.as_bytes())),
        }),
    )
}

#[allow(dead_code)]
pub fn position_split(block: u64, log_index: u64, condition_id: B256) -> DecodedEvent {
    event(
        block,
        log_index,
        CTF,
        "PositionSplit",
        json!({
            "stakeholder": "0x7200617082b5b8c582591688f6df1506839c51a3",
            "collateralToken": USDC.to_string(),
            "parentCollectionId": B256::ZERO.to_string(),
            "conditionId": condition_id.to_string(),
            "partition": ["1", "2"],
            "amount": "5000000",
        }),
    )
}

#[allow(dead_code)]
pub fn transfer_single_mint(block: u64, log_index: u64, asset_id: &str) -> DecodedEvent {
    event(
        block,
        log_index,
        CTF,
        "TransferSingle",
        json!({
            "operator": "0x7200617082b5b8c582591688f6df1506839c51a3",
            "from": Address::ZERO.to_string(),
            "to": "0x7200617082b5b8c582591688f6df1506839c51a3",
            "id": asset_id,
            "value": "5000000",
        }),
    )
}

#[allow(dead_code)]
pub fn with_tx(mut event: DecodedEvent, tx: B256) -> DecodedEvent {
    event.transaction_hash = tx;
    event
}
