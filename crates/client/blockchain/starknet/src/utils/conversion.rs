//! Conversions between JSON-RPC payloads and ledger types.
//!
//! ## Conversion Categories
//!
//! 1. **Words**: hex strings ↔ [`Word`]
//! 2. **Block ids**: [`BlockTag`] → `block_id` parameter
//! 3. **Receipts**: `starknet_getTransactionReceipt` result → [`Receipt`]

use client_blockchain_core::{
    BlockTag, ExecutionStatus, FinalityStatus, LogRecord, Receipt, TransactionHash, Word,
};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, StarknetError};

// ============================================================================
// Words
// ============================================================================

/// Parses a list of hex strings as returned by `starknet_call`.
pub fn parse_words(raw: &[String]) -> Result<Vec<Word>> {
    raw.iter()
        .map(|s| {
            Word::from_hex(s)
                .map_err(|e| StarknetError::MalformedResponse(format!("word {s:?}: {e}")))
        })
        .collect()
}

/// Hex strings in the minimal form nodes expect.
pub fn words_to_hex(words: &[Word]) -> Vec<String> {
    words.iter().map(Word::to_hex).collect()
}

// ============================================================================
// Block ids
// ============================================================================

/// `block_id` parameter for a read at `tag`.
pub fn block_id(tag: BlockTag) -> Value {
    Value::String(tag.to_string())
}

// ============================================================================
// Receipts
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct RawEvent {
    #[serde(default)]
    pub keys: Vec<Word>,
    #[serde(default)]
    pub data: Vec<Word>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawReceipt {
    pub transaction_hash: Word,
    pub finality_status: String,
    pub execution_status: String,
    #[serde(default)]
    pub revert_reason: Option<String>,
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

pub fn parse_finality(raw: &str) -> Result<FinalityStatus> {
    match raw {
        "RECEIVED" => Ok(FinalityStatus::Received),
        "PRE_CONFIRMED" | "CANDIDATE" => Ok(FinalityStatus::PreConfirmed),
        "ACCEPTED_ON_L2" => Ok(FinalityStatus::AcceptedOnL2),
        "ACCEPTED_ON_L1" => Ok(FinalityStatus::AcceptedOnL1),
        other => Err(StarknetError::MalformedResponse(format!(
            "unknown finality status {other:?}"
        ))),
    }
}

pub(crate) fn receipt_from_raw(raw: RawReceipt) -> Result<Receipt> {
    let finality = parse_finality(&raw.finality_status)?;
    let execution = match raw.execution_status.as_str() {
        "SUCCEEDED" => ExecutionStatus::Succeeded,
        "REVERTED" => ExecutionStatus::Reverted {
            reason: raw.revert_reason.unwrap_or_default(),
        },
        other => {
            return Err(StarknetError::MalformedResponse(format!(
                "unknown execution status {other:?}"
            )));
        }
    };

    Ok(Receipt {
        hash: TransactionHash(raw.transaction_hash),
        finality,
        execution,
        events: raw
            .events
            .into_iter()
            .map(|event| LogRecord {
                keys: event.keys,
                data: event.data,
            })
            .collect(),
    })
}
