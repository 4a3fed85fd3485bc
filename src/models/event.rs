use std::collections::HashMap;

use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::errors::IndexError;

/// Chain position of an event: the ordering and deduplication key for the
/// event store. Multiple events may share a transaction, never a log index
/// within a block.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EventKey {
    pub block_number: u64,
    pub log_index: u64,
}

/// A contract event as delivered by the log-decoding layer: named, typed at
/// the envelope level, with per-event parameters as a loose string→value map.
///
/// Parameter encoding follows the decoder's conventions: addresses and 32-byte
/// words as 0x-prefixed hex strings, uint256 values as decimal or 0x-hex
/// strings, byte payloads as 0x-prefixed hex, small integers as JSON numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodedEvent {
    pub contract_address: Address,
    pub event_name: String,
    pub transaction_hash: B256,
    pub log_index: u64,
    pub block_number: u64,
    pub block_timestamp: u64,
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
}

impl DecodedEvent {
    pub fn key(&self) -> EventKey {
        EventKey {
            block_number: self.block_number,
            log_index: self.log_index,
        }
    }

    fn param_str(&self, name: &str) -> Result<&str, IndexError> {
        self.params
            .get(name)
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                IndexError::InvalidInput(format!(
                    "{}: missing or non-string param `{name}`",
                    self.event_name
                ))
            })
    }

    pub fn param_b256(&self, name: &str) -> Result<B256, IndexError> {
        self.param_str(name)?.parse().map_err(|_| {
            IndexError::InvalidInput(format!(
                "{}: param `{name}` is not a 32-byte hex value",
                self.event_name
            ))
        })
    }

    pub fn param_address(&self, name: &str) -> Result<Address, IndexError> {
        self.param_str(name)?.parse().map_err(|_| {
            IndexError::InvalidInput(format!(
                "{}: param `{name}` is not an address",
                self.event_name
            ))
        })
    }

    /// Accepts either a JSON number or a decimal/hex string.
    pub fn param_u64(&self, name: &str) -> Result<u64, IndexError> {
        let v = self.params.get(name).ok_or_else(|| {
            IndexError::InvalidInput(format!(
                "{}: missing param `{name}`",
                self.event_name
            ))
        })?;
        if let Some(n) = v.as_u64() {
            return Ok(n);
        }
        let u = self.param_u256(name)?;
        u.try_into().map_err(|_| {
            IndexError::InvalidInput(format!(
                "{}: param `{name}` exceeds u64",
                self.event_name
            ))
        })
    }

    pub fn param_u32(&self, name: &str) -> Result<u32, IndexError> {
        self.param_u64(name)?.try_into().map_err(|_| {
            IndexError::InvalidInput(format!(
                "{}: param `{name}` exceeds u32",
                self.event_name
            ))
        })
    }

    /// Full-width uint256, from a JSON number or a decimal/0x-hex string.
    pub fn param_u256(&self, name: &str) -> Result<U256, IndexError> {
        let v = self.params.get(name).ok_or_else(|| {
            IndexError::InvalidInput(format!(
                "{}: missing param `{name}`",
                self.event_name
            ))
        })?;
        if let Some(n) = v.as_u64() {
            return Ok(U256::from(n));
        }
        v.as_str()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| {
                IndexError::InvalidInput(format!(
                    "{}: param `{name}` is not a uint256",
                    self.event_name
                ))
            })
    }

    /// Array-valued uint256 param (e.g. `partition`, TransferBatch `ids`).
    pub fn param_u256_array(&self, name: &str) -> Result<Vec<U256>, IndexError> {
        let arr = self
            .params
            .get(name)
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                IndexError::InvalidInput(format!(
                    "{}: missing or non-array param `{name}`",
                    self.event_name
                ))
            })?;
        arr.iter()
            .map(|v| {
                if let Some(n) = v.as_u64() {
                    return Ok(U256::from(n));
                }
                v.as_str().and_then(|s| s.parse().ok()).ok_or_else(|| {
                    IndexError::InvalidInput(format!(
                        "{}: element of `{name}` is not a uint256",
                        self.event_name
                    ))
                })
            })
            .collect()
    }

    /// Raw byte payload (0x-prefixed hex string param).
    pub fn param_bytes(&self, name: &str) -> Result<Vec<u8>, IndexError> {
        let s = self.param_str(name)?;
        alloy::hex::decode(s).map_err(|_| {
            IndexError::InvalidInput(format!(
                "{}: param `{name}` is not valid hex",
                self.event_name
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;
    use serde_json::json;

    fn event_with(params: serde_json::Value) -> DecodedEvent {
        DecodedEvent {
            contract_address: address!("4d97dcd97ec945f40cf65f87097ace5ea0476045"),
            event_name: "Test".into(),
            transaction_hash: B256::ZERO,
            log_index: 3,
            block_number: 100,
            block_timestamp: 1_700_000_000,
            params: serde_json::from_value(params).unwrap(),
        }
    }

    #[test]
    fn test_param_b256_roundtrip() {
        let ev = event_with(json!({
            "conditionId": "0x383f8266f40728c7b01e2f1fdf6bf36838b74329e6b3b4c05a616aa966a988a2"
        }));
        let id = ev.param_b256("conditionId").unwrap();
        assert_eq!(
            format!("{id}"),
            "0x383f8266f40728c7b01e2f1fdf6bf36838b74329e6b3b4c05a616aa966a988a2"
        );
    }

    #[test]
    fn test_param_u256_accepts_decimal_and_hex() {
        let ev = event_with(json!({
            "dec": "27803075767959391872413522010578772306897299940366007246855117606257107750882",
            "hex": "0x3d77fbb47726ab163ab8e06fbe8fca082930beecdb53da9162136ae09e014fe2",
            "num": 7
        }));
        assert_eq!(ev.param_u256("dec").unwrap(), ev.param_u256("hex").unwrap());
        assert_eq!(ev.param_u256("num").unwrap(), U256::from(7u8));
    }

    #[test]
    fn test_missing_param_is_invalid_input() {
        let ev = event_with(json!({}));
        let err = ev.param_b256("questionId").unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn test_param_u32_rejects_overflow() {
        let ev = event_with(json!({ "n": 4_294_967_296u64 }));
        assert!(ev.param_u32("n").is_err());
    }

    #[test]
    fn test_key_ordering() {
        let a = EventKey { block_number: 5, log_index: 9 };
        let b = EventKey { block_number: 6, log_index: 0 };
        assert!(a < b);
    }
}
