//! Response Decoder
//!
//! Turns the `result` member of a JSON-RPC reply into typed values. A reply that
//! does not have the expected shape is an error, never a default.

use crate::{simulation::SimBundleResponseWire, Error, Result, SimBundleResult};
use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Acknowledgement of `mev_sendBundle`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBundleResult {
    pub bundle_hash: String,
}

/// Decode the result of `mev_sendBundle`
pub fn decode_send_bundle_response(raw: &Value) -> Result<SendBundleResult> {
    Ok(SendBundleResult::deserialize(raw)?)
}

/// Decode the result of `mev_simBundle`
pub fn decode_sim_bundle_response(raw: &Value) -> Result<SimBundleResult> {
    SimBundleResponseWire::deserialize(raw)?.decode()
}

/// Decode the result of `eth_sendPrivateTransaction`: the transaction hash
pub fn decode_send_transaction_response(raw: &Value) -> Result<B256> {
    let hash = raw
        .as_str()
        .ok_or_else(|| Error::Decode(format!("expected a transaction hash, got {raw}")))?;
    hash.parse::<B256>()
        .map_err(|e| Error::Decode(format!("invalid transaction hash {hash:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use serde_json::json;

    #[test]
    fn test_sim_bundle_response() {
        let raw = json!({
            "success": true,
            "stateBlock": "0x10",
            "mevGasPrice": "0x3e8",
            "profit": "0x1f4",
            "refundableValue": "0x0",
            "gasUsed": "0x5208"
        });

        let result = decode_sim_bundle_response(&raw).unwrap();
        assert!(result.success);
        assert_eq!(result.state_block, 16);
        assert_eq!(result.mev_gas_price, U256::from(1000));
        assert_eq!(result.profit, U256::from(500));
        assert_eq!(result.refundable_value, U256::ZERO);
        assert_eq!(result.gas_used, U256::from(21000));
        assert_eq!(result.failure(), None);
    }

    #[test]
    fn test_sim_bundle_response_decimal_strings() {
        let raw = json!({
            "success": true,
            "stateBlock": "0x10",
            "mevGasPrice": "1000",
            "profit": "500",
            "refundableValue": "0",
            "gasUsed": "21000"
        });

        let result = decode_sim_bundle_response(&raw).unwrap();
        assert!(result.success);
        assert_eq!(result.state_block, 16);
        assert_eq!(result.mev_gas_price, U256::from(1000));
        assert_eq!(result.profit, U256::from(500));
        assert_eq!(result.refundable_value, U256::ZERO);
        assert_eq!(result.gas_used, U256::from(21000));
    }

    #[test]
    fn test_failed_simulation_is_a_value() {
        let raw = json!({
            "success": false,
            "error": "execution reverted",
            "stateBlock": "0x10",
            "mevGasPrice": "0",
            "profit": "0",
            "refundableValue": "0",
            "gasUsed": "0x0",
            "logs": [{ "txLogs": [] }]
        });

        let result = decode_sim_bundle_response(&raw).unwrap();
        assert_eq!(result.failure(), Some("execution reverted"));
        assert_eq!(result.logs.map(|logs| logs.len()), Some(1));
    }

    #[test]
    fn test_sim_response_missing_field() {
        let raw = json!({ "success": true, "stateBlock": "0x10" });
        assert!(matches!(decode_sim_bundle_response(&raw), Err(Error::Decode(_))));
    }

    #[test]
    fn test_sim_response_bad_numeral() {
        let raw = json!({
            "success": true,
            "stateBlock": "sixteen",
            "mevGasPrice": "0x0",
            "profit": "0x0",
            "refundableValue": "0x0",
            "gasUsed": "0x0"
        });
        let err = decode_sim_bundle_response(&raw).unwrap_err();
        assert_eq!(err.path(), Some("stateBlock"));
    }

    #[test]
    fn test_send_bundle_response() {
        let result = decode_send_bundle_response(&json!({ "bundleHash": "0xfeed" })).unwrap();
        assert_eq!(result.bundle_hash, "0xfeed");
        assert!(decode_send_bundle_response(&json!("0xfeed")).is_err());
    }

    #[test]
    fn test_send_transaction_response() {
        let hash = B256::repeat_byte(0x11);
        assert_eq!(decode_send_transaction_response(&json!(hash)).unwrap(), hash);
        assert!(decode_send_transaction_response(&json!({ "hash": "0x11" })).is_err());
        assert!(decode_send_transaction_response(&json!("0x11")).is_err());
    }
}
