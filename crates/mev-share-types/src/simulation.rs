//! Bundle simulation (`mev_simBundle`)
//!
//! Options override the header of the block the bundle is simulated on top of.
//! Unset fields are derived by the service from the parent block.

use crate::{bundle::BundleParams, codec, error::Error, Result};
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Seconds between a parent block and the simulated block
pub const BLOCK_TIME_SECS: u64 = 12;

/// Simulation timeout the service applies when none is given
pub const DEFAULT_SIM_TIMEOUT_SECS: u64 = 5;

/// Block the simulation state is taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentBlock {
    Number(u64),
    Hash(B256),
}

impl Serialize for ParentBlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ParentBlock::Number(number) => serializer.serialize_str(&codec::encode_u64(*number)),
            ParentBlock::Hash(hash) => hash.serialize(serializer),
        }
    }
}

/// Overrides for `mev_simBundle`; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimBundleOptions {
    /// Defaults to the latest block
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_block: Option<ParentBlock>,
    /// Defaults to `parent.number + 1`
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "codec::serialize_opt_u64")]
    pub block_number: Option<u64>,
    /// Defaults to `parent.coinbase`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coinbase: Option<Address>,
    /// Defaults to `parent.timestamp + 12`
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "codec::serialize_opt_u64")]
    pub timestamp: Option<u64>,
    /// Defaults to `parent.gasLimit`
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "codec::serialize_opt_u64")]
    pub gas_limit: Option<u64>,
    /// Defaults to `parent.baseFeePerGas`
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "codec::serialize_opt_u256")]
    pub base_fee: Option<U256>,
    /// Seconds, defaults to 5. Enforced by the service, not the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// Header fields of the parent block that simulation overrides derive from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentHeader {
    pub number: u64,
    pub coinbase: Address,
    pub timestamp: u64,
    pub gas_limit: u64,
    pub base_fee: U256,
}

/// Fully resolved simulation context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimContext {
    pub block_number: u64,
    pub coinbase: Address,
    pub timestamp: u64,
    pub gas_limit: u64,
    pub base_fee: U256,
    pub timeout_secs: u64,
}

impl SimBundleOptions {
    pub fn parent_block(mut self, parent: ParentBlock) -> Self {
        self.parent_block = Some(parent);
        self
    }

    pub fn block_number(mut self, number: u64) -> Self {
        self.block_number = Some(number);
        self
    }

    pub fn coinbase(mut self, coinbase: Address) -> Self {
        self.coinbase = Some(coinbase);
        self
    }

    pub fn timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn base_fee(mut self, base_fee: U256) -> Self {
        self.base_fee = Some(base_fee);
        self
    }

    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout = Some(secs);
        self
    }

    /// Apply the service's derivation rule to a known parent header
    pub fn resolve(&self, parent: &ParentHeader) -> SimContext {
        SimContext {
            block_number: self.block_number.unwrap_or(parent.number.saturating_add(1)),
            coinbase: self.coinbase.unwrap_or(parent.coinbase),
            timestamp: self
                .timestamp
                .unwrap_or(parent.timestamp.saturating_add(BLOCK_TIME_SECS)),
            gas_limit: self.gas_limit.unwrap_or(parent.gas_limit),
            base_fee: self.base_fee.unwrap_or(parent.base_fee),
            timeout_secs: self.timeout.unwrap_or(DEFAULT_SIM_TIMEOUT_SECS),
        }
    }
}

/// JSON-RPC params for `mev_simBundle`. Fails locally on invalid bundles.
pub fn build_sim_bundle_params(bundle: &BundleParams, options: &SimBundleOptions) -> Result<Value> {
    let options = serde_json::to_value(options).map_err(|e| Error::Encode(e.to_string()))?;
    Ok(Value::Array(vec![bundle.to_wire()?, options]))
}

// ============ Result ============

/// Logs of a simulated bundle, nested the same way as the bundle body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimBundleLogs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_logs: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_logs: Option<Vec<SimBundleLogs>>,
}

/// Decoded `mev_simBundle` result. A failed simulation is a value, not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct SimBundleResult {
    pub success: bool,
    pub error: Option<String>,
    pub state_block: u64,
    pub mev_gas_price: U256,
    pub profit: U256,
    pub refundable_value: U256,
    pub gas_used: U256,
    pub logs: Option<Vec<SimBundleLogs>>,
}

impl SimBundleResult {
    /// Simulation error message, when the service reported a failure
    pub fn failure(&self) -> Option<&str> {
        if self.success {
            None
        } else {
            Some(self.error.as_deref().unwrap_or("simulation failed"))
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SimBundleResponseWire {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    pub state_block: codec::WireNumber,
    pub mev_gas_price: codec::WireNumber,
    pub profit: codec::WireNumber,
    pub refundable_value: codec::WireNumber,
    pub gas_used: codec::WireNumber,
    #[serde(default)]
    pub logs: Option<Vec<SimBundleLogs>>,
}

impl SimBundleResponseWire {
    pub(crate) fn decode(self) -> Result<SimBundleResult> {
        Ok(SimBundleResult {
            success: self.success,
            error: self.error,
            state_block: self.state_block.hex_u64("stateBlock")?,
            mev_gas_price: self.mev_gas_price.quantity("mevGasPrice")?,
            profit: self.profit.quantity("profit")?,
            refundable_value: self.refundable_value.quantity("refundableValue")?,
            gas_used: self.gas_used.quantity("gasUsed")?,
            logs: self.logs,
        })
    }
}
