//! Private transaction submission (`eth_sendPrivateTransaction`)

use crate::{codec, Error, HintPreferences, Result};
use alloy_primitives::Bytes;
use serde::Serialize;
use serde_json::Value;

/// Options for a private transaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionOptions {
    /// Data the matchmaker may disclose about the transaction
    pub hints: Option<HintPreferences>,
    /// Last block the transaction may be included in
    pub max_block_number: Option<u64>,
    /// Builders allowed to receive the transaction
    pub builders: Option<Vec<String>>,
}

impl TransactionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hints(mut self, hints: HintPreferences) -> Self {
        self.hints = Some(hints);
        self
    }

    pub fn max_block_number(mut self, block: u64) -> Self {
        self.max_block_number = Some(block);
        self
    }

    pub fn builders<I, S>(mut self, builders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.builders = Some(builders.into_iter().map(Into::into).collect());
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrivateTransactionWire<'a> {
    tx: &'a Bytes,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "codec::serialize_opt_u64")]
    max_block_number: Option<u64>,
    preferences: PreferencesWire<'a>,
}

#[derive(Serialize)]
struct PreferencesWire<'a> {
    fast: bool,
    privacy: PrivacyWire<'a>,
}

#[derive(Serialize)]
struct PrivacyWire<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    hints: Option<&'a HintPreferences>,
    #[serde(skip_serializing_if = "Option::is_none")]
    builders: Option<&'a [String]>,
}

/// JSON-RPC params for `eth_sendPrivateTransaction`
pub fn build_send_transaction_params(
    signed_tx: &Bytes,
    options: &TransactionOptions,
) -> Result<Value> {
    if signed_tx.is_empty() {
        return Err(Error::Encode("signed transaction is empty".to_string()));
    }

    let wire = PrivateTransactionWire {
        tx: signed_tx,
        max_block_number: options.max_block_number,
        preferences: PreferencesWire {
            fast: true,
            privacy: PrivacyWire {
                hints: options.hints.as_ref().filter(|hints| !hints.is_unspecified()),
                builders: options.builders.as_deref(),
            },
        },
    };

    let wire = serde_json::to_value(wire).map_err(|e| Error::Encode(e.to_string()))?;
    Ok(Value::Array(vec![wire]))
}
