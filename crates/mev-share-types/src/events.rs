//! Matchmaker stream events
//!
//! The event stream pushes one JSON object per pending transaction or bundle.
//! Identifiers (hashes, addresses, selectors) are kept as the hex strings the
//! service sent; only the numeric fields are converted.

use crate::{codec, Result};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of a stream event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Transaction,
    Bundle,
}

impl EventKind {
    pub const ALL: [EventKind; 2] = [EventKind::Transaction, EventKind::Bundle];

    /// Map a declared stream event name to a kind; `None` for unknown names
    pub fn from_event_name(name: &str) -> Option<Self> {
        match name {
            "transaction" | "tx" => Some(EventKind::Transaction),
            "bundle" => Some(EventKind::Bundle),
            _ => None,
        }
    }

    /// Kind of an event that did not declare one: exactly one tx descriptor
    /// means a transaction, anything else a bundle.
    ///
    /// An empty `txs` array is kept and classed as a bundle whose transactions
    /// were all withheld, the same as a missing `txs`. No hint is dropped here.
    pub fn infer(raw: &Value) -> Self {
        match raw.get("txs").and_then(Value::as_array) {
            Some(txs) if txs.len() == 1 => EventKind::Transaction,
            _ => EventKind::Bundle,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Transaction => "transaction",
            EventKind::Bundle => "bundle",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log disclosed with an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    pub address: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Transaction descriptor disclosed with an event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTransaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_data: Option<String>,
}

/// Event as it travels the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchmakerEvent {
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<EventLog>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txs: Option<Vec<EventTransaction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mev_gas_price: Option<codec::WireNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<codec::WireNumber>,
}

/// A pending transaction seen by the matchmaker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    pub hash: String,
    pub logs: Option<Vec<EventLog>>,
    pub to: Option<String>,
    pub function_selector: Option<String>,
    pub call_data: Option<String>,
    /// Absent when the service did not compute or disclose it
    pub mev_gas_price: Option<U256>,
    /// Rounded by the service; kept as sent
    pub gas_used: Option<U256>,
}

/// A pending bundle seen by the matchmaker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingBundle {
    pub hash: String,
    pub logs: Option<Vec<EventLog>>,
    pub txs: Option<Vec<EventTransaction>>,
    pub mev_gas_price: Option<U256>,
    pub gas_used: Option<U256>,
}

/// Decoded stream event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingEvent {
    Transaction(PendingTransaction),
    Bundle(PendingBundle),
}

impl PendingEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PendingEvent::Transaction(_) => EventKind::Transaction,
            PendingEvent::Bundle(_) => EventKind::Bundle,
        }
    }

    pub fn hash(&self) -> &str {
        match self {
            PendingEvent::Transaction(tx) => &tx.hash,
            PendingEvent::Bundle(bundle) => &bundle.hash,
        }
    }
}

fn optional_quantity(value: Option<&codec::WireNumber>, field: &str) -> Result<Option<U256>> {
    value.map(|v| v.quantity(field)).transpose()
}

impl MatchmakerEvent {
    /// Normalize into the decoded shape for `kind`
    pub fn decode(self, kind: EventKind) -> Result<PendingEvent> {
        let mev_gas_price = optional_quantity(self.mev_gas_price.as_ref(), "mevGasPrice")?;
        let gas_used = optional_quantity(self.gas_used.as_ref(), "gasUsed")?;

        Ok(match kind {
            EventKind::Transaction => {
                let tx = self
                    .txs
                    .and_then(|txs| txs.into_iter().next())
                    .unwrap_or_default();
                PendingEvent::Transaction(PendingTransaction {
                    hash: self.hash,
                    logs: self.logs,
                    to: tx.to,
                    function_selector: tx.function_selector,
                    call_data: tx.call_data,
                    mev_gas_price,
                    gas_used,
                })
            }
            EventKind::Bundle => PendingEvent::Bundle(PendingBundle {
                hash: self.hash,
                logs: self.logs,
                txs: self.txs,
                mev_gas_price,
                gas_used,
            }),
        })
    }
}

/// Decode a raw stream payload as an event of `kind`
pub fn decode_event(kind: EventKind, raw: &Value) -> Result<PendingEvent> {
    let event = MatchmakerEvent::deserialize(raw)?;
    event.decode(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use serde_json::json;

    #[test]
    fn test_transaction_event() {
        let raw = json!({
            "hash": "0xabc",
            "txs": [{ "to": "0xdef", "functionSelector": "0x12345678" }],
            "mevGasPrice": "0x64"
        });

        let event = decode_event(EventKind::Transaction, &raw).unwrap();
        let PendingEvent::Transaction(tx) = event else {
            panic!("expected a transaction");
        };
        assert_eq!(tx.hash, "0xabc");
        assert_eq!(tx.to.as_deref(), Some("0xdef"));
        assert_eq!(tx.function_selector.as_deref(), Some("0x12345678"));
        assert_eq!(tx.call_data, None);
        assert_eq!(tx.mev_gas_price, Some(U256::from(100)));
        assert_eq!(tx.gas_used, None);
    }

    #[test]
    fn test_bundle_event_keeps_descriptors() {
        let raw = json!({
            "hash": "0xb0",
            "logs": [{ "address": "0x01", "topics": ["0xaa"], "data": "0x" }],
            "txs": [{ "to": "0x02" }, { "callData": "0xdead" }],
            "gasUsed": "0x5208"
        });

        assert_eq!(EventKind::infer(&raw), EventKind::Bundle);
        let PendingEvent::Bundle(bundle) = decode_event(EventKind::Bundle, &raw).unwrap() else {
            panic!("expected a bundle");
        };
        assert_eq!(bundle.txs.as_ref().map(Vec::len), Some(2));
        assert_eq!(bundle.gas_used, Some(U256::from(21000)));
        assert_eq!(bundle.logs.unwrap()[0].topics, vec!["0xaa".to_string()]);
    }

    #[test]
    fn test_infer_kind() {
        assert_eq!(
            EventKind::infer(&json!({ "hash": "0x1", "txs": [{}] })),
            EventKind::Transaction
        );
        assert_eq!(EventKind::infer(&json!({ "hash": "0x1" })), EventKind::Bundle);
        assert_eq!(EventKind::infer(&json!({ "hash": "0x1", "txs": [] })), EventKind::Bundle);
        assert_eq!(EventKind::infer(&json!({ "hash": "0x1", "txs": [{}, {}] })), EventKind::Bundle);
        assert_eq!(EventKind::from_event_name("bundle"), Some(EventKind::Bundle));
        assert_eq!(EventKind::from_event_name("auction"), None);
    }

    #[test]
    fn test_transaction_without_descriptor() {
        let event = decode_event(EventKind::Transaction, &json!({ "hash": "0x1" })).unwrap();
        match event {
            PendingEvent::Transaction(tx) => assert!(tx.to.is_none() && tx.logs.is_none()),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_numeric_field() {
        let raw = json!({ "hash": "0x1", "mevGasPrice": "0xnope" });
        let err = decode_event(EventKind::Transaction, &raw).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedNumericField { ref field, .. } if field == "mevGasPrice"
        ));
    }

    #[test]
    fn test_missing_hash() {
        let err = decode_event(EventKind::Bundle, &json!({ "txs": [] })).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
