//! Bundle payloads for `mev_sendBundle` and `mev_simBundle`
//!
//! A bundle is an ordered body of transactions with inclusion, validity and
//! privacy conditions. Body entries may themselves be bundles, without a fixed
//! depth limit; the service decides how deep it accepts.

use crate::{codec, error::Error, hints::HintPreferences, Result};
use alloy_primitives::{Address, Bytes, B256};
use serde::Serialize;
use serde_json::Value;

/// Bundle spec version used when the caller does not pick one
pub const DEFAULT_BUNDLE_VERSION: &str = "v0.1";

/// Highest refund percentage the service accepts
pub const MAX_PERCENT: u32 = 100;

/// Parameters for `mev_sendBundle`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleParams {
    pub version: String,
    pub inclusion: Inclusion,
    pub body: Vec<BundleBodyEntry>,
    pub validity: Validity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy: Option<Privacy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// Block range a bundle may land in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Inclusion {
    #[serde(serialize_with = "codec::serialize_u64")]
    pub block: u64,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "codec::serialize_opt_u64"
    )]
    pub max_block: Option<u64>,
}

/// One entry of a bundle body. Exactly one shape per entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BundleBodyEntry {
    /// A transaction already known to the matchmaker (e.g. from the event stream)
    Hash { hash: B256 },
    /// A signed raw transaction
    Tx {
        tx: Bytes,
        #[serde(rename = "canRevert")]
        can_revert: bool,
    },
    /// A nested bundle
    Bundle { bundle: Box<BundleParams> },
}

impl BundleBodyEntry {
    /// Wire name of the shape this entry has
    pub fn shape(&self) -> &'static str {
        match self {
            BundleBodyEntry::Hash { .. } => "hash",
            BundleBodyEntry::Tx { .. } => "tx",
            BundleBodyEntry::Bundle { .. } => "bundle",
        }
    }
}

/// Refund conditions evaluated after the bundle is placed in a block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Validity {
    pub refund: Vec<Refund>,
    pub refund_config: Vec<RefundConfig>,
}

impl Validity {
    pub fn is_empty(&self) -> bool {
        self.refund.is_empty() && self.refund_config.is_empty()
    }
}

/// Minimum refund share required for the body entry at `body_idx`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Refund {
    pub body_idx: usize,
    pub percent: u32,
}

/// Share of a refund paid to `address`. Percentages conventionally sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefundConfig {
    pub address: Address,
    pub percent: u32,
}

/// What may be disclosed and to which builders
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Privacy {
    #[serde(skip_serializing_if = "hints_unspecified")]
    pub hints: Option<HintPreferences>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub builders: Option<Vec<String>>,
}

fn hints_unspecified(hints: &Option<HintPreferences>) -> bool {
    hints.as_ref().map_or(true, HintPreferences::is_unspecified)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_id: Option<String>,
}

// ============ Validation ============

pub(crate) fn join_path(parent: &str, field: &str) -> String {
    if parent.is_empty() {
        field.to_string()
    } else {
        format!("{parent}.{field}")
    }
}

impl BundleParams {
    /// Start building a bundle targeting `block`
    pub fn builder(block: u64) -> BundleParamsBuilder {
        BundleParamsBuilder::new(block)
    }

    /// Check the structural rules the matchmaker enforces.
    ///
    /// Nested bundles are checked with the same rules; the error names the
    /// failing field, e.g. `body[1].bundle.inclusion.maxBlock`.
    pub fn validate(&self) -> Result<()> {
        self.validate_at("")
    }

    fn validate_at(&self, path: &str) -> Result<()> {
        let Inclusion { block, max_block } = self.inclusion;
        if let Some(max_block) = max_block {
            if max_block < block {
                return Err(Error::shape(
                    join_path(path, "inclusion.maxBlock"),
                    format!("maxBlock {max_block} is before block {block}"),
                ));
            }
        }

        if self.body.is_empty() {
            return Err(Error::shape(join_path(path, "body"), "bundle body is empty"));
        }

        for (i, refund) in self.validity.refund.iter().enumerate() {
            let refund_path = join_path(path, &format!("validity.refund[{i}]"));
            if refund.body_idx >= self.body.len() {
                return Err(Error::shape(
                    format!("{refund_path}.bodyIdx"),
                    format!(
                        "index {} is outside a body of {} entries",
                        refund.body_idx,
                        self.body.len()
                    ),
                ));
            }
            if refund.percent > MAX_PERCENT {
                return Err(Error::shape(
                    format!("{refund_path}.percent"),
                    format!("{} is not within 0..=100", refund.percent),
                ));
            }
        }

        for (i, config) in self.validity.refund_config.iter().enumerate() {
            if config.percent > MAX_PERCENT {
                return Err(Error::shape(
                    join_path(path, &format!("validity.refundConfig[{i}].percent")),
                    format!("{} is not within 0..=100", config.percent),
                ));
            }
        }

        for (i, entry) in self.body.iter().enumerate() {
            match entry {
                BundleBodyEntry::Bundle { bundle } => {
                    bundle.validate_at(&join_path(path, &format!("body[{i}].bundle")))?
                }
                BundleBodyEntry::Hash { .. } | BundleBodyEntry::Tx { .. } => {}
            }
        }

        Ok(())
    }

    /// Nesting depth: 1 for a bundle without nested bundles
    pub fn depth(&self) -> usize {
        1 + self
            .body
            .iter()
            .map(|entry| match entry {
                BundleBodyEntry::Bundle { bundle } => bundle.depth(),
                BundleBodyEntry::Hash { .. } | BundleBodyEntry::Tx { .. } => 0,
            })
            .max()
            .unwrap_or(0)
    }

    /// Validate and encode as the wire object
    pub fn to_wire(&self) -> Result<Value> {
        self.validate()?;
        serde_json::to_value(self).map_err(|e| Error::Encode(e.to_string()))
    }
}

/// JSON-RPC params for `mev_sendBundle`. Fails locally on invalid bundles.
pub fn build_send_bundle_params(bundle: &BundleParams) -> Result<Value> {
    Ok(Value::Array(vec![bundle.to_wire()?]))
}

// ============ Builder ============

/// Builder for BundleParams
pub struct BundleParamsBuilder {
    params: BundleParams,
}

impl BundleParamsBuilder {
    pub fn new(block: u64) -> Self {
        Self {
            params: BundleParams {
                version: DEFAULT_BUNDLE_VERSION.to_string(),
                inclusion: Inclusion {
                    block,
                    max_block: None,
                },
                body: Vec::new(),
                validity: Validity::default(),
                privacy: None,
                metadata: None,
            },
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.params.version = version.into();
        self
    }

    pub fn max_block(mut self, max_block: u64) -> Self {
        self.params.inclusion.max_block = Some(max_block);
        self
    }

    /// Backrun a transaction seen on the event stream
    pub fn tx_hash(mut self, hash: B256) -> Self {
        self.params.body.push(BundleBodyEntry::Hash { hash });
        self
    }

    pub fn tx(mut self, tx: Bytes, can_revert: bool) -> Self {
        self.params.body.push(BundleBodyEntry::Tx { tx, can_revert });
        self
    }

    pub fn nested(mut self, bundle: BundleParams) -> Self {
        self.params.body.push(BundleBodyEntry::Bundle {
            bundle: Box::new(bundle),
        });
        self
    }

    pub fn refund(mut self, body_idx: usize, percent: u32) -> Self {
        self.params.validity.refund.push(Refund { body_idx, percent });
        self
    }

    pub fn refund_config(mut self, address: Address, percent: u32) -> Self {
        self.params
            .validity
            .refund_config
            .push(RefundConfig { address, percent });
        self
    }

    pub fn hints(mut self, hints: HintPreferences) -> Self {
        self.params.privacy.get_or_insert_with(Privacy::default).hints = Some(hints);
        self
    }

    pub fn builders<I, S>(mut self, builders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params.privacy.get_or_insert_with(Privacy::default).builders =
            Some(builders.into_iter().map(Into::into).collect());
        self
    }

    pub fn origin_id(mut self, origin_id: impl Into<String>) -> Self {
        self.params.metadata = Some(Metadata {
            origin_id: Some(origin_id.into()),
        });
        self
    }

    /// Build and validate
    pub fn build(self) -> Result<BundleParams> {
        self.params.validate()?;
        Ok(self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_tx() -> Bytes {
        Bytes::from(vec![0x02, 0xf8, 0x6b])
    }

    #[test]
    fn test_wire_shape() {
        let target = B256::repeat_byte(0x11);
        let bundle = BundleParams::builder(16)
            .max_block(18)
            .tx_hash(target)
            .tx(raw_tx(), false)
            .refund(0, 90)
            .hints(HintPreferences::new().logs(true))
            .builders(["flashbots"])
            .build()
            .unwrap();

        let wire = bundle.to_wire().unwrap();
        assert_eq!(
            wire,
            json!({
                "version": "v0.1",
                "inclusion": { "block": "0x10", "maxBlock": "0x12" },
                "body": [
                    { "hash": target },
                    { "tx": "0x02f86b", "canRevert": false }
                ],
                "validity": {
                    "refund": [{ "bodyIdx": 0, "percent": 90 }],
                    "refundConfig": []
                },
                "privacy": { "hints": ["logs", "hash"], "builders": ["flashbots"] }
            })
        );
    }

    #[test]
    fn test_nested_bundle_wire_shape() {
        let inner = BundleParams::builder(1).tx(raw_tx(), true).build().unwrap();
        let outer = BundleParams::builder(1)
            .nested(inner)
            .origin_id("searcher-1")
            .build()
            .unwrap();

        let wire = outer.to_wire().unwrap();
        assert_eq!(wire["body"][0]["bundle"]["body"][0]["canRevert"], json!(true));
        assert_eq!(wire["metadata"], json!({ "originId": "searcher-1" }));
        assert_eq!(outer.depth(), 2);
    }

    #[test]
    fn test_unspecified_hints_are_omitted() {
        let bundle = BundleParams::builder(1)
            .tx(raw_tx(), false)
            .hints(HintPreferences::new())
            .build()
            .unwrap();

        let wire = bundle.to_wire().unwrap();
        assert_eq!(wire["privacy"], json!({}));
    }

    #[test]
    fn test_max_block_before_block_rejected() {
        let err = BundleParams::builder(10)
            .max_block(9)
            .tx(raw_tx(), false)
            .build()
            .unwrap_err();
        assert_eq!(err.path(), Some("inclusion.maxBlock"));
    }

    #[test]
    fn test_empty_body_rejected() {
        let err = BundleParams::builder(10).build().unwrap_err();
        assert_eq!(err.path(), Some("body"));
    }

    #[test]
    fn test_refund_bounds() {
        let err = BundleParams::builder(1)
            .tx(raw_tx(), false)
            .refund(1, 50)
            .build()
            .unwrap_err();
        assert_eq!(err.path(), Some("validity.refund[0].bodyIdx"));

        let err = BundleParams::builder(1)
            .tx(raw_tx(), false)
            .refund(0, 101)
            .build()
            .unwrap_err();
        assert_eq!(err.path(), Some("validity.refund[0].percent"));

        let err = BundleParams::builder(1)
            .tx(raw_tx(), false)
            .refund_config(Address::ZERO, 100)
            .refund_config(Address::ZERO, 150)
            .build()
            .unwrap_err();
        assert_eq!(err.path(), Some("validity.refundConfig[1].percent"));
    }

    #[test]
    fn test_nested_errors_carry_full_path() {
        let mut inner = BundleParams::builder(5).tx(raw_tx(), false).build().unwrap();
        inner.inclusion.max_block = Some(4);

        let outer = BundleParamsBuilder {
            params: BundleParams {
                body: vec![
                    BundleBodyEntry::Tx {
                        tx: raw_tx(),
                        can_revert: false,
                    },
                    BundleBodyEntry::Bundle {
                        bundle: Box::new(inner),
                    },
                ],
                ..BundleParams::builder(5).params
            },
        };

        let err = outer.build().unwrap_err();
        assert_eq!(err.path(), Some("body[1].bundle.inclusion.maxBlock"));
    }
}
