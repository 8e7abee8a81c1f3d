//! Strict parsing of raw bundle JSON
//!
//! Typed `BundleParams` cannot express an ambiguous body entry, but bundles that
//! arrive as JSON (files, other services) can. This parser walks the raw value,
//! enforces exactly-one-shape per body entry and reports the failing field path.

use crate::{
    bundle::{
        join_path, BundleBodyEntry, BundleParams, Inclusion, Metadata, Privacy, Refund,
        RefundConfig, Validity, DEFAULT_BUNDLE_VERSION,
    },
    codec,
    error::Error,
    hints::HintPreferences,
    Result,
};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Body entry shapes and the keys each one allows
const ENTRY_SHAPES: [(&str, &[&str]); 3] = [
    ("hash", &["hash"]),
    ("tx", &["tx", "canRevert"]),
    ("bundle", &["bundle"]),
];

/// Parse and validate a bundle from its wire JSON
pub fn parse_bundle(value: &Value) -> Result<BundleParams> {
    let params = parse_bundle_at(value, "")?;
    params.validate()?;
    Ok(params)
}

impl TryFrom<Value> for BundleParams {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        parse_bundle(&value)
    }
}

impl<'de> Deserialize<'de> for BundleParams {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        parse_bundle(&value).map_err(serde::de::Error::custom)
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "<bundle>"
    } else {
        path
    }
}

fn expect_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| Error::shape(display_path(path), "expected an object"))
}

fn expect_array<'a>(value: &'a Value, path: &str) -> Result<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| Error::shape(path, "expected an array"))
}

fn expect_str<'a>(value: &'a Value, path: &str) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| Error::shape(path, "expected a string"))
}

fn reject_unknown(object: &Map<String, Value>, allowed: &[&str], path: &str) -> Result<()> {
    match object.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(Error::shape(
            join_path(path, key),
            format!("unexpected field `{key}`"),
        )),
        None => Ok(()),
    }
}

fn parse_u64(value: &Value, path: &str) -> Result<u64> {
    match value {
        Value::String(text) => codec::decode_quantity_u64(text).map_err(|e| e.in_field(path)),
        Value::Number(number) => number
            .as_u64()
            .ok_or_else(|| Error::shape(path, "expected a non-negative integer")),
        _ => Err(Error::shape(path, "expected a number")),
    }
}

fn parse_u32(value: &Value, path: &str) -> Result<u32> {
    u32::try_from(parse_u64(value, path)?)
        .map_err(|_| Error::shape(path, "value does not fit in 32 bits"))
}

fn required_u64(object: &Map<String, Value>, key: &str, path: &str) -> Result<u64> {
    parse_u64(required(object, key, path)?, &join_path(path, key))
}

fn required_u32(object: &Map<String, Value>, key: &str, path: &str) -> Result<u32> {
    parse_u32(required(object, key, path)?, &join_path(path, key))
}

fn parse_hex<T: FromStr>(value: &Value, path: &str, what: &str) -> Result<T> {
    expect_str(value, path)?
        .parse()
        .map_err(|_| Error::shape(path, format!("expected {what}")))
}

fn required<'a>(object: &'a Map<String, Value>, key: &str, path: &str) -> Result<&'a Value> {
    object
        .get(key)
        .ok_or_else(|| Error::shape(join_path(path, key), "missing required field"))
}

fn parse_bundle_at(value: &Value, path: &str) -> Result<BundleParams> {
    let object = expect_object(value, path)?;
    reject_unknown(
        object,
        &["version", "inclusion", "body", "validity", "privacy", "metadata"],
        path,
    )?;

    let version = match object.get("version") {
        Some(v) => expect_str(v, &join_path(path, "version"))?.to_string(),
        None => DEFAULT_BUNDLE_VERSION.to_string(),
    };

    let inclusion = parse_inclusion(
        required(object, "inclusion", path)?,
        &join_path(path, "inclusion"),
    )?;

    let body_path = join_path(path, "body");
    let body = expect_array(required(object, "body", path)?, &body_path)?
        .iter()
        .enumerate()
        .map(|(i, entry)| parse_entry(entry, &format!("{body_path}[{i}]")))
        .collect::<Result<Vec<_>>>()?;

    let validity = match object.get("validity") {
        Some(v) => parse_validity(v, &join_path(path, "validity"))?,
        None => Validity::default(),
    };

    let privacy = object
        .get("privacy")
        .map(|v| parse_privacy(v, &join_path(path, "privacy")))
        .transpose()?;

    let metadata = object
        .get("metadata")
        .map(|v| parse_metadata(v, &join_path(path, "metadata")))
        .transpose()?;

    Ok(BundleParams {
        version,
        inclusion,
        body,
        validity,
        privacy,
        metadata,
    })
}

fn parse_inclusion(value: &Value, path: &str) -> Result<Inclusion> {
    let object = expect_object(value, path)?;
    reject_unknown(object, &["block", "maxBlock"], path)?;

    let block = required_u64(object, "block", path)?;
    let max_block = object
        .get("maxBlock")
        .map(|v| parse_u64(v, &join_path(path, "maxBlock")))
        .transpose()?;

    Ok(Inclusion { block, max_block })
}

fn parse_entry(value: &Value, path: &str) -> Result<BundleBodyEntry> {
    let object = expect_object(value, path)?;

    let matched: Vec<(&str, &[&str])> = ENTRY_SHAPES
        .into_iter()
        .filter(|(key, _)| object.contains_key(*key))
        .collect();

    let (shape, allowed) = match matched.as_slice() {
        [] => {
            return Err(Error::shape(
                path,
                "entry matches none of `hash`, `tx` + `canRevert`, `bundle`",
            ))
        }
        [only] => *only,
        many => {
            let keys: Vec<&str> = many.iter().map(|(key, _)| *key).collect();
            return Err(Error::shape(
                path,
                format!("entry is ambiguous between shapes: {}", keys.join(", ")),
            ));
        }
    };
    reject_unknown(object, allowed, path)?;

    match shape {
        "hash" => Ok(BundleBodyEntry::Hash {
            hash: parse_hex(&object["hash"], &join_path(path, "hash"), "a 32-byte hex hash")?,
        }),
        "tx" => {
            let can_revert_path = join_path(path, "canRevert");
            let can_revert = required(object, "canRevert", path)?
                .as_bool()
                .ok_or_else(|| Error::shape(&can_revert_path, "expected a boolean"))?;
            Ok(BundleBodyEntry::Tx {
                tx: parse_hex(&object["tx"], &join_path(path, "tx"), "hex transaction bytes")?,
                can_revert,
            })
        }
        _ => Ok(BundleBodyEntry::Bundle {
            bundle: Box::new(parse_bundle_at(&object["bundle"], &join_path(path, "bundle"))?),
        }),
    }
}

fn parse_validity(value: &Value, path: &str) -> Result<Validity> {
    let object = expect_object(value, path)?;
    reject_unknown(object, &["refund", "refundConfig"], path)?;

    let mut validity = Validity::default();

    if let Some(refunds) = object.get("refund") {
        let refund_path = join_path(path, "refund");
        for (i, refund) in expect_array(refunds, &refund_path)?.iter().enumerate() {
            let item_path = format!("{refund_path}[{i}]");
            let item = expect_object(refund, &item_path)?;
            reject_unknown(item, &["bodyIdx", "percent"], &item_path)?;
            let body_idx = usize::try_from(required_u64(item, "bodyIdx", &item_path)?)
                .map_err(|_| Error::shape(join_path(&item_path, "bodyIdx"), "index too large"))?;
            validity.refund.push(Refund {
                body_idx,
                percent: required_u32(item, "percent", &item_path)?,
            });
        }
    }

    if let Some(configs) = object.get("refundConfig") {
        let config_path = join_path(path, "refundConfig");
        for (i, config) in expect_array(configs, &config_path)?.iter().enumerate() {
            let item_path = format!("{config_path}[{i}]");
            let item = expect_object(config, &item_path)?;
            reject_unknown(item, &["address", "percent"], &item_path)?;
            validity.refund_config.push(RefundConfig {
                address: parse_hex(
                    required(item, "address", &item_path)?,
                    &join_path(&item_path, "address"),
                    "a 20-byte hex address",
                )?,
                percent: required_u32(item, "percent", &item_path)?,
            });
        }
    }

    Ok(validity)
}

fn parse_privacy(value: &Value, path: &str) -> Result<Privacy> {
    let object = expect_object(value, path)?;
    reject_unknown(object, &["hints", "builders"], path)?;

    let hints = match object.get("hints") {
        Some(hints) => {
            let hints_path = join_path(path, "hints");
            let names = expect_array(hints, &hints_path)?
                .iter()
                .map(|name| expect_str(name, &hints_path))
                .collect::<Result<Vec<_>>>()?;
            let prefs = HintPreferences::from_wire_names(names)
                .map_err(|name| Error::shape(&hints_path, format!("unknown hint `{name}`")))?;
            Some(prefs)
        }
        None => None,
    };

    let builders = match object.get("builders") {
        Some(builders) => {
            let builders_path = join_path(path, "builders");
            let names = expect_array(builders, &builders_path)?
                .iter()
                .map(|name| expect_str(name, &builders_path).map(str::to_string))
                .collect::<Result<Vec<_>>>()?;
            Some(names)
        }
        None => None,
    };

    Ok(Privacy { hints, builders })
}

fn parse_metadata(value: &Value, path: &str) -> Result<Metadata> {
    let object = expect_object(value, path)?;
    reject_unknown(object, &["originId"], path)?;

    let origin_id = object
        .get("originId")
        .map(|v| expect_str(v, &join_path(path, "originId")).map(str::to_string))
        .transpose()?;

    Ok(Metadata { origin_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const HASH: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";

    fn bundle_with_body(body: Value) -> Value {
        json!({
            "version": "v0.1",
            "inclusion": { "block": "0x10" },
            "body": body,
        })
    }

    #[test]
    fn test_parse_round_trips_wire_form() {
        let wire = json!({
            "version": "v0.1",
            "inclusion": { "block": "0x10", "maxBlock": "0x12" },
            "body": [
                { "hash": HASH },
                { "tx": "0x02f86b", "canRevert": true },
                { "bundle": {
                    "inclusion": { "block": 16 },
                    "body": [{ "hash": HASH }]
                } }
            ],
            "validity": {
                "refund": [{ "bodyIdx": 0, "percent": 90 }],
                "refundConfig": [{
                    "address": "0x0000000000000000000000000000000000000001",
                    "percent": 100
                }]
            },
            "privacy": { "hints": ["calldata", "hash"], "builders": ["flashbots"] },
            "metadata": { "originId": "abc" }
        });

        let params = parse_bundle(&wire).unwrap();
        assert_eq!(params.inclusion.max_block, Some(18));
        assert_eq!(params.body.len(), 3);
        assert_eq!(params.body[2].shape(), "bundle");
        assert_eq!(params.privacy.as_ref().unwrap().hints.unwrap().calldata, Some(true));

        let reparsed: BundleParams = serde_json::from_value(params.to_wire().unwrap()).unwrap();
        assert_eq!(reparsed.body, params.body);
        assert_eq!(reparsed.validity, params.validity);
        assert_eq!(reparsed, params);
    }

    #[test]
    fn test_built_bundle_survives_wire_round_trip() {
        let hash: alloy_primitives::B256 = HASH.parse().unwrap();
        let inner = BundleParams::builder(16).tx_hash(hash).build().unwrap();
        let outer = BundleParams::builder(16)
            .nested(inner)
            .tx(alloy_primitives::Bytes::from(vec![0x02]), false)
            .build()
            .unwrap();

        let reparsed = parse_bundle(&outer.to_wire().unwrap()).unwrap();
        assert_eq!(reparsed.version, DEFAULT_BUNDLE_VERSION);
        assert_eq!(reparsed.body, outer.body);
        assert_eq!(reparsed, outer);
    }

    #[test]
    fn test_missing_version_defaults() {
        let wire = json!({ "inclusion": { "block": 1 }, "body": [{ "hash": HASH }] });
        assert_eq!(parse_bundle(&wire).unwrap().version, "v0.1");

        let mut wire = bundle_with_body(json!([{ "hash": HASH }]));
        wire["version"] = json!("beta-1");
        assert_eq!(parse_bundle(&wire).unwrap().version, "beta-1");
    }

    #[test]
    fn test_entry_with_hash_and_tx_is_ambiguous() {
        let wire = bundle_with_body(json!([
            { "hash": HASH, "tx": "0x02", "canRevert": false }
        ]));

        match parse_bundle(&wire).unwrap_err() {
            Error::InvalidBundleShape { path, reason } => {
                assert_eq!(path, "body[0]");
                assert!(reason.contains("ambiguous"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_entry_matching_no_shape() {
        let wire = bundle_with_body(json!([{ "canRevert": false }]));
        assert_eq!(parse_bundle(&wire).unwrap_err().path(), Some("body[0]"));
    }

    #[test]
    fn test_extra_field_on_entry_rejected() {
        let wire = bundle_with_body(json!([{ "hash": HASH, "canRevert": true }]));
        assert_eq!(parse_bundle(&wire).unwrap_err().path(), Some("body[0].canRevert"));
    }

    #[test]
    fn test_tx_requires_can_revert() {
        let wire = bundle_with_body(json!([{ "tx": "0x02" }]));
        assert_eq!(parse_bundle(&wire).unwrap_err().path(), Some("body[0].canRevert"));
    }

    #[test]
    fn test_nested_ambiguity_reports_nested_path() {
        let wire = bundle_with_body(json!([
            { "bundle": {
                "inclusion": { "block": "0x1" },
                "body": [{ "hash": HASH }, { "bundle": {}, "hash": HASH }]
            } }
        ]));
        assert_eq!(parse_bundle(&wire).unwrap_err().path(), Some("body[0].bundle.body[1]"));
    }

    #[test]
    fn test_inclusion_rules() {
        let wire = json!({
            "inclusion": { "block": "0x10", "maxBlock": "0x0f" },
            "body": [{ "hash": HASH }]
        });
        assert_eq!(parse_bundle(&wire).unwrap_err().path(), Some("inclusion.maxBlock"));

        let wire = json!({
            "inclusion": { "block": "0xnope" },
            "body": [{ "hash": HASH }]
        });
        assert!(matches!(
            parse_bundle(&wire).unwrap_err(),
            Error::MalformedNumericField { ref field, .. } if field == "inclusion.block"
        ));

        let wire = json!({ "inclusion": { "block": -1 }, "body": [{ "hash": HASH }] });
        assert_eq!(parse_bundle(&wire).unwrap_err().path(), Some("inclusion.block"));
    }

    #[test]
    fn test_bad_hash_and_unknown_hint() {
        let wire = bundle_with_body(json!([{ "hash": "0x1234" }]));
        assert_eq!(parse_bundle(&wire).unwrap_err().path(), Some("body[0].hash"));

        let mut wire = bundle_with_body(json!([{ "hash": HASH }]));
        wire["privacy"] = json!({ "hints": ["mempool"] });
        assert_eq!(parse_bundle(&wire).unwrap_err().path(), Some("privacy.hints"));
    }

    #[test]
    fn test_empty_body_rejected() {
        let wire = bundle_with_body(json!([]));
        assert_eq!(parse_bundle(&wire).unwrap_err().path(), Some("body"));
    }
}
