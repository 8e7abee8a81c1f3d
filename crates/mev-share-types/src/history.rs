//! Event history
//!
//! The stream service keeps past hints queryable over plain HTTP GET:
//! `/api/v1/history/info` describes the available range and
//! `/api/v1/history` pages through it.

use crate::{
    codec::WireNumber,
    events::{decode_event, EventKind, PendingEvent},
    Result,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const HISTORY_INFO_PATH: &str = "/api/v1/history/info";
pub const HISTORY_PATH: &str = "/api/v1/history";

/// Range and paging limits of the history store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventHistoryInfo {
    pub count: u64,
    pub min_block: u64,
    pub max_block: u64,
    pub min_timestamp: u64,
    pub max_timestamp: u64,
    pub max_limit: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventHistoryInfoWire {
    count: WireNumber,
    min_block: WireNumber,
    max_block: WireNumber,
    min_timestamp: WireNumber,
    max_timestamp: WireNumber,
    max_limit: WireNumber,
}

/// Decode the `history/info` reply
pub fn decode_event_history_info(raw: &Value) -> Result<EventHistoryInfo> {
    let wire = EventHistoryInfoWire::deserialize(raw)?;
    Ok(EventHistoryInfo {
        count: wire.count.quantity_u64("count")?,
        min_block: wire.min_block.quantity_u64("minBlock")?,
        max_block: wire.max_block.quantity_u64("maxBlock")?,
        min_timestamp: wire.min_timestamp.quantity_u64("minTimestamp")?,
        max_timestamp: wire.max_timestamp.quantity_u64("maxTimestamp")?,
        max_limit: wire.max_limit.quantity_u64("maxLimit")?,
    })
}

/// Query filter for `history`; unset fields are left to the service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventHistoryParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_start: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_end: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_start: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_end: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

impl EventHistoryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(mut self, start: u64, end: u64) -> Self {
        self.block_start = Some(start);
        self.block_end = Some(end);
        self
    }

    pub fn timestamps(mut self, start: u64, end: u64) -> Self {
        self.timestamp_start = Some(start);
        self.timestamp_end = Some(end);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Query string pairs in a fixed order, decimal values
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        [
            ("blockStart", self.block_start),
            ("blockEnd", self.block_end),
            ("timestampStart", self.timestamp_start),
            ("timestampEnd", self.timestamp_end),
            ("limit", self.limit),
            ("offset", self.offset),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v.to_string())))
        .collect()
    }
}

/// One stored hint with the block it was seen at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventHistoryEntry {
    pub block: u64,
    pub timestamp: u64,
    pub hint: PendingEvent,
}

#[derive(Deserialize)]
struct EventHistoryEntryWire {
    block: WireNumber,
    timestamp: WireNumber,
    hint: Value,
}

/// Decode the `history` reply. Stored hints carry no event name, so each
/// kind is inferred from its shape.
pub fn decode_event_history(raw: &Value) -> Result<Vec<EventHistoryEntry>> {
    Vec::<EventHistoryEntryWire>::deserialize(raw)?
        .into_iter()
        .map(|entry| {
            Ok(EventHistoryEntry {
                block: entry.block.quantity_u64("block")?,
                timestamp: entry.timestamp.quantity_u64("timestamp")?,
                hint: decode_event(EventKind::infer(&entry.hint), &entry.hint)?,
            })
        })
        .collect()
}
