//! MEV-Share Types - Wire protocol for the MEV-Share matchmaker
//!
//! Everything here is pure data transformation, no I/O:
//! - Numeric wire codec: hex/decimal strings <-> exact integers
//! - Bundle validation and `mev_sendBundle` / `mev_simBundle` params
//! - Private transaction params (`eth_sendPrivateTransaction`)
//! - RPC response, stream event and event history decoding

pub mod bundle;
pub mod codec;
pub mod error;
pub mod events;
pub mod hints;
pub mod history;
pub mod response;
pub mod simulation;
pub mod transaction;
pub mod validation;

pub use bundle::{
    build_send_bundle_params, BundleBodyEntry, BundleParams, BundleParamsBuilder, Inclusion,
    Metadata, Privacy, Refund, RefundConfig, Validity,
};
pub use error::{Error, Result};
pub use events::{
    decode_event, EventKind, EventLog, EventTransaction, MatchmakerEvent, PendingBundle,
    PendingEvent, PendingTransaction,
};
pub use hints::HintPreferences;
pub use history::{
    decode_event_history, decode_event_history_info, EventHistoryEntry, EventHistoryInfo,
    EventHistoryParams,
};
pub use response::{
    decode_send_bundle_response, decode_send_transaction_response, decode_sim_bundle_response,
    SendBundleResult,
};
pub use simulation::{build_sim_bundle_params, ParentBlock, SimBundleOptions, SimBundleResult};
pub use transaction::{build_send_transaction_params, TransactionOptions};
pub use validation::parse_bundle;

// Primitive types that appear in the public API
pub use alloy_primitives::{Address, Bytes, B256, U256};

/// JSON-RPC method names
pub mod methods {
    pub const SEND_BUNDLE: &str = "mev_sendBundle";
    pub const SIM_BUNDLE: &str = "mev_simBundle";
    pub const SEND_PRIVATE_TRANSACTION: &str = "eth_sendPrivateTransaction";
}
