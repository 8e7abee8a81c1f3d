//! MEV-Share Client - JSON-RPC and event stream client for the MEV-Share matchmaker
//!
//! - HTTP JSON-RPC: mev_sendBundle, mev_simBundle, eth_sendPrivateTransaction
//! - Event history API
//! - SSE event stream with typed, reconnecting subscriptions

pub mod client;
pub mod config;
pub mod error;
pub mod sse;
pub mod subscriptions;
pub mod transport;

#[cfg(test)]
mod testing;

pub use client::{MevShareClient, MevShareClientBuilder};
pub use config::{MevShareConfig, ReconnectPolicy};
pub use error::{ClientError, StreamError, TransportError};
pub use sse::{RawStreamMessage, SseTransport, StreamTransport};
pub use subscriptions::{ConnectionState, SubscriptionHandle, SubscriptionManager};
pub use transport::{HttpTransport, RequestSigner, RpcTransport, SIGNATURE_HEADER};

// Re-export the protocol types consumers need
pub use mev_share_types as types;
