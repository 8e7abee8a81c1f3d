//! Client Errors

use serde_json::Value;
use thiserror::Error;

/// A request that reached (or tried to reach) the service and failed there
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Signing failed: {0}")]
    Signing(String),
}

/// Failures on the event stream; reported through the error hook, never returned
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Failed to decode stream event: {0}")]
    Decode(#[from] mev_share_types::Error),

    #[error("Stream connection error: {0}")]
    Connection(String),

    #[error("Gave up reconnecting after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },
}

impl StreamError {
    /// True for errors that end or interrupt the connection
    pub fn is_connection(&self) -> bool {
        !matches!(self, StreamError::Decode(_))
    }
}

/// Errors returned by client operations
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Request(#[from] mev_share_types::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Subscription manager is closed")]
    SubscriptionClosed,
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Transport(TransportError::Http(e))
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
