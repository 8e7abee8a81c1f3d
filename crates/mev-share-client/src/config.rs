//! Client Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff schedule for re-opening the event stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    /// Delay before the first reconnect attempt
    pub initial_delay_ms: u64,
    /// Upper bound for the doubled delay
    pub max_delay_ms: u64,
    /// Give up after this many consecutive failed attempts; `None` retries forever
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before attempt `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(32);
        let delay = self
            .initial_delay_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_delay_ms);
        Duration::from_millis(delay)
    }

    /// Whether another attempt is allowed after `failed` consecutive failures
    pub fn allows(&self, failed: u32) -> bool {
        self.max_attempts.map_or(true, |max| failed < max)
    }
}

/// MEV-Share client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MevShareConfig {
    /// JSON-RPC endpoint (bundles, simulation, private transactions)
    pub rpc_url: String,
    /// Event stream endpoint; also serves the history API
    pub stream_url: String,
    /// Timeout for each RPC or history request
    pub request_timeout_ms: u64,
    /// Stream reconnect behaviour
    pub reconnect: ReconnectPolicy,
}

impl Default for MevShareConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl MevShareConfig {
    pub const MAINNET_CHAIN_ID: u64 = 1;
    pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;
    pub const HOLESKY_CHAIN_ID: u64 = 17_000;

    pub fn new(rpc_url: impl Into<String>, stream_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            stream_url: stream_url.into(),
            request_timeout_ms: 30_000,
            reconnect: ReconnectPolicy::default(),
        }
    }

    pub fn mainnet() -> Self {
        Self::new("https://relay.flashbots.net", "https://mev-share.flashbots.net")
    }

    pub fn sepolia() -> Self {
        Self::new(
            "https://relay-sepolia.flashbots.net",
            "https://mev-share-sepolia.flashbots.net",
        )
    }

    pub fn holesky() -> Self {
        Self::new(
            "https://relay-holesky.flashbots.net",
            "https://mev-share-holesky.flashbots.net",
        )
    }

    /// Preset for a chain id, if one is known
    pub fn for_chain_id(chain_id: u64) -> Option<Self> {
        match chain_id {
            Self::MAINNET_CHAIN_ID => Some(Self::mainnet()),
            Self::SEPOLIA_CHAIN_ID => Some(Self::sepolia()),
            Self::HOLESKY_CHAIN_ID => Some(Self::holesky()),
            _ => None,
        }
    }

    pub fn with_rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = url.into();
        self
    }

    pub fn with_stream_url(mut self, url: impl Into<String>) -> Self {
        self.stream_url = url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
