//! MEV-Share Client
//!
//! Validates and encodes requests, sends them through the RPC transport and
//! decodes the replies. Local validation failures never reach the network.

use crate::{
    config::MevShareConfig,
    error::Result,
    sse::{SseTransport, StreamTransport},
    subscriptions::SubscriptionManager,
    transport::{HttpTransport, RequestSigner, RpcTransport},
};
use mev_share_types::{
    build_send_bundle_params, build_send_transaction_params, build_sim_bundle_params,
    decode_event_history, decode_event_history_info, decode_send_bundle_response,
    decode_send_transaction_response, decode_sim_bundle_response, history, methods, BundleParams,
    Bytes, EventHistoryEntry, EventHistoryInfo, EventHistoryParams, SendBundleResult,
    SimBundleOptions, SimBundleResult, TransactionOptions, B256,
};
use std::sync::Arc;

/// Client for the MEV-Share relay and event stream
pub struct MevShareClient {
    config: MevShareConfig,
    rpc: Arc<dyn RpcTransport>,
    subscriptions: Arc<SubscriptionManager>,
}

impl MevShareClient {
    /// Client over HTTP and SSE for `config`, without request signing
    pub fn new(config: MevShareConfig) -> Result<Self> {
        MevShareClientBuilder::new(config).build()
    }

    pub fn builder(config: MevShareConfig) -> MevShareClientBuilder {
        MevShareClientBuilder::new(config)
    }

    pub fn config(&self) -> &MevShareConfig {
        &self.config
    }

    /// Submit a bundle (`mev_sendBundle`)
    pub async fn send_bundle(&self, bundle: &BundleParams) -> Result<SendBundleResult> {
        let params = build_send_bundle_params(bundle)?;
        tracing::info!(
            "Sending bundle for block {} ({} body entries)",
            bundle.inclusion.block,
            bundle.body.len()
        );

        let raw = self.rpc.call(methods::SEND_BUNDLE, params).await?;
        let result = decode_send_bundle_response(&raw)?;
        tracing::debug!("Bundle accepted: {}", result.bundle_hash);
        Ok(result)
    }

    /// Simulate a bundle (`mev_simBundle`). A failed simulation is returned as
    /// a result with `success = false`.
    pub async fn sim_bundle(
        &self,
        bundle: &BundleParams,
        options: &SimBundleOptions,
    ) -> Result<SimBundleResult> {
        let params = build_sim_bundle_params(bundle, options)?;
        tracing::info!("Simulating bundle for block {}", bundle.inclusion.block);

        let raw = self.rpc.call(methods::SIM_BUNDLE, params).await?;
        let result = decode_sim_bundle_response(&raw)?;
        if let Some(error) = result.failure() {
            tracing::debug!("Simulation failed at state block {}: {}", result.state_block, error);
        }
        Ok(result)
    }

    /// Send a signed transaction privately (`eth_sendPrivateTransaction`)
    pub async fn send_transaction(
        &self,
        signed_tx: &Bytes,
        options: &TransactionOptions,
    ) -> Result<B256> {
        let params = build_send_transaction_params(signed_tx, options)?;
        tracing::info!("Sending private transaction ({} bytes)", signed_tx.len());

        let raw = self.rpc.call(methods::SEND_PRIVATE_TRANSACTION, params).await?;
        Ok(decode_send_transaction_response(&raw)?)
    }

    /// Range covered by the event history
    pub async fn event_history_info(&self) -> Result<EventHistoryInfo> {
        let raw = self.rpc.fetch(history::HISTORY_INFO_PATH, &[]).await?;
        Ok(decode_event_history_info(&raw)?)
    }

    /// Past events matching `params`
    pub async fn event_history(
        &self,
        params: &EventHistoryParams,
    ) -> Result<Vec<EventHistoryEntry>> {
        let raw = self.rpc.fetch(history::HISTORY_PATH, &params.to_query()).await?;
        Ok(decode_event_history(&raw)?)
    }

    /// Event stream subscriptions
    pub fn subscriptions(&self) -> &Arc<SubscriptionManager> {
        &self.subscriptions
    }
}

/// Builder for `MevShareClient`
pub struct MevShareClientBuilder {
    config: MevShareConfig,
    signer: Option<Arc<dyn RequestSigner>>,
    rpc: Option<Arc<dyn RpcTransport>>,
    stream: Option<Arc<dyn StreamTransport>>,
}

impl MevShareClientBuilder {
    pub fn new(config: MevShareConfig) -> Self {
        Self {
            config,
            signer: None,
            rpc: None,
            stream: None,
        }
    }

    /// Sign RPC requests; ignored when a custom RPC transport is set
    pub fn signer(mut self, signer: Arc<dyn RequestSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn rpc_transport(mut self, transport: Arc<dyn RpcTransport>) -> Self {
        self.rpc = Some(transport);
        self
    }

    pub fn stream_transport(mut self, transport: Arc<dyn StreamTransport>) -> Self {
        self.stream = Some(transport);
        self
    }

    pub fn build(self) -> Result<MevShareClient> {
        let rpc = match self.rpc {
            Some(rpc) => rpc,
            None => {
                let mut http = HttpTransport::new(&self.config)?;
                if let Some(signer) = self.signer {
                    http = http.with_signer(signer);
                }
                Arc::new(http)
            }
        };
        let stream = self
            .stream
            .unwrap_or_else(|| Arc::new(SseTransport::new()));

        let subscriptions = Arc::new(SubscriptionManager::new(
            stream,
            self.config.stream_url.clone(),
            self.config.reconnect,
        ));

        Ok(MevShareClient {
            config: self.config,
            rpc,
            subscriptions,
        })
    }
}
