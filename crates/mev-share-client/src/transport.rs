//! RPC Transport - JSON-RPC over HTTP
//!
//! `RpcTransport` is the seam between the client and the network. The HTTP
//! implementation posts JSON-RPC envelopes to the relay and issues plain GETs
//! against the stream service's history API.

use crate::{config::MevShareConfig, error::TransportError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// Header carrying the request signature
pub const SIGNATURE_HEADER: &str = "X-Flashbots-Signature";

/// Produces the signature header value for a serialized request body
pub trait RequestSigner: Send + Sync {
    fn sign(&self, body: &[u8]) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

/// Performs RPC calls and history lookups
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Call a JSON-RPC method and return its `result`
    async fn call(&self, method: &str, params: Value) -> Result<Value, TransportError>;

    /// GET a JSON document from the stream service's API
    async fn fetch(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<Value, TransportError>;
}

/// JSON-RPC request
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

/// JSON-RPC response
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    /// Split into the result or the service-reported error
    pub fn into_result(self) -> Result<Value, TransportError> {
        if let Some(error) = self.error {
            return Err(TransportError::Rpc {
                code: error.code,
                message: error.message,
                data: error.data,
            });
        }
        self.result.ok_or_else(|| {
            TransportError::InvalidResponse("response has neither result nor error".to_string())
        })
    }
}

/// HTTP transport backed by reqwest
pub struct HttpTransport {
    client: reqwest::Client,
    rpc_url: String,
    api_url: String,
    signer: Option<Arc<dyn RequestSigner>>,
    next_id: AtomicU64,
}

impl HttpTransport {
    /// Create a transport for the endpoints in `config`
    pub fn new(config: &MevShareConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            rpc_url: config.rpc_url.clone(),
            api_url: config.stream_url.trim_end_matches('/').to_string(),
            signer: None,
            next_id: AtomicU64::new(1),
        })
    }

    /// Sign every RPC request with `signer`
    pub fn with_signer(mut self, signer: Arc<dyn RequestSigner>) -> Self {
        self.signer = Some(signer);
        self
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn call(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        let body = serde_json::to_vec(&request)
            .map_err(|e| {
                TransportError::InvalidResponse(format!("cannot serialize request: {e}"))
            })?;

        let mut builder = self
            .client
            .post(&self.rpc_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(signer) = &self.signer {
            let signature = signer
                .sign(&body)
                .map_err(|e| TransportError::Signing(e.to_string()))?;
            builder = builder.header(SIGNATURE_HEADER, signature);
        }

        tracing::debug!("RPC {} (id {})", method, id);
        let response = builder.body(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        // Relays answer some errors with a non-2xx status and a JSON-RPC error body
        let envelope = serde_json::from_str::<JsonRpcResponse>(&text);
        if !status.is_success() {
            return match envelope {
                Ok(envelope) if envelope.error.is_some() => envelope.into_result(),
                _ => Err(TransportError::Status {
                    status: status.as_u16(),
                    body: text,
                }),
            };
        }

        envelope
            .map_err(|e| TransportError::InvalidResponse(format!("{method}: {e}")))?
            .into_result()
    }

    async fn fetch(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<Value, TransportError> {
        let url = format!("{}{}", self.api_url, path);
        tracing::debug!("GET {}", url);

        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| TransportError::InvalidResponse(format!("{path}: {e}")))
    }
}
