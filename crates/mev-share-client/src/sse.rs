//! Event Stream Transport - Server-Sent Events over HTTP
//!
//! The matchmaker pushes events as an SSE stream. `StreamTransport` opens one
//! connection and yields raw messages; dropping the stream closes it.

use crate::error::StreamError;
use async_trait::async_trait;
use futures::{stream::BoxStream, StreamExt};

/// One dispatched SSE message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawStreamMessage {
    /// Declared event name, if the server sent one
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
}

impl RawStreamMessage {
    /// A default-named message carrying `data`
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            ..Self::default()
        }
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }
}

/// Messages of one open connection; an `Err` item or the end of the stream
/// means the connection is gone
pub type MessageStream = BoxStream<'static, Result<RawStreamMessage, StreamError>>;

/// Opens event stream connections
#[async_trait]
pub trait StreamTransport: Send + Sync {
    async fn open(&self, url: &str) -> Result<MessageStream, StreamError>;
}

/// Largest pending line or message body the decoder holds, in bytes
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 1024 * 1024;

/// Incremental SSE parser
#[derive(Debug)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    data_len: usize,
    id: Option<String>,
    max_message_bytes: usize,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_max_message_bytes(DEFAULT_MAX_MESSAGE_BYTES)
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_message_bytes(max_message_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            event: None,
            data: Vec::new(),
            data_len: 0,
            id: None,
            max_message_bytes,
        }
    }

    /// Feed a chunk and collect every message it completes.
    ///
    /// Fails once an unterminated line or a message body grows past the size
    /// limit; the decoder drops its pending state and the connection should
    /// be abandoned.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<RawStreamMessage>, StreamError> {
        self.buffer.extend_from_slice(chunk);
        let mut messages = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            let line = String::from_utf8_lossy(&line);
            if let Some(message) = self.process_line(&line) {
                messages.push(message);
            }
            if self.data_len > self.max_message_bytes {
                return Err(self.overflow("message"));
            }
        }

        if self.buffer.len() > self.max_message_bytes {
            return Err(self.overflow("line"));
        }
        Ok(messages)
    }

    fn overflow(&mut self, what: &str) -> StreamError {
        self.buffer.clear();
        self.data.clear();
        self.data_len = 0;
        self.event = None;
        StreamError::Connection(format!(
            "stream {what} exceeds {} bytes",
            self.max_message_bytes
        ))
    }

    fn process_line(&mut self, line: &str) -> Option<RawStreamMessage> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => {
                self.data_len += value.len() + 1;
                self.data.push(value.to_string());
            }
            "id" => self.id = Some(value.to_string()),
            // retry and unknown fields are ignored
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<RawStreamMessage> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        self.data_len = 0;
        let data = std::mem::take(&mut self.data).join("\n");
        Some(RawStreamMessage {
            event,
            data,
            id: self.id.clone(),
        })
    }
}

/// SSE over reqwest
pub struct SseTransport {
    client: reqwest::Client,
}

impl SseTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for SseTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StreamTransport for SseTransport {
    async fn open(&self, url: &str) -> Result<MessageStream, StreamError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| StreamError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::Connection(format!("{url} answered HTTP {status}")));
        }

        tracing::info!("Event stream connected to {}", url);

        let mut decoder = SseDecoder::new();
        let messages = response
            .bytes_stream()
            .map(move |chunk| match chunk {
                Ok(bytes) => match decoder.feed(&bytes) {
                    Ok(messages) => messages.into_iter().map(Ok).collect::<Vec<_>>(),
                    Err(e) => vec![Err(e)],
                },
                Err(e) => vec![Err(StreamError::Connection(e.to_string()))],
            })
            .flat_map(futures::stream::iter);

        Ok(messages.boxed())
    }
}
