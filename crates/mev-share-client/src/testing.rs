//! In-memory transports for tests

use crate::{
    error::{StreamError, TransportError},
    sse::{MessageStream, RawStreamMessage, StreamTransport},
    transport::RpcTransport,
};
use async_trait::async_trait;
use futures::{channel::mpsc, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

pub(crate) type MessageSender = mpsc::UnboundedSender<Result<RawStreamMessage, StreamError>>;

enum Scripted {
    Connection(mpsc::UnboundedReceiver<Result<RawStreamMessage, StreamError>>),
    Failure(String),
}

/// Stream transport that hands out scripted connections in order.
/// With nothing scripted, `open` never completes.
#[derive(Default)]
pub(crate) struct ScriptedStream {
    script: Mutex<VecDeque<Scripted>>,
    opened: AtomicUsize,
}

impl ScriptedStream {
    /// Script a successful connection; dropping the sender ends it
    pub fn connection(&self) -> MessageSender {
        let (tx, rx) = mpsc::unbounded();
        self.script.lock().push_back(Scripted::Connection(rx));
        tx
    }

    /// Script a failed connection attempt
    pub fn failure(&self, reason: &str) {
        self.script.lock().push_back(Scripted::Failure(reason.to_string()));
    }

    /// Number of `open` calls so far
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamTransport for ScriptedStream {
    async fn open(&self, _url: &str) -> Result<MessageStream, StreamError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front();
        match next {
            Some(Scripted::Connection(rx)) => Ok(rx.boxed()),
            Some(Scripted::Failure(reason)) => Err(StreamError::Connection(reason)),
            None => futures::future::pending().await,
        }
    }
}

/// RPC transport that records calls and answers from a queue
#[derive(Default)]
pub(crate) struct RecordingRpc {
    pub calls: Mutex<Vec<(String, Value)>>,
    pub fetches: Mutex<Vec<(String, Vec<(&'static str, String)>)>>,
    responses: Mutex<VecDeque<Result<Value, TransportError>>>,
}

impl RecordingRpc {
    pub fn respond(&self, response: Result<Value, TransportError>) {
        self.responses.lock().push_back(response);
    }

    fn next_response(&self) -> Result<Value, TransportError> {
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError::InvalidResponse(
                    "no response scripted".to_string(),
                ))
            })
    }
}

#[async_trait]
impl RpcTransport for RecordingRpc {
    async fn call(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        self.calls.lock().push((method.to_string(), params));
        self.next_response()
    }

    async fn fetch(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<Value, TransportError> {
        self.fetches.lock().push((path.to_string(), query.to_vec()));
        self.next_response()
    }
}
