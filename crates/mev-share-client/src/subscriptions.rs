//! Subscription Manager - Manages the matchmaker event stream
//!
//! One stream connection is shared by every subscription. A background task
//! reads it, decodes each event and invokes the handlers registered for its
//! kind in registration order. The connection is opened by the first
//! subscription, released by the last unsubscribe and re-opened with backoff
//! when it drops.

use crate::{
    config::ReconnectPolicy,
    error::{ClientError, StreamError},
    sse::{RawStreamMessage, StreamTransport},
};
use futures::StreamExt;
use mev_share_types::{decode_event, EventKind, PendingEvent};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use serde_json::Value;
use std::cell::Cell;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use tokio::{sync::watch, task::JoinHandle};

/// Subscription ID
pub type SubscriptionId = u64;

/// Callback invoked for each dispatched event
pub type EventHandler = Arc<dyn Fn(PendingEvent) + Send + Sync>;

/// Observer for stream errors
pub type ErrorHook = Arc<dyn Fn(&StreamError) + Send + Sync>;

/// Lifecycle of the stream connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Streaming,
    Reconnecting,
    Closed,
}

/// Ownership token for one registered handler
#[derive(Debug, PartialEq, Eq)]
#[must_use = "dropping the handle makes the subscription impossible to cancel"]
pub struct SubscriptionHandle {
    id: SubscriptionId,
    kind: EventKind,
}

impl SubscriptionHandle {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

/// Held while a handler runs; `false` once the subscription is cancelled.
/// Re-entrant so a handler may cancel its own subscription.
type Gate = Arc<ReentrantMutex<Cell<bool>>>;

struct HandlerEntry {
    id: SubscriptionId,
    kind: EventKind,
    handler: EventHandler,
    gate: Gate,
}

struct Connection {
    generation: u64,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct ConnectionSlot {
    current: Option<Connection>,
    generation: u64,
}

struct Shared {
    transport: Arc<dyn StreamTransport>,
    url: String,
    policy: ReconnectPolicy,
    /// Handlers in registration order
    registry: Mutex<Vec<HandlerEntry>>,
    connection: Mutex<ConnectionSlot>,
    state: watch::Sender<ConnectionState>,
    closed: AtomicBool,
    error_hook: RwLock<ErrorHook>,
    next_id: AtomicU64,
}

/// Manages event subscriptions over a single stream connection
pub struct SubscriptionManager {
    shared: Arc<Shared>,
}

fn default_error_hook() -> ErrorHook {
    Arc::new(|error: &StreamError| tracing::warn!("Event stream: {}", error))
}

impl SubscriptionManager {
    /// Create a manager for the stream at `url`; nothing connects until the
    /// first subscription
    pub fn new(
        transport: Arc<dyn StreamTransport>,
        url: impl Into<String>,
        policy: ReconnectPolicy,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            shared: Arc::new(Shared {
                transport,
                url: url.into(),
                policy,
                registry: Mutex::new(Vec::new()),
                connection: Mutex::new(ConnectionSlot::default()),
                state,
                closed: AtomicBool::new(false),
                error_hook: RwLock::new(default_error_hook()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Replace the observer for decode and connection errors
    pub fn set_error_hook<F>(&self, hook: F)
    where
        F: Fn(&StreamError) + Send + Sync + 'static,
    {
        *self.shared.error_hook.write() = Arc::new(hook);
    }

    /// Register `handler` for events of `kind`.
    ///
    /// Must be called from within a tokio runtime: the first subscription
    /// spawns the stream task.
    pub fn subscribe<F>(
        &self,
        kind: EventKind,
        handler: F,
    ) -> Result<SubscriptionHandle, ClientError>
    where
        F: Fn(PendingEvent) + Send + Sync + 'static,
    {
        if self.is_closed() {
            return Err(ClientError::SubscriptionClosed);
        }

        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        self.shared.registry.lock().push(HandlerEntry {
            id,
            kind,
            handler: Arc::new(handler),
            gate: Arc::new(ReentrantMutex::new(Cell::new(true))),
        });

        if !Shared::ensure_connected(&self.shared) {
            self.shared.registry.lock().retain(|entry| entry.id != id);
            return Err(ClientError::SubscriptionClosed);
        }

        tracing::debug!("Created subscription {} for {} events", id, kind);
        Ok(SubscriptionHandle { id, kind })
    }

    /// Register a handler for pending transactions
    pub fn on_transaction<F>(&self, handler: F) -> Result<SubscriptionHandle, ClientError>
    where
        F: Fn(PendingEvent) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::Transaction, handler)
    }

    /// Register a handler for pending bundles
    pub fn on_bundle<F>(&self, handler: F) -> Result<SubscriptionHandle, ClientError>
    where
        F: Fn(PendingEvent) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::Bundle, handler)
    }

    /// Cancel a subscription. Returns false if it was already removed.
    ///
    /// Once this returns the handler is never invoked again. If the handler is
    /// running on another thread, this waits for it to finish.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let (entry, now_empty) = {
            let mut registry = self.shared.registry.lock();
            let Some(pos) = registry.iter().position(|entry| entry.id == handle.id) else {
                return false;
            };
            let entry = registry.remove(pos);
            (entry, registry.is_empty())
        };

        entry.gate.lock().set(false);
        tracing::debug!("Removed subscription {}", entry.id);

        if now_empty {
            self.shared.release_if_idle();
        }
        true
    }

    /// Close the manager: cancel every subscription and any reconnect in
    /// progress. Later subscriptions fail with `SubscriptionClosed`.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let entries: Vec<HandlerEntry> = self.shared.registry.lock().drain(..).collect();
        self.shared.release_for_close();
        for entry in entries {
            entry.gate.lock().set(false);
        }
        tracing::info!("Subscription manager closed");
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Receiver that observes every state change
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Get subscription count
    pub fn subscription_count(&self) -> usize {
        self.shared.registry.lock().len()
    }

    /// Check if a subscription exists
    pub fn has_subscription(&self, handle: &SubscriptionHandle) -> bool {
        self.shared.registry.lock().iter().any(|entry| entry.id == handle.id)
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        self.close();
    }
}

impl Shared {
    /// Start the stream task unless one is running. False if the manager closed.
    fn ensure_connected(this: &Arc<Shared>) -> bool {
        let mut slot = this.connection.lock();
        if this.closed.load(Ordering::SeqCst) {
            return false;
        }
        if slot.current.is_some() {
            return true;
        }

        slot.generation += 1;
        let generation = slot.generation;
        this.state.send_replace(ConnectionState::Connecting);
        let task = tokio::spawn(run_stream(this.clone(), generation));
        slot.current = Some(Connection { generation, task });
        true
    }

    /// Drop the current connection for good
    fn release_for_close(&self) {
        let mut slot = self.connection.lock();
        if let Some(connection) = slot.current.take() {
            connection.task.abort();
        }
        self.state.send_replace(ConnectionState::Closed);
    }

    /// Release the connection unless a subscription arrived in the meantime
    fn release_if_idle(&self) {
        let mut slot = self.connection.lock();
        if !self.registry.lock().is_empty() {
            return;
        }
        if let Some(connection) = slot.current.take() {
            connection.task.abort();
            tracing::info!("Event stream released (connection {})", connection.generation);
        }
        self.state.send_replace(ConnectionState::Disconnected);
    }

    fn is_current(&self, generation: u64) -> bool {
        self.connection
            .lock()
            .current
            .as_ref()
            .is_some_and(|connection| connection.generation == generation)
    }

    /// Update the state on behalf of the task owning `generation`
    fn set_state(&self, generation: u64, state: ConnectionState) -> bool {
        let slot = self.connection.lock();
        let current = slot
            .current
            .as_ref()
            .is_some_and(|connection| connection.generation == generation);
        if current {
            self.state.send_replace(state);
        }
        current
    }

    /// Terminal failure: reconnect attempts ran out
    fn exhaust(&self, generation: u64, attempts: u32) {
        let entries: Vec<HandlerEntry> = {
            let mut slot = self.connection.lock();
            if slot.current.as_ref().map(|c| c.generation) != Some(generation) {
                return;
            }
            // Dropping our own JoinHandle detaches the task; it returns right after
            slot.current = None;
            self.closed.store(true, Ordering::SeqCst);
            self.state.send_replace(ConnectionState::Closed);
            self.registry.lock().drain(..).collect()
        };
        for entry in entries {
            entry.gate.lock().set(false);
        }
        self.report(&StreamError::ReconnectExhausted { attempts });
    }

    fn report(&self, error: &StreamError) {
        let hook = self.error_hook.read().clone();
        hook(error);
    }

    /// Handlers for `kind`, provided `generation` still owns the connection
    fn handlers_for(&self, generation: u64, kind: EventKind) -> Vec<(EventHandler, Gate)> {
        let slot = self.connection.lock();
        if slot.current.as_ref().map(|c| c.generation) != Some(generation) {
            return Vec::new();
        }
        self.registry
            .lock()
            .iter()
            .filter(|entry| entry.kind == kind)
            .map(|entry| (entry.handler.clone(), entry.gate.clone()))
            .collect()
    }

    fn dispatch(&self, generation: u64, message: RawStreamMessage) {
        let declared = match message.event.as_deref() {
            None | Some("") | Some("message") => None,
            Some(name) => match EventKind::from_event_name(name) {
                Some(kind) => Some(kind),
                None => {
                    tracing::debug!("Dropping stream event of unknown kind {:?}", name);
                    return;
                }
            },
        };

        let raw: Value = match serde_json::from_str(&message.data) {
            Ok(raw) => raw,
            Err(e) => {
                self.report(&StreamError::Decode(e.into()));
                return;
            }
        };
        let kind = declared.unwrap_or_else(|| EventKind::infer(&raw));

        let event = match decode_event(kind, &raw) {
            Ok(event) => event,
            Err(e) => {
                self.report(&StreamError::Decode(e));
                return;
            }
        };

        for (handler, gate) in self.handlers_for(generation, kind) {
            let active = gate.lock();
            if active.get() {
                handler(event.clone());
            }
        }
    }
}

/// Stream task: connect, dispatch until the connection drops, back off, repeat
async fn run_stream(shared: Arc<Shared>, generation: u64) {
    // Reconnect attempts since the last successful open
    let mut attempts: u32 = 0;

    loop {
        if !shared.is_current(generation) {
            return;
        }

        let opened = shared.transport.open(&shared.url).await;
        if !shared.is_current(generation) {
            return;
        }

        match opened {
            Ok(mut messages) => {
                attempts = 0;
                if !shared.set_state(generation, ConnectionState::Streaming) {
                    return;
                }

                let error = loop {
                    match messages.next().await {
                        Some(Ok(message)) => shared.dispatch(generation, message),
                        Some(Err(e)) => break e,
                        None => break StreamError::Connection("stream ended".to_string()),
                    }
                };
                if !shared.is_current(generation) {
                    return;
                }
                shared.report(&error);
            }
            Err(e) => shared.report(&e),
        }

        if !shared.policy.allows(attempts) {
            shared.exhaust(generation, attempts);
            return;
        }
        attempts += 1;

        if !shared.set_state(generation, ConnectionState::Reconnecting) {
            return;
        }
        let delay = shared.policy.delay_for(attempts);
        tracing::info!("Reconnecting event stream in {:?} (attempt {})", delay, attempts);
        tokio::time::sleep(delay).await;
    }
}
