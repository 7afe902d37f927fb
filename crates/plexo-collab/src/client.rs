// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The collaboration client: session connection, reconnect state machine,
//! heartbeat, and conflict-policy dispatch.
//!
//! Connection states: disconnected -> connecting -> connected, returning to
//! connecting after an unexpected close. Reconnect waits
//! `base_delay * 2^attempt`, bounded by the configured attempt cap;
//! exhausting the cap stops retrying with a terminal log entry only. All
//! timers hang off one cancellation token cleared by `disconnect()`.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::{Sink, SinkExt, Stream, StreamExt};
use plexo_config::model::{CollabConfig, ConflictPolicy};
use plexo_core::{BridgeService, InstanceId, PlexoError, ServiceContext};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::events::{event_types, CollabEvent};
use crate::state::CollaborationState;

/// Connection state of the collaboration client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// Handle returned by [`CollaborationService::on`], used to unsubscribe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSubscription {
    event_type: String,
    id: u64,
}

type EventHandler = Box<dyn Fn(&CollabEvent) + Send + Sync>;

/// State shared between the service handle and the connection task.
struct Shared {
    policy: ConflictPolicy,
    status: Mutex<ConnectionStatus>,
    state: Mutex<CollaborationState>,
    subscribers: Mutex<HashMap<String, Vec<(u64, EventHandler)>>>,
    next_subscription: AtomicU64,
    pending_conflicts: Mutex<HashMap<String, CollabEvent>>,
    reconnect_delays: Mutex<Vec<Duration>>,
}

impl Shared {
    fn new(policy: ConflictPolicy) -> Self {
        Self {
            policy,
            status: Mutex::new(ConnectionStatus::Disconnected),
            state: Mutex::new(CollaborationState::default()),
            subscribers: Mutex::new(HashMap::new()),
            next_subscription: AtomicU64::new(1),
            pending_conflicts: Mutex::new(HashMap::new()),
            reconnect_delays: Mutex::new(Vec::new()),
        }
    }

    fn set_status(&self, status: ConnectionStatus) {
        *self.status.lock().unwrap_or_else(|e| e.into_inner()) = status;
    }

    fn status(&self) -> ConnectionStatus {
        *self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record_delay(&self, delay: Duration) {
        self.reconnect_delays
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(delay);
    }

    /// Fold an incoming event into session state and dispatch it to
    /// subscribers, applying the conflict policy to layout changes.
    fn handle_incoming(&self, event: CollabEvent) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.apply_event(&event);
        }

        if event.event_type != event_types::LAYOUT {
            self.emit(&event);
            return;
        }

        match self.policy {
            ConflictPolicy::LastWriteWins => self.emit(&event),
            ConflictPolicy::AutoMerge => {
                // No merge algorithm here; the subscriber reconciles.
                let intent = CollabEvent::new(
                    event_types::MERGE_INTENT,
                    &event.user_id,
                    json!({"incoming": event.data}),
                );
                self.emit(&intent);
            }
            ConflictPolicy::Manual => {
                let conflict_id = uuid::Uuid::new_v4().to_string();
                let conflict = CollabEvent::new(
                    event_types::CONFLICT,
                    &event.user_id,
                    json!({"conflict_id": conflict_id, "incoming": event.data}),
                );
                self.pending_conflicts
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(conflict_id, event);
                self.emit(&conflict);
            }
        }
    }

    fn emit(&self, event: &CollabEvent) {
        let subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        let Some(handlers) = subscribers.get(&event.event_type) else {
            return;
        };
        for (id, handler) in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                warn!(
                    event_type = %event.event_type,
                    subscription = id,
                    "collaboration subscriber panicked"
                );
            }
        }
    }
}

struct Session {
    session_id: String,
    user_id: String,
}

/// Real-time collaboration client for one bridge.
pub struct CollaborationService {
    config: CollabConfig,
    shared: Arc<Shared>,
    session: Mutex<Option<Session>>,
    outbound: Mutex<Option<mpsc::Sender<CollabEvent>>>,
    cancel: Mutex<Option<CancellationToken>>,
}

impl CollaborationService {
    /// Service name in the registry.
    pub const NAME: &'static str = "collaboration";

    /// Create a client from configuration. No connection is made until
    /// [`connect`](Self::connect).
    pub fn new(config: CollabConfig) -> Self {
        let policy = config.conflict_policy;
        Self {
            config,
            shared: Arc::new(Shared::new(policy)),
            session: Mutex::new(None),
            outbound: Mutex::new(None),
            cancel: Mutex::new(None),
        }
    }

    /// Join a session and start the connection loop in the background.
    ///
    /// Replaces any previous session: an existing connection is cancelled
    /// first. Returns immediately; connection progress is observable through
    /// [`status`](Self::status).
    pub async fn connect(&self, session_id: &str, user_id: &str) -> Result<(), PlexoError> {
        self.disconnect();

        let cancel = CancellationToken::new();
        let (outbound_tx, outbound_rx) = mpsc::channel(64);

        *self.session.lock().unwrap_or_else(|e| e.into_inner()) = Some(Session {
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
        });
        *self.outbound.lock().unwrap_or_else(|e| e.into_inner()) = Some(outbound_tx);
        *self.cancel.lock().unwrap_or_else(|e| e.into_inner()) = Some(cancel.clone());

        tokio::spawn(connection_loop(
            Arc::clone(&self.shared),
            self.config.clone(),
            session_id.to_string(),
            user_id.to_string(),
            outbound_rx,
            cancel,
        ));

        Ok(())
    }

    /// Leave the session: cancels the connection loop and every timer
    /// hanging off it (heartbeat, pending reconnects).
    pub fn disconnect(&self) {
        if let Some(cancel) = self.cancel.lock().unwrap_or_else(|e| e.into_inner()).take() {
            cancel.cancel();
        }
        self.outbound.lock().unwrap_or_else(|e| e.into_inner()).take();
        self.session.lock().unwrap_or_else(|e| e.into_inner()).take();
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.shared.status()
    }

    /// Copy of the current session presence state.
    pub fn collaboration_state(&self) -> CollaborationState {
        self.shared
            .state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Delays scheduled between reconnect attempts so far, oldest first.
    pub fn reconnect_delays(&self) -> Vec<Duration> {
        self.shared
            .reconnect_delays
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Subscribe to events of one type. Handlers run on the connection task.
    pub fn on(
        &self,
        event_type: impl Into<String>,
        handler: impl Fn(&CollabEvent) + Send + Sync + 'static,
    ) -> EventSubscription {
        let event_type = event_type.into();
        let id = self.shared.next_subscription.fetch_add(1, Ordering::Relaxed);
        self.shared
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(event_type.clone())
            .or_default()
            .push((id, Box::new(handler)));
        EventSubscription { event_type, id }
    }

    /// Remove a subscription. Returns true if it was still registered.
    pub fn off(&self, subscription: EventSubscription) -> bool {
        let mut subscribers = self
            .shared
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let Some(handlers) = subscribers.get_mut(&subscription.event_type) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(id, _)| *id != subscription.id);
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            subscribers.remove(&subscription.event_type);
        }
        removed
    }

    /// Broadcast a cursor position to the session.
    pub fn broadcast_cursor_move(&self, x: f64, y: f64) {
        self.send(event_types::CURSOR, json!({"x": x, "y": y}));
    }

    /// Broadcast the local selection to the session.
    pub fn broadcast_selection_change(&self, instance_ids: &[InstanceId]) {
        let ids: Vec<&str> = instance_ids.iter().map(|i| i.0.as_str()).collect();
        self.send(event_types::SELECTION, json!({"instance_ids": ids}));
    }

    /// Broadcast a layout change to the session.
    pub fn broadcast_layout_change(&self, layout: Value) {
        self.send(event_types::LAYOUT, layout);
    }

    /// Attach a comment, optionally targeting one placed instance.
    pub fn add_comment(&self, text: &str, target: Option<&InstanceId>) {
        self.send(
            event_types::COMMENT,
            json!({"text": text, "target": target.map(|t| t.0.as_str())}),
        );
    }

    /// Resolve a conflict raised under the manual policy.
    ///
    /// With `apply`, the withheld layout event is dispatched to subscribers;
    /// otherwise it is discarded. Returns false for unknown conflict ids.
    pub fn resolve_conflict(&self, conflict_id: &str, apply: bool) -> bool {
        let withheld = self
            .shared
            .pending_conflicts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(conflict_id);
        match withheld {
            None => false,
            Some(event) => {
                if apply {
                    self.shared.emit(&event);
                }
                true
            }
        }
    }

    /// Number of conflicts awaiting resolution.
    pub fn pending_conflicts(&self) -> usize {
        self.shared
            .pending_conflicts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Fire-and-forget enqueue of an outbound event; no-op when not
    /// connected.
    fn send(&self, event_type: &str, data: Value) {
        if self.shared.status() != ConnectionStatus::Connected {
            debug!(event_type = %event_type, "not connected, event not broadcast");
            return;
        }
        let user_id = {
            let session = self.session.lock().unwrap_or_else(|e| e.into_inner());
            match session.as_ref() {
                Some(session) => session.user_id.clone(),
                None => return,
            }
        };
        let outbound = self.outbound.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(tx) = outbound.as_ref()
            && tx.try_send(CollabEvent::new(event_type, user_id, data)).is_err()
        {
            warn!(event_type = %event_type, "outbound event queue full, event dropped");
        }
    }

    #[cfg(test)]
    pub(crate) fn inject_incoming(&self, event: CollabEvent) {
        self.shared.handle_incoming(event);
    }
}

#[async_trait]
impl BridgeService for CollaborationService {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn initialize(&self, _ctx: &ServiceContext) -> Result<(), PlexoError> {
        // Sessions are joined explicitly via `connect`; nothing to do here.
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), PlexoError> {
        self.disconnect();
        Ok(())
    }
}

/// Reason a single connection ended.
enum CloseReason {
    /// `disconnect()` was called; do not reconnect.
    Local,
    /// The server closed or errored; the reconnect machine takes over.
    Remote,
}

/// Outer loop: connect, run, and reconnect with exponential backoff.
async fn connection_loop(
    shared: Arc<Shared>,
    config: CollabConfig,
    session_id: String,
    user_id: String,
    mut outbound_rx: mpsc::Receiver<CollabEvent>,
    cancel: CancellationToken,
) {
    let url = format!(
        "{}/session/{}",
        config.server_url.trim_end_matches('/'),
        session_id
    );
    let mut attempt: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            break;
        }

        shared.set_status(ConnectionStatus::Connecting);
        match connect_async(url.as_str()).await {
            Ok((ws, _response)) => {
                attempt = 0;
                shared.set_status(ConnectionStatus::Connected);
                info!(session = %session_id, "collaboration session connected");

                let reason =
                    run_connection(ws, &shared, &config, &user_id, &mut outbound_rx, &cancel)
                        .await;
                shared.set_status(ConnectionStatus::Disconnected);

                match reason {
                    CloseReason::Local => break,
                    CloseReason::Remote => {
                        warn!(session = %session_id, "connection lost, scheduling reconnect");
                    }
                }
            }
            Err(e) => {
                shared.set_status(ConnectionStatus::Disconnected);
                warn!(session = %session_id, error = %e, "connection attempt failed");
            }
        }

        if attempt >= config.max_reconnect_attempts {
            error!(
                session = %session_id,
                attempts = attempt,
                "max reconnect attempts reached, giving up"
            );
            break;
        }

        // Exponential backoff: base * 2^attempt. The shift is clamped so
        // pathological attempt caps cannot overflow.
        let delay = Duration::from_millis(
            config
                .reconnect_base_delay_ms
                .saturating_mul(1u64 << attempt.min(16)),
        );
        shared.record_delay(delay);
        attempt += 1;
        debug!(delay_ms = delay.as_millis() as u64, attempt, "reconnect scheduled");

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    shared.set_status(ConnectionStatus::Disconnected);
}

/// Drive one established connection until it ends.
async fn run_connection<S>(
    ws: S,
    shared: &Shared,
    config: &CollabConfig,
    user_id: &str,
    outbound_rx: &mut mpsc::Receiver<CollabEvent>,
    cancel: &CancellationToken,
) -> CloseReason
where
    S: Stream<Item = Result<Message, tungstenite::Error>>
        + Sink<Message, Error = tungstenite::Error>
        + Unpin,
{
    let (mut sink, mut stream) = ws.split();

    let join = CollabEvent::new(event_types::JOIN, user_id, json!({}));
    if send_event(&mut sink, &join).await.is_err() {
        return CloseReason::Remote;
    }

    let heartbeat_period = Duration::from_secs(config.heartbeat_interval_secs.max(1));
    let mut heartbeat = tokio::time::interval_at(
        tokio::time::Instant::now() + heartbeat_period,
        heartbeat_period,
    );
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let leave = CollabEvent::new(event_types::LEAVE, user_id, json!({}));
                let _ = send_event(&mut sink, &leave).await;
                let _ = sink.send(Message::Close(None)).await;
                return CloseReason::Local;
            }
            outbound = outbound_rx.recv() => {
                match outbound {
                    Some(event) => {
                        if send_event(&mut sink, &event).await.is_err() {
                            return CloseReason::Remote;
                        }
                    }
                    // Sender side dropped: the service is gone.
                    None => return CloseReason::Local,
                }
            }
            _ = heartbeat.tick() => {
                let beat = CollabEvent::new(event_types::HEARTBEAT, user_id, json!({}));
                if send_event(&mut sink, &beat).await.is_err() {
                    return CloseReason::Remote;
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<CollabEvent>(text.as_str()) {
                            Ok(event) => shared.handle_incoming(event),
                            Err(e) => warn!(error = %e, "invalid collaboration event ignored"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return CloseReason::Remote,
                    Some(Ok(_)) => {} // binary, ping, pong: handled by the protocol layer
                    Some(Err(e)) => {
                        warn!(error = %e, "collaboration socket error");
                        return CloseReason::Remote;
                    }
                }
            }
        }
    }
}

async fn send_event<S>(sink: &mut S, event: &CollabEvent) -> Result<(), tungstenite::Error>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "unserializable collaboration event dropped");
            return Ok(());
        }
    };
    sink.send(Message::Text(text.into())).await
}
