// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The state manager: three independent key-value tiers with synchronous
//! per-key subscriber notification, snapshot history, and pluggable
//! persistence.
//!
//! Subscribers for a given key observe strictly ordered updates: every
//! mutation notifies them synchronously before the mutating call returns.
//! No ordering is guaranteed across different keys.

use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use plexo_core::{InstanceId, PageId, PlexoError};
use serde_json::Value;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::snapshot::{StateSnapshot, SNAPSHOT_VERSION};
use crate::store::StateStore;

type Handler = Box<dyn Fn(&Value, Option<&Value>) + Send + Sync>;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionId {
    key: String,
    id: u64,
}

#[derive(Default)]
struct Tiers {
    module: HashMap<String, Value>,
    page: HashMap<String, Value>,
    global: HashMap<String, Value>,
}

impl Tiers {
    fn to_snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            version: SNAPSHOT_VERSION,
            timestamp: chrono::Utc::now().to_rfc3339(),
            module_states: self.module.clone(),
            page_states: self.page.clone(),
            global_state: self.global.clone(),
        }
    }

    fn replace_from(&mut self, snapshot: &StateSnapshot) {
        self.module.clear();
        self.page.clear();
        self.global.clear();
        self.module.extend(snapshot.module_states.clone());
        self.page.extend(snapshot.page_states.clone());
        self.global.extend(snapshot.global_state.clone());
    }
}

/// Three-tier state store with subscriptions, history, and persistence.
pub struct StateManager {
    tiers: RwLock<Tiers>,
    subscribers: Mutex<HashMap<String, Vec<(u64, Handler)>>>,
    next_subscription: AtomicU64,
    history: Mutex<VecDeque<StateSnapshot>>,
    history_limit: usize,
    store: Arc<dyn StateStore>,
    storage_key: String,
    dirty: Notify,
}

impl StateManager {
    /// Create a manager over the given store.
    pub fn new(store: Arc<dyn StateStore>, storage_key: impl Into<String>, history_limit: usize) -> Self {
        Self {
            tiers: RwLock::new(Tiers::default()),
            subscribers: Mutex::new(HashMap::new()),
            next_subscription: AtomicU64::new(1),
            history: Mutex::new(VecDeque::new()),
            history_limit: history_limit.max(1),
            store,
            storage_key: storage_key.into(),
            dirty: Notify::new(),
        }
    }

    // --- Tier accessors ---

    /// State for one module instance.
    pub fn get_module_state(&self, id: &InstanceId) -> Option<Value> {
        let tiers = self.tiers.read().unwrap_or_else(|e| e.into_inner());
        tiers.module.get(&id.0).cloned()
    }

    /// Replace the state of one module instance.
    pub fn set_module_state(&self, id: &InstanceId, value: Value) {
        self.set(Tier::Module, id.0.clone(), value);
    }

    /// State for one page.
    pub fn get_page_state(&self, id: &PageId) -> Option<Value> {
        let tiers = self.tiers.read().unwrap_or_else(|e| e.into_inner());
        tiers.page.get(&id.0).cloned()
    }

    /// Replace the state of one page.
    pub fn set_page_state(&self, id: &PageId, value: Value) {
        self.set(Tier::Page, id.0.clone(), value);
    }

    /// One global state entry.
    pub fn get_global_state(&self, key: &str) -> Option<Value> {
        let tiers = self.tiers.read().unwrap_or_else(|e| e.into_inner());
        tiers.global.get(key).cloned()
    }

    /// Replace one global state entry.
    pub fn set_global_state(&self, key: &str, value: Value) {
        self.set(Tier::Global, key.to_string(), value);
    }

    fn set(&self, tier: Tier, id: String, value: Value) {
        let subscriber_key = tier.subscriber_key(&id);

        let (old, snapshot) = {
            let mut tiers = self.tiers.write().unwrap_or_else(|e| e.into_inner());
            let map = match tier {
                Tier::Module => &mut tiers.module,
                Tier::Page => &mut tiers.page,
                Tier::Global => &mut tiers.global,
            };
            let old = map.insert(id, value.clone());
            (old, tiers.to_snapshot())
        };

        self.push_history(snapshot);
        self.notify(&subscriber_key, &value, old.as_ref());
        self.dirty.notify_one();
    }

    fn push_history(&self, snapshot: StateSnapshot) {
        let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        history.push_back(snapshot);
        while history.len() > self.history_limit {
            history.pop_front();
        }
    }

    /// Number of retained history snapshots.
    pub fn history_len(&self) -> usize {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    // --- Subscriptions ---

    /// Register a handler for mutations of one exact key
    /// (`module:<id>`, `page:<id>`, or `global:<key>`).
    ///
    /// The handler runs synchronously inside the mutating call with
    /// `(new_value, old_value)`. A panicking handler is caught and logged;
    /// remaining handlers still run.
    pub fn subscribe(
        &self,
        key: impl Into<String>,
        handler: impl Fn(&Value, Option<&Value>) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let key = key.into();
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers
            .entry(key.clone())
            .or_default()
            .push((id, Box::new(handler)));
        SubscriptionId { key, id }
    }

    /// Remove a subscription. Returns true if it was still registered.
    pub fn unsubscribe(&self, subscription: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        let Some(handlers) = subscribers.get_mut(&subscription.key) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(id, _)| *id != subscription.id);
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            subscribers.remove(&subscription.key);
        }
        removed
    }

    fn notify(&self, key: &str, new: &Value, old: Option<&Value>) {
        let subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        let Some(handlers) = subscribers.get(key) else {
            return;
        };
        for (id, handler) in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(new, old))).is_err() {
                warn!(key = %key, subscription = id, "state subscriber panicked");
            }
        }
    }

    // --- Persistence ---

    /// Write the current state to the store under the configured key.
    pub async fn persist(&self) -> Result<(), PlexoError> {
        let snapshot = {
            let tiers = self.tiers.read().unwrap_or_else(|e| e.into_inner());
            tiers.to_snapshot()
        };
        self.store.save(&self.storage_key, &snapshot).await?;
        debug!(storage_key = %self.storage_key, "state persisted");
        Ok(())
    }

    /// Persist, logging failure instead of propagating it. State continues
    /// to live in memory when the store is unavailable.
    pub async fn persist_logged(&self) {
        if let Err(e) = self.persist().await {
            warn!(error = %e, "state persistence failed, continuing in memory");
        }
    }

    /// Replace all three tiers from the last persisted snapshot.
    ///
    /// Clear-then-repopulate, atomic with respect to readers. A missing
    /// snapshot leaves the (empty) tiers untouched; a snapshot from a newer
    /// format version is refused. Subscribers are not notified.
    pub async fn restore(&self) -> Result<(), PlexoError> {
        let Some(snapshot) = self.store.load(&self.storage_key).await? else {
            debug!(storage_key = %self.storage_key, "no persisted snapshot to restore");
            return Ok(());
        };

        if snapshot.is_from_future() {
            return Err(PlexoError::Storage {
                source: format!(
                    "snapshot version {} is newer than supported version {SNAPSHOT_VERSION}",
                    snapshot.version
                )
                .into(),
            });
        }

        let mut tiers = self.tiers.write().unwrap_or_else(|e| e.into_inner());
        tiers.replace_from(&snapshot);
        debug!(
            modules = snapshot.module_states.len(),
            pages = snapshot.page_states.len(),
            globals = snapshot.global_state.len(),
            "state restored from snapshot"
        );
        Ok(())
    }

    /// Roll back to a retained history snapshot; index 0 is the oldest.
    ///
    /// Replaces live state wholesale. Subscribers are not notified; rollback
    /// is a rebuild, not a mutation.
    pub fn restore_from_history(&self, index: usize) -> Result<(), PlexoError> {
        let snapshot = {
            let history = self.history.lock().unwrap_or_else(|e| e.into_inner());
            history.get(index).cloned().ok_or_else(|| {
                PlexoError::Internal(format!(
                    "history index {index} out of range (retained: {})",
                    history.len()
                ))
            })?
        };

        let mut tiers = self.tiers.write().unwrap_or_else(|e| e.into_inner());
        tiers.replace_from(&snapshot);
        Ok(())
    }

    /// A full copy of the current state.
    pub fn snapshot(&self) -> StateSnapshot {
        let tiers = self.tiers.read().unwrap_or_else(|e| e.into_inner());
        tiers.to_snapshot()
    }

    /// True when the backing store survives restarts.
    pub fn is_persistent(&self) -> bool {
        self.store.is_persistent()
    }

    /// Resolves when a mutation has occurred since the last call. Used by
    /// the autosaver's debounce loop.
    pub(crate) async fn dirty_notified(&self) {
        self.dirty.notified().await;
    }
}

#[derive(Clone, Copy)]
enum Tier {
    Module,
    Page,
    Global,
}

impl Tier {
    fn subscriber_key(&self, id: &str) -> String {
        match self {
            Tier::Module => format!("module:{id}"),
            Tier::Page => format!("page:{id}"),
            Tier::Global => format!("global:{id}"),
        }
    }
}
