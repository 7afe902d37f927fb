// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The message broker: a directed, typed connection graph between placed
//! module instances, with schema-validated fan-out delivery.
//!
//! Sending is fire-and-forget. The sender always gets the enriched message
//! back; validation failures and unmatched message types are logged and the
//! message is simply not delivered to that target. Message histories are
//! bounded rings, never unbounded lists.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use plexo_core::{
    InstanceId, MessageDraft, MessageMetadata, ModuleId, PlexoError, PluginMessage,
};
use tracing::{debug, warn};

use crate::catalog::ModuleCatalog;

/// A directed, typed edge in the messaging graph.
///
/// Unique per `(from, to, module_id)`; re-adding the same edge unions the
/// message types instead of duplicating the connection.
#[derive(Debug, Clone)]
pub struct PluginConnection {
    pub from: InstanceId,
    pub to: InstanceId,
    pub message_types: BTreeSet<String>,
    pub module_id: Option<ModuleId>,
}

impl PluginConnection {
    fn has_key(&self, from: &InstanceId, to: &InstanceId, module_id: Option<&ModuleId>) -> bool {
        self.from == *from && self.to == *to && self.module_id.as_ref() == module_id
    }
}

/// Bounded append-only message history.
///
/// When full, the oldest entry is evicted; evictions are counted so drops
/// are observable.
#[derive(Debug)]
struct MessageRing {
    cap: usize,
    dropped: u64,
    items: VecDeque<PluginMessage>,
}

impl MessageRing {
    fn new(cap: usize) -> Self {
        Self {
            cap,
            dropped: 0,
            items: VecDeque::new(),
        }
    }

    fn push(&mut self, message: PluginMessage) {
        if self.items.len() == self.cap {
            self.items.pop_front();
            self.dropped += 1;
            debug!(dropped = self.dropped, "message history full, evicted oldest entry");
        }
        self.items.push_back(message);
    }
}

#[derive(Default)]
struct BrokerInner {
    connections: Vec<PluginConnection>,
    instance_history: HashMap<InstanceId, MessageRing>,
    module_history: HashMap<ModuleId, MessageRing>,
}

/// Connection graph and message store between module instances.
pub struct MessageBroker {
    catalog: Arc<ModuleCatalog>,
    history_cap: usize,
    inner: Mutex<BrokerInner>,
}

impl MessageBroker {
    /// Create a broker over the given catalog with the given per-history cap.
    pub fn new(catalog: Arc<ModuleCatalog>, history_cap: usize) -> Self {
        Self {
            catalog,
            history_cap: history_cap.max(1),
            inner: Mutex::new(BrokerInner::default()),
        }
    }

    /// Add a typed connection between two placed instances.
    ///
    /// Rejects self-connections and endpoints that do not resolve to a known
    /// instance. Re-adding an existing `(from, to, module_id)` edge unions
    /// the message types into the existing connection.
    pub fn add_connection(
        &self,
        from: InstanceId,
        to: InstanceId,
        message_types: impl IntoIterator<Item = impl Into<String>>,
        module_id: Option<ModuleId>,
    ) -> Result<(), PlexoError> {
        if from == to {
            return Err(PlexoError::SelfConnection(from.to_string()));
        }
        if !self.catalog.contains_instance(&from) {
            return Err(PlexoError::UnknownInstance(from.to_string()));
        }
        if !self.catalog.contains_instance(&to) {
            return Err(PlexoError::UnknownInstance(to.to_string()));
        }

        let types: BTreeSet<String> = message_types.into_iter().map(Into::into).collect();

        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let existing = inner
            .connections
            .iter()
            .position(|c| c.has_key(&from, &to, module_id.as_ref()));
        if let Some(index) = existing {
            inner.connections[index].message_types.extend(types);
            debug!(from = %from, to = %to, "connection message types extended");
        } else {
            debug!(from = %from, to = %to, "connection added");
            inner.connections.push(PluginConnection {
                from,
                to,
                message_types: types,
                module_id,
            });
        }
        Ok(())
    }

    /// Remove a connection. Returns true if it existed.
    pub fn remove_connection(
        &self,
        from: &InstanceId,
        to: &InstanceId,
        module_id: Option<&ModuleId>,
    ) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let before = inner.connections.len();
        inner
            .connections
            .retain(|c| !c.has_key(from, to, module_id));
        inner.connections.len() != before
    }

    /// Snapshot of the current connection graph.
    pub fn connections(&self) -> Vec<PluginConnection> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.connections.clone()
    }

    /// Send a message from an instance.
    ///
    /// With an explicit `to`, only the matching `(from, to)` connection is
    /// considered; without one, the message fans out over every connection
    /// whose `from` matches. A `module_id` narrows matching to connections
    /// with that scope; `None` matches any scope.
    ///
    /// Delivery is fire-and-forget: the enriched message is returned to the
    /// sender regardless of how many targets accepted it. The message always
    /// lands in the sender's history; it lands in a target's history only
    /// when the connection declares its type and the target's `receives`
    /// schema (if any) validates the content.
    pub fn send_message(
        &self,
        from: &InstanceId,
        draft: MessageDraft,
        to: Option<&InstanceId>,
        module_id: Option<&ModuleId>,
    ) -> Result<PluginMessage, PlexoError> {
        if !self.catalog.contains_instance(from) {
            return Err(PlexoError::UnknownInstance(from.to_string()));
        }
        if let Some(target) = to
            && !self.catalog.contains_instance(target)
        {
            return Err(PlexoError::UnknownInstance(target.to_string()));
        }

        let message = PluginMessage {
            message_type: draft.message_type,
            content: draft.content,
            metadata: MessageMetadata {
                from: from.clone(),
                to: to.cloned(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                module_id: module_id.cloned(),
            },
        };

        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        // The sender's own history records every send attempt.
        let cap = self.history_cap;
        inner
            .instance_history
            .entry(from.clone())
            .or_insert_with(|| MessageRing::new(cap))
            .push(message.clone());

        // Collect matched targets, at most one delivery per target even when
        // several scoped connections match.
        let mut targets: BTreeSet<InstanceId> = BTreeSet::new();
        for conn in &inner.connections {
            if conn.from != *from {
                continue;
            }
            if let Some(target) = to
                && conn.to != *target
            {
                continue;
            }
            if let Some(scope) = module_id
                && conn.module_id.as_ref() != Some(scope)
            {
                continue;
            }
            if conn.message_types.contains(&message.message_type) {
                debug!(
                    from = %conn.from,
                    to = %conn.to,
                    message_type = %message.message_type,
                    "connection matched, propagating"
                );
                targets.insert(conn.to.clone());
            } else {
                debug!(
                    from = %conn.from,
                    to = %conn.to,
                    message_type = %message.message_type,
                    "message type not declared on connection, not propagating"
                );
            }
        }

        for target in targets {
            self.deliver(&mut inner, &target, &message);
        }

        Ok(message)
    }

    /// Deliver one message to one target, validating against the target's
    /// declared `receives` schema when present. Validation failures drop the
    /// message with a diagnostic; no error surfaces to the sender.
    fn deliver(&self, inner: &mut BrokerInner, target: &InstanceId, message: &PluginMessage) {
        if let Some(manifest) = self.catalog.instance_manifest(target)
            && let Some(schema) = manifest.receives_schema(&message.message_type)
            && let Err(e) = schema.validate_content(&message.content)
        {
            warn!(
                target = %target,
                message_type = %message.message_type,
                error = %e,
                "message dropped, schema validation failed"
            );
            return;
        }

        let cap = self.history_cap;
        inner
            .instance_history
            .entry(target.clone())
            .or_insert_with(|| MessageRing::new(cap))
            .push(message.clone());

        // Module-level history enables plugin-type-scoped retrieval.
        if let Some(module_id) = self.catalog.instance_module(target) {
            inner
                .module_history
                .entry(module_id)
                .or_insert_with(|| MessageRing::new(cap))
                .push(message.clone());
        }
    }

    /// Message history for one instance, oldest first.
    pub fn messages_for_instance(&self, instance_id: &InstanceId) -> Vec<PluginMessage> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .instance_history
            .get(instance_id)
            .map(|ring| ring.items.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Message history aggregated across all instances of a module, oldest
    /// first.
    pub fn messages_for_module(&self, module_id: &ModuleId) -> Vec<PluginMessage> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .module_history
            .get(module_id)
            .map(|ring| ring.items.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// History retrieval mirroring the module-scoped contract: a module id
    /// selects the module-level list, otherwise the instance list.
    pub fn get_messages(
        &self,
        instance_id: &InstanceId,
        module_id: Option<&ModuleId>,
    ) -> Vec<PluginMessage> {
        match module_id {
            Some(module_id) => self.messages_for_module(module_id),
            None => self.messages_for_instance(instance_id),
        }
    }

    /// Total messages evicted from bounded histories since startup.
    pub fn dropped_messages(&self) -> u64 {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .instance_history
            .values()
            .chain(inner.module_history.values())
            .map(|ring| ring.dropped)
            .sum()
    }
}
