// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ephemeral per-session collaboration state.
//!
//! Rebuilt from incoming events each session; never persisted. A leaving
//! collaborator takes their cursor and selection with them.

use serde::{Deserialize, Serialize};

use crate::events::{event_types, CollabEvent};

/// A participant in the current session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collaborator {
    pub user_id: String,
    pub joined_at: String,
}

/// Latest known cursor position of a participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaboratorCursor {
    pub user_id: String,
    pub x: f64,
    pub y: f64,
}

/// Latest known selection of a participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaboratorSelection {
    pub user_id: String,
    pub instance_ids: Vec<String>,
}

/// Everything known about the other participants of the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollaborationState {
    pub collaborators: Vec<Collaborator>,
    pub cursors: Vec<CollaboratorCursor>,
    pub selections: Vec<CollaboratorSelection>,
}

impl CollaborationState {
    /// Fold one incoming event into the session state.
    ///
    /// Unknown event types and malformed payloads are ignored; presence
    /// state is best-effort.
    pub fn apply_event(&mut self, event: &CollabEvent) {
        match event.event_type.as_str() {
            event_types::JOIN => {
                if !self.collaborators.iter().any(|c| c.user_id == event.user_id) {
                    self.collaborators.push(Collaborator {
                        user_id: event.user_id.clone(),
                        joined_at: event.timestamp.clone(),
                    });
                }
            }
            event_types::LEAVE => {
                self.collaborators.retain(|c| c.user_id != event.user_id);
                self.cursors.retain(|c| c.user_id != event.user_id);
                self.selections.retain(|s| s.user_id != event.user_id);
            }
            event_types::CURSOR => {
                let (Some(x), Some(y)) = (
                    event.data.get("x").and_then(|v| v.as_f64()),
                    event.data.get("y").and_then(|v| v.as_f64()),
                ) else {
                    return;
                };
                match self.cursors.iter_mut().find(|c| c.user_id == event.user_id) {
                    Some(cursor) => {
                        cursor.x = x;
                        cursor.y = y;
                    }
                    None => self.cursors.push(CollaboratorCursor {
                        user_id: event.user_id.clone(),
                        x,
                        y,
                    }),
                }
            }
            event_types::SELECTION => {
                let instance_ids: Vec<String> = event
                    .data
                    .get("instance_ids")
                    .and_then(|v| v.as_array())
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(|v| v.as_str().map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default();
                match self
                    .selections
                    .iter_mut()
                    .find(|s| s.user_id == event.user_id)
                {
                    Some(selection) => selection.instance_ids = instance_ids,
                    None => self.selections.push(CollaboratorSelection {
                        user_id: event.user_id.clone(),
                        instance_ids,
                    }),
                }
            }
            _ => {}
        }
    }
}
