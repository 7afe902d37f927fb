// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the Plexo service bridge.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

use crate::error::PlexoError;

/// Unique identifier for one placed occurrence of a module on a page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub String);

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for a plugin module (the type, not a placement).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleId(pub String);

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for a dashboard page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId(pub String);

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value type accepted by a schema field.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Object,
    Array,
    Any,
}

/// One field definition within a message schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name as it appears in message content.
    pub name: String,
    /// Expected value type.
    #[serde(default = "FieldSpec::default_type")]
    pub field_type: FieldType,
    /// Whether the field must be present and non-null.
    #[serde(default)]
    pub required: bool,
}

impl FieldSpec {
    fn default_type() -> FieldType {
        FieldType::Any
    }
}

/// Declared shape a module promises to send or accept.
///
/// The schema `name` doubles as the message type it applies to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSchema {
    /// Message type this schema covers (e.g., "chart:select").
    pub name: String,
    /// Field definitions.
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

impl MessageSchema {
    /// Validate message content against this schema.
    ///
    /// Every field marked `required` must be present and non-null in
    /// `content`. Type checking is advisory: a present field of the wrong
    /// type fails validation only when the schema names a concrete type.
    pub fn validate_content(&self, content: &Map<String, Value>) -> Result<(), PlexoError> {
        for field in &self.fields {
            let value = content.get(&field.name);
            if field.required && matches!(value, None | Some(Value::Null)) {
                return Err(PlexoError::Validation {
                    schema: self.name.clone(),
                    message: format!("required field `{}` is missing or null", field.name),
                });
            }
            if let Some(value) = value
                && !value.is_null()
                && !type_matches(field.field_type, value)
            {
                return Err(PlexoError::Validation {
                    schema: self.name.clone(),
                    message: format!(
                        "field `{}` has wrong type, expected {}",
                        field.name, field.field_type
                    ),
                });
            }
        }
        Ok(())
    }
}

fn type_matches(expected: FieldType, value: &Value) -> bool {
    match expected {
        FieldType::String => value.is_string(),
        FieldType::Number => value.is_number(),
        FieldType::Boolean => value.is_boolean(),
        FieldType::Object => value.is_object(),
        FieldType::Array => value.is_array(),
        FieldType::Any => true,
    }
}

/// Routing metadata attached to every delivered message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Sending instance.
    pub from: InstanceId,
    /// Explicit target instance, if any.
    pub to: Option<InstanceId>,
    /// RFC 3339 timestamp set at send time.
    pub timestamp: String,
    /// Module scope of the connection the message traveled on.
    pub module_id: Option<ModuleId>,
}

/// A typed message exchanged between module instances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginMessage {
    /// Message type, matched against connection message types and schemas.
    #[serde(rename = "type")]
    pub message_type: String,
    /// Free-form JSON payload.
    pub content: Map<String, Value>,
    /// Routing metadata, filled in by the broker at send time.
    pub metadata: MessageMetadata,
}

/// A message as drafted by a sender, before the broker enriches it.
#[derive(Debug, Clone)]
pub struct MessageDraft {
    pub message_type: String,
    pub content: Map<String, Value>,
}

impl MessageDraft {
    /// Create a draft from a message type and JSON object payload.
    ///
    /// Non-object payloads are wrapped under a `value` key so that schema
    /// validation always has a map to inspect.
    pub fn new(message_type: impl Into<String>, content: Value) -> Self {
        let content = match content {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        Self {
            message_type: message_type.into(),
            content,
        }
    }
}
