// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The base trait all bridge services implement, and the context handed to
//! them during initialization.
//!
//! The context object is constructed once by the application assembly and
//! passed down explicitly. There is no module-level registry global.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::PlexoError;

/// Values the composition root exposes to services during `initialize`.
///
/// Keys are dotted setting names (e.g., "state.database_path"). The context
/// is deliberately untyped at this seam so core does not depend on the
/// config crate.
#[derive(Debug, Clone, Default)]
pub struct ServiceContext {
    values: HashMap<String, Value>,
}

impl ServiceContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value under a dotted key, builder-style.
    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Look up a value by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Look up a string value by key.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }
}

/// The base trait for all Plexo bridge services.
///
/// A service is a named singleton supplying one capability (state, messaging,
/// collaboration, ...) to plugin modules. Services declare the names of the
/// services they depend on; the registry initializes dependencies first and
/// cleans up in exact reverse order.
#[async_trait]
pub trait BridgeService: Send + Sync + 'static {
    /// Unique name this service registers under.
    fn name(&self) -> &str;

    /// Names of services that must be initialized before this one.
    fn dependencies(&self) -> Vec<&'static str> {
        Vec::new()
    }

    /// One-time initialization. Called in dependency order.
    async fn initialize(&self, _ctx: &ServiceContext) -> Result<(), PlexoError> {
        Ok(())
    }

    /// Tear-down. Called in reverse dependency order at shutdown.
    async fn cleanup(&self) -> Result<(), PlexoError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct NoopService;

    #[async_trait]
    impl BridgeService for NoopService {
        fn name(&self) -> &str {
            "noop"
        }
    }

    #[tokio::test]
    async fn default_lifecycle_hooks_are_noops() {
        let svc = NoopService;
        assert_eq!(svc.name(), "noop");
        assert!(svc.dependencies().is_empty());

        let ctx = ServiceContext::new();
        assert!(svc.initialize(&ctx).await.is_ok());
        assert!(svc.cleanup().await.is_ok());
    }

    #[test]
    fn context_roundtrip() {
        let ctx = ServiceContext::new()
            .with_value("state.backend", json!("sqlite"))
            .with_value("state.history_limit", json!(50));

        assert_eq!(ctx.get_str("state.backend"), Some("sqlite"));
        assert_eq!(ctx.get("state.history_limit"), Some(&json!(50)));
        assert!(ctx.get("missing").is_none());
    }
}
