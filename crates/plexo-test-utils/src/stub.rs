// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configurable stub service for exercising registry lifecycle behavior.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use plexo_core::{BridgeService, PlexoError, ServiceContext};

/// Shared record of lifecycle events, in call order.
#[derive(Clone, Default)]
pub struct LifecycleLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl LifecycleLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events, oldest first.
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Position of an event, panicking if it never happened.
    pub fn position(&self, event: &str) -> usize {
        self.events()
            .iter()
            .position(|e| e == event)
            .unwrap_or_else(|| panic!("event `{event}` never recorded"))
    }

    fn push(&self, event: String) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

/// A bridge service with scripted name, dependencies, and failure behavior.
pub struct StubService {
    name: &'static str,
    deps: Vec<&'static str>,
    log: LifecycleLog,
    fail_init: bool,
}

impl StubService {
    /// A stub that initializes and cleans up successfully.
    pub fn new(name: &'static str, deps: &[&'static str], log: &LifecycleLog) -> Self {
        Self {
            name,
            deps: deps.to_vec(),
            log: log.clone(),
            fail_init: false,
        }
    }

    /// A stub whose `initialize` always fails.
    pub fn failing(name: &'static str, log: &LifecycleLog) -> Self {
        Self {
            name,
            deps: Vec::new(),
            log: log.clone(),
            fail_init: true,
        }
    }
}

#[async_trait]
impl BridgeService for StubService {
    fn name(&self) -> &str {
        self.name
    }

    fn dependencies(&self) -> Vec<&'static str> {
        self.deps.clone()
    }

    async fn initialize(&self, _ctx: &ServiceContext) -> Result<(), PlexoError> {
        self.log.push(format!("init:{}", self.name));
        if self.fail_init {
            return Err(PlexoError::Registry {
                service: self.name.to_string(),
                message: "stubbed failure".to_string(),
            });
        }
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), PlexoError> {
        self.log.push(format!("cleanup:{}", self.name));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_records_lifecycle() {
        let log = LifecycleLog::new();
        let stub = StubService::new("probe", &[], &log);

        let ctx = ServiceContext::new();
        stub.initialize(&ctx).await.unwrap();
        stub.cleanup().await.unwrap();

        assert_eq!(log.events(), vec!["init:probe", "cleanup:probe"]);
    }

    #[tokio::test]
    async fn failing_stub_errors_but_still_records() {
        let log = LifecycleLog::new();
        let stub = StubService::failing("flaky", &log);

        let ctx = ServiceContext::new();
        assert!(stub.initialize(&ctx).await.is_err());
        assert_eq!(log.events(), vec!["init:flaky"]);
    }
}
