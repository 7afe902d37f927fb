// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end bridge flows over the test harness.

use std::sync::Arc;

use plexo_core::{
    FieldSpec, FieldType, InstanceId, MessageDraft, MessageSchema, ModuleId, ModuleManifest,
    ServiceContext,
};
use plexo_test_utils::{BridgeHarness, LifecycleLog, StubService};
use serde_json::json;

fn chart_manifest() -> ModuleManifest {
    ModuleManifest {
        module_id: ModuleId("chart".into()),
        name: "Chart".into(),
        version: "1.0.0".into(),
        description: "Time-series chart widget".into(),
        required_services: vec!["state".into(), "broker".into()],
        sends: vec![],
        receives: vec![MessageSchema {
            name: "data:update".into(),
            fields: vec![FieldSpec {
                name: "rows".into(),
                field_type: FieldType::Array,
                required: true,
            }],
        }],
    }
}

fn table_manifest() -> ModuleManifest {
    ModuleManifest {
        module_id: ModuleId("table".into()),
        name: "Data Table".into(),
        version: "1.0.0".into(),
        description: String::new(),
        required_services: vec!["state".into()],
        sends: vec![MessageSchema {
            name: "data:update".into(),
            fields: vec![],
        }],
        receives: vec![],
    }
}

async fn harness() -> BridgeHarness {
    BridgeHarness::builder()
        .with_module(chart_manifest())
        .with_module(table_manifest())
        .with_instance("table-1", "table")
        .with_instance("chart-1", "chart")
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn required_services_resolve_for_placed_modules() {
    let harness = harness().await;

    let manifest = harness
        .catalog
        .instance_manifest(&InstanceId("chart-1".into()))
        .unwrap();
    let required: Vec<&str> = manifest.required_services.iter().map(String::as_str).collect();
    let resolution = harness.registry.resolve_dependencies(&required);
    assert!(resolution.is_complete(), "missing: {:?}", resolution.missing);

    harness.shutdown().await.unwrap();
}

#[tokio::test]
async fn valid_update_flows_from_table_to_chart() {
    let harness = harness().await;

    harness
        .broker
        .add_connection(
            InstanceId("table-1".into()),
            InstanceId("chart-1".into()),
            ["data:update"],
            None,
        )
        .unwrap();

    harness
        .broker
        .send_message(
            &InstanceId("table-1".into()),
            MessageDraft::new("data:update", json!({"rows": [[1, 2], [3, 4]]})),
            Some(&InstanceId("chart-1".into())),
            None,
        )
        .unwrap();

    let delivered = harness
        .broker
        .messages_for_instance(&InstanceId("chart-1".into()));
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].message_type, "data:update");

    // Module-level history tracks the chart module as a whole.
    assert_eq!(
        harness
            .broker
            .messages_for_module(&ModuleId("chart".into()))
            .len(),
        1
    );

    harness.shutdown().await.unwrap();
}

#[tokio::test]
async fn schema_violation_is_dropped_silently() {
    let harness = harness().await;

    harness
        .broker
        .add_connection(
            InstanceId("table-1".into()),
            InstanceId("chart-1".into()),
            ["data:update"],
            None,
        )
        .unwrap();

    // `rows` is required by the chart's receives schema; omit it.
    let sent = harness.broker.send_message(
        &InstanceId("table-1".into()),
        MessageDraft::new("data:update", json!({"source": "manual"})),
        Some(&InstanceId("chart-1".into())),
        None,
    );
    assert!(sent.is_ok(), "sender never observes validation failures");

    assert!(harness
        .broker
        .messages_for_instance(&InstanceId("chart-1".into()))
        .is_empty());

    harness.shutdown().await.unwrap();
}

#[tokio::test]
async fn module_state_survives_persist_and_restore() {
    let harness = BridgeHarness::builder()
        .with_sqlite()
        .build()
        .await
        .unwrap();
    let manager = harness.state_manager();

    manager.set_module_state(&InstanceId("chart-1".into()), json!({"zoom": 2}));
    manager.persist().await.unwrap();

    // Wipe live state by rolling past it, then restore from the store.
    manager.set_module_state(&InstanceId("chart-1".into()), json!({"zoom": 9}));
    manager.restore().await.unwrap();

    assert_eq!(
        manager.get_module_state(&InstanceId("chart-1".into())),
        Some(json!({"zoom": 2}))
    );

    harness.shutdown().await.unwrap();
}

#[tokio::test]
async fn stub_services_initialize_in_dependency_order() {
    let harness = harness().await;
    let log = LifecycleLog::new();

    harness
        .registry
        .register(Arc::new(StubService::new("api", &["auth"], &log)));
    harness
        .registry
        .register(Arc::new(StubService::new("auth", &[], &log)));

    let ctx = ServiceContext::new();
    let failed = harness.registry.initialize_all(&ctx).await.unwrap();
    assert!(failed.is_empty());
    assert!(log.position("init:auth") < log.position("init:api"));

    harness.registry.cleanup_all().await.unwrap();
    assert!(log.position("cleanup:api") < log.position("cleanup:auth"));
}
