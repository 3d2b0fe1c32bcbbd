//! Contract test: dry-run non-mutation
//!
//! Verifies the dry-run guarantee: with the flag set, no mutating client
//! call is ever made, regardless of observed state, and the predicted
//! change set equals exactly what a live call would have applied.
//!
//! If this test fails, dry-run is unsafe to offer.

mod common;

use common::*;
use converge_core::clients::MemoryResourceClient;
use converge_core::config::{ClientBackend, ClientConfig, ConvergeConfig, EngineConfig, ResourceConfig};
use converge_core::resource::{DesiredState, Ensure, Properties};
use converge_core::report::Status;
use converge_core::traits::ResourceClient;
use serde_json::json;
use std::collections::HashMap;

#[tokio::test]
async fn dry_run_suppresses_create() {
    let (engine, _events) = bare_engine();
    let client = MockResourceClient::absent();
    let desired = desired_with("cirros", "image", "image_format", "raw");

    let result = engine
        .ensure_present(&desired, &client, true)
        .await
        .unwrap();

    assert_eq!(result.status, Status::Predicted);
    assert!(result.status.is_predicted());
    assert_eq!(result.message, "cirros will be created");
    // The prediction is exactly the set a live create would apply.
    assert_eq!(result.changed, desired.properties);
    assert_eq!(client.mutation_call_count(), 0);
}

#[tokio::test]
async fn dry_run_suppresses_delete() {
    let (engine, _events) = bare_engine();
    let client = MockResourceClient::present("role-42", Properties::new());
    let desired = DesiredState::new("yolo", "database_role");

    let result = engine
        .ensure_absent(&desired, &client, true)
        .await
        .unwrap();

    assert_eq!(result.status, Status::Predicted);
    assert_eq!(result.message, "yolo will be deleted");
    assert_eq!(result.changed.get("yolo"), Some(&json!("role-42")));
    assert_eq!(client.mutation_call_count(), 0);
}

#[tokio::test]
async fn dry_run_suppresses_update() {
    let (engine, _events) = bare_engine();

    let mut observed = Properties::new();
    observed.insert("image_format".to_string(), json!("qcow2"));
    let client = MockResourceClient::present("img-1", observed).with_update_support();

    let desired = desired_with("cirros", "image", "image_format", "raw");

    let result = engine
        .ensure_present(&desired, &client, true)
        .await
        .unwrap();

    assert_eq!(result.status, Status::Predicted);
    assert_eq!(result.message, "cirros will be updated");
    assert_eq!(result.changed.get("image_format"), Some(&json!("raw")));
    assert_eq!(client.mutation_call_count(), 0);
}

#[tokio::test]
async fn dry_run_batch_apply_mutates_nothing() {
    // Run a whole declared batch in dry-run against a live memory client
    // and verify the backend is untouched.
    let config = ConvergeConfig {
        clients: vec![ClientConfig {
            resource_type: "image".to_string(),
            backend: ClientBackend::Memory,
        }],
        resources: vec![
            ResourceConfig::new("cirros", "image").with_property("image_format", "raw"),
            ResourceConfig::new("obsolete", "image").with_ensure(Ensure::Absent),
        ],
        engine: EngineConfig {
            dry_run: true,
            ..EngineConfig::default()
        },
    };
    config.validate().unwrap();

    // Keep a handle on the same backing store the engine will mutate.
    let backing = MemoryResourceClient::new();
    let mut clients: HashMap<String, Box<dyn ResourceClient>> = HashMap::new();
    clients.insert("image".to_string(), Box::new(backing.clone()));

    let (engine, _events) = engine_with(clients, config.engine.clone());
    let report = engine.apply(&config.resources).await.unwrap();

    assert_eq!(report.len(), 2);
    assert!(report.all_succeeded());
    assert!(backing.is_empty().await, "dry-run must not create anything");

    let statuses: Vec<Status> = report.iter().map(|r| r.status).collect();
    // Absent resource with an absent declaration is already converged, so
    // only the create is a prediction.
    assert_eq!(statuses, vec![Status::Predicted, Status::Succeeded]);
    assert_eq!(report.iter().filter(|r| r.status.is_predicted()).count(), 1);
}
