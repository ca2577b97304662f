//! Namespace resolution against an instrumented engine
//!
//! Covers first-use provisioning, the registry fast path, single-flight
//! provisioning under concurrency, deadlines, retries and the behaviour
//! with auto-provisioning disabled.

mod common;

use auth_gateway::*;
use auth_zanzibar::{AuthorizationService, RelationDefinition, Schema, TypeDefinition};
use common::InstrumentedEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;

fn gateway(engine: &Arc<InstrumentedEngine>, config: GatewayConfig) -> AuthzGateway {
    AuthzGateway::new(engine.clone(), config).unwrap()
}

fn resource_store_name() -> String {
    Namespace::new("resource").unwrap().store_name()
}

fn folder_only_schema() -> Schema {
    Schema::from_types(vec![TypeDefinition {
        name: "folder".to_string(),
        relations: vec![RelationDefinition::new("viewer")],
    }])
    .unwrap()
}

#[tokio::test]
async fn test_first_resolution_inserts_one_binding() {
    let engine = Arc::new(InstrumentedEngine::new());
    let gateway = gateway(&engine, GatewayConfig::default());
    assert!(gateway.registry().is_empty());

    let session = gateway.resolve("folder:", None).await.unwrap();

    assert_eq!(gateway.registry().len(), 1);
    assert_eq!(
        gateway.registry().lookup(session.namespace()).as_ref(),
        Some(session.binding())
    );
    assert_eq!(engine.create_store_calls(), 1);
    assert_eq!(engine.write_model_calls(), 1);

    let store = engine.inner().get_store(session.store_id()).await.unwrap();
    assert_eq!(store.name, session.namespace().store_name());
}

#[tokio::test]
async fn test_bound_namespace_skips_the_engine() {
    let engine = Arc::new(InstrumentedEngine::new());
    let gateway = gateway(&engine, GatewayConfig::default());

    let first = gateway.resolve("resource", None).await.unwrap();
    let calls = engine.calls();

    let second = gateway.resolve("resource", None).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(engine.calls(), calls);
    assert_eq!(engine.create_store_calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_use_provisions_once() {
    let engine = Arc::new(InstrumentedEngine::new());
    engine.set_model_write_delay(Duration::from_millis(20));
    let gateway = Arc::new(gateway(&engine, GatewayConfig::default()));

    let mut tasks = JoinSet::new();
    for _ in 0..16 {
        let gateway = gateway.clone();
        tasks.spawn(async move { gateway.resolve("folder:", None).await });
    }

    let mut bindings = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        bindings.push(joined.unwrap().unwrap().binding().clone());
    }

    assert_eq!(bindings.len(), 16);
    assert!(bindings.iter().all(|b| b == &bindings[0]));
    assert_eq!(engine.create_store_calls(), 1);
    assert_eq!(engine.write_model_calls(), 1);
    assert_eq!(gateway.registry().len(), 1);
}

#[tokio::test]
async fn test_namespaces_get_separate_stores() {
    let engine = Arc::new(InstrumentedEngine::new());
    let gateway = gateway(&engine, GatewayConfig::default());

    let resource = gateway.resolve("resource", None).await.unwrap();
    let folder = gateway.resolve("folder:", None).await.unwrap();

    assert_ne!(resource.store_id(), folder.store_id());
    assert_eq!(engine.create_store_calls(), 2);
    assert_eq!(gateway.registry().len(), 2);
}

#[tokio::test]
async fn test_existing_store_and_model_are_reused() {
    let engine = Arc::new(InstrumentedEngine::new());
    let first = gateway(&engine, GatewayConfig::default())
        .resolve("namespace", None)
        .await
        .unwrap();

    // A second instance finds the store by name and the model by schema.
    let second = gateway(&engine, GatewayConfig::default())
        .resolve("namespace", None)
        .await
        .unwrap();

    assert_eq!(first.binding(), second.binding());
    assert_eq!(engine.create_store_calls(), 1);
    assert_eq!(engine.write_model_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_expired_resolution_leaves_no_binding() {
    let engine = Arc::new(InstrumentedEngine::new());
    engine.set_model_write_delay(Duration::from_millis(200));
    let gateway = gateway(&engine, GatewayConfig::default());

    let deadline = Instant::now() + Duration::from_millis(50);
    let err = gateway.resolve("resource", Some(deadline)).await.unwrap_err();
    assert!(matches!(err, GatewayError::DeadlineExceeded(_)));
    assert!(err.is_retryable());
    assert!(gateway.registry().is_empty());

    engine.set_model_write_delay(Duration::ZERO);
    let session = gateway.resolve("resource", None).await.unwrap();
    assert_eq!(gateway.registry().len(), 1);
    // The store created before the deadline fired is found by name.
    assert_eq!(engine.create_store_calls(), 1);
    assert_eq!(engine.inner().model_count(session.store_id()).unwrap(), 1);
}

#[tokio::test]
async fn test_missing_configured_store_without_auto_provision() {
    let engine = Arc::new(InstrumentedEngine::new());
    let config = GatewayConfig::default()
        .with_auto_provision(false)
        .with_store(ProvisionedStore::new("resource", "no-such-store"));
    let gateway = gateway(&engine, config);

    let err = gateway.resolve("resource", None).await.unwrap_err();
    assert!(matches!(err, GatewayError::StoreNotFound(ref id) if id == "no-such-store"));
    assert_eq!(err.code(), codes::STORE_NOT_FOUND);
    assert_eq!(engine.create_store_calls(), 0);
    assert!(gateway.registry().is_empty());
}

#[tokio::test]
async fn test_unknown_namespace_without_auto_provision() {
    let engine = Arc::new(InstrumentedEngine::new());
    let gateway = gateway(&engine, GatewayConfig::default().with_auto_provision(false));

    let err = gateway.resolve("folder:", None).await.unwrap_err();
    assert!(matches!(err, GatewayError::StoreNotFound(_)));
    assert_eq!(engine.create_store_calls(), 0);
}

#[tokio::test]
async fn test_store_without_model_and_no_auto_provision() {
    let engine = Arc::new(InstrumentedEngine::new());
    let store = engine.inner().create_store("bare").await.unwrap();
    let config = GatewayConfig::default()
        .with_auto_provision(false)
        .with_store(ProvisionedStore::new("resource", store.id.clone()));
    let gateway = gateway(&engine, config);

    let err = gateway.resolve("resource", None).await.unwrap_err();
    assert!(matches!(err, GatewayError::ModelNotInitialized(ref id) if id == &store.id));
    assert_eq!(engine.write_model_calls(), 0);
}

#[tokio::test]
async fn test_configured_store_gets_a_model() {
    let engine = Arc::new(InstrumentedEngine::new());
    let store = engine.inner().create_store("legacy-folders").await.unwrap();
    let config =
        GatewayConfig::default().with_store(ProvisionedStore::new("folder:", store.id.clone()));
    let gateway = gateway(&engine, config);

    let session = gateway.resolve("folder:", None).await.unwrap();
    assert_eq!(session.store_id(), store.id);
    assert_eq!(engine.create_store_calls(), 0);
    assert_eq!(engine.write_model_calls(), 1);
}

#[tokio::test]
async fn test_pinned_mixed_case_namespace_from_yaml() {
    let engine = Arc::new(InstrumentedEngine::new());
    let store = engine.inner().create_store("legacy-abc").await.unwrap();
    engine
        .inner()
        .write_authorization_model(&store.id, folder_only_schema())
        .await
        .unwrap();
    let config = GatewayConfig::from_yaml_str(&format!(
        "auto_provision: false\nstores:\n  - namespace: \"Folder:ABC\"\n    store_id: {}\n",
        store.id
    ))
    .unwrap();
    let gateway = gateway(&engine, config);

    let session = gateway.resolve("Folder:ABC", None).await.unwrap();
    assert_eq!(session.store_id(), store.id);
    assert_eq!(engine.create_store_calls(), 0);

    // Only the exact spelling is pinned.
    let err = gateway.resolve("folder:abc", None).await.unwrap_err();
    assert!(matches!(err, GatewayError::StoreNotFound(_)));
}

#[tokio::test]
async fn test_schema_drift_writes_new_model() {
    let engine = Arc::new(InstrumentedEngine::new());
    let store = engine.inner().create_store(&resource_store_name()).await.unwrap();
    let old = engine
        .inner()
        .write_authorization_model(&store.id, folder_only_schema())
        .await
        .unwrap();
    let gateway = gateway(&engine, GatewayConfig::default());

    let session = gateway.resolve("resource", None).await.unwrap();
    assert_eq!(session.store_id(), store.id);
    assert_ne!(session.model_id(), old.id);
    assert_eq!(engine.write_model_calls(), 1);
    assert_eq!(engine.inner().model_count(&store.id).unwrap(), 2);
}

#[tokio::test]
async fn test_schema_drift_kept_without_auto_provision() {
    let engine = Arc::new(InstrumentedEngine::new());
    let store = engine.inner().create_store(&resource_store_name()).await.unwrap();
    let old = engine
        .inner()
        .write_authorization_model(&store.id, folder_only_schema())
        .await
        .unwrap();
    let gateway = gateway(&engine, GatewayConfig::default().with_auto_provision(false));

    let session = gateway.resolve("resource", None).await.unwrap();
    assert_eq!(session.model_id(), old.id);
    assert_eq!(engine.write_model_calls(), 0);
}

#[tokio::test]
async fn test_unavailable_engine_is_retried_then_surfaced() {
    let engine = Arc::new(InstrumentedEngine::new());
    engine.set_unavailable(true);
    let config = GatewayConfig::default().with_engine_retry(3, Duration::from_millis(1));
    let gateway = gateway(&engine, config);

    let err = gateway.resolve("resource", None).await.unwrap_err();
    assert!(matches!(err, GatewayError::EngineUnavailable(_)));
    assert!(err.is_retryable());
    assert_eq!(engine.calls(), 3);
    assert!(gateway.registry().is_empty());

    engine.set_unavailable(false);
    assert!(gateway.resolve("resource", None).await.is_ok());
}

#[tokio::test]
async fn test_malformed_namespace_is_rejected() {
    let engine = Arc::new(InstrumentedEngine::new());
    let gateway = gateway(&engine, GatewayConfig::default());

    for namespace in ["", " folder:", "\t"] {
        let err = gateway.resolve(namespace, None).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));
        assert!(!err.is_retryable());
    }
    assert_eq!(engine.calls(), 0);
}
