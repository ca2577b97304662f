//! Engine double that counts calls and can be made slow, unavailable or
//! forgetful of the models it stores.

#![allow(dead_code)]

use async_trait::async_trait;
use auth_zanzibar::{
    AuthorizationModel, AuthorizationService, CheckRequest, InMemoryAuthorizationService, Object,
    Relation, Schema, Store, Subject, SubjectTree, Tuple, TupleFilter, WriteRequest, ZanzibarError,
};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
pub struct InstrumentedEngine {
    inner: InMemoryAuthorizationService,
    calls: AtomicUsize,
    create_store_calls: AtomicUsize,
    list_stores_calls: AtomicUsize,
    write_model_calls: AtomicUsize,
    model_write_delay_ms: AtomicU64,
    unavailable: AtomicBool,
    missing_model_queries: AtomicUsize,
}

impl InstrumentedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine without instrumentation, for test setup.
    pub fn inner(&self) -> &InMemoryAuthorizationService {
        &self.inner
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn create_store_calls(&self) -> usize {
        self.create_store_calls.load(Ordering::SeqCst)
    }

    pub fn list_stores_calls(&self) -> usize {
        self.list_stores_calls.load(Ordering::SeqCst)
    }

    pub fn write_model_calls(&self) -> usize {
        self.write_model_calls.load(Ordering::SeqCst)
    }

    pub fn set_model_write_delay(&self, delay: Duration) {
        self.model_write_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// The next `count` queries fail as if their model had been removed.
    pub fn fail_queries_with_missing_model(&self, count: usize) {
        self.missing_model_queries.store(count, Ordering::SeqCst);
    }

    fn enter_query(&self, store_id: &str, model_id: &str) -> Result<(), ZanzibarError> {
        self.enter()?;
        let pending = self
            .missing_model_queries
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if pending.is_ok() {
            return Err(ZanzibarError::ModelNotFound {
                store_id: store_id.to_string(),
                model_id: model_id.to_string(),
            });
        }
        Ok(())
    }

    fn enter(&self) -> Result<(), ZanzibarError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ZanzibarError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthorizationService for InstrumentedEngine {
    async fn create_store(&self, name: &str) -> Result<Store, ZanzibarError> {
        self.enter()?;
        self.create_store_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.create_store(name).await
    }

    async fn get_store(&self, store_id: &str) -> Result<Store, ZanzibarError> {
        self.enter()?;
        self.inner.get_store(store_id).await
    }

    async fn list_stores(&self) -> Result<Vec<Store>, ZanzibarError> {
        self.enter()?;
        self.list_stores_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.list_stores().await
    }

    async fn write_authorization_model(
        &self,
        store_id: &str,
        schema: Schema,
    ) -> Result<AuthorizationModel, ZanzibarError> {
        self.enter()?;
        self.write_model_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.model_write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.inner.write_authorization_model(store_id, schema).await
    }

    async fn read_authorization_model(
        &self,
        store_id: &str,
        model_id: &str,
    ) -> Result<AuthorizationModel, ZanzibarError> {
        self.enter()?;
        self.inner.read_authorization_model(store_id, model_id).await
    }

    async fn read_latest_authorization_model(
        &self,
        store_id: &str,
    ) -> Result<AuthorizationModel, ZanzibarError> {
        self.enter()?;
        self.inner.read_latest_authorization_model(store_id).await
    }

    async fn check(
        &self,
        store_id: &str,
        model_id: &str,
        request: &CheckRequest,
    ) -> Result<bool, ZanzibarError> {
        self.enter_query(store_id, model_id)?;
        self.inner.check(store_id, model_id, request).await
    }

    async fn batch_check(
        &self,
        store_id: &str,
        model_id: &str,
        requests: &[CheckRequest],
    ) -> Result<Vec<Result<bool, ZanzibarError>>, ZanzibarError> {
        self.enter_query(store_id, model_id)?;
        self.inner.batch_check(store_id, model_id, requests).await
    }

    async fn expand(
        &self,
        store_id: &str,
        model_id: &str,
        relation: &Relation,
        object: &Object,
        max_depth: Option<u32>,
    ) -> Result<SubjectTree, ZanzibarError> {
        self.enter_query(store_id, model_id)?;
        self.inner
            .expand(store_id, model_id, relation, object, max_depth)
            .await
    }

    async fn list_objects(
        &self,
        store_id: &str,
        model_id: &str,
        subject: &Subject,
        relation: &Relation,
        object_type: &str,
    ) -> Result<Vec<Object>, ZanzibarError> {
        self.enter_query(store_id, model_id)?;
        self.inner
            .list_objects(store_id, model_id, subject, relation, object_type)
            .await
    }

    async fn read(&self, store_id: &str, filter: &TupleFilter) -> Result<Vec<Tuple>, ZanzibarError> {
        self.enter()?;
        self.inner.read(store_id, filter).await
    }

    async fn write(
        &self,
        store_id: &str,
        model_id: &str,
        request: WriteRequest,
    ) -> Result<(), ZanzibarError> {
        self.enter()?;
        self.inner.write(store_id, model_id, request).await
    }
}

/// Write `subject relation object` tuples straight into the engine.
pub async fn grant(
    engine: &InMemoryAuthorizationService,
    store_id: &str,
    model_id: &str,
    tuples: &[(&str, &str, &str)],
) {
    let writes = tuples
        .iter()
        .map(|(subject, relation, object)| {
            Tuple::new(
                subject.parse().unwrap(),
                relation.parse().unwrap(),
                object.parse().unwrap(),
            )
        })
        .collect();
    engine
        .write(store_id, model_id, WriteRequest { writes, deletes: vec![] })
        .await
        .unwrap();
}
