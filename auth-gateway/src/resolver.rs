use crate::config::{GatewayConfig, ProvisionedStore};
use crate::error::{GatewayError, Result};
use crate::namespace::Namespace;
use crate::registry::{StoreBinding, StoreRegistry};
use auth_zanzibar::{AuthorizationModel, AuthorizationService, Schema, Store, ZanzibarError};
use dashmap::DashMap;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Maps a namespace to its store and model, provisioning both on first use.
///
/// First-use resolutions of one namespace are serialized, so concurrent
/// callers share a single provisioning sequence. Bound namespaces are served
/// from the registry without touching the engine.
pub struct ModelResolver {
    engine: Arc<dyn AuthorizationService>,
    registry: Arc<StoreRegistry>,
    schema: Arc<Schema>,
    provisioned: HashMap<Namespace, ProvisionedStore>,
    auto_provision: bool,
    retry_attempts: u32,
    retry_backoff: Duration,
    inflight: DashMap<Namespace, Arc<Mutex<()>>>,
}

impl ModelResolver {
    pub fn new(
        engine: Arc<dyn AuthorizationService>,
        registry: Arc<StoreRegistry>,
        schema: Arc<Schema>,
        config: &GatewayConfig,
    ) -> Result<Self> {
        Ok(Self {
            engine,
            registry,
            schema,
            provisioned: config.provisioned_stores()?,
            auto_provision: config.auto_provision,
            retry_attempts: config.engine_retry_attempts.max(1),
            retry_backoff: config.engine_retry_backoff(),
            inflight: DashMap::new(),
        })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub async fn resolve(&self, namespace: &Namespace) -> Result<StoreBinding> {
        if let Some(binding) = self.registry.lookup(namespace) {
            return Ok(binding);
        }

        let lock = self.inflight.entry(namespace.clone()).or_default().clone();
        let _guard = lock.lock().await;

        // Another caller may have finished provisioning while we waited.
        if let Some(binding) = self.registry.lookup(namespace) {
            debug!(namespace = %namespace, "binding installed by concurrent resolution");
            return Ok(binding);
        }

        let binding = self.provision(namespace).await?;
        self.registry.insert(namespace.clone(), binding.clone());
        info!(
            namespace = %namespace,
            store_id = %binding.store_id,
            model_id = %binding.model_id,
            "namespace bound"
        );
        Ok(binding)
    }

    /// Drop `stale` and resolve again.
    pub async fn refresh(&self, namespace: &Namespace, stale: &StoreBinding) -> Result<StoreBinding> {
        if self.registry.invalidate(namespace, stale) {
            warn!(
                namespace = %namespace,
                store_id = %stale.store_id,
                model_id = %stale.model_id,
                "invalidated stale binding"
            );
        }
        self.resolve(namespace).await
    }

    async fn provision(&self, namespace: &Namespace) -> Result<StoreBinding> {
        let pinned = self.provisioned.get(namespace);
        let store = self.ensure_store(namespace, pinned).await?;
        let model = self
            .ensure_model(&store, pinned.and_then(|p| p.model_id.as_deref()))
            .await?;
        Ok(StoreBinding::new(store.id, model.id))
    }

    async fn ensure_store(
        &self,
        namespace: &Namespace,
        pinned: Option<&ProvisionedStore>,
    ) -> Result<Store> {
        if let Some(pinned) = pinned {
            let store_id = pinned.store_id.as_str();
            match self.with_retry("get_store", || self.engine.get_store(store_id)).await {
                Ok(store) => return Ok(store),
                Err(ZanzibarError::StoreNotFound(_)) if self.auto_provision => {
                    warn!(
                        namespace = %namespace,
                        store_id,
                        "configured store missing, provisioning by name"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        let name = namespace.store_name();
        let stores = self
            .with_retry("list_stores", || self.engine.list_stores())
            .await?;
        if let Some(store) = stores.into_iter().find(|s| s.name == name) {
            debug!(namespace = %namespace, store_id = %store.id, "found existing store");
            return Ok(store);
        }

        if !self.auto_provision {
            return Err(GatewayError::StoreNotFound(name));
        }

        let store = self
            .with_retry("create_store", || self.engine.create_store(&name))
            .await?;
        info!(namespace = %namespace, store_id = %store.id, name = %store.name, "created store");
        Ok(store)
    }

    async fn ensure_model(&self, store: &Store, pinned: Option<&str>) -> Result<AuthorizationModel> {
        let store_id = store.id.as_str();

        if let Some(model_id) = pinned {
            match self
                .with_retry("read_authorization_model", || {
                    self.engine.read_authorization_model(store_id, model_id)
                })
                .await
            {
                Ok(model) => return Ok(model),
                Err(ZanzibarError::ModelNotFound { .. }) if self.auto_provision => {
                    warn!(store_id, model_id, "configured model missing, using latest model");
                }
                Err(e) => return Err(e.into()),
            }
        }

        match self
            .with_retry("read_latest_authorization_model", || {
                self.engine.read_latest_authorization_model(store_id)
            })
            .await
        {
            Ok(model) if *model.schema == *self.schema => Ok(model),
            Ok(model) if !self.auto_provision => {
                warn!(
                    store_id,
                    model_id = %model.id,
                    "latest model differs from configured modules"
                );
                Ok(model)
            }
            Ok(model) => {
                info!(store_id, previous_model_id = %model.id, "schema changed, writing new model");
                self.write_model(store_id).await
            }
            Err(ZanzibarError::ModelNotInitialized { .. }) if self.auto_provision => {
                self.write_model(store_id).await
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write_model(&self, store_id: &str) -> Result<AuthorizationModel> {
        let schema = self.schema.as_ref();
        match self
            .with_retry("write_authorization_model", || {
                self.engine.write_authorization_model(store_id, schema.clone())
            })
            .await
        {
            Ok(model) => {
                info!(store_id, model_id = %model.id, "wrote authorization model");
                Ok(model)
            }
            Err(e) if e.is_transient() => Err(e.into()),
            Err(e) => Err(GatewayError::ModelNotInitialized(format!("{}: {}", store_id, e))),
        }
    }

    /// Repeat `call` while the engine reports a transient failure.
    async fn with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        mut call: F,
    ) -> std::result::Result<T, ZanzibarError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, ZanzibarError>>,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Err(e) if e.is_transient() && attempt < self.retry_attempts => {
                    warn!(operation, attempt, error = %e, "engine call failed, retrying");
                    tokio::time::sleep(self.retry_backoff).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}
