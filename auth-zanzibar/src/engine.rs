use crate::{
    check::PermissionChecker,
    error::ZanzibarError,
    expand::SubjectExpander,
    models::*,
    repository::{InMemoryTupleRepository, TupleRepository},
    schema::Schema,
    service::AuthorizationService,
};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// State of one store: its tuples and the models written to it, oldest first.
struct StoreState {
    store: Store,
    models: RwLock<Vec<AuthorizationModel>>,
    repository: Arc<InMemoryTupleRepository>,
}

/// In-process relationship engine holding any number of isolated stores.
///
/// Used as the engine behind the gateway in tests and embedded deployments.
#[derive(Default)]
pub struct InMemoryAuthorizationService {
    stores: DashMap<String, Arc<StoreState>>,
}

impl InMemoryAuthorizationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a store with all of its tuples and models.
    pub fn delete_store(&self, store_id: &str) -> Result<(), ZanzibarError> {
        if self.stores.remove(store_id).is_none() {
            return Err(ZanzibarError::StoreNotFound(store_id.to_string()));
        }
        info!(store_id, "store deleted");
        Ok(())
    }

    pub fn store_count(&self) -> usize {
        self.stores.len()
    }

    pub fn model_count(&self, store_id: &str) -> Result<usize, ZanzibarError> {
        let state = self.state(store_id)?;
        let count = state.models.read().len();
        Ok(count)
    }

    // Clones the Arc out so no map guard is held across an await point
    fn state(&self, store_id: &str) -> Result<Arc<StoreState>, ZanzibarError> {
        self.stores
            .get(store_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ZanzibarError::StoreNotFound(store_id.to_string()))
    }

    fn model(
        &self,
        store_id: &str,
        model_id: &str,
    ) -> Result<(Arc<StoreState>, AuthorizationModel), ZanzibarError> {
        let state = self.state(store_id)?;
        let model = state
            .models
            .read()
            .iter()
            .find(|m| m.id == model_id)
            .cloned()
            .ok_or_else(|| ZanzibarError::ModelNotFound {
                store_id: store_id.to_string(),
                model_id: model_id.to_string(),
            })?;
        Ok((state, model))
    }

    fn validate_query(schema: &Schema, relation: &Relation, object_type: &str) -> Result<(), ZanzibarError> {
        let definition = schema.types.get(object_type).ok_or_else(|| {
            ZanzibarError::InvalidObject(format!("Unknown object type: {}", object_type))
        })?;
        if definition.relation(&relation.name).is_none() {
            return Err(ZanzibarError::InvalidRelation(format!(
                "Unknown relation '{}' for object type '{}'",
                relation.name, object_type
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthorizationService for InMemoryAuthorizationService {
    async fn create_store(&self, name: &str) -> Result<Store, ZanzibarError> {
        let store = Store {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.stores.insert(
            store.id.clone(),
            Arc::new(StoreState {
                store: store.clone(),
                models: RwLock::new(Vec::new()),
                repository: Arc::new(InMemoryTupleRepository::new()),
            }),
        );
        info!(store_id = %store.id, name, "store created");
        Ok(store)
    }

    async fn get_store(&self, store_id: &str) -> Result<Store, ZanzibarError> {
        Ok(self.state(store_id)?.store.clone())
    }

    async fn list_stores(&self) -> Result<Vec<Store>, ZanzibarError> {
        let mut stores: Vec<Store> = self
            .stores
            .iter()
            .map(|entry| entry.value().store.clone())
            .collect();
        stores.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(stores)
    }

    async fn write_authorization_model(
        &self,
        store_id: &str,
        schema: Schema,
    ) -> Result<AuthorizationModel, ZanzibarError> {
        schema.validate()?;
        let state = self.state(store_id)?;
        let model = AuthorizationModel {
            id: Uuid::new_v4().to_string(),
            store_id: store_id.to_string(),
            schema: Arc::new(schema),
            created_at: Utc::now(),
        };
        state.models.write().push(model.clone());
        info!(store_id, model_id = %model.id, "authorization model written");
        Ok(model)
    }

    async fn read_authorization_model(
        &self,
        store_id: &str,
        model_id: &str,
    ) -> Result<AuthorizationModel, ZanzibarError> {
        self.model(store_id, model_id).map(|(_, model)| model)
    }

    async fn read_latest_authorization_model(
        &self,
        store_id: &str,
    ) -> Result<AuthorizationModel, ZanzibarError> {
        let state = self.state(store_id)?;
        let latest = state.models.read().last().cloned();
        latest.ok_or_else(|| ZanzibarError::ModelNotInitialized {
            store_id: store_id.to_string(),
        })
    }

    async fn check(
        &self,
        store_id: &str,
        model_id: &str,
        request: &CheckRequest,
    ) -> Result<bool, ZanzibarError> {
        let (state, model) = self.model(store_id, model_id)?;
        Self::validate_query(&model.schema, &request.relation, &request.object.object_type)?;

        let checker = PermissionChecker::new(state.repository.clone(), model.schema.clone());
        let allowed = checker.check(request).await?;
        debug!(store_id, model_id, allowed, "check evaluated");
        Ok(allowed)
    }

    async fn expand(
        &self,
        store_id: &str,
        model_id: &str,
        relation: &Relation,
        object: &Object,
        max_depth: Option<u32>,
    ) -> Result<SubjectTree, ZanzibarError> {
        let (state, model) = self.model(store_id, model_id)?;
        Self::validate_query(&model.schema, relation, &object.object_type)?;

        let expander = SubjectExpander::new(state.repository.clone(), model.schema.clone());
        expander.expand(relation, object, max_depth).await
    }

    async fn list_objects(
        &self,
        store_id: &str,
        model_id: &str,
        subject: &Subject,
        relation: &Relation,
        object_type: &str,
    ) -> Result<Vec<Object>, ZanzibarError> {
        let (state, model) = self.model(store_id, model_id)?;
        Self::validate_query(&model.schema, relation, object_type)?;

        // Every object of the type that appears in some tuple is a candidate
        let candidates: BTreeSet<String> = state
            .repository
            .read_tuples(&TupleFilter::default())
            .await?
            .into_iter()
            .filter(|t| t.object.object_type == object_type)
            .map(|t| t.object.object_id)
            .collect();

        let checker = PermissionChecker::new(state.repository.clone(), model.schema.clone());
        let mut objects = Vec::new();
        for object_id in candidates {
            let object = Object::new(object_type, &object_id);
            let request = CheckRequest::new(subject.clone(), relation.clone(), object.clone());
            if checker.check(&request).await? {
                objects.push(object);
            }
        }
        Ok(objects)
    }

    async fn read(&self, store_id: &str, filter: &TupleFilter) -> Result<Vec<Tuple>, ZanzibarError> {
        let state = self.state(store_id)?;
        state.repository.read_tuples(filter).await
    }

    async fn write(
        &self,
        store_id: &str,
        model_id: &str,
        request: WriteRequest,
    ) -> Result<(), ZanzibarError> {
        let (state, model) = self.model(store_id, model_id)?;
        for tuple in request.writes.iter().chain(request.deletes.iter()) {
            model.schema.validate_tuple(tuple)?;
        }

        info!(
            store_id,
            writes = request.writes.len(),
            deletes = request.deletes.len(),
            "writing tuples"
        );
        state.repository.batch_write(request).await
    }
}
