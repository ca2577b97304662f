use crate::{error::ZanzibarError, models::*, schema::Schema};
use async_trait::async_trait;

/// Store and model administration plus query operations of a relationship engine.
///
/// Every query names the store it runs against and the model whose schema
/// interprets the tuples. Implementations report a missing store as
/// [`ZanzibarError::StoreNotFound`] and a store without a usable model as
/// [`ZanzibarError::ModelNotInitialized`] or [`ZanzibarError::ModelNotFound`].
#[async_trait]
pub trait AuthorizationService: Send + Sync {
    async fn create_store(&self, name: &str) -> Result<Store, ZanzibarError>;

    async fn get_store(&self, store_id: &str) -> Result<Store, ZanzibarError>;

    async fn list_stores(&self) -> Result<Vec<Store>, ZanzibarError>;

    /// Write a new model into the store; it becomes the latest model.
    async fn write_authorization_model(
        &self,
        store_id: &str,
        schema: Schema,
    ) -> Result<AuthorizationModel, ZanzibarError>;

    async fn read_authorization_model(
        &self,
        store_id: &str,
        model_id: &str,
    ) -> Result<AuthorizationModel, ZanzibarError>;

    async fn read_latest_authorization_model(
        &self,
        store_id: &str,
    ) -> Result<AuthorizationModel, ZanzibarError>;

    async fn check(
        &self,
        store_id: &str,
        model_id: &str,
        request: &CheckRequest,
    ) -> Result<bool, ZanzibarError>;

    /// Check several tuples against one model; results keep the request order.
    ///
    /// The outer error is reserved for failures that affect the whole batch
    /// (unknown store or model). Per-item failures stay in their slot.
    async fn batch_check(
        &self,
        store_id: &str,
        model_id: &str,
        requests: &[CheckRequest],
    ) -> Result<Vec<Result<bool, ZanzibarError>>, ZanzibarError> {
        self.read_authorization_model(store_id, model_id).await?;

        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.check(store_id, model_id, request).await);
        }
        Ok(results)
    }

    async fn expand(
        &self,
        store_id: &str,
        model_id: &str,
        relation: &Relation,
        object: &Object,
        max_depth: Option<u32>,
    ) -> Result<SubjectTree, ZanzibarError>;

    /// Objects of `object_type` on which `subject` holds `relation`.
    async fn list_objects(
        &self,
        store_id: &str,
        model_id: &str,
        subject: &Subject,
        relation: &Relation,
        object_type: &str,
    ) -> Result<Vec<Object>, ZanzibarError>;

    async fn read(&self, store_id: &str, filter: &TupleFilter) -> Result<Vec<Tuple>, ZanzibarError>;

    /// Validate the tuples against the model, then apply them.
    async fn write(
        &self,
        store_id: &str,
        model_id: &str,
        request: WriteRequest,
    ) -> Result<(), ZanzibarError>;
}
