use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ZanzibarError {
    #[error("Invalid tuple: {0}")]
    InvalidTuple(String),

    #[error("Invalid subject: {0}")]
    InvalidSubject(String),

    #[error("Invalid object: {0}")]
    InvalidObject(String),

    #[error("Invalid relation: {0}")]
    InvalidRelation(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Store not found: {0}")]
    StoreNotFound(String),

    /// The store exists but holds no model matching the request.
    #[error("Authorization model not initialized in store {store_id}")]
    ModelNotInitialized { store_id: String },

    #[error("Authorization model {model_id} not found in store {store_id}")]
    ModelNotFound { store_id: String, model_id: String },

    /// Connectivity failure; callers may retry.
    #[error("Authorization service unavailable: {0}")]
    Unavailable(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl ZanzibarError {
    /// Whether the engine could answer the same request if it were repeated later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, ZanzibarError>;
