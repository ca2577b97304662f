use auth_zanzibar::ZanzibarError;
use thiserror::Error;

/// Error codes returned alongside gateway errors
pub mod codes {
    pub const STORE_NOT_FOUND: &str = "AUTHZ_3101";
    pub const MODEL_NOT_INITIALIZED: &str = "AUTHZ_3102";
    pub const ENGINE_UNAVAILABLE: &str = "AUTHZ_3103";
    pub const DEADLINE_EXCEEDED: &str = "AUTHZ_3104";
    pub const ENGINE_ERROR: &str = "AUTHZ_3105";
    pub const INVALID_REQUEST: &str = "VALIDATION_1001";
    pub const INVALID_CONFIG: &str = "CONFIG_5001";
    pub const INVALID_SCHEMA: &str = "CONFIG_5002";
}

#[derive(Error, Debug)]
pub enum GatewayError {
    /// A referenced store does not exist and may not be created.
    #[error("Store not found: {0}")]
    StoreNotFound(String),

    /// The store has no usable authorization model.
    #[error("Authorization model not initialized: {0}")]
    ModelNotInitialized(String),

    #[error("Authorization engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Deadline exceeded during {0}")]
    DeadlineExceeded(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid schema module '{module}': {reason}")]
    InvalidSchema { module: String, reason: String },

    #[error("Authorization engine error: {0}")]
    Engine(#[source] ZanzibarError),
}

impl GatewayError {
    /// Whether repeating the request may succeed.
    ///
    /// Resolution failures clear once provisioning completes; transport failures
    /// and deadlines may clear on their own. Everything else fails the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StoreNotFound(_)
                | Self::ModelNotInitialized(_)
                | Self::EngineUnavailable(_)
                | Self::DeadlineExceeded(_)
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::StoreNotFound(_) => codes::STORE_NOT_FOUND,
            Self::ModelNotInitialized(_) => codes::MODEL_NOT_INITIALIZED,
            Self::EngineUnavailable(_) => codes::ENGINE_UNAVAILABLE,
            Self::InvalidRequest(_) => codes::INVALID_REQUEST,
            Self::DeadlineExceeded(_) => codes::DEADLINE_EXCEEDED,
            Self::InvalidConfig(_) => codes::INVALID_CONFIG,
            Self::InvalidSchema { .. } => codes::INVALID_SCHEMA,
            Self::Engine(_) => codes::ENGINE_ERROR,
        }
    }
}

impl From<ZanzibarError> for GatewayError {
    fn from(error: ZanzibarError) -> Self {
        match error {
            ZanzibarError::StoreNotFound(store_id) => Self::StoreNotFound(store_id),
            ZanzibarError::ModelNotInitialized { store_id } => Self::ModelNotInitialized(store_id),
            ZanzibarError::ModelNotFound { store_id, model_id } => {
                Self::ModelNotInitialized(format!("{} (model {})", store_id, model_id))
            }
            ZanzibarError::Unavailable(details) => Self::EngineUnavailable(details),
            ZanzibarError::InvalidTuple(_)
            | ZanzibarError::InvalidSubject(_)
            | ZanzibarError::InvalidObject(_)
            | ZanzibarError::InvalidRelation(_) => Self::InvalidRequest(error.to_string()),
            other => Self::Engine(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
