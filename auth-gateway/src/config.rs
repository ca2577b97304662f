use crate::error::{GatewayError, Result};
use crate::namespace::Namespace;
use crate::schema::ModuleFile;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const MAX_EXPAND_DEPTH: u32 = 32;
const ENV_PREFIX: &str = "AUTHZ_GATEWAY";

/// Gateway configuration, fixed at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Recorded on the gateway tracing span
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Schema modules compiled into the model of every store
    #[serde(default = "default_modules")]
    pub modules: Vec<ModuleFile>,

    /// Stores that already exist in the engine, one entry per namespace.
    ///
    /// A list rather than a map: configuration map keys are case-folded on
    /// load, while namespaces are case-sensitive.
    #[serde(default)]
    pub stores: Vec<ProvisionedStore>,

    /// Create missing stores and models on first use
    #[serde(default = "default_auto_provision")]
    pub auto_provision: bool,

    /// Attempts per engine call while provisioning (default: 3)
    #[serde(default = "default_engine_retry_attempts")]
    pub engine_retry_attempts: u32,

    /// Pause between attempts in milliseconds (default: 50)
    #[serde(default = "default_engine_retry_backoff_ms")]
    pub engine_retry_backoff_ms: u64,

    /// Deadline applied to requests that carry none (default: 5 seconds)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_expand_max_depth")]
    pub expand_max_depth: u32,

    #[serde(default = "default_list_max_results")]
    pub list_max_results: usize,

    #[serde(default = "default_batch_max_size")]
    pub batch_max_size: usize,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Store and optional model pinned for a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedStore {
    pub namespace: String,
    pub store_id: String,
    #[serde(default)]
    pub model_id: Option<String>,
}

impl ProvisionedStore {
    pub fn new(namespace: impl Into<String>, store_id: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            store_id: store_id.into(),
            model_id: None,
        }
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

fn default_service_name() -> String {
    "authz-server".to_string()
}

fn default_modules() -> Vec<ModuleFile> {
    vec![ModuleFile::core()]
}

fn default_auto_provision() -> bool {
    true
}

fn default_engine_retry_attempts() -> u32 {
    3
}

fn default_engine_retry_backoff_ms() -> u64 {
    50
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_expand_max_depth() -> u32 {
    5
}

fn default_list_max_results() -> usize {
    1_000
}

fn default_batch_max_size() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            modules: default_modules(),
            stores: Vec::new(),
            auto_provision: default_auto_provision(),
            engine_retry_attempts: default_engine_retry_attempts(),
            engine_retry_backoff_ms: default_engine_retry_backoff_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            expand_max_depth: default_expand_max_depth(),
            list_max_results: default_list_max_results(),
            batch_max_size: default_batch_max_size(),
            logging: LoggingConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Load from a YAML file, then apply `AUTHZ_GATEWAY__*` environment overrides.
    ///
    /// `AUTHZ_GATEWAY__REQUEST_TIMEOUT_MS=250` overrides `request_timeout_ms`,
    /// `AUTHZ_GATEWAY__LOGGING__FORMAT=json` overrides `logging.format`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config = ::config::Config::builder()
            .add_source(::config::File::from(path.as_ref()))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| GatewayError::InvalidConfig(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| GatewayError::InvalidConfig(e.to_string()))
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        ::config::Config::builder()
            .add_source(::config::File::from_str(contents, ::config::FileFormat::Yaml))
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|e| GatewayError::InvalidConfig(e.to_string()))
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn with_modules(mut self, modules: Vec<ModuleFile>) -> Self {
        self.modules = modules;
        self
    }

    pub fn with_store(mut self, store: ProvisionedStore) -> Self {
        self.stores.push(store);
        self
    }

    pub fn with_auto_provision(mut self, enabled: bool) -> Self {
        self.auto_provision = enabled;
        self
    }

    pub fn with_engine_retry(mut self, attempts: u32, backoff: Duration) -> Self {
        self.engine_retry_attempts = attempts;
        self.engine_retry_backoff_ms = backoff.as_millis() as u64;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_expand_max_depth(mut self, depth: u32) -> Self {
        self.expand_max_depth = depth;
        self
    }

    pub fn with_list_max_results(mut self, limit: usize) -> Self {
        self.list_max_results = limit;
        self
    }

    pub fn with_batch_max_size(mut self, size: usize) -> Self {
        self.batch_max_size = size;
        self
    }

    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    pub fn engine_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.engine_retry_backoff_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Pinned stores keyed by validated namespace.
    pub fn provisioned_stores(&self) -> Result<HashMap<Namespace, ProvisionedStore>> {
        self.stores
            .iter()
            .map(|store| Ok((Namespace::new(store.namespace.as_str())?, store.clone())))
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.service_name.trim().is_empty() {
            return Err(GatewayError::InvalidConfig("service_name is empty".to_string()));
        }
        if self.modules.is_empty() {
            return Err(GatewayError::InvalidConfig(
                "at least one schema module is required".to_string(),
            ));
        }
        if self.engine_retry_attempts == 0 {
            return Err(GatewayError::InvalidConfig(
                "engine_retry_attempts must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(GatewayError::InvalidConfig(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.list_max_results == 0 {
            return Err(GatewayError::InvalidConfig(
                "list_max_results must be greater than zero".to_string(),
            ));
        }
        if self.batch_max_size == 0 {
            return Err(GatewayError::InvalidConfig(
                "batch_max_size must be greater than zero".to_string(),
            ));
        }
        if self.expand_max_depth == 0 || self.expand_max_depth > MAX_EXPAND_DEPTH {
            return Err(GatewayError::InvalidConfig(format!(
                "expand_max_depth must be between 1 and {}",
                MAX_EXPAND_DEPTH
            )));
        }

        let mut pinned = HashSet::new();
        for store in &self.stores {
            let namespace = &store.namespace;
            let key = Namespace::new(namespace.as_str()).map_err(|e| {
                GatewayError::InvalidConfig(format!("stores.{}: {}", namespace, e))
            })?;
            if !pinned.insert(key) {
                return Err(GatewayError::InvalidConfig(format!(
                    "stores.{}: namespace pinned more than once",
                    namespace
                )));
            }
            if store.store_id.trim().is_empty() {
                return Err(GatewayError::InvalidConfig(format!(
                    "stores.{}: store_id is empty",
                    namespace
                )));
            }
            if matches!(store.model_id.as_deref(), Some(id) if id.trim().is_empty()) {
                return Err(GatewayError::InvalidConfig(format!(
                    "stores.{}: model_id is empty",
                    namespace
                )));
            }
        }

        EnvFilter::try_new(&self.logging.level).map_err(|e| {
            GatewayError::InvalidConfig(format!("logging.level '{}': {}", self.logging.level, e))
        })?;

        Ok(())
    }
}
