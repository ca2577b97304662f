//! Authorization gateway over per-namespace relationship stores
//!
//! Every protected namespace (`resource`, `namespace`, `folder:<uid>`, ...)
//! is backed by its own engine store and authorization model. The gateway
//! provisions both on first use, remembers the binding, and answers
//! permission queries against it:
//!
//! - [`StoreRegistry`]: namespace to store/model bindings
//! - [`ModelResolver`]: lookup-or-provision with per-namespace single flight
//! - [`AuthorizationSession`]: the binding a request runs against
//! - [`AuthzGateway`]: check, batch check, expand, list and read
//!
//! # Example
//!
//! ```rust
//! use auth_gateway::*;
//! use auth_zanzibar::InMemoryAuthorizationService;
//! use std::sync::Arc;
//!
//! # async fn run() -> auth_gateway::Result<()> {
//! let engine = Arc::new(InMemoryAuthorizationService::new());
//! let gateway = AuthzGateway::new(engine, GatewayConfig::default())?;
//!
//! let decision = gateway
//!     .check(CheckRequest::new("folder:", "user:alice", "viewer", "folder:f1"))
//!     .await?;
//! assert!(!decision.allowed);
//! assert_eq!(gateway.registry().len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod namespace;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod session;
pub mod telemetry;

pub use crate::config::{GatewayConfig, LogFormat, LoggingConfig, ProvisionedStore};
pub use error::{codes, GatewayError, Result};
pub use gateway::AuthzGateway;
pub use models::*;
pub use namespace::{Namespace, NamespaceKind};
pub use registry::{StoreBinding, StoreRegistry};
pub use resolver::ModelResolver;
pub use schema::{compile_modules, ModuleFile};
pub use session::AuthorizationSession;
pub use telemetry::init_tracing;
