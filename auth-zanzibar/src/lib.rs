//! Zanzibar-style relationship engine
//!
//! This crate provides the engine side of the authorization gateway:
//! - Isolated stores, each holding relationship tuples and versioned authorization models
//! - The [`AuthorizationService`] capability the gateway consumes
//! - An in-process implementation, [`InMemoryAuthorizationService`]
//! - Permission checks with inheritance and userset resolution
//! - Subject expansion and object listing
//!
//! # Core Concepts
//!
//! - **Store**: An isolated partition of tuples and models
//! - **Authorization Model**: A versioned [`Schema`] written into a store; the latest one is active
//! - **Object**: Any resource that can be protected (e.g., folder, dashboard, namespace)
//! - **Subject**: Any entity that can have permissions, or a userset (`team:eng#member`)
//! - **Relation**: The type of relationship between subject and object (e.g., admin, editor, viewer)
//! - **Tuple**: A relationship statement: "subject has relation to object"
//!
//! # Example
//!
//! ```rust
//! use auth_zanzibar::*;
//!
//! # async fn run() -> auth_zanzibar::Result<()> {
//! let engine = InMemoryAuthorizationService::new();
//! let store = engine.create_store("authz-folder").await?;
//!
//! let schema = Schema::from_types(vec![TypeDefinition {
//!     name: "folder".to_string(),
//!     relations: vec![
//!         RelationDefinition::new("editor").implies("viewer"),
//!         RelationDefinition::new("viewer"),
//!     ],
//! }])?;
//! let model = engine.write_authorization_model(&store.id, schema).await?;
//!
//! let tuple = Tuple::new(
//!     Subject::user("alice"),
//!     Relation::new("editor"),
//!     Object::new("folder", "f1"),
//! );
//! engine
//!     .write(&store.id, &model.id, WriteRequest { writes: vec![tuple], deletes: vec![] })
//!     .await?;
//!
//! let request = CheckRequest::new(
//!     Subject::user("alice"),
//!     Relation::new("viewer"),
//!     Object::new("folder", "f1"),
//! );
//! assert!(engine.check(&store.id, &model.id, &request).await?);
//! # Ok(())
//! # }
//! ```

pub mod check;
pub mod engine;
pub mod error;
pub mod expand;
pub mod models;
pub mod repository;
pub mod schema;
pub mod service;

pub use engine::*;
pub use error::*;
pub use models::*;
pub use schema::*;
pub use service::*;
