use crate::{namespace::Namespace, registry::StoreBinding};

/// Store and model a single request or batch runs against.
///
/// Built once from a resolved binding and never changed afterwards; a
/// re-resolution produces a new session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationSession {
    namespace: Namespace,
    binding: StoreBinding,
}

impl AuthorizationSession {
    pub fn new(namespace: Namespace, binding: StoreBinding) -> Self {
        Self { namespace, binding }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn store_id(&self) -> &str {
        &self.binding.store_id
    }

    pub fn model_id(&self) -> &str {
        &self.binding.model_id
    }

    pub fn binding(&self) -> &StoreBinding {
        &self.binding
    }
}
