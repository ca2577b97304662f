//! Request and response types of the gateway API.
//!
//! Subjects are written `type:id` or `type:id#relation`, objects `type:id`.
//! Requests may carry a deadline; the configured request timeout applies
//! otherwise.

use auth_zanzibar::{SubjectTree, Tuple};
use serde::Serialize;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct CheckRequest {
    pub namespace: String,
    pub subject: String,
    pub relation: String,
    pub object: String,
    pub deadline: Option<Instant>,
}

impl CheckRequest {
    pub fn new(
        namespace: impl Into<String>,
        subject: impl Into<String>,
        relation: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            subject: subject.into(),
            relation: relation.into(),
            object: object.into(),
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub allowed: bool,
}

impl Decision {
    pub fn allow() -> Self {
        Self { allowed: true }
    }

    pub fn deny() -> Self {
        Self { allowed: false }
    }
}

/// One entry of a [`BatchCheckRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCheckItem {
    pub subject: String,
    pub relation: String,
    pub object: String,
}

impl BatchCheckItem {
    pub fn new(
        subject: impl Into<String>,
        relation: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            relation: relation.into(),
            object: object.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchCheckRequest {
    pub namespace: String,
    pub checks: Vec<BatchCheckItem>,
    pub deadline: Option<Instant>,
}

impl BatchCheckRequest {
    pub fn new(namespace: impl Into<String>, checks: Vec<BatchCheckItem>) -> Self {
        Self {
            namespace: namespace.into(),
            checks,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ExpandRequest {
    pub namespace: String,
    pub relation: String,
    pub object: String,
    /// Capped by `expand_max_depth`
    pub max_depth: Option<u32>,
    pub deadline: Option<Instant>,
}

impl ExpandRequest {
    pub fn new(
        namespace: impl Into<String>,
        relation: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            relation: relation.into(),
            object: object.into(),
            max_depth: None,
            deadline: None,
        }
    }

    pub fn with_max_depth(mut self, depth: u32) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpandResponse {
    pub tree: SubjectTree,
}

#[derive(Debug, Clone)]
pub struct ListRequest {
    pub namespace: String,
    pub subject: String,
    pub relation: String,
    pub object_type: String,
    /// Capped by `list_max_results`
    pub limit: Option<usize>,
    pub deadline: Option<Instant>,
}

impl ListRequest {
    pub fn new(
        namespace: impl Into<String>,
        subject: impl Into<String>,
        relation: impl Into<String>,
        object_type: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            subject: subject.into(),
            relation: relation.into(),
            object_type: object_type.into(),
            limit: None,
            deadline: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListResponse {
    /// `type:id` of each object, in engine order
    pub objects: Vec<String>,
    pub truncated: bool,
}

/// Tuple lookup; unset fields match anything.
#[derive(Debug, Clone)]
pub struct ReadRequest {
    pub namespace: String,
    pub subject: Option<String>,
    pub relation: Option<String>,
    pub object: Option<String>,
    pub limit: Option<usize>,
    pub deadline: Option<Instant>,
}

impl ReadRequest {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            subject: None,
            relation: None,
            object: None,
            limit: None,
            deadline: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }

    pub fn with_object(mut self, object: impl Into<String>) -> Self {
        self.object = Some(object.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadResponse {
    pub tuples: Vec<Tuple>,
    pub truncated: bool,
}
