use crate::{error::ZanzibarError, schema::Schema};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Represents a subject in the authorization system.
///
/// A subject is either a concrete entity (`user:alice`) or a userset, i.e. every
/// subject holding `relation` on another object (`folder:eng#viewer`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    pub object_type: String,
    pub object_id: String,
    pub relation: Option<String>,
}

impl Subject {
    pub fn new(object_type: &str, object_id: &str) -> Self {
        Self {
            object_type: object_type.to_string(),
            object_id: object_id.to_string(),
            relation: None,
        }
    }

    pub fn user(user_id: &str) -> Self {
        Self::new("user", user_id)
    }

    pub fn team(team_id: &str) -> Self {
        Self::new("team", team_id)
    }

    pub fn service_account(account_id: &str) -> Self {
        Self::new("service-account", account_id)
    }

    pub fn userset(object_type: &str, object_id: &str, relation: &str) -> Self {
        Self {
            object_type: object_type.to_string(),
            object_id: object_id.to_string(),
            relation: Some(relation.to_string()),
        }
    }

    /// The object a userset subject points at.
    pub fn as_object(&self) -> Object {
        Object::new(&self.object_type, &self.object_id)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.relation {
            Some(ref relation) => write!(f, "{}:{}#{}", self.object_type, self.object_id, relation),
            None => write!(f, "{}:{}", self.object_type, self.object_id),
        }
    }
}

impl FromStr for Subject {
    type Err = ZanzibarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (object, relation) = match s.split_once('#') {
            Some((object, relation)) => (object, Some(relation)),
            None => (s, None),
        };
        let (object_type, object_id) = split_reference(object)
            .ok_or_else(|| ZanzibarError::InvalidSubject(s.to_string()))?;

        match relation {
            Some(relation) if !is_identifier(relation) => {
                Err(ZanzibarError::InvalidSubject(s.to_string()))
            }
            Some(relation) => Ok(Self::userset(object_type, object_id, relation)),
            None => Ok(Self::new(object_type, object_id)),
        }
    }
}

/// Represents an object (resource) in the authorization system
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Object {
    pub object_type: String,
    pub object_id: String,
}

impl Object {
    pub fn new(object_type: &str, object_id: &str) -> Self {
        Self {
            object_type: object_type.to_string(),
            object_id: object_id.to_string(),
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.object_type, self.object_id)
    }
}

impl FromStr for Object {
    type Err = ZanzibarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (object_type, object_id) =
            split_reference(s).ok_or_else(|| ZanzibarError::InvalidObject(s.to_string()))?;
        Ok(Self::new(object_type, object_id))
    }
}

/// Represents a relation (permission type) in the authorization system
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub name: String,
}

impl Relation {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl FromStr for Relation {
    type Err = ZanzibarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_identifier(s) {
            Ok(Self::new(s))
        } else {
            Err(ZanzibarError::InvalidRelation(s.to_string()))
        }
    }
}

/// Represents a relationship tuple: subject has relation to object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tuple {
    pub subject: Subject,
    pub relation: Relation,
    pub object: Object,
    pub created_at: DateTime<Utc>,
}

impl Tuple {
    pub fn new(subject: Subject, relation: Relation, object: Object) -> Self {
        Self {
            subject,
            relation,
            object,
            created_at: Utc::now(),
        }
    }

    /// Identity of the tuple, independent of when it was written.
    pub fn key(&self) -> String {
        format!("{}#{}@{}", self.object, self.relation, self.subject)
    }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.subject == other.subject
            && self.relation == other.relation
            && self.object == other.object
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.relation, self.object)
    }
}

/// Filter for reading tuples; `None` fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TupleFilter {
    pub subject: Option<Subject>,
    pub relation: Option<Relation>,
    pub object: Option<Object>,
}

impl TupleFilter {
    pub fn matches(&self, tuple: &Tuple) -> bool {
        self.subject.as_ref().map_or(true, |s| tuple.subject == *s)
            && self.relation.as_ref().map_or(true, |r| tuple.relation == *r)
            && self.object.as_ref().map_or(true, |o| tuple.object == *o)
    }
}

/// Authorization check request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRequest {
    pub subject: Subject,
    pub relation: Relation,
    pub object: Object,
}

impl CheckRequest {
    pub fn new(subject: Subject, relation: Relation, object: Object) -> Self {
        Self {
            subject,
            relation,
            object,
        }
    }
}

/// Subject tree node for expand responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectTree {
    pub subject: Subject,
    pub children: Vec<SubjectTree>,
}

impl SubjectTree {
    pub fn leaf(subject: Subject) -> Self {
        Self {
            subject,
            children: Vec::new(),
        }
    }

    /// Concrete (non-userset) subjects reachable from this node.
    pub fn leaves(&self) -> Vec<Subject> {
        let mut subjects = Vec::new();
        self.collect_leaves(&mut subjects);
        subjects
    }

    fn collect_leaves(&self, out: &mut Vec<Subject>) {
        if self.children.is_empty() && self.subject.relation.is_none() {
            if !out.contains(&self.subject) {
                out.push(self.subject.clone());
            }
            return;
        }
        for child in &self.children {
            child.collect_leaves(out);
        }
    }
}

/// Batch write request for multiple tuples
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WriteRequest {
    pub writes: Vec<Tuple>,
    pub deletes: Vec<Tuple>,
}

/// An isolated partition of tuples and models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A versioned schema written into a store.
#[derive(Debug, Clone)]
pub struct AuthorizationModel {
    pub id: String,
    pub store_id: String,
    pub schema: Arc<Schema>,
    pub created_at: DateTime<Utc>,
}

fn split_reference(s: &str) -> Option<(&str, &str)> {
    let (object_type, object_id) = s.split_once(':')?;
    if is_identifier(object_type) && !object_id.is_empty() && !object_id.contains(['#', ' ']) {
        Some((object_type, object_id))
    } else {
        None
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
