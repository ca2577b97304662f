use crate::{error::ZanzibarError, models::*, repository::TupleRepository, schema::Schema};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Upper bound on nested relation lookups for a single check.
pub const MAX_CHECK_DEPTH: u32 = 25;

/// Permission checker performs authorization checks with support for:
/// - Direct permissions
/// - Inherited permissions (an `editor` is also a `viewer`)
/// - Userset references (e.g., "all viewers of folder:eng are viewers")
/// - Recursive permission resolution
pub struct PermissionChecker {
    repository: Arc<dyn TupleRepository>,
    schema: Arc<Schema>,
}

impl PermissionChecker {
    pub fn new(repository: Arc<dyn TupleRepository>, schema: Arc<Schema>) -> Self {
        Self { repository, schema }
    }

    /// Check if subject has the specified relation to object
    pub async fn check(&self, request: &CheckRequest) -> Result<bool, ZanzibarError> {
        let mut visited = HashSet::new();
        self.check_recursive(
            &request.subject,
            request.relation.name.clone(),
            request.object.clone(),
            &mut visited,
            0,
        )
        .await
    }

    async fn check_recursive(
        &self,
        subject: &Subject,
        relation: String,
        object: Object,
        visited: &mut HashSet<String>,
        depth: u32,
    ) -> Result<bool, ZanzibarError> {
        Box::pin(async move {
            if depth > MAX_CHECK_DEPTH {
                return Ok(false);
            }

            if !visited.insert(format!("{}#{}", object, relation)) {
                return Ok(false);
            }

            debug!(%subject, %relation, %object, depth, "checking");

            // 1. Direct tuple
            let direct = Tuple::new(subject.clone(), Relation::new(&relation), object.clone());
            if self.repository.tuple_exists(&direct).await? {
                return Ok(true);
            }

            // 2. Stronger relations that imply this one
            for stronger in self.schema.implying_relations(&object.object_type, &relation) {
                if self
                    .check_recursive(subject, stronger.to_string(), object.clone(), visited, depth + 1)
                    .await?
                {
                    return Ok(true);
                }
            }

            // 3. Usersets granted this relation on the object
            let filter = TupleFilter {
                relation: Some(Relation::new(&relation)),
                object: Some(object.clone()),
                ..Default::default()
            };
            for tuple in self.repository.read_tuples(&filter).await? {
                if let Some(ref userset_relation) = tuple.subject.relation {
                    if self
                        .check_recursive(
                            subject,
                            userset_relation.clone(),
                            tuple.subject.as_object(),
                            visited,
                            depth + 1,
                        )
                        .await?
                    {
                        return Ok(true);
                    }
                }
            }

            Ok(false)
        })
        .await
    }
}
