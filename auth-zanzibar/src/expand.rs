use crate::{error::ZanzibarError, models::*, repository::TupleRepository, schema::Schema};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Depth used when the caller does not bound the expansion.
pub const DEFAULT_EXPAND_DEPTH: u32 = 5;

/// Subject expander finds all subjects with a given relation to an object
pub struct SubjectExpander {
    repository: Arc<dyn TupleRepository>,
    schema: Arc<Schema>,
}

impl SubjectExpander {
    pub fn new(repository: Arc<dyn TupleRepository>, schema: Arc<Schema>) -> Self {
        Self { repository, schema }
    }

    /// Expand all subjects that have the specified relation to an object.
    ///
    /// The root node is the userset `object#relation`; leaves are concrete subjects.
    pub async fn expand(
        &self,
        relation: &Relation,
        object: &Object,
        max_depth: Option<u32>,
    ) -> Result<SubjectTree, ZanzibarError> {
        let max_depth = max_depth.unwrap_or(DEFAULT_EXPAND_DEPTH);
        let mut visited = HashSet::new();
        self.expand_recursive(relation.name.clone(), object.clone(), &mut visited, 0, max_depth)
            .await
    }

    async fn expand_recursive(
        &self,
        relation: String,
        object: Object,
        visited: &mut HashSet<String>,
        depth: u32,
        max_depth: u32,
    ) -> Result<SubjectTree, ZanzibarError> {
        Box::pin(async move {
            let node = Subject::userset(&object.object_type, &object.object_id, &relation);

            // Cycles and the depth bound both end in an empty userset node
            if depth >= max_depth || !visited.insert(node.to_string()) {
                return Ok(SubjectTree::leaf(node));
            }

            debug!(%relation, %object, depth, "expanding");

            let mut children = Vec::new();

            for stronger in self.schema.implying_relations(&object.object_type, &relation) {
                let child = self
                    .expand_recursive(stronger.to_string(), object.clone(), visited, depth + 1, max_depth)
                    .await?;
                children.push(child);
            }

            let filter = TupleFilter {
                relation: Some(Relation::new(&relation)),
                object: Some(object.clone()),
                ..Default::default()
            };
            for tuple in self.repository.read_tuples(&filter).await? {
                match tuple.subject.relation {
                    Some(ref userset_relation) => {
                        let child = self
                            .expand_recursive(
                                userset_relation.clone(),
                                tuple.subject.as_object(),
                                visited,
                                depth + 1,
                                max_depth,
                            )
                            .await?;
                        children.push(child);
                    }
                    None => children.push(SubjectTree::leaf(tuple.subject.clone())),
                }
            }

            Ok(SubjectTree {
                subject: node,
                children,
            })
        })
        .await
    }

    /// List all concrete subjects with the given relation to an object
    pub async fn list_subjects(
        &self,
        relation: &Relation,
        object: &Object,
    ) -> Result<Vec<Subject>, ZanzibarError> {
        let tree = self.expand(relation, object, Some(10)).await?;
        Ok(tree.leaves())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryTupleRepository;
    use crate::schema::{RelationDefinition, TypeDefinition};

    fn schema() -> Arc<Schema> {
        let folder = TypeDefinition {
            name: "folder".to_string(),
            relations: vec![
                RelationDefinition::new("editor").implies("viewer"),
                RelationDefinition::new("viewer"),
            ],
        };
        let team = TypeDefinition {
            name: "team".to_string(),
            relations: vec![RelationDefinition::new("member")],
        };
        Arc::new(Schema::from_types(vec![folder, team]).unwrap())
    }

    #[tokio::test]
    async fn test_expand_subjects() {
        let repo = Arc::new(InMemoryTupleRepository::new());
        let expander = SubjectExpander::new(repo.clone(), schema());

        let folder = Object::new("folder", "f1");
        let viewer = Relation::new("viewer");

        repo.write_tuple(Tuple::new(Subject::user("alice"), viewer.clone(), folder.clone()))
            .await
            .unwrap();
        repo.write_tuple(Tuple::new(Subject::user("bob"), Relation::new("editor"), folder.clone()))
            .await
            .unwrap();
        repo.write_tuple(Tuple::new(
            Subject::userset("team", "eng", "member"),
            viewer.clone(),
            folder.clone(),
        ))
        .await
        .unwrap();
        repo.write_tuple(Tuple::new(
            Subject::user("carol"),
            Relation::new("member"),
            Object::new("team", "eng"),
        ))
        .await
        .unwrap();

        let mut subjects = expander.list_subjects(&viewer, &folder).await.unwrap();
        subjects.sort_by_key(|s| s.to_string());
        assert_eq!(
            subjects,
            vec![Subject::user("alice"), Subject::user("bob"), Subject::user("carol")]
        );
    }

    #[tokio::test]
    async fn test_expand_respects_depth() {
        let repo = Arc::new(InMemoryTupleRepository::new());
        let expander = SubjectExpander::new(repo.clone(), schema());

        let folder = Object::new("folder", "f1");
        repo.write_tuple(Tuple::new(
            Subject::userset("team", "eng", "member"),
            Relation::new("viewer"),
            folder.clone(),
        ))
        .await
        .unwrap();
        repo.write_tuple(Tuple::new(
            Subject::user("carol"),
            Relation::new("member"),
            Object::new("team", "eng"),
        ))
        .await
        .unwrap();

        let tree = expander
            .expand(&Relation::new("viewer"), &folder, Some(1))
            .await
            .unwrap();
        assert!(tree.leaves().is_empty());
    }
}
