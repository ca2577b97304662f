use crate::{error::ZanzibarError, models::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Permission schema: the type definitions an authorization model is built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Type definitions keyed by object type (e.g., "folder", "resource")
    pub types: HashMap<String, TypeDefinition>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schema from a list of type definitions.
    ///
    /// Fails if the same type is defined twice.
    pub fn from_types(types: Vec<TypeDefinition>) -> Result<Self, ZanzibarError> {
        let mut schema = Self::new();
        for definition in types {
            schema.add_type(definition)?;
        }
        Ok(schema)
    }

    pub fn add_type(&mut self, definition: TypeDefinition) -> Result<(), ZanzibarError> {
        if self.types.contains_key(&definition.name) {
            return Err(ZanzibarError::InvalidSchema(format!(
                "Type '{}' is defined more than once",
                definition.name
            )));
        }
        self.types.insert(definition.name.clone(), definition);
        Ok(())
    }

    /// Validate that a tuple conforms to the schema
    pub fn validate_tuple(&self, tuple: &Tuple) -> Result<(), ZanzibarError> {
        let definition = self.types.get(&tuple.object.object_type).ok_or_else(|| {
            ZanzibarError::InvalidTuple(format!("Unknown object type: {}", tuple.object.object_type))
        })?;

        if definition.relation(&tuple.relation.name).is_none() {
            return Err(ZanzibarError::InvalidTuple(format!(
                "Unknown relation '{}' for object type '{}'",
                tuple.relation.name, tuple.object.object_type
            )));
        }

        Ok(())
    }

    /// Validate the entire schema is well-formed
    pub fn validate(&self) -> Result<(), ZanzibarError> {
        if self.types.is_empty() {
            return Err(ZanzibarError::InvalidSchema("Schema defines no types".to_string()));
        }

        for (name, definition) in &self.types {
            if name != &definition.name {
                return Err(ZanzibarError::InvalidSchema(format!(
                    "Type key '{}' doesn't match name '{}'",
                    name, definition.name
                )));
            }

            for relation in &definition.relations {
                if let Some(ref parent) = relation.inherits_from {
                    if definition.relation(parent).is_none() {
                        return Err(ZanzibarError::InvalidSchema(format!(
                            "Relation '{}' on '{}' inherits from unknown relation '{}'",
                            relation.name, name, parent
                        )));
                    }
                }
            }

            let mut seen = std::collections::HashSet::new();
            for relation in &definition.relations {
                if !seen.insert(relation.name.as_str()) {
                    return Err(ZanzibarError::InvalidSchema(format!(
                        "Relation '{}' is defined more than once on '{}'",
                        relation.name, name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Relations on `object_type` that directly imply `relation`.
    pub fn implying_relations(&self, object_type: &str, relation: &str) -> Vec<&str> {
        self.types
            .get(object_type)
            .map(|definition| {
                definition
                    .relations
                    .iter()
                    .filter(|r| r.inherits_from.as_deref() == Some(relation))
                    .map(|r| r.name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Definition of an object type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDefinition {
    pub name: String,
    #[serde(default)]
    pub relations: Vec<RelationDefinition>,
}

impl TypeDefinition {
    pub fn relation(&self, name: &str) -> Option<&RelationDefinition> {
        self.relations.iter().find(|r| r.name == name)
    }
}

/// Definition of a relation within a type.
///
/// `inherits_from` names the weaker relation this one implies: an `editor`
/// inheriting from `viewer` is also a `viewer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDefinition {
    pub name: String,
    #[serde(default)]
    pub inherits_from: Option<String>,
    #[serde(default)]
    pub description: String,
}

impl RelationDefinition {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inherits_from: None,
            description: String::new(),
        }
    }

    pub fn implies(mut self, weaker: &str) -> Self {
        self.inherits_from = Some(weaker.to_string());
        self
    }
}
