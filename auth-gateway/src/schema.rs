//! Schema modules: named YAML documents compiled into one engine [`Schema`].
//!
//! Each module is a list of type definitions:
//!
//! ```yaml
//! - name: dashboard
//!   relations:
//!     - name: editor
//!       inherits_from: viewer
//!     - name: viewer
//! ```

use crate::error::{GatewayError, Result};
use auth_zanzibar::{Schema, TypeDefinition};
use serde::{Deserialize, Serialize};

const CORE_MODULE: &str = include_str!("../schema/core.yaml");

/// A named authorization model definition module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleFile {
    pub name: String,
    pub contents: String,
}

impl ModuleFile {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }

    /// Built-in module defining the `namespace`, `folder` and `resource` types.
    pub fn core() -> Self {
        Self::new("core", CORE_MODULE)
    }
}

/// Merge the modules into a single validated schema.
pub fn compile_modules(modules: &[ModuleFile]) -> Result<Schema> {
    if modules.is_empty() {
        return Err(GatewayError::InvalidSchema {
            module: "<none>".to_string(),
            reason: "at least one module is required".to_string(),
        });
    }

    let mut schema = Schema::new();
    for module in modules {
        let types: Vec<TypeDefinition> =
            serde_yaml::from_str(&module.contents).map_err(|e| GatewayError::InvalidSchema {
                module: module.name.clone(),
                reason: e.to_string(),
            })?;

        for definition in types {
            schema.add_type(definition).map_err(|e| GatewayError::InvalidSchema {
                module: module.name.clone(),
                reason: e.to_string(),
            })?;
        }
    }

    schema.validate().map_err(|e| GatewayError::InvalidSchema {
        module: modules
            .iter()
            .map(|m| m.name.as_str())
            .collect::<Vec<_>>()
            .join(","),
        reason: e.to_string(),
    })?;

    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DASHBOARD_MODULE: &str = r#"
- name: dashboard
  relations:
    - name: editor
      inherits_from: viewer
    - name: viewer
"#;

    #[test]
    fn test_core_module_compiles() {
        let schema = compile_modules(&[ModuleFile::core()]).unwrap();
        for name in ["namespace", "folder", "resource", "team", "user"] {
            assert!(schema.types.contains_key(name), "core module should define {}", name);
        }
        assert_eq!(schema.implying_relations("folder", "viewer"), vec!["editor"]);
    }

    #[test]
    fn test_modules_are_merged() {
        let schema = compile_modules(&[
            ModuleFile::core(),
            ModuleFile::new("dashboards", DASHBOARD_MODULE),
        ])
        .unwrap();
        assert!(schema.types.contains_key("dashboard"));
        assert!(schema.types.contains_key("folder"));
    }

    #[test]
    fn test_duplicate_type_names_module() {
        let err = compile_modules(&[
            ModuleFile::new("first", DASHBOARD_MODULE),
            ModuleFile::new("second", DASHBOARD_MODULE),
        ])
        .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidSchema { ref module, .. } if module == "second"));
    }

    #[test]
    fn test_malformed_module() {
        let err = compile_modules(&[ModuleFile::new("broken", "- name: [unterminated")]).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidSchema { ref module, .. } if module == "broken"));

        let dangling = r#"
- name: dashboard
  relations:
    - name: editor
      inherits_from: owner
"#;
        let err = compile_modules(&[ModuleFile::new("dangling", dangling)]).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidSchema { .. }));

        assert!(compile_modules(&[]).is_err());
    }
}
