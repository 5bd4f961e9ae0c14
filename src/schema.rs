//! JSON Schema contract for protocol documents.

use std::path::{Path, PathBuf};

use jsonschema::Validator;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::SchemaError;

/// Path of the protocol schema shipped with the crate
pub const DEFAULT_SCHEMA_PATH: &str = "schema/protocol.schema.json";

/// A compiled structural contract
pub struct SchemaDefinition {
    source: Option<PathBuf>,
    validator: Validator,
}

impl std::fmt::Debug for SchemaDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaDefinition")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl SchemaDefinition {
    /// Load and compile a schema file
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        if !path.exists() {
            return Err(SchemaError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value = serde_json::from_str(&content)?;
        let mut schema = Self::from_value(&value)?;
        schema.source = Some(path.to_path_buf());
        debug!("Loaded schema from {:?}", path);
        Ok(schema)
    }

    pub fn from_value(schema: &Value) -> Result<Self, SchemaError> {
        let validator =
            jsonschema::validator_for(schema).map_err(|e| SchemaError::Compile(e.to_string()))?;
        Ok(Self {
            source: None,
            validator,
        })
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Check an instance, returning every violation as
    /// `"<instance path>: <message>"`
    pub fn validate(&self, instance: &Value) -> Result<(), Vec<String>> {
        let errors: Vec<String> = self
            .validator
            .iter_errors(instance)
            .map(|e| format!("{}: {}", display_path(&e.instance_path.to_string()), e))
            .collect();
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

fn display_path(pointer: &str) -> &str {
    if pointer.is_empty() { "/" } else { pointer }
}

/// What the refine stage has to validate against
#[derive(Debug, Default)]
pub enum ValidationSchema {
    /// No schema was requested
    #[default]
    Absent,
    /// A schema was requested but cannot be used
    Unavailable { path: PathBuf, reason: String },
    Available(SchemaDefinition),
}

impl ValidationSchema {
    /// Resolve an optional schema path. A missing or broken file degrades
    /// to [`ValidationSchema::Unavailable`].
    pub fn resolve(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return ValidationSchema::Absent;
        };
        match SchemaDefinition::load(path) {
            Ok(schema) => ValidationSchema::Available(schema),
            Err(e) => {
                warn!("Schema {:?} unavailable: {}", path, e);
                ValidationSchema::Unavailable {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn definition(&self) -> Option<&SchemaDefinition> {
        match self {
            ValidationSchema::Available(schema) => Some(schema),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn protocol_schema() -> Value {
        json!({
            "type": "object",
            "required": ["metadata", "summary"],
            "properties": {
                "metadata": {
                    "type": "object",
                    "required": ["title", "date"],
                    "properties": {
                        "title": {"type": "string"},
                        "date": {"type": "string"}
                    }
                },
                "summary": {"type": "string"}
            }
        })
    }

    #[test]
    fn test_validate_reports_every_violation() {
        let schema = SchemaDefinition::from_value(&protocol_schema()).unwrap();

        assert!(schema.validate(&json!({"metadata": {"title": "T", "date": "2025-07-20"}, "summary": ""})).is_ok());

        let errors = schema
            .validate(&json!({"metadata": {"title": 5}}))
            .unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.starts_with("/metadata/title: ")));
        assert!(errors.iter().any(|e| e.starts_with("/: ") && e.contains("summary")));
    }

    #[test]
    fn test_invalid_schema_fails_to_compile() {
        let result = SchemaDefinition::from_value(&json!({"type": "not-a-type"}));
        assert!(matches!(result, Err(SchemaError::Compile(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("protocol.schema.json");
        std::fs::write(&path, protocol_schema().to_string()).unwrap();

        let schema = SchemaDefinition::load(&path).unwrap();
        assert_eq!(schema.source(), Some(path.as_path()));

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            SchemaDefinition::load(&path),
            Err(SchemaError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_resolve() {
        assert!(matches!(ValidationSchema::resolve(None), ValidationSchema::Absent));

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        match ValidationSchema::resolve(Some(&missing)) {
            ValidationSchema::Unavailable { path, reason } => {
                assert_eq!(path, missing);
                assert!(reason.contains("not found"));
            }
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_shipped_schema_compiles() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_SCHEMA_PATH);
        let schema = ValidationSchema::resolve(Some(&path));
        assert!(schema.definition().is_some());
    }
}
