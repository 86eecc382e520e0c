//! JSON Schema document checks.

use jsonschema::Draft;
use serde_json::Value;
use uuid::Uuid;

use crate::error::SchemaError;

/// Checks schema documents and the data documents written against them.
pub struct SchemaValidator;

impl SchemaValidator {
    /// Checks that `schema` is an object valid against the Draft 4
    /// meta-schema.
    ///
    /// Only the document's shape is checked; `$ref`s are not resolved, so
    /// nothing is fetched and a dangling local reference is accepted.
    pub fn check(schema: &Value) -> Result<(), SchemaError> {
        if !schema.is_object() {
            return Err(SchemaError::InvalidSchema {
                message: format!("{} is not of type \"object\"", schema),
            });
        }
        jsonschema::draft4::meta::validate(schema).map_err(|e| SchemaError::InvalidSchema {
            message: e.to_string(),
        })
    }

    /// Validates a data document against a published schema, reporting
    /// every violation.
    pub fn validate_data(schema_id: Uuid, schema: &Value, data: &Value) -> Result<(), SchemaError> {
        let validator = Self::compile(schema)?;
        let errors: Vec<String> = validator.iter_errors(data).map(|e| e.to_string()).collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::DataValidation { schema_id, errors })
        }
    }

    fn compile(schema: &Value) -> Result<jsonschema::Validator, SchemaError> {
        jsonschema::options()
            .with_draft(Draft::Draft4)
            .build(schema)
            .map_err(|e| SchemaError::InvalidSchema {
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn incident_schema() -> Value {
        json!({
            "$schema": "http://json-schema.org/draft-04/schema#",
            "type": "object",
            "properties": {
                "Site": {
                    "type": "object",
                    "properties": {"name": {"type": "string"}},
                    "required": ["name"]
                }
            },
            "required": ["Site"]
        })
    }

    #[test]
    fn test_valid_schema() {
        assert!(SchemaValidator::check(&incident_schema()).is_ok());
        assert!(SchemaValidator::check(&json!({})).is_ok());
    }

    #[test]
    fn test_non_object_rejected() {
        let err = SchemaValidator::check(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidSchema { .. }));
    }

    #[test]
    fn test_meta_schema_violation() {
        let err = SchemaValidator::check(&json!({"type": 5})).unwrap_err();
        assert!(err.to_string().starts_with("Invalid schema: "));

        let err = SchemaValidator::check(&json!({"required": "Site"})).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidSchema { .. }));
    }

    #[test]
    fn test_unresolved_references_pass_check() {
        let schema = json!({
            "type": "object",
            "properties": {"Site": {"$ref": "#/definitions/missing"}}
        });
        assert!(SchemaValidator::check(&schema).is_ok());

        let remote = json!({"$ref": "http://schemas.invalid/site.json"});
        assert!(SchemaValidator::check(&remote).is_ok());
    }

    #[test]
    fn test_validate_data() {
        let schema = incident_schema();
        let id = Uuid::new_v4();
        assert!(SchemaValidator::validate_data(id, &schema, &json!({"Site": {"name": "X"}})).is_ok());

        let err = SchemaValidator::validate_data(id, &schema, &json!({"Site": {}})).unwrap_err();
        match err {
            SchemaError::DataValidation { schema_id, errors } => {
                assert_eq!(schema_id, id);
                assert_eq!(errors.len(), 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
