use jsonschema::validator_for;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("schema compile error: {0}")]
    Compile(String),
    #[error("{0}")]
    Invalid(String),
}

/// Validate tool-call arguments against a tool's declared input schema.
/// Returns the first violation as a human-readable message.
pub fn validate_arguments(schema: &Value, arguments: &Value) -> Result<(), SchemaError> {
    let validator =
        validator_for(schema).map_err(|e| SchemaError::Compile(e.to_string()))?;

    validator
        .validate(arguments)
        .map_err(|e| SchemaError::Invalid(e.to_string()))
}
