//! Values schema validation
//!
//! Service charts ship a JSON Schema (`values.schema.json`) that their
//! synthesized values are checked against before anything is published.

use serde_json::Value as JsonValue;

use crate::error::{CoreError, Result, ValidationErrorInfo};
use crate::values::ValueDocument;

/// Result of schema validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    /// Whether the values are valid
    pub is_valid: bool,
    /// Validation errors
    pub errors: Vec<ValidationErrorInfo>,
}

impl ValidationResult {
    /// Create a successful validation result
    pub fn success() -> Self {
        Self {
            is_valid: true,
            errors: vec![],
        }
    }

    /// Create a failed validation result with errors
    pub fn failure(errors: Vec<ValidationErrorInfo>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }

    /// Fold another result into this one
    pub fn merge(&mut self, other: ValidationResult) {
        self.is_valid &= other.is_valid;
        self.errors.extend(other.errors);
    }

    /// Turn a failed result into [`CoreError::Validation`]
    pub fn into_result(self) -> Result<()> {
        if self.is_valid {
            Ok(())
        } else {
            Err(CoreError::Validation {
                errors: self.errors,
            })
        }
    }
}

/// Schema validator with a compiled JSON Schema
pub struct SchemaValidator {
    compiled: jsonschema::Validator,
}

impl SchemaValidator {
    /// Compile a validator from JSON Schema source
    pub fn from_json(source: &str) -> Result<Self> {
        let schema: JsonValue = serde_json::from_str(source)?;
        Self::new(&schema)
    }

    pub fn new(schema: &JsonValue) -> Result<Self> {
        let compiled =
            jsonschema::validator_for(schema).map_err(|e| CoreError::InvalidSchema {
                message: format!("Invalid schema: {}", e),
            })?;

        Ok(Self { compiled })
    }

    /// Validate values, prefixing every error path with `scope`
    pub fn validate(&self, scope: &str, values: &ValueDocument) -> ValidationResult {
        let instance = values.to_json();
        if self.compiled.is_valid(&instance) {
            return ValidationResult::success();
        }

        let errors: Vec<ValidationErrorInfo> = self
            .compiled
            .iter_errors(&instance)
            .map(|e| {
                let pointer = e.instance_path.to_string();
                ValidationErrorInfo {
                    path: format!("{}{}", scope, pointer),
                    message: format_validation_error(&e),
                }
            })
            .collect();

        ValidationResult::failure(errors)
    }
}

/// Format a validation error into a user-friendly message
fn format_validation_error(error: &jsonschema::ValidationError) -> String {
    error.to_string().replace('"', "'")
}
