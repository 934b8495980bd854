//! Core error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::values::Value;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("chart validation error: {}", format_errors(.errors))]
    Validation { errors: Vec<ValidationErrorInfo> },

    #[error("service '{name}' is already attached to this chart")]
    DuplicateServiceName { name: String },

    #[error("dependency '{name}' is already declared by this chart")]
    DuplicateDependency { name: String },

    #[error("invalid {kind} name '{name}': must be a lowercase DNS label of at most 63 characters")]
    InvalidName { kind: &'static str, name: String },

    #[error("override path {path} already exists as {existing}")]
    OverrideConflict { path: String, existing: Value },

    #[error("archive I/O error at {path}: {source}")]
    ArchiveIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid chart version '{version}': {source}")]
    InvalidVersion {
        version: String,
        #[source]
        source: semver::Error,
    },

    #[error("invalid chart archive: {message}")]
    InvalidArchive { message: String },

    #[error("invalid canonical template: {message}")]
    InvalidTemplate { message: String },

    #[error("invalid schema: {message}")]
    InvalidSchema { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl CoreError {
    /// Wrap an I/O error with the path it happened on
    pub fn archive_io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::ArchiveIo {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Whether this error is a values schema violation
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

/// A single schema violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorInfo {
    /// JSON pointer of the offending value, prefixed with the service name
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ValidationErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

fn format_errors(errors: &[ValidationErrorInfo]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, CoreError>;
