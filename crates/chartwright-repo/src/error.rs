//! Error types for repository operations

use chartwright_core::CoreError;
use thiserror::Error;

/// Repository operation errors
#[derive(Debug, Error)]
pub enum RepoError {
    // ============ Chart Errors ============
    #[error(transparent)]
    Core(#[from] CoreError),

    // ============ Store Errors ============
    #[error("Object not found: {path}")]
    ObjectNotFound { path: String },

    #[error("Invalid object path: {path}")]
    InvalidPath { path: String },

    #[error("Store error at {path}: {message}")]
    Store { path: String, message: String },

    // ============ Publish Errors ============
    #[error("failed to {step}: {source}")]
    PublishStep {
        step: &'static str,
        #[source]
        source: Box<RepoError>,
    },

    // ============ Network Errors ============
    #[error("Invalid repository URL: {url} - {reason}")]
    InvalidRepositoryUrl { url: String, reason: String },

    #[error("Unsupported repository: {url}")]
    UnsupportedRepository { url: String },

    #[error("HTTP error: {status} - {message}")]
    HttpError { status: u16, message: String },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Request timeout")]
    Timeout,

    // ============ Index Errors ============
    #[error("Index parse error: {message}")]
    IndexParseError { message: String },

    #[error("Chart not found: {name} in repository {repo}")]
    ChartNotFound { name: String, repo: String },

    #[error("Version constraint unsatisfiable: {name} requires {constraint}, available: {available}")]
    UnsatisfiableConstraint {
        name: String,
        constraint: String,
        available: String,
    },

    #[error("Integrity check failed for {name}: expected {expected}, got {actual}")]
    IntegrityCheckFailed {
        name: String,
        expected: String,
        actual: String,
    },

    // ============ IO Errors ============
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RepoError {
    /// Wrap an error with the publish step it happened in
    pub fn at_step(step: &'static str) -> impl FnOnce(RepoError) -> RepoError {
        move |source| RepoError::PublishStep {
            step,
            source: Box::new(source),
        }
    }

    /// Name of the failed publish step, if any
    pub fn step(&self) -> Option<&'static str> {
        match self {
            RepoError::PublishStep { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Innermost error, unwrapping publish steps
    pub fn root(&self) -> &RepoError {
        match self {
            RepoError::PublishStep { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type for repository operations
pub type Result<T> = std::result::Result<T, RepoError>;

impl From<reqwest::Error> for RepoError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RepoError::Timeout
        } else if e.is_connect() {
            RepoError::NetworkError {
                message: format!("Connection failed: {}", e),
            }
        } else if let Some(status) = e.status() {
            RepoError::HttpError {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            RepoError::NetworkError {
                message: e.to_string(),
            }
        }
    }
}

impl From<serde_yaml::Error> for RepoError {
    fn from(e: serde_yaml::Error) -> Self {
        RepoError::Serialization(e.to_string())
    }
}

impl From<url::ParseError> for RepoError {
    fn from(e: url::ParseError) -> Self {
        RepoError::InvalidRepositoryUrl {
            url: String::new(),
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_step_wraps_source() {
        let err = RepoError::at_step("upload index")(RepoError::ObjectNotFound {
            path: "repo/index.yaml".into(),
        });

        assert_eq!(err.step(), Some("upload index"));
        assert!(err.to_string().starts_with("failed to upload index"));
        assert!(matches!(err.root(), RepoError::ObjectNotFound { .. }));
    }
}
