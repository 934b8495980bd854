//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

use chartwright::{ConfigError, ServiceError};
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Chart values violate the service schema
    #[error("Validation failed: {message}")]
    #[diagnostic(code(chartwright::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Parameters cannot be compiled into a chart
    #[error("Chart error: {message}")]
    #[diagnostic(code(chartwright::cli::chart))]
    Chart {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Config error: {message}")]
    #[diagnostic(code(chartwright::cli::config))]
    Config { message: String },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(chartwright::cli::io))]
    Io { message: String },

    /// Invalid command-line input
    #[error("{message}")]
    #[diagnostic(code(chartwright::cli::usage))]
    Usage {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Internal error (runtime, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(chartwright::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Chart { .. } => exit_codes::CHART_ERROR,
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a usage error with help text
    pub fn usage_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a chart error from a params file problem
    pub fn chart(message: impl Into<String>) -> Self {
        Self::Chart {
            message: message.into(),
            help: None,
        }
    }
}

impl From<ServiceError> for CliError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::ChartValidation { errors } => CliError::Validation {
                message: errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
                help: Some("run `chartwright validate` for a full report".to_string()),
            },
            ServiceError::InvalidArgument { message } => CliError::Chart {
                message,
                help: None,
            },
            ServiceError::FailedPrecondition { message } | ServiceError::Internal { message } => {
                CliError::Internal { message }
            }
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::Config {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chartwright_core::ValidationErrorInfo;

    #[test]
    fn test_validation_maps_to_validation_exit_code() {
        let err: CliError = ServiceError::ChartValidation {
            errors: vec![ValidationErrorInfo {
                path: "api/replicaCount".into(),
                message: "-1 is less than the minimum of 0".into(),
            }],
        }
        .into();

        assert_eq!(err.exit_code(), exit_codes::VALIDATION_ERROR);
        assert!(err.to_string().contains("api/replicaCount"));
    }

    #[test]
    fn test_invalid_argument_maps_to_chart_error() {
        let err: CliError = ServiceError::invalid_argument("services are required").into();
        assert_eq!(err.exit_code(), exit_codes::CHART_ERROR);
    }
}
