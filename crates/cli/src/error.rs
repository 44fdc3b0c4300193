//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Session database not found
    #[error("Session database not found: {path}")]
    DatabaseNotFound { path: String },

    /// Refusing to overwrite an existing file
    #[error("{path} already exists (use --force to overwrite)")]
    OutputExists { path: String },

    /// Configuration validation failed
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },

    /// Interrupted by a shutdown signal
    #[error("Interrupted before the analysis finished")]
    Interrupted,
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn database_not_found(path: impl Into<String>) -> Self {
        Self::DatabaseNotFound { path: path.into() }
    }

    pub fn output_exists(path: impl Into<String>) -> Self {
        Self::OutputExists { path: path.into() }
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }
}
