//! Error types for the configuration store

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for configuration store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// The configuration directory cannot be created or written to
    #[error("Configuration path error at {}: {message}", .path.display())]
    Path { path: PathBuf, message: String },

    /// Read, write or rename failure unrelated to file corruption
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document could not be encoded as JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// One or more fields failed schema constraints
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Result type alias for configuration store operations
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    pub fn path(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        StoreError::Path {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// True when the caller sent bad input, false for server-side failures
    pub fn is_client_error(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }

    /// Stable machine-readable code for the failure category
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Path { .. } => "CONFIG_PATH_ERROR",
            StoreError::Io { .. } => "CONFIG_IO_ERROR",
            StoreError::Serialization(_) => "CONFIG_SERIALIZATION_ERROR",
            StoreError::Validation(_) => "CONFIG_VALIDATION_ERROR",
        }
    }

    pub fn validation_issues(&self) -> Option<&[ValidationIssue]> {
        match self {
            StoreError::Validation(err) => Some(&err.issues),
            _ => None,
        }
    }
}

/// A single offending field and the reason it was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

/// Every schema violation found in one document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    pub fn single(field: &str, message: &str) -> Self {
        let mut err = Self::new();
        err.add(field, message);
        err
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.issues.push(ValidationIssue {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Ok when no issues were collected
    pub fn into_result(self) -> std::result::Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.issues.iter().any(|issue| issue.field == field)
    }
}

impl Default for ValidationError {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration validation failed: ")?;
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", issue.field, issue.message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_lists_every_issue() {
        let mut err = ValidationError::new();
        err.add("llm_provider", "unknown provider 'x'");
        err.add("telemetry_enabled", "expected a boolean");

        let text = err.to_string();
        assert!(text.contains("llm_provider: unknown provider 'x'"));
        assert!(text.contains("telemetry_enabled: expected a boolean"));
        assert!(err.has_field("telemetry_enabled"));
        assert!(err.clone().into_result().is_err());
        assert!(ValidationError::new().into_result().is_ok());
    }

    #[test]
    fn test_client_and_server_errors_are_distinguishable() {
        let validation: StoreError = ValidationError::single("notes", "too long").into();
        assert!(validation.is_client_error());
        assert_eq!(validation.code(), "CONFIG_VALIDATION_ERROR");
        assert_eq!(validation.validation_issues().map(|i| i.len()), Some(1));

        let io = StoreError::io(
            Path::new("/tmp/config.json"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!io.is_client_error());
        assert_eq!(io.code(), "CONFIG_IO_ERROR");
        assert!(io.validation_issues().is_none());

        let path = StoreError::path("/root/.turbopi", "not writable");
        assert!(!path.is_client_error());
        assert_eq!(path.code(), "CONFIG_PATH_ERROR");
    }
}
