//! Custom error types for the audit log
//!
//! This module defines the error hierarchy for the crate using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

/// The main error type for audit log operations
#[derive(Error, Debug)]
pub enum AuditError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Database errors from the audit store or the record store
    #[error("Storage error: {0}")]
    Storage(String),

    /// Malformed query filters
    #[error("Query error: {0}")]
    Query(String),

    /// Snapshot input that is not a flat key/value mapping
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Validation errors for entry fields
    #[error("Validation error: {0}")]
    Validation(String),

    /// Export errors
    #[error("Export error: {0}")]
    Export(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },
}

impl AuditError {
    /// Create a "not found" error for audit entries
    pub fn entry_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Audit entry",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for business records
    pub fn record_not_found(table: &str, key: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity_type: "Record",
            identifier: format!("{}#{}", table, key),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<std::io::Error> for AuditError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<rusqlite::Error> for AuditError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<csv::Error> for AuditError {
    fn from(err: csv::Error) -> Self {
        Self::Export(err.to_string())
    }
}

/// Result type alias for audit log operations
pub type AuditResult<T> = Result<T, AuditError>;
