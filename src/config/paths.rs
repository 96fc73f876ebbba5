//! Path management for the audit tooling
//!
//! ## Path Resolution Order
//!
//! 1. `OZARK_AUDIT_DATA_DIR` environment variable (if set)
//! 2. The platform config directory joined with `ozark-audit`
//!    (`~/.config/ozark-audit` on Linux, `%APPDATA%\ozark-audit` on Windows)

use std::path::{Path, PathBuf};

use directories::BaseDirs;

use crate::error::AuditError;

/// Environment variable overriding the base directory
pub const DATA_DIR_ENV: &str = "OZARK_AUDIT_DATA_DIR";

const APP_DIR: &str = "ozark-audit";

/// Manages all paths used by the audit tooling
#[derive(Debug, Clone)]
pub struct AuditPaths {
    base_dir: PathBuf,
}

impl AuditPaths {
    /// Resolve paths from the environment
    ///
    /// # Errors
    ///
    /// Returns an error if no override is set and the platform has no
    /// config directory for the current user.
    pub fn new() -> Result<Self, AuditError> {
        let base_dir = match std::env::var_os(DATA_DIR_ENV) {
            Some(custom) if !custom.is_empty() => PathBuf::from(custom),
            _ => resolve_default_path()?,
        };

        Ok(Self { base_dir })
    }

    /// Create AuditPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// The audit database (`audit_tracker.db`)
    pub fn audit_db(&self) -> PathBuf {
        self.base_dir.join("audit_tracker.db")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.base_dir.join("backups")
    }

    /// Ensure the base and backup directories exist
    pub fn ensure_directories(&self) -> Result<(), AuditError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| AuditError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.backup_dir())
            .map_err(|e| AuditError::Io(format!("Failed to create backup directory: {}", e)))?;

        Ok(())
    }

    /// Whether `init` has been run here
    pub fn is_initialized(&self) -> bool {
        self.audit_db().exists()
    }
}

fn resolve_default_path() -> Result<PathBuf, AuditError> {
    BaseDirs::new()
        .map(|dirs| dirs.config_dir().join(APP_DIR))
        .ok_or_else(|| AuditError::Config("Could not determine the config directory".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_custom_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = AuditPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.base_dir(), temp_dir.path());
        assert_eq!(paths.audit_db(), temp_dir.path().join("audit_tracker.db"));
        assert_eq!(paths.settings_file(), temp_dir.path().join("config.json"));
        assert_eq!(paths.backup_dir(), temp_dir.path().join("backups"));
    }

    #[test]
    fn test_env_var_override() {
        let temp_dir = TempDir::new().unwrap();

        std::env::set_var(DATA_DIR_ENV, temp_dir.path());
        let paths = AuditPaths::new().unwrap();
        std::env::remove_var(DATA_DIR_ENV);

        assert_eq!(paths.base_dir(), temp_dir.path());
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let paths = AuditPaths::with_base_dir(temp_dir.path().join("nested"));

        assert!(!paths.is_initialized());
        paths.ensure_directories().unwrap();
        assert!(paths.backup_dir().exists());
    }
}
