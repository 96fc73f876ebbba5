//! Ozark change audit log
//!
//! An append-only audit trail for the Ozark bookkeeping database: every
//! insert, update and delete on a business table is recorded with
//! before/after snapshots and a field-level diff, stored in a single-file
//! SQLite database, and can be filtered, searched, summarized and exported.
//!
//! # Architecture
//!
//! - `audit`: the `ChangeAuditLog` component, storage, diff and statistics
//! - `config`: path resolution and settings
//! - `error`: custom error types
//! - `export`: JSON / YAML / CSV export
//! - `display`: terminal formatting
//! - `backup`: audit database backups
//! - `cli`: command handlers for the `ozark-audit` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use ozark_audit::audit::{AuditQuery, ChangeAuditLog, Snapshot};
//! use ozark_audit::config::paths::AuditPaths;
//!
//! let paths = AuditPaths::new()?;
//! let log = ChangeAuditLog::open(&paths.audit_db())?;
//! log.log_insert("Invoices", "INV-1", snapshot, None, None);
//! let history = log.get_record_history("Invoices", "INV-1")?;
//! ```

pub mod audit;
pub mod backup;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod export;

pub use audit::ChangeAuditLog;
pub use error::{AuditError, AuditResult};
