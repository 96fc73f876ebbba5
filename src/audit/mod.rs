//! Change audit log for the Ozark bookkeeping data
//!
//! Every insert, update and delete on a business table is recorded as an
//! append-only entry with before/after snapshots and, for updates, the
//! field-level diff.
//!
//! # Architecture
//!
//! - `ChangeAuditLog`: the component handlers hold. Writes never fail the
//!   caller; reads return `AuditResult`.
//! - `AuditStore`: storage seam, implemented by `SqliteAuditStore`.
//! - `Snapshot` / `RecordStore`: how handlers capture entity state.
//! - `calculate_changes`: the diff between two snapshots.
//! - `audit_transaction` / `audited`: wrappers that record around a unit of work.
//!
//! # Example
//!
//! ```rust,ignore
//! use ozark_audit::audit::{ChangeAuditLog, RecordStore, SqliteRecordStore};
//!
//! let log = ChangeAuditLog::open(&paths.audit_db())?;
//! let before = records.fetch_snapshot("Invoices", "INV-1")?;
//! // ... update the invoice ...
//! let after = records.fetch_snapshot("Invoices", "INV-1")?;
//! if let (Some(before), Some(after)) = (before, after) {
//!     log.log_update("Invoices", "INV-1", before, after, None, Some(&ctx));
//! }
//! ```

mod diff;
mod entry;
mod logger;
mod query;
mod snapshot;
mod stats;
mod store;
mod transaction;

pub(crate) use diff::format_value;
pub use diff::{calculate_changes, calculate_value_changes, summarize_changes, Changes, FieldChange};
pub use entry::{
    format_timestamp, now_timestamp, AuditAction, AuditEntry, NewAuditEntry, RequestContext,
    SYSTEM_TABLE, TIMESTAMP_FORMAT,
};
pub use logger::ChangeAuditLog;
pub use query::{AuditQuery, DEFAULT_LIMIT, EXPORT_LIMIT, RECORD_HISTORY_LIMIT};
pub use snapshot::{RecordStore, Snapshot, SqliteRecordStore};
pub use stats::{
    recent_threshold, ActionCount, AuditStatistics, DailySummary, OverallStats, TableActivity,
    RECENT_WINDOW_HOURS,
};
pub use store::{verify_schema, AuditStore, SchemaReport, SqliteAuditStore};
pub use transaction::{
    audit_transaction, audited, transaction_id, TRANSACTION_COMPLETE, TRANSACTION_ERROR,
    TRANSACTION_START,
};
