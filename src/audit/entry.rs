//! Audit entry data structures
//!
//! Defines the structure of audit log entries including the action union,
//! request attribution, and the entry format itself.

use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::diff::Changes;
use super::snapshot::Snapshot;
use crate::error::AuditError;

/// Table name used for events that are not tied to a business table
pub const SYSTEM_TABLE: &str = "SYSTEM";

/// Timestamp layout used for the `timestamp` column
///
/// Zero-padded so that string order equals chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Format a wall-clock time the way the audit log stores it
pub fn format_timestamp(time: &NaiveDateTime) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Current local wall-clock time in audit log format
pub fn now_timestamp() -> String {
    format_timestamp(&Local::now().naive_local())
}

/// The kind of action an audit entry records
///
/// CRUD actions are a closed set; everything else (transaction brackets,
/// startup markers, `<ACTION>_ERROR` tags) is carried as a system event label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum AuditAction {
    /// A record was inserted
    Insert,
    /// A record was updated
    Update,
    /// A record was deleted
    Delete,
    /// Free-form event label
    System(String),
}

impl AuditAction {
    /// Build an action from a label
    ///
    /// Labels are trimmed and uppercased, so a label that spells a CRUD word
    /// yields that CRUD action and system labels compare case-insensitively.
    pub fn system(label: impl AsRef<str>) -> Self {
        let label = label.as_ref().trim().to_ascii_uppercase();
        match label.as_str() {
            "INSERT" => AuditAction::Insert,
            "UPDATE" => AuditAction::Update,
            "DELETE" => AuditAction::Delete,
            _ => AuditAction::System(label),
        }
    }

    /// The `<ACTION>_ERROR` tag logged when an audited operation fails
    pub fn failed(action: &AuditAction) -> Self {
        Self::System(format!("{}_ERROR", action.as_str()))
    }

    /// Canonical stored representation
    pub fn as_str(&self) -> &str {
        match self {
            AuditAction::Insert => "INSERT",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::System(label) => label,
        }
    }

    /// Whether this is one of the structured CRUD actions
    pub fn is_crud(&self) -> bool {
        !matches!(self, AuditAction::System(_))
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(AuditError::Validation("Action cannot be empty".into()));
        }

        Ok(AuditAction::system(s))
    }
}

impl From<AuditAction> for String {
    fn from(action: AuditAction) -> Self {
        action.as_str().to_string()
    }
}

impl TryFrom<String> for AuditAction {
    type Error = AuditError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Caller attribution taken from the request being served
///
/// All fields are optional; batch and script callers usually have none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Remote network address
    pub ip_address: Option<String>,
    /// User-Agent header
    pub user_agent: Option<String>,
    /// Session identifier
    pub session_id: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn with_session_id(mut self, session: impl Into<String>) -> Self {
        self.session_id = Some(session.into());
        self
    }
}

/// An entry that has not been written yet
///
/// Everything the store needs except the storage-assigned `id` and
/// `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAuditEntry {
    pub timestamp: String,
    pub action: AuditAction,
    pub table_name: String,
    pub record_id: String,
    pub user_info: Option<serde_json::Value>,
    pub changes: Option<Changes>,
    pub old_values: Option<Snapshot>,
    pub new_values: Option<Snapshot>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub session_id: Option<String>,
}

impl NewAuditEntry {
    /// Start a new entry stamped with the current wall-clock time
    pub fn new(action: AuditAction, table_name: impl Into<String>, record_id: impl ToString) -> Self {
        Self {
            timestamp: now_timestamp(),
            action,
            table_name: table_name.into(),
            record_id: record_id.to_string(),
            user_info: None,
            changes: None,
            old_values: None,
            new_values: None,
            ip_address: None,
            user_agent: None,
            session_id: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    pub fn with_user_info(mut self, user_info: Option<serde_json::Value>) -> Self {
        self.user_info = user_info;
        self
    }

    pub fn with_snapshots(mut self, old: Option<Snapshot>, new: Option<Snapshot>) -> Self {
        self.old_values = old;
        self.new_values = new;
        self
    }

    pub fn with_changes(mut self, changes: Option<Changes>) -> Self {
        self.changes = changes;
        self
    }

    pub fn with_context(mut self, context: Option<&RequestContext>) -> Self {
        if let Some(ctx) = context {
            self.ip_address = ctx.ip_address.clone();
            self.user_agent = ctx.user_agent.clone();
            self.session_id = ctx.session_id.clone();
        }
        self
    }

    /// Check the fields the store requires to be non-empty
    pub fn validate(&self) -> Result<(), AuditError> {
        if self.table_name.trim().is_empty() {
            return Err(AuditError::Validation("Table name cannot be empty".into()));
        }
        if self.action.as_str().trim().is_empty() {
            return Err(AuditError::Validation("Action cannot be empty".into()));
        }
        Ok(())
    }
}

/// A single stored audit log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Storage-assigned, strictly increasing
    pub id: i64,

    /// Wall-clock time of the write, microsecond precision
    pub timestamp: String,

    pub action: AuditAction,

    /// Business table, or `SYSTEM` for non-table events
    pub table_name: String,

    pub record_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_info: Option<serde_json::Value>,

    /// Field-level diff, only for updates with both snapshots
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<Changes>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_values: Option<Snapshot>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_values: Option<Snapshot>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Insertion time assigned by the database (UTC)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl AuditEntry {
    /// Format the entry for human-readable output
    pub fn format_human_readable(&self) -> String {
        let mut output = format!(
            "[{}] #{} {} {} {}",
            self.timestamp, self.id, self.action, self.table_name, self.record_id
        );

        if let Some(ip) = &self.ip_address {
            output.push_str(&format!(" from {}", ip));
        }

        if let Some(summary) = self.changes.as_ref().and_then(super::diff::summarize_changes) {
            output.push_str(&format!("\n  Changes: {}", summary));
        }

        output
    }
}
