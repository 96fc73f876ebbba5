//! Filters for retrieving audit entries
//!
//! All filters are optional and combined with AND. Results are always
//! ordered newest first.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use super::entry::{format_timestamp, AuditAction};
use crate::error::{AuditError, AuditResult};

/// Default page size when the caller does not pick one
pub const DEFAULT_LIMIT: u32 = 100;

/// Cap used when reconstructing one record's full timeline
pub const RECORD_HISTORY_LIMIT: u32 = 1000;

/// Cap used for exports
pub const EXPORT_LIMIT: u32 = 10_000;

/// Full-precision layouts for date bounds
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Minute-precision layouts; an upper bound covers the whole minute
const MINUTE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"];

/// Which end of a range a bound closes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoundKind {
    Lower,
    Upper,
}

/// Filter and pagination parameters for audit log retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditQuery {
    pub table_name: Option<String>,
    pub action: Option<AuditAction>,
    pub record_id: Option<String>,
    /// Inclusive lower bound on `timestamp`
    pub date_from: Option<String>,
    /// Inclusive upper bound on `timestamp`; a bare date covers the whole day
    pub date_to: Option<String>,
    /// Case-insensitive substring searched across the entry's text columns
    pub search_text: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            table_name: None,
            action: None,
            record_id: None,
            date_from: None,
            date_to: None,
            search_text: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl AuditQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Query for the full history of one record
    pub fn record_history(table_name: impl Into<String>, record_id: impl ToString) -> Self {
        Self::new()
            .table(table_name)
            .record(record_id)
            .limit(RECORD_HISTORY_LIMIT)
    }

    pub fn table(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn record(mut self, record_id: impl ToString) -> Self {
        self.record_id = Some(record_id.to_string());
        self
    }

    pub fn date_from(mut self, date: impl Into<String>) -> Self {
        self.date_from = Some(date.into());
        self
    }

    pub fn date_to(mut self, date: impl Into<String>) -> Self {
        self.date_to = Some(date.into());
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search_text = Some(text.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Set limit/offset from a 1-based page number
    pub fn page(mut self, page: u32, per_page: u32) -> Self {
        self.limit = per_page;
        self.offset = page.saturating_sub(1).saturating_mul(per_page);
        self
    }

    /// Normalized `timestamp` bounds in stored format
    ///
    /// An inverted range is not an error; it simply matches nothing.
    pub fn timestamp_bounds(&self) -> AuditResult<(Option<String>, Option<String>)> {
        let from = self
            .date_from
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| normalize_bound(s, BoundKind::Lower))
            .transpose()?;
        let to = self
            .date_to
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| normalize_bound(s, BoundKind::Upper))
            .transpose()?;

        Ok((from, to))
    }
}

/// Parse a date or datetime bound
///
/// Bare dates and minute-precision times are widened: a lower bound starts
/// at the first microsecond, an upper bound ends at the last one.
fn normalize_bound(input: &str, kind: BoundKind) -> AuditResult<String> {
    let input = input.trim();

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, fmt) {
            return Ok(format_timestamp(&dt));
        }
    }

    for fmt in MINUTE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, fmt) {
            let dt = match kind {
                BoundKind::Lower => dt,
                BoundKind::Upper => dt
                    .with_second(59)
                    .and_then(|dt| dt.with_nanosecond(999_999_000))
                    .unwrap_or(dt),
            };
            return Ok(format_timestamp(&dt));
        }
    }

    let time = match kind {
        BoundKind::Lower => NaiveTime::from_hms_opt(0, 0, 0),
        BoundKind::Upper => NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999),
    }
    .ok_or_else(|| AuditError::Query("invalid time of day".into()))?;

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map(|date| format_timestamp(&date.and_time(time)))
        .map_err(|_| {
            AuditError::Query(format!(
                "Invalid date '{}'. Use YYYY-MM-DD or YYYY-MM-DD HH:MM:SS",
                input
            ))
        })
}
