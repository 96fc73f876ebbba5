//! Aggregate statistics over the audit log
//!
//! Derived on every call from the stored rows; nothing here is persisted.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::entry::format_timestamp;

/// Trailing window counted as "recent activity"
pub const RECENT_WINDOW_HOURS: i64 = 24;

/// Totals over the whole log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallStats {
    pub total_actions: u64,
    /// Distinct `table_name` values
    pub tables_tracked: u64,
    /// Distinct `record_id` values
    pub records_affected: u64,
    pub first_activity: Option<String>,
    pub last_activity: Option<String>,
}

/// Entry count for one action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCount {
    pub action: String,
    pub count: u64,
}

/// Entry count and latest timestamp for one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableActivity {
    pub table_name: String,
    pub count: u64,
    pub last_activity: Option<String>,
}

/// Snapshot of audit log statistics for the monitoring view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStatistics {
    pub overall: OverallStats,
    /// Ordered by count, highest first
    pub actions: Vec<ActionCount>,
    /// Ordered by count, highest first
    pub tables: Vec<TableActivity>,
    /// Entries within the trailing window
    pub recent_activity: u64,
}

impl AuditStatistics {
    /// Count for one action, zero if it never occurred
    pub fn action_count(&self, action: &str) -> u64 {
        self.actions
            .iter()
            .find(|a| a.action == action)
            .map(|a| a.count)
            .unwrap_or(0)
    }

    /// Activity for one table, if it has any entries
    pub fn table(&self, table_name: &str) -> Option<&TableActivity> {
        self.tables.iter().find(|t| t.table_name == table_name)
    }
}

/// Per-day, per-table operation counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummary {
    /// `YYYY-MM-DD`
    pub date: String,
    pub table_name: String,
    pub total_operations: u64,
    pub inserts: u64,
    pub updates: u64,
    pub deletes: u64,
}

/// Lower `timestamp` bound for the recent-activity window ending at `now`
///
/// A window reaching past the earliest representable time starts there.
pub fn recent_threshold(now: &NaiveDateTime, window_hours: i64) -> String {
    let since = Duration::try_hours(window_hours)
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(NaiveDateTime::MIN);
    format_timestamp(&since)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_threshold() {
        let now =
            NaiveDateTime::parse_from_str("2025-01-15 12:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(
            recent_threshold(&now, RECENT_WINDOW_HOURS),
            "2025-01-14 12:00:00.000000"
        );
    }

    #[test]
    fn test_recent_threshold_saturates() {
        let now =
            NaiveDateTime::parse_from_str("2025-01-15 12:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let since = recent_threshold(&now, 10_000_000_000);
        assert_eq!(since, format_timestamp(&NaiveDateTime::MIN));
        assert!(since < "2025-01-15".to_string());
    }

    #[test]
    fn test_lookup_helpers() {
        let stats = AuditStatistics {
            actions: vec![ActionCount {
                action: "INSERT".into(),
                count: 3,
            }],
            tables: vec![TableActivity {
                table_name: "Invoices".into(),
                count: 3,
                last_activity: Some("2025-01-14 10:00:00.000000".into()),
            }],
            ..Default::default()
        };

        assert_eq!(stats.action_count("INSERT"), 3);
        assert_eq!(stats.action_count("DELETE"), 0);
        assert_eq!(stats.table("Invoices").map(|t| t.count), Some(3));
        assert!(stats.table("Withdraw").is_none());
    }
}
