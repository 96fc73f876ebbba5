//! The change audit log component
//!
//! `ChangeAuditLog` is constructed once at process start and shared by
//! handle with every request handler. Writing never fails the caller: a
//! failed write is reported on the tracing channel and counted, and the
//! business operation carries on.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate};
use serde_json::Value;

use super::diff::calculate_changes;
use super::entry::{AuditAction, AuditEntry, NewAuditEntry, RequestContext, SYSTEM_TABLE};
use super::query::AuditQuery;
use super::snapshot::Snapshot;
use super::stats::{recent_threshold, AuditStatistics, DailySummary, RECENT_WINDOW_HOURS};
use super::store::{AuditStore, SqliteAuditStore};
use crate::error::{AuditError, AuditResult};

/// Append-only change log with diffing, retrieval and statistics
#[derive(Clone)]
pub struct ChangeAuditLog {
    store: Arc<dyn AuditStore>,
    write_failures: Arc<AtomicU64>,
    recent_window_hours: i64,
}

impl ChangeAuditLog {
    /// Create a log over an existing store
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self {
            store,
            write_failures: Arc::new(AtomicU64::new(0)),
            recent_window_hours: RECENT_WINDOW_HOURS,
        }
    }

    /// Open the SQLite audit database at `path`
    pub fn open(path: &Path) -> AuditResult<Self> {
        Ok(Self::new(Arc::new(SqliteAuditStore::open(path)?)))
    }

    /// Fresh in-memory log, one per test
    pub fn open_in_memory() -> AuditResult<Self> {
        Ok(Self::new(Arc::new(SqliteAuditStore::open_in_memory()?)))
    }

    /// Change the trailing window used for recent activity
    pub fn with_recent_window(mut self, hours: i64) -> Self {
        self.recent_window_hours = hours;
        self
    }

    /// Record one action
    ///
    /// For `UPDATE` with both snapshots the field-level diff is stored as
    /// `changes`. Returns the new entry id, or `None` if the write failed;
    /// failures never propagate.
    #[allow(clippy::too_many_arguments)]
    pub fn log_action(
        &self,
        action: AuditAction,
        table_name: &str,
        record_id: impl ToString,
        old_values: Option<Snapshot>,
        new_values: Option<Snapshot>,
        user_info: Option<Value>,
        context: Option<&RequestContext>,
    ) -> Option<i64> {
        let changes = match (&action, &old_values, &new_values) {
            (AuditAction::Update, Some(old), Some(new)) => Some(calculate_changes(old, new)),
            _ => None,
        };

        let entry = NewAuditEntry::new(action, table_name, record_id)
            .with_snapshots(old_values, new_values)
            .with_changes(changes)
            .with_user_info(user_info)
            .with_context(context);

        self.write(&entry)
    }

    /// Record an insert with the stored record's snapshot
    pub fn log_insert(
        &self,
        table_name: &str,
        record_id: impl ToString,
        new_values: Snapshot,
        user_info: Option<Value>,
        context: Option<&RequestContext>,
    ) -> Option<i64> {
        self.log_action(
            AuditAction::Insert,
            table_name,
            record_id,
            None,
            Some(new_values),
            user_info,
            context,
        )
    }

    /// Record an update with before/after snapshots
    pub fn log_update(
        &self,
        table_name: &str,
        record_id: impl ToString,
        old_values: Snapshot,
        new_values: Snapshot,
        user_info: Option<Value>,
        context: Option<&RequestContext>,
    ) -> Option<i64> {
        self.log_action(
            AuditAction::Update,
            table_name,
            record_id,
            Some(old_values),
            Some(new_values),
            user_info,
            context,
        )
    }

    /// Record a delete with the removed record's last snapshot
    pub fn log_delete(
        &self,
        table_name: &str,
        record_id: impl ToString,
        old_values: Snapshot,
        user_info: Option<Value>,
        context: Option<&RequestContext>,
    ) -> Option<i64> {
        self.log_action(
            AuditAction::Delete,
            table_name,
            record_id,
            Some(old_values),
            None,
            user_info,
            context,
        )
    }

    /// Record a non-table event on the `SYSTEM` table
    pub fn log_system_event(
        &self,
        label: &str,
        record_id: impl ToString,
        user_info: Option<Value>,
    ) -> Option<i64> {
        self.log_action(
            AuditAction::system(label),
            SYSTEM_TABLE,
            record_id,
            None,
            None,
            user_info,
            None,
        )
    }

    fn write(&self, entry: &NewAuditEntry) -> Option<i64> {
        match self.store.append(entry) {
            Ok(id) => {
                tracing::info!(
                    id,
                    action = %entry.action,
                    table = %entry.table_name,
                    record = %entry.record_id,
                    "audit logged"
                );
                Some(id)
            }
            Err(e) => {
                self.write_failures.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    error = %e,
                    action = %entry.action,
                    table = %entry.table_name,
                    record = %entry.record_id,
                    "failed to log audit action"
                );
                None
            }
        }
    }

    /// Number of writes that failed since this log was created
    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    /// Entries matching the query, newest first
    pub fn get_audit_logs(&self, query: &AuditQuery) -> AuditResult<Vec<AuditEntry>> {
        self.store.query(query)
    }

    /// Total entries matching the query's filters, for page counts
    pub fn count_audit_logs(&self, query: &AuditQuery) -> AuditResult<u64> {
        self.store.count(query)
    }

    /// Free-text search; the query must carry non-blank `search_text`
    pub fn search(&self, query: &AuditQuery) -> AuditResult<Vec<AuditEntry>> {
        match query.search_text.as_deref() {
            Some(text) if !text.trim().is_empty() => self.store.query(query),
            _ => Err(AuditError::Query("search text is required".into())),
        }
    }

    /// One entry by id
    pub fn get_entry(&self, id: i64) -> AuditResult<AuditEntry> {
        self.store
            .get(id)?
            .ok_or_else(|| AuditError::entry_not_found(id.to_string()))
    }

    /// Full change timeline of one record, newest first
    pub fn get_record_history(
        &self,
        table_name: &str,
        record_id: impl ToString,
    ) -> AuditResult<Vec<AuditEntry>> {
        self.store
            .query(&AuditQuery::record_history(table_name, record_id))
    }

    /// Statistics computed fresh from the store
    pub fn get_statistics(&self) -> AuditResult<AuditStatistics> {
        let since = recent_threshold(&Local::now().naive_local(), self.recent_window_hours);
        self.store.statistics(&since)
    }

    /// Per-day, per-table counts for the last `days` days including today
    pub fn daily_summary(&self, days: u32) -> AuditResult<Vec<DailySummary>> {
        let today = Local::now().date_naive();
        let first_day = Duration::try_days(i64::from(days.max(1)) - 1)
            .and_then(|span| today.checked_sub_signed(span))
            .unwrap_or(NaiveDate::MIN);
        let since = format!("{} 00:00:00.000000", first_day.format("%Y-%m-%d"));
        self.store.daily_summary(&since)
    }

    /// Delete every entry (administrative reset)
    pub fn purge(&self) -> AuditResult<u64> {
        self.store.purge()
    }

    /// Copy the whole log to a database file at `path`
    pub fn backup_to(&self, path: &Path) -> AuditResult<()> {
        self.store.backup_to(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::diff::FieldChange;
    use serde_json::json;

    /// Store whose every operation fails
    struct UnavailableStore;

    impl AuditStore for UnavailableStore {
        fn append(&self, _entry: &NewAuditEntry) -> AuditResult<i64> {
            Err(AuditError::Storage("database is locked".into()))
        }
        fn query(&self, _query: &AuditQuery) -> AuditResult<Vec<AuditEntry>> {
            Err(AuditError::Storage("database is locked".into()))
        }
        fn count(&self, _query: &AuditQuery) -> AuditResult<u64> {
            Err(AuditError::Storage("database is locked".into()))
        }
        fn get(&self, _id: i64) -> AuditResult<Option<AuditEntry>> {
            Err(AuditError::Storage("database is locked".into()))
        }
        fn statistics(&self, _recent_since: &str) -> AuditResult<AuditStatistics> {
            Err(AuditError::Storage("database is locked".into()))
        }
        fn daily_summary(&self, _since: &str) -> AuditResult<Vec<DailySummary>> {
            Err(AuditError::Storage("database is locked".into()))
        }
        fn purge(&self) -> AuditResult<u64> {
            Err(AuditError::Storage("database is locked".into()))
        }
        fn backup_to(&self, _path: &Path) -> AuditResult<()> {
            Err(AuditError::Storage("database is locked".into()))
        }
    }

    fn snap(value: Value) -> Snapshot {
        Snapshot::from_value(value).unwrap()
    }

    #[test]
    fn test_append_only_ids_increase() {
        let log = ChangeAuditLog::open_in_memory().unwrap();

        let ids: Vec<i64> = (0..10)
            .map(|i| {
                log.log_action(AuditAction::Insert, "Withdraw", i, None, None, None, None)
                    .unwrap()
            })
            .collect();

        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(log.count_audit_logs(&AuditQuery::new()).unwrap(), 10);
        assert_eq!(log.write_failures(), 0);
    }

    #[test]
    fn test_invoice_scenario() {
        let log = ChangeAuditLog::open_in_memory().unwrap();

        log.log_insert(
            "Invoices",
            "INV-1",
            snap(json!({"Excl": 100.0, "BTW": 21.0})),
            None,
            None,
        )
        .unwrap();
        log.log_update(
            "Invoices",
            "INV-1",
            snap(json!({"Excl": 100.0, "BTW": 21.0, "payment_status": "pending"})),
            snap(json!({"Excl": 100.0, "BTW": 21.0, "payment_status": "paid"})),
            None,
            None,
        )
        .unwrap();

        let history = log.get_record_history("Invoices", "INV-1").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].action, AuditAction::Update);
        assert_eq!(history[1].action, AuditAction::Insert);

        let changes = history[0].changes.as_ref().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes["payment_status"],
            FieldChange::new(json!("pending"), json!("paid"))
        );
        assert!(history[1].changes.is_none());
    }

    #[test]
    fn test_noop_update_stores_empty_changes() {
        let log = ChangeAuditLog::open_in_memory().unwrap();
        let same = snap(json!({"DebtName": "Car", "Amount": 1000.0}));

        let id = log
            .log_update("DebtRegister", "Car", same.clone(), same, None, None)
            .unwrap();

        let entry = log.get_entry(id).unwrap();
        assert_eq!(entry.changes, Some(Default::default()));
    }

    #[test]
    fn test_changes_only_for_updates() {
        let log = ChangeAuditLog::open_in_memory().unwrap();
        let id = log
            .log_action(
                AuditAction::Delete,
                "Invoices",
                "INV-3",
                Some(snap(json!({"a": 1}))),
                Some(snap(json!({"a": 2}))),
                None,
                None,
            )
            .unwrap();

        assert!(log.get_entry(id).unwrap().changes.is_none());
    }

    #[test]
    fn test_update_with_one_snapshot_has_no_changes() {
        let log = ChangeAuditLog::open_in_memory().unwrap();
        let id = log
            .log_action(
                AuditAction::Update,
                "Invoices",
                "INV-4",
                None,
                Some(snap(json!({"a": 2}))),
                None,
                None,
            )
            .unwrap();

        let entry = log.get_entry(id).unwrap();
        assert!(entry.changes.is_none());
        assert!(entry.new_values.is_some());
    }

    #[test]
    fn test_request_context_attribution() {
        let log = ChangeAuditLog::open_in_memory().unwrap();
        let ctx = RequestContext::new()
            .with_ip_address("192.168.1.20")
            .with_user_agent("Mozilla/5.0")
            .with_session_id("sess-1");

        let id = log
            .log_delete(
                "Withdraw",
                7,
                snap(json!({"Amount": -25.5})),
                Some(json!({"function": "delete_withdraw"})),
                Some(&ctx),
            )
            .unwrap();

        let entry = log.get_entry(id).unwrap();
        assert_eq!(entry.record_id, "7");
        assert_eq!(entry.ip_address.as_deref(), Some("192.168.1.20"));
        assert_eq!(entry.user_agent.as_deref(), Some("Mozilla/5.0"));
        assert_eq!(entry.session_id.as_deref(), Some("sess-1"));
        assert_eq!(entry.user_info, Some(json!({"function": "delete_withdraw"})));
    }

    #[test]
    fn test_system_event() {
        let log = ChangeAuditLog::open_in_memory().unwrap();
        let id = log
            .log_system_event("SYSTEM_START", "STARTUP", Some(json!({"action": "startup"})))
            .unwrap();

        let entry = log.get_entry(id).unwrap();
        assert_eq!(entry.table_name, SYSTEM_TABLE);
        assert_eq!(entry.action, AuditAction::system("SYSTEM_START"));
    }

    #[test]
    fn test_failure_isolation() {
        let log = ChangeAuditLog::new(Arc::new(UnavailableStore));

        let business_result: Result<&str, AuditError> = (|| {
            let id = log.log_insert(
                "Invoices",
                "INV-1",
                snap(json!({"Excl": 100.0})),
                None,
                None,
            );
            assert!(id.is_none());
            Ok("invoice saved")
        })();

        assert_eq!(business_result.unwrap(), "invoice saved");
        assert_eq!(log.write_failures(), 1);
    }

    #[test]
    fn test_blank_table_is_swallowed() {
        let log = ChangeAuditLog::open_in_memory().unwrap();
        assert!(log
            .log_action(AuditAction::Insert, " ", "1", None, None, None, None)
            .is_none());
        assert_eq!(log.write_failures(), 1);
        assert_eq!(log.count_audit_logs(&AuditQuery::new()).unwrap(), 0);
    }

    #[test]
    fn test_read_failures_surface() {
        let log = ChangeAuditLog::new(Arc::new(UnavailableStore));
        assert!(log.get_audit_logs(&AuditQuery::new()).is_err());
        assert!(log.get_statistics().is_err());
        assert!(log.get_record_history("Invoices", "INV-1").is_err());
    }

    #[test]
    fn test_search_requires_text() {
        let log = ChangeAuditLog::open_in_memory().unwrap();
        log.log_insert(
            "DebtRegister",
            "Car",
            snap(json!({"DebtName": "Car loan"})),
            None,
            None,
        );

        assert!(log.search(&AuditQuery::new()).is_err());
        assert!(log.search(&AuditQuery::new().search("  ")).is_err());
        assert_eq!(log.search(&AuditQuery::new().search("car LOAN")).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_entry_is_not_found() {
        let log = ChangeAuditLog::open_in_memory().unwrap();
        assert!(log.get_entry(1).unwrap_err().is_not_found());
    }

    #[test]
    fn test_statistics_consistency() {
        let log = ChangeAuditLog::open_in_memory().unwrap();
        for (table, n) in [("Invoices", 4), ("Withdraw", 3), ("DebtRegister", 2)] {
            for i in 0..n {
                log.log_action(AuditAction::Insert, table, i, None, None, None, None);
            }
        }
        log.log_system_event("TRANSACTION_START", "TXN_1", None);

        let stats = log.get_statistics().unwrap();
        let all = log
            .get_audit_logs(&AuditQuery::new().limit(u32::MAX))
            .unwrap();

        assert_eq!(stats.overall.total_actions, all.len() as u64);
        assert_eq!(stats.overall.tables_tracked, 4);
        assert_eq!(stats.recent_activity, 10);
        assert_eq!(stats.action_count("INSERT"), 9);
    }

    #[test]
    fn test_recent_window_excludes_old_entries() {
        let store = Arc::new(SqliteAuditStore::open_in_memory().unwrap());
        store
            .append(
                &NewAuditEntry::new(AuditAction::Insert, "Invoices", "OLD")
                    .with_timestamp("2001-01-01 00:00:00.000000"),
            )
            .unwrap();
        let log = ChangeAuditLog::new(store);
        log.log_action(AuditAction::Insert, "Invoices", "NEW", None, None, None, None);

        let stats = log.get_statistics().unwrap();
        assert_eq!(stats.overall.total_actions, 2);
        assert_eq!(stats.recent_activity, 1);
    }

    #[test]
    fn test_daily_summary_covers_today() {
        let log = ChangeAuditLog::open_in_memory().unwrap();
        log.log_action(AuditAction::Insert, "Invoices", 1, None, None, None, None);
        log.log_action(AuditAction::Delete, "Invoices", 1, None, None, None, None);

        let summary = log.daily_summary(7).unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].total_operations, 2);
        assert_eq!(summary[0].inserts, 1);
        assert_eq!(summary[0].deletes, 1);
    }

    #[test]
    fn test_extreme_windows_do_not_overflow() {
        let log = ChangeAuditLog::open_in_memory()
            .unwrap()
            .with_recent_window(10_000_000_000);
        log.log_action(AuditAction::Insert, "Invoices", 1, None, None, None, None);

        let stats = log.get_statistics().unwrap();
        assert_eq!(stats.recent_activity, 1);

        let summary = log.daily_summary(100_000_000).unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].inserts, 1);

        let summary = log.daily_summary(u32::MAX).unwrap();
        assert_eq!(summary.len(), 1);
    }

    #[test]
    fn test_concurrent_writers_each_append_one_row() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 50;

        let dir = tempfile::TempDir::new().unwrap();
        let log = ChangeAuditLog::open(&dir.path().join("audit.db")).unwrap();

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let log = log.clone();
                std::thread::spawn(move || {
                    (0..PER_THREAD)
                        .map(|i| {
                            log.log_action(
                                AuditAction::Insert,
                                "Invoices",
                                format!("{}-{}", t, i),
                                None,
                                Some(snap(json!({"thread": t, "seq": i}))),
                                None,
                                None,
                            )
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.extend(handle.join().unwrap());
        }

        assert_eq!(log.write_failures(), 0);
        assert_eq!(
            log.count_audit_logs(&AuditQuery::new()).unwrap(),
            (THREADS * PER_THREAD) as u64
        );

        let mut ids: Vec<i64> = ids.into_iter().map(|id| id.unwrap()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), THREADS * PER_THREAD);
    }

    #[test]
    fn test_system_label_filter_ignores_case() {
        let log = ChangeAuditLog::open_in_memory().unwrap();
        log.log_system_event("transaction_start", "TXN_1", None);
        log.log_system_event("insert", "TXN_1", None);

        let action: AuditAction = "Transaction_Start".parse().unwrap();
        let found = log
            .get_audit_logs(&AuditQuery::new().action(action))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].action.as_str(), "TRANSACTION_START");

        let inserts = log
            .get_audit_logs(&AuditQuery::new().action(AuditAction::Insert))
            .unwrap();
        assert_eq!(inserts.len(), 1);
    }

    #[test]
    fn test_clones_share_store() {
        let log = ChangeAuditLog::open_in_memory().unwrap();
        let handle = log.clone();
        handle.log_action(AuditAction::Insert, "Invoices", 1, None, None, None, None);
        assert_eq!(log.count_audit_logs(&AuditQuery::new()).unwrap(), 1);
    }
}
