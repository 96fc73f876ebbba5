//! Audit store backed by a single-file SQLite database
//!
//! One append-only `audit_log` table plus indexes on timestamp,
//! table/action and record id. The connection sits behind a mutex and is
//! held for exactly one operation at a time.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, DatabaseName, OpenFlags, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::entry::{AuditAction, AuditEntry, NewAuditEntry};
use super::query::AuditQuery;
use super::stats::{ActionCount, AuditStatistics, DailySummary, OverallStats, TableActivity};
use crate::error::{AuditError, AuditResult};

/// Columns every audit database must have
pub const REQUIRED_COLUMNS: &[&str] = &[
    "id",
    "timestamp",
    "action",
    "table_name",
    "record_id",
    "user_info",
    "changes",
    "old_values",
    "new_values",
    "ip_address",
    "user_agent",
    "session_id",
    "created_at",
];

/// Indexes created alongside the table
pub const EXPECTED_INDEXES: &[&str] = &[
    "idx_audit_timestamp",
    "idx_audit_table_action",
    "idx_audit_record_id",
    "idx_audit_created_at",
];

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS audit_log (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp   TEXT NOT NULL,
        action      TEXT NOT NULL,
        table_name  TEXT NOT NULL,
        record_id   TEXT NOT NULL,
        user_info   TEXT,
        changes     TEXT,
        old_values  TEXT,
        new_values  TEXT,
        ip_address  TEXT,
        user_agent  TEXT,
        session_id  TEXT,
        created_at  DATETIME DEFAULT CURRENT_TIMESTAMP
    );

    CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
    CREATE INDEX IF NOT EXISTS idx_audit_table_action ON audit_log(table_name, action);
    CREATE INDEX IF NOT EXISTS idx_audit_record_id ON audit_log(record_id);
    CREATE INDEX IF NOT EXISTS idx_audit_created_at ON audit_log(created_at);
";

const SELECT_COLUMNS: &str = "id, timestamp, action, table_name, record_id, user_info, changes, \
     old_values, new_values, ip_address, user_agent, session_id, created_at";

/// Columns matched by free-text search
const SEARCH_COLUMNS: &[&str] = &[
    "action",
    "table_name",
    "record_id",
    "user_info",
    "changes",
    "old_values",
    "new_values",
    "ip_address",
    "user_agent",
];

/// Persistence for audit entries
///
/// Writes are single atomic inserts. Reads report failures instead of
/// returning empty results.
pub trait AuditStore: Send + Sync {
    /// Append one entry, returning its assigned id
    fn append(&self, entry: &NewAuditEntry) -> AuditResult<i64>;

    /// Entries matching the query, newest first
    fn query(&self, query: &AuditQuery) -> AuditResult<Vec<AuditEntry>>;

    /// Number of entries matching the query's filters, ignoring pagination
    fn count(&self, query: &AuditQuery) -> AuditResult<u64>;

    /// Fetch one entry by id
    fn get(&self, id: i64) -> AuditResult<Option<AuditEntry>>;

    /// Aggregate statistics; `recent_since` is the lower timestamp bound of
    /// the recent-activity window
    fn statistics(&self, recent_since: &str) -> AuditResult<AuditStatistics>;

    /// Per-day, per-table counts for entries at or after `since`
    fn daily_summary(&self, since: &str) -> AuditResult<Vec<DailySummary>>;

    /// Delete every entry, returning how many were removed
    fn purge(&self) -> AuditResult<u64>;

    /// Write a consistent copy of the store to `path`
    fn backup_to(&self, path: &Path) -> AuditResult<()>;
}

/// SQLite implementation of [`AuditStore`]
pub struct SqliteAuditStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteAuditStore {
    /// Open (creating if needed) the audit database at `path`
    pub fn open(path: &Path) -> AuditResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AuditError::Io(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
        Self::initialize(conn, Some(path.to_path_buf()))
    }

    /// Open a private in-memory audit database (for tests and dry runs)
    pub fn open_in_memory() -> AuditResult<Self> {
        Self::initialize(Connection::open_in_memory()?, None)
    }

    fn initialize(conn: Connection, path: Option<PathBuf>) -> AuditResult<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        tracing::debug!(path = ?path, "audit database initialized");
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Path of the database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn conn(&self) -> AuditResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AuditError::Storage("Audit store lock poisoned".into()))
    }
}

impl AuditStore for SqliteAuditStore {
    fn append(&self, entry: &NewAuditEntry) -> AuditResult<i64> {
        entry.validate()?;

        let user_info = to_json_column(&entry.user_info)?;
        let changes = to_json_column(&entry.changes)?;
        let old_values = to_json_column(&entry.old_values)?;
        let new_values = to_json_column(&entry.new_values)?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO audit_log
                (timestamp, action, table_name, record_id, user_info, changes,
                 old_values, new_values, ip_address, user_agent, session_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                entry.timestamp,
                entry.action.as_str(),
                entry.table_name,
                entry.record_id,
                user_info,
                changes,
                old_values,
                new_values,
                entry.ip_address,
                entry.user_agent,
                entry.session_id,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn query(&self, query: &AuditQuery) -> AuditResult<Vec<AuditEntry>> {
        let (where_sql, mut values) = filter_clause(query)?;
        values.push(SqlValue::Integer(i64::from(query.limit)));
        values.push(SqlValue::Integer(i64::from(query.offset)));

        let sql = format!(
            "SELECT {} FROM audit_log{} ORDER BY timestamp DESC, id DESC LIMIT ? OFFSET ?",
            SELECT_COLUMNS, where_sql
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), entry_from_row)?;
        let entries = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn count(&self, query: &AuditQuery) -> AuditResult<u64> {
        let (where_sql, values) = filter_clause(query)?;
        let sql = format!("SELECT COUNT(*) FROM audit_log{}", where_sql);

        let conn = self.conn()?;
        let count: i64 = conn.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
        Ok(count as u64)
    }

    fn get(&self, id: i64) -> AuditResult<Option<AuditEntry>> {
        let sql = format!("SELECT {} FROM audit_log WHERE id = ?1", SELECT_COLUMNS);
        let conn = self.conn()?;
        let entry = conn.query_row(&sql, [id], entry_from_row).optional()?;
        Ok(entry)
    }

    fn statistics(&self, recent_since: &str) -> AuditResult<AuditStatistics> {
        let conn = self.conn()?;

        let overall = conn.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT table_name), COUNT(DISTINCT record_id),
                    MIN(timestamp), MAX(timestamp)
             FROM audit_log",
            [],
            |row| {
                Ok(OverallStats {
                    total_actions: row.get::<_, i64>(0)? as u64,
                    tables_tracked: row.get::<_, i64>(1)? as u64,
                    records_affected: row.get::<_, i64>(2)? as u64,
                    first_activity: row.get(3)?,
                    last_activity: row.get(4)?,
                })
            },
        )?;

        let mut stmt = conn.prepare(
            "SELECT action, COUNT(*) AS count
             FROM audit_log
             GROUP BY action
             ORDER BY count DESC, action ASC",
        )?;
        let actions = stmt
            .query_map([], |row| {
                Ok(ActionCount {
                    action: row.get(0)?,
                    count: row.get::<_, i64>(1)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT table_name, COUNT(*) AS count, MAX(timestamp)
             FROM audit_log
             GROUP BY table_name
             ORDER BY count DESC, table_name ASC",
        )?;
        let tables = stmt
            .query_map([], |row| {
                Ok(TableActivity {
                    table_name: row.get(0)?,
                    count: row.get::<_, i64>(1)? as u64,
                    last_activity: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let recent: i64 = conn.query_row(
            "SELECT COUNT(*) FROM audit_log WHERE timestamp >= ?1",
            [recent_since],
            |row| row.get(0),
        )?;

        Ok(AuditStatistics {
            overall,
            actions,
            tables,
            recent_activity: recent as u64,
        })
    }

    fn daily_summary(&self, since: &str) -> AuditResult<Vec<DailySummary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT substr(timestamp, 1, 10) AS day,
                    table_name,
                    COUNT(*) AS total_operations,
                    SUM(CASE WHEN action = 'INSERT' THEN 1 ELSE 0 END),
                    SUM(CASE WHEN action = 'UPDATE' THEN 1 ELSE 0 END),
                    SUM(CASE WHEN action = 'DELETE' THEN 1 ELSE 0 END)
             FROM audit_log
             WHERE timestamp >= ?1
             GROUP BY day, table_name
             ORDER BY day DESC, total_operations DESC, table_name ASC",
        )?;

        let rows = stmt
            .query_map([since], |row| {
                Ok(DailySummary {
                    date: row.get(0)?,
                    table_name: row.get(1)?,
                    total_operations: row.get::<_, i64>(2)? as u64,
                    inserts: row.get::<_, i64>(3)? as u64,
                    updates: row.get::<_, i64>(4)? as u64,
                    deletes: row.get::<_, i64>(5)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn purge(&self) -> AuditResult<u64> {
        let mut conn = self.conn()?;

        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM audit_log", [])?;
        tx.execute("DELETE FROM sqlite_sequence WHERE name = 'audit_log'", [])?;
        tx.commit()?;

        conn.execute_batch("VACUUM")?;
        tracing::warn!(removed, "audit log purged");
        Ok(removed as u64)
    }

    fn backup_to(&self, path: &Path) -> AuditResult<()> {
        let conn = self.conn()?;
        conn.backup(DatabaseName::Main, path, None)?;
        Ok(())
    }
}

/// Result of checking an existing audit database file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaReport {
    pub table_present: bool,
    pub missing_columns: Vec<String>,
    pub present_indexes: Vec<String>,
    pub missing_indexes: Vec<String>,
    pub entry_count: u64,
}

impl SchemaReport {
    /// The table exists with every required column
    pub fn is_valid(&self) -> bool {
        self.table_present && self.missing_columns.is_empty()
    }
}

/// Inspect an audit database without creating or modifying it
pub fn verify_schema(path: &Path) -> AuditResult<SchemaReport> {
    if !path.exists() {
        return Err(AuditError::NotFound {
            entity_type: "Audit database",
            identifier: path.display().to_string(),
        });
    }

    // Read-write without CREATE: WAL databases may need their -shm file rebuilt
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)?;

    let table_present = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'audit_log'",
            [],
            |row| row.get::<_, String>(0),
        )
        .optional()?
        .is_some();

    if !table_present {
        return Ok(SchemaReport {
            table_present,
            missing_columns: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            present_indexes: Vec::new(),
            missing_indexes: EXPECTED_INDEXES.iter().map(|i| i.to_string()).collect(),
            entry_count: 0,
        });
    }

    let mut stmt = conn.prepare("PRAGMA table_info(audit_log)")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = 'audit_log'")?;
    let indexes = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let entry_count: i64 = conn.query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))?;

    let (present_indexes, missing_indexes): (Vec<String>, Vec<String>) = EXPECTED_INDEXES
        .iter()
        .map(|i| i.to_string())
        .partition(|i| indexes.contains(i));

    Ok(SchemaReport {
        table_present,
        missing_columns: REQUIRED_COLUMNS
            .iter()
            .filter(|c| !columns.iter().any(|col| col.as_str() == **c))
            .map(|c| c.to_string())
            .collect(),
        present_indexes,
        missing_indexes,
        entry_count: entry_count as u64,
    })
}

/// Build the WHERE clause and its positional parameters
fn filter_clause(query: &AuditQuery) -> AuditResult<(String, Vec<SqlValue>)> {
    let mut conditions: Vec<String> = Vec::new();
    let mut values: Vec<SqlValue> = Vec::new();

    if let Some(table) = query.table_name.as_deref().filter(|t| !t.is_empty()) {
        conditions.push("table_name = ?".into());
        values.push(SqlValue::Text(table.to_string()));
    }

    if let Some(action) = &query.action {
        conditions.push("action = ?".into());
        values.push(SqlValue::Text(action.as_str().to_string()));
    }

    if let Some(record_id) = query.record_id.as_deref().filter(|r| !r.is_empty()) {
        conditions.push("record_id = ?".into());
        values.push(SqlValue::Text(record_id.to_string()));
    }

    let (from, to) = query.timestamp_bounds()?;
    if let Some(from) = from {
        conditions.push("timestamp >= ?".into());
        values.push(SqlValue::Text(from));
    }
    if let Some(to) = to {
        conditions.push("timestamp <= ?".into());
        values.push(SqlValue::Text(to));
    }

    if let Some(text) = query.search_text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = format!("%{}%", escape_like(&text.to_lowercase()));
        let clauses: Vec<String> = SEARCH_COLUMNS
            .iter()
            .map(|col| format!("LOWER(COALESCE({}, '')) LIKE ? ESCAPE '\\'", col))
            .collect();
        conditions.push(format!("({})", clauses.join(" OR ")));
        for _ in SEARCH_COLUMNS {
            values.push(SqlValue::Text(pattern.clone()));
        }
    }

    let where_sql = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    Ok((where_sql, values))
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn to_json_column<T: Serialize>(value: &Option<T>) -> AuditResult<Option<String>> {
    value
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| AuditError::Json(format!("Failed to serialize audit column: {}", e)))
}

fn from_json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|text| {
        serde_json::from_str(&text).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    })
    .transpose()
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<AuditEntry> {
    let action: String = row.get(2)?;
    let action = action.parse::<AuditAction>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(AuditEntry {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        action,
        table_name: row.get(3)?,
        record_id: row.get(4)?,
        user_info: from_json_column(row, 5)?,
        changes: from_json_column(row, 6)?,
        old_values: from_json_column(row, 7)?,
        new_values: from_json_column(row, 8)?,
        ip_address: row.get(9)?,
        user_agent: row.get(10)?,
        session_id: row.get(11)?,
        created_at: row.get(12)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::diff::calculate_changes;
    use crate::audit::snapshot::Snapshot;
    use serde_json::json;
    use tempfile::TempDir;

    fn entry_at(timestamp: &str, action: AuditAction, table: &str, record: &str) -> NewAuditEntry {
        NewAuditEntry::new(action, table, record).with_timestamp(timestamp)
    }

    fn seeded_store() -> SqliteAuditStore {
        let store = SqliteAuditStore::open_in_memory().unwrap();
        let rows = [
            ("2025-01-13 09:00:00.000000", AuditAction::Insert, "Invoices", "INV-1"),
            ("2025-01-13 10:00:00.000000", AuditAction::Update, "Invoices", "INV-1"),
            ("2025-01-14 08:00:00.000000", AuditAction::Insert, "Withdraw", "W001"),
            ("2025-01-14 09:00:00.000000", AuditAction::Update, "Invoices", "INV-2"),
            ("2025-01-14 10:00:00.000000", AuditAction::Delete, "DebtRegister", "Car"),
            ("2025-01-15 11:00:00.000000", AuditAction::Update, "Withdraw", "W001"),
        ];
        for (ts, action, table, record) in rows {
            store.append(&entry_at(ts, action, table, record)).unwrap();
        }
        store
    }

    #[test]
    fn test_append_assigns_increasing_ids() {
        let store = SqliteAuditStore::open_in_memory().unwrap();
        let mut last = 0;
        for i in 0..5 {
            let id = store
                .append(&NewAuditEntry::new(AuditAction::Insert, "Invoices", i))
                .unwrap();
            assert!(id > last);
            last = id;
        }
        assert_eq!(store.count(&AuditQuery::new()).unwrap(), 5);
    }

    #[test]
    fn test_round_trip_of_json_columns() {
        let store = SqliteAuditStore::open_in_memory().unwrap();
        let old = Snapshot::from_value(json!({"Excl": 100.0, "paid": false, "notes": null})).unwrap();
        let new = Snapshot::from_value(json!({"Excl": 150.0, "paid": true, "notes": null})).unwrap();
        let changes = calculate_changes(&old, &new);

        let id = store
            .append(
                &NewAuditEntry::new(AuditAction::Update, "Invoices", "INV-1")
                    .with_user_info(Some(json!({"operation": "edit", "count": 2})))
                    .with_snapshots(Some(old.clone()), Some(new.clone()))
                    .with_changes(Some(changes.clone())),
            )
            .unwrap();

        let entry = store.get(id).unwrap().unwrap();
        assert_eq!(entry.action, AuditAction::Update);
        assert_eq!(entry.old_values, Some(old));
        assert_eq!(entry.new_values, Some(new));
        assert_eq!(entry.changes, Some(changes));
        assert_eq!(entry.user_info, Some(json!({"operation": "edit", "count": 2})));
        assert!(entry.created_at.is_some());
    }

    #[test]
    fn test_get_missing_entry() {
        let store = SqliteAuditStore::open_in_memory().unwrap();
        assert!(store.get(99).unwrap().is_none());
    }

    #[test]
    fn test_append_rejects_blank_table() {
        let store = SqliteAuditStore::open_in_memory().unwrap();
        let err = store
            .append(&NewAuditEntry::new(AuditAction::Insert, "", "1"))
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(store.count(&AuditQuery::new()).unwrap(), 0);
    }

    #[test]
    fn test_query_orders_newest_first() {
        let store = seeded_store();
        let entries = store.query(&AuditQuery::new()).unwrap();

        assert_eq!(entries.len(), 6);
        assert_eq!(entries[0].timestamp, "2025-01-15 11:00:00.000000");
        assert!(entries
            .windows(2)
            .all(|w| w[0].timestamp >= w[1].timestamp));
    }

    #[test]
    fn test_ties_broken_by_id_descending() {
        let store = SqliteAuditStore::open_in_memory().unwrap();
        let ts = "2025-01-14 10:00:00.000000";
        let first = store
            .append(&entry_at(ts, AuditAction::Insert, "Invoices", "A"))
            .unwrap();
        let second = store
            .append(&entry_at(ts, AuditAction::Insert, "Invoices", "B"))
            .unwrap();

        let entries = store.query(&AuditQuery::new()).unwrap();
        assert_eq!(entries[0].id, second);
        assert_eq!(entries[1].id, first);
    }

    #[test]
    fn test_filter_conjunction() {
        let store = seeded_store();
        let q = AuditQuery::new().table("Invoices").action(AuditAction::Update);
        let entries = store.query(&q).unwrap();

        assert_eq!(entries.len(), 2);
        assert!(entries
            .iter()
            .all(|e| e.table_name == "Invoices" && e.action == AuditAction::Update));
        assert_eq!(store.count(&q).unwrap(), 2);
    }

    #[test]
    fn test_record_filter() {
        let store = seeded_store();
        let entries = store.query(&AuditQuery::new().record("W001")).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_date_range_filter() {
        let store = seeded_store();
        let q = AuditQuery::new().date_from("2025-01-14").date_to("2025-01-14");
        let entries = store.query(&q).unwrap();

        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.timestamp.starts_with("2025-01-14")));
    }

    #[test]
    fn test_malformed_date_filter_is_error() {
        let store = seeded_store();
        let err = store
            .query(&AuditQuery::new().date_to("yesterday"))
            .unwrap_err();
        assert!(matches!(err, AuditError::Query(_)));
    }

    #[test]
    fn test_no_match_is_empty() {
        let store = seeded_store();
        let entries = store.query(&AuditQuery::new().table("Quarterly")).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_pagination_slices_are_contiguous() {
        let store = SqliteAuditStore::open_in_memory().unwrap();
        for i in 0..25 {
            let ts = format!("2025-01-14 10:00:{:02}.000000", i);
            store
                .append(&entry_at(&ts, AuditAction::Insert, "Invoices", &i.to_string()))
                .unwrap();
        }

        let all = store.query(&AuditQuery::new().limit(1000)).unwrap();
        let first = store.query(&AuditQuery::new().limit(10).offset(0)).unwrap();
        let second = store.query(&AuditQuery::new().limit(10).offset(10)).unwrap();

        let ids = |v: &[AuditEntry]| v.iter().map(|e| e.id).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&all[0..10]));
        assert_eq!(ids(&second), ids(&all[10..20]));
    }

    #[test]
    fn test_search_text_matches_json_columns() {
        let store = SqliteAuditStore::open_in_memory().unwrap();
        store
            .append(
                &NewAuditEntry::new(AuditAction::Insert, "Withdraw", "W001").with_snapshots(
                    None,
                    Some(Snapshot::from_value(json!({"Description": "Fuel 100% refund"})).unwrap()),
                ),
            )
            .unwrap();
        store
            .append(&NewAuditEntry::new(AuditAction::Insert, "Invoices", "INV-9"))
            .unwrap();

        let hits = store.query(&AuditQuery::new().search("FUEL")).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record_id, "W001");

        let literal = store.query(&AuditQuery::new().search("100%")).unwrap();
        assert_eq!(literal.len(), 1);

        let by_record = store.query(&AuditQuery::new().search("inv-9")).unwrap();
        assert_eq!(by_record.len(), 1);
    }

    #[test]
    fn test_statistics() {
        let store = seeded_store();
        let stats = store.statistics("2025-01-14 10:00:00.000000").unwrap();

        assert_eq!(stats.overall.total_actions, 6);
        assert_eq!(stats.overall.tables_tracked, 3);
        assert_eq!(stats.overall.records_affected, 4);
        assert_eq!(
            stats.overall.first_activity.as_deref(),
            Some("2025-01-13 09:00:00.000000")
        );
        assert_eq!(
            stats.overall.last_activity.as_deref(),
            Some("2025-01-15 11:00:00.000000")
        );

        assert_eq!(stats.actions[0].action, "UPDATE");
        assert_eq!(stats.action_count("UPDATE"), 3);
        assert_eq!(stats.action_count("INSERT"), 2);
        assert_eq!(stats.action_count("DELETE"), 1);

        assert_eq!(stats.tables[0].table_name, "Invoices");
        assert_eq!(stats.tables[0].count, 3);
        assert_eq!(
            stats.table("Withdraw").and_then(|t| t.last_activity.as_deref()),
            Some("2025-01-15 11:00:00.000000")
        );

        assert_eq!(stats.recent_activity, 2);
    }

    #[test]
    fn test_statistics_on_empty_store() {
        let store = SqliteAuditStore::open_in_memory().unwrap();
        let stats = store.statistics("2025-01-14 00:00:00.000000").unwrap();

        assert_eq!(stats.overall.total_actions, 0);
        assert!(stats.overall.last_activity.is_none());
        assert!(stats.actions.is_empty());
        assert!(stats.tables.is_empty());
        assert_eq!(stats.recent_activity, 0);
    }

    #[test]
    fn test_daily_summary() {
        let store = seeded_store();
        let summary = store.daily_summary("2025-01-14 00:00:00.000000").unwrap();

        assert_eq!(summary[0].date, "2025-01-15");
        let invoices = summary
            .iter()
            .find(|d| d.date == "2025-01-14" && d.table_name == "Invoices")
            .unwrap();
        assert_eq!(invoices.total_operations, 1);
        assert_eq!(invoices.updates, 1);
        assert!(summary.iter().all(|d| d.date.as_str() >= "2025-01-14"));
    }

    #[test]
    fn test_purge_removes_everything_and_restarts_ids() {
        let store = seeded_store();
        assert_eq!(store.purge().unwrap(), 6);
        assert_eq!(store.count(&AuditQuery::new()).unwrap(), 0);

        let id = store
            .append(&NewAuditEntry::new(AuditAction::Insert, "Invoices", "INV-1"))
            .unwrap();
        assert_eq!(id, 1);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("audit_tracker.db");

        {
            let store = SqliteAuditStore::open(&path).unwrap();
            store
                .append(&NewAuditEntry::new(AuditAction::Insert, "Invoices", "INV-1"))
                .unwrap();
        }

        let reopened = SqliteAuditStore::open(&path).unwrap();
        assert_eq!(reopened.count(&AuditQuery::new()).unwrap(), 1);
        assert_eq!(reopened.path(), Some(path.as_path()));
    }

    #[test]
    fn test_backup_and_verify() {
        let temp = TempDir::new().unwrap();
        let store = seeded_store();
        let backup = temp.path().join("backup.db");

        store.backup_to(&backup).unwrap();

        let report = verify_schema(&backup).unwrap();
        assert!(report.is_valid());
        assert_eq!(report.entry_count, 6);
        assert!(report.missing_indexes.is_empty());
        assert_eq!(report.present_indexes.len(), EXPECTED_INDEXES.len());
    }

    #[test]
    fn test_verify_missing_table() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("other.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE Invoices (id INTEGER)")
            .unwrap();

        let report = verify_schema(&path).unwrap();
        assert!(!report.table_present);
        assert!(!report.is_valid());
    }

    #[test]
    fn test_verify_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = verify_schema(&temp.path().join("nope.db")).unwrap_err();
        assert!(err.is_not_found());
    }
}
