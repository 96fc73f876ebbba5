//! Entity snapshots and the record store that produces them
//!
//! A snapshot is the full set of field values of one business record at one
//! point in time. Both the diff algorithm and the record store speak this one
//! type, so there is no runtime branching on "map or row".

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Mutex;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AuditError, AuditResult};

/// Ordered key/value view of one record
///
/// Iteration is sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(BTreeMap<String, Value>);

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from a JSON object
    ///
    /// Anything other than an object is rejected: silently treating it as an
    /// empty record would hide real changes from the diff.
    pub fn from_value(value: Value) -> AuditResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map.into_iter().collect())),
            other => Err(AuditError::Snapshot(format!(
                "expected a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Build a snapshot from any serializable entity
    pub fn from_serialize<T: Serialize>(entity: &T) -> AuditResult<Self> {
        Self::from_value(serde_json::to_value(entity)?)
    }

    /// Build a snapshot from a SQLite result row, one field per column
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let stmt = row.as_ref();
        let mut fields = BTreeMap::new();
        for (idx, name) in stmt.column_names().into_iter().enumerate() {
            fields.insert(name.to_string(), value_from_sql(row.get_ref(idx)?));
        }
        Ok(Self(fields))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl TryFrom<Value> for Snapshot {
    type Error = AuditError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn value_from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<{} bytes>", bytes.len())),
    }
}

/// Supplies current record snapshots by table and primary key
///
/// CRUD handlers call this before a mutation to capture `old_values` and
/// after it to capture `new_values`.
pub trait RecordStore {
    fn fetch_snapshot(&self, table: &str, key: &str) -> AuditResult<Option<Snapshot>>;
}

/// Record store over the SQLite business database
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
    /// Primary key column per table; tables not listed use `rowid`
    primary_keys: HashMap<String, String>,
}

impl SqliteRecordStore {
    /// Open the business database at `path`
    pub fn open(path: &Path, primary_keys: HashMap<String, String>) -> AuditResult<Self> {
        let conn = Connection::open(path)?;
        Ok(Self::from_connection(conn, primary_keys))
    }

    /// Wrap an existing connection (used for in-memory databases in tests)
    pub fn from_connection(conn: Connection, primary_keys: HashMap<String, String>) -> Self {
        Self {
            conn: Mutex::new(conn),
            primary_keys,
        }
    }

    fn primary_key(&self, table: &str) -> &str {
        self.primary_keys
            .get(table)
            .map(String::as_str)
            .unwrap_or("rowid")
    }
}

impl RecordStore for SqliteRecordStore {
    fn fetch_snapshot(&self, table: &str, key: &str) -> AuditResult<Option<Snapshot>> {
        let pk = self.primary_key(table);
        validate_identifier(table)?;
        validate_identifier(pk)?;

        let conn = self
            .conn
            .lock()
            .map_err(|_| AuditError::Storage("Record store lock poisoned".into()))?;

        let sql = format!("SELECT * FROM {} WHERE {} = ?1", table, pk);
        let snapshot = conn
            .query_row(&sql, [key], |row| Snapshot::from_row(row))
            .optional()?;
        Ok(snapshot)
    }
}

/// Table and column names are interpolated into SQL, so only plain
/// identifiers are accepted.
fn validate_identifier(name: &str) -> AuditResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(AuditError::Validation(format!(
            "Invalid SQL identifier: {:?}",
            name
        )))
    }
}
