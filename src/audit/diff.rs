//! Field-level diff between two snapshots
//!
//! A key missing from one snapshot is compared as an explicit `null`, so
//! `{"a": null}` and `{}` are equal and `{"a": 1}` against `{}` reports
//! `a: 1 -> null`. The rule is applied everywhere a diff is computed.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::snapshot::Snapshot;
use crate::error::AuditResult;

/// Old and new value of one changed field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: Value,
    pub new: Value,
}

impl FieldChange {
    pub fn new(old: Value, new: Value) -> Self {
        Self { old, new }
    }
}

/// Changed fields keyed by field name
pub type Changes = BTreeMap<String, FieldChange>;

const NULL: Value = Value::Null;

/// Compute the fields whose value differs between two snapshots
///
/// Identical snapshots produce an empty map.
pub fn calculate_changes(old: &Snapshot, new: &Snapshot) -> Changes {
    let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();

    keys.into_iter()
        .filter_map(|key| {
            let old_val = old.get(key).unwrap_or(&NULL);
            let new_val = new.get(key).unwrap_or(&NULL);
            (old_val != new_val)
                .then(|| (key.clone(), FieldChange::new(old_val.clone(), new_val.clone())))
        })
        .collect()
}

/// Diff two raw JSON values, failing if either is not an object
pub fn calculate_value_changes(old: &Value, new: &Value) -> AuditResult<Changes> {
    let old = Snapshot::from_value(old.clone())?;
    let new = Snapshot::from_value(new.clone())?;
    Ok(calculate_changes(&old, &new))
}

/// Generate a human-readable summary of a change set
///
/// Returns `None` when nothing changed.
pub fn summarize_changes(changes: &Changes) -> Option<String> {
    if changes.is_empty() {
        return None;
    }

    let parts: Vec<String> = changes
        .iter()
        .map(|(key, change)| {
            format!(
                "{}: {} -> {}",
                key,
                format_value(&change.old),
                format_value(&change.new)
            )
        })
        .collect();

    Some(parts.join(", "))
}

/// Format a JSON value for human-readable display
pub(crate) fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => {
            // Truncate long strings
            if s.chars().count() > 50 {
                let head: String = s.chars().take(47).collect();
                format!("\"{}...\"", head)
            } else {
                format!("\"{}\"", s)
            }
        }
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => format!("{{{} fields}}", obj.len()),
    }
}
