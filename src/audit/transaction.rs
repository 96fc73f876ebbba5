//! Observational wrappers around business operations
//!
//! These record what happened around a unit of work. They never change the
//! outcome: the work's own result is returned untouched, and a failed audit
//! write is swallowed like any other.

use std::fmt::Display;
use std::time::Instant;

use chrono::Local;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::entry::{now_timestamp, AuditAction, SYSTEM_TABLE};
use super::logger::ChangeAuditLog;

pub const TRANSACTION_START: &str = "TRANSACTION_START";
pub const TRANSACTION_COMPLETE: &str = "TRANSACTION_COMPLETE";
pub const TRANSACTION_ERROR: &str = "TRANSACTION_ERROR";

/// New transaction id, `TXN_<yyyymmdd_HHMMSS_micros>_<8 hex>`
pub fn transaction_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "TXN_{}_{}",
        Local::now().format("%Y%m%d_%H%M%S_%6f"),
        &suffix[..8]
    )
}

/// Run `work` bracketed by transaction start and completion entries
///
/// `work` receives the transaction id. On error a `TRANSACTION_ERROR` entry
/// carries the error text and the error is returned unchanged.
pub fn audit_transaction<T, E, F>(
    log: &ChangeAuditLog,
    description: &str,
    user_info: Option<Value>,
    work: F,
) -> Result<T, E>
where
    F: FnOnce(&str) -> Result<T, E>,
    E: Display,
{
    let txn_id = transaction_id();
    let started = Instant::now();

    log.log_system_event(
        TRANSACTION_START,
        &txn_id,
        Some(json!({
            "description": description,
            "user_info": user_info,
            "start_time": now_timestamp(),
        })),
    );
    tracing::debug!(txn_id = %txn_id, description, "transaction started");

    let result = work(&txn_id);
    let duration_seconds = started.elapsed().as_secs_f64();

    match &result {
        Ok(_) => {
            log.log_system_event(
                TRANSACTION_COMPLETE,
                &txn_id,
                Some(json!({
                    "description": description,
                    "duration_seconds": duration_seconds,
                    "end_time": now_timestamp(),
                })),
            );
        }
        Err(e) => {
            tracing::warn!(txn_id = %txn_id, error = %e, "transaction failed");
            log.log_system_event(
                TRANSACTION_ERROR,
                &txn_id,
                Some(json!({
                    "description": description,
                    "error": e.to_string(),
                    "duration_seconds": duration_seconds,
                    "end_time": now_timestamp(),
                })),
            );
        }
    }

    result
}

/// Run `work` and record `action` on success or `<ACTION>_ERROR` on failure
pub fn audited<T, E, F>(
    log: &ChangeAuditLog,
    action: AuditAction,
    table_name: &str,
    record_id: impl ToString,
    user_info: Option<Value>,
    work: F,
) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: Display,
{
    let record_id = record_id.to_string();
    let result = work();

    match &result {
        Ok(_) => {
            log.log_action(action, table_name, &record_id, None, None, user_info, None);
        }
        Err(e) => {
            let info = with_error(user_info, &e.to_string());
            log.log_action(
                AuditAction::failed(&action),
                table_name,
                &record_id,
                None,
                None,
                Some(info),
                None,
            );
        }
    }

    result
}

/// Attach an `error` field to caller-supplied user info
fn with_error(user_info: Option<Value>, error: &str) -> Value {
    let mut map = match user_info {
        Some(Value::Object(map)) => map,
        Some(other) => {
            let mut map = Map::new();
            map.insert("user_info".into(), other);
            map
        }
        None => Map::new(),
    };
    map.insert("error".into(), Value::String(error.to_string()));
    Value::Object(map)
}
