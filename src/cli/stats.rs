//! CLI command for audit statistics

use crate::audit::ChangeAuditLog;
use crate::config::settings::Settings;
use crate::display::{format_daily_summary, format_statistics};
use crate::error::AuditResult;

/// Handle `stats [--daily N] [--json]`
pub fn handle_stats_command(
    log: &ChangeAuditLog,
    settings: &Settings,
    daily: Option<u32>,
    json: bool,
) -> AuditResult<()> {
    let stats = log.get_statistics()?;
    let summary = match daily {
        Some(days) => Some(log.daily_summary(days)?),
        None => None,
    };

    if json {
        let doc = serde_json::json!({
            "statistics": stats,
            "daily_summary": summary,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    print!("{}", format_statistics(&stats, settings.recent_window_hours));

    if let (Some(days), Some(summary)) = (daily, summary) {
        println!();
        println!("Daily summary (last {} day(s)):", days.max(1));
        print!("{}", format_daily_summary(&summary));
    }

    Ok(())
}
