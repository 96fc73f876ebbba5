//! Statistics report formatting

use tabled::settings::Style;
use tabled::{Table, Tabled};

use super::separator;
use crate::audit::{AuditStatistics, DailySummary};

#[derive(Tabled)]
struct DailyRow<'a> {
    #[tabled(rename = "Date")]
    date: &'a str,
    #[tabled(rename = "Table")]
    table: &'a str,
    #[tabled(rename = "Total")]
    total: u64,
    #[tabled(rename = "Inserts")]
    inserts: u64,
    #[tabled(rename = "Updates")]
    updates: u64,
    #[tabled(rename = "Deletes")]
    deletes: u64,
}

/// Format the statistics report
pub fn format_statistics(stats: &AuditStatistics, window_hours: i64) -> String {
    let mut output = String::new();
    let overall = &stats.overall;

    output.push_str("Audit Log Statistics\n");
    output.push_str(&separator(40));
    output.push('\n');
    output.push_str(&format!("Total actions:      {}\n", overall.total_actions));
    output.push_str(&format!("Tables tracked:     {}\n", overall.tables_tracked));
    output.push_str(&format!("Records affected:   {}\n", overall.records_affected));
    output.push_str(&format!(
        "First activity:     {}\n",
        overall.first_activity.as_deref().unwrap_or("-")
    ));
    output.push_str(&format!(
        "Last activity:      {}\n",
        overall.last_activity.as_deref().unwrap_or("-")
    ));
    output.push_str(&format!(
        "Last {}h:          {}\n",
        window_hours, stats.recent_activity
    ));

    if !stats.actions.is_empty() {
        output.push_str("\nBy action:\n");
        for action in &stats.actions {
            output.push_str(&format!("  {:24} {:>8}\n", action.action, action.count));
        }
    }

    if !stats.tables.is_empty() {
        output.push_str("\nBy table:\n");
        for table in &stats.tables {
            output.push_str(&format!(
                "  {:24} {:>8}  last {}\n",
                table.table_name,
                table.count,
                table.last_activity.as_deref().unwrap_or("-")
            ));
        }
    }

    output
}

/// Format the per-day summary as a table
pub fn format_daily_summary(summary: &[DailySummary]) -> String {
    if summary.is_empty() {
        return "No activity in this period.\n".to_string();
    }

    let rows: Vec<DailyRow<'_>> = summary
        .iter()
        .map(|day| DailyRow {
            date: &day.date,
            table: &day.table_name,
            total: day.total_operations,
            inserts: day.inserts,
            updates: day.updates,
            deletes: day.deletes,
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::modern());
    format!("{}\n", table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{ActionCount, OverallStats, TableActivity};

    #[test]
    fn test_statistics_report() {
        let stats = AuditStatistics {
            overall: OverallStats {
                total_actions: 3,
                tables_tracked: 1,
                records_affected: 2,
                first_activity: Some("2025-01-14 09:00:00.000000".into()),
                last_activity: Some("2025-01-14 10:00:00.000000".into()),
            },
            actions: vec![ActionCount {
                action: "INSERT".into(),
                count: 2,
            }],
            tables: vec![TableActivity {
                table_name: "Invoices".into(),
                count: 3,
                last_activity: Some("2025-01-14 10:00:00.000000".into()),
            }],
            recent_activity: 1,
        };

        let report = format_statistics(&stats, 24);
        assert!(report.contains("Total actions:      3"));
        assert!(report.contains("Last 24h:"));
        assert!(report.contains("By action:"));
        assert!(report.contains("Invoices"));
    }

    #[test]
    fn test_empty_statistics() {
        let report = format_statistics(&AuditStatistics::default(), 24);
        assert!(report.contains("First activity:     -"));
        assert!(!report.contains("By table:"));
    }

    #[test]
    fn test_daily_summary_table() {
        let summary = vec![DailySummary {
            date: "2025-01-14".into(),
            table_name: "Withdraw".into(),
            total_operations: 4,
            inserts: 2,
            updates: 1,
            deletes: 1,
        }];

        let table = format_daily_summary(&summary);
        assert!(table.contains("2025-01-14"));
        assert!(table.contains("Withdraw"));
        assert_eq!(format_daily_summary(&[]), "No activity in this period.\n");
    }
}
