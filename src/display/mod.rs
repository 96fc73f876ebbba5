//! Display formatting for terminal output
//!
//! Entry tables, entry details and the statistics report.

pub mod entry;
pub mod stats;

pub use entry::{format_entry_details, format_entry_table, format_page_footer, format_schema_report};
pub use stats::{format_daily_summary, format_statistics};

/// Truncate a string to a maximum number of characters with ellipsis
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        ".".repeat(max_len)
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}

/// Format a separator line
pub fn separator(width: usize) -> String {
    "─".repeat(width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Hello World", 5), "He...");
        assert_eq!(truncate("Hi", 5), "Hi");
        assert_eq!(truncate("Test", 4), "Test");
        assert_eq!(truncate("Überweisung", 6), "Übe...");
        assert_eq!(truncate("abcdef", 2), "..");
    }
}
