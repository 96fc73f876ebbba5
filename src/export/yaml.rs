//! YAML Export functionality

use std::io::Write;

use crate::error::{AuditError, AuditResult};
use crate::export::json::AuditExport;

/// Write an export as YAML with a short header comment
pub fn export_yaml<W: Write>(export: &AuditExport, writer: &mut W) -> AuditResult<()> {
    writeln!(writer, "# Ozark audit log export")?;
    writeln!(writer, "# Generated: {}", export.exported_at)?;
    writeln!(
        writer,
        "# Entries: {} of {} matching",
        export.entries.len(),
        export.total_matching
    )?;
    writeln!(writer)?;

    serde_yaml::to_writer(writer, export).map_err(|e| AuditError::Export(e.to_string()))
}
