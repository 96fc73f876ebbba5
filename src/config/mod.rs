//! Configuration for the audit tooling
//!
//! - Path resolution for the audit database, settings and backups
//! - Settings persistence (page sizes, limits, business database)

pub mod paths;
pub mod settings;

pub use paths::AuditPaths;
pub use settings::Settings;
