// Public modules
pub mod types;
pub mod error;
pub mod config;
pub mod parsing;
pub mod scanner;
pub mod runner;
pub mod collector;
pub mod buffer;
pub mod influx;
pub mod report;

// Re-export commonly used items
pub use types::*;
pub use error::MeteringError;
pub use config::{load_config, load_config_with_env, EnvironmentProvider, SystemEnvironment, MockEnvironment};
pub use parsing::{parse_quantity, rules_for, Scale, UnitRule, UNIT_RULES};
pub use scanner::{has_sentinel, scan, scan_report, tokenize, Column, ReportLayout, NO_RESOURCES_PHRASE};
pub use runner::{CommandRunner, OcCommandRunner, ReportKind};
pub use collector::{aggregate_reports, aggregate_reports_with_sentinel, NamespaceReportAggregator};
pub use buffer::{MetricsWriter, SeriesPointBuffer};
pub use influx::InfluxClient;
pub use report::{RunReport, RunSummary};
