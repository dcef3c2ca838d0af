// Public modules
pub mod types;
pub mod error;
pub mod config;
pub mod parsing;
pub mod mattermost;
pub mod aws;
pub mod discovery;
pub mod metrics;
pub mod collector;
pub mod report;
pub mod runner;

// Re-export commonly used items
pub use types::*;
pub use error::ReporterError;
pub use config::{load_config, load_config_with_env, Config, EnvironmentProvider, SystemEnvironment, MockEnvironment};
pub use parsing::{parse_sample_value, coverage_percentage, exceeds, falls_below, parse_aws_date};
pub use mattermost::{build_coverage_message, build_inspection_message, inspection_summary, notify, send_to_mattermost};
pub use aws::{AwsCliInventory, InstanceInventory, region_display_name};
pub use metrics::*;
pub use collector::{CoverageCollector, MetricsCollector};
pub use report::table::{to_csv, TabularReport};
pub use report::{CoverageReport, InspectionReport, ReportSummary};
pub use runner::{run_inspection, run_ri_coverage};
