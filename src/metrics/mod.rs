// Metric evaluation modules
pub mod base;
pub mod coverage;
pub mod health;

// Re-export commonly used items
pub use base::{default_queries, samples_from_response, PrometheusClient};
pub use coverage::{calculate_coverage, expiring_within};
pub use health::{evaluate_health, NO_DATA_MESSAGE};
