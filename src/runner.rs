use anyhow::{Context, Result};
use chrono::Utc;
use std::time::Duration;
use tracing::info;

use crate::aws::InstanceInventory;
use crate::collector::{CoverageCollector, MetricsCollector};
use crate::config::Config;
use crate::discovery::resolve_prometheus_url;
use crate::mattermost::{build_coverage_message, build_inspection_message, notify};
use crate::metrics::{evaluate_health, PrometheusClient};
use crate::report::files::write_reports;
use crate::report::{CoverageReport, InspectionReport};

/// Collect reservation coverage, save report files and notify
pub async fn run_ri_coverage<I: InstanceInventory>(
    cfg: &Config,
    inventory: &I,
    send_notification: bool,
) -> Result<CoverageReport> {
    info!("Starting EC2 Reserved Instance coverage analysis");
    let now = Utc::now();
    let report = CoverageCollector::new(inventory, &cfg.ri_analysis)
        .collect(now)
        .await?;

    let markdown = report.to_markdown();
    let files = write_reports(&cfg.reporting, "ri_coverage", now, &markdown, &report)?;
    info!("Analysis complete, {} report file(s) written", files.len());

    let summary = report.issue_summary();
    info!(
        "Coverage summary: {} uncovered instances, {} reservations expiring soon",
        summary.uncovered_count, summary.expiring_soon_count
    );

    if send_notification {
        let mm = &cfg.notifications.mattermost;
        notify(mm, summary.has_issues(), &build_coverage_message(&report, mm)).await;
    }
    Ok(report)
}

/// Query Prometheus, evaluate thresholds, save report files and notify
pub async fn run_inspection(cfg: &Config, send_notification: bool) -> Result<InspectionReport> {
    info!("Starting Prometheus system inspection");
    let inspection = &cfg.prometheus_inspection;
    let url = resolve_prometheus_url(inspection)
        .await
        .context("Could not determine Prometheus URL")?;
    let client = PrometheusClient::new(&url, Duration::from_secs(inspection.timeout_secs))?;

    info!("Fetching data from {}", url);
    let now = Utc::now();
    let samples = MetricsCollector::new(&client).collect(&inspection.queries).await;
    let assessment = evaluate_health(&samples, &inspection.thresholds);
    let report = InspectionReport {
        timestamp: now,
        prometheus_url: url,
        samples,
        assessment,
    };

    let markdown = report.to_markdown();
    let files = write_reports(&cfg.reporting, "prometheus_inspection", now, &markdown, &report)?;
    info!(
        "Inspection complete: status {}, {} metrics, {} report file(s) written",
        report.assessment.status,
        report.metrics_count(),
        files.len()
    );

    if send_notification {
        let mm = &cfg.notifications.mattermost;
        notify(mm, report.has_issues(), &build_inspection_message(&report, mm)).await;
    }
    Ok(report)
}
