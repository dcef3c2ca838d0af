use anyhow::{anyhow, Context, Result};
use serde::Serialize;

use super::{CoverageReport, InspectionReport};
use crate::types::HealthStatus;

pub const TOTAL_ROW_LABEL: &str = "TOTAL (All Regions)";

/// Flat row view of a report, used for spreadsheet exports
pub trait TabularReport {
    type Row: Serialize;

    fn rows(&self) -> Vec<Self::Row>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageRow {
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Running Instances")]
    pub running_instances: u32,
    #[serde(rename = "Reserved Instances")]
    pub reserved_instances: u32,
    #[serde(rename = "Uncovered Instances")]
    pub uncovered_instances: u32,
    #[serde(rename = "Coverage Percentage")]
    pub coverage_percentage: f64,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRow {
    #[serde(rename = "Instance")]
    pub instance: String,
    #[serde(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "Mountpoint")]
    pub mountpoint: Option<String>,
    #[serde(rename = "Value")]
    pub value: f64,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl TabularReport for CoverageReport {
    type Row = CoverageRow;

    /// One row per region followed by the all-regions total
    fn rows(&self) -> Vec<CoverageRow> {
        let timestamp = self.timestamp.to_rfc3339();
        let mut rows: Vec<CoverageRow> = self
            .regions
            .iter()
            .map(|r| CoverageRow {
                region: r.region.clone(),
                running_instances: r.stats.total_instances,
                reserved_instances: r.stats.total_reserved_instances,
                uncovered_instances: r.stats.uncovered_instances,
                coverage_percentage: round2(r.stats.coverage_percentage),
                timestamp: timestamp.clone(),
            })
            .collect();
        rows.push(CoverageRow {
            region: TOTAL_ROW_LABEL.to_string(),
            running_instances: self.summary.total_instances,
            reserved_instances: self.summary.total_reserved_instances,
            uncovered_instances: self.summary.total_uncovered_instances,
            coverage_percentage: round2(self.summary.overall_coverage_percentage),
            timestamp,
        });
        rows
    }
}

impl TabularReport for InspectionReport {
    type Row = SampleRow;

    fn rows(&self) -> Vec<SampleRow> {
        let timestamp = self.timestamp.to_rfc3339();
        self.samples
            .iter()
            .map(|s| {
                let status = self
                    .assessment
                    .instances
                    .iter()
                    .find(|i| i.instance == s.instance)
                    .map_or(HealthStatus::NoData, |i| i.status);
                SampleRow {
                    instance: s.instance.clone(),
                    metric: s.metric.name().to_string(),
                    mountpoint: s.mountpoint.clone(),
                    value: s.value,
                    status: status.to_string(),
                    timestamp: timestamp.clone(),
                }
            })
            .collect()
    }
}

pub fn to_csv<R: TabularReport>(report: &R) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in report.rows() {
        writer.serialize(row).context("Failed to write CSV row")?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to flush CSV output: {}", e.error()))?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}
