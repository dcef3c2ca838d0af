use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::metrics::expiring_within;
use crate::types::*;

pub mod files;
mod markdown;
pub mod table;

/// Cross-region reservation coverage report
#[derive(Debug, Clone, Serialize)]
pub struct CoverageReport {
    pub timestamp: DateTime<Utc>,
    pub expiry_warning_days: i64,
    pub regions: Vec<RegionCoverage>,
    pub summary: CoverageSummary,
    pub expiring_soon: Vec<ExpiringReservation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoverageSummary {
    pub total_instances: u32,
    pub total_reserved_instances: u32,
    pub total_uncovered_instances: u32,
    pub overall_coverage_percentage: f64,
    pub soonest_expiring: Option<ExpiringReservation>,
}

impl CoverageReport {
    pub fn new(timestamp: DateTime<Utc>, expiry_warning_days: i64) -> Self {
        Self {
            timestamp,
            expiry_warning_days,
            regions: Vec::new(),
            summary: CoverageSummary::default(),
            expiring_soon: Vec::new(),
        }
    }

    pub fn add_region(&mut self, region: RegionCoverage) {
        let tag = |ri: ExpiringReservation| ExpiringReservation {
            region: Some(region.region.clone()),
            region_name: Some(region.region_name.clone()),
            ..ri
        };

        let summary = &mut self.summary;
        summary.total_instances += region.stats.total_instances;
        summary.total_reserved_instances += region.stats.total_reserved_instances;
        summary.total_uncovered_instances += region.stats.uncovered_instances;

        // strictly earlier wins, so the first region keeps ties
        if let Some(candidate) = &region.stats.soonest_expiring {
            let earlier = summary
                .soonest_expiring
                .as_ref()
                .map_or(true, |current| candidate.end_date < current.end_date);
            if earlier {
                summary.soonest_expiring = Some(tag(candidate.clone()));
            }
        }

        let covered = summary.total_instances - summary.total_uncovered_instances;
        summary.overall_coverage_percentage =
            crate::parsing::coverage_percentage(covered, summary.total_instances);

        let today = self.timestamp.date_naive();
        for ri in expiring_within(&region.stats.ri_details, today, self.expiry_warning_days) {
            self.expiring_soon.push(tag(ExpiringReservation::from(&ri)));
        }
        self.expiring_soon.sort_by_key(|ri| ri.end_date);

        self.regions.push(region);
    }

    pub fn has_issues(&self) -> bool {
        self.issue_summary().has_issues()
    }

    pub fn issue_summary(&self) -> ReportSummary {
        ReportSummary {
            uncovered_count: self.summary.total_uncovered_instances as usize,
            expiring_soon_count: self.expiring_soon.len(),
            unhealthy_instance_count: 0,
        }
    }
}

/// Result of one infrastructure inspection run
#[derive(Debug, Clone, Serialize)]
pub struct InspectionReport {
    pub timestamp: DateTime<Utc>,
    pub prometheus_url: String,
    pub samples: Vec<MetricSample>,
    pub assessment: HealthAssessment,
}

impl InspectionReport {
    pub fn metrics_count(&self) -> usize {
        self.samples.len()
    }

    pub fn has_issues(&self) -> bool {
        self.assessment.has_issues()
    }

    pub fn issue_summary(&self) -> ReportSummary {
        ReportSummary {
            uncovered_count: 0,
            expiring_soon_count: 0,
            unhealthy_instance_count: self
                .assessment
                .instances
                .iter()
                .filter(|i| i.status >= HealthStatus::Warning)
                .count(),
        }
    }
}

pub struct ReportSummary {
    pub uncovered_count: usize,
    pub expiring_soon_count: usize,
    pub unhealthy_instance_count: usize,
}

impl ReportSummary {
    pub fn total_issues(&self) -> usize {
        self.uncovered_count + self.expiring_soon_count + self.unhealthy_instance_count
    }

    pub fn has_issues(&self) -> bool {
        self.total_issues() > 0
    }
}
