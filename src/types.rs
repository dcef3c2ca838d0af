use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunningInstance {
    pub instance_id: String,
    pub instance_type: String,
    pub platform: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservedInstance {
    pub id: String,
    pub instance_type: String,
    pub count: u32,
    pub platform: String,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiringReservation {
    pub id: String,
    pub instance_type: String,
    pub end_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_name: Option<String>,
}

impl From<&ReservedInstance> for ExpiringReservation {
    fn from(ri: &ReservedInstance) -> Self {
        Self {
            id: ri.id.clone(),
            instance_type: ri.instance_type.clone(),
            end_date: ri.end_date,
            region: None,
            region_name: None,
        }
    }
}

/// Coverage of running instances by reservations within one region
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoverageStats {
    pub total_instances: u32,
    pub total_reserved_instances: u32,
    pub covered_instances: u32,
    pub uncovered_instances: u32,
    pub coverage_percentage: f64,
    pub running_by_type: BTreeMap<String, u32>,
    pub reserved_by_type: BTreeMap<String, u32>,
    pub uncovered_by_type: BTreeMap<String, u32>,
    pub ri_details: Vec<ReservedInstance>,
    pub soonest_expiring: Option<ExpiringReservation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionCoverage {
    pub region: String,
    pub region_name: String,
    #[serde(flatten)]
    pub stats: CoverageStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    CpuUsage,
    MemUsage,
    DiskFree,
    Other(String),
}

impl MetricKind {
    pub fn from_query_name(name: &str) -> Self {
        match name {
            "cpu_usage" => Self::CpuUsage,
            "mem_usage" => Self::MemUsage,
            "disk_free" => Self::DiskFree,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::CpuUsage => "cpu_usage",
            Self::MemUsage => "mem_usage",
            Self::DiskFree => "disk_free",
            Self::Other(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    pub instance: String,
    pub metric: MetricKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mountpoint: Option<String>,
    pub value: f64,
}

impl MetricSample {
    /// One-line rendering used in the raw data section of reports
    pub fn display(&self) -> String {
        let val = match &self.metric {
            MetricKind::CpuUsage => format!("Avg CPU Usage: {:.2}%", self.value),
            MetricKind::MemUsage => format!("Max Mem Usage: {:.2}%", self.value),
            MetricKind::DiskFree => format!(
                "Min Disk Free ({}): {:.2}%",
                self.mountpoint.as_deref().unwrap_or("/"),
                self.value
            ),
            MetricKind::Other(name) => format!("{}: {:.2}", name, self.value),
        };
        format!("[{}] {}", self.instance, val)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub cpu_warning: f64,
    pub mem_warning: f64,
    pub disk_warning: f64,
    pub cpu_critical: f64,
    pub mem_critical: f64,
    pub disk_critical: f64,
    pub idle_cpu: f64,
    pub idle_mem: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu_warning: 80.0,
            mem_warning: 90.0,
            disk_warning: 15.0,
            cpu_critical: 95.0,
            mem_critical: 97.0,
            disk_critical: 5.0,
            idle_cpu: 15.0,
            idle_mem: 30.0,
        }
    }
}

impl Thresholds {
    pub fn named_values(&self) -> [(&'static str, f64); 8] {
        [
            ("cpu_warning", self.cpu_warning),
            ("mem_warning", self.mem_warning),
            ("disk_warning", self.disk_warning),
            ("cpu_critical", self.cpu_critical),
            ("mem_critical", self.mem_critical),
            ("disk_critical", self.disk_critical),
            ("idle_cpu", self.idle_cpu),
            ("idle_mem", self.idle_mem),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum HealthStatus {
    NoData,
    Normal,
    Warning,
    Critical,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoData => write!(f, "No data"),
            Self::Normal => write!(f, "Normal"),
            Self::Warning => write!(f, "Warning"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub instance: String,
    pub severity: HealthStatus,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceHealth {
    pub instance: String,
    pub cpu_pct: Option<f64>,
    pub mem_pct: Option<f64>,
    /// Lowest free percentage per mountpoint
    pub disk_free_pct: BTreeMap<String, f64>,
    pub status: HealthStatus,
    pub findings: Vec<Finding>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnderutilizedInstance {
    pub instance: String,
    pub cpu_pct: Option<f64>,
    pub mem_pct: Option<f64>,
    pub low_cpu: bool,
    pub low_mem: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthAssessment {
    pub status: HealthStatus,
    pub thresholds: Thresholds,
    pub instances: Vec<InstanceHealth>,
    pub underutilized: Vec<UnderutilizedInstance>,
    pub raw_lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MattermostPayload {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_emoji: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}
