use std::collections::BTreeMap;
use tracing::warn;

use crate::parsing::{exceeds, falls_below};
use crate::types::{
    Finding, HealthAssessment, HealthStatus, InstanceHealth, MetricKind, MetricSample, Thresholds,
    UnderutilizedInstance,
};

pub const NO_DATA_MESSAGE: &str =
    "No data collected from Prometheus. Please check container status and configuration.";

#[derive(Default)]
struct InstanceValues {
    cpu: Option<f64>,
    mem: Option<f64>,
    disk: BTreeMap<String, f64>,
}

fn keep_max(slot: &mut Option<f64>, value: f64) {
    *slot = Some(slot.map_or(value, |v| v.max(value)));
}

/// Classify every instance against the thresholds and roll the worst status up
pub fn evaluate_health(samples: &[MetricSample], thresholds: &Thresholds) -> HealthAssessment {
    let raw_lines = samples.iter().map(MetricSample::display).collect();

    let mut by_instance: BTreeMap<&str, InstanceValues> = BTreeMap::new();
    for s in samples {
        if !s.value.is_finite() {
            warn!("Skipping non-finite sample: {}", s.display());
            continue;
        }
        let entry = by_instance.entry(s.instance.as_str()).or_default();
        match &s.metric {
            MetricKind::CpuUsage => keep_max(&mut entry.cpu, s.value),
            MetricKind::MemUsage => keep_max(&mut entry.mem, s.value),
            MetricKind::DiskFree => {
                let mount = s.mountpoint.clone().unwrap_or_else(|| "/".to_string());
                let slot = entry.disk.entry(mount).or_insert(s.value);
                *slot = slot.min(s.value);
            }
            MetricKind::Other(_) => {}
        }
    }

    let mut instances = Vec::new();
    let mut underutilized = Vec::new();
    for (name, values) in by_instance {
        let findings = instance_findings(name, &values, thresholds);
        let status = findings
            .iter()
            .map(|f| f.severity)
            .max()
            .unwrap_or(HealthStatus::Normal);

        let low_cpu = values.cpu.map_or(false, |v| falls_below(v, thresholds.idle_cpu));
        let low_mem = values.mem.map_or(false, |v| falls_below(v, thresholds.idle_mem));
        if low_cpu || low_mem {
            underutilized.push(UnderutilizedInstance {
                instance: name.to_string(),
                cpu_pct: values.cpu,
                mem_pct: values.mem,
                low_cpu,
                low_mem,
            });
        }

        instances.push(InstanceHealth {
            instance: name.to_string(),
            cpu_pct: values.cpu,
            mem_pct: values.mem,
            disk_free_pct: values.disk,
            status,
            findings,
        });
    }

    let status = instances
        .iter()
        .map(|i| i.status)
        .max()
        .unwrap_or(HealthStatus::NoData);

    HealthAssessment {
        status,
        thresholds: *thresholds,
        instances,
        underutilized,
        raw_lines,
    }
}

fn instance_findings(name: &str, values: &InstanceValues, t: &Thresholds) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut push = |severity, message: String| {
        findings.push(Finding {
            instance: name.to_string(),
            severity,
            message,
        })
    };

    if let Some(cpu) = values.cpu {
        if exceeds(cpu, t.cpu_critical) {
            push(HealthStatus::Critical, format!("CPU usage {:.2}% > {}%", cpu, t.cpu_critical));
        } else if exceeds(cpu, t.cpu_warning) {
            push(HealthStatus::Warning, format!("CPU usage {:.2}% > {}%", cpu, t.cpu_warning));
        }
    }
    if let Some(mem) = values.mem {
        if exceeds(mem, t.mem_critical) {
            push(HealthStatus::Critical, format!("Memory usage {:.2}% > {}%", mem, t.mem_critical));
        } else if exceeds(mem, t.mem_warning) {
            push(HealthStatus::Warning, format!("Memory usage {:.2}% > {}%", mem, t.mem_warning));
        }
    }
    for (mount, &free) in &values.disk {
        if falls_below(free, t.disk_critical) {
            push(
                HealthStatus::Critical,
                format!("Disk free space on {} {:.2}% < {}%", mount, free, t.disk_critical),
            );
        } else if falls_below(free, t.disk_warning) {
            push(
                HealthStatus::Warning,
                format!("Disk free space on {} {:.2}% < {}%", mount, free, t.disk_warning),
            );
        }
    }
    findings
}

impl HealthAssessment {
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.instances.iter().flat_map(|i| i.findings.iter())
    }

    pub fn has_issues(&self) -> bool {
        self.status >= HealthStatus::Warning
    }

    /// Human-readable markdown summary for chat and report files
    pub fn summary_markdown(&self) -> String {
        if self.status == HealthStatus::NoData {
            return NO_DATA_MESSAGE.to_string();
        }
        let t = &self.thresholds;
        let mut out = format!("**Overall Status:** {}\n\n", self.status);
        out.push_str(&format!(
            "Thresholds: CPU > {}%, Memory > {}%, Disk free < {}%\n\n",
            t.cpu_warning, t.mem_warning, t.disk_warning
        ));

        out.push_str("### Potential Risks\n");
        let mut any = false;
        for f in self.findings() {
            any = true;
            out.push_str(&format!("- **{}** {} ({})\n", f.instance, f.message, f.severity));
        }
        if !any {
            out.push_str("- None detected.\n");
        }

        out.push_str("\n### Potential Resource Waste\n");
        for u in &self.underutilized {
            let mut parts = Vec::new();
            if let Some(cpu) = u.cpu_pct {
                parts.push(format!("CPU usage: {:.2}%{}", cpu, if u.low_cpu { " (very low)" } else { "" }));
            }
            if let Some(mem) = u.mem_pct {
                parts.push(format!("Memory usage: {:.2}%{}", mem, if u.low_mem { " (very low)" } else { "" }));
            }
            out.push_str(&format!("- {}: {}\n", u.instance, parts.join(", ")));
        }
        if self.underutilized.is_empty() {
            out.push_str("- None detected.\n");
        }

        out.push_str("\n### Raw Data\n```\n");
        for line in &self.raw_lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("```\n");
        out
    }
}
