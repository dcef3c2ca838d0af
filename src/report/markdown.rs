use super::{CoverageReport, InspectionReport};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

impl CoverageReport {
    pub fn to_markdown(&self) -> String {
        let mut md = String::from("# EC2 Reserved Instance Coverage Report\n\n");
        md.push_str(&format!("Inspection Time: {}\n\n", self.timestamp.format(TIME_FORMAT)));

        if let Some(ri) = &self.summary.soonest_expiring {
            md.push_str(&format!(
                "**Next RI Expiration:** {} in {} will expire on {}\n\n",
                ri.instance_type,
                ri.region_name.as_deref().unwrap_or("unknown region"),
                ri.end_date
            ));
        }

        if !self.expiring_soon.is_empty() {
            md.push_str(&format!("**Expiring within {} days:**\n", self.expiry_warning_days));
            for ri in &self.expiring_soon {
                md.push_str(&format!(
                    " - {} ({}) in {} on {}\n",
                    ri.id,
                    ri.instance_type,
                    ri.region_name.as_deref().unwrap_or("unknown region"),
                    ri.end_date
                ));
            }
            md.push('\n');
        }

        for region in &self.regions {
            let stats = &region.stats;
            md.push_str(&format!("## {}\n", region.region_name));
            if stats.total_instances == 0 {
                md.push_str("No running EC2 instances in this region.\n\n");
                continue;
            }

            md.push_str(&format!(
                "Currently running {} EC2 instances, with {}/{} instances covered by RIs",
                stats.total_instances, stats.covered_instances, stats.total_instances
            ));
            if stats.uncovered_by_type.is_empty() {
                md.push_str(". All instances are covered by RIs.\n");
            } else {
                md.push_str(", remaining:\n");
                for (instance_type, count) in &stats.uncovered_by_type {
                    md.push_str(&format!(" - {} x '{}' instances\n", count, instance_type));
                }
            }

            if !stats.ri_details.is_empty() {
                md.push_str("\n### Currently Active Reserved Instances\n");
                md.push_str("| Instance Type | Count | Expiration Date |\n");
                md.push_str("|---------|------|--------|\n");
                for ri in &stats.ri_details {
                    md.push_str(&format!("| {} | {} | {} |\n", ri.instance_type, ri.count, ri.end_date));
                }
            }
            md.push('\n');
        }

        md.push_str("## Summary\n");
        md.push_str(&format!("- Total Running EC2 Instances: {}\n", self.summary.total_instances));
        md.push_str(&format!("- Total Reserved Instances (RI): {}\n", self.summary.total_reserved_instances));
        md.push_str(&format!("- Overall Coverage: {:.2}%\n", self.summary.overall_coverage_percentage));
        md
    }
}

impl InspectionReport {
    pub fn to_markdown(&self) -> String {
        let mut md = String::from("# Infrastructure Inspection Report\n\n");
        md.push_str(&format!("Inspection Time: {}\n", self.timestamp.format(TIME_FORMAT)));
        md.push_str(&format!("Source: {}\n", self.prometheus_url));
        md.push_str(&format!("Metrics collected: {}\n\n", self.metrics_count()));
        md.push_str(&self.assessment.summary_markdown());
        md
    }
}
