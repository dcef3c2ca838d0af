use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{error, info};

use crate::aws::{region_display_name, InstanceInventory};
use crate::config::RiAnalysisConfig;
use crate::metrics::{calculate_coverage, PrometheusClient};
use crate::report::CoverageReport;
use crate::types::{MetricSample, RegionCoverage};

/// Runs the configured queries against one Prometheus server
pub struct MetricsCollector<'a> {
    client: &'a PrometheusClient,
}

impl<'a> MetricsCollector<'a> {
    pub fn new(client: &'a PrometheusClient) -> Self {
        Self { client }
    }

    /// Failed queries are logged and skipped so one bad expression does not
    /// hide the rest of the data.
    pub async fn collect(&self, queries: &BTreeMap<String, String>) -> Vec<MetricSample> {
        let mut samples = Vec::new();
        for (name, promql) in queries {
            match self.client.query(name, promql).await {
                Ok(batch) => {
                    info!("Fetched {} results for metric: {}", batch.len(), name);
                    samples.extend(batch);
                }
                Err(e) => error!("Error fetching {} from {}: {}", name, self.client.base_url(), e),
            }
        }
        samples
    }
}

/// Builds the reservation coverage report region by region
pub struct CoverageCollector<'a, I: InstanceInventory> {
    inventory: &'a I,
    config: &'a RiAnalysisConfig,
}

impl<'a, I: InstanceInventory> CoverageCollector<'a, I> {
    pub fn new(inventory: &'a I, config: &'a RiAnalysisConfig) -> Self {
        Self { inventory, config }
    }

    pub async fn analyze_region(&self, region: &str) -> Result<RegionCoverage> {
        info!("Analyzing RI coverage for region: {}", region);
        let running = self.inventory.running_instances(region).await?;
        let reserved = self.inventory.reserved_instances(region).await?;
        Ok(RegionCoverage {
            region: region.to_string(),
            region_name: region_display_name(region).to_string(),
            stats: calculate_coverage(&running, &reserved),
        })
    }

    pub async fn collect(&self, now: DateTime<Utc>) -> Result<CoverageReport> {
        let mut report = CoverageReport::new(now, self.config.expiry_warning_days);
        for region in &self.config.regions {
            let coverage = self.analyze_region(region).await?;
            report.add_region(coverage);
        }
        info!(
            "Generated RI coverage report: {} regions, {:.2}% overall coverage",
            report.regions.len(),
            report.summary.overall_coverage_percentage
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ReservedInstance, RunningInstance};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone};
    use std::collections::HashMap;
    use std::time::Duration;

    #[derive(Default)]
    struct MockInventory {
        running: HashMap<String, Vec<RunningInstance>>,
        reserved: HashMap<String, Vec<ReservedInstance>>,
        failing_region: Option<String>,
    }

    #[async_trait]
    impl InstanceInventory for MockInventory {
        async fn running_instances(&self, region: &str) -> Result<Vec<RunningInstance>> {
            if self.failing_region.as_deref() == Some(region) {
                return Err(anyhow!("access denied in {}", region));
            }
            Ok(self.running.get(region).cloned().unwrap_or_default())
        }

        async fn reserved_instances(&self, region: &str) -> Result<Vec<ReservedInstance>> {
            Ok(self.reserved.get(region).cloned().unwrap_or_default())
        }
    }

    fn vm(id: &str, t: &str) -> RunningInstance {
        RunningInstance {
            instance_id: id.to_string(),
            instance_type: t.to_string(),
            platform: "Linux/UNIX".to_string(),
        }
    }

    fn config(regions: &[&str]) -> RiAnalysisConfig {
        RiAnalysisConfig {
            regions: regions.iter().map(|r| r.to_string()).collect(),
            ..RiAnalysisConfig::default()
        }
    }

    #[tokio::test]
    async fn test_coverage_collector_walks_regions_in_order() {
        let mut inventory = MockInventory::default();
        inventory
            .running
            .insert("eu-west-1".to_string(), vec![vm("i-1", "m5.large"), vm("i-2", "m5.large")]);
        inventory.reserved.insert(
            "eu-west-1".to_string(),
            vec![ReservedInstance {
                id: "ri-1".to_string(),
                instance_type: "m5.large".to_string(),
                count: 1,
                platform: "Linux/UNIX".to_string(),
                end_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            }],
        );

        let cfg = config(&["eu-west-1", "us-east-2"]);
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        let report = CoverageCollector::new(&inventory, &cfg).collect(now).await.unwrap();

        assert_eq!(report.regions.len(), 2);
        assert_eq!(report.regions[0].region_name, "Europe (Ireland)");
        assert_eq!(report.regions[1].region_name, "US East (Ohio)");
        assert_eq!(report.regions[1].stats.total_instances, 0);
        assert_eq!(report.summary.total_uncovered_instances, 1);
        assert_eq!(report.summary.overall_coverage_percentage, 50.0);
        assert_eq!(report.expiring_soon.len(), 1);
    }

    #[tokio::test]
    async fn test_coverage_collector_propagates_inventory_errors() {
        let inventory = MockInventory {
            failing_region: Some("ap-south-1".to_string()),
            ..MockInventory::default()
        };
        let cfg = config(&["us-east-1", "ap-south-1"]);
        let err = CoverageCollector::new(&inventory, &cfg).collect(Utc::now()).await.unwrap_err();
        assert!(err.to_string().contains("ap-south-1"));
    }

    #[tokio::test]
    async fn test_metrics_collector_skips_failed_queries() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/query")
            .match_query(mockito::Matcher::UrlEncoded("query".into(), "good".into()))
            .with_status(200)
            .with_body(r#"{"status":"success","data":{"resultType":"vector","result":[{"metric":{"instance":"a"},"value":[1,"12.5"]}]}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v1/query")
            .match_query(mockito::Matcher::UrlEncoded("query".into(), "bad".into()))
            .with_status(400)
            .with_body(r#"{"status":"error","error":"bad query"}"#)
            .create_async()
            .await;

        let client = PrometheusClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        let queries = BTreeMap::from([
            ("cpu_usage".to_string(), "good".to_string()),
            ("mem_usage".to_string(), "bad".to_string()),
        ]);

        let samples = MetricsCollector::new(&client).collect(&queries).await;

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].instance, "a");
        assert_eq!(samples[0].value, 12.5);
    }
}
