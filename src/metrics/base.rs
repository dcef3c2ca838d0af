use anyhow::Result;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::debug;

use crate::error::ReporterError;
use crate::parsing::parse_sample_value;
use crate::types::{MetricKind, MetricSample};

/// Default 7-day analysis window queries, keyed by metric name
pub fn default_queries() -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "cpu_usage".to_string(),
            r#"avg by (instance) (1 - rate(node_cpu_seconds_total{mode="idle"}[7d])) * 100"#.to_string(),
        ),
        (
            "mem_usage".to_string(),
            "max by (instance) (1 - (node_memory_MemAvailable_bytes / node_memory_MemTotal_bytes)) * 100".to_string(),
        ),
        (
            "disk_free".to_string(),
            r#"min by (instance, mountpoint) (node_filesystem_avail_bytes{fstype=~"ext4|xfs"} / node_filesystem_size_bytes{fstype=~"ext4|xfs"}) * 100"#.to_string(),
        ),
    ])
}

#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    pub status: String,
    #[serde(default)]
    pub data: Option<QueryData>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueryData {
    #[serde(rename = "resultType")]
    pub result_type: String,
    #[serde(default)]
    pub result: Vec<VectorItem>,
}

#[derive(Debug, Deserialize)]
pub struct VectorItem {
    #[serde(default)]
    pub metric: HashMap<String, String>,
    pub value: serde_json::Value,
}

pub struct PrometheusClient {
    http: reqwest::Client,
    base_url: String,
}

impl PrometheusClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run an instant query and convert the vector result into samples
    pub async fn query(&self, name: &str, promql: &str) -> Result<Vec<MetricSample>, ReporterError> {
        let url = format!("{}/api/v1/query", self.base_url);
        let res = self
            .http
            .get(&url)
            .query(&[("query", promql)])
            .send()
            .await
            .map_err(|e| ReporterError::query(name, e))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ReporterError::query(name, format!("HTTP {} - {}", status, body)));
        }

        let body: QueryResponse = res.json().await.map_err(|e| ReporterError::query(name, e))?;
        let samples = samples_from_response(name, body)?;
        debug!("query {} returned {} samples", name, samples.len());
        Ok(samples)
    }
}

pub fn samples_from_response(name: &str, body: QueryResponse) -> Result<Vec<MetricSample>, ReporterError> {
    if body.status != "success" {
        let reason = body.error.unwrap_or_else(|| format!("status {}", body.status));
        return Err(ReporterError::query(name, reason));
    }
    let data = body
        .data
        .ok_or_else(|| ReporterError::query(name, "response has no data"))?;
    if data.result_type != "vector" {
        return Err(ReporterError::query(
            name,
            format!("unsupported result type {}", data.result_type),
        ));
    }

    let kind = MetricKind::from_query_name(name);
    let mut samples = Vec::with_capacity(data.result.len());
    for item in data.result {
        let value = parse_sample_value(&item.value)
            .ok_or_else(|| ReporterError::query(name, format!("malformed sample value {}", item.value)))?;
        let instance = item
            .metric
            .get("instance")
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());
        let mountpoint = match kind {
            MetricKind::DiskFree => Some(item.metric.get("mountpoint").cloned().unwrap_or_else(|| "/".to_string())),
            _ => None,
        };
        samples.push(MetricSample {
            instance,
            metric: kind.clone(),
            mountpoint,
            value,
        });
    }
    Ok(samples)
}
