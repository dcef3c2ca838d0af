use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::info;

use crate::config::InspectionConfig;
use crate::error::ReporterError;

const PROMETHEUS_PORT: u16 = 9090;

/// Resolve the Prometheus base URL: an explicit URL wins, otherwise the
/// address of the configured docker container.
pub async fn resolve_prometheus_url(cfg: &InspectionConfig) -> Result<String> {
    if let Some(url) = cfg.prometheus_url.as_deref().filter(|u| !u.is_empty()) {
        return Ok(url.trim_end_matches('/').to_string());
    }
    match cfg.container_name.as_deref().filter(|n| !n.is_empty()) {
        Some(name) => {
            let ip = container_ip(name).await?;
            let url = prometheus_url_from_ip(&ip);
            info!("Found Prometheus container at {}", url);
            Ok(url)
        }
        None => Err(ReporterError::InvalidConfig(
            "either prometheus_url or container_name must be configured".into(),
        )
        .into()),
    }
}

async fn container_ip(name: &str) -> Result<String> {
    let output = Command::new("docker")
        .args([
            "inspect",
            "-f",
            "{{range .NetworkSettings.Networks}}{{.IPAddress}}{{end}}",
            name,
        ])
        .output()
        .await
        .context("Failed to run docker inspect")?;
    if !output.status.success() {
        return Err(ReporterError::CommandFailed {
            command: format!("docker inspect {}", name),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
        .into());
    }
    parse_container_ip(name, &String::from_utf8_lossy(&output.stdout))
}

pub fn parse_container_ip(name: &str, stdout: &str) -> Result<String> {
    let ip = stdout.trim();
    if ip.is_empty() {
        return Err(ReporterError::InvalidConfig(format!("could not find IP for container: {}", name)).into());
    }
    Ok(ip.to_string())
}

pub fn prometheus_url_from_ip(ip: &str) -> String {
    format!("http://{}:{}", ip, PROMETHEUS_PORT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_explicit_url_wins() {
        let cfg = InspectionConfig {
            prometheus_url: Some("http://prom.internal:9090/".to_string()),
            container_name: Some("prometheus".to_string()),
            ..InspectionConfig::default()
        };
        assert_eq!(resolve_prometheus_url(&cfg).await.unwrap(), "http://prom.internal:9090");
    }

    #[tokio::test]
    async fn test_nothing_configured() {
        let err = resolve_prometheus_url(&InspectionConfig::default()).await.unwrap_err();
        assert!(err.to_string().contains("container_name"));
    }

    #[test]
    fn test_parse_container_ip() {
        assert_eq!(parse_container_ip("prom", "172.18.0.4\n").unwrap(), "172.18.0.4");
        assert_eq!(parse_container_ip("prom", "  10.0.0.2  ").unwrap(), "10.0.0.2");
        let err = parse_container_ip("prom", "\n").unwrap_err();
        assert!(err.to_string().contains("prom"));
    }

    #[test]
    fn test_prometheus_url_from_ip() {
        assert_eq!(prometheus_url_from_ip("172.18.0.4"), "http://172.18.0.4:9090");
    }
}
