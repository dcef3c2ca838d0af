use anyhow::{Context, Result};
use tracing::{error, info};

use crate::config::MattermostConfig;
use crate::error::ReporterError;
use crate::report::{CoverageReport, InspectionReport};
use crate::types::MattermostPayload;

pub const INSPECTION_HEADER: &str = "## 🛡️ Infrastructure Inspection Report\n---\n";

fn payload(cfg: &MattermostConfig, text: String) -> MattermostPayload {
    MattermostPayload {
        text,
        username: Some(cfg.username.clone()).filter(|u| !u.is_empty()),
        icon_emoji: Some(cfg.icon_emoji.clone()).filter(|i| !i.is_empty()),
        channel: cfg.channel.clone(),
    }
}

pub fn build_coverage_message(report: &CoverageReport, cfg: &MattermostConfig) -> MattermostPayload {
    payload(cfg, report.to_markdown())
}

/// Headed inspection summary shared by the chat message and console output
pub fn inspection_summary(report: &InspectionReport) -> String {
    let mut text = String::from(INSPECTION_HEADER);
    text.push_str(&report.assessment.summary_markdown());
    text
}

pub fn build_inspection_message(report: &InspectionReport, cfg: &MattermostConfig) -> MattermostPayload {
    payload(cfg, inspection_summary(report))
}

pub async fn send_to_mattermost(webhook_url: &str, payload: &MattermostPayload) -> Result<()> {
    let client = reqwest::Client::new();
    let res = client
        .post(webhook_url)
        .json(payload)
        .send()
        .await
        .context("Failed to send Mattermost request")?;
    if !res.status().is_success() {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        error!("Mattermost webhook failed: {} - {}", status, body);
        return Err(ReporterError::WebhookRejected {
            status: status.as_u16(),
            body,
        }
        .into());
    }
    Ok(())
}

/// Deliver a message according to the notifier settings. Delivery problems
/// are logged, never propagated; returns whether a message went out.
pub async fn notify(cfg: &MattermostConfig, has_issues: bool, payload: &MattermostPayload) -> bool {
    if !cfg.enabled {
        info!("Mattermost notifications are disabled");
        return false;
    }
    if !has_issues && !cfg.notify_when_healthy {
        info!("No issues detected, skipping Mattermost notification");
        return false;
    }
    let Some(url) = cfg.webhook_url.as_deref() else {
        error!("Mattermost is enabled but no webhook URL is configured");
        return false;
    };
    info!("Sending notification to Mattermost channel: {}", cfg.channel.as_deref().unwrap_or("(default)"));
    match send_to_mattermost(url, payload).await {
        Ok(()) => {
            info!("Successfully sent notification to Mattermost");
            true
        }
        Err(e) => {
            error!("Failed to send notification to Mattermost: {:#}", e);
            false
        }
    }
}
