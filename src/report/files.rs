use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::table::{to_csv, TabularReport};
use crate::config::{ReportFormat, ReportingConfig};

pub fn report_filename(kind: &str, ext: &str, now: DateTime<Utc>) -> String {
    format!("{}_{}.{}", kind, now.format("%Y%m%d-%H%M%S"), ext)
}

pub fn ensure_report_dir(dir: &Path) -> Result<()> {
    debug!("Ensuring report directory exists: {}", dir.display());
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create report directory {}", dir.display()))
}

pub fn save_report(dir: &Path, filename: &str, contents: &str) -> Result<PathBuf> {
    ensure_report_dir(dir)?;
    let path = dir.join(filename);
    std::fs::write(&path, contents).with_context(|| format!("Failed to write report {}", path.display()))?;
    info!("Saved report: {}", path.display());
    Ok(path)
}

/// Write the report in every configured format, returning the written paths
pub fn write_reports<R: Serialize + TabularReport>(
    cfg: &ReportingConfig,
    kind: &str,
    now: DateTime<Utc>,
    markdown: &str,
    report: &R,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(cfg.formats.len());
    for format in &cfg.formats {
        let filename = report_filename(kind, format.extension(), now);
        let contents = match format {
            ReportFormat::Markdown => markdown.to_string(),
            ReportFormat::Json => serde_json::to_string_pretty(report).context("Failed to serialize report")?,
            ReportFormat::Csv => to_csv(report)?,
        };
        written.push(save_report(&cfg.output_dir, &filename, &contents)?);
    }
    Ok(written)
}
