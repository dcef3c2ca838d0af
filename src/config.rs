use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::ReporterError;
use crate::metrics::default_queries;
use crate::parsing::parse_bool_flag;
use crate::types::Thresholds;

const DEFAULT_EXPIRY_WARNING_DAYS: i64 = 30;
const MAX_EXPIRY_WARNING_DAYS: i64 = 3650;

/// Trait for abstracting environment variable access
pub trait EnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String>;
}

/// Production implementation using std::env
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Mock implementation for testing
#[derive(Debug, Default)]
pub struct MockEnvironment {
    vars: HashMap<String, String>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
        }
    }

    pub fn set_var<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_var<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set_var(key, value);
        self
    }
}

impl EnvironmentProvider for MockEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ri_analysis: RiAnalysisConfig,
    pub prometheus_inspection: InspectionConfig,
    pub notifications: NotificationsConfig,
    pub reporting: ReportingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiAnalysisConfig {
    pub regions: Vec<String>,
    pub profile: Option<String>,
    /// Reservations ending within this many days are reported as expiring soon
    pub expiry_warning_days: i64,
}

impl Default for RiAnalysisConfig {
    fn default() -> Self {
        Self {
            regions: vec!["us-east-1".to_string()],
            profile: None,
            expiry_warning_days: DEFAULT_EXPIRY_WARNING_DAYS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InspectionConfig {
    pub prometheus_url: Option<String>,
    pub container_name: Option<String>,
    pub timeout_secs: u64,
    pub thresholds: Thresholds,
    pub queries: BTreeMap<String, String>,
}

impl Default for InspectionConfig {
    fn default() -> Self {
        Self {
            prometheus_url: None,
            container_name: None,
            timeout_secs: 10,
            thresholds: Thresholds::default(),
            queries: default_queries(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub mattermost: MattermostConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MattermostConfig {
    pub enabled: bool,
    pub webhook_url: Option<String>,
    pub channel: Option<String>,
    pub username: String,
    pub icon_emoji: String,
    pub notify_when_healthy: bool,
}

impl Default for MattermostConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_url: None,
            channel: None,
            username: "AWS Resource Optimizer".to_string(),
            icon_emoji: ":money_with_wings:".to_string(),
            notify_when_healthy: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Markdown,
    Json,
    Csv,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    pub output_dir: PathBuf,
    pub formats: Vec<ReportFormat>,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("reports"),
            formats: vec![ReportFormat::Markdown],
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    load_config_with_env(path, &SystemEnvironment)
}

pub fn load_config_with_env<E: EnvironmentProvider>(path: Option<&Path>, env: &E) -> Result<Config> {
    let mut cfg = match path {
        Some(p) => {
            let raw = std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read config file {}", p.display()))?;
            parse_config(&raw).with_context(|| format!("Invalid config file {}", p.display()))?
        }
        None => Config::default(),
    };
    apply_env_overrides(&mut cfg, env)?;
    validate(&cfg)?;
    Ok(cfg)
}

pub fn parse_config(raw: &str) -> Result<Config> {
    Ok(toml::from_str(raw)?)
}

pub fn apply_env_overrides<E: EnvironmentProvider>(cfg: &mut Config, env: &E) -> Result<()> {
    if let Some(regions) = env.get_var("AWS_REGIONS") {
        let regions: Vec<String> = regions
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if regions.is_empty() {
            return Err(anyhow!("AWS_REGIONS must list at least one region (comma-separated)"));
        }
        cfg.ri_analysis.regions = regions;
    }
    if let Some(profile) = env.get_var("AWS_PROFILE").filter(|p| !p.is_empty()) {
        cfg.ri_analysis.profile = Some(profile);
    }
    if let Some(days) = env.get_var("RI_EXPIRY_WARNING_DAYS") {
        cfg.ri_analysis.expiry_warning_days = days
            .trim()
            .parse()
            .ok()
            .filter(|d| (0..=MAX_EXPIRY_WARNING_DAYS).contains(d))
            .unwrap_or_else(|| {
                warn!(
                    "Ignoring RI_EXPIRY_WARNING_DAYS={:?}, using {} days",
                    days, DEFAULT_EXPIRY_WARNING_DAYS
                );
                DEFAULT_EXPIRY_WARNING_DAYS
            });
    }

    let inspection = &mut cfg.prometheus_inspection;
    if let Some(url) = env.get_var("PROMETHEUS_URL").filter(|u| !u.is_empty()) {
        inspection.prometheus_url = Some(url);
    }
    if let Some(name) = env.get_var("PROMETHEUS_CONTAINER").filter(|n| !n.is_empty()) {
        inspection.container_name = Some(name);
    }
    let thresholds = &mut inspection.thresholds;
    override_percent(env, "CPU_WARNING_PERCENT", &mut thresholds.cpu_warning)?;
    override_percent(env, "MEM_WARNING_PERCENT", &mut thresholds.mem_warning)?;
    override_percent(env, "DISK_WARNING_PERCENT", &mut thresholds.disk_warning)?;

    let mm = &mut cfg.notifications.mattermost;
    if let Some(url) = env.get_var("MATTERMOST_WEBHOOK_URL").filter(|u| !u.is_empty()) {
        mm.webhook_url = Some(url);
        mm.enabled = true;
    }
    if let Some(channel) = env.get_var("MATTERMOST_CHANNEL").filter(|c| !c.is_empty()) {
        mm.channel = Some(channel);
    }
    if let Some(v) = env.get_var("MATTERMOST_ENABLED") {
        mm.enabled = parse_bool_flag(&v);
    }
    if let Some(v) = env.get_var("NOTIFY_WHEN_HEALTHY") {
        mm.notify_when_healthy = parse_bool_flag(&v);
    }

    if let Some(dir) = env.get_var("REPORT_OUTPUT_DIR").filter(|d| !d.is_empty()) {
        cfg.reporting.output_dir = PathBuf::from(dir);
    }
    Ok(())
}

fn override_percent<E: EnvironmentProvider>(env: &E, key: &str, target: &mut f64) -> Result<()> {
    if let Some(raw) = env.get_var(key) {
        let value: f64 = raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}", key))?;
        if !is_percentage(value) {
            return Err(anyhow!("Invalid {}: {} is not a percentage between 0 and 100", key, raw.trim()));
        }
        *target = value;
    }
    Ok(())
}

fn is_percentage(value: f64) -> bool {
    value.is_finite() && (0.0..=100.0).contains(&value)
}

pub fn validate(cfg: &Config) -> Result<()> {
    if cfg.ri_analysis.regions.is_empty() {
        return Err(ReporterError::InvalidConfig("ri_analysis.regions must not be empty".into()).into());
    }
    let days = cfg.ri_analysis.expiry_warning_days;
    if !(0..=MAX_EXPIRY_WARNING_DAYS).contains(&days) {
        return Err(ReporterError::InvalidConfig(format!(
            "ri_analysis.expiry_warning_days must be between 0 and {}, got {}",
            MAX_EXPIRY_WARNING_DAYS, days
        ))
        .into());
    }
    let mm = &cfg.notifications.mattermost;
    if mm.enabled && mm.webhook_url.as_deref().map_or(true, str::is_empty) {
        return Err(ReporterError::InvalidConfig(
            "MATTERMOST_WEBHOOK_URL must be provided when notifications are enabled".into(),
        )
        .into());
    }
    let t = &cfg.prometheus_inspection.thresholds;
    for (name, value) in t.named_values() {
        if !is_percentage(value) {
            return Err(ReporterError::InvalidConfig(format!(
                "thresholds.{} must be a percentage between 0 and 100, got {}",
                name, value
            ))
            .into());
        }
    }
    if t.cpu_warning > t.cpu_critical || t.mem_warning > t.mem_critical || t.disk_warning < t.disk_critical {
        return Err(ReporterError::InvalidConfig(
            "warning thresholds must not be stricter than critical thresholds".into(),
        )
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[ri_analysis]
regions = ["us-east-1", "ap-northeast-1"]
profile = "billing"

[prometheus_inspection]
container_name = "prometheus"

[prometheus_inspection.thresholds]
cpu_warning = 70

[notifications.mattermost]
enabled = true
webhook_url = "https://chat.example.com/hooks/abc"
channel = "ops-alerts"

[reporting]
output_dir = "/var/reports"
formats = ["markdown", "json", "csv"]
"#;

    #[test]
    fn test_parse_config_file() {
        let cfg = parse_config(SAMPLE).unwrap();

        assert_eq!(cfg.ri_analysis.regions, vec!["us-east-1", "ap-northeast-1"]);
        assert_eq!(cfg.ri_analysis.profile.as_deref(), Some("billing"));
        assert_eq!(cfg.ri_analysis.expiry_warning_days, 30); // default
        assert_eq!(cfg.prometheus_inspection.container_name.as_deref(), Some("prometheus"));
        assert_eq!(cfg.prometheus_inspection.thresholds.cpu_warning, 70.0);
        assert_eq!(cfg.prometheus_inspection.thresholds.mem_warning, 90.0); // default
        assert_eq!(cfg.prometheus_inspection.queries.len(), 3); // default queries
        assert!(cfg.notifications.mattermost.enabled);
        assert_eq!(cfg.notifications.mattermost.channel.as_deref(), Some("ops-alerts"));
        assert_eq!(cfg.notifications.mattermost.username, "AWS Resource Optimizer");
        assert_eq!(cfg.reporting.output_dir, PathBuf::from("/var/reports"));
        assert_eq!(
            cfg.reporting.formats,
            vec![ReportFormat::Markdown, ReportFormat::Json, ReportFormat::Csv]
        );
    }

    #[test]
    fn test_config_loading_defaults() {
        let cfg = load_config_with_env(None, &MockEnvironment::new()).unwrap();

        assert_eq!(cfg.ri_analysis.regions, vec!["us-east-1"]);
        assert_eq!(cfg.prometheus_inspection.timeout_secs, 10);
        assert_eq!(cfg.prometheus_inspection.thresholds, Thresholds::default());
        assert!(!cfg.notifications.mattermost.enabled);
        assert!(cfg.notifications.mattermost.notify_when_healthy);
        assert_eq!(cfg.reporting.output_dir, PathBuf::from("reports"));
        assert_eq!(cfg.reporting.formats, vec![ReportFormat::Markdown]);
    }

    #[test]
    fn test_config_loading_with_env() {
        let env = MockEnvironment::new()
            .with_var("AWS_REGIONS", "us-east-1,eu-west-1")
            .with_var("AWS_PROFILE", "prod")
            .with_var("RI_EXPIRY_WARNING_DAYS", "14")
            .with_var("PROMETHEUS_URL", "http://prom:9090")
            .with_var("CPU_WARNING_PERCENT", "75")
            .with_var("MEM_WARNING_PERCENT", "85.5")
            .with_var("DISK_WARNING_PERCENT", "20")
            .with_var("MATTERMOST_WEBHOOK_URL", "https://chat.example.com/hooks/xyz")
            .with_var("MATTERMOST_CHANNEL", "finops")
            .with_var("NOTIFY_WHEN_HEALTHY", "false")
            .with_var("REPORT_OUTPUT_DIR", "/tmp/out");

        let cfg = load_config_with_env(None, &env).unwrap();

        assert_eq!(cfg.ri_analysis.regions, vec!["us-east-1", "eu-west-1"]);
        assert_eq!(cfg.ri_analysis.profile.as_deref(), Some("prod"));
        assert_eq!(cfg.ri_analysis.expiry_warning_days, 14);
        assert_eq!(cfg.prometheus_inspection.prometheus_url.as_deref(), Some("http://prom:9090"));
        assert_eq!(cfg.prometheus_inspection.thresholds.cpu_warning, 75.0);
        assert_eq!(cfg.prometheus_inspection.thresholds.mem_warning, 85.5);
        assert_eq!(cfg.prometheus_inspection.thresholds.disk_warning, 20.0);
        assert!(cfg.notifications.mattermost.enabled);
        assert_eq!(
            cfg.notifications.mattermost.webhook_url.as_deref(),
            Some("https://chat.example.com/hooks/xyz")
        );
        assert_eq!(cfg.notifications.mattermost.channel.as_deref(), Some("finops"));
        assert!(!cfg.notifications.mattermost.notify_when_healthy);
        assert_eq!(cfg.reporting.output_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut cfg = parse_config(SAMPLE).unwrap();
        let env = MockEnvironment::new()
            .with_var("AWS_REGIONS", "sa-east-1")
            .with_var("MATTERMOST_ENABLED", "0");

        apply_env_overrides(&mut cfg, &env).unwrap();

        assert_eq!(cfg.ri_analysis.regions, vec!["sa-east-1"]);
        assert!(!cfg.notifications.mattermost.enabled);
        // untouched by env
        assert_eq!(cfg.ri_analysis.profile.as_deref(), Some("billing"));
    }

    #[test]
    fn test_region_parsing() {
        let env = MockEnvironment::new().with_var("AWS_REGIONS", " us-east-1 , eu-west-1 ,  ap-south-1  ,");
        let cfg = load_config_with_env(None, &env).unwrap();
        assert_eq!(cfg.ri_analysis.regions, vec!["us-east-1", "eu-west-1", "ap-south-1"]);

        let env = MockEnvironment::new().with_var("AWS_REGIONS", " , , ,");
        let result = load_config_with_env(None, &env);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("AWS_REGIONS"));
    }

    #[test]
    fn test_invalid_threshold() {
        let env = MockEnvironment::new().with_var("CPU_WARNING_PERCENT", "lots");
        let result = load_config_with_env(None, &env);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("CPU_WARNING_PERCENT"));
    }

    #[test]
    fn test_invalid_expiry_days_falls_back() {
        let env = MockEnvironment::new().with_var("RI_EXPIRY_WARNING_DAYS", "soon");
        let cfg = load_config_with_env(None, &env).unwrap();
        assert_eq!(cfg.ri_analysis.expiry_warning_days, 30);
    }

    #[test]
    fn test_out_of_range_expiry_days_fall_back() {
        for raw in ["100000000", "-5", "3651"] {
            let env = MockEnvironment::new().with_var("RI_EXPIRY_WARNING_DAYS", raw);
            let cfg = load_config_with_env(None, &env).unwrap();
            assert_eq!(cfg.ri_analysis.expiry_warning_days, 30, "value {}", raw);
        }
        let env = MockEnvironment::new().with_var("RI_EXPIRY_WARNING_DAYS", "3650");
        assert_eq!(load_config_with_env(None, &env).unwrap().ri_analysis.expiry_warning_days, 3650);
    }

    #[test]
    fn test_out_of_range_expiry_days_in_file_rejected() {
        let mut cfg = parse_config("[ri_analysis]\nexpiry_warning_days = 100000000\n").unwrap();
        apply_env_overrides(&mut cfg, &MockEnvironment::new()).unwrap();
        let err = validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("expiry_warning_days"));
    }

    #[test]
    fn test_non_percentage_thresholds_rejected() {
        for raw in ["NaN", "inf", "-1", "100.5"] {
            let env = MockEnvironment::new().with_var("CPU_WARNING_PERCENT", raw);
            let err = load_config_with_env(None, &env).unwrap_err();
            assert!(err.to_string().contains("CPU_WARNING_PERCENT"), "value {}", raw);
        }
        let env = MockEnvironment::new().with_var("DISK_WARNING_PERCENT", "0");
        assert_eq!(load_config_with_env(None, &env).unwrap().prometheus_inspection.thresholds.disk_warning, 0.0);
    }

    #[test]
    fn test_threshold_table_values_checked() {
        let cfg = parse_config("[prometheus_inspection.thresholds]\nidle_mem = 130\n").unwrap();
        let err = validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("idle_mem"));

        let cfg = parse_config("[prometheus_inspection.thresholds]\ncpu_critical = nan\n").unwrap();
        let err = validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("cpu_critical"));
    }

    #[test]
    fn test_enabled_notifier_requires_url() {
        let env = MockEnvironment::new().with_var("MATTERMOST_ENABLED", "true");
        let result = load_config_with_env(None, &env);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("MATTERMOST_WEBHOOK_URL"));
    }

    #[test]
    fn test_warning_stricter_than_critical_rejected() {
        let env = MockEnvironment::new().with_var("CPU_WARNING_PERCENT", "99");
        let err = load_config_with_env(None, &env).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReporterError>(),
            Some(ReporterError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_missing_config_file() {
        let result = load_config_with_env(Some(Path::new("/nonexistent/settings.toml")), &MockEnvironment::new());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to read config file"));
    }
}
