use chrono::{DateTime, NaiveDate};
use serde_json::Value;

/// Parse the value of a Prometheus instant-vector sample, `[<ts>, "<float>"]`.
pub fn parse_sample_value(value: &Value) -> Option<f64> {
    let raw = value.as_array()?.get(1)?;
    match raw {
        Value::String(s) => parse_float(s),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn parse_float(s: &str) -> Option<f64> {
    let s = s.trim();
    match s {
        "NaN" => Some(f64::NAN),
        "+Inf" | "Inf" => Some(f64::INFINITY),
        "-Inf" => Some(f64::NEG_INFINITY),
        _ => s.parse::<f64>().ok(),
    }
}

pub fn coverage_percentage(covered: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    covered as f64 / total as f64 * 100.0
}

pub fn exceeds(value: f64, threshold: f64) -> bool {
    value.is_finite() && value > threshold
}

pub fn falls_below(value: f64, threshold: f64) -> bool {
    value.is_finite() && value < threshold
}

/// Accepts the RFC3339 timestamps the AWS CLI emits as well as bare dates.
pub fn parse_aws_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

pub fn parse_bool_flag(s: &str) -> bool {
    matches!(s, "1" | "true" | "TRUE" | "True")
}
