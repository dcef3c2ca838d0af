use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::error::ReporterError;
use crate::parsing::parse_aws_date;
use crate::types::{ReservedInstance, RunningInstance};

const DEFAULT_PLATFORM: &str = "Linux/UNIX";

/// Source of EC2 inventory for a region
#[async_trait]
pub trait InstanceInventory: Send + Sync {
    async fn running_instances(&self, region: &str) -> Result<Vec<RunningInstance>>;
    async fn reserved_instances(&self, region: &str) -> Result<Vec<ReservedInstance>>;
}

/// Inventory backed by the `aws` command line tool
pub struct AwsCliInventory {
    binary: String,
    profile: Option<String>,
}

impl AwsCliInventory {
    pub fn new(profile: Option<String>) -> Self {
        Self {
            binary: "aws".to_string(),
            profile,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    async fn run(&self, args: &[&str], region: &str) -> Result<String> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args).args(["--region", region, "--output", "json"]);
        if let Some(profile) = &self.profile {
            cmd.args(["--profile", profile.as_str()]);
        }
        let command = format!("{} {}", self.binary, args.join(" "));
        debug!("running `{}` in {}", command, region);

        let output = cmd
            .output()
            .await
            .with_context(|| format!("Failed to spawn `{}`", self.binary))?;
        if !output.status.success() {
            return Err(ReporterError::CommandFailed {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl InstanceInventory for AwsCliInventory {
    async fn running_instances(&self, region: &str) -> Result<Vec<RunningInstance>> {
        let out = self
            .run(
                &[
                    "ec2",
                    "describe-instances",
                    "--filters",
                    "Name=instance-state-name,Values=running",
                ],
                region,
            )
            .await?;
        let instances = parse_running_instances(&out)?;
        debug!("Found {} running EC2 instances in {}", instances.len(), region);
        Ok(instances)
    }

    async fn reserved_instances(&self, region: &str) -> Result<Vec<ReservedInstance>> {
        let out = self
            .run(
                &["ec2", "describe-reserved-instances", "--filters", "Name=state,Values=active"],
                region,
            )
            .await?;
        let reserved = parse_reserved_instances(&out)?;
        debug!("Found {} active reservations in {}", reserved.len(), region);
        Ok(reserved)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInstancesOutput {
    #[serde(default)]
    reservations: Vec<Reservation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Reservation {
    #[serde(default)]
    instances: Vec<Ec2Instance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Ec2Instance {
    instance_id: String,
    instance_type: String,
    platform: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeReservedInstancesOutput {
    #[serde(default)]
    reserved_instances: Vec<Ec2ReservedInstance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Ec2ReservedInstance {
    reserved_instances_id: String,
    instance_type: String,
    instance_count: u32,
    product_description: Option<String>,
    end: String,
}

pub fn parse_running_instances(json: &str) -> Result<Vec<RunningInstance>> {
    let out: DescribeInstancesOutput =
        serde_json::from_str(json).context("Invalid describe-instances output")?;
    Ok(out
        .reservations
        .into_iter()
        .flat_map(|r| r.instances)
        .map(|i| RunningInstance {
            instance_id: i.instance_id,
            instance_type: i.instance_type,
            platform: i.platform.unwrap_or_else(|| DEFAULT_PLATFORM.to_string()),
        })
        .collect())
}

pub fn parse_reserved_instances(json: &str) -> Result<Vec<ReservedInstance>> {
    let out: DescribeReservedInstancesOutput =
        serde_json::from_str(json).context("Invalid describe-reserved-instances output")?;
    out.reserved_instances
        .into_iter()
        .map(|ri| {
            let end_date = parse_aws_date(&ri.end)
                .ok_or_else(|| anyhow!("Invalid end date '{}' for {}", ri.end, ri.reserved_instances_id))?;
            Ok(ReservedInstance {
                id: ri.reserved_instances_id,
                instance_type: ri.instance_type,
                count: ri.instance_count,
                platform: ri.product_description.unwrap_or_else(|| DEFAULT_PLATFORM.to_string()),
                end_date,
            })
        })
        .collect()
}

/// Friendly console name for an AWS region code
pub fn region_display_name(code: &str) -> &str {
    match code {
        "us-east-1" => "US East (N. Virginia)",
        "us-east-2" => "US East (Ohio)",
        "us-west-1" => "US West (N. California)",
        "us-west-2" => "US West (Oregon)",
        "ca-central-1" => "Canada (Central)",
        "ca-west-1" => "Canada West (Calgary)",
        "sa-east-1" => "South America (São Paulo)",
        "eu-north-1" => "Europe (Stockholm)",
        "eu-west-1" => "Europe (Ireland)",
        "eu-west-2" => "Europe (London)",
        "eu-west-3" => "Europe (Paris)",
        "eu-central-1" => "Europe (Frankfurt)",
        "eu-central-2" => "Europe (Zurich)",
        "eu-south-1" => "Europe (Milan)",
        "eu-south-2" => "Europe (Spain)",
        "ap-east-1" => "Asia Pacific (Hong Kong)",
        "ap-south-1" => "Asia Pacific (Mumbai)",
        "ap-south-2" => "Asia Pacific (Hyderabad)",
        "ap-northeast-1" => "Asia Pacific (Tokyo)",
        "ap-northeast-2" => "Asia Pacific (Seoul)",
        "ap-northeast-3" => "Asia Pacific (Osaka)",
        "ap-southeast-1" => "Asia Pacific (Singapore)",
        "ap-southeast-2" => "Asia Pacific (Sydney)",
        "ap-southeast-3" => "Asia Pacific (Jakarta)",
        "ap-southeast-4" => "Asia Pacific (Melbourne)",
        "me-south-1" => "Middle East (Bahrain)",
        "me-central-1" => "Middle East (UAE)",
        "af-south-1" => "Africa (Cape Town)",
        "il-central-1" => "Israel (Tel Aviv)",
        "cn-north-1" => "China (Beijing)",
        "cn-northwest-1" => "China (Ningxia)",
        "us-gov-east-1" => "AWS GovCloud (US-East)",
        "us-gov-west-1" => "AWS GovCloud (US-West)",
        other => other,
    }
}
