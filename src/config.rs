//! Configuration Management
//!
//! Resolves region, endpoint and profile for the registry client from
//! command-line overrides and the standard AWS environment.

use crate::aws::credentials::{aws_config_dir, get_profile_region};
use anyhow::{anyhow, bail, Result};
use std::path::PathBuf;

/// User agent sent with every registry call
pub const USER_AGENT: &str = "amazon-servicediscovery-service-for-github-actions";

const DEFAULT_PROFILE: &str = "default";

/// Values given on the command line; each takes precedence over the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub profile: Option<String>,
}

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub region: String,
    /// Custom endpoint (LocalStack, VPC endpoint, ...)
    pub endpoint_url: Option<String>,
    pub profile: String,
    pub user_agent: String,
}

impl Config {
    /// Load configuration from overrides and the process environment
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        Self::load_with(overrides, |key| std::env::var(key).ok())
    }

    fn load_with(overrides: &ConfigOverrides, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| env(key).filter(|v| !v.is_empty());

        let profile = overrides
            .profile
            .clone()
            .or_else(|| var("AWS_PROFILE"))
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string());

        let region = overrides
            .region
            .clone()
            .or_else(|| var("AWS_REGION"))
            .or_else(|| var("AWS_DEFAULT_REGION"))
            .or_else(|| {
                let path = var("AWS_CONFIG_FILE")
                    .map(PathBuf::from)
                    .or_else(|| aws_config_dir().ok().map(|dir| dir.join("config")))?;
                get_profile_region(&path, &profile)
            })
            .ok_or_else(|| {
                anyhow!("No AWS region configured. Set AWS_REGION or use --region")
            })?;

        // Service ARNs there use the aws-cn partition, which we cannot read back
        if region.starts_with("cn-") {
            bail!(
                "Region {} is not supported: only arn:aws service ARNs can be reported",
                region
            );
        }

        let endpoint_url = overrides
            .endpoint_url
            .clone()
            .or_else(|| var("AWS_ENDPOINT_URL_SERVICEDISCOVERY"))
            .or_else(|| var("AWS_ENDPOINT_URL"));

        tracing::debug!(
            "Using region: {}, profile: {}, endpoint override: {:?}",
            region,
            profile,
            endpoint_url
        );

        Ok(Self {
            region,
            endpoint_url,
            profile,
            user_agent: USER_AGENT.to_string(),
        })
    }

    /// Get effective endpoint (override > regional default)
    pub fn endpoint(&self) -> String {
        if let Some(endpoint) = &self.endpoint_url {
            return endpoint.clone();
        }

        format!("https://servicediscovery.{}.amazonaws.com", self.region)
    }
}
