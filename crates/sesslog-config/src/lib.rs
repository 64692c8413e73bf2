// sesslog-config - deployment configuration for the sesslog stacks
//
// Supports configuration from multiple sources:
// 1. Environment variables (SESSLOG_* prefix, highest priority)
// 2. Config file path from SESSLOG_CONFIG
// 3. Default config file location (./sesslog.toml)
// 4. Built-in defaults (lowest priority)
//
// A DeployConfig is loaded once at process start and passed down; no other
// component reads ambient environment state.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

mod env;
mod sources;

pub use env::{EnvSource, StdEnvSource, ENV_PREFIX};

pub const DEFAULT_REGION: &str = "ap-northeast-1";
pub const DEFAULT_PROFILE: &str = "default";

/// Top-level deployment configuration shared by both stack drivers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployConfig {
    #[serde(default)]
    pub aws: AwsSettings,

    #[serde(default)]
    pub api: ApiStackConfig,

    #[serde(default)]
    pub vpc: VpcStackConfig,
}

/// Region and credential-profile selectors for all AWS calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsSettings {
    pub region: String,
    pub profile: String,
}

impl Default for AwsSettings {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            profile: DEFAULT_PROFILE.to_string(),
        }
    }
}

/// Configuration for the API gateway stack (gateway fronting the ingest function)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiStackConfig {
    pub stack_name: String,
    pub template: String,
    /// Name of the already-deployed ingest function the gateway fronts
    pub function_name: String,
    /// Statement id for the API Gateway invoke permission grant
    pub invoke_statement_id: String,
    /// Source IP allow-list; commas and/or whitespace separated, at most
    /// three ranges are used
    #[serde(default)]
    pub allowed_cidrs: String,
}

impl Default for ApiStackConfig {
    fn default() -> Self {
        Self {
            stack_name: "sesslog-api".to_string(),
            template: "infra/api-template.yaml".to_string(),
            function_name: "sesslog-ingest".to_string(),
            invoke_statement_id: "sesslog-apigw-invoke".to_string(),
            allowed_cidrs: String::new(),
        }
    }
}

impl ApiStackConfig {
    pub fn validate(&self) -> Result<()> {
        if self.stack_name.is_empty() {
            bail!("api.stack_name must not be empty");
        }
        if self.template.is_empty() {
            bail!("api.template must not be empty");
        }
        if self.function_name.is_empty() {
            bail!("api.function_name must not be empty (set SESSLOG_FUNCTION_NAME)");
        }
        if self.invoke_statement_id.is_empty() {
            bail!("api.invoke_statement_id must not be empty");
        }
        Ok(())
    }
}

/// Configuration for the VPC stack (ingest function plus network endpoints)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VpcStackConfig {
    pub stack_name: String,
    pub template: String,
    pub function_name: String,
    /// VPC that owns the function and its endpoints
    #[serde(default)]
    pub vpc_id: String,
    /// Comma-separated subnet ids, passed through as one template parameter
    #[serde(default)]
    pub subnet_ids: String,
    /// S3 gateway endpoint: create, reuse an explicit/discovered id, or auto
    #[serde(default)]
    pub s3_endpoint: EndpointOverride,
    /// SSM interface endpoint: create, reuse an explicit/discovered id, or auto
    #[serde(default)]
    pub ssm_endpoint: EndpointOverride,
}

impl Default for VpcStackConfig {
    fn default() -> Self {
        Self {
            stack_name: "sesslog-vpc".to_string(),
            template: "infra/vpc-template.yaml".to_string(),
            function_name: "sesslog-ingest".to_string(),
            vpc_id: String::new(),
            subnet_ids: String::new(),
            s3_endpoint: EndpointOverride::default(),
            ssm_endpoint: EndpointOverride::default(),
        }
    }
}

impl VpcStackConfig {
    pub fn validate(&self) -> Result<()> {
        if self.stack_name.is_empty() {
            bail!("vpc.stack_name must not be empty");
        }
        if self.template.is_empty() {
            bail!("vpc.template must not be empty");
        }
        if self.function_name.is_empty() {
            bail!("vpc.function_name must not be empty (set SESSLOG_FUNCTION_NAME)");
        }
        if self.vpc_id.is_empty() {
            bail!("vpc.vpc_id is required (set SESSLOG_VPC_ID)");
        }
        if self.subnet_ids.is_empty() {
            bail!("vpc.subnet_ids is required (set SESSLOG_SUBNET_IDS)");
        }
        Ok(())
    }
}

/// Create-or-reuse intent for one managed network endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointOverride {
    #[serde(default)]
    pub mode: EndpointMode,

    /// Explicit endpoint id; when set it always wins and no discovery runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Tri-state create toggle. `Auto` resolves to reuse when discovery finds an
/// existing endpoint, and to create otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointMode {
    Create,
    Reuse,
    #[default]
    Auto,
}

impl fmt::Display for EndpointMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointMode::Create => write!(f, "create"),
            EndpointMode::Reuse => write!(f, "reuse"),
            EndpointMode::Auto => write!(f, "auto"),
        }
    }
}

impl FromStr for EndpointMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "true" | "create" => Ok(EndpointMode::Create),
            "false" | "reuse" => Ok(EndpointMode::Reuse),
            "auto" => Ok(EndpointMode::Auto),
            _ => bail!(
                "Unsupported endpoint mode: {}. Supported: true/create, false/reuse, auto",
                s
            ),
        }
    }
}

impl DeployConfig {
    /// Load configuration from all sources with priority
    pub fn load() -> Result<Self> {
        Self::load_with(&StdEnvSource)
    }

    /// Load configuration through a specific environment source (useful for testing)
    pub fn load_with<E: EnvSource>(env: &E) -> Result<Self> {
        sources::load_config(env)
    }

    /// Load configuration from a specific file path, then apply env overrides
    pub fn load_from_path<E: EnvSource>(path: impl AsRef<std::path::Path>, env: &E) -> Result<Self> {
        sources::load_from_file_path(path, env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_mode_from_str() {
        assert_eq!("true".parse::<EndpointMode>().unwrap(), EndpointMode::Create);
        assert_eq!("create".parse::<EndpointMode>().unwrap(), EndpointMode::Create);
        assert_eq!("false".parse::<EndpointMode>().unwrap(), EndpointMode::Reuse);
        assert_eq!("reuse".parse::<EndpointMode>().unwrap(), EndpointMode::Reuse);
        assert_eq!("auto".parse::<EndpointMode>().unwrap(), EndpointMode::Auto);
        assert!("maybe".parse::<EndpointMode>().is_err());
    }

    #[test]
    fn default_configs() {
        let config = DeployConfig::default();
        assert_eq!(config.aws.region, DEFAULT_REGION);
        assert_eq!(config.aws.profile, DEFAULT_PROFILE);
        assert_eq!(config.api.stack_name, "sesslog-api");
        assert_eq!(config.vpc.stack_name, "sesslog-vpc");
        assert_eq!(config.vpc.s3_endpoint.mode, EndpointMode::Auto);
        assert!(config.vpc.s3_endpoint.id.is_none());
    }

    #[test]
    fn vpc_validation_requires_network_ids() {
        let mut config = VpcStackConfig::default();
        assert!(config.validate().is_err());

        config.vpc_id = "vpc-0123".to_string();
        assert!(config.validate().is_err());

        config.subnet_ids = "subnet-1,subnet-2".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn api_validation_accepts_defaults() {
        assert!(ApiStackConfig::default().validate().is_ok());

        let mut config = ApiStackConfig::default();
        config.function_name.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_round_trip() {
        let raw = r#"
            [aws]
            region = "us-west-2"
            profile = "deploy"

            [vpc]
            stack_name = "sesslog-vpc"
            template = "infra/vpc-template.yaml"
            function_name = "sesslog-ingest"
            vpc_id = "vpc-abc"
            subnet_ids = "subnet-1,subnet-2"

            [vpc.s3_endpoint]
            mode = "reuse"
            id = "vpce-123"
        "#;
        let config: DeployConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.aws.region, "us-west-2");
        assert_eq!(config.vpc.s3_endpoint.mode, EndpointMode::Reuse);
        assert_eq!(config.vpc.s3_endpoint.id.as_deref(), Some("vpce-123"));
        // unset sections fall back to defaults
        assert_eq!(config.api.stack_name, "sesslog-api");
        assert_eq!(config.vpc.ssm_endpoint.mode, EndpointMode::Auto);
    }
}
