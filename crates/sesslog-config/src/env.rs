use crate::{DeployConfig, EndpointMode};
use anyhow::{anyhow, Result};

pub const ENV_PREFIX: &str = "SESSLOG_";

/// Abstraction over environment-variable lookups so configuration can be
/// driven by a fake source in tests.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;

    /// Get an environment variable WITHOUT the SESSLOG_ prefix.
    /// Used for AWS standard variables (AWS_REGION, AWS_PROFILE).
    fn get_raw(&self, key: &str) -> Option<String>;
}

/// Environment source backed by the process environment
pub struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }

    fn get_raw(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Apply environment-variable overrides (highest priority) to the config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut DeployConfig, env: &E) -> Result<()> {
    // Region/profile selectors: prefixed variables win, AWS standard
    // variables act as fallback.
    if let Some(region) = env.get("REGION") {
        config.aws.region = region;
    } else if let Some(region) = env.get_raw("AWS_REGION") {
        config.aws.region = region;
    }
    if let Some(profile) = env.get("PROFILE") {
        config.aws.profile = profile;
    } else if let Some(profile) = env.get_raw("AWS_PROFILE") {
        config.aws.profile = profile;
    }

    // Shared between both stacks
    if let Some(name) = env.get("FUNCTION_NAME") {
        config.api.function_name = name.clone();
        config.vpc.function_name = name;
    }

    // API stack
    if let Some(name) = env.get("API_STACK_NAME") {
        config.api.stack_name = name;
    }
    if let Some(template) = env.get("API_TEMPLATE") {
        config.api.template = template;
    }
    if let Some(statement_id) = env.get("STATEMENT_ID") {
        config.api.invoke_statement_id = statement_id;
    }
    if let Some(cidrs) = env.get("ALLOWED_CIDRS") {
        config.api.allowed_cidrs = cidrs;
    }

    // VPC stack
    if let Some(name) = env.get("VPC_STACK_NAME") {
        config.vpc.stack_name = name;
    }
    if let Some(template) = env.get("VPC_TEMPLATE") {
        config.vpc.template = template;
    }
    if let Some(vpc_id) = env.get("VPC_ID") {
        config.vpc.vpc_id = vpc_id;
    }
    if let Some(subnet_ids) = env.get("SUBNET_IDS") {
        config.vpc.subnet_ids = subnet_ids;
    }
    if let Some(mode) = get_env_mode(env, "CREATE_S3_ENDPOINT")? {
        config.vpc.s3_endpoint.mode = mode;
    }
    if let Some(id) = env.get("S3_ENDPOINT_ID") {
        config.vpc.s3_endpoint.id = non_empty(id);
    }
    if let Some(mode) = get_env_mode(env, "CREATE_SSM_ENDPOINT")? {
        config.vpc.ssm_endpoint.mode = mode;
    }
    if let Some(id) = env.get("SSM_ENDPOINT_ID") {
        config.vpc.ssm_endpoint.id = non_empty(id);
    }

    Ok(())
}

fn get_env_mode<E: EnvSource>(env: &E, key: &str) -> Result<Option<EndpointMode>> {
    match env.get(key) {
        Some(val) => {
            let parsed = val
                .parse::<EndpointMode>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
