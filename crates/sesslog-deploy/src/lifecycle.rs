//! Stack lifecycle driver
//!
//! Per-invocation sequencing for `deploy` and `delete`: check for a stuck
//! prior deployment, resolve prerequisites, assemble parameter overrides,
//! then delegate to the external deploy/delete call. Nothing is persisted
//! between invocations.

use async_trait::async_trait;
use sesslog_config::{ApiStackConfig, EndpointOverride, VpcStackConfig};
use std::str::FromStr;
use tracing::info;

use crate::error::{DeployError, Result};
use crate::params::ParameterSet;
use crate::resolve::{
    ensure_invoke_permission, resolve_endpoint, EndpointKind, EndpointRequest, Inventory,
    InvokePermissions,
};

/// Stack status that marks a stuck prior deployment. A stack in this state
/// cannot be updated; it must be deleted before redeploying.
pub const ROLLBACK_COMPLETE: &str = "ROLLBACK_COMPLETE";

/// Top-level command for one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackCommand {
    Deploy,
    Delete,
}

impl FromStr for StackCommand {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "deploy" => Ok(StackCommand::Deploy),
            "delete" => Ok(StackCommand::Delete),
            other => Err(DeployError::Usage(format!(
                "unknown command '{}': expected 'deploy' or 'delete'",
                other
            ))),
        }
    }
}

/// One external deploy call
#[derive(Debug)]
pub struct DeployRequest<'a> {
    pub stack_name: &'a str,
    pub template: &'a str,
    pub parameters: &'a ParameterSet,
    /// Caller-supplied arguments forwarded unmodified
    pub extra_args: &'a [String],
}

/// External stack operations (status query, cleanup, deploy, delete)
#[async_trait]
pub trait StackOps: Send + Sync {
    /// Current stack status, or None when the stack does not exist.
    /// Lookup failures are reported as None: an unqueryable stack is
    /// handled the same way as an absent one.
    async fn status(&self, stack_name: &str) -> Result<Option<String>>;

    /// Destructive delete of a stuck stack; returns once the stack is gone.
    async fn force_delete(&self, stack_name: &str) -> Result<()>;

    async fn deploy(&self, request: &DeployRequest<'_>) -> Result<()>;

    async fn delete(&self, stack_name: &str, extra_args: &[String]) -> Result<()>;
}

/// Delete the stack first when a prior deployment left it in
/// ROLLBACK_COMPLETE. Returns whether a cleanup ran.
pub async fn clear_stuck_stack(stack_name: &str, stacks: &dyn StackOps) -> Result<bool> {
    match stacks.status(stack_name).await? {
        Some(status) if status == ROLLBACK_COMPLETE => {
            info!(stack = stack_name, "stack is stuck in ROLLBACK_COMPLETE; deleting it first");
            stacks.force_delete(stack_name).await?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// External collaborators for the API gateway stack
pub struct ApiStackDeps<'a> {
    pub permissions: &'a dyn InvokePermissions,
    pub stacks: &'a dyn StackOps,
}

/// Drive one `deploy` or `delete` invocation for the API gateway stack.
pub async fn run_api_stack(
    command: StackCommand,
    config: &ApiStackConfig,
    deps: ApiStackDeps<'_>,
    extra_args: &[String],
) -> Result<()> {
    let cleaned = clear_stuck_stack(&config.stack_name, deps.stacks).await?;

    match command {
        StackCommand::Deploy => {
            ensure_invoke_permission(
                &config.function_name,
                &config.invoke_statement_id,
                deps.permissions,
            )
            .await?;

            let parameters = assemble_api_parameters(config);
            deps.stacks
                .deploy(&DeployRequest {
                    stack_name: &config.stack_name,
                    template: &config.template,
                    parameters: &parameters,
                    extra_args,
                })
                .await
        }
        StackCommand::Delete => {
            if cleaned {
                info!(stack = %config.stack_name, "stack was removed during cleanup");
                return Ok(());
            }
            deps.stacks.delete(&config.stack_name, extra_args).await
        }
    }
}

/// Build the override list for the API gateway stack.
pub fn assemble_api_parameters(config: &ApiStackConfig) -> ParameterSet {
    let mut parameters = ParameterSet::new();
    parameters.push("FunctionName", config.function_name.clone());
    parameters.push_cidrs(&config.allowed_cidrs);
    parameters
}

/// External collaborators for the VPC stack
pub struct VpcStackDeps<'a> {
    pub inventory: &'a dyn Inventory,
    pub stacks: &'a dyn StackOps,
}

/// Drive one `deploy` or `delete` invocation for the VPC stack.
pub async fn run_vpc_stack(
    command: StackCommand,
    config: &VpcStackConfig,
    region: &str,
    deps: VpcStackDeps<'_>,
    extra_args: &[String],
) -> Result<()> {
    let cleaned = clear_stuck_stack(&config.stack_name, deps.stacks).await?;

    match command {
        StackCommand::Deploy => {
            let s3 = resolve_endpoint(&s3_endpoint_request(config, region), deps.inventory).await?;
            let ssm =
                resolve_endpoint(&ssm_endpoint_request(config, region), deps.inventory).await?;

            let parameters = assemble_vpc_parameters(config, &s3, &ssm);
            deps.stacks
                .deploy(&DeployRequest {
                    stack_name: &config.stack_name,
                    template: &config.template,
                    parameters: &parameters,
                    extra_args,
                })
                .await
        }
        StackCommand::Delete => {
            if cleaned {
                info!(stack = %config.stack_name, "stack was removed during cleanup");
                return Ok(());
            }
            deps.stacks.delete(&config.stack_name, extra_args).await
        }
    }
}

/// Build the override list for the VPC stack from the resolved endpoints.
pub fn assemble_vpc_parameters(
    config: &VpcStackConfig,
    s3: &crate::resolve::ResolvedEndpoint,
    ssm: &crate::resolve::ResolvedEndpoint,
) -> ParameterSet {
    let mut parameters = ParameterSet::new();
    parameters.push("FunctionName", config.function_name.clone());
    parameters.push("VpcId", config.vpc_id.clone());
    parameters.push("SubnetIds", config.subnet_ids.clone());
    parameters.push_endpoint("CreateS3Endpoint", "S3EndpointId", s3);
    parameters.push_endpoint("CreateSsmEndpoint", "SsmEndpointId", ssm);
    parameters
}

fn s3_endpoint_request(config: &VpcStackConfig, region: &str) -> EndpointRequest {
    endpoint_request(
        "S3 gateway endpoint id",
        "SESSLOG_S3_ENDPOINT_ID",
        format!("com.amazonaws.{}.s3", region),
        EndpointKind::Gateway,
        config,
        &config.s3_endpoint,
    )
}

fn ssm_endpoint_request(config: &VpcStackConfig, region: &str) -> EndpointRequest {
    endpoint_request(
        "SSM interface endpoint id",
        "SESSLOG_SSM_ENDPOINT_ID",
        format!("com.amazonaws.{}.ssm", region),
        EndpointKind::Interface,
        config,
        &config.ssm_endpoint,
    )
}

fn endpoint_request(
    label: &'static str,
    env_option: &'static str,
    service_name: String,
    kind: EndpointKind,
    config: &VpcStackConfig,
    overrides: &EndpointOverride,
) -> EndpointRequest {
    EndpointRequest {
        label,
        env_option,
        vpc_id: config.vpc_id.clone(),
        service_name,
        kind,
        mode: overrides.mode,
        explicit_id: overrides.id.clone(),
    }
}
