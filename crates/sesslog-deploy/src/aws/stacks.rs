use async_trait::async_trait;
use aws_sdk_cloudformation::error::DisplayErrorContext;
use sesslog_config::AwsSettings;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{DeployError, Result};
use crate::lifecycle::{DeployRequest, StackOps};

const DELETE_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DELETE_POLL_ATTEMPTS: usize = 60;

/// Stack operations backed by CloudFormation (status, cleanup) and the SAM
/// CLI (deploy, delete).
pub struct SamStackOps {
    cfn: aws_sdk_cloudformation::Client,
    region: String,
    profile: String,
}

impl SamStackOps {
    pub fn new(config: &aws_config::SdkConfig, settings: &AwsSettings) -> Self {
        Self {
            cfn: aws_sdk_cloudformation::Client::new(config),
            region: settings.region.clone(),
            profile: settings.profile.clone(),
        }
    }
}

#[async_trait]
impl StackOps for SamStackOps {
    async fn status(&self, stack_name: &str) -> Result<Option<String>> {
        match self
            .cfn
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await
        {
            Ok(response) => Ok(response
                .stacks()
                .first()
                .and_then(|stack| stack.stack_status())
                .map(|status| status.as_str().to_string())),
            Err(err) => {
                // DescribeStacks fails for unknown stacks; either way there
                // is nothing to clean up.
                debug!(
                    stack = stack_name,
                    error = %DisplayErrorContext(&err),
                    "describe_stacks failed; treating stack as absent"
                );
                Ok(None)
            }
        }
    }

    async fn force_delete(&self, stack_name: &str) -> Result<()> {
        warn!(stack = stack_name, "deleting stuck stack");

        self.cfn
            .delete_stack()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|err| {
                DeployError::external(
                    "cloudformation:DeleteStack",
                    None,
                    DisplayErrorContext(&err).to_string(),
                )
            })?;

        // Wait until the stack is gone before continuing
        let mut attempts = 0;
        loop {
            match self.status(stack_name).await? {
                None => break,
                Some(status) if status == "DELETE_COMPLETE" => break,
                Some(status) if status == "DELETE_FAILED" => {
                    return Err(DeployError::external(
                        "cloudformation:DeleteStack",
                        None,
                        format!("stack {} entered DELETE_FAILED during cleanup", stack_name),
                    ));
                }
                Some(status) => {
                    attempts += 1;
                    if attempts > DELETE_POLL_ATTEMPTS {
                        return Err(DeployError::external(
                            "cloudformation:DeleteStack",
                            None,
                            format!(
                                "timed out waiting for stack {} to delete (last status {})",
                                stack_name, status
                            ),
                        ));
                    }
                    debug!(stack = stack_name, status = %status, "waiting for stack deletion");
                    tokio::time::sleep(DELETE_POLL_INTERVAL).await;
                }
            }
        }

        info!(stack = stack_name, "stuck stack deleted");
        Ok(())
    }

    async fn deploy(&self, request: &DeployRequest<'_>) -> Result<()> {
        let mut command = Command::new("sam");
        command.args([
            "deploy",
            "--template-file",
            request.template,
            "--stack-name",
            request.stack_name,
            "--region",
            &self.region,
            "--profile",
            &self.profile,
            "--capabilities",
            "CAPABILITY_IAM",
            "--resolve-s3",
            "--no-confirm-changeset",
            "--no-fail-on-empty-changeset",
        ]);

        let overrides = request.parameters.to_overrides();
        if !overrides.is_empty() {
            command.arg("--parameter-overrides");
            command.args(&overrides);
        }
        command.args(request.extra_args);

        run_tool(command, "sam deploy").await
    }

    async fn delete(&self, stack_name: &str, extra_args: &[String]) -> Result<()> {
        let mut command = Command::new("sam");
        command.args([
            "delete",
            "--stack-name",
            stack_name,
            "--region",
            &self.region,
            "--profile",
            &self.profile,
            "--no-prompts",
        ]);
        command.args(extra_args);

        run_tool(command, "sam delete").await
    }
}

/// Run an external tool with inherited stdio, propagating its exit status.
async fn run_tool(mut command: Command, tool: &str) -> Result<()> {
    info!("running {}", tool);

    let status = command
        .status()
        .await
        .map_err(|err| DeployError::external(tool, None, format!("failed to launch: {}", err)))?;

    if status.success() {
        Ok(())
    } else {
        Err(DeployError::external(
            tool,
            status.code(),
            "exited with failure".to_string(),
        ))
    }
}
