use async_trait::async_trait;
use aws_sdk_lambda::error::DisplayErrorContext;
use tracing::debug;

use crate::error::{DeployError, Result};
use crate::resolve::InvokePermissions;

/// Function resource-policy access backed by Lambda GetPolicy/AddPermission
pub struct LambdaPermissions {
    client: aws_sdk_lambda::Client,
}

impl LambdaPermissions {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_lambda::Client::new(config),
        }
    }
}

#[async_trait]
impl InvokePermissions for LambdaPermissions {
    async fn statement_exists(&self, function_name: &str, statement_id: &str) -> Result<bool> {
        let response = match self
            .client
            .get_policy()
            .function_name(function_name)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                let service_err = err.into_service_error();
                // No policy document at all means no statements
                if service_err.is_resource_not_found_exception() {
                    debug!(function_name, "function has no resource policy yet");
                    return Ok(false);
                }
                return Err(DeployError::external(
                    "lambda:GetPolicy",
                    None,
                    DisplayErrorContext(&service_err).to_string(),
                ));
            }
        };

        let Some(document) = response.policy() else {
            return Ok(false);
        };

        Ok(policy_contains_statement(document, statement_id))
    }

    async fn grant_invoke(&self, function_name: &str, statement_id: &str) -> Result<()> {
        self.client
            .add_permission()
            .function_name(function_name)
            .statement_id(statement_id)
            .action("lambda:InvokeFunction")
            .principal("apigateway.amazonaws.com")
            .send()
            .await
            .map_err(|err| {
                DeployError::external(
                    "lambda:AddPermission",
                    None,
                    DisplayErrorContext(&err).to_string(),
                )
            })?;
        Ok(())
    }
}

/// Check a resource-policy document for a statement id.
fn policy_contains_statement(document: &str, statement_id: &str) -> bool {
    let Ok(parsed) = serde_json::from_str::<serde_json::Value>(document) else {
        return false;
    };
    parsed
        .get("Statement")
        .and_then(|statements| statements.as_array())
        .map(|statements| {
            statements
                .iter()
                .any(|statement| statement.get("Sid").and_then(|sid| sid.as_str()) == Some(statement_id))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_statement_by_sid() {
        let document = r#"{
            "Version": "2012-10-17",
            "Statement": [
                {"Sid": "other-grant", "Effect": "Allow"},
                {"Sid": "sesslog-apigw-invoke", "Effect": "Allow"}
            ]
        }"#;
        assert!(policy_contains_statement(document, "sesslog-apigw-invoke"));
        assert!(!policy_contains_statement(document, "missing-grant"));
    }

    #[test]
    fn malformed_documents_contain_nothing() {
        assert!(!policy_contains_statement("not json", "sid"));
        assert!(!policy_contains_statement("{}", "sid"));
    }
}
