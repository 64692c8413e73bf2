use async_trait::async_trait;
use aws_sdk_ec2::error::DisplayErrorContext;
use aws_sdk_ec2::types::Filter;
use tracing::debug;

use crate::error::{DeployError, Result};
use crate::resolve::{EndpointKind, Inventory};

/// VPC endpoint discovery backed by EC2 DescribeVpcEndpoints
pub struct Ec2Inventory {
    client: aws_sdk_ec2::Client,
}

impl Ec2Inventory {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_ec2::Client::new(config),
        }
    }
}

#[async_trait]
impl Inventory for Ec2Inventory {
    async fn find_vpc_endpoint(
        &self,
        vpc_id: &str,
        service_name: &str,
        kind: EndpointKind,
    ) -> Result<Option<String>> {
        let response = self
            .client
            .describe_vpc_endpoints()
            .filters(Filter::builder().name("vpc-id").values(vpc_id).build())
            .filters(
                Filter::builder()
                    .name("service-name")
                    .values(service_name)
                    .build(),
            )
            .filters(
                Filter::builder()
                    .name("vpc-endpoint-type")
                    .values(kind.as_str())
                    .build(),
            )
            .send()
            .await
            .map_err(|err| {
                DeployError::external(
                    "ec2:DescribeVpcEndpoints",
                    None,
                    DisplayErrorContext(&err).to_string(),
                )
            })?;

        let endpoints = response.vpc_endpoints();
        if endpoints.len() > 1 {
            debug!(
                service_name,
                count = endpoints.len(),
                "multiple matching endpoints; using the first"
            );
        }

        Ok(endpoints
            .first()
            .and_then(|endpoint| endpoint.vpc_endpoint_id())
            .map(str::to_string))
    }
}
