//! AWS-backed implementations of the deploy collaborators
//!
//! Discovery and permission checks go through the AWS SDK; the deploy and
//! delete calls shell out to the SAM CLI, which owns packaging and
//! changeset handling.

use aws_config::{BehaviorVersion, Region};
use sesslog_config::AwsSettings;

mod inventory;
mod permissions;
mod stacks;

pub use inventory::Ec2Inventory;
pub use permissions::LambdaPermissions;
pub use stacks::SamStackOps;

/// Load the shared SDK config for the configured region and profile.
pub async fn sdk_config(settings: &AwsSettings) -> aws_config::SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(settings.region.clone()))
        .profile_name(&settings.profile)
        .load()
        .await
}
