//! Prerequisite resolution for managed network endpoints and the API
//! Gateway invoke permission.
//!
//! For each optional endpoint the resolver decides whether an existing
//! instance is reused, a new one must be created, or the configuration is
//! fatally inconsistent. External inventories are injected as traits so the
//! resolver is testable without touching AWS.

use async_trait::async_trait;
use sesslog_config::EndpointMode;
use tracing::{info, warn};

use crate::error::{DeployError, Result};

/// VPC endpoint provisioning kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    Gateway,
    Interface,
}

impl EndpointKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EndpointKind::Gateway => "Gateway",
            EndpointKind::Interface => "Interface",
        }
    }
}

/// Declarative intent for one managed endpoint
#[derive(Debug, Clone)]
pub struct EndpointRequest {
    /// Human-readable name used in logs and error messages
    pub label: &'static str,
    /// Environment option the caller must supply when reuse fails
    pub env_option: &'static str,
    pub vpc_id: String,
    pub service_name: String,
    pub kind: EndpointKind,
    pub mode: EndpointMode,
    pub explicit_id: Option<String>,
}

/// Outcome of prerequisite resolution for one endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedEndpoint {
    /// The stack creates a new endpoint
    Create,
    /// An existing endpoint (explicit or discovered) is reused
    Reuse(String),
}

/// Read-only inventory of existing VPC endpoints
#[async_trait]
pub trait Inventory: Send + Sync {
    /// Look up an existing endpoint by owning VPC, service identity, and
    /// kind. Returns zero-or-one matching endpoint id.
    async fn find_vpc_endpoint(
        &self,
        vpc_id: &str,
        service_name: &str,
        kind: EndpointKind,
    ) -> Result<Option<String>>;
}

/// Function resource-policy queries and grants
#[async_trait]
pub trait InvokePermissions: Send + Sync {
    async fn statement_exists(&self, function_name: &str, statement_id: &str) -> Result<bool>;

    async fn grant_invoke(&self, function_name: &str, statement_id: &str) -> Result<()>;
}

/// Resolve one endpoint request to a reuse-or-create outcome.
///
/// An explicit identifier always wins and skips discovery. Otherwise a
/// discovery lookup runs; an unset mode resolves to reuse when discovery
/// found a match and to create otherwise. Reuse with no identifier at all is
/// a configuration error naming the option to set.
pub async fn resolve_endpoint(
    request: &EndpointRequest,
    inventory: &dyn Inventory,
) -> Result<ResolvedEndpoint> {
    if let Some(id) = request.explicit_id.as_deref().filter(|id| !id.is_empty()) {
        info!(endpoint = request.label, id = %id, "using explicitly configured endpoint");
        return Ok(ResolvedEndpoint::Reuse(id.to_string()));
    }

    let discovered = inventory
        .find_vpc_endpoint(&request.vpc_id, &request.service_name, request.kind)
        .await?;

    let create = match request.mode {
        EndpointMode::Create => true,
        EndpointMode::Reuse => false,
        EndpointMode::Auto => discovered.is_none(),
    };

    if create {
        info!(endpoint = request.label, "no reusable endpoint; the stack will create one");
        return Ok(ResolvedEndpoint::Create);
    }

    match discovered {
        Some(id) => {
            info!(endpoint = request.label, id = %id, "reusing discovered endpoint");
            Ok(ResolvedEndpoint::Reuse(id))
        }
        None => Err(DeployError::missing_endpoint_id(
            request.label,
            request.env_option,
        )),
    }
}

/// Ensure the API Gateway invoke permission exists on the ingest function.
///
/// The check is existence-only, keyed by the statement id. A failed grant is
/// tolerated: the common cause is a concurrent deploy that granted it first,
/// and the desired end state was already checked.
pub async fn ensure_invoke_permission(
    function_name: &str,
    statement_id: &str,
    permissions: &dyn InvokePermissions,
) -> Result<()> {
    if permissions
        .statement_exists(function_name, statement_id)
        .await?
    {
        info!(statement_id, "invoke permission already granted; skipping");
        return Ok(());
    }

    info!(statement_id, function_name, "granting invoke permission");
    if let Err(err) = permissions.grant_invoke(function_name, statement_id).await {
        warn!(
            statement_id,
            error = %err,
            "invoke permission grant failed; assuming another deploy granted it"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeInventory {
        endpoint: Option<String>,
        lookups: AtomicUsize,
    }

    impl FakeInventory {
        fn with(endpoint: Option<&str>) -> Self {
            Self {
                endpoint: endpoint.map(str::to_string),
                lookups: AtomicUsize::new(0),
            }
        }

        fn lookup_count(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Inventory for FakeInventory {
        async fn find_vpc_endpoint(
            &self,
            _vpc_id: &str,
            _service_name: &str,
            _kind: EndpointKind,
        ) -> Result<Option<String>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.endpoint.clone())
        }
    }

    fn request(mode: EndpointMode, explicit_id: Option<&str>) -> EndpointRequest {
        EndpointRequest {
            label: "S3 gateway endpoint id",
            env_option: "SESSLOG_S3_ENDPOINT_ID",
            vpc_id: "vpc-1".to_string(),
            service_name: "com.amazonaws.ap-northeast-1.s3".to_string(),
            kind: EndpointKind::Gateway,
            mode,
            explicit_id: explicit_id.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn explicit_id_wins_without_discovery() {
        let inventory = FakeInventory::with(Some("vpce-other"));
        let resolved = resolve_endpoint(&request(EndpointMode::Auto, Some("vpce-123")), &inventory)
            .await
            .unwrap();
        assert_eq!(resolved, ResolvedEndpoint::Reuse("vpce-123".to_string()));
        assert_eq!(inventory.lookup_count(), 0);
    }

    #[tokio::test]
    async fn auto_reuses_a_discovered_endpoint() {
        let inventory = FakeInventory::with(Some("vpce-abc"));
        let resolved = resolve_endpoint(&request(EndpointMode::Auto, None), &inventory)
            .await
            .unwrap();
        assert_eq!(resolved, ResolvedEndpoint::Reuse("vpce-abc".to_string()));
        assert_eq!(inventory.lookup_count(), 1);
    }

    #[tokio::test]
    async fn auto_creates_when_discovery_finds_nothing() {
        let inventory = FakeInventory::with(None);
        let resolved = resolve_endpoint(&request(EndpointMode::Auto, None), &inventory)
            .await
            .unwrap();
        assert_eq!(resolved, ResolvedEndpoint::Create);
    }

    #[tokio::test]
    async fn reuse_without_any_identifier_is_a_configuration_error() {
        let inventory = FakeInventory::with(None);
        let err = resolve_endpoint(&request(EndpointMode::Reuse, None), &inventory)
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        let msg = err.to_string();
        assert!(msg.contains("SESSLOG_S3_ENDPOINT_ID"));
    }

    #[tokio::test]
    async fn reuse_accepts_a_discovered_endpoint() {
        let inventory = FakeInventory::with(Some("vpce-xyz"));
        let resolved = resolve_endpoint(&request(EndpointMode::Reuse, None), &inventory)
            .await
            .unwrap();
        assert_eq!(resolved, ResolvedEndpoint::Reuse("vpce-xyz".to_string()));
    }

    #[tokio::test]
    async fn create_mode_ignores_discovered_endpoints() {
        let inventory = FakeInventory::with(Some("vpce-existing"));
        let resolved = resolve_endpoint(&request(EndpointMode::Create, None), &inventory)
            .await
            .unwrap();
        assert_eq!(resolved, ResolvedEndpoint::Create);
    }

    struct FakePermissions {
        exists: bool,
        grant_fails: bool,
        grants: AtomicUsize,
    }

    impl FakePermissions {
        fn new(exists: bool, grant_fails: bool) -> Self {
            Self {
                exists,
                grant_fails,
                grants: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl InvokePermissions for FakePermissions {
        async fn statement_exists(&self, _function: &str, _statement_id: &str) -> Result<bool> {
            Ok(self.exists)
        }

        async fn grant_invoke(&self, _function: &str, _statement_id: &str) -> Result<()> {
            self.grants.fetch_add(1, Ordering::SeqCst);
            if self.grant_fails {
                Err(DeployError::external(
                    "lambda:AddPermission",
                    None,
                    "statement already exists",
                ))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn existing_statement_skips_the_grant() {
        let permissions = FakePermissions::new(true, false);
        ensure_invoke_permission("fn", "sid", &permissions).await.unwrap();
        assert_eq!(permissions.grants.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_statement_is_granted() {
        let permissions = FakePermissions::new(false, false);
        ensure_invoke_permission("fn", "sid", &permissions).await.unwrap();
        assert_eq!(permissions.grants.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn grant_race_is_tolerated() {
        let permissions = FakePermissions::new(false, true);
        assert!(ensure_invoke_permission("fn", "sid", &permissions).await.is_ok());
        assert_eq!(permissions.grants.load(Ordering::SeqCst), 1);
    }
}
