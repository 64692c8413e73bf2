// Deployment drivers for the sesslog stacks
//
// Two entry points share this crate: `sesslog-deploy-api` (API gateway
// fronting the ingest function) and `sesslog-deploy-vpc` (ingest function
// with its VPC endpoints). Each invocation prepares a parameter set and
// prerequisite state, then delegates to the SAM CLI.
//
// Exit codes: 0 success; 1 usage error or external-tool failure (the tool's
// own status is propagated when known); 2 configuration error.

pub mod aws;
pub mod error;
pub mod lifecycle;
pub mod params;
pub mod resolve;

pub use error::DeployError;

/// Initialize tracing from RUST_LOG, defaulting to info.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    // Try to set the global subscriber; ignore error if already set (idempotent)
    let _ = tracing::subscriber::set_global_default(registry.with(fmt::layer()));
}
