//! Error types for the deploy drivers

use thiserror::Error;

/// Errors that can occur while driving a stack deployment
#[derive(Debug, Error)]
pub enum DeployError {
    /// Malformed or unknown top-level command
    #[error("{0}")]
    Usage(String),

    /// A create toggle forbids creation but no identifier is resolvable
    #[error("no {label} available: creation is disabled and discovery found none; set {option} or allow creation")]
    MissingEndpointId {
        /// What the missing identifier names
        label: String,
        /// The environment option the caller must supply
        option: String,
    },

    /// Configuration is present but invalid
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An external call failed; the exit status is propagated unchanged
    #[error("{tool} failed: {message}")]
    External {
        tool: String,
        code: Option<i32>,
        message: String,
    },
}

impl DeployError {
    pub fn missing_endpoint_id(label: &str, option: &str) -> Self {
        Self::MissingEndpointId {
            label: label.to_string(),
            option: option.to_string(),
        }
    }

    pub fn external(tool: &str, code: Option<i32>, message: impl Into<String>) -> Self {
        Self::External {
            tool: tool.to_string(),
            code,
            message: message.into(),
        }
    }

    /// Process exit status for this error: 1 for usage and external
    /// failures (external status propagated when known), 2 for
    /// configuration errors.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 1,
            Self::MissingEndpointId { .. } | Self::InvalidConfig(_) => 2,
            Self::External { code, .. } => code.unwrap_or(1),
        }
    }
}

/// Result type alias for DeployError
pub type Result<T> = std::result::Result<T, DeployError>;
