use thiserror::Error;

use crate::deployment::DeploymentStatus;

/// Failure taxonomy for a deployment run.
///
/// `Configuration` is fatal and aborts before any batch starts. Every other
/// variant is raised inside a batch and converted into a failed batch result
/// at the pipeline boundary.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("existing VM identifier query failed on node(s): {}", .nodes.join(", "))]
    IdentifierQueryDegraded { nodes: Vec<String> },

    #[error("identifier space exhausted allocating {count} IDs from {floor}")]
    IdentifierSpaceExhausted { floor: u32, count: usize },

    #[error("descriptor generation failed: {0}")]
    Descriptor(String),

    #[error("provisioning step '{step}' failed: {message}")]
    Provisioning { step: String, message: String },

    #[error("inventory derivation failed: {0}")]
    InventoryDerivation(String),

    #[error("playbook '{playbook}' failed: {message}")]
    ConfigurationFailure { playbook: String, message: String },

    #[error("invalid deployment transition: {from} -> {to}")]
    InvalidTransition {
        from: DeploymentStatus,
        to: DeploymentStatus,
    },
}

impl DeployError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Whether this error aborts the whole run rather than a single batch.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

pub type DeployResult<T> = Result<T, DeployError>;
