use serde::{Deserialize, Serialize};

use crate::error::{DeployError, DeployResult};
use crate::naming;

/// Lifecycle of one VM within a batch. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Pending,
    Provisioned,
    Configured,
    Failed,
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Provisioned => write!(f, "provisioned"),
            Self::Configured => write!(f, "configured"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl DeploymentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Configured | Self::Failed)
    }
}

/// Validate that a status transition is allowed.
pub fn validate_transition(from: DeploymentStatus, to: DeploymentStatus) -> DeployResult<()> {
    let valid = matches!(
        (from, to),
        (DeploymentStatus::Pending, DeploymentStatus::Provisioned)
            | (DeploymentStatus::Provisioned, DeploymentStatus::Configured)
            | (DeploymentStatus::Pending, DeploymentStatus::Failed)
            | (DeploymentStatus::Provisioned, DeploymentStatus::Failed)
    );
    if valid {
        Ok(())
    } else {
        Err(DeployError::InvalidTransition { from, to })
    }
}

/// One (user, template) VM created by the pipeline for a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmDeployment {
    pub username: String,
    pub template: String,
    pub vm_id: u32,
    pub node: String,
    pub ip_address: Option<String>,
    pub status: DeploymentStatus,
}

impl VmDeployment {
    pub fn new(username: &str, template: &str, vm_id: u32, node: &str) -> Self {
        Self {
            username: username.to_string(),
            template: template.to_string(),
            vm_id,
            node: node.to_string(),
            ip_address: None,
            status: DeploymentStatus::Pending,
        }
    }

    pub fn key(&self) -> String {
        naming::vm_key(&self.username, &self.template)
    }

    pub fn advance(&mut self, to: DeploymentStatus) -> DeployResult<()> {
        validate_transition(self.status, to)?;
        self.status = to;
        Ok(())
    }

    /// Mark as failed unless already terminal. Returns whether it changed.
    pub fn mark_failed(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = DeploymentStatus::Failed;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DeploymentStatus::*;

    #[test]
    fn test_forward_transitions() {
        assert!(validate_transition(Pending, Provisioned).is_ok());
        assert!(validate_transition(Provisioned, Configured).is_ok());
        assert!(validate_transition(Pending, Failed).is_ok());
        assert!(validate_transition(Provisioned, Failed).is_ok());
    }

    #[test]
    fn test_no_reverts_or_skips() {
        assert!(validate_transition(Provisioned, Pending).is_err());
        assert!(validate_transition(Configured, Provisioned).is_err());
        assert!(validate_transition(Failed, Pending).is_err());
        assert!(validate_transition(Pending, Configured).is_err());
        assert!(validate_transition(Configured, Failed).is_err());
    }

    #[test]
    fn test_advance_and_mark_failed() {
        let mut d = VmDeployment::new("jdoe", "ubuntu", 501, "pve1");
        assert_eq!(d.key(), "jdoe_ubuntu");
        d.advance(Provisioned).unwrap();
        assert!(d.advance(Pending).is_err());
        assert_eq!(d.status, Provisioned);
        assert!(d.mark_failed());
        assert_eq!(d.status, Failed);
        assert!(!d.mark_failed());
    }

    #[test]
    fn test_configured_is_not_failed_afterwards() {
        let mut d = VmDeployment::new("jdoe", "ubuntu", 501, "pve1");
        d.advance(Provisioned).unwrap();
        d.advance(Configured).unwrap();
        assert!(!d.mark_failed());
        assert_eq!(d.status, Configured);
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(serde_json::to_string(&Provisioned).unwrap(), "\"provisioned\"");
        assert_eq!(Failed.to_string(), "failed");
    }
}
