use vmfleet_core::config::ToolSettings;

use crate::ansible::AnsiblePlaybook;
use crate::pvesh::Pvesh;
use crate::terraform::Terraform;

/// The host-backed tool set used by a real run.
pub struct RuntimeTools {
    pub provisioner: Terraform,
    pub configurator: AnsiblePlaybook,
    pub lookup: Pvesh,
}

impl RuntimeTools {
    pub fn from_settings(tools: &ToolSettings) -> Self {
        Self {
            provisioner: Terraform::new(&tools.terraform, tools.timeout_secs),
            configurator: AnsiblePlaybook::new(&tools.ansible_playbook, tools.timeout_secs),
            lookup: Pvesh::new(&tools.pvesh, tools.timeout_secs),
        }
    }
}
