use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;

/// Read-only query for VM identifiers already in use on a cluster node.
pub trait VmIdLookup {
    fn existing_ids(&self, node: &str) -> Result<BTreeSet<u32>>;
}

/// The infrastructure provisioning tool, driven against a batch directory.
///
/// vmfleet-deploy depends on vmfleet-core only. The CLI passes in the
/// Terraform implementation from vmfleet-runtime.
pub trait ProvisioningTool {
    fn init(&self, dir: &Path) -> Result<()>;

    fn plan(&self, dir: &Path) -> Result<()>;

    fn apply(&self, dir: &Path) -> Result<()>;

    /// Structured outputs after a successful apply.
    fn outputs(&self, dir: &Path) -> Result<serde_json::Value>;
}

/// The configuration-management tool.
pub trait ConfigurationTool {
    /// Run one playbook against an inventory. `batch_dir` is passed to the
    /// playbook as an extra variable.
    fn run_playbook(&self, inventory: &Path, playbook: &Path, batch_dir: &Path) -> Result<()>;
}
