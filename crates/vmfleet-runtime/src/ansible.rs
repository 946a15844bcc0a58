use std::path::Path;

use anyhow::Result;
use tracing::info;
use vmfleet_core::deploy_env::ConfigurationTool;

use crate::shell::HostCommand;

/// [`ConfigurationTool`] backed by `ansible-playbook`.
pub struct AnsiblePlaybook {
    bin: String,
    timeout_secs: Option<u64>,
}

impl AnsiblePlaybook {
    pub fn new(bin: &str, timeout_secs: Option<u64>) -> Self {
        Self {
            bin: bin.to_string(),
            timeout_secs,
        }
    }

    fn command(&self, inventory: &Path, playbook: &Path, batch_dir: &Path) -> HostCommand {
        HostCommand::new(&self.bin)
            .arg("-i")
            .arg(inventory.to_string_lossy())
            .arg(playbook.to_string_lossy())
            .arg("--extra-vars")
            .arg(format!("batch_dir={}", batch_dir.display()))
            .timeout(self.timeout_secs)
    }
}

impl ConfigurationTool for AnsiblePlaybook {
    fn run_playbook(&self, inventory: &Path, playbook: &Path, batch_dir: &Path) -> Result<()> {
        self.command(inventory, playbook, batch_dir).run()?;
        info!(playbook = %playbook.display(), "ansible-playbook finished");
        Ok(())
    }
}
