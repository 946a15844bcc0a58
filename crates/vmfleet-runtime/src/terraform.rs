use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;
use vmfleet_core::deploy_env::ProvisioningTool;

use crate::shell::HostCommand;

/// Saved plan file inside the batch directory.
pub const PLAN_FILE: &str = "tfplan";

/// [`ProvisioningTool`] backed by the Terraform CLI.
pub struct Terraform {
    bin: String,
    timeout_secs: Option<u64>,
}

impl Terraform {
    pub fn new(bin: &str, timeout_secs: Option<u64>) -> Self {
        Self {
            bin: bin.to_string(),
            timeout_secs,
        }
    }

    fn command(&self, dir: &Path, args: &[&str]) -> HostCommand {
        HostCommand::new(&self.bin)
            .args(args)
            .current_dir(dir)
            .timeout(self.timeout_secs)
    }
}

impl ProvisioningTool for Terraform {
    fn init(&self, dir: &Path) -> Result<()> {
        self.command(dir, &["init", "-input=false", "-no-color"]).run()?;
        info!(dir = %dir.display(), "terraform init succeeded");
        Ok(())
    }

    fn plan(&self, dir: &Path) -> Result<()> {
        let out = format!("-out={}", PLAN_FILE);
        self.command(dir, &["plan", "-input=false", "-no-color", out.as_str()])
            .run()?;
        info!(dir = %dir.display(), "terraform plan succeeded");
        Ok(())
    }

    fn apply(&self, dir: &Path) -> Result<()> {
        self.command(dir, &["apply", "-input=false", "-no-color", PLAN_FILE])
            .run()?;
        info!(dir = %dir.display(), "terraform apply succeeded");
        Ok(())
    }

    fn outputs(&self, dir: &Path) -> Result<Value> {
        let stdout = self.command(dir, &["output", "-json"]).run()?;
        serde_json::from_str(&stdout).context("terraform output is not valid JSON")
    }
}
