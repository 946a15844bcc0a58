use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, warn};
use vmfleet_core::config::ToolSettings;

/// Availability of one external tool on this host.
#[derive(Debug, Clone)]
pub struct ToolCheck {
    pub role: &'static str,
    pub bin: String,
    pub path: Option<PathBuf>,
    /// Without it no batch can succeed.
    pub required: bool,
}

impl ToolCheck {
    fn locate(role: &'static str, bin: &str, required: bool) -> Self {
        let path = which::which(bin).ok();
        debug!(role, bin, found = ?path, "tool lookup");
        Self {
            role,
            bin: bin.to_string(),
            path,
            required,
        }
    }

    pub fn found(&self) -> bool {
        self.path.is_some()
    }
}

/// Look up every configured tool on `PATH`.
///
/// The identifier query is best-effort, so a missing `pvesh` is only a
/// warning.
pub fn check_tools(tools: &ToolSettings) -> Vec<ToolCheck> {
    let mut checks = vec![
        ToolCheck::locate("provisioning", &tools.terraform, true),
        ToolCheck::locate("configuration", &tools.ansible_playbook, true),
        ToolCheck::locate("identifier query", &tools.pvesh, false),
    ];
    if tools.timeout_secs.is_some() {
        checks.push(ToolCheck::locate("timeout wrapper", "timeout", true));
    }
    checks
}

/// Fail if any required tool is missing; warn about optional ones.
pub fn ensure_tools(checks: &[ToolCheck]) -> Result<()> {
    let mut missing = Vec::new();
    for check in checks.iter().filter(|c| !c.found()) {
        if check.required {
            missing.push(format!("{} ({})", check.bin, check.role));
        } else {
            warn!(bin = %check.bin, role = check.role, "optional tool not found");
        }
    }
    if !missing.is_empty() {
        anyhow::bail!("Required tools not found in PATH: {}", missing.join(", "));
    }
    Ok(())
}
