use std::collections::BTreeSet;

use anyhow::{Context, Result};
use serde_json::Value;
use vmfleet_core::deploy_env::VmIdLookup;

use crate::shell::HostCommand;

/// [`VmIdLookup`] against the Proxmox API via `pvesh`.
pub struct Pvesh {
    bin: String,
    timeout_secs: Option<u64>,
}

impl Pvesh {
    pub fn new(bin: &str, timeout_secs: Option<u64>) -> Self {
        Self {
            bin: bin.to_string(),
            timeout_secs,
        }
    }
}

impl VmIdLookup for Pvesh {
    fn existing_ids(&self, node: &str) -> Result<BTreeSet<u32>> {
        let path = format!("/nodes/{}/qemu", node);
        let stdout = HostCommand::new(&self.bin)
            .args(["get", path.as_str(), "--output-format", "json"])
            .timeout(self.timeout_secs)
            .run()?;
        parse_vmids(&stdout).with_context(|| format!("Unexpected pvesh output for node {}", node))
    }
}

/// Collect `vmid` from every entry of a `pvesh get .../qemu` listing.
///
/// `vmid` arrives as a number or a numeric string depending on the API
/// version.
pub fn parse_vmids(json: &str) -> Result<BTreeSet<u32>> {
    let entries: Vec<Value> = serde_json::from_str(json)?;
    entries
        .iter()
        .map(|vm| {
            let id = match vm.get("vmid") {
                Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
                Some(Value::String(s)) => s.parse().ok(),
                _ => None,
            };
            id.with_context(|| format!("entry without a valid vmid: {}", vm))
        })
        .collect()
}
