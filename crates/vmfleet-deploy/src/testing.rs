//! Fakes of the tool boundaries for pipeline tests.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Result, anyhow, bail};
use serde_json::{Value, json};
use vmfleet_core::config::Settings;
use vmfleet_core::deploy_env::{ConfigurationTool, ProvisioningTool, VmIdLookup};

pub(crate) struct FakeLookup {
    existing: BTreeSet<u32>,
    unreachable: Option<String>,
}

impl FakeLookup {
    pub(crate) fn with_existing(ids: &[u32]) -> Self {
        Self {
            existing: ids.iter().copied().collect(),
            unreachable: None,
        }
    }

    /// Answers for every node except `node`.
    pub(crate) fn unreachable(node: &str) -> Self {
        Self {
            existing: BTreeSet::new(),
            unreachable: Some(node.to_string()),
        }
    }
}

impl VmIdLookup for FakeLookup {
    fn existing_ids(&self, node: &str) -> Result<BTreeSet<u32>> {
        if self.unreachable.as_deref() == Some(node) {
            bail!("connection refused by {}", node);
        }
        Ok(self.existing.clone())
    }
}

fn batch_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Provisioner that "creates" whatever `main.tf` declares.
///
/// Outputs are read back from the rendered descriptor: every resource
/// `vm_<key>` yields a `vms` entry for `<key>` with an address derived from
/// its identifier. Test rosters only use names that survive that mapping.
#[derive(Default)]
pub(crate) struct FakeProvisioner {
    fail: Option<(String, String)>,
    pub(crate) calls: RefCell<Vec<String>>,
}

impl FakeProvisioner {
    pub(crate) fn failing(batch: &str, step: &str) -> Self {
        Self {
            fail: Some((batch.to_string(), step.to_string())),
            ..Self::default()
        }
    }

    fn record(&self, step: &str, dir: &Path) -> Result<()> {
        let batch = batch_name(dir);
        self.calls.borrow_mut().push(format!("{} {}", step, batch));
        match &self.fail {
            Some((b, s)) if *b == batch && s == step => bail!("{} exited with status 1", step),
            _ => Ok(()),
        }
    }
}

impl ProvisioningTool for FakeProvisioner {
    fn init(&self, dir: &Path) -> Result<()> {
        self.record("init", dir)
    }

    fn plan(&self, dir: &Path) -> Result<()> {
        self.record("plan", dir)
    }

    fn apply(&self, dir: &Path) -> Result<()> {
        self.record("apply", dir)
    }

    fn outputs(&self, dir: &Path) -> Result<Value> {
        self.record("output", dir)?;
        let main = std::fs::read_to_string(dir.join("main.tf"))?;
        let mut vms = serde_json::Map::new();
        let mut current: Option<(String, String)> = None;
        for line in main.lines().map(str::trim) {
            if let Some(rest) = line.strip_prefix("resource \"proxmox_vm_qemu\" \"vm_") {
                let key = rest.trim_end_matches(['"', '{', ' ']).to_string();
                current = Some((key, String::new()));
            } else if let Some(node) = line.strip_prefix("target_node = ") {
                if let Some((_, n)) = current.as_mut() {
                    *n = node.trim_matches('"').to_string();
                }
            } else if let Some(id) = line.strip_prefix("vmid        = ") {
                let (key, node) = current.take().ok_or_else(|| anyhow!("vmid outside resource"))?;
                let id: u32 = id.parse()?;
                vms.insert(
                    key,
                    json!({
                        "vm_id": id,
                        "node": node,
                        "ip_address": format!("10.20.{}.{}", id / 250, id % 250 + 1),
                    }),
                );
            }
        }
        Ok(json!({ "vms": { "sensitive": false, "value": vms } }))
    }
}

#[derive(Default)]
pub(crate) struct FakeConfigurator {
    fail_playbook: Option<String>,
    pub(crate) calls: RefCell<Vec<String>>,
}

impl FakeConfigurator {
    pub(crate) fn failing(playbook: &str) -> Self {
        Self {
            fail_playbook: Some(playbook.to_string()),
            ..Self::default()
        }
    }
}

impl ConfigurationTool for FakeConfigurator {
    fn run_playbook(&self, inventory: &Path, playbook: &Path, batch_dir: &Path) -> Result<()> {
        assert!(inventory.exists(), "inventory missing: {}", inventory.display());
        assert!(inventory.starts_with(batch_dir));
        let name = batch_name(playbook);
        self.calls
            .borrow_mut()
            .push(format!("{} {}", name, batch_name(batch_dir)));
        if self.fail_playbook.as_deref() == Some(name.as_str()) {
            bail!("{}: 1 host unreachable", name);
        }
        Ok(())
    }
}

/// Two nodes and two templates rooted at `root`, with only the first two
/// default playbooks present on disk.
pub(crate) fn settings_fixture(root: &Path) -> Settings {
    let playbooks = root.join("ansible");
    std::fs::create_dir_all(&playbooks).unwrap();
    std::fs::write(playbooks.join("base_configuration.yml"), "- hosts: all\n").unwrap();
    std::fs::write(playbooks.join("guacamole_integration.yml"), "- hosts: all\n").unwrap();

    let raw = format!(
        r#"
[[nodes]]
name = "pve1"
hostname = "pve1.lab.local"
available_cores = 64
available_memory_gb = 512
available_storage_gb = 4000

[[nodes]]
name = "pve2"
hostname = "pve2.lab.local"
available_cores = 64
available_memory_gb = 512
available_storage_gb = 4000

[[templates]]
key = "windows"
name = "win11-template"
vm_id = 9001
os_type = "win11"
cpu_cores = 4
memory_mb = 8192
disk_size_gb = 80

[[templates]]
key = "kali"
name = "kali-template"
vm_id = 9002
os_type = "l26"
cpu_cores = 2
memory_mb = 4096
disk_size_gb = 40

[proxmox]
api_url = "https://pve1.lab.local:8006/api2/json"

[paths]
work_dir = '{work}'
reports_dir = '{reports}'

[configuration]
playbook_dir = '{playbooks}'
"#,
        work = root.join("terraform_batches").display(),
        reports = root.join("reports").display(),
        playbooks = playbooks.display(),
    );
    Settings::from_toml_str(&raw).unwrap()
}
