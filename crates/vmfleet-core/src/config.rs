use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{DeployError, DeployResult};
use crate::node::{ClusterNode, NodeInventory};
use crate::template::{TemplateCatalog, VmTemplate};

pub const DEFAULT_CONFIG_PATH: &str = "config/settings.toml";
pub const DEFAULT_BATCH_SIZE: usize = 15;
pub const DEFAULT_SAMPLE_SIZE: usize = 5;
pub const DEFAULT_ID_FLOOR: u32 = 500;

/// Playbooks run against every batch, in this order.
pub const DEFAULT_PLAYBOOKS: [&str; 4] = [
    "base_configuration.yml",
    "guacamole_integration.yml",
    "netbox_integration.yml",
    "freeipa_integration.yml",
];

/// The static settings document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub nodes: Vec<ClusterNode>,
    pub templates: Vec<VmTemplate>,
    /// Free-form cluster settings handed to the descriptor templates
    /// (api_url, token_id, storage, bridge, ...).
    #[serde(default)]
    pub proxmox: toml::Table,
    #[serde(default)]
    pub paths: PathSettings,
    #[serde(default)]
    pub ids: IdSettings,
    #[serde(default)]
    pub configuration: PlaybookSettings,
    #[serde(default)]
    pub tools: ToolSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Parent of the per-batch descriptor directories.
    pub work_dir: PathBuf,
    pub reports_dir: PathBuf,
    /// Directory with `*.tera` overrides for the bundled templates.
    pub templates_dir: Option<PathBuf>,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("terraform_batches"),
            reports_dir: PathBuf::from("reports"),
            templates_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdSettings {
    /// Lowest VM identifier handed out.
    pub floor: u32,
    /// Abort allocation when any node's existing-ID query fails.
    pub strict_query: bool,
}

impl Default for IdSettings {
    fn default() -> Self {
        Self {
            floor: DEFAULT_ID_FLOOR,
            strict_query: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybookSettings {
    pub playbook_dir: PathBuf,
    pub playbooks: Vec<String>,
}

impl Default for PlaybookSettings {
    fn default() -> Self {
        Self {
            playbook_dir: PathBuf::from("ansible"),
            playbooks: DEFAULT_PLAYBOOKS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// External tool binaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub terraform: String,
    pub ansible_playbook: String,
    pub pvesh: String,
    /// Wrap every tool invocation in `timeout <secs>` when set.
    pub timeout_secs: Option<u64>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            terraform: "terraform".to_string(),
            ansible_playbook: "ansible-playbook".to_string(),
            pvesh: "pvesh".to_string(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load and validate settings from a TOML file.
    pub fn load(path: &Path) -> DeployResult<Self> {
        info!(path = %path.display(), "loading settings");
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DeployError::config(format!("cannot read settings {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
            .map_err(|e| DeployError::config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(raw: &str) -> DeployResult<Self> {
        let settings: Settings =
            toml::from_str(raw).map_err(|e| DeployError::config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> DeployResult<()> {
        self.catalog()?;
        self.inventory()?;
        if self.configuration.playbooks.iter().any(|p| p.trim().is_empty()) {
            return Err(DeployError::config("playbook names must not be empty"));
        }
        if self.tools.timeout_secs == Some(0) {
            return Err(DeployError::config("tools.timeout_secs must be at least 1"));
        }
        Ok(())
    }

    pub fn catalog(&self) -> DeployResult<TemplateCatalog> {
        TemplateCatalog::new(self.templates.clone())
    }

    pub fn inventory(&self) -> DeployResult<NodeInventory> {
        NodeInventory::new(self.nodes.clone())
    }
}
