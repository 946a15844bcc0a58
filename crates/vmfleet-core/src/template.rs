use serde::{Deserialize, Serialize};

use crate::error::{DeployError, DeployResult};
use crate::naming;

/// A VM template, instantiated once per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmTemplate {
    /// Catalog key, e.g. "ubuntu". Used in VM keys and inventory groups.
    pub key: String,
    /// Name of the clone source on the cluster, e.g. "ubuntu-2204-template".
    pub name: String,
    /// Cluster VM ID of the clone source.
    pub vm_id: u32,
    pub os_type: String,
    pub cpu_cores: u32,
    pub memory_mb: u64,
    pub disk_size_gb: u64,
}

/// Stably ordered list of templates. Order is the declaration order in the
/// settings document and drives both node assignment and ID allocation.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: Vec<VmTemplate>,
}

impl TemplateCatalog {
    pub fn new(templates: Vec<VmTemplate>) -> DeployResult<Self> {
        if templates.is_empty() {
            return Err(DeployError::config("at least one VM template is required"));
        }
        for (i, template) in templates.iter().enumerate() {
            naming::validate_key(&template.key, "Template")
                .map_err(|e| DeployError::config(e.to_string()))?;
            if templates[..i].iter().any(|t| t.key == template.key) {
                return Err(DeployError::config(format!(
                    "duplicate template key {:?}",
                    template.key
                )));
            }
            if template.cpu_cores == 0 || template.memory_mb == 0 || template.disk_size_gb == 0 {
                return Err(DeployError::config(format!(
                    "template {:?} must declare non-zero cores, memory and disk",
                    template.key
                )));
            }
        }
        Ok(Self { templates })
    }

    pub fn iter(&self) -> impl Iterator<Item = &VmTemplate> {
        self.templates.iter()
    }

    pub fn get(&self, key: &str) -> Option<&VmTemplate> {
        self.templates.iter().find(|t| t.key == key)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn template_fixture(key: &str) -> VmTemplate {
    VmTemplate {
        key: key.to_string(),
        name: format!("{}-template", key),
        vm_id: 9000,
        os_type: "l26".to_string(),
        cpu_cores: 2,
        memory_mb: 4096,
        disk_size_gb: 32,
    }
}
