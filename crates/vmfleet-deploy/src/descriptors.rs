use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};
use vmfleet_core::allocator::VmIdAllocator;
use vmfleet_core::config::Settings;
use vmfleet_core::deployment::VmDeployment;
use vmfleet_core::naming;
use vmfleet_core::template::{TemplateCatalog, VmTemplate};
use vmfleet_core::user::User;
use vmfleet_core::{DeployError, DeployResult};

use crate::render::{MAIN_TF, Renderer, TFVARS, VARIABLES_TF};

/// Per-VM values handed to the descriptor templates.
#[derive(Debug, Clone, Serialize)]
pub struct VmDescriptor {
    /// `<username>_<template>`, also the key of the `vms` output.
    pub key: String,
    pub resource: String,
    pub hostname: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub department: String,
    pub template_key: String,
    pub template_name: String,
    pub template_vm_id: u32,
    pub os_type: String,
    pub cpu_cores: u32,
    pub memory_mb: u64,
    pub disk_size_gb: u64,
    pub vm_id: u32,
    pub node: String,
}

impl VmDescriptor {
    fn new(user: &User, template: &VmTemplate, vm_id: u32, node: &str) -> Self {
        let key = naming::vm_key(&user.username, &template.key);
        Self {
            resource: naming::resource_name(&key),
            hostname: naming::vm_hostname(&key),
            key,
            username: user.username.clone(),
            email: naming::quoted_safe(&user.email),
            full_name: naming::quoted_safe(&user.full_name),
            department: naming::quoted_safe(&user.department),
            template_key: template.key.clone(),
            template_name: template.name.clone(),
            template_vm_id: template.vm_id,
            os_type: template.os_type.clone(),
            cpu_cores: template.cpu_cores,
            memory_mb: template.memory_mb,
            disk_size_gb: template.disk_size_gb,
            vm_id,
            node: node.to_string(),
        }
    }
}

/// Writes the provisioning descriptors for a set of users.
pub struct DescriptorWriter<'a> {
    settings: &'a Settings,
    catalog: &'a TemplateCatalog,
    renderer: &'a Renderer,
}

impl<'a> DescriptorWriter<'a> {
    pub fn new(settings: &'a Settings, catalog: &'a TemplateCatalog, renderer: &'a Renderer) -> Self {
        Self {
            settings,
            catalog,
            renderer,
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.settings.paths.work_dir
    }

    /// Every output key, resource name and hostname in a batch must be
    /// distinct. Checked before any identifier is allocated.
    fn check_names(&self, users: &[User]) -> DeployResult<()> {
        let mut seen: HashMap<(&'static str, String), String> = HashMap::new();
        for user in users {
            for template in self.catalog.iter() {
                let key = naming::vm_key(&user.username, &template.key);
                let names = [
                    ("output key", key.clone()),
                    ("resource name", naming::resource_name(&key)),
                    ("hostname", naming::vm_hostname(&key)),
                ];
                for (kind, name) in names {
                    let owner = format!("{}/{}", user.username, template.key);
                    if let Some(prev) = seen.insert((kind, name.clone()), owner.clone()) {
                        return Err(DeployError::Descriptor(format!(
                            "{} {:?} is shared by {} and {}",
                            kind, name, prev, owner
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Allocate identifiers for every (user, template) pair and render
    /// `main.tf`, `variables.tf` and `terraform.tfvars` into `dir`.
    ///
    /// Identifiers are assigned in roster order, then catalog order. Users
    /// must already carry node assignments.
    pub fn write(
        &self,
        batch_id: &str,
        users: &[User],
        dir: &Path,
        allocator: &mut VmIdAllocator<'_>,
    ) -> DeployResult<Vec<VmDeployment>> {
        self.check_names(users)?;
        let count = users.len() * self.catalog.len();
        let ids = allocator.allocate(count, self.settings.ids.floor)?;

        let mut descriptors = Vec::with_capacity(count);
        let mut deployments = Vec::with_capacity(count);
        let mut next = ids.into_iter();
        for user in users {
            for template in self.catalog.iter() {
                let node = user.node_for(&template.key).ok_or_else(|| {
                    DeployError::Descriptor(format!(
                        "user {} has no node assigned for template {}",
                        user.username, template.key
                    ))
                })?;
                let vm_id = next.next().ok_or_else(|| {
                    DeployError::Descriptor("allocator returned too few identifiers".to_string())
                })?;
                debug!(user = %user.username, template = %template.key, vm_id, node, "descriptor");
                descriptors.push(VmDescriptor::new(user, template, vm_id, node));
                deployments.push(VmDeployment::new(&user.username, &template.key, vm_id, node));
            }
        }

        let mut ctx = tera::Context::new();
        ctx.insert("batch_id", batch_id);
        ctx.insert("proxmox", &self.settings.proxmox);
        ctx.insert("vms", &descriptors);

        std::fs::create_dir_all(dir).map_err(|e| {
            DeployError::Descriptor(format!("cannot create {}: {}", dir.display(), e))
        })?;
        for name in [MAIN_TF, VARIABLES_TF, TFVARS] {
            self.renderer
                .render_to(name, &ctx, dir)
                .map_err(|e| DeployError::Descriptor(format!("{:#}", e)))?;
        }

        info!(batch = batch_id, vms = deployments.len(), dir = %dir.display(), "generated descriptors");
        Ok(deployments)
    }
}
