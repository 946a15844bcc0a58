use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::info;
use vmfleet_core::deployment::VmDeployment;
use vmfleet_core::naming;
use vmfleet_core::user::User;
use vmfleet_core::{DeployError, DeployResult};

use crate::render::{INVENTORY, Renderer};

/// One entry of the provisioning tool's `vms` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmOutput {
    pub vm_id: u32,
    pub node: String,
    pub ip_address: IpAddr,
}

#[derive(Debug, Serialize)]
struct InventoryHost {
    hostname: String,
    ip_address: String,
    vm_id: u32,
    node: String,
    username: String,
    email: String,
    full_name: String,
    department: String,
}

#[derive(Debug, Serialize)]
struct InventoryGroup {
    template: String,
    hosts: Vec<InventoryHost>,
}

fn invalid(msg: String) -> DeployError {
    DeployError::InventoryDerivation(msg)
}

/// Parse the `vms` output, keyed by `<username>_<template>`.
///
/// Accepts both the raw `output -json` document (`{"vms": {"value": ...}}`)
/// and a bare `{"vms": {...}}` map.
pub fn parse_outputs(outputs: &Value) -> DeployResult<BTreeMap<String, VmOutput>> {
    let vms = outputs
        .get("vms")
        .ok_or_else(|| invalid("outputs have no 'vms' entry".to_string()))?;
    let vms = vms.get("value").unwrap_or(vms);
    let entries = vms
        .as_object()
        .ok_or_else(|| invalid("'vms' output is not a map".to_string()))?;

    let mut parsed = BTreeMap::new();
    for (key, entry) in entries {
        let vm_id = match entry.get("vm_id") {
            Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Some(Value::String(s)) => s.parse().ok(),
            _ => None,
        }
        .ok_or_else(|| invalid(format!("{}: missing or invalid vm_id", key)))?;
        let node = entry
            .get("node")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| invalid(format!("{}: missing node", key)))?;
        let ip_address = entry
            .get("ip_address")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid(format!("{}: missing ip_address", key)))?
            .parse::<IpAddr>()
            .map_err(|e| invalid(format!("{}: bad ip_address: {}", key, e)))?;
        parsed.insert(
            key.clone(),
            VmOutput {
                vm_id,
                node: node.to_string(),
                ip_address,
            },
        );
    }
    Ok(parsed)
}

/// Join the captured outputs with the batch's deployments, record each VM's
/// address and render `inventory.yml` into `dir`, grouped by template.
///
/// Every deployment must have a matching output whose identifier agrees.
pub fn derive_inventory(
    batch_id: &str,
    outputs: &Value,
    deployments: &mut [VmDeployment],
    users: &[User],
    renderer: &Renderer,
    dir: &Path,
) -> DeployResult<PathBuf> {
    let parsed = parse_outputs(outputs)?;
    let by_name: HashMap<&str, &User> = users.iter().map(|u| (u.username.as_str(), u)).collect();

    let mut groups: Vec<InventoryGroup> = Vec::new();
    for d in deployments.iter_mut() {
        let key = d.key();
        let out = parsed
            .get(&key)
            .ok_or_else(|| invalid(format!("no output for {}", key)))?;
        if out.vm_id != d.vm_id {
            return Err(invalid(format!(
                "{}: output reports VM {} but {} was allocated",
                key, out.vm_id, d.vm_id
            )));
        }
        let user = by_name
            .get(d.username.as_str())
            .ok_or_else(|| invalid(format!("{}: unknown user {}", key, d.username)))?;
        d.ip_address = Some(out.ip_address.to_string());

        let host = InventoryHost {
            hostname: naming::vm_hostname(&key),
            ip_address: out.ip_address.to_string(),
            vm_id: out.vm_id,
            node: out.node.clone(),
            username: user.username.clone(),
            email: naming::quoted_safe(&user.email),
            full_name: naming::quoted_safe(&user.full_name),
            department: naming::quoted_safe(&user.department),
        };
        match groups.iter_mut().find(|g| g.template == d.template) {
            Some(g) => g.hosts.push(host),
            None => groups.push(InventoryGroup {
                template: d.template.clone(),
                hosts: vec![host],
            }),
        }
    }

    let mut ctx = tera::Context::new();
    ctx.insert("batch_id", batch_id);
    ctx.insert("groups", &groups);
    renderer
        .render_to(INVENTORY, &ctx, dir)
        .map_err(|e| invalid(format!("{:#}", e)))?;

    let path = dir.join(INVENTORY);
    info!(batch = batch_id, hosts = deployments.len(), path = %path.display(), "generated inventory");
    Ok(path)
}
