use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::node::NodeInventory;
use crate::template::TemplateCatalog;
use crate::user::User;

/// Users and VMs placed on one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeLoad {
    pub node: String,
    /// Users whose primary node this is, in roster order.
    pub users: Vec<String>,
    /// VMs of any user assigned to this node.
    pub vms: usize,
}

/// Assign every (user, template) pair to a node.
///
/// User `i` gets `nodes[(i + j) % nodes.len()]` for the `j`-th template and
/// has `nodes[i % nodes.len()]` as primary node. Declared capacity and load
/// are not consulted. Overwrites any previous assignments, so repeated calls
/// on the same inputs give the same result.
pub fn distribute(
    users: &mut [User],
    nodes: &NodeInventory,
    templates: &TemplateCatalog,
) -> Vec<NodeLoad> {
    let names = nodes.names();
    let mut loads: Vec<NodeLoad> = names
        .iter()
        .map(|n| NodeLoad {
            node: n.to_string(),
            users: Vec::new(),
            vms: 0,
        })
        .collect();

    info!(
        users = users.len(),
        nodes = names.len(),
        total_vms = users.len() * templates.len(),
        "planning VM distribution"
    );

    for (i, user) in users.iter_mut().enumerate() {
        loads[i % names.len()].users.push(user.username.clone());

        let mut assignments = BTreeMap::new();
        for (j, template) in templates.iter().enumerate() {
            let slot = (i + j) % names.len();
            loads[slot].vms += 1;
            assignments.insert(template.key.clone(), names[slot].to_string());
        }
        debug!(user = %user.username, ?assignments, "assigned VMs");
        user.assignments = assignments;
    }

    loads
}
