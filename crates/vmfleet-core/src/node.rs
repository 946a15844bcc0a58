use serde::{Deserialize, Serialize};

use crate::error::{DeployError, DeployResult};

/// A cluster node able to host VMs.
///
/// Capacity and load are declared for operators and reports; placement does
/// not read them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterNode {
    pub name: String,
    pub hostname: String,
    pub available_cores: u32,
    pub available_memory_gb: u64,
    pub available_storage_gb: u64,
    #[serde(default)]
    pub current_load: f64,
}

/// Ordered, non-empty set of nodes for a run.
#[derive(Debug, Clone)]
pub struct NodeInventory {
    nodes: Vec<ClusterNode>,
}

impl NodeInventory {
    pub fn new(nodes: Vec<ClusterNode>) -> DeployResult<Self> {
        if nodes.is_empty() {
            return Err(DeployError::config("at least one cluster node is required"));
        }
        for (i, node) in nodes.iter().enumerate() {
            if node.name.trim().is_empty() {
                return Err(DeployError::config(format!("node #{} has an empty name", i + 1)));
            }
            if nodes[..i].iter().any(|n| n.name == node.name) {
                return Err(DeployError::config(format!(
                    "duplicate node name {:?}",
                    node.name
                )));
            }
        }
        Ok(Self { nodes })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClusterNode> {
        self.nodes.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn total_cores(&self) -> u64 {
        self.nodes.iter().map(|n| n.available_cores as u64).sum()
    }
}

#[cfg(test)]
pub(crate) fn node_fixture(name: &str) -> ClusterNode {
    ClusterNode {
        name: name.to_string(),
        hostname: format!("{}.lab.local", name),
        available_cores: 64,
        available_memory_gb: 512,
        available_storage_gb: 4000,
        current_load: 0.0,
    }
}
