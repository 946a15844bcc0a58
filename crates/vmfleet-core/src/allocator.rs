use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::deploy_env::VmIdLookup;
use crate::error::{DeployError, DeployResult};
use crate::node::NodeInventory;

/// Hands out VM identifiers that collide neither with VMs already on the
/// cluster nor with identifiers issued earlier in the same run.
pub struct VmIdAllocator<'a> {
    lookup: &'a dyn VmIdLookup,
    nodes: &'a NodeInventory,
    issued: BTreeSet<u32>,
    strict: bool,
}

impl<'a> VmIdAllocator<'a> {
    pub fn new(lookup: &'a dyn VmIdLookup, nodes: &'a NodeInventory) -> Self {
        Self {
            lookup,
            nodes,
            issued: BTreeSet::new(),
            strict: false,
        }
    }

    /// Abort allocation when any node cannot be queried instead of degrading.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn issued(&self) -> &BTreeSet<u32> {
        &self.issued
    }

    /// Allocate `count` ascending identifiers, each `>= floor`.
    ///
    /// Existing identifiers are re-queried from every node on each call. A
    /// node that fails to answer is logged and skipped, so the result only
    /// avoids identifiers from nodes that did answer (unless strict).
    pub fn allocate(&mut self, count: usize, floor: u32) -> DeployResult<Vec<u32>> {
        let mut used = self.issued.clone();
        let mut failed = Vec::new();

        for node in self.nodes.iter() {
            match self.lookup.existing_ids(&node.name) {
                Ok(ids) => {
                    debug!(node = %node.name, existing = ids.len(), "queried existing VM IDs");
                    used.extend(ids);
                }
                Err(e) => {
                    warn!(node = %node.name, error = %e, "could not query existing VM IDs");
                    failed.push(node.name.clone());
                }
            }
        }

        if !failed.is_empty() {
            if self.strict {
                return Err(DeployError::IdentifierQueryDegraded { nodes: failed });
            }
            warn!(
                failed_nodes = ?failed,
                floor,
                "VM ID query degraded, allocating from floor; collisions surface at provisioning"
            );
        }

        let mut ids = Vec::with_capacity(count);
        let mut candidate = Some(floor);
        while ids.len() < count {
            let id = candidate.ok_or(DeployError::IdentifierSpaceExhausted { floor, count })?;
            if !used.contains(&id) {
                ids.push(id);
            }
            candidate = id.checked_add(1);
        }

        self.issued.extend(ids.iter().copied());
        debug!(count, first = ?ids.first(), last = ?ids.last(), "allocated VM IDs");
        Ok(ids)
    }
}
