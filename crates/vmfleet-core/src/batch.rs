use serde::{Deserialize, Serialize};

use crate::error::{DeployError, DeployResult};
use crate::naming;
use crate::user::User;

/// A contiguous slice of the roster deployed as one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// `batch_NNN`, 1-based in roster order.
    pub id: String,
    pub sequence: usize,
    pub users: Vec<User>,
}

/// Split the roster into contiguous batches of `batch_size`.
///
/// Only the last batch may be short. An empty roster yields no batches.
pub fn plan(users: &[User], batch_size: usize) -> DeployResult<Vec<Batch>> {
    if batch_size == 0 {
        return Err(DeployError::config("batch size must be at least 1"));
    }
    Ok(users
        .chunks(batch_size)
        .enumerate()
        .map(|(i, chunk)| Batch {
            id: naming::batch_id(i + 1),
            sequence: i + 1,
            users: chunk.to_vec(),
        })
        .collect())
}

/// Pipeline stage at which a batch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Descriptors,
    Provisioning,
    Inventory,
    Configuration,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Descriptors => write!(f, "descriptors"),
            Self::Provisioning => write!(f, "provisioning"),
            Self::Inventory => write!(f, "inventory"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatchOutcome {
    Success,
    Failure { stage: PipelineStage, reason: String },
}

/// Outcome of one processed batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub batch_id: String,
    pub user_count: usize,
    pub vm_count: usize,
    pub outcome: BatchOutcome,
}

impl BatchResult {
    pub fn success(batch: &Batch, vm_count: usize) -> Self {
        Self {
            batch_id: batch.id.clone(),
            user_count: batch.users.len(),
            vm_count,
            outcome: BatchOutcome::Success,
        }
    }

    pub fn failure(batch: &Batch, vm_count: usize, stage: PipelineStage, reason: String) -> Self {
        Self {
            batch_id: batch.id.clone(),
            user_count: batch.users.len(),
            vm_count,
            outcome: BatchOutcome::Failure { stage, reason },
        }
    }

    pub fn succeeded(&self) -> bool {
        self.outcome == BatchOutcome::Success
    }
}
