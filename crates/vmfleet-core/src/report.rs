use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::batch::{BatchOutcome, BatchResult};

/// Everything a run produced: one result per batch that was started.
///
/// Batches after the first failure are never started and so never appear in
/// `results`.
#[derive(Debug, Clone, Default)]
pub struct DeploymentRun {
    pub total_users: usize,
    pub planned_batches: usize,
    pub results: Vec<BatchResult>,
}

impl DeploymentRun {
    pub fn new(total_users: usize, planned_batches: usize) -> Self {
        Self {
            total_users,
            planned_batches,
            results: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.results.iter().all(BatchResult::succeeded)
    }

    pub fn first_failure(&self) -> Option<&BatchResult> {
        self.results.iter().find(|r| !r.succeeded())
    }
}

/// One summary line per processed batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportLine {
    pub batch_id: String,
    pub succeeded: bool,
    pub users: usize,
    pub vms: usize,
    /// Empty on success, "<stage>: <reason>" on failure.
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeploymentReport {
    pub generated_at: DateTime<Utc>,
    pub total_users: usize,
    pub planned_batches: usize,
    pub total_batches: usize,
    pub successful_batches: usize,
    pub failed_batches: usize,
    pub not_started_batches: usize,
    pub lines: Vec<ReportLine>,
}

impl DeploymentReport {
    pub fn succeeded(&self) -> bool {
        self.failed_batches == 0
    }
}

/// Roll per-batch results up into a report. Pure: the timestamp is an input.
pub fn summarize(run: &DeploymentRun, generated_at: DateTime<Utc>) -> DeploymentReport {
    let lines: Vec<ReportLine> = run
        .results
        .iter()
        .map(|r| ReportLine {
            batch_id: r.batch_id.clone(),
            succeeded: r.succeeded(),
            users: r.user_count,
            vms: r.vm_count,
            detail: match &r.outcome {
                BatchOutcome::Success => String::new(),
                BatchOutcome::Failure { stage, reason } => format!("{}: {}", stage, reason),
            },
        })
        .collect();

    let successful = lines.iter().filter(|l| l.succeeded).count();
    DeploymentReport {
        generated_at,
        total_users: run.total_users,
        planned_batches: run.planned_batches,
        total_batches: lines.len(),
        successful_batches: successful,
        failed_batches: lines.len() - successful,
        not_started_batches: run.planned_batches.saturating_sub(lines.len()),
        lines,
    }
}
