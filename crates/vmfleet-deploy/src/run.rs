use std::path::PathBuf;

use serde::Serialize;
use tracing::{error, info};
use vmfleet_core::allocator::VmIdAllocator;
use vmfleet_core::batch::plan;
use vmfleet_core::deploy_env::{ConfigurationTool, ProvisioningTool};
use vmfleet_core::distribution::{NodeLoad, distribute};
use vmfleet_core::node::NodeInventory;
use vmfleet_core::report::DeploymentRun;
use vmfleet_core::template::TemplateCatalog;
use vmfleet_core::user::User;
use vmfleet_core::DeployResult;

use crate::descriptors::DescriptorWriter;
use crate::pipeline::{DeploymentPipeline, batch_dir};

/// Directory name the dry run renders its sample into.
pub const SAMPLE_BATCH: &str = "batch_sample";

/// Distribute the roster, plan batches and deploy them in order.
///
/// Stops at the first failed batch; later batches are never started. Only
/// configuration problems are returned as errors.
pub fn deploy_all<P: ProvisioningTool, C: ConfigurationTool>(
    pipeline: &DeploymentPipeline<'_, P, C>,
    users: &mut [User],
    nodes: &NodeInventory,
    catalog: &TemplateCatalog,
    batch_size: usize,
    allocator: &mut VmIdAllocator<'_>,
) -> DeployResult<DeploymentRun> {
    distribute(users, nodes, catalog);
    let batches = plan(users, batch_size)?;
    info!(users = users.len(), batches = batches.len(), batch_size, "starting deployment");

    let mut run = DeploymentRun::new(users.len(), batches.len());
    for batch in &batches {
        let record = pipeline.run_batch(batch, allocator);
        let ok = record.result.succeeded();
        run.results.push(record.result);
        if !ok {
            error!(
                batch = %batch.id,
                skipped = batches.len() - run.results.len(),
                "batch failed, stopping deployment"
            );
            break;
        }
    }
    Ok(run)
}

/// What a dry run would deploy.
#[derive(Debug, Clone, Serialize)]
pub struct DryRunSummary {
    pub total_users: usize,
    pub total_vms: usize,
    pub planned_batches: usize,
    pub loads: Vec<NodeLoad>,
    pub sample_users: usize,
    pub sample_vms: usize,
    pub sample_dir: PathBuf,
}

/// Plan the deployment and render descriptors for the first `sample_size`
/// users without provisioning or configuring anything.
pub fn dry_run(
    writer: &DescriptorWriter<'_>,
    users: &mut [User],
    nodes: &NodeInventory,
    catalog: &TemplateCatalog,
    batch_size: usize,
    sample_size: usize,
    allocator: &mut VmIdAllocator<'_>,
) -> DeployResult<DryRunSummary> {
    let loads = distribute(users, nodes, catalog);
    let planned = plan(users, batch_size)?.len();

    let sample = &users[..sample_size.min(users.len())];
    let dir = batch_dir(writer.work_dir(), SAMPLE_BATCH);
    let deployments = writer.write(SAMPLE_BATCH, sample, &dir, allocator)?;
    info!(sample_users = sample.len(), dir = %dir.display(), "dry run descriptors generated");

    Ok(DryRunSummary {
        total_users: users.len(),
        total_vms: users.len() * catalog.len(),
        planned_batches: planned,
        loads,
        sample_users: sample.len(),
        sample_vms: deployments.len(),
        sample_dir: dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Renderer;
    use crate::testing::{FakeConfigurator, FakeLookup, FakeProvisioner, settings_fixture};
    use vmfleet_core::batch::{BatchOutcome, PipelineStage};
    use vmfleet_core::report::summarize;

    fn roster(n: usize) -> Vec<User> {
        (0..n)
            .map(|i| User::new(&format!("u{:02}", i), &format!("u{:02}@example.edu", i), "Some One"))
            .collect()
    }

    #[test]
    fn test_all_batches_succeed() {
        let root = tempfile::tempdir().unwrap();
        let settings = settings_fixture(root.path());
        let catalog = settings.catalog().unwrap();
        let nodes = settings.inventory().unwrap();
        let renderer = Renderer::bundled().unwrap();
        let (prov, conf) = (FakeProvisioner::default(), FakeConfigurator::default());
        let lookup = FakeLookup::with_existing(&[500, 510]);
        let mut alloc = VmIdAllocator::new(&lookup, &nodes);
        let pipeline = DeploymentPipeline::new(&settings, &catalog, &renderer, &prov, &conf);

        let mut users = roster(7);
        let run = deploy_all(&pipeline, &mut users, &nodes, &catalog, 3, &mut alloc).unwrap();

        assert!(run.succeeded());
        let ids: Vec<&str> = run.results.iter().map(|r| r.batch_id.as_str()).collect();
        assert_eq!(ids, ["batch_001", "batch_002", "batch_003"]);
        assert_eq!(run.results[2].user_count, 1);
        // 14 VMs, skipping the two IDs already on the cluster.
        assert_eq!(alloc.issued().len(), 14);
        assert!(!alloc.issued().contains(&500) && !alloc.issued().contains(&510));
        assert_eq!(users[1].node_for("windows"), Some("pve2"));
    }

    #[test]
    fn test_second_of_four_fails_in_provisioning() {
        let root = tempfile::tempdir().unwrap();
        let settings = settings_fixture(root.path());
        let catalog = settings.catalog().unwrap();
        let nodes = settings.inventory().unwrap();
        let renderer = Renderer::bundled().unwrap();
        let prov = FakeProvisioner::failing("batch_002", "apply");
        let conf = FakeConfigurator::default();
        let lookup = FakeLookup::with_existing(&[]);
        let mut alloc = VmIdAllocator::new(&lookup, &nodes);
        let pipeline = DeploymentPipeline::new(&settings, &catalog, &renderer, &prov, &conf);

        let mut users = roster(8);
        let run = deploy_all(&pipeline, &mut users, &nodes, &catalog, 2, &mut alloc).unwrap();

        assert!(!run.succeeded());
        assert_eq!(run.planned_batches, 4);
        assert_eq!(run.results.len(), 2);
        assert!(run.results[0].succeeded());
        assert!(matches!(
            run.results[1].outcome,
            BatchOutcome::Failure { stage: PipelineStage::Provisioning, .. }
        ));
        assert!(!prov.calls.borrow().iter().any(|c| c.ends_with("batch_003")));
        assert!(!settings.paths.work_dir.join("batch_003").exists());

        let report = summarize(&run, chrono::Utc::now());
        assert_eq!(report.successful_batches, 1);
        assert_eq!(report.failed_batches, 1);
        assert_eq!(report.not_started_batches, 2);
        assert!(!report.succeeded());
    }

    #[test]
    fn test_zero_batch_size_is_rejected_before_any_batch() {
        let root = tempfile::tempdir().unwrap();
        let settings = settings_fixture(root.path());
        let catalog = settings.catalog().unwrap();
        let nodes = settings.inventory().unwrap();
        let renderer = Renderer::bundled().unwrap();
        let (prov, conf) = (FakeProvisioner::default(), FakeConfigurator::default());
        let lookup = FakeLookup::with_existing(&[]);
        let mut alloc = VmIdAllocator::new(&lookup, &nodes);
        let pipeline = DeploymentPipeline::new(&settings, &catalog, &renderer, &prov, &conf);

        let err = deploy_all(&pipeline, &mut roster(3), &nodes, &catalog, 0, &mut alloc).unwrap_err();
        assert!(err.is_fatal());
        assert!(prov.calls.borrow().is_empty());
    }

    #[test]
    fn test_dry_run_renders_sample_only() {
        let root = tempfile::tempdir().unwrap();
        let settings = settings_fixture(root.path());
        let catalog = settings.catalog().unwrap();
        let nodes = settings.inventory().unwrap();
        let renderer = Renderer::bundled().unwrap();
        let writer = DescriptorWriter::new(&settings, &catalog, &renderer);
        let lookup = FakeLookup::with_existing(&[]);
        let mut alloc = VmIdAllocator::new(&lookup, &nodes);

        let mut users = roster(12);
        let summary = dry_run(
            &writer,
            &mut users,
            &nodes,
            &catalog,
            5,
            5,
            &mut alloc,
        )
        .unwrap();

        assert_eq!(summary.total_vms, 24);
        assert_eq!(summary.planned_batches, 3);
        assert_eq!(summary.sample_users, 5);
        assert_eq!(summary.sample_vms, 10);
        assert_eq!(summary.loads[0].users.len(), 6);
        assert!(summary.sample_dir.join("main.tf").exists());
        assert!(!summary.sample_dir.join("inventory.yml").exists());
    }

    #[test]
    fn test_dry_run_sample_larger_than_roster() {
        let root = tempfile::tempdir().unwrap();
        let settings = settings_fixture(root.path());
        let catalog = settings.catalog().unwrap();
        let nodes = settings.inventory().unwrap();
        let renderer = Renderer::bundled().unwrap();
        let writer = DescriptorWriter::new(&settings, &catalog, &renderer);
        let lookup = FakeLookup::with_existing(&[]);
        let mut alloc = VmIdAllocator::new(&lookup, &nodes);

        let summary = dry_run(
            &writer,
            &mut roster(2),
            &nodes,
            &catalog,
            15,
            5,
            &mut alloc,
        )
        .unwrap();
        assert_eq!(summary.sample_users, 2);
        assert_eq!(summary.planned_batches, 1);
    }
}
