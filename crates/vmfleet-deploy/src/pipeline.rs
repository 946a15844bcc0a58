use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, error, info, warn};
use vmfleet_core::allocator::VmIdAllocator;
use vmfleet_core::batch::{Batch, BatchResult, PipelineStage};
use vmfleet_core::config::Settings;
use vmfleet_core::deploy_env::{ConfigurationTool, ProvisioningTool};
use vmfleet_core::deployment::{DeploymentStatus, VmDeployment};
use vmfleet_core::template::TemplateCatalog;
use vmfleet_core::{DeployError, DeployResult};

use crate::descriptors::DescriptorWriter;
use crate::inventory::derive_inventory;
use crate::render::Renderer;

/// Captured provisioning outputs, next to the descriptors.
pub const OUTPUTS_FILE: &str = "provisioning_outputs.json";

/// Progress of one batch through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    DescriptorsGenerated,
    Provisioned,
    InventoryDerived,
    Configured,
    Done,
    Failed,
}

impl PipelineState {
    /// The stage that runs when leaving this state, i.e. the stage to blame
    /// if the batch fails while in it.
    pub fn pending_stage(self) -> PipelineStage {
        match self {
            Self::Start => PipelineStage::Descriptors,
            Self::DescriptorsGenerated => PipelineStage::Provisioning,
            Self::Provisioned => PipelineStage::Inventory,
            Self::InventoryDerived | Self::Configured | Self::Done | Self::Failed => {
                PipelineStage::Configuration
            }
        }
    }
}

/// Descriptor directory of a batch.
pub fn batch_dir(work_dir: &Path, batch_id: &str) -> PathBuf {
    work_dir.join(batch_id)
}

/// Everything a processed batch leaves behind.
#[derive(Debug, Clone)]
pub struct BatchRecord {
    pub result: BatchResult,
    pub state: PipelineState,
    pub deployments: Vec<VmDeployment>,
}

/// Drives one batch from descriptors to configured VMs.
///
/// Steps run strictly in order and the first failure ends the batch. Nothing
/// is retried and nothing already created is torn down.
pub struct DeploymentPipeline<'a, P, C> {
    settings: &'a Settings,
    writer: DescriptorWriter<'a>,
    renderer: &'a Renderer,
    provisioner: &'a P,
    configurator: &'a C,
}

impl<'a, P: ProvisioningTool, C: ConfigurationTool> DeploymentPipeline<'a, P, C> {
    pub fn new(
        settings: &'a Settings,
        catalog: &'a TemplateCatalog,
        renderer: &'a Renderer,
        provisioner: &'a P,
        configurator: &'a C,
    ) -> Self {
        Self {
            settings,
            writer: DescriptorWriter::new(settings, catalog, renderer),
            renderer,
            provisioner,
            configurator,
        }
    }

    /// Run a batch. Failures are folded into the returned result.
    pub fn run_batch(&self, batch: &Batch, allocator: &mut VmIdAllocator<'_>) -> BatchRecord {
        let dir = batch_dir(&self.settings.paths.work_dir, &batch.id);
        let mut state = PipelineState::Start;
        let mut deployments = Vec::new();
        info!(batch = %batch.id, users = batch.users.len(), dir = %dir.display(), "starting batch");

        match self.drive(batch, &dir, allocator, &mut state, &mut deployments) {
            Ok(()) => {
                info!(batch = %batch.id, vms = deployments.len(), "batch completed");
                BatchRecord {
                    result: BatchResult::success(batch, deployments.len()),
                    state,
                    deployments,
                }
            }
            Err(e) => {
                let stage = state.pending_stage();
                let mut failed = 0;
                for d in deployments.iter_mut() {
                    if d.mark_failed() {
                        failed += 1;
                    }
                }
                error!(batch = %batch.id, %stage, error = %e, failed_vms = failed, "batch failed");
                BatchRecord {
                    result: BatchResult::failure(batch, deployments.len(), stage, e.to_string()),
                    state: PipelineState::Failed,
                    deployments,
                }
            }
        }
    }

    fn drive(
        &self,
        batch: &Batch,
        dir: &Path,
        allocator: &mut VmIdAllocator<'_>,
        state: &mut PipelineState,
        deployments: &mut Vec<VmDeployment>,
    ) -> DeployResult<()> {
        *deployments = self.writer.write(&batch.id, &batch.users, dir, allocator)?;
        enter(state, PipelineState::DescriptorsGenerated, &batch.id);

        let outputs = self.provision(dir)?;
        for d in deployments.iter_mut() {
            d.advance(DeploymentStatus::Provisioned)?;
        }
        enter(state, PipelineState::Provisioned, &batch.id);

        let inventory =
            derive_inventory(&batch.id, &outputs, deployments, &batch.users, self.renderer, dir)?;
        enter(state, PipelineState::InventoryDerived, &batch.id);

        self.configure(&inventory, dir)?;
        for d in deployments.iter_mut() {
            d.advance(DeploymentStatus::Configured)?;
        }
        enter(state, PipelineState::Configured, &batch.id);
        enter(state, PipelineState::Done, &batch.id);
        Ok(())
    }

    fn provision(&self, dir: &Path) -> DeployResult<Value> {
        self.provisioner.init(dir).map_err(step_failed("init"))?;
        self.provisioner.plan(dir).map_err(step_failed("plan"))?;
        self.provisioner.apply(dir).map_err(step_failed("apply"))?;
        let outputs = self.provisioner.outputs(dir).map_err(step_failed("output"))?;

        let path = dir.join(OUTPUTS_FILE);
        let json = serde_json::to_string_pretty(&outputs)
            .map_err(|e| step_failed("capture outputs")(e.into()))?;
        std::fs::write(&path, json).map_err(|e| step_failed("capture outputs")(e.into()))?;
        debug!(path = %path.display(), "captured provisioning outputs");
        Ok(outputs)
    }

    fn configure(&self, inventory: &Path, dir: &Path) -> DeployResult<()> {
        let conf = &self.settings.configuration;
        for name in &conf.playbooks {
            let playbook = conf.playbook_dir.join(name);
            if !playbook.exists() {
                warn!(playbook = %playbook.display(), "playbook not found, skipping");
                continue;
            }
            self.configurator
                .run_playbook(inventory, &playbook, dir)
                .map_err(|e| DeployError::ConfigurationFailure {
                    playbook: name.clone(),
                    message: format!("{:#}", e),
                })?;
            info!(playbook = %name, "playbook succeeded");
        }
        Ok(())
    }
}

fn step_failed(step: &'static str) -> impl Fn(anyhow::Error) -> DeployError {
    move |e| DeployError::Provisioning {
        step: step.to_string(),
        message: format!("{:#}", e),
    }
}

fn enter(state: &mut PipelineState, next: PipelineState, batch_id: &str) {
    debug!(batch = batch_id, from = ?*state, to = ?next, "pipeline transition");
    *state = next;
}
