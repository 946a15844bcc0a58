// vmfleet-deploy: Descriptor rendering, per-batch pipeline, fail-fast run loop
pub mod descriptors;
pub mod inventory;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod run;

#[cfg(test)]
mod testing;
