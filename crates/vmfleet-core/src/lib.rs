// vmfleet-core: Pure types, settings, allocation, distribution, planning
// No internal vmfleet dependencies.

pub mod allocator;
pub mod batch;
pub mod config;
pub mod deploy_env;
pub mod deployment;
pub mod distribution;
pub mod error;
pub mod naming;
pub mod node;
pub mod report;
pub mod template;
pub mod time;
pub mod user;

pub use error::{DeployError, DeployResult};
