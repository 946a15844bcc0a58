//! # vmfleet: batch VM fleet deployment for Proxmox clusters
//!
//! Facade crate that re-exports the vmfleet workspace crates so consumers
//! can depend on a single `vmfleet` library.
//!
//! ## Crate breakdown
//!
//! | Module | Crate | Purpose |
//! |--------|-------|---------|
//! | [`core`] | vmfleet-core | Settings, roster, ID allocation, distribution, batch planning, reports |
//! | [`deploy`] | vmfleet-deploy | Descriptor rendering, per-batch pipeline, fail-fast run loop |
//! | [`runtime`] | vmfleet-runtime | Host commands, Terraform / Ansible / pvesh adapters |
//! | [`cli`] | vmfleet-cli | Command line, logging, terminal UI |

pub use vmfleet_cli as cli;
pub use vmfleet_core as core;
pub use vmfleet_deploy as deploy;
pub use vmfleet_runtime as runtime;
