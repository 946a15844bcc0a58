// vmfleet-cli: Clap entry point, logging setup, terminal UI
// Depends on vmfleet-core, vmfleet-deploy, vmfleet-runtime

pub mod commands;
pub mod logging;
pub mod ui;

pub use commands::run;
