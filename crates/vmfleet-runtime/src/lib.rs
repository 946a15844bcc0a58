// vmfleet-runtime: Host command execution and the Terraform, Ansible and pvesh tool adapters
pub mod ansible;
pub mod preflight;
pub mod pvesh;
pub mod shell;
#[cfg(test)]
pub mod shell_mock;
pub mod terraform;
pub mod tools;
