use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{Context, Result};
use tracing::debug;

/// Wrapper used to bound tool runtime.
const TIMEOUT_BIN: &str = "timeout";

/// An external command run on the host.
///
/// The working directory is always set per command; the process-wide
/// current directory is never changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCommand {
    program: String,
    args: Vec<String>,
    dir: Option<PathBuf>,
    timeout_secs: Option<u64>,
}

impl HostCommand {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            dir: None,
            timeout_secs: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_string()));
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.dir = Some(dir.to_path_buf());
        self
    }

    /// Kill the command after `secs` via coreutils `timeout`.
    pub fn timeout(mut self, secs: Option<u64>) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Full argv, including the timeout wrapper if any.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 3);
        if let Some(secs) = self.timeout_secs {
            argv.push(TIMEOUT_BIN.to_string());
            argv.push(secs.to_string());
        }
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv
    }

    pub fn command_line(&self) -> String {
        self.argv().join(" ")
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Run, capturing output.
    pub fn output(&self) -> Result<Output> {
        #[cfg(test)]
        if let Some(output) = crate::shell_mock::intercept(self) {
            return Ok(output);
        }

        let argv = self.argv();
        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..]);
        if let Some(dir) = &self.dir {
            cmd.current_dir(dir);
        }
        debug!(command = %self.command_line(), dir = ?self.dir, "running host command");
        cmd.output()
            .with_context(|| format!("Failed to run: {}", self.command_line()))
    }

    /// Run and require a zero exit, returning stdout.
    pub fn run(&self) -> Result<String> {
        let output = self.output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "Command failed (exit {}): {}\n{}",
                output.status.code().unwrap_or(-1),
                self.command_line(),
                tail(stderr.trim(), 20)
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Last `n` lines of tool output.
fn tail(s: &str, n: usize) -> String {
    let lines: Vec<&str> = s.lines().collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}
