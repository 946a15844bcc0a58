//! Test mock for [`HostCommand`](crate::shell::HostCommand).
//!
//! A thread-local handler intercepts commands before they reach the host
//! and every intercepted command is recorded.

use std::cell::RefCell;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{ExitStatus, Output};

use crate::shell::HostCommand;

/// Mock response for a host command.
pub struct MockResponse {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl MockResponse {
    pub fn ok(stdout: &str) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    pub fn empty() -> Self {
        Self::ok("")
    }

    pub fn fail(exit_code: i32, stderr: &str) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    fn to_output(&self) -> Output {
        Output {
            // Unix exit code encoding: status = code << 8
            status: ExitStatus::from_raw(self.exit_code << 8),
            stdout: self.stdout.as_bytes().to_vec(),
            stderr: self.stderr.as_bytes().to_vec(),
        }
    }
}

/// A command seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub line: String,
    pub dir: Option<PathBuf>,
}

type MockHandler = Box<dyn Fn(&str) -> MockResponse>;

thread_local! {
    static HANDLER: RefCell<Option<MockHandler>> = const { RefCell::new(None) };
    static CALLS: RefCell<Vec<RecordedCall>> = const { RefCell::new(Vec::new()) };
}

/// Guard that clears the handler and recorded calls on drop.
pub struct MockGuard;

impl Drop for MockGuard {
    fn drop(&mut self) {
        HANDLER.with(|h| *h.borrow_mut() = None);
        CALLS.with(|c| c.borrow_mut().clear());
    }
}

/// Install a handler keyed on the full command line.
pub fn install(handler: impl Fn(&str) -> MockResponse + 'static) -> MockGuard {
    CALLS.with(|c| c.borrow_mut().clear());
    HANDLER.with(|h| *h.borrow_mut() = Some(Box::new(handler)));
    MockGuard
}

/// Commands intercepted since the handler was installed.
pub fn calls() -> Vec<RecordedCall> {
    CALLS.with(|c| c.borrow().clone())
}

pub(crate) fn intercept(cmd: &HostCommand) -> Option<Output> {
    HANDLER.with(|h| {
        h.borrow().as_ref().map(|f| {
            let line = cmd.command_line();
            CALLS.with(|c| {
                c.borrow_mut().push(RecordedCall {
                    line: line.clone(),
                    dir: cmd.dir().map(|d| d.to_path_buf()),
                })
            });
            f(&line).to_output()
        })
    })
}
