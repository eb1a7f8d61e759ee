//! Production [`CommandRunner`] backed by real processes.
//!
//! `SystemRunner` spawns each invocation with `std::process::Command`, waits
//! for it to exit and returns stdout followed by stderr. Children inherit the
//! environment; the working directory is set per invocation, never on the
//! parent process.

use std::process::Command;

use vendroll_core::{CommandRunner, Invocation, ProcessFailure};

/// Runs invocations as child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    /// Create a new system runner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<Vec<u8>, ProcessFailure> {
        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);
        if let Some(cwd) = &invocation.cwd {
            command.current_dir(cwd);
        }

        tracing::debug!(command = %invocation, cwd = ?invocation.cwd, "running");
        let output = command
            .output()
            .map_err(|e| invocation.failure(None, e.to_string()))?;

        let mut combined = output.stdout;
        combined.extend_from_slice(&output.stderr);

        if output.status.success() {
            Ok(combined)
        } else {
            let text = String::from_utf8_lossy(&combined).into_owned();
            tracing::warn!(command = %invocation, status = ?output.status.code(), "command failed");
            Err(invocation.failure(output.status.code(), text))
        }
    }
}
