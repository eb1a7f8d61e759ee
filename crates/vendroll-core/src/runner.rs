//! External process and network abstraction.
//!
//! Decouples roll logic from the tools it drives (git, generators, manifest
//! editor) and from the network. Production uses real processes and HTTP;
//! tests use a scripted runner that records invocations and answers from a
//! table, so every stage can be exercised without git or python installed.

use std::{fmt, path::PathBuf};

use crate::error::ProcessFailure;

/// One external command: program, arguments and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Working directory. `None` inherits the caller's directory.
    pub cwd: Option<PathBuf>,
    /// Program name or path
    pub program: String,
    /// Arguments, not including the program
    pub args: Vec<String>,
}

impl Invocation {
    /// Invocation of `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self { cwd: None, program: program.into(), args: Vec::new() }
    }

    /// Set the working directory.
    #[must_use]
    pub fn current_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Build a failure record for this invocation.
    pub fn failure(&self, status: Option<i32>, output: impl Into<String>) -> ProcessFailure {
        ProcessFailure {
            command: self.to_string(),
            cwd: self.cwd.clone(),
            status,
            output: output.into(),
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Runs external commands to completion.
///
/// # Invariants
///
/// Implementations MUST guarantee:
///
/// - The call blocks until the process exits. There is no timeout.
/// - `Ok` only for exit status zero; the returned bytes are stdout followed
///   by stderr.
/// - A non-zero exit or a failure to start returns [`ProcessFailure`]
///   carrying the full command line and whatever output was captured.
/// - The process working directory of the caller is never changed.
pub trait CommandRunner {
    /// Run `invocation` and return its combined output.
    fn run(&self, invocation: &Invocation) -> Result<Vec<u8>, ProcessFailure>;

    /// Run and decode output as UTF-8 (lossy).
    fn run_text(&self, invocation: &Invocation) -> Result<String, ProcessFailure> {
        self.run(invocation).map(|out| String::from_utf8_lossy(&out).into_owned())
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, invocation: &Invocation) -> Result<Vec<u8>, ProcessFailure> {
        (**self).run(invocation)
    }
}

/// Fetches remote artifacts over HTTP(S).
pub trait Fetcher {
    /// GET `url` and return the response body. Non-2xx responses are errors.
    fn get(&self, url: &str) -> Result<Vec<u8>, String>;
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn get(&self, url: &str) -> Result<Vec<u8>, String> {
        (**self).get(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_renders_command_line() {
        let inv = Invocation::new("git").args(["rev-list", "HEAD", "--max-count=1"]);
        assert_eq!(inv.to_string(), "git rev-list HEAD --max-count=1");
    }

    #[test]
    fn failure_carries_cwd_and_command() {
        let inv = Invocation::new("git").arg("fetch").current_dir("/tmp/src");
        let failure = inv.failure(Some(1), "fatal: no remote");
        assert_eq!(failure.command, "git fetch");
        assert_eq!(failure.cwd, Some(PathBuf::from("/tmp/src")));
        assert_eq!(failure.status, Some(1));
    }
}
