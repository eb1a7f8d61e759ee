//! Error types for a revision roll.
//!
//! Every error aborts the roll and nothing is retried. Stages propagate with
//! `?` up to the driver, which stops at the first failure.

use std::{fmt, path::PathBuf};

use thiserror::Error;

use crate::pending::ManualInterventionSet;

/// An external process exited non-zero or could not be started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessFailure {
    /// Full command line as it was invoked
    pub command: String,
    /// Working directory, if one was set
    pub cwd: Option<PathBuf>,
    /// Exit status. `None` if the process never started or was killed by a
    /// signal.
    pub status: Option<i32>,
    /// Captured stdout followed by stderr, or the spawn error
    pub output: String,
}

impl fmt::Display for ProcessFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.command)?;
        if let Some(cwd) = &self.cwd {
            write!(f, " (in {})", cwd.display())?;
        }
        match self.status {
            Some(code) => write!(f, " exited with status {code}")?,
            None => write!(f, " failed to run")?,
        }
        let output = self.output.trim_end();
        if !output.is_empty() {
            write!(f, "\noutput:\n{output}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ProcessFailure {}

/// Ways a revision marker file can be malformed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    /// File is shorter than prefix + revision + trailing slash
    #[error("file is too short to end with a revision URL ({size} < {needed} bytes)")]
    Truncated {
        /// Actual file size
        size: u64,
        /// Bytes the marker needs
        needed: u64,
    },

    /// No `<prefix><revision>/` at end of file
    #[error("file does not end with a valid revision URL")]
    MissingMarker,
}

/// Errors that abort a roll.
#[derive(Error, Debug)]
pub enum RollError {
    /// Generic external tool failure
    #[error("command failed: {0}")]
    Process(ProcessFailure),

    /// Filesystem read/write/stat failure
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A marker file does not match its fixed-suffix format. The file was not
    /// modified.
    #[error("{}: {kind}", path.display())]
    Format {
        /// Marker file
        path: PathBuf,
        /// What is wrong with it
        kind: FormatError,
    },

    /// Source-control operation failed
    #[error("version control failure: {0}")]
    Vcs(ProcessFailure),

    /// A code or build-file generator exited non-zero
    #[error("generator failed: {0}")]
    GenerationProcess(ProcessFailure),

    /// A generator's inputs or outputs are unusable
    #[error("cannot generate {what}: {reason}")]
    Generation {
        /// What was being generated
        what: &'static str,
        /// Why it failed
        reason: String,
    },

    /// Dependency-manifest edit failed
    #[error("manifest update failed: {0}")]
    Manifest(ProcessFailure),

    /// One or more subset files need a human decision
    #[error("manual resolution required for {count} file(s):\n{0}", count = .0.len())]
    ManualInterventionRequired(ManualInterventionSet),

    /// Invalid or incomplete configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Remote artifact could not be fetched
    #[error("failed to fetch {url}: {reason}")]
    Fetch {
        /// URL requested
        url: String,
        /// Transport or status error
        reason: String,
    },
}

impl RollError {
    /// Wrap an `io::Error` with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Process exit code for this error.
    ///
    /// Manual intervention and bad configuration get their own codes so
    /// wrapper scripts can tell "fix the tree" from "fix the invocation".
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::ManualInterventionRequired(_) => 2,
            Self::Config(_) => 3,
            _ => 1,
        }
    }

    /// Captured process failure, if this error came from an external tool.
    pub fn process_failure(&self) -> Option<&ProcessFailure> {
        match self {
            Self::Process(failure)
            | Self::Vcs(failure)
            | Self::GenerationProcess(failure)
            | Self::Manifest(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<ProcessFailure> for RollError {
    fn from(failure: ProcessFailure) -> Self {
        Self::Process(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure() -> ProcessFailure {
        ProcessFailure {
            command: "git checkout cafef00d".to_string(),
            cwd: Some(PathBuf::from("/src")),
            status: Some(128),
            output: "error: pathspec 'cafef00d' did not match\n".to_string(),
        }
    }

    #[test]
    fn process_failure_display_names_command_and_output() {
        let text = failure().to_string();
        assert!(text.starts_with("'git checkout cafef00d' (in /src) exited with status 128"));
        assert!(text.ends_with("error: pathspec 'cafef00d' did not match"));
    }

    #[test]
    fn spawn_failure_display() {
        let failure = ProcessFailure {
            command: "bindgen".to_string(),
            cwd: None,
            status: None,
            output: String::new(),
        };
        assert_eq!(failure.to_string(), "'bindgen' failed to run");
    }

    #[test]
    fn exit_codes_distinguish_manual_and_config() {
        assert_eq!(RollError::ManualInterventionRequired(ManualInterventionSet::new()).exit_code(), 2);
        assert_eq!(RollError::Config("missing".to_string()).exit_code(), 3);
        assert_eq!(RollError::Vcs(failure()).exit_code(), 1);
    }

    #[test]
    fn specialised_failures_expose_process_details() {
        assert_eq!(RollError::Manifest(failure()).process_failure(), Some(&failure()));
        assert!(RollError::Config("x".to_string()).process_failure().is_none());
    }

    #[test]
    fn format_error_display() {
        let err = RollError::Format {
            path: PathBuf::from("README.fuchsia"),
            kind: FormatError::MissingMarker,
        };
        assert_eq!(err.to_string(), "README.fuchsia: file does not end with a valid revision URL");
    }
}
