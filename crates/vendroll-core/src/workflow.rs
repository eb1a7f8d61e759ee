//! Repository-wide operations around a roll: reset, submit and commit.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    error::RollError,
    runner::{CommandRunner, Invocation},
    source::Revision,
};

/// Git settings for submitting and committing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VcsConfig {
    /// Remote to push to
    pub remote: String,
    /// Ref that accepts changes for review
    pub review_ref: String,
    /// Commit subject; `{name}` and `{revision}` are substituted
    pub commit_subject: String,
}

impl Default for VcsConfig {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            review_ref: "refs/for/master".to_string(),
            commit_subject: "[{name}] Roll to {revision}".to_string(),
        }
    }
}

impl VcsConfig {
    /// Commit message for rolling `name` to `revision`.
    pub fn subject(&self, name: &str, revision: &Revision) -> String {
        self.commit_subject.replace("{name}", name).replace("{revision}", revision.short())
    }
}

/// State a repository returns to on reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetTarget {
    /// Discard local changes and untracked files
    Head,
    /// Check out the last revision recorded as synchronized
    Revision(String),
}

/// A repository touched by the roll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedRepo {
    /// Short label used in logs and pending commits
    pub label: String,
    /// Any directory inside the repository
    pub path: PathBuf,
    /// Where `reset_all` takes it
    pub reset: ResetTarget,
}

impl TrackedRepo {
    /// Repository reset to `HEAD`.
    pub fn at_head(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self { label: label.into(), path: path.into(), reset: ResetTarget::Head }
    }
}

fn git(dir: &Path) -> Invocation {
    Invocation::new("git").current_dir(dir)
}

/// Return every repository to its last known-good state.
pub fn reset_all<R: CommandRunner>(runner: &R, repos: &[TrackedRepo]) -> Result<(), RollError> {
    for repo in repos {
        tracing::info!(repo = %repo.label, "resetting");
        match &repo.reset {
            ResetTarget::Head => {
                runner.run(&git(&repo.path).args(["reset", "--hard", "HEAD"])).map_err(RollError::Vcs)?;
                runner.run(&git(&repo.path).args(["clean", "-fd"])).map_err(RollError::Vcs)?;
            },
            ResetTarget::Revision(rev) => {
                runner
                    .run(&git(&repo.path).args(["checkout", "--force", rev.as_str()]))
                    .map_err(RollError::Vcs)?;
            },
        }
    }
    Ok(())
}

/// Push each repository's `HEAD` for review.
pub fn submit_all<R: CommandRunner>(
    runner: &R,
    config: &VcsConfig,
    repos: &[TrackedRepo],
) -> Result<(), RollError> {
    let refspec = format!("HEAD:{}", config.review_ref);
    for repo in repos {
        tracing::info!(repo = %repo.label, remote = %config.remote, "submitting for review");
        runner
            .run(&git(&repo.path).args(["push", config.remote.as_str(), refspec.as_str()]))
            .map_err(RollError::Vcs)?;
    }
    Ok(())
}

/// Whether the repository has uncommitted changes.
pub fn is_dirty<R: CommandRunner>(runner: &R, dir: &Path) -> Result<bool, RollError> {
    let status = runner.run_text(&git(dir).args(["status", "--porcelain"])).map_err(RollError::Vcs)?;
    Ok(!status.trim().is_empty())
}

/// Stage and commit all changes in `repo` with `message`.
///
/// Returns false when there was nothing to commit.
pub fn commit<R: CommandRunner>(
    runner: &R,
    repo: &TrackedRepo,
    message: &str,
) -> Result<bool, RollError> {
    if !is_dirty(runner, &repo.path)? {
        tracing::info!(repo = %repo.label, "nothing to commit");
        return Ok(false);
    }
    runner.run(&git(&repo.path).args(["add", "-A"])).map_err(RollError::Vcs)?;
    runner.run(&git(&repo.path).args(["commit", "-m", message])).map_err(RollError::Vcs)?;
    tracing::info!(repo = %repo.label, "committed");
    Ok(true)
}
