//! Moving the vendored source tree to a new upstream commit.

use std::{fmt, path::Path};

use crate::{
    error::RollError,
    runner::{CommandRunner, Invocation},
};

/// A point in upstream history.
///
/// `requested` is whatever the user asked for (branch, tag, hash);
/// `canonical` is the full commit id it resolved to. Only the canonical form
/// is ever written to markers or manifests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    /// Commit-ish as given
    pub requested: String,
    /// Full commit id checked out
    pub canonical: String,
}

impl Revision {
    /// First 12 characters of the canonical id, for commit subjects.
    pub fn short(&self) -> &str {
        let end = self.canonical.len().min(12);
        &self.canonical[..end]
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.requested == self.canonical {
            f.write_str(&self.canonical)
        } else {
            write!(f, "{} ({})", self.canonical, self.requested)
        }
    }
}

fn git(src_dir: &Path) -> Invocation {
    Invocation::new("git").current_dir(src_dir)
}

/// Commit id of `HEAD` in `src_dir`.
///
/// Fails if git does not print exactly one hexadecimal object name.
pub fn resolve_head<R: CommandRunner>(runner: &R, src_dir: &Path) -> Result<String, RollError> {
    let inv = git(src_dir).args(["rev-list", "HEAD", "--max-count=1"]);
    let out = runner.run_text(&inv).map_err(RollError::Vcs)?;
    let id = out.trim();

    let is_object_name =
        (7..=64).contains(&id.len()) && id.bytes().all(|b| b.is_ascii_hexdigit());
    if !is_object_name {
        return Err(RollError::Vcs(
            inv.failure(Some(0), format!("expected a commit id, got '{id}'")),
        ));
    }
    Ok(id.to_ascii_lowercase())
}

/// Fetch, check out `commitish` and resolve it.
///
/// No revision is returned unless both fetch and checkout succeeded.
pub fn sync<R: CommandRunner>(
    runner: &R,
    src_dir: &Path,
    commitish: &str,
) -> Result<Revision, RollError> {
    tracing::info!(dir = %src_dir.display(), commitish, "updating sources");

    runner.run(&git(src_dir).arg("fetch")).map_err(RollError::Vcs)?;
    runner.run(&git(src_dir).args(["checkout", commitish])).map_err(RollError::Vcs)?;

    let canonical = resolve_head(runner, src_dir)?;
    tracing::info!(revision = %canonical, "checked out");

    Ok(Revision { requested: commitish.to_string(), canonical })
}

/// Resolve the currently checked-out revision without moving the tree.
pub fn current<R: CommandRunner>(runner: &R, src_dir: &Path) -> Result<Revision, RollError> {
    let canonical = resolve_head(runner, src_dir)?;
    Ok(Revision { requested: "HEAD".to_string(), canonical })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_is_twelve_chars() {
        let rev = Revision {
            requested: "origin/upstream/master".to_string(),
            canonical: "0123456789abcdef0123456789abcdef01234567".to_string(),
        };
        assert_eq!(rev.short(), "0123456789ab");
        assert_eq!(
            rev.to_string(),
            "0123456789abcdef0123456789abcdef01234567 (origin/upstream/master)"
        );
    }

    #[test]
    fn short_of_short_id_is_whole_id() {
        let rev = Revision { requested: "abc1234".to_string(), canonical: "abc1234".to_string() };
        assert_eq!(rev.short(), "abc1234");
        assert_eq!(rev.to_string(), "abc1234");
    }
}
