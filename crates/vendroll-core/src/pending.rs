//! Follow-up bookkeeping accumulated while a roll runs.
//!
//! Both collections are ordered sets: inserting twice is a no-op and
//! iteration is sorted, so reports come out the same on every run.

use std::{
    collections::BTreeSet,
    fmt,
    path::{Path, PathBuf},
};

/// Things a human should do once the roll finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingActions {
    /// Build targets to rebuild and install
    pub packages: BTreeSet<String>,
    /// Test commands to run against the new revision
    pub tests: BTreeSet<String>,
    /// Repositories (by label) with changes to commit
    pub commits: BTreeSet<String>,
}

impl PendingActions {
    /// Record a repository that needs a commit.
    pub fn commit(&mut self, repo: impl Into<String>) {
        self.commits.insert(repo.into());
    }
}

/// Subset-relative paths that need a human decision.
///
/// A non-empty set stops the roll before any manifest is touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualInterventionSet {
    paths: BTreeSet<PathBuf>,
}

impl ManualInterventionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag a path. Returns false if it was already flagged.
    pub fn insert(&mut self, path: impl Into<PathBuf>) -> bool {
        self.paths.insert(path.into())
    }

    /// Whether `path` is flagged.
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.paths.contains(path.as_ref())
    }

    /// Number of flagged paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// True when no path needs attention.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Flagged paths in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }
}

impl FromIterator<PathBuf> for ManualInterventionSet {
    fn from_iter<T: IntoIterator<Item = PathBuf>>(iter: T) -> Self {
        Self { paths: iter.into_iter().collect() }
    }
}

impl fmt::Display for ManualInterventionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, path) in self.paths.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {}", path.display())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_is_idempotent() {
        let mut set = ManualInterventionSet::new();
        assert!(set.insert("crypto/b.c"));
        assert!(!set.insert("crypto/b.c"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn display_is_sorted_regardless_of_insert_order() {
        let set: ManualInterventionSet =
            ["z.c", "a/b.c", "m.h"].into_iter().map(PathBuf::from).collect();
        assert_eq!(set.to_string(), "  a/b.c\n  m.h\n  z.c");
    }

    #[test]
    fn repeated_commits_are_recorded_once() {
        let mut pending = PendingActions::default();
        pending.commit("vendored");
        pending.commit("subset");
        pending.commit("vendored");
        assert_eq!(pending.commits.iter().collect::<Vec<_>>(), ["subset", "vendored"]);
    }
}
