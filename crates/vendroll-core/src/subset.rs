//! Restricted-subset reconciliation.
//!
//! The restricted subset is a curated copy of a few dozen library files used
//! by a runtime that cannot carry the whole vendored tree (early boot, the
//! kernel). After the vendored tree moves, every subset file is compared
//! against its upstream counterpart and refreshed when the content differs.
//!
//! # Classification
//!
//! Each regular file under the subset root is classified, in this order:
//!
//! ```text
//! in skip list ─────────────────────────────────────────> Skip
//! no upstream counterpart ──────────────────────────────> MissingUpstream   (manual)
//! tracked hand edit, upstream moved off its baseline ───> ManuallyEditedConflict (manual)
//! tracked hand edit, upstream still on its baseline ────> Unchanged (edit kept)
//! digests equal ────────────────────────────────────────> Unchanged
//! digests differ ───────────────────────────────────────> Updated (copied)
//! ```
//!
//! A human's local edit is never overwritten: a tracked file is either kept or
//! flagged. Flagged files do not stop the walk; the caller decides what to do
//! with the resulting [`ManualInterventionSet`].

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt, fs,
    path::{Component, Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    digest::{Digest, digest_file},
    error::RollError,
    pending::ManualInterventionSet,
};

/// Subset files that are maintained by hand and never rolled.
pub const DEFAULT_SKIPPED: &[&str] = &["BUILD.gn", "README.fuchsia.md", "stack-note.S"];

/// Outcome of comparing one subset file against upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Classification {
    /// Listed in the skip list; not compared
    Skip,
    /// Content already matches upstream, or a tracked hand edit is still
    /// based on the current upstream content
    Unchanged,
    /// Content differs from upstream; upstream was copied over it
    Updated,
    /// A tracked hand edit whose upstream counterpart has moved on
    ManuallyEditedConflict,
    /// No upstream counterpart in any candidate location
    MissingUpstream,
}

impl Classification {
    /// Whether a human must resolve this file before the roll can finish.
    pub fn needs_manual(self) -> bool {
        matches!(self, Self::ManuallyEditedConflict | Self::MissingUpstream)
    }

    /// Short lowercase label used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Unchanged => "unchanged",
            Self::Updated => "updated",
            Self::ManuallyEditedConflict => "manually-edited-conflict",
            Self::MissingUpstream => "missing-upstream",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Baseline recorded when a subset file was deliberately edited by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandEdit {
    /// Digest of the upstream file the edit was made against
    pub upstream: Digest,
    /// Digest of the edited subset file, if recorded
    #[serde(default)]
    pub local: Option<Digest>,
}

/// Which subset files are skipped or tracked as hand edits.
///
/// Keys are subset-relative paths with `/` separators, e.g.
/// `crypto/fipsmodule/rand/urandom.c`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubsetPolicy {
    /// Files never compared or copied
    pub skip: BTreeSet<String>,
    /// Files carrying deliberate local modifications
    pub hand_edits: BTreeMap<String, HandEdit>,
}

impl Default for SubsetPolicy {
    fn default() -> Self {
        Self {
            skip: DEFAULT_SKIPPED.iter().map(|s| (*s).to_string()).collect(),
            hand_edits: BTreeMap::new(),
        }
    }
}

impl SubsetPolicy {
    /// Whether `key` is in the skip list.
    pub fn is_skipped(&self, key: &str) -> bool {
        self.skip.contains(key)
    }

    /// Hand-edit baseline for `key`, if tracked.
    pub fn hand_edit(&self, key: &str) -> Option<&HandEdit> {
        self.hand_edits.get(key)
    }
}

/// Ordered list of roots where a subset file's upstream counterpart may live.
///
/// Tried in sequence; the first root containing a regular file at the same
/// relative path wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamLookup {
    candidates: Vec<PathBuf>,
}

impl UpstreamLookup {
    /// Lookup over explicit candidate roots.
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    /// The vendored repository root first, then its source subdirectory.
    pub fn for_vendored(vendored_root: &Path, source_subdir: &str) -> Self {
        Self::new(vec![vendored_root.to_path_buf(), vendored_root.join(source_subdir)])
    }

    /// Upstream path for subset-relative `rel`, if any candidate has it.
    pub fn resolve(&self, rel: &Path) -> Option<PathBuf> {
        self.candidates.iter().map(|root| root.join(rel)).find(|path| path.is_file())
    }
}

/// Classification of a single subset file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    /// Path relative to the subset root
    pub path: PathBuf,
    /// How the file was classified
    pub class: Classification,
    /// Upstream counterpart, when one was found
    pub upstream: Option<PathBuf>,
}

/// Result of walking the subset tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Every regular file, in walk (sorted) order
    pub files: Vec<FileOutcome>,
    /// Files that need a human decision
    pub manual: ManualInterventionSet,
}

impl ReconcileReport {
    /// Number of files with the given classification.
    pub fn count(&self, class: Classification) -> usize {
        self.files.iter().filter(|f| f.class == class).count()
    }

    /// Classification recorded for `rel`.
    pub fn class_of(&self, rel: impl AsRef<Path>) -> Option<Classification> {
        let rel = rel.as_ref();
        self.files.iter().find(|f| f.path == rel).map(|f| f.class)
    }
}

/// Policy key for a relative path: components joined with `/`.
pub fn policy_key(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Collect every regular file under `root`, relative to it, in sorted order.
///
/// Symlinks to files count as files; symlinked directories are not followed.
pub fn walk_files(root: &Path) -> Result<Vec<PathBuf>, RollError> {
    let mut files = Vec::new();
    walk_into(root, Path::new(""), &mut files)?;
    Ok(files)
}

fn walk_into(root: &Path, rel: &Path, files: &mut Vec<PathBuf>) -> Result<(), RollError> {
    let dir = root.join(rel);
    let mut entries = fs::read_dir(&dir)
        .map_err(|e| RollError::io(&dir, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| RollError::io(&dir, e))?;
    entries.sort_by_key(fs::DirEntry::file_name);

    for entry in entries {
        let child = rel.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| RollError::io(entry.path(), e))?;
        if file_type.is_dir() {
            walk_into(root, &child, files)?;
        } else if file_type.is_file() || entry.path().is_file() {
            files.push(child);
        }
    }
    Ok(())
}

/// Classify one subset file without modifying anything.
pub fn classify(
    subset_root: &Path,
    rel: &Path,
    lookup: &UpstreamLookup,
    policy: &SubsetPolicy,
) -> Result<FileOutcome, RollError> {
    let key = policy_key(rel);
    let outcome = |class, upstream| FileOutcome { path: rel.to_path_buf(), class, upstream };

    if policy.is_skipped(&key) {
        return Ok(outcome(Classification::Skip, None));
    }

    let Some(upstream) = lookup.resolve(rel) else {
        return Ok(outcome(Classification::MissingUpstream, None));
    };

    let upstream_digest = digest_file(&upstream)?;

    if let Some(edit) = policy.hand_edit(&key) {
        if upstream_digest != edit.upstream {
            return Ok(outcome(Classification::ManuallyEditedConflict, Some(upstream)));
        }
        if let Some(local) = edit.local {
            let current = digest_file(&subset_root.join(rel))?;
            if current != local {
                tracing::warn!(
                    file = %key,
                    recorded = %local,
                    current = %current,
                    "hand-edited file differs from its recorded baseline; keeping it"
                );
            }
        }
        return Ok(outcome(Classification::Unchanged, Some(upstream)));
    }

    let class = if upstream_digest == digest_file(&subset_root.join(rel))? {
        Classification::Unchanged
    } else {
        Classification::Updated
    };
    Ok(outcome(class, Some(upstream)))
}

fn collect(
    subset_root: &Path,
    lookup: &UpstreamLookup,
    policy: &SubsetPolicy,
    apply: bool,
) -> Result<ReconcileReport, RollError> {
    let mut report = ReconcileReport::default();

    for rel in walk_files(subset_root)? {
        let file = classify(subset_root, &rel, lookup, policy)?;

        match (file.class, &file.upstream) {
            (Classification::Updated, Some(upstream)) if apply => {
                let target = subset_root.join(&rel);
                fs::copy(upstream, &target).map_err(|e| RollError::io(&target, e))?;
                tracing::info!(file = %rel.display(), "updated from upstream");
            },
            (class, _) if class.needs_manual() => {
                tracing::warn!(file = %rel.display(), class = %class, "needs manual resolution");
                report.manual.insert(rel.clone());
            },
            (class, _) => {
                tracing::trace!(file = %rel.display(), class = %class, "classified");
            },
        }

        report.files.push(file);
    }

    Ok(report)
}

/// Classify every subset file without writing anything.
pub fn plan(
    subset_root: &Path,
    lookup: &UpstreamLookup,
    policy: &SubsetPolicy,
) -> Result<ReconcileReport, RollError> {
    collect(subset_root, lookup, policy, false)
}

/// Bring the subset in line with upstream.
///
/// Files classified [`Classification::Updated`] are replaced byte-for-byte
/// with their upstream counterpart. Files needing manual resolution are
/// recorded in the report and left untouched; the walk always completes.
pub fn reconcile(
    subset_root: &Path,
    lookup: &UpstreamLookup,
    policy: &SubsetPolicy,
) -> Result<ReconcileReport, RollError> {
    collect(subset_root, lookup, policy, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::digest_bytes;

    struct Trees {
        _dir: tempfile::TempDir,
        subset: PathBuf,
        vendored: PathBuf,
    }

    impl Trees {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let subset = dir.path().join("subset");
            let vendored = dir.path().join("vendored");
            fs::create_dir_all(&subset).unwrap();
            fs::create_dir_all(vendored.join("src")).unwrap();
            Self { _dir: dir, subset, vendored }
        }

        fn put(root: &Path, rel: &str, content: &str) {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }

        fn lookup(&self) -> UpstreamLookup {
            UpstreamLookup::for_vendored(&self.vendored, "src")
        }
    }

    #[test]
    fn policy_key_uses_forward_slashes() {
        assert_eq!(policy_key(Path::new("crypto/fipsmodule/bn.c")), "crypto/fipsmodule/bn.c");
        assert_eq!(policy_key(Path::new("./BUILD.gn")), "BUILD.gn");
    }

    #[test]
    fn walk_is_sorted_and_recursive() {
        let t = Trees::new();
        Trees::put(&t.subset, "b.c", "");
        Trees::put(&t.subset, "a/z.c", "");
        Trees::put(&t.subset, "a/y.c", "");

        let files = walk_files(&t.subset).unwrap();
        assert_eq!(
            files,
            vec![PathBuf::from("a/y.c"), PathBuf::from("a/z.c"), PathBuf::from("b.c")]
        );
    }

    #[test]
    fn root_candidate_wins_over_source_subdir() {
        let t = Trees::new();
        Trees::put(&t.vendored, "err_data.c", "generated");
        Trees::put(&t.vendored, "src/err_data.c", "stale");

        let resolved = t.lookup().resolve(Path::new("err_data.c")).unwrap();
        assert_eq!(resolved, t.vendored.join("err_data.c"));
    }

    #[test]
    fn source_subdir_is_second_candidate() {
        let t = Trees::new();
        Trees::put(&t.vendored, "src/crypto/mem.c", "x");

        let resolved = t.lookup().resolve(Path::new("crypto/mem.c")).unwrap();
        assert_eq!(resolved, t.vendored.join("src/crypto/mem.c"));
    }

    #[test]
    fn skip_list_wins_even_without_upstream() {
        let t = Trees::new();
        Trees::put(&t.subset, "BUILD.gn", "local build");

        let outcome =
            classify(&t.subset, Path::new("BUILD.gn"), &t.lookup(), &SubsetPolicy::default())
                .unwrap();
        assert_eq!(outcome.class, Classification::Skip);
    }

    #[test]
    fn tracked_hand_edit_is_kept_while_upstream_is_on_baseline() {
        let t = Trees::new();
        Trees::put(&t.subset, "crypto/rand.c", "patched");
        Trees::put(&t.vendored, "src/crypto/rand.c", "original");

        let mut policy = SubsetPolicy::default();
        policy.hand_edits.insert(
            "crypto/rand.c".to_string(),
            HandEdit { upstream: digest_bytes(b"original"), local: Some(digest_bytes(b"patched")) },
        );

        let report = reconcile(&t.subset, &t.lookup(), &policy).unwrap();
        assert_eq!(report.class_of("crypto/rand.c"), Some(Classification::Unchanged));
        assert!(report.manual.is_empty());
        assert_eq!(fs::read_to_string(t.subset.join("crypto/rand.c")).unwrap(), "patched");
    }

    #[test]
    fn tracked_hand_edit_conflicts_when_upstream_moves() {
        let t = Trees::new();
        Trees::put(&t.subset, "crypto/rand.c", "patched");
        Trees::put(&t.vendored, "src/crypto/rand.c", "new upstream");

        let mut policy = SubsetPolicy::default();
        policy.hand_edits.insert(
            "crypto/rand.c".to_string(),
            HandEdit { upstream: digest_bytes(b"original"), local: None },
        );

        let report = reconcile(&t.subset, &t.lookup(), &policy).unwrap();
        assert_eq!(report.class_of("crypto/rand.c"), Some(Classification::ManuallyEditedConflict));
        assert!(report.manual.contains("crypto/rand.c"));
        assert_eq!(fs::read_to_string(t.subset.join("crypto/rand.c")).unwrap(), "patched");
    }

    #[test]
    fn plan_never_writes() {
        let t = Trees::new();
        Trees::put(&t.subset, "a.c", "old");
        Trees::put(&t.vendored, "src/a.c", "new");

        let report = plan(&t.subset, &t.lookup(), &SubsetPolicy::default()).unwrap();
        assert_eq!(report.count(Classification::Updated), 1);
        assert_eq!(fs::read_to_string(t.subset.join("a.c")).unwrap(), "old");
    }

    #[test]
    fn classification_labels() {
        assert_eq!(Classification::MissingUpstream.to_string(), "missing-upstream");
        assert!(Classification::ManuallyEditedConflict.needs_manual());
        assert!(!Classification::Updated.needs_manual());
    }
}
