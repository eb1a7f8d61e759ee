//! Roll orchestrator.
//!
//! Sequences the stages over one immutable [`RollConfig`]. Execution is
//! strictly linear and blocking; the first failing stage aborts the roll and
//! no later stage runs.
//!
//! # Pipeline
//!
//! ```text
//! Configure ─┬─ ResetAll  (terminal)
//!            ├─ SubmitAll (terminal)
//!            └─ SourceSync → StampUpdate → BuildFileGen → [TrustBundle]
//!                 → [RestrictedSubsetSync] → [BindingGen] → ManifestUpdate
//!                 → [Propagate] → [Commit] → Report
//! ```
//!
//! A non-empty manual-intervention set after `RestrictedSubsetSync` stops the
//! roll before any manifest is touched.

use std::{
    collections::BTreeSet,
    fmt,
    path::{Path, PathBuf},
};

use time::OffsetDateTime;

use crate::{
    bindings, buildgen,
    config::{Mode, RollConfig},
    error::RollError,
    manifest::{self, ManifestEntry},
    pending::PendingActions,
    runner::{CommandRunner, Fetcher},
    source::{self, Revision},
    stamp,
    subset::{self, ReconcileReport},
    trust_bundle::{self, TrustBundleOutcome},
    workflow::{self, ResetTarget, TrackedRepo},
};

/// Repository label for the vendored tree.
pub const VENDORED_REPO: &str = "vendored";
/// Repository label for the restricted subset.
pub const SUBSET_REPO: &str = "subset";
/// Repository label for the upstream checkout.
pub const SOURCE_REPO: &str = "source";

/// Steps of a roll, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// Discard local changes everywhere
    ResetAll,
    /// Push everything for review
    SubmitAll,
    /// Fetch, check out and resolve the upstream revision
    SourceSync,
    /// Record the revision in the vendored README
    StampUpdate,
    /// Regenerate build manifests
    BuildFileGen,
    /// Refresh the root-certificate bundle
    TrustBundle,
    /// Reconcile the restricted subset
    RestrictedSubsetSync,
    /// Regenerate Rust bindings
    BindingGen,
    /// Pin the revision in the primary manifest
    ManifestUpdate,
    /// Pin the revision in secondary manifests
    Propagate,
    /// Commit every touched repository
    Commit,
}

impl Stage {
    /// Kebab-case name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ResetAll => "reset-all",
            Self::SubmitAll => "submit-all",
            Self::SourceSync => "source-sync",
            Self::StampUpdate => "stamp-update",
            Self::BuildFileGen => "build-file-gen",
            Self::TrustBundle => "trust-bundle",
            Self::RestrictedSubsetSync => "restricted-subset-sync",
            Self::BindingGen => "binding-gen",
            Self::ManifestUpdate => "manifest-update",
            Self::Propagate => "propagate",
            Self::Commit => "commit",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a finished invocation produced.
#[derive(Debug, Clone, Default)]
pub struct RollOutcome {
    /// Revision rolled to. `None` for reset/submit.
    pub revision: Option<Revision>,
    /// Stages that completed, in order
    pub completed: Vec<Stage>,
    /// Follow-up work
    pub pending: PendingActions,
    /// Subset reconciliation result
    pub subset: Option<ReconcileReport>,
    /// Written bindings file
    pub bindings: Option<PathBuf>,
    /// Trust bundle refresh result
    pub trust_bundle: Option<TrustBundleOutcome>,
}

impl RollOutcome {
    /// Whether `stage` ran to completion.
    pub fn ran(&self, stage: Stage) -> bool {
        self.completed.contains(&stage)
    }

    /// Log follow-up instructions in a stable order.
    pub fn log_report(&self) {
        if let Some(revision) = &self.revision {
            tracing::info!(revision = %revision, "roll complete");
        }
        if let Some(report) = &self.subset {
            tracing::info!(
                updated = report.count(subset::Classification::Updated),
                unchanged = report.count(subset::Classification::Unchanged),
                skipped = report.count(subset::Classification::Skip),
                "subset reconciled"
            );
        }
        if !self.pending.packages.is_empty() {
            tracing::info!("To test, rebuild:");
            for package in &self.pending.packages {
                tracing::info!("  {package}");
            }
        }
        if !self.pending.tests.is_empty() {
            tracing::info!("Then run:");
            for test in &self.pending.tests {
                tracing::info!("  {test}");
            }
        }
        if !self.pending.commits.is_empty() && !self.ran(Stage::Commit) {
            tracing::info!("If tests pass, commit the changes in:");
            for repo in &self.pending.commits {
                tracing::info!("  {repo}");
            }
        }
    }
}

/// Run `f` as `stage`, recording completion and logging failure.
fn step<T>(
    completed: &mut Vec<Stage>,
    stage: Stage,
    f: impl FnOnce() -> Result<T, RollError>,
) -> Result<T, RollError> {
    tracing::info!(%stage, "starting");
    match f() {
        Ok(value) => {
            tracing::debug!(%stage, "done");
            completed.push(stage);
            Ok(value)
        },
        Err(e) => {
            tracing::error!(%stage, "stage failed: {e}");
            Err(e)
        },
    }
}

/// Orchestrates a roll over a runner and a fetcher.
pub struct RollDriver<'a, R, F>
where
    R: CommandRunner,
    F: Fetcher,
{
    /// Configuration for this invocation
    config: &'a RollConfig,
    /// External process runner
    runner: R,
    /// HTTP fetcher (trust bundle only)
    fetcher: F,
}

impl<'a, R, F> RollDriver<'a, R, F>
where
    R: CommandRunner,
    F: Fetcher,
{
    /// Create a driver.
    pub fn new(config: &'a RollConfig, runner: R, fetcher: F) -> Self {
        Self { config, runner, fetcher }
    }

    /// Run the selected mode to completion.
    pub fn run(&self) -> Result<RollOutcome, RollError> {
        let mut outcome = RollOutcome::default();
        match self.config.mode {
            Mode::ResetAll => {
                let repos = self.reset_repos()?;
                step(&mut outcome.completed, Stage::ResetAll, || {
                    workflow::reset_all(&self.runner, &repos)
                })?;
            },
            Mode::SubmitAll => {
                let repos = self.commit_repos();
                step(&mut outcome.completed, Stage::SubmitAll, || {
                    workflow::submit_all(&self.runner, &self.config.vcs, &repos)
                })?;
            },
            Mode::Roll => self.roll(&mut outcome)?,
        }
        Ok(outcome)
    }

    /// Repositories that receive commits and submissions, deduplicated by path.
    pub fn commit_repos(&self) -> Vec<TrackedRepo> {
        dedup_by_path(self.labelled_repos())
    }

    fn labelled_repos(&self) -> Vec<TrackedRepo> {
        let paths = &self.config.paths;
        let mut repos = vec![
            TrackedRepo::at_head(VENDORED_REPO, &paths.vendored),
            TrackedRepo::at_head(SUBSET_REPO, &paths.subset),
        ];
        for entry in self.manifest_entries() {
            repos.push(TrackedRepo::at_head(manifest_label(entry), manifest_repo(entry)));
        }
        repos
    }

    /// Repositories `ResetAll` touches: the upstream checkout goes back to the
    /// revision recorded in the vendored README, everything else to `HEAD`.
    pub fn reset_repos(&self) -> Result<Vec<TrackedRepo>, RollError> {
        let paths = &self.config.paths;
        let recorded = stamp::read_stamp(&paths.vendored_readme, &self.config.stamp_prefix)?;
        let mut repos = vec![TrackedRepo {
            label: SOURCE_REPO.to_string(),
            path: paths.source.clone(),
            reset: ResetTarget::Revision(recorded),
        }];
        repos.extend(self.commit_repos());
        Ok(repos)
    }

    fn manifest_entries(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.config.primary_manifest.iter().chain(&self.config.propagate)
    }

    fn roll(&self, outcome: &mut RollOutcome) -> Result<(), RollError> {
        let config = self.config;
        let paths = &config.paths;
        let runner = &self.runner;
        let completed = &mut outcome.completed;
        let pending = &mut outcome.pending;

        let revision = if config.stages.source {
            let revision = step(completed, Stage::SourceSync, || {
                source::sync(runner, &paths.source, &config.commitish)
            })?;
            step(completed, Stage::StampUpdate, || {
                stamp::stamp_file(&paths.vendored_readme, &config.stamp_prefix, &revision.canonical)
            })?;
            step(completed, Stage::BuildFileGen, || {
                buildgen::generate(runner, &config.buildgen, &paths.vendored, &paths.source)
            })?;

            pending.packages.extend(config.follow_up.packages.iter().cloned());
            pending.tests.extend(config.follow_up.tests.iter().cloned());
            pending.commit(VENDORED_REPO);
            revision
        } else {
            tracing::info!("skipping source sync; using checked-out revision");
            source::current(runner, &paths.source)?
        };
        outcome.revision = Some(revision.clone());

        if config.stages.trust_bundle
            && let Some(tb) = &config.trust_bundle
        {
            let result = step(completed, Stage::TrustBundle, || {
                trust_bundle::refresh(
                    &self.fetcher,
                    runner,
                    tb,
                    &paths.vendored,
                    OffsetDateTime::now_utc(),
                )
            })?;
            if result.changed {
                pending.commit(VENDORED_REPO);
            }
            outcome.trust_bundle = Some(result);
        }

        if config.stages.subset {
            let report = step(completed, Stage::RestrictedSubsetSync, || {
                stamp::stamp_file(&paths.subset_readme, &config.stamp_prefix, &revision.canonical)?;
                subset::reconcile(&paths.subset, &config.upstream_lookup(), &config.subset_policy)
            })?;

            if !report.manual.is_empty() {
                tracing::error!("These files need manual resolution before the roll can finish:");
                for path in report.manual.iter() {
                    tracing::error!("  {}", path.display());
                }
                return Err(RollError::ManualInterventionRequired(report.manual));
            }

            pending.tests.extend(config.follow_up.subset_tests.iter().cloned());
            pending.commit(SUBSET_REPO);
            outcome.subset = Some(report);
        }

        if config.stages.bindings {
            let output = step(completed, Stage::BindingGen, || {
                bindings::generate_bindings(runner, &config.bindings, &paths.vendored)
            })?;
            pending.commit(VENDORED_REPO);
            outcome.bindings = Some(output);
        }

        if let Some(primary) = &config.primary_manifest {
            step(completed, Stage::ManifestUpdate, || {
                manifest::update_manifest(runner, &config.manifest_tool, primary, &revision)
            })?;
            pending.commit(manifest_label(primary));
        }

        if config.stages.propagate && !config.propagate.is_empty() {
            step(completed, Stage::Propagate, || {
                config.propagate.iter().try_for_each(|entry| {
                    manifest::update_manifest(runner, &config.manifest_tool, entry, &revision)
                })
            })?;
            for entry in &config.propagate {
                pending.commit(manifest_label(entry));
            }
        }

        if config.stages.commit {
            let mut touched = self.labelled_repos();
            touched.retain(|repo| pending.commits.contains(&repo.label));
            let touched = dedup_by_path(touched);
            let message = config.vcs.subject(&config.name, &revision);
            step(completed, Stage::Commit, || {
                for repo in &touched {
                    workflow::commit(runner, repo, &message)?;
                }
                Ok(())
            })?;
        }

        Ok(())
    }
}

/// Label for the repository holding `entry`'s manifest, keyed on that
/// repository's directory. Manifests sharing a directory share a label.
pub fn manifest_label(entry: &ManifestEntry) -> String {
    format!("manifest:{}", manifest_repo(entry).display())
}

fn manifest_repo(entry: &ManifestEntry) -> &Path {
    entry.manifest.parent().unwrap_or(&entry.manifest)
}

fn dedup_by_path(mut repos: Vec<TrackedRepo>) -> Vec<TrackedRepo> {
    let mut seen = BTreeSet::new();
    repos.retain(|repo| seen.insert(repo.path.clone()));
    repos
}
