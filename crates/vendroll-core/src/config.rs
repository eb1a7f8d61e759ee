//! Roll configuration.
//!
//! Built once at startup and passed by reference into every stage. Layers,
//! lowest precedence first:
//!
//! 1. built-in defaults (the BoringSSL layout this tool was written for)
//! 2. `vendroll.toml` at the workspace root, or an explicit `--config` file
//! 3. command-line [`Overrides`]
//!
//! Relative paths are resolved against the workspace root exactly once; the
//! process working directory is never consulted after that.
//!
//! ```toml
//! name = "boringssl"
//! vendored = "third_party/boringssl"
//! subset = "zircon/third_party/ulib/uboringssl"
//! commit = "origin/upstream/master"
//!
//! [subset_policy]
//! skip = ["BUILD.gn", "README.fuchsia.md", "stack-note.S"]
//!
//! [subset_policy.hand_edits."crypto/fipsmodule/rand/urandom.c"]
//! upstream = "<sha256 of the upstream file the edit is based on>"
//!
//! [manifest]
//! tool = "jiri"
//! primary = { manifest = "integration/fuchsia/third_party/flower", name = "third_party/boringssl" }
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    bindings::BindingsConfig,
    buildgen::BuildGenConfig,
    error::RollError,
    manifest::{EntryKind, ManifestEntry},
    subset::{SubsetPolicy, UpstreamLookup},
    trust_bundle::TrustBundleConfig,
    workflow::VcsConfig,
};

/// Name of the optional config file at the workspace root.
pub const CONFIG_FILE_NAME: &str = "vendroll.toml";

/// URL prefix preceding the revision in README markers.
pub const DEFAULT_STAMP_PREFIX: &str = "https://fuchsia.googlesource.com/third_party/boringssl/+/";

/// Commit-ish rolled to when none is given.
pub const DEFAULT_COMMITISH: &str = "origin/upstream/master";

/// What the invocation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Full roll pipeline
    #[default]
    Roll,
    /// Discard local changes in every tracked repository, then stop
    ResetAll,
    /// Push every tracked repository for review, then stop
    SubmitAll,
}

/// Optional stages, each on unless skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stages {
    /// Fetch/checkout, README stamp, build-file generation
    pub source: bool,
    /// Trust bundle refresh (only if configured)
    pub trust_bundle: bool,
    /// Restricted-subset reconciliation
    pub subset: bool,
    /// Binding regeneration
    pub bindings: bool,
    /// Secondary manifest propagation
    pub propagate: bool,
    /// Commit changes once everything succeeded (off by default)
    pub commit: bool,
}

impl Default for Stages {
    fn default() -> Self {
        Self {
            source: true,
            trust_bundle: true,
            subset: true,
            bindings: true,
            propagate: true,
            commit: false,
        }
    }
}

/// Manifest editing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManifestConfig {
    /// Manifest editor program
    pub tool: String,
    /// Entry that pins the vendored library
    pub primary: Option<ManifestEntry>,
    /// Further entries kept at the same revision
    pub propagate: Vec<ManifestEntry>,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            tool: "jiri".to_string(),
            primary: Some(ManifestEntry {
                manifest: PathBuf::from("integration/fuchsia/third_party/flower"),
                name: "third_party/boringssl".to_string(),
                kind: EntryKind::Project,
            }),
            propagate: Vec::new(),
        }
    }
}

/// Follow-up work reported after a successful roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FollowUp {
    /// Packages to rebuild after the vendored tree moves
    pub packages: Vec<String>,
    /// Tests to run after the vendored tree moves
    pub tests: Vec<String>,
    /// Tests to run after the subset changes
    pub subset_tests: Vec<String>,
}

impl Default for FollowUp {
    fn default() -> Self {
        Self {
            packages: vec!["garnet/packages/tests/boringssl".to_string()],
            tests: vec!["fx run-test boringssl_tests".to_string()],
            subset_tests: vec!["k ut prng".to_string(), "/boot/test/sys/crypto_test".to_string()],
        }
    }
}

/// On-disk configuration file. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Short library name used in logs and commit subjects
    pub name: String,
    /// Vendored repository, relative to the workspace
    pub vendored: PathBuf,
    /// Upstream checkout inside the vendored repository
    pub source_subdir: String,
    /// Restricted subset, relative to the workspace
    pub subset: PathBuf,
    /// Commit-ish to roll to
    pub commit: String,
    /// URL prefix of README revision markers
    pub stamp_prefix: String,
    /// README in the vendored repository carrying a marker
    pub vendored_readme: String,
    /// README in the subset carrying a marker
    pub subset_readme: String,
    /// Build-file generator
    pub buildgen: BuildGenConfig,
    /// Subset skip list and hand-edit baselines
    pub subset_policy: SubsetPolicy,
    /// Binding generator
    pub bindings: BindingsConfig,
    /// Manifest entries
    pub manifest: ManifestConfig,
    /// Trust bundle, if the vendored tree ships one
    pub trust_bundle: Option<TrustBundleConfig>,
    /// Git submit/commit settings
    pub vcs: VcsConfig,
    /// Reported follow-up work
    pub follow_up: FollowUp,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            name: "boringssl".to_string(),
            vendored: PathBuf::from("third_party/boringssl"),
            source_subdir: "src".to_string(),
            subset: PathBuf::from("zircon/third_party/ulib/uboringssl"),
            commit: DEFAULT_COMMITISH.to_string(),
            stamp_prefix: DEFAULT_STAMP_PREFIX.to_string(),
            vendored_readme: "README.fuchsia".to_string(),
            subset_readme: "README.fuchsia.md".to_string(),
            buildgen: BuildGenConfig::default(),
            subset_policy: SubsetPolicy::default(),
            bindings: BindingsConfig::default(),
            manifest: ManifestConfig::default(),
            trust_bundle: None,
            vcs: VcsConfig::default(),
            follow_up: FollowUp::default(),
        }
    }
}

impl ConfigFile {
    /// Parse TOML text.
    pub fn from_toml(text: &str) -> Result<Self, RollError> {
        toml::from_str(text).map_err(|e| RollError::Config(format!("invalid config: {e}")))
    }

    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self, RollError> {
        tracing::debug!(path = %path.display(), "loading config");
        let text = fs::read_to_string(path).map_err(|e| RollError::io(path, e))?;
        toml::from_str(&text)
            .map_err(|e| RollError::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Load `explicit` if given, else `<workspace>/vendroll.toml` if it
    /// exists, else defaults.
    pub fn discover(workspace: &Path, explicit: Option<&Path>) -> Result<Self, RollError> {
        if let Some(path) = explicit {
            return Self::load(&resolve(workspace, path));
        }
        let candidate = workspace.join(CONFIG_FILE_NAME);
        if candidate.is_file() { Self::load(&candidate) } else { Ok(Self::default()) }
    }
}

/// Command-line overrides. `None`/`false` leaves the file value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Vendored repository path
    pub vendored: Option<PathBuf>,
    /// Restricted subset path
    pub subset: Option<PathBuf>,
    /// Commit-ish to roll to
    pub commit: Option<String>,
    /// Extra manifests to propagate the revision into
    pub secondary_manifests: Vec<PathBuf>,
    /// Selected mode
    pub mode: Mode,
    /// Skip fetch/checkout, README stamp and build-file generation
    pub skip_source: bool,
    /// Skip trust bundle refresh
    pub skip_trust_bundle: bool,
    /// Skip subset reconciliation
    pub skip_subset: bool,
    /// Skip binding regeneration
    pub skip_bindings: bool,
    /// Skip secondary manifest propagation
    pub skip_propagate: bool,
    /// Commit changes after a successful roll
    pub commit_changes: bool,
}

/// Absolute locations the roll touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollPaths {
    /// Workspace root
    pub workspace: PathBuf,
    /// Vendored repository root
    pub vendored: PathBuf,
    /// Upstream checkout inside the vendored repository
    pub source: PathBuf,
    /// Restricted subset root
    pub subset: PathBuf,
    /// README marker in the vendored repository
    pub vendored_readme: PathBuf,
    /// README marker in the subset
    pub subset_readme: PathBuf,
}

/// Immutable configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollConfig {
    /// What to do
    pub mode: Mode,
    /// Library name
    pub name: String,
    /// Commit-ish to roll to
    pub commitish: String,
    /// Resolved paths
    pub paths: RollPaths,
    /// Enabled optional stages
    pub stages: Stages,
    /// README marker prefix
    pub stamp_prefix: String,
    /// Source subdirectory name inside the vendored repository
    pub source_subdir: String,
    /// Build-file generator
    pub buildgen: BuildGenConfig,
    /// Subset policy
    pub subset_policy: SubsetPolicy,
    /// Binding generator
    pub bindings: BindingsConfig,
    /// Manifest editor program
    pub manifest_tool: String,
    /// Primary manifest entry, manifest path resolved
    pub primary_manifest: Option<ManifestEntry>,
    /// Secondary manifest entries, manifest paths resolved
    pub propagate: Vec<ManifestEntry>,
    /// Trust bundle settings
    pub trust_bundle: Option<TrustBundleConfig>,
    /// Git settings
    pub vcs: VcsConfig,
    /// Follow-up work to report
    pub follow_up: FollowUp,
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() { path.to_path_buf() } else { root.join(path) }
}

impl RollConfig {
    /// Merge `file` and `overrides` and resolve paths against `workspace`.
    pub fn resolve(
        workspace: &Path,
        file: ConfigFile,
        overrides: Overrides,
    ) -> Result<Self, RollError> {
        if workspace.as_os_str().is_empty() {
            return Err(RollError::Config(
                "workspace root not set (pass --workspace or set FUCHSIA_DIR)".to_string(),
            ));
        }
        let workspace = std::path::absolute(workspace).map_err(|e| RollError::io(workspace, e))?;

        let vendored = resolve(&workspace, overrides.vendored.as_deref().unwrap_or(&file.vendored));
        let subset = resolve(&workspace, overrides.subset.as_deref().unwrap_or(&file.subset));
        let source = vendored.join(&file.source_subdir);

        let primary_manifest = file.manifest.primary.as_ref().map(|e| e.resolved(&workspace));
        let mut propagate: Vec<ManifestEntry> =
            file.manifest.propagate.iter().map(|e| e.resolved(&workspace)).collect();
        if !overrides.secondary_manifests.is_empty() {
            let Some(primary) = &primary_manifest else {
                return Err(RollError::Config(
                    "--secondary-manifest needs a primary manifest entry to copy".to_string(),
                ));
            };
            propagate.extend(overrides.secondary_manifests.iter().map(|path| ManifestEntry {
                manifest: resolve(&workspace, path),
                ..primary.clone()
            }));
        }

        let config = Self {
            mode: overrides.mode,
            name: file.name,
            commitish: overrides.commit.unwrap_or(file.commit),
            paths: RollPaths {
                vendored_readme: vendored.join(&file.vendored_readme),
                subset_readme: subset.join(&file.subset_readme),
                workspace,
                vendored,
                source,
                subset,
            },
            stages: Stages {
                source: !overrides.skip_source,
                trust_bundle: !overrides.skip_trust_bundle,
                subset: !overrides.skip_subset,
                bindings: !overrides.skip_bindings,
                propagate: !overrides.skip_propagate,
                commit: overrides.commit_changes,
            },
            stamp_prefix: file.stamp_prefix,
            source_subdir: file.source_subdir,
            buildgen: file.buildgen,
            subset_policy: file.subset_policy,
            bindings: file.bindings,
            manifest_tool: file.manifest.tool,
            primary_manifest,
            propagate,
            trust_bundle: file.trust_bundle,
            vcs: file.vcs,
            follow_up: file.follow_up,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check invariants the stages rely on.
    pub fn validate(&self) -> Result<(), RollError> {
        if self.name.trim().is_empty() {
            return Err(RollError::Config("library name is empty".to_string()));
        }
        if self.commitish.trim().is_empty() {
            return Err(RollError::Config("commit-ish is empty".to_string()));
        }
        if !self.stamp_prefix.ends_with('/') || self.stamp_prefix.len() < 2 {
            return Err(RollError::Config(format!(
                "stamp prefix '{}' must be a URL ending in '/'",
                self.stamp_prefix
            )));
        }
        if self.paths.subset == self.paths.vendored {
            return Err(RollError::Config(
                "subset and vendored trees must be different directories".to_string(),
            ));
        }
        Ok(())
    }

    /// Candidate upstream roots for subset files.
    pub fn upstream_lookup(&self) -> UpstreamLookup {
        UpstreamLookup::for_vendored(&self.paths.vendored, &self.source_subdir)
    }
}
