//! Command-line surface.
//!
//! Flags override values from the config file. The workspace root comes from
//! `--workspace`, then `FUCHSIA_DIR`, then `VENDROLL_WORKSPACE`.

use std::path::{Path, PathBuf};

use clap::Parser;
use vendroll_core::{ConfigFile, Mode, Overrides, RollConfig, RollError};

/// Fallback environment variable for the workspace root.
pub const WORKSPACE_ENV: &str = "VENDROLL_WORKSPACE";

/// Roll a vendored library to a new upstream revision
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "vendroll")]
#[command(about = "Roll a vendored third-party library to a new upstream revision")]
#[command(version)]
pub struct Args {
    /// Workspace root directory
    #[arg(long, visible_alias = "fuchsia", env = "FUCHSIA_DIR")]
    pub workspace: Option<PathBuf>,

    /// Config file (default: <workspace>/vendroll.toml, if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Vendored tree, relative to the workspace root
    #[arg(long, visible_alias = "boring")]
    pub vendored: Option<PathBuf>,

    /// Restricted subset, relative to the workspace root
    #[arg(long, visible_alias = "zircon")]
    pub subset: Option<PathBuf>,

    /// Upstream commit-ish to check out
    #[arg(long)]
    pub commit: Option<String>,

    /// Additional manifest pinning the same project (repeatable)
    #[arg(long = "secondary-manifest", value_name = "PATH")]
    pub secondary_manifests: Vec<PathBuf>,

    /// Don't update upstream sources, the README stamp or build files
    #[arg(long, visible_alias = "skip-boring")]
    pub skip_source: bool,

    /// Don't refresh the trust bundle
    #[arg(long)]
    pub skip_trust_bundle: bool,

    /// Don't reconcile the restricted subset
    #[arg(long, visible_alias = "skip-zircon")]
    pub skip_subset: bool,

    /// Don't regenerate Rust bindings
    #[arg(long, visible_alias = "skip-rust")]
    pub skip_bindings: bool,

    /// Don't update secondary manifests
    #[arg(long)]
    pub skip_propagate: bool,

    /// Commit every touched repository after a successful roll
    #[arg(long)]
    pub commit_changes: bool,

    /// Discard local changes in every tracked repository and exit
    #[arg(long, conflicts_with = "submit")]
    pub reset: bool,

    /// Push every tracked repository for review and exit
    #[arg(long)]
    pub submit: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Selected mode.
    pub fn mode(&self) -> Mode {
        if self.reset {
            Mode::ResetAll
        } else if self.submit {
            Mode::SubmitAll
        } else {
            Mode::Roll
        }
    }

    /// Flag values layered over the config file.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            vendored: self.vendored.clone(),
            subset: self.subset.clone(),
            commit: self.commit.clone(),
            secondary_manifests: self.secondary_manifests.clone(),
            mode: self.mode(),
            skip_source: self.skip_source,
            skip_trust_bundle: self.skip_trust_bundle,
            skip_subset: self.skip_subset,
            skip_bindings: self.skip_bindings,
            skip_propagate: self.skip_propagate,
            commit_changes: self.commit_changes,
        }
    }

    /// Workspace root from the flag or `fallback` (normally
    /// `$VENDROLL_WORKSPACE`).
    pub fn workspace_or(&self, fallback: Option<PathBuf>) -> Result<PathBuf, RollError> {
        self.workspace
            .clone()
            .or(fallback)
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| {
                RollError::Config(format!(
                    "workspace root not set (pass --workspace, or set FUCHSIA_DIR or {WORKSPACE_ENV})"
                ))
            })
    }

    /// Load the config file and merge flags into a [`RollConfig`].
    pub fn resolve(&self, workspace: &Path) -> Result<RollConfig, RollError> {
        let file = ConfigFile::discover(workspace, self.config.as_deref())?;
        RollConfig::resolve(workspace, file, self.overrides())
    }
}
