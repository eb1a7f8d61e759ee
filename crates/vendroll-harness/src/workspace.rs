//! Scratch workspace laid out like a real checkout.
//!
//! Builds the default layout in a temporary directory: vendored tree with its
//! README marker and binding header, an empty upstream source directory, a
//! restricted subset with its own README marker and build file, and the
//! primary manifest. Tests add upstream and subset files on top.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tempfile::TempDir;
use vendroll_core::{
    ConfigFile, Overrides, RollConfig, RollError,
    config::DEFAULT_STAMP_PREFIX,
};

use crate::ScriptedRunner;

/// Revision recorded in both README markers before a roll.
pub const PREVIOUS_REVISION: &str = "1111111111111111111111111111111111111111";

/// Revision the scripted `git rev-list` reports.
pub const UPSTREAM_REVISION: &str = "abcdef0123456789abcdef0123456789abcdef01";

/// Output the scripted binding generator writes.
pub const RAW_BINDINGS: &str = "pub fn SSL_library_init() -> i32;\n";

/// Temporary workspace with the default roll layout.
pub struct Workspace {
    dir: TempDir,
    layout: ConfigFile,
}

impl Workspace {
    /// Create the default layout.
    pub fn new() -> io::Result<Self> {
        let ws = Self { dir: tempfile::tempdir()?, layout: ConfigFile::default() };

        let marker = format!("Name: BoringSSL\nURL: {DEFAULT_STAMP_PREFIX}{PREVIOUS_REVISION}/");
        ws.write(ws.layout.vendored.join(&ws.layout.vendored_readme), &marker)?;
        ws.write(ws.layout.subset.join(&ws.layout.subset_readme), &marker)?;
        ws.write(ws.layout.subset.join("BUILD.gn"), "source_set(\"uboringssl\") {}\n")?;
        ws.write(
            ws.layout.vendored.join(&ws.layout.bindings.header),
            "#include <openssl/ssl.h>\n",
        )?;
        if let Some(primary) = &ws.layout.manifest.primary {
            ws.write(&primary.manifest, "<manifest/>\n")?;
        }
        fs::create_dir_all(ws.source())?;

        Ok(ws)
    }

    /// Workspace root.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of workspace-relative `rel`.
    pub fn path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root().join(rel)
    }

    /// Vendored tree root.
    pub fn vendored(&self) -> PathBuf {
        self.path(&self.layout.vendored)
    }

    /// Upstream source checkout.
    pub fn source(&self) -> PathBuf {
        self.vendored().join(&self.layout.source_subdir)
    }

    /// Restricted subset root.
    pub fn subset(&self) -> PathBuf {
        self.path(&self.layout.subset)
    }

    /// Vendored README carrying the revision marker.
    pub fn vendored_readme(&self) -> PathBuf {
        self.vendored().join(&self.layout.vendored_readme)
    }

    /// Subset README carrying the revision marker.
    pub fn subset_readme(&self) -> PathBuf {
        self.subset().join(&self.layout.subset_readme)
    }

    /// Write `contents` to workspace-relative `rel`, creating parents.
    pub fn write(&self, rel: impl AsRef<Path>, contents: &str) -> io::Result<PathBuf> {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Write a file into the upstream source checkout.
    pub fn write_upstream(&self, rel: &str, contents: &str) -> io::Result<PathBuf> {
        self.write(self.source().join(rel), contents)
    }

    /// Write a file into the vendored root (generated files live here).
    pub fn write_vendored(&self, rel: &str, contents: &str) -> io::Result<PathBuf> {
        self.write(self.vendored().join(rel), contents)
    }

    /// Write a file into the restricted subset.
    pub fn write_subset(&self, rel: &str, contents: &str) -> io::Result<PathBuf> {
        self.write(self.subset().join(rel), contents)
    }

    /// Read a workspace-relative or absolute file.
    pub fn read(&self, rel: impl AsRef<Path>) -> io::Result<String> {
        fs::read_to_string(self.path(rel))
    }

    /// Resolve the default configuration against this workspace.
    pub fn config(&self, overrides: Overrides) -> Result<RollConfig, RollError> {
        self.config_from(self.layout.clone(), overrides)
    }

    /// Resolve a customized configuration against this workspace.
    pub fn config_from(
        &self,
        file: ConfigFile,
        overrides: Overrides,
    ) -> Result<RollConfig, RollError> {
        RollConfig::resolve(self.root(), file, overrides)
    }

    /// Runner scripted for a clean roll: `git rev-list` reports
    /// [`UPSTREAM_REVISION`] and the binding generator writes
    /// [`RAW_BINDINGS`] to its `-o` argument.
    pub fn runner(&self) -> ScriptedRunner {
        let runner = ScriptedRunner::new();
        runner.respond("git", &["rev-list"], &format!("{UPSTREAM_REVISION}\n"));
        runner.on("bindgen", &[], |inv| {
            let out = inv
                .args
                .iter()
                .position(|a| a == "-o")
                .and_then(|i| inv.args.get(i + 1))
                .ok_or_else(|| inv.failure(Some(1), "missing -o"))?;
            fs::write(out, RAW_BINDINGS).map_err(|e| inv.failure(Some(1), e.to_string()))?;
            Ok(Vec::new())
        });
        runner
    }
}
