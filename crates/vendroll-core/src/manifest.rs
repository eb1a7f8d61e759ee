//! Recording the new pin in dependency manifests.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    error::RollError,
    runner::{CommandRunner, Invocation},
    source::Revision,
};

/// Kind of manifest element that pins the vendored library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A `<project>` element
    #[default]
    Project,
    /// An `<import>` element
    Import,
}

impl EntryKind {
    fn flag(self) -> &'static str {
        match self {
            Self::Project => "-project",
            Self::Import => "-import",
        }
    }
}

/// One manifest entry to keep pointed at the vendored revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestEntry {
    /// Manifest file, relative to the workspace root in config files
    pub manifest: PathBuf,
    /// Project or import name inside the manifest
    pub name: String,
    /// Element kind
    #[serde(default)]
    pub kind: EntryKind,
}

impl ManifestEntry {
    /// Same entry with `manifest` resolved against `root`.
    #[must_use]
    pub fn resolved(&self, root: &Path) -> Self {
        Self { manifest: root.join(&self.manifest), ..self.clone() }
    }
}

/// Set `entry`'s recorded revision to `revision.canonical`.
///
/// `tool` is the manifest editor (`jiri` by default), invoked as
/// `<tool> edit -project=<name>=<revision> <manifest>`.
pub fn update_manifest<R: CommandRunner>(
    runner: &R,
    tool: &str,
    entry: &ManifestEntry,
    revision: &Revision,
) -> Result<(), RollError> {
    let edit = format!("{}={}={}", entry.kind.flag(), entry.name, revision.canonical);
    let inv = Invocation::new(tool)
        .arg("edit")
        .arg(edit)
        .arg(entry.manifest.to_string_lossy());

    tracing::info!(
        manifest = %entry.manifest.display(),
        name = %entry.name,
        revision = %revision.canonical,
        "updating manifest"
    );
    runner.run(&inv).map_err(RollError::Manifest)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_lowercase() {
        let entry: ManifestEntry = toml::from_str(
            "manifest = \"integration/flower\"\nname = \"boringssl\"\nkind = \"import\"\n",
        )
        .unwrap();
        assert_eq!(entry.kind, EntryKind::Import);
    }

    #[test]
    fn kind_defaults_to_project() {
        let entry: ManifestEntry =
            toml::from_str("manifest = \"m\"\nname = \"third_party/boringssl\"\n").unwrap();
        assert_eq!(entry.kind, EntryKind::Project);
    }

    #[test]
    fn resolved_joins_root() {
        let entry = ManifestEntry {
            manifest: PathBuf::from("integration/flower"),
            name: "boringssl".to_string(),
            kind: EntryKind::Project,
        };
        assert_eq!(
            entry.resolved(Path::new("/ws")).manifest,
            PathBuf::from("/ws/integration/flower")
        );
    }
}
