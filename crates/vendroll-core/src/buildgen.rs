//! Build-file regeneration from the vendored sources.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    error::RollError,
    runner::{CommandRunner, Invocation},
};

/// How to invoke the upstream build-file generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildGenConfig {
    /// Interpreter for the generator script
    pub interpreter: String,
    /// Script path relative to the vendored source directory
    pub script: String,
    /// Output format selector passed to the script
    pub format: String,
}

impl Default for BuildGenConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            script: "util/generate_build_files.py".to_string(),
            format: "gn".to_string(),
        }
    }
}

/// Regenerate build manifests for the vendored tree.
///
/// Runs in `vendored_root`; the generator writes its outputs there.
pub fn generate<R: CommandRunner>(
    runner: &R,
    config: &BuildGenConfig,
    vendored_root: &Path,
    source_dir: &Path,
) -> Result<(), RollError> {
    let script = source_dir.join(&config.script);
    let inv = Invocation::new(&config.interpreter)
        .current_dir(vendored_root)
        .arg(script.to_string_lossy())
        .arg(&config.format);

    tracing::info!(format = %config.format, "generating build files");
    runner.run(&inv).map_err(RollError::GenerationProcess)?;
    Ok(())
}
