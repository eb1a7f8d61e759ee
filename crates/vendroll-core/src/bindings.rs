//! Rust bindings for the vendored library.
//!
//! The binding generator is opaque: it is pointed at an aggregate header,
//! restricted to the library's own symbols with an allow-list, and its raw
//! output is decorated with a license header, lint suppressions for the
//! C-style names, and a link directive. The raw output is kept verbatim after
//! the prepended block.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::RollError,
    runner::{CommandRunner, Invocation},
};

/// Symbols the generator may emit. Anything else (libc, platform types) is
/// pulled in only as a dependency of an allowed symbol.
pub const DEFAULT_ALLOWLIST: &str =
    "^(?:BSSL|bssl|SSL|ssl|CRYPTO|OPENSSL|EVP|EC|BN|RSA|X509|ERR|HMAC|SHA\\d*|AES|ED25519|X25519)_.*";

/// Lints the generated names would otherwise trip.
pub const ALLOW_ATTRIBUTE: &str =
    "#![allow(non_camel_case_types, non_snake_case, non_upper_case_globals, dead_code)]";

const DEFAULT_LICENSE: &str = "Copyright 2017 The Fuchsia Authors. All rights reserved.\n\
Use of this source code is governed by a BSD-style license that can be\n\
found in the LICENSE file.\n\
\n\
Generated by the binding generator. Do not edit.";

/// Binding generator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BindingsConfig {
    /// Generator program
    pub generator: String,
    /// Aggregate header, relative to the vendored root
    pub header: PathBuf,
    /// Include directories, relative to the vendored root
    pub include_dirs: Vec<PathBuf>,
    /// Generated Rust file, relative to the vendored root
    pub output: PathBuf,
    /// Regular expression restricting generated functions, types and vars
    pub allowlist: String,
    /// Native library the bindings link against
    pub link_name: String,
    /// License text, one comment line per text line
    pub license_header: String,
}

impl Default for BindingsConfig {
    fn default() -> Self {
        Self {
            generator: "bindgen".to_string(),
            header: PathBuf::from("rust/boringssl-sys/boringssl.h"),
            include_dirs: vec![PathBuf::from("src/include")],
            output: PathBuf::from("rust/boringssl-sys/src/lib.rs"),
            allowlist: DEFAULT_ALLOWLIST.to_string(),
            link_name: "boringssl".to_string(),
            license_header: DEFAULT_LICENSE.to_string(),
        }
    }
}

/// Prepend the license, lint suppressions and link directive to `raw`.
pub fn decorate(raw: &str, license_header: &str, link_name: &str) -> String {
    let mut out = String::with_capacity(raw.len() + license_header.len() + 256);

    for line in license_header.lines() {
        if line.is_empty() {
            out.push_str("//\n");
        } else {
            out.push_str(&format!("// {line}\n"));
        }
    }
    out.push('\n');
    out.push_str(ALLOW_ATTRIBUTE);
    out.push_str("\n\n");
    out.push_str(&format!("#[link(name = \"{link_name}\")]\n"));
    out.push_str("unsafe extern \"C\" {}\n\n");
    out.push_str(raw);
    out
}

/// Run the generator and write decorated bindings.
///
/// Returns the path of the written bindings file.
pub fn generate_bindings<R: CommandRunner>(
    runner: &R,
    config: &BindingsConfig,
    vendored_root: &Path,
) -> Result<PathBuf, RollError> {
    let header = vendored_root.join(&config.header);
    fs::File::open(&header).map_err(|e| RollError::Generation {
        what: "bindings",
        reason: format!("header {} is unreadable: {e}", header.display()),
    })?;

    let output = vendored_root.join(&config.output);
    let raw_path = output.with_extension("rs.raw");
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).map_err(|e| RollError::io(parent, e))?;
    }

    let mut inv = Invocation::new(&config.generator)
        .current_dir(vendored_root)
        .arg(header.to_string_lossy())
        .arg("-o")
        .arg(raw_path.to_string_lossy())
        .args(["--use-core", "--no-layout-tests"]);
    for flag in ["--allowlist-function", "--allowlist-type", "--allowlist-var"] {
        inv = inv.arg(flag).arg(&config.allowlist);
    }
    if !config.include_dirs.is_empty() {
        inv = inv.arg("--");
        for dir in &config.include_dirs {
            inv = inv.arg(format!("-I{}", vendored_root.join(dir).display()));
        }
    }

    tracing::info!(header = %header.display(), "generating bindings");
    runner.run(&inv).map_err(RollError::GenerationProcess)?;

    let raw = fs::read_to_string(&raw_path).map_err(|e| RollError::Generation {
        what: "bindings",
        reason: format!("generator produced no readable output at {}: {e}", raw_path.display()),
    })?;

    let decorated = decorate(&raw, &config.license_header, &config.link_name);
    fs::write(&output, decorated).map_err(|e| RollError::io(&output, e))?;
    fs::remove_file(&raw_path).map_err(|e| RollError::io(&raw_path, e))?;

    tracing::info!(output = %output.display(), "bindings written");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::error::ProcessFailure;

    const RAW: &str = "pub fn SSL_new(ctx: *mut SSL_CTX) -> *mut SSL;\n";

    #[derive(Default)]
    struct CountingRunner {
        calls: Cell<usize>,
    }

    impl CommandRunner for CountingRunner {
        fn run(&self, _invocation: &Invocation) -> Result<Vec<u8>, ProcessFailure> {
            self.calls.set(self.calls.get() + 1);
            Ok(Vec::new())
        }
    }

    #[test]
    fn unreadable_header_is_a_generation_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = CountingRunner::default();

        let err = generate_bindings(&runner, &BindingsConfig::default(), dir.path()).unwrap_err();

        let RollError::Generation { what, reason } = &err else {
            unreachable!("unexpected error: {err}");
        };
        assert_eq!(*what, "bindings");
        assert!(reason.contains("unreadable"));
        assert_eq!(runner.calls.get(), 0);
        assert!(!dir.path().join(BindingsConfig::default().output).exists());
    }

    #[test]
    fn decorate_keeps_raw_output_verbatim_at_the_end() {
        let out = decorate(RAW, "License line", "boringssl");
        assert!(out.ends_with(RAW));
    }

    #[test]
    fn decorate_snapshot() {
        let out = decorate(RAW, "Copyright The Authors.\n\nDo not edit.", "boringssl");
        insta::assert_snapshot!(out);
    }

    #[test]
    fn decorate_orders_license_allow_and_link() {
        let out = decorate("", "L", "crypto");
        let license = out.find("// L").unwrap();
        let allow = out.find(ALLOW_ATTRIBUTE).unwrap();
        let link = out.find("#[link(name = \"crypto\")]").unwrap();
        assert!(license < allow && allow < link);
    }
}
