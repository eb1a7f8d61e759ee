//! Config layering: defaults, then the config file, then flags.

use std::{fs, path::PathBuf};

use clap::Parser;
use vendroll_cli::Args;
use vendroll_core::{Mode, RollError};

fn parse(args: &[&str]) -> Args {
    Args::try_parse_from(std::iter::once("vendroll").chain(args.iter().copied())).unwrap()
}

#[test]
fn workspace_config_file_is_picked_up() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("vendroll.toml"),
        "name = \"openssl\"\nvendored = \"third_party/openssl\"\ncommit = \"origin/main\"\n",
    )
    .unwrap();

    let config = parse(&[]).resolve(dir.path()).unwrap();

    assert_eq!(config.name, "openssl");
    assert_eq!(config.commitish, "origin/main");
    assert_eq!(config.paths.vendored, dir.path().join("third_party/openssl"));
    assert_eq!(config.paths.source, dir.path().join("third_party/openssl/src"));
}

#[test]
fn flags_override_the_config_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("vendroll.toml"), "commit = \"origin/main\"\n").unwrap();

    let config = parse(&["--commit", "v2", "--skip-subset", "--reset"])
        .resolve(dir.path())
        .unwrap();

    assert_eq!(config.commitish, "v2");
    assert!(!config.stages.subset);
    assert_eq!(config.mode, Mode::ResetAll);
}

#[test]
fn explicit_config_path_is_relative_to_workspace() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("tools")).unwrap();
    fs::write(dir.path().join("tools/roll.toml"), "subset = \"kernel/ssl\"\n").unwrap();

    let config = parse(&["--config", "tools/roll.toml"]).resolve(dir.path()).unwrap();

    assert_eq!(config.paths.subset, dir.path().join("kernel/ssl"));
}

#[test]
fn unknown_config_keys_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("vendroll.toml"), "vendord = \"typo\"\n").unwrap();

    let err = parse(&[]).resolve(dir.path()).unwrap_err();

    assert!(matches!(err, RollError::Config(_)));
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn missing_explicit_config_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();

    let err = parse(&["--config", "absent.toml"]).resolve(dir.path()).unwrap_err();

    assert!(matches!(err, RollError::Io { .. }));
}

#[test]
fn secondary_manifests_copy_the_primary_entry() {
    let dir = tempfile::tempdir().unwrap();

    let config = parse(&["--secondary-manifest", "integration/zircon/flower"])
        .resolve(dir.path())
        .unwrap();

    let primary = config.primary_manifest.unwrap();
    assert_eq!(config.propagate.len(), 1);
    assert_eq!(config.propagate[0].name, primary.name);
    assert_eq!(
        config.propagate[0].manifest,
        dir.path().join(PathBuf::from("integration/zircon/flower"))
    );
}
