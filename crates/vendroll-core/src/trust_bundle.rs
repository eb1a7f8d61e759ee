//! Root-certificate trust bundle refresh.
//!
//! Some vendored trees ship a PEM trust bundle derived from an externally
//! hosted certificate list. Refreshing it downloads the list, converts it with
//! an external tool, and writes a stamp recording where the list came from,
//! its digest, and when it was fetched.

use std::{fs, path::{Path, PathBuf}};

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    digest::{Digest, digest_bytes},
    error::RollError,
    runner::{CommandRunner, Fetcher, Invocation},
};

/// Trust bundle settings. Paths are relative to the vendored root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrustBundleConfig {
    /// Where the raw certificate list is published
    pub url: String,
    /// Converter program
    pub converter: String,
    /// Arguments placed before `<raw> <pem>`
    #[serde(default)]
    pub converter_args: Vec<String>,
    /// Downloaded raw list
    #[serde(default = "default_raw")]
    pub raw: PathBuf,
    /// Converted PEM bundle
    #[serde(default = "default_pem")]
    pub pem: PathBuf,
    /// JSON stamp describing the last fetch
    #[serde(default = "default_stamp")]
    pub stamp: PathBuf,
}

fn default_raw() -> PathBuf {
    PathBuf::from("certs/certdata.txt")
}

fn default_pem() -> PathBuf {
    PathBuf::from("certs/cert.pem")
}

fn default_stamp() -> PathBuf {
    PathBuf::from("certs/certdata.stamp.json")
}

/// Contents of the stamp file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchStamp {
    /// Source URL
    pub url: String,
    /// Digest of the raw list
    pub sha256: Digest,
    /// RFC 3339 UTC fetch time
    pub fetched_at: String,
}

/// What a refresh did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustBundleOutcome {
    /// Digest of the fetched list
    pub digest: Digest,
    /// False when the list matched the previous stamp and nothing was rewritten
    pub changed: bool,
}

/// Read a previously written stamp, if present and parseable.
pub fn read_stamp(path: &Path) -> Option<FetchStamp> {
    let text = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&text) {
        Ok(stamp) => Some(stamp),
        Err(e) => {
            tracing::warn!(path = %path.display(), "ignoring unreadable trust bundle stamp: {e}");
            None
        },
    }
}

fn write_file_parent(path: &Path) -> Result<(), RollError> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent).map_err(|e| RollError::io(parent, e)),
        None => Ok(()),
    }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), RollError> {
    write_file_parent(path)?;
    fs::write(path, contents).map_err(|e| RollError::io(path, e))
}

/// Sibling path the fetched list and converted bundle are written to until
/// conversion succeeds.
fn staged(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".new");
    path.with_file_name(name)
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(path = %path.display(), "failed to remove staged file: {e}");
    }
}

/// Fetch, convert and stamp the trust bundle.
pub fn refresh<R: CommandRunner, F: Fetcher>(
    fetcher: &F,
    runner: &R,
    config: &TrustBundleConfig,
    vendored_root: &Path,
    now: OffsetDateTime,
) -> Result<TrustBundleOutcome, RollError> {
    tracing::info!(url = %config.url, "fetching trust bundle");
    let body = fetcher
        .get(&config.url)
        .map_err(|reason| RollError::Fetch { url: config.url.clone(), reason })?;
    let digest = digest_bytes(&body);

    let raw = vendored_root.join(&config.raw);
    let pem = vendored_root.join(&config.pem);
    let stamp_path = vendored_root.join(&config.stamp);

    if let Some(previous) = read_stamp(&stamp_path)
        && previous.sha256 == digest
        && previous.url == config.url
        && pem.is_file()
    {
        tracing::info!(sha256 = %digest, "trust bundle unchanged");
        return Ok(TrustBundleOutcome { digest, changed: false });
    }

    let staged_raw = staged(&raw);
    let staged_pem = staged(&pem);
    write_file(&staged_raw, &body)?;

    let inv = Invocation::new(&config.converter)
        .current_dir(vendored_root)
        .args(config.converter_args.iter().cloned())
        .arg(staged_raw.to_string_lossy())
        .arg(staged_pem.to_string_lossy());
    let converted = runner.run(&inv).map_err(RollError::GenerationProcess).and_then(|_| {
        if staged_pem.is_file() {
            Ok(())
        } else {
            Err(RollError::Generation {
                what: "trust bundle",
                reason: format!("converter did not produce {}", staged_pem.display()),
            })
        }
    });
    if let Err(e) = converted {
        discard(&staged_raw);
        discard(&staged_pem);
        return Err(e);
    }

    write_file_parent(&pem)?;
    fs::rename(&staged_pem, &pem).map_err(|e| RollError::io(&pem, e))?;
    fs::rename(&staged_raw, &raw).map_err(|e| RollError::io(&raw, e))?;

    let fetched_at = now.format(&Rfc3339).map_err(|e| RollError::Generation {
        what: "trust bundle stamp",
        reason: e.to_string(),
    })?;
    let stamp = FetchStamp { url: config.url.clone(), sha256: digest, fetched_at };
    let json = serde_json::to_string_pretty(&stamp).map_err(|e| RollError::Generation {
        what: "trust bundle stamp",
        reason: e.to_string(),
    })?;
    write_file(&stamp_path, json.as_bytes())?;

    tracing::info!(sha256 = %digest, "trust bundle refreshed");
    Ok(TrustBundleOutcome { digest, changed: true })
}
