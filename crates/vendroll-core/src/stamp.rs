//! Revision markers at the end of README files.
//!
//! Both the vendored tree and the restricted subset carry a README that ends
//! with a source URL whose last path segment is the pinned revision:
//!
//! ```text
//! ...
//! https://fuchsia.googlesource.com/third_party/boringssl/+/<revision>/
//! ```
//!
//! The marker is anchored at end-of-file with no trailing newline. Stamping
//! patches the revision segment in place and leaves every byte before it
//! untouched. If the file does not end with a well-formed marker nothing is
//! written.

use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::Path,
};

use crate::error::{FormatError, RollError};

/// Longest revision token accepted when scanning for an existing marker.
///
/// Full SHA-256 object names are 64 characters; this leaves room for tags
/// and branch names.
pub const MAX_REVISION_LEN: usize = 256;

/// Location of a marker inside a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerSpan {
    /// Offset of the first prefix byte
    pub prefix_start: usize,
    /// Offset of the first revision byte (end of prefix)
    pub revision_start: usize,
    /// Offset of the trailing `/`, which is the last byte of the buffer
    pub revision_end: usize,
}

impl MarkerSpan {
    /// Revision bytes within the buffer this span was located in.
    pub fn revision<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.revision_start..self.revision_end]
    }
}

/// What a successful stamp changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StampOutcome {
    /// Revision recorded before the stamp
    pub previous: String,
    /// File size after the stamp
    pub size: u64,
}

fn is_revision_byte(b: u8) -> bool {
    b != b'/' && !b.is_ascii_whitespace()
}

/// Whether `revision` can be written into a marker.
pub fn is_valid_revision(revision: &str) -> bool {
    !revision.is_empty()
        && revision.len() <= MAX_REVISION_LEN
        && revision.bytes().all(is_revision_byte)
}

/// Find `<prefix><revision>/` anchored at the end of `buf`.
///
/// The revision is the non-empty run of bytes between the final `/` and the
/// `/` before it, so `prefix` must itself end with `/`.
pub fn locate_marker(buf: &[u8], prefix: &[u8]) -> Option<MarkerSpan> {
    if prefix.last() != Some(&b'/') {
        return None;
    }
    let (&last, body) = buf.split_last()?;
    if last != b'/' {
        return None;
    }

    let revision_start = body.iter().rposition(|&b| b == b'/')? + 1;
    let revision = &body[revision_start..];
    if revision.is_empty()
        || revision.len() > MAX_REVISION_LEN
        || !revision.iter().copied().all(is_revision_byte)
    {
        return None;
    }

    let prefix_start = revision_start.checked_sub(prefix.len())?;
    if &body[prefix_start..revision_start] != prefix {
        return None;
    }

    Some(MarkerSpan { prefix_start, revision_start, revision_end: body.len() })
}

/// Read the last `len` bytes (or the whole file if shorter).
fn read_tail(file: &mut File, size: u64, len: u64) -> std::io::Result<(u64, Vec<u8>)> {
    let start = size.saturating_sub(len);
    file.seek(SeekFrom::Start(start))?;
    let mut buf = Vec::with_capacity((size - start) as usize);
    file.take(size - start).read_to_end(&mut buf)?;
    Ok((start, buf))
}

/// Revision currently recorded at the end of `path`.
pub fn read_stamp(path: &Path, prefix: &str) -> Result<String, RollError> {
    let mut file = File::open(path).map_err(|e| RollError::io(path, e))?;
    let size = file.metadata().map_err(|e| RollError::io(path, e))?.len();
    let window = (prefix.len() + MAX_REVISION_LEN + 1) as u64;
    let (_, tail) = read_tail(&mut file, size, window).map_err(|e| RollError::io(path, e))?;

    let span = locate_marker(&tail, prefix.as_bytes())
        .ok_or(RollError::Format { path: path.to_path_buf(), kind: FormatError::MissingMarker })?;
    Ok(String::from_utf8_lossy(span.revision(&tail)).into_owned())
}

/// Rewrite the revision at the end of `path` to `revision`.
///
/// The expected marker offset is computed from the new revision's length.
/// When the old revision has the same length the prefix lands there and the
/// revision bytes are overwritten in place. Otherwise the tail is scanned for
/// the existing marker, the new revision is written after the prefix and the
/// file is resized to end right after the trailing `/`.
///
/// On any format error the file is left unmodified.
pub fn stamp_file(path: &Path, prefix: &str, revision: &str) -> Result<StampOutcome, RollError> {
    if !is_valid_revision(revision) {
        return Err(RollError::Config(format!("'{revision}' is not a valid revision token")));
    }

    let io_err = |e| RollError::io(path, e);
    let mut file = OpenOptions::new().read(true).write(true).open(path).map_err(io_err)?;
    let size = file.metadata().map_err(io_err)?.len();

    let needed = (prefix.len() + revision.len() + 1) as u64;
    let window = (prefix.len() + MAX_REVISION_LEN + 1) as u64;
    let (tail_start, tail) = read_tail(&mut file, size, window.max(needed)).map_err(io_err)?;

    let span = locate_marker(&tail, prefix.as_bytes()).ok_or_else(|| {
        let kind = if size < needed {
            FormatError::Truncated { size, needed }
        } else {
            FormatError::MissingMarker
        };
        RollError::Format { path: path.to_path_buf(), kind }
    })?;

    let previous = String::from_utf8_lossy(span.revision(&tail)).into_owned();
    let revision_start = tail_start + span.revision_start as u64;
    let new_size = revision_start + revision.len() as u64 + 1;

    let mut replacement = Vec::with_capacity(revision.len() + 1);
    replacement.extend_from_slice(revision.as_bytes());
    replacement.push(b'/');

    file.seek(SeekFrom::Start(revision_start)).map_err(io_err)?;
    file.write_all(&replacement).map_err(io_err)?;
    if new_size < size {
        file.set_len(new_size).map_err(io_err)?;
    }
    file.flush().map_err(io_err)?;

    if new_size == size {
        tracing::debug!(path = %path.display(), "patched revision in place");
    } else {
        tracing::debug!(path = %path.display(), old = size, new = new_size, "resized revision marker");
    }

    Ok(StampOutcome { previous, size: new_size })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    const PREFIX: &str = "https://fuchsia.googlesource.com/third_party/boringssl/+/";

    fn write_readme(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("README.fuchsia");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn same_length_revision_is_patched_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_readme(dir.path(), &format!("Name: BoringSSL\nURL: {PREFIX}deadbeef/"));

        let outcome = stamp_file(&path, PREFIX, "cafef00d").unwrap();

        assert_eq!(outcome.previous, "deadbeef");
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            format!("Name: BoringSSL\nURL: {PREFIX}cafef00d/")
        );
    }

    #[test]
    fn longer_revision_grows_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_readme(dir.path(), &format!("header\n{PREFIX}abc/"));
        let full = "0123456789abcdef0123456789abcdef01234567";

        stamp_file(&path, PREFIX, full).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), format!("header\n{PREFIX}{full}/"));
        assert_eq!(read_stamp(&path, PREFIX).unwrap(), full);
    }

    #[test]
    fn shorter_revision_truncates_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_readme(
            dir.path(),
            &format!("header\n{PREFIX}0123456789abcdef0123456789abcdef01234567/"),
        );

        stamp_file(&path, PREFIX, "v1").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), format!("header\n{PREFIX}v1/"));
    }

    #[test]
    fn trailing_newline_is_rejected_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let original = format!("header\n{PREFIX}deadbeef/\n");
        let path = write_readme(dir.path(), &original);

        let err = stamp_file(&path, PREFIX, "cafef00d").unwrap_err();

        assert!(matches!(err, RollError::Format { kind: FormatError::MissingMarker, .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn short_file_reports_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_readme(dir.path(), "tiny");

        let err = stamp_file(&path, PREFIX, "cafef00d").unwrap_err();

        assert!(matches!(err, RollError::Format { kind: FormatError::Truncated { size: 4, .. }, .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "tiny");
    }

    #[test]
    fn invalid_revision_token_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_readme(dir.path(), &format!("{PREFIX}deadbeef/"));

        assert!(matches!(stamp_file(&path, PREFIX, "a/b"), Err(RollError::Config(_))));
        assert!(matches!(stamp_file(&path, PREFIX, ""), Err(RollError::Config(_))));
    }

    #[test]
    fn locate_requires_exact_prefix() {
        assert!(locate_marker(b"x/y/+/abc/", b"/+/").is_some());
        assert!(locate_marker(b"x/y/-/abc/", b"/+/").is_none());
        assert!(locate_marker(b"/+//", b"/+/").is_none());
        assert!(locate_marker(b"/+/abc", b"/+/").is_none());
    }

    #[test]
    fn locate_reports_span() {
        let buf = b"...foo/bar/+/deadbeef/";
        let span = locate_marker(buf, b"/+/").unwrap();
        assert_eq!(span.prefix_start, 10);
        assert_eq!(span.revision(buf), b"deadbeef");
        assert_eq!(span.revision_end, buf.len() - 1);
    }
}
