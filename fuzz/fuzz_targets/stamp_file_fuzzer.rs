//! Fuzz target for in-place revision stamping
//!
//! Writes an arbitrary README body, optionally followed by a well-formed
//! marker, and stamps a new revision into it.
//!
//! # Invariants
//!
//! - Never panics
//! - On success, every byte before the revision is unchanged and the file
//!   ends with `<prefix><revision>/`
//! - On failure, the file is byte-for-byte unchanged

#![no_main]

use std::fs;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use vendroll_core::{config::DEFAULT_STAMP_PREFIX, stamp::stamp_file};

#[derive(Debug, Arbitrary)]
struct Scenario {
    body: Vec<u8>,
    /// Append `<prefix><old>/` after the body
    with_marker: bool,
    old: String,
    new: String,
}

fuzz_target!(|s: Scenario| {
    let Ok(dir) = tempfile::tempdir() else {
        return;
    };
    let path = dir.path().join("README.fuchsia");

    let mut original = s.body.clone();
    if s.with_marker {
        original.extend_from_slice(DEFAULT_STAMP_PREFIX.as_bytes());
        original.extend_from_slice(s.old.as_bytes());
        original.push(b'/');
    }
    if fs::write(&path, &original).is_err() {
        return;
    }

    let result = stamp_file(&path, DEFAULT_STAMP_PREFIX, &s.new);
    let Ok(after) = fs::read(&path) else {
        return;
    };

    match result {
        Ok(outcome) => {
            let mut marker = DEFAULT_STAMP_PREFIX.as_bytes().to_vec();
            marker.extend_from_slice(s.new.as_bytes());
            marker.push(b'/');
            assert!(after.ends_with(&marker));
            assert_eq!(outcome.size, after.len() as u64);
            let kept = after.len() - marker.len();
            assert_eq!(&after[..kept], &original[..kept]);
        },
        Err(_) => assert_eq!(after, original),
    }
});
