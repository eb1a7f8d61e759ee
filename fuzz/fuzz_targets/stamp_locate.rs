//! Fuzz target for the README marker locator
//!
//! Feeds arbitrary bytes to `locate_marker` with the default prefix.
//!
//! # Invariants
//!
//! - Never panics, whatever the buffer holds
//! - A located span ends at the final byte, which is `/`
//! - The bytes before the revision are exactly the prefix
//! - The revision is non-empty and contains no `/` or whitespace

#![no_main]

use libfuzzer_sys::fuzz_target;
use vendroll_core::{config::DEFAULT_STAMP_PREFIX, stamp::locate_marker};

fuzz_target!(|data: &[u8]| {
    let prefix = DEFAULT_STAMP_PREFIX.as_bytes();
    let Some(span) = locate_marker(data, prefix) else {
        return;
    };

    assert_eq!(span.revision_end + 1, data.len());
    assert_eq!(data[span.revision_end], b'/');
    assert_eq!(&data[span.prefix_start..span.revision_start], prefix);

    let revision = span.revision(data);
    assert!(!revision.is_empty());
    assert!(revision.iter().all(|&b| b != b'/' && !b.is_ascii_whitespace()));
});
