//! Fuzz target for binding decoration
//!
//! # Invariants
//!
//! - Never panics on any license text or link name
//! - Generator output is kept verbatim at the end
//! - Every license line is emitted as a comment

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use vendroll_core::bindings::{ALLOW_ATTRIBUTE, decorate};

#[derive(Debug, Arbitrary)]
struct Input {
    raw: String,
    license: String,
    link_name: String,
}

fuzz_target!(|input: Input| {
    let out = decorate(&input.raw, &input.license, &input.link_name);

    assert!(out.ends_with(&input.raw));
    assert!(out.contains(ALLOW_ATTRIBUTE));

    let header = &out[..out.len() - input.raw.len()];
    let license_lines = input.license.lines().count();
    assert!(header.lines().take(license_lines).all(|line| line.starts_with("//")));
});
