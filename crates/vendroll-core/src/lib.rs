//! Revision roll for a vendored third-party library.
//!
//! A roll moves a vendored upstream checkout to a new revision and brings
//! everything derived from it along: the README revision stamp, generated
//! build files, an optional trust bundle, a hand-curated restricted subset,
//! Rust bindings and the manifests that pin the revision.
//!
//! # Architecture
//!
//! Every stage is a function over an injected [`CommandRunner`] (and, for the
//! trust bundle, a [`Fetcher`]). Production wires in process and HTTP
//! implementations; tests wire in scripted ones from `vendroll-harness`.
//! [`RollDriver`] sequences the stages over a single immutable
//! [`RollConfig`] and stops at the first failure.
//!
//! File-level work (stamp editing, digests, subset reconciliation, binding
//! decoration) is done directly on the filesystem by this crate.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bindings;
pub mod buildgen;
pub mod config;
pub mod digest;
pub mod driver;
pub mod error;
pub mod manifest;
pub mod pending;
pub mod runner;
pub mod source;
pub mod stamp;
pub mod subset;
pub mod trust_bundle;
pub mod workflow;

pub use config::{ConfigFile, Mode, Overrides, RollConfig, RollPaths, Stages};
pub use digest::{Digest, digest_bytes, digest_file};
pub use driver::{RollDriver, RollOutcome, Stage};
pub use error::{FormatError, ProcessFailure, RollError};
pub use manifest::{EntryKind, ManifestEntry};
pub use pending::{ManualInterventionSet, PendingActions};
pub use runner::{CommandRunner, Fetcher, Invocation};
pub use source::Revision;
pub use subset::{Classification, ReconcileReport, SubsetPolicy, UpstreamLookup};
