//! Deterministic test harness for vendroll.
//!
//! Scripted implementations of the [`vendroll_core::CommandRunner`] and
//! [`vendroll_core::Fetcher`] seams, plus a scratch [`Workspace`] with the
//! default roll layout. Together they let every stage and the full driver
//! run without git, python, a binding generator or network access.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod scripted_runner;
pub mod static_fetcher;
pub mod workspace;

pub use scripted_runner::{Effect, ScriptedRunner};
pub use static_fetcher::StaticFetcher;
pub use workspace::{PREVIOUS_REVISION, RAW_BINDINGS, UPSTREAM_REVISION, Workspace};
