//! Production glue for the `vendroll` binary.
//!
//! Supplies the real-process [`SystemRunner`] and HTTP [`HttpFetcher`]
//! implementations of the core seams, and the clap [`Args`] surface that
//! becomes a [`vendroll_core::RollConfig`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod http_fetcher;
pub mod system_runner;

pub use cli::Args;
pub use http_fetcher::HttpFetcher;
pub use system_runner::SystemRunner;
