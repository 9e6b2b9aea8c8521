//! Library half of `dynsprite-ctl`: argument types, manifest loading and the
//! fetch pipeline, kept out of `main.rs` so tests can drive them directly.
#![allow(missing_docs)]

pub mod cli;
pub mod manifest_source;
pub mod pipeline;

pub use cli::{Cli, Command, FetchArgs, StyleArg};
pub use manifest_source::load_manifest;
pub use pipeline::{FetchReport, RenderedLine, run_fetch, run_fetch_with};
