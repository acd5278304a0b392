//! # Command-Line Interface
//!
//! User-facing commands and output formatting.
//!
//! ## Commands
//!
//! | Command | Purpose | Network |
//! |---------|---------|---------|
//! | `scan` (default) | Search eBay/Swappa, classify, write report | yes |
//! | `classify <FILE>` | Same pipeline over saved listings | no |
//! | `check <MODEL> <VERSION>` | One compatibility question | no |
//! | `models` | Print the compatibility table | no |
//!
//! ## Output Formats
//!
//! All commands support the `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON on stdout
//!
//! ## Logging
//!
//! Logs go to stderr through `tracing`. `--verbose` (or `-v`) turns on debug
//! output for this crate; `RUST_LOG` overrides both:
//! ```bash
//! RUST_LOG=jbscrape=trace jbscrape scan --sites swappa
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod check;
mod classify_cmd;
mod models;
mod output;
mod publish;
mod scan;

pub use app::{run, ClassifyArgs, Cli, Commands, ScanArgs};
pub use output::{Output, OutputFormat};
