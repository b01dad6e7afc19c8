//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Project setup | `init` |
//! | Task | Work item management | `task create`, `task dep`, `task close` |
//! | Doc | Project notes | `doc create`, `doc list`, `doc show` |
//! | Query | Ready work and lookup | `ready`, `ready --all`, `blocked`, `search` |
//! | Graph | Dependency inspection | `graph validate`, `graph order`, `graph tree` |
//!
//! ## Output Formats
//!
//! All commands support the `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! The default can be changed with `default_format` in the global config.
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output on stderr:
//! ```bash
//! compass --verbose ready --all
//! ```

mod app;
mod doc;
mod output;
mod query;
mod task;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
