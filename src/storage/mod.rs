//! # Storage Layer
//!
//! Persistence for Compass projects in git-friendly file formats.
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Tasks | JSONL (one JSON per line) | `.compass/tasks.jsonl` |
//! | Documents | Markdown with YAML frontmatter | `.compass/documents/{id}.md` |
//! | Project config | TOML | `.compass/config.toml` |
//! | Global config | TOML | platform config dir, `config.toml` |
//!
//! ## Concurrency Safety
//!
//! - [`TaskStore`] locks the store with `fs2` for every read and write
//! - [`TaskStore::transaction`] holds an exclusive lock across
//!   read-validate-write, so dependency checks see a current snapshot
//! - Full rewrites are atomic (temp file + rename)
//!
//! ## Key Types
//!
//! - [`Project`] - Entry point for reading and changing a project's tasks
//! - [`TaskStore`] - Read/write tasks as JSONL
//! - [`DocumentStore`] - Read/write documents as markdown files
//! - [`Config`] - Project and global configuration

mod config;
mod jsonl;
mod markdown;
mod project;

pub use config::{write_project_config, Config, ConfigError, GlobalConfig, ProjectConfig};
pub use jsonl::TaskStore;
pub use markdown::DocumentStore;
pub use project::{NewTask, Project, ProjectError, TaskUpdate};
