//! Domain models for Compass
//!
//! Contains the core business logic without any I/O concerns. Every query
//! takes an explicit task snapshot; nothing here reads or writes storage.

mod id;
mod task;
mod graph;
mod readiness;
mod deps;
mod document;
mod search;
mod tree;

pub use id::{DocumentId, IdError, ProjectKey, TaskId};
pub use task::{status_map, Priority, Task, TaskError, TaskStatus, TaskType};
pub use graph::{CycleError, DependencyGraph};
pub use readiness::{blocked_tasks, ready_tasks};
pub use deps::{validate_dependencies, DependencyError};
pub use document::{Document, DocumentError, DocumentFrontmatter};
pub use search::{search_records, SearchHit, SearchHitKind};
pub use tree::render_tree;
