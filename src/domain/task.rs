//! Task domain model
//!
//! Tasks are the units of work tracked in a project. A task may depend on
//! other tasks; epics are summary items that group tasks but never take part
//! in the dependency graph themselves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::id::{ProjectKey, TaskId};

#[derive(Debug, Error, PartialEq)]
pub enum TaskError {
    #[error("Task title is required")]
    EmptyTitle,

    #[error("Task cannot depend on itself: {0}")]
    SelfDependency(TaskId),

    #[error("Duplicate dependency: {0}")]
    DuplicateDependency(TaskId),

    #[error("Epic-type tasks cannot have dependencies: {0}")]
    EpicWithDependencies(TaskId),

    #[error("Invalid status '{0}': must be one of open, in_progress, closed")]
    InvalidStatus(String),

    #[error("Invalid task type '{0}': must be one of task, epic")]
    InvalidType(String),

    #[error("Invalid priority '{0}': must be 0-3 (P0 critical .. P3 low)")]
    InvalidPriority(String),
}

/// Status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Open,
    InProgress,
    Closed,
}

impl TaskStatus {
    /// Returns true if this status satisfies dependents
    pub fn is_closed(&self) -> bool {
        matches!(self, TaskStatus::Closed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "open" => Ok(TaskStatus::Open),
            "in_progress" => Ok(TaskStatus::InProgress),
            "closed" => Ok(TaskStatus::Closed),
            other => Err(TaskError::InvalidStatus(other.to_string())),
        }
    }
}

/// Kind of task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Ordinary unit of work
    #[default]
    Task,
    /// Summary item grouping other tasks; never ready, never a dependency
    Epic,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Task => "task",
            TaskType::Epic => "epic",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "task" => Ok(TaskType::Task),
            "epic" => Ok(TaskType::Epic),
            other => Err(TaskError::InvalidType(other.to_string())),
        }
    }
}

/// Priority from 0 (critical) to 3 (low)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    pub const MAX: u8 = 3;

    pub fn new(value: u8) -> Result<Self, TaskError> {
        if value > Self::MAX {
            return Err(TaskError::InvalidPriority(value.to_string()));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl FromStr for Priority {
    type Err = TaskError;

    /// Accepts `2` or `P2`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('P')
            .or_else(|| trimmed.strip_prefix('p'))
            .unwrap_or(trimmed);
        let value: u8 = digits
            .parse()
            .map_err(|_| TaskError::InvalidPriority(s.to_string()))?;
        Self::new(value)
    }
}

impl TryFrom<u8> for Priority {
    type Error = TaskError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Priority> for u8 {
    fn from(p: Priority) -> Self {
        p.0
    }
}

/// A task record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,

    /// Task title
    pub title: String,

    /// Owning project
    pub project: ProjectKey,

    /// Task or epic
    #[serde(rename = "type", default)]
    pub task_type: TaskType,

    /// Parent epic, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epic: Option<TaskId>,

    /// Current status
    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,

    /// IDs of tasks this task depends on, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<TaskId>,

    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    #[serde(default)]
    pub created_by: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new open task
    pub fn new(id: TaskId, project: ProjectKey, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            project,
            task_type: TaskType::Task,
            epic: None,
            status: TaskStatus::Open,
            priority: None,
            depends_on: Vec::new(),
            body: None,
            created_by: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true for epic-type tasks
    pub fn is_epic(&self) -> bool {
        self.task_type == TaskType::Epic
    }

    /// Checks record-level invariants (graph-level checks live in `deps`)
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.title.trim().is_empty() {
            return Err(TaskError::EmptyTitle);
        }

        if self.is_epic() && !self.depends_on.is_empty() {
            return Err(TaskError::EpicWithDependencies(self.id.clone()));
        }

        let mut seen = HashSet::new();
        for dep in &self.depends_on {
            if dep == &self.id {
                return Err(TaskError::SelfDependency(self.id.clone()));
            }
            if !seen.insert(dep) {
                return Err(TaskError::DuplicateDependency(dep.clone()));
            }
        }

        Ok(())
    }

    /// Returns the dependencies that keep this task blocked
    ///
    /// A dependency blocks when it is unknown to `statuses` or not closed.
    pub fn blockers(&self, statuses: &HashMap<TaskId, TaskStatus>) -> Vec<TaskId> {
        self.depends_on
            .iter()
            .filter(|dep_id| {
                statuses
                    .get(*dep_id)
                    .map(|s| !s.is_closed())
                    .unwrap_or(true) // Unknown dependency = blocked
            })
            .cloned()
            .collect()
    }

    /// Returns true if any dependency is missing or not closed
    pub fn is_blocked(&self, statuses: &HashMap<TaskId, TaskStatus>) -> bool {
        self.depends_on.iter().any(|dep_id| {
            statuses
                .get(dep_id)
                .map(|s| !s.is_closed())
                .unwrap_or(true)
        })
    }

    /// Transitions to in_progress status
    pub fn start(&mut self) {
        self.set_status(TaskStatus::InProgress);
    }

    /// Transitions to closed status
    pub fn close(&mut self) {
        self.set_status(TaskStatus::Closed);
    }

    /// Transitions back to open status
    pub fn reopen(&mut self) {
        self.set_status(TaskStatus::Open);
    }

    pub fn set_status(&mut self, status: TaskStatus) {
        if self.status != status {
            self.status = status;
            self.touch();
        }
    }

    /// Adds a dependency; returns false if already present
    pub fn add_dependency(&mut self, task_id: TaskId) -> bool {
        if self.depends_on.contains(&task_id) {
            return false;
        }
        self.depends_on.push(task_id);
        self.touch();
        true
    }

    /// Removes a dependency; returns false if it was not present
    pub fn remove_dependency(&mut self, task_id: &TaskId) -> bool {
        let len_before = self.depends_on.len();
        self.depends_on.retain(|d| d != task_id);
        let removed = self.depends_on.len() != len_before;
        if removed {
            self.touch();
        }
        removed
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Builds the status lookup used by the blocked predicate
///
/// Duplicate IDs resolve to the last record, matching graph construction.
pub fn status_map<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> HashMap<TaskId, TaskStatus> {
    tasks
        .into_iter()
        .map(|t| (t.id.clone(), t.status))
        .collect()
}
