//! Project management
//!
//! Handles project initialization and task writes. Every write that can add
//! a dependency edge runs [`validate_dependencies`] inside a store
//! transaction, so a cyclic graph is never persisted.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use thiserror::Error;

use super::config::{write_project_config, Config, ProjectConfig};
use super::{DocumentStore, TaskStore};
use crate::domain::{
    validate_dependencies, Document, DocumentId, Priority, ProjectKey, Task, TaskId, TaskStatus,
    TaskType,
};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Not in a compass project. Run 'compass init' first.")]
    NotInProject,

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Epic not found: {0}")]
    EpicNotFound(TaskId),

    #[error("{0} is not an epic-type task")]
    NotAnEpic(TaskId),

    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentId),
}

/// Fields for a task about to be created
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub task_type: TaskType,
    pub epic: Option<TaskId>,
    pub priority: Option<Priority>,
    pub depends_on: Vec<TaskId>,
    pub body: Option<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Partial update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub status: Option<TaskStatus>,
    /// `Some(None)` clears the priority
    pub priority: Option<Option<Priority>>,
    /// Replaces the whole dependency list
    pub depends_on: Option<Vec<TaskId>>,
    pub body: Option<String>,
}

impl TaskUpdate {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Returns true if the update changes nothing
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.depends_on.is_none()
            && self.body.is_none()
    }
}

/// A Compass project
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.join(".compass").is_dir() {
            return Err(ProjectError::NotInProject.into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the project at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_project_root().ok_or(ProjectError::NotInProject)?;

        Self::open(root)
    }

    /// Initializes a new project at the given path
    ///
    /// The key is derived from `name` unless given. Re-running on an
    /// initialized project leaves its configuration untouched.
    pub fn init(root: impl Into<PathBuf>, name: &str, key: Option<ProjectKey>) -> Result<Self> {
        let root = root.into();
        let compass_dir = root.join(".compass");

        fs::create_dir_all(&compass_dir).with_context(|| {
            format!(
                "Failed to create .compass directory: {}",
                compass_dir.display()
            )
        })?;

        if !Config::project_config_path(&root).exists() {
            let key = match key {
                Some(key) => key,
                None => ProjectKey::from_name(name)?,
            };
            let project = ProjectConfig {
                key,
                name: name.to_string(),
            };
            write_project_config(&root, &project)?;
        }

        let gitignore_path = compass_dir.join(".gitignore");
        if !gitignore_path.exists() {
            let gitignore = r#"# Lock and temp files used during writes
tasks.lock
*.tmp
"#;
            fs::write(&gitignore_path, gitignore).with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        Self::open(root)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .compass directory path
    pub fn compass_dir(&self) -> PathBuf {
        self.root.join(".compass")
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the project key
    pub fn key(&self) -> &ProjectKey {
        &self.config.project.key
    }

    /// Returns the task store
    pub fn task_store(&self) -> TaskStore {
        TaskStore::for_project(&self.root)
    }

    /// Reads a snapshot of all tasks
    pub fn tasks(&self) -> Result<Vec<Task>> {
        self.task_store().read_all()
    }

    /// Reads a single task
    pub fn task(&self, id: &TaskId) -> Result<Task> {
        self.tasks()?
            .into_iter()
            .find(|t| &t.id == id)
            .ok_or_else(|| ProjectError::TaskNotFound(id.clone()).into())
    }

    /// Creates a task after validating its epic and dependencies
    pub fn create_task(&self, new: NewTask) -> Result<Task> {
        let key = self.key().clone();
        let created_by = self.config.global.effective_user();

        self.task_store().transaction(|tasks| {
            let id = next_task_id(&key, &new.title, tasks);

            let mut task = Task::new(id, key, new.title);
            task.task_type = new.task_type;
            task.epic = new.epic;
            task.priority = new.priority;
            task.depends_on = new.depends_on;
            task.body = new.body;
            task.created_by = created_by;

            task.validate()?;

            if let Some(epic_id) = &task.epic {
                let epic = tasks
                    .iter()
                    .find(|t| &t.id == epic_id)
                    .ok_or_else(|| ProjectError::EpicNotFound(epic_id.clone()))?;
                if !epic.is_epic() {
                    return Err(ProjectError::NotAnEpic(epic_id.clone()).into());
                }
            }

            validate_dependencies(&task, tasks)?;

            tasks.push(task.clone());
            Ok(task)
        })
    }

    /// Applies a partial update; dependency changes go through the graph check
    pub fn update_task(&self, id: &TaskId, update: TaskUpdate) -> Result<Task> {
        self.task_store().transaction(|tasks| {
            let pos = position(tasks, id)?;
            let mut task = tasks[pos].clone();
            let deps_changed = update.depends_on.is_some();

            if let Some(title) = update.title {
                task.title = title;
            }
            if let Some(status) = update.status {
                task.status = status;
            }
            if let Some(priority) = update.priority {
                task.priority = priority;
            }
            if let Some(depends_on) = update.depends_on {
                task.depends_on = depends_on;
            }
            if let Some(body) = update.body {
                task.body = Some(body);
            }
            task.touch();

            task.validate()?;
            if deps_changed {
                validate_dependencies(&task, tasks)?;
            }

            tasks[pos] = task.clone();
            Ok(task)
        })
    }

    /// Sets a task's status
    pub fn set_status(&self, id: &TaskId, status: TaskStatus) -> Result<Task> {
        self.update_task(id, TaskUpdate::status(status))
    }

    /// Adds one dependency edge: `id` depends on `depends_on`
    pub fn add_dependency(&self, id: &TaskId, depends_on: &TaskId) -> Result<Task> {
        self.task_store().transaction(|tasks| {
            let pos = position(tasks, id)?;
            let mut task = tasks[pos].clone();

            if !task.add_dependency(depends_on.clone()) {
                return Ok(task);
            }

            task.validate()?;
            validate_dependencies(&task, tasks)?;

            tasks[pos] = task.clone();
            Ok(task)
        })
    }

    /// Removes one dependency edge; returns false if it was not declared
    ///
    /// Dropping an edge cannot introduce a cycle, so no graph check runs.
    pub fn remove_dependency(&self, id: &TaskId, depends_on: &TaskId) -> Result<bool> {
        self.task_store().transaction(|tasks| {
            let pos = position(tasks, id)?;
            Ok(tasks[pos].remove_dependency(depends_on))
        })
    }

    /// Deletes a task and returns it
    ///
    /// Dependents keep their reference and stay blocked on the missing task.
    pub fn delete_task(&self, id: &TaskId) -> Result<Task> {
        self.task_store().transaction(|tasks| {
            let pos = position(tasks, id)?;
            Ok(tasks.remove(pos))
        })
    }

    /// Returns the document store
    pub fn document_store(&self) -> DocumentStore {
        DocumentStore::for_project(&self.root)
    }

    /// Reads all documents, sorted by ID
    pub fn documents(&self) -> Result<Vec<Document>> {
        self.document_store().read_all()
    }

    /// Reads a single document
    pub fn document(&self, id: &DocumentId) -> Result<Document> {
        self.document_store()
            .read(id)?
            .ok_or_else(|| ProjectError::DocumentNotFound(id.clone()).into())
    }

    /// Creates a document with an optional markdown body
    pub fn create_document(&self, title: &str, body: Option<String>) -> Result<Document> {
        let store = self.document_store();
        let key = self.key().clone();

        let now = Utc::now();
        let mut nonce = 0;
        let id = loop {
            let id = DocumentId::generate(&key, title, now, nonce);
            if !store.exists(&id) {
                break id;
            }
            nonce += 1;
        };

        let mut doc = Document::new(id, key, title);
        doc.created_by = self.config.global.effective_user();
        doc.body = body.unwrap_or_default();
        doc.validate()?;

        store.write(&doc)?;
        Ok(doc)
    }
}

fn position(tasks: &[Task], id: &TaskId) -> Result<usize> {
    tasks
        .iter()
        .position(|t| &t.id == id)
        .ok_or_else(|| ProjectError::TaskNotFound(id.clone()).into())
}

/// Generates an ID not already used in `tasks`
fn next_task_id(key: &ProjectKey, title: &str, tasks: &[Task]) -> TaskId {
    let now = Utc::now();
    let mut nonce = 0;
    loop {
        let id = TaskId::generate(key, title, now, nonce);
        if !tasks.iter().any(|t| t.id == id) {
            return id;
        }
        nonce += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DependencyError;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Project) {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path(), "Test Project", None).unwrap();
        (dir, project)
    }

    fn create(project: &Project, title: &str, deps: &[&TaskId]) -> Task {
        let mut new = NewTask::new(title);
        new.depends_on = deps.iter().map(|d| (*d).clone()).collect();
        project.create_task(new).unwrap()
    }

    #[test]
    fn init_creates_structure() {
        let (dir, project) = setup();

        assert!(project.compass_dir().is_dir());
        assert!(dir.path().join(".compass/config.toml").is_file());
        assert!(dir.path().join(".compass/.gitignore").is_file());
        assert_eq!(project.key().as_str(), "TEST");
    }

    #[test]
    fn init_is_idempotent() {
        let (dir, _) = setup();

        let again = Project::init(dir.path(), "Other Name", None).unwrap();
        assert_eq!(again.key().as_str(), "TEST");
        assert_eq!(again.config().project.name, "Test Project");
    }

    #[test]
    fn init_with_explicit_key() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path(), "x", Some("AB1".parse().unwrap())).unwrap();
        assert_eq!(project.key().as_str(), "AB1");
    }

    #[test]
    fn open_non_project_fails() {
        let dir = TempDir::new().unwrap();
        assert!(Project::open(dir.path()).is_err());
    }

    #[test]
    fn create_assigns_project_scoped_ids() {
        let (_dir, project) = setup();

        let a = create(&project, "First", &[]);
        let b = create(&project, "First", &[]);

        assert_ne!(a.id, b.id);
        assert_eq!(a.id.project_key(), Some(project.key().clone()));
        assert!(TaskId::parse(a.id.as_str()).is_ok());
        assert_eq!(project.tasks().unwrap().len(), 2);
    }

    #[test]
    fn create_rejects_missing_dependency() {
        let (_dir, project) = setup();

        let mut new = NewTask::new("Orphan");
        new.depends_on = vec![TaskId::from("TEST-T22222")];

        let err = project.create_task(new).unwrap_err();
        assert!(err.downcast_ref::<DependencyError>().is_some());
        assert!(project.tasks().unwrap().is_empty());
    }

    #[test]
    fn update_rejects_cycle_and_keeps_store_unchanged() {
        let (_dir, project) = setup();
        let a = create(&project, "A", &[]);
        let b = create(&project, "B", &[&a.id]);

        let update = TaskUpdate {
            depends_on: Some(vec![b.id.clone()]),
            ..TaskUpdate::default()
        };
        let err = project.update_task(&a.id, update).unwrap_err();
        assert!(err.to_string().contains("cycle detected"));

        assert!(project.task(&a.id).unwrap().depends_on.is_empty());
    }

    #[test]
    fn add_dependency_rejects_cycle() {
        let (_dir, project) = setup();
        let a = create(&project, "A", &[]);
        let b = create(&project, "B", &[&a.id]);
        let c = create(&project, "C", &[&b.id]);

        let err = project.add_dependency(&a.id, &c.id).unwrap_err();
        let cycle = match err.downcast_ref::<DependencyError>() {
            Some(DependencyError::Cycle(cycle)) => cycle.clone(),
            other => panic!("expected cycle error, got {:?}", other),
        };
        assert_eq!(cycle.members().len(), 3);
    }

    #[test]
    fn add_and_remove_dependency() {
        let (_dir, project) = setup();
        let a = create(&project, "A", &[]);
        let b = create(&project, "B", &[]);

        let updated = project.add_dependency(&b.id, &a.id).unwrap();
        assert_eq!(updated.depends_on, vec![a.id.clone()]);

        assert!(project.remove_dependency(&b.id, &a.id).unwrap());
        assert!(!project.remove_dependency(&b.id, &a.id).unwrap());
        assert!(project.task(&b.id).unwrap().depends_on.is_empty());
    }

    #[test]
    fn self_dependency_rejected() {
        let (_dir, project) = setup();
        let a = create(&project, "A", &[]);
        assert!(project.add_dependency(&a.id, &a.id).is_err());
    }

    #[test]
    fn status_change_skips_graph_check() {
        let (_dir, project) = setup();
        let a = create(&project, "A", &[]);

        let closed = project.set_status(&a.id, TaskStatus::Closed).unwrap();
        assert_eq!(closed.status, TaskStatus::Closed);
        assert_eq!(project.task(&a.id).unwrap().status, TaskStatus::Closed);
    }

    #[test]
    fn epic_parent_must_be_an_epic() {
        let (_dir, project) = setup();
        let plain = create(&project, "Plain", &[]);

        let mut epic = NewTask::new("Epic");
        epic.task_type = TaskType::Epic;
        let epic = project.create_task(epic).unwrap();

        let mut child = NewTask::new("Child");
        child.epic = Some(epic.id.clone());
        assert!(project.create_task(child).is_ok());

        let mut bad = NewTask::new("Bad");
        bad.epic = Some(plain.id.clone());
        let err = project.create_task(bad).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProjectError>(),
            Some(ProjectError::NotAnEpic(_))
        ));
    }

    #[test]
    fn delete_task() {
        let (_dir, project) = setup();
        let a = create(&project, "A", &[]);

        let removed = project.delete_task(&a.id).unwrap();
        assert_eq!(removed.id, a.id);
        assert!(project.task(&a.id).is_err());
        assert!(project.delete_task(&a.id).is_err());
    }

    #[test]
    fn update_validates_fields() {
        let (_dir, project) = setup();
        let a = create(&project, "A", &[]);

        let update = TaskUpdate {
            title: Some(String::new()),
            ..TaskUpdate::default()
        };
        assert!(project.update_task(&a.id, update).is_err());
        assert!(TaskUpdate::default().is_empty());
    }

    #[test]
    fn documents_are_stored_per_project() {
        let (dir, project) = setup();

        let doc = project
            .create_document("Auth design", Some("Use sessions.".to_string()))
            .unwrap();
        assert!(doc.id.as_str().starts_with("TEST-D"));
        assert!(dir
            .path()
            .join(".compass/documents")
            .join(format!("{}.md", doc.id))
            .is_file());

        let loaded = project.document(&doc.id).unwrap();
        assert_eq!(loaded.title, "Auth design");
        assert_eq!(loaded.body, "Use sessions.");
        assert_eq!(project.documents().unwrap().len(), 1);

        let again = project.create_document("Auth design", None).unwrap();
        assert_ne!(again.id, doc.id);
    }

    #[test]
    fn document_errors() {
        let (_dir, project) = setup();

        assert!(project.create_document("  ", None).is_err());
        assert!(project.documents().unwrap().is_empty());

        let missing: DocumentId = "TEST-D22222".parse().unwrap();
        let err = project.document(&missing).unwrap_err();
        assert!(err.to_string().contains("Document not found"));
    }
}
