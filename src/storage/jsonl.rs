//! JSONL storage for tasks
//!
//! Tasks are stored in `.compass/tasks.jsonl` with one JSON object per line.
//! Uses file locking for concurrent access safety.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

use crate::domain::{Task, TaskId};

/// Store for task data in JSONL format
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    /// Creates a new task store at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates the default store for a project
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root.join(".compass").join("tasks.jsonl"))
    }

    /// Returns the path to the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        Ok(())
    }

    /// Reads all tasks from the store, in file order
    ///
    /// A task appearing on several lines (hand edits, merges) resolves to its
    /// last line, kept at the position of its first.
    pub fn read_all(&self) -> Result<Vec<Task>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open task store: {}", self.path.display()))?;

        // Acquire shared lock for reading
        file.lock_shared()
            .context("Failed to acquire read lock on task store")?;

        let reader = BufReader::new(&file);
        let mut tasks: Vec<Task> = Vec::new();
        let mut positions: HashMap<TaskId, usize> = HashMap::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;

            if line.trim().is_empty() {
                continue;
            }

            let task: Task = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse task at line {}", line_num + 1))?;

            match positions.get(&task.id) {
                Some(&pos) => tasks[pos] = task,
                None => {
                    positions.insert(task.id.clone(), tasks.len());
                    tasks.push(task);
                }
            }
        }

        // Lock is released when file is dropped
        Ok(tasks)
    }

    /// Writes all tasks to the store (full rewrite)
    pub fn write_all(&self, tasks: &[Task]) -> Result<()> {
        self.ensure_parent()?;

        // Write to temp file first
        let temp_path = self.path.with_extension("jsonl.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            // Acquire exclusive lock
            file.lock_exclusive()
                .context("Failed to acquire write lock on task store")?;

            let mut writer = BufWriter::new(&file);

            // Sort by ID for stable diffs
            let mut sorted: Vec<_> = tasks.iter().collect();
            sorted.sort_by(|a, b| a.id.cmp(&b.id));

            for task in sorted {
                let line = serde_json::to_string(task).context("Failed to serialize task")?;
                writeln!(writer, "{}", line).context("Failed to write task")?;
            }

            writer.flush().context("Failed to flush task store")?;
        }

        // Atomic rename
        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        Ok(())
    }

    /// Runs a read-modify-write cycle under an exclusive store lock
    ///
    /// The tasks are written back only if `f` succeeds. Other writers going
    /// through `transaction` wait for the lock, so a snapshot validated inside
    /// `f` is still current when it is written.
    pub fn transaction<T>(&self, f: impl FnOnce(&mut Vec<Task>) -> Result<T>) -> Result<T> {
        self.ensure_parent()?;

        let lock_path = self.lock_path();
        let lock = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;
        lock.lock_exclusive()
            .context("Failed to acquire task store lock")?;

        let mut tasks = self.read_all()?;
        let result = f(&mut tasks)?;
        self.write_all(&tasks)?;

        // Lock is released when `lock` is dropped
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskStatus;
    use tempfile::TempDir;

    fn make_task(id: &str) -> Task {
        Task::new(TaskId::from(id), "TEST".parse().unwrap(), format!("Task {}", id))
    }

    #[test]
    fn read_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.jsonl"));

        let tasks = store.read_all().unwrap();
        assert!(tasks.is_empty());
    }

    #[test]
    fn write_and_read_tasks() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.jsonl"));

        let task1 = make_task("TEST-T22222");
        let task2 = make_task("TEST-T33333");

        store.write_all(&[task2.clone(), task1.clone()]).unwrap();

        let loaded = store.read_all().unwrap();
        assert_eq!(loaded.len(), 2);
        // Written sorted by ID
        assert_eq!(loaded[0].id, task1.id);
        assert_eq!(loaded[1].title, task2.title);
    }

    #[test]
    fn later_lines_win() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.jsonl"));

        let mut a = make_task("A");
        let open_a = serde_json::to_string(&a).unwrap();
        let b = serde_json::to_string(&make_task("B")).unwrap();
        a.close();
        let closed_a = serde_json::to_string(&a).unwrap();
        fs::write(store.path(), format!("{}\n{}\n\n{}\n", open_a, b, closed_a)).unwrap();

        let loaded = store.read_all().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id.as_str(), "A");
        assert_eq!(loaded[0].status, TaskStatus::Closed);
    }

    #[test]
    fn transaction_writes_on_success() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.jsonl"));
        store.write_all(&[make_task("A")]).unwrap();

        let count = store
            .transaction(|tasks| {
                tasks[0].start();
                tasks.push(make_task("B"));
                Ok(tasks.len())
            })
            .unwrap();
        assert_eq!(count, 2);

        let loaded = store.read_all().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].status, TaskStatus::InProgress);
    }

    #[test]
    fn transaction_discards_on_error() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.jsonl"));
        store.write_all(&[make_task("A")]).unwrap();

        let result: Result<()> = store.transaction(|tasks| {
            tasks.clear();
            anyhow::bail!("rejected")
        });
        assert!(result.is_err());

        assert_eq!(store.read_all().unwrap().len(), 1);
    }

    #[test]
    fn creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("nested").join("dir").join("tasks.jsonl"));

        store.write_all(&[make_task("A")]).unwrap();

        assert!(store.path().exists());
    }

    #[test]
    fn atomic_write() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.jsonl"));

        store.write_all(&[make_task("A")]).unwrap();

        let temp_path = store.path().with_extension("jsonl.tmp");
        assert!(!temp_path.exists());
    }
}
