//! Dependency checks for pending task writes
//!
//! Every create, and every update that changes `depends_on`, must pass
//! [`validate_dependencies`] against the current snapshot before it is
//! persisted. The check is only as good as the snapshot, so callers hold the
//! store lock across read, validate and write.

use thiserror::Error;

use super::graph::{CycleError, DependencyGraph};
use super::id::{ProjectKey, TaskId};
use super::task::{Task, TaskType};

#[derive(Debug, Error, PartialEq)]
pub enum DependencyError {
    #[error("Dependency not found: {0}")]
    NotFound(TaskId),

    #[error("Dependency {dependency} is in project {found}, not {expected}")]
    CrossProject {
        dependency: TaskId,
        found: ProjectKey,
        expected: ProjectKey,
    },

    #[error("Cannot depend on epic-type task {0}")]
    EpicDependency(TaskId),

    #[error(transparent)]
    Cycle(#[from] CycleError),
}

/// Validates the dependencies of `pending` against `snapshot`
///
/// `pending` replaces the snapshot record with the same ID, or is added as
/// a new record, before the cycle check runs.
pub fn validate_dependencies(pending: &Task, snapshot: &[Task]) -> Result<(), DependencyError> {
    for dep_id in &pending.depends_on {
        let dep = snapshot
            .iter()
            .rev()
            .find(|t| &t.id == dep_id)
            .ok_or_else(|| DependencyError::NotFound(dep_id.clone()))?;

        if dep.project != pending.project {
            return Err(DependencyError::CrossProject {
                dependency: dep_id.clone(),
                found: dep.project.clone(),
                expected: pending.project.clone(),
            });
        }

        if dep.is_epic() {
            return Err(DependencyError::EpicDependency(dep_id.clone()));
        }
    }

    let mut replaced = false;
    let mut candidate: Vec<&Task> = Vec::with_capacity(snapshot.len() + 1);
    for task in snapshot
        .iter()
        .filter(|t| t.project == pending.project && t.task_type == TaskType::Task)
    {
        if task.id == pending.id {
            if !replaced {
                candidate.push(pending);
                replaced = true;
            }
        } else {
            candidate.push(task);
        }
    }
    if !replaced {
        candidate.push(pending);
    }

    DependencyGraph::build(candidate).validate_acyclic()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, deps: &[&str]) -> Task {
        let mut t = Task::new(TaskId::from(id), "TEST".parse().unwrap(), id);
        t.depends_on = deps.iter().map(|d| TaskId::from(*d)).collect();
        t
    }

    #[test]
    fn new_task_with_existing_dependencies() {
        let snapshot = vec![task("A", &[]), task("B", &["A"])];
        let pending = task("C", &["A", "B"]);
        assert!(validate_dependencies(&pending, &snapshot).is_ok());
    }

    #[test]
    fn missing_dependency_rejected() {
        let snapshot = vec![task("A", &[])];
        let pending = task("C", &["NOPE"]);
        assert_eq!(
            validate_dependencies(&pending, &snapshot),
            Err(DependencyError::NotFound(TaskId::from("NOPE")))
        );
    }

    #[test]
    fn update_that_closes_a_cycle_is_rejected() {
        let snapshot = vec![task("A", &[]), task("B", &["A"]), task("C", &["B"])];
        let pending = task("A", &["C"]);

        let err = validate_dependencies(&pending, &snapshot).unwrap_err();
        assert!(matches!(err, DependencyError::Cycle(_)));
        assert!(err.to_string().starts_with("cycle detected: "));
    }

    #[test]
    fn pending_replaces_stored_version() {
        // Stored A depends on B; the pending A drops that edge so B -> A is fine
        let snapshot = vec![task("A", &["B"]), task("B", &[])];
        let mut b = task("B", &["A"]);
        assert!(validate_dependencies(&b, &snapshot).is_err());

        let pending_a = task("A", &[]);
        let snapshot = vec![pending_a, task("B", &[])];
        b.depends_on = vec![TaskId::from("A")];
        assert!(validate_dependencies(&b, &snapshot).is_ok());
    }

    #[test]
    fn epic_dependency_rejected() {
        let mut epic = task("E", &[]);
        epic.task_type = TaskType::Epic;
        let snapshot = vec![epic];

        let pending = task("A", &["E"]);
        assert_eq!(
            validate_dependencies(&pending, &snapshot),
            Err(DependencyError::EpicDependency(TaskId::from("E")))
        );
    }

    #[test]
    fn cross_project_dependency_rejected() {
        let mut other = task("X", &[]);
        other.project = "OTHER".parse().unwrap();
        let snapshot = vec![other];

        let pending = task("A", &["X"]);
        assert!(matches!(
            validate_dependencies(&pending, &snapshot),
            Err(DependencyError::CrossProject { .. })
        ));
    }

    #[test]
    fn unrelated_cycles_elsewhere_are_reported() {
        let snapshot = vec![task("X", &["Y"]), task("Y", &["X"]), task("A", &[])];
        let pending = task("B", &["A"]);
        assert!(matches!(
            validate_dependencies(&pending, &snapshot),
            Err(DependencyError::Cycle(_))
        ));
    }
}
