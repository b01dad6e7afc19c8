//! Task CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::output::Output;
use crate::domain::{
    status_map, DependencyGraph, Priority, Task, TaskId, TaskStatus, TaskType,
};
use crate::storage::{NewTask, Project, TaskUpdate};

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Create a task
    ///
    /// Examples:
    ///   compass task create "Design schema"
    ///   compass task create "Build API" --depends-on AUTH-T3K7QP
    ///   compass task create "Auth" --type epic
    Create {
        /// Task title
        title: String,

        /// Task type (task or epic)
        #[arg(long = "type", default_value = "task")]
        task_type: TaskType,

        /// Parent epic ID
        #[arg(long)]
        epic: Option<TaskId>,

        /// Priority 0-3 (or P0-P3)
        #[arg(long, short)]
        priority: Option<Priority>,

        /// Comma-separated IDs this task depends on
        #[arg(long, value_delimiter = ',')]
        depends_on: Vec<TaskId>,

        /// Longer description
        #[arg(long)]
        body: Option<String>,
    },

    /// List tasks
    List {
        /// Filter by status
        #[arg(long)]
        status: Option<TaskStatus>,

        /// Filter by type
        #[arg(long = "type")]
        task_type: Option<TaskType>,

        /// Filter by parent epic
        #[arg(long)]
        epic: Option<TaskId>,
    },

    /// Show task details
    Show {
        /// Task ID
        id: TaskId,
    },

    /// Update task fields
    Update {
        /// Task ID
        id: TaskId,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        status: Option<TaskStatus>,

        #[arg(long, short)]
        priority: Option<Priority>,

        /// Removes the priority
        #[arg(long, conflicts_with = "priority")]
        clear_priority: bool,

        /// Replaces the dependency list (comma-separated; empty clears it)
        #[arg(long, value_delimiter = ',', num_args = 0..)]
        depends_on: Option<Vec<TaskId>>,

        #[arg(long)]
        body: Option<String>,
    },

    /// Mark task as in progress
    Start {
        /// Task ID
        id: TaskId,
    },

    /// Mark task as closed
    Close {
        /// Task ID
        id: TaskId,
    },

    /// Reopen a task
    Reopen {
        /// Task ID
        id: TaskId,
    },

    /// Delete a task
    Delete {
        /// Task ID
        id: TaskId,
    },

    /// Add a dependency between tasks
    Dep {
        /// Task that will be blocked
        task: TaskId,

        /// Task that must be closed first
        depends_on: TaskId,
    },

    /// Remove a dependency
    Undep {
        /// Task to unblock
        task: TaskId,

        /// Dependency to remove
        depends_on: TaskId,
    },
}

pub fn run(cmd: TaskCommands, output: &Output) -> Result<()> {
    match cmd {
        TaskCommands::Create {
            title,
            task_type,
            epic,
            priority,
            depends_on,
            body,
        } => {
            let new = NewTask {
                title,
                task_type,
                epic,
                priority,
                depends_on,
                body,
            };
            create_task(output, new)
        }
        TaskCommands::List {
            status,
            task_type,
            epic,
        } => list_tasks(output, status, task_type, epic.as_ref()),
        TaskCommands::Show { id } => show_task(output, &id),
        TaskCommands::Update {
            id,
            title,
            status,
            priority,
            clear_priority,
            depends_on,
            body,
        } => {
            let priority = if clear_priority {
                Some(None)
            } else {
                priority.map(Some)
            };
            let update = TaskUpdate {
                title,
                status,
                priority,
                depends_on,
                body,
            };
            update_task(output, &id, update)
        }
        TaskCommands::Start { id } => set_status(output, &id, TaskStatus::InProgress, "Started"),
        TaskCommands::Close { id } => set_status(output, &id, TaskStatus::Closed, "Closed"),
        TaskCommands::Reopen { id } => set_status(output, &id, TaskStatus::Open, "Reopened"),
        TaskCommands::Delete { id } => delete_task(output, &id),
        TaskCommands::Dep { task, depends_on } => add_dependency(output, &task, &depends_on),
        TaskCommands::Undep { task, depends_on } => remove_dependency(output, &task, &depends_on),
    }
}

/// JSON shape shared by commands that echo a task back
fn task_json(task: &Task) -> serde_json::Value {
    serde_json::json!({
        "id": task.id,
        "title": task.title,
        "type": task.task_type,
        "status": task.status,
        "priority": task.priority,
        "epic": task.epic,
        "depends_on": task.depends_on,
    })
}

fn create_task(output: &Output, new: NewTask) -> Result<()> {
    let project = Project::open_current()?;
    output.verbose_ctx(
        "task",
        &format!("Creating task in {} with {} dependencies", project.key(), new.depends_on.len()),
    );

    let task = project.create_task(new)?;

    if output.is_json() {
        output.data(&task_json(&task));
    } else {
        output.success(&format!("Created task: {} - {}", task.id, task.title));
    }

    Ok(())
}

fn list_tasks(
    output: &Output,
    status: Option<TaskStatus>,
    task_type: Option<TaskType>,
    epic: Option<&TaskId>,
) -> Result<()> {
    let project = Project::open_current()?;

    let mut tasks: Vec<Task> = project
        .tasks()?
        .into_iter()
        .filter(|t| status.map_or(true, |s| t.status == s))
        .filter(|t| task_type.map_or(true, |ty| t.task_type == ty))
        .filter(|t| epic.map_or(true, |e| t.epic.as_ref() == Some(e)))
        .collect();
    tasks.sort_by(|a, b| a.id.cmp(&b.id));

    output.verbose_ctx("task", &format!("Listing {} tasks", tasks.len()));

    if output.is_json() {
        let items: Vec<_> = tasks.iter().map(task_json).collect();
        output.data(&items);
    } else if tasks.is_empty() {
        println!("No tasks");
    } else {
        println!("{:<14} {:<12} {:<5} {:<4} TITLE", "ID", "STATUS", "TYPE", "PRI");
        println!("{}", "-".repeat(60));

        for task in &tasks {
            let priority = task
                .priority
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{:<14} {:<12} {:<5} {:<4} {}",
                task.id, task.status, task.task_type, priority, task.title
            );
        }
    }

    Ok(())
}

fn show_task(output: &Output, id: &TaskId) -> Result<()> {
    let project = Project::open_current()?;
    let tasks = project.tasks()?;

    let task = tasks
        .iter()
        .find(|t| &t.id == id)
        .ok_or_else(|| anyhow::anyhow!("Task not found: {}", id))?;

    let statuses = status_map(&tasks);
    let blockers = task.blockers(&statuses);
    let graph = DependencyGraph::build(&tasks);
    let dependents = graph.dependents(id);

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": task.id,
            "title": task.title,
            "project": task.project,
            "type": task.task_type,
            "epic": task.epic,
            "status": task.status,
            "priority": task.priority,
            "depends_on": task.depends_on,
            "dependents": dependents,
            "body": task.body,
            "created_by": task.created_by,
            "created_at": task.created_at,
            "updated_at": task.updated_at,
            "is_blocked": !task.is_epic() && !blockers.is_empty(),
            "blocked_by": blockers,
        }));
    } else {
        println!("Task: {}", task.id);
        println!("Title: {}", task.title);
        println!("Type: {}", task.task_type);
        println!("Status: {}", task.status);
        if let Some(priority) = task.priority {
            println!("Priority: {}", priority);
        }
        if let Some(epic) = &task.epic {
            println!("Epic: {}", epic);
        }
        println!("Created: {} by {}", task.created_at.format("%Y-%m-%d %H:%M"), task.created_by);
        println!("Updated: {}", task.updated_at.format("%Y-%m-%d %H:%M"));

        if !task.depends_on.is_empty() {
            println!("\nDepends on:");
            for dep in &task.depends_on {
                let dep_status = statuses
                    .get(dep)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "missing".to_string());
                println!("  {} ({})", dep, dep_status);
            }
        }

        if !dependents.is_empty() {
            println!("\nRequired by:");
            for dependent in &dependents {
                println!("  {}", dependent);
            }
        }

        if let Some(body) = &task.body {
            println!("\n{}", body);
        }

        if !task.is_epic() && !task.status.is_closed() {
            println!();
            if blockers.is_empty() {
                println!("Status: READY (all dependencies closed)");
            } else {
                println!("Status: BLOCKED (waiting on {})", join_ids(&blockers));
            }
        }
    }

    Ok(())
}

fn update_task(output: &Output, id: &TaskId, update: TaskUpdate) -> Result<()> {
    if update.is_empty() {
        anyhow::bail!("Nothing to update; pass at least one field");
    }

    let project = Project::open_current()?;
    if let Some(deps) = &update.depends_on {
        output.verbose_ctx("task", &format!("Validating new dependencies of {}: [{}]", id, join_ids(deps)));
    }

    let task = project.update_task(id, update)?;

    if output.is_json() {
        output.data(&task_json(&task));
    } else {
        output.success(&format!("Updated task: {}", task.id));
    }

    Ok(())
}

fn set_status(output: &Output, id: &TaskId, status: TaskStatus, verb: &str) -> Result<()> {
    let project = Project::open_current()?;
    let task = project.set_status(id, status)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": task.id,
            "status": task.status,
        }));
    } else {
        output.success(&format!("{} task: {}", verb, task.id));
    }

    Ok(())
}

fn delete_task(output: &Output, id: &TaskId) -> Result<()> {
    let project = Project::open_current()?;
    let task = project.delete_task(id)?;

    let remaining = project.tasks()?;
    let orphaned: Vec<TaskId> = remaining
        .iter()
        .filter(|t| t.depends_on.contains(&task.id))
        .map(|t| t.id.clone())
        .collect();
    if !orphaned.is_empty() {
        output.verbose_ctx(
            "task",
            &format!("Tasks still referencing {}: {}", task.id, join_ids(&orphaned)),
        );
    }

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": task.id,
            "deleted": true,
            "dangling_dependents": orphaned,
        }));
    } else {
        output.success(&format!("Deleted task: {} - {}", task.id, task.title));
    }

    Ok(())
}

fn add_dependency(output: &Output, task_id: &TaskId, depends_on: &TaskId) -> Result<()> {
    let project = Project::open_current()?;
    output.verbose_ctx("task", &format!("Checking {} -> {} for cycles", task_id, depends_on));

    project.add_dependency(task_id, depends_on)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "task": task_id,
            "depends_on": depends_on,
        }));
    } else {
        output.success(&format!("{} now depends on {}", task_id, depends_on));
    }

    Ok(())
}

fn remove_dependency(output: &Output, task_id: &TaskId, depends_on: &TaskId) -> Result<()> {
    let project = Project::open_current()?;
    let removed = project.remove_dependency(task_id, depends_on)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "task": task_id,
            "removed_dependency": depends_on,
            "removed": removed,
        }));
    } else if removed {
        output.success(&format!(
            "Removed dependency: {} no longer depends on {}",
            task_id, depends_on
        ));
    } else {
        output.success(&format!("{} did not depend on {}", task_id, depends_on));
    }

    Ok(())
}

pub(super) fn join_ids(ids: &[TaskId]) -> String {
    ids.iter()
        .map(TaskId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
