//! Query commands (ready, blocked, search, graph)
//!
//! All queries read one snapshot of the task store and derive their answers
//! from it; nothing here writes.

use anyhow::Result;
use clap::Subcommand;

use super::output::Output;
use super::task::join_ids;
use crate::domain::{
    blocked_tasks, ready_tasks, render_tree, search_records, DependencyGraph, Task,
    TaskId,
};
use crate::storage::Project;

#[derive(Subcommand)]
pub enum GraphCommands {
    /// Check the dependency graph for cycles
    Validate,

    /// Print tasks in dependency order
    Order,

    /// Tasks that declare no dependencies
    Roots,

    /// Tasks nothing depends on
    Leaves,

    /// Everything a task transitively depends on
    Deps {
        /// Task ID
        id: TaskId,
    },

    /// Tasks that directly depend on a task
    Dependents {
        /// Task ID
        id: TaskId,
    },

    /// Print the graph as a tree, from each root down to its dependents
    Tree,
}

/// Show tasks ready to work on
pub fn ready(output: &Output, all: bool) -> Result<()> {
    let project = Project::open_current()?;
    output.verbose_ctx(
        "ready",
        &format!("Opened project at: {}", project.root().display()),
    );

    let tasks = project.tasks()?;
    let mut ready = ready_tasks(&tasks);
    output.verbose_ctx("ready", &format!("Found {} ready tasks", ready.len()));

    if !all {
        ready.truncate(1);
    }

    if output.is_json() {
        let items: Vec<_> = ready
            .iter()
            .map(|t| {
                serde_json::json!({
                    "id": t.id,
                    "title": t.title,
                    "priority": t.priority,
                    "epic": t.epic,
                })
            })
            .collect();
        output.data(&items);
    } else if ready.is_empty() {
        println!("No tasks ready to work on.");
    } else if !all {
        println!("Next: {} - {}", ready[0].id, ready[0].title);
    } else {
        println!("Ready tasks ({}):", ready.len());
        println!("{:<14} TITLE", "ID");
        println!("{}", "-".repeat(60));
        for task in ready {
            println!("{:<14} {}", task.id, task.title);
        }
    }

    Ok(())
}

/// Show blocked tasks
pub fn blocked(output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    output.verbose_ctx(
        "blocked",
        &format!("Opened project at: {}", project.root().display()),
    );

    let tasks = project.tasks()?;
    let blocked = blocked_tasks(&tasks);

    output.verbose_ctx("blocked", &format!("Found {} blocked tasks", blocked.len()));

    if output.is_json() {
        let items: Vec<_> = blocked
            .iter()
            .map(|(task, blockers)| {
                serde_json::json!({
                    "id": task.id,
                    "title": task.title,
                    "blocked_by": blockers,
                })
            })
            .collect();
        output.data(&items);
    } else if blocked.is_empty() {
        println!("No blocked tasks.");
    } else {
        println!("Blocked tasks ({}):", blocked.len());
        println!("{:<14} {:<30} BLOCKED BY", "ID", "TITLE");
        println!("{}", "-".repeat(80));
        for (task, blockers) in &blocked {
            println!("{:<14} {:<30} {}", task.id, task.title, join_ids(blockers));
        }
    }

    Ok(())
}

/// Search task and document titles and bodies
pub fn search(output: &Output, query: &str) -> Result<()> {
    let project = Project::open_current()?;
    let tasks = project.tasks()?;
    let documents = project.documents()?;
    output.verbose_ctx(
        "search",
        &format!("Searching {} tasks and {} documents", tasks.len(), documents.len()),
    );

    let hits = search_records(query, &tasks, &documents);

    if output.is_json() {
        output.data(&hits);
    } else if hits.is_empty() {
        println!("No results for '{}'.", query);
    } else {
        println!("{:<9} {:<14} TITLE", "TYPE", "ID");
        println!("{}", "-".repeat(60));
        for hit in &hits {
            println!("{:<9} {:<14} {}", hit.kind.as_str(), hit.id, hit.title);
            if let Some(snippet) = &hit.snippet {
                println!("          {}", snippet);
            }
        }
    }

    Ok(())
}

pub fn graph(cmd: GraphCommands, output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    let tasks: Vec<Task> = project
        .tasks()?
        .into_iter()
        .filter(|t| !t.is_epic())
        .collect();
    let graph = DependencyGraph::build(&tasks);
    output.verbose_ctx("graph", &format!("Built graph with {} tasks", graph.len()));

    match cmd {
        GraphCommands::Validate => {
            graph.validate_acyclic()?;
            if output.is_json() {
                output.data(&serde_json::json!({ "acyclic": true, "tasks": graph.len() }));
            } else {
                output.success(&format!("No cycles ({} tasks)", graph.len()));
            }
        }
        GraphCommands::Order => {
            let order = graph.topological_sort()?;
            print_ids(output, &graph, &order, "No tasks");
        }
        GraphCommands::Roots => print_ids(output, &graph, &graph.roots(), "No root tasks"),
        GraphCommands::Leaves => print_ids(output, &graph, &graph.leaves(), "No leaf tasks"),
        GraphCommands::Deps { id } => {
            ensure_known(&graph, &id)?;
            let deps: Vec<TaskId> = graph.transitive_dependencies(&id).into_iter().collect();
            print_ids(output, &graph, &deps, &format!("{} has no dependencies", id));
        }
        GraphCommands::Dependents { id } => {
            ensure_known(&graph, &id)?;
            let dependents = graph.dependents(&id);
            print_ids(output, &graph, &dependents, &format!("Nothing depends on {}", id));
        }
        GraphCommands::Tree => {
            let tree = render_tree(&graph);
            if output.is_json() {
                output.data(&serde_json::json!({ "tree": tree }));
            } else {
                println!("{}", tree.trim_end());
            }
        }
    }

    Ok(())
}

fn ensure_known(graph: &DependencyGraph<'_>, id: &TaskId) -> Result<()> {
    if !graph.contains(id) {
        anyhow::bail!("Task not found: {}", id);
    }
    Ok(())
}

/// Prints one ID per line with its title, or a JSON array of IDs
fn print_ids(output: &Output, graph: &DependencyGraph<'_>, ids: &[TaskId], empty: &str) {
    if output.is_json() {
        output.data(&ids);
    } else if ids.is_empty() {
        println!("{}", empty);
    } else {
        for id in ids {
            let title = graph.task(id).map(|t| t.title.as_str()).unwrap_or("");
            println!("{:<14} {}", id, title);
        }
    }
}
