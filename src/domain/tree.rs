//! Plain-text dependency tree
//!
//! Each root (a task with no declared dependencies) starts a tree; a task's
//! children are the tasks that depend on it. A task reachable from several
//! parents is printed in full once and marked `(see above)` afterwards.

use std::collections::{HashMap, HashSet};

use super::graph::DependencyGraph;
use super::id::TaskId;
use super::task::{status_map, TaskStatus};

/// Renders the graph as one tree per root, separated by blank lines
///
/// Tasks that cannot be reached from any root (members of a cycle, or tasks
/// whose only dependencies are missing) are not shown.
pub fn render_tree(graph: &DependencyGraph<'_>) -> String {
    if graph.is_empty() {
        return "No tasks.".to_string();
    }

    let roots = graph.roots();
    if roots.is_empty() {
        return "No root tasks (every task has dependencies).".to_string();
    }

    let statuses = status_map(graph.task_ids().filter_map(|id| graph.task(id)));
    let mut renderer = TreeRenderer {
        graph,
        statuses,
        visited: HashSet::new(),
        out: String::new(),
    };

    for (i, root) in roots.iter().enumerate() {
        if i > 0 {
            renderer.out.push('\n');
        }
        renderer.node(root, "", None);
    }

    renderer.out
}

struct TreeRenderer<'g, 'a> {
    graph: &'g DependencyGraph<'a>,
    statuses: HashMap<TaskId, TaskStatus>,
    visited: HashSet<TaskId>,
    out: String,
}

impl TreeRenderer<'_, '_> {
    /// `last` is `None` for a root, otherwise whether this is the last sibling
    fn node(&mut self, id: &TaskId, prefix: &str, last: Option<bool>) {
        let Some(task) = self.graph.task(id) else {
            return;
        };

        let connector = match last {
            None => "",
            Some(true) => "└── ",
            Some(false) => "├── ",
        };
        let status = if task.is_blocked(&self.statuses) {
            format!("{} (blocked)", task.status)
        } else {
            task.status.to_string()
        };
        let label = format!("{} {} [{}]", task.id, task.title, status);

        if !self.visited.insert(id.clone()) {
            self.out
                .push_str(&format!("{}{}{} (see above)\n", prefix, connector, label));
            return;
        }
        self.out.push_str(&format!("{}{}{}\n", prefix, connector, label));

        let mut children = self.graph.dependents(id);
        children.sort();
        children.dedup();

        let child_prefix = match last {
            None => String::new(),
            Some(true) => format!("{}    ", prefix),
            Some(false) => format!("{}│   ", prefix),
        };
        let count = children.len();
        for (i, child) in children.iter().enumerate() {
            self.node(child, &child_prefix, Some(i + 1 == count));
        }
    }
}
