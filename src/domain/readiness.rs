//! Ready and blocked queries over a task snapshot
//!
//! Blocked state is always derived from the snapshot, never stored.

use std::collections::HashMap;

use super::graph::DependencyGraph;
use super::id::TaskId;
use super::task::{status_map, Task, TaskStatus, TaskType};

/// Returns open, unblocked, task-type tasks in dependency order
///
/// Ordering follows [`DependencyGraph::topological_sort`] over the task-type
/// records. If the snapshot contains a cycle the candidates are returned in
/// input order instead; use the graph directly when strict ordering matters.
pub fn ready_tasks(tasks: &[Task]) -> Vec<&Task> {
    let tasks = latest_records(tasks);
    let statuses = status_map(tasks.iter().copied());

    let candidates: Vec<&Task> = tasks
        .iter()
        .copied()
        .filter(|t| t.task_type == TaskType::Task)
        .filter(|t| t.status == TaskStatus::Open && !t.is_blocked(&statuses))
        .collect();

    if candidates.is_empty() {
        return candidates;
    }

    let graph = DependencyGraph::build(
        tasks
            .iter()
            .copied()
            .filter(|t| t.task_type == TaskType::Task),
    );
    let order = match graph.topological_sort() {
        Ok(order) => order,
        Err(_) => return candidates,
    };

    let by_id: HashMap<&TaskId, &Task> = candidates.iter().map(|t| (&t.id, *t)).collect();
    order
        .iter()
        .filter_map(|id| by_id.get(id).copied())
        .collect()
}

/// Returns unfinished tasks that are blocked, each with its blocking IDs
pub fn blocked_tasks(tasks: &[Task]) -> Vec<(&Task, Vec<TaskId>)> {
    let tasks = latest_records(tasks);
    let statuses = status_map(tasks.iter().copied());

    tasks
        .into_iter()
        .filter(|t| !t.is_epic() && !t.status.is_closed())
        .filter_map(|t| {
            let blockers = t.blockers(&statuses);
            if blockers.is_empty() {
                None
            } else {
                Some((t, blockers))
            }
        })
        .collect()
}

/// One record per ID: the last one wins, at the first one's position
fn latest_records(tasks: &[Task]) -> Vec<&Task> {
    let mut slots: HashMap<&TaskId, usize> = HashMap::new();
    let mut records: Vec<&Task> = Vec::with_capacity(tasks.len());

    for task in tasks {
        match slots.get(&task.id) {
            Some(&slot) => records[slot] = task,
            None => {
                slots.insert(&task.id, records.len());
                records.push(task);
            }
        }
    }

    records
}
