//! Dependency graph for tasks
//!
//! Built fresh from a snapshot of tasks for each query and discarded
//! afterwards. Provides cycle detection with a readable cycle path,
//! deterministic topological ordering, and read-only derived queries.
//! Uses petgraph for graph storage and traversal.
//!
//! Edge direction: `task -> dependency`. Only dependencies that resolve to a
//! task in the snapshot become graph edges; dangling references are kept in
//! the declared lists (for roots and reverse lookups) but never traversed.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{depth_first_search, Control, DfsEvent, Dfs};
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;

use super::id::TaskId;
use super::task::Task;

/// A dependency cycle, in dependency order with the first node repeated last
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cycle detected: {}", render_path(.path))]
pub struct CycleError {
    pub path: Vec<TaskId>,
}

fn render_path(path: &[TaskId]) -> String {
    path.iter()
        .map(TaskId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl CycleError {
    pub fn new(path: Vec<TaskId>) -> Self {
        Self { path }
    }

    /// Distinct task IDs taking part in the cycle
    pub fn members(&self) -> &[TaskId] {
        match self.path.split_last() {
            Some((_, rest)) if !rest.is_empty() => rest,
            _ => &self.path,
        }
    }
}

/// A dependency graph over a borrowed snapshot of tasks
pub struct DependencyGraph<'a> {
    /// Resolvable edges only: task -> dependency
    graph: DiGraph<&'a Task, ()>,

    /// Map from TaskId to node index
    node_map: HashMap<&'a TaskId, NodeIndex>,

    /// Declared reverse edges: dependency id -> dependents (dangling keys included)
    dependents: HashMap<&'a TaskId, Vec<&'a TaskId>>,
}

impl<'a> DependencyGraph<'a> {
    /// Builds a graph from a collection of tasks
    ///
    /// Never fails: duplicate IDs keep the last record (at the position of
    /// the first), and dependencies on unknown IDs are tolerated.
    pub fn build(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut graph = DiGraph::new();
        let mut node_map: HashMap<&'a TaskId, NodeIndex> = HashMap::new();

        // First pass: add all nodes
        for task in tasks {
            match node_map.get(&task.id) {
                Some(&idx) => graph[idx] = task,
                None => {
                    let idx = graph.add_node(task);
                    node_map.insert(&task.id, idx);
                }
            }
        }

        // Second pass: add all edges
        let mut dependents: HashMap<&'a TaskId, Vec<&'a TaskId>> = HashMap::new();
        let indices: Vec<NodeIndex> = graph.node_indices().collect();
        for idx in indices {
            let task: &'a Task = graph[idx];
            for dep_id in &task.depends_on {
                dependents.entry(dep_id).or_default().push(&task.id);
                if let Some(&dep_idx) = node_map.get(dep_id) {
                    graph.add_edge(idx, dep_idx, ());
                }
            }
        }

        Self {
            graph,
            node_map,
            dependents,
        }
    }

    /// Checks the graph for cycles using a three-colour depth-first search
    ///
    /// Every node is used as a search root so disconnected components are
    /// covered. When several cycles exist, which one is reported depends on
    /// node order and should not be relied upon.
    pub fn validate_acyclic(&self) -> Result<(), CycleError> {
        match self.find_cycle() {
            Some(path) => Err(CycleError::new(path)),
            None => Ok(()),
        }
    }

    fn find_cycle(&self) -> Option<Vec<TaskId>> {
        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();

        let result = depth_first_search(&self.graph, self.graph.node_indices(), |event| {
            match event {
                DfsEvent::TreeEdge(from, to) => {
                    parent.insert(to, from);
                }
                // `to` is still on the DFS stack
                DfsEvent::BackEdge(from, to) => {
                    return Control::Break(self.cycle_path(&parent, from, to));
                }
                _ => {}
            }
            Control::Continue
        });

        match result {
            Control::Break(path) => Some(path),
            _ => None,
        }
    }

    /// Walks parent pointers from `from` back to `to`, then reverses
    fn cycle_path(
        &self,
        parent: &HashMap<NodeIndex, NodeIndex>,
        from: NodeIndex,
        to: NodeIndex,
    ) -> Vec<TaskId> {
        let mut path = vec![to];
        let mut current = from;
        while current != to {
            path.push(current);
            match parent.get(&current) {
                Some(&p) => current = p,
                None => break,
            }
        }
        path.push(to);
        path.reverse();

        path.into_iter().map(|idx| self.graph[idx].id.clone()).collect()
    }

    /// Returns all tasks in dependency order (dependencies before dependents)
    ///
    /// Kahn's algorithm with the frontier kept in ID order, so ties always
    /// resolve to the lexicographically smallest ID.
    pub fn topological_sort(&self) -> Result<Vec<TaskId>, CycleError> {
        let mut in_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|idx| {
                let degree = self
                    .graph
                    .neighbors_directed(idx, Direction::Outgoing)
                    .count();
                (idx, degree)
            })
            .collect();

        let mut frontier: BTreeMap<&TaskId, NodeIndex> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(&idx, _)| (&self.graph[idx].id, idx))
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some((id, idx)) = frontier.pop_first() {
            order.push(id.clone());

            for dependent in self.graph.neighbors_directed(idx, Direction::Incoming) {
                if let Some(degree) = in_degree.get_mut(&dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        frontier.insert(&self.graph[dependent].id, dependent);
                    }
                }
            }
        }

        if order.len() < self.graph.node_count() {
            return Err(self.validate_acyclic().err().unwrap_or_else(|| {
                let mut remaining: Vec<TaskId> = in_degree
                    .iter()
                    .filter(|(_, degree)| **degree > 0)
                    .map(|(&idx, _)| self.graph[idx].id.clone())
                    .collect();
                remaining.sort();
                CycleError::new(remaining)
            }));
        }

        Ok(order)
    }

    /// Returns every task reachable through dependency edges, excluding `id`
    pub fn transitive_dependencies(&self, id: &TaskId) -> BTreeSet<TaskId> {
        let start = match self.node_map.get(id) {
            Some(&idx) => idx,
            None => return BTreeSet::new(),
        };

        let mut dfs = Dfs::new(&self.graph, start);
        let mut deps = BTreeSet::new();
        while let Some(idx) = dfs.next(&self.graph) {
            let task = self.graph[idx];
            if &task.id != id {
                deps.insert(task.id.clone());
            }
        }
        deps
    }

    /// Returns the direct dependents of a task (tasks that list it)
    pub fn dependents(&self, id: &TaskId) -> Vec<TaskId> {
        self.dependents
            .get(id)
            .map(|ids| ids.iter().map(|d| (*d).clone()).collect())
            .unwrap_or_default()
    }

    /// Returns tasks that declare no dependencies, sorted by ID
    pub fn roots(&self) -> Vec<TaskId> {
        let mut roots: Vec<TaskId> = self
            .tasks()
            .filter(|task| task.depends_on.is_empty())
            .map(|task| task.id.clone())
            .collect();
        roots.sort();
        roots
    }

    /// Returns tasks no other task depends on, sorted by ID
    pub fn leaves(&self) -> Vec<TaskId> {
        let mut leaves: Vec<TaskId> = self
            .tasks()
            .filter(|task| {
                self.dependents
                    .get(&task.id)
                    .map_or(true, |ids| ids.is_empty())
            })
            .map(|task| task.id.clone())
            .collect();
        leaves.sort();
        leaves
    }

    /// Returns the task record for an ID
    pub fn task(&self, id: &TaskId) -> Option<&'a Task> {
        self.node_map.get(id).map(|&idx| self.graph[idx])
    }

    /// Returns true if the graph contains the task
    pub fn contains(&self, id: &TaskId) -> bool {
        self.node_map.contains_key(id)
    }

    /// Returns the number of tasks in the graph
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns true if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Returns all task IDs in snapshot order
    pub fn task_ids(&self) -> impl Iterator<Item = &'a TaskId> + '_ {
        self.tasks().map(|task| &task.id)
    }

    fn tasks(&self) -> impl Iterator<Item = &'a Task> + '_ {
        self.graph.node_indices().map(|idx| self.graph[idx])
    }
}

impl fmt::Debug for DependencyGraph<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyGraph")
            .field("nodes", &self.graph.node_count())
            .field("edges", &self.graph.edge_count())
            .finish()
    }
}
