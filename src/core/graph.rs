//! Task dependency graph.
//!
//! This module provides the `TaskGraph` structure that represents task
//! dependencies as a directed acyclic graph. The graph is the substrate the
//! planner partitions into execution phases; it rejects unknown dependency
//! ids and refuses edges that would introduce a cycle.

use crate::core::task::{Task, TaskId};
use crate::error::{Error, Result};
use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// The task dependency graph.
///
/// Nodes are tasks; an edge `a -> b` means `b` depends on `a` (`a` must
/// complete first). Uses petgraph's `DiGraph` with an index map from
/// `TaskId` to `NodeIndex` for fast lookups.
pub struct TaskGraph {
    /// The underlying directed graph.
    graph: DiGraph<Task, ()>,
    /// Index mapping from TaskId to NodeIndex.
    task_index: HashMap<TaskId, NodeIndex>,
}

impl TaskGraph {
    /// Create a new empty TaskGraph.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            task_index: HashMap::new(),
        }
    }

    /// Build a graph from a task set, wiring up each task's declared
    /// dependencies.
    ///
    /// # Errors
    /// Returns `Error::Validation` for duplicate or unknown ids, and
    /// `Error::Cycle` (naming the cycle members) if the declared
    /// dependencies do not admit a topological order.
    pub fn from_tasks(tasks: &[Task]) -> Result<Self> {
        let mut graph = Self::new();

        for task in tasks {
            if graph.contains_task(&task.id) {
                return Err(Error::Validation(format!(
                    "duplicate task id: {}",
                    task.id
                )));
            }
            graph.add_task(task.clone());
        }

        for task in tasks {
            for dep in &task.dependencies {
                graph.add_edge_unchecked(dep, &task.id)?;
            }
        }

        if is_cyclic_directed(&graph.graph) {
            return Err(Error::Cycle {
                members: graph.cycle_members(),
            });
        }

        Ok(graph)
    }

    /// Add a task to the graph.
    ///
    /// If the task already exists (same id), returns the existing index.
    pub fn add_task(&mut self, task: Task) -> NodeIndex {
        if let Some(&index) = self.task_index.get(&task.id) {
            return index;
        }

        let id = task.id.clone();
        let index = self.graph.add_node(task);
        self.task_index.insert(id, index);
        index
    }

    /// Add a dependency edge, validating that no cycle is introduced.
    ///
    /// `from` must complete before `to` can start.
    pub fn add_dependency(&mut self, from: &TaskId, to: &TaskId) -> Result<()> {
        let edge = {
            let from_index = self.node_index(from)?;
            let to_index = self.node_index(to)?;
            self.graph.add_edge(from_index, to_index, ())
        };

        if is_cyclic_directed(&self.graph) {
            self.graph.remove_edge(edge);
            return Err(Error::Cycle {
                members: vec![from.0.clone(), to.0.clone()],
            });
        }

        Ok(())
    }

    /// Add an edge without the cycle check; used during bulk construction
    /// where the whole graph is checked once at the end.
    fn add_edge_unchecked(&mut self, from: &TaskId, to: &TaskId) -> Result<()> {
        let from_index = self.node_index(from)?;
        let to_index = self.node_index(to)?;
        self.graph.add_edge(from_index, to_index, ());
        Ok(())
    }

    fn node_index(&self, id: &TaskId) -> Result<NodeIndex> {
        self.task_index
            .get(id)
            .copied()
            .ok_or_else(|| Error::Validation(format!("task {} not found in graph", id)))
    }

    /// Ids of every task participating in a dependency cycle.
    ///
    /// Cycle members are the strongly connected components with more than
    /// one node, plus any self-loops. Sorted for stable diagnostics.
    fn cycle_members(&self) -> Vec<String> {
        let mut members: Vec<String> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1
                    || scc
                        .first()
                        .is_some_and(|&n| self.graph.find_edge(n, n).is_some())
            })
            .flatten()
            .filter_map(|n| self.graph.node_weight(n).map(|t| t.id.0.clone()))
            .collect();
        members.sort();
        members
    }

    /// Get a reference to a task by its id.
    pub fn get_task(&self, id: &TaskId) -> Option<&Task> {
        self.task_index
            .get(id)
            .and_then(|&index| self.graph.node_weight(index))
    }

    /// Get the number of tasks in the graph.
    pub fn task_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get the number of dependency edges in the graph.
    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Check if a dependency edge exists between two tasks.
    pub fn has_dependency(&self, from: &TaskId, to: &TaskId) -> bool {
        if let (Some(&from_idx), Some(&to_idx)) =
            (self.task_index.get(from), self.task_index.get(to))
        {
            self.graph.find_edge(from_idx, to_idx).is_some()
        } else {
            false
        }
    }

    /// Get all tasks the given task depends on (predecessors).
    pub fn dependencies_of(&self, id: &TaskId) -> Vec<&Task> {
        if let Some(&index) = self.task_index.get(id) {
            self.graph
                .neighbors_directed(index, petgraph::Direction::Incoming)
                .filter_map(|neighbor| self.graph.node_weight(neighbor))
                .collect()
        } else {
            Vec::new()
        }
    }

    /// Get all tasks that depend on the given task (successors).
    pub fn dependents_of(&self, id: &TaskId) -> Vec<&Task> {
        if let Some(&index) = self.task_index.get(id) {
            self.graph
                .neighbors_directed(index, petgraph::Direction::Outgoing)
                .filter_map(|neighbor| self.graph.node_weight(neighbor))
                .collect()
        } else {
            Vec::new()
        }
    }

    /// Get all tasks in the graph.
    pub fn all_tasks(&self) -> Vec<&Task> {
        self.graph.node_weights().collect()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Check if the graph contains a task.
    pub fn contains_task(&self, id: &TaskId) -> bool {
        self.task_index.contains_key(id)
    }
}

impl Default for TaskGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskGraph")
            .field("tasks", &self.task_count())
            .field("dependencies", &self.dependency_count())
            .finish()
    }
}
