//! Execution-phase planning over the task graph.
//!
//! `plan` decomposes a task set into phases of safely-parallel tasks,
//! computes the critical path by cumulative estimated effort, and surfaces
//! parallel-opportunity groups. Planning is deterministic: the same task
//! set always yields the same plan, with ties broken by ascending task id.

use crate::core::graph::TaskGraph;
use crate::core::task::{EffortWeights, Task, TaskId};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A derived execution plan for a task set.
///
/// Plans are recomputed whole whenever the task set changes; they are
/// never partially applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    /// Ordered phases; phase `k` contains every task whose dependencies
    /// are all satisfied by phases `0..k`.
    pub phases: Vec<Vec<TaskId>>,
    /// Longest dependency chain by cumulative effort weight.
    pub critical_path: Vec<TaskId>,
    /// Sets of tasks that can run concurrently (phases with two or more
    /// members; tasks within one phase never depend on each other).
    pub parallel_groups: Vec<Vec<TaskId>>,
}

impl ExecutionPlan {
    /// Total number of tasks covered by the plan.
    pub fn task_count(&self) -> usize {
        self.phases.iter().map(|p| p.len()).sum()
    }

    /// Number of phases.
    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    /// Phase index a task was scheduled into, if present.
    pub fn phase_of(&self, id: &TaskId) -> Option<usize> {
        self.phases.iter().position(|phase| phase.contains(id))
    }
}

/// Decompose a task set into an execution plan.
///
/// # Errors
/// Returns `Error::Validation` for duplicate/unknown task ids and
/// `Error::Cycle` (naming at least one member) when no topological order
/// exists. Cycles are detected, never silently ignored.
pub fn plan(tasks: &[Task], weights: &EffortWeights) -> Result<ExecutionPlan> {
    // Validates ids and rejects cycles before any phase math runs.
    let _graph = TaskGraph::from_tasks(tasks)?;

    let by_id: BTreeMap<TaskId, &Task> = tasks.iter().map(|t| (t.id.clone(), t)).collect();

    let phases = partition_phases(&by_id);
    let critical_path = critical_path(&by_id, &phases, weights);
    let parallel_groups = phases
        .iter()
        .filter(|phase| phase.len() >= 2)
        .cloned()
        .collect();

    Ok(ExecutionPlan {
        phases,
        critical_path,
        parallel_groups,
    })
}

/// Kahn-style layering: each phase is the set of tasks whose dependencies
/// were placed in earlier phases. Tasks inside a phase are sorted by id.
fn partition_phases(by_id: &BTreeMap<TaskId, &Task>) -> Vec<Vec<TaskId>> {
    let mut placed: BTreeSet<TaskId> = BTreeSet::new();
    let mut remaining: BTreeSet<TaskId> = by_id.keys().cloned().collect();
    let mut phases = Vec::new();

    while !remaining.is_empty() {
        // BTreeSet iteration keeps each phase sorted by id already.
        let ready: Vec<TaskId> = remaining
            .iter()
            .filter(|id| {
                by_id[*id]
                    .dependencies
                    .iter()
                    .all(|dep| placed.contains(dep))
            })
            .cloned()
            .collect();

        // A cycle would have been rejected during graph construction.
        debug_assert!(!ready.is_empty(), "no ready tasks without a cycle");
        if ready.is_empty() {
            break;
        }

        for id in &ready {
            remaining.remove(id);
            placed.insert(id.clone());
        }
        phases.push(ready);
    }

    phases
}

/// Longest dependency chain by cumulative effort weight.
///
/// Dynamic programming over the phase order (which is topological). Ties
/// are broken toward the ascending task id at both the predecessor choice
/// and the chain endpoint.
fn critical_path(
    by_id: &BTreeMap<TaskId, &Task>,
    phases: &[Vec<TaskId>],
    weights: &EffortWeights,
) -> Vec<TaskId> {
    let mut cost: HashMap<TaskId, u32> = HashMap::new();
    let mut best_pred: HashMap<TaskId, Option<TaskId>> = HashMap::new();

    for phase in phases {
        for id in phase {
            let task = by_id[id];
            let own = task.effort.weight(weights);

            // Deepest predecessor chain; smallest id wins a cost tie.
            let mut chosen: Option<(TaskId, u32)> = None;
            for dep in &task.dependencies {
                let dep_cost = cost[dep];
                chosen = match chosen {
                    None => Some((dep.clone(), dep_cost)),
                    Some((cur_id, cur_cost)) => {
                        if dep_cost > cur_cost || (dep_cost == cur_cost && *dep < cur_id) {
                            Some((dep.clone(), dep_cost))
                        } else {
                            Some((cur_id, cur_cost))
                        }
                    }
                };
            }

            match chosen {
                Some((pred, pred_cost)) => {
                    cost.insert(id.clone(), own + pred_cost);
                    best_pred.insert(id.clone(), Some(pred));
                }
                None => {
                    cost.insert(id.clone(), own);
                    best_pred.insert(id.clone(), None);
                }
            }
        }
    }

    // Chain endpoint: maximal cost; the ascending key order of the scan
    // means the smallest id keeps a tie.
    let mut end: Option<(TaskId, u32)> = None;
    for id in by_id.keys() {
        let c = cost[id];
        let replace = match &end {
            None => true,
            Some((_, cur_cost)) => c > *cur_cost,
        };
        if replace {
            end = Some((id.clone(), c));
        }
    }

    let mut path = Vec::new();
    let mut cursor = end.map(|(id, _)| id);
    while let Some(id) = cursor {
        cursor = best_pred[&id].clone();
        path.push(id);
    }
    path.reverse();
    path
}
