//! Structural validation of a task arena.
//!
//! Each check fails fast with the offending path. Detects:
//! - Circular dependencies (DAG validation)
//! - Timed tasks nested under timed ancestors
//! - Deadlines that decrease along a dependency chain
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use std::collections::{btree_set, HashMap, HashSet};

use thiserror::Error;

use crate::models::{ancestors_in, Task, TaskId};

/// Validation result.
pub type ValidationResult = Result<(), ValidationError>;

/// A structural error in the plan graph.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Descriptions of the offending tasks, in path order.
    pub tasks: Vec<String>,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Dependency graph contains a cycle.
    CyclicDependency,
    /// A timed task has a timed ancestor.
    TimedAncestor,
    /// A prerequisite's deadline falls after its dependent's deadline.
    AchronologicalDeadlines,
}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>, tasks: Vec<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            tasks,
        }
    }
}

fn describe(tasks: &[Task], ids: &[TaskId]) -> Vec<String> {
    ids.iter().map(|id| tasks[id.0].description.clone()).collect()
}

/// Checks that only the deepest timed node of a lineage is timed.
pub fn check_timed_lineage(tasks: &[Task]) -> ValidationResult {
    for task in tasks.iter().filter(|t| t.is_timed()) {
        if let Some(ancestor) = ancestors_in(tasks, task.id)
            .into_iter()
            .find(|a| tasks[a.0].is_timed())
        {
            let ancestor = &tasks[ancestor.0];
            return Err(ValidationError::new(
                ValidationErrorKind::TimedAncestor,
                format!(
                    "Timed task '{}' in '{}' has a timed ancestor '{}'",
                    task.description, task.source, ancestor.description
                ),
                vec![task.description.clone(), ancestor.description.clone()],
            ));
        }
    }
    Ok(())
}

/// Detects cycles in the dependency graph using DFS.
///
/// # Algorithm
/// DFS from every unvisited task, with an explicit path stack. A
/// back-edge (reaching a task still on the path) closes a cycle; the path
/// from that task onward, plus the task again, is the reported chain.
///
/// # Reference
/// Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4
pub fn detect_cycle(tasks: &[Task]) -> ValidationResult {
    let mut visited = HashSet::new();

    for task in tasks {
        if visited.contains(&task.id) {
            continue;
        }
        if let Some(cycle) = cycle_from(task.id, tasks, &mut visited) {
            let names = describe(tasks, &cycle);
            let path = names
                .iter()
                .map(|d| format!("\"{d}\""))
                .collect::<Vec<_>>()
                .join(" => ");
            return Err(ValidationError::new(
                ValidationErrorKind::CyclicDependency,
                format!("Found cyclic dependencies: ({path})"),
                names,
            ));
        }
    }
    Ok(())
}

fn cycle_from(root: TaskId, tasks: &[Task], visited: &mut HashSet<TaskId>) -> Option<Vec<TaskId>> {
    // Each path entry keeps its unexplored dependencies.
    let mut path: Vec<(TaskId, btree_set::Iter<'_, TaskId>)> =
        vec![(root, tasks[root.0].dependencies.iter())];
    let mut position: HashMap<TaskId, usize> = HashMap::from([(root, 0)]);
    visited.insert(root);

    while let Some((node, deps)) = path.last_mut() {
        let node = *node;
        let Some(&next) = deps.next() else {
            path.pop();
            position.remove(&node);
            continue;
        };
        if let Some(&pos) = position.get(&next) {
            let mut cycle: Vec<TaskId> = path[pos..].iter().map(|(id, _)| *id).collect();
            cycle.push(next);
            return Some(cycle);
        }
        if visited.insert(next) {
            position.insert(next, path.len());
            path.push((next, tasks[next.0].dependencies.iter()));
        }
    }
    None
}

/// Checks deadline monotonicity along dependency chains.
///
/// Walks from every deadline-bearing task into its dependencies, carrying
/// the nearest deadline-bearing successor seen on the path; each
/// deadline-bearing prerequisite must not be due after that successor.
/// Each (task, successor) pair is visited once. Requires an acyclic graph.
pub fn check_deadlines(tasks: &[Task]) -> ValidationResult {
    let mut seen: HashSet<(TaskId, Option<TaskId>)> = HashSet::new();
    let mut pending: Vec<(TaskId, Option<TaskId>)> = tasks
        .iter()
        .rev()
        .filter(|t| t.deadline.is_some())
        .map(|t| (t.id, None))
        .collect();

    while let Some((node, subsequent)) = pending.pop() {
        if !seen.insert((node, subsequent)) {
            continue;
        }
        let task = &tasks[node.0];
        let mut carried = subsequent;
        if let Some(deadline) = task.deadline {
            if let Some(later) = subsequent.map(|s| &tasks[s.0]) {
                if later.deadline.is_some_and(|d| deadline > d) {
                    return Err(ValidationError::new(
                        ValidationErrorKind::AchronologicalDeadlines,
                        format!(
                            "Achronological deadlines for subsequent tasks ('{}' .. '{}')",
                            task.description, later.description
                        ),
                        vec![task.description.clone(), later.description.clone()],
                    ));
                }
            }
            carried = Some(node);
        }
        pending.extend(task.dependencies.iter().rev().map(|&dep| (dep, carried)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Calendar, Duration, Estimate, EstimateKind, Instant};
    use chrono::NaiveDate;

    fn arena(names: &[&str]) -> Vec<Task> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| Task::new(TaskId(i), "test.plan.md", *n))
            .collect()
    }

    fn depend(tasks: &mut [Task], task: usize, on: usize) {
        tasks[task].dependencies.insert(TaskId(on));
    }

    fn due(day: u32) -> Instant {
        let dt = NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        Instant::at(dt, &Calendar::standard())
    }

    fn estimate() -> Estimate {
        Estimate::exact(EstimateKind::Work, Duration::hours(1.0))
    }

    #[test]
    fn test_no_cycle_in_chain() {
        let mut tasks = arena(&["a", "b", "c"]);
        depend(&mut tasks, 0, 1);
        depend(&mut tasks, 1, 2);
        assert!(detect_cycle(&tasks).is_ok());
    }

    #[test]
    fn test_two_task_cycle() {
        let mut tasks = arena(&["A", "B"]);
        depend(&mut tasks, 0, 1);
        depend(&mut tasks, 1, 0);

        let err = detect_cycle(&tasks).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::CyclicDependency);
        assert!(err.tasks.contains(&"A".to_string()));
        assert!(err.tasks.contains(&"B".to_string()));
        assert_eq!(err.message, "Found cyclic dependencies: (\"A\" => \"B\" => \"A\")");
    }

    #[test]
    fn test_cycle_path_excludes_lead_in() {
        // x → a → b → c → a
        let mut tasks = arena(&["x", "a", "b", "c"]);
        depend(&mut tasks, 0, 1);
        depend(&mut tasks, 1, 2);
        depend(&mut tasks, 2, 3);
        depend(&mut tasks, 3, 1);

        let err = detect_cycle(&tasks).unwrap_err();
        assert_eq!(err.tasks, vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn test_timed_ancestor_rejected() {
        let mut tasks = arena(&["parent", "child"]);
        tasks[1].parent = Some(TaskId(0));
        tasks[0].children.push(TaskId(1));
        tasks[0].estimate = Some(estimate());
        tasks[1].estimate = Some(estimate());

        let err = check_timed_lineage(&tasks).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::TimedAncestor);
        assert_eq!(err.tasks, vec!["child", "parent"]);
    }

    #[test]
    fn test_timed_leaf_under_untimed_parent() {
        let mut tasks = arena(&["parent", "child"]);
        tasks[1].parent = Some(TaskId(0));
        tasks[0].children.push(TaskId(1));
        tasks[1].estimate = Some(estimate());
        assert!(check_timed_lineage(&tasks).is_ok());
    }

    #[test]
    fn test_deadline_monotonicity() {
        // A depends on B
        let mut tasks = arena(&["A", "B"]);
        depend(&mut tasks, 0, 1);
        tasks[0].deadline = Some(due(3));

        tasks[1].deadline = Some(due(4));
        let err = check_deadlines(&tasks).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::AchronologicalDeadlines);
        assert_eq!(err.tasks, vec!["B", "A"]);

        tasks[1].deadline = Some(due(3));
        assert!(check_deadlines(&tasks).is_ok());

        tasks[1].deadline = Some(due(2));
        assert!(check_deadlines(&tasks).is_ok());
    }

    #[test]
    fn test_deadline_checked_through_untimed_middle() {
        // A → M → B, only A and B carry deadlines
        let mut tasks = arena(&["A", "M", "B"]);
        depend(&mut tasks, 0, 1);
        depend(&mut tasks, 1, 2);
        tasks[0].deadline = Some(due(2));
        tasks[2].deadline = Some(due(5));
        assert!(check_deadlines(&tasks).is_err());
    }

    /// A dependency chain of `n` tasks: each task depends on the next.
    fn chain(n: usize) -> Vec<Task> {
        let mut tasks: Vec<Task> = (0..n)
            .map(|i| Task::new(TaskId(i), "test.plan.md", format!("t{i}")))
            .collect();
        for i in 1..n {
            depend(&mut tasks, i - 1, i);
        }
        tasks
    }

    #[test]
    fn test_long_chain_walks() {
        let n = 100_000;
        let mut tasks = chain(n);
        for task in tasks.iter_mut().step_by(1_000) {
            task.deadline = Some(due(10));
        }
        assert!(detect_cycle(&tasks).is_ok());
        assert!(check_deadlines(&tasks).is_ok());

        // The tail now comes due after its far-off dependent.
        tasks[n - 1].deadline = Some(due(11));
        let err = check_deadlines(&tasks).unwrap_err();
        assert_eq!(err.tasks, vec![format!("t{}", n - 1), "t99000".to_string()]);

        depend(&mut tasks, n - 1, 1);
        let err = detect_cycle(&tasks).unwrap_err();
        assert_eq!(err.tasks.len(), n);
        assert_eq!(err.tasks.first().map(String::as_str), Some("t1"));
        assert_eq!(err.tasks.last().map(String::as_str), Some("t1"));
    }
}
