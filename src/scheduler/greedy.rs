//! Deadline-driven greedy seed ordering.
//!
//! # Algorithm
//!
//! 1. Completed and waiting tasks start out satisfied.
//! 2. Among unplaced todo tasks whose dependencies are all satisfied,
//!    pick the one blocking the earliest upcoming deadline (tasks that
//!    block none come last; work before wait; then arena order).
//! 3. Append it, mark it satisfied, and repeat until every todo task
//!    is placed.
//!
//! The result is always chronological, which makes it a safe first
//! member of the GA population.
//!
//! # Complexity
//! O(n^2 * d) where n = todo tasks, d = average dependency count.
//!
//! # Reference
//! Jackson (1955), "Scheduling a Production Line to Minimize Maximum
//! Tardiness" (earliest due date)

use std::collections::HashSet;

use tracing::debug;

use crate::error::{PlanError, PlanResult};
use crate::models::{Instant, Schedule, TaskId};
use crate::plan::Plan;

/// Builds a feasible starting order for `plan`.
///
/// # Errors
/// [`PlanError::Infeasible`] when at some step no remaining task has all
/// of its dependencies satisfied.
pub fn greedy_schedule(plan: &Plan) -> PlanResult<Schedule> {
    let mut satisfied: HashSet<TaskId> = plan
        .tasks()
        .iter()
        .filter(|t| t.is_completed() || t.is_waiting())
        .map(|t| t.id())
        .collect();
    let mut remaining = plan.todo();
    let mut order = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let next = remaining
            .iter()
            .enumerate()
            .filter(|(_, &id)| {
                plan.task(id)
                    .dependencies()
                    .iter()
                    .all(|d| satisfied.contains(d))
            })
            .min_by_key(|(_, &id)| seed_key(plan, id))
            .map(|(i, _)| i);

        let Some(index) = next else {
            return Err(PlanError::Infeasible {
                remaining: remaining
                    .iter()
                    .map(|&id| plan.task(id).description().to_string())
                    .collect(),
            });
        };
        let id = remaining.remove(index);
        satisfied.insert(id);
        order.push(id);
    }

    debug!(tasks = order.len(), "greedy seed ordered");
    Ok(Schedule::new(order))
}

/// Sort key; smaller goes first.
fn seed_key(plan: &Plan, id: TaskId) -> (bool, Option<Instant>, bool, TaskId) {
    let deadline = plan.earliest_blocked_deadline(id);
    (deadline.is_none(), deadline, plan.task(id).is_wait(), id)
}
