//! Candidate schedule model.
//!
//! A schedule is one total order of a plan's todo tasks. It is never
//! mutated in place; genetic operators always build a new one. Every
//! derived quantity is a pure function of the order and the plan.
//!
//! # Fitness
//! Infeasible (non-chronological) orders rank below every feasible one.
//! Feasible orders compare lexicographically on:
//! 1. earliness hours of every upcoming deadline, sorted ascending
//!    (the worst deadline dominates)
//! 2. fewer jumps between unrelated lineages
//! 3. fewer slides (shallow shared ancestry)

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{Duration, Instant, TaskId};
use crate::plan::Plan;
use crate::scheduler::DeadlineSummary;

/// An ordering of todo tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Schedule {
    order: Vec<TaskId>,
}

/// Context-switching cost of an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSwitching {
    /// Consecutive pairs with no common ancestor.
    pub jumps: usize,
    /// Summed common-ancestor distance over the other pairs.
    pub slides: usize,
}

impl Schedule {
    pub fn new(order: Vec<TaskId>) -> Self {
        Self { order }
    }

    pub fn order(&self) -> &[TaskId] {
        &self.order
    }

    pub fn into_order(self) -> Vec<TaskId> {
        self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Whether the order holds each todo task of `plan` exactly once.
    pub fn covers(&self, plan: &Plan) -> bool {
        let mut todo = plan.todo();
        let mut order = self.order.clone();
        todo.sort_unstable();
        order.sort_unstable();
        todo == order
    }

    /// Every task's dependencies are completed, waiting, or earlier in the order.
    pub fn is_chronological(&self, plan: &Plan) -> bool {
        let mut satisfied: HashSet<TaskId> = plan
            .tasks()
            .iter()
            .filter(|t| t.is_completed() || t.is_waiting())
            .map(|t| t.id())
            .collect();
        for &id in &self.order {
            if !plan.task(id).dependencies().iter().all(|d| satisfied.contains(d)) {
                return false;
            }
            satisfied.insert(id);
        }
        true
    }

    /// Projected completion of every waiting and scheduled task.
    ///
    /// # Algorithm
    /// 1. Waiting tasks end at max(now, start + total duration).
    /// 2. Walking the order from now, a task starts at the later of the
    ///    shared clock and its unfinished dependencies' ends, and runs
    ///    for its remaining duration.
    /// 3. Wait tasks leave the shared clock where it was.
    ///
    /// Dependencies without a projected end (not yet reached in a
    /// non-chronological order) are ignored.
    pub fn end_times(&self, plan: &Plan) -> BTreeMap<TaskId, Instant> {
        let calendar = plan.calendar();
        let now = plan.now();
        let mut ends = BTreeMap::new();

        for id in plan.waiting() {
            let task = plan.task(id);
            let start = task.start().unwrap_or(now);
            ends.insert(id, start.plus(task.total_duration(calendar), calendar).max(now));
        }

        let mut clock = now;
        for &id in &self.order {
            let task = plan.task(id);
            let start = task
                .dependencies()
                .iter()
                .filter(|d| !plan.task(**d).is_completed())
                .filter_map(|d| ends.get(d).copied())
                .fold(clock, Instant::max);
            let end = start.plus(task.remaining_duration(calendar), calendar);
            ends.insert(id, end);
            if !task.is_wait() {
                clock = end;
            }
        }
        ends
    }

    /// Deadline minus projected end for every upcoming deadline
    /// (positive = early).
    pub fn earliness(&self, plan: &Plan) -> BTreeMap<TaskId, Duration> {
        let calendar = plan.calendar();
        let ends = self.end_times(plan);
        plan.upcoming_deadlines()
            .into_iter()
            .filter_map(|id| {
                let deadline = plan.task(id).deadline()?;
                let end = ends.get(&id)?;
                Some((id, end.until(deadline, calendar)))
            })
            .collect()
    }

    /// Jumps and slides between consecutive tasks.
    pub fn context_switching(&self, plan: &Plan) -> ContextSwitching {
        let mut cost = ContextSwitching::default();
        for pair in self.order.windows(2) {
            match common_ancestor_depth(plan, pair[0], pair[1]) {
                None => cost.jumps += 1,
                Some(depth) => cost.slides += depth,
            }
        }
        cost
    }

    pub fn fitness(&self, plan: &Plan) -> Fitness {
        if !self.is_chronological(plan) {
            return Fitness::Infeasible;
        }
        let mut earliness: Vec<f64> = self
            .earliness(plan)
            .values()
            .map(Duration::as_hours)
            .collect();
        earliness.sort_by(f64::total_cmp);
        let ContextSwitching { jumps, slides } = self.context_switching(plan);
        Fitness::Feasible {
            earliness,
            jumps,
            slides,
        }
    }

    /// Per-deadline status report.
    pub fn summary(&self, plan: &Plan) -> DeadlineSummary {
        DeadlineSummary::calculate(self, plan)
    }
}

/// Distance to the deepest shared ancestor, the smaller of the two
/// sides; `None` when the lineages are disjoint.
fn common_ancestor_depth(plan: &Plan, a: TaskId, b: TaskId) -> Option<usize> {
    let left = plan.ancestors(a);
    let right = plan.ancestors(b);
    left.iter()
        .enumerate()
        .find_map(|(i, x)| right.iter().position(|y| y == x).map(|j| i.min(j)))
}

// ======================== Fitness ========================

/// Rank of a schedule; larger is better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Fitness {
    /// Violates a dependency. Ranks below every feasible order.
    Infeasible,
    Feasible {
        /// Earliness hours, ascending.
        earliness: Vec<f64>,
        jumps: usize,
        slides: usize,
    },
}

impl Fitness {
    pub fn is_feasible(&self) -> bool {
        matches!(self, Fitness::Feasible { .. })
    }

    /// Earliness of the most at-risk deadline.
    pub fn worst_earliness(&self) -> Option<f64> {
        match self {
            Fitness::Feasible { earliness, .. } => earliness.first().copied(),
            Fitness::Infeasible => None,
        }
    }

    /// Equality with earliness compared within `tolerance` hours.
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        match (self, other) {
            (Fitness::Infeasible, Fitness::Infeasible) => true,
            (
                Fitness::Feasible {
                    earliness: e1,
                    jumps: j1,
                    slides: s1,
                },
                Fitness::Feasible {
                    earliness: e2,
                    jumps: j2,
                    slides: s2,
                },
            ) => {
                j1 == j2
                    && s1 == s2
                    && e1.len() == e2.len()
                    && e1.iter().zip(e2).all(|(a, b)| (a - b).abs() <= tolerance)
            }
            _ => false,
        }
    }
}

impl Ord for Fitness {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Fitness::Infeasible, Fitness::Infeasible) => Ordering::Equal,
            (Fitness::Infeasible, _) => Ordering::Less,
            (_, Fitness::Infeasible) => Ordering::Greater,
            (
                Fitness::Feasible {
                    earliness: e1,
                    jumps: j1,
                    slides: s1,
                },
                Fitness::Feasible {
                    earliness: e2,
                    jumps: j2,
                    slides: s2,
                },
            ) => e1
                .iter()
                .zip(e2)
                .map(|(a, b)| a.total_cmp(b))
                .find(|o| o.is_ne())
                .unwrap_or_else(|| e1.len().cmp(&e2.len()))
                .then_with(|| j2.cmp(j1))
                .then_with(|| s2.cmp(s1)),
        }
    }
}

impl PartialOrd for Fitness {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Fitness {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Fitness {}
