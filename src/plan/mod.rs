//! Resolved plan: the task forest plus its dependency graph.
//!
//! A [`Plan`] is produced by [`PlanBuilder`] and is immutable afterwards.
//! All relationships are [`TaskId`] lookups into one flat arena.
//!
//! # Submodules
//!
//! - [`builder`]: forest construction and the link → lift → trickle → trim pipeline
//! - [`source`]: lexical resolution of cross-source references

mod builder;
mod source;

pub use builder::PlanBuilder;
pub use source::{append_plan_extension, normalize_source, resolve_source};

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::{ancestors_in, Calendar, Instant, Task, TaskId, Timeline};

/// Leaf-task counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Leaf tasks.
    pub total: usize,
    /// Leaf tasks not completed (completion inherited).
    pub remaining: usize,
}

impl Progress {
    pub fn done(&self) -> usize {
        self.total - self.remaining
    }
}

/// A validated task graph.
#[derive(Debug, Clone)]
pub struct Plan {
    pub(crate) tasks: Vec<Task>,
    pub(crate) timeline: Timeline,
    /// Per task: upcoming-deadline tasks it blocks, itself included.
    pub(crate) deadlines: Vec<BTreeSet<TaskId>>,
}

impl Plan {
    /// Shorthand for [`PlanBuilder::new`].
    pub fn builder(timeline: Timeline) -> PlanBuilder {
        PlanBuilder::new(timeline)
    }

    pub(crate) fn from_parts(tasks: Vec<Task>, timeline: Timeline) -> Self {
        let mut plan = Self {
            tasks,
            timeline,
            deadlines: Vec::new(),
        };
        plan.deadlines = plan.compute_deadlines();
        plan
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// # Panics
    /// Panics if `id` does not belong to this plan.
    pub fn task(&self, id: TaskId) -> &Task {
        &self.tasks[id.0]
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn calendar(&self) -> &Calendar {
        self.timeline.calendar()
    }

    /// Normalized "now" sampled for this plan.
    pub fn now(&self) -> Instant {
        self.timeline.now()
    }

    // ======================== Subsets ========================

    fn select(&self, pred: impl Fn(&Task) -> bool) -> Vec<TaskId> {
        self.tasks.iter().filter(|&t| pred(t)).map(|t| t.id).collect()
    }

    pub fn roots(&self) -> Vec<TaskId> {
        self.select(|t| t.parent.is_none())
    }

    /// Neither completed nor started.
    pub fn todo(&self) -> Vec<TaskId> {
        self.select(Task::is_todo)
    }

    pub fn completed(&self) -> Vec<TaskId> {
        self.select(Task::is_completed)
    }

    /// Started and not completed.
    pub fn waiting(&self) -> Vec<TaskId> {
        self.select(Task::is_waiting)
    }

    /// Todo tasks carrying a deadline.
    pub fn upcoming_deadlines(&self) -> Vec<TaskId> {
        self.select(|t| t.is_todo() && t.deadline.is_some())
    }

    // ======================== Queries ========================

    pub fn children(&self, id: TaskId) -> &[TaskId] {
        &self.tasks[id.0].children
    }

    /// Ancestors, nearest first, `id` excluded.
    pub fn ancestors(&self, id: TaskId) -> Vec<TaskId> {
        ancestors_in(&self.tasks, id)
    }

    /// Number of ancestors; roots have depth 0.
    pub fn depth(&self, id: TaskId) -> usize {
        self.ancestors(id).len()
    }

    /// Tasks whose description contains `fragment`.
    pub fn find(&self, fragment: &str) -> Vec<TaskId> {
        self.select(|t| t.description.contains(fragment))
    }

    /// Upcoming-deadline tasks that (transitively) depend on `id`, plus `id`
    /// itself when it has an upcoming deadline.
    pub fn deadlines_for_task(&self, id: TaskId) -> &BTreeSet<TaskId> {
        &self.deadlines[id.0]
    }

    /// Earliest deadline among the tasks `id` blocks.
    pub fn earliest_blocked_deadline(&self, id: TaskId) -> Option<Instant> {
        self.deadlines[id.0]
            .iter()
            .filter_map(|d| self.tasks[d.0].deadline)
            .min()
    }

    /// Leaf counts, the way a plan's checklist progress is reported.
    pub fn progress(&self) -> Progress {
        let leaves = self.tasks.iter().filter(|t| t.is_leaf());
        let (total, remaining) = leaves.fold((0, 0), |(total, remaining), t| {
            (total + 1, remaining + usize::from(!t.is_completed()))
        });
        Progress { total, remaining }
    }

    fn compute_deadlines(&self) -> Vec<BTreeSet<TaskId>> {
        let mut blocked = vec![BTreeSet::new(); self.tasks.len()];
        for due in self.upcoming_deadlines() {
            let mut pending = vec![due];
            while let Some(node) = pending.pop() {
                if blocked[node.0].insert(due) {
                    pending.extend(self.tasks[node.0].dependencies.iter().copied());
                }
            }
        }
        blocked
    }
}
