//! Task model.
//!
//! A task is a unit of work in the plan hierarchy. Tasks live in a flat
//! arena owned by [`Plan`](crate::plan::Plan); parent, child and
//! dependency links are [`TaskId`] indices into that arena.
//!
//! # Derived Durations
//! - `measured` = recorded measurements + (finish − start) when both exist
//! - `total` = estimate nominal when estimated, else `measured`
//! - `remaining` = 0 when completed, else max(0, total − measured)

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Calendar, Duration, Instant};

/// Index of a task in its plan's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub(crate) usize);

impl TaskId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether an estimate occupies the worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstimateKind {
    #[default]
    Work,
    /// External delay; runs in parallel with other work.
    Wait,
}

/// Interpreted estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Estimate {
    pub kind: EstimateKind,
    /// Midpoint of `min..=max`.
    pub nominal: Duration,
    pub min: Duration,
    pub max: Duration,
}

impl Estimate {
    /// Creates an estimate over a range; nominal is the midpoint.
    pub fn new(kind: EstimateKind, min: Duration, max: Duration) -> Self {
        Self {
            kind,
            nominal: Duration::hours((min.as_hours() + max.as_hours()) / 2.0),
            min,
            max,
        }
    }

    /// Point estimate.
    pub fn exact(kind: EstimateKind, value: Duration) -> Self {
        Self {
            kind,
            nominal: value,
            min: value,
            max: value,
        }
    }
}

/// A node of the plan hierarchy.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub(crate) id: TaskId,
    pub(crate) description: String,
    pub(crate) source: String,
    pub(crate) level: f64,
    pub(crate) ordered: bool,
    pub(crate) completed: bool,
    pub(crate) estimate: Option<Estimate>,
    pub(crate) measurements: Vec<Duration>,
    pub(crate) start: Option<Instant>,
    pub(crate) finish: Option<Instant>,
    pub(crate) deadline: Option<Instant>,
    pub(crate) parent: Option<TaskId>,
    pub(crate) children: Vec<TaskId>,
    pub(crate) dependencies: BTreeSet<TaskId>,
}

impl Task {
    /// Creates an untimed, unlinked task.
    pub(crate) fn new(id: TaskId, source: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            source: source.into(),
            level: 0.0,
            ordered: false,
            completed: false,
            estimate: None,
            measurements: Vec::new(),
            start: None,
            finish: None,
            deadline: None,
            parent: None,
            children: Vec::new(),
            dependencies: BTreeSet::new(),
        }
    }

    pub(crate) fn with_estimate(mut self, estimate: Estimate) -> Self {
        self.estimate = Some(estimate);
        self
    }

    pub(crate) fn with_start(mut self, start: Instant) -> Self {
        self.start = Some(start);
        self
    }

    pub(crate) fn with_finish(mut self, finish: Instant) -> Self {
        self.finish = Some(finish);
        self
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    /// Explicitly, by inheritance, or by a recorded finish.
    pub fn is_completed(&self) -> bool {
        self.completed || self.finish.is_some()
    }

    pub fn estimate(&self) -> Option<&Estimate> {
        self.estimate.as_ref()
    }

    pub fn measurements(&self) -> &[Duration] {
        &self.measurements
    }

    pub fn start(&self) -> Option<Instant> {
        self.start
    }

    pub fn finish(&self) -> Option<Instant> {
        self.finish
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn parent(&self) -> Option<TaskId> {
        self.parent
    }

    pub fn children(&self) -> &[TaskId] {
        &self.children
    }

    /// Resolved dependencies (tasks that must finish first).
    pub fn dependencies(&self) -> &BTreeSet<TaskId> {
        &self.dependencies
    }

    pub fn is_wait(&self) -> bool {
        self.estimate.is_some_and(|e| e.kind == EstimateKind::Wait)
    }

    /// Carries an estimate, a measurement, a start or a finish.
    pub fn is_timed(&self) -> bool {
        self.estimate.is_some()
            || !self.measurements.is_empty()
            || self.start.is_some()
            || self.finish.is_some()
    }

    /// Started but not completed.
    pub fn is_waiting(&self) -> bool {
        self.start.is_some() && !self.is_completed()
    }

    /// Neither completed nor waiting.
    pub fn is_todo(&self) -> bool {
        !self.is_completed() && !self.is_waiting()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Work time already spent.
    pub fn measured(&self, calendar: &Calendar) -> Duration {
        let recorded: Duration = self.measurements.iter().copied().sum();
        match (self.start, self.finish) {
            (Some(start), Some(finish)) => recorded + start.until(finish, calendar),
            _ => recorded,
        }
    }

    /// Expected work time in total.
    pub fn total_duration(&self, calendar: &Calendar) -> Duration {
        match self.estimate {
            Some(estimate) => estimate.nominal,
            None => self.measured(calendar),
        }
    }

    /// Work time still ahead.
    pub fn remaining_duration(&self, calendar: &Calendar) -> Duration {
        if self.is_completed() {
            return Duration::ZERO;
        }
        (self.total_duration(calendar) - self.measured(calendar)).max(Duration::ZERO)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// Ancestors of `id`, nearest first, `id` itself excluded.
pub(crate) fn ancestors_in(tasks: &[Task], id: TaskId) -> Vec<TaskId> {
    let mut chain = Vec::new();
    let mut cursor = tasks[id.0].parent;
    while let Some(parent) = cursor {
        chain.push(parent);
        cursor = tasks[parent.0].parent;
    }
    chain
}
