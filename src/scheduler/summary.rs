//! Per-deadline report for a schedule.
//!
//! # Statuses
//!
//! | Status | Condition |
//! |--------|-----------|
//! | OnTime | Projected end equals the deadline |
//! | Early(d) | Ends `d` work time before the deadline |
//! | Late(d) | Ends `d` work time after a deadline still ahead of now |
//! | Missed | Ends after a deadline that has already passed |

use std::fmt;

use serde::Serialize;

use crate::models::{Calendar, Duration, Instant, Schedule, TaskId};
use crate::plan::Plan;

/// Outcome for one deadline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum DeadlineStatus {
    OnTime,
    Early(Duration),
    Late(Duration),
    Missed,
}

impl DeadlineStatus {
    fn classify(earliness: Duration, deadline: Instant, now: Instant) -> Self {
        if earliness.is_negative() {
            if deadline < now {
                DeadlineStatus::Missed
            } else {
                DeadlineStatus::Late(earliness.abs())
            }
        } else if earliness == Duration::ZERO {
            DeadlineStatus::OnTime
        } else {
            DeadlineStatus::Early(earliness)
        }
    }

    pub fn is_met(&self) -> bool {
        matches!(self, DeadlineStatus::OnTime | DeadlineStatus::Early(_))
    }

    /// Short phrase, e.g. `early by 3.00 hours`.
    pub fn describe(&self, calendar: &Calendar) -> String {
        match self {
            DeadlineStatus::OnTime => "on time".to_string(),
            DeadlineStatus::Early(d) => format!("early by {}", d.humanize(calendar)),
            DeadlineStatus::Late(d) => format!("late by {}", d.humanize(calendar)),
            DeadlineStatus::Missed => "missed".to_string(),
        }
    }
}

/// One upcoming deadline and how the schedule meets it.
#[derive(Debug, Clone, Serialize)]
pub struct DeadlineEntry {
    pub task: TaskId,
    pub description: String,
    pub deadline: Instant,
    pub projected_end: Instant,
    pub status: DeadlineStatus,
}

/// Deadline statuses of a schedule, earliest deadline first.
#[derive(Debug, Clone)]
pub struct DeadlineSummary {
    entries: Vec<DeadlineEntry>,
    calendar: Calendar,
}

impl DeadlineSummary {
    /// Evaluates every upcoming deadline of `plan` under `schedule`.
    ///
    /// Deadline tasks missing from the order get no entry.
    pub fn calculate(schedule: &Schedule, plan: &Plan) -> Self {
        let calendar = plan.calendar();
        let now = plan.now();
        let ends = schedule.end_times(plan);

        let mut entries: Vec<DeadlineEntry> = plan
            .upcoming_deadlines()
            .into_iter()
            .filter_map(|id| {
                let task = plan.task(id);
                let deadline = task.deadline()?;
                let projected_end = *ends.get(&id)?;
                let earliness = projected_end.until(deadline, calendar);
                Some(DeadlineEntry {
                    task: id,
                    description: task.description().to_string(),
                    deadline,
                    projected_end,
                    status: DeadlineStatus::classify(earliness, deadline, now),
                })
            })
            .collect();
        entries.sort_by_key(|e| (e.deadline, e.task));

        Self {
            entries,
            calendar: calendar.clone(),
        }
    }

    pub fn entries(&self) -> &[DeadlineEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries on time or early.
    pub fn met_count(&self) -> usize {
        self.entries.iter().filter(|e| e.status.is_met()).count()
    }

    pub fn all_met(&self) -> bool {
        self.met_count() == self.entries.len()
    }
}

impl fmt::Display for DeadlineSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .entries
            .iter()
            .map(|e| e.description.chars().count())
            .max()
            .unwrap_or(0);
        for entry in &self.entries {
            writeln!(
                f,
                "{:<width$}  {}  {}",
                entry.description,
                entry.deadline,
                entry.status.describe(&self.calendar),
            )?;
        }
        Ok(())
    }
}
