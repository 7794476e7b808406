//! Raw task records.
//!
//! A record is one already-tokenized plan line: the text fields are
//! delimited but not yet interpreted. Interpretation (ranges, scales,
//! dates) happens when the plan is built.

use serde::{Deserialize, Serialize};

use super::TimeUnit;

/// Unparsed estimate: `{2-4h}` arrives as `value_or_range = "2-4"`,
/// `scale = Hours`; `{wait 3d}` additionally sets `is_wait`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateSpec {
    pub is_wait: bool,
    pub value_or_range: String,
    pub scale: TimeUnit,
}

impl EstimateSpec {
    /// Work estimate occupying the worker.
    pub fn work(value_or_range: impl Into<String>, scale: TimeUnit) -> Self {
        Self {
            is_wait: false,
            value_or_range: value_or_range.into(),
            scale,
        }
    }

    /// Wait estimate that elapses in parallel with other work.
    pub fn wait(value_or_range: impl Into<String>, scale: TimeUnit) -> Self {
        Self {
            is_wait: true,
            value_or_range: value_or_range.into(),
            scale,
        }
    }
}

/// One tokenized task line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub description: String,
    /// Source identity (a plan file path or a synthetic id).
    pub source: String,
    /// Nesting value. Not necessarily contiguous; headers use negative values.
    pub level: f64,
    /// Numbered list item; chains after the previous ordered sibling.
    #[serde(default)]
    pub ordered: bool,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub dependency_refs: Vec<String>,
    #[serde(default)]
    pub estimate: Option<EstimateSpec>,
    /// Quantities (`"2h"`) or clock intervals (`"9-1030"`).
    #[serde(default)]
    pub measurements: Vec<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub finish: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
}

impl TaskRecord {
    /// Creates a top-level record.
    pub fn new(source: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            source: source.into(),
            level: 0.0,
            ordered: false,
            completed: false,
            dependency_refs: Vec::new(),
            estimate: None,
            measurements: Vec::new(),
            start: None,
            finish: None,
            deadline: None,
        }
    }

    pub fn with_level(mut self, level: f64) -> Self {
        self.level = level;
        self
    }

    pub fn ordered(mut self) -> Self {
        self.ordered = true;
        self
    }

    pub fn completed(mut self) -> Self {
        self.completed = true;
        self
    }

    /// Adds a dependency reference (`"fragment"`, `"file:fragment"` or `"dir/file"`).
    pub fn with_dependency(mut self, reference: impl Into<String>) -> Self {
        self.dependency_refs.push(reference.into());
        self
    }

    pub fn with_estimate(mut self, estimate: EstimateSpec) -> Self {
        self.estimate = Some(estimate);
        self
    }

    pub fn with_measurement(mut self, measurement: impl Into<String>) -> Self {
        self.measurements.push(measurement.into());
        self
    }

    pub fn with_start(mut self, start: impl Into<String>) -> Self {
        self.start = Some(start.into());
        self
    }

    pub fn with_finish(mut self, finish: impl Into<String>) -> Self {
        self.finish = Some(finish.into());
        self
    }

    pub fn with_deadline(mut self, deadline: impl Into<String>) -> Self {
        self.deadline = Some(deadline.into());
        self
    }
}
