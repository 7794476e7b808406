//! Plan construction.
//!
//! # Algorithm
//! 1. Interpret each record (estimates, measurements, instants).
//! 2. Build one forest per source with a lineage stack.
//! 3. Chain ordered siblings; inherit completion top-down.
//! 4. Resolve the dependency graph: link → lift → trickle → trim,
//!    validating timed lineages before lifting, acyclicity before
//!    trimming, and deadline monotonicity last.
//!
//! Every failure aborts construction; no partial plan is returned.

use std::collections::{BTreeSet, HashMap, VecDeque};

use tracing::{debug, info};

use super::source::{normalize_source, resolve_source, split_reference};
use super::Plan;
use crate::error::{PlanError, PlanResult};
use crate::models::{ancestors_in, Duration, Instant, Task, TaskId, TaskRecord, Timeline};
use crate::parse::{self, DateResolution};
use crate::validation;

/// Collects raw records and resolves them into a [`Plan`].
///
/// # Example
/// ```
/// use u_plan::models::{Calendar, EstimateSpec, TaskRecord, TimeUnit, Timeline};
/// use u_plan::plan::PlanBuilder;
///
/// let plan = PlanBuilder::new(Timeline::sample(Calendar::standard()))
///     .add_record(TaskRecord::new("work.plan.md", "setup").completed())
///     .add_record(
///         TaskRecord::new("work.plan.md", "build")
///             .with_estimate(EstimateSpec::work("4", TimeUnit::Hours))
///             .with_dependency("setup"),
///     )
///     .build()
///     .unwrap();
/// assert_eq!(plan.todo().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    timeline: Timeline,
    records: Vec<TaskRecord>,
}

impl PlanBuilder {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            timeline,
            records: Vec::new(),
        }
    }

    /// Appends one record; order within a source is document order.
    pub fn add_record(mut self, record: TaskRecord) -> Self {
        self.records.push(record);
        self
    }

    pub fn add_records(mut self, records: impl IntoIterator<Item = TaskRecord>) -> Self {
        self.records.extend(records);
        self
    }

    /// Resolves and validates the plan.
    ///
    /// # Errors
    /// - [`PlanError::Malformed`] for uninterpretable text
    /// - [`PlanError::Timing`] for a start or finish after now
    /// - [`PlanError::Reference`] for unresolvable dependencies
    /// - [`PlanError::Validation`] for structural violations
    pub fn build(self) -> PlanResult<Plan> {
        let Self { timeline, records } = self;

        let mut tasks = Vec::with_capacity(records.len());
        let mut references = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            let (task, refs) = interpret(TaskId(index), record, &timeline)?;
            tasks.push(task);
            references.push(refs);
        }
        debug!(tasks = tasks.len(), "interpreted records");

        build_forests(&mut tasks);
        link_ordered_siblings(&mut tasks);
        inherit_completion(&mut tasks);

        link(&mut tasks, &references)?;
        validation::check_timed_lineage(&tasks)?;
        lift(&mut tasks);
        trickle(&mut tasks);
        validation::detect_cycle(&tasks)?;
        trim(&mut tasks);
        validation::check_deadlines(&tasks)?;

        let plan = Plan::from_parts(tasks, timeline);
        info!(
            tasks = plan.len(),
            todo = plan.todo().len(),
            deadlines = plan.upcoming_deadlines().len(),
            "plan resolved"
        );
        Ok(plan)
    }
}

// ======================== Interpretation ========================

fn interpret(id: TaskId, record: TaskRecord, timeline: &Timeline) -> PlanResult<(Task, Vec<String>)> {
    let source = normalize_source(&record.source);
    let calendar = timeline.calendar();
    let malformed = |field: &'static str, text: &str, reason: String| PlanError::Malformed {
        source_id: source.clone(),
        task: record.description.clone(),
        field,
        text: text.to_string(),
        reason,
    };
    let instant = |field: &'static str, text: &str, resolution: DateResolution| {
        parse::parse_instant(text, resolution, timeline.today())
            .map(|s| timeline.resolve(s))
            .map_err(|e| malformed(field, text, e.to_string()))
    };
    // Durations must be placeable on the calendar from now.
    let placeable = |field: &'static str, text: &str, duration: Duration| {
        timeline
            .now()
            .checked_plus(duration.abs(), calendar)
            .map(|_| ())
            .map_err(|e| malformed(field, text, e.to_string()))
    };
    let past = |field: &'static str, at: Instant| {
        if at > timeline.now() {
            Err(PlanError::Timing {
                source_id: source.clone(),
                task: record.description.clone(),
                field,
            })
        } else {
            Ok(at)
        }
    };

    let mut task = Task::new(id, source.clone(), record.description.clone());
    task.level = record.level;
    task.ordered = record.ordered;
    task.completed = record.completed;

    if let Some(spec) = &record.estimate {
        let estimate = parse::parse_estimate(spec, calendar)
            .map_err(|e| malformed("estimate", &spec.value_or_range, e.to_string()))?;
        placeable("estimate", &spec.value_or_range, estimate.max.max(estimate.min.abs()))?;
        task = task.with_estimate(estimate);
    }
    for text in &record.measurements {
        let measured = parse::parse_measurement(text, calendar)
            .map_err(|e| malformed("measurement", text, e.to_string()))?;
        task.measurements.push(measured);
    }
    let measured_total: Duration = task.measurements.iter().copied().sum();
    placeable("measurement", &record.measurements.join(", "), measured_total)?;
    if let Some(text) = &record.start {
        task = task.with_start(past("start", instant("start", text, DateResolution::Before)?)?);
    }
    if let Some(text) = &record.finish {
        task = task.with_finish(past("finish", instant("finish", text, DateResolution::Before)?)?);
    }
    if let Some(text) = &record.deadline {
        task.deadline = Some(instant("deadline", text, DateResolution::Nearest)?);
    }

    Ok((task, record.dependency_refs))
}

// ======================== Forest ========================

/// Lineage-stack construction, one stack per source.
///
/// A new node pops every stack entry at its level or deeper, then
/// attaches to the remaining top, so level jumps attach to the nearest
/// shallower node.
fn build_forests(tasks: &mut [Task]) {
    let mut lineages: HashMap<String, Vec<(TaskId, f64)>> = HashMap::new();
    for index in 0..tasks.len() {
        let (id, level) = (tasks[index].id, tasks[index].level);
        let lineage = lineages.entry(tasks[index].source.clone()).or_default();
        while lineage.last().is_some_and(|&(_, l)| l >= level) {
            lineage.pop();
        }
        if let Some(&(parent, _)) = lineage.last() {
            tasks[index].parent = Some(parent);
            tasks[parent.0].children.push(id);
        }
        lineage.push((id, level));
    }
}

/// Sibling groups in document order: each task's children, plus the
/// roots of every source.
fn sibling_groups(tasks: &[Task]) -> Vec<Vec<TaskId>> {
    let mut roots: Vec<(String, Vec<TaskId>)> = Vec::new();
    for task in tasks.iter().filter(|t| t.parent.is_none()) {
        match roots.iter_mut().find(|(source, _)| *source == task.source) {
            Some((_, group)) => group.push(task.id),
            None => roots.push((task.source.clone(), vec![task.id])),
        }
    }
    roots
        .into_iter()
        .map(|(_, group)| group)
        .chain(tasks.iter().map(|t| t.children.clone()))
        .collect()
}

/// Each ordered sibling depends on the previous ordered sibling.
fn link_ordered_siblings(tasks: &mut [Task]) {
    for group in sibling_groups(tasks) {
        let mut previous: Option<TaskId> = None;
        for id in group {
            if !tasks[id.0].ordered {
                continue;
            }
            if let Some(prev) = previous {
                tasks[id.0].dependencies.insert(prev);
            }
            previous = Some(id);
        }
    }
}

/// Parents precede their children in the arena, so one forward pass
/// propagates completion down every lineage.
fn inherit_completion(tasks: &mut [Task]) {
    for index in 0..tasks.len() {
        if let Some(parent) = tasks[index].parent {
            if tasks[parent.0].is_completed() {
                tasks[index].completed = true;
            }
        }
    }
}

// ======================== Dependency pipeline ========================

/// Resolves textual references to exactly one task each.
fn link(tasks: &mut [Task], references: &[Vec<String>]) -> PlanResult<()> {
    let mut linked = 0usize;
    for (index, refs) in references.iter().enumerate() {
        for reference in refs {
            let target = resolve_reference(tasks, TaskId(index), reference)?;
            tasks[index].dependencies.insert(target);
            linked += 1;
        }
    }
    debug!(linked, "linked dependencies");
    Ok(())
}

fn resolve_reference(tasks: &[Task], from: TaskId, reference: &str) -> PlanResult<TaskId> {
    let task = &tasks[from.0];
    let error = |reason: String| PlanError::Reference {
        source_id: task.source.clone(),
        task: task.description.clone(),
        reference: reference.to_string(),
        reason,
    };
    let (source, fragment) =
        split_reference(reference).ok_or_else(|| error("more than one ':' separator".into()))?;
    let target = match source {
        Some(s) => resolve_source(&task.source, s),
        None => task.source.clone(),
    };

    let candidates: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.id != from && t.source == target)
        .filter(|t| match fragment {
            Some(f) => t.description.contains(f),
            None => t.parent.is_none(),
        })
        .collect();

    match candidates.as_slice() {
        [only] => Ok(only.id),
        [] => Err(error(format!("no matching task in {target}"))),
        many => Err(error(format!(
            "{} tasks match in {target}: {}",
            many.len(),
            many.iter().map(|t| t.description.as_str()).collect::<Vec<_>>().join(", ")
        ))),
    }
}

/// Redirects dependencies on untimed tasks to their timed ancestor.
///
/// Siblings and tasks in the same lineage keep their edge. Requires at
/// most one timed node per lineage.
fn lift(tasks: &mut [Task]) {
    let mut lifted = 0usize;
    for index in 0..tasks.len() {
        let id = TaskId(index);
        let own_ancestors = ancestors_in(tasks, id);
        let mut rewritten = BTreeSet::new();
        for &dep in &tasks[index].dependencies {
            let target = &tasks[dep.0];
            let sibling = target.parent == tasks[index].parent && target.source == tasks[index].source;
            let dep_ancestors = ancestors_in(tasks, dep);
            let same_lineage = own_ancestors.contains(&dep) || dep_ancestors.contains(&id);
            let timed = if sibling || same_lineage || target.is_timed() {
                None
            } else {
                dep_ancestors.into_iter().find(|a| tasks[a.0].is_timed())
            };
            match timed {
                Some(ancestor) => {
                    rewritten.insert(ancestor);
                    lifted += 1;
                }
                None => {
                    rewritten.insert(dep);
                }
            }
        }
        tasks[index].dependencies = rewritten;
    }
    debug!(lifted, "lifted dependencies");
}

/// Top-down, breadth-first: children inherit their parent's
/// dependencies, then the parent depends on each child.
fn trickle(tasks: &mut [Task]) {
    let mut queue: VecDeque<TaskId> = tasks
        .iter()
        .filter(|t| t.parent.is_none())
        .map(|t| t.id)
        .collect();
    while let Some(parent) = queue.pop_front() {
        let inherited = tasks[parent.0].dependencies.clone();
        let children = tasks[parent.0].children.clone();
        for &child in &children {
            tasks[child.0].dependencies.extend(inherited.iter().copied());
        }
        tasks[parent.0].dependencies.extend(children.iter().copied());
        queue.extend(children);
    }
    debug!("trickled dependencies");
}

/// Transitive reduction. Requires an acyclic graph.
fn trim(tasks: &mut [Task]) {
    let reach = reachability(tasks);
    let mut trimmed = 0usize;
    for task in tasks.iter_mut() {
        let implied: BTreeSet<TaskId> = task
            .dependencies
            .iter()
            .flat_map(|d| reach[d.0].iter().copied())
            .collect();
        let before = task.dependencies.len();
        task.dependencies.retain(|d| !implied.contains(d));
        trimmed += before - task.dependencies.len();
    }
    debug!(trimmed, "trimmed redundant dependencies");
}

/// Per task, every task reachable through its dependencies.
///
/// Post-order over an explicit stack: a task's set is built once all of
/// its dependencies have theirs.
fn reachability(tasks: &[Task]) -> Vec<BTreeSet<TaskId>> {
    let mut memo: Vec<Option<BTreeSet<TaskId>>> = vec![None; tasks.len()];
    let mut stack: Vec<(TaskId, bool)> = Vec::new();
    for task in tasks {
        stack.push((task.id, false));
        while let Some((node, expanded)) = stack.pop() {
            if memo[node.0].is_some() {
                continue;
            }
            let deps = &tasks[node.0].dependencies;
            if expanded {
                let mut reach = deps.clone();
                for dep in deps {
                    if let Some(below) = &memo[dep.0] {
                        reach.extend(below.iter().copied());
                    }
                }
                memo[node.0] = Some(reach);
            } else {
                stack.push((node, true));
                stack.extend(deps.iter().filter(|d| memo[d.0].is_none()).map(|&d| (d, false)));
            }
        }
    }
    memo.into_iter().map(Option::unwrap_or_default).collect()
}
