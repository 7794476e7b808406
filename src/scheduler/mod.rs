//! Schedule search and deadline reporting.
//!
//! [`Scheduler`] seeds a population with a greedy deadline-driven
//! order and refines it with the genetic runner until the best fitness
//! stops changing.
//!
//! # Algorithm
//!
//! 1. Validate the search parameters.
//! 2. Build the greedy seed ([`greedy_schedule`]); an empty todo set
//!    returns the empty schedule without searching.
//! 3. Run [`GaRunner`] over [`PlanningGaProblem`] seeded with it.
//!
//! # Reporting
//!
//! [`DeadlineSummary`] classifies each upcoming deadline as on time,
//! early, late, or missed under a given schedule.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 14
//! - Whitley (1989), "The GENITOR Algorithm"

mod greedy;
mod summary;

pub use greedy::greedy_schedule;
pub use summary::{DeadlineEntry, DeadlineStatus, DeadlineSummary};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::error::{PlanError, PlanResult};
use crate::ga::{GaConfig, GaRunner, PlanningGaProblem};
use crate::models::{Fitness, Schedule};
use crate::plan::Plan;

/// Result of a search.
#[derive(Debug, Clone)]
pub struct ScheduleOutcome {
    pub best: Schedule,
    pub fitness: Fitness,
    pub generations: usize,
    /// Best fitness after each generation.
    pub history: Vec<Fitness>,
    /// False when the generation ceiling stopped the run.
    pub converged: bool,
}

/// Finds a good ordering of a plan's todo tasks.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use u_plan::ga::GaConfig;
/// use u_plan::models::{Calendar, EstimateSpec, TaskRecord, TimeUnit, Timeline};
/// use u_plan::plan::Plan;
/// use u_plan::scheduler::Scheduler;
///
/// let now = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
/// let plan = Plan::builder(Timeline::new(Calendar::standard(), now))
///     .add_record(TaskRecord::new("a.plan.md", "write").with_estimate(EstimateSpec::work("2", TimeUnit::Hours)))
///     .add_record(TaskRecord::new("a.plan.md", "review").with_dependency("write"))
///     .build()
///     .unwrap();
///
/// let scheduler = Scheduler::new().with_config(GaConfig::default().with_seed(7));
/// let outcome = scheduler.schedule(&plan).unwrap();
/// assert!(outcome.best.is_chronological(&plan));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    config: GaConfig,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: GaConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &GaConfig {
        &self.config
    }

    /// Searches with `config.seed`, or an OS-seeded RNG when unset.
    ///
    /// # Errors
    /// - [`PlanError::Config`] for invalid search parameters
    /// - [`PlanError::Infeasible`] when no dependency-respecting order exists
    pub fn schedule(&self, plan: &Plan) -> PlanResult<ScheduleOutcome> {
        let mut rng = match self.config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        self.schedule_with_rng(plan, &mut rng)
    }

    pub fn schedule_with_rng<R: Rng>(&self, plan: &Plan, rng: &mut R) -> PlanResult<ScheduleOutcome> {
        self.config.validate()?;
        let seed = greedy_schedule(plan)?;
        if seed.is_empty() {
            info!("nothing left to schedule");
            let fitness = seed.fitness(plan);
            return Ok(ScheduleOutcome {
                best: seed,
                history: vec![fitness.clone()],
                fitness,
                generations: 0,
                converged: true,
            });
        }

        info!(
            tasks = seed.len(),
            population = self.config.population_size,
            "searching for schedule"
        );
        let problem = PlanningGaProblem::new(plan, seed).with_config(&self.config);
        let result = GaRunner::run_with_rng(&problem, &self.config, rng).ok_or_else(|| {
            PlanError::Config("search produced an empty population".to_string())
        })?;

        Ok(ScheduleOutcome {
            best: result.best.schedule,
            fitness: result.best_fitness,
            generations: result.generations,
            history: result.history,
            converged: result.converged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Calendar, EstimateSpec, TaskRecord, TimeUnit, Timeline};
    use chrono::NaiveDate;

    const SRC: &str = "s.plan.md";

    fn timeline() -> Timeline {
        let now = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        Timeline::new(Calendar::standard(), now)
    }

    fn rec(description: &str, hours: &str) -> TaskRecord {
        TaskRecord::new(SRC, description).with_estimate(EstimateSpec::work(hours, TimeUnit::Hours))
    }

    fn config() -> GaConfig {
        GaConfig::default()
            .with_population_size(40)
            .with_generation_size(20)
            .with_seed(42)
    }

    /// Two independent chains; the second carries the tighter deadline.
    fn two_chains() -> Plan {
        Plan::builder(timeline())
            .add_records([
                rec("draft", "3"),
                rec("edit", "2").with_dependency("draft").with_deadline("2024-01-05"),
                rec("order parts", "1"),
                rec("assemble", "2").with_dependency("order parts"),
                rec("ship", "1").with_dependency("assemble").with_deadline("2024-01-01 at 13"),
            ])
            .build()
            .unwrap()
    }

    #[test]
    fn test_schedule_two_chains() {
        let plan = two_chains();
        let outcome = Scheduler::new().with_config(config()).schedule(&plan).unwrap();

        assert!(outcome.best.covers(&plan));
        assert!(outcome.best.is_chronological(&plan));
        assert!(outcome.converged);
        assert!(outcome.fitness.worst_earliness().is_some_and(|e| e >= 0.0));
        assert!(outcome.best.summary(&plan).all_met());
    }

    #[test]
    fn test_history_is_monotonic() {
        let plan = two_chains();
        let outcome = Scheduler::new().with_config(config()).schedule(&plan).unwrap();
        assert!(outcome.history.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(outcome.history.len(), outcome.generations);
        assert_eq!(outcome.history.last(), Some(&outcome.fitness));
    }

    #[test]
    fn test_seeded_runs_agree() {
        let plan = two_chains();
        let scheduler = Scheduler::new().with_config(config());
        let a = scheduler.schedule(&plan).unwrap();
        let b = scheduler.schedule(&plan).unwrap();
        assert_eq!(a.best, b.best);
        assert_eq!(a.generations, b.generations);
    }

    #[test]
    fn test_empty_todo_short_circuits() {
        let plan = Plan::builder(timeline())
            .add_record(rec("done", "1").completed())
            .build()
            .unwrap();
        let outcome = Scheduler::new().schedule(&plan).unwrap();
        assert!(outcome.best.is_empty());
        assert_eq!(outcome.generations, 0);
        assert!(outcome.fitness.is_feasible());
    }

    #[test]
    fn test_work_past_calendar_end_saturates() {
        // Each estimate fits on the calendar; the chain's total does not.
        let plan = Plan::builder(timeline())
            .add_records([
                rec("a", "2e8"),
                rec("b", "2e8").with_dependency("a"),
                rec("c", "2e8").with_dependency("b").with_deadline("2024-01-05"),
            ])
            .build()
            .unwrap();
        let outcome = Scheduler::new().with_config(config()).schedule(&plan).unwrap();
        assert!(outcome.best.is_chronological(&plan));

        let summary = outcome.best.summary(&plan);
        assert_eq!(summary.len(), 1);
        assert!(matches!(summary.entries()[0].status, DeadlineStatus::Late(_)));
    }

    #[test]
    fn test_unschedulable_estimate_fails_early() {
        let built = Plan::builder(timeline()).add_record(rec("a", "1e20")).build();
        assert!(matches!(built, Err(PlanError::Malformed { field: "estimate", .. })));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let plan = two_chains();
        let scheduler = Scheduler::new().with_config(GaConfig::default().with_population_size(0));
        assert!(matches!(scheduler.schedule(&plan), Err(PlanError::Config(_))));
    }
}
