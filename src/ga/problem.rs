//! Planning GA problem definition.
//!
//! Implements [`GaProblem`] for task orderings. Bridges a resolved
//! [`Plan`] to the generic runner: evaluation is [`Schedule::fitness`],
//! variation goes through [`GeneticOperators`].

use rand::Rng;

use super::chromosome::ScheduleChromosome;
use super::operators::GeneticOperators;
use super::runner::{GaConfig, GaProblem};
use crate::models::{Fitness, Schedule};
use crate::plan::Plan;

/// GA problem over orderings of a plan's todo tasks.
///
/// # Example
/// ```no_run
/// use u_plan::ga::{GaConfig, GaRunner, PlanningGaProblem};
/// use u_plan::models::{Calendar, Schedule, Timeline};
/// use u_plan::plan::Plan;
///
/// let plan = Plan::builder(Timeline::sample(Calendar::standard())).build().unwrap();
/// let problem = PlanningGaProblem::new(&plan, Schedule::default());
/// let result = GaRunner::run(&problem, &GaConfig::default());
/// ```
pub struct PlanningGaProblem<'a> {
    plan: &'a Plan,
    /// Feasible starting order.
    seed: Schedule,
    operators: GeneticOperators,
}

impl<'a> PlanningGaProblem<'a> {
    pub fn new(plan: &'a Plan, seed: Schedule) -> Self {
        Self {
            plan,
            seed,
            operators: GeneticOperators::default(),
        }
    }

    /// Takes operator choices and mutation rate from `config`.
    pub fn with_config(mut self, config: &GaConfig) -> Self {
        self.operators = GeneticOperators::new(config.crossover, config.mutation, config.mutation_rate);
        self
    }

    pub fn with_operators(mut self, operators: GeneticOperators) -> Self {
        self.operators = operators;
        self
    }

    pub fn plan(&self) -> &Plan {
        self.plan
    }
}

impl GaProblem for PlanningGaProblem<'_> {
    type Individual = ScheduleChromosome;

    /// The seed plus `size - 1` mutants of it.
    fn initial_population<R: Rng>(&self, size: usize, rng: &mut R) -> Vec<ScheduleChromosome> {
        let seed = ScheduleChromosome::new(self.seed.order().to_vec());
        let mutants = self
            .operators
            .mutate(self.seed.order(), size.saturating_sub(1), rng)
            .into_iter()
            .map(ScheduleChromosome::new);
        std::iter::once(seed).chain(mutants).collect()
    }

    fn evaluate(&self, individual: &ScheduleChromosome) -> Fitness {
        individual.schedule.fitness(self.plan)
    }

    fn crossover<R: Rng>(
        &self,
        parent1: &ScheduleChromosome,
        parent2: &ScheduleChromosome,
        rng: &mut R,
    ) -> ScheduleChromosome {
        ScheduleChromosome::new(self.operators.crossover(parent1.order(), parent2.order(), rng))
    }

    fn mutate<R: Rng>(
        &self,
        individual: &ScheduleChromosome,
        count: usize,
        rng: &mut R,
    ) -> Vec<ScheduleChromosome> {
        self.operators
            .mutate(individual.order(), count, rng)
            .into_iter()
            .map(ScheduleChromosome::new)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ga::operators::MutationType;
    use crate::ga::runner::{GaRunner, Individual};
    use crate::models::{Calendar, EstimateSpec, TaskRecord, TimeUnit, Timeline};
    use chrono::NaiveDate;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn make_test_plan() -> Plan {
        let now = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let rec = |d: &str, h: &str| {
            TaskRecord::new("t.plan.md", d).with_estimate(EstimateSpec::work(h, TimeUnit::Hours))
        };
        Plan::builder(Timeline::new(Calendar::standard(), now))
            .add_records([
                rec("a1", "2"),
                rec("a2", "3").with_dependency("a1"),
                rec("b1", "1"),
                rec("b2", "2").with_dependency("b1").with_deadline("2024-01-01 at 12"),
            ])
            .build()
            .unwrap()
    }

    fn seed_of(plan: &Plan) -> Schedule {
        Schedule::new(["a1", "a2", "b1", "b2"].iter().map(|n| plan.find(n)[0]).collect())
    }

    #[test]
    fn test_initial_population_starts_with_seed() {
        let plan = make_test_plan();
        let seed = seed_of(&plan);
        let problem = PlanningGaProblem::new(&plan, seed.clone());
        let mut rng = SmallRng::seed_from_u64(42);

        let population = problem.initial_population(20, &mut rng);
        assert_eq!(population.len(), 20);
        assert_eq!(population[0].schedule, seed);
        assert!(population.iter().all(|c| c.schedule.covers(&plan)));
    }

    #[test]
    fn test_evaluate_penalizes_late_deadline() {
        let plan = make_test_plan();
        let problem = PlanningGaProblem::new(&plan, seed_of(&plan));

        let late = problem.evaluate(&ScheduleChromosome::new(seed_of(&plan).into_order()));
        let early_order = ["b1", "b2", "a1", "a2"].iter().map(|n| plan.find(n)[0]).collect();
        let early = problem.evaluate(&ScheduleChromosome::new(early_order));

        assert!(late.is_feasible());
        assert!(early > late);
        assert_eq!(early.worst_earliness(), Some(0.0));
    }

    #[test]
    fn test_crossover_and_mutation() {
        let plan = make_test_plan();
        let problem = PlanningGaProblem::new(&plan, seed_of(&plan))
            .with_config(&GaConfig::default().with_mutation(MutationType::All));
        let mut rng = SmallRng::seed_from_u64(42);

        let population = problem.initial_population(2, &mut rng);
        let child = problem.crossover(&population[0], &population[1], &mut rng);
        assert!(child.schedule.covers(&plan));

        let mutants = problem.mutate(&child, 7, &mut rng);
        assert_eq!(mutants.len(), 7);
        assert!(mutants.iter().all(|m| m.schedule.covers(&plan)));
    }

    #[test]
    fn test_ga_runner_integration() {
        let plan = make_test_plan();
        let problem = PlanningGaProblem::new(&plan, seed_of(&plan));
        let config = GaConfig::default()
            .with_population_size(30)
            .with_generation_size(10)
            .with_seed(42);

        let result = GaRunner::run(&problem, &config).unwrap();
        assert!(result.best.schedule.is_chronological(&plan));
        assert_eq!(result.best.fitness().worst_earliness(), Some(0.0));
        assert!(result.generations >= config.stability_window);
    }
}
