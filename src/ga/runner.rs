//! Generic steady-state genetic search.
//!
//! # Algorithm
//! 1. Build and evaluate the initial population.
//! 2. Each generation: sort by fitness (best first), keep the best-ever
//!    individual (replaced only by an equal or better leader), cross it
//!    with the runner-up, mutate the child into a sub-population, and
//!    splice that into the worst tail.
//! 3. Stop once the best-ever fitness has been stable (within tolerance)
//!    for a trailing window of generations, or at the generation ceiling.
//!
//! Evaluation is sequential; fitness is a pure function of the
//! individual, so the outcome does not depend on evaluation order.

use std::fmt::Debug;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::operators::{CrossoverType, MutationType};
use crate::error::{PlanError, PlanResult};

/// A comparable fitness value; larger is better.
pub trait FitnessValue: Clone + Ord + Debug {
    /// Equality up to `tolerance` in the continuous components.
    fn approx_eq(&self, other: &Self, tolerance: f64) -> bool;
}

/// A member of the population carrying its evaluated fitness.
pub trait Individual: Clone {
    type Fitness: FitnessValue;

    fn fitness(&self) -> &Self::Fitness;

    fn set_fitness(&mut self, fitness: Self::Fitness);
}

/// Problem-specific encoding and operators.
pub trait GaProblem {
    type Individual: Individual;

    /// Initial population of `size` individuals; never empty.
    fn initial_population<R: Rng>(&self, size: usize, rng: &mut R) -> Vec<Self::Individual>;

    fn evaluate(&self, individual: &Self::Individual) -> <Self::Individual as Individual>::Fitness;

    /// One child from two parents.
    fn crossover<R: Rng>(
        &self,
        parent1: &Self::Individual,
        parent2: &Self::Individual,
        rng: &mut R,
    ) -> Self::Individual;

    /// `count` mutants of one individual.
    fn mutate<R: Rng>(
        &self,
        individual: &Self::Individual,
        count: usize,
        rng: &mut R,
    ) -> Vec<Self::Individual>;
}

/// Search parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaConfig {
    /// Individuals kept per generation.
    pub population_size: usize,
    /// Mutants produced from each generation's child.
    pub generation_size: usize,
    /// Per-element probability for adjacent and reinsert mutation.
    pub mutation_rate: f64,
    /// Generations the best fitness must stay unchanged to stop.
    pub stability_window: usize,
    /// Hard ceiling on generations.
    pub max_generations: usize,
    /// Earliness tolerance (hours) when comparing fitness across generations.
    pub tolerance: f64,
    pub mutation: MutationType,
    pub crossover: CrossoverType,
    /// Fixed RNG seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 200,
            generation_size: 100,
            mutation_rate: 0.05,
            stability_window: 10,
            max_generations: 10_000,
            tolerance: 1e-9,
            mutation: MutationType::Shift,
            crossover: CrossoverType::Half,
            seed: None,
        }
    }
}

impl GaConfig {
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    pub fn with_generation_size(mut self, size: usize) -> Self {
        self.generation_size = size;
        self
    }

    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate;
        self
    }

    pub fn with_stability_window(mut self, window: usize) -> Self {
        self.stability_window = window;
        self
    }

    pub fn with_max_generations(mut self, generations: usize) -> Self {
        self.max_generations = generations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_mutation(mut self, mutation: MutationType) -> Self {
        self.mutation = mutation;
        self
    }

    pub fn with_crossover(mut self, crossover: CrossoverType) -> Self {
        self.crossover = crossover;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// # Errors
    /// [`PlanError::Config`] for empty sizes, a zero window or ceiling,
    /// a rate outside [0, 1], or a negative tolerance.
    pub fn validate(&self) -> PlanResult<()> {
        let fail = |msg: &str| Err(PlanError::Config(msg.to_string()));
        if self.population_size == 0 {
            return fail("population_size must be positive");
        }
        if self.generation_size == 0 {
            return fail("generation_size must be positive");
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return fail("mutation_rate must lie in [0, 1]");
        }
        if self.stability_window == 0 {
            return fail("stability_window must be positive");
        }
        if self.max_generations == 0 {
            return fail("max_generations must be positive");
        }
        if self.tolerance.is_nan() || self.tolerance < 0.0 {
            return fail("tolerance must be non-negative");
        }
        Ok(())
    }
}

/// Outcome of a run.
#[derive(Debug, Clone)]
pub struct GaResult<I: Individual> {
    pub best: I,
    pub best_fitness: I::Fitness,
    pub generations: usize,
    /// Best-ever fitness after each generation; never decreasing.
    pub history: Vec<I::Fitness>,
    /// False when the generation ceiling stopped the run.
    pub converged: bool,
}

/// Drives a [`GaProblem`] to a stable best individual.
pub struct GaRunner;

impl GaRunner {
    /// Runs with `config.seed`, or an OS-seeded RNG when unset.
    ///
    /// Returns `None` only if the problem yields an empty population.
    pub fn run<P: GaProblem>(problem: &P, config: &GaConfig) -> Option<GaResult<P::Individual>> {
        let mut rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        Self::run_with_rng(problem, config, &mut rng)
    }

    pub fn run_with_rng<P: GaProblem, R: Rng>(
        problem: &P,
        config: &GaConfig,
        rng: &mut R,
    ) -> Option<GaResult<P::Individual>> {
        let mut population = problem.initial_population(config.population_size, rng);
        for individual in population.iter_mut() {
            let fitness = problem.evaluate(individual);
            individual.set_fitness(fitness);
        }

        let mut best: Option<P::Individual> = None;
        let mut history: Vec<<P::Individual as Individual>::Fitness> = Vec::new();
        let mut converged = false;

        loop {
            population.sort_by(|a, b| b.fitness().cmp(a.fitness()));
            let leader = population.first()?;

            let leader_is_best = best
                .as_ref()
                .map_or(true, |current| leader.fitness() >= current.fitness());
            if leader_is_best {
                best = Some(leader.clone());
            }
            let champion = best.as_ref()?;
            history.push(champion.fitness().clone());
            debug!(
                generation = history.len(),
                best = ?champion.fitness(),
                "generation complete"
            );

            if is_stable(&history, config.stability_window, config.tolerance) {
                converged = true;
                break;
            }
            if history.len() >= config.max_generations {
                break;
            }

            let partner = if leader_is_best {
                population.get(1).unwrap_or(leader)
            } else {
                leader
            };
            let child = problem.crossover(champion, partner, rng);
            let mut children = problem.mutate(&child, config.generation_size, rng);
            for individual in children.iter_mut() {
                let fitness = problem.evaluate(individual);
                individual.set_fitness(fitness);
            }

            let spliced = children.len().min(population.len());
            population.truncate(population.len() - spliced);
            population.extend(children.into_iter().take(spliced));
        }

        let best = best?;
        if converged {
            info!(generations = history.len(), fitness = ?best.fitness(), "search converged");
        } else {
            warn!(
                generations = history.len(),
                fitness = ?best.fitness(),
                "search stopped at generation ceiling before converging"
            );
        }
        Some(GaResult {
            best_fitness: best.fitness().clone(),
            best,
            generations: history.len(),
            history,
            converged,
        })
    }
}

/// The last `window` entries all match their predecessor.
fn is_stable<F: FitnessValue>(history: &[F], window: usize, tolerance: f64) -> bool {
    if history.len() < window {
        return false;
    }
    history[history.len() - window..]
        .windows(2)
        .all(|pair| pair[0].approx_eq(&pair[1], tolerance))
}
