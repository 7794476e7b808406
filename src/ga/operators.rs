//! Configurable genetic operators for task orderings.
//!
//! Provides runtime-selectable crossover and mutation strategies
//! via [`GeneticOperators`].
//!
//! # Usage
//!
//! ```
//! use u_plan::ga::operators::{GeneticOperators, CrossoverType, MutationType};
//!
//! let ops = GeneticOperators::default();
//! assert_eq!(ops.crossover_type, CrossoverType::Half);
//! assert_eq!(ops.mutation_type, MutationType::Shift);
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::chromosome::{
    adjacent_mutation, crossover_half, crossover_random, probability, reinsert_mutation,
    shift_mutation,
};
use crate::models::TaskId;

/// Crossover strategy for orderings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrossoverType {
    /// Contiguous half of one parent, rest in the other's order.
    #[default]
    Half,
    /// Scattered half of one parent's positions.
    Random,
}

/// Mutation strategy for orderings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationType {
    /// Swap neighbours with a per-element probability.
    Adjacent,
    /// Pull out and reinsert with a per-element probability.
    Reinsert,
    /// Move one random segment.
    #[default]
    Shift,
    /// Split the budget evenly across the three above.
    All,
}

/// Runtime-selectable genetic operators.
///
/// # Example
///
/// ```
/// use u_plan::ga::operators::{GeneticOperators, CrossoverType, MutationType};
///
/// let ops = GeneticOperators::new(CrossoverType::Random, MutationType::All, 0.1);
/// assert_eq!(ops.mutation_rate(), 0.1);
///
/// // Rates are probabilities.
/// let ops = ops.with_mutation_rate(4.0);
/// assert_eq!(ops.mutation_rate(), 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct GeneticOperators {
    pub crossover_type: CrossoverType,
    pub mutation_type: MutationType,
    /// Per-element probability for adjacent and reinsert mutation, in [0, 1].
    mutation_rate: f64,
}

impl Default for GeneticOperators {
    fn default() -> Self {
        Self {
            crossover_type: CrossoverType::Half,
            mutation_type: MutationType::Shift,
            mutation_rate: 0.05,
        }
    }
}

impl GeneticOperators {
    pub fn new(crossover_type: CrossoverType, mutation_type: MutationType, mutation_rate: f64) -> Self {
        Self {
            crossover_type,
            mutation_type,
            mutation_rate: 0.0,
        }
        .with_mutation_rate(mutation_rate)
    }

    /// Sets the per-element mutation probability, clamped to [0, 1].
    /// NaN disables per-element mutation.
    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = probability(rate);
        self
    }

    pub fn mutation_rate(&self) -> f64 {
        self.mutation_rate
    }

    /// Performs crossover using the configured strategy.
    pub fn crossover<R: Rng>(&self, p1: &[TaskId], p2: &[TaskId], rng: &mut R) -> Vec<TaskId> {
        match self.crossover_type {
            CrossoverType::Half => crossover_half(p1, p2, rng),
            CrossoverType::Random => crossover_random(p1, p2, rng),
        }
    }

    /// Produces `count` mutants of `order`.
    ///
    /// [`MutationType::All`] gives each strategy `count / 3` mutants, the
    /// remainder going to the first strategies in declaration order.
    pub fn mutate<R: Rng>(&self, order: &[TaskId], count: usize, rng: &mut R) -> Vec<Vec<TaskId>> {
        match self.mutation_type {
            MutationType::All => {
                let kinds = [MutationType::Adjacent, MutationType::Reinsert, MutationType::Shift];
                let mut mutants = Vec::with_capacity(count);
                for (i, kind) in kinds.into_iter().enumerate() {
                    let share = count / kinds.len() + usize::from(i < count % kinds.len());
                    mutants.extend((0..share).map(|_| self.mutate_once(kind, order, rng)));
                }
                mutants
            }
            kind => (0..count).map(|_| self.mutate_once(kind, order, rng)).collect(),
        }
    }

    fn mutate_once<R: Rng>(&self, kind: MutationType, order: &[TaskId], rng: &mut R) -> Vec<TaskId> {
        match kind {
            MutationType::Adjacent => adjacent_mutation(order, self.mutation_rate, rng),
            MutationType::Reinsert => reinsert_mutation(order, self.mutation_rate, rng),
            MutationType::Shift | MutationType::All => shift_mutation(order, rng),
        }
    }
}
