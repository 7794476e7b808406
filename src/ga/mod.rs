//! GA-based schedule optimization.
//!
//! A generic steady-state runner ([`GaRunner`]) plus the planning
//! encoding that drives it.
//!
//! # Encoding
//!
//! A chromosome is a permutation of the plan's todo task IDs. Operators
//! keep the permutation property; dependency violations are scored as
//! infeasible rather than repaired.
//!
//! # Submodules
//!
//! - [`operators`]: Runtime-selectable crossover and mutation strategies
//!
//! # Reference
//! - Goldberg (1989), "Genetic Algorithms in Search, Optimization and Machine Learning"
//! - Whitley (1989), "The GENITOR Algorithm" (steady-state replacement)

mod chromosome;
pub mod operators;
mod problem;
mod runner;

pub use chromosome::{
    ScheduleChromosome, adjacent_mutation, crossover_half, crossover_random, reinsert_mutation,
    shift_mutation,
};
pub use problem::PlanningGaProblem;
pub use runner::{FitnessValue, GaConfig, GaProblem, GaResult, GaRunner, Individual};
