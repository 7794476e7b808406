//! Permutation chromosome for task orderings.
//!
//! # Encoding
//!
//! The chromosome is the schedule itself: a permutation of the plan's
//! todo task IDs. Every operator preserves the permutation property
//! (same length, same elements); dependency feasibility is left to the
//! fitness function.
//!
//! # Reference
//! Davis (1985), "Applying Adaptive Algorithms to Epistatic Domains" (order crossover)

use std::collections::HashSet;

use rand::seq::index;
use rand::Rng;

use super::runner::{FitnessValue, Individual};
use crate::models::{Fitness, Schedule, TaskId};

/// A candidate schedule with its evaluated fitness.
#[derive(Debug, Clone)]
pub struct ScheduleChromosome {
    pub schedule: Schedule,
    /// Fitness value (higher = better).
    pub fitness: Fitness,
}

impl ScheduleChromosome {
    /// Wraps an unevaluated order.
    pub fn new(order: Vec<TaskId>) -> Self {
        Self {
            schedule: Schedule::new(order),
            fitness: Fitness::Infeasible,
        }
    }

    pub fn order(&self) -> &[TaskId] {
        self.schedule.order()
    }
}

impl FitnessValue for Fitness {
    fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        Fitness::approx_eq(self, other, tolerance)
    }
}

impl Individual for ScheduleChromosome {
    type Fitness = Fitness;

    fn fitness(&self) -> &Fitness {
        &self.fitness
    }

    fn set_fitness(&mut self, fitness: Fitness) {
        self.fitness = fitness;
    }
}

// ======================== Crossover ========================

/// Half-segment crossover.
///
/// Parent roles are drawn at random. A contiguous slice of half the
/// first parent's length is kept in place; the remaining positions are
/// filled with the other elements in the second parent's relative order.
pub fn crossover_half<R: Rng>(order1: &[TaskId], order2: &[TaskId], rng: &mut R) -> Vec<TaskId> {
    let (first, second) = if rng.random_bool(0.5) {
        (order1, order2)
    } else {
        (order2, order1)
    };
    let half = first.len() / 2;
    let start = rng.random_range(0..=first.len() - half);
    let kept = &first[start..start + half];
    let kept_set: HashSet<TaskId> = kept.iter().copied().collect();
    let rest: Vec<TaskId> = second.iter().copied().filter(|t| !kept_set.contains(t)).collect();

    let mut child = Vec::with_capacity(first.len());
    child.extend_from_slice(&rest[..start]);
    child.extend_from_slice(kept);
    child.extend_from_slice(&rest[start..]);
    child
}

/// Scattered crossover: a random half of the positions keep the first
/// parent's element; the others take the remaining elements in the
/// second parent's order.
pub fn crossover_random<R: Rng>(order1: &[TaskId], order2: &[TaskId], rng: &mut R) -> Vec<TaskId> {
    let len = order1.len();
    let positions: HashSet<usize> = index::sample(rng, len, len / 2).into_iter().collect();
    let chosen: HashSet<TaskId> = positions.iter().map(|&i| order1[i]).collect();
    let mut rest = order2.iter().copied().filter(|t| !chosen.contains(t));

    (0..len)
        .filter_map(|i| {
            if positions.contains(&i) {
                Some(order1[i])
            } else {
                rest.next()
            }
        })
        .collect()
}

// ======================== Mutation ========================

/// One left-to-right pass; each element is swapped past its successor
/// with probability `rate`. A swapped element keeps moving right while
/// the coin keeps landing.
pub fn adjacent_mutation<R: Rng>(order: &[TaskId], rate: f64, rng: &mut R) -> Vec<TaskId> {
    let rate = probability(rate);
    let Some((&head, tail)) = order.split_first() else {
        return Vec::new();
    };
    let mut mutated = Vec::with_capacity(order.len());
    let mut carried = head;
    for &next in tail {
        if rng.random_bool(rate) {
            mutated.push(next);
        } else {
            mutated.push(carried);
            carried = next;
        }
    }
    mutated.push(carried);
    mutated
}

/// Each element, with probability `rate`, is pulled out and reinserted
/// at a uniformly random position.
pub fn reinsert_mutation<R: Rng>(order: &[TaskId], rate: f64, rng: &mut R) -> Vec<TaskId> {
    let rate = probability(rate);
    let picked: Vec<TaskId> = order.iter().copied().filter(|_| rng.random_bool(rate)).collect();
    let mut mutated = order.to_vec();
    for task in picked {
        if let Some(pos) = mutated.iter().position(|&t| t == task) {
            mutated.remove(pos);
        }
        let at = rng.random_range(0..=mutated.len());
        mutated.insert(at, task);
    }
    mutated
}

/// `rate` as a valid probability; NaN counts as zero.
pub(crate) fn probability(rate: f64) -> f64 {
    if rate.is_nan() {
        0.0
    } else {
        rate.clamp(0.0, 1.0)
    }
}

/// Excises one random contiguous segment and reinserts it at a uniformly
/// random position of the remainder.
pub fn shift_mutation<R: Rng>(order: &[TaskId], rng: &mut R) -> Vec<TaskId> {
    if order.is_empty() {
        return Vec::new();
    }
    let a = rng.random_range(0..order.len());
    let b = rng.random_range(0..order.len());
    let (lo, hi) = (a.min(b), a.max(b));
    let segment = &order[lo..=hi];
    let remainder: Vec<TaskId> = order[..lo].iter().chain(&order[hi + 1..]).copied().collect();
    let at = rng.random_range(0..=remainder.len());

    let mut mutated = Vec::with_capacity(order.len());
    mutated.extend_from_slice(&remainder[..at]);
    mutated.extend_from_slice(segment);
    mutated.extend_from_slice(&remainder[at..]);
    mutated
}
