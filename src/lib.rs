//! Deadline-aware planning over a business calendar.
//!
//! Turns hierarchical task records (estimates, dependencies, deadlines)
//! into a validated dependency graph and searches for the work order
//! that best meets upcoming deadlines while limiting context switches.
//!
//! # Modules
//!
//! - **`models`**: Time model (`Calendar`, `Instant`, `Duration`), `TaskRecord`,
//!   resolved `Task`, candidate `Schedule` and its `Fitness`
//! - **`parse`**: Interpretation of estimate, measurement, clock and date text
//! - **`plan`**: `PlanBuilder` and the resolved, immutable `Plan`
//! - **`validation`**: Structural checks (cycles, timed lineage, deadline order)
//! - **`ga`**: Generic steady-state GA runner and the ordering encoding
//! - **`scheduler`**: Greedy seed, `Scheduler` search, deadline summary
//! - **`config`**: Serde-backed `PlannerConfig`
//! - **`error`**: `PlanError` taxonomy
//!
//! # Pipeline
//!
//! ```text
//! TaskRecord ──PlanBuilder──▶ Plan ──Scheduler──▶ Schedule ──▶ DeadlineSummary
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Goldberg (1989), "Genetic Algorithms in Search, Optimization and Machine Learning"

pub mod config;
pub mod error;
pub mod ga;
pub mod models;
pub mod parse;
pub mod plan;
pub mod scheduler;
pub mod validation;
