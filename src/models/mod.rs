//! Planning domain models.
//!
//! Provides the time model (calendar, instants, durations), raw and
//! resolved tasks, and the candidate schedule with its fitness.
//!
//! # Domain Mappings
//!
//! | u-plan | Plan document | Time model |
//! |--------|---------------|------------|
//! | TaskRecord | Tokenized line | Unparsed text |
//! | Task | List item / header | Instants, durations |
//! | Schedule | Work order | Projected end times |

mod calendar;
mod record;
mod schedule;
mod task;
mod time;

pub use calendar::Calendar;
pub use record::{EstimateSpec, TaskRecord};
pub use schedule::{ContextSwitching, Fitness, Schedule};
pub use task::{Estimate, EstimateKind, Task, TaskId};
pub use time::{Duration, Instant, InstantSource, InstantSpec, TimeUnit, Timeline};

pub(crate) use task::ancestors_in;
