//! Planner configuration.
//!
//! Every field has a documented default and the whole structure
//! deserializes from partial documents, so a config file only needs the
//! keys it changes.
//!
//! | Key | Default |
//! |-----|---------|
//! | `calendar.work_hours` | 9..=16 (09:00-17:00) |
//! | `calendar.weekend` | Saturday, Sunday |
//! | `search.population_size` | 200 |
//! | `search.generation_size` | 100 |
//! | `search.mutation_rate` | 0.05 |
//! | `search.stability_window` | 10 |
//! | `search.max_generations` | 10 000 |

use chrono::{NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::PlanResult;
use crate::ga::GaConfig;
use crate::models::{Calendar, Timeline};

/// Work-time policy before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Clock hours (0-23) that count as work time.
    pub work_hours: Vec<u32>,
    pub weekend: Vec<Weekday>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            work_hours: (9..=16).collect(),
            weekend: vec![Weekday::Sat, Weekday::Sun],
        }
    }
}

impl CalendarConfig {
    pub fn with_work_hours(mut self, hours: impl IntoIterator<Item = u32>) -> Self {
        self.work_hours = hours.into_iter().collect();
        self
    }

    pub fn with_weekend(mut self, days: impl IntoIterator<Item = Weekday>) -> Self {
        self.weekend = days.into_iter().collect();
        self
    }

    /// # Errors
    /// [`PlanError::Calendar`](crate::error::PlanError::Calendar) for an
    /// empty or out-of-range hour set, or a week without workdays.
    pub fn to_calendar(&self) -> PlanResult<Calendar> {
        Calendar::new(self.work_hours.iter().copied(), self.weekend.iter().copied())
    }
}

/// Top-level configuration: calendar plus search parameters.
///
/// # Example
///
/// ```
/// use u_plan::config::PlannerConfig;
///
/// let config: PlannerConfig =
///     serde_json::from_str(r#"{ "search": { "population_size": 50 } }"#).unwrap();
/// assert_eq!(config.search.population_size, 50);
/// assert_eq!(config.search.generation_size, 100);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub calendar: CalendarConfig,
    pub search: GaConfig,
}

impl PlannerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_calendar(mut self, calendar: CalendarConfig) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn with_search(mut self, search: GaConfig) -> Self {
        self.search = search;
        self
    }

    /// Checks both sections.
    pub fn validate(&self) -> PlanResult<()> {
        self.calendar.to_calendar()?;
        self.search.validate()
    }

    /// A timeline sampling the wall clock now.
    pub fn timeline(&self) -> PlanResult<Timeline> {
        Ok(Timeline::sample(self.calendar.to_calendar()?))
    }

    /// A timeline with a fixed `now`.
    pub fn timeline_at(&self, now: NaiveDateTime) -> PlanResult<Timeline> {
        Ok(Timeline::new(self.calendar.to_calendar()?, now))
    }
}
