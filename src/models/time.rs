//! Instants and durations on a business calendar.
//!
//! [`Instant`] and [`Duration`] are thin wrappers: every piece of
//! arithmetic delegates to [`Calendar`]. An instant is normalized at
//! construction, so once built it always sits on a work moment.
//!
//! # Time Sampling
//! "Now" is sampled once per run into a [`Timeline`]. Relative offsets and
//! clock-only times are anchored to that sample, never to a live clock.

use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::Calendar;
use crate::error::{PlanError, PlanResult};

// ================================
// Duration
// ================================

/// Scale of a duration magnitude.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Minutes,
    #[default]
    Hours,
    Days,
    Weeks,
    /// Fixed at four work weeks.
    Months,
}

impl TimeUnit {
    /// Work hours in one unit under `calendar`.
    pub fn work_hours(self, calendar: &Calendar) -> f64 {
        let day = calendar.hours_per_day() as f64;
        let week = calendar.hours_per_week();
        match self {
            TimeUnit::Minutes => 1.0 / 60.0,
            TimeUnit::Hours => 1.0,
            TimeUnit::Days => day,
            TimeUnit::Weeks => week,
            TimeUnit::Months => week * 4.0,
        }
    }
}

/// A span of work time.
///
/// Keeps the magnitude and unit it was written with; the canonical value,
/// used for comparison and arithmetic, is in work hours. Serialize-only;
/// the hour value depends on the calendar it was built with.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Duration {
    value: f64,
    unit: TimeUnit,
    hours: f64,
}

impl Duration {
    /// The additive identity.
    pub const ZERO: Duration = Duration {
        value: 0.0,
        unit: TimeUnit::Hours,
        hours: 0.0,
    };

    /// Creates a duration of `value` units, converted through `calendar`.
    pub fn new(value: f64, unit: TimeUnit, calendar: &Calendar) -> Self {
        Self {
            value,
            unit,
            hours: value * unit.work_hours(calendar),
        }
    }

    /// Creates a duration of work hours.
    pub fn hours(hours: f64) -> Self {
        Self {
            value: hours,
            unit: TimeUnit::Hours,
            hours,
        }
    }

    /// Magnitude as written.
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    /// Canonical value in work hours.
    #[inline]
    pub fn as_hours(&self) -> f64 {
        self.hours
    }

    pub fn is_negative(&self) -> bool {
        self.hours < 0.0
    }

    /// Larger of two durations.
    pub fn max(self, other: Self) -> Self {
        if other > self {
            other
        } else {
            self
        }
    }

    /// Magnitude without sign.
    pub fn abs(self) -> Self {
        if self.is_negative() {
            -self
        } else {
            self
        }
    }

    /// Human-readable form in the largest unit that stays readable.
    ///
    /// Hours below a day, days below a week, weeks below eight weeks,
    /// months beyond.
    pub fn humanize(&self, calendar: &Calendar) -> String {
        let hours = self.hours;
        let per_day = calendar.hours_per_day() as f64;
        let per_week = calendar.workdays_per_week() as f64;
        if hours.abs() < per_day {
            return format!("{hours:.2} hours");
        }
        let days = hours / per_day;
        if days.abs() < per_week {
            return format!("{days:.2} days");
        }
        let weeks = days / per_week;
        if weeks.abs() < 8.0 {
            return format!("{weeks:.2} weeks");
        }
        format!("{:.2} months", weeks / 4.0)
    }
}

impl Default for Duration {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialEq for Duration {
    fn eq(&self, other: &Self) -> bool {
        self.hours == other.hours
    }
}

impl PartialOrd for Duration {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.hours.partial_cmp(&other.hours)
    }
}

impl Add for Duration {
    type Output = Duration;

    fn add(self, rhs: Self) -> Self::Output {
        Duration::hours(self.hours + rhs.hours)
    }
}

impl Sub for Duration {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        Duration::hours(self.hours - rhs.hours)
    }
}

impl Neg for Duration {
    type Output = Duration;

    fn neg(self) -> Self::Output {
        Duration::hours(-self.hours)
    }
}

impl Sum for Duration {
    fn sum<I: Iterator<Item = Duration>>(iter: I) -> Self {
        iter.fold(Duration::ZERO, |acc, d| acc + d)
    }
}

// ================================
// Instant
// ================================

/// Where an instant comes from. One variant per construction mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InstantSource {
    /// Signed work hours from now.
    Offset(f64),
    /// A calendar date, at the first work hour.
    Date(NaiveDate),
    /// A clock time today.
    Time(NaiveTime),
    DateTime(NaiveDateTime),
}

/// Field-per-mode instant description, as found in serialized input.
///
/// Converts into [`InstantSource`] only when exactly one field is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstantSpec {
    pub hours: Option<f64>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub datetime: Option<NaiveDateTime>,
}

impl TryFrom<InstantSpec> for InstantSource {
    type Error = PlanError;

    fn try_from(spec: InstantSpec) -> Result<Self, Self::Error> {
        let mut sources = Vec::with_capacity(1);
        if let Some(hours) = spec.hours {
            sources.push(InstantSource::Offset(hours));
        }
        if let Some(date) = spec.date {
            sources.push(InstantSource::Date(date));
        }
        if let Some(time) = spec.time {
            sources.push(InstantSource::Time(time));
        }
        if let Some(datetime) = spec.datetime {
            sources.push(InstantSource::DateTime(datetime));
        }
        match sources.as_slice() {
            [only] => Ok(*only),
            _ => Err(PlanError::InstantSource {
                supplied: sources.len(),
            }),
        }
    }
}

/// A point in time that always falls on a work moment.
///
/// Serializes but does not deserialize: read an [`InstantSpec`] and go
/// through [`Timeline::resolve_spec`] so the value is normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Instant {
    at: NaiveDateTime,
}

impl Instant {
    /// Normalizes `at` forward onto the calendar.
    pub fn at(at: NaiveDateTime, calendar: &Calendar) -> Self {
        Self {
            at: calendar.soonest_work(at),
        }
    }

    /// The normalized date-time.
    pub fn datetime(&self) -> NaiveDateTime {
        self.at
    }

    pub fn date(&self) -> NaiveDate {
        self.at.date()
    }

    /// Moves forward by `duration` work time, saturating at the ends of
    /// the supported date range.
    pub fn plus(self, duration: Duration, calendar: &Calendar) -> Self {
        Self {
            at: calendar.add_hours(self.at, duration.as_hours()),
        }
    }

    /// Moves forward by `duration` work time.
    ///
    /// # Errors
    /// [`PlanError::Calendar`] when the result is not representable.
    pub fn checked_plus(self, duration: Duration, calendar: &Calendar) -> PlanResult<Self> {
        Ok(Self {
            at: calendar.checked_add_hours(self.at, duration.as_hours())?,
        })
    }

    /// Moves backward by `duration` work time.
    pub fn minus(self, duration: Duration, calendar: &Calendar) -> Self {
        self.plus(-duration, calendar)
    }

    /// Signed work time from `self` to `later`.
    pub fn until(self, later: Instant, calendar: &Calendar) -> Duration {
        Duration::hours(calendar.interval_hours(self.at, later.at))
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.at.format("%Y-%m-%d %H:%M"))
    }
}

// ================================
// Timeline
// ================================

/// A calendar plus the moment "now" was sampled.
#[derive(Debug, Clone)]
pub struct Timeline {
    calendar: Calendar,
    now: NaiveDateTime,
}

impl Timeline {
    /// Creates a timeline with an explicit `now`.
    pub fn new(calendar: Calendar, now: NaiveDateTime) -> Self {
        Self { calendar, now }
    }

    /// Samples the local wall clock once.
    pub fn sample(calendar: Calendar) -> Self {
        Self::new(calendar, Local::now().naive_local())
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    /// Raw sampled wall-clock time.
    pub fn sampled_at(&self) -> NaiveDateTime {
        self.now
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date()
    }

    /// "Now" as a normalized instant.
    pub fn now(&self) -> Instant {
        Instant::at(self.now, &self.calendar)
    }

    /// Builds an instant from one construction mode.
    pub fn resolve(&self, source: InstantSource) -> Instant {
        let cal = &self.calendar;
        match source {
            InstantSource::Offset(hours) => Instant {
                at: cal.soonest_work(cal.add_hours(self.now, hours)),
            },
            InstantSource::Date(date) => {
                let first = cal.work_hours()[0];
                let start = NaiveTime::from_hms_opt(first, 0, 0).unwrap_or(NaiveTime::MIN);
                Instant::at(date.and_time(start), cal)
            }
            InstantSource::Time(time) => Instant::at(self.today().and_time(time), cal),
            InstantSource::DateTime(at) => Instant::at(at, cal),
        }
    }

    /// Builds an instant from a field-per-mode spec.
    ///
    /// # Errors
    /// [`PlanError::InstantSource`] unless exactly one field is set.
    pub fn resolve_spec(&self, spec: InstantSpec) -> PlanResult<Instant> {
        Ok(self.resolve(InstantSource::try_from(spec)?))
    }

    /// Duration of `value` units on this timeline's calendar.
    pub fn duration(&self, value: f64, unit: TimeUnit) -> Duration {
        Duration::new(value, unit, &self.calendar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monday_nine() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn timeline() -> Timeline {
        Timeline::new(Calendar::standard(), monday_nine())
    }

    #[test]
    fn test_unit_conversion() {
        let cal = Calendar::standard();
        assert_eq!(Duration::new(90.0, TimeUnit::Minutes, &cal).as_hours(), 1.5);
        assert_eq!(Duration::new(2.0, TimeUnit::Days, &cal).as_hours(), 16.0);
        assert_eq!(Duration::new(1.0, TimeUnit::Weeks, &cal).as_hours(), 40.0);
        assert_eq!(Duration::new(1.0, TimeUnit::Months, &cal).as_hours(), 160.0);
    }

    #[test]
    fn test_duration_arithmetic() {
        let a = Duration::hours(3.0);
        let b = Duration::hours(1.5);
        assert_eq!((a + b).as_hours(), 4.5);
        assert_eq!((a - b).as_hours(), 1.5);
        assert_eq!((-a).as_hours(), -3.0);
        assert_eq!(a + Duration::ZERO, a);
        assert!(b < a);
        let total: Duration = [a, b, b].into_iter().sum();
        assert_eq!(total.as_hours(), 6.0);
    }

    #[test]
    fn test_duration_keeps_written_unit() {
        let cal = Calendar::standard();
        let d = Duration::new(2.0, TimeUnit::Days, &cal);
        assert_eq!(d.value(), 2.0);
        assert_eq!(d.unit(), TimeUnit::Days);
        assert_eq!(d, Duration::hours(16.0));
    }

    #[test]
    fn test_humanize() {
        let cal = Calendar::standard();
        assert_eq!(Duration::hours(3.0).humanize(&cal), "3.00 hours");
        assert_eq!(Duration::hours(12.0).humanize(&cal), "1.50 days");
        assert_eq!(Duration::hours(80.0).humanize(&cal), "2.00 weeks");
        assert_eq!(Duration::hours(640.0).humanize(&cal), "4.00 months");
    }

    #[test]
    fn test_instant_spec_requires_one_source() {
        let none = InstantSpec::default();
        assert_eq!(
            InstantSource::try_from(none),
            Err(PlanError::InstantSource { supplied: 0 })
        );

        let two = InstantSpec {
            hours: Some(1.0),
            date: NaiveDate::from_ymd_opt(2024, 1, 2),
            ..Default::default()
        };
        assert_eq!(
            InstantSource::try_from(two),
            Err(PlanError::InstantSource { supplied: 2 })
        );

        let one = InstantSpec {
            hours: Some(4.0),
            ..Default::default()
        };
        assert_eq!(InstantSource::try_from(one), Ok(InstantSource::Offset(4.0)));
    }

    #[test]
    fn test_resolve_modes() {
        let tl = timeline();
        let expect = |d: u32, h: u32, m: u32| {
            NaiveDate::from_ymd_opt(2024, 1, d)
                .unwrap()
                .and_hms_opt(h, m, 0)
                .unwrap()
        };

        assert_eq!(tl.resolve(InstantSource::Offset(10.0)).datetime(), expect(2, 11, 0));

        let saturday = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap();
        assert_eq!(tl.resolve(InstantSource::Date(saturday)).datetime(), expect(8, 9, 0));

        let half_past_two = NaiveTime::from_hms_opt(14, 30, 0).unwrap();
        assert_eq!(tl.resolve(InstantSource::Time(half_past_two)).datetime(), expect(1, 14, 30));

        let evening = expect(3, 19, 0);
        assert_eq!(tl.resolve(InstantSource::DateTime(evening)).datetime(), expect(4, 9, 0));
    }

    #[test]
    fn test_serialized_instant_is_normalized() {
        let saturday = NaiveDate::from_ymd_opt(2024, 1, 6)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let instant = Instant::at(saturday, &Calendar::standard());
        let json = serde_json::to_value(instant).unwrap();
        assert_eq!(json["at"], "2024-01-08T09:00:00");

        // Input arrives as a spec and is normalized on resolution.
        let spec: InstantSpec = serde_json::from_str(r#"{ "datetime": "2024-01-06T12:00:00" }"#).unwrap();
        assert_eq!(timeline().resolve_spec(spec).unwrap(), instant);

        let days = Duration::new(2.0, TimeUnit::Days, &Calendar::standard());
        let json = serde_json::to_value(days).unwrap();
        assert_eq!(json["hours"], 16.0);
        assert_eq!(json["unit"], "days");
    }

    #[test]
    fn test_instant_arithmetic() {
        let tl = timeline();
        let cal = tl.calendar();
        let now = tl.now();
        let later = now.plus(Duration::hours(12.0), cal);
        assert_eq!(later.to_string(), "2024-01-02 13:00");
        assert_eq!(now.until(later, cal).as_hours(), 12.0);
        assert_eq!(later.minus(Duration::hours(12.0), cal), now);
        assert!(now < later);
    }
}
