//! Business calendar model.
//!
//! Defines which moments count as work time: an ordered set of
//! work hours per day and a set of weekend weekdays. All instant and
//! duration arithmetic in the crate is relative to one calendar.
//!
//! # Time Model
//! A work day is the sequence of its work hours, so an 8-hour day of
//! hours {9..=16} has offsets 0.0 (09:00) through 8.0 (17:00). A work
//! week is `hours_per_day * workdays_per_week` hours. Durations are
//! always measured in work hours; weekends and off-hours are skipped.
//!
//! # Precedence
//! A moment is work time iff its weekday is not a weekend day AND its
//! clock hour is one of the work hours.

use std::collections::BTreeSet;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike, Weekday};

use crate::error::{PlanError, PlanResult};

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Work-hour and weekend policy.
///
/// Immutable once built. Construct with [`Calendar::new`] (validated) or
/// [`Calendar::standard`] (09:00-17:00, Saturday and Sunday off).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calendar {
    /// Sorted, unique work hours of the day (0-23).
    work_hours: Vec<u32>,
    /// Weekend days as days-from-Monday (0-6).
    weekend: BTreeSet<u32>,
}

impl Calendar {
    /// Creates a calendar from work hours and weekend days.
    ///
    /// # Errors
    /// Rejects an empty hour set, hours >= 24 and a week with no workdays.
    pub fn new(
        work_hours: impl IntoIterator<Item = u32>,
        weekend: impl IntoIterator<Item = Weekday>,
    ) -> PlanResult<Self> {
        let hours: BTreeSet<u32> = work_hours.into_iter().collect();
        if hours.is_empty() {
            return Err(PlanError::Calendar("no work hours configured".into()));
        }
        if let Some(bad) = hours.iter().find(|&&h| h >= 24) {
            return Err(PlanError::Calendar(format!("work hour {bad} is not a clock hour")));
        }
        let weekend: BTreeSet<u32> = weekend.into_iter().map(|d| d.num_days_from_monday()).collect();
        if weekend.len() >= 7 {
            return Err(PlanError::Calendar("every weekday is a weekend day".into()));
        }
        Ok(Self {
            work_hours: hours.into_iter().collect(),
            weekend,
        })
    }

    /// 8-hour days from 09:00, Monday to Friday.
    pub fn standard() -> Self {
        Self {
            work_hours: (9..17).collect(),
            weekend: [5, 6].into_iter().collect(),
        }
    }

    /// Work hours of the day, ascending.
    pub fn work_hours(&self) -> &[u32] {
        &self.work_hours
    }

    /// Weekend days, Monday first.
    pub fn weekend(&self) -> Vec<Weekday> {
        self.weekend
            .iter()
            .map(|&d| (0..d).fold(Weekday::Mon, |day, _| day.succ()))
            .collect()
    }

    /// Number of work hours in a work day.
    #[inline]
    pub fn hours_per_day(&self) -> usize {
        self.work_hours.len()
    }

    /// Number of non-weekend days in a week.
    #[inline]
    pub fn workdays_per_week(&self) -> usize {
        7 - self.weekend.len()
    }

    /// Work hours in a full week.
    #[inline]
    pub fn hours_per_week(&self) -> f64 {
        (self.hours_per_day() * self.workdays_per_week()) as f64
    }

    #[inline]
    pub fn is_weekend(&self, day: Weekday) -> bool {
        self.weekend.contains(&day.num_days_from_monday())
    }

    /// Whether the moment falls in a work hour of a workday.
    pub fn is_work_moment(&self, at: NaiveDateTime) -> bool {
        !self.is_weekend(at.weekday()) && self.work_hours.contains(&at.hour())
    }

    /// Work hours elapsed in the day before `time`.
    ///
    /// Counts whole work hours strictly before the clock hour, plus the
    /// fraction already spent in the straddling hour when that hour is a
    /// work hour. Off-hours and gaps contribute nothing.
    pub fn hours_of_day_to_offset(&self, time: NaiveTime) -> f64 {
        let full = self.work_hours.iter().filter(|&&h| h < time.hour()).count() as f64;
        if !self.work_hours.contains(&time.hour()) {
            return full;
        }
        let partial = (time.minute() * 60 + time.second()) as f64 / SECONDS_PER_HOUR
            + time.nanosecond() as f64 / (SECONDS_PER_HOUR * 1e9);
        full + partial
    }

    /// Clock time reached `hours` work hours into the day.
    ///
    /// # Errors
    /// Fails when `hours` is negative or exceeds the length of a work day.
    pub fn offset_to_hours_of_day(&self, hours: f64) -> PlanResult<NaiveTime> {
        let hpd = self.hours_per_day() as f64;
        if !hours.is_finite() || hours < 0.0 || hours > hpd {
            return Err(PlanError::Calendar(format!(
                "offset {hours} outside a work day of {hpd} hours"
            )));
        }
        Ok(self.time_at_offset(hours))
    }

    fn time_at_offset(&self, hours: f64) -> NaiveTime {
        let last = self.hours_per_day() - 1;
        let whole = hours.max(0.0).floor() as usize;
        let (index, fraction) = if whole > last {
            (last, 1.0)
        } else {
            (whole, hours - whole as f64)
        };
        let seconds = (fraction * SECONDS_PER_HOUR).round() as i64;
        let base = NaiveTime::from_hms_opt(self.work_hours[index], 0, 0).unwrap_or(NaiveTime::MIN);
        base.overflowing_add_signed(TimeDelta::seconds(seconds)).0
    }

    /// Signed calendar days spanned by advancing `workdays` workdays.
    ///
    /// A weekend start first steps (in the requested direction) onto the
    /// nearest workday; that step counts toward the calendar days.
    pub fn workdays_to_calendar_days(&self, from: Weekday, workdays: i64) -> i64 {
        let step: i64 = if workdays >= 0 { 1 } else { -1 };
        let mut index = from.num_days_from_monday() as i64;
        let mut calendar_days = 0;
        let mut remaining = workdays.abs();

        while self.weekend.contains(&(index as u32)) {
            index = (index + step).rem_euclid(7);
            calendar_days += step;
        }
        while remaining > 0 {
            index = (index + step).rem_euclid(7);
            calendar_days += step;
            if !self.weekend.contains(&(index as u32)) {
                remaining -= 1;
            }
        }
        calendar_days
    }

    /// First workday on or after `date`.
    pub fn soonest_workday(&self, date: NaiveDate) -> NaiveDate {
        date.iter_days()
            .take(7)
            .find(|d| !self.is_weekend(d.weekday()))
            .unwrap_or(date)
    }

    /// Rounds forward to the next work moment (no-op if already one).
    pub fn soonest_work(&self, at: NaiveDateTime) -> NaiveDateTime {
        if self.is_work_moment(at) {
            return at;
        }
        let first = self.work_hours[0];
        let date = at.date();
        if self.is_weekend(date.weekday()) {
            return at_hour(self.soonest_workday(date), first);
        }
        match self.work_hours.iter().find(|&&h| h > at.hour()) {
            Some(&hour) => at_hour(date, hour),
            None => {
                let next = date.succ_opt().unwrap_or(date);
                at_hour(self.soonest_workday(next), first)
            }
        }
    }

    /// Moves `hours` work hours from `at` (negative walks backward).
    ///
    /// Saturates at the ends of the supported date range; use
    /// [`checked_add_hours`](Self::checked_add_hours) to detect that.
    pub fn add_hours(&self, at: NaiveDateTime, hours: f64) -> NaiveDateTime {
        self.checked_add_hours(at, hours).unwrap_or(if hours < 0.0 {
            NaiveDateTime::MIN
        } else {
            NaiveDateTime::MAX
        })
    }

    /// Moves `hours` work hours from `at` (negative walks backward).
    ///
    /// # Algorithm
    /// 1. Snap `at` to [`soonest_work`](Self::soonest_work).
    /// 2. Jump whole work weeks as 7 calendar days each.
    /// 3. Jump whole workdays via [`workdays_to_calendar_days`](Self::workdays_to_calendar_days).
    /// 4. Place the sub-day remainder on the day's work-hour offsets,
    ///    spilling into the neighbouring workday when it overflows.
    ///
    /// # Errors
    /// [`PlanError::Calendar`] when `hours` is not finite or the result
    /// lies outside the supported date range.
    pub fn checked_add_hours(&self, at: NaiveDateTime, hours: f64) -> PlanResult<NaiveDateTime> {
        let out_of_range = || {
            PlanError::Calendar(format!(
                "moving {hours} work hours from {at} leaves the supported date range"
            ))
        };
        if !hours.is_finite() {
            return Err(out_of_range());
        }
        let hpd = self.hours_per_day() as f64;
        let week = self.hours_per_week();
        let sign = if hours < 0.0 { -1.0 } else { 1.0 };
        let mut remaining = snap_seconds(hours);
        let mut result = self.soonest_work(at);

        let full_weeks = (remaining.abs() / week).floor() * sign;
        let week_days = whole(full_weeks)
            .and_then(|w| w.checked_mul(7))
            .ok_or_else(out_of_range)?;
        result = shift_days(result, week_days).ok_or_else(out_of_range)?;
        remaining -= full_weeks * week;

        let full_days = (remaining.abs() / hpd).floor() * sign;
        let days = self.workdays_to_calendar_days(result.weekday(), full_days as i64);
        result = shift_days(result, days).ok_or_else(out_of_range)?;
        remaining -= full_days * hpd;

        let position = snap_seconds(self.hours_of_day_to_offset(result.time()) + remaining);
        let spill = (position / hpd).floor() as i64;
        let days = self.workdays_to_calendar_days(result.weekday(), spill);
        result = shift_days(result, days).ok_or_else(out_of_range)?;
        let time = self.time_at_offset(position.rem_euclid(hpd));
        Ok(result.date().and_time(time))
    }

    /// Signed work hours from `from` to `to`.
    ///
    /// Both ends are first snapped forward to work moments, so
    /// `add_hours(a, interval_hours(a, b)) == soonest_work(b)` for any
    /// work moment `a`.
    pub fn interval_hours(&self, from: NaiveDateTime, to: NaiveDateTime) -> f64 {
        let end = self.soonest_work(to);
        let mut cursor = self.soonest_work(from);
        let hpd = self.hours_per_day() as f64;

        let days = ((end - cursor).num_seconds() as f64 / 86_400.0).floor() as i64;
        let full_weeks = (days.abs() / 7) * days.signum();
        let mut hours = full_weeks as f64 * self.hours_per_week();
        // Every shift stays between the two in-range ends.
        cursor = shift_days(cursor, 7 * full_weeks).unwrap_or(end);

        let step: i64 = if cursor > end { -1 } else { 1 };
        while cursor.date() != end.date() {
            cursor = shift_days(cursor, step).unwrap_or(end);
            if !self.is_weekend(cursor.weekday()) {
                hours += hpd * step as f64;
            }
        }

        hours += self.hours_of_day_to_offset(end.time()) - self.hours_of_day_to_offset(cursor.time());
        snap_seconds(hours)
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Self::standard()
    }
}

fn at_hour(date: NaiveDate, hour: u32) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN))
}

/// `None` when the shift leaves chrono's date range.
fn shift_days(at: NaiveDateTime, days: i64) -> Option<NaiveDateTime> {
    let magnitude = Days::new(days.unsigned_abs());
    if days >= 0 {
        at.checked_add_days(magnitude)
    } else {
        at.checked_sub_days(magnitude)
    }
}

/// Integral `value` as `i64`, if it fits.
fn whole(value: f64) -> Option<i64> {
    (value.abs() < i64::MAX as f64).then_some(value as i64)
}

/// Rounds fractional hours to whole seconds.
fn snap_seconds(hours: f64) -> f64 {
    (hours * SECONDS_PER_HOUR).round() / SECONDS_PER_HOUR
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    // 2024-01-01 is a Monday.
    fn monday(h: u32, min: u32) -> NaiveDateTime {
        dt(2024, 1, 1, h, min)
    }

    #[test]
    fn test_standard_dimensions() {
        let cal = Calendar::standard();
        assert_eq!(cal.hours_per_day(), 8);
        assert_eq!(cal.workdays_per_week(), 5);
        assert_eq!(cal.hours_per_week(), 40.0);
        assert_eq!(cal.weekend(), vec![Weekday::Sat, Weekday::Sun]);
    }

    #[test]
    fn test_invalid_calendars() {
        assert!(Calendar::new(Vec::<u32>::new(), [Weekday::Sat]).is_err());
        assert!(Calendar::new([9, 24], [Weekday::Sat]).is_err());
        let all = [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ];
        assert!(Calendar::new([9], all).is_err());
    }

    #[test]
    fn test_hours_of_day_to_offset() {
        let cal = Calendar::standard();
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        assert_eq!(cal.hours_of_day_to_offset(t(9, 0)), 0.0);
        assert_eq!(cal.hours_of_day_to_offset(t(10, 30)), 1.5);
        assert_eq!(cal.hours_of_day_to_offset(t(16, 45)), 7.75);
        assert_eq!(cal.hours_of_day_to_offset(t(20, 0)), 8.0);
    }

    #[test]
    fn test_offset_ignores_minutes_outside_work_hours() {
        let cal = Calendar::standard();
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        assert_eq!(cal.hours_of_day_to_offset(t(7, 30)), 0.0);
        assert_eq!(cal.hours_of_day_to_offset(t(17, 0)), 8.0);
        assert_eq!(cal.hours_of_day_to_offset(t(20, 30)), 8.0);

        let lunch = Calendar::new([9, 10, 11, 13, 14], [Weekday::Sat, Weekday::Sun]).unwrap();
        assert_eq!(lunch.hours_of_day_to_offset(t(12, 30)), 3.0);
        assert_eq!(lunch.hours_of_day_to_offset(t(8, 45)), 0.0);
        assert_eq!(lunch.hours_of_day_to_offset(t(15, 30)), 5.0);
        assert_eq!(lunch.hours_of_day_to_offset(t(14, 30)), 4.5);
    }

    #[test]
    fn test_offset_to_hours_of_day() {
        let cal = Calendar::standard();
        assert_eq!(
            cal.offset_to_hours_of_day(1.5).unwrap(),
            NaiveTime::from_hms_opt(10, 30, 0).unwrap()
        );
        assert_eq!(
            cal.offset_to_hours_of_day(8.0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap()
        );
        assert!(cal.offset_to_hours_of_day(8.5).is_err());
        assert!(cal.offset_to_hours_of_day(-0.5).is_err());
    }

    #[test]
    fn test_offset_with_gapped_hours() {
        // Lunch break at 12.
        let cal = Calendar::new([9, 10, 11, 13, 14], [Weekday::Sat, Weekday::Sun]).unwrap();
        assert_eq!(
            cal.offset_to_hours_of_day(3.25).unwrap(),
            NaiveTime::from_hms_opt(13, 15, 0).unwrap()
        );
        let t = NaiveTime::from_hms_opt(13, 15, 0).unwrap();
        assert_eq!(cal.hours_of_day_to_offset(t), 3.25);
    }

    #[test]
    fn test_workdays_to_calendar_days() {
        let cal = Calendar::standard();
        assert_eq!(cal.workdays_to_calendar_days(Weekday::Mon, 1), 1);
        assert_eq!(cal.workdays_to_calendar_days(Weekday::Fri, 1), 3);
        assert_eq!(cal.workdays_to_calendar_days(Weekday::Mon, -1), -3);
        assert_eq!(cal.workdays_to_calendar_days(Weekday::Wed, 0), 0);
        // Saturday steps onto Monday first, then one more workday.
        assert_eq!(cal.workdays_to_calendar_days(Weekday::Sat, 1), 3);
        // Sunday backward steps onto Friday first.
        assert_eq!(cal.workdays_to_calendar_days(Weekday::Sun, -1), -3);
    }

    #[test]
    fn test_soonest_work() {
        let cal = Calendar::standard();
        assert_eq!(cal.soonest_work(monday(10, 15)), monday(10, 15));
        assert_eq!(cal.soonest_work(monday(7, 30)), monday(9, 0));
        assert_eq!(cal.soonest_work(monday(17, 0)), dt(2024, 1, 2, 9, 0));
        // Friday evening rolls to Monday.
        assert_eq!(cal.soonest_work(dt(2024, 1, 5, 18, 0)), dt(2024, 1, 8, 9, 0));
        // Saturday noon rolls to Monday.
        assert_eq!(cal.soonest_work(dt(2024, 1, 6, 12, 0)), dt(2024, 1, 8, 9, 0));
    }

    #[test]
    fn test_add_hours_day_and_week() {
        let cal = Calendar::standard();
        assert_eq!(cal.add_hours(monday(9, 0), 8.0), dt(2024, 1, 2, 9, 0));
        assert_eq!(cal.add_hours(monday(9, 0), 40.0), dt(2024, 1, 8, 9, 0));
        assert_eq!(cal.add_hours(monday(9, 0), 4.0), monday(13, 0));
    }

    #[test]
    fn test_add_hours_spills_over_weekend() {
        let cal = Calendar::standard();
        let friday = dt(2024, 1, 5, 15, 0);
        assert_eq!(cal.add_hours(friday, 3.0), dt(2024, 1, 8, 10, 0));
    }

    #[test]
    fn test_add_hours_negative() {
        let cal = Calendar::standard();
        assert_eq!(cal.add_hours(monday(9, 0), -1.0), dt(2023, 12, 29, 16, 0));
        assert_eq!(cal.add_hours(monday(9, 0), -8.0), dt(2023, 12, 29, 9, 0));
        assert_eq!(cal.add_hours(monday(10, 0), -1.0), monday(9, 0));
        assert_eq!(cal.add_hours(monday(9, 0), -40.0), dt(2023, 12, 25, 9, 0));
    }

    #[test]
    fn test_add_hours_out_of_range() {
        let cal = Calendar::standard();
        assert!(matches!(
            cal.checked_add_hours(monday(9, 0), 1e20),
            Err(PlanError::Calendar(_))
        ));
        assert!(cal.checked_add_hours(monday(9, 0), -1e12).is_err());
        assert!(cal.checked_add_hours(monday(9, 0), f64::NAN).is_err());
        assert!(cal.checked_add_hours(monday(9, 0), f64::INFINITY).is_err());
        assert_eq!(cal.add_hours(monday(9, 0), 1e20), NaiveDateTime::MAX);
        assert_eq!(cal.add_hours(monday(9, 0), -1e20), NaiveDateTime::MIN);
        assert_eq!(cal.checked_add_hours(monday(9, 0), 8.0).unwrap(), dt(2024, 1, 2, 9, 0));
    }

    #[test]
    fn test_interval_hours() {
        let cal = Calendar::standard();
        assert_eq!(cal.interval_hours(monday(9, 0), dt(2024, 1, 2, 9, 0)), 8.0);
        assert_eq!(cal.interval_hours(monday(9, 0), dt(2024, 1, 8, 9, 0)), 40.0);
        assert_eq!(cal.interval_hours(monday(9, 0), dt(2023, 12, 29, 16, 0)), -1.0);
        assert_eq!(cal.interval_hours(monday(16, 30), dt(2024, 1, 2, 9, 0)), 0.5);
        // Weekend target snaps to Monday morning.
        assert_eq!(cal.interval_hours(monday(9, 0), dt(2024, 1, 6, 10, 0)), 40.0);
    }

    #[test]
    fn test_interval_inverts_add_hours() {
        let cal = Calendar::standard();
        let starts = [monday(9, 0), monday(13, 30), dt(2024, 1, 5, 16, 15), dt(2024, 1, 3, 11, 0)];
        for start in starts {
            for h in -100..=100 {
                let h = h as f64;
                let end = cal.add_hours(start, h);
                assert_eq!(cal.interval_hours(start, end), h, "start {start}, h {h}");
            }
        }
    }

    #[test]
    fn test_negative_symmetry() {
        let cal = Calendar::standard();
        let starts = [monday(9, 0), monday(16, 30), dt(2024, 1, 4, 12, 0)];
        for start in starts {
            for step in -40..=40 {
                let h = step as f64 * 2.5;
                let there = cal.add_hours(start, h);
                assert_eq!(cal.add_hours(there, -h), start, "start {start}, h {h}");
            }
        }
    }

    #[test]
    fn test_round_trip_to_arbitrary_target() {
        let cal = Calendar::standard();
        let a = monday(11, 0);
        for b in [dt(2024, 1, 6, 10, 0), dt(2024, 1, 3, 20, 0), dt(2023, 12, 31, 8, 0)] {
            let h = cal.interval_hours(a, b);
            assert_eq!(cal.add_hours(a, h), cal.soonest_work(b));
        }
    }
}
