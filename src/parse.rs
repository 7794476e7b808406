//! Temporal text interpretation.
//!
//! Interprets the already-delimited strings of a [`TaskRecord`](crate::models::TaskRecord):
//! estimate ranges with a scale, measurements, and forgiving clock, date
//! and date-time forms. No line tokenization happens here.
//!
//! # Grammars
//! - quantity: `2h`, `30 min`, `1.5 days`, `0`
//! - range: `3`, `2-4`
//! - clock: `9`, `930`, `9:30`, `5pm`, `12am`, `1130am`
//! - interval: `1030-1`, `5-6pm`, `5am-5:30`
//! - date: `2024-03-14`, `03-14`
//! - instant: clock, date, or `03-14 at 2pm`

use chrono::{Datelike, NaiveDate, NaiveTime};
use thiserror::Error;

use crate::models::{
    Calendar, Duration, Estimate, EstimateKind, EstimateSpec, InstantSource, TimeUnit,
};

/// Text that no grammar accepts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("'{0}' contains no number")]
    MissingNumber(String),

    #[error("'{0}' is not a number")]
    InvalidNumber(String),

    #[error("'{0}' is too large to schedule")]
    OutOfRange(String),

    #[error("'{0}' is not a valid range")]
    InvalidRange(String),

    #[error("'{0}' is not a clock time")]
    InvalidClock(String),

    #[error("'{0}' is not a time interval")]
    InvalidInterval(String),

    #[error("'{0}' is not a date")]
    InvalidDate(String),

    #[error("cannot tell whether '{0}' is a time, date or date-time")]
    UnknownForm(String),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// How a month-day date without a year picks its year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateResolution {
    /// Closest to today among last, this and next year.
    Nearest,
    /// Latest one not after today.
    Before,
}

// ======================== Quantities ========================

/// Maps a scale word to a unit; unknown words are hours.
pub fn parse_scale(text: &str) -> TimeUnit {
    match text.trim().to_lowercase().as_str() {
        "min" | "mins" | "minute" | "minutes" => TimeUnit::Minutes,
        "d" | "day" | "days" => TimeUnit::Days,
        "w" | "wk" | "wks" | "week" | "weeks" => TimeUnit::Weeks,
        "mo" | "month" | "months" => TimeUnit::Months,
        _ => TimeUnit::Hours,
    }
}

/// A number followed by an optional scale word.
pub fn parse_quantity(text: &str) -> ParseResult<(f64, TimeUnit)> {
    let text = text.trim();
    if text == "0" {
        return Ok((0.0, TimeUnit::Hours));
    }
    let last = text
        .rfind(|c: char| c.is_ascii_digit())
        .ok_or_else(|| ParseError::MissingNumber(text.to_string()))?;
    let value = parse_number(&text[..=last])?;
    Ok((value, parse_scale(&text[last + 1..])))
}

/// `"3"` or `"2-4"`, as (min, max).
pub fn parse_range(text: &str) -> ParseResult<(f64, f64)> {
    let parts: Vec<&str> = text.split('-').collect();
    let (min, max) = match parts.as_slice() {
        [single] => {
            let v = parse_number(single)?;
            (v, v)
        }
        [lo, hi] => (parse_number(lo)?, parse_number(hi)?),
        _ => return Err(ParseError::InvalidRange(text.to_string())),
    };
    if min > max {
        return Err(ParseError::InvalidRange(text.to_string()));
    }
    Ok((min, max))
}

/// Interprets an estimate spec; nominal is the range midpoint.
pub fn parse_estimate(spec: &EstimateSpec, calendar: &Calendar) -> ParseResult<Estimate> {
    let (min, max) = parse_range(&spec.value_or_range)?;
    let kind = if spec.is_wait {
        EstimateKind::Wait
    } else {
        EstimateKind::Work
    };
    Ok(Estimate::new(
        kind,
        Duration::new(min, spec.scale, calendar),
        Duration::new(max, spec.scale, calendar),
    ))
}

/// A clock interval when the text has a hyphen, otherwise a quantity.
pub fn parse_measurement(text: &str, calendar: &Calendar) -> ParseResult<Duration> {
    if text.contains('-') {
        return parse_time_interval(text).map(Duration::hours);
    }
    let (value, unit) = parse_quantity(text)?;
    Ok(Duration::new(value, unit, calendar))
}

/// Largest magnitude accepted for any quantity, in its own unit.
const MAX_QUANTITY: f64 = 1e9;

fn parse_number(text: &str) -> ParseResult<f64> {
    let text = text.trim();
    let value = text
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::InvalidNumber(text.to_string()))?;
    if value.abs() > MAX_QUANTITY {
        return Err(ParseError::OutOfRange(text.to_string()));
    }
    Ok(value)
}

// ======================== Clock ========================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Meridiem {
    Am,
    Pm,
}

/// Clock reading before am/pm resolution.
#[derive(Debug, Clone, Copy)]
struct Clock {
    hour: u32,
    minute: u32,
    meridiem: Option<Meridiem>,
}

impl Clock {
    /// Up to four digits (`9`, `930`, `1130`), optionally followed by am/pm.
    fn parse(text: &str) -> ParseResult<Self> {
        let invalid = || ParseError::InvalidClock(text.trim().to_string());
        let digits: String = text.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() || digits.len() > 4 {
            return Err(invalid());
        }
        let (hour, minute) = if digits.len() < 3 {
            (digits.as_str(), "0")
        } else {
            digits.split_at(digits.len() - 2)
        };
        let hour = hour.parse().map_err(|_| invalid())?;
        let minute = minute.parse().map_err(|_| invalid())?;

        let suffix = text
            .rfind(|c: char| c.is_ascii_digit())
            .map(|i| text[i + 1..].trim().to_lowercase())
            .unwrap_or_default();
        let meridiem = match suffix.as_str() {
            "am" => Some(Meridiem::Am),
            "pm" => Some(Meridiem::Pm),
            _ => None,
        };
        Ok(Self {
            hour,
            minute,
            meridiem,
        })
    }

    fn with_meridiem(self, meridiem: Meridiem) -> Self {
        Self {
            meridiem: Some(meridiem),
            ..self
        }
    }

    /// Hours since midnight, reading a missing meridiem as am.
    fn as_hours(&self) -> f64 {
        let twelve = (self.hour as f64 + self.minute as f64 / 60.0) % 12.0;
        match self.meridiem {
            Some(Meridiem::Pm) => twelve + 12.0,
            _ => twelve,
        }
    }

    fn to_time(self) -> Option<NaiveTime> {
        let hour = match self.meridiem {
            Some(Meridiem::Pm) => self.hour % 12 + 12,
            Some(Meridiem::Am) => self.hour % 12,
            None => self.hour,
        };
        NaiveTime::from_hms_opt(hour, self.minute, 0)
    }
}

/// Forgiving 12/24-hour clock time.
pub fn parse_clock(text: &str) -> ParseResult<NaiveTime> {
    Clock::parse(text)?
        .to_time()
        .ok_or_else(|| ParseError::InvalidClock(text.trim().to_string()))
}

/// Wall-clock hours covered by `start-end`.
///
/// # Algorithm
/// 1. An end without am/pm borrows the start's, or pm if the start has none.
/// 2. A start without am/pm tries both readings and keeps the shorter span.
/// 3. Spans wrapping midnight count forward.
pub fn parse_time_interval(text: &str) -> ParseResult<f64> {
    let (first, second) = text
        .split_once('-')
        .filter(|(_, rest)| !rest.contains('-'))
        .ok_or_else(|| ParseError::InvalidInterval(text.to_string()))?;
    let first = Clock::parse(first)?;
    let mut second = Clock::parse(second)?;

    if second.meridiem.is_none() {
        second = second.with_meridiem(first.meridiem.unwrap_or(Meridiem::Pm));
    }
    if first.meridiem.is_some() {
        return Ok(hour_diff(&first, &second));
    }
    let as_pm = hour_diff(&first.with_meridiem(Meridiem::Pm), &second);
    let as_am = hour_diff(&first.with_meridiem(Meridiem::Am), &second);
    Ok(as_pm.min(as_am))
}

fn hour_diff(from: &Clock, to: &Clock) -> f64 {
    let (a, b) = (from.as_hours(), to.as_hours());
    if b >= a {
        b - a
    } else {
        24.0 - (a - b)
    }
}

// ======================== Dates and instants ========================

/// `YYYY-MM-DD`, or `MM-DD` with the year picked by `resolution`.
pub fn parse_date(text: &str, resolution: DateResolution, today: NaiveDate) -> ParseResult<NaiveDate> {
    let invalid = || ParseError::InvalidDate(text.trim().to_string());
    let fields = text
        .split('-')
        .map(|p| p.trim().parse::<u32>().map_err(|_| invalid()))
        .collect::<ParseResult<Vec<u32>>>()?;

    match fields.as_slice() {
        &[year, month, day] => {
            let year = i32::try_from(year).map_err(|_| invalid())?;
            NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
        }
        &[month, day] => {
            let year = today.year();
            let candidates = [year - 1, year, year + 1]
                .into_iter()
                .filter_map(|y| NaiveDate::from_ymd_opt(y, month, day));
            let chosen = match resolution {
                DateResolution::Nearest => {
                    candidates.min_by_key(|d| (*d - today).num_days().abs())
                }
                DateResolution::Before => candidates.filter(|d| *d <= today).max(),
            };
            chosen.ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}

/// Clock time, date, or date-time (`<date> at <clock>`).
pub fn parse_instant(
    text: &str,
    resolution: DateResolution,
    today: NaiveDate,
) -> ParseResult<InstantSource> {
    let text = text.trim();
    match text.matches('-').count() {
        0 => parse_clock(text).map(InstantSource::Time),
        1 | 2 => match text.split_once("at") {
            None => parse_date(text, resolution, today).map(InstantSource::Date),
            Some((date, clock)) => {
                let date = parse_date(date, resolution, today)?;
                let time = parse_clock(clock)?;
                Ok(InstantSource::DateTime(date.and_time(time)))
            }
        },
        _ => Err(ParseError::UnknownForm(text.to_string())),
    }
}
