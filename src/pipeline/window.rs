//! Time-window resolution for named periods.

use std::str::FromStr;

use chrono::{DateTime, Duration, Months, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::error::PipelineError;

// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    // ---
    Day,
    Week,
    Month,
    Custom,
}

impl FromStr for Period {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // ---
        match s.trim().to_lowercase().as_str() {
            "day" => Ok(Period::Day),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "custom" => Ok(Period::Custom),
            other => Err(PipelineError::InvalidFilter(format!(
                "unknown period '{other}'"
            ))),
        }
    }
}

/// Instant range readings are filtered into: after `start`, at or before `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    // ---
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start < instant && instant <= self.end
    }
}

/// Turn a named period into a concrete window ending at `now`.
///
/// `custom` takes both explicit dates (`YYYY-MM-DD` or RFC 3339); the end
/// date covers its whole calendar day, so one day is added to it.
///
/// # Errors
/// [`PipelineError::InvalidFilter`] for an unknown period or a missing or
/// unparseable custom bound.
pub fn resolve_window(
    period: &str,
    explicit_start: Option<&str>,
    explicit_end: Option<&str>,
    now: DateTime<Utc>,
) -> Result<TimeWindow, PipelineError> {
    // ---
    let start = match period.parse::<Period>()? {
        Period::Day => now - Duration::days(1),
        Period::Week => now - Duration::weeks(1),
        Period::Month => {
            let err = || PipelineError::InvalidFilter(format!("no month window before {now}"));
            now.checked_sub_months(Months::new(1)).ok_or_else(err)?
        }
        Period::Custom => {
            let start = parse_bound("start", explicit_start)?;
            let end = parse_bound("end", explicit_end)? + Duration::days(1);
            return Ok(TimeWindow { start, end });
        }
    };

    Ok(TimeWindow { start, end: now })
}

fn parse_bound(name: &str, value: Option<&str>) -> Result<DateTime<Utc>, PipelineError> {
    // ---
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            PipelineError::InvalidFilter(format!("custom period requires a {name} date"))
        })?;

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }

    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            PipelineError::InvalidFilter(format!("invalid {name} date '{value}': {e}"))
        })
}
