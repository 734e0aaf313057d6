// ABOUTME: Range builder resolving user-level time selectors into query windows
// ABOUTME: Pure computation; deterministic given a fixed clock, honoring WHOOP's 4am day boundary
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query window construction.
//!
//! Three mutually exclusive selectors resolve into a concrete window, in
//! precedence order: explicit `start`/`end` calendar dates, a single date
//! expanded to WHOOP's 04:00-04:00 physiological day, or a trailing day
//! count anchored at the supplied clock instant.

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};

use crate::constants::WHOOP_DAY_BOUNDARY_HOUR;
use crate::errors::{Error, Result};

/// Concrete query window plus paging controls for one fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryWindow {
    /// Inclusive window start
    pub start: Option<DateTime<Utc>>,
    /// Inclusive window end
    pub end: Option<DateTime<Utc>>,
    /// Page size; the API defaults to 25 when omitted
    pub limit: Option<u32>,
    /// Server-issued continuation token; callers never construct one
    pub next_token: Option<String>,
}

impl QueryWindow {
    /// Return a copy with the page size set
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Render the window as URL query pairs in the API's wire format
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(4);
        if let Some(start) = self.start {
            pairs.push(("start", format_rfc3339_millis(start)));
        }
        if let Some(end) = self.end {
            pairs.push(("end", format_rfc3339_millis(end)));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(token) = &self.next_token {
            pairs.push(("nextToken", token.clone()));
        }
        pairs
    }
}

/// RFC3339 with millisecond precision, matching the API's timestamp format
fn format_rfc3339_millis(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// User-level time selector, resolved by [`resolve`]
#[derive(Debug, Clone, Default)]
pub struct RangeSelector {
    /// Trailing day count ending now (lowest precedence; defaults to 7)
    pub days: Option<u32>,
    /// Single calendar date, expanded to the provider's day boundary
    pub date: Option<NaiveDate>,
    /// Explicit window start date (highest precedence)
    pub start: Option<NaiveDate>,
    /// Explicit window end date (highest precedence)
    pub end: Option<NaiveDate>,
}

/// Resolve a selector into a concrete window.
///
/// `now` is injected so resolution is deterministic under test.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] when `start` is after `end` or a date
/// falls outside the representable range.
pub fn resolve(selector: &RangeSelector, now: DateTime<Utc>) -> Result<QueryWindow> {
    if selector.start.is_some() || selector.end.is_some() {
        return explicit_range(selector.start, selector.end);
    }
    if let Some(date) = selector.date {
        return provider_day(date);
    }
    Ok(trailing_days(selector.days.unwrap_or(7), now))
}

/// Explicit calendar dates, normalized to UTC day boundaries
fn explicit_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<QueryWindow> {
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(Error::InvalidArgument(format!(
                "start date {s} is after end date {e}"
            )));
        }
    }
    Ok(QueryWindow {
        start: start.map(start_of_day).transpose()?,
        end: end.map(end_of_day).transpose()?,
        limit: None,
        next_token: None,
    })
}

/// One WHOOP physiological day: 04:00 UTC on `date` to 04:00 UTC the next day
fn provider_day(date: NaiveDate) -> Result<QueryWindow> {
    let next = date
        .checked_add_days(Days::new(1))
        .ok_or_else(|| Error::InvalidArgument(format!("date {date} out of range")))?;
    Ok(QueryWindow {
        start: Some(at_boundary_hour(date)?),
        end: Some(at_boundary_hour(next)?),
        limit: None,
        next_token: None,
    })
}

/// Trailing window of `days` days ending at `now`
fn trailing_days(days: u32, now: DateTime<Utc>) -> QueryWindow {
    let start = now - chrono::Duration::days(i64::from(days));
    QueryWindow {
        start: Some(start),
        end: Some(now),
        limit: None,
        next_token: None,
    }
}

fn start_of_day(date: NaiveDate) -> Result<DateTime<Utc>> {
    utc_at(date, 0, 0, 0, 0)
}

fn end_of_day(date: NaiveDate) -> Result<DateTime<Utc>> {
    utc_at(date, 23, 59, 59, 999)
}

fn at_boundary_hour(date: NaiveDate) -> Result<DateTime<Utc>> {
    utc_at(date, WHOOP_DAY_BOUNDARY_HOUR, 0, 0, 0)
}

fn utc_at(date: NaiveDate, hour: u32, min: u32, sec: u32, milli: u32) -> Result<DateTime<Utc>> {
    date.and_hms_milli_opt(hour, min, sec, milli)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| Error::InvalidArgument(format!("invalid time for date {date}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().expect("valid test date")
    }

    fn fixed_now() -> DateTime<Utc> {
        "2024-03-15T12:30:00Z".parse().expect("valid test instant")
    }

    #[test]
    fn explicit_dates_normalize_to_day_boundaries() {
        let selector = RangeSelector {
            start: Some(date("2024-03-01")),
            end: Some(date("2024-03-07")),
            ..RangeSelector::default()
        };
        let window = resolve(&selector, fixed_now()).expect("resolves");
        let pairs = window.query_pairs();
        assert_eq!(
            pairs[0],
            ("start", "2024-03-01T00:00:00.000Z".to_owned())
        );
        assert_eq!(pairs[1], ("end", "2024-03-07T23:59:59.999Z".to_owned()));
    }

    #[test]
    fn start_only_leaves_end_open() {
        let selector = RangeSelector {
            start: Some(date("2024-03-01")),
            ..RangeSelector::default()
        };
        let window = resolve(&selector, fixed_now()).expect("resolves");
        assert!(window.start.is_some());
        assert!(window.end.is_none());
    }

    #[test]
    fn single_date_uses_provider_day_boundary_not_midnight() {
        let selector = RangeSelector {
            date: Some(date("2024-03-01")),
            ..RangeSelector::default()
        };
        let window = resolve(&selector, fixed_now()).expect("resolves");
        let pairs = window.query_pairs();
        assert_eq!(
            pairs[0],
            ("start", "2024-03-01T04:00:00.000Z".to_owned())
        );
        assert_eq!(pairs[1], ("end", "2024-03-02T04:00:00.000Z".to_owned()));
    }

    #[test]
    fn trailing_days_defaults_to_seven() {
        let now = fixed_now();
        let window = resolve(&RangeSelector::default(), now).expect("resolves");
        assert_eq!(window.end, Some(now));
        assert_eq!(window.start, Some(now - chrono::Duration::days(7)));
    }

    #[test]
    fn explicit_range_takes_precedence_over_date_and_days() {
        let selector = RangeSelector {
            days: Some(30),
            date: Some(date("2024-01-01")),
            start: Some(date("2024-03-01")),
            end: None,
        };
        let window = resolve(&selector, fixed_now()).expect("resolves");
        assert_eq!(window.start, start_of_day(date("2024-03-01")).ok());
        assert!(window.end.is_none());
    }

    #[test]
    fn date_takes_precedence_over_days() {
        let selector = RangeSelector {
            days: Some(30),
            date: Some(date("2024-03-01")),
            ..RangeSelector::default()
        };
        let window = resolve(&selector, fixed_now()).expect("resolves");
        assert_eq!(window.start, at_boundary_hour(date("2024-03-01")).ok());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let selector = RangeSelector {
            start: Some(date("2024-03-07")),
            end: Some(date("2024-03-01")),
            ..RangeSelector::default()
        };
        let err = resolve(&selector, fixed_now()).expect_err("must reject");
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn query_pairs_include_limit_and_token() {
        let window = QueryWindow {
            start: None,
            end: None,
            limit: Some(25),
            next_token: Some("abc123".to_owned()),
        };
        assert_eq!(
            window.query_pairs(),
            vec![
                ("limit", "25".to_owned()),
                ("nextToken", "abc123".to_owned())
            ]
        );
    }
}
