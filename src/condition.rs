//! Rule conditions and the matcher.
//!
//! A condition is a conjunction of optional predicates. An absent or empty
//! predicate is always satisfied, so an empty condition matches every
//! visitor.

use serde::{Deserialize, Serialize};

use crate::error::TimeRangeError;
use crate::traffic::{TrafficInfo, VisitorType};
use crate::TrafficSource;

/// Time-of-day window in `HH:mm`, inclusive on both ends.
///
/// When `start` is later than `end` the window wraps past midnight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

impl TimeRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Check that both boundaries parse.
    pub fn validate(&self) -> Result<(), TimeRangeError> {
        parse_minutes(&self.start)?;
        parse_minutes(&self.end)?;
        Ok(())
    }

    /// Match an hour of the day against this window.
    ///
    /// Only the hour is compared: the visitor's time counts as `hour:00`.
    /// A boundary that does not parse makes the window never match.
    pub fn contains_hour(&self, hour: u32) -> bool {
        let (start, end) = match (parse_minutes(&self.start), parse_minutes(&self.end)) {
            (Ok(s), Ok(e)) => (s, e),
            _ => return false,
        };
        let current = hour * 60;

        if start <= end {
            current >= start && current <= end
        } else {
            current >= start || current <= end
        }
    }
}

/// Parse `HH:mm` into minutes since midnight.
pub fn parse_minutes(s: &str) -> Result<u32, TimeRangeError> {
    let malformed = || TimeRangeError::Malformed(s.to_string());

    let (h, m) = s.trim().split_once(':').ok_or_else(malformed)?;
    let hour: u32 = h.trim().parse().map_err(|_| malformed())?;
    let minute: u32 = m.trim().parse().map_err(|_| malformed())?;

    if hour > 23 || minute > 59 {
        return Err(TimeRangeError::OutOfRange(s.to_string()));
    }
    Ok(hour * 60 + minute)
}

/// Match an hour against a time range.
pub fn matches_time_range(hour: u32, range: &TimeRange) -> bool {
    range.contains_hour(hour)
}

/// Predicates a visitor must satisfy for a rule to fire.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleCondition {
    /// Any of these sources
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traffic_source: Option<Vec<TrafficSource>>,
    /// Any of these device names
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<Vec<String>>,
    /// Any of these country codes; never matches an unknown country
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    /// Any of these weekdays, 0 is Sunday
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visitor_type: Option<VisitorType>,
}

impl RuleCondition {
    /// Condition that matches everyone.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TrafficSource>,
    {
        self.traffic_source = Some(sources.into_iter().map(Into::into).collect());
        self
    }

    pub fn devices<I, S>(mut self, devices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.device = Some(devices.into_iter().map(Into::into).collect());
        self
    }

    pub fn countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.country = Some(countries.into_iter().map(Into::into).collect());
        self
    }

    pub fn between(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.time_range = Some(TimeRange::new(start, end));
        self
    }

    pub fn days(mut self, days: impl IntoIterator<Item = i64>) -> Self {
        self.day_of_week = Some(days.into_iter().collect());
        self
    }

    pub fn visitor(mut self, visitor_type: VisitorType) -> Self {
        self.visitor_type = Some(visitor_type);
        self
    }

    /// Check whether `info` satisfies every present predicate.
    pub fn matches(&self, info: &TrafficInfo) -> bool {
        if let Some(sources) = non_empty(&self.traffic_source) {
            if !sources.contains(&info.source) {
                return false;
            }
        }

        if let Some(devices) = non_empty(&self.device) {
            let device = info.device.as_str();
            if !devices.iter().any(|d| d.trim().eq_ignore_ascii_case(device)) {
                return false;
            }
        }

        if let Some(countries) = non_empty(&self.country) {
            let Some(country) = info.country.as_deref() else {
                return false;
            };
            if !countries.iter().any(|c| c.trim().eq_ignore_ascii_case(country)) {
                return false;
            }
        }

        if let Some(range) = &self.time_range {
            if !range.contains_hour(info.time.hour) {
                return false;
            }
        }

        if let Some(days) = non_empty(&self.day_of_week) {
            if !days.contains(&i64::from(info.time.day_of_week)) {
                return false;
            }
        }

        if let Some(visitor_type) = self.visitor_type {
            if visitor_type != info.visitor_type {
                return false;
            }
        }

        true
    }
}

fn non_empty<T>(list: &Option<Vec<T>>) -> Option<&[T]> {
    list.as_deref().filter(|l| !l.is_empty())
}

/// Check whether `info` satisfies `conditions`.
pub fn matches(info: &TrafficInfo, conditions: &RuleCondition) -> bool {
    conditions.matches(info)
}
