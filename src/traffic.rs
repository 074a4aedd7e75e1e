//! Per-request traffic classification.
//!
//! A [`TrafficInfo`] is computed once per page view from the raw request
//! signals and then fed to every rule. It is always fully populated.

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::device::Device;
use crate::source::{detect_source, source_from_utm, CustomTrafficSource, SourcePrecedence};
use crate::TrafficSource;

/// Whether the visitor has seen this page before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisitorType {
    #[default]
    New,
    Returning,
}

impl VisitorType {
    pub fn from_returning(is_returning: bool) -> Self {
        if is_returning {
            VisitorType::Returning
        } else {
            VisitorType::New
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VisitorType::New => "new",
            VisitorType::Returning => "returning",
        }
    }
}

impl fmt::Display for VisitorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Wall-clock position of the evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeInfo {
    /// 0-23
    pub hour: u32,
    /// 0-6, 0 is Sunday
    pub day_of_week: u32,
}

impl TimeInfo {
    pub fn new(hour: u32, day_of_week: u32) -> Self {
        Self { hour, day_of_week }
    }

    /// Hour and weekday of `at` in its own timezone.
    pub fn from_datetime<Tz: TimeZone>(at: &DateTime<Tz>) -> Self {
        Self {
            hour: at.hour(),
            day_of_week: at.weekday().num_days_from_sunday(),
        }
    }

    /// Hour and weekday of the local clock right now.
    pub fn now() -> Self {
        Self::from_datetime(&Local::now())
    }
}

/// Everything the rule conditions can look at.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficInfo {
    pub source: TrafficSource,
    pub device: Device,
    /// ISO country code when an upstream service supplies one
    pub country: Option<String>,
    pub time: TimeInfo,
    pub visitor_type: VisitorType,
}

/// Raw signals collected by the request handler.
///
/// How `is_returning` is determined (cookie, local storage flag keyed by
/// page path, session store) is up to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSignals {
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    /// `utm_source` query parameter of the page URL
    pub utm_source: Option<String>,
    #[serde(default)]
    pub is_returning: bool,
    pub country: Option<String>,
}

impl RequestSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn utm_source(mut self, utm_source: impl Into<String>) -> Self {
        self.utm_source = Some(utm_source.into());
        self
    }

    pub fn returning(mut self, is_returning: bool) -> Self {
        self.is_returning = is_returning;
        self
    }

    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }
}

/// Turns request signals into a [`TrafficInfo`].
///
/// Holds the page's custom sources so one classifier can be reused for
/// every request to the same page.
#[derive(Debug, Clone, Default)]
pub struct TrafficClassifier {
    custom_sources: Vec<CustomTrafficSource>,
    precedence: SourcePrecedence,
}

impl TrafficClassifier {
    pub fn new(custom_sources: Vec<CustomTrafficSource>) -> Self {
        Self {
            custom_sources,
            precedence: SourcePrecedence::default(),
        }
    }

    pub fn with_precedence(mut self, precedence: SourcePrecedence) -> Self {
        self.precedence = precedence;
        self
    }

    pub fn custom_sources(&self) -> &[CustomTrafficSource] {
        &self.custom_sources
    }

    pub fn precedence(&self) -> SourcePrecedence {
        self.precedence
    }

    /// Resolve the source: a recognized `utm_source` wins, then the referer.
    pub fn detect_source(&self, referer: Option<&str>, utm_source: Option<&str>) -> TrafficSource {
        if let Some(source) = utm_source.and_then(|u| source_from_utm(u, &self.custom_sources)) {
            return source;
        }
        detect_source(referer, &self.custom_sources, self.precedence)
    }

    /// Classify using the local clock.
    pub fn classify(&self, signals: &RequestSignals) -> TrafficInfo {
        self.classify_at(signals, &Local::now())
    }

    /// Classify as if the request arrived at `at`.
    pub fn classify_at<Tz: TimeZone>(
        &self,
        signals: &RequestSignals,
        at: &DateTime<Tz>,
    ) -> TrafficInfo {
        let source = self.detect_source(signals.referer.as_deref(), signals.utm_source.as_deref());
        self.build(source, signals, TimeInfo::from_datetime(at))
    }

    /// Assemble the info once the source is known.
    pub(crate) fn build(
        &self,
        source: TrafficSource,
        signals: &RequestSignals,
        time: TimeInfo,
    ) -> TrafficInfo {
        TrafficInfo {
            source,
            device: Device::detect(signals.user_agent.as_deref()),
            country: signals.country.clone().filter(|c| !c.trim().is_empty()),
            time,
            visitor_type: VisitorType::from_returning(signals.is_returning),
        }
    }
}

/// Classify a request from its referer, user agent and return flag.
///
/// Country is always `None`; the time is the local clock.
pub fn classify(
    referer: Option<&str>,
    user_agent: Option<&str>,
    is_returning: bool,
    custom_sources: &[CustomTrafficSource],
) -> TrafficInfo {
    TrafficInfo {
        source: detect_source(referer, custom_sources, SourcePrecedence::FixedFirst),
        device: Device::detect(user_agent),
        country: None,
        time: TimeInfo::now(),
        visitor_type: VisitorType::from_returning(is_returning),
    }
}
