//! Visitor device class detected from the user agent.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Device class of a visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Mobile,
    /// Also used when the user agent is missing
    #[default]
    Desktop,
}

/// Tokens that mark a mobile user agent.
static MOBILE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)android|iphone|ipad|ipod|blackberry|webos|iemobile|opera mini").unwrap()
});

impl Device {
    /// Classify a user agent string. Missing or unrecognized is `Desktop`.
    pub fn detect(user_agent: Option<&str>) -> Self {
        match user_agent {
            Some(ua) if MOBILE_PATTERN.is_match(ua) => Device::Mobile,
            _ => Device::Desktop,
        }
    }

    /// Parse a device name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "mobile" => Some(Device::Mobile),
            "desktop" => Some(Device::Desktop),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Mobile => "mobile",
            Device::Desktop => "desktop",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
