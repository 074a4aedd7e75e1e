//! Traffic source vocabulary and referer-based detection.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a visitor came from.
///
/// The nine well-known platforms are fixed variants. Page owners can define
/// their own platforms with [`CustomTrafficSource`], which detect as
/// `Custom(name)` with the name lowercased. `Direct` is the fallback when
/// nothing is detected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TrafficSource {
    TikTok,
    Instagram,
    YouTube,
    Twitter,
    Google,
    Facebook,
    LinkedIn,
    Pinterest,
    Snapchat,
    /// No referer, or a referer nobody claims
    #[default]
    Direct,
    /// Page-owner defined platform (lowercase name)
    Custom(String),
}

/// Fixed platforms in detection order. First match wins.
pub const FIXED_SOURCES: &[TrafficSource] = &[
    TrafficSource::TikTok,
    TrafficSource::Instagram,
    TrafficSource::YouTube,
    TrafficSource::Twitter,
    TrafficSource::Google,
    TrafficSource::Facebook,
    TrafficSource::LinkedIn,
    TrafficSource::Pinterest,
    TrafficSource::Snapchat,
];

/// `google.` followed by a country or generic TLD, e.g. `google.co.uk`.
static GOOGLE_TLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"google\.[a-z]{2,}").unwrap());

impl TrafficSource {
    /// Parse a source name (case-insensitive).
    ///
    /// Unknown names become `Custom`, an empty name becomes `Direct`.
    pub fn parse(s: &str) -> Self {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "tiktok" => TrafficSource::TikTok,
            "instagram" => TrafficSource::Instagram,
            "youtube" => TrafficSource::YouTube,
            "twitter" => TrafficSource::Twitter,
            "google" => TrafficSource::Google,
            "facebook" => TrafficSource::Facebook,
            "linkedin" => TrafficSource::LinkedIn,
            "pinterest" => TrafficSource::Pinterest,
            "snapchat" => TrafficSource::Snapchat,
            "direct" | "" => TrafficSource::Direct,
            _ => TrafficSource::Custom(lower),
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &str {
        match self {
            TrafficSource::TikTok => "tiktok",
            TrafficSource::Instagram => "instagram",
            TrafficSource::YouTube => "youtube",
            TrafficSource::Twitter => "twitter",
            TrafficSource::Google => "google",
            TrafficSource::Facebook => "facebook",
            TrafficSource::LinkedIn => "linkedin",
            TrafficSource::Pinterest => "pinterest",
            TrafficSource::Snapchat => "snapchat",
            TrafficSource::Direct => "direct",
            TrafficSource::Custom(name) => name,
        }
    }

    pub fn is_direct(&self) -> bool {
        matches!(self, TrafficSource::Direct)
    }

    /// Substrings that identify this platform in a lowercased referer.
    ///
    /// Google is additionally matched by `google.<tld>`.
    pub fn referer_patterns(&self) -> &'static [&'static str] {
        match self {
            TrafficSource::TikTok => &["tiktok.com"],
            TrafficSource::Instagram => &["instagram.com", "ig.me"],
            TrafficSource::YouTube => &["youtube.com", "youtu.be"],
            TrafficSource::Twitter => &["twitter.com", "x.com"],
            TrafficSource::Google => &["google.com"],
            TrafficSource::Facebook => &["facebook.com"],
            TrafficSource::LinkedIn => &["linkedin.com"],
            TrafficSource::Pinterest => &["pinterest.com"],
            TrafficSource::Snapchat => &["snapchat.com"],
            TrafficSource::Direct | TrafficSource::Custom(_) => &[],
        }
    }

    /// Domains a link block must point at to be promoted for this source.
    ///
    /// Google and Direct have no link domains, so auto-reorder leaves the
    /// list alone for them.
    pub fn link_domains(&self) -> &'static [&'static str] {
        match self {
            TrafficSource::TikTok => &["tiktok.com"],
            TrafficSource::Instagram => &["instagram.com", "ig.me"],
            TrafficSource::YouTube => &["youtube.com", "youtu.be"],
            TrafficSource::Twitter => &["twitter.com", "x.com"],
            TrafficSource::Facebook => &["facebook.com", "fb.com"],
            TrafficSource::LinkedIn => &["linkedin.com"],
            TrafficSource::Pinterest => &["pinterest.com"],
            TrafficSource::Snapchat => &["snapchat.com"],
            TrafficSource::Google | TrafficSource::Direct | TrafficSource::Custom(_) => &[],
        }
    }

    /// Check a lowercased referer against this platform's patterns.
    fn matches_referer(&self, referer_lower: &str) -> bool {
        if self
            .referer_patterns()
            .iter()
            .any(|p| referer_lower.contains(p))
        {
            return true;
        }
        matches!(self, TrafficSource::Google) && GOOGLE_TLD.is_match(referer_lower)
    }
}

impl fmt::Display for TrafficSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for TrafficSource {
    fn from(s: String) -> Self {
        TrafficSource::parse(&s)
    }
}

impl From<&str> for TrafficSource {
    fn from(s: &str) -> Self {
        TrafficSource::parse(s)
    }
}

impl From<TrafficSource> for String {
    fn from(source: TrafficSource) -> Self {
        source.as_str().to_string()
    }
}

/// A platform defined by a page owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomTrafficSource {
    /// Display name; detection uses the lowercased form
    pub name: String,
    /// Domain substrings matched against the referer
    #[serde(default)]
    pub domains: Vec<String>,
}

impl CustomTrafficSource {
    pub fn new<I, S>(name: impl Into<String>, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            domains: domains.into_iter().map(Into::into).collect(),
        }
    }

    /// The source this definition detects as.
    pub fn source(&self) -> TrafficSource {
        TrafficSource::parse(&self.name)
    }

    /// Check whether any of the domains appears in `text` (case-insensitive).
    pub fn matches(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.domains
            .iter()
            .filter(|d| !d.is_empty())
            .any(|d| lower.contains(&d.to_lowercase()))
    }
}

/// Order in which fixed platforms and custom sources are consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourcePrecedence {
    /// Built-in platforms, then custom sources in the order given
    #[default]
    FixedFirst,
    /// Custom sources in the order given, then built-in platforms
    CustomFirst,
}

/// Detect the traffic source from a referer header.
///
/// An empty or missing referer is `Direct`. Otherwise the lowercased
/// referer is tested by substring against the fixed platform list and the
/// custom sources, in the order set by `precedence`. First match wins.
pub fn detect_source(
    referer: Option<&str>,
    custom: &[CustomTrafficSource],
    precedence: SourcePrecedence,
) -> TrafficSource {
    let referer = match referer.map(str::trim) {
        Some(r) if !r.is_empty() => r.to_lowercase(),
        _ => return TrafficSource::Direct,
    };

    let fixed = || {
        FIXED_SOURCES
            .iter()
            .find(|s| s.matches_referer(&referer))
            .cloned()
    };
    let owned = || custom.iter().find(|c| c.matches(&referer)).map(|c| c.source());

    let found = match precedence {
        SourcePrecedence::FixedFirst => fixed().or_else(owned),
        SourcePrecedence::CustomFirst => owned().or_else(fixed),
    };
    found.unwrap_or(TrafficSource::Direct)
}

/// Resolve an explicit `utm_source` value.
///
/// Only names of fixed platforms or of the given custom sources are
/// accepted; anything else returns `None` so referer detection applies.
pub fn source_from_utm(utm: &str, custom: &[CustomTrafficSource]) -> Option<TrafficSource> {
    match TrafficSource::parse(utm) {
        TrafficSource::Direct => None,
        TrafficSource::Custom(ref name)
            if !custom
                .iter()
                .any(|c| c.name.trim().eq_ignore_ascii_case(name)) =>
        {
            None
        }
        source => Some(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_parse() {
        assert_eq!(TrafficSource::parse("tiktok"), TrafficSource::TikTok);
        assert_eq!(TrafficSource::parse("TikTok"), TrafficSource::TikTok);
        assert_eq!(TrafficSource::parse("YOUTUBE"), TrafficSource::YouTube);
        assert_eq!(TrafficSource::parse(""), TrafficSource::Direct);
        assert_eq!(TrafficSource::parse("direct"), TrafficSource::Direct);
        assert_eq!(
            TrafficSource::parse("Newsletter"),
            TrafficSource::Custom("newsletter".to_string())
        );
    }

    #[test]
    fn test_source_display() {
        assert_eq!(TrafficSource::LinkedIn.to_string(), "linkedin");
        assert_eq!(TrafficSource::Direct.to_string(), "direct");
        assert_eq!(
            TrafficSource::Custom("substack".to_string()).to_string(),
            "substack"
        );
    }

    #[test]
    fn test_source_serde() {
        let json = serde_json::to_string(&TrafficSource::Instagram).unwrap();
        assert_eq!(json, "\"instagram\"");
        let parsed: TrafficSource = serde_json::from_str("\"Pinterest\"").unwrap();
        assert_eq!(parsed, TrafficSource::Pinterest);
    }

    #[test]
    fn test_detect_missing_referer() {
        let p = SourcePrecedence::FixedFirst;
        assert_eq!(detect_source(None, &[], p), TrafficSource::Direct);
        assert_eq!(detect_source(Some(""), &[], p), TrafficSource::Direct);
        assert_eq!(detect_source(Some("   "), &[], p), TrafficSource::Direct);
    }

    #[test]
    fn test_detect_fixed_platforms() {
        let p = SourcePrecedence::FixedFirst;
        let cases = [
            ("https://www.tiktok.com/@someone", TrafficSource::TikTok),
            ("https://l.instagram.com/?u=abc", TrafficSource::Instagram),
            ("https://ig.me/m/someone", TrafficSource::Instagram),
            ("https://www.youtube.com/watch?v=1", TrafficSource::YouTube),
            ("https://youtu.be/abc", TrafficSource::YouTube),
            ("https://t.co/x.com/abc", TrafficSource::Twitter),
            ("https://twitter.com/someone", TrafficSource::Twitter),
            ("https://www.google.com/", TrafficSource::Google),
            ("https://www.google.co.uk/", TrafficSource::Google),
            ("https://www.google.de/search", TrafficSource::Google),
            ("https://m.facebook.com/", TrafficSource::Facebook),
            ("https://www.linkedin.com/feed", TrafficSource::LinkedIn),
            ("https://www.pinterest.com/pin/1", TrafficSource::Pinterest),
            ("https://www.snapchat.com/add/x", TrafficSource::Snapchat),
        ];
        for (referer, expected) in cases {
            assert_eq!(detect_source(Some(referer), &[], p), expected, "{referer}");
        }
    }

    #[test]
    fn test_detect_case_insensitive() {
        assert_eq!(
            detect_source(Some("HTTPS://WWW.TIKTOK.COM/"), &[], SourcePrecedence::FixedFirst),
            TrafficSource::TikTok
        );
    }

    #[test]
    fn test_detect_unknown_is_direct() {
        assert_eq!(
            detect_source(Some("https://example.org/"), &[], SourcePrecedence::FixedFirst),
            TrafficSource::Direct
        );
    }

    #[test]
    fn test_detect_first_match_wins() {
        // Both tiktok.com and youtube.com appear; tiktok is earlier in the list.
        let referer = "https://youtube.com/redirect?q=https://tiktok.com";
        assert_eq!(
            detect_source(Some(referer), &[], SourcePrecedence::FixedFirst),
            TrafficSource::TikTok
        );
    }

    #[test]
    fn test_detect_custom_sources() {
        let custom = vec![
            CustomTrafficSource::new("Newsletter", ["substack.com"]),
            CustomTrafficSource::new("Forum", ["reddit.com"]),
        ];
        assert_eq!(
            detect_source(
                Some("https://someone.substack.com/p/1"),
                &custom,
                SourcePrecedence::FixedFirst
            ),
            TrafficSource::Custom("newsletter".to_string())
        );
        assert_eq!(
            detect_source(Some("https://reddit.com/r/x"), &custom, SourcePrecedence::FixedFirst),
            TrafficSource::Custom("forum".to_string())
        );
    }

    #[test]
    fn test_detect_precedence() {
        let custom = vec![CustomTrafficSource::new("Shorts", ["youtube.com/shorts"])];
        let referer = Some("https://www.youtube.com/shorts/abc");

        assert_eq!(
            detect_source(referer, &custom, SourcePrecedence::FixedFirst),
            TrafficSource::YouTube
        );
        assert_eq!(
            detect_source(referer, &custom, SourcePrecedence::CustomFirst),
            TrafficSource::Custom("shorts".to_string())
        );
    }

    #[test]
    fn test_custom_source_ignores_empty_domains() {
        let source = CustomTrafficSource::new("Broken", [""]);
        assert!(!source.matches("https://anything.com"));
    }

    #[test]
    fn test_source_from_utm() {
        let custom = vec![CustomTrafficSource::new("Newsletter", ["substack.com"])];
        assert_eq!(source_from_utm("tiktok", &custom), Some(TrafficSource::TikTok));
        assert_eq!(
            source_from_utm("NEWSLETTER", &custom),
            Some(TrafficSource::Custom("newsletter".to_string()))
        );
        assert_eq!(source_from_utm("spam-campaign", &custom), None);
        assert_eq!(source_from_utm("", &custom), None);
        assert_eq!(source_from_utm("direct", &custom), None);
    }

    #[test]
    fn test_link_domains() {
        assert!(TrafficSource::Facebook.link_domains().contains(&"fb.com"));
        assert!(TrafficSource::Google.link_domains().is_empty());
        assert!(TrafficSource::Direct.link_domains().is_empty());
    }
}
