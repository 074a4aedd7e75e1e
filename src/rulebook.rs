//! Rule documents: a page's smart rules plus its custom traffic sources.
//!
//! Documents are YAML or JSON with the same camelCase shape the dashboard
//! stores:
//!
//! ```yaml
//! customSources:
//!   - name: Newsletter
//!     domains: [substack.com]
//! rules:
//!   - id: r1
//!     name: TikTok shop first
//!     priority: 10
//!     conditions:
//!       trafficSource: [tiktok]
//!     actions:
//!       type: reorder
//!       order: [shop]
//! ```

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result, ValidationError};
use crate::rule::SmartRule;
use crate::source::CustomTrafficSource;

/// Everything the engine needs to personalize one page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleBook {
    #[serde(default)]
    pub rules: Vec<SmartRule>,
    #[serde(default)]
    pub custom_sources: Vec<CustomTrafficSource>,
}

impl RuleBook {
    pub fn new(rules: Vec<SmartRule>, custom_sources: Vec<CustomTrafficSource>) -> Self {
        Self {
            rules,
            custom_sources,
        }
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Parse a JSON document.
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Parse a YAML (or JSON, which is valid YAML) document from a reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_yaml::from_reader(reader)?)
    }

    /// Load a document, picking the parser by file extension.
    ///
    /// `.json` is parsed as JSON; `.yaml` and `.yml` as YAML.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        let content = fs::read_to_string(path)?;

        match ext.as_str() {
            "json" => Self::from_json_str(&content),
            "yaml" | "yml" => Self::from_yaml_str(&content),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }

    /// Serialize as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rules with `isActive` set, in document order.
    pub fn active_rules(&self) -> impl Iterator<Item = &SmartRule> {
        self.rules.iter().filter(|r| r.is_active)
    }

    /// Find a rule by id.
    pub fn rule(&self, id: &str) -> Option<&SmartRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// Every validation problem in the document, labelled by rule id or
    /// source name.
    pub fn problems(&self) -> Vec<(String, ValidationError)> {
        let mut problems = Vec::new();
        let mut seen = AHashSet::new();

        for rule in &self.rules {
            if !seen.insert(rule.id.as_str()) {
                problems.push((rule.id.clone(), ValidationError::DuplicateId(rule.id.clone())));
            }
            if let Err(e) = rule.validate() {
                problems.push((rule.id.clone(), e));
            }
        }

        for source in &self.custom_sources {
            let name = source.name.trim();
            if name.is_empty() {
                problems.push((source.name.clone(), ValidationError::EmptySourceName));
            } else if source.domains.iter().all(|d| d.trim().is_empty()) {
                problems.push((
                    source.name.clone(),
                    ValidationError::EmptySourceDomains(name.to_string()),
                ));
            }
        }

        problems
    }

    /// Fail on the first validation problem.
    pub fn validate(&self) -> Result<()> {
        match self.problems().into_iter().next() {
            Some((rule, source)) => Err(Error::InvalidRule { rule, source }),
            None => Ok(()),
        }
    }
}
