//! Smart rules owned by a page.

use serde::{Deserialize, Serialize};

use crate::action::RuleAction;
use crate::condition::RuleCondition;
use crate::error::ValidationError;
use crate::traffic::TrafficInfo;

fn default_active() -> bool {
    true
}

/// A page owner's personalization rule.
///
/// Higher `priority` runs first. Inactive rules are ignored entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartRule {
    pub id: String,
    pub name: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub conditions: RuleCondition,
    pub actions: RuleAction,
}

impl SmartRule {
    /// Create an active rule with priority 0 that matches everyone.
    pub fn new(id: impl Into<String>, name: impl Into<String>, actions: RuleAction) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_active: true,
            priority: 0,
            conditions: RuleCondition::default(),
            actions,
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_conditions(mut self, conditions: RuleCondition) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn matches(&self, info: &TrafficInfo) -> bool {
        self.conditions.matches(info)
    }

    /// Check the rule's shape before it is stored.
    ///
    /// Evaluation tolerates everything this rejects; a rule that fails here
    /// would only ever be a silent no-op or never match.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if let Some(range) = &self.conditions.time_range {
            range.validate()?;
        }
        if let Some(days) = &self.conditions.day_of_week {
            if let Some(&bad) = days.iter().find(|d| !(0..=6).contains(*d)) {
                return Err(ValidationError::DayOfWeek(bad));
            }
        }
        self.actions.validate()
    }
}
