//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::source::SourcePrecedence;

/// Default capacity of the referer classification cache.
const DEFAULT_SOURCE_CACHE_CAPACITY: usize = 10_000;

/// Configuration for a [`RuleEngine`](super::RuleEngine) and the stores
/// built on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Promote blocks linking to the visitor's source when no reorder
    /// rule matched
    pub auto_reorder: bool,
    /// Whether built-in or custom sources are checked first
    pub source_precedence: SourcePrecedence,
    /// Maximum number of cached referer classifications (0 disables)
    pub source_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            auto_reorder: true,
            source_precedence: SourcePrecedence::FixedFirst,
            source_cache_capacity: DEFAULT_SOURCE_CACHE_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Only explicit rules change the order.
    pub fn no_auto_reorder() -> Self {
        Self {
            auto_reorder: false,
            ..Self::default()
        }
    }

    /// Default configuration with caching disabled.
    pub fn no_cache() -> Self {
        Self {
            source_cache_capacity: 0,
            ..Self::default()
        }
    }

    pub fn with_precedence(mut self, precedence: SourcePrecedence) -> Self {
        self.source_precedence = precedence;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.source_cache_capacity = capacity;
        self
    }
}
