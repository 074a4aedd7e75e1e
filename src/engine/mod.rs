//! Rule pipeline: priority ordering, folding matched actions, fallback
//! reorder.

mod config;
mod observer;

pub use config::EngineConfig;
pub use observer::{EvaluationEvent, EvaluationObserver, LogObserver, NoopObserver};

use std::sync::Arc;

use crate::block::Block;
use crate::reorder::auto_reorder;
use crate::rule::SmartRule;
use crate::source::CustomTrafficSource;
use crate::traffic::TrafficInfo;

/// Result of personalizing one page view.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonalizeOutcome<B> {
    /// Blocks in display order
    pub blocks: Vec<B>,
    /// Ids of the rules whose actions were applied, in application order
    pub matched_rules: Vec<String>,
    /// Whether the source-based fallback reorder ran
    pub auto_reordered: bool,
    /// The visitor the rules were evaluated for
    pub traffic: TrafficInfo,
}

/// Applies a page's smart rules to its blocks for one visitor.
///
/// Evaluation is pure: the engine holds no per-request state and the same
/// engine can serve any number of threads.
///
/// # Order of evaluation
/// 1. Inactive rules are dropped.
/// 2. Active rules are sorted by priority, highest first. Equal priorities
///    keep the order they were given in.
/// 3. Each matching rule's action is applied to the output of the previous
///    one.
/// 4. If no active matching rule is a reorder and the visitor is not
///    direct, blocks linking to the visitor's source move to the top.
#[derive(Clone)]
pub struct RuleEngine {
    config: EngineConfig,
    observer: Arc<dyn EvaluationObserver>,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RuleEngine {
    /// Create an engine that logs evaluation at debug level.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            observer: Arc::new(LogObserver),
        }
    }

    /// Replace the evaluation observer.
    pub fn with_observer(mut self, observer: impl EvaluationObserver + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Personalize `blocks` and report what happened.
    pub fn evaluate<B: Block + Clone>(
        &self,
        blocks: &[B],
        rules: &[SmartRule],
        info: &TrafficInfo,
        custom_sources: &[CustomTrafficSource],
    ) -> PersonalizeOutcome<B> {
        let mut active: Vec<&SmartRule> = rules.iter().filter(|r| r.is_active).collect();
        // Stable, so ties keep input order.
        active.sort_by(|a, b| b.priority.cmp(&a.priority));

        let mut result = blocks.to_vec();
        let mut matched_rules = Vec::new();

        for &rule in active.iter() {
            let matched = rule.matches(info);
            self.observer.on_event(&EvaluationEvent::RuleEvaluated {
                rule,
                matched,
                info,
            });
            if matched {
                result = rule.actions.apply(&result);
                matched_rules.push(rule.id.clone());
            }
        }

        let has_reorder_rule = active
            .iter()
            .any(|r| r.matches(info) && r.actions.is_reorder());

        let mut auto_reordered = false;
        if self.config.auto_reorder && !has_reorder_rule && !info.source.is_direct() {
            self.observer
                .on_event(&EvaluationEvent::AutoReorder { info });
            result = auto_reorder(&result, &info.source, custom_sources);
            auto_reordered = true;
        }

        PersonalizeOutcome {
            blocks: result,
            matched_rules,
            auto_reordered,
            traffic: info.clone(),
        }
    }

    /// Personalize `blocks` for the visitor described by `info`.
    pub fn personalize<B: Block + Clone>(
        &self,
        blocks: &[B],
        rules: &[SmartRule],
        info: &TrafficInfo,
        custom_sources: &[CustomTrafficSource],
    ) -> Vec<B> {
        self.evaluate(blocks, rules, info, custom_sources).blocks
    }
}

/// Personalize with the default engine.
pub fn personalize<B: Block + Clone>(
    blocks: &[B],
    rules: &[SmartRule],
    info: &TrafficInfo,
    custom_sources: &[CustomTrafficSource],
) -> Vec<B> {
    RuleEngine::default().personalize(blocks, rules, info, custom_sources)
}
