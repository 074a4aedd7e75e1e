//! Hooks for watching rule evaluation.

use crate::rule::SmartRule;
use crate::traffic::TrafficInfo;

/// Something that happened while personalizing one page view.
#[derive(Debug, Clone, Copy)]
pub enum EvaluationEvent<'a> {
    /// An active rule's conditions were checked
    RuleEvaluated {
        rule: &'a SmartRule,
        matched: bool,
        info: &'a TrafficInfo,
    },
    /// The source-based fallback reorder ran
    AutoReorder { info: &'a TrafficInfo },
}

/// Receives evaluation events.
///
/// Closures taking `&EvaluationEvent` implement this directly.
pub trait EvaluationObserver: Send + Sync {
    fn on_event(&self, event: &EvaluationEvent<'_>);
}

impl<F> EvaluationObserver for F
where
    F: Fn(&EvaluationEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: &EvaluationEvent<'_>) {
        self(event)
    }
}

/// Routes events to `log::debug!`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl EvaluationObserver for LogObserver {
    fn on_event(&self, event: &EvaluationEvent<'_>) {
        match event {
            EvaluationEvent::RuleEvaluated {
                rule,
                matched,
                info,
            } => log::debug!(
                "rule {:?} (priority {}) matched={} action={} source={} device={} visitor={}",
                rule.name,
                rule.priority,
                matched,
                rule.actions.kind(),
                info.source,
                info.device,
                info.visitor_type
            ),
            EvaluationEvent::AutoReorder { info } => {
                log::debug!("auto-reorder for source {}", info.source)
            }
        }
    }
}

/// Discards events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl EvaluationObserver for NoopObserver {
    fn on_event(&self, _event: &EvaluationEvent<'_>) {}
}
