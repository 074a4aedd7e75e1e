//! Per-page rule store with hot reload support.
//!
//! This module provides the object a request handler keeps per page:
//! - The current rulebook, atomically replaceable while requests are in
//!   flight
//! - A bounded cache of referer classifications
//! - The engine used to personalize each page view

use arc_swap::ArcSwap;
use chrono::{DateTime, Local, TimeZone};
use quick_cache::sync::Cache;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::block::Block;
use crate::engine::{EngineConfig, PersonalizeOutcome, RuleEngine};
use crate::rulebook::RuleBook;
use crate::traffic::{RequestSignals, TimeInfo, TrafficClassifier, TrafficInfo};
use crate::{Result, TrafficSource};

/// A rulebook together with the classifier built from its custom sources
/// and the source cache filled by that classifier.
///
/// The cache lives here so a reload swaps it together with the classifier.
/// A reader still holding the old snapshot can only fill the old cache.
struct Loaded {
    book: Arc<RuleBook>,
    classifier: TrafficClassifier,
    /// Cache of (referer, utm_source) -> detected source.
    source_cache: Option<Cache<u64, TrafficSource>>,
}

impl Loaded {
    fn new(book: RuleBook, config: &EngineConfig) -> Self {
        let classifier = TrafficClassifier::new(book.custom_sources.clone())
            .with_precedence(config.source_precedence);
        let source_cache = if config.source_cache_capacity > 0 {
            Some(Cache::new(config.source_cache_capacity))
        } else {
            None
        };
        Self {
            book: Arc::new(book),
            classifier,
            source_cache,
        }
    }

    fn detect_source(&self, signals: &RequestSignals) -> TrafficSource {
        let referer = signals.referer.as_deref();
        let utm = signals.utm_source.as_deref();

        let Some(cache) = &self.source_cache else {
            return self.classifier.detect_source(referer, utm);
        };

        let key = cache_key(referer, utm);
        if let Some(source) = cache.get(&key) {
            return source;
        }

        let source = self.classifier.detect_source(referer, utm);
        cache.insert(key, source.clone());
        source
    }

    fn classify_at<Tz: TimeZone>(
        &self,
        signals: &RequestSignals,
        at: &DateTime<Tz>,
    ) -> TrafficInfo {
        let source = self.detect_source(signals);
        self.classifier.build(source, signals, TimeInfo::from_datetime(at))
    }
}

fn cache_key(referer: Option<&str>, utm_source: Option<&str>) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = ahash::AHasher::default();
    referer.map(str::to_lowercase).hash(&mut hasher);
    utm_source.map(str::to_lowercase).hash(&mut hasher);
    hasher.finish()
}

/// Rule store for one page.
///
/// # Example
///
/// ```ignore
/// use smartblock::{RequestSignals, RuleStore, EngineConfig};
/// use std::path::Path;
///
/// let store = RuleStore::open(Path::new("rules.yaml"), EngineConfig::default())?;
///
/// let signals = RequestSignals::new().referer("https://www.tiktok.com/");
/// let blocks = store.personalize(&blocks, &signals);
///
/// // Owner edited their rules
/// store.reload_from_path(Path::new("rules.yaml"))?;
/// ```
pub struct RuleStore {
    /// Current rulebook and source cache, wrapped in ArcSwap for atomic
    /// replacement.
    inner: ArcSwap<Loaded>,
    engine: RuleEngine,
    /// Generation counter, incremented on each reload.
    generation: AtomicU64,
}

impl RuleStore {
    /// Create a store with the default logging engine.
    pub fn new(book: RuleBook, config: EngineConfig) -> Self {
        Self::with_engine(book, RuleEngine::new(config))
    }

    /// Create a store around an existing engine (e.g. one with a custom
    /// observer).
    pub fn with_engine(book: RuleBook, engine: RuleEngine) -> Self {
        warn_problems(&book);
        Self {
            inner: ArcSwap::from_pointee(Loaded::new(book, engine.config())),
            engine,
            generation: AtomicU64::new(0),
        }
    }

    /// Load a rule document from disk.
    pub fn open(path: &Path, config: EngineConfig) -> Result<Self> {
        let book = RuleBook::from_path(path)?;
        log::info!("Loaded {} rules from {:?}", book.rules.len(), path);
        Ok(Self::new(book, config))
    }

    /// Replace the rulebook.
    ///
    /// In-flight evaluations finish with the old rules and the old source
    /// cache; new ones use the replacement and start from an empty cache,
    /// since custom sources may have changed.
    pub fn reload(&self, book: RuleBook) {
        warn_problems(&book);
        let count = book.rules.len();
        self.inner.store(Arc::new(Loaded::new(book, self.engine.config())));

        self.generation.fetch_add(1, Ordering::SeqCst);

        log::info!("Hot reloaded {} rules", count);
    }

    /// Replace the rulebook from a document on disk.
    pub fn reload_from_path(&self, path: &Path) -> Result<()> {
        let book = RuleBook::from_path(path)?;
        self.reload(book);
        Ok(())
    }

    /// Current rulebook. May become stale after a reload.
    pub fn rulebook(&self) -> Arc<RuleBook> {
        Arc::clone(&self.inner.load().book)
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    /// Classify a request as if it arrived at `at`, caching source detection.
    pub fn classify_at<Tz: TimeZone>(
        &self,
        signals: &RequestSignals,
        at: &DateTime<Tz>,
    ) -> TrafficInfo {
        self.inner.load().classify_at(signals, at)
    }

    /// Classify a request using the local clock.
    pub fn classify(&self, signals: &RequestSignals) -> TrafficInfo {
        self.classify_at(signals, &Local::now())
    }

    /// Personalize for a request that arrived at `at`.
    pub fn evaluate_at<B: Block + Clone, Tz: TimeZone>(
        &self,
        blocks: &[B],
        signals: &RequestSignals,
        at: &DateTime<Tz>,
    ) -> PersonalizeOutcome<B> {
        let loaded = self.inner.load();
        let info = loaded.classify_at(signals, at);
        self.engine.evaluate(blocks, &loaded.book.rules, &info, &loaded.book.custom_sources)
    }

    /// Personalize for a request arriving now.
    pub fn evaluate<B: Block + Clone>(
        &self,
        blocks: &[B],
        signals: &RequestSignals,
    ) -> PersonalizeOutcome<B> {
        self.evaluate_at(blocks, signals, &Local::now())
    }

    /// Personalize for a request arriving now, returning only the blocks.
    pub fn personalize<B: Block + Clone>(&self, blocks: &[B], signals: &RequestSignals) -> Vec<B> {
        self.evaluate(blocks, signals).blocks
    }

    /// Clear the current source cache.
    pub fn clear_cache(&self) {
        if let Some(ref cache) = self.inner.load().source_cache {
            cache.clear();
        }
    }

    /// Get statistics for the current source cache.
    pub fn cache_stats(&self) -> CacheStats {
        match &self.inner.load().source_cache {
            Some(cache) => CacheStats {
                capacity: self.engine.config().source_cache_capacity,
                len: cache.len(),
                enabled: true,
            },
            None => CacheStats {
                capacity: 0,
                len: 0,
                enabled: false,
            },
        }
    }

    /// Get the current generation (incremented on each reload).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

fn warn_problems(book: &RuleBook) {
    for (label, problem) in book.problems() {
        log::warn!("Rule {:?} will be evaluated as-is: {}", label, problem);
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    /// Maximum cache capacity.
    pub capacity: usize,
    /// Current number of entries in the cache.
    pub len: usize,
    /// Whether caching is enabled.
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::RuleAction;
    use crate::block::LinkBlock;
    use crate::condition::RuleCondition;
    use crate::rule::SmartRule;
    use crate::source::CustomTrafficSource;
    use chrono::Utc;

    fn book() -> RuleBook {
        RuleBook::new(
            vec![SmartRule::new("r", "Hide promo for returning", RuleAction::hide(["promo"]))
                .with_conditions(RuleCondition::any().visitor(crate::VisitorType::Returning))],
            vec![CustomTrafficSource::new("Newsletter", ["substack.com"])],
        )
    }

    fn blocks() -> Vec<LinkBlock> {
        vec![
            LinkBlock::with_url("promo", "https://example.com/sale"),
            LinkBlock::with_url("news", "https://me.substack.com"),
        ]
    }

    fn ids(blocks: &[LinkBlock]) -> Vec<&str> {
        blocks.iter().map(|b| b.id.as_str()).collect()
    }

    #[test]
    fn test_store_evaluate() {
        let store = RuleStore::new(book(), EngineConfig::default());
        let at = Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap();

        let signals = RequestSignals::new().referer("https://me.substack.com/p/1");
        let outcome = store.evaluate_at(&blocks(), &signals, &at);
        assert_eq!(ids(&outcome.blocks), ["news", "promo"]);
        assert!(outcome.auto_reordered);

        let signals = signals.returning(true);
        let outcome = store.evaluate_at(&blocks(), &signals, &at);
        assert_eq!(ids(&outcome.blocks), ["news"]);
        assert_eq!(outcome.matched_rules, ["r"]);
    }

    #[test]
    fn test_cache_hit() {
        let store = RuleStore::new(book(), EngineConfig::default());
        let signals = RequestSignals::new().referer("https://www.tiktok.com/");

        assert_eq!(store.classify(&signals).source, TrafficSource::TikTok);
        assert_eq!(store.cache_stats().len, 1);

        assert_eq!(store.classify(&signals).source, TrafficSource::TikTok);
        assert_eq!(store.cache_stats().len, 1);
    }

    #[test]
    fn test_hot_reload() {
        let store = RuleStore::new(book(), EngineConfig::default());
        let signals = RequestSignals::new().referer("https://me.substack.com/");
        assert_eq!(
            store.classify(&signals).source,
            TrafficSource::Custom("newsletter".to_string())
        );
        assert_eq!(store.generation(), 0);

        store.reload(RuleBook::default());

        assert_eq!(store.generation(), 1);
        assert_eq!(store.cache_stats().len, 0);
        assert_eq!(store.classify(&signals).source, TrafficSource::Direct);
        assert!(store.rulebook().rules.is_empty());
    }

    #[test]
    fn test_late_reader_cannot_repopulate_new_cache() {
        let store = RuleStore::new(book(), EngineConfig::default());
        let signals = RequestSignals::new().referer("https://me.substack.com/");

        // A reader that loaded its snapshot just before the reload.
        let old = store.inner.load_full();
        store.reload(RuleBook::default());
        assert_eq!(
            old.detect_source(&signals),
            TrafficSource::Custom("newsletter".to_string())
        );

        assert_eq!(store.cache_stats().len, 0);
        assert_eq!(store.classify(&signals).source, TrafficSource::Direct);
    }

    #[test]
    fn test_old_snapshot_survives_reload() {
        let store = RuleStore::new(book(), EngineConfig::default());
        let before = store.rulebook();
        store.reload(RuleBook::default());
        assert_eq!(before.rules.len(), 1);
        assert!(store.rulebook().rules.is_empty());
    }

    #[test]
    fn test_no_cache_config() {
        let store = RuleStore::new(book(), EngineConfig::no_cache());
        let _ = store.classify(&RequestSignals::new().referer("https://youtu.be/x"));
        let stats = store.cache_stats();
        assert!(!stats.enabled);
        assert_eq!(stats.len, 0);
    }

    #[test]
    fn test_custom_capacity() {
        let store = RuleStore::new(book(), EngineConfig::default().with_cache_capacity(100));
        let stats = store.cache_stats();
        assert!(stats.enabled);
        assert_eq!(stats.capacity, 100);
    }
}
