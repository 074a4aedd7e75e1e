//! Process-wide page registry and public convenience API.

use ahash::AHashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::block::Block;
use crate::engine::{personalize, EngineConfig};
use crate::rulebook::RuleBook;
use crate::store::RuleStore;
use crate::traffic::{RequestSignals, TrafficClassifier};

/// Loaded pages, keyed by page handle (e.g. username).
static PAGES: Lazy<RwLock<AHashMap<String, Arc<RuleStore>>>> =
    Lazy::new(|| RwLock::new(AHashMap::new()));

/// Load or hot reload a page's rules with the default configuration.
pub fn load_page(page: &str, book: RuleBook) {
    load_page_with_config(page, book, EngineConfig::default());
}

/// Load a page's rules.
///
/// An already loaded page is reloaded in place and keeps its original
/// configuration; `config` only applies to pages seen for the first time.
pub fn load_page_with_config(page: &str, book: RuleBook, config: EngineConfig) {
    if let Some(store) = PAGES.read().get(page) {
        store.reload(book);
        return;
    }

    let mut pages = PAGES.write();
    match pages.get(page) {
        // Lost a race with another loader.
        Some(store) => store.reload(book),
        None => {
            log::debug!("Loaded page {}", page);
            pages.insert(page.to_string(), Arc::new(RuleStore::new(book, config)));
        }
    }
}

/// Forget a page. Returns whether it was loaded.
pub fn unload_page(page: &str) -> bool {
    PAGES.write().remove(page).is_some()
}

/// Check if a page has rules loaded.
pub fn is_page_loaded(page: &str) -> bool {
    PAGES.read().contains_key(page)
}

/// Get a page's store.
pub fn page_store(page: &str) -> Option<Arc<RuleStore>> {
    PAGES.read().get(page).cloned()
}

/// Handles of all loaded pages, sorted.
pub fn loaded_pages() -> Vec<String> {
    let mut pages: Vec<String> = PAGES.read().keys().cloned().collect();
    pages.sort();
    pages
}

/// Personalize a page's blocks for the current request.
///
/// A page with no loaded rules still gets the source-based reorder.
///
/// # Examples
/// ```ignore
/// use smartblock::{personalize_page, RequestSignals};
///
/// let signals = RequestSignals::new().referer(referer).user_agent(ua);
/// let ordered = personalize_page("alice", &blocks, &signals);
/// ```
pub fn personalize_page<B: Block + Clone>(
    page: &str,
    blocks: &[B],
    signals: &RequestSignals,
) -> Vec<B> {
    match page_store(page) {
        Some(store) => store.personalize(blocks, signals),
        None => {
            let info = TrafficClassifier::default().classify(signals);
            personalize(blocks, &[], &info, &[])
        }
    }
}
