//! Smartblock - traffic-based personalization of link-in-bio blocks.
//!
//! This crate decides, per visitor, which link blocks a page shows and in
//! what order, using the page owner's smart rules.
//!
//! # Features
//!
//! - **Traffic classification**: Source (referer, `utm_source`, custom
//!   platforms), device, time of day, weekday and returning visitors
//! - **Smart rules**: Conjunctive conditions with show, hide and reorder
//!   actions, applied in priority order
//! - **Auto-reorder**: Links to the platform a visitor came from move to
//!   the top when no reorder rule fired
//! - **Hot reload**: Per-page rule stores can be replaced while serving
//! - **Thread-safe**: Evaluation is pure; stores are shared across threads
//!
//! # Quick Start
//!
//! ```ignore
//! use smartblock::{classify, personalize, LinkBlock, RuleAction, SmartRule, RuleCondition};
//!
//! let blocks = vec![
//!     LinkBlock::with_url("site", "https://example.com"),
//!     LinkBlock::with_url("tiktok", "https://tiktok.com/@me"),
//! ];
//! let rules = vec![
//!     SmartRule::new("r1", "Hide shop on desktop", RuleAction::hide(["shop"]))
//!         .with_conditions(RuleCondition::any().devices(["desktop"])),
//! ];
//!
//! let info = classify(Some("https://www.tiktok.com/"), Some(user_agent), false, &[]);
//! let ordered = personalize(&blocks, &rules, &info, &[]);
//! ```
//!
//! # Per-page stores
//!
//! Request handlers usually keep one [`RuleStore`] per page, or use the
//! process-wide registry:
//!
//! ```ignore
//! use smartblock::{load_page, personalize_page, RequestSignals, RuleBook};
//!
//! load_page("alice", RuleBook::from_path(Path::new("alice.yaml"))?);
//!
//! let signals = RequestSignals::new().referer(referer).user_agent(ua).returning(seen);
//! let ordered = personalize_page("alice", &blocks, &signals);
//! ```
//!
//! # Evaluation Order
//!
//! 1. Inactive rules are dropped
//! 2. Active rules run by priority, highest first (ties keep input order)
//! 3. Each matching rule acts on the previous rule's output
//! 4. Source-based auto-reorder, unless a matching reorder rule exists or
//!    the visitor is direct

mod error;
mod global;

pub mod action;
pub mod block;
pub mod condition;
pub mod device;
pub mod engine;
pub mod reorder;
pub mod rule;
pub mod rulebook;
pub mod source;
pub mod store;
pub mod traffic;

// Re-export core types
pub use action::{apply, BlockRef, RuleAction};
pub use block::{Block, LinkBlock};
pub use condition::{matches, matches_time_range, RuleCondition, TimeRange};
pub use device::Device;
pub use error::{Error, Result, TimeRangeError, ValidationError};
pub use reorder::auto_reorder;
pub use rule::SmartRule;
pub use source::{CustomTrafficSource, SourcePrecedence, TrafficSource};
pub use traffic::{classify, RequestSignals, TimeInfo, TrafficClassifier, TrafficInfo, VisitorType};

// Re-export engine types
pub use engine::{
    personalize, EngineConfig, EvaluationEvent, EvaluationObserver, LogObserver, NoopObserver,
    PersonalizeOutcome, RuleEngine,
};

// Re-export rule documents and stores
pub use rulebook::RuleBook;
pub use store::{CacheStats, RuleStore};

// Re-export global API functions
pub use global::{
    is_page_loaded, load_page, load_page_with_config, loaded_pages, page_store, personalize_page,
    unload_page,
};
