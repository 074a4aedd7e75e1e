//! Link blocks as seen by the rule engine.

use serde::{Deserialize, Serialize};

/// What the engine needs from a displayed block.
///
/// Storage records implement this directly so the engine can reorder them
/// without copying into an intermediate type.
pub trait Block {
    /// Stable block identifier.
    fn id(&self) -> &str;

    /// Link target, if the block has one.
    fn url(&self) -> Option<&str>;
}

impl<B: Block + ?Sized> Block for &B {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn url(&self) -> Option<&str> {
        (**self).url()
    }
}

/// Minimal concrete block.
///
/// Display fields the engine does not look at are kept in `extra` so a
/// block survives a load/personalize/render round trip unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkBlock {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl LinkBlock {
    pub fn new(id: impl Into<String>, url: Option<&str>) -> Self {
        Self {
            id: id.into(),
            url: url.map(str::to_string),
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_url(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: Some(url.into()),
            extra: serde_json::Map::new(),
        }
    }
}

impl Block for LinkBlock {
    fn id(&self) -> &str {
        &self.id
    }

    fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}
