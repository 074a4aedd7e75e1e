//! Rule actions and how they transform a block list.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::block::Block;
use crate::error::ValidationError;

/// Reference to a block id. Documents may store ids as strings or numbers;
/// numbers compare by their decimal form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockRef {
    Id(String),
    Number(i64),
}

impl BlockRef {
    /// The id string this reference matches.
    pub fn to_id(&self) -> String {
        match self {
            BlockRef::Id(id) => id.clone(),
            BlockRef::Number(n) => n.to_string(),
        }
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockRef::Id(id) => write!(f, "{}", id),
            BlockRef::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for BlockRef {
    fn from(id: &str) -> Self {
        BlockRef::Id(id.to_string())
    }
}

impl From<String> for BlockRef {
    fn from(id: String) -> Self {
        BlockRef::Id(id)
    }
}

impl From<i64> for BlockRef {
    fn from(n: i64) -> Self {
        BlockRef::Number(n)
    }
}

/// What a matching rule does to the block list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RuleAction {
    /// Keep only these blocks
    Show {
        #[serde(rename = "blockIds", default)]
        block_ids: Vec<BlockRef>,
    },
    /// Drop these blocks
    Hide {
        #[serde(rename = "blockIds", default)]
        block_ids: Vec<BlockRef>,
    },
    /// Put these blocks first, in this order
    Reorder {
        #[serde(default)]
        order: Vec<BlockRef>,
    },
    /// Any other `type`; does nothing
    #[serde(other)]
    Unknown,
}

impl RuleAction {
    pub fn show<I, R>(ids: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<BlockRef>,
    {
        RuleAction::Show {
            block_ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn hide<I, R>(ids: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<BlockRef>,
    {
        RuleAction::Hide {
            block_ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn reorder<I, R>(ids: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<BlockRef>,
    {
        RuleAction::Reorder {
            order: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// The action's `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            RuleAction::Show { .. } => "show",
            RuleAction::Hide { .. } => "hide",
            RuleAction::Reorder { .. } => "reorder",
            RuleAction::Unknown => "unknown",
        }
    }

    pub fn is_reorder(&self) -> bool {
        matches!(self, RuleAction::Reorder { .. })
    }

    /// Reject actions that would silently do nothing.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            RuleAction::Show { block_ids } if block_ids.is_empty() => {
                Err(ValidationError::EmptyBlockIds("show"))
            }
            RuleAction::Hide { block_ids } if block_ids.is_empty() => {
                Err(ValidationError::EmptyBlockIds("hide"))
            }
            RuleAction::Reorder { order } if order.is_empty() => Err(ValidationError::EmptyOrder),
            RuleAction::Unknown => Err(ValidationError::UnknownAction),
            _ => Ok(()),
        }
    }

    /// Apply this action to `blocks`, returning a new list.
    ///
    /// - `show` keeps the listed blocks in their current relative order.
    /// - `hide` drops the listed blocks.
    /// - `reorder` puts the listed blocks first in the given order, then
    ///   the rest in their current order. Each block is placed once.
    ///
    /// An empty id list, ids that match no block, and `Unknown` are no-ops
    /// for the affected entries. An empty `show` keeps everything.
    pub fn apply<B: Block + Clone>(&self, blocks: &[B]) -> Vec<B> {
        match self {
            RuleAction::Show { block_ids } if !block_ids.is_empty() => {
                let ids = id_set(block_ids);
                blocks
                    .iter()
                    .filter(|b| ids.contains(b.id()))
                    .cloned()
                    .collect()
            }
            RuleAction::Hide { block_ids } if !block_ids.is_empty() => {
                let ids = id_set(block_ids);
                blocks
                    .iter()
                    .filter(|b| !ids.contains(b.id()))
                    .cloned()
                    .collect()
            }
            RuleAction::Reorder { order } if !order.is_empty() => reorder(blocks, order),
            _ => blocks.to_vec(),
        }
    }
}

fn id_set(refs: &[BlockRef]) -> AHashSet<String> {
    refs.iter().map(BlockRef::to_id).collect()
}

fn reorder<B: Block + Clone>(blocks: &[B], order: &[BlockRef]) -> Vec<B> {
    // First occurrence of each id.
    let mut index: AHashMap<&str, usize> = AHashMap::with_capacity(blocks.len());
    for (i, block) in blocks.iter().enumerate() {
        index.entry(block.id()).or_insert(i);
    }

    let mut placed = vec![false; blocks.len()];
    let mut result = Vec::with_capacity(blocks.len());

    for r in order {
        let id = r.to_id();
        if let Some(&i) = index.get(id.as_str()) {
            if !placed[i] {
                placed[i] = true;
                result.push(blocks[i].clone());
            }
        }
    }

    result.extend(
        blocks
            .iter()
            .zip(&placed)
            .filter(|&(_, &p)| !p)
            .map(|(b, _)| b.clone()),
    );
    result
}

/// Apply `action` to `blocks`.
pub fn apply<B: Block + Clone>(blocks: &[B], action: &RuleAction) -> Vec<B> {
    action.apply(blocks)
}
