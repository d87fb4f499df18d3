//! Boolean filter tree consumed by the store.
//!
//! The tree is built by the caller (UI widgets, CLI flags, a JSON file) and is
//! only inspected here. Translation to SQL lives in `timeline-store`.

use crate::types::{EventType, KnownState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Matches every event.
    #[default]
    All,
    /// Events whose sub type or base type is listed.
    Type { types: BTreeSet<EventType> },
    KnownState { states: BTreeSet<KnownState> },
    /// Only tagged events.
    Tagged,
    /// Events that hit at least one of the named hash sets.
    HashSet { names: BTreeSet<String> },
    DataSource { ids: BTreeSet<i64> },
    /// Case-insensitive substring match on any description level.
    Text { text: String },
    /// Logical AND. Empty matches everything.
    Intersection(Vec<Filter>),
    /// Logical OR. Empty matches nothing.
    Union(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn types<I, T>(types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<EventType>,
    {
        Filter::Type {
            types: types.into_iter().map(Into::into).collect(),
        }
    }

    pub fn hash_sets<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Filter::HashSet {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Filter::Text { text: text.into() }
    }

    pub fn and(self, other: Filter) -> Self {
        match self {
            Filter::Intersection(mut parts) => {
                parts.push(other);
                Filter::Intersection(parts)
            }
            first => Filter::Intersection(vec![first, other]),
        }
    }

    /// Whether any node refers to hash-set membership, which means queries
    /// must join the hash-hit relation.
    pub fn references_hash_sets(&self) -> bool {
        match self {
            Filter::HashSet { .. } => true,
            Filter::Intersection(parts) | Filter::Union(parts) => {
                parts.iter().any(Filter::references_hash_sets)
            }
            Filter::Not(inner) => inner.references_hash_sets(),
            _ => false,
        }
    }

    /// Load a filter tree from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
