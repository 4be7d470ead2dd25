//! Canon token definitions

use serde::{Deserialize, Serialize};

/// One of the 7 canonical tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColorToken {
    /// Position on the cycle (0-6)
    pub index: u8,
    /// Display glyph, e.g. "⚫"
    pub symbol: &'static str,
    /// Color name, e.g. "Black"
    pub name: &'static str,
    /// Operator this token stands for when it dominates kernel state
    pub operator: &'static str,
}

impl std::fmt::Display for ColorToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}({})", self.symbol, self.name, self.index)
    }
}

/// Adjacency rule parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacencyRule {
    pub modulus: u8,
    pub valid_deltas: [u8; 2],
}

impl AdjacencyRule {
    /// Human-readable form for summaries
    pub fn describe(&self) -> String {
        format!(
            "delta in {:?} (mod {}): step forward or backward by one",
            self.valid_deltas, self.modulus
        )
    }
}

/// A single entry of a parsed sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceItem {
    /// Resolved canon index
    Known(u8),
    /// Raw text that resolved to nothing in the canon
    Unknown(String),
}

impl SequenceItem {
    pub fn index(&self) -> Option<u8> {
        match self {
            SequenceItem::Known(i) => Some(*i),
            SequenceItem::Unknown(_) => None,
        }
    }
}

/// Output of the token parser
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedSequence {
    pub items: Vec<SequenceItem>,
}

impl ParsedSequence {
    /// Known indices in order, unknown entries dropped
    pub fn known_indices(&self) -> Vec<u8> {
        self.items.iter().filter_map(SequenceItem::index).collect()
    }

    pub fn unknown_count(&self) -> usize {
        self.items.iter().filter(|i| i.index().is_none()).count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
