//! Canon table and adjacency validation
//!
//! The 7-token cycle is defined exactly once, in `CANON`. Validators borrow it;
//! nothing copies or overrides the entries.
//!
//! Adjacency law: delta = (to - from + 7) % 7 must be 1 or 6.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{
    AdjacencyRule, CodexError, ColorToken, ExecutionTrace, GrayEvent, SequenceItem,
    StepDirection, StepTrace,
};
use crate::{CANON_MODULUS, CANON_VALID_DELTAS, CANON_VERSION};

const fn token(
    index: u8,
    symbol: &'static str,
    name: &'static str,
    operator: &'static str,
) -> ColorToken {
    ColorToken { index, symbol, name, operator }
}

/// The canon: process-wide, read-only
pub static CANON: CanonTable = CanonTable {
    version: CANON_VERSION,
    tokens: [
        token(0, "⚫", "Black", "CUT"),
        token(1, "⚪", "White", "FRAME"),
        token(2, "🟡", "Yellow", "SPARK"),
        token(3, "🟤", "Brown", "GROUND"),
        token(4, "🔴", "Red", "PULSE"),
        token(5, "🟢", "Green", "WEAVE"),
        token(6, "🔵", "Blue", "RETURN"),
    ],
    rule: AdjacencyRule {
        modulus: CANON_MODULUS,
        valid_deltas: CANON_VALID_DELTAS,
    },
};

/// Ordered 7-token cycle plus its adjacency rule
#[derive(Debug, PartialEq, Eq)]
pub struct CanonTable {
    version: &'static str,
    tokens: [ColorToken; 7],
    rule: AdjacencyRule,
}

/// Serializable form of a canon definition (as kept in canon.json files)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonDefinition {
    pub version: String,
    pub colors: Vec<CanonEntry>,
    pub adjacency: AdjacencyRule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonEntry {
    pub index: u8,
    pub symbol: String,
    pub name: String,
    pub operator: String,
}

impl CanonTable {
    /// The built-in canon
    pub fn canonical() -> &'static CanonTable {
        &CANON
    }

    pub fn version(&self) -> &'static str {
        self.version
    }

    pub fn rule(&self) -> &AdjacencyRule {
        &self.rule
    }

    pub fn tokens(&self) -> &[ColorToken] {
        &self.tokens
    }

    /// Token at `index`, taken modulo 7
    pub fn symbol_at(&self, index: usize) -> &ColorToken {
        &self.tokens[index % self.tokens.len()]
    }

    /// Token for an in-range index, `None` otherwise
    pub fn get(&self, index: u8) -> Option<&ColorToken> {
        self.tokens.get(index as usize)
    }

    /// Resolve a symbol, color name or operator name (names are case-insensitive)
    pub fn index_of(&self, name_or_symbol: &str) -> Result<u8, CodexError> {
        let needle = name_or_symbol.trim();
        self.tokens
            .iter()
            .find(|t| {
                t.symbol == needle
                    || t.name.eq_ignore_ascii_case(needle)
                    || t.operator.eq_ignore_ascii_case(needle)
            })
            .map(|t| t.index)
            .ok_or_else(|| CodexError::UnknownToken(needle.to_string()))
    }

    /// Token whose operator name matches
    pub fn operator(&self, operator: &str) -> Option<&ColorToken> {
        self.tokens.iter().find(|t| t.operator == operator)
    }

    /// Export as a serializable definition
    pub fn definition(&self) -> CanonDefinition {
        CanonDefinition {
            version: self.version.to_string(),
            colors: self
                .tokens
                .iter()
                .map(|t| CanonEntry {
                    index: t.index,
                    symbol: t.symbol.to_string(),
                    name: t.name.to_string(),
                    operator: t.operator.to_string(),
                })
                .collect(),
            adjacency: self.rule,
        }
    }

    /// Check an external canon.json against the built-in table
    ///
    /// Fails with `InvalidCanon` naming the first entry that drifted.
    pub fn verify_definition(&self, json: &str) -> Result<(), CodexError> {
        let external: CanonDefinition = serde_json::from_str(json)?;
        let ours = self.definition();

        if external.adjacency != ours.adjacency {
            return Err(CodexError::InvalidCanon(format!(
                "adjacency rule {:?} differs from {:?}",
                external.adjacency, ours.adjacency
            )));
        }
        if external.colors.len() != ours.colors.len() {
            return Err(CodexError::InvalidCanon(format!(
                "expected {} colors, found {}",
                ours.colors.len(),
                external.colors.len()
            )));
        }
        for (theirs, mine) in external.colors.iter().zip(&ours.colors) {
            if theirs != mine {
                return Err(CodexError::InvalidCanon(format!(
                    "entry {} is {:?}, expected {:?}",
                    mine.index, theirs, mine
                )));
            }
        }
        Ok(())
    }
}

/// Checks transitions and sequences against a canon table
#[derive(Debug, Clone, Copy)]
pub struct AdjacencyValidator<'a> {
    canon: &'a CanonTable,
}

impl Default for AdjacencyValidator<'static> {
    fn default() -> Self {
        Self::new(&CANON)
    }
}

impl<'a> AdjacencyValidator<'a> {
    pub fn new(canon: &'a CanonTable) -> Self {
        Self { canon }
    }

    pub fn canon(&self) -> &'a CanonTable {
        self.canon
    }

    /// Forward distance from `from` to `to` on the cycle
    pub fn delta(&self, from: u8, to: u8) -> u8 {
        let m = self.canon.rule.modulus as i16;
        ((to as i16 - from as i16).rem_euclid(m)) as u8
    }

    pub fn is_adjacent(&self, from: u8, to: u8) -> bool {
        self.canon.rule.valid_deltas.contains(&self.delta(from, to))
    }

    /// Validate a sequence of raw indices
    ///
    /// Indices outside the table become `unknown_token` events.
    pub fn validate_sequence(&self, seq: &[u8]) -> (bool, Vec<GrayEvent>) {
        let items: Vec<SequenceItem> = seq
            .iter()
            .map(|&t| match self.canon.get(t) {
                Some(_) => SequenceItem::Known(t),
                None => SequenceItem::Unknown(t.to_string()),
            })
            .collect();
        self.validate_items(&items)
    }

    /// Validate parsed items; collects every violation
    pub fn validate_items(&self, items: &[SequenceItem]) -> (bool, Vec<GrayEvent>) {
        let mut events = Vec::new();

        for (i, item) in items.iter().enumerate() {
            if let SequenceItem::Unknown(raw) = item {
                events.push(GrayEvent::unknown_token(i, raw));
            }
        }

        for (i, pair) in items.windows(2).enumerate() {
            // An unknown token cannot be judged on either side
            let (Some(from), Some(to)) = (pair[0].index(), pair[1].index()) else {
                continue;
            };
            if !self.is_adjacent(from, to) {
                let delta = self.delta(from, to);
                events.push(GrayEvent::adjacency_violation(
                    i,
                    from,
                    to,
                    delta,
                    self.canon.rule.valid_deltas,
                ));
            }
        }

        events.sort_by_key(|e| e.position);
        debug!(len = items.len(), violations = events.len(), "sequence validated");
        (events.is_empty(), events)
    }

    /// Record every transition of a sequence of known indices
    pub fn trace(&self, seq: &[u8]) -> ExecutionTrace {
        let mut trace = ExecutionTrace::default();
        for (i, pair) in seq.windows(2).enumerate() {
            let (from, to) = (pair[0], pair[1]);
            let delta = self.delta(from, to);
            let direction = match delta {
                0 => StepDirection::Hold,
                1 => StepDirection::Forward,
                d if d == self.canon.rule.modulus - 1 => StepDirection::Backward,
                _ => StepDirection::Jump,
            };
            trace.push(StepTrace {
                step: i,
                from,
                to,
                delta,
                direction,
                legal: self.is_adjacent(from, to),
            });
        }
        trace
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GrayKind;

    fn validator() -> AdjacencyValidator<'static> {
        AdjacencyValidator::default()
    }

    #[test]
    fn test_forward_and_backward_are_adjacent() {
        let v = validator();
        for i in 0..7u8 {
            assert!(v.is_adjacent(i, (i + 1) % 7), "forward from {}", i);
            assert!(v.is_adjacent(i, (i + 6) % 7), "backward from {}", i);
        }
    }

    #[test]
    fn test_wrap_around() {
        let v = validator();
        assert!(v.is_adjacent(6, 0));
        assert!(v.is_adjacent(0, 6));
    }

    #[test]
    fn test_self_transition_illegal() {
        let v = validator();
        for i in 0..7u8 {
            assert!(!v.is_adjacent(i, i));
        }
    }

    #[test]
    fn test_full_cycle_is_valid() {
        let (ok, events) = validator().validate_sequence(&[0, 1, 2, 3, 4, 5, 6, 0]);
        assert!(ok);
        assert!(events.is_empty());
    }

    #[test]
    fn test_skip_is_one_violation() {
        let (ok, events) = validator().validate_sequence(&[0, 2]);
        assert!(!ok);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, GrayKind::AdjacencyViolation);
        assert_eq!(events[0].delta, Some(2));
        assert_eq!(events[0].position, Some(0));
    }

    #[test]
    fn test_collects_all_violations() {
        let (ok, events) = validator().validate_sequence(&[0, 3, 3, 1]);
        assert!(!ok);
        let positions: Vec<_> = events.iter().map(|e| e.position).collect();
        assert_eq!(positions, vec![Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn test_unknown_token_excluded_from_pairing() {
        let (ok, events) = validator().validate_sequence(&[0, 9, 4]);
        assert!(!ok);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, GrayKind::UnknownToken);
        assert_eq!(events[0].position, Some(1));
    }

    #[test]
    fn test_empty_and_single_are_valid() {
        assert!(validator().validate_sequence(&[]).0);
        assert!(validator().validate_sequence(&[5]).0);
    }

    #[test]
    fn test_repetition_is_not_a_violation() {
        let (ok, _) = validator().validate_sequence(&[0, 1, 0, 1, 0, 1, 0]);
        assert!(ok);
    }

    #[test]
    fn test_index_of() {
        let canon = CanonTable::canonical();
        assert_eq!(canon.index_of("black").unwrap(), 0);
        assert_eq!(canon.index_of("🔵").unwrap(), 6);
        assert_eq!(canon.index_of("spark").unwrap(), 2);
        assert!(matches!(canon.index_of("Gray"), Err(CodexError::UnknownToken(_))));
    }

    #[test]
    fn test_symbol_at_wraps() {
        let canon = CanonTable::canonical();
        assert_eq!(canon.symbol_at(7).name, "Black");
        assert_eq!(canon.symbol_at(13).name, "Blue");
    }

    #[test]
    fn test_trace_directions() {
        let trace = validator().trace(&[0, 1, 0, 0, 3]);
        let dirs: Vec<_> = trace.steps.iter().map(|s| s.direction).collect();
        assert_eq!(
            dirs,
            vec![
                StepDirection::Forward,
                StepDirection::Backward,
                StepDirection::Hold,
                StepDirection::Jump
            ]
        );
        assert_eq!(trace.legal_steps, 2);
        assert_eq!(trace.illegal_steps, 2);
    }

    #[test]
    fn test_definition_round_trips_through_verify() {
        let canon = CanonTable::canonical();
        let json = serde_json::to_string(&canon.definition()).unwrap();
        assert!(canon.verify_definition(&json).is_ok());
    }

    #[test]
    fn test_verify_definition_detects_drift() {
        let canon = CanonTable::canonical();
        let mut def = canon.definition();
        def.colors[3].name = "Gray".to_string();
        let json = serde_json::to_string(&def).unwrap();
        assert!(matches!(
            canon.verify_definition(&json),
            Err(CodexError::InvalidCanon(_))
        ));
    }
}
