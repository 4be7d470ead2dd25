//! Token parser: turns file/stdin/API content into a sequence
//!
//! Accepted forms:
//! - JSON array of indices or names: `[0, 1, 2]`, `["Black", "White"]`
//! - Symbol run: `⚫⚪🟡🟤` (whitespace ignored)
//! - Names or indices separated by whitespace, commas or newlines

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::core::canon::CanonTable;
use crate::types::{CodexError, ParsedSequence, SequenceItem};

lazy_static! {
    static ref RE_SEPARATOR: Regex = Regex::new(r"[\s,;]+").unwrap();
    static ref RE_INTEGER: Regex = Regex::new(r"^-?\d+$").unwrap();
}

/// Emoji variation selector, often trailing ⚫ and ⚪
const VARIATION_SELECTOR: char = '\u{FE0F}';

/// Parse sequence content against a canon table
pub fn parse_tokens(content: &str, canon: &CanonTable) -> Result<ParsedSequence, CodexError> {
    let content = content.trim();
    if content.is_empty() {
        return Ok(ParsedSequence::default());
    }

    if content.starts_with('[') {
        return parse_json(content, canon);
    }

    if let Some(items) = parse_symbols(content, canon) {
        return Ok(ParsedSequence { items });
    }

    let items = RE_SEPARATOR
        .split(content)
        .filter(|w| !w.is_empty())
        .map(|word| resolve_word(word, canon))
        .collect();
    Ok(ParsedSequence { items })
}

/// Parse a JSON value that is already an array (API bodies)
pub fn parse_json_values(values: &[Value], canon: &CanonTable) -> ParsedSequence {
    let items = values
        .iter()
        .map(|v| match v {
            Value::Number(n) => match n.as_u64() {
                Some(i) if i <= u8::MAX as u64 && canon.get(i as u8).is_some() => {
                    SequenceItem::Known(i as u8)
                }
                _ => SequenceItem::Unknown(n.to_string()),
            },
            Value::String(s) => resolve_name(s, canon),
            other => SequenceItem::Unknown(other.to_string()),
        })
        .collect();
    ParsedSequence { items }
}

fn parse_json(content: &str, canon: &CanonTable) -> Result<ParsedSequence, CodexError> {
    let values: Vec<Value> = serde_json::from_str(content)
        .map_err(|e| CodexError::InvalidInput(format!("sequence is not a JSON array: {}", e)))?;
    Ok(parse_json_values(&values, canon))
}

/// All non-whitespace chars must be canon symbols, otherwise `None`
fn parse_symbols(content: &str, canon: &CanonTable) -> Option<Vec<SequenceItem>> {
    let mut items = Vec::new();
    let mut buf = [0u8; 4];
    for ch in content.chars() {
        if ch.is_whitespace() || ch == VARIATION_SELECTOR {
            continue;
        }
        let symbol: &str = ch.encode_utf8(&mut buf);
        let token = canon.tokens().iter().find(|t| t.symbol == symbol)?;
        items.push(SequenceItem::Known(token.index));
    }
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

fn resolve_word(word: &str, canon: &CanonTable) -> SequenceItem {
    if RE_INTEGER.is_match(word) {
        return match word.parse::<u8>() {
            Ok(i) if canon.get(i).is_some() => SequenceItem::Known(i),
            _ => SequenceItem::Unknown(word.to_string()),
        };
    }
    resolve_name(word, canon)
}

fn resolve_name(name: &str, canon: &CanonTable) -> SequenceItem {
    let cleaned: String = name.chars().filter(|c| *c != VARIATION_SELECTOR).collect();
    match canon.index_of(&cleaned) {
        Ok(i) => SequenceItem::Known(i),
        Err(_) => SequenceItem::Unknown(name.to_string()),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> ParsedSequence {
        parse_tokens(content, CanonTable::canonical()).unwrap()
    }

    #[test]
    fn test_json_indices() {
        let seq = parse("[0, 1, 2, 9]");
        assert_eq!(seq.known_indices(), vec![0, 1, 2]);
        assert_eq!(seq.items[3], SequenceItem::Unknown("9".to_string()));
    }

    #[test]
    fn test_json_names() {
        let seq = parse(r#"["Black", "white", "Gray"]"#);
        assert_eq!(seq.items[0], SequenceItem::Known(0));
        assert_eq!(seq.items[1], SequenceItem::Known(1));
        assert_eq!(seq.items[2], SequenceItem::Unknown("Gray".to_string()));
    }

    #[test]
    fn test_malformed_json_is_input_error() {
        let err = parse_tokens("[0, 1,", CanonTable::canonical()).unwrap_err();
        assert!(matches!(err, CodexError::InvalidInput(_)));
    }

    #[test]
    fn test_symbol_run() {
        let seq = parse("⚫⚪🟡 🟤\n🔴");
        assert_eq!(seq.known_indices(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_symbol_run_with_variation_selector() {
        let seq = parse("⚫\u{FE0F}⚪\u{FE0F}");
        assert_eq!(seq.known_indices(), vec![0, 1]);
    }

    #[test]
    fn test_names_per_line() {
        let seq = parse("Black\nWhite\nYellow\nMauve");
        assert_eq!(seq.len(), 4);
        assert_eq!(seq.unknown_count(), 1);
        assert_eq!(seq.items[3], SequenceItem::Unknown("Mauve".to_string()));
    }

    #[test]
    fn test_mixed_separators_and_indices() {
        let seq = parse("0, 1; 2 red");
        assert_eq!(seq.known_indices(), vec![0, 1, 2, 4]);
    }

    #[test]
    fn test_empty_content() {
        assert!(parse("   ").is_empty());
    }
}
