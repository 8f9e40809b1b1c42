use mathex_builtins::Value;
use mathex_lexer::{tokenize_detailed, Token};
use std::ops::Range;
use std::sync::Arc;

use super::splice;
use crate::constants::ConstantRegistry;
use crate::symbols::PlaceholderAllocator;

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedLiteral {
    /// Byte range of the literal in the scanned text.
    pub range: Range<usize>,
    pub value: Value,
}

/// Finds the next literal at or after byte offset `from`.
pub trait LiteralExtractor: Send + Sync {
    fn next_literal(&self, text: &str, from: usize) -> Option<ExtractedLiteral>;
}

/// Delimited string literals. A doubled delimiter inside the literal stands
/// for one delimiter character.
#[derive(Debug, Clone)]
pub struct StringLiteralExtractor {
    delimiter: String,
}

impl StringLiteralExtractor {
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
        }
    }
}

impl LiteralExtractor for StringLiteralExtractor {
    fn next_literal(&self, text: &str, from: usize) -> Option<ExtractedLiteral> {
        let delim = self.delimiter.as_str();
        if delim.is_empty() {
            return None;
        }
        let start = from + text.get(from..)?.find(delim)?;
        let body_start = start + delim.len();
        let mut at = body_start;
        loop {
            // Unterminated: nothing more to extract
            let close = at + text[at..].find(delim)?;
            let after = close + delim.len();
            if text[after..].starts_with(delim) {
                at = after + delim.len();
                continue;
            }
            let doubled = delim.repeat(2);
            let body = text[body_start..close].replace(&doubled, delim);
            return Some(ExtractedLiteral {
                range: start..after,
                value: Value::String(body),
            });
        }
    }
}

/// Numbers with an exponent, such as `1.5e3` or `2E-4`.
#[derive(Debug, Clone, Default)]
pub struct ScientificNotationExtractor;

impl LiteralExtractor for ScientificNotationExtractor {
    fn next_literal(&self, text: &str, from: usize) -> Option<ExtractedLiteral> {
        let rest = text.get(from..)?;
        tokenize_detailed(rest)
            .into_iter()
            .filter(|t| t.token == Token::Scientific)
            .find_map(|t| match t.lexeme.parse::<f64>() {
                Ok(n) if n.is_finite() => Some(ExtractedLiteral {
                    range: from + t.start..from + t.end,
                    value: Value::Num(n),
                }),
                // Overflowing exponents stay in the text
                _ => None,
            })
    }
}

/// Runs each extractor over the whole text in order, replacing every literal
/// found with its constant placeholder. Returns the rewritten text.
pub fn extract_literals(
    text: &str,
    extractors: &[Arc<dyn LiteralExtractor>],
    constants: &mut ConstantRegistry,
    names: &mut PlaceholderAllocator,
) -> String {
    let mut text = text.to_string();
    for extractor in extractors {
        let mut from = 0;
        while let Some(literal) = extractor.next_literal(&text, from) {
            let range = literal.range;
            if range.start < from
                || range.is_empty()
                || range.end > text.len()
                || !text.is_char_boundary(range.start)
                || !text.is_char_boundary(range.end)
            {
                log::warn!("literal extractor returned unusable range {range:?}");
                break;
            }
            let raw = text[range.clone()].to_string();
            let name = constants.advertise(names, &raw, literal.value);
            from = range.start + splice(&mut text, range, &name);
        }
    }
    text
}
