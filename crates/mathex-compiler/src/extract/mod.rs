//! Text rewriting that runs before any parsing: literals and call sites are
//! hoisted out of the formula and replaced by placeholder tokens.

mod functions;
mod literals;

pub use functions::extract_function_calls;
pub use literals::{
    extract_literals, ExtractedLiteral, LiteralExtractor, ScientificNotationExtractor,
    StringLiteralExtractor,
};

use mathex_builtins::find_constant;
use mathex_lexer::{Cursor, Token};
use std::ops::Range;

use crate::constants::ConstantRegistry;
use crate::definition::MathDefinition;
use crate::error::Result;
use crate::parameters::ParameterRegistry;

/// Advertises every identifier that will parse as a parameter, in textual
/// order, so argument positions follow the formula rather than the order in
/// which sub-expressions happen to be resolved.
pub fn advertise_parameters(
    text: &str,
    definition: &MathDefinition,
    constants: &ConstantRegistry,
    parameters: &ParameterRegistry,
) -> Result<()> {
    let mut cursor = Cursor::new(text);
    while let Some(tok) = cursor.bump() {
        if tok.token != Token::Ident || is_operator_word(definition, &tok.lexeme) {
            continue;
        }
        if cursor.at_symbol(&definition.open_paren).is_some() {
            continue;
        }
        if find_constant(&tok.lexeme).is_some() || constants.is_pass_through(&tok.lexeme) {
            continue;
        }
        parameters.advertise(&tok.lexeme)?;
    }
    Ok(())
}

/// Replaces `range` with `replacement` and returns the inserted length. A
/// space is kept on either side where a word character would otherwise touch
/// one, so `$1` and `5` do not merge into `$15` and `not` and `a` do not
/// merge into `nota`.
pub(crate) fn splice(text: &mut String, range: Range<usize>, replacement: &str) -> usize {
    let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_';
    let glued_after = replacement.ends_with(is_word) && text[range.end..].starts_with(is_word);
    let glued_before = replacement.starts_with(is_word) && text[..range.start].ends_with(is_word);
    let mut padded = String::with_capacity(replacement.len() + 2);
    if glued_before {
        padded.push(' ');
    }
    padded.push_str(replacement);
    if glued_after {
        padded.push(' ');
    }
    text.replace_range(range, &padded);
    padded.len()
}

pub(crate) fn is_operator_word(definition: &MathDefinition, word: &str) -> bool {
    definition.operators.all().contains(&word)
}
