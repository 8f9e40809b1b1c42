//! Hoists call sites and parenthesised groups into placeholder symbols,
//! innermost first.

use mathex_builtins::find_constant;
use mathex_lexer::{tokenize_detailed, Cursor, SpannedToken, Token};

use super::{is_operator_word, splice};
use crate::constants::ConstantRegistry;
use crate::definition::MathDefinition;
use crate::error::{CompileError, Result};
use crate::parameters::ParameterRegistry;
use crate::symbols::{PlaceholderAllocator, SymbolTable};

#[derive(Debug)]
enum SiteKind {
    Call { name: String },
    Grouping,
}

#[derive(Debug)]
struct Site {
    kind: SiteKind,
    /// Start of the replaced text: the function name or the open paren.
    start: usize,
    open_end: usize,
    close_start: usize,
    close_end: usize,
}

struct FunctionExtractor<'a> {
    definition: &'a MathDefinition,
    symbols: &'a mut SymbolTable,
    constants: &'a mut ConstantRegistry,
    names: &'a mut PlaceholderAllocator,
    parameters: &'a ParameterRegistry,
    passes: usize,
    max_passes: usize,
}

/// Rewrites every non-call symbol until no call site or group remains.
/// Call arguments are rewritten before the call itself is hoisted, so inner
/// calls always receive lower placeholder ordinals than the calls using them.
pub fn extract_function_calls(
    symbols: &mut SymbolTable,
    constants: &mut ConstantRegistry,
    names: &mut PlaceholderAllocator,
    parameters: &ParameterRegistry,
    definition: &MathDefinition,
    max_passes: usize,
) -> Result<()> {
    let mut extractor = FunctionExtractor {
        definition,
        symbols,
        constants,
        names,
        parameters,
        passes: 0,
        max_passes,
    };

    loop {
        let mut changed = false;
        for name in extractor.symbols.names() {
            let Some(symbol) = extractor.symbols.get(&name) else {
                continue;
            };
            // Hoisted calls already carry rewritten arguments
            if symbol.is_function_call {
                continue;
            }
            let text = symbol.expression.clone();
            let rewritten = extractor.rewrite(&text)?;
            if rewritten != text {
                extractor.symbols.set_expression(&name, rewritten);
                changed = true;
            }
        }
        if !changed {
            return Ok(());
        }
    }
}

impl FunctionExtractor<'_> {
    fn bump_pass(&mut self) -> Result<()> {
        self.passes += 1;
        if self.passes > self.max_passes {
            return Err(CompileError::Internal(format!(
                "function extraction did not settle within {} passes",
                self.max_passes
            )));
        }
        Ok(())
    }

    fn rewrite(&mut self, text: &str) -> Result<String> {
        let mut text = text.to_string();
        while let Some(site) = self.find_site(&text) {
            self.bump_pass()?;
            let inner = self.rewrite(&text[site.open_end..site.close_start])?;
            let placeholder = match &site.kind {
                SiteKind::Call { name } => self.hoist_call(name, &inner, site.open_end)?,
                SiteKind::Grouping => self.hoist_group(&inner),
            };
            splice(&mut text, site.start..site.close_end, &placeholder);
        }
        Ok(text)
    }

    fn hoist_call(&mut self, name: &str, inner: &str, position: usize) -> Result<String> {
        let mut args = Vec::new();
        if !inner.trim().is_empty() {
            for arg in self.split_arguments(inner) {
                let arg = arg.trim();
                if arg.is_empty() {
                    return Err(CompileError::parse(
                        format!("empty argument in call to '{name}'"),
                        position,
                    ));
                }
                args.push(self.resolve_argument(arg)?);
            }
        }
        let d = self.definition;
        let call = format!(
            "{name}{}{}{}",
            d.open_paren,
            args.join(&d.separator),
            d.close_paren
        );
        Ok(self.symbols.advertise(self.names, &call, true))
    }

    /// A group around a single token is just that token.
    fn hoist_group(&mut self, inner: &str) -> String {
        let inner = inner.trim();
        if tokenize_detailed(inner).len() == 1 {
            return inner.to_string();
        }
        self.symbols.advertise(self.names, inner, false)
    }

    /// An argument becomes a constant placeholder, a parameter name, an
    /// existing placeholder, or a new nested symbol, in that order.
    fn resolve_argument(&mut self, arg: &str) -> Result<String> {
        let tokens = tokenize_detailed(arg);
        if let [only] = tokens.as_slice() {
            match only.token {
                Token::Placeholder => return Ok(arg.to_string()),
                Token::Ident if !is_operator_word(self.definition, arg) => {
                    if find_constant(arg).is_some() {
                        return Ok(arg.to_string());
                    }
                    if let Some(constant) = self.passthrough_constant(arg) {
                        return Ok(constant);
                    }
                    self.parameters.advertise(arg)?;
                    return Ok(arg.to_string());
                }
                t if t.is_number() => {
                    if let Some(constant) = self.constants.advertise_literal(self.names, arg) {
                        return Ok(constant);
                    }
                    return Ok(arg.to_string());
                }
                _ => {}
            }
        }
        Ok(self.symbols.advertise(self.names, arg, false))
    }

    fn passthrough_constant(&mut self, text: &str) -> Option<String> {
        if self.constants.is_pass_through(text) {
            self.constants.advertise_literal(self.names, text)
        } else {
            None
        }
    }

    /// Splits on the separator outside nested parentheses.
    fn split_arguments<'t>(&self, text: &'t str) -> Vec<&'t str> {
        let d = self.definition;
        let mut cursor = Cursor::new(text);
        let mut depth = 0usize;
        let mut pieces = Vec::new();
        let mut piece_start = 0;
        while !cursor.is_eof() {
            let offset = cursor.offset();
            if cursor.eat_symbol(&d.open_paren) {
                depth += 1;
            } else if cursor.eat_symbol(&d.close_paren) {
                depth = depth.saturating_sub(1);
            } else if depth == 0 && cursor.eat_symbol(&d.separator) {
                pieces.push(&text[piece_start..offset]);
                piece_start = offset + d.separator.len();
            } else {
                cursor.bump();
            }
        }
        pieces.push(&text[piece_start..]);
        pieces
    }

    /// First open parenthesis that starts a call or a group, paired with its
    /// matching close. Parentheses following a placeholder, a number or a
    /// closing parenthesis are not call syntax and are skipped.
    fn find_site(&self, text: &str) -> Option<Site> {
        let d = self.definition;
        let mut cursor = Cursor::new(text);
        while !cursor.is_eof() {
            if cursor.at_symbol(&d.open_paren).is_none() {
                cursor.bump();
                continue;
            }
            let open_start = cursor.offset();
            let kind = self.classify(text, cursor.previous(), open_start);
            let Some(kind) = kind else {
                cursor.eat_symbol(&d.open_paren);
                continue;
            };

            let mut scan = cursor.clone();
            scan.eat_symbol(&d.open_paren);
            let open_end = open_start + d.open_paren.len();
            let mut depth = 1usize;
            while !scan.is_eof() {
                if scan.eat_symbol(&d.open_paren) {
                    depth += 1;
                    continue;
                }
                let close_start = scan.offset();
                if scan.eat_symbol(&d.close_paren) {
                    depth -= 1;
                    if depth == 0 {
                        let start = match &kind {
                            SiteKind::Call { .. } => cursor.previous().map_or(open_start, |t| t.start),
                            SiteKind::Grouping => open_start,
                        };
                        return Some(Site {
                            kind,
                            start,
                            open_end,
                            close_start,
                            close_end: close_start + d.close_paren.len(),
                        });
                    }
                    continue;
                }
                scan.bump();
            }
            // Unbalanced: leave the rest for the parser to report
            return None;
        }
        None
    }

    fn classify(&self, text: &str, previous: Option<&SpannedToken>, open_start: usize) -> Option<SiteKind> {
        let Some(prev) = previous else {
            return Some(SiteKind::Grouping);
        };
        match prev.token {
            Token::Ident if is_operator_word(self.definition, &prev.lexeme) => Some(SiteKind::Grouping),
            Token::Ident => Some(SiteKind::Call {
                name: prev.lexeme.clone(),
            }),
            Token::Placeholder | Token::Error => None,
            t if t.is_number() => None,
            _ if text[..open_start].trim_end().ends_with(&self.definition.close_paren) => None,
            _ => Some(SiteKind::Grouping),
        }
    }
}
