//! Deduplicated literal table for one compilation.

use mathex_builtins::{parse_numeric_literal, Value};
use mathex_lexer::placeholder_ordinal;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::symbols::PlaceholderAllocator;

/// Predicate marking literal text as already reduced. Matching text becomes a
/// string constant holding the raw text.
pub type PassThrough = Arc<dyn Fn(&str) -> bool + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantEntry {
    pub name: String,
    pub value: Value,
    /// Original text of the literal, or `None` for values produced by folding.
    pub source: Option<String>,
}

#[derive(Clone, Default)]
pub struct ConstantRegistry {
    entries: BTreeMap<usize, ConstantEntry>,
    by_text: HashMap<String, String>,
    pass_through: Vec<PassThrough>,
}

impl fmt::Debug for ConstantRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstantRegistry")
            .field("entries", &self.entries)
            .field("pass_through", &self.pass_through.len())
            .finish()
    }
}

impl ConstantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pass_through(pass_through: Vec<PassThrough>) -> Self {
        Self {
            pass_through,
            ..Self::default()
        }
    }

    pub fn is_pass_through(&self, text: &str) -> bool {
        self.pass_through.iter().any(|p| p(text))
    }

    /// Registers `value` under a fresh placeholder unless the same source text
    /// was already seen, in which case the existing placeholder is returned.
    pub fn advertise(
        &mut self,
        names: &mut PlaceholderAllocator,
        text: &str,
        value: Value,
    ) -> String {
        if let Some(existing) = self.by_text.get(text) {
            return existing.clone();
        }
        let (ordinal, name) = names.allocate();
        log::trace!("constant {name} <- {text}");
        self.entries.insert(
            ordinal,
            ConstantEntry {
                name: name.clone(),
                value,
                source: Some(text.to_string()),
            },
        );
        self.by_text.insert(text.to_string(), name.clone());
        name
    }

    /// Registers literal text through the pass-through predicates, falling
    /// back to numeric literal parsing. Returns `None` if neither applies.
    pub fn advertise_literal(
        &mut self,
        names: &mut PlaceholderAllocator,
        text: &str,
    ) -> Option<String> {
        let text = text.trim();
        if let Some(existing) = self.by_text.get(text) {
            return Some(existing.clone());
        }
        let value = if self.is_pass_through(text) {
            Value::String(text.to_string())
        } else {
            parse_numeric_literal(text)?
        };
        Some(self.advertise(names, text, value))
    }

    /// Stores a folded symbol under its own placeholder name.
    pub fn insert_resolved(&mut self, name: &str, value: Value) {
        if let Some(ordinal) = placeholder_ordinal(name) {
            self.entries.insert(
                ordinal,
                ConstantEntry {
                    name: name.to_string(),
                    value,
                    source: None,
                },
            );
        }
    }

    pub fn get(&self, name: &str) -> Option<&ConstantEntry> {
        placeholder_ordinal(name).and_then(|o| self.entries.get(&o))
    }

    pub fn lookup_text(&self, text: &str) -> Option<&str> {
        self.by_text.get(text.trim()).map(String::as_str)
    }

    /// Entries in placeholder order.
    pub fn entries(&self) -> impl Iterator<Item = &ConstantEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
