//! Placeholder symbols and their containment relation.

use mathex_lexer::{placeholder_name, placeholder_ordinal, referenced_placeholders};
use std::collections::{BTreeMap, HashMap};

/// Ordinal of the symbol holding the whole expression.
pub const ROOT_ORDINAL: usize = 0;

/// Hands out placeholder names. Symbols and constants share one sequence so
/// a name identifies exactly one of them.
#[derive(Debug, Clone)]
pub struct PlaceholderAllocator {
    next: usize,
}

impl Default for PlaceholderAllocator {
    fn default() -> Self {
        Self {
            next: ROOT_ORDINAL + 1,
        }
    }
}

impl PlaceholderAllocator {
    pub fn allocate(&mut self) -> (usize, String) {
        let ordinal = self.next;
        self.next += 1;
        (ordinal, placeholder_name(ordinal))
    }

    pub fn allocated(&self) -> usize {
        self.next
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionSymbol {
    pub name: String,
    pub expression: String,
    pub is_function_call: bool,
    /// Number of other live symbols referenced by `expression`.
    pub contains: usize,
    /// Number of live symbols whose expression references this one.
    pub contained_in: usize,
}

#[derive(Debug, Clone)]
pub struct SymbolTable {
    symbols: BTreeMap<usize, ExpressionSymbol>,
    by_text: HashMap<String, String>,
}

impl SymbolTable {
    pub fn with_root(expression: &str) -> Self {
        let root = placeholder_name(ROOT_ORDINAL);
        let mut symbols = BTreeMap::new();
        symbols.insert(
            ROOT_ORDINAL,
            ExpressionSymbol {
                name: root,
                expression: expression.to_string(),
                is_function_call: false,
                contains: 0,
                contained_in: 0,
            },
        );
        Self {
            symbols,
            by_text: HashMap::new(),
        }
    }

    pub fn root_name() -> String {
        placeholder_name(ROOT_ORDINAL)
    }

    /// Returns the symbol already holding `expression`, or creates one.
    pub fn advertise(
        &mut self,
        names: &mut PlaceholderAllocator,
        expression: &str,
        is_function_call: bool,
    ) -> String {
        let expression = expression.trim();
        if let Some(existing) = self.by_text.get(expression) {
            return existing.clone();
        }
        let (ordinal, name) = names.allocate();
        log::trace!(
            "symbol {name} <- {expression}{}",
            if is_function_call { " (call)" } else { "" }
        );
        self.symbols.insert(
            ordinal,
            ExpressionSymbol {
                name: name.clone(),
                expression: expression.to_string(),
                is_function_call,
                contains: 0,
                contained_in: 0,
            },
        );
        self.by_text.insert(expression.to_string(), name.clone());
        name
    }

    pub fn get(&self, name: &str) -> Option<&ExpressionSymbol> {
        placeholder_ordinal(name).and_then(|o| self.symbols.get(&o))
    }

    pub fn contains_symbol(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub(crate) fn set_expression(&mut self, name: &str, expression: String) {
        let Some(symbol) = placeholder_ordinal(name).and_then(|o| self.symbols.get_mut(&o)) else {
            return;
        };
        if self.by_text.get(&symbol.expression).map(String::as_str) == Some(name) {
            self.by_text.remove(&symbol.expression);
        }
        if symbol.name != Self::root_name() {
            self.by_text
                .entry(expression.clone())
                .or_insert_with(|| name.to_string());
        }
        symbol.expression = expression;
    }

    pub fn remove(&mut self, name: &str) -> Option<ExpressionSymbol> {
        let removed = placeholder_ordinal(name).and_then(|o| self.symbols.remove(&o))?;
        if self.by_text.get(&removed.expression).map(String::as_str) == Some(name) {
            self.by_text.remove(&removed.expression);
        }
        Some(removed)
    }

    /// Names in creation order.
    pub fn names(&self) -> Vec<String> {
        self.symbols.values().map(|s| s.name.clone()).collect()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &ExpressionSymbol> {
        self.symbols.values()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Recomputes `contains` / `contained_in` for every live symbol from
    /// scratch. References are matched per token, so `$1` never matches
    /// inside `$10`.
    pub fn count_containment(&mut self) {
        for symbol in self.symbols.values_mut() {
            symbol.contains = 0;
            symbol.contained_in = 0;
        }

        let mut edges: Vec<(usize, usize)> = Vec::new();
        for (&outer, symbol) in &self.symbols {
            for reference in referenced_placeholders(&symbol.expression) {
                match placeholder_ordinal(&reference) {
                    Some(inner) if inner != outer && self.symbols.contains_key(&inner) => {
                        edges.push((outer, inner));
                    }
                    _ => {}
                }
            }
        }

        for (outer, inner) in edges {
            if let Some(s) = self.symbols.get_mut(&outer) {
                s.contains += 1;
            }
            if let Some(s) = self.symbols.get_mut(&inner) {
                s.contained_in += 1;
            }
        }
    }

    /// Non-root symbols with no unresolved dependencies, in creation order.
    pub fn leaves(&self) -> Vec<String> {
        self.symbols
            .iter()
            .filter(|(ordinal, s)| **ordinal != ROOT_ORDINAL && s.contains == 0)
            .map(|(_, s)| s.name.clone())
            .collect()
    }
}
