//! Symbol vocabulary recognised by extraction and parsing.

use mathex_lexer::PLACEHOLDER_SIGIL;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{CompileError, Result};

/// One textual token per supported operator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperatorSymbols {
    pub add: String,
    pub subtract: String,
    pub multiply: String,
    pub divide: String,
    pub modulo: String,
    pub power: String,
    pub and: String,
    pub or: String,
    pub xor: String,
    pub not: String,
    pub equal: String,
    pub not_equal: String,
    pub less: String,
    pub less_equal: String,
    pub greater: String,
    pub greater_equal: String,
    pub shift_left: String,
    pub shift_right: String,
}

impl OperatorSymbols {
    /// `+ - * / % ^ & | # ! = != < <= > >= << >>`
    pub fn standard() -> Self {
        Self {
            add: "+".into(),
            subtract: "-".into(),
            multiply: "*".into(),
            divide: "/".into(),
            modulo: "%".into(),
            power: "^".into(),
            and: "&".into(),
            or: "|".into(),
            xor: "#".into(),
            not: "!".into(),
            equal: "=".into(),
            not_equal: "!=".into(),
            less: "<".into(),
            less_equal: "<=".into(),
            greater: ">".into(),
            greater_equal: ">=".into(),
            shift_left: "<<".into(),
            shift_right: ">>".into(),
        }
    }

    pub fn all(&self) -> [&str; 18] {
        [
            &self.add,
            &self.subtract,
            &self.multiply,
            &self.divide,
            &self.modulo,
            &self.power,
            &self.and,
            &self.or,
            &self.xor,
            &self.not,
            &self.equal,
            &self.not_equal,
            &self.less,
            &self.less_equal,
            &self.greater,
            &self.greater_equal,
            &self.shift_left,
            &self.shift_right,
        ]
    }
}

/// Immutable description of the parenthesis, separator, string delimiter and
/// operator symbols. Supplied once per compiler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MathDefinition {
    pub open_paren: String,
    pub close_paren: String,
    pub separator: String,
    pub string_delimiter: String,
    pub operators: OperatorSymbols,
}

impl MathDefinition {
    /// `( ) , "` with the conventional operator spellings.
    pub fn standard() -> Self {
        Self {
            open_paren: "(".into(),
            close_paren: ")".into(),
            separator: ",".into(),
            string_delimiter: "\"".into(),
            operators: OperatorSymbols::standard(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let structural = [
            ("open parenthesis", &self.open_paren),
            ("close parenthesis", &self.close_paren),
            ("separator", &self.separator),
            ("string delimiter", &self.string_delimiter),
        ];
        for (what, symbol) in structural {
            check_symbol(what, symbol)?;
        }
        for symbol in self.operators.all() {
            check_symbol("operator", symbol)?;
        }

        let mut seen = HashSet::new();
        for (what, symbol) in structural {
            if !seen.insert(symbol.as_str()) {
                return Err(CompileError::InvalidDefinition(format!(
                    "{what} '{symbol}' duplicates another structural symbol"
                )));
            }
        }
        for symbol in self.operators.all() {
            if seen.contains(symbol) {
                return Err(CompileError::InvalidDefinition(format!(
                    "operator '{symbol}' collides with a structural symbol"
                )));
            }
        }
        Ok(())
    }
}

fn check_symbol(what: &str, symbol: &str) -> Result<()> {
    if symbol.is_empty() {
        return Err(CompileError::InvalidDefinition(format!("{what} is empty")));
    }
    if symbol.chars().any(char::is_whitespace) {
        return Err(CompileError::InvalidDefinition(format!(
            "{what} '{symbol}' contains whitespace"
        )));
    }
    if symbol.contains(PLACEHOLDER_SIGIL) {
        return Err(CompileError::InvalidDefinition(format!(
            "{what} '{symbol}' contains the reserved '{PLACEHOLDER_SIGIL}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_is_valid() {
        assert!(MathDefinition::standard().validate().is_ok());
    }

    #[test]
    fn rejects_sigil_and_duplicates() {
        let mut def = MathDefinition::standard();
        def.operators.add = "$".into();
        assert!(matches!(
            def.validate(),
            Err(CompileError::InvalidDefinition(_))
        ));

        let mut def = MathDefinition::standard();
        def.separator = "(".into();
        assert!(def.validate().is_err());

        let mut def = MathDefinition::standard();
        def.operators.modulo = ",".into();
        assert!(def.validate().is_err());
    }
}
