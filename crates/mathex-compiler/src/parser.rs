//! Precedence-climbing parser from one symbol's text to a [`Node`].
//!
//! By the time a symbol is parsed every placeholder it references is either
//! a constant or an earlier binding, so the grammar only has to deal with
//! operators, literals, identifiers and flat call syntax.

use mathex_builtins::find_constant;
use mathex_lexer::{Cursor, Token};
use std::sync::Arc;

use crate::constants::ConstantRegistry;
use crate::definition::MathDefinition;
use crate::error::{CompileError, Result};
use crate::instr::{BinaryOp, UnaryOp};
use crate::nodes::{BinaryNode, BindingNode, Node, ParameterNode, UnaryNode};
use crate::optimizer::Binding;
use crate::parameters::ParameterRegistry;
use crate::provider::{resolve_function, FunctionProvider};
use crate::symbols::PlaceholderAllocator;

/// Everything the parser reads or extends while building one node.
pub struct ParseScope<'a> {
    pub definition: &'a MathDefinition,
    pub constants: &'a mut ConstantRegistry,
    pub names: &'a mut PlaceholderAllocator,
    pub bindings: &'a [Binding],
    pub parameters: &'a Arc<ParameterRegistry>,
    pub providers: &'a [Arc<dyn FunctionProvider>],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Unary(UnaryOp),
    Binary(BinaryOp),
}

pub fn parse_expression(text: &str, scope: ParseScope<'_>) -> Result<Node> {
    let mut parser = Parser::new(text, scope);
    if parser.cursor.is_eof() {
        return Err(CompileError::parse("empty expression", 0));
    }
    let node = parser.parse_expr()?;
    if let Some(tok) = parser.cursor.peek() {
        return Err(CompileError::parse(
            format!("unexpected '{}'", tok.lexeme),
            tok.start,
        ));
    }
    Ok(node)
}

struct Parser<'a> {
    cursor: Cursor<'a>,
    scope: ParseScope<'a>,
    operators: Vec<(&'a str, Operator)>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str, scope: ParseScope<'a>) -> Self {
        let definition: &'a MathDefinition = scope.definition;
        let ops = &definition.operators;
        let mut operators: Vec<(&'a str, Operator)> = vec![
            (ops.add.as_str(), Operator::Binary(BinaryOp::Add)),
            (ops.subtract.as_str(), Operator::Binary(BinaryOp::Subtract)),
            (ops.multiply.as_str(), Operator::Binary(BinaryOp::Multiply)),
            (ops.divide.as_str(), Operator::Binary(BinaryOp::Divide)),
            (ops.modulo.as_str(), Operator::Binary(BinaryOp::Modulo)),
            (ops.power.as_str(), Operator::Binary(BinaryOp::Power)),
            (ops.and.as_str(), Operator::Binary(BinaryOp::And)),
            (ops.or.as_str(), Operator::Binary(BinaryOp::Or)),
            (ops.xor.as_str(), Operator::Binary(BinaryOp::Xor)),
            (ops.not.as_str(), Operator::Unary(UnaryOp::Not)),
            (ops.equal.as_str(), Operator::Binary(BinaryOp::Equal)),
            (ops.not_equal.as_str(), Operator::Binary(BinaryOp::NotEqual)),
            (ops.less.as_str(), Operator::Binary(BinaryOp::Less)),
            (ops.less_equal.as_str(), Operator::Binary(BinaryOp::LessEqual)),
            (ops.greater.as_str(), Operator::Binary(BinaryOp::Greater)),
            (ops.greater_equal.as_str(), Operator::Binary(BinaryOp::GreaterEqual)),
            (ops.shift_left.as_str(), Operator::Binary(BinaryOp::ShiftLeft)),
            (ops.shift_right.as_str(), Operator::Binary(BinaryOp::ShiftRight)),
        ];
        // Longest spelling first so `<=` wins over `<`
        operators.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self {
            cursor: Cursor::new(text),
            scope,
            operators,
        }
    }

    /// Longest operator spelled at the cursor and the tokens it spans.
    fn peek_operator(&self) -> Option<(Operator, usize)> {
        self.operators
            .iter()
            .find_map(|(symbol, op)| self.cursor.at_symbol(symbol).map(|n| (*op, n)))
    }

    fn consume_binary(&mut self, accepted: &[BinaryOp]) -> Option<BinaryOp> {
        match self.peek_operator() {
            Some((Operator::Binary(op), n)) if accepted.contains(&op) => {
                for _ in 0..n {
                    self.cursor.bump();
                }
                Some(op)
            }
            _ => None,
        }
    }

    fn binary_level(
        &mut self,
        accepted: &[BinaryOp],
        next: fn(&mut Self) -> Result<Node>,
    ) -> Result<Node> {
        let mut node = next(self)?;
        while let Some(op) = self.consume_binary(accepted) {
            let rhs = next(self)?;
            node = BinaryNode::new(op, node, rhs)?;
        }
        Ok(node)
    }

    fn parse_expr(&mut self) -> Result<Node> {
        self.parse_logical_or()
    }

    fn parse_logical_or(&mut self) -> Result<Node> {
        self.binary_level(&[BinaryOp::Or, BinaryOp::Xor], Self::parse_logical_and)
    }

    fn parse_logical_and(&mut self) -> Result<Node> {
        self.binary_level(&[BinaryOp::And], Self::parse_equality)
    }

    fn parse_equality(&mut self) -> Result<Node> {
        self.binary_level(&[BinaryOp::Equal, BinaryOp::NotEqual], Self::parse_comparison)
    }

    fn parse_comparison(&mut self) -> Result<Node> {
        self.binary_level(
            &[
                BinaryOp::Less,
                BinaryOp::LessEqual,
                BinaryOp::Greater,
                BinaryOp::GreaterEqual,
            ],
            Self::parse_shift,
        )
    }

    fn parse_shift(&mut self) -> Result<Node> {
        self.binary_level(&[BinaryOp::ShiftLeft, BinaryOp::ShiftRight], Self::parse_add_sub)
    }

    fn parse_add_sub(&mut self) -> Result<Node> {
        self.binary_level(&[BinaryOp::Add, BinaryOp::Subtract], Self::parse_mul_div)
    }

    fn parse_mul_div(&mut self) -> Result<Node> {
        self.binary_level(
            &[BinaryOp::Multiply, BinaryOp::Divide, BinaryOp::Modulo],
            Self::parse_unary,
        )
    }

    fn parse_unary(&mut self) -> Result<Node> {
        let op = match self.peek_operator() {
            Some((Operator::Unary(op), n)) => Some((op, n)),
            Some((Operator::Binary(BinaryOp::Subtract), n)) => Some((UnaryOp::Negate, n)),
            _ => None,
        };
        match op {
            Some((op, n)) => {
                for _ in 0..n {
                    self.cursor.bump();
                }
                let operand = self.parse_unary()?;
                UnaryNode::new(op, operand)
            }
            None => self.parse_pow(),
        }
    }

    fn parse_pow(&mut self) -> Result<Node> {
        let node = self.parse_primary()?;
        if self.consume_binary(&[BinaryOp::Power]).is_some() {
            let rhs = self.parse_unary()?; // right associative
            return BinaryNode::new(BinaryOp::Power, node, rhs);
        }
        Ok(node)
    }

    fn parse_primary(&mut self) -> Result<Node> {
        let position = self.cursor.offset();
        let definition = self.scope.definition;
        if self.cursor.eat_symbol(&definition.open_paren) {
            let inner = self.parse_expr()?;
            if !self.cursor.eat_symbol(&definition.close_paren) {
                return Err(CompileError::parse(
                    format!("expected '{}'", definition.close_paren),
                    self.cursor.offset(),
                ));
            }
            return Ok(inner);
        }

        let Some(tok) = self.cursor.bump() else {
            return Err(CompileError::parse("unexpected end of expression", position));
        };
        match tok.token {
            Token::Placeholder => self.resolve_placeholder(&tok.lexeme),
            Token::Ident if self.cursor.at_symbol(&definition.open_paren).is_some() => {
                self.parse_call(&tok.lexeme, position)
            }
            Token::Ident => self.resolve_identifier(&tok.lexeme),
            t if t.is_number() => self.literal(&tok.lexeme, position),
            _ => Err(CompileError::parse(
                format!("unexpected '{}'", tok.lexeme),
                position,
            )),
        }
    }

    fn parse_call(&mut self, name: &str, position: usize) -> Result<Node> {
        let definition = self.scope.definition;
        self.cursor.eat_symbol(&definition.open_paren);
        let mut args = Vec::new();
        if !self.cursor.eat_symbol(&definition.close_paren) {
            loop {
                args.push(self.parse_expr()?);
                if self.cursor.eat_symbol(&definition.separator) {
                    continue;
                }
                if self.cursor.eat_symbol(&definition.close_paren) {
                    break;
                }
                return Err(CompileError::parse(
                    format!(
                        "expected '{}' or '{}' in call to '{name}'",
                        definition.separator, definition.close_paren
                    ),
                    self.cursor.offset(),
                ));
            }
        }
        let factory = resolve_function(self.scope.providers, name, args.len()).ok_or_else(|| {
            log::debug!("no provider for {name}/{} at {position}", args.len());
            CompileError::UnresolvedFunction {
                name: name.to_string(),
                arity: args.len(),
            }
        })?;
        factory(args)
    }

    fn resolve_placeholder(&self, name: &str) -> Result<Node> {
        if let Some(entry) = self.scope.constants.get(name) {
            return Ok(Node::constant(entry.value.clone()));
        }
        if let Some((slot, binding)) = self
            .scope
            .bindings
            .iter()
            .enumerate()
            .find(|(_, b)| b.name == name)
        {
            return Ok(Node::Binding(BindingNode {
                name: name.to_string(),
                slot,
                kind: binding.node.kind()?,
            }));
        }
        Err(CompileError::Internal(format!(
            "placeholder {name} referenced before it was resolved"
        )))
    }

    fn resolve_identifier(&mut self, name: &str) -> Result<Node> {
        if let Some(constant) = find_constant(name) {
            return Ok(Node::constant(constant.value.clone()));
        }
        if self.scope.constants.is_pass_through(name) {
            if let Some(entry) = self.advertise_literal(name) {
                return Ok(entry);
            }
        }
        Ok(Node::Parameter(ParameterNode::new(name, self.scope.parameters)?))
    }

    fn literal(&mut self, text: &str, position: usize) -> Result<Node> {
        self.advertise_literal(text).ok_or_else(|| {
            CompileError::parse(format!("invalid numeric literal '{text}'"), position)
        })
    }

    fn advertise_literal(&mut self, text: &str) -> Option<Node> {
        let name = self.scope.constants.advertise_literal(self.scope.names, text)?;
        self.scope
            .constants
            .get(&name)
            .map(|entry| Node::constant(entry.value.clone()))
    }
}
