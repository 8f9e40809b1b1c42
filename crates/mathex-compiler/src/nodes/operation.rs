use mathex_builtins::ValueKind;
use std::sync::Arc;

use super::{defer_parameter, is_parameter, pick_kind, require_integer, require_kind, Node};
use crate::emit::Emitter;
use crate::error::{CompileError, Result};
use crate::instr::{BinaryOp, Instr, UnaryOp};
use crate::ops;
use crate::parameters::ParameterRegistry;

#[derive(Debug, Clone)]
pub struct UnaryNode {
    pub op: UnaryOp,
    pub operand: Box<Node>,
    pub kind: ValueKind,
}

impl UnaryNode {
    pub fn new(op: UnaryOp, operand: Node) -> Result<Node> {
        let context = format!("operator '{}'", op.symbol());
        let kind = match op {
            UnaryOp::Negate => {
                require_kind(&operand, ValueKind::Numeric, &context)?;
                ValueKind::Numeric
            }
            UnaryOp::Not => match operand.kind()? {
                ValueKind::Unknown if is_parameter(&operand) => {
                    require_kind(&operand, ValueKind::Boolean, &context)?;
                    ValueKind::Boolean
                }
                ValueKind::Numeric => {
                    require_integer(&operand, &context)?;
                    ValueKind::Numeric
                }
                ValueKind::String => {
                    return Err(CompileError::validity(format!(
                        "{context} cannot be applied to a string"
                    )))
                }
                other => other,
            },
        };
        Ok(Node::Unary(UnaryNode {
            op,
            operand: Box::new(operand),
            kind,
        }))
    }

    pub(crate) fn simplify(self) -> Result<Node> {
        let operand = self.operand.simplify()?;
        if let Some(value) = operand.as_constant() {
            match ops::unary(self.op, value) {
                Ok(folded) => return Ok(Node::constant(folded)),
                Err(e) => log::trace!("left {:?} unfolded: {e}", self.op),
            }
        }
        Ok(Node::Unary(UnaryNode {
            op: self.op,
            operand: Box::new(operand),
            kind: self.kind,
        }))
    }

    pub(crate) fn deep_clone(&self, registry: &Arc<ParameterRegistry>) -> Self {
        Self {
            op: self.op,
            operand: Box::new(self.operand.deep_clone(registry)),
            kind: self.kind,
        }
    }

    pub(crate) fn emit(&self, emitter: &mut Emitter) -> Result<()> {
        self.operand.emit(emitter)?;
        emitter.emit(Instr::Unary(self.op));
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct BinaryNode {
    pub op: BinaryOp,
    pub left: Box<Node>,
    pub right: Box<Node>,
    pub kind: ValueKind,
}

impl BinaryNode {
    pub fn new(op: BinaryOp, left: Node, right: Node) -> Result<Node> {
        let kind = infer_binary(op, &left, &right)?;
        Ok(Node::Binary(BinaryNode {
            op,
            left: Box::new(left),
            right: Box::new(right),
            kind,
        }))
    }

    pub(crate) fn simplify(self) -> Result<Node> {
        let left = self.left.simplify()?;
        let right = self.right.simplify()?;
        if let (Some(a), Some(b)) = (left.as_constant(), right.as_constant()) {
            match ops::binary(self.op, a, b) {
                Ok(folded) => return Ok(Node::constant(folded)),
                Err(e) => log::trace!("left {:?} unfolded: {e}", self.op),
            }
        }
        Ok(Node::Binary(BinaryNode {
            op: self.op,
            left: Box::new(left),
            right: Box::new(right),
            kind: self.kind,
        }))
    }

    pub(crate) fn deep_clone(&self, registry: &Arc<ParameterRegistry>) -> Self {
        Self {
            op: self.op,
            left: Box::new(self.left.deep_clone(registry)),
            right: Box::new(self.right.deep_clone(registry)),
            kind: self.kind,
        }
    }

    pub(crate) fn emit(&self, emitter: &mut Emitter) -> Result<()> {
        self.left.emit(emitter)?;
        self.right.emit(emitter)?;
        emitter.emit(Instr::Binary(self.op));
        Ok(())
    }
}

fn infer_binary(op: BinaryOp, left: &Node, right: &Node) -> Result<ValueKind> {
    use ValueKind::*;

    let context = format!("operator '{}'", op.symbol());
    let (lk, rk) = (left.kind()?, right.kind()?);
    let both = |kind: ValueKind| -> Result<()> {
        require_kind(left, kind, &context)?;
        require_kind(right, kind, &context)
    };

    match op {
        BinaryOp::Add => {
            if lk == String || rk == String {
                let other = if lk == String { right } else { left };
                match other.kind()? {
                    ByteArray => {
                        return Err(CompileError::validity(format!(
                            "{context} cannot join a string and a byte array"
                        )))
                    }
                    Unknown if is_parameter(other) => require_kind(other, String, &context)?,
                    _ => {}
                }
                Ok(String)
            } else if lk == ByteArray || rk == ByteArray {
                both(ByteArray)?;
                Ok(ByteArray)
            } else {
                both(Numeric)?;
                Ok(Numeric)
            }
        }
        BinaryOp::Subtract
        | BinaryOp::Multiply
        | BinaryOp::Divide
        | BinaryOp::Modulo
        | BinaryOp::Power => {
            both(Numeric)?;
            Ok(Numeric)
        }
        BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => {
            let kind = pick_kind(lk, rk).unwrap_or(Boolean);
            match kind {
                Boolean | ByteArray => both(kind)?,
                Numeric => {
                    both(Numeric)?;
                    require_integer(left, &context)?;
                    require_integer(right, &context)?;
                }
                _ => {
                    return Err(CompileError::validity(format!(
                        "{context} is not defined for {kind}"
                    )))
                }
            }
            Ok(kind)
        }
        BinaryOp::Equal | BinaryOp::NotEqual => {
            both(pick_kind(lk, rk).unwrap_or(Numeric))?;
            Ok(Boolean)
        }
        BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
            let kind = pick_kind(lk, rk).unwrap_or(Numeric);
            if kind != Numeric && kind != String {
                return Err(CompileError::validity(format!(
                    "{context} cannot order {kind} values"
                )));
            }
            both(kind)?;
            Ok(Boolean)
        }
        BinaryOp::ShiftLeft | BinaryOp::ShiftRight => {
            let kind = if lk == ByteArray {
                ByteArray
            } else {
                require_kind(left, Numeric, &context)?;
                require_integer(left, &context)?;
                Numeric
            };
            require_kind(right, Numeric, &context)?;
            require_integer(right, &context)?;
            Ok(kind)
        }
    }
}

/// `if(condition, then, otherwise)`; only the taken branch is evaluated.
#[derive(Debug, Clone)]
pub struct ConditionalNode {
    pub condition: Box<Node>,
    pub then: Box<Node>,
    pub otherwise: Box<Node>,
    pub kind: ValueKind,
}

impl ConditionalNode {
    pub fn new(condition: Node, then: Node, otherwise: Node) -> Result<Node> {
        let context = "if";
        match condition.kind()? {
            ValueKind::Unknown if is_parameter(&condition) => {
                require_kind(&condition, ValueKind::Boolean, context)?
            }
            ValueKind::Unknown | ValueKind::Boolean | ValueKind::Numeric => {}
            other => {
                return Err(CompileError::validity(format!(
                    "if condition must be boolean, found {other}"
                )))
            }
        }

        let picked = pick_kind(then.kind()?, otherwise.kind()?);
        let kind = match picked {
            Some(kind) => kind,
            None if is_parameter(&then) || is_parameter(&otherwise) => ValueKind::Numeric,
            None => ValueKind::Unknown,
        };
        if kind.is_determined() {
            require_kind(&then, kind, "if branch")?;
            require_kind(&otherwise, kind, "if branch")?;
        }
        defer_parameter(&then)?;
        defer_parameter(&otherwise)?;

        Ok(Node::Conditional(ConditionalNode {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
            kind,
        }))
    }

    pub(crate) fn simplify(self) -> Result<Node> {
        let condition = self.condition.simplify()?;
        if let Some(taken) = condition.as_constant().and_then(|v| v.truthy()) {
            return if taken {
                self.then.simplify()
            } else {
                self.otherwise.simplify()
            };
        }
        Ok(Node::Conditional(ConditionalNode {
            condition: Box::new(condition),
            then: Box::new(self.then.simplify()?),
            otherwise: Box::new(self.otherwise.simplify()?),
            kind: self.kind,
        }))
    }

    pub(crate) fn deep_clone(&self, registry: &Arc<ParameterRegistry>) -> Self {
        Self {
            condition: Box::new(self.condition.deep_clone(registry)),
            then: Box::new(self.then.deep_clone(registry)),
            otherwise: Box::new(self.otherwise.deep_clone(registry)),
            kind: self.kind,
        }
    }

    pub(crate) fn emit(&self, emitter: &mut Emitter) -> Result<()> {
        self.condition.emit(emitter)?;
        let to_otherwise = emitter.emit(Instr::JumpIfFalse(0));
        self.then.emit(emitter)?;
        let to_end = emitter.emit(Instr::Jump(0));
        emitter.patch(to_otherwise, Instr::JumpIfFalse(emitter.position()));
        self.otherwise.emit(emitter)?;
        emitter.patch(to_end, Instr::Jump(emitter.position()));
        Ok(())
    }
}
