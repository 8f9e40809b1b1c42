use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Negate,
    Not,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    And,
    Or,
    Xor,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    ShiftLeft,
    ShiftRight,
}

impl UnaryOp {
    /// Spelling in the standard math definition.
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Negate => "-",
            UnaryOp::Not => "!",
        }
    }
}

impl BinaryOp {
    /// Spelling in the standard math definition.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Power => "^",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "#",
            BinaryOp::Equal => "=",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual
        )
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOp::Equal | BinaryOp::NotEqual)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or | BinaryOp::Xor)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::ShiftLeft | BinaryOp::ShiftRight)
    }
}

/// Stack machine instructions. Indices refer to the owning
/// [`crate::Program`]'s tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instr {
    LoadConst(usize),
    LoadParam(usize),
    LoadBinding(usize),
    Unary(UnaryOp),
    Binary(BinaryOp),
    // function index, argument count
    Call(usize, usize),
    JumpIfFalse(usize),
    Jump(usize),
    Return,
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::LoadConst(i) => write!(f, "LoadConst {i}"),
            Instr::LoadParam(i) => write!(f, "LoadParam {i}"),
            Instr::LoadBinding(i) => write!(f, "LoadBinding {i}"),
            Instr::Unary(op) => write!(f, "{op:?}"),
            Instr::Binary(op) => write!(f, "{op:?}"),
            Instr::Call(func, argc) => write!(f, "Call {func} ({argc} args)"),
            Instr::JumpIfFalse(target) => write!(f, "JumpIfFalse -> {target}"),
            Instr::Jump(target) => write!(f, "Jump -> {target}"),
            Instr::Return => write!(f, "Return"),
        }
    }
}
