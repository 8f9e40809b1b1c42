//! Expression tree.
//!
//! Nodes check operand kinds when they are constructed, committing any
//! undetermined parameters they touch. A tree that was built successfully
//! is therefore well-typed; [`Node::simplify`] only folds constants and
//! [`Node::emit`] only lowers to bytecode.

mod constant;
mod function;
mod operation;
mod parameter;

pub use constant::ConstantNode;
pub use function::FunctionNode;
pub use operation::{BinaryNode, ConditionalNode, UnaryNode};
pub use parameter::{BindingNode, ParameterFlavor, ParameterNode};

use mathex_builtins::{Value, ValueKind};
use std::fmt;
use std::sync::Arc;

use crate::emit::Emitter;
use crate::error::{CompileError, Result};
use crate::parameters::ParameterRegistry;

#[derive(Debug, Clone)]
pub enum Node {
    Constant(ConstantNode),
    Parameter(ParameterNode),
    Binding(BindingNode),
    Unary(UnaryNode),
    Binary(BinaryNode),
    Function(FunctionNode),
    Conditional(ConditionalNode),
}

impl Node {
    pub fn constant(value: impl Into<Value>) -> Node {
        Node::Constant(ConstantNode::new(value.into()))
    }

    pub fn parameter(name: &str, registry: &Arc<ParameterRegistry>) -> Result<Node> {
        Ok(Node::Parameter(ParameterNode::new(name, registry)?))
    }

    pub fn kind(&self) -> Result<ValueKind> {
        match self {
            Node::Constant(c) => Ok(c.kind()),
            Node::Parameter(p) => p.kind(),
            Node::Binding(b) => Ok(b.kind),
            Node::Unary(u) => Ok(u.kind),
            Node::Binary(b) => Ok(b.kind),
            Node::Function(f) => Ok(f.kind),
            Node::Conditional(c) => Ok(c.kind),
        }
    }

    pub fn as_constant(&self) -> Option<&Value> {
        match self {
            Node::Constant(c) => Some(&c.value),
            _ => None,
        }
    }

    /// Local constant folding, bottom-up. Nodes that cannot fold come back
    /// unchanged.
    pub fn simplify(self) -> Result<Node> {
        match self {
            Node::Unary(u) => u.simplify(),
            Node::Binary(b) => b.simplify(),
            Node::Function(f) => f.simplify(),
            Node::Conditional(c) => c.simplify(),
            leaf => Ok(leaf),
        }
    }

    /// Copy of the tree whose parameters refer to `registry`.
    pub fn deep_clone(&self, registry: &Arc<ParameterRegistry>) -> Node {
        match self {
            Node::Constant(c) => Node::Constant(c.clone()),
            Node::Parameter(p) => Node::Parameter(p.rebind(registry)),
            Node::Binding(b) => Node::Binding(b.clone()),
            Node::Unary(u) => Node::Unary(u.deep_clone(registry)),
            Node::Binary(b) => Node::Binary(b.deep_clone(registry)),
            Node::Function(f) => Node::Function(f.deep_clone(registry)),
            Node::Conditional(c) => Node::Conditional(c.deep_clone(registry)),
        }
    }

    pub fn emit(&self, emitter: &mut Emitter) -> Result<()> {
        match self {
            Node::Constant(c) => c.emit(emitter),
            Node::Parameter(p) => p.emit(emitter),
            Node::Binding(b) => b.emit(emitter),
            Node::Unary(u) => u.emit(emitter),
            Node::Binary(b) => b.emit(emitter),
            Node::Function(f) => f.emit(emitter),
            Node::Conditional(c) => c.emit(emitter),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Constant(c) => match &c.value {
                Value::String(s) => write!(f, "{s:?}"),
                other => write!(f, "{other}"),
            },
            Node::Parameter(p) => write!(f, "{}", p.name()),
            Node::Binding(b) => write!(f, "{}", b.name),
            Node::Unary(u) => write!(f, "{}{}", u.op.symbol(), u.operand),
            Node::Binary(b) => write!(f, "({} {} {})", b.left, b.op.symbol(), b.right),
            Node::Function(func) => {
                write!(f, "{}(", func.function.name)?;
                for (i, arg) in func.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Node::Conditional(c) => {
                write!(f, "if({}, {}, {})", c.condition, c.then, c.otherwise)
            }
        }
    }
}

/// Requires `node` to produce `kind`. An undetermined parameter is committed;
/// nodes of unknown kind that are not parameters are checked at run time.
pub(crate) fn require_kind(node: &Node, kind: ValueKind, context: &str) -> Result<()> {
    if let Node::Parameter(p) = node {
        return p.registry().determine(p.name(), kind);
    }
    let actual = node.kind()?;
    // An Unknown non-parameter (e.g. a host function declared Unknown) is
    // fixed at construction; the VM and the function itself check its value
    if actual == kind || !actual.is_determined() {
        Ok(())
    } else {
        Err(CompileError::validity(format!(
            "{context} expects {kind}, found {actual}"
        )))
    }
}

pub(crate) fn require_integer(node: &Node, context: &str) -> Result<()> {
    match node {
        Node::Parameter(p) => p.registry().determine_integer(p.name()),
        Node::Constant(c) if matches!(c.value, Value::Num(_)) && c.value.as_i64().is_none() => {
            Err(CompileError::validity(format!(
                "{context} expects an integer, found {}",
                c.value
            )))
        }
        _ => Ok(()),
    }
}

pub(crate) fn require_float(node: &Node) -> Result<()> {
    match node {
        Node::Parameter(p) => p.registry().determine_float(p.name()),
        _ => Ok(()),
    }
}

/// Marks `node` functional when it is a direct parameter reference.
pub fn defer_parameter(node: &Node) -> Result<()> {
    match node {
        Node::Parameter(p) => p.defer(),
        _ => Ok(()),
    }
}

pub(crate) fn is_parameter(node: &Node) -> bool {
    matches!(node, Node::Parameter(_))
}

/// First determined kind of the two.
pub(crate) fn pick_kind(a: ValueKind, b: ValueKind) -> Option<ValueKind> {
    if a.is_determined() {
        Some(a)
    } else if b.is_determined() {
        Some(b)
    } else {
        None
    }
}
