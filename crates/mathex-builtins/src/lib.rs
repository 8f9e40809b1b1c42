pub use inventory;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;

pub mod functions;
pub mod literal;

pub use literal::{parse_bit_string, parse_boolean, parse_numeric_literal};

/// A runtime value. Numbers keep their integer/floating-point refinement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Num(f64),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
}

/// The closed set of value domains a node or parameter resolves to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Unknown,
    Boolean,
    Numeric,
    String,
    ByteArray,
}

/// Refinement of [`ValueKind::Numeric`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericKind {
    Integer,
    Float,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) | Value::Num(_) => ValueKind::Numeric,
            Value::Bool(_) => ValueKind::Boolean,
            Value::String(_) => ValueKind::String,
            Value::Bytes(_) => ValueKind::ByteArray,
        }
    }

    pub fn numeric_kind(&self) -> Option<NumericKind> {
        match self {
            Value::Int(_) => Some(NumericKind::Integer),
            Value::Num(_) => Some(NumericKind::Float),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Num(n) => Some(*n),
            _ => None,
        }
    }

    /// Integer view of a numeric value; floats qualify only when integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Num(n) if n.fract() == 0.0 && n.is_finite() => {
                if *n >= i64::MIN as f64 && *n <= i64::MAX as f64 {
                    Some(*n as i64)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Non-zero numbers and `true` are truthy.
    pub fn truthy(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            Value::Num(n) => Some(*n != 0.0),
            _ => None,
        }
    }
}

impl ValueKind {
    pub fn is_determined(self) -> bool {
        self != ValueKind::Unknown
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Unknown => "unknown",
            ValueKind::Boolean => "boolean",
            ValueKind::Numeric => "numeric",
            ValueKind::String => "string",
            ValueKind::ByteArray => "byte array",
        };
        f.write_str(name)
    }
}

impl fmt::Display for NumericKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericKind::Integer => f.write_str("integer"),
            NumericKind::Float => f.write_str("float"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Num(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Bytes(bytes) => {
                write!(f, "[")?;
                for (i, b) in bytes.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{b:#04x}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Num(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl TryFrom<&Value> for i64 {
    type Error = String;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        v.as_i64()
            .ok_or_else(|| format!("cannot convert {v:?} to integer"))
    }
}

impl TryFrom<&Value> for f64 {
    type Error = String;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        v.as_f64().ok_or_else(|| format!("cannot convert {v:?} to f64"))
    }
}

impl TryFrom<&Value> for bool {
    type Error = String;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        v.truthy().ok_or_else(|| format!("cannot convert {v:?} to bool"))
    }
}

impl TryFrom<&Value> for String {
    type Error = String;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::String(s) => Ok(s.clone()),
            Value::Int(_) | Value::Num(_) | Value::Bool(_) => Ok(v.to_string()),
            Value::Bytes(_) => Err(format!("cannot convert {v:?} to String")),
        }
    }
}

impl TryFrom<&Value> for Vec<u8> {
    type Error = String;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::Bytes(b) => Ok(b.clone()),
            _ => Err(format!("cannot convert {v:?} to bytes")),
        }
    }
}

/// Kind a builtin expects for one argument position.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParamKind {
    Numeric,
    Integer,
    Float,
    String,
    Boolean,
    ByteArray,
    Any,
}

impl ParamKind {
    pub fn value_kind(self) -> ValueKind {
        match self {
            ParamKind::Numeric | ParamKind::Integer | ParamKind::Float => ValueKind::Numeric,
            ParamKind::String => ValueKind::String,
            ParamKind::Boolean => ValueKind::Boolean,
            ParamKind::ByteArray => ValueKind::ByteArray,
            ParamKind::Any => ValueKind::Unknown,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Range(usize, usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::Range(lo, hi) => (lo..=hi).contains(&count),
            Arity::AtLeast(n) => count >= n,
        }
    }
}

/// A builtin function registered through `inventory`.
#[derive(Debug, Clone)]
pub struct BuiltinFunction {
    pub name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub arity: Arity,
    /// Positional kinds; the last entry repeats for variadic arities.
    pub param_kinds: &'static [ParamKind],
    pub return_kind: ValueKind,
    pub implementation: fn(&[Value]) -> Result<Value, String>,
}

impl BuiltinFunction {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        category: &'static str,
        arity: Arity,
        param_kinds: &'static [ParamKind],
        return_kind: ValueKind,
        implementation: fn(&[Value]) -> Result<Value, String>,
    ) -> Self {
        Self {
            name,
            description,
            category,
            arity,
            param_kinds,
            return_kind,
            implementation,
        }
    }

    pub fn param_kind(&self, index: usize) -> ParamKind {
        match self.param_kinds.get(index) {
            Some(kind) => *kind,
            None => self.param_kinds.last().copied().unwrap_or(ParamKind::Any),
        }
    }
}

/// A named constant usable directly in formula text (`pi`, `true`, ...).
#[derive(Clone)]
pub struct Constant {
    pub name: &'static str,
    pub value: Value,
}

impl std::fmt::Debug for Constant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Constant {{ name: {:?}, value: {:?} }}",
            self.name, self.value
        )
    }
}

inventory::collect!(BuiltinFunction);
inventory::collect!(Constant);

pub fn builtin_functions() -> Vec<&'static BuiltinFunction> {
    inventory::iter::<BuiltinFunction>().collect()
}

/// Case-sensitive lookup by name and argument count.
pub fn find_builtin(name: &str, arity: usize) -> Option<&'static BuiltinFunction> {
    inventory::iter::<BuiltinFunction>().find(|b| b.name == name && b.arity.accepts(arity))
}

pub fn constants() -> Vec<&'static Constant> {
    inventory::iter::<Constant>().collect()
}

pub fn find_constant(name: &str) -> Option<&'static Constant> {
    inventory::iter::<Constant>().find(|c| c.name == name)
}

inventory::submit! {
    Constant { name: "pi", value: Value::Num(std::f64::consts::PI) }
}

inventory::submit! {
    Constant { name: "tau", value: Value::Num(std::f64::consts::TAU) }
}

inventory::submit! {
    Constant { name: "true", value: Value::Bool(true) }
}

inventory::submit! {
    Constant { name: "false", value: Value::Bool(false) }
}
