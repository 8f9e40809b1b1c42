//! Call-time coercion of caller arguments to committed parameter kinds.

use mathex_builtins::{parse_bit_string, parse_boolean, parse_numeric_literal, Value, ValueKind};

use crate::error::InvokeError;
use crate::parameters::{NumericRequirement, ParameterContext};

/// Coerces `args` positionally to the kinds in `parameters`.
pub fn adapt(args: &[Value], parameters: &[ParameterContext]) -> Result<Vec<Value>, InvokeError> {
    if args.len() != parameters.len() {
        return Err(InvokeError::ArityMismatch {
            expected: parameters.len(),
            actual: args.len(),
        });
    }
    args.iter()
        .zip(parameters)
        .map(|(arg, param)| adapt_one(arg, param))
        .collect()
}

fn adapt_one(arg: &Value, param: &ParameterContext) -> Result<Value, InvokeError> {
    let adapted = match param.kind {
        ValueKind::Numeric => numeric(arg, param.numeric),
        ValueKind::Boolean => boolean(arg),
        ValueKind::ByteArray => byte_array(arg),
        ValueKind::String => string(arg),
        ValueKind::Unknown => Some(arg.clone()),
    };
    adapted.ok_or_else(|| InvokeError::TypeMismatch {
        parameter: param.name.clone(),
        expected: param.kind,
        found: describe(arg),
    })
}

fn describe(arg: &Value) -> String {
    match arg {
        Value::String(s) => format!("string {s:?}"),
        other => format!("{} {other}", other.kind()),
    }
}

fn numeric(arg: &Value, requirement: NumericRequirement) -> Option<Value> {
    let value = match arg {
        Value::Int(_) | Value::Num(_) => arg.clone(),
        Value::String(s) => match parse_numeric_literal(s)? {
            v @ (Value::Int(_) | Value::Num(_)) => v,
            _ => return None,
        },
        Value::Bool(_) | Value::Bytes(_) => return None,
    };
    match requirement {
        NumericRequirement::Unset => Some(value),
        NumericRequirement::Integer => value.as_i64().map(Value::Int),
        NumericRequirement::Float => value.as_f64().map(Value::Num),
    }
}

fn boolean(arg: &Value) -> Option<Value> {
    match arg {
        Value::Bool(_) => Some(arg.clone()),
        Value::Int(_) | Value::Num(_) => arg.truthy().map(Value::Bool),
        Value::String(s) => parse_boolean(s).map(Value::Bool),
        Value::Bytes(_) => None,
    }
}

/// Numbers are reinterpreted as their little-endian bytes.
fn byte_array(arg: &Value) -> Option<Value> {
    match arg {
        Value::Bytes(_) => Some(arg.clone()),
        Value::Int(i) => Some(Value::Bytes(i.to_le_bytes().to_vec())),
        Value::Num(n) => Some(Value::Bytes(n.to_le_bytes().to_vec())),
        Value::String(s) => parse_bit_string(s).map(Value::Bytes),
        Value::Bool(_) => None,
    }
}

fn string(arg: &Value) -> Option<Value> {
    match arg {
        Value::String(_) => Some(arg.clone()),
        Value::Int(_) | Value::Num(_) | Value::Bool(_) => Some(Value::String(arg.to_string())),
        Value::Bytes(_) => None,
    }
}
