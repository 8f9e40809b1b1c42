//! Operator semantics shared by constant folding and the VM.

use mathex_builtins::Value;

use crate::instr::{BinaryOp, UnaryOp};

pub fn unary(op: UnaryOp, value: &Value) -> Result<Value, String> {
    match (op, value) {
        (UnaryOp::Negate, Value::Int(i)) => Ok(i
            .checked_neg()
            .map(Value::Int)
            .unwrap_or(Value::Num(-(*i as f64)))),
        (UnaryOp::Negate, Value::Num(n)) => Ok(Value::Num(-n)),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Not, Value::Int(i)) => Ok(Value::Int(!i)),
        (UnaryOp::Not, Value::Num(_)) => Ok(Value::Int(!integer(value)?)),
        (UnaryOp::Not, Value::Bytes(bytes)) => Ok(Value::Bytes(bytes.iter().map(|b| !b).collect())),
        (op, v) => Err(format!("{op:?} is not defined for {}", v.kind())),
    }
}

pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, String> {
    use BinaryOp::*;
    match op {
        Add => add(left, right),
        Subtract => arithmetic(op, left, right, i64::checked_sub, |a, b| a - b),
        Multiply => arithmetic(op, left, right, i64::checked_mul, |a, b| a * b),
        Divide => Ok(Value::Num(float(op, left)? / float(op, right)?)),
        Modulo => match (left, right) {
            (Value::Int(_), Value::Int(0)) => Err("integer modulo by zero".to_string()),
            _ => arithmetic(op, left, right, i64::checked_rem, |a, b| a % b),
        },
        Power => power(left, right),
        And | Or | Xor => logical(op, left, right),
        Equal => Ok(Value::Bool(equals(left, right))),
        NotEqual => Ok(Value::Bool(!equals(left, right))),
        Less | LessEqual | Greater | GreaterEqual => compare(op, left, right),
        ShiftLeft | ShiftRight => shift(op, left, right),
    }
}

fn float(op: BinaryOp, value: &Value) -> Result<f64, String> {
    value
        .as_f64()
        .ok_or_else(|| format!("{op:?} expects numbers, found {}", value.kind()))
}

fn integer(value: &Value) -> Result<i64, String> {
    value
        .as_i64()
        .ok_or_else(|| format!("expected an integer, found {value}"))
}

fn arithmetic(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    checked: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, String> {
    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        if let Some(v) = checked(*a, *b) {
            return Ok(Value::Int(v));
        }
    }
    Ok(Value::Num(float_op(float(op, left)?, float(op, right)?)))
}

fn add(left: &Value, right: &Value) -> Result<Value, String> {
    match (left, right) {
        (Value::String(a), b) if !matches!(b, Value::Bytes(_)) => Ok(Value::String(format!("{a}{b}"))),
        (a, Value::String(b)) if !matches!(a, Value::Bytes(_)) => Ok(Value::String(format!("{a}{b}"))),
        (Value::Bytes(a), Value::Bytes(b)) => {
            let mut joined = a.clone();
            joined.extend_from_slice(b);
            Ok(Value::Bytes(joined))
        }
        _ => arithmetic(BinaryOp::Add, left, right, i64::checked_add, |a, b| a + b),
    }
}

fn power(left: &Value, right: &Value) -> Result<Value, String> {
    if let (Value::Int(base), Value::Int(exp)) = (left, right) {
        if let Some(v) = u32::try_from(*exp).ok().and_then(|e| base.checked_pow(e)) {
            return Ok(Value::Int(v));
        }
    }
    Ok(Value::Num(
        float(BinaryOp::Power, left)?.powf(float(BinaryOp::Power, right)?),
    ))
}

fn logical(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, String> {
    let bool_op = |a: bool, b: bool| match op {
        BinaryOp::And => a && b,
        BinaryOp::Or => a || b,
        _ => a ^ b,
    };
    let int_op = |a: i64, b: i64| match op {
        BinaryOp::And => a & b,
        BinaryOp::Or => a | b,
        _ => a ^ b,
    };
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(bool_op(*a, *b))),
        (Value::Bytes(a), Value::Bytes(b)) => {
            let len = a.len().max(b.len());
            let bytes = (0..len)
                .map(|i| {
                    let x = a.get(i).copied().unwrap_or(0) as i64;
                    let y = b.get(i).copied().unwrap_or(0) as i64;
                    int_op(x, y) as u8
                })
                .collect();
            Ok(Value::Bytes(bytes))
        }
        (a, b) if a.as_f64().is_some() && b.as_f64().is_some() => {
            Ok(Value::Int(int_op(integer(a)?, integer(b)?)))
        }
        (a, b) => Err(format!(
            "{op:?} is not defined for {} and {}",
            a.kind(),
            b.kind()
        )),
    }
}

fn equals(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(_), Some(_)) => match (left, right) {
            (Value::Int(a), Value::Int(b)) => a == b,
            _ => left.as_f64() == right.as_f64(),
        },
        _ => left == right,
    }
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, String> {
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => {
            let a = float(op, left)?;
            let b = float(op, right)?;
            match a.partial_cmp(&b) {
                Some(ordering) => ordering,
                None => return Ok(Value::Bool(false)),
            }
        }
    };
    let result = match op {
        BinaryOp::Less => ordering.is_lt(),
        BinaryOp::LessEqual => ordering.is_le(),
        BinaryOp::Greater => ordering.is_gt(),
        _ => ordering.is_ge(),
    };
    Ok(Value::Bool(result))
}

fn shift(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, String> {
    let amount = integer(right)?;
    let amount = u32::try_from(amount).map_err(|_| format!("negative shift amount {amount}"))?;
    match left {
        Value::Bytes(bytes) => Ok(Value::Bytes(shift_bytes(op, bytes, amount as usize))),
        other => {
            let value = integer(other)?;
            let shifted = match op {
                BinaryOp::ShiftLeft => value.checked_shl(amount).unwrap_or(0),
                _ => value
                    .checked_shr(amount)
                    .unwrap_or(if value < 0 { -1 } else { 0 }),
            };
            Ok(Value::Int(shifted))
        }
    }
}

/// Shifts a little-endian bit string, keeping its length.
fn shift_bytes(op: BinaryOp, bytes: &[u8], amount: usize) -> Vec<u8> {
    let bits = bytes.len() * 8;
    let mut out = vec![0u8; bytes.len()];
    for i in 0..bits {
        if bytes[i / 8] & (1 << (i % 8)) == 0 {
            continue;
        }
        let target = match op {
            BinaryOp::ShiftLeft => i.checked_add(amount).filter(|t| *t < bits),
            _ => i.checked_sub(amount),
        };
        if let Some(t) = target {
            out[t / 8] |= 1 << (t % 8);
        }
    }
    out
}
