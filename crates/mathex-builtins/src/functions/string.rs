use super::{int_arg, string_arg};
use crate::{Arity, BuiltinFunction, ParamKind, Value, ValueKind};

fn trim(args: &[Value]) -> Result<Value, String> {
    Ok(Value::String(string_arg(args, 0)?.trim().to_string()))
}

fn upper(args: &[Value]) -> Result<Value, String> {
    Ok(Value::String(string_arg(args, 0)?.to_uppercase()))
}

fn lower(args: &[Value]) -> Result<Value, String> {
    Ok(Value::String(string_arg(args, 0)?.to_lowercase()))
}

fn length(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Int(string_arg(args, 0)?.chars().count() as i64))
}

/// `substring(s, start[, len])`, zero-based and counted in characters.
fn substring(args: &[Value]) -> Result<Value, String> {
    let text = string_arg(args, 0)?;
    let total = text.chars().count();
    let start = int_arg(args, 1)?;
    let start = usize::try_from(start)
        .ok()
        .filter(|s| *s <= total)
        .ok_or_else(|| format!("substring start {start} out of range 0..={total}"))?;
    let len = match args.get(2) {
        Some(_) => {
            let len = int_arg(args, 2)?;
            usize::try_from(len)
                .ok()
                .filter(|l| start + l <= total)
                .ok_or_else(|| format!("substring length {len} exceeds input"))?
        }
        None => total - start,
    };
    Ok(Value::String(text.chars().skip(start).take(len).collect()))
}

inventory::submit! {
    BuiltinFunction::new(
        "trim",
        "Strip leading and trailing whitespace",
        "string",
        Arity::Exact(1),
        &[ParamKind::String],
        ValueKind::String,
        trim,
    )
}

inventory::submit! {
    BuiltinFunction::new(
        "upper",
        "Uppercase copy of the input",
        "string",
        Arity::Exact(1),
        &[ParamKind::String],
        ValueKind::String,
        upper,
    )
}

inventory::submit! {
    BuiltinFunction::new(
        "lower",
        "Lowercase copy of the input",
        "string",
        Arity::Exact(1),
        &[ParamKind::String],
        ValueKind::String,
        lower,
    )
}

inventory::submit! {
    BuiltinFunction::new(
        "length",
        "Number of characters",
        "string",
        Arity::Exact(1),
        &[ParamKind::String],
        ValueKind::Numeric,
        length,
    )
}

inventory::submit! {
    BuiltinFunction::new(
        "substring",
        "Characters from start, optionally limited to len",
        "string",
        Arity::Range(2, 3),
        &[ParamKind::String, ParamKind::Integer, ParamKind::Integer],
        ValueKind::String,
        substring,
    )
}
