use super::{arg, float_arg};
use crate::{Arity, BuiltinFunction, ParamKind, Value, ValueKind};

macro_rules! float_builtin {
    ($name:literal, $ident:ident, $op:expr, $desc:literal) => {
        fn $ident(args: &[Value]) -> Result<Value, String> {
            let x = float_arg(args, 0)?;
            Ok(Value::Num(($op)(x)))
        }

        inventory::submit! {
            BuiltinFunction::new(
                $name,
                $desc,
                "math",
                Arity::Exact(1),
                &[ParamKind::Numeric],
                ValueKind::Numeric,
                $ident,
            )
        }
    };
}

float_builtin!("acos", acos, f64::acos, "Arc cosine in radians");
float_builtin!("asin", asin, f64::asin, "Arc sine in radians");
float_builtin!("atan", atan, f64::atan, "Arc tangent in radians");
float_builtin!("ceiling", ceiling, f64::ceil, "Smallest integral value not below x");
float_builtin!("cos", cos, f64::cos, "Cosine");
float_builtin!("cosh", cosh, f64::cosh, "Hyperbolic cosine");
float_builtin!("exp", exp, f64::exp, "e raised to x");
float_builtin!("floor", floor, f64::floor, "Largest integral value not above x");
float_builtin!("ln", ln, f64::ln, "Natural logarithm");
float_builtin!("lg", lg, f64::log10, "Base-10 logarithm");
float_builtin!("round", round, f64::round, "Round half away from zero");
float_builtin!("sin", sin, f64::sin, "Sine");
float_builtin!("sinh", sinh, f64::sinh, "Hyperbolic sine");
float_builtin!("sqrt", sqrt, f64::sqrt, "Square root");
float_builtin!("tan", tan, f64::tan, "Tangent");
float_builtin!("tanh", tanh, f64::tanh, "Hyperbolic tangent");

fn abs(args: &[Value]) -> Result<Value, String> {
    match arg(args, 0)? {
        Value::Int(i) => Ok(i
            .checked_abs()
            .map(Value::Int)
            .unwrap_or(Value::Num((*i as f64).abs()))),
        other => Ok(Value::Num(f64::try_from(other)?.abs())),
    }
}

inventory::submit! {
    BuiltinFunction::new(
        "abs",
        "Absolute value; integers stay integers",
        "math",
        Arity::Exact(1),
        &[ParamKind::Numeric],
        ValueKind::Numeric,
        abs,
    )
}

fn log(args: &[Value]) -> Result<Value, String> {
    let x = float_arg(args, 0)?;
    let base = float_arg(args, 1)?;
    Ok(Value::Num(x.ln() / base.ln()))
}

inventory::submit! {
    BuiltinFunction::new(
        "log",
        "Logarithm of x in the given base",
        "math",
        Arity::Exact(2),
        &[ParamKind::Numeric, ParamKind::Numeric],
        ValueKind::Numeric,
        log,
    )
}

fn pow(args: &[Value]) -> Result<Value, String> {
    match (arg(args, 0)?, arg(args, 1)?) {
        (Value::Int(base), Value::Int(exp)) if *exp >= 0 => {
            let checked = u32::try_from(*exp)
                .ok()
                .and_then(|e| base.checked_pow(e));
            Ok(match checked {
                Some(v) => Value::Int(v),
                None => Value::Num((*base as f64).powf(*exp as f64)),
            })
        }
        _ => Ok(Value::Num(float_arg(args, 0)?.powf(float_arg(args, 1)?))),
    }
}

inventory::submit! {
    BuiltinFunction::new(
        "pow",
        "x raised to y",
        "math",
        Arity::Exact(2),
        &[ParamKind::Numeric, ParamKind::Numeric],
        ValueKind::Numeric,
        pow,
    )
}

fn extremum(args: &[Value], pick_greater: bool) -> Result<Value, String> {
    let mut best = arg(args, 0)?.clone();
    for candidate in &args[1..] {
        let replace = match (&best, candidate) {
            (Value::Int(a), Value::Int(b)) => (b > a) == pick_greater && b != a,
            _ => {
                let a = f64::try_from(&best)?;
                let b = f64::try_from(candidate)?;
                (b > a) == pick_greater && b != a
            }
        };
        if replace {
            best = candidate.clone();
        }
    }
    match best {
        Value::Int(_) | Value::Num(_) => {}
        other => return Err(format!("cannot compare {other:?}")),
    }
    // Mixed int/float inputs widen the winner
    if args.iter().any(|a| matches!(a, Value::Num(_))) {
        return Ok(Value::Num(f64::try_from(&best)?));
    }
    Ok(best)
}

fn min(args: &[Value]) -> Result<Value, String> {
    extremum(args, false)
}

fn max(args: &[Value]) -> Result<Value, String> {
    extremum(args, true)
}

inventory::submit! {
    BuiltinFunction::new(
        "min",
        "Smallest of the arguments",
        "math",
        Arity::AtLeast(1),
        &[ParamKind::Numeric],
        ValueKind::Numeric,
        min,
    )
}

inventory::submit! {
    BuiltinFunction::new(
        "max",
        "Largest of the arguments",
        "math",
        Arity::AtLeast(1),
        &[ParamKind::Numeric],
        ValueKind::Numeric,
        max,
    )
}
