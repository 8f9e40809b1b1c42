//! Builtin function library, registered with `inventory` at link time.

mod numeric;
mod string;

use crate::Value;

pub(crate) fn arg<'a>(args: &'a [Value], index: usize) -> Result<&'a Value, String> {
    args.get(index)
        .ok_or_else(|| format!("missing argument {}", index + 1))
}

pub(crate) fn float_arg(args: &[Value], index: usize) -> Result<f64, String> {
    f64::try_from(arg(args, index)?)
}

pub(crate) fn int_arg(args: &[Value], index: usize) -> Result<i64, String> {
    i64::try_from(arg(args, index)?)
}

pub(crate) fn string_arg(args: &[Value], index: usize) -> Result<String, String> {
    String::try_from(arg(args, index)?)
}
