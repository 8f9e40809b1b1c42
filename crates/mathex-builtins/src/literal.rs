//! Text-to-value parsing shared by the constant registry and the invocation
//! formatter.

use crate::Value;

/// Parses decimal, hexadecimal (`0x` / `&h`) and binary bit-string (`0b`)
/// literals. Decimal integers that fit in `i64` become [`Value::Int`], other
/// decimals [`Value::Num`]; hex up to `i64::MAX` becomes [`Value::Int`] and
/// bit strings become [`Value::Bytes`].
pub fn parse_numeric_literal(text: &str) -> Option<Value> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(hex) = strip_prefix_ci(text, "0x").or_else(|| strip_prefix_ci(text, "&h")) {
        return parse_hex(hex).map(Value::Int);
    }
    if strip_prefix_ci(text, "0b").is_some() {
        return parse_bit_string(text).map(Value::Bytes);
    }

    let unsigned = text.strip_prefix(['-', '+']).unwrap_or(text);
    if unsigned.is_empty()
        || !unsigned.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        || !unsigned
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return None;
    }

    if let Ok(i) = text.parse::<i64>() {
        return Some(Value::Int(i));
    }
    match text.parse::<f64>() {
        Ok(n) if n.is_finite() => Some(Value::Num(n)),
        _ => None,
    }
}

fn strip_prefix_ci<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    if text.len() >= prefix.len() && text[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&text[prefix.len()..])
    } else {
        None
    }
}

fn parse_hex(digits: &str) -> Option<i64> {
    let digits: String = digits.chars().filter(|c| *c != '_').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    // Values above i64::MAX do not fit an Int
    i64::from_str_radix(&digits, 16).ok()
}

/// Parses a bit string (optionally `0b`-prefixed, `_` separators ignored)
/// into little-endian bytes: the right-most eight bits become byte 0. A
/// leading partial group is zero-padded.
pub fn parse_bit_string(text: &str) -> Option<Vec<u8>> {
    let text = text.trim();
    let body = strip_prefix_ci(text, "0b").unwrap_or(text);
    let bits: Vec<u8> = body
        .chars()
        .filter(|c| *c != '_')
        .map(|c| match c {
            '0' => Some(0u8),
            '1' => Some(1u8),
            _ => None,
        })
        .collect::<Option<Vec<u8>>>()?;
    if bits.is_empty() {
        return None;
    }

    let mut bytes = Vec::with_capacity(bits.len().div_ceil(8));
    for group in bits.rchunks(8) {
        let byte = group.iter().fold(0u8, |acc, bit| (acc << 1) | bit);
        bytes.push(byte);
    }
    Some(bytes)
}

pub fn parse_boolean(text: &str) -> Option<bool> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
