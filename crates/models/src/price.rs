//! Price handling.
//!
//! Clients send the price either as a JSON number or as text. On the way in
//! it is coerced strictly (the whole text must be a finite decimal); on the way
//! out, whatever the store holds is re-parsed leniently from its leading
//! numeric prefix.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::errors::ModelError;

/// Price as it arrives in a request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Number(f64),
    Text(String),
}

impl PriceInput {
    /// Falsy prices are numeric zero and the empty string. The text `"0"` is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            PriceInput::Number(n) => *n != 0.0 && !n.is_nan(),
            PriceInput::Text(s) => !s.is_empty(),
        }
    }

    pub fn coerce(&self) -> Result<f64, ModelError> {
        let value = match self {
            PriceInput::Number(n) => *n,
            PriceInput::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| ModelError::InvalidPrice(s.clone()))?,
        };
        if !value.is_finite() {
            return Err(ModelError::InvalidPrice(self.to_string()));
        }
        Ok(value)
    }
}

impl std::fmt::Display for PriceInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceInput::Number(n) => write!(f, "{n}"),
            PriceInput::Text(s) => f.write_str(s),
        }
    }
}

/// Parse the longest leading decimal literal of `s`, skipping leading whitespace.
///
/// `"3.5"` and `"3.5 USD"` both give `3.5`; `"abc"` gives `None`.
pub fn parse_leading_float(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }
    // exponent only counts when at least one digit follows it
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    s[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Numeric view of a stored price, if it has one.
pub fn stored_price(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_leading_float(s),
        _ => None,
    }
}

/// Normalize a stored price to a JSON number, or `null` when it cannot be read as one.
pub fn normalize_price(value: &Value) -> Value {
    stored_price(value)
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
