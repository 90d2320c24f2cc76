use crate::error::EvalError;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Div, Mul, Rem, Sub};

/// A value produced by evaluating a formula.
///
/// Arrays and objects come from JSON literals or native functions. Object
/// members are kept sorted so that serializing a value is canonical.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty() && s != "0",
            Value::Array(items) => !items.is_empty(),
            Value::Object(_) => true,
        }
    }

    /// Numeric view of a scalar, if it has one. Strings qualify only when
    /// they spell a decimal number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Null => Some(0.0),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Number(n) => Some(*n),
            Value::String(s) => parse_numeric(s),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn to_number(&self, operator: &str) -> Result<f64, EvalError> {
        self.as_number().ok_or_else(|| mismatch(operator, self))
    }

    /// Serializes the value as JSON. Object keys are sorted.
    pub fn canonical_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn power(self, rhs: Value) -> Result<Value, EvalError> {
        let base = self.to_number("^")?;
        let exponent = rhs.to_number("^")?;
        Ok(Value::Number(base.powf(exponent)))
    }

    /// Loose equality: structural for arrays/objects, numeric when both
    /// sides are numeric, textual otherwise.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(_) | Value::Object(_), Value::Array(_) | Value::Object(_)) => {
                self.canonical_json() == other.canonical_json()
            }
            (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => {
                false
            }
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a == b,
                _ => self.to_string() == other.to_string(),
            },
        }
    }

    /// Ordering used by `<`, `>`, `<=` and `>=`. `None` means unordered (NaN).
    pub fn compare(&self, other: &Value, operator: &str) -> Result<Option<Ordering>, EvalError> {
        if let Value::Array(_) | Value::Object(_) = self {
            return Err(mismatch(operator, self));
        }
        if let Value::Array(_) | Value::Object(_) = other {
            return Err(mismatch(operator, other));
        }
        Ok(match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => Some(self.to_string().cmp(&other.to_string())),
        })
    }

    /// Member access used by the `[` operator.
    pub fn index(&self, selector: &Value) -> Result<Value, EvalError> {
        match self {
            Value::Array(items) => {
                let position = selector
                    .as_number()
                    .filter(|n| n.fract() == 0.0 && *n >= 0.0);
                Ok(position
                    .and_then(|n| items.get(n as usize))
                    .cloned()
                    .unwrap_or(Value::Null))
            }
            Value::Object(members) => Ok(members
                .get(&selector.to_string())
                .cloned()
                .unwrap_or(Value::Null)),
            other => Err(EvalError::InvalidSelector(format!(
                "cannot index {} with {}",
                other.type_name(),
                selector
            ))),
        }
    }
}

fn parse_numeric(text: &str) -> Option<f64> {
    let text = text.trim();
    let looks_numeric = !text.is_empty()
        && text.bytes().any(|b| b.is_ascii_digit())
        && text
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    if looks_numeric {
        text.parse().ok()
    } else {
        None
    }
}

fn mismatch(operator: &str, operand: &Value) -> EvalError {
    EvalError::TypeMismatch {
        operator: operator.to_string(),
        operand: operand.type_name().to_string(),
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NAN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "INF" } else { "-INF" };
        text.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null | Value::Bool(false) => Ok(()),
            Value::Bool(true) => f.write_str("1"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Array(_) | Value::Object(_) => f.write_str(&self.canonical_json()),
        }
    }
}

impl Add for Value {
    type Output = Result<Value, EvalError>;

    fn add(self, rhs: Self) -> Self::Output {
        match (&self, &rhs) {
            (Value::String(_), _) | (_, Value::String(_)) => {
                Ok(Value::String(format!("{}{}", self, rhs)))
            }
            _ => Ok(Value::Number(self.to_number("+")? + rhs.to_number("+")?)),
        }
    }
}

impl Sub for Value {
    type Output = Result<Value, EvalError>;

    fn sub(self, rhs: Self) -> Self::Output {
        Ok(Value::Number(self.to_number("-")? - rhs.to_number("-")?))
    }
}

impl Mul for Value {
    type Output = Result<Value, EvalError>;

    fn mul(self, rhs: Self) -> Self::Output {
        Ok(Value::Number(self.to_number("*")? * rhs.to_number("*")?))
    }
}

impl Div for Value {
    type Output = Result<Value, EvalError>;

    fn div(self, rhs: Self) -> Self::Output {
        let dividend = self.to_number("/")?;
        let divisor = rhs.to_number("/")?;
        if divisor == 0.0 {
            Err(EvalError::DivisionByZero)
        } else {
            Ok(Value::Number(dividend / divisor))
        }
    }
}

impl Rem for Value {
    type Output = Result<Value, EvalError>;

    // integer modulo, operands truncated first
    fn rem(self, rhs: Self) -> Self::Output {
        let dividend = self.to_number("%")?.trunc() as i64;
        let divisor = rhs.to_number("%")?.trunc() as i64;
        if divisor == 0 {
            Err(EvalError::DivisionByZero)
        } else {
            Ok(Value::Number(dividend.wrapping_rem(divisor) as f64))
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(members) => Value::Object(
                members
                    .into_iter()
                    .map(|(key, member)| (key, Value::from(member)))
                    .collect(),
            ),
        }
    }
}
