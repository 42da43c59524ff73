/*
MIT License

Copyright (c) 2026 Raja Lehtihet and Wael El Oraiby

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/

//! Tagged numeric/text values exchanged between resolution, execution and
//! persistence.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A card variable value.
///
/// Integers travel as [`Value::Number`] holding an integral `f64`; the
/// declared [`ValueType`] says how strictly a value is checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Numeric value.
    Number(f64),
    /// Text value.
    Text(String),
}

/// Declared type of a card variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Floating-point number (`double`).
    Number,
    /// Whole number (`int`).
    Integer,
    /// Free text (`string`).
    Text,
}

impl ValueType {
    /// Maps a schema type string (`"double"`, `"int"`, `"string"`, ...).
    pub fn from_schema_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "double" | "float" | "decimal" | "number" => Some(ValueType::Number),
            "int" | "long" | "integer" => Some(ValueType::Integer),
            "string" | "text" => Some(ValueType::Text),
            _ => None,
        }
    }

    /// Human-readable name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Number => "number",
            ValueType::Integer => "integer",
            ValueType::Text => "text",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    /// Returns the numeric payload, if any.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(_) => None,
        }
    }

    /// Returns the text payload, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Number(_) => None,
            Value::Text(s) => Some(s),
        }
    }

    /// Short description of the runtime shape, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Number(n) if is_integral(*n) => "integer",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
        }
    }

    /// Converts the value to the declared type.
    ///
    /// Numbers pass as numbers, text is trimmed and parsed; integers must be
    /// finite and whole; numbers render as text with shortest round-trip
    /// formatting. Returns `None` when no conversion applies.
    pub fn coerce(&self, target: ValueType) -> Option<Value> {
        match (target, self) {
            (ValueType::Number, Value::Number(n)) => Some(Value::Number(*n)),
            (ValueType::Number, Value::Text(s)) => s.trim().parse::<f64>().ok().map(Value::Number),
            (ValueType::Integer, Value::Number(n)) => {
                is_integral(*n).then_some(Value::Number(*n))
            }
            (ValueType::Integer, Value::Text(s)) => s
                .trim()
                .parse::<i64>()
                .ok()
                .map(|i| Value::Number(i as f64)),
            (ValueType::Text, Value::Text(s)) => Some(Value::Text(s.clone())),
            (ValueType::Text, Value::Number(n)) => Some(Value::Text(n.to_string())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

/// Returns whether `n` is finite, whole and inside the `i64` range.
pub(crate) fn is_integral(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_numbers_are_trimmed_and_parsed() {
        assert_eq!(
            Value::from(" 830 ").coerce(ValueType::Number),
            Some(Value::Number(830.0))
        );
        assert_eq!(Value::from("abc").coerce(ValueType::Number), None);
    }

    #[test]
    fn integers_reject_fractions_and_non_finite() {
        assert_eq!(
            Value::Number(4.0).coerce(ValueType::Integer),
            Some(Value::Number(4.0))
        );
        assert_eq!(Value::Number(4.5).coerce(ValueType::Integer), None);
        assert_eq!(Value::Number(f64::NAN).coerce(ValueType::Integer), None);
        assert_eq!(Value::from("4.0").coerce(ValueType::Integer), None);
    }

    #[test]
    fn numbers_render_as_text() {
        assert_eq!(
            Value::Number(66.85).coerce(ValueType::Text),
            Some(Value::from("66.85"))
        );
        assert_eq!(Value::Number(4.0).coerce(ValueType::Text), Some(Value::from("4")));
    }

    #[test]
    fn schema_names_map_to_types() {
        assert_eq!(ValueType::from_schema_name("double"), Some(ValueType::Number));
        assert_eq!(ValueType::from_schema_name("Int"), Some(ValueType::Integer));
        assert_eq!(ValueType::from_schema_name("string"), Some(ValueType::Text));
        assert_eq!(ValueType::from_schema_name("vec3d"), None);
    }

    #[test]
    fn values_serialize_untagged() {
        let json = serde_json::to_string(&vec![Value::Number(1.5), Value::from("S355")]).unwrap();
        assert_eq!(json, r#"[1.5,"S355"]"#);
    }
}
