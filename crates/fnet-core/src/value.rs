//! Literal values carried by Literal boxes and port defaults.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A constant value with its source-level type tag.
///
/// The value payload is kept as loosely typed JSON because the lowering pass
/// does no type checking; downstream consumers interpret it against
/// `value_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralValue {
    pub value_type: String,
    pub value: Value,
}

impl LiteralValue {
    pub fn new(value_type: impl Into<String>, value: Value) -> Self {
        LiteralValue {
            value_type: value_type.into(),
            value,
        }
    }

    /// A string literal.
    pub fn string(s: impl Into<String>) -> Self {
        LiteralValue::new("string", Value::String(s.into()))
    }

    /// The distinguished none literal.
    pub fn none() -> Self {
        LiteralValue::new("None", Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_literal_shape() {
        let v = LiteralValue::string("Point");
        assert_eq!(v.value_type, "string");
        assert_eq!(v.value, Value::String("Point".into()));
    }

    #[test]
    fn none_literal_shape() {
        let v = LiteralValue::none();
        assert_eq!(v.value_type, "None");
        assert!(v.value.is_null());
    }

    #[test]
    fn serde_roundtrip() {
        let v = LiteralValue::new("Integer", serde_json::json!(42));
        let json = serde_json::to_string(&v).unwrap();
        let back: LiteralValue = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
