//! Instance types recognized by the `type` keyword.
use std::fmt;

use serde_json::Value;

use crate::drafts::Draft;

/// The seven primitive types of JSON Schema instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Array,
    Boolean,
    Integer,
    Null,
    Number,
    Object,
    String,
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveType::Array => write!(f, "array"),
            PrimitiveType::Boolean => write!(f, "boolean"),
            PrimitiveType::Integer => write!(f, "integer"),
            PrimitiveType::Null => write!(f, "null"),
            PrimitiveType::Number => write!(f, "number"),
            PrimitiveType::Object => write!(f, "object"),
            PrimitiveType::String => write!(f, "string"),
        }
    }
}

impl TryFrom<&str> for PrimitiveType {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "array" => Ok(PrimitiveType::Array),
            "boolean" => Ok(PrimitiveType::Boolean),
            "integer" => Ok(PrimitiveType::Integer),
            "null" => Ok(PrimitiveType::Null),
            "number" => Ok(PrimitiveType::Number),
            "object" => Ok(PrimitiveType::Object),
            "string" => Ok(PrimitiveType::String),
            _ => Err(()),
        }
    }
}

impl PrimitiveType {
    /// Whether `instance` belongs to this type under the given draft.
    ///
    /// `integer` additionally accepts numbers with a zero fractional part in
    /// drafts 6 and 7; draft 4 requires an integral representation.
    pub(crate) fn contains(self, draft: Draft, instance: &Value) -> bool {
        match self {
            PrimitiveType::Array => instance.is_array(),
            PrimitiveType::Boolean => instance.is_boolean(),
            PrimitiveType::Null => instance.is_null(),
            PrimitiveType::Number => instance.is_number(),
            PrimitiveType::Object => instance.is_object(),
            PrimitiveType::String => instance.is_string(),
            PrimitiveType::Integer => match instance {
                Value::Number(number) => {
                    if number.is_i64() || number.is_u64() {
                        true
                    } else if draft == Draft::Draft4 {
                        false
                    } else {
                        number
                            .as_f64()
                            .map(|value| value.fract() == 0.)
                            .unwrap_or(false)
                    }
                }
                _ => false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(Draft::Draft7, &json!(3), true)]
    #[test_case(Draft::Draft7, &json!(3.0), true)]
    #[test_case(Draft::Draft7, &json!(3.5), false)]
    #[test_case(Draft::Draft4, &json!(3), true)]
    #[test_case(Draft::Draft4, &json!(3.0), false)]
    fn integral_numbers(draft: Draft, instance: &serde_json::Value, expected: bool) {
        assert_eq!(PrimitiveType::Integer.contains(draft, instance), expected)
    }

    #[test]
    fn unknown_name() {
        assert!(PrimitiveType::try_from("float").is_err())
    }
}
