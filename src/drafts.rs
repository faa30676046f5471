//! Supported JSON Schema draft versions and their keyword tables.
use serde_json::Value;

/// JSON Schema Draft version
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Default)]
pub enum Draft {
    /// JSON Schema Draft 4
    Draft4,
    /// JSON Schema Draft 6
    Draft6,
    /// JSON Schema Draft 7
    #[default]
    Draft7,
}

impl std::fmt::Display for Draft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Draft::Draft4 => f.write_str("draft-04"),
            Draft::Draft6 => f.write_str("draft-06"),
            Draft::Draft7 => f.write_str("draft-07"),
        }
    }
}

/// Recognized schema keywords. The set is fixed per draft; everything else
/// goes through the unknown-keyword path during compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Keyword {
    AdditionalItems,
    AdditionalProperties,
    AllOf,
    AnyOf,
    Comment,
    Const,
    Contains,
    ContentEncoding,
    ContentMediaType,
    Default,
    Definitions,
    Dependencies,
    Description,
    Else,
    Enum,
    Examples,
    ExclusiveMaximum,
    ExclusiveMinimum,
    Format,
    Id,
    If,
    Items,
    MaxItems,
    MaxLength,
    MaxProperties,
    Maximum,
    MinItems,
    MinLength,
    MinProperties,
    Minimum,
    MultipleOf,
    Not,
    OneOf,
    Pattern,
    PatternProperties,
    Properties,
    PropertyNames,
    ReadOnly,
    Ref,
    Required,
    Schema,
    Then,
    Title,
    Type,
    UniqueItems,
    WriteOnly,
}

impl Draft {
    /// Look up a keyword in this draft's table.
    pub(crate) fn get_keyword(self, keyword: &str) -> Option<Keyword> {
        match keyword {
            "additionalItems" => Some(Keyword::AdditionalItems),
            "additionalProperties" => Some(Keyword::AdditionalProperties),
            "allOf" => Some(Keyword::AllOf),
            "anyOf" => Some(Keyword::AnyOf),
            "$comment" => match self {
                Draft::Draft7 => Some(Keyword::Comment),
                Draft::Draft4 | Draft::Draft6 => None,
            },
            "const" => match self {
                Draft::Draft4 => None,
                Draft::Draft6 | Draft::Draft7 => Some(Keyword::Const),
            },
            "contains" => match self {
                Draft::Draft4 => None,
                Draft::Draft6 | Draft::Draft7 => Some(Keyword::Contains),
            },
            "contentEncoding" => match self {
                Draft::Draft7 => Some(Keyword::ContentEncoding),
                Draft::Draft4 | Draft::Draft6 => None,
            },
            "contentMediaType" => match self {
                Draft::Draft7 => Some(Keyword::ContentMediaType),
                Draft::Draft4 | Draft::Draft6 => None,
            },
            "default" => Some(Keyword::Default),
            "definitions" => Some(Keyword::Definitions),
            "dependencies" => Some(Keyword::Dependencies),
            "description" => Some(Keyword::Description),
            "else" => match self {
                Draft::Draft7 => Some(Keyword::Else),
                Draft::Draft4 | Draft::Draft6 => None,
            },
            "enum" => Some(Keyword::Enum),
            "examples" => match self {
                Draft::Draft4 => None,
                Draft::Draft6 | Draft::Draft7 => Some(Keyword::Examples),
            },
            "exclusiveMaximum" => Some(Keyword::ExclusiveMaximum),
            "exclusiveMinimum" => Some(Keyword::ExclusiveMinimum),
            "format" => Some(Keyword::Format),
            "id" => match self {
                Draft::Draft4 => Some(Keyword::Id),
                Draft::Draft6 | Draft::Draft7 => None,
            },
            "$id" => match self {
                Draft::Draft4 => None,
                Draft::Draft6 | Draft::Draft7 => Some(Keyword::Id),
            },
            "if" => match self {
                Draft::Draft7 => Some(Keyword::If),
                Draft::Draft4 | Draft::Draft6 => None,
            },
            "items" => Some(Keyword::Items),
            "maxItems" => Some(Keyword::MaxItems),
            "maxLength" => Some(Keyword::MaxLength),
            "maxProperties" => Some(Keyword::MaxProperties),
            "maximum" => Some(Keyword::Maximum),
            "minItems" => Some(Keyword::MinItems),
            "minLength" => Some(Keyword::MinLength),
            "minProperties" => Some(Keyword::MinProperties),
            "minimum" => Some(Keyword::Minimum),
            "multipleOf" => Some(Keyword::MultipleOf),
            "not" => Some(Keyword::Not),
            "oneOf" => Some(Keyword::OneOf),
            "pattern" => Some(Keyword::Pattern),
            "patternProperties" => Some(Keyword::PatternProperties),
            "properties" => Some(Keyword::Properties),
            "propertyNames" => match self {
                Draft::Draft4 => None,
                Draft::Draft6 | Draft::Draft7 => Some(Keyword::PropertyNames),
            },
            "readOnly" => match self {
                Draft::Draft7 => Some(Keyword::ReadOnly),
                Draft::Draft4 | Draft::Draft6 => None,
            },
            "$ref" => Some(Keyword::Ref),
            "required" => Some(Keyword::Required),
            "$schema" => Some(Keyword::Schema),
            "then" => match self {
                Draft::Draft7 => Some(Keyword::Then),
                Draft::Draft4 | Draft::Draft6 => None,
            },
            "title" => Some(Keyword::Title),
            "type" => Some(Keyword::Type),
            "uniqueItems" => Some(Keyword::UniqueItems),
            "writeOnly" => match self {
                Draft::Draft7 => Some(Keyword::WriteOnly),
                Draft::Draft4 | Draft::Draft6 => None,
            },
            _ => None,
        }
    }

    /// Whether the named format is defined for this draft.
    pub(crate) fn supports_format(self, format: &str) -> bool {
        match format {
            "date-time" | "email" | "hostname" | "ipv4" | "ipv6" | "uri" => true,
            "json-pointer" | "uri-reference" | "uri-template" => {
                matches!(self, Draft::Draft6 | Draft::Draft7)
            }
            "date" | "idn-email" | "idn-hostname" | "iri" | "iri-reference" | "regex"
            | "relative-json-pointer" | "time" => self == Draft::Draft7,
            _ => false,
        }
    }

    /// Boolean schemas (`true`/`false`) were introduced in draft 6.
    pub(crate) fn supports_boolean_schemas(self) -> bool {
        self != Draft::Draft4
    }

    /// Whether `format` is an assertion by default under this draft.
    pub(crate) fn validate_formats_by_default(self) -> bool {
        // All drafts up to 7 treat `format` as an assertion.
        true
    }
}

/// Get the `Draft` from a JSON Schema URL.
#[inline]
pub(crate) fn draft_from_url(url: &str) -> Option<Draft> {
    match url {
        "http://json-schema.org/draft-07/schema#" => Some(Draft::Draft7),
        "http://json-schema.org/draft-06/schema#" => Some(Draft::Draft6),
        "http://json-schema.org/draft-04/schema#" => Some(Draft::Draft4),
        _ => None,
    }
}

/// Get the `Draft` from a JSON Schema document.
#[inline]
pub(crate) fn draft_from_schema(schema: &Value) -> Option<Draft> {
    schema
        .get("$schema")
        .and_then(Value::as_str)
        .and_then(draft_from_url)
}

/// The `$id` (or draft-4 `id`) of a schema object, if any.
#[inline]
pub(crate) fn id_of(draft: Draft, schema: &Value) -> Option<&str> {
    if let Value::Object(object) = schema {
        if draft == Draft::Draft4 {
            object.get("id")
        } else {
            object.get("$id")
        }
        .and_then(Value::as_str)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(&json!({"$schema": "http://json-schema.org/draft-07/schema#"}), Some(Draft::Draft7))]
    #[test_case(&json!({"$schema": "http://json-schema.org/draft-06/schema#"}), Some(Draft::Draft6))]
    #[test_case(&json!({"$schema": "http://json-schema.org/draft-04/schema#"}), Some(Draft::Draft4))]
    #[test_case(&json!({"$schema": "http://example.com/custom/schema#"}), None)]
    fn draft_detection(schema: &Value, draft: Option<Draft>) {
        assert_eq!(draft_from_schema(schema), draft)
    }

    #[test_case(Draft::Draft4, "if", None)]
    #[test_case(Draft::Draft7, "if", Some(Keyword::If))]
    #[test_case(Draft::Draft4, "const", None)]
    #[test_case(Draft::Draft6, "const", Some(Keyword::Const))]
    #[test_case(Draft::Draft4, "id", Some(Keyword::Id))]
    #[test_case(Draft::Draft7, "id", None)]
    #[test_case(Draft::Draft7, "$id", Some(Keyword::Id))]
    fn keyword_tables(draft: Draft, keyword: &str, expected: Option<Keyword>) {
        assert_eq!(draft.get_keyword(keyword), expected)
    }

    #[test_case(Draft::Draft4, "uri-reference", false)]
    #[test_case(Draft::Draft6, "uri-reference", true)]
    #[test_case(Draft::Draft6, "time", false)]
    #[test_case(Draft::Draft7, "time", true)]
    #[test_case(Draft::Draft7, "unknown", false)]
    fn format_tables(draft: Draft, format: &str, expected: bool) {
        assert_eq!(draft.supports_format(format), expected)
    }

    #[test]
    fn default_draft() {
        assert_eq!(Draft::default(), Draft::Draft7)
    }
}
