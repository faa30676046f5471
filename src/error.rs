//! Error types
use std::{error, fmt};

use serde_json::Value;

use crate::drafts::Draft;

/// The error type for everything that can go wrong before a schema is usable:
/// malformed input documents, invalid keyword shapes, draft violations and
/// reference resolution failures.
///
/// No partial schema is ever returned alongside one of these.
#[derive(Debug)]
pub enum SchemaError {
    /// The schema document itself is not valid JSON.
    InvalidJson(serde_json::Error),
    /// The instance passed with `parse_json` enabled is not valid JSON.
    InvalidJsonInput(serde_json::Error),
    /// A keyword value does not have the shape the draft requires.
    InvalidKeywordShape {
        /// Offending keyword name.
        keyword: String,
        /// The value found in the document.
        value: Value,
    },
    /// A construct that the target draft does not allow, e.g. a boolean
    /// schema in draft 4.
    InvalidDraftConstruct {
        /// Description of the construct.
        construct: String,
        /// The draft the schema is compiled under.
        draft: Draft,
    },
    /// Draft-4 `exclusiveMaximum`/`exclusiveMinimum` without the bound they
    /// qualify.
    InterdependencyMissing {
        /// The keyword that needs a companion.
        needs: &'static str,
        /// The absent companion keyword.
        missing: &'static str,
    },
    /// A `$ref` that could not be resolved to a schema.
    UnresolvableRef {
        /// The promoted absolute URI of the reference.
        uri: String,
    },
    /// A chain of `$ref`s that revisits one of its own members.
    RefCycle {
        /// Location of the reference that closed the cycle.
        path: String,
    },
    /// A malformed URI in `$id`, `$ref` or a caller-supplied base.
    InvalidUrl(url::ParseError),
    /// Transport failure while fetching a remote document.
    Retrieval {
        /// The URI that was being fetched.
        uri: String,
        /// Transport-level description.
        message: String,
    },
}

impl error::Error for SchemaError {}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::InvalidJson(error) => write!(f, "invalid JSON: {}", error),
            SchemaError::InvalidJsonInput(error) => {
                write!(f, "instance is not valid JSON: {}", error)
            }
            SchemaError::InvalidKeywordShape { keyword, value } => {
                write!(f, "invalid value for '{}': {}", keyword, value)
            }
            SchemaError::InvalidDraftConstruct { construct, draft } => {
                write!(f, "{} is not allowed in {}", construct, draft)
            }
            SchemaError::InterdependencyMissing { needs, missing } => {
                write!(f, "'{}' requires '{}' to be present", needs, missing)
            }
            SchemaError::UnresolvableRef { uri } => write!(f, "unresolvable $ref: {}", uri),
            SchemaError::RefCycle { path } => write!(f, "$ref cycle at {}", path),
            SchemaError::InvalidUrl(error) => write!(f, "{}", error),
            SchemaError::Retrieval { uri, message } => {
                write!(f, "failed to retrieve {}: {}", uri, message)
            }
        }
    }
}

impl From<url::ParseError> for SchemaError {
    #[inline]
    fn from(error: url::ParseError) -> Self {
        SchemaError::InvalidUrl(error)
    }
}

impl From<serde_json::Error> for SchemaError {
    #[inline]
    fn from(error: serde_json::Error) -> Self {
        SchemaError::InvalidJson(error)
    }
}

/// A single violation found while validating an instance.
///
/// `instance_path` points into the validated data and `schema_path` into the
/// schema document; both are JSON Pointers with no leading `#`. The empty
/// string denotes the document root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// JSON Pointer to the offending part of the instance.
    pub instance_path: String,
    /// JSON Pointer to the violated schema keyword.
    pub schema_path: String,
    /// Human readable description of the violation.
    pub message: String,
}

impl ValidationError {
    pub(crate) fn new(
        instance_path: impl Into<String>,
        schema_path: impl Into<String>,
        message: impl Into<String>,
    ) -> ValidationError {
        ValidationError {
            instance_path: instance_path.into(),
            schema_path: schema_path.into(),
            message: message.into(),
        }
    }
}

impl error::Error for ValidationError {}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "# (root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.instance_path, self.message)
        }
    }
}

/// Non-local exit used by the fast-fail validation path. Distinct from
/// `SchemaError` so callers can always tell "bad schema" from "valid schema,
/// bad instance".
#[derive(Debug, Clone, Copy)]
pub(crate) struct FastFail;

pub(crate) type ValidationStep = Result<(), FastFail>;
