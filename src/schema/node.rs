//! In-memory representation of compiled schema nodes.
//!
//! Nodes live in an arena owned by the root schema and refer to each other by
//! index, so recursive schemas need no back-pointer chains. A node is either
//! a bare boolean schema or a structured set of keyword payloads.
use ahash::AHashMap;
use regex::Regex;
use serde_json::Value;
use url::Url;

use crate::primitive_type::PrimitiveType;

/// Index of a node within the root's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(pub(crate) usize);

#[derive(Debug)]
pub(crate) struct SchemaNode {
    /// JSON Pointer from the root of the containing document, `""` for the
    /// document root. No leading `#`.
    pub(crate) path: String,
    /// Effective base URI: `$id` if present, else the nearest ancestor's
    /// base, else the URI the document was fetched from.
    pub(crate) base_uri: Url,
    pub(crate) form: Form,
}

#[derive(Debug)]
pub(crate) enum Form {
    Boolean(bool),
    Object(Box<ObjectSchema>),
}

impl SchemaNode {
    pub(crate) fn object(&self) -> Option<&ObjectSchema> {
        match &self.form {
            Form::Object(object) => Some(object),
            Form::Boolean(_) => None,
        }
    }

    /// The promoted `$ref` URI, if this node is a reference.
    pub(crate) fn ref_target(&self) -> Option<&str> {
        self.object()
            .and_then(|object| object.ref_target.as_deref())
    }
}

/// `items` is either one schema for all elements or a positional tuple.
#[derive(Debug)]
pub(crate) enum Items {
    Single(NodeId),
    Tuple(Vec<NodeId>),
}

/// Payload shape shared by `additionalItems` and `additionalProperties`.
#[derive(Debug)]
pub(crate) enum BoolOrNode {
    Bool(bool),
    Node(NodeId),
}

/// A `dependencies` entry: either a list of required sibling keys or a schema
/// the whole instance must additionally satisfy.
#[derive(Debug)]
pub(crate) enum Dependency {
    Keys(Vec<String>),
    Node(NodeId),
}

/// Annotation keywords; parsed and exposed, never applied.
#[derive(Debug, Default)]
pub(crate) struct Annotations {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) comment: Option<String>,
    pub(crate) default: Option<Value>,
    pub(crate) examples: Option<Vec<Value>>,
    pub(crate) read_only: Option<bool>,
    pub(crate) write_only: Option<bool>,
    pub(crate) content_media_type: Option<String>,
    pub(crate) content_encoding: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct ObjectSchema {
    /// `$id` resolved against the ancestor base, if declared on this node.
    pub(crate) id: Option<Url>,
    /// Promoted absolute URI of `$ref`, if present.
    pub(crate) ref_target: Option<String>,
    /// Filled by the resolver once the reference is known to point at a
    /// valid node.
    pub(crate) ref_resolved: Option<NodeId>,

    pub(crate) types: Option<Vec<PrimitiveType>>,
    pub(crate) const_: Option<Value>,
    pub(crate) enum_: Option<Vec<Value>>,
    pub(crate) format: Option<String>,

    pub(crate) minimum: Option<f64>,
    pub(crate) maximum: Option<f64>,
    pub(crate) exclusive_minimum: Option<f64>,
    pub(crate) exclusive_maximum: Option<f64>,
    pub(crate) multiple_of: Option<serde_json::Number>,

    pub(crate) min_length: Option<u64>,
    pub(crate) max_length: Option<u64>,
    pub(crate) pattern: Option<Regex>,

    pub(crate) items: Option<Items>,
    pub(crate) additional_items: Option<BoolOrNode>,
    pub(crate) min_items: Option<u64>,
    pub(crate) max_items: Option<u64>,
    pub(crate) unique_items: bool,
    pub(crate) contains: Option<NodeId>,

    pub(crate) properties: Option<AHashMap<String, NodeId>>,
    pub(crate) pattern_properties: Option<Vec<(Regex, NodeId)>>,
    pub(crate) additional_properties: Option<BoolOrNode>,
    pub(crate) property_names: Option<NodeId>,
    pub(crate) required: Option<Vec<String>>,
    pub(crate) min_properties: Option<u64>,
    pub(crate) max_properties: Option<u64>,
    pub(crate) dependencies: Option<Vec<(String, Dependency)>>,

    pub(crate) all_of: Option<Vec<NodeId>>,
    pub(crate) any_of: Option<Vec<NodeId>>,
    pub(crate) one_of: Option<Vec<NodeId>>,
    pub(crate) not: Option<NodeId>,
    pub(crate) if_: Option<NodeId>,
    pub(crate) then: Option<NodeId>,
    pub(crate) else_: Option<NodeId>,

    pub(crate) definitions: Option<AHashMap<String, NodeId>>,
    pub(crate) annotations: Annotations,
}

impl ObjectSchema {
    pub(crate) fn property(&self, key: &str) -> Option<NodeId> {
        self.properties
            .as_ref()
            .and_then(|properties| properties.get(key).copied())
    }
}
