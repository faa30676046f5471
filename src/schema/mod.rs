//! The compiled schema model: an immutable node tree behind a cheap handle.
pub(crate) mod node;

use std::sync::Arc;

use ahash::AHashSet;
use serde_json::Value;
use url::Url;

use crate::{
    drafts::Draft,
    error::{SchemaError, ValidationError},
    formats::FormatRegistry,
    options::CompileOptions,
    primitive_type::PrimitiveType,
    resolver::{promote, ref_key, Resolver},
    validator::{self, ValidationOptions},
};
use node::{BoolOrNode, Dependency, Form, Items, NodeId, ObjectSchema, SchemaNode};

/// Everything shared by all handles into one compiled tree. Mutated only
/// while the compiler owns it; immutable once wrapped in an `Arc`.
#[derive(Debug)]
pub(crate) struct RootSchema {
    pub(crate) draft: Draft,
    pub(crate) nodes: Vec<SchemaNode>,
    pub(crate) resolver: Resolver,
    pub(crate) formats: FormatRegistry,
    /// Whether `format` is an assertion unless a validation call overrides
    /// it.
    pub(crate) validate_formats: bool,
    /// The raw root document, kept so a compiled schema can serve as a
    /// reference provider result.
    pub(crate) source: Value,
}

/// A compiled JSON Schema.
///
/// Cloning is cheap: handles share the compiled tree and its ref map by
/// identity. Validation never mutates the schema, so one compiled schema can
/// serve many threads.
///
/// ```rust
/// # use jsonschema_tree::{Schema, SchemaError};
/// # use serde_json::json;
/// # fn main() -> Result<(), SchemaError> {
/// let schema = Schema::compile(&json!({"maxLength": 5}))?;
/// assert!(schema.is_valid(&json!("foo")));
/// assert!(!schema.is_valid(&json!("foo bar")));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Schema {
    pub(crate) root: Arc<RootSchema>,
    pub(crate) node: NodeId,
}

/// Payload of `additionalItems` / `additionalProperties`: a bare boolean or
/// a full schema.
#[derive(Debug, Clone)]
pub enum BoolOrSchema {
    /// The keyword is `true` or `false`.
    Bool(bool),
    /// The keyword holds a sub-schema.
    Schema(Schema),
}

impl Schema {
    /// Compile `schema` with default options: draft detected from
    /// `$schema`, no reference provider.
    pub fn compile(schema: &Value) -> Result<Schema, SchemaError> {
        Self::options().compile(schema)
    }

    /// Compile schema text. Fails with [`SchemaError::InvalidJson`] when the
    /// text is not a JSON document.
    pub fn compile_str(schema: &str) -> Result<Schema, SchemaError> {
        let value: Value = serde_json::from_str(schema)?;
        Self::options().compile(&value)
    }

    /// Return a default [`CompileOptions`] to configure compilation: the
    /// target draft, the document's base URI, reference providers and
    /// custom formats.
    #[must_use]
    pub fn options() -> CompileOptions {
        CompileOptions::default()
    }

    /// Fetch `url` over HTTP and compile it asynchronously, with the fetched
    /// location as the base URI for nested references.
    #[cfg(feature = "http")]
    pub async fn from_url(url: &str) -> Result<Schema, SchemaError> {
        let parsed = Url::parse(url)?;
        let document = crate::retrieval::fetch_document(&parsed).await?;
        Self::options()
            .with_base_uri(url)
            .compile_async(&document)
            .await
    }

    /// The draft this schema was compiled under.
    #[must_use]
    pub fn draft(&self) -> Draft {
        self.root.draft
    }

    /// Effective base URI of this node: its `$id` if present, otherwise
    /// inherited from the containment chain or the fetched location.
    #[must_use]
    pub fn base_uri(&self) -> &Url {
        &self.current().base_uri
    }

    /// JSON Pointer of this node from the root of its document, with no
    /// leading `#`. Empty for the root itself.
    #[must_use]
    pub fn schema_path(&self) -> &str {
        &self.current().path
    }

    /// The raw document this schema was compiled from.
    #[must_use]
    pub fn source(&self) -> &Value {
        &self.root.source
    }

    /// `Some` when this node is a bare boolean schema.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self.current().form {
            Form::Boolean(value) => Some(value),
            Form::Object(_) => None,
        }
    }

    /// Fast verdict: whether `instance` satisfies the schema. Stops at the
    /// first violation.
    #[must_use]
    pub fn is_valid(&self, instance: &Value) -> bool {
        validator::is_valid(self, instance)
    }

    /// Validate `instance` and collect every violation.
    pub fn validate(&self, instance: &Value) -> Result<(), Vec<ValidationError>> {
        let errors = validator::validate(self, instance, &ValidationOptions::collect_all())
            .expect("parse_json is disabled");
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate with explicit options. With `parse_json` enabled a string
    /// instance is decoded first and an undecodable one fails with
    /// [`SchemaError::InvalidJsonInput`].
    pub fn validate_with_options(
        &self,
        instance: &Value,
        options: &ValidationOptions,
    ) -> Result<Vec<ValidationError>, SchemaError> {
        validator::validate(self, instance, options)
    }

    /// Resolve a JSON Pointer (or any URI reference) to a sub-schema,
    /// chasing `$ref`s at the target.
    pub fn resolve_path(&self, pointer: &str) -> Result<Schema, SchemaError> {
        let reference = if pointer.starts_with('/') {
            // A bare pointer addresses the current document.
            format!("#{}", pointer)
        } else {
            pointer.to_string()
        };
        let uri = promote(&self.current().base_uri, &reference).map_err(SchemaError::from)?;
        let mut target = self.root.resolver.resolve_uri(&self.root.nodes, &uri)?;
        let mut visited = AHashSet::new();
        visited.insert(ref_key(&uri));
        while let Some(next) = self.root.nodes[target.0].ref_target() {
            let next_uri = Url::parse(next).map_err(SchemaError::from)?;
            if !visited.insert(ref_key(&next_uri)) {
                return Err(SchemaError::RefCycle {
                    path: self.root.nodes[target.0].path.clone(),
                });
            }
            target = self.root.resolver.resolve_uri(&self.root.nodes, &next_uri)?;
        }
        Ok(self.subschema(target))
    }

    pub(crate) fn current(&self) -> &SchemaNode {
        &self.root.nodes[self.node.0]
    }

    pub(crate) fn subschema(&self, node: NodeId) -> Schema {
        Schema {
            root: Arc::clone(&self.root),
            node,
        }
    }

    fn object(&self) -> Option<&ObjectSchema> {
        self.current().object()
    }

    fn wrap(&self, payload: &BoolOrNode) -> BoolOrSchema {
        match payload {
            BoolOrNode::Bool(value) => BoolOrSchema::Bool(*value),
            BoolOrNode::Node(id) => BoolOrSchema::Schema(self.subschema(*id)),
        }
    }
}

/// Read-only keyword accessors.
impl Schema {
    /// The promoted absolute URI of `$ref`, if this node is a reference.
    #[must_use]
    pub fn ref_uri(&self) -> Option<&str> {
        self.current().ref_target()
    }

    /// Allowed instance types, in declaration order.
    #[must_use]
    pub fn type_list(&self) -> Option<&[PrimitiveType]> {
        self.object()?.types.as_deref()
    }

    /// The `const` value. `Some(Value::Null)` means `null` is required.
    #[must_use]
    pub fn constant(&self) -> Option<&Value> {
        self.object()?.const_.as_ref()
    }

    /// The `enum` members, in declaration order.
    #[must_use]
    pub fn enumeration(&self) -> Option<&[Value]> {
        self.object()?.enum_.as_deref()
    }

    /// The `format` tag, whether or not it is recognized.
    #[must_use]
    pub fn format(&self) -> Option<&str> {
        self.object()?.format.as_deref()
    }

    #[must_use]
    pub fn minimum(&self) -> Option<f64> {
        self.object()?.minimum
    }

    #[must_use]
    pub fn maximum(&self) -> Option<f64> {
        self.object()?.maximum
    }

    #[must_use]
    pub fn exclusive_minimum(&self) -> Option<f64> {
        self.object()?.exclusive_minimum
    }

    #[must_use]
    pub fn exclusive_maximum(&self) -> Option<f64> {
        self.object()?.exclusive_maximum
    }

    #[must_use]
    pub fn multiple_of(&self) -> Option<f64> {
        self.object()?.multiple_of.as_ref().and_then(|n| n.as_f64())
    }

    #[must_use]
    pub fn min_length(&self) -> Option<u64> {
        self.object()?.min_length
    }

    #[must_use]
    pub fn max_length(&self) -> Option<u64> {
        self.object()?.max_length
    }

    /// Source text of the `pattern` regex.
    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        self.object()?.pattern.as_ref().map(|regex| regex.as_str())
    }

    /// The single-schema form of `items`.
    #[must_use]
    pub fn items(&self) -> Option<Schema> {
        match self.object()?.items.as_ref()? {
            Items::Single(id) => Some(self.subschema(*id)),
            Items::Tuple(_) => None,
        }
    }

    /// The tuple form of `items`.
    #[must_use]
    pub fn items_tuple(&self) -> Option<Vec<Schema>> {
        match self.object()?.items.as_ref()? {
            Items::Single(_) => None,
            Items::Tuple(ids) => Some(ids.iter().map(|id| self.subschema(*id)).collect()),
        }
    }

    #[must_use]
    pub fn additional_items(&self) -> Option<BoolOrSchema> {
        Some(self.wrap(self.object()?.additional_items.as_ref()?))
    }

    #[must_use]
    pub fn min_items(&self) -> Option<u64> {
        self.object()?.min_items
    }

    #[must_use]
    pub fn max_items(&self) -> Option<u64> {
        self.object()?.max_items
    }

    #[must_use]
    pub fn unique_items(&self) -> bool {
        self.object().map_or(false, |object| object.unique_items)
    }

    /// The `contains` sub-schema.
    #[must_use]
    pub fn contains(&self) -> Option<Schema> {
        Some(self.subschema(self.object()?.contains?))
    }

    /// Sub-schema declared for the property `name`.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<Schema> {
        Some(self.subschema(self.object()?.property(name)?))
    }

    /// All declared properties with their sub-schemas.
    #[must_use]
    pub fn properties(&self) -> Option<Vec<(&str, Schema)>> {
        Some(
            self.object()?
                .properties
                .as_ref()?
                .iter()
                .map(|(name, id)| (name.as_str(), self.subschema(*id)))
                .collect(),
        )
    }

    /// Pattern properties as `(pattern source, sub-schema)` pairs.
    #[must_use]
    pub fn pattern_properties(&self) -> Option<Vec<(&str, Schema)>> {
        Some(
            self.object()?
                .pattern_properties
                .as_ref()?
                .iter()
                .map(|(regex, id)| (regex.as_str(), self.subschema(*id)))
                .collect(),
        )
    }

    #[must_use]
    pub fn additional_properties(&self) -> Option<BoolOrSchema> {
        Some(self.wrap(self.object()?.additional_properties.as_ref()?))
    }

    #[must_use]
    pub fn property_names(&self) -> Option<Schema> {
        Some(self.subschema(self.object()?.property_names?))
    }

    #[must_use]
    pub fn required(&self) -> Option<&[String]> {
        self.object()?.required.as_deref()
    }

    #[must_use]
    pub fn min_properties(&self) -> Option<u64> {
        self.object()?.min_properties
    }

    #[must_use]
    pub fn max_properties(&self) -> Option<u64> {
        self.object()?.max_properties
    }

    /// Key-list dependencies: `key -> keys that must accompany it`.
    #[must_use]
    pub fn property_dependencies(&self) -> Option<Vec<(&str, &[String])>> {
        let dependencies = self.object()?.dependencies.as_ref()?;
        let list: Vec<_> = dependencies
            .iter()
            .filter_map(|(name, dependency)| match dependency {
                Dependency::Keys(keys) => Some((name.as_str(), keys.as_slice())),
                Dependency::Node(_) => None,
            })
            .collect();
        if list.is_empty() {
            None
        } else {
            Some(list)
        }
    }

    /// Schema dependencies: `key -> schema the whole instance must satisfy`.
    #[must_use]
    pub fn schema_dependencies(&self) -> Option<Vec<(&str, Schema)>> {
        let dependencies = self.object()?.dependencies.as_ref()?;
        let list: Vec<_> = dependencies
            .iter()
            .filter_map(|(name, dependency)| match dependency {
                Dependency::Node(id) => Some((name.as_str(), self.subschema(*id))),
                Dependency::Keys(_) => None,
            })
            .collect();
        if list.is_empty() {
            None
        } else {
            Some(list)
        }
    }

    #[must_use]
    pub fn all_of(&self) -> Option<Vec<Schema>> {
        Some(self.subschemas(self.object()?.all_of.as_ref()?))
    }

    #[must_use]
    pub fn any_of(&self) -> Option<Vec<Schema>> {
        Some(self.subschemas(self.object()?.any_of.as_ref()?))
    }

    #[must_use]
    pub fn one_of(&self) -> Option<Vec<Schema>> {
        Some(self.subschemas(self.object()?.one_of.as_ref()?))
    }

    #[must_use]
    pub fn not_schema(&self) -> Option<Schema> {
        Some(self.subschema(self.object()?.not?))
    }

    #[must_use]
    pub fn if_schema(&self) -> Option<Schema> {
        Some(self.subschema(self.object()?.if_?))
    }

    #[must_use]
    pub fn then_schema(&self) -> Option<Schema> {
        Some(self.subschema(self.object()?.then?))
    }

    #[must_use]
    pub fn else_schema(&self) -> Option<Schema> {
        Some(self.subschema(self.object()?.else_?))
    }

    /// A named entry of `definitions`.
    #[must_use]
    pub fn definition(&self, name: &str) -> Option<Schema> {
        Some(self.subschema(*self.object()?.definitions.as_ref()?.get(name)?))
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.object()?.annotations.title.as_deref()
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.object()?.annotations.description.as_deref()
    }

    /// The `$comment` annotation.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.object()?.annotations.comment.as_deref()
    }

    /// The `default` annotation; parsed, never applied.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.object()?.annotations.default.as_ref()
    }

    /// The `examples` annotation; parsed, never applied.
    #[must_use]
    pub fn examples(&self) -> Option<&[Value]> {
        self.object()?.annotations.examples.as_deref()
    }

    #[must_use]
    pub fn read_only(&self) -> bool {
        self.object()
            .and_then(|object| object.annotations.read_only)
            .unwrap_or(false)
    }

    #[must_use]
    pub fn write_only(&self) -> bool {
        self.object()
            .and_then(|object| object.annotations.write_only)
            .unwrap_or(false)
    }

    #[must_use]
    pub fn content_media_type(&self) -> Option<&str> {
        self.object()?.annotations.content_media_type.as_deref()
    }

    #[must_use]
    pub fn content_encoding(&self) -> Option<&str> {
        self.object()?.annotations.content_encoding.as_deref()
    }

    fn subschemas(&self, ids: &[NodeId]) -> Vec<Schema> {
        ids.iter().map(|id| self.subschema(*id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn person() -> Schema {
        Schema::compile(&json!({
            "title": "Person",
            "$comment": "used by the accessor tests",
            "type": "object",
            "default": {},
            "examples": [{"name": "ann"}],
            "readOnly": true,
            "required": ["name"],
            "properties": {
                "name": {"type": "string", "minLength": 1, "pattern": "^\\S"},
                "age": {"type": "integer", "minimum": 0, "multipleOf": 1},
                "tags": {
                    "type": "array",
                    "items": {"type": "string"},
                    "uniqueItems": true
                },
                "contact": {"$ref": "#/definitions/contact"}
            },
            "definitions": {
                "contact": {
                    "type": "object",
                    "properties": {"email": {"format": "email", "contentMediaType": "text/plain"}}
                }
            },
            "dependencies": {
                "age": ["name"],
                "contact": {"required": ["name"]}
            }
        }))
        .unwrap()
    }

    #[test]
    fn keyword_accessors() {
        let schema = person();
        assert_eq!(schema.title(), Some("Person"));
        assert_eq!(schema.comment(), Some("used by the accessor tests"));
        assert_eq!(schema.default_value(), Some(&json!({})));
        assert_eq!(schema.examples(), Some(&[json!({"name": "ann"})][..]));
        assert!(schema.read_only());
        assert!(!schema.write_only());
        assert_eq!(schema.type_list(), Some(&[PrimitiveType::Object][..]));
        assert_eq!(schema.required(), Some(&["name".to_string()][..]));

        let name = schema.property("name").unwrap();
        assert_eq!(name.min_length(), Some(1));
        assert_eq!(name.pattern(), Some("^\\S"));
        let age = schema.property("age").unwrap();
        assert_eq!(age.minimum(), Some(0.));
        assert_eq!(age.multiple_of(), Some(1.));
        let tags = schema.property("tags").unwrap();
        assert!(tags.unique_items());
        assert_eq!(
            tags.items().unwrap().type_list(),
            Some(&[PrimitiveType::String][..])
        );

        let dependencies = schema.property_dependencies().unwrap();
        assert_eq!(dependencies, vec![("age", &["name".to_string()][..])]);
        let dependencies = schema.schema_dependencies().unwrap();
        assert_eq!(dependencies.len(), 1);
        assert_eq!(dependencies[0].0, "contact");

        let email = schema
            .definition("contact")
            .unwrap()
            .property("email")
            .unwrap();
        assert_eq!(email.format(), Some("email"));
        assert_eq!(email.content_media_type(), Some("text/plain"));
    }

    #[test]
    fn resolve_path_walks_the_tree() {
        let schema = person();
        let name = schema.resolve_path("/properties/name").unwrap();
        assert_eq!(name.schema_path(), "/properties/name");
        assert_eq!(name.min_length(), Some(1));

        let contact = schema.resolve_path("#/definitions/contact").unwrap();
        assert_eq!(contact.schema_path(), "/definitions/contact");
    }

    #[test]
    fn resolve_path_chases_refs() {
        let schema = person();
        // `/properties/contact` is a `$ref`; resolution lands on its target.
        let contact = schema.resolve_path("/properties/contact").unwrap();
        assert_eq!(contact.schema_path(), "/definitions/contact");
    }

    #[test]
    fn resolve_path_misses_are_unresolvable() {
        let schema = person();
        assert!(matches!(
            schema.resolve_path("/properties/unknown"),
            Err(SchemaError::UnresolvableRef { .. })
        ));
    }

    #[test]
    fn resolved_subschemas_validate_standalone() {
        let schema = person();
        let name = schema.resolve_path("/properties/name").unwrap();
        assert!(name.is_valid(&json!("ann")));
        assert!(!name.is_valid(&json!("")));
    }

    #[test]
    fn boolean_form() {
        let schema = Schema::compile(&json!(false)).unwrap();
        assert_eq!(schema.as_bool(), Some(false));
        assert_eq!(schema.type_list(), None);
    }

    #[test]
    fn base_uri_inheritance() {
        let schema = Schema::options()
            .with_base_uri("http://example.com/root.json")
            .compile(&json!({
                "properties": {
                    "a": {"$id": "folder/", "properties": {"b": {"type": "integer"}}}
                }
            }))
            .unwrap();
        assert_eq!(schema.base_uri().as_str(), "http://example.com/root.json");
        let folder = schema.property("a").unwrap();
        assert_eq!(folder.base_uri().as_str(), "http://example.com/folder/");
        // Children inherit the nearest ancestor's base.
        let leaf = folder.property("b").unwrap();
        assert_eq!(leaf.base_uri().as_str(), "http://example.com/folder/");
    }
}
