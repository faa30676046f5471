//! Schema compilation: a pure tree walk that validates keyword shapes per
//! draft, produces arena nodes and records references for the resolver. The
//! walk itself never performs I/O; retrieval requests are drained afterwards,
//! either through a synchronous provider or by awaiting fetches.
pub(crate) mod context;

use ahash::{AHashMap, AHashSet};
use serde_json::{Map, Value};
use url::Url;

use crate::{
    drafts::{id_of, Draft, Keyword},
    error::SchemaError,
    helpers::join_key,
    primitive_type::PrimitiveType,
    resolver::{promote, ref_key, Resolver},
    retrieval::{AsyncRefProvider, ProvidedSchema, RefProvider},
    schema::node::{BoolOrNode, Dependency, Form, Items, NodeId, ObjectSchema, SchemaNode},
};
use context::Context;

fn shape_error(keyword: &str, value: &Value) -> SchemaError {
    SchemaError::InvalidKeywordShape {
        keyword: keyword.to_string(),
        value: value.clone(),
    }
}

fn object_id<'a>(draft: Draft, map: &'a Map<String, Value>) -> Option<&'a Value> {
    if draft == Draft::Draft4 {
        map.get("id")
    } else {
        map.get("$id")
    }
}

pub(crate) struct Compiler {
    draft: Draft,
    pub(crate) nodes: Vec<SchemaNode>,
    pub(crate) resolver: Resolver,
    /// Pre-seeded documents, canonical-keyed; consulted before providers.
    store: AHashMap<String, Value>,
    /// Canonical key prefix (`<document base>#`) of the document currently
    /// being compiled; per-node ref-map entries hang off it.
    doc_prefix: String,
}

impl Compiler {
    pub(crate) fn new(draft: Draft, store: AHashMap<String, Value>) -> Compiler {
        Compiler {
            draft,
            nodes: Vec::new(),
            resolver: Resolver::default(),
            store,
            doc_prefix: String::new(),
        }
    }

    /// Compile one document. `fetched_from` is the URI the document came
    /// from (or the default scope); a root `$id` takes precedence as the
    /// document base, and the document is indexed under both.
    pub(crate) fn compile_document(
        &mut self,
        schema: &Value,
        fetched_from: &Url,
    ) -> Result<NodeId, SchemaError> {
        let document_base = match id_of(self.draft, schema) {
            Some(id) => promote(fetched_from, id)?,
            None => fetched_from.clone(),
        };
        self.doc_prefix = ref_key(&document_base);
        let context = Context::new(fetched_from);
        let root = self.compile_value(schema, &context)?;
        self.resolver.register(ref_key(fetched_from), root);
        Ok(root)
    }

    fn compile_value(&mut self, schema: &Value, context: &Context) -> Result<NodeId, SchemaError> {
        match schema {
            Value::Bool(value) => {
                if !self.draft.supports_boolean_schemas() {
                    return Err(SchemaError::InvalidDraftConstruct {
                        construct: "boolean schema".to_string(),
                        draft: self.draft,
                    });
                }
                Ok(self.push_node(SchemaNode {
                    path: context.path.clone(),
                    base_uri: context.scope.clone().into_owned(),
                    form: Form::Boolean(*value),
                }))
            }
            Value::Object(map) => self.compile_object(map, context),
            _ => Err(shape_error("schema", schema)),
        }
    }

    /// Compile a value that must be a schema; anything but an object or a
    /// boolean is an invalid shape for `keyword`.
    fn compile_subschema(
        &mut self,
        keyword: &str,
        value: &Value,
        context: &Context,
    ) -> Result<NodeId, SchemaError> {
        match value {
            Value::Object(_) | Value::Bool(_) => self.compile_value(value, context),
            _ => Err(shape_error(keyword, value)),
        }
    }

    #[allow(clippy::too_many_lines)]
    fn compile_object(
        &mut self,
        map: &Map<String, Value>,
        parent: &Context,
    ) -> Result<NodeId, SchemaError> {
        let declared_id = match object_id(self.draft, map) {
            Some(Value::String(id)) => Some(id.as_str()),
            Some(other) => {
                let keyword = if self.draft == Draft::Draft4 {
                    "id"
                } else {
                    "$id"
                };
                return Err(shape_error(keyword, other));
            }
            None => None,
        };
        let context = match declared_id {
            Some(id) => parent.push(id)?,
            None => Context {
                scope: std::borrow::Cow::Borrowed(parent.scope.as_ref()),
                path: parent.path.clone(),
            },
        };

        let mut object = ObjectSchema::default();
        if declared_id.is_some() {
            object.id = Some(context.scope.clone().into_owned());
        }
        let mut pending_ref: Option<Url> = None;
        // Draft-4 boolean exclusives; applied after the loop once the bound
        // they qualify is known.
        let mut exclusive_minimum_flag = None;
        let mut exclusive_maximum_flag = None;

        for (keyword, value) in map {
            let Some(known) = self.draft.get_keyword(keyword) else {
                self.unknown_keyword(keyword, value, &context);
                continue;
            };
            match known {
                Keyword::Id => {}
                Keyword::Schema => {
                    if !value.is_string() {
                        return Err(shape_error("$schema", value));
                    }
                }
                Keyword::Ref => {
                    let Value::String(reference) = value else {
                        return Err(shape_error("$ref", value));
                    };
                    let promoted = promote(&context.scope, reference)
                        .map_err(|_| shape_error("$ref", value))?;
                    object.ref_target = Some(promoted.as_str().to_string());
                    pending_ref = Some(promoted);
                }
                Keyword::Type => {
                    object.types = Some(parse_types(value)?);
                }
                Keyword::Const => {
                    object.const_ = Some(value.clone());
                }
                Keyword::Enum => {
                    let Value::Array(members) = value else {
                        return Err(shape_error("enum", value));
                    };
                    object.enum_ = Some(members.clone());
                }
                Keyword::Format => {
                    let Value::String(format) = value else {
                        return Err(shape_error("format", value));
                    };
                    object.format = Some(format.clone());
                }
                Keyword::MultipleOf => {
                    let Value::Number(factor) = value else {
                        return Err(shape_error("multipleOf", value));
                    };
                    if !factor.as_f64().map_or(false, |factor| factor > 0.) {
                        return Err(shape_error("multipleOf", value));
                    }
                    object.multiple_of = Some(factor.clone());
                }
                Keyword::Minimum => {
                    object.minimum =
                        Some(value.as_f64().ok_or_else(|| shape_error("minimum", value))?);
                }
                Keyword::Maximum => {
                    object.maximum =
                        Some(value.as_f64().ok_or_else(|| shape_error("maximum", value))?);
                }
                Keyword::ExclusiveMinimum => {
                    if self.draft == Draft::Draft4 {
                        exclusive_minimum_flag = Some(
                            value
                                .as_bool()
                                .ok_or_else(|| shape_error("exclusiveMinimum", value))?,
                        );
                    } else {
                        object.exclusive_minimum = Some(
                            value
                                .as_f64()
                                .ok_or_else(|| shape_error("exclusiveMinimum", value))?,
                        );
                    }
                }
                Keyword::ExclusiveMaximum => {
                    if self.draft == Draft::Draft4 {
                        exclusive_maximum_flag = Some(
                            value
                                .as_bool()
                                .ok_or_else(|| shape_error("exclusiveMaximum", value))?,
                        );
                    } else {
                        object.exclusive_maximum = Some(
                            value
                                .as_f64()
                                .ok_or_else(|| shape_error("exclusiveMaximum", value))?,
                        );
                    }
                }
                Keyword::MinLength => {
                    object.min_length = Some(parse_bound("minLength", value)?);
                }
                Keyword::MaxLength => {
                    object.max_length = Some(parse_bound("maxLength", value)?);
                }
                Keyword::Pattern => {
                    let Value::String(pattern) = value else {
                        return Err(shape_error("pattern", value));
                    };
                    let regex =
                        regex::Regex::new(pattern).map_err(|_| shape_error("pattern", value))?;
                    object.pattern = Some(regex);
                }
                Keyword::Items => match value {
                    Value::Object(_) | Value::Bool(_) => {
                        let id = self.compile_value(value, &context.key("items"))?;
                        object.items = Some(Items::Single(id));
                    }
                    Value::Array(entries) => {
                        let items_context = context.key("items");
                        let mut ids = Vec::with_capacity(entries.len());
                        for (index, entry) in entries.iter().enumerate() {
                            ids.push(self.compile_subschema(
                                "items",
                                entry,
                                &items_context.index(index),
                            )?);
                        }
                        object.items = Some(Items::Tuple(ids));
                    }
                    _ => return Err(shape_error("items", value)),
                },
                Keyword::AdditionalItems => {
                    object.additional_items =
                        Some(self.compile_bool_or_schema("additionalItems", value, &context)?);
                }
                Keyword::MinItems => {
                    object.min_items = Some(parse_bound("minItems", value)?);
                }
                Keyword::MaxItems => {
                    object.max_items = Some(parse_bound("maxItems", value)?);
                }
                Keyword::UniqueItems => {
                    object.unique_items = value
                        .as_bool()
                        .ok_or_else(|| shape_error("uniqueItems", value))?;
                }
                Keyword::Contains => {
                    let id = self.compile_subschema("contains", value, &context.key("contains"))?;
                    object.contains = Some(id);
                }
                Keyword::Properties => {
                    let Value::Object(entries) = value else {
                        return Err(shape_error("properties", value));
                    };
                    let properties_context = context.key("properties");
                    let mut properties = AHashMap::with_capacity(entries.len());
                    for (name, subschema) in entries {
                        let id = self.compile_subschema(
                            "properties",
                            subschema,
                            &properties_context.key(name),
                        )?;
                        properties.insert(name.clone(), id);
                    }
                    object.properties = Some(properties);
                }
                Keyword::PatternProperties => {
                    let Value::Object(entries) = value else {
                        return Err(shape_error("patternProperties", value));
                    };
                    let patterns_context = context.key("patternProperties");
                    let mut patterns = Vec::with_capacity(entries.len());
                    for (pattern, subschema) in entries {
                        let regex = regex::Regex::new(pattern)
                            .map_err(|_| shape_error("patternProperties", value))?;
                        let id = self.compile_subschema(
                            "patternProperties",
                            subschema,
                            &patterns_context.key(pattern),
                        )?;
                        patterns.push((regex, id));
                    }
                    object.pattern_properties = Some(patterns);
                }
                Keyword::AdditionalProperties => {
                    object.additional_properties =
                        Some(self.compile_bool_or_schema("additionalProperties", value, &context)?);
                }
                Keyword::PropertyNames => {
                    let id = self.compile_subschema(
                        "propertyNames",
                        value,
                        &context.key("propertyNames"),
                    )?;
                    object.property_names = Some(id);
                }
                Keyword::Required => {
                    object.required = Some(self.parse_required(value)?);
                }
                Keyword::MinProperties => {
                    object.min_properties = Some(parse_bound("minProperties", value)?);
                }
                Keyword::MaxProperties => {
                    object.max_properties = Some(parse_bound("maxProperties", value)?);
                }
                Keyword::Dependencies => {
                    let Value::Object(entries) = value else {
                        return Err(shape_error("dependencies", value));
                    };
                    let dependencies_context = context.key("dependencies");
                    let mut dependencies = Vec::with_capacity(entries.len());
                    for (name, dependency) in entries {
                        let parsed = match dependency {
                            Value::Array(keys) => {
                                let keys = keys
                                    .iter()
                                    .map(|key| {
                                        key.as_str().map(str::to_string).ok_or_else(|| {
                                            shape_error("dependencies", dependency)
                                        })
                                    })
                                    .collect::<Result<Vec<_>, _>>()?;
                                Dependency::Keys(keys)
                            }
                            _ => Dependency::Node(self.compile_subschema(
                                "dependencies",
                                dependency,
                                &dependencies_context.key(name),
                            )?),
                        };
                        dependencies.push((name.clone(), parsed));
                    }
                    object.dependencies = Some(dependencies);
                }
                Keyword::AllOf => {
                    object.all_of = Some(self.compile_schema_list("allOf", value, &context)?);
                }
                Keyword::AnyOf => {
                    object.any_of = Some(self.compile_schema_list("anyOf", value, &context)?);
                }
                Keyword::OneOf => {
                    object.one_of = Some(self.compile_schema_list("oneOf", value, &context)?);
                }
                Keyword::Not => {
                    let id = self.compile_subschema("not", value, &context.key("not"))?;
                    object.not = Some(id);
                }
                Keyword::If => {
                    let id = self.compile_subschema("if", value, &context.key("if"))?;
                    object.if_ = Some(id);
                }
                Keyword::Then => {
                    let id = self.compile_subschema("then", value, &context.key("then"))?;
                    object.then = Some(id);
                }
                Keyword::Else => {
                    let id = self.compile_subschema("else", value, &context.key("else"))?;
                    object.else_ = Some(id);
                }
                Keyword::Definitions => {
                    let Value::Object(entries) = value else {
                        return Err(shape_error("definitions", value));
                    };
                    let definitions_context = context.key("definitions");
                    let mut definitions = AHashMap::with_capacity(entries.len());
                    for (name, subschema) in entries {
                        let id = self.compile_subschema(
                            "definitions",
                            subschema,
                            &definitions_context.key(name),
                        )?;
                        definitions.insert(name.clone(), id);
                    }
                    object.definitions = Some(definitions);
                }
                Keyword::Title => {
                    object.annotations.title = Some(parse_string("title", value)?);
                }
                Keyword::Description => {
                    object.annotations.description = Some(parse_string("description", value)?);
                }
                Keyword::Comment => {
                    object.annotations.comment = Some(parse_string("$comment", value)?);
                }
                Keyword::Default => {
                    object.annotations.default = Some(value.clone());
                }
                Keyword::Examples => {
                    let Value::Array(examples) = value else {
                        return Err(shape_error("examples", value));
                    };
                    object.annotations.examples = Some(examples.clone());
                }
                Keyword::ReadOnly => {
                    object.annotations.read_only =
                        Some(value.as_bool().ok_or_else(|| shape_error("readOnly", value))?);
                }
                Keyword::WriteOnly => {
                    object.annotations.write_only = Some(
                        value
                            .as_bool()
                            .ok_or_else(|| shape_error("writeOnly", value))?,
                    );
                }
                Keyword::ContentMediaType => {
                    object.annotations.content_media_type =
                        Some(parse_string("contentMediaType", value)?);
                }
                Keyword::ContentEncoding => {
                    object.annotations.content_encoding =
                        Some(parse_string("contentEncoding", value)?);
                }
            }
        }

        if self.draft == Draft::Draft4 {
            if exclusive_minimum_flag.is_some() && object.minimum.is_none() {
                return Err(SchemaError::InterdependencyMissing {
                    needs: "exclusiveMinimum",
                    missing: "minimum",
                });
            }
            if exclusive_maximum_flag.is_some() && object.maximum.is_none() {
                return Err(SchemaError::InterdependencyMissing {
                    needs: "exclusiveMaximum",
                    missing: "maximum",
                });
            }
            if exclusive_minimum_flag == Some(true) {
                object.exclusive_minimum = object.minimum.take();
            }
            if exclusive_maximum_flag == Some(true) {
                object.exclusive_maximum = object.maximum.take();
            }
        }

        let id = self.push_node(SchemaNode {
            path: context.path.clone(),
            base_uri: context.scope.clone().into_owned(),
            form: Form::Object(Box::new(object)),
        });
        if declared_id.is_some() {
            self.resolver.register(ref_key(&context.scope), id);
        }
        if let Some(uri) = pending_ref {
            self.resolver
                .add_pending(uri, id, join_key(&context.path, "$ref"));
        }
        Ok(id)
    }

    fn compile_bool_or_schema(
        &mut self,
        keyword: &str,
        value: &Value,
        context: &Context,
    ) -> Result<BoolOrNode, SchemaError> {
        match value {
            Value::Bool(allowed) => Ok(BoolOrNode::Bool(*allowed)),
            Value::Object(_) => {
                let id = self.compile_value(value, &context.key(keyword))?;
                Ok(BoolOrNode::Node(id))
            }
            _ => Err(shape_error(keyword, value)),
        }
    }

    fn compile_schema_list(
        &mut self,
        keyword: &str,
        value: &Value,
        context: &Context,
    ) -> Result<Vec<NodeId>, SchemaError> {
        let Value::Array(entries) = value else {
            return Err(shape_error(keyword, value));
        };
        if entries.is_empty() {
            return Err(shape_error(keyword, value));
        }
        let list_context = context.key(keyword);
        let mut ids = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            ids.push(self.compile_subschema(keyword, entry, &list_context.index(index))?);
        }
        Ok(ids)
    }

    fn parse_required(&self, value: &Value) -> Result<Vec<String>, SchemaError> {
        let Value::Array(names) = value else {
            return Err(shape_error("required", value));
        };
        let mut required = Vec::with_capacity(names.len());
        for name in names {
            match name.as_str() {
                Some(name) => required.push(name.to_string()),
                None => return Err(shape_error("required", value)),
            }
        }
        if self.draft == Draft::Draft4 {
            if required.is_empty() {
                return Err(shape_error("required", value));
            }
            let unique: AHashSet<&str> = required.iter().map(String::as_str).collect();
            if unique.len() != required.len() {
                return Err(shape_error("required", value));
            }
        }
        Ok(required)
    }

    /// Unrecognized keys are still visited: a sub-tree that parses as a
    /// schema is compiled and indexed under its pointer so `$ref`s buried
    /// under custom keywords participate in resolution; a sub-tree that
    /// doesn't is rolled back and ignored.
    fn unknown_keyword(&mut self, keyword: &str, value: &Value, context: &Context) {
        match value {
            Value::Object(_) | Value::Bool(_) => {
                let snapshot = self.resolver.snapshot(&self.nodes);
                if self
                    .compile_value(value, &context.key(keyword))
                    .is_err()
                {
                    self.resolver.rollback(snapshot, &mut self.nodes);
                }
            }
            Value::Array(entries) => {
                let list_context = context.key(keyword);
                for (index, entry) in entries.iter().enumerate() {
                    if matches!(entry, Value::Object(_) | Value::Bool(_)) {
                        let snapshot = self.resolver.snapshot(&self.nodes);
                        if self
                            .compile_value(entry, &list_context.index(index))
                            .is_err()
                        {
                            self.resolver.rollback(snapshot, &mut self.nodes);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn push_node(&mut self, node: SchemaNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        let key = format!("{}{}", self.doc_prefix, node.path);
        self.nodes.push(node);
        self.resolver.register(key, id);
        id
    }

    /// Drain retrieval requests through the synchronous provider until the
    /// tree reaches a fixed point. Purely CPU-bound: every external document
    /// must already be obtainable.
    pub(crate) fn drain_sync(
        &mut self,
        provider: Option<&dyn RefProvider>,
    ) -> Result<(), SchemaError> {
        loop {
            let requests = self.resolver.retrieval_requests();
            if requests.is_empty() {
                return Ok(());
            }
            for uri in requests {
                let document = self.lookup_sync(&uri, provider)?;
                self.compile_document(&document, &uri)?;
            }
        }
    }

    fn lookup_sync(
        &self,
        uri: &Url,
        provider: Option<&dyn RefProvider>,
    ) -> Result<Value, SchemaError> {
        if let Some(document) = self.store.get(&ref_key(uri)) {
            return Ok(document.clone());
        }
        if let Some(provider) = provider {
            // The base URI, then the base URI with `#` appended.
            if let Some(provided) = provider
                .provide(uri.as_str())
                .or_else(|| provider.provide(&format!("{}#", uri)))
            {
                return Ok(provided.into_document());
            }
        }
        Err(SchemaError::UnresolvableRef {
            uri: uri.as_str().to_string(),
        })
    }

    /// Drain retrieval requests by fetching concurrently: fan out one round
    /// of requests, await them all, compile, repeat until no new requests
    /// appear.
    pub(crate) async fn drain_async(
        &mut self,
        provider: Option<&dyn AsyncRefProvider>,
    ) -> Result<(), SchemaError> {
        loop {
            let requests = self.resolver.retrieval_requests();
            if requests.is_empty() {
                return Ok(());
            }
            let mut ready = Vec::with_capacity(requests.len());
            let mut fetches = Vec::new();
            for uri in requests {
                match self.store.get(&ref_key(&uri)) {
                    Some(document) => ready.push((uri, document.clone())),
                    None => fetches.push(uri),
                }
            }
            if !fetches.is_empty() {
                let Some(provider) = provider else {
                    return Err(SchemaError::UnresolvableRef {
                        uri: fetches[0].as_str().to_string(),
                    });
                };
                let fetched = futures::future::join_all(fetches.iter().map(|uri| async move {
                    match provider.provide(uri.as_str()).await {
                        Some(provided) => Some(provided),
                        None => provider.provide(&format!("{}#", uri)).await,
                    }
                }))
                .await;
                for (uri, provided) in fetches.into_iter().zip(fetched) {
                    match provided {
                        Some(provided) => ready.push((uri, provided.into_document())),
                        None => {
                            return Err(SchemaError::UnresolvableRef {
                                uri: uri.as_str().to_string(),
                            })
                        }
                    }
                }
            }
            for (uri, document) in ready {
                self.compile_document(&document, &uri)?;
            }
        }
    }

    /// Fire pending reference assignments and hand over the finished arena.
    pub(crate) fn finish(mut self) -> Result<(Vec<SchemaNode>, Resolver), SchemaError> {
        self.resolver.resolve_pending(&mut self.nodes)?;
        Ok((self.nodes, self.resolver))
    }
}

impl ProvidedSchema {
    fn into_document(self) -> Value {
        match self {
            ProvidedSchema::Document(document) => document,
            ProvidedSchema::Schema(schema) => schema.source().clone(),
        }
    }
}

fn parse_types(value: &Value) -> Result<Vec<PrimitiveType>, SchemaError> {
    match value {
        Value::String(name) => Ok(vec![PrimitiveType::try_from(name.as_str())
            .map_err(|()| shape_error("type", value))?]),
        Value::Array(names) => {
            let mut types = Vec::with_capacity(names.len());
            for name in names {
                let name = name.as_str().ok_or_else(|| shape_error("type", value))?;
                types.push(PrimitiveType::try_from(name).map_err(|()| shape_error("type", value))?);
            }
            Ok(types)
        }
        _ => Err(shape_error("type", value)),
    }
}

fn parse_bound(keyword: &str, value: &Value) -> Result<u64, SchemaError> {
    value.as_u64().ok_or_else(|| shape_error(keyword, value))
}

fn parse_string(keyword: &str, value: &Value) -> Result<String, SchemaError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| shape_error(keyword, value))
}
