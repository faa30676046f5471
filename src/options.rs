//! Compilation configuration.
use std::sync::Arc;

use ahash::AHashMap;
use serde_json::Value;
use url::Url;

use crate::{
    compiler::Compiler,
    drafts::{draft_from_schema, Draft},
    error::SchemaError,
    formats::FormatRegistry,
    resolver::{ref_key, DEFAULT_SCOPE},
    retrieval::{AsyncRefProvider, RefProvider},
    schema::{RootSchema, Schema},
};

/// Full configuration for schema compilation: the target draft, the
/// document's base URI, reference providers, pre-seeded documents and the
/// format registry.
///
/// ```rust
/// # use jsonschema_tree::{Draft, Schema, SchemaError};
/// # use serde_json::json;
/// # fn main() -> Result<(), SchemaError> {
/// let schema = Schema::options()
///     .with_draft(Draft::Draft4)
///     .compile(&json!({"minimum": 0, "exclusiveMinimum": true}))?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct CompileOptions {
    draft: Option<Draft>,
    base_uri: Option<String>,
    provider: Option<Arc<dyn RefProvider>>,
    async_provider: Option<Arc<dyn AsyncRefProvider>>,
    store: AHashMap<String, Value>,
    formats: FormatRegistry,
    validate_formats: Option<bool>,
}

impl std::fmt::Debug for CompileOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompileOptions")
            .field("draft", &self.draft)
            .field("base_uri", &self.base_uri)
            .field("documents", &self.store.keys())
            .finish()
    }
}

impl CompileOptions {
    /// Compile against this draft regardless of what `$schema` says.
    pub fn with_draft(&mut self, draft: Draft) -> &mut Self {
        self.draft = Some(draft);
        self
    }

    /// The URI the document was (notionally) fetched from; relative `$ref`s
    /// and `$id`s resolve against it.
    pub fn with_base_uri(&mut self, uri: impl Into<String>) -> &mut Self {
        self.base_uri = Some(uri.into());
        self
    }

    /// Supply external documents synchronously. Required for remote `$ref`s
    /// in sync compilation unless the documents are pre-seeded.
    pub fn with_provider(&mut self, provider: impl RefProvider + 'static) -> &mut Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    /// Supply external documents asynchronously, replacing the default HTTP
    /// fetcher in [`compile_async`](Self::compile_async).
    pub fn with_async_provider(&mut self, provider: impl AsyncRefProvider + 'static) -> &mut Self {
        self.async_provider = Some(Arc::new(provider));
        self
    }

    /// Pre-seed a document under `uri`, avoiding provider lookups and
    /// network calls for `$ref`s targeting it. Works in both modes.
    pub fn with_document(&mut self, uri: impl Into<String>, document: Value) -> &mut Self {
        self.store.insert(uri.into(), document);
        self
    }

    /// Register a `format` predicate. The uri, uri-reference, uri-template
    /// and email slots are replaced; any other name becomes a custom format.
    ///
    /// ```rust
    /// # use jsonschema_tree::Schema;
    /// # use serde_json::json;
    /// let schema = Schema::options()
    ///     .with_format("even-length", |value: &str| value.len() % 2 == 0)
    ///     .compile(&json!({"format": "even-length"}))
    ///     .expect("Valid schema");
    /// assert!(schema.is_valid(&json!("ab")));
    /// assert!(!schema.is_valid(&json!("abc")));
    /// ```
    pub fn with_format<N, F>(&mut self, name: N, check: F) -> &mut Self
    where
        N: AsRef<str>,
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.formats.register(name.as_ref(), Arc::new(check));
        self
    }

    /// Drop the predicate registered under `name`. An emptied uri,
    /// uri-reference, uri-template or email slot rejects every value.
    pub fn without_format(&mut self, name: &str) -> &mut Self {
        self.formats.unregister(name);
        self
    }

    /// Force `format` validation on or off; the default follows the draft.
    pub fn should_validate_formats(&mut self, validate_formats: bool) -> &mut Self {
        self.validate_formats = Some(validate_formats);
        self
    }

    /// Compile `schema` synchronously. Every remote reference must resolve
    /// through pre-seeded documents or the sync provider.
    pub fn compile(&self, schema: &Value) -> Result<Schema, SchemaError> {
        let draft = self.detect_draft(schema);
        let mut compiler = self.start(draft)?;
        let root = compiler.compile_document(schema, &self.scope()?)?;
        compiler.drain_sync(self.provider.as_deref())?;
        self.finish(compiler, root, schema, draft)
    }

    /// Compile `schema`, fetching remote references concurrently. Uses the
    /// configured async provider, or the default HTTP fetcher.
    pub async fn compile_async(&self, schema: &Value) -> Result<Schema, SchemaError> {
        let draft = self.detect_draft(schema);
        let mut compiler = self.start(draft)?;
        let root = compiler.compile_document(schema, &self.scope()?)?;
        #[cfg(feature = "http")]
        let default_fetcher = crate::retrieval::HttpFetcher;
        let provider: Option<&dyn AsyncRefProvider> = match &self.async_provider {
            Some(provider) => Some(provider.as_ref()),
            None => {
                #[cfg(feature = "http")]
                {
                    Some(&default_fetcher)
                }
                #[cfg(not(feature = "http"))]
                {
                    None
                }
            }
        };
        compiler.drain_async(provider).await?;
        self.finish(compiler, root, schema, draft)
    }

    /// Draft precedence: explicitly specified, then the document's own
    /// `$schema`, then the default.
    fn detect_draft(&self, schema: &Value) -> Draft {
        self.draft
            .or_else(|| draft_from_schema(schema))
            .unwrap_or_default()
    }

    fn scope(&self) -> Result<Url, SchemaError> {
        match &self.base_uri {
            Some(uri) => Url::parse(uri).map_err(SchemaError::from),
            None => Ok(DEFAULT_SCOPE.clone()),
        }
    }

    fn start(&self, draft: Draft) -> Result<Compiler, SchemaError> {
        let mut store = AHashMap::with_capacity(self.store.len());
        for (uri, document) in &self.store {
            let parsed = Url::parse(uri)?;
            store.insert(ref_key(&parsed), document.clone());
        }
        Ok(Compiler::new(draft, store))
    }

    fn finish(
        &self,
        compiler: Compiler,
        root: crate::schema::node::NodeId,
        schema: &Value,
        draft: Draft,
    ) -> Result<Schema, SchemaError> {
        let (nodes, resolver) = compiler.finish()?;
        Ok(Schema {
            root: Arc::new(RootSchema {
                draft,
                nodes,
                resolver,
                formats: self.formats.clone(),
                validate_formats: self
                    .validate_formats
                    .unwrap_or_else(|| draft.validate_formats_by_default()),
                source: schema.clone(),
            }),
            node: root,
        })
    }
}
