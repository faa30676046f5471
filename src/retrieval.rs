//! Reference providers: the narrow interfaces through which external schema
//! documents reach the compiler.
use async_trait::async_trait;
use serde_json::Value;

use crate::schema::Schema;
#[cfg(feature = "http")]
use crate::error::SchemaError;
#[cfg(feature = "http")]
use url::Url;

/// What a provider can hand back for a requested URI: a raw document (any
/// JSON value, including the boolean schemas of drafts 6/7) or a schema that
/// was already compiled elsewhere.
#[derive(Debug, Clone)]
pub enum ProvidedSchema {
    /// A raw schema document.
    Document(Value),
    /// An already-compiled schema; its source document is reused.
    Schema(Schema),
}

/// Synchronous source of external schema documents.
///
/// Sync compilation performs no I/O, so every remote `$ref` must be
/// answerable from here (or from documents pre-seeded via
/// [`CompileOptions::with_document`](crate::CompileOptions::with_document)).
/// For each reference two lookups are attempted: the base URI, then the base
/// URI with `#` appended. `None` for both fails compilation with
/// [`SchemaError::UnresolvableRef`](crate::SchemaError::UnresolvableRef).
pub trait RefProvider: Send + Sync {
    /// Look up the document identified by `uri`.
    fn provide(&self, uri: &str) -> Option<ProvidedSchema>;
}

impl<F> RefProvider for F
where
    F: Fn(&str) -> Option<ProvidedSchema> + Send + Sync,
{
    fn provide(&self, uri: &str) -> Option<ProvidedSchema> {
        self(uri)
    }
}

/// Asynchronous source of external schema documents; the async counterpart
/// of [`RefProvider`] with identical lookup semantics.
#[async_trait]
pub trait AsyncRefProvider: Send + Sync {
    /// Look up the document identified by `uri`.
    async fn provide(&self, uri: &str) -> Option<ProvidedSchema>;
}

/// The default fetcher for async compilation: GETs the URI and decodes the
/// body as JSON. Transport and decode failures surface as unresolvable
/// references.
#[cfg(feature = "http")]
#[derive(Debug, Default)]
pub struct HttpFetcher;

#[cfg(feature = "http")]
#[async_trait]
impl AsyncRefProvider for HttpFetcher {
    async fn provide(&self, uri: &str) -> Option<ProvidedSchema> {
        let url = Url::parse(uri).ok()?;
        fetch_document(&url).await.ok().map(ProvidedSchema::Document)
    }
}

#[cfg(feature = "http")]
pub(crate) async fn fetch_document(url: &Url) -> Result<Value, SchemaError> {
    let retrieval = |message: String| SchemaError::Retrieval {
        uri: url.as_str().to_string(),
        message,
    };
    match url.scheme() {
        "http" | "https" => {
            let response = reqwest::get(url.as_str())
                .await
                .map_err(|error| retrieval(error.to_string()))?;
            response
                .json()
                .await
                .map_err(|error| retrieval(error.to_string()))
        }
        scheme => Err(retrieval(format!("unknown scheme {}", scheme))),
    }
}
