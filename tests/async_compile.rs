//! Asynchronous compilation: custom providers, concurrent retrieval and the
//! sync/async equivalence of the compiled result.
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use jsonschema_tree::{AsyncRefProvider, ProvidedSchema, Schema, SchemaError};
use serde_json::{json, Value};

struct MapProvider {
    documents: Vec<(&'static str, Value)>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl AsyncRefProvider for MapProvider {
    async fn provide(&self, uri: &str) -> Option<ProvidedSchema> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.documents
            .iter()
            .find(|(known, _)| *known == uri)
            .map(|(_, document)| ProvidedSchema::Document(document.clone()))
    }
}

#[tokio::test]
async fn async_provider_resolves_remote_refs() {
    let schema = json!({
        "type": "object",
        "properties": {
            "user": {"$ref": "http://example.com/user.json"},
            "role": {"$ref": "http://example.com/role.json"}
        }
    });
    let provider = MapProvider {
        documents: vec![
            (
                "http://example.com/user.json",
                json!({"type": "object", "required": ["id"]}),
            ),
            ("http://example.com/role.json", json!({"enum": ["admin", "user"]})),
        ],
        calls: Arc::new(AtomicUsize::new(0)),
    };
    let compiled = Schema::options()
        .with_async_provider(provider)
        .compile_async(&schema)
        .await
        .unwrap();
    assert!(compiled.is_valid(&json!({"user": {"id": 1}, "role": "admin"})));
    assert!(!compiled.is_valid(&json!({"role": "root"})));
}

#[tokio::test]
async fn fetches_are_batched_per_round() {
    // Both top-level refs go out in the first round; the nested ref found in
    // a fetched document goes out in the second.
    let calls = Arc::new(AtomicUsize::new(0));
    let provider = MapProvider {
        documents: vec![
            ("http://example.com/a.json", json!({"$ref": "c.json"})),
            ("http://example.com/b.json", json!({"type": "string"})),
            ("http://example.com/c.json", json!({"type": "integer"})),
        ],
        calls: Arc::clone(&calls),
    };
    let schema = json!({
        "anyOf": [
            {"$ref": "http://example.com/a.json"},
            {"$ref": "http://example.com/b.json"}
        ]
    });
    let compiled = Schema::options()
        .with_async_provider(provider)
        .compile_async(&schema)
        .await
        .unwrap();
    // One lookup per document; no URI is fetched twice.
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(compiled.is_valid(&json!(1)));
    assert!(compiled.is_valid(&json!("s")));
    assert!(!compiled.is_valid(&json!(1.5)));
}

#[tokio::test]
async fn missing_async_document_is_unresolvable() {
    let provider = MapProvider {
        documents: vec![],
        calls: Arc::new(AtomicUsize::new(0)),
    };
    let schema = json!({"$ref": "http://example.com/missing.json"});
    let error = Schema::options()
        .with_async_provider(provider)
        .compile_async(&schema)
        .await
        .unwrap_err();
    assert!(matches!(error, SchemaError::UnresolvableRef { .. }));
}

#[tokio::test]
async fn async_and_sync_compilation_agree() {
    let schema = json!({
        "properties": {"n": {"$ref": "http://example.com/n.json"}}
    });
    let document = json!({"type": "number", "minimum": 3});

    let sync_compiled = Schema::options()
        .with_document("http://example.com/n.json", document.clone())
        .compile(&schema)
        .unwrap();
    let async_compiled = Schema::options()
        .with_async_provider(MapProvider {
            documents: vec![("http://example.com/n.json", document)],
            calls: Arc::new(AtomicUsize::new(0)),
        })
        .compile_async(&schema)
        .await
        .unwrap();

    for instance in [json!({"n": 5}), json!({"n": 1}), json!({"n": "x"})] {
        assert_eq!(
            sync_compiled.is_valid(&instance),
            async_compiled.is_valid(&instance)
        );
    }
}

#[tokio::test]
async fn preseeded_documents_skip_the_provider() {
    let calls = Arc::new(AtomicUsize::new(0));
    let provider = MapProvider {
        documents: vec![],
        calls: Arc::clone(&calls),
    };
    let schema = json!({"$ref": "http://example.com/seeded.json"});
    let compiled = Schema::options()
        .with_document("http://example.com/seeded.json", json!({"const": 7}))
        .with_async_provider(provider)
        .compile_async(&schema)
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(compiled.is_valid(&json!(7)));
    assert!(!compiled.is_valid(&json!(8)));
}
