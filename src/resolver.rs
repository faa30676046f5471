//! Reference resolution. Tracks the ref map shared by every schema compiled
//! into one root, the retrieval requests produced by remote `$ref`s and the
//! pending reference assignments that fire once the whole tree is known.
use ahash::{AHashMap, AHashSet};
use once_cell::sync::Lazy;
use url::Url;

use crate::{
    error::SchemaError,
    helpers::unescape_token,
    schema::node::{BoolOrNode, Dependency, Form, Items, NodeId, ObjectSchema, SchemaNode},
};

pub(crate) const DEFAULT_ROOT_URL: &str = "json-schema:///";

pub(crate) static DEFAULT_SCOPE: Lazy<Url> =
    Lazy::new(|| Url::parse(DEFAULT_ROOT_URL).expect("Is a valid URL"));

/// Canonical ref-map key: the fragment-less form always carries a trailing
/// `#`, so `http://x/s` and `http://x/s#` collapse into one entry.
pub(crate) fn ref_key(url: &Url) -> String {
    match url.fragment() {
        None | Some("") => {
            let mut key = url.as_str().trim_end_matches('#').to_string();
            key.push('#');
            key
        }
        Some(_) => url.as_str().to_string(),
    }
}

/// Resolve `reference` against `scope`, promoting scheme-less refs by
/// prepending the base URI.
pub(crate) fn promote(scope: &Url, reference: &str) -> Result<Url, url::ParseError> {
    Url::options().base_url(Some(scope)).parse(reference)
}

/// A `$ref` recorded during compilation, waiting for the tree (and any
/// remote documents) before it can be checked and wired up.
#[derive(Debug)]
pub(crate) struct PendingRef {
    /// Promoted absolute URI of the reference.
    pub(crate) uri: Url,
    /// The referencing node; its `ref_resolved` slot is the assignment
    /// target.
    pub(crate) node: NodeId,
    /// Schema location of the `$ref`, for error reporting.
    pub(crate) path: String,
}

#[derive(Debug, Default)]
pub(crate) struct Resolver {
    /// Absolute URI -> node. Holds document roots, `$id` anchors and one
    /// entry per compiled node under `<document base>#<path>`.
    pub(crate) ref_map: AHashMap<String, NodeId>,
    /// Insertion log, so speculative compilation of unknown-keyword
    /// sub-trees can be rolled back.
    ref_log: Vec<String>,
    pub(crate) pending_refs: Vec<PendingRef>,
    /// Fragment-less URIs already requested from a provider or fetcher.
    requested: AHashSet<String>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Snapshot {
    nodes: usize,
    refs: usize,
    pending: usize,
}

impl Resolver {
    pub(crate) fn register(&mut self, key: String, node: NodeId) {
        // First writer wins, matching the lookup precedence of documents
        // over later duplicates.
        if !self.ref_map.contains_key(&key) {
            self.ref_log.push(key.clone());
            self.ref_map.insert(key, node);
        }
    }

    pub(crate) fn add_pending(&mut self, uri: Url, node: NodeId, path: String) {
        self.pending_refs.push(PendingRef { uri, node, path });
    }

    pub(crate) fn snapshot(&self, nodes: &[SchemaNode]) -> Snapshot {
        Snapshot {
            nodes: nodes.len(),
            refs: self.ref_log.len(),
            pending: self.pending_refs.len(),
        }
    }

    /// Discard everything recorded since `snapshot`. Used when an
    /// unknown-keyword sub-tree turns out not to be a schema.
    pub(crate) fn rollback(&mut self, snapshot: Snapshot, nodes: &mut Vec<SchemaNode>) {
        nodes.truncate(snapshot.nodes);
        for key in self.ref_log.drain(snapshot.refs..) {
            self.ref_map.remove(&key);
        }
        self.pending_refs.truncate(snapshot.pending);
    }

    /// Fragment-less URIs that still need retrieval for the currently
    /// pending refs. Each URI is handed out once.
    pub(crate) fn retrieval_requests(&mut self) -> Vec<Url> {
        let mut requests = Vec::new();
        for pending in &self.pending_refs {
            if self.ref_map.contains_key(&ref_key(&pending.uri)) {
                continue;
            }
            let mut document = pending.uri.clone();
            document.set_fragment(None);
            let key = ref_key(&document);
            if self.ref_map.contains_key(&key) {
                continue;
            }
            if self.requested.insert(key) {
                requests.push(document);
            }
        }
        requests
    }

    /// Look up `uri` in the ref map, walking any JSON Pointer fragment
    /// through the node tree.
    pub(crate) fn resolve_uri(
        &self,
        nodes: &[SchemaNode],
        uri: &Url,
    ) -> Result<NodeId, SchemaError> {
        // Location-independent identifiers and per-node pointer entries are
        // searched before resolving through the fragment-less document.
        if let Some(id) = self.ref_map.get(&ref_key(uri)) {
            return Ok(*id);
        }
        let mut document = uri.clone();
        document.set_fragment(None);
        let root = self
            .ref_map
            .get(&ref_key(&document))
            .copied()
            .ok_or_else(|| SchemaError::UnresolvableRef {
                uri: uri.as_str().to_string(),
            })?;
        let fragment = percent_encoding::percent_decode_str(uri.fragment().unwrap_or(""))
            .decode_utf8()
            .map_err(|_| SchemaError::UnresolvableRef {
                uri: uri.as_str().to_string(),
            })?;
        if fragment.is_empty() {
            return Ok(root);
        }
        walk_pointer(nodes, root, &fragment).ok_or_else(|| SchemaError::UnresolvableRef {
            uri: uri.as_str().to_string(),
        })
    }

    /// Confirm every pending reference points at a valid node, failing on
    /// unresolvable targets and reference cycles, then fire the assignments.
    pub(crate) fn resolve_pending(&self, nodes: &mut [SchemaNode]) -> Result<(), SchemaError> {
        let mut assignments = Vec::with_capacity(self.pending_refs.len());
        for pending in &self.pending_refs {
            let target = self.resolve_uri(nodes, &pending.uri)?;
            assignments.push((pending.node, target));

            // Chase ref-to-ref chains to reject cycles deterministically.
            let mut visited = AHashSet::new();
            visited.insert(ref_key(&pending.uri));
            let mut current = target;
            while let Some(next) = nodes[current.0].ref_target() {
                let next_uri =
                    Url::parse(next).map_err(|_| SchemaError::UnresolvableRef {
                        uri: next.to_string(),
                    })?;
                if !visited.insert(ref_key(&next_uri)) {
                    return Err(SchemaError::RefCycle {
                        path: pending.path.clone(),
                    });
                }
                current = self.resolve_uri(nodes, &next_uri)?;
            }
        }
        for (node, target) in assignments {
            if let Form::Object(object) = &mut nodes[node.0].form {
                object.ref_resolved = Some(target);
            }
        }
        Ok(())
    }
}

/// Follow a JSON Pointer fragment through the compiled tree using the
/// keyword accessor table.
pub(crate) fn walk_pointer(nodes: &[SchemaNode], start: NodeId, fragment: &str) -> Option<NodeId> {
    if !fragment.starts_with('/') {
        return None;
    }
    let mut tokens = fragment.split('/').skip(1).map(unescape_token);
    let mut current = start;
    while let Some(token) = tokens.next() {
        let object = nodes[current.0].object()?;
        current = step(object, &token, &mut tokens)?;
    }
    Some(current)
}

fn step<I: Iterator<Item = String>>(
    object: &ObjectSchema,
    token: &str,
    tokens: &mut I,
) -> Option<NodeId> {
    match token {
        "properties" => {
            let key = tokens.next()?;
            object.property(&key)
        }
        "patternProperties" => {
            let key = tokens.next()?;
            object.pattern_properties.as_ref().and_then(|patterns| {
                patterns
                    .iter()
                    .find(|(regex, _)| regex.as_str() == key)
                    .map(|(_, id)| *id)
            })
        }
        "definitions" => {
            let key = tokens.next()?;
            object
                .definitions
                .as_ref()
                .and_then(|definitions| definitions.get(&key).copied())
        }
        "dependencies" => {
            let key = tokens.next()?;
            object.dependencies.as_ref().and_then(|dependencies| {
                dependencies
                    .iter()
                    .find_map(|(name, dependency)| match (name == &key, dependency) {
                        (true, Dependency::Node(id)) => Some(*id),
                        _ => None,
                    })
            })
        }
        "items" => match object.items.as_ref()? {
            Items::Single(id) => Some(*id),
            Items::Tuple(ids) => {
                let index = parse_index(&tokens.next()?)?;
                ids.get(index).copied()
            }
        },
        "allOf" | "anyOf" | "oneOf" => {
            let list = match token {
                "allOf" => object.all_of.as_ref()?,
                "anyOf" => object.any_of.as_ref()?,
                _ => object.one_of.as_ref()?,
            };
            let index = parse_index(&tokens.next()?)?;
            list.get(index).copied()
        }
        "additionalItems" => match object.additional_items.as_ref()? {
            BoolOrNode::Node(id) => Some(*id),
            BoolOrNode::Bool(_) => None,
        },
        "additionalProperties" => match object.additional_properties.as_ref()? {
            BoolOrNode::Node(id) => Some(*id),
            BoolOrNode::Bool(_) => None,
        },
        "propertyNames" => object.property_names,
        "contains" => object.contains,
        "not" => object.not,
        "if" => object.if_,
        "then" => object.then,
        "else" => object.else_,
        _ => None,
    }
}

fn parse_index(token: &str) -> Option<usize> {
    if token.starts_with('+') || (token.starts_with('0') && token.len() != 1) {
        None
    } else {
        token.parse().ok()
    }
}
