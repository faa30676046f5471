use std::borrow::Cow;

use url::{ParseError, Url};

use crate::helpers::{join_index, join_key};

/// Tracks the effective base URI and the schema path while the compiler
/// walks a document.
#[derive(Debug)]
pub(crate) struct Context<'a> {
    /// Current scope. Pushing a schema with `$id` replaces it, so nested
    /// sub-folders and location-independent identifiers resolve correctly:
    ///   scope = http://example.com/
    ///   after {"$id": "folder/", ...} -> http://example.com/folder/
    pub(crate) scope: Cow<'a, Url>,
    /// JSON Pointer from the document root, `""` at the root.
    pub(crate) path: String,
}

impl<'a> Context<'a> {
    pub(crate) fn new(scope: &'a Url) -> Context<'a> {
        Context {
            scope: Cow::Borrowed(scope),
            path: String::new(),
        }
    }

    /// Apply a declared `$id`, resolving it against the current scope.
    pub(crate) fn push(&self, id: &str) -> Result<Context<'_>, ParseError> {
        let scope = Url::options().base_url(Some(&self.scope)).parse(id)?;
        Ok(Context {
            scope: Cow::Owned(scope),
            path: self.path.clone(),
        })
    }

    /// Descend into a keyword or property by name.
    pub(crate) fn key(&self, segment: &str) -> Context<'_> {
        Context {
            scope: Cow::Borrowed(self.scope.as_ref()),
            path: join_key(&self.path, segment),
        }
    }

    /// Descend into an array entry.
    pub(crate) fn index(&self, index: usize) -> Context<'_> {
        Context {
            scope: Cow::Borrowed(self.scope.as_ref()),
            path: join_index(&self.path, index),
        }
    }
}
