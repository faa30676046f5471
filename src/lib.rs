//! # jsonschema-tree
//!
//! A JSON Schema validator that compiles schema documents into an immutable
//! node tree and interprets that tree against instances. Compilation resolves
//! every `$ref` up front, so validation itself performs no I/O and a compiled
//! schema can be shared freely between threads.
//!
//! Supports:
//!   - JSON Schema drafts 4, 6, 7 with draft-specific keyword tables;
//!   - synchronous compilation against a caller-supplied reference provider;
//!   - asynchronous compilation with concurrent retrieval of remote documents.
//!
//! ## Usage Examples:
//! A schema can be compiled with two main flavours:
//!  * using default configurations
//! ```rust
//! # use jsonschema_tree::{Schema, SchemaError};
//! # use serde_json::json;
//! # fn foo() -> Result<(), SchemaError> {
//! # let schema = json!({"maxLength": 5});
//! let compiled = Schema::compile(&schema)?;
//! # Ok(())
//! # }
//! ```
//!  * using custom configurations (such as define a Draft version)
//! ```rust
//! # use jsonschema_tree::{Draft, Schema, SchemaError};
//! # use serde_json::json;
//! # fn foo() -> Result<(), SchemaError> {
//! # let schema = json!({"maxLength": 5});
//! let compiled = Schema::options()
//!     .with_draft(Draft::Draft7)
//!     .compile(&schema)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Example (printing errors)
//! ```rust
//! use jsonschema_tree::{Schema, SchemaError};
//! use serde_json::json;
//!
//! fn main() -> Result<(), SchemaError> {
//!     let schema = json!({"maxLength": 5});
//!     let instance = json!("foo bar baz");
//!     let compiled = Schema::compile(&schema)?;
//!     if let Err(errors) = compiled.validate(&instance) {
//!         for error in errors {
//!             println!("Validation error: {}", error)
//!         }
//!     }
//!     Ok(())
//! }
//! ```
#![warn(
    clippy::cast_possible_truncation,
    clippy::doc_markdown,
    clippy::explicit_iter_loop,
    clippy::map_unwrap_or,
    clippy::match_same_arms,
    clippy::needless_borrow,
    clippy::needless_pass_by_value,
    clippy::print_stdout,
    clippy::redundant_closure,
    clippy::trivially_copy_pass_by_ref,
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unreachable_pub,
    variant_size_differences
)]
#![allow(clippy::upper_case_acronyms)]
mod compiler;
mod drafts;
pub mod error;
mod formats;
mod helpers;
mod options;
pub mod primitive_type;
mod resolver;
mod retrieval;
mod schema;
mod validator;

pub use drafts::Draft;
pub use error::{SchemaError, ValidationError};
pub use options::CompileOptions;
pub use primitive_type::PrimitiveType;
#[cfg(feature = "http")]
pub use retrieval::HttpFetcher;
pub use retrieval::{AsyncRefProvider, ProvidedSchema, RefProvider};
pub use schema::{BoolOrSchema, Schema};
pub use validator::ValidationOptions;

use serde_json::Value;

/// A shortcut for validating `instance` against `schema`. Draft version is
/// detected automatically.
/// ```rust
/// use jsonschema_tree::is_valid;
/// use serde_json::json;
///
/// let schema = json!({"maxLength": 5});
/// let instance = json!("foo");
/// assert!(is_valid(&schema, &instance));
/// ```
///
/// This function panics if an invalid schema is passed.
#[must_use]
#[inline]
pub fn is_valid(schema: &Value, instance: &Value) -> bool {
    let compiled = Schema::compile(schema).expect("Invalid schema");
    compiled.is_valid(instance)
}


#[cfg(test)]
mod tests {
    use super::is_valid;
    use serde_json::json;

    #[test]
    fn test_is_valid() {
        let schema = json!({"minLength": 5});
        let valid = json!("foobar");
        let invalid = json!("foo");
        assert!(is_valid(&schema, &valid));
        assert!(!is_valid(&schema, &invalid));
    }
}
