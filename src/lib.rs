//! JSON:API Resource Builder
//!
//! Declarative mapping of flat data records into JSON:API resource objects.
//!
//! This library turns plain associative records (e.g. database rows parsed
//! into `serde_json::Map`) into resource objects with `type`, `id`,
//! `attributes`, `relationships`, `meta`, and `links`, driven by per-resource
//! declarative schemas. Related records nested inside the raw record are
//! resolved recursively through a [`Registry`], and identifiers can be
//! obfuscated through an injected [`Encrypter`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use jsonapi_builder::{FieldSchema, Registry, RelationshipSchema, ResourceSchema};
//! use serde_json::json;
//!
//! let mut registry = Registry::new();
//! registry.register(
//!     ResourceSchema::new("person")
//!         .field("id", FieldSchema::new().identifier().encrypted())
//!         .field("name", FieldSchema::new())
//!         .relationship("comments", RelationshipSchema::to_many("comment")),
//! ).unwrap();
//! registry.register(
//!     ResourceSchema::new("comment")
//!         .field("id", FieldSchema::new().identifier())
//!         .field("text", FieldSchema::new()),
//! ).unwrap();
//! registry.set_default_encrypter(Arc::new(|id: i64| format!("xZ{id}")));
//!
//! let record = json!({
//!     "id": 42,
//!     "name": "Ada",
//!     "comments": [{ "id": 1, "text": "hi" }]
//! });
//!
//! let mut builder = registry
//!     .create("person", record.as_object().cloned().unwrap(), None)
//!     .unwrap();
//! let resource = builder.build_resource().unwrap();
//!
//! assert_eq!(resource.id.as_deref(), Some("xZ42"));
//! assert_eq!(resource.attributes["name"], json!("Ada"));
//! assert_eq!(resource.relationship("comments").unwrap().len(), 1);
//! ```
//!
//! # Field declarations
//!
//! | Option | Effect |
//! |--------------------|-----------------------------------------------------|
//! | `identifier()` | Field is the resource id source, never an attribute |
//! | `encrypted()` | Value passes through the encrypter before exposure |
//! | `always_present()` | Key is emitted as `null` when the record has no value |
//! | `derived(f)` | Value is computed from the full record by `f` |
//!
//! By default, fields absent or null in the record are omitted from the
//! attributes rather than emitted as `null`.
//!
//! # Relationship declarations
//!
//! Shorthand declarations expand the foreign-key field name by convention:
//! `RelationshipSchema::to_many("comment")` reads nested records under the
//! relationship name and declares `commentId` as the foreign key. Both
//! to-one and to-many relationships produce ordered lists of entries, each
//! wrapping a fully-built child resource.

mod builder;
mod encrypter;
mod error;
mod linter;
mod loader;
mod registry;
mod resource;
mod schema;

pub use builder::{ResourceBuilder, MAX_DEPTH};
pub use encrypter::Encrypter;
pub use error::{BuildError, ConfigError};
pub use linter::{lint, lint_file, Diagnostic, FileResult, FileStatus, LintResult, Severity};
pub use loader::{load_profile, load_profile_str, parse_profile, Derivations};
pub use registry::Registry;
pub use resource::{Link, Relationship, ResourceObject};
pub use schema::{
    json_type_name, DeriveFn, FieldKind, FieldSchema, MetaFn, RelationshipKind,
    RelationshipMetaFn, RelationshipSchema, ResourceSchema,
};
