//! Declarative schemas driving resource construction.
//!
//! A [`ResourceSchema`] describes one resource kind: which record field is
//! the identifier, how each attribute is produced, and where related records
//! are found. Builders consume these declarations; they never inspect Rust
//! type names at runtime.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Computes an attribute value from the full raw record.
///
/// Returning `None` means the attribute has no value; whether the key is
/// then omitted or emitted as `null` follows the field's [`FieldKind`].
pub type DeriveFn = Arc<dyn Fn(&Map<String, Value>) -> Option<Value> + Send + Sync>;

/// Produces resource-level metadata from the raw record.
pub type MetaFn = Arc<dyn Fn(&Map<String, Value>) -> Map<String, Value> + Send + Sync>;

/// Produces per-relationship metadata, keyed by relationship name.
pub type RelationshipMetaFn = Arc<dyn Fn(&str) -> Option<Map<String, Value>> + Send + Sync>;

/// How a declared field behaves when the record holds no value for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FieldKind {
    /// Absent or null values are omitted from the attributes.
    #[default]
    Optional,
    /// The attribute key is always emitted, `null` when there is no value.
    AlwaysPresent,
}

impl FieldKind {
    /// Parse a field kind from a profile string.
    ///
    /// Returns `None` for unknown values (caller should error).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "optional" => Some(FieldKind::Optional),
            "always" => Some(FieldKind::AlwaysPresent),
            _ => None,
        }
    }
}

/// Declaration of one attribute field.
#[derive(Clone, Default)]
pub struct FieldSchema {
    /// Marks this field as the resource's identifier source.
    pub identifier: bool,
    /// The value passes through the encrypter before exposure.
    pub encrypted: bool,
    /// Behavior when the record holds no value.
    pub kind: FieldKind,
    /// Computes the value from the full record instead of reading it directly.
    pub derive: Option<DeriveFn>,
}

impl FieldSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark this field as the identifier source.
    pub fn identifier(mut self) -> Self {
        self.identifier = true;
        self
    }

    /// Pass the value through the encrypter before exposure.
    pub fn encrypted(mut self) -> Self {
        self.encrypted = true;
        self
    }

    /// Always emit the attribute key, `null` when there is no value.
    pub fn always_present(mut self) -> Self {
        self.kind = FieldKind::AlwaysPresent;
        self
    }

    /// Compute the value with `f` instead of reading the record field.
    pub fn derived<F>(mut self, f: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Option<Value> + Send + Sync + 'static,
    {
        self.derive = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for FieldSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSchema")
            .field("identifier", &self.identifier)
            .field("encrypted", &self.encrypted)
            .field("kind", &self.kind)
            .field("derive", &self.derive.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Cardinality of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipKind {
    /// A single related record embedded under the relationship key.
    ToOne,
    /// An ordered sequence of related records under the relationship key.
    ToMany,
}

/// Declaration of one relationship.
///
/// The shorthand constructors expand the foreign-key field name from the
/// related builder type (`<builder_type>Id`); the expansion happens here,
/// once, at declaration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipSchema {
    pub kind: RelationshipKind,
    /// Registry key of the related resource schema.
    pub builder_type: String,
    /// Foreign-key field name in the raw record.
    pub id_field: String,
}

impl RelationshipSchema {
    /// Declare a to-one relationship with the conventional id field.
    pub fn to_one(builder_type: impl Into<String>) -> Self {
        let builder_type = builder_type.into();
        let id_field = format!("{builder_type}Id");
        Self {
            kind: RelationshipKind::ToOne,
            builder_type,
            id_field,
        }
    }

    /// Declare a to-many relationship with the conventional id field.
    pub fn to_many(builder_type: impl Into<String>) -> Self {
        let builder_type = builder_type.into();
        let id_field = format!("{builder_type}Id");
        Self {
            kind: RelationshipKind::ToMany,
            builder_type,
            id_field,
        }
    }

    /// Override the conventional foreign-key field name.
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }
}

/// Declarative description of one resource kind.
///
/// Field and relationship declaration order is preserved and drives the
/// order of the produced attributes and relationship lists.
#[derive(Clone, Default)]
pub struct ResourceSchema {
    resource_type: String,
    fields: Vec<(String, FieldSchema)>,
    relationships: Vec<(String, RelationshipSchema)>,
    self_path: Option<String>,
    meta: Option<MetaFn>,
    finalize_meta: Option<MetaFn>,
    relationship_meta: Option<RelationshipMetaFn>,
}

impl ResourceSchema {
    /// Create a schema with an explicit resource type tag (e.g. `"person"`).
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            ..Self::default()
        }
    }

    /// Declare an attribute field.
    pub fn field(mut self, name: impl Into<String>, schema: FieldSchema) -> Self {
        self.fields.push((name.into(), schema));
        self
    }

    /// Declare a relationship.
    pub fn relationship(
        mut self,
        name: impl Into<String>,
        schema: RelationshipSchema,
    ) -> Self {
        self.relationships.push((name.into(), schema));
        self
    }

    /// URL path prefix for the resource's self link (e.g. `"/people/"`).
    ///
    /// The link is `base_url + self_path + id`, built only when the registry
    /// has a base URL and the resource has an identifier.
    pub fn self_path(mut self, path: impl Into<String>) -> Self {
        self.self_path = Some(path.into());
        self
    }

    /// Metadata attached at construction time.
    pub fn meta<F>(mut self, f: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.meta = Some(Arc::new(f));
        self
    }

    /// Metadata attached when the resource is finalized.
    pub fn finalize_meta<F>(mut self, f: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.finalize_meta = Some(Arc::new(f));
        self
    }

    /// Per-relationship metadata, invoked with each relationship name.
    pub fn relationship_meta<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Option<Map<String, Value>> + Send + Sync + 'static,
    {
        self.relationship_meta = Some(Arc::new(f));
        self
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn fields(&self) -> &[(String, FieldSchema)] {
        &self.fields
    }

    pub fn relationships(&self) -> &[(String, RelationshipSchema)] {
        &self.relationships
    }

    pub fn self_path_prefix(&self) -> Option<&str> {
        self.self_path.as_deref()
    }

    /// The field marked as identifier, if any.
    pub fn identifier_field(&self) -> Option<(&str, &FieldSchema)> {
        self.fields
            .iter()
            .find(|(_, f)| f.identifier)
            .map(|(name, f)| (name.as_str(), f))
    }

    pub(crate) fn meta_hook(&self) -> Option<&MetaFn> {
        self.meta.as_ref()
    }

    pub(crate) fn finalize_meta_hook(&self) -> Option<&MetaFn> {
        self.finalize_meta.as_ref()
    }

    pub(crate) fn relationship_meta_hook(&self) -> Option<&RelationshipMetaFn> {
        self.relationship_meta.as_ref()
    }
}

impl fmt::Debug for ResourceSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceSchema")
            .field("resource_type", &self.resource_type)
            .field("fields", &self.fields)
            .field("relationships", &self.relationships)
            .field("self_path", &self.self_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_kind_parse_valid() {
        assert_eq!(FieldKind::parse("optional"), Some(FieldKind::Optional));
        assert_eq!(FieldKind::parse("always"), Some(FieldKind::AlwaysPresent));
    }

    #[test]
    fn field_kind_parse_invalid() {
        assert_eq!(FieldKind::parse("sometimes"), None);
        assert_eq!(FieldKind::parse(""), None);
    }

    #[test]
    fn shorthand_expands_id_field() {
        let rel = RelationshipSchema::to_one("person");
        assert_eq!(rel.id_field, "personId");
        assert_eq!(rel.kind, RelationshipKind::ToOne);

        let rel = RelationshipSchema::to_many("comment");
        assert_eq!(rel.id_field, "commentId");
        assert_eq!(rel.kind, RelationshipKind::ToMany);
    }

    #[test]
    fn structured_form_overrides_id_field() {
        let rel = RelationshipSchema::to_one("person").with_id_field("authorId");
        assert_eq!(rel.builder_type, "person");
        assert_eq!(rel.id_field, "authorId");
    }

    #[test]
    fn identifier_field_lookup() {
        let schema = ResourceSchema::new("person")
            .field("name", FieldSchema::new())
            .field("id", FieldSchema::new().identifier().encrypted());

        let (name, field) = schema.identifier_field().unwrap();
        assert_eq!(name, "id");
        assert!(field.encrypted);
    }

    #[test]
    fn identifier_field_absent() {
        let schema = ResourceSchema::new("tag").field("label", FieldSchema::new());
        assert!(schema.identifier_field().is_none());
    }

    #[test]
    fn derived_field_invokes_callback() {
        let field = FieldSchema::new().derived(|record| {
            record
                .get("firstName")
                .and_then(Value::as_str)
                .map(|s| json!(s.to_uppercase()))
        });

        let record = json!({ "firstName": "ada" });
        let derived = field.derive.as_ref().unwrap()(record.as_object().unwrap());
        assert_eq!(derived, Some(json!("ADA")));
    }

    #[test]
    fn declaration_order_is_preserved() {
        let schema = ResourceSchema::new("person")
            .field("b", FieldSchema::new())
            .field("a", FieldSchema::new())
            .field("c", FieldSchema::new());

        let names: Vec<&str> = schema.fields().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }
}
