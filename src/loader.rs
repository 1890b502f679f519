//! Registry profiles - declarative schema loading from JSON.
//!
//! A profile declares a whole registry in one JSON document:
//!
//! ```json
//! {
//!     "baseUrl": "https://api.example.com",
//!     "resources": {
//!         "person": {
//!             "fields": {
//!                 "id": { "identifier": true, "encrypted": true },
//!                 "name": {}
//!             },
//!             "toMany": { "comments": "comment" },
//!             "selfLink": "/people/"
//!         },
//!         "comment": {
//!             "fields": { "id": { "identifier": true }, "text": {} }
//!         }
//!     }
//! }
//! ```
//!
//! Relationship entries come in shorthand form (a bare builder type, the
//! foreign-key field defaulting to `<type>Id`) or structured form
//! (`{ "type": ..., "idField": ... }`). Derived fields reference derivations
//! by name; the names resolve against a caller-supplied [`Derivations`]
//! table at load time, so the schemas end up holding typed callbacks.

use std::collections::HashMap;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::registry::Registry;
use crate::schema::{json_type_name, DeriveFn, FieldKind, FieldSchema, RelationshipKind, RelationshipSchema, ResourceSchema};

/// Named derivation callbacks available to profile fields.
#[derive(Default)]
pub struct Derivations {
    map: HashMap<String, DeriveFn>,
}

impl Derivations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a derivation under a profile-visible name.
    pub fn insert<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&Map<String, Value>) -> Option<Value> + Send + Sync + 'static,
    {
        self.map.insert(name.into(), std::sync::Arc::new(f));
    }

    pub fn get(&self, name: &str) -> Option<&DeriveFn> {
        self.map.get(name)
    }
}

/// Load a profile from a file path and build a validated registry.
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if the file doesn't exist,
/// `ConfigError::InvalidJson` if it isn't valid JSON, or a declaration
/// error if any schema entry is malformed.
pub fn load_profile(path: &Path, derivations: &Derivations) -> Result<Registry, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_profile_str(&content, derivations)
}

/// Load a profile from a JSON string and build a validated registry.
pub fn load_profile_str(content: &str, derivations: &Derivations) -> Result<Registry, ConfigError> {
    let profile: Value =
        serde_json::from_str(content).map_err(|source| ConfigError::InvalidJson { source })?;
    parse_profile(&profile, derivations)
}

/// Build a validated registry from an already-parsed profile document.
pub fn parse_profile(profile: &Value, derivations: &Derivations) -> Result<Registry, ConfigError> {
    let root = profile.as_object().ok_or(ConfigError::NotAProfile)?;
    let resources = root
        .get("resources")
        .and_then(Value::as_object)
        .ok_or(ConfigError::NotAProfile)?;

    let mut registry = Registry::new();
    if let Some(base_url) = root.get("baseUrl").and_then(Value::as_str) {
        registry.set_base_url(base_url);
    }

    for (resource_type, declaration) in resources {
        let schema = parse_resource(resource_type, declaration, derivations)?;
        registry.register(schema)?;
    }

    Ok(registry)
}

fn parse_resource(
    resource_type: &str,
    declaration: &Value,
    derivations: &Derivations,
) -> Result<ResourceSchema, ConfigError> {
    let declaration = declaration
        .as_object()
        .ok_or_else(|| ConfigError::ResourceNotConfigured {
            resource_type: resource_type.to_string(),
            actual: json_type_name(declaration).to_string(),
        })?;

    let mut schema = ResourceSchema::new(resource_type);

    if let Some(fields) = declaration.get("fields").and_then(Value::as_object) {
        for (name, entry) in fields {
            let field = parse_field(resource_type, name, entry, derivations)?;
            schema = schema.field(name, field);
        }
    }

    for (key, kind) in [
        ("toOne", RelationshipKind::ToOne),
        ("toMany", RelationshipKind::ToMany),
    ] {
        if let Some(relationships) = declaration.get(key).and_then(Value::as_object) {
            for (name, entry) in relationships {
                let relationship = parse_relationship(resource_type, name, kind, entry)?;
                schema = schema.relationship(name, relationship);
            }
        }
    }

    if let Some(path) = declaration.get("selfLink").and_then(Value::as_str) {
        schema = schema.self_path(path);
    }

    Ok(schema)
}

fn parse_field(
    resource_type: &str,
    name: &str,
    entry: &Value,
    derivations: &Derivations,
) -> Result<FieldSchema, ConfigError> {
    // A bare value in place of an options object is a declaration mistake,
    // fatal for the whole profile.
    let options = entry
        .as_object()
        .ok_or_else(|| ConfigError::FieldNotConfigured {
            resource_type: resource_type.to_string(),
            field: name.to_string(),
            actual: json_type_name(entry).to_string(),
        })?;

    let mut field = FieldSchema::new();

    for option in ["identifier", "encrypted"] {
        if let Some(value) = options.get(option) {
            let enabled = value
                .as_bool()
                .ok_or_else(|| ConfigError::InvalidFieldOption {
                    resource_type: resource_type.to_string(),
                    field: name.to_string(),
                    option: option.to_string(),
                    actual: json_type_name(value).to_string(),
                })?;
            if enabled {
                field = match option {
                    "identifier" => field.identifier(),
                    _ => field.encrypted(),
                };
            }
        }
    }

    if let Some(value) = options.get("kind") {
        let kind_str = value
            .as_str()
            .ok_or_else(|| ConfigError::InvalidFieldOption {
                resource_type: resource_type.to_string(),
                field: name.to_string(),
                option: "kind".to_string(),
                actual: json_type_name(value).to_string(),
            })?;
        let kind = FieldKind::parse(kind_str).ok_or_else(|| ConfigError::UnknownFieldKind {
            resource_type: resource_type.to_string(),
            field: name.to_string(),
            value: kind_str.to_string(),
        })?;
        if kind == FieldKind::AlwaysPresent {
            field = field.always_present();
        }
    }

    if let Some(value) = options.get("derive") {
        let derive_name = value
            .as_str()
            .ok_or_else(|| ConfigError::InvalidFieldOption {
                resource_type: resource_type.to_string(),
                field: name.to_string(),
                option: "derive".to_string(),
                actual: json_type_name(value).to_string(),
            })?;
        let derive = derivations
            .get(derive_name)
            .ok_or_else(|| ConfigError::UnknownDerivation {
                resource_type: resource_type.to_string(),
                field: name.to_string(),
                name: derive_name.to_string(),
            })?;
        field.derive = Some(derive.clone());
    }

    Ok(field)
}

fn parse_relationship(
    resource_type: &str,
    name: &str,
    kind: RelationshipKind,
    entry: &Value,
) -> Result<RelationshipSchema, ConfigError> {
    let make = |builder_type: &str| match kind {
        RelationshipKind::ToOne => RelationshipSchema::to_one(builder_type),
        RelationshipKind::ToMany => RelationshipSchema::to_many(builder_type),
    };

    match entry {
        // Shorthand: "comments": "comment"
        Value::String(builder_type) => Ok(make(builder_type)),

        // Structured form: "comments": { "type": "comment", "idField": "noteId" }
        Value::Object(options) => {
            let builder_type = options.get("type").and_then(Value::as_str).ok_or_else(|| {
                ConfigError::RelationshipNotConfigured {
                    resource_type: resource_type.to_string(),
                    relationship: name.to_string(),
                    actual: json_type_name(entry).to_string(),
                }
            })?;
            let mut relationship = make(builder_type);
            if let Some(id_field) = options.get("idField").and_then(Value::as_str) {
                relationship = relationship.with_id_field(id_field);
            }
            Ok(relationship)
        }

        other => Err(ConfigError::RelationshipNotConfigured {
            resource_type: resource_type.to_string(),
            relationship: name.to_string(),
            actual: json_type_name(other).to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn load_minimal_profile() {
        let registry = load_profile_str(
            r#"{
                "resources": {
                    "person": {
                        "fields": { "id": { "identifier": true }, "name": {} }
                    }
                }
            }"#,
            &Derivations::new(),
        )
        .unwrap();

        let schema = registry.schema("person").unwrap();
        assert_eq!(schema.resource_type(), "person");
        assert_eq!(schema.identifier_field().unwrap().0, "id");
    }

    #[test]
    fn base_url_is_applied() {
        let registry = load_profile_str(
            r#"{ "baseUrl": "https://api.example.com", "resources": {} }"#,
            &Derivations::new(),
        )
        .unwrap();
        assert_eq!(registry.base_url(), Some("https://api.example.com"));
    }

    #[test]
    fn root_without_resources_errors() {
        let result = load_profile_str(r#"{ "fields": {} }"#, &Derivations::new());
        assert!(matches!(result, Err(ConfigError::NotAProfile)));
    }

    #[test]
    fn invalid_json_errors() {
        let result = load_profile_str("{not json", &Derivations::new());
        assert!(matches!(result, Err(ConfigError::InvalidJson { .. })));
    }

    #[test]
    fn bare_field_value_errors() {
        let result = load_profile_str(
            r#"{ "resources": { "person": { "fields": { "name": "string" } } } }"#,
            &Derivations::new(),
        );
        assert!(matches!(
            result,
            Err(ConfigError::FieldNotConfigured { field, actual, .. })
                if field == "name" && actual == "string"
        ));
    }

    #[test]
    fn unknown_kind_errors() {
        let result = load_profile_str(
            r#"{ "resources": { "person": { "fields": { "bio": { "kind": "sometimes" } } } } }"#,
            &Derivations::new(),
        );
        assert!(matches!(
            result,
            Err(ConfigError::UnknownFieldKind { value, .. }) if value == "sometimes"
        ));
    }

    #[test]
    fn non_boolean_option_errors() {
        let result = load_profile_str(
            r#"{ "resources": { "person": { "fields": { "id": { "identifier": "yes" } } } } }"#,
            &Derivations::new(),
        );
        assert!(matches!(
            result,
            Err(ConfigError::InvalidFieldOption { option, .. }) if option == "identifier"
        ));
    }

    #[test]
    fn unknown_derivation_errors() {
        let result = load_profile_str(
            r#"{ "resources": { "person": { "fields": { "slug": { "derive": "slugify" } } } } }"#,
            &Derivations::new(),
        );
        assert!(matches!(
            result,
            Err(ConfigError::UnknownDerivation { name, .. }) if name == "slugify"
        ));
    }

    #[test]
    fn named_derivation_resolves() {
        let mut derivations = Derivations::new();
        derivations.insert("shout", |record: &Map<String, Value>| {
            record
                .get("name")
                .and_then(Value::as_str)
                .map(|s| json!(s.to_uppercase()))
        });

        let registry = load_profile_str(
            r#"{
                "resources": {
                    "person": { "fields": { "shouted": { "derive": "shout" } } }
                }
            }"#,
            &derivations,
        )
        .unwrap();

        let mut builder = registry
            .create(
                "person",
                json!({ "name": "ada" }).as_object().cloned().unwrap(),
                None,
            )
            .unwrap();
        let resource = builder.build_resource().unwrap();
        assert_eq!(resource.attributes.get("shouted"), Some(&json!("ADA")));
    }

    #[test]
    fn shorthand_relationship_expands() {
        let registry = load_profile_str(
            r#"{
                "resources": {
                    "post": { "toMany": { "comments": "comment" } },
                    "comment": {}
                }
            }"#,
            &Derivations::new(),
        )
        .unwrap();

        let schema = registry.schema("post").unwrap();
        let (name, rel) = &schema.relationships()[0];
        assert_eq!(name, "comments");
        assert_eq!(rel.builder_type, "comment");
        assert_eq!(rel.id_field, "commentId");
        assert_eq!(rel.kind, RelationshipKind::ToMany);
    }

    #[test]
    fn structured_relationship_overrides_id_field() {
        let registry = load_profile_str(
            r#"{
                "resources": {
                    "post": {
                        "toOne": { "author": { "type": "person", "idField": "authorId" } }
                    },
                    "person": {}
                }
            }"#,
            &Derivations::new(),
        )
        .unwrap();

        let schema = registry.schema("post").unwrap();
        let (_, rel) = &schema.relationships()[0];
        assert_eq!(rel.builder_type, "person");
        assert_eq!(rel.id_field, "authorId");
        assert_eq!(rel.kind, RelationshipKind::ToOne);
    }

    #[test]
    fn malformed_relationship_errors() {
        let result = load_profile_str(
            r#"{ "resources": { "post": { "toOne": { "author": 7 } } } }"#,
            &Derivations::new(),
        );
        assert!(matches!(
            result,
            Err(ConfigError::RelationshipNotConfigured { actual, .. }) if actual == "number"
        ));
    }

    #[test]
    fn duplicate_identifier_in_profile_errors() {
        let result = load_profile_str(
            r#"{
                "resources": {
                    "person": {
                        "fields": {
                            "id": { "identifier": true },
                            "uuid": { "identifier": true }
                        }
                    }
                }
            }"#,
            &Derivations::new(),
        );
        assert!(matches!(result, Err(ConfigError::DuplicateIdentifier { .. })));
    }
}
