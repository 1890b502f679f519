//! Resource building - turns one raw record into one resource object.
//!
//! Construction resolves the identifier, attributes, construction-time meta,
//! and the self link. Finalization ([`ResourceBuilder::build_resource`])
//! resolves relationships by recursing through the registry, one fresh child
//! builder per nested record. Builders are single-use, one per raw record.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::encrypter::Encrypter;
use crate::error::BuildError;
use crate::registry::Registry;
use crate::resource::{Link, Relationship, ResourceObject};
use crate::schema::{json_type_name, FieldKind, RelationshipKind, RelationshipSchema, ResourceSchema};

/// Hard ceiling on relationship recursion depth.
///
/// Raw records are expected to be tree-shaped; the ceiling turns a cyclic
/// record graph into an error instead of unbounded recursion.
pub const MAX_DEPTH: usize = 32;

/// Builds one resource object from one raw record.
pub struct ResourceBuilder<'r> {
    registry: &'r Registry,
    schema: Arc<ResourceSchema>,
    encrypter: Option<Arc<dyn Encrypter>>,
    data: Map<String, Value>,
    resource: ResourceObject,
    depth: usize,
    finalized: bool,
}

impl<'r> ResourceBuilder<'r> {
    pub(crate) fn new(
        registry: &'r Registry,
        schema: Arc<ResourceSchema>,
        encrypter: Option<Arc<dyn Encrypter>>,
        data: Map<String, Value>,
        depth: usize,
    ) -> Result<Self, BuildError> {
        if depth >= MAX_DEPTH {
            return Err(BuildError::RecursionLimit {
                resource_type: schema.resource_type().to_string(),
                limit: MAX_DEPTH,
            });
        }

        let id = resolve_identifier(&schema, &data, encrypter.as_deref())?;
        let mut resource = ResourceObject::new(schema.resource_type(), id);
        resource.attributes = resolve_attributes(&schema, &data, encrypter.as_deref())?;
        if let Some(hook) = schema.meta_hook() {
            resource.meta = hook(&data);
        }

        let mut builder = Self {
            registry,
            schema,
            encrypter,
            data,
            resource,
            depth,
            finalized: false,
        };
        builder.build_links();
        Ok(builder)
    }

    /// The resource in its constructed state (no relationships yet).
    pub fn resource(&self) -> &ResourceObject {
        &self.resource
    }

    /// Finalize the resource: attach late meta and relationships.
    ///
    /// Memoized; calling this more than once returns the same content and
    /// never duplicates relationship entries.
    pub fn build_resource(&mut self) -> Result<&ResourceObject, BuildError> {
        if !self.finalized {
            if let Some(hook) = self.schema.finalize_meta_hook() {
                for (key, value) in hook(&self.data) {
                    self.resource.meta.insert(key, value);
                }
            }
            self.resource.relationships = self.resolve_relationships()?;
            self.finalized = true;
        }
        Ok(&self.resource)
    }

    /// Finalize and take ownership of the resource.
    pub fn into_resource(mut self) -> Result<ResourceObject, BuildError> {
        self.build_resource()?;
        Ok(self.resource)
    }

    /// Attach the self link when the schema declares a path and both the
    /// base URL and the identifier exist. A missing piece is logged and
    /// skipped; link generation never aborts construction.
    fn build_links(&mut self) {
        let Some(path) = self.schema.self_path_prefix() else {
            return;
        };
        let Some(base) = self.registry.base_url() else {
            tracing::warn!(
                resource_type = %self.schema.resource_type(),
                "skipping self link: no base URL configured"
            );
            return;
        };
        let Some(id) = &self.resource.id else {
            tracing::warn!(
                resource_type = %self.schema.resource_type(),
                "skipping self link: resource has no identifier"
            );
            return;
        };
        self.resource
            .links
            .push(Link::new("self", format!("{base}{path}{id}")));
    }

    fn resolve_relationships(&self) -> Result<Vec<(String, Vec<Relationship>)>, BuildError> {
        let mut relationships = Vec::new();

        for (name, rel) in self.schema.relationships() {
            let Some(value) = self.data.get(name) else {
                continue;
            };

            let mut entries = Vec::new();
            match rel.kind {
                RelationshipKind::ToOne => match value {
                    Value::Null => continue,
                    Value::Object(record) => {
                        if record.is_empty() {
                            continue;
                        }
                        entries.push(self.build_related(rel, name, record)?);
                    }
                    other => {
                        return Err(BuildError::RelationshipNotAnObject {
                            resource_type: self.schema.resource_type().to_string(),
                            relationship: name.clone(),
                            actual: json_type_name(other).to_string(),
                        })
                    }
                },
                RelationshipKind::ToMany => match value {
                    Value::Null => continue,
                    Value::Array(records) => {
                        for item in records {
                            let Value::Object(record) = item else {
                                return Err(BuildError::RelationshipNotAnArray {
                                    resource_type: self.schema.resource_type().to_string(),
                                    relationship: name.clone(),
                                    actual: json_type_name(item).to_string(),
                                });
                            };
                            entries.push(self.build_related(rel, name, record)?);
                        }
                    }
                    other => {
                        return Err(BuildError::RelationshipNotAnArray {
                            resource_type: self.schema.resource_type().to_string(),
                            relationship: name.clone(),
                            actual: json_type_name(other).to_string(),
                        })
                    }
                },
            }

            if !entries.is_empty() {
                relationships.push((name.clone(), entries));
            }
        }

        Ok(relationships)
    }

    fn build_related(
        &self,
        rel: &RelationshipSchema,
        name: &str,
        record: &Map<String, Value>,
    ) -> Result<Relationship, BuildError> {
        let child = self.registry.create_at_depth(
            &rel.builder_type,
            record.clone(),
            self.encrypter.clone(),
            self.depth + 1,
        )?;
        let resource = child.into_resource()?;

        let mut entry = Relationship::new(resource);
        if let Some(hook) = self.schema.relationship_meta_hook() {
            if let Some(meta) = hook(name) {
                entry = entry.with_meta(meta);
            }
        }
        Ok(entry)
    }
}

fn resolve_identifier(
    schema: &ResourceSchema,
    data: &Map<String, Value>,
    encrypter: Option<&dyn Encrypter>,
) -> Result<Option<String>, BuildError> {
    let Some((name, field)) = schema.identifier_field() else {
        return Ok(None);
    };
    let value = match data.get(name) {
        None | Some(Value::Null) => return Ok(None),
        Some(value) => value,
    };

    if field.encrypted {
        let raw = value
            .as_i64()
            .ok_or_else(|| BuildError::EncryptedValueNotInteger {
                resource_type: schema.resource_type().to_string(),
                field: name.to_string(),
                actual: json_type_name(value).to_string(),
            })?;
        // Without an encrypter the raw numeric value is exposed as-is.
        return Ok(Some(match encrypter {
            Some(encrypter) => encrypter.encrypt_id(raw),
            None => raw.to_string(),
        }));
    }

    match value {
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(BuildError::IdentifierNotScalar {
            resource_type: schema.resource_type().to_string(),
            field: name.to_string(),
            actual: json_type_name(other).to_string(),
        }),
    }
}

fn resolve_attributes(
    schema: &ResourceSchema,
    data: &Map<String, Value>,
    encrypter: Option<&dyn Encrypter>,
) -> Result<Map<String, Value>, BuildError> {
    let mut attributes = Map::new();

    for (name, field) in schema.fields() {
        let value = data.get(name).filter(|v| !v.is_null());

        // The identifier is never duplicated into attributes.
        if field.derive.is_none() && field.identifier {
            continue;
        }

        if field.encrypted {
            match value {
                Some(value) => {
                    let encrypter =
                        encrypter.ok_or_else(|| BuildError::EncrypterMissing {
                            resource_type: schema.resource_type().to_string(),
                            field: name.clone(),
                        })?;
                    let raw =
                        value
                            .as_i64()
                            .ok_or_else(|| BuildError::EncryptedValueNotInteger {
                                resource_type: schema.resource_type().to_string(),
                                field: name.clone(),
                                actual: json_type_name(value).to_string(),
                            })?;
                    attributes.insert(name.clone(), Value::String(encrypter.encrypt_id(raw)));
                }
                None => emit_missing(&mut attributes, name, field.kind),
            }
        } else if let Some(derive) = &field.derive {
            match derive(data) {
                Some(derived) => {
                    attributes.insert(name.clone(), derived);
                }
                None => emit_missing(&mut attributes, name, field.kind),
            }
        } else {
            match value {
                Some(value) => {
                    attributes.insert(name.clone(), value.clone());
                }
                None => emit_missing(&mut attributes, name, field.kind),
            }
        }
    }

    Ok(attributes)
}

/// Apply the field-kind rule for a field that produced no value.
fn emit_missing(attributes: &mut Map<String, Value>, name: &str, kind: FieldKind) {
    if kind == FieldKind::AlwaysPresent {
        attributes.insert(name.to_string(), Value::Null);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSchema;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn person_schema() -> ResourceSchema {
        ResourceSchema::new("person")
            .field("id", FieldSchema::new().identifier().encrypted())
            .field("name", FieldSchema::new())
    }

    // === Identifier Tests ===

    #[test]
    fn encrypted_identifier_uses_encrypter() {
        let encrypter = |id: i64| format!("xZ{id}");
        let id = resolve_identifier(
            &person_schema(),
            &record(json!({ "id": 42, "name": "Ada" })),
            Some(&encrypter),
        )
        .unwrap();
        assert_eq!(id, Some("xZ42".into()));
    }

    #[test]
    fn encrypted_identifier_falls_back_to_raw() {
        let id = resolve_identifier(
            &person_schema(),
            &record(json!({ "id": 42 })),
            None,
        )
        .unwrap();
        assert_eq!(id, Some("42".into()));
    }

    #[test]
    fn missing_identifier_field_yields_none() {
        let schema = ResourceSchema::new("tag").field("label", FieldSchema::new());
        let id = resolve_identifier(&schema, &record(json!({ "label": "rust" })), None).unwrap();
        assert_eq!(id, None);
    }

    #[test]
    fn absent_identifier_value_yields_none() {
        let id = resolve_identifier(&person_schema(), &record(json!({ "name": "Ada" })), None)
            .unwrap();
        assert_eq!(id, None);
    }

    #[test]
    fn plain_identifier_passes_through() {
        let schema = ResourceSchema::new("person").field("id", FieldSchema::new().identifier());
        let id = resolve_identifier(&schema, &record(json!({ "id": "u-7" })), None).unwrap();
        assert_eq!(id, Some("u-7".into()));

        let id = resolve_identifier(&schema, &record(json!({ "id": 7 })), None).unwrap();
        assert_eq!(id, Some("7".into()));
    }

    #[test]
    fn non_integer_encrypted_identifier_errors() {
        let encrypter = |id: i64| id.to_string();
        let result = resolve_identifier(
            &person_schema(),
            &record(json!({ "id": "abc" })),
            Some(&encrypter),
        );
        assert!(matches!(
            result,
            Err(BuildError::EncryptedValueNotInteger { actual, .. }) if actual == "string"
        ));
    }

    #[test]
    fn non_scalar_identifier_errors() {
        let schema = ResourceSchema::new("person").field("id", FieldSchema::new().identifier());
        let result = resolve_identifier(&schema, &record(json!({ "id": [1, 2] })), None);
        assert!(matches!(
            result,
            Err(BuildError::IdentifierNotScalar { actual, .. }) if actual == "array"
        ));
    }

    // === Attribute Tests ===

    #[test]
    fn identifier_is_not_duplicated_into_attributes() {
        let encrypter = |id: i64| format!("xZ{id}");
        let attributes = resolve_attributes(
            &person_schema(),
            &record(json!({ "id": 42, "name": "Ada" })),
            Some(&encrypter),
        )
        .unwrap();
        assert!(attributes.get("id").is_none());
        assert_eq!(attributes.get("name"), Some(&json!("Ada")));
    }

    #[test]
    fn absent_optional_field_is_omitted() {
        let schema = ResourceSchema::new("person")
            .field("name", FieldSchema::new())
            .field("bio", FieldSchema::new());
        let attributes =
            resolve_attributes(&schema, &record(json!({ "name": "Ada" })), None).unwrap();
        assert!(attributes.get("bio").is_none());
    }

    #[test]
    fn null_optional_field_is_omitted() {
        let schema = ResourceSchema::new("person").field("bio", FieldSchema::new());
        let attributes =
            resolve_attributes(&schema, &record(json!({ "bio": null })), None).unwrap();
        assert!(attributes.is_empty());
    }

    #[test]
    fn absent_always_present_field_is_null() {
        let schema = ResourceSchema::new("person")
            .field("bio", FieldSchema::new().always_present());
        let attributes = resolve_attributes(&schema, &record(json!({})), None).unwrap();
        assert_eq!(attributes.get("bio"), Some(&Value::Null));
    }

    #[test]
    fn encrypted_attribute_uses_encrypter() {
        let encrypter = |id: i64| format!("enc-{id}");
        let schema = ResourceSchema::new("post")
            .field("authorId", FieldSchema::new().encrypted());
        let attributes = resolve_attributes(
            &schema,
            &record(json!({ "authorId": 9 })),
            Some(&encrypter),
        )
        .unwrap();
        assert_eq!(attributes.get("authorId"), Some(&json!("enc-9")));
    }

    #[test]
    fn encrypted_attribute_without_encrypter_errors() {
        let schema = ResourceSchema::new("post")
            .field("authorId", FieldSchema::new().encrypted());
        let result = resolve_attributes(&schema, &record(json!({ "authorId": 9 })), None);
        assert!(matches!(result, Err(BuildError::EncrypterMissing { .. })));
    }

    #[test]
    fn absent_encrypted_attribute_is_omitted() {
        let schema = ResourceSchema::new("post")
            .field("authorId", FieldSchema::new().encrypted());
        let attributes = resolve_attributes(&schema, &record(json!({})), None).unwrap();
        assert!(attributes.is_empty());
    }

    #[test]
    fn derived_attribute_reads_full_record() {
        let schema = ResourceSchema::new("person").field(
            "fullName",
            FieldSchema::new().derived(|record| {
                let first = record.get("firstName")?.as_str()?;
                let last = record.get("lastName")?.as_str()?;
                Some(json!(format!("{first} {last}")))
            }),
        );
        let attributes = resolve_attributes(
            &schema,
            &record(json!({ "firstName": "Ada", "lastName": "Lovelace" })),
            None,
        )
        .unwrap();
        assert_eq!(attributes.get("fullName"), Some(&json!("Ada Lovelace")));
    }

    #[test]
    fn derived_none_is_omitted() {
        let schema = ResourceSchema::new("person")
            .field("fullName", FieldSchema::new().derived(|_| None));
        let attributes = resolve_attributes(&schema, &record(json!({})), None).unwrap();
        assert!(attributes.is_empty());
    }

    #[test]
    fn derived_none_always_present_is_null() {
        let schema = ResourceSchema::new("person")
            .field("fullName", FieldSchema::new().derived(|_| None).always_present());
        let attributes = resolve_attributes(&schema, &record(json!({})), None).unwrap();
        assert_eq!(attributes.get("fullName"), Some(&Value::Null));
    }

    #[test]
    fn encryption_takes_precedence_over_derivation() {
        let encrypter = |id: i64| format!("enc-{id}");
        let schema = ResourceSchema::new("post").field(
            "ownerId",
            FieldSchema::new()
                .encrypted()
                .derived(|_| Some(json!("derived"))),
        );
        let attributes = resolve_attributes(
            &schema,
            &record(json!({ "ownerId": 5 })),
            Some(&encrypter),
        )
        .unwrap();
        assert_eq!(attributes.get("ownerId"), Some(&json!("enc-5")));
    }

    #[test]
    fn attributes_follow_declaration_order() {
        let schema = ResourceSchema::new("person")
            .field("zeta", FieldSchema::new())
            .field("alpha", FieldSchema::new());
        let attributes = resolve_attributes(
            &schema,
            &record(json!({ "alpha": 1, "zeta": 2 })),
            None,
        )
        .unwrap();
        let names: Vec<&String> = attributes.keys().collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }
}
