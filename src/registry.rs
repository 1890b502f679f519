//! Schema registration and builder construction.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::builder::ResourceBuilder;
use crate::encrypter::Encrypter;
use crate::error::{BuildError, ConfigError};
use crate::schema::ResourceSchema;

/// The single entry point for builder construction.
///
/// Holds one validated [`ResourceSchema`] per resource type, the default
/// encrypter, and the base URL for self links. Relationship resolution
/// recurses through here, so builders never need direct knowledge of
/// sibling schemas.
#[derive(Default)]
pub struct Registry {
    schemas: HashMap<String, Arc<ResourceSchema>>,
    default_encrypter: Option<Arc<dyn Encrypter>>,
    base_url: Option<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema under its declared resource type.
    ///
    /// Validates the declaration: a non-empty type, at most one identifier
    /// field, unique field and relationship names, and no duplicate type
    /// registration.
    pub fn register(&mut self, schema: ResourceSchema) -> Result<(), ConfigError> {
        validate(&schema)?;
        let resource_type = schema.resource_type().to_string();
        if self.schemas.contains_key(&resource_type) {
            return Err(ConfigError::DuplicateType { resource_type });
        }
        self.schemas.insert(resource_type, Arc::new(schema));
        Ok(())
    }

    /// Encrypter used when `create` is called without an override.
    pub fn set_default_encrypter(&mut self, encrypter: Arc<dyn Encrypter>) {
        self.default_encrypter = Some(encrypter);
    }

    /// Base URL prepended to schema self-link paths.
    pub fn set_base_url(&mut self, url: impl Into<String>) {
        self.base_url = Some(url.into());
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Look up a registered schema.
    pub fn schema(&self, resource_type: &str) -> Option<&Arc<ResourceSchema>> {
        self.schemas.get(resource_type)
    }

    /// Construct a builder for one raw record.
    ///
    /// Every call produces a fresh, independent builder; instances are never
    /// cached or deduplicated. With no `encrypter` override the registry
    /// default applies, if one is configured.
    pub fn create(
        &self,
        builder_type: &str,
        data: Map<String, Value>,
        encrypter: Option<Arc<dyn Encrypter>>,
    ) -> Result<ResourceBuilder<'_>, BuildError> {
        let encrypter = encrypter.or_else(|| self.default_encrypter.clone());
        self.create_at_depth(builder_type, data, encrypter, 0)
    }

    pub(crate) fn create_at_depth(
        &self,
        builder_type: &str,
        data: Map<String, Value>,
        encrypter: Option<Arc<dyn Encrypter>>,
        depth: usize,
    ) -> Result<ResourceBuilder<'_>, BuildError> {
        let schema = self
            .schemas
            .get(builder_type)
            .ok_or_else(|| BuildError::UnknownBuilderType {
                name: builder_type.to_string(),
            })?;
        ResourceBuilder::new(self, Arc::clone(schema), encrypter, data, depth)
    }
}

fn validate(schema: &ResourceSchema) -> Result<(), ConfigError> {
    let resource_type = schema.resource_type();
    if resource_type.is_empty() {
        return Err(ConfigError::EmptyType);
    }

    let mut identifier: Option<&str> = None;
    let mut seen: Vec<&str> = Vec::new();
    for (name, field) in schema.fields() {
        if seen.contains(&name.as_str()) {
            return Err(ConfigError::DuplicateField {
                resource_type: resource_type.to_string(),
                name: name.clone(),
            });
        }
        seen.push(name);

        if field.identifier {
            if let Some(first) = identifier {
                return Err(ConfigError::DuplicateIdentifier {
                    resource_type: resource_type.to_string(),
                    first: first.to_string(),
                    second: name.clone(),
                });
            }
            identifier = Some(name);
        }
    }

    let mut seen: Vec<&str> = Vec::new();
    for (name, _) in schema.relationships() {
        if seen.contains(&name.as_str()) {
            return Err(ConfigError::DuplicateField {
                resource_type: resource_type.to_string(),
                name: name.clone(),
            });
        }
        seen.push(name);
    }

    Ok(())
}
