//! Produced value objects: resource, relationship entries, links.
//!
//! These are the structures a document-assembly layer consumes. The JSON
//! rendering never emits empty `attributes`, `relationships`, `meta`, or
//! `links` blocks, and represents to-one and to-many relationships uniformly
//! as ordered lists.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// One JSON:API resource object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceObject {
    /// Stable resource kind tag (e.g. "person").
    pub resource_type: String,
    /// Identifier, possibly obfuscated. `None` for identifier-less resources.
    pub id: Option<String>,
    /// Attribute name to value, in field declaration order.
    pub attributes: Map<String, Value>,
    /// Relationship name to ordered entries, in declaration order.
    pub relationships: Vec<(String, Vec<Relationship>)>,
    /// Resource-level metadata.
    pub meta: Map<String, Value>,
    /// Resource-level links.
    pub links: Vec<Link>,
}

/// One relationship entry: an owned child resource plus optional metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub resource: ResourceObject,
    pub meta: Option<Map<String, Value>>,
}

impl Relationship {
    pub fn new(resource: ResourceObject) -> Self {
        Self {
            resource,
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// A named link (e.g. `self`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

impl Link {
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            href: href.into(),
        }
    }
}

impl ResourceObject {
    pub fn new(resource_type: impl Into<String>, id: Option<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id,
            ..Self::default()
        }
    }

    /// Entries under a relationship name, if any were produced.
    pub fn relationship(&self, name: &str) -> Option<&[Relationship]> {
        self.relationships
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, entries)| entries.as_slice())
    }

    /// Render the JSON:API wire form.
    ///
    /// Empty blocks are omitted entirely; a resource with no attributes and
    /// no relationships renders as `{"type": ..., "id": ...}`.
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        out.insert("type".into(), Value::String(self.resource_type.clone()));
        if let Some(id) = &self.id {
            out.insert("id".into(), Value::String(id.clone()));
        }
        if !self.attributes.is_empty() {
            out.insert("attributes".into(), Value::Object(self.attributes.clone()));
        }
        if !self.relationships.is_empty() {
            let mut rels = Map::new();
            for (name, entries) in &self.relationships {
                let list: Vec<Value> = entries
                    .iter()
                    .map(|entry| {
                        let mut wrapped = Map::new();
                        wrapped.insert("data".into(), entry.resource.to_json());
                        if let Some(meta) = &entry.meta {
                            wrapped.insert("meta".into(), Value::Object(meta.clone()));
                        }
                        Value::Object(wrapped)
                    })
                    .collect();
                rels.insert(name.clone(), Value::Array(list));
            }
            out.insert("relationships".into(), Value::Object(rels));
        }
        if !self.meta.is_empty() {
            out.insert("meta".into(), Value::Object(self.meta.clone()));
        }
        if !self.links.is_empty() {
            let mut links = Map::new();
            for link in &self.links {
                links.insert(link.rel.clone(), Value::String(link.href.clone()));
            }
            out.insert("links".into(), Value::Object(links));
        }
        Value::Object(out)
    }
}

impl Serialize for ResourceObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
