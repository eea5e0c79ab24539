use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::QueryError;
use crate::query::SortSpec;
use crate::types::{DatabaseName, DocumentId, RevisionId};

/// Type-discriminator pair for entity types sharing a database with other
/// types ("viewed" entities).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDiscriminator {
    pub type_field: String,
    pub type_value: String,
}

impl ViewDiscriminator {
    pub fn new(type_field: impl Into<String>, type_value: impl Into<String>) -> Self {
        Self { type_field: type_field.into(), type_value: type_value.into() }
    }
}

/// Per-entity-type lookup table: target database, optional discriminator,
/// and the explicit id/revision field accessors.
///
/// Accessors are fixed at construction; nothing here scans documents for
/// the "right" field at query time.
#[derive(Debug, Clone)]
pub struct EntityMeta {
    pub database: DatabaseName,
    pub discriminator: Option<ViewDiscriminator>,
    pub id_field: String,
    pub rev_field: String,
    pub default_sort: Vec<SortSpec>,
}

impl EntityMeta {
    #[must_use]
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            discriminator: None,
            id_field: "_id".to_string(),
            rev_field: "_rev".to_string(),
            default_sort: Vec::new(),
        }
    }

    #[must_use]
    pub fn viewed(mut self, discriminator: ViewDiscriminator) -> Self {
        self.discriminator = Some(discriminator);
        self
    }

    #[must_use]
    pub fn with_default_sort(mut self, sort: Vec<SortSpec>) -> Self {
        self.default_sort = sort;
        self
    }

    #[must_use]
    pub fn doc_id(&self, doc: &Value) -> Option<DocumentId> {
        doc.get(&self.id_field).and_then(Value::as_str).map(str::to_string)
    }

    #[must_use]
    pub fn doc_rev(&self, doc: &Value) -> Option<RevisionId> {
        doc.get(&self.rev_field).and_then(Value::as_str).map(str::to_string)
    }

    pub fn set_doc_id(&self, doc: &mut Value, id: &str) {
        if let Some(obj) = doc.as_object_mut() {
            obj.insert(self.id_field.clone(), Value::String(id.to_string()));
        }
    }

    pub fn set_doc_rev(&self, doc: &mut Value, rev: &str) {
        if let Some(obj) = doc.as_object_mut() {
            obj.insert(self.rev_field.clone(), Value::String(rev.to_string()));
        }
    }
}

/// Entity-name to metadata registry, shared read-mostly across callers.
#[derive(Debug, Default, Clone)]
pub struct MetaRegistry {
    entries: Arc<RwLock<HashMap<String, EntityMeta>>>,
}

impl MetaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, meta: EntityMeta) {
        self.entries.write().insert(name.into(), meta);
    }

    /// # Errors
    /// Returns `QueryError::NoSuchEntity` when the name was never registered.
    pub fn get(&self, name: &str) -> Result<EntityMeta, QueryError> {
        self.entries
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| QueryError::NoSuchEntity(name.to_string()))
    }
}
