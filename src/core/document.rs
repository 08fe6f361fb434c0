//! Serialized model document
//!
//! `{version, modelName, entities, relationships, fieldRelationships}` in
//! camelCase JSON. Writing is plain serde; reading is lenient: entities go
//! through the normalizers and relationships that fail to decode are dropped,
//! so partially written documents still load.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::schema::{Entity, FieldRelationship, Relationship, SchemaModel, normalize_entity};

/// Current document format version
pub const DOCUMENT_VERSION: u64 = 1;

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Invalid document JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported document version {found} (expected {DOCUMENT_VERSION})")]
    UnsupportedVersion { found: u64 },
}

/// Persisted form of a `SchemaModel`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDocument {
    pub version: u64,
    pub model_name: String,
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub field_relationships: Vec<FieldRelationship>,
}

impl ModelDocument {
    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Lenient load. A missing version is read as the current one.
    pub fn from_value(value: &Value) -> Result<Self, DocumentError> {
        if !value.is_object() {
            return Err(DocumentError::Json(serde::de::Error::custom(
                "model document must be a JSON object",
            )));
        }

        let version = value
            .get("version")
            .and_then(Value::as_u64)
            .unwrap_or(DOCUMENT_VERSION);
        if version != DOCUMENT_VERSION {
            return Err(DocumentError::UnsupportedVersion { found: version });
        }

        let entities = array(value, "entities")
            .iter()
            .enumerate()
            .map(|(index, raw)| normalize_entity(raw, index))
            .collect();

        Ok(Self {
            version,
            model_name: value
                .get("modelName")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            entities,
            relationships: decode_each(array(value, "relationships"), "relationship"),
            field_relationships: decode_each(
                array(value, "fieldRelationships"),
                "field relationship",
            ),
        })
    }
}

fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn decode_each<T: serde::de::DeserializeOwned>(items: &[Value], what: &str) -> Vec<T> {
    items
        .iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::debug!("Dropping unreadable {}: {}", what, e);
                None
            }
        })
        .collect()
}

impl SchemaModel {
    pub fn to_document(&self) -> ModelDocument {
        ModelDocument {
            version: DOCUMENT_VERSION,
            model_name: self.name.clone(),
            entities: self.entities().cloned().collect(),
            relationships: self
                .relationships()
                .map(|r| Relationship {
                    parallel: None,
                    ..r.clone()
                })
                .collect(),
            field_relationships: self.field_relationships().to_vec(),
        }
    }

    /// Rebuild a model. Items that break referential integrity are skipped.
    pub fn from_document(document: ModelDocument) -> Self {
        let mut model = SchemaModel::new(document.model_name);

        for entity in document.entities {
            if let Err(e) = model.add_entity(entity) {
                tracing::debug!("Skipping entity: {}", e);
            }
        }
        for relationship in document.relationships {
            if let Err(e) = model.add_relationship(relationship) {
                tracing::debug!("Skipping relationship: {}", e);
            }
        }
        for relationship in document.field_relationships {
            if let Err(e) = model.add_field_relationship(relationship) {
                tracing::debug!("Skipping field relationship: {}", e);
            }
        }

        model
    }
}
