//! Schema importers
//!
//! Two independent pipelines, SQL DDL and the legacy modeling-tool JSON
//! export, with a shared output: entities, associations, field-level
//! relationships and soft warnings. An importer either returns a complete
//! result or an error; there is no partial state.

mod datatype;
mod legacy;
mod sql;

pub use datatype::*;
pub use legacy::*;
pub use sql::*;

use serde::{Deserialize, Serialize};
use sqlparser::parser::ParserError;

use crate::core::{Entity, FieldRelationship, ModelDocument, Relationship, SchemaModel};

/// Top-level import failure. Field-level oddities never end up here; they are
/// normalized in place.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("SQL syntax error: {0}")]
    Syntax(#[from] ParserError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not a recognizable schema document: {0}")]
    NotASchemaDocument(String),

    #[error("No CREATE TABLE statements found")]
    NoTables,
}

/// Soft diagnostics surfaced to the user after an import
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportWarnings {
    /// Attributes whose source type could not be mapped and became `undefined`
    pub unmatched_attribute_types: usize,
}

impl ImportWarnings {
    pub fn is_empty(&self) -> bool {
        self.unmatched_attribute_types == 0
    }
}

/// Output shared by both importers
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportResult {
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
    pub field_relationships: Vec<FieldRelationship>,
    pub warnings: ImportWarnings,
}

impl ImportResult {
    /// Build a model from the imported snapshot. Importers only emit
    /// consistent data, so anything the model rejects is logged and dropped.
    pub fn into_model(self, name: impl Into<String>) -> SchemaModel {
        let mut model = SchemaModel::new(name);

        for entity in self.entities {
            if let Err(e) = model.add_entity(entity) {
                tracing::debug!("Skipping imported entity: {}", e);
            }
        }
        for relationship in self.relationships {
            if let Err(e) = model.add_relationship(relationship) {
                tracing::debug!("Skipping imported relationship: {}", e);
            }
        }
        for relationship in self.field_relationships {
            if let Err(e) = model.add_field_relationship(relationship) {
                tracing::debug!("Skipping imported field relationship: {}", e);
            }
        }

        model
    }

    pub fn into_document(self, name: impl Into<String>) -> ModelDocument {
        self.into_model(name).to_document()
    }

    fn log_summary(&self, source: &str) {
        tracing::info!(
            "Imported {}: {} entities, {} relationships, {} field relationships, {} unmatched types",
            source,
            self.entities.len(),
            self.relationships.len(),
            self.field_relationships.len(),
            self.warnings.unmatched_attribute_types
        );
    }
}

/// Case-insensitive lookup key for table and column names
fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}
