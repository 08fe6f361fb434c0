//! Legacy modeling-tool importer
//!
//! Reads the JSON export of the older desktop tool:
//!
//! ```json
//! {"tables": [{
//!     "name": "orders", "color": "#0ea5e9",
//!     "x0": 10, "y0": 20, "x1": 10, "y1": 20, "x2": 300, "y2": 40,
//!     "conceptual": true, "logical": true, "physical": true,
//!     "fields": [{"name": "id", "datatype": "int", "nullable": false,
//!                 "unique": true, "autoincrement": true, "hideIn": ["conceptual"]}],
//!     "links": [{"from": "customer_id", "to": "customers.id"},
//!               {"to": "customers", "type": "composition", "name": "places",
//!                "class": "order_lines"}]
//! }]}
//! ```
//!
//! `x0/y0` are conceptual coordinates, `x1/y1` logical and `x2/y2` physical.
//! Links belong to the table they are listed under; `from` names a field of
//! that table or a dotted `table.field`, `to` is `table` or `table.field`.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use super::datatype::{TypeRules, map_datatype};
use super::{ImportError, ImportResult, name_key};
use crate::core::{
    Attribute, AttributeId, AttributeRef, DataType, Entity, EntityId, FieldRelationship, Position,
    Relationship, RelationshipId, RelationshipKind, View, ViewPositions, Visibility,
    field_pair_key, reindex,
};

/// Factor applied to every imported coordinate
pub const LEGACY_SCALE: f64 = 1.5;

/// Smallest coordinate an imported entity may have in any view
pub const CANVAS_PADDING: f64 = 40.0;

/// Import a legacy JSON export
pub fn import_legacy(json: &str) -> Result<ImportResult, ImportError> {
    let document: Value = serde_json::from_str(json)?;
    let tables = document
        .get("tables")
        .and_then(Value::as_array)
        .ok_or_else(|| ImportError::NotASchemaDocument("missing 'tables' array".to_string()))?;

    let mut import = LegacyImport::default();
    let mut links: Vec<(usize, &Map<String, Value>)> = Vec::new();

    for (index, raw) in tables.iter().enumerate() {
        let Some(table) = raw.as_object() else {
            tracing::debug!("Table #{} is not an object, skipping", index);
            continue;
        };
        let Some(entity_index) = import.table(table) else {
            continue;
        };
        if let Some(raw_links) = table.get("links").and_then(Value::as_array) {
            links.extend(
                raw_links
                    .iter()
                    .filter_map(Value::as_object)
                    .map(|link| (entity_index, link)),
            );
        }
    }

    for (owner, link) in links {
        import.link(owner, link);
    }

    let mut result = import.result;
    fit_to_canvas(&mut result.entities);
    result.relationships = reindex(&result.relationships).into_owned();
    result.log_summary("legacy document");
    Ok(result)
}

#[derive(Default)]
struct LegacyImport {
    result: ImportResult,
    tables: HashMap<String, usize>,
    association_keys: HashSet<(String, EntityId, EntityId, String)>,
    field_keys: HashSet<(AttributeRef, AttributeRef)>,
}

impl LegacyImport {
    fn table(&mut self, table: &Map<String, Value>) -> Option<usize> {
        let name = text(table, "name");
        if name.trim().is_empty() {
            tracing::debug!("Table without a name, skipping");
            return None;
        }
        let key = name_key(&name);
        if self.tables.contains_key(&key) {
            tracing::debug!("Table '{}' already defined, skipping duplicate", name);
            return None;
        }

        let index = self.result.entities.len();
        let id = EntityId::new(format!("entity-{}", index));
        let coordinate = |axis: &str, view: usize| number(table.get(&format!("{}{}", axis, view)));
        let mut entity = Entity::new(id.clone(), name.trim());
        entity.view_positions = ViewPositions::new(
            Position::new(coordinate("x", 0), coordinate("y", 0)),
            Position::new(coordinate("x", 1), coordinate("y", 1)),
            Position::new(coordinate("x", 2), coordinate("y", 2)),
        );
        entity.visibility = Visibility::new(
            flag(table, "conceptual", true),
            flag(table, "logical", true),
            flag(table, "physical", true),
        );
        if let Some(color) = table.get("color").and_then(Value::as_str)
            && !color.is_empty()
        {
            entity.color = color.to_string();
        }

        if let Some(fields) = table.get("fields").and_then(Value::as_array) {
            for (position, field) in fields.iter().enumerate() {
                let attribute_id = AttributeId::positional(&id, position);
                let attribute = match field.as_object() {
                    Some(field) => self.field(attribute_id, field),
                    None => Attribute::blank(attribute_id),
                };
                entity.attributes.push(attribute);
            }
        }

        self.tables.insert(key, index);
        self.result.entities.push(entity);
        Some(index)
    }

    fn field(&mut self, id: AttributeId, field: &Map<String, Value>) -> Attribute {
        let raw_type = text(field, "datatype");
        let (data_type, params) = match map_datatype(&raw_type, TypeRules::Legacy) {
            Some(mapped) => mapped,
            None => {
                if !raw_type.trim().is_empty() {
                    tracing::debug!("Unmapped legacy datatype '{}'", raw_type);
                    self.result.warnings.unmatched_attribute_types += 1;
                }
                (DataType::Undefined, Default::default())
            }
        };

        let mut attribute = Attribute {
            logical_name: text(field, "logicalName"),
            default_value: text(field, "default"),
            nullable: flag(field, "nullable", false),
            unique: flag(field, "unique", false),
            auto_increment: flag(field, "autoincrement", false),
            ..Attribute::new(id, text(field, "name"), data_type).with_params(params)
        };
        if let Some(hidden) = field.get("hideIn").and_then(Value::as_array) {
            for view in hidden
                .iter()
                .filter_map(Value::as_str)
                .filter_map(|v| v.parse::<View>().ok())
            {
                attribute.visibility.set(view, false);
            }
        }
        attribute
    }

    fn link(&mut self, owner: usize, link: &Map<String, Value>) {
        let owner_name = self.result.entities[owner].name.clone();
        let from = text(link, "from");
        let from = if from.contains('.') {
            from
        } else if from.trim().is_empty() {
            owner_name
        } else {
            format!("{}.{}", owner_name, from)
        };
        let to = text(link, "to");

        let (Some(source), Some(target)) = (self.endpoint(&from), self.endpoint(&to)) else {
            tracing::debug!("Link {} -> {} has an unknown endpoint, skipping", from, to);
            return;
        };

        let kind = text(link, "type").to_ascii_lowercase();
        let is_field_link = match kind.as_str() {
            "field" => true,
            "" => source.attribute.is_some() && target.attribute.is_some(),
            _ => false,
        };

        if is_field_link {
            let (Some(source_attr), Some(target_attr)) = (source.attribute, target.attribute) else {
                tracing::debug!("Field link {} -> {} needs two fields, skipping", from, to);
                return;
            };
            let source = AttributeRef::new(source.entity, source_attr);
            let target = AttributeRef::new(target.entity, target_attr);
            if !self.field_keys.insert(field_pair_key(&source, &target)) {
                tracing::debug!("Field link {} -> {} already imported, skipping", from, to);
                return;
            }
            let id = RelationshipId::new(format!(
                "field-rel-{}",
                self.result.field_relationships.len()
            ));
            self.result
                .field_relationships
                .push(FieldRelationship::new(id, source, target));
            return;
        }

        let class_name = text(link, "class");
        let class = if class_name.trim().is_empty() {
            None
        } else {
            match self.tables.get(&name_key(&class_name)) {
                Some(index) => Some(self.result.entities[*index].id.clone()),
                None => {
                    tracing::debug!("Association class '{}' is unknown, skipping", class_name);
                    return;
                }
            }
        };

        let name = text(link, "name");
        let (low, high) = if source.entity <= target.entity {
            (source.entity.clone(), target.entity.clone())
        } else {
            (target.entity.clone(), source.entity.clone())
        };
        if !self
            .association_keys
            .insert((name.clone(), low, high, name_key(&class_name)))
        {
            tracing::debug!("Association {} -> {} already imported, skipping", from, to);
            return;
        }

        let kind = match (class, kind.as_str()) {
            (Some(association_class), _) => RelationshipKind::Associative { association_class },
            (None, _) if source.entity == target.entity => RelationshipKind::Reflexive,
            (None, "composition") => RelationshipKind::Composition,
            (None, _) => RelationshipKind::Association,
        };
        let id = RelationshipId::new(format!("rel-{}", self.result.relationships.len()));
        let mut relationship = Relationship::new(id, source.entity, target.entity, kind)
            .with_multiplicities(text(link, "fromMultiplicity"), text(link, "toMultiplicity"))
            .with_roles(optional_text(link, "fromRole"), optional_text(link, "toRole"));
        if !name.trim().is_empty() {
            relationship = relationship.with_name(name);
        }
        self.result.relationships.push(relationship);
    }

    /// Resolve `table` or `table.field`
    fn endpoint(&self, reference: &str) -> Option<Endpoint> {
        let (table, field) = match reference.split_once('.') {
            Some((table, field)) => (table, Some(field)),
            None => (reference, None),
        };
        let entity = &self.result.entities[*self.tables.get(&name_key(table))?];
        let attribute = match field {
            Some(field) => {
                let field = name_key(field);
                Some(
                    entity
                        .attributes
                        .iter()
                        .find(|a| name_key(&a.name) == field)?
                        .id
                        .clone(),
                )
            }
            None => None,
        };
        Some(Endpoint {
            entity: entity.id.clone(),
            attribute,
        })
    }
}

struct Endpoint {
    entity: EntityId,
    attribute: Option<AttributeId>,
}

/// Scale every coordinate, then shift each view so nothing sits closer to the
/// canvas origin than the padding.
fn fit_to_canvas(entities: &mut [Entity]) {
    for view in View::ALL {
        for entity in entities.iter_mut() {
            let position = entity.view_positions.get_mut(view);
            position.x *= LEGACY_SCALE;
            position.y *= LEGACY_SCALE;
        }

        let min = |axis: fn(&Position) -> f64| {
            entities
                .iter()
                .map(|e| axis(e.view_positions.get(view)))
                .fold(f64::INFINITY, f64::min)
        };
        let shift_x = (CANVAS_PADDING - min(|p| p.x)).max(0.0);
        let shift_y = (CANVAS_PADDING - min(|p| p.y)).max(0.0);
        if shift_x == 0.0 && shift_y == 0.0 {
            continue;
        }

        for entity in entities.iter_mut() {
            let position = entity.view_positions.get_mut(view);
            position.x += shift_x;
            position.y += shift_y;
        }
    }
}

fn text(map: &Map<String, Value>, key: &str) -> String {
    map.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn optional_text(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn flag(map: &Map<String, Value>, key: &str, default: bool) -> bool {
    map.get(key).and_then(Value::as_bool).unwrap_or(default)
}

/// Finite number from a JSON number or numeric string, 0 otherwise
fn number(value: Option<&Value>) -> f64 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    n.filter(|n: &f64| n.is_finite()).unwrap_or(0.0)
}
