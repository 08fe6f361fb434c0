use std::borrow::Cow;
use std::collections::HashMap;

use petgraph::Directed;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::association_layout::Canvas;
use super::attributes::{Attribute, DataType, normalize_attributes};
use super::geometry::{Side, handle_sides};
use super::ids::{AttributeId, EntityId, HandleId, HandleRole, RelationshipId};
use super::relationship_index::{ParallelSlot, reindex};
use super::views::{
    Position, View, ViewPositions, Visibility, normalize_entity_positions, normalize_visibility,
};

/// Accent color given to entities created without one
pub const DEFAULT_ENTITY_COLOR: &str = "#6366f1";

// ============================================================================
// Errors
// ============================================================================

/// Rejected model edit
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("Unknown entity '{0}'")]
    UnknownEntity(EntityId),

    #[error("Unknown attribute '{attribute}' on entity '{entity}'")]
    UnknownAttribute {
        entity: EntityId,
        attribute: AttributeId,
    },

    #[error("Unknown relationship '{0}'")]
    UnknownRelationship(RelationshipId),

    #[error("Entity '{0}' already exists")]
    DuplicateEntity(EntityId),

    #[error("Relationship '{0}' already exists")]
    DuplicateRelationship(RelationshipId),

    #[error("Attributes '{0}' and '{1}' are already connected")]
    DuplicateFieldRelationship(AttributeId, AttributeId),

    #[error("Attribute index {index} is out of bounds ({len} attributes)")]
    AttributeIndexOutOfBounds { index: usize, len: usize },

    #[error("Invalid handle: {0}")]
    InvalidHandle(String),
}

// ============================================================================
// Entity
// ============================================================================

/// Graph node - a modeled class / table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub visibility: Visibility,
    pub color: String,
    /// Canvas position (top-left) in each view
    pub view_positions: ViewPositions,
}

impl Entity {
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            attributes: Vec::new(),
            visibility: Visibility::all_visible(),
            color: DEFAULT_ENTITY_COLOR.to_string(),
            view_positions: ViewPositions::default(),
        }
    }

    /// Same position in every view
    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.view_positions = ViewPositions::splat(Position::new(x, y));
        self
    }

    pub fn with_view_position(mut self, view: View, x: f64, y: f64) -> Self {
        self.view_positions.set(view, Position::new(x, y));
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn add_attribute(mut self, attribute: Attribute) -> Self {
        self.create_attribute(attribute);
        self
    }

    /// Append an attribute. An id already used on this entity is replaced by
    /// a fresh one; the id actually stored is returned.
    pub fn create_attribute(&mut self, mut attribute: Attribute) -> AttributeId {
        if attribute.id.as_str().is_empty() || self.attribute_by_id(&attribute.id).is_some() {
            attribute.id = AttributeId::generate();
        }
        let id = attribute.id.clone();
        self.attributes.push(attribute);
        id
    }

    pub fn get_attribute(&self, index: usize) -> Option<&Attribute> {
        self.attributes.get(index)
    }

    pub fn attribute_by_id(&self, id: &AttributeId) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.id == *id)
    }

    pub fn attribute_index(&self, id: &AttributeId) -> Option<usize> {
        self.attributes.iter().position(|a| a.id == *id)
    }

    /// Find an attribute by (case-sensitive) name
    pub fn find_attribute(&self, name: &str) -> Option<(usize, &Attribute)> {
        self.attributes
            .iter()
            .enumerate()
            .find(|(_, a)| a.name == name)
    }

    /// Replace the attribute at `index`, keeping its id
    pub fn update_attribute(&mut self, index: usize, attribute: Attribute) -> Result<(), ModelError> {
        let len = self.attributes.len();
        let slot = self
            .attributes
            .get_mut(index)
            .ok_or(ModelError::AttributeIndexOutOfBounds { index, len })?;
        let id = slot.id.clone();
        *slot = Attribute { id, ..attribute };
        Ok(())
    }

    pub fn delete_attribute(&mut self, index: usize) -> Result<Attribute, ModelError> {
        if index >= self.attributes.len() {
            return Err(ModelError::AttributeIndexOutOfBounds {
                index,
                len: self.attributes.len(),
            });
        }
        Ok(self.attributes.remove(index))
    }

    /// Move an attribute to a new index. Ids are unaffected by reordering.
    pub fn move_attribute(&mut self, from: usize, to: usize) -> Result<(), ModelError> {
        let len = self.attributes.len();
        if from >= len {
            return Err(ModelError::AttributeIndexOutOfBounds { index: from, len });
        }
        if to >= len {
            return Err(ModelError::AttributeIndexOutOfBounds { index: to, len });
        }
        let attribute = self.attributes.remove(from);
        self.attributes.insert(to, attribute);
        Ok(())
    }

    pub fn is_visible_in(&self, view: View) -> bool {
        self.visibility[view]
    }

    pub fn visible_attributes(&self, view: View) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(move |a| a.visibility[view])
    }
}

/// Entity from an arbitrary JSON value; every field falls back to a default.
/// `index` seeds the id when the value has none.
pub fn normalize_entity(raw: &Value, index: usize) -> Entity {
    let id = raw
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(EntityId::from)
        .unwrap_or_else(|| EntityId::new(format!("entity-{}", index)));
    let attributes = match raw.get("attributes") {
        Some(Value::Array(items)) => normalize_attributes(&id, items),
        _ => Vec::new(),
    };

    Entity {
        name: raw
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        attributes,
        visibility: normalize_visibility(raw.get("visibility").unwrap_or(&Value::Null)),
        color: raw
            .get("color")
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_ENTITY_COLOR)
            .to_string(),
        view_positions: normalize_entity_positions(raw),
        id,
    }
}

// ============================================================================
// Relationships
// ============================================================================

/// Kind of a binary association
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationshipKind {
    /// Plain association between two different entities
    Association,
    /// Association of an entity with itself
    Reflexive,
    Composition,
    /// Association carried by a third "association class" entity
    Associative {
        #[serde(rename = "associationClass")]
        association_class: EntityId,
    },
}

impl RelationshipKind {
    /// Whether relationships of this kind take part in parallel offsetting
    pub fn is_parallel_groupable(&self) -> bool {
        matches!(
            self,
            RelationshipKind::Association | RelationshipKind::Composition
        )
    }

    pub fn association_class(&self) -> Option<&EntityId> {
        match self {
            RelationshipKind::Associative { association_class } => Some(association_class),
            _ => None,
        }
    }
}

/// Graph edge - a binary association between entities
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: RelationshipId,
    pub source: EntityId,
    pub target: EntityId,
    #[serde(flatten)]
    pub kind: RelationshipKind,
    #[serde(default)]
    pub source_multiplicity: String,
    #[serde(default)]
    pub target_multiplicity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Derived by the relationship index, never serialized
    #[serde(skip)]
    pub parallel: Option<ParallelSlot>,
}

impl Relationship {
    pub fn new(
        id: RelationshipId,
        source: EntityId,
        target: EntityId,
        kind: RelationshipKind,
    ) -> Self {
        Self {
            id,
            source,
            target,
            kind,
            source_multiplicity: String::new(),
            target_multiplicity: String::new(),
            source_role: None,
            target_role: None,
            name: None,
            parallel: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_multiplicities(
        mut self,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.source_multiplicity = source.into();
        self.target_multiplicity = target.into();
        self
    }

    pub fn with_roles(mut self, source: Option<String>, target: Option<String>) -> Self {
        self.source_role = source;
        self.target_role = target;
        self
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    /// Whether the relationship touches `entity` as an endpoint or association class
    pub fn involves(&self, entity: &EntityId) -> bool {
        self.source == *entity
            || self.target == *entity
            || self.kind.association_class() == Some(entity)
    }
}

/// Attribute addressed through its owning entity
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttributeRef {
    pub entity: EntityId,
    pub attribute: AttributeId,
}

impl AttributeRef {
    pub fn new(entity: impl Into<EntityId>, attribute: impl Into<AttributeId>) -> Self {
        Self {
            entity: entity.into(),
            attribute: attribute.into(),
        }
    }
}

/// Attribute-to-attribute link (foreign key) shown in the physical view
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRelationship {
    pub id: RelationshipId,
    pub source: AttributeRef,
    pub target: AttributeRef,
    pub source_handle: HandleId,
    pub target_handle: HandleId,
}

impl FieldRelationship {
    /// Handles start out left-to-right until positions are known
    pub fn new(id: RelationshipId, source: AttributeRef, target: AttributeRef) -> Self {
        Self {
            source_handle: HandleId::new(Side::Right, source.attribute.clone(), HandleRole::Source),
            target_handle: HandleId::new(Side::Left, target.attribute.clone(), HandleRole::Target),
            id,
            source,
            target,
        }
    }

    /// Build from the handle strings a canvas reports for a new connection
    pub fn from_handles(
        id: RelationshipId,
        source_entity: EntityId,
        source_handle: &str,
        target_entity: EntityId,
        target_handle: &str,
    ) -> Result<Self, ModelError> {
        let source_handle: HandleId = source_handle.parse().map_err(ModelError::InvalidHandle)?;
        let target_handle: HandleId = target_handle.parse().map_err(ModelError::InvalidHandle)?;

        Ok(Self {
            id,
            source: AttributeRef::new(source_entity, source_handle.attribute.clone()),
            target: AttributeRef::new(target_entity, target_handle.attribute.clone()),
            source_handle,
            target_handle,
        })
    }

    /// Order-independent identity of the connected attribute pair
    pub fn key(&self) -> (AttributeRef, AttributeRef) {
        field_pair_key(&self.source, &self.target)
    }

    /// Recompute handle sides from the current node placement
    pub fn refresh_handles(&mut self, canvas: &impl Canvas) {
        if let (Some(source), Some(target)) = (
            canvas.node(&self.source.entity),
            canvas.node(&self.target.entity),
        ) {
            let (source_side, target_side) = handle_sides(&source, &target);
            self.source_handle.side = source_side;
            self.target_handle.side = target_side;
        }
    }

    pub fn touches_entity(&self, entity: &EntityId) -> bool {
        self.source.entity == *entity || self.target.entity == *entity
    }

    pub fn touches_attribute(&self, attribute: &AttributeRef) -> bool {
        self.source == *attribute || self.target == *attribute
    }
}

/// Sorted pair used to de-duplicate field-level relationships
pub fn field_pair_key(a: &AttributeRef, b: &AttributeRef) -> (AttributeRef, AttributeRef) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

// ============================================================================
// Schema Model
// ============================================================================

/// Graph type: nodes are entities, edges are associations
pub type SchemaGraph = StableGraph<Entity, Relationship, Directed>;

/// Single logical graph of entities, associations and field-level links.
///
/// Every edit keeps the invariants: relationship endpoints exist, deleting an
/// entity or attribute cascades, field links are unique per attribute pair,
/// and parallel-group slots are current.
#[derive(Clone, Debug, Default)]
pub struct SchemaModel {
    pub name: String,
    graph: SchemaGraph,
    nodes: HashMap<EntityId, NodeIndex>,
    field_relationships: Vec<FieldRelationship>,
}

impl SchemaModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn graph(&self) -> &SchemaGraph {
        &self.graph
    }

    // ------------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------------

    pub fn add_entity(&mut self, entity: Entity) -> Result<(), ModelError> {
        if self.nodes.contains_key(&entity.id) {
            return Err(ModelError::DuplicateEntity(entity.id));
        }
        let id = entity.id.clone();
        let node = self.graph.add_node(entity);
        self.nodes.insert(id, node);
        Ok(())
    }

    pub fn entity(&self, id: &EntityId) -> Option<&Entity> {
        self.nodes.get(id).and_then(|n| self.graph.node_weight(*n))
    }

    fn entity_mut(&mut self, id: &EntityId) -> Result<&mut Entity, ModelError> {
        self.nodes
            .get(id)
            .and_then(|n| self.graph.node_weight_mut(*n))
            .ok_or_else(|| ModelError::UnknownEntity(id.clone()))
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.graph.node_indices().map(|n| &self.graph[n])
    }

    pub fn entity_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn find_entity_by_name(&self, name: &str) -> Option<&Entity> {
        self.entities().find(|e| e.name == name)
    }

    pub fn rename_entity(&mut self, id: &EntityId, name: impl Into<String>) -> Result<(), ModelError> {
        self.entity_mut(id)?.name = name.into();
        Ok(())
    }

    /// Delete an entity with everything that depends on it: incident
    /// relationships, field links on its attributes, and associative links
    /// that name it as association class (those become plain associations).
    pub fn remove_entity(&mut self, id: &EntityId) -> Result<Entity, ModelError> {
        let node = self
            .nodes
            .remove(id)
            .ok_or_else(|| ModelError::UnknownEntity(id.clone()))?;
        let entity = self
            .graph
            .remove_node(node)
            .ok_or_else(|| ModelError::UnknownEntity(id.clone()))?;

        let edges: Vec<EdgeIndex> = self.graph.edge_indices().collect();
        for edge in edges {
            if let Some(relationship) = self.graph.edge_weight_mut(edge)
                && relationship.kind.association_class() == Some(id)
            {
                tracing::debug!(
                    "Association class '{}' removed, relationship '{}' downgraded",
                    id,
                    relationship.id
                );
                relationship.kind = RelationshipKind::Association;
            }
        }
        self.field_relationships.retain(|f| !f.touches_entity(id));
        self.reindex_relationships();

        Ok(entity)
    }

    // ------------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------------

    pub fn add_attribute(
        &mut self,
        entity: &EntityId,
        attribute: Attribute,
    ) -> Result<AttributeId, ModelError> {
        Ok(self.entity_mut(entity)?.create_attribute(attribute))
    }

    pub fn attribute(&self, attribute: &AttributeRef) -> Option<&Attribute> {
        self.entity(&attribute.entity)
            .and_then(|e| e.attribute_by_id(&attribute.attribute))
    }

    fn attribute_position(&mut self, attribute: &AttributeRef) -> Result<(&mut Entity, usize), ModelError> {
        let entity = self.entity_mut(&attribute.entity)?;
        let index = entity
            .attribute_index(&attribute.attribute)
            .ok_or_else(|| ModelError::UnknownAttribute {
                entity: attribute.entity.clone(),
                attribute: attribute.attribute.clone(),
            })?;
        Ok((entity, index))
    }

    /// Replace an attribute's fields, keeping its id
    pub fn update_attribute(
        &mut self,
        attribute: &AttributeRef,
        updated: Attribute,
    ) -> Result<(), ModelError> {
        let (entity, index) = self.attribute_position(attribute)?;
        entity.update_attribute(index, updated)
    }

    /// Change an attribute's type, resetting parameters and default value
    pub fn set_attribute_type(
        &mut self,
        attribute: &AttributeRef,
        data_type: DataType,
    ) -> Result<(), ModelError> {
        let (entity, index) = self.attribute_position(attribute)?;
        entity.attributes[index].set_type(data_type);
        Ok(())
    }

    /// Delete an attribute and every field link that uses it
    pub fn remove_attribute(&mut self, attribute: &AttributeRef) -> Result<Attribute, ModelError> {
        let (entity, index) = self.attribute_position(attribute)?;
        let removed = entity.delete_attribute(index)?;
        self.field_relationships
            .retain(|f| !f.touches_attribute(attribute));
        Ok(removed)
    }

    pub fn move_attribute(
        &mut self,
        entity: &EntityId,
        from: usize,
        to: usize,
    ) -> Result<(), ModelError> {
        self.entity_mut(entity)?.move_attribute(from, to)
    }

    // ------------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------------

    pub fn position(&self, entity: &EntityId, view: View) -> Option<Position> {
        self.entity(entity).map(|e| e.view_positions[view])
    }

    /// Move an entity in one view; non-finite coordinates are ignored
    pub fn set_position(
        &mut self,
        entity: &EntityId,
        view: View,
        position: Position,
    ) -> Result<(), ModelError> {
        let entity = self.entity_mut(entity)?;
        if position.is_finite() {
            entity.view_positions.set(view, position);
        }
        Ok(())
    }

    pub fn set_entity_visibility(
        &mut self,
        entity: &EntityId,
        view: View,
        visible: bool,
    ) -> Result<(), ModelError> {
        self.entity_mut(entity)?.visibility.set(view, visible);
        Ok(())
    }

    pub fn set_attribute_visibility(
        &mut self,
        attribute: &AttributeRef,
        view: View,
        visible: bool,
    ) -> Result<(), ModelError> {
        let (entity, index) = self.attribute_position(attribute)?;
        entity.attributes[index].visibility.set(view, visible);
        Ok(())
    }

    pub fn visible_entities(&self, view: View) -> impl Iterator<Item = &Entity> {
        self.entities().filter(move |e| e.is_visible_in(view))
    }

    pub fn visible_attributes(
        &self,
        entity: &EntityId,
        view: View,
    ) -> Result<Vec<&Attribute>, ModelError> {
        let entity = self
            .entity(entity)
            .ok_or_else(|| ModelError::UnknownEntity(entity.clone()))?;
        Ok(entity.visible_attributes(view).collect())
    }

    // ------------------------------------------------------------------------
    // Associations
    // ------------------------------------------------------------------------

    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.graph.edge_indices().map(|e| &self.graph[e])
    }

    pub fn relationship_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn relationship_edge(&self, id: &RelationshipId) -> Option<EdgeIndex> {
        self.graph.edge_indices().find(|e| self.graph[*e].id == *id)
    }

    pub fn relationship(&self, id: &RelationshipId) -> Option<&Relationship> {
        self.relationship_edge(id).map(|e| &self.graph[e])
    }

    /// Add an association. A relationship whose ends coincide is stored as
    /// reflexive, a "reflexive" one with distinct ends as a plain association.
    pub fn add_relationship(&mut self, mut relationship: Relationship) -> Result<(), ModelError> {
        if self.relationship_edge(&relationship.id).is_some() {
            return Err(ModelError::DuplicateRelationship(relationship.id));
        }
        let source = *self
            .nodes
            .get(&relationship.source)
            .ok_or_else(|| ModelError::UnknownEntity(relationship.source.clone()))?;
        let target = *self
            .nodes
            .get(&relationship.target)
            .ok_or_else(|| ModelError::UnknownEntity(relationship.target.clone()))?;
        if let Some(class) = relationship.kind.association_class()
            && !self.nodes.contains_key(class)
        {
            return Err(ModelError::UnknownEntity(class.clone()));
        }

        if relationship.is_self_loop() {
            relationship.kind = RelationshipKind::Reflexive;
        } else if relationship.kind == RelationshipKind::Reflexive {
            relationship.kind = RelationshipKind::Association;
        }

        self.graph.add_edge(source, target, relationship);
        self.reindex_relationships();
        Ok(())
    }

    pub fn remove_relationship(&mut self, id: &RelationshipId) -> Result<Relationship, ModelError> {
        let edge = self
            .relationship_edge(id)
            .ok_or_else(|| ModelError::UnknownRelationship(id.clone()))?;
        let removed = self
            .graph
            .remove_edge(edge)
            .ok_or_else(|| ModelError::UnknownRelationship(id.clone()))?;
        self.reindex_relationships();
        Ok(removed)
    }

    /// Re-run the relationship index and store changed slots on the edges
    fn reindex_relationships(&mut self) {
        let edges: Vec<EdgeIndex> = self.graph.edge_indices().collect();
        let current: Vec<Relationship> = edges.iter().map(|e| self.graph[*e].clone()).collect();

        if let Cow::Owned(updated) = reindex(&current) {
            for (edge, relationship) in edges.into_iter().zip(updated) {
                self.graph[edge].parallel = relationship.parallel;
            }
        }
    }

    // ------------------------------------------------------------------------
    // Field-level relationships
    // ------------------------------------------------------------------------

    pub fn field_relationships(&self) -> &[FieldRelationship] {
        &self.field_relationships
    }

    /// Add a field link. Both attributes must exist and the unordered pair
    /// must not be linked yet.
    pub fn add_field_relationship(
        &mut self,
        relationship: FieldRelationship,
    ) -> Result<(), ModelError> {
        for end in [&relationship.source, &relationship.target] {
            if self.attribute(end).is_none() {
                return Err(match self.entity(&end.entity) {
                    None => ModelError::UnknownEntity(end.entity.clone()),
                    Some(_) => ModelError::UnknownAttribute {
                        entity: end.entity.clone(),
                        attribute: end.attribute.clone(),
                    },
                });
            }
        }
        if self
            .field_relationships
            .iter()
            .any(|f| f.id == relationship.id)
        {
            return Err(ModelError::DuplicateRelationship(relationship.id));
        }
        let key = relationship.key();
        if self.field_relationships.iter().any(|f| f.key() == key) {
            return Err(ModelError::DuplicateFieldRelationship(
                key.0.attribute,
                key.1.attribute,
            ));
        }

        self.field_relationships.push(relationship);
        Ok(())
    }

    pub fn remove_field_relationship(
        &mut self,
        id: &RelationshipId,
    ) -> Result<FieldRelationship, ModelError> {
        let index = self
            .field_relationships
            .iter()
            .position(|f| f.id == *id)
            .ok_or_else(|| ModelError::UnknownRelationship(id.clone()))?;
        Ok(self.field_relationships.remove(index))
    }

    /// Re-derive handle sides of every field link from current placement
    pub fn refresh_field_handles(&mut self, canvas: &impl Canvas) {
        for relationship in &mut self.field_relationships {
            relationship.refresh_handles(canvas);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_entity_defaults() {
        let entity = normalize_entity(&json!({"attributes": [null, "code"]}), 4);
        assert_eq!(entity.id.as_str(), "entity-4");
        assert_eq!(entity.name, "");
        assert_eq!(entity.color, DEFAULT_ENTITY_COLOR);
        assert_eq!(entity.visibility, Visibility::all_visible());
        assert_eq!(entity.attributes.len(), 2);
        assert_eq!(entity.attributes[1].id.as_str(), "entity-4-attr-1");
        assert_eq!(entity.attributes[1].name, "code");
    }

    #[test]
    fn test_relationship_kind_serialization() {
        let relationship = Relationship::new(
            RelationshipId::new("r1"),
            EntityId::new("a"),
            EntityId::new("b"),
            RelationshipKind::Associative {
                association_class: EntityId::new("c"),
            },
        )
        .with_multiplicities("1", "0..*");

        let value = serde_json::to_value(&relationship).unwrap();
        assert_eq!(value["kind"], "associative");
        assert_eq!(value["associationClass"], "c");
        assert_eq!(value["sourceMultiplicity"], "1");
        assert!(value.get("parallel").is_none());

        let back: Relationship = serde_json::from_value(value).unwrap();
        assert_eq!(back, relationship);
    }

    #[test]
    fn test_field_relationship_from_handles() {
        let relationship = FieldRelationship::from_handles(
            RelationshipId::new("f1"),
            EntityId::new("orders"),
            "right-orders-attr-1-source",
            EntityId::new("users"),
            "left-users-attr-0-target",
        )
        .unwrap();
        assert_eq!(relationship.source.attribute.as_str(), "orders-attr-1");
        assert_eq!(relationship.target.attribute.as_str(), "users-attr-0");

        let err = FieldRelationship::from_handles(
            RelationshipId::new("f2"),
            EntityId::new("orders"),
            "diagonal-x-source",
            EntityId::new("users"),
            "left-y-target",
        );
        assert!(matches!(err, Err(ModelError::InvalidHandle(_))));
    }

    #[test]
    fn test_field_pair_key_is_order_independent() {
        let a = AttributeRef::new("t1", "t1-attr-0");
        let b = AttributeRef::new("t2", "t2-attr-3");
        assert_eq!(field_pair_key(&a, &b), field_pair_key(&b, &a));
    }
}
