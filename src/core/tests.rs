#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::core::import::{SqlDialect, import_sql};
    use crate::core::{
        Attribute, AttributeRef, DataType, Entity, EntityId, FieldRelationship, LayoutConfig,
        ModelError, ParallelSlot, Position, Relationship, RelationshipId, RelationshipKind,
        SchemaModel, Side, TypeParams, View, ViewCanvas, layout_relationship,
    };

    fn users() -> Entity {
        Entity::new("users", "users")
            .add_attribute(Attribute::new("u-id", "id", DataType::Integer).primary_key())
            .add_attribute(Attribute::new("u-email", "email", DataType::Varchar))
    }

    fn posts() -> Entity {
        Entity::new("posts", "posts")
            .with_position(400.0, 0.0)
            .add_attribute(Attribute::new("p-id", "id", DataType::Integer).primary_key())
            .add_attribute(Attribute::new("p-user", "user_id", DataType::Integer))
    }

    fn association(id: &str, source: &str, target: &str) -> Relationship {
        Relationship::new(
            RelationshipId::new(id),
            EntityId::new(source),
            EntityId::new(target),
            RelationshipKind::Association,
        )
    }

    fn fk(id: &str) -> FieldRelationship {
        FieldRelationship::new(
            RelationshipId::new(id),
            AttributeRef::new("posts", "p-user"),
            AttributeRef::new("users", "u-id"),
        )
    }

    fn model() -> SchemaModel {
        let mut model = SchemaModel::new("blog");
        model.add_entity(users()).unwrap();
        model.add_entity(posts()).unwrap();
        model
    }

    // ========================================================================
    // Attribute CRUD
    // ========================================================================

    #[test]
    fn test_create_attribute() {
        let mut entity = Entity::new("users", "users");

        let id = entity.create_attribute(Attribute::new("id", "id", DataType::Integer).primary_key());

        assert_eq!(id.as_str(), "id");
        assert_eq!(entity.attributes.len(), 1);
        assert_eq!(entity.attributes[0].name, "id");
        assert!(entity.attributes[0].unique);
        assert!(!entity.attributes[0].nullable);
    }

    #[test]
    fn test_create_attribute_replaces_taken_id() {
        let mut entity = users();

        let id = entity.create_attribute(Attribute::new("u-id", "id_copy", DataType::Integer));

        assert_ne!(id.as_str(), "u-id");
        assert_eq!(entity.attributes.len(), 3);
        assert_eq!(entity.attribute_by_id(&id).unwrap().name, "id_copy");
    }

    #[test]
    fn test_read_attribute() {
        let entity = users();

        // Read by index
        let attribute = entity.get_attribute(0);
        assert!(attribute.is_some());
        assert_eq!(attribute.unwrap().name, "id");

        // Read out of bounds
        assert!(entity.get_attribute(10).is_none());
    }

    #[test]
    fn test_find_attribute() {
        let entity = users();

        let result = entity.find_attribute("email");
        assert!(result.is_some());
        let (index, attribute) = result.unwrap();
        assert_eq!(index, 1);
        assert_eq!(attribute.id.as_str(), "u-email");

        assert!(entity.find_attribute("age").is_none());
    }

    #[test]
    fn test_update_attribute_keeps_id() {
        let mut entity = users();

        let updated = Attribute::new("ignored", "email", DataType::Varchar)
            .with_params(TypeParams::length("320"))
            .not_null()
            .unique();
        assert!(entity.update_attribute(1, updated).is_ok());

        let attribute = entity.get_attribute(1).unwrap();
        assert_eq!(attribute.id.as_str(), "u-email");
        assert_eq!(attribute.formatted_type(), "varchar(320)");
        assert!(!attribute.nullable);

        // Update non-existing attribute
        let result = entity.update_attribute(10, Attribute::new("x", "x", DataType::Text));
        assert_eq!(
            result,
            Err(ModelError::AttributeIndexOutOfBounds { index: 10, len: 2 })
        );
    }

    #[test]
    fn test_delete_attribute() {
        let mut entity = users();

        let deleted = entity.delete_attribute(0).unwrap();
        assert_eq!(deleted.name, "id");
        assert_eq!(entity.attributes.len(), 1);
        assert_eq!(entity.attributes[0].name, "email");

        assert!(entity.delete_attribute(10).is_err());
    }

    #[test]
    fn test_move_attribute() {
        let mut entity = users()
            .add_attribute(Attribute::new("u-name", "username", DataType::Varchar))
            .add_attribute(Attribute::new("u-created", "created_at", DataType::Timestamp));

        assert!(entity.move_attribute(3, 1).is_ok());
        let names: Vec<&str> = entity.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["id", "created_at", "email", "username"]);
        assert_eq!(entity.attributes[1].id.as_str(), "u-created");

        assert!(entity.move_attribute(10, 1).is_err());
        assert!(entity.move_attribute(1, 10).is_err());
    }

    #[test]
    fn test_set_attribute_type_resets_params() {
        let mut model = model();
        let email = AttributeRef::new("users", "u-email");
        model
            .update_attribute(
                &email,
                Attribute::new("u-email", "email", DataType::Varchar)
                    .with_params(TypeParams::length("120"))
                    .with_default("''"),
            )
            .unwrap();

        model.set_attribute_type(&email, DataType::Text).unwrap();

        let attribute = model.attribute(&email).unwrap();
        assert_eq!(attribute.data_type, DataType::Text);
        assert!(attribute.type_params.is_empty());
        assert!(attribute.default_value.is_empty());
    }

    // ========================================================================
    // Entities and cascades
    // ========================================================================

    #[test]
    fn test_add_entity_duplicate_id() {
        let mut model = model();
        assert_eq!(
            model.add_entity(Entity::new("users", "other")),
            Err(ModelError::DuplicateEntity(EntityId::new("users")))
        );
        assert_eq!(model.entity_count(), 2);
    }

    #[test]
    fn test_find_and_rename_entity() {
        let mut model = model();
        model.rename_entity(&EntityId::new("posts"), "articles").unwrap();

        assert!(model.find_entity_by_name("posts").is_none());
        assert_eq!(
            model.find_entity_by_name("articles").unwrap().id.as_str(),
            "posts"
        );
        assert!(model.rename_entity(&EntityId::new("nope"), "x").is_err());
    }

    #[test]
    fn test_remove_entity_cascades() {
        let mut model = model();
        model.add_entity(Entity::new("tags", "tags")).unwrap();
        model.add_relationship(association("writes", "users", "posts")).unwrap();
        model
            .add_relationship(Relationship::new(
                RelationshipId::new("tagged"),
                EntityId::new("posts"),
                EntityId::new("tags"),
                RelationshipKind::Associative {
                    association_class: EntityId::new("users"),
                },
            ))
            .unwrap();
        model.add_field_relationship(fk("fk")).unwrap();

        let removed = model.remove_entity(&EntityId::new("users")).unwrap();
        assert_eq!(removed.name, "users");

        // Incident association gone, associative link downgraded
        assert_eq!(model.relationship_count(), 1);
        let tagged = model.relationship(&RelationshipId::new("tagged")).unwrap();
        assert_eq!(tagged.kind, RelationshipKind::Association);
        assert_eq!(tagged.parallel, Some(ParallelSlot::SINGLE));
        assert!(model.field_relationships().is_empty());

        assert!(model.remove_entity(&EntityId::new("users")).is_err());
    }

    #[test]
    fn test_remove_attribute_cascades_to_field_links() {
        let mut model = model();
        model.add_field_relationship(fk("fk")).unwrap();

        let removed = model
            .remove_attribute(&AttributeRef::new("posts", "p-user"))
            .unwrap();
        assert_eq!(removed.name, "user_id");
        assert!(model.field_relationships().is_empty());

        assert!(matches!(
            model.remove_attribute(&AttributeRef::new("posts", "p-user")),
            Err(ModelError::UnknownAttribute { .. })
        ));
    }

    // ========================================================================
    // Relationships
    // ========================================================================

    #[test]
    fn test_add_relationship_requires_endpoints() {
        let mut model = model();

        assert_eq!(
            model.add_relationship(association("r", "users", "ghosts")),
            Err(ModelError::UnknownEntity(EntityId::new("ghosts")))
        );
        let associative = Relationship::new(
            RelationshipId::new("r"),
            EntityId::new("users"),
            EntityId::new("posts"),
            RelationshipKind::Associative {
                association_class: EntityId::new("ghosts"),
            },
        );
        assert!(model.add_relationship(associative).is_err());
        assert_eq!(model.relationship_count(), 0);
    }

    #[test]
    fn test_self_relationship_is_reflexive() {
        let mut model = model();
        model.add_relationship(association("manager", "users", "users")).unwrap();

        let mut mislabeled = association("odd", "users", "posts");
        mislabeled.kind = RelationshipKind::Reflexive;
        model.add_relationship(mislabeled).unwrap();

        let manager = model.relationship(&RelationshipId::new("manager")).unwrap();
        assert_eq!(manager.kind, RelationshipKind::Reflexive);
        assert_eq!(manager.parallel, None);
        let odd = model.relationship(&RelationshipId::new("odd")).unwrap();
        assert_eq!(odd.kind, RelationshipKind::Association);
    }

    #[test]
    fn test_parallel_slots_follow_mutations() {
        let mut model = model();
        model.add_relationship(association("b", "users", "posts")).unwrap();
        model.add_relationship(association("a", "posts", "users")).unwrap();
        model.add_relationship(association("c", "users", "posts")).unwrap();

        let slot = |model: &SchemaModel, id: &str| {
            model
                .relationship(&RelationshipId::new(id))
                .and_then(|r| r.parallel)
                .unwrap()
        };
        assert_eq!(slot(&model, "a"), ParallelSlot { index: 0, count: 3 });
        assert_eq!(slot(&model, "c"), ParallelSlot { index: 2, count: 3 });

        model.remove_relationship(&RelationshipId::new("a")).unwrap();
        assert_eq!(slot(&model, "b"), ParallelSlot { index: 0, count: 2 });
        assert_eq!(slot(&model, "c"), ParallelSlot { index: 1, count: 2 });

        assert_eq!(
            model.add_relationship(association("b", "users", "posts")),
            Err(ModelError::DuplicateRelationship(RelationshipId::new("b")))
        );
    }

    #[test]
    fn test_field_relationship_duplicate_prevention() {
        let mut model = model();
        model.add_field_relationship(fk("fk1")).unwrap();

        // Same pair, reversed direction
        let reversed = FieldRelationship::new(
            RelationshipId::new("fk2"),
            AttributeRef::new("users", "u-id"),
            AttributeRef::new("posts", "p-user"),
        );
        assert!(matches!(
            model.add_field_relationship(reversed),
            Err(ModelError::DuplicateFieldRelationship(_, _))
        ));

        let dangling = FieldRelationship::new(
            RelationshipId::new("fk3"),
            AttributeRef::new("posts", "p-user"),
            AttributeRef::new("users", "missing"),
        );
        assert!(matches!(
            model.add_field_relationship(dangling),
            Err(ModelError::UnknownAttribute { .. })
        ));

        assert_eq!(model.field_relationships().len(), 1);
        model.remove_field_relationship(&RelationshipId::new("fk1")).unwrap();
        assert!(model.field_relationships().is_empty());
    }

    // ========================================================================
    // Views
    // ========================================================================

    #[test]
    fn test_positions_are_independent_per_view() {
        let mut model = model();
        let users = EntityId::new("users");

        model
            .set_position(&users, View::Logical, Position::new(50.0, 60.0))
            .unwrap();
        model
            .set_position(&users, View::Physical, Position::new(f64::NAN, 1.0))
            .unwrap();

        assert_eq!(model.position(&users, View::Logical), Some(Position::new(50.0, 60.0)));
        assert_eq!(model.position(&users, View::Conceptual), Some(Position::new(0.0, 0.0)));
        assert_eq!(model.position(&users, View::Physical), Some(Position::new(0.0, 0.0)));
        assert!(
            model
                .set_position(&EntityId::new("nope"), View::Logical, Position::default())
                .is_err()
        );
    }

    #[test]
    fn test_visibility_filters() {
        let mut model = model();
        model
            .set_entity_visibility(&EntityId::new("posts"), View::Conceptual, false)
            .unwrap();
        model
            .set_attribute_visibility(&AttributeRef::new("users", "u-id"), View::Conceptual, false)
            .unwrap();

        let conceptual: Vec<&str> = model
            .visible_entities(View::Conceptual)
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(conceptual, ["users"]);
        assert_eq!(model.visible_entities(View::Physical).count(), 2);

        let attributes = model
            .visible_attributes(&EntityId::new("users"), View::Conceptual)
            .unwrap();
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes[0].name, "email");
    }

    #[test]
    fn test_hidden_entities_have_no_connectors() {
        let mut model = model();
        model.add_relationship(association("writes", "users", "posts")).unwrap();
        let sizes: HashMap<EntityId, (f64, f64)> = HashMap::new();
        let config = LayoutConfig::default();
        let writes = model.relationship(&RelationshipId::new("writes")).unwrap().clone();

        let canvas = ViewCanvas::new(&model, View::Logical, &sizes).with_default_size(200.0, 100.0);
        let path = layout_relationship(&canvas, &writes, &config).unwrap();
        assert_eq!(path.source_side, Side::Right);
        assert_eq!(path.target_side, Side::Left);

        // Unmeasured nodes are unresolvable
        let unmeasured = ViewCanvas::new(&model, View::Logical, &sizes);
        assert!(layout_relationship(&unmeasured, &writes, &config).is_none());

        model
            .set_entity_visibility(&EntityId::new("posts"), View::Logical, false)
            .unwrap();
        let canvas = ViewCanvas::new(&model, View::Logical, &sizes).with_default_size(200.0, 100.0);
        assert!(layout_relationship(&canvas, &writes, &config).is_none());
    }

    #[test]
    fn test_refresh_field_handles() {
        let mut model = model();
        model.add_field_relationship(fk("fk")).unwrap();
        let sizes: HashMap<EntityId, (f64, f64)> = HashMap::new();

        // posts sits right of users, so its handle faces left
        let snapshot = model.clone();
        let canvas = ViewCanvas::new(&snapshot, View::Physical, &sizes).with_default_size(200.0, 100.0);
        model.refresh_field_handles(&canvas);

        let link = &model.field_relationships()[0];
        assert_eq!(link.source_handle.side, Side::Left);
        assert_eq!(link.target_handle.side, Side::Right);
        assert_eq!(link.source_handle.to_string(), "left-p-user-source");
    }

    // ========================================================================
    // Import workflow
    // ========================================================================

    #[test]
    fn test_import_into_model_workflow() {
        let sql = r#"
            CREATE TABLE users (id INT PRIMARY KEY, email VARCHAR(255) NOT NULL);
            CREATE TABLE posts (id INT PRIMARY KEY, user_id INT);
            ALTER TABLE posts ADD CONSTRAINT fk_user FOREIGN KEY (user_id) REFERENCES users(id);
        "#;
        let result = import_sql(sql, SqlDialect::MySQL).unwrap();
        let mut model = result.into_model("imported");

        assert_eq!(model.name, "imported");
        assert_eq!(model.entity_count(), 2);
        assert_eq!(model.field_relationships().len(), 1);

        let posts = model.find_entity_by_name("posts").unwrap().id.clone();
        model.remove_entity(&posts).unwrap();
        assert!(model.field_relationships().is_empty());
    }
}
