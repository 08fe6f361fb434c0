//! Parallel-group index for associations
//!
//! Plain and composition associations that join the same unordered pair of
//! entities form a parallel group. Members are ordered by relationship id so
//! the layout engine can fan them out the same way no matter how the
//! relationship list was built.

use std::borrow::Cow;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::ids::EntityId;
use super::schema::Relationship;

/// Position of a relationship inside its parallel group
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParallelSlot {
    /// 0-based index within the group
    pub index: usize,
    /// Group size
    pub count: usize,
}

impl ParallelSlot {
    /// Slot of a relationship that has no siblings
    pub const SINGLE: ParallelSlot = ParallelSlot { index: 0, count: 1 };
}

/// Recompute parallel metadata for every relationship.
///
/// Returns the input slice untouched (`Cow::Borrowed`) when every stored slot
/// already matches, so re-running on an indexed set allocates nothing.
pub fn reindex(relationships: &[Relationship]) -> Cow<'_, [Relationship]> {
    let slots = parallel_slots(relationships);

    let unchanged = relationships
        .iter()
        .zip(&slots)
        .all(|(relationship, slot)| relationship.parallel == *slot);
    if unchanged {
        return Cow::Borrowed(relationships);
    }

    Cow::Owned(
        relationships
            .iter()
            .zip(slots)
            .map(|(relationship, slot)| Relationship {
                parallel: slot,
                ..relationship.clone()
            })
            .collect(),
    )
}

/// Slot per relationship, aligned with the input. Relationships that do not
/// take part in parallel grouping get `None`.
pub fn parallel_slots(relationships: &[Relationship]) -> Vec<Option<ParallelSlot>> {
    let mut groups: HashMap<(&EntityId, &EntityId), Vec<usize>> = HashMap::new();

    for (position, relationship) in relationships.iter().enumerate() {
        if !relationship.kind.is_parallel_groupable() {
            continue;
        }
        let pair = if relationship.source <= relationship.target {
            (&relationship.source, &relationship.target)
        } else {
            (&relationship.target, &relationship.source)
        };
        groups.entry(pair).or_default().push(position);
    }

    let mut slots = vec![None; relationships.len()];
    for members in groups.values_mut() {
        // Ids are unique within a model, so this order is total
        members.sort_by(|a, b| relationships[*a].id.cmp(&relationships[*b].id));
        let count = members.len();
        for (index, &position) in members.iter().enumerate() {
            slots[position] = Some(ParallelSlot { index, count });
        }
    }

    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RelationshipId, RelationshipKind};
    use proptest::prelude::*;

    fn assoc(id: &str, source: &str, target: &str) -> Relationship {
        Relationship::new(
            RelationshipId::new(id),
            EntityId::new(source),
            EntityId::new(target),
            RelationshipKind::Association,
        )
    }

    #[test]
    fn test_reindex_assigns_sorted_slots() {
        let relationships = vec![
            assoc("r3", "a", "b"),
            assoc("r1", "b", "a"),
            assoc("r2", "a", "b"),
            assoc("r9", "a", "c"),
        ];

        let indexed = reindex(&relationships);
        assert!(matches!(indexed, Cow::Owned(_)));

        let slot = |id: &str| {
            indexed
                .iter()
                .find(|r| r.id.as_str() == id)
                .and_then(|r| r.parallel)
                .unwrap()
        };
        assert_eq!(slot("r1"), ParallelSlot { index: 0, count: 3 });
        assert_eq!(slot("r2"), ParallelSlot { index: 1, count: 3 });
        assert_eq!(slot("r3"), ParallelSlot { index: 2, count: 3 });
        assert_eq!(slot("r9"), ParallelSlot::SINGLE);
    }

    #[test]
    fn test_reindex_skips_reflexive_and_associative() {
        let reflexive = Relationship::new(
            RelationshipId::new("self"),
            EntityId::new("a"),
            EntityId::new("a"),
            RelationshipKind::Reflexive,
        );
        let associative = Relationship::new(
            RelationshipId::new("assoc"),
            EntityId::new("a"),
            EntityId::new("b"),
            RelationshipKind::Associative {
                association_class: EntityId::new("c"),
            },
        );
        let relationships = vec![reflexive, associative, assoc("plain", "a", "b")];

        let indexed = reindex(&relationships);
        assert_eq!(indexed[0].parallel, None);
        assert_eq!(indexed[1].parallel, None);
        assert_eq!(indexed[2].parallel, Some(ParallelSlot::SINGLE));
    }

    #[test]
    fn test_reindex_clears_stale_slots() {
        let mut stale = assoc("r1", "a", "a");
        stale.kind = RelationshipKind::Reflexive;
        stale.parallel = Some(ParallelSlot { index: 1, count: 2 });

        let indexed = reindex(std::slice::from_ref(&stale));
        assert_eq!(indexed[0].parallel, None);
    }

    #[test]
    fn test_reindex_is_noop_when_indexed() {
        let relationships = vec![assoc("r1", "a", "b"), assoc("r2", "a", "b")];
        let once = reindex(&relationships).into_owned();
        let twice = reindex(&once);

        assert!(matches!(twice, Cow::Borrowed(_)));
        assert!(std::ptr::eq(twice.as_ptr(), once.as_ptr()));
    }

    #[test]
    fn test_reindex_empty() {
        let relationships: Vec<Relationship> = Vec::new();
        assert!(matches!(reindex(&relationships), Cow::Borrowed(_)));
    }

    fn relationship_set() -> impl Strategy<Value = Vec<Relationship>> {
        prop::collection::btree_set("r[0-9]{1,3}", 0..12).prop_flat_map(|ids| {
            let ids: Vec<String> = ids.into_iter().collect();
            let len = ids.len();
            (
                Just(ids),
                prop::collection::vec((0..3usize, 0..3usize, any::<bool>()), len),
            )
                .prop_map(|(ids, ends)| {
                    let names = ["a", "b", "c"];
                    ids.iter()
                        .zip(ends)
                        .map(|(id, (s, t, composition))| {
                            let kind = if s == t {
                                RelationshipKind::Reflexive
                            } else if composition {
                                RelationshipKind::Composition
                            } else {
                                RelationshipKind::Association
                            };
                            Relationship::new(
                                RelationshipId::new(id.as_str()),
                                EntityId::new(names[s]),
                                EntityId::new(names[t]),
                                kind,
                            )
                        })
                        .collect()
                })
        })
    }

    proptest! {
        #[test]
        fn prop_reindex_is_idempotent(relationships in relationship_set()) {
            let once = reindex(&relationships).into_owned();
            let twice = reindex(&once);
            prop_assert!(matches!(twice, Cow::Borrowed(_)));
            prop_assert_eq!(twice.as_ref(), once.as_slice());
        }

        #[test]
        fn prop_reindex_ignores_input_order(
            relationships in relationship_set(),
            seed in any::<u64>(),
        ) {
            let mut shuffled = relationships.clone();
            // Deterministic rotation + reverse stands in for a shuffle
            if !shuffled.is_empty() {
                let k = (seed as usize) % shuffled.len();
                shuffled.rotate_left(k);
                if seed % 2 == 0 {
                    shuffled.reverse();
                }
            }

            let original = reindex(&relationships);
            let reordered = reindex(&shuffled);
            for relationship in original.iter() {
                let twin = reordered.iter().find(|r| r.id == relationship.id).unwrap();
                prop_assert_eq!(twin.parallel, relationship.parallel);
            }
        }
    }
}
