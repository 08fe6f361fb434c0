//! Stable identifiers for entities, attributes and relationships
//!
//! Ids are opaque strings. Interactive edits mint fresh UUIDs, importers mint
//! deterministic ids so the same input always yields the same model.

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::geometry::Side;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
            Display, From,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Fresh random id
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of an entity (class / table)
    EntityId
);

string_id!(
    /// Identifier of an attribute, unique within its entity
    AttributeId
);

string_id!(
    /// Identifier of an association or field-level relationship
    RelationshipId
);

impl AttributeId {
    /// Positional id used when an attribute arrives without one
    pub fn positional(entity: &EntityId, index: usize) -> Self {
        Self(format!("{}-attr-{}", entity, index))
    }
}

/// Which end of a field-level relationship a handle belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleRole {
    Source,
    Target,
}

impl HandleRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandleRole::Source => "source",
            HandleRole::Target => "target",
        }
    }
}

/// Connection handle on an attribute row.
///
/// The string form `"<side>-<attributeId>-<role>"` only exists at the
/// serialization boundary; everything else works with the structured value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HandleId {
    pub side: Side,
    pub attribute: AttributeId,
    pub role: HandleRole,
}

impl HandleId {
    pub fn new(side: Side, attribute: AttributeId, role: HandleRole) -> Self {
        Self {
            side,
            attribute,
            role,
        }
    }
}

impl std::fmt::Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.side, self.attribute, self.role.as_str())
    }
}

impl std::str::FromStr for HandleId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (side, rest) = s
            .split_once('-')
            .ok_or_else(|| format!("handle '{}' has no side prefix", s))?;
        let (attribute, role) = rest
            .rsplit_once('-')
            .ok_or_else(|| format!("handle '{}' has no role suffix", s))?;

        let role = match role {
            "source" => HandleRole::Source,
            "target" => HandleRole::Target,
            other => return Err(format!("unknown handle role '{}'", other)),
        };
        if attribute.is_empty() {
            return Err(format!("handle '{}' has an empty attribute id", s));
        }

        Ok(Self {
            side: side.parse()?,
            attribute: AttributeId::new(attribute),
            role,
        })
    }
}

impl Serialize for HandleId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HandleId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
