//! Entity-attribute model
//!
//! Canonical attribute representation (type tag + type parameters, constraint
//! flags, per-view visibility) and the normalizer that turns loosely-typed
//! external input into it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ids::{AttributeId, EntityId};
use super::views::{Visibility, normalize_visibility};

// ============================================================================
// Data Types
// ============================================================================

/// Fixed vocabulary of attribute data types.
///
/// The serialized tag carries a parameter placeholder where the type takes
/// parameters: `varchar(n)`, `decimal(p,s)`, `enum(e)`. `Undefined` is the
/// empty tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DataType {
    #[default]
    Undefined,
    Integer,
    Varchar,
    Decimal,
    Text,
    Boolean,
    Datetime,
    Timestamp,
    Date,
    Time,
    Enum,
}

impl DataType {
    pub const ALL: [DataType; 11] = [
        DataType::Undefined,
        DataType::Integer,
        DataType::Varchar,
        DataType::Decimal,
        DataType::Text,
        DataType::Boolean,
        DataType::Datetime,
        DataType::Timestamp,
        DataType::Date,
        DataType::Time,
        DataType::Enum,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            DataType::Undefined => "",
            DataType::Integer => "integer",
            DataType::Varchar => "varchar(n)",
            DataType::Decimal => "decimal(p,s)",
            DataType::Text => "text",
            DataType::Boolean => "boolean",
            DataType::Datetime => "datetime",
            DataType::Timestamp => "timestamp",
            DataType::Date => "date",
            DataType::Time => "time",
            DataType::Enum => "enum(e)",
        }
    }

    /// Parse a serialized tag. Anything outside the vocabulary is `Undefined`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "integer" => DataType::Integer,
            "varchar(n)" | "varchar" => DataType::Varchar,
            "decimal(p,s)" | "decimal" => DataType::Decimal,
            "text" => DataType::Text,
            "boolean" => DataType::Boolean,
            "datetime" => DataType::Datetime,
            "timestamp" => DataType::Timestamp,
            "date" => DataType::Date,
            "time" => DataType::Time,
            "enum(e)" | "enum" => DataType::Enum,
            _ => DataType::Undefined,
        }
    }

    pub fn is_defined(&self) -> bool {
        !matches!(self, DataType::Undefined)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

impl Serialize for DataType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tag())
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(DataType::from_tag(&tag))
    }
}

/// Parameters for the parameterized types.
///
/// Values are kept as entered. Fields that do not apply to the current type
/// are ignored when rendering but kept until the type changes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypeParams {
    pub max_length: String,
    pub precision: String,
    pub scale: String,
    pub enum_values: String,
}

impl TypeParams {
    pub fn length(max_length: impl Into<String>) -> Self {
        Self {
            max_length: max_length.into(),
            ..Default::default()
        }
    }

    pub fn precision_scale(precision: impl Into<String>, scale: impl Into<String>) -> Self {
        Self {
            precision: precision.into(),
            scale: scale.into(),
            ..Default::default()
        }
    }

    pub fn enum_values(values: impl Into<String>) -> Self {
        Self {
            enum_values: values.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Render a type tag with its placeholder substituted.
///
/// `(n)` takes the max length, `(p,s)` precision and scale (scale alone is
/// dropped), `(e)` the enum value list. A placeholder with no value renders
/// as the bare type name.
pub fn format_type(data_type: DataType, params: &TypeParams) -> String {
    fn wrap(base: &str, inner: &str) -> String {
        if inner.is_empty() {
            base.to_string()
        } else {
            format!("{}({})", base, inner)
        }
    }

    match data_type {
        DataType::Varchar => wrap("varchar", params.max_length.trim()),
        DataType::Decimal => {
            let precision = params.precision.trim();
            let scale = params.scale.trim();
            match (precision.is_empty(), scale.is_empty()) {
                (true, _) => "decimal".to_string(),
                (false, true) => format!("decimal({})", precision),
                (false, false) => format!("decimal({},{})", precision, scale),
            }
        }
        DataType::Enum => wrap("enum", params.enum_values.trim()),
        other => other.tag().to_string(),
    }
}

// ============================================================================
// Attribute
// ============================================================================

/// Attribute (field / column) of an entity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub id: AttributeId,
    pub name: String,
    /// Display name used by the conceptual and logical views; empty when unset
    #[serde(default)]
    pub logical_name: String,
    #[serde(rename = "type", default)]
    pub data_type: DataType,
    #[serde(default)]
    pub type_params: TypeParams,
    #[serde(default)]
    pub default_value: String,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default = "Visibility::all_visible")]
    pub visibility: Visibility,
}

impl Attribute {
    pub fn new(id: impl Into<AttributeId>, name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            logical_name: String::new(),
            data_type,
            type_params: TypeParams::default(),
            default_value: String::new(),
            nullable: true,
            unique: false,
            auto_increment: false,
            visibility: Visibility::all_visible(),
        }
    }

    /// Attribute with every field at its normalization default
    pub fn blank(id: AttributeId) -> Self {
        Self {
            nullable: false,
            ..Self::new(id, "", DataType::Undefined)
        }
    }

    pub fn with_params(mut self, params: TypeParams) -> Self {
        self.type_params = params;
        self
    }

    pub fn with_logical_name(mut self, logical_name: impl Into<String>) -> Self {
        self.logical_name = logical_name.into();
        self
    }

    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = default_value.into();
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.unique = true;
        self.nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Change the data type. A different type clears the type parameters and
    /// the default value so nothing from the old type leaks into the new one.
    pub fn set_type(&mut self, data_type: DataType) {
        if self.data_type != data_type {
            self.data_type = data_type;
            self.type_params = TypeParams::default();
            self.default_value.clear();
        }
    }

    /// Rendered type, e.g. `varchar(255)`
    pub fn formatted_type(&self) -> String {
        format_type(self.data_type, &self.type_params)
    }

    /// Logical name when set, physical name otherwise
    pub fn display_name(&self) -> &str {
        if self.logical_name.trim().is_empty() {
            &self.name
        } else {
            &self.logical_name
        }
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// Turn a heterogeneous array into attributes, one per entry, in order.
///
/// Objects are read field by field with type-appropriate defaults, a bare
/// string becomes an attribute of that name, and anything else becomes a blank
/// attribute. Missing or repeated ids are replaced by `<entityId>-attr-<index>`,
/// or `<entityId>-attr-<index>-<n>` with the smallest free `n` when that is taken
/// too, so the same input always yields the same ids.
pub fn normalize_attributes(entity_id: &EntityId, raw: &[Value]) -> Vec<Attribute> {
    let mut seen: HashSet<AttributeId> = HashSet::new();

    raw.iter()
        .enumerate()
        .map(|(index, entry)| {
            let mut attribute = normalize_attribute(entity_id, index, entry);
            if !seen.insert(attribute.id.clone()) {
                attribute.id = AttributeId::positional(entity_id, index);
                let positional = attribute.id.clone();
                let mut n = 1;
                while !seen.insert(attribute.id.clone()) {
                    attribute.id = AttributeId::new(format!("{}-{}", positional, n));
                    n += 1;
                }
            }
            attribute
        })
        .collect()
}

fn normalize_attribute(entity_id: &EntityId, index: usize, raw: &Value) -> Attribute {
    let positional = || AttributeId::positional(entity_id, index);

    match raw {
        Value::Object(map) => {
            let id = map
                .get("id")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
                .map(AttributeId::from)
                .unwrap_or_else(positional);
            let text = |key: &str| string_field(map.get(key));
            let flag = |key: &str| map.get(key).and_then(Value::as_bool).unwrap_or(false);
            let data_type = map
                .get("type")
                .or_else(|| map.get("dataType"))
                .and_then(Value::as_str)
                .map(DataType::from_tag)
                .unwrap_or_default();

            Attribute {
                id,
                name: text("name"),
                logical_name: text("logicalName"),
                data_type,
                type_params: normalize_type_params(map.get("typeParams").unwrap_or(&Value::Null)),
                default_value: text("defaultValue"),
                nullable: flag("nullable"),
                unique: flag("unique"),
                auto_increment: flag("autoIncrement"),
                visibility: normalize_visibility(map.get("visibility").unwrap_or(&Value::Null)),
            }
        }
        Value::String(name) => Attribute {
            name: name.clone(),
            ..Attribute::blank(positional())
        },
        _ => Attribute::blank(positional()),
    }
}

/// Type parameters from an object; numbers are accepted and rendered as text.
pub fn normalize_type_params(raw: &Value) -> TypeParams {
    let field = |key: &str| match raw.get(key) {
        Some(Value::Number(n)) => n.to_string(),
        other => string_field(other),
    };

    TypeParams {
        max_length: field("maxLength"),
        precision: field("precision"),
        scale: field("scale"),
        enum_values: field("enumValues"),
    }
}

fn string_field(value: Option<&Value>) -> String {
    value.and_then(Value::as_str).unwrap_or_default().to_string()
}
