//! Free-text data type strings to the attribute type vocabulary

use crate::core::{DataType, TypeParams};

/// Which flavour of type string is being read
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeRules {
    /// DDL column types: trailing modifiers (`UNSIGNED`, `WITH TIME ZONE`, ...)
    /// are ignored and `tinyint(1)` is a boolean
    Sql,
    /// Legacy export datatype strings: plain type names only
    Legacy,
}

/// Map a type string to a data type and its parameters.
///
/// Returns `None` when the type family is not recognized; callers store
/// `Undefined` and count the miss.
pub fn map_datatype(raw: &str, rules: TypeRules) -> Option<(DataType, TypeParams)> {
    let raw = raw.trim();
    let (base, args) = split_type(raw);
    let base = base.to_ascii_lowercase();
    let words: Vec<&str> = base.split_whitespace().collect();
    let (family, consumed) = match words.as_slice() {
        ["character", "varying", ..] => ("varchar", 2),
        ["double", "precision", ..] => ("double", 2),
        [first, ..] => (*first, 1),
        [] => return None,
    };
    if rules == TypeRules::Legacy && words.len() > consumed {
        return None;
    }

    let first_arg = || args.first().cloned().unwrap_or_default();

    let mapped = match family {
        "int" | "integer" | "smallint" | "bigint" | "mediumint" => {
            (DataType::Integer, TypeParams::default())
        }
        "tinyint" if rules == TypeRules::Sql && args.len() == 1 && args[0] == "1" => {
            (DataType::Boolean, TypeParams::default())
        }
        "tinyint" => (DataType::Integer, TypeParams::default()),
        "varchar" | "char" | "nchar" | "nvarchar" | "character" => {
            (DataType::Varchar, TypeParams::length(first_arg()))
        }
        "decimal" | "numeric" | "float" | "double" | "real" => (
            DataType::Decimal,
            TypeParams::precision_scale(first_arg(), args.get(1).cloned().unwrap_or_default()),
        ),
        "enum" => (DataType::Enum, TypeParams::enum_values(args.join(","))),
        "text" | "tinytext" | "mediumtext" | "longtext" => (DataType::Text, TypeParams::default()),
        "boolean" | "bool" => (DataType::Boolean, TypeParams::default()),
        "datetime" => (DataType::Datetime, TypeParams::default()),
        "timestamp" => (DataType::Timestamp, TypeParams::default()),
        "date" => (DataType::Date, TypeParams::default()),
        "time" => (DataType::Time, TypeParams::default()),
        _ => return None,
    };
    Some(mapped)
}

/// Split `name(arg, arg) modifiers` into the name (with modifiers) and the
/// trimmed argument list. Commas inside quoted literals do not split.
fn split_type(raw: &str) -> (String, Vec<String>) {
    let Some(open) = raw.find('(') else {
        return (raw.to_string(), Vec::new());
    };
    let close = raw.rfind(')').filter(|close| *close > open).unwrap_or(raw.len());
    let inner = &raw[open + 1..close];
    let rest = raw.get(close + 1..).unwrap_or_default();
    let base = format!("{} {}", raw[..open].trim(), rest.trim());

    (base.trim().to_string(), split_args(inner))
}

fn split_args(inner: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in inner.chars() {
        match (ch, quote) {
            ('\'' | '"', None) => {
                quote = Some(ch);
                current.push(ch);
            }
            (c, Some(q)) if c == q => {
                quote = None;
                current.push(ch);
            }
            (',', None) => {
                args.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() || !args.is_empty() {
        args.push(current.trim().to_string());
    }

    args
}
