//! SQL DDL importer
//!
//! Walks `CREATE TABLE` and `ALTER TABLE ... ADD CONSTRAINT` statements and
//! builds entities, attributes and foreign-key field relationships from them.
//! Foreign keys are collected first and resolved once every table is known,
//! so constraint order in the script does not matter.

use std::collections::{HashMap, HashSet};

use sqlparser::ast::{
    AlterTableOperation, ColumnDef, ColumnOption, CreateTable, Ident, ObjectName, Statement,
    TableConstraint,
};
use sqlparser::dialect::{Dialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

use super::datatype::{TypeRules, map_datatype};
use super::{ImportError, ImportResult, name_key};
use crate::core::{
    Attribute, AttributeId, AttributeRef, DataType, Entity, EntityId, FieldRelationship,
    RelationshipId, field_pair_key,
};

/// SQL dialect used to parse DDL scripts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SqlDialect {
    #[default]
    MySQL,
    PostgreSQL,
    SQLite,
}

impl SqlDialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlDialect::MySQL => "mysql",
            SqlDialect::PostgreSQL => "postgresql",
            SqlDialect::SQLite => "sqlite",
        }
    }

    /// Get the sqlparser dialect implementation
    fn parser_dialect(&self) -> Box<dyn Dialect> {
        match self {
            SqlDialect::MySQL => Box::new(MySqlDialect {}),
            SqlDialect::PostgreSQL => Box::new(PostgreSqlDialect {}),
            SqlDialect::SQLite => Box::new(SQLiteDialect {}),
        }
    }
}

impl std::fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SqlDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" => Ok(SqlDialect::MySQL),
            "postgresql" | "postgres" => Ok(SqlDialect::PostgreSQL),
            "sqlite" => Ok(SqlDialect::SQLite),
            other => Err(format!(
                "unknown SQL dialect '{}' (expected mysql, postgresql or sqlite)",
                other
            )),
        }
    }
}

/// Parse a DDL script and import it
pub fn import_sql(sql: &str, dialect: SqlDialect) -> Result<ImportResult, ImportError> {
    let parser_dialect = dialect.parser_dialect();
    let statements = Parser::parse_sql(parser_dialect.as_ref(), sql)?;
    tracing::debug!("Parsed {} statements as {}", statements.len(), dialect);
    import_statements(&statements)
}

/// Import already-parsed statements. Statements other than `CREATE TABLE`
/// and `ALTER TABLE` are ignored.
pub fn import_statements(statements: &[Statement]) -> Result<ImportResult, ImportError> {
    let mut import = DdlImport::default();

    for statement in statements {
        match statement {
            Statement::CreateTable(create_table) => import.create_table(create_table),
            Statement::AlterTable(alter_table) => {
                let table = strip_quotes(&alter_table.name.to_string());
                for operation in &alter_table.operations {
                    if let AlterTableOperation::AddConstraint { constraint, .. } = operation
                        && let TableConstraint::ForeignKey(fk) = constraint
                    {
                        import.foreign_key(
                            &table,
                            &fk.columns,
                            &fk.foreign_table,
                            &fk.referred_columns,
                        );
                    }
                }
            }
            _ => {}
        }
    }

    if import.result.entities.is_empty() {
        return Err(ImportError::NoTables);
    }

    let result = import.finish();
    result.log_summary("DDL");
    Ok(result)
}

/// Foreign key waiting for every table to be known
struct PendingForeignKey {
    from_table: String,
    from_columns: Vec<String>,
    to_table: String,
    to_columns: Vec<String>,
}

#[derive(Default)]
struct DdlImport {
    result: ImportResult,
    /// Lowercased table name to index into `result.entities`
    tables: HashMap<String, usize>,
    foreign_keys: Vec<PendingForeignKey>,
}

impl DdlImport {
    fn create_table(&mut self, create_table: &CreateTable) {
        let table_name = strip_quotes(&create_table.name.to_string());
        let key = name_key(&table_name);
        if self.tables.contains_key(&key) {
            tracing::debug!("Table '{}' already defined, skipping duplicate", table_name);
            return;
        }

        let index = self.result.entities.len();
        let entity_id = EntityId::new(format!("entity-{}", index));
        let (x, y) = grid_position(index);
        let mut entity = Entity::new(entity_id.clone(), table_name.clone()).with_position(x, y);

        // Columns named by table-level PRIMARY KEY / UNIQUE constraints
        let mut pk_columns: HashSet<String> = HashSet::new();
        let mut unique_columns: HashSet<String> = HashSet::new();
        for constraint in &create_table.constraints {
            match constraint {
                TableConstraint::PrimaryKey(pk) => pk_columns.extend(
                    pk.columns
                        .iter()
                        .map(|c| name_key(&strip_quotes(&c.column.to_string()))),
                ),
                TableConstraint::Unique(unique) => unique_columns.extend(
                    unique
                        .columns
                        .iter()
                        .map(|c| name_key(&strip_quotes(&c.column.to_string()))),
                ),
                TableConstraint::ForeignKey(fk) => self.foreign_key(
                    &table_name,
                    &fk.columns,
                    &fk.foreign_table,
                    &fk.referred_columns,
                ),
                _ => {}
            }
        }

        for (position, column) in create_table.columns.iter().enumerate() {
            let column_key = name_key(&column.name.value);
            let attribute = self.column_attribute(
                &table_name,
                AttributeId::positional(&entity_id, position),
                column,
                pk_columns.contains(&column_key),
                unique_columns.contains(&column_key),
            );
            entity.attributes.push(attribute);
        }

        tracing::debug!(
            "Table '{}' -> {} ({} attributes)",
            table_name,
            entity_id,
            entity.attributes.len()
        );
        self.tables.insert(key, index);
        self.result.entities.push(entity);
    }

    fn column_attribute(
        &mut self,
        table_name: &str,
        id: AttributeId,
        column: &ColumnDef,
        table_pk: bool,
        table_unique: bool,
    ) -> Attribute {
        let raw_type = column.data_type.to_string();
        let mut attribute = match map_datatype(&raw_type, TypeRules::Sql) {
            Some((data_type, params)) => {
                Attribute::new(id, column.name.value.clone(), data_type).with_params(params)
            }
            None => {
                tracing::debug!(
                    "Column '{}' has unmapped type '{}'",
                    column.name.value,
                    raw_type
                );
                self.result.warnings.unmatched_attribute_types += 1;
                Attribute::new(id, column.name.value.clone(), DataType::Undefined)
            }
        };

        let mut primary_key = table_pk;
        for option in &column.options {
            match &option.option {
                ColumnOption::PrimaryKey(_) => primary_key = true,
                ColumnOption::Unique(_) => attribute.unique = true,
                ColumnOption::NotNull => attribute.nullable = false,
                ColumnOption::Null => attribute.nullable = true,
                ColumnOption::Default(expr) => attribute.default_value = expr.to_string(),
                ColumnOption::ForeignKey(fk) => self.foreign_key(
                    table_name,
                    std::slice::from_ref(&column.name),
                    &fk.foreign_table,
                    &fk.referred_columns,
                ),
                other => {
                    let text = other.to_string().to_ascii_uppercase();
                    if text.contains("AUTO_INCREMENT") || text.contains("AUTOINCREMENT") {
                        attribute.auto_increment = true;
                    }
                }
            }
        }

        if table_unique {
            attribute.unique = true;
        }
        if primary_key {
            attribute = attribute.primary_key();
        }
        attribute
    }

    fn foreign_key(
        &mut self,
        from_table: &str,
        columns: &[Ident],
        foreign_table: &ObjectName,
        referred_columns: &[Ident],
    ) {
        self.foreign_keys.push(PendingForeignKey {
            from_table: from_table.to_string(),
            from_columns: columns.iter().map(|c| strip_quotes(&c.value)).collect(),
            to_table: strip_quotes(&foreign_table.to_string()),
            to_columns: referred_columns
                .iter()
                .map(|c| strip_quotes(&c.value))
                .collect(),
        });
    }

    /// Resolve a table/column pair to an attribute reference
    fn resolve(&self, table: &str, column: &str) -> Option<AttributeRef> {
        let entity = &self.result.entities[*self.tables.get(&name_key(table))?];
        let column_key = name_key(column);
        let attribute = entity
            .attributes
            .iter()
            .find(|a| name_key(&a.name) == column_key)?;
        Some(AttributeRef::new(entity.id.clone(), attribute.id.clone()))
    }

    fn finish(mut self) -> ImportResult {
        let mut seen: HashSet<(AttributeRef, AttributeRef)> = HashSet::new();
        let mut field_relationships = Vec::new();

        for fk in &self.foreign_keys {
            let ([from_column], [to_column]) = (fk.from_columns.as_slice(), fk.to_columns.as_slice())
            else {
                tracing::debug!(
                    "Foreign key {}({}) -> {}({}) is not single-column, skipping",
                    fk.from_table,
                    fk.from_columns.join(", "),
                    fk.to_table,
                    fk.to_columns.join(", ")
                );
                continue;
            };

            let (Some(source), Some(target)) = (
                self.resolve(&fk.from_table, from_column),
                self.resolve(&fk.to_table, to_column),
            ) else {
                tracing::debug!(
                    "Foreign key {}.{} -> {}.{} does not resolve, skipping",
                    fk.from_table,
                    from_column,
                    fk.to_table,
                    to_column
                );
                continue;
            };

            if !seen.insert(field_pair_key(&source, &target)) {
                tracing::debug!(
                    "Foreign key {}.{} -> {}.{} already imported, skipping",
                    fk.from_table,
                    from_column,
                    fk.to_table,
                    to_column
                );
                continue;
            }

            let id = RelationshipId::new(format!("field-rel-{}", field_relationships.len()));
            field_relationships.push(FieldRelationship::new(id, source, target));
        }

        self.result.field_relationships = field_relationships;
        self.result
    }
}

/// Helper function to strip backticks, quotes and brackets from identifiers
pub(crate) fn strip_quotes(name: &str) -> String {
    name.trim()
        .trim_matches('`')
        .trim_matches('"')
        .trim_matches('\'')
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string()
}

/// Grid slot for the n-th imported table
fn grid_position(index: usize) -> (f64, f64) {
    const TABLE_WIDTH: f64 = 250.0;
    const TABLE_HEIGHT: f64 = 200.0;
    const TABLE_SPACING: f64 = 50.0;
    const TABLES_PER_ROW: usize = 4;
    const START_X: f64 = 100.0;
    const START_Y: f64 = 100.0;

    let row = index / TABLES_PER_ROW;
    let col = index % TABLES_PER_ROW;

    (
        START_X + col as f64 * (TABLE_WIDTH + TABLE_SPACING),
        START_Y + row as f64 * (TABLE_HEIGHT + TABLE_SPACING),
    )
}

// ============================================================================
// Tests
// ============================================================================
