//! Relational schema model shared by the parser, the generator and the editor.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Duplicate table name: {0}")]
    DuplicateTable(String),
    #[error("Duplicate column name: {table}.{column}")]
    DuplicateColumn { table: String, column: String },
    #[error("Unknown table: {0}")]
    UnknownTable(String),
    #[error("Unknown column: {table}.{column}")]
    UnknownColumn { table: String, column: String },
    #[error("Primary key column {table}.{column} cannot be nullable")]
    NullablePrimaryKey { table: String, column: String },
    #[error("Column {0} is marked foreignKey but has no foreignKeyReference")]
    ForeignKeyWithoutReference(String),
    #[error("Column {0} has a foreignKeyReference but is not marked foreignKey")]
    ReferenceWithoutForeignKey(String),
    #[error("Invalid schema JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub tables: Vec<Table>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    /// Canvas position, owned by the diagram editor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Other editor-owned fields (colors, notes), carried through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A column. `foreign_key` being `Some` is what makes it a foreign key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ColumnRecord", try_from = "ColumnRecord")]
pub struct Column {
    pub name: String,
    pub data_type: String,
    pub primary_key: bool,
    pub nullable: bool,
    pub unique: bool,
    pub foreign_key: Option<ForeignKeyRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    pub table: String,
    pub column: String,
}

/// Diagram edge derived from a foreign-key column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_column: String,
    pub target_column: String,
}

/// Wire form of [`Column`] with the flat flag set the editor works with.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColumnRecord {
    name: String,
    #[serde(rename = "type", default)]
    data_type: String,
    #[serde(default)]
    primary_key: bool,
    #[serde(default)]
    foreign_key: bool,
    #[serde(default = "default_nullable")]
    nullable: bool,
    #[serde(default)]
    unique: bool,
    #[serde(default)]
    foreign_key_reference: Option<ForeignKeyRef>,
}

fn default_nullable() -> bool {
    true
}

impl From<Column> for ColumnRecord {
    fn from(column: Column) -> Self {
        Self {
            foreign_key: column.foreign_key.is_some(),
            name: column.name,
            data_type: column.data_type,
            primary_key: column.primary_key,
            nullable: column.nullable,
            unique: column.unique,
            foreign_key_reference: column.foreign_key,
        }
    }
}

impl TryFrom<ColumnRecord> for Column {
    type Error = ModelError;

    fn try_from(record: ColumnRecord) -> Result<Self, Self::Error> {
        match (record.foreign_key, &record.foreign_key_reference) {
            (true, None) => return Err(ModelError::ForeignKeyWithoutReference(record.name)),
            (false, Some(_)) => return Err(ModelError::ReferenceWithoutForeignKey(record.name)),
            _ => {}
        }
        Ok(Column {
            name: record.name,
            data_type: record.data_type,
            primary_key: record.primary_key,
            nullable: record.nullable && !record.primary_key,
            unique: record.unique,
            foreign_key: record.foreign_key_reference,
        })
    }
}

impl Column {
    /// A nullable, unconstrained column.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            primary_key: false,
            nullable: true,
            unique: false,
            foreign_key: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.set_primary_key(true);
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

    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.foreign_key = Some(ForeignKeyRef {
            table: table.into(),
            column: column.into(),
        });
        self
    }

    pub fn is_foreign_key(&self) -> bool {
        self.foreign_key.is_some()
    }

    /// Primary key columns are never nullable.
    pub fn set_primary_key(&mut self, value: bool) {
        self.primary_key = value;
        if value {
            self.nullable = false;
        }
    }
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            position: None,
            extra: Map::new(),
        }
    }

    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Columns flagged as primary key, in column order.
    pub fn primary_key_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.primary_key)
    }
}

impl Schema {
    pub fn new(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    /// Read a schema from JSON and check its invariants.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let schema: Schema = serde_json::from_str(json)?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.name == name)
    }

    /// Check that table names are unique and column names are unique per table.
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut tables = HashSet::new();
        for table in &self.tables {
            if !tables.insert(table.name.as_str()) {
                return Err(ModelError::DuplicateTable(table.name.clone()));
            }
            let mut columns = HashSet::new();
            for column in &table.columns {
                if !columns.insert(column.name.as_str()) {
                    return Err(ModelError::DuplicateColumn {
                        table: table.name.clone(),
                        column: column.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// One relationship per foreign-key column, in table-then-column order.
    /// Targets are not required to exist.
    pub fn relationships(&self) -> Vec<Relationship> {
        self.tables
            .iter()
            .flat_map(|table| {
                table.columns.iter().filter_map(move |column| {
                    column.foreign_key.as_ref().map(|fk| Relationship {
                        id: format!("e-{}-{}-{}", table.name, column.name, fk.table),
                        source: table.name.clone(),
                        target: fk.table.clone(),
                        source_column: column.name.clone(),
                        target_column: fk.column.clone(),
                    })
                })
            })
            .collect()
    }

    /// Equality of tables and columns, ignoring canvas positions.
    pub fn structurally_eq(&self, other: &Schema) -> bool {
        self.tables.len() == other.tables.len()
            && self
                .tables
                .iter()
                .zip(&other.tables)
                .all(|(a, b)| a.name == b.name && a.columns == b.columns)
    }
}
