//! Statement AST produced by the SQL grammar.

/// A DDL statement the schema model cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable(CreateTable),
    AlterTable(AlterTable),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub name: String,
    pub if_not_exists: bool,
    pub clauses: Vec<Clause>,
}

/// One top-level, comma-separated item of a CREATE TABLE body.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Column(ColumnDef),
    Constraint(TableConstraint),
    /// KEY / INDEX / UNIQUE KEY / FULLTEXT / SPATIAL
    Index,
    Check,
    /// Anything the grammar does not recognize
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: String,
    pub primary_key: bool,
    pub not_null: bool,
    pub unique: bool,
    pub references: Option<Reference>,
}

/// `REFERENCES table [(col, ...)]`
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub table: String,
    /// Empty when the column list was omitted
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableConstraint {
    PrimaryKey {
        columns: Vec<String>,
    },
    ForeignKey {
        columns: Vec<String>,
        reference: Reference,
    },
}

/// `ALTER TABLE <name> ADD ...`; only constraint additions are kept.
#[derive(Debug, Clone, PartialEq)]
pub struct AlterTable {
    pub name: String,
    pub constraints: Vec<TableConstraint>,
}
