//! Structural edits sent back by the diagram editor.

use serde::{Deserialize, Serialize};

use crate::model::{Column, ForeignKeyRef, ModelError, Position, Schema, Table};

/// One editor operation. Tables and columns are addressed by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Edit {
    AddTable {
        name: String,
        #[serde(default)]
        position: Option<Position>,
    },
    RenameTable {
        from: String,
        to: String,
    },
    RemoveTable {
        name: String,
    },
    AddColumn {
        table: String,
        column: Column,
    },
    RemoveColumn {
        table: String,
        column: String,
    },
    RenameColumn {
        table: String,
        from: String,
        to: String,
    },
    SetColumnType {
        table: String,
        column: String,
        #[serde(rename = "type")]
        data_type: String,
    },
    SetPrimaryKey {
        table: String,
        column: String,
        value: bool,
    },
    SetNullable {
        table: String,
        column: String,
        value: bool,
    },
    SetUnique {
        table: String,
        column: String,
        value: bool,
    },
    SetForeignKey {
        table: String,
        column: String,
        reference: Option<ForeignKeyRef>,
    },
    SetPosition {
        table: String,
        position: Option<Position>,
    },
}

impl Schema {
    /// Apply a batch of edits. Either all of them apply or the schema is
    /// left untouched.
    pub fn apply_all(&mut self, edits: impl IntoIterator<Item = Edit>) -> Result<(), ModelError> {
        let mut working = self.clone();
        for edit in edits {
            working.apply(edit)?;
        }
        *self = working;
        Ok(())
    }

    /// Apply one edit.
    pub fn apply(&mut self, edit: Edit) -> Result<(), ModelError> {
        match edit {
            Edit::AddTable { name, position } => {
                if self.table(&name).is_some() {
                    return Err(ModelError::DuplicateTable(name));
                }
                let mut table = Table::new(name);
                table.position = position;
                self.tables.push(table);
            }
            Edit::RenameTable { from, to } => {
                if from == to {
                    return self.existing_table(&from).map(|_| ());
                }
                if self.table(&to).is_some() {
                    return Err(ModelError::DuplicateTable(to));
                }
                self.existing_table(&from)?.name = to.clone();
                for fk in self.references_mut() {
                    if fk.table == from {
                        fk.table = to.clone();
                    }
                }
            }
            Edit::RemoveTable { name } => {
                let index = self
                    .tables
                    .iter()
                    .position(|t| t.name == name)
                    .ok_or(ModelError::UnknownTable(name))?;
                self.tables.remove(index);
            }
            Edit::AddColumn { table, mut column } => {
                let target = self.existing_table(&table)?;
                if target.column(&column.name).is_some() {
                    return Err(ModelError::DuplicateColumn {
                        table,
                        column: column.name,
                    });
                }
                if column.primary_key {
                    column.nullable = false;
                }
                target.columns.push(column);
            }
            Edit::RemoveColumn { table, column } => {
                let target = self.existing_table(&table)?;
                let index = target
                    .columns
                    .iter()
                    .position(|c| c.name == column)
                    .ok_or(ModelError::UnknownColumn { table, column })?;
                target.columns.remove(index);
            }
            Edit::RenameColumn { table, from, to } => {
                let target = self.existing_table(&table)?;
                if from != to && target.column(&to).is_some() {
                    return Err(ModelError::DuplicateColumn { table, column: to });
                }
                existing_column(target, &from)?.name = to.clone();
                for fk in self.references_mut() {
                    if fk.table == table && fk.column == from {
                        fk.column = to.clone();
                    }
                }
            }
            Edit::SetColumnType {
                table,
                column,
                data_type,
            } => {
                self.existing_column(&table, &column)?.data_type = data_type;
            }
            Edit::SetPrimaryKey {
                table,
                column,
                value,
            } => {
                self.existing_column(&table, &column)?.set_primary_key(value);
            }
            Edit::SetNullable {
                table,
                column,
                value,
            } => {
                let target = self.existing_column(&table, &column)?;
                if value && target.primary_key {
                    return Err(ModelError::NullablePrimaryKey { table, column });
                }
                target.nullable = value;
            }
            Edit::SetUnique {
                table,
                column,
                value,
            } => {
                self.existing_column(&table, &column)?.unique = value;
            }
            Edit::SetForeignKey {
                table,
                column,
                reference,
            } => {
                self.existing_column(&table, &column)?.foreign_key = reference;
            }
            Edit::SetPosition { table, position } => {
                self.existing_table(&table)?.position = position;
            }
        }
        Ok(())
    }

    fn existing_table(&mut self, name: &str) -> Result<&mut Table, ModelError> {
        self.table_mut(name)
            .ok_or_else(|| ModelError::UnknownTable(name.to_string()))
    }

    fn existing_column(&mut self, table: &str, column: &str) -> Result<&mut Column, ModelError> {
        existing_column(self.existing_table(table)?, column)
    }

    fn references_mut(&mut self) -> impl Iterator<Item = &mut ForeignKeyRef> {
        self.tables
            .iter_mut()
            .flat_map(|t| t.columns.iter_mut())
            .filter_map(|c| c.foreign_key.as_mut())
    }
}

fn existing_column<'a>(table: &'a mut Table, name: &str) -> Result<&'a mut Column, ModelError> {
    let table_name = table.name.clone();
    table
        .column_mut(name)
        .ok_or_else(|| ModelError::UnknownColumn {
            table: table_name,
            column: name.to_string(),
        })
}
