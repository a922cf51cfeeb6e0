//! Generator for converting a Schema back to DDL text.
//!
//! Output comes in two phases: every CREATE TABLE first, then one
//! `ALTER TABLE ... ADD FOREIGN KEY` per foreign-key column, so the order of
//! tables never matters to the database reading the script.

use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

use crate::model::{Column, Schema, Table};
use crate::sql::Dialect;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateOptions {
    /// Picks the quote character for identifiers that need quoting
    pub dialect: Dialect,
    /// Pad column names so that types line up
    pub align_columns: bool,
}

/// Generate DDL for a Schema.
pub fn generate(schema: &Schema, options: GenerateOptions) -> String {
    let mut output = String::new();

    // Phase 1: tables
    for (i, table) in schema.tables.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        generate_table(&mut output, table, options);
    }

    // Phase 2: foreign keys
    let mut fk_count = 0;
    for table in &schema.tables {
        for column in &table.columns {
            if let Some(fk) = &column.foreign_key {
                if fk_count == 0 && !output.is_empty() {
                    output.push('\n');
                }
                fk_count += 1;
                output.push_str(&format!(
                    "ALTER TABLE {} ADD FOREIGN KEY ({}) REFERENCES {} ({});\n",
                    options.dialect.quote_ident(&table.name),
                    options.dialect.quote_ident(&column.name),
                    options.dialect.quote_ident(&fk.table),
                    options.dialect.quote_ident(&fk.column),
                ));
            }
        }
    }

    tracing::debug!(
        tables = schema.tables.len(),
        foreign_keys = fk_count,
        "generated DDL"
    );
    output
}

fn generate_table(output: &mut String, table: &Table, options: GenerateOptions) {
    let dialect = options.dialect;
    let table_name = dialect.quote_ident(&table.name);

    if table.columns.is_empty() {
        output.push_str(&format!("CREATE TABLE {} ();\n", table_name));
        return;
    }

    let names: Vec<_> = table
        .columns
        .iter()
        .map(|c| dialect.quote_ident(&c.name))
        .collect();
    let name_width = if options.align_columns {
        names.iter().map(|n| n.width()).max().unwrap_or(0)
    } else {
        0
    };

    output.push_str(&format!("CREATE TABLE {} (\n", table_name));
    let lines: Vec<String> = table
        .columns
        .iter()
        .zip(&names)
        .map(|(column, name)| column_line(column, name, name_width))
        .collect();
    output.push_str(&lines.join(",\n"));
    output.push_str("\n);\n");
}

fn column_line(column: &Column, name: &str, name_width: usize) -> String {
    let mut line = format!("  {}", name);
    if !column.data_type.is_empty() {
        let padding = name_width.saturating_sub(name.width());
        line.push_str(&" ".repeat(padding + 1));
        line.push_str(&column.data_type);
    }

    if column.primary_key {
        line.push_str(" PRIMARY KEY");
    } else if !column.nullable {
        line.push_str(" NOT NULL");
    }
    if column.unique {
        line.push_str(" UNIQUE");
    }
    line
}
