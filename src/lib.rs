pub mod edit;
pub mod generator;
pub mod model;
pub mod sql;

use serde::Serialize;
use wasm_bindgen::prelude::*;

use edit::Edit;
use generator::{GenerateOptions, generate};
use model::{Relationship, Schema, Table};
use sql::{Dialect, ParseOptions, Resolution, parse_sql};

/// Parse result handed to the diagram editor.
#[derive(Debug, Serialize)]
pub struct SchemaView<'a> {
    pub tables: &'a [Table],
    pub relationships: Vec<Relationship>,
}

impl<'a> SchemaView<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            tables: &schema.tables,
            relationships: schema.relationships(),
        }
    }
}

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Parse DDL into `{tables, relationships}` JSON.
#[wasm_bindgen(js_name = "parseSql")]
pub fn parse_sql_json(source: &str, source_order: Option<bool>) -> Result<String, String> {
    let options = ParseOptions {
        resolution: if source_order.unwrap_or(false) {
            Resolution::SourceOrder
        } else {
            Resolution::Deferred
        },
    };
    let schema = parse_sql(source, options).map_err(|e| e.to_string())?;
    let view = SchemaView::new(&schema);
    serde_json::to_string(&view).map_err(|e| e.to_string())
}

/// Generate DDL from schema JSON.
#[wasm_bindgen(js_name = "generateSql")]
pub fn generate_sql_json(schema_json: &str, dialect: Option<String>) -> Result<String, String> {
    let schema = Schema::from_json(schema_json).map_err(|e| e.to_string())?;
    let dialect = match dialect.as_deref() {
        None => Dialect::Generic,
        Some(name) => match Dialect::from_str(name) {
            Some(dialect) => dialect,
            None => return Err(format!("Unknown dialect: {}", name)),
        },
    };
    let options = GenerateOptions {
        dialect,
        ..GenerateOptions::default()
    };
    Ok(generate(&schema, options))
}

/// Apply a JSON array of edits to schema JSON and return the edited schema.
#[wasm_bindgen(js_name = "applyEdits")]
pub fn apply_edits_json(schema_json: &str, edits_json: &str) -> Result<String, String> {
    let mut schema = Schema::from_json(schema_json).map_err(|e| e.to_string())?;
    let edits: Vec<Edit> = serde_json::from_str(edits_json).map_err(|e| e.to_string())?;
    schema.apply_all(edits).map_err(|e| e.to_string())?;
    serde_json::to_string(&schema).map_err(|e| e.to_string())
}

/// Relationship edges for schema JSON.
#[wasm_bindgen(js_name = "relationships")]
pub fn relationships_json(schema_json: &str) -> Result<String, String> {
    let schema = Schema::from_json(schema_json).map_err(|e| e.to_string())?;
    let relationships = schema.relationships();
    serde_json::to_string(&relationships).map_err(|e| e.to_string())
}
