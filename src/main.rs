use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ddlcanvas::SchemaView;
use ddlcanvas::edit::Edit;
use ddlcanvas::generator::{GenerateOptions, generate};
use ddlcanvas::model::Schema;
use ddlcanvas::sql::{Dialect, ParseOptions, Resolution, parse_sql};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ddlcanvas", version, about = "SQL DDL <-> schema model converter")]
struct Cli {
    /// Log debug diagnostics (dropped constraints, skipped statements)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a SQL script into schema JSON
    Parse {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Resolve constraints in statement order instead of after the whole script
        #[arg(long)]
        source_order: bool,
        /// Write JSON on a single line
        #[arg(long)]
        compact: bool,
    },
    /// Generate a SQL script from schema JSON
    Generate {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Identifier quoting: generic, postgres, mysql
        #[arg(short, long, default_value = "generic", value_parser = parse_dialect)]
        dialect: Dialect,
        /// Align column types
        #[arg(long)]
        align: bool,
    },
    /// Parse a SQL script and write it back in normalized form
    Format {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Identifier quoting; auto detects it from the input
        #[arg(short, long, default_value = "auto", value_parser = parse_dialect)]
        dialect: Dialect,
        #[arg(long)]
        source_order: bool,
        #[arg(long)]
        align: bool,
    },
    /// Apply a JSON array of edits to schema JSON
    Edit {
        schema: PathBuf,
        edits: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_dialect(name: &str) -> Result<Dialect, String> {
    Dialect::from_str(name)
        .ok_or_else(|| format!("unknown dialect: {}", name))
}

fn parse_options(source_order: bool) -> ParseOptions {
    ParseOptions {
        resolution: if source_order {
            Resolution::SourceOrder
        } else {
            Resolution::Deferred
        },
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))
}

fn write(output: Option<&Path>, content: &str) -> Result<()> {
    let Some(path) = output else {
        print!("{}", content);
        return Ok(());
    };
    fs::write(path, content)
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Parse {
            input,
            output,
            source_order,
            compact,
        } => {
            let source = read(&input)?;
            let schema = parse_sql(&source, parse_options(source_order))
                .with_context(|| format!("Failed to parse {}", input.display()))?;
            tracing::info!(tables = schema.tables.len(), "parsed schema");
            let view = SchemaView::new(&schema);
            let mut json = if compact {
                serde_json::to_string(&view)?
            } else {
                serde_json::to_string_pretty(&view)?
            };
            json.push('\n');
            write(output.as_deref(), &json)
        }
        Command::Generate {
            input,
            output,
            dialect,
            align,
        } => {
            let schema = Schema::from_json(&read(&input)?)
                .with_context(|| format!("Invalid schema in {}", input.display()))?;
            let options = GenerateOptions {
                dialect,
                align_columns: align,
            };
            write(output.as_deref(), &generate(&schema, options))
        }
        Command::Format {
            input,
            output,
            dialect,
            source_order,
            align,
        } => {
            let source = read(&input)?;
            let schema = parse_sql(&source, parse_options(source_order))
                .with_context(|| format!("Failed to parse {}", input.display()))?;
            let options = GenerateOptions {
                dialect: dialect.resolve(&source),
                align_columns: align,
            };
            write(output.as_deref(), &generate(&schema, options))
        }
        Command::Edit {
            schema,
            edits,
            output,
        } => {
            let mut model = Schema::from_json(&read(&schema)?)
                .with_context(|| format!("Invalid schema in {}", schema.display()))?;
            let edits: Vec<Edit> = serde_json::from_str(&read(&edits)?)
                .with_context(|| format!("Invalid edits in {}", edits.display()))?;
            let count = edits.len();
            model.apply_all(edits)?;
            tracing::info!(edits = count, "applied edits");
            let mut json = serde_json::to_string_pretty(&model)?;
            json.push('\n');
            write(output.as_deref(), &json)
        }
    }
}
