//! SQL DDL to schema model conversion.

pub mod ast;
mod dialect;
mod lexer;
mod linker;
mod parser;
mod split;
mod types;

pub use dialect::Dialect;
pub use lexer::LexError;
pub use linker::Resolution;
pub use parser::{parse_sql, parse_statements, ParseOptions, SqlParseError};
