//! SQL grammar for CREATE TABLE and ALTER TABLE statements.
//!
//! The grammar is recursive descent over the token slice of one statement at a
//! time. It never fails on malformed content: whatever it cannot recognize is
//! classified as [`Clause::Other`] or the whole statement is skipped.

use super::ast::{
    AlterTable, Clause, ColumnDef, CreateTable, Reference, Statement, TableConstraint,
};
use super::lexer::{LexError, Lexer, Token};
use super::linker::{Linker, Resolution};
use super::split::{is_ignored, split_statements, split_top_level};
use super::types::{format_params, is_type_continuation, push_token};
use crate::model::Schema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SqlParseError {
    #[error("Lex error: {0}")]
    Lex(#[from] LexError),
}

/// Parser configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseOptions {
    pub resolution: Resolution,
}

/// Parse a DDL script into a Schema.
pub fn parse_sql(input: &str, options: ParseOptions) -> Result<Schema, SqlParseError> {
    let statements = parse_statements(input)?;
    let mut linker = Linker::new(options.resolution);
    for statement in statements {
        linker.add_statement(statement);
    }
    Ok(linker.finish())
}

/// Parse a DDL script into its statement AST, skipping statements that do
/// not affect the schema.
pub fn parse_statements(input: &str) -> Result<Vec<Statement>, SqlParseError> {
    let tokens = Lexer::new(input).tokenize()?;

    let statements = split_statements(&tokens)
        .into_iter()
        .filter(|stmt| {
            let ignored = is_ignored(stmt);
            if ignored {
                tracing::trace!(first = ?stmt[0], "skipping ignored statement");
            }
            !ignored
        })
        .filter_map(|stmt| Parser::new(stmt).parse_statement())
        .collect();

    Ok(statements)
}

static EOF: Token = Token::Eof;

/// Words that may precede TABLE in a CREATE statement.
const TABLE_MODIFIERS: &[&str] = &["TEMPORARY", "TEMP", "UNLOGGED", "GLOBAL", "LOCAL"];

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn current(&self) -> &'a Token {
        self.tokens.get(self.pos).unwrap_or(&EOF)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Consume `token` if it is next.
    fn eat(&mut self, token: &Token) -> bool {
        if self.current() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn parse_statement(&mut self) -> Option<Statement> {
        match self.current() {
            Token::Create => self.parse_create_table().map(Statement::CreateTable),
            Token::Alter => self.parse_alter_table().map(Statement::AlterTable),
            other => {
                tracing::trace!(first = ?other, "skipping unsupported statement");
                None
            }
        }
    }

    /// Bare or quoted name; `schema.table` yields `table`.
    fn parse_object_name(&mut self) -> Option<String> {
        let mut name = self.current().name()?.to_string();
        self.advance();
        while self.current() == &Token::Dot {
            self.advance();
            match self.current().name() {
                Some(part) => {
                    name = part.to_string();
                    self.advance();
                }
                None => break,
            }
        }
        Some(name)
    }

    fn parse_create_table(&mut self) -> Option<CreateTable> {
        self.advance(); // CREATE

        while TABLE_MODIFIERS.iter().any(|m| self.current().is_word(m)) {
            self.advance();
        }

        if !self.eat(&Token::Table) {
            // CREATE INDEX, VIEW, FUNCTION, ...
            tracing::trace!(kind = ?self.current(), "skipping CREATE statement");
            return None;
        }

        let mut if_not_exists = false;
        if self.eat(&Token::If) {
            self.eat(&Token::Not);
            self.eat(&Token::Exists);
            if_not_exists = true;
        }

        let name = self.parse_object_name()?;

        let clauses = self
            .parenthesized()
            .map(split_top_level)
            .unwrap_or_default()
            .into_iter()
            .map(parse_clause)
            .collect();

        Some(CreateTable {
            name,
            if_not_exists,
            clauses,
        })
    }

    fn parse_alter_table(&mut self) -> Option<AlterTable> {
        self.advance(); // ALTER

        if !self.eat(&Token::Table) {
            return None;
        }
        self.eat(&Token::Only);
        if self.eat(&Token::If) {
            self.eat(&Token::Exists);
        }
        self.eat(&Token::Only);

        let name = self.parse_object_name()?;

        let constraints = split_top_level(&self.tokens[self.pos..])
            .into_iter()
            .filter_map(|action| match action.split_first() {
                Some((Token::Add, rest)) => match parse_clause(rest) {
                    Clause::Constraint(constraint) => Some(constraint),
                    _ => None,
                },
                _ => None,
            })
            .collect();

        Some(AlterTable { name, constraints })
    }

    /// If the current token is `(`, consume through the matching `)` and
    /// return the tokens in between. An unclosed list runs to the end.
    fn parenthesized(&mut self) -> Option<&'a [Token]> {
        if self.current() != &Token::LParen {
            return None;
        }
        self.advance();
        let tokens = self.tokens;
        let start = self.pos;
        let mut depth = 1;
        while !self.at_end() {
            match self.current() {
                Token::LParen => depth += 1,
                Token::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        let inner = &tokens[start..self.pos];
                        self.advance();
                        return Some(inner);
                    }
                }
                _ => {}
            }
            self.advance();
        }
        Some(&tokens[start..])
    }

    /// `(a, b(10), c DESC)` → `["a", "b", "c"]`
    fn parse_column_list(&mut self) -> Vec<String> {
        match self.parenthesized() {
            Some(inner) => split_top_level(inner)
                .into_iter()
                .filter_map(|item| item.first().and_then(Token::name))
                .map(str::to_string)
                .collect(),
            None => Vec::new(),
        }
    }

    /// `REFERENCES` has been consumed.
    fn parse_reference(&mut self) -> Option<Reference> {
        let table = self.parse_object_name()?;
        let columns = self.parse_column_list();
        Some(Reference { table, columns })
    }

    fn parse_table_constraint(&mut self) -> Clause {
        match self.current() {
            Token::Primary => {
                self.advance();
                if !self.eat(&Token::Key) {
                    return Clause::Other;
                }
                // MySQL allows USING BTREE before the column list
                while !self.at_end() && self.current() != &Token::LParen {
                    self.advance();
                }
                let columns = self.parse_column_list();
                if columns.is_empty() {
                    return Clause::Other;
                }
                Clause::Constraint(TableConstraint::PrimaryKey { columns })
            }
            Token::Foreign => {
                self.advance();
                if !self.eat(&Token::Key) {
                    return Clause::Other;
                }
                // Optional index name (MySQL)
                if self.current().name().is_some() {
                    self.advance();
                }
                let columns = self.parse_column_list();
                if columns.is_empty() || !self.eat(&Token::References) {
                    return Clause::Other;
                }
                match self.parse_reference() {
                    Some(reference) => {
                        Clause::Constraint(TableConstraint::ForeignKey { columns, reference })
                    }
                    None => Clause::Other,
                }
            }
            Token::Unique | Token::Key | Token::Index => Clause::Index,
            t if t.is_word("FULLTEXT") || t.is_word("SPATIAL") => Clause::Index,
            Token::Check => Clause::Check,
            _ => Clause::Other,
        }
    }

    fn parse_column(&mut self) -> Option<ColumnDef> {
        let name = match self.current() {
            // Unquoted keywords fold to lower case, as PostgreSQL does
            Token::Key | Token::Index => self.current().keyword_text()?.to_lowercase(),
            other => other.name()?.to_string(),
        };
        self.advance();

        let data_type = self.parse_data_type();

        let mut column = ColumnDef {
            name,
            data_type,
            primary_key: false,
            not_null: false,
            unique: false,
            references: None,
        };

        while !self.at_end() {
            match self.current() {
                Token::Primary => {
                    self.advance();
                    if self.eat(&Token::Key) {
                        column.primary_key = true;
                    }
                }
                Token::Not => {
                    self.advance();
                    if self.eat(&Token::Null) {
                        column.not_null = true;
                    }
                }
                Token::Unique => {
                    self.advance();
                    self.eat(&Token::Key);
                    column.unique = true;
                }
                Token::Default => {
                    self.advance();
                    self.skip_value();
                }
                Token::References => {
                    self.advance();
                    if let Some(reference) = self.parse_reference() {
                        column.references = Some(reference);
                    }
                }
                Token::Constraint => {
                    self.advance();
                    if self.current().name().is_some() {
                        self.advance();
                    }
                }
                Token::LParen => {
                    self.parenthesized();
                }
                _ => self.advance(),
            }
        }

        Some(column)
    }

    /// Base word, optional qualifier, parameters, array suffix and
    /// continuation words, e.g. `public.order_status`, `DECIMAL(10,2)`,
    /// `TIMESTAMP(3) WITH TIME ZONE`, `TEXT[]`.
    fn parse_data_type(&mut self) -> String {
        let mut ty = String::new();
        let base = self.current();
        if !matches!(base, Token::Ident(_)) {
            return ty;
        }
        push_token(&mut ty, base);
        self.advance();

        while self.current() == &Token::Dot {
            let part = self.tokens.get(self.pos + 1);
            match part {
                Some(t @ (Token::Ident(_) | Token::QuotedIdent(_))) => {
                    ty.push('.');
                    push_token(&mut ty, t);
                    self.advance();
                    self.advance();
                }
                _ => break,
            }
        }

        loop {
            match self.current() {
                Token::LParen if !ty.ends_with(')') => {
                    if let Some(params) = self.parenthesized() {
                        ty.push_str(&format_params(params));
                    }
                }
                Token::Brackets => {
                    ty.push_str("[]");
                    self.advance();
                }
                t if is_type_continuation(t) => {
                    ty.push(' ');
                    push_token(&mut ty, t);
                    self.advance();
                }
                _ => break,
            }
        }

        ty
    }

    /// Skip one DEFAULT value: a literal, a function call or a parenthesized
    /// expression.
    fn skip_value(&mut self) {
        match self.current() {
            Token::LParen => {
                self.parenthesized();
            }
            Token::Ident(_) => {
                self.advance();
                if self.current() == &Token::LParen {
                    self.parenthesized();
                }
            }
            _ => self.advance(),
        }
    }
}

/// Classify one clause of a CREATE TABLE body (or one ALTER TABLE ADD action).
fn parse_clause(tokens: &[Token]) -> Clause {
    let mut parser = Parser::new(tokens);

    if parser.eat(&Token::Constraint) {
        if parser.current().name().is_some() {
            parser.advance();
        }
        return parser.parse_table_constraint();
    }

    let is_column = match parser.current() {
        Token::Ident(_) | Token::QuotedIdent(_) => {
            !(parser.current().is_word("FULLTEXT") || parser.current().is_word("SPATIAL"))
        }
        Token::Key | Token::Index => is_keyword_column(tokens),
        _ => false,
    };

    if !is_column {
        return parser.parse_table_constraint();
    }
    match parser.parse_column() {
        Some(column) => Clause::Column(column),
        None => Clause::Other,
    }
}

/// `key TEXT` and `index INT` define columns; `KEY idx (a)`,
/// `INDEX idx USING BTREE (a)` and `KEY idx ((lower(a)))` define indexes.
fn is_keyword_column(tokens: &[Token]) -> bool {
    match tokens {
        [_, Token::Ident(_), Token::LParen, Token::Ident(_) | Token::QuotedIdent(_), ..] => false,
        [_, Token::Ident(_), Token::LParen, Token::LParen, ..] => false,
        [_, Token::Ident(_), using, ..] if using.is_word("USING") => false,
        [_, Token::Ident(_), ..] => true,
        _ => false,
    }
}
