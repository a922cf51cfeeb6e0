//! SQL dialect detection and identifier quoting.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use super::lexer::is_keyword;

/// Bare words that start a non-column clause in a CREATE TABLE body and
/// therefore cannot name a column unquoted.
const CLAUSE_WORDS: &[&str] = &["FULLTEXT", "SPATIAL"];

/// SQL dialect variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Auto-detect from dump content
    #[default]
    Auto,
    /// Standard SQL
    Generic,
    /// PostgreSQL
    #[serde(rename = "postgres", alias = "postgresql")]
    PostgreSQL,
    /// MySQL
    #[serde(rename = "mysql")]
    MySQL,
}

impl Dialect {
    /// Parse dialect from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "generic" => Some(Self::Generic),
            "postgres" | "postgresql" => Some(Self::PostgreSQL),
            "mysql" | "mariadb" => Some(Self::MySQL),
            _ => None,
        }
    }

    /// Detect dialect from SQL content.
    pub fn detect(content: &str) -> Self {
        let lower = content.to_lowercase();

        // Dump headers win over body heuristics
        if lower.contains("postgresql database dump")
            || lower.contains("pg_dump")
            || lower.contains("-- postgres")
        {
            return Self::PostgreSQL;
        }
        if lower.contains("mysql dump")
            || lower.contains("mysqldump")
            || lower.contains("mariadb dump")
            || lower.contains("-- mysql")
        {
            return Self::MySQL;
        }

        if lower.contains("serial")
            || lower.contains("[]")
            || lower.contains("::")
            || lower.contains("timestamptz")
        {
            return Self::PostgreSQL;
        }
        if lower.contains("auto_increment")
            || lower.contains("tinyint")
            || lower.contains("engine=")
            || lower.contains("unsigned")
            || lower.contains('`')
        {
            return Self::MySQL;
        }

        Self::Generic
    }

    /// Resolve Auto to a concrete dialect.
    pub fn resolve(self, content: &str) -> Self {
        match self {
            Self::Auto => Self::detect(content),
            other => other,
        }
    }

    /// Quote character used for identifiers that cannot be written bare.
    pub fn quote_char(self) -> char {
        match self {
            Self::MySQL => '`',
            _ => '"',
        }
    }

    /// Write `name` so that it lexes back as the same identifier.
    pub fn quote_ident(self, name: &str) -> Cow<'_, str> {
        if is_bare_identifier(name) {
            return Cow::Borrowed(name);
        }
        let quote = self.quote_char();
        let mut quoted = String::with_capacity(name.len() + 2);
        quoted.push(quote);
        for c in name.chars() {
            if c == quote {
                quoted.push(quote);
            }
            quoted.push(c);
        }
        quoted.push(quote);
        Cow::Owned(quoted)
    }
}

/// True if `name` can be written without quotes.
fn is_bare_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_well = chars.next().is_some_and(|c| c.is_alphabetic() || c == '_');
    starts_well
        && chars.all(|c| c.is_alphanumeric() || c == '_')
        && !is_keyword(name)
        && !CLAUSE_WORDS.iter().any(|w| w.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_from_dump_headers() {
        let pg = "--\n-- PostgreSQL database dump\n--\nCREATE TABLE t (id integer);";
        let my = "-- MySQL dump 10.13  Distrib 8.0.36\nCREATE TABLE t (id int);";
        assert_eq!(Dialect::detect(pg), Dialect::PostgreSQL);
        assert_eq!(Dialect::detect(my), Dialect::MySQL);
    }

    #[test]
    fn test_detect_from_body() {
        let cases = [
            ("CREATE TABLE t (id BIGSERIAL, tags TEXT[]);", Dialect::PostgreSQL),
            ("CREATE TABLE `t` (id INT);", Dialect::MySQL),
            ("CREATE TABLE t (n INT UNSIGNED);", Dialect::MySQL),
            ("CREATE TABLE t (id INTEGER);", Dialect::Generic),
        ];
        for (sql, expected) in cases {
            assert_eq!(Dialect::detect(sql), expected, "{}", sql);
        }
    }

    #[test]
    fn test_resolve_keeps_explicit_choice() {
        let sql = "CREATE TABLE t (id INT AUTO_INCREMENT);";
        assert_eq!(Dialect::Auto.resolve(sql), Dialect::MySQL);
        assert_eq!(Dialect::PostgreSQL.resolve(sql), Dialect::PostgreSQL);
    }

    #[test]
    fn test_from_str() {
        assert_eq!(Dialect::from_str("PostgreSQL"), Some(Dialect::PostgreSQL));
        assert_eq!(Dialect::from_str("mariadb"), Some(Dialect::MySQL));
        assert_eq!(Dialect::from_str("oracle"), None);
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(Dialect::Generic.quote_ident("users"), "users");
        assert_eq!(Dialect::Generic.quote_ident("user table"), "\"user table\"");
        assert_eq!(Dialect::Generic.quote_ident("key"), "\"key\"");
        assert_eq!(Dialect::Generic.quote_ident("fulltext"), "\"fulltext\"");
        assert_eq!(Dialect::Generic.quote_ident("1st"), "\"1st\"");
        assert_eq!(Dialect::Generic.quote_ident(""), "\"\"");
        assert_eq!(Dialect::Generic.quote_ident("a\"b"), "\"a\"\"b\"");
        assert_eq!(Dialect::MySQL.quote_ident("order by"), "`order by`");
    }
}
