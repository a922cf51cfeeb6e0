//! SQL lexer for tokenizing DDL scripts.
//!
//! Comments are consumed here and never reach the token stream, which makes the
//! lexer the comment cleaner as well. String literals, quoted identifiers and
//! dollar-quoted bodies are scanned as single units, so `--`, `/*` and `;`
//! inside them are ordinary characters.

use std::iter::Peekable;
use std::str::Chars;

use thiserror::Error;

/// SQL token types.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Create,
    Alter,
    Add,
    Table,
    Only,
    Primary,
    Key,
    Foreign,
    References,
    Not,
    Null,
    Unique,
    Default,
    On,
    Constraint,
    Index,
    If,
    Exists,
    Check,

    // Identifiers and literals
    Ident(String),
    QuotedIdent(String),
    Str(String),
    Num(String),

    // Symbols
    LParen,
    RParen,
    Comma,
    Semicolon,
    Dot,
    /// `[]` array suffix (PostgreSQL)
    Brackets,

    // End of input
    Eof,
}

impl Token {
    /// Bare or quoted identifier text.
    pub fn name(&self) -> Option<&str> {
        match self {
            Token::Ident(s) | Token::QuotedIdent(s) => Some(s),
            _ => None,
        }
    }

    /// True for a bare identifier equal to `word`, ignoring case.
    pub fn is_word(&self, word: &str) -> bool {
        matches!(self, Token::Ident(s) if s.eq_ignore_ascii_case(word))
    }

    /// Upper-case source word of a keyword token.
    pub fn keyword_text(&self) -> Option<&'static str> {
        KEYWORDS
            .iter()
            .find(|(_, token)| token == self)
            .map(|(kw, _)| *kw)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum LexError {
    #[error("Unterminated string literal starting on line {0}")]
    UnterminatedString(usize),
    #[error("Unterminated quoted identifier starting on line {0}")]
    UnterminatedIdentifier(usize),
    #[error("Unterminated block comment starting on line {0}")]
    UnterminatedComment(usize),
}

/// Words the lexer turns into keyword tokens.
const KEYWORDS: &[(&str, Token)] = &[
    ("CREATE", Token::Create),
    ("ALTER", Token::Alter),
    ("ADD", Token::Add),
    ("TABLE", Token::Table),
    ("ONLY", Token::Only),
    ("PRIMARY", Token::Primary),
    ("KEY", Token::Key),
    ("FOREIGN", Token::Foreign),
    ("REFERENCES", Token::References),
    ("NOT", Token::Not),
    ("NULL", Token::Null),
    ("UNIQUE", Token::Unique),
    ("DEFAULT", Token::Default),
    ("ON", Token::On),
    ("CONSTRAINT", Token::Constraint),
    ("INDEX", Token::Index),
    ("IF", Token::If),
    ("EXISTS", Token::Exists),
    ("CHECK", Token::Check),
];

/// Returns true if `word` lexes as a keyword token rather than an identifier.
pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|(kw, _)| kw.eq_ignore_ascii_case(word))
}

/// SQL lexer.
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    current_char: Option<char>,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut chars = input.chars().peekable();
        let current_char = chars.next();
        Self {
            chars,
            current_char,
            line: 1,
        }
    }

    fn advance(&mut self) {
        if self.current_char == Some('\n') {
            self.line += 1;
        }
        self.current_char = self.chars.next();
    }

    fn peek(&mut self) -> Option<&char> {
        self.chars.peek()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current_char {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.current_char {
            self.advance();
            if c == '\n' {
                break;
            }
        }
    }

    /// Called with `current_char` on the `*` of `/*`.
    fn skip_block_comment(&mut self, start_line: usize) -> Result<(), LexError> {
        self.advance(); // skip *
        while let Some(c) = self.current_char {
            self.advance();
            if c == '*' && self.current_char == Some('/') {
                self.advance();
                return Ok(());
            }
        }
        Err(LexError::UnterminatedComment(start_line))
    }

    fn read_identifier(&mut self) -> String {
        let mut ident = String::new();
        while let Some(c) = self.current_char {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                ident.push(c);
                self.advance();
            } else {
                break;
            }
        }
        ident
    }

    fn read_quoted_identifier(&mut self, close: char) -> Result<String, LexError> {
        let start_line = self.line;
        self.advance(); // skip opening quote
        let mut ident = String::new();
        while let Some(c) = self.current_char {
            if c == close {
                // Doubled quote is an escaped quote
                if self.peek() == Some(&close) {
                    ident.push(c);
                    self.advance();
                    self.advance();
                } else {
                    self.advance(); // skip closing quote
                    return Ok(ident);
                }
            } else {
                ident.push(c);
                self.advance();
            }
        }
        Err(LexError::UnterminatedIdentifier(start_line))
    }

    fn read_string(&mut self) -> Result<String, LexError> {
        let start_line = self.line;
        self.advance(); // skip opening quote
        let mut s = String::new();
        while let Some(c) = self.current_char {
            if c == '\'' {
                if self.peek() == Some(&'\'') {
                    s.push(c);
                    self.advance();
                    self.advance();
                } else {
                    self.advance(); // skip closing quote
                    return Ok(s);
                }
            } else if c == '\\' {
                self.advance();
                if let Some(escaped) = self.current_char {
                    match escaped {
                        'n' => s.push('\n'),
                        't' => s.push('\t'),
                        'r' => s.push('\r'),
                        _ => s.push(escaped),
                    }
                    self.advance();
                }
            } else {
                s.push(c);
                self.advance();
            }
        }
        Err(LexError::UnterminatedString(start_line))
    }

    /// Reads `$tag$ ... $tag$`. Returns `None` when the `$` does not open a
    /// dollar quote (e.g. a `$1` placeholder), in which case the scanned
    /// characters are dropped.
    fn read_dollar_string(&mut self) -> Result<Option<String>, LexError> {
        let start_line = self.line;
        self.advance(); // skip $
        let mut tag = String::new();
        while let Some(c) = self.current_char {
            if c == '$' {
                break;
            }
            if c.is_alphanumeric() || c == '_' {
                tag.push(c);
                self.advance();
            } else {
                return Ok(None);
            }
        }
        if self.current_char != Some('$') || tag.starts_with(|c: char| c.is_ascii_digit()) {
            return Ok(None);
        }
        self.advance(); // skip closing $ of the opening delimiter

        let delimiter = format!("${}$", tag);
        let mut body = String::new();
        while let Some(c) = self.current_char {
            body.push(c);
            self.advance();
            if body.ends_with(&delimiter) {
                body.truncate(body.len() - delimiter.len());
                return Ok(Some(body));
            }
        }
        Err(LexError::UnterminatedString(start_line))
    }

    fn read_number(&mut self) -> String {
        let mut num = String::new();
        let mut has_dot = false;

        if self.current_char == Some('-') {
            num.push('-');
            self.advance();
        }

        while let Some(c) = self.current_char {
            if c.is_ascii_digit() {
                num.push(c);
                self.advance();
            } else if c == '.' && !has_dot {
                has_dot = true;
                num.push(c);
                self.advance();
            } else {
                break;
            }
        }
        num
    }

    fn keyword_or_ident(&self, s: String) -> Token {
        KEYWORDS
            .iter()
            .find(|(kw, _)| kw.eq_ignore_ascii_case(&s))
            .map(|(_, token)| token.clone())
            .unwrap_or(Token::Ident(s))
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        loop {
            self.skip_whitespace();

            match self.current_char {
                None => return Ok(Token::Eof),

                Some('-') => {
                    if self.peek() == Some(&'-') {
                        self.skip_line_comment();
                        continue;
                    } else if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                        return Ok(Token::Num(self.read_number()));
                    } else {
                        self.advance();
                        continue; // Skip standalone dash
                    }
                }

                Some('/') => {
                    let start_line = self.line;
                    self.advance();
                    if self.current_char == Some('*') {
                        self.skip_block_comment(start_line)?;
                    }
                    continue;
                }

                Some('#') => {
                    self.skip_line_comment();
                    continue;
                }

                Some('(') => {
                    self.advance();
                    return Ok(Token::LParen);
                }
                Some(')') => {
                    self.advance();
                    return Ok(Token::RParen);
                }
                Some(',') => {
                    self.advance();
                    return Ok(Token::Comma);
                }
                Some(';') => {
                    self.advance();
                    return Ok(Token::Semicolon);
                }
                Some('.') => {
                    self.advance();
                    return Ok(Token::Dot);
                }

                Some('"') => return Ok(Token::QuotedIdent(self.read_quoted_identifier('"')?)),
                Some('`') => return Ok(Token::QuotedIdent(self.read_quoted_identifier('`')?)),
                Some('[') => {
                    if self.peek() == Some(&']') {
                        self.advance();
                        self.advance();
                        return Ok(Token::Brackets);
                    }
                    // SQL Server style [identifier]
                    return Ok(Token::QuotedIdent(self.read_quoted_identifier(']')?));
                }

                Some('\'') => return Ok(Token::Str(self.read_string()?)),

                Some('$') => {
                    if let Some(body) = self.read_dollar_string()? {
                        return Ok(Token::Str(body));
                    }
                    continue;
                }

                Some(c) if c.is_ascii_digit() => {
                    return Ok(Token::Num(self.read_number()));
                }

                Some(c) if c.is_alphabetic() || c == '_' => {
                    let ident = self.read_identifier();
                    return Ok(self.keyword_or_ident(ident));
                }

                Some(_) => {
                    // Skip unknown characters (=, :, etc.)
                    self.advance();
                    continue;
                }
            }
        }
    }

    /// Collect all tokens, ending with `Token::Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            if token == Token::Eof {
                tokens.push(token);
                break;
            }
            tokens.push(token);
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(sql: &str) -> Vec<Token> {
        Lexer::new(sql).tokenize().unwrap()
    }

    #[test]
    fn test_simple_create_table() {
        let tokens = lex("CREATE TABLE users (id INT);");

        assert_eq!(tokens[0], Token::Create);
        assert_eq!(tokens[1], Token::Table);
        assert_eq!(tokens[2], Token::Ident("users".to_string()));
        assert_eq!(tokens[3], Token::LParen);
        assert_eq!(tokens[4], Token::Ident("id".to_string()));
        assert_eq!(tokens[5], Token::Ident("INT".to_string()));
        assert_eq!(tokens[6], Token::RParen);
        assert_eq!(tokens[7], Token::Semicolon);
        assert_eq!(tokens[8], Token::Eof);
    }

    #[test]
    fn test_quoted_identifiers() {
        let sql = r#"CREATE TABLE "User Table" (`column name` INT, [dbo col] INT);"#;
        let tokens = lex(sql);

        assert_eq!(tokens[2], Token::QuotedIdent("User Table".to_string()));
        assert_eq!(tokens[4], Token::QuotedIdent("column name".to_string()));
        assert_eq!(tokens[7], Token::QuotedIdent("dbo col".to_string()));
    }

    #[test]
    fn test_quoted_keyword_stays_identifier() {
        let tokens = lex(r#""key" `primary`"#);
        assert_eq!(tokens[0], Token::QuotedIdent("key".to_string()));
        assert_eq!(tokens[1], Token::QuotedIdent("primary".to_string()));
    }

    #[test]
    fn test_keyword_text() {
        assert_eq!(Token::Key.keyword_text(), Some("KEY"));
        assert_eq!(Token::Index.keyword_text(), Some("INDEX"));
        assert_eq!(Token::Ident("key".to_string()).keyword_text(), None);
    }

    #[test]
    fn test_doubled_quote_escape() {
        let tokens = lex(r#""a""b" 'it''s'"#);
        assert_eq!(tokens[0], Token::QuotedIdent("a\"b".to_string()));
        assert_eq!(tokens[1], Token::Str("it's".to_string()));
    }

    #[test]
    fn test_comments() {
        let tokens = lex("-- comment\nCREATE /* block */ TABLE # mysql\n t (id INT);");

        assert_eq!(tokens[0], Token::Create);
        assert_eq!(tokens[1], Token::Table);
        assert_eq!(tokens[2], Token::Ident("t".to_string()));
    }

    #[test]
    fn test_comment_markers_inside_string() {
        let tokens = lex("DEFAULT '-- not a comment; /* nor this */'");
        assert_eq!(tokens[0], Token::Default);
        assert_eq!(
            tokens[1],
            Token::Str("-- not a comment; /* nor this */".to_string())
        );
        assert_eq!(tokens[2], Token::Eof);
    }

    #[test]
    fn test_conditional_comment_is_skipped() {
        let tokens = lex("/*!40101 SET NAMES utf8 */;");
        assert_eq!(tokens, vec![Token::Semicolon, Token::Eof]);
    }

    #[test]
    fn test_dollar_quoted_body() {
        let tokens = lex("AS $$ BEGIN; RETURN 1; END $$;");
        assert_eq!(tokens[1], Token::Str(" BEGIN; RETURN 1; END ".to_string()));
        assert_eq!(tokens[2], Token::Semicolon);

        let tokens = lex("$fn$ a $$ b $fn$");
        assert_eq!(tokens[0], Token::Str(" a $$ b ".to_string()));
    }

    #[test]
    fn test_array_suffix() {
        let tokens = lex("tags TEXT[]");
        assert_eq!(tokens[2], Token::Brackets);
    }

    #[test]
    fn test_keywords_case_insensitive() {
        let tokens = lex("primary Key not NULL");
        assert_eq!(
            tokens,
            vec![Token::Primary, Token::Key, Token::Not, Token::Null, Token::Eof]
        );
        assert!(is_keyword("references"));
        assert!(!is_keyword("users"));
    }

    #[test]
    fn test_unterminated_constructs() {
        assert_eq!(
            Lexer::new("a\n'open").tokenize(),
            Err(LexError::UnterminatedString(2))
        );
        assert_eq!(
            Lexer::new("\"open").tokenize(),
            Err(LexError::UnterminatedIdentifier(1))
        );
        assert_eq!(
            Lexer::new("x /* open\n").tokenize(),
            Err(LexError::UnterminatedComment(1))
        );
    }

    #[test]
    fn test_is_word_only_matches_bare() {
        assert!(Token::Ident("Set".to_string()).is_word("SET"));
        assert!(!Token::QuotedIdent("SET".to_string()).is_word("SET"));
    }
}
