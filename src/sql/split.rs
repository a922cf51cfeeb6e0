//! Statement splitting and the ignore list.

use super::lexer::Token;

/// Statement prefixes that are discarded without further processing.
const IGNORED_PREFIXES: &[&[&str]] = &[
    &["SET"],
    &["USE"],
    &["CREATE", "DATABASE"],
    &["CREATE", "SCHEMA"],
    &["DROP", "TABLE"],
    &["INSERT", "INTO"],
];

/// Split a token stream into statements at `;`.
///
/// Empty statements are dropped and the trailing `Eof` is not part of any
/// statement.
pub fn split_statements(tokens: &[Token]) -> Vec<&[Token]> {
    tokens
        .split(|t| matches!(t, Token::Semicolon | Token::Eof))
        .filter(|stmt| !stmt.is_empty())
        .collect()
}

/// True if the statement starts with an ignored prefix.
pub fn is_ignored(statement: &[Token]) -> bool {
    IGNORED_PREFIXES.iter().any(|prefix| {
        prefix.len() <= statement.len()
            && prefix
                .iter()
                .zip(statement)
                .all(|(word, token)| token_matches(token, word))
    })
}

fn token_matches(token: &Token, word: &str) -> bool {
    match token {
        Token::Create => word == "CREATE",
        Token::Table => word == "TABLE",
        _ => token.is_word(word),
    }
}

/// Split `tokens` on commas that are not nested inside parentheses.
pub fn split_top_level(tokens: &[Token]) -> Vec<&[Token]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            Token::Comma if depth == 0 => {
                parts.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&tokens[start..]);

    parts.into_iter().filter(|p| !p.is_empty()).collect()
}
