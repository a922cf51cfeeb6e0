//! Column type text.
//!
//! Types are kept verbatim; this module only turns the type's tokens back into
//! compact text such as `DECIMAL(10,2)` or `ENUM('a','b')`.

use super::lexer::Token;

/// Words that continue a type after its base word.
const TYPE_CONTINUATIONS: &[&str] = &[
    "UNSIGNED",
    "SIGNED",
    "ZEROFILL",
    "PRECISION",
    "VARYING",
    "WITH",
    "WITHOUT",
    "TIME",
    "ZONE",
];

/// True if `token` continues a column type (`INT UNSIGNED`, `DOUBLE PRECISION`).
pub fn is_type_continuation(token: &Token) -> bool {
    TYPE_CONTINUATIONS.iter().any(|w| token.is_word(w))
}

/// Render a type parameter list. `tokens` are the tokens between the
/// parentheses, exclusive.
pub fn format_params(tokens: &[Token]) -> String {
    let mut out = String::from("(");
    let mut prev_wordlike = false;
    for token in tokens {
        let wordlike = matches!(
            token,
            Token::Ident(_) | Token::QuotedIdent(_) | Token::Num(_) | Token::Str(_)
        );
        if wordlike && prev_wordlike {
            out.push(' ');
        }
        push_token(&mut out, token);
        prev_wordlike = wordlike;
    }
    out.push(')');
    out
}

/// Append the source form of a token that can appear inside a type.
pub fn push_token(out: &mut String, token: &Token) {
    match token {
        Token::Ident(s) | Token::Num(s) => out.push_str(s),
        Token::QuotedIdent(s) => {
            out.push('"');
            out.push_str(&s.replace('"', "\"\""));
            out.push('"');
        }
        Token::Str(s) => {
            out.push('\'');
            out.push_str(&s.replace('\\', "\\\\").replace('\'', "''"));
            out.push('\'');
        }
        Token::LParen => out.push('('),
        Token::RParen => out.push(')'),
        Token::Comma => out.push(','),
        Token::Dot => out.push('.'),
        Token::Brackets => out.push_str("[]"),
        _ => {}
    }
}
