//! Tokenizer for the restricted formula grammar.
//!
//! The whole text is tokenized before parsing starts. Characters that
//! introduce constructs outside the grammar (assignment, comparison,
//! indexing, attribute access, strings, reserved words, ...) are rejected
//! here as validation errors, so a forbidden construct is reported as such
//! no matter where it appears or what surrounds it.

use crate::error::FormulaError;

/// Words that start statements or non-arithmetic expressions.
const RESERVED: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await",
    "break", "class", "continue", "def", "del", "elif", "else", "except",
    "finally", "for", "from", "global", "if", "import", "in", "is", "lambda",
    "nonlocal", "not", "or", "pass", "raise", "return", "try", "while",
    "with", "yield",
];

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Power,
    LParen,
    RParen,
    Comma,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character of the token.
    pub position: usize,
}

/// Splits `source` into tokens, always ending with [`TokenKind::Eof`].
pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, FormulaError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;
        let c = bytes[pos];

        let kind = match c {
            b' ' | b'\t' | b'\r' | b'\n' => {
                pos += 1;
                continue;
            }
            b'0'..=b'9' => {
                let (value, end) = lex_number(source, start)?;
                pos = end;
                TokenKind::Number(value)
            }
            b'.' => {
                if bytes.get(pos + 1).is_some_and(u8::is_ascii_digit) {
                    let (value, end) = lex_number(source, start)?;
                    pos = end;
                    TokenKind::Number(value)
                } else if bytes.get(pos + 1).is_some_and(|&b| is_ident_start(b))
                {
                    return Err(FormulaError::disallowed(
                        start,
                        "attribute access `.`",
                    ));
                } else {
                    return Err(FormulaError::syntax(start, "unexpected `.`"));
                }
            }
            c if is_ident_start(c) => {
                while pos < bytes.len() && is_ident_continue(bytes[pos]) {
                    pos += 1;
                }
                let word = &source[start..pos];
                if RESERVED.contains(&word) {
                    return Err(FormulaError::disallowed(
                        start,
                        format!("keyword `{word}`"),
                    ));
                }
                TokenKind::Ident(word.to_string())
            }
            b'+' => {
                pos += 1;
                TokenKind::Plus
            }
            b'-' => {
                pos += 1;
                TokenKind::Minus
            }
            b'*' => {
                if bytes.get(pos + 1) == Some(&b'*') {
                    pos += 2;
                    TokenKind::Power
                } else {
                    pos += 1;
                    TokenKind::Star
                }
            }
            b'/' => {
                if bytes.get(pos + 1) == Some(&b'/') {
                    return Err(FormulaError::disallowed(
                        start,
                        "floor division `//`",
                    ));
                }
                pos += 1;
                TokenKind::Slash
            }
            b'%' => {
                pos += 1;
                TokenKind::Percent
            }
            b'^' => {
                pos += 1;
                TokenKind::Power
            }
            b'(' => {
                pos += 1;
                TokenKind::LParen
            }
            b')' => {
                pos += 1;
                TokenKind::RParen
            }
            b',' => {
                pos += 1;
                TokenKind::Comma
            }
            other => {
                if let Some(construct) = disallowed_symbol(bytes, pos) {
                    return Err(FormulaError::disallowed(start, construct));
                }
                let ch = source[start..].chars().next().unwrap_or('?');
                let message = if other.is_ascii() {
                    format!("unexpected character `{ch}`")
                } else {
                    format!("unsupported character `{ch}`")
                };
                return Err(FormulaError::syntax(start, message));
            }
        };

        tokens.push(Token {
            kind,
            position: start,
        });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        position: bytes.len(),
    });
    Ok(tokens)
}

/// Lexes `digits [. digits] [(e|E) [+-] digits]` or `. digits ...`
/// starting at `start`. Returns the value and the end offset.
fn lex_number(
    source: &str,
    start: usize,
) -> Result<(f64, usize), FormulaError> {
    let bytes = source.as_bytes();
    let mut pos = start;

    let skip_digits = |mut p: usize| {
        while p < bytes.len() && bytes[p].is_ascii_digit() {
            p += 1;
        }
        p
    };

    pos = skip_digits(pos);
    if bytes.get(pos) == Some(&b'.') {
        pos = skip_digits(pos + 1);
    }
    if matches!(bytes.get(pos), Some(b'e' | b'E')) {
        let mut exp = pos + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = skip_digits(exp);
        if exp_end == exp {
            return Err(FormulaError::syntax(start, "invalid number literal"));
        }
        pos = exp_end;
    }

    // `2x` or `1.5.2` would silently split into two tokens otherwise.
    if bytes
        .get(pos)
        .is_some_and(|&b| is_ident_continue(b) || b == b'.')
    {
        return Err(FormulaError::syntax(start, "invalid number literal"));
    }

    let text = &source[start..pos];
    let value: f64 = text
        .parse()
        .map_err(|_| FormulaError::syntax(start, "invalid number literal"))?;
    if !value.is_finite() {
        return Err(FormulaError::syntax(start, "number literal out of range"));
    }
    Ok((value, pos))
}

/// Describes symbols that belong to constructs outside the grammar.
fn disallowed_symbol(bytes: &[u8], pos: usize) -> Option<&'static str> {
    let next = bytes.get(pos + 1).copied();
    let construct = match (bytes[pos], next) {
        (b'=', Some(b'=')) | (b'!', Some(b'=')) => "comparison",
        (b'=', _) => "assignment `=`",
        (b'<' | b'>', _) => "comparison",
        (b':', Some(b'=')) => "assignment `:=`",
        (b';', _) => "statement separator `;`",
        (b'[' | b']', _) => "indexing `[]`",
        (b'{' | b'}', _) => "braces `{}`",
        (b'\'' | b'"', _) => "string literal",
        (b'&' | b'|' | b'~', _) => "bitwise operator",
        (b'@', _) => "matrix operator `@`",
        (b':', _) => "slice or annotation `:`",
        _ => return None,
    };
    Some(construct)
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
