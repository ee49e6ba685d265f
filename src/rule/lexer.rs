//! Rule string tokenizer

use crate::error::LexError;
use crate::rule::ast::ComparisonOp;

/// Lexical token kinds
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    Number(f64),
    String(String),
    Boolean(bool),
    Comparison(ComparisonOp),
    And,
    Or,
    Not,
    OpenParen,
    CloseParen,
}

/// A token with its raw text and the character offset it starts at
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: usize,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }

    /// Character offset just past the token
    pub fn end(&self) -> usize {
        self.position + self.text.chars().count()
    }

    /// Short description for diagnostics
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Identifier(name) => format!("identifier '{}'", name),
            TokenKind::Number(_) => format!("number {}", self.text),
            TokenKind::String(_) => format!("string {}", self.text),
            TokenKind::Boolean(_) => format!("boolean {}", self.text),
            TokenKind::Comparison(op) => format!("operator '{}'", op),
            _ => format!("'{}'", self.text),
        }
    }
}

/// Split a rule string into tokens
///
/// Whitespace is skipped. `AND`, `OR`, `NOT`, `true` and `false` are matched
/// case-insensitively; every other word is an identifier.
pub fn tokenize(text: &str) -> Result<Vec<Token>, LexError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        let start = pos;

        match c {
            c if c.is_whitespace() => {
                pos += 1;
            }
            '(' => {
                tokens.push(Token::new(TokenKind::OpenParen, "(", start));
                pos += 1;
            }
            ')' => {
                tokens.push(Token::new(TokenKind::CloseParen, ")", start));
                pos += 1;
            }
            '>' | '<' => {
                let with_eq = chars.get(pos + 1) == Some(&'=');
                let op = match (c, with_eq) {
                    ('>', true) => ComparisonOp::GreaterEqual,
                    ('>', false) => ComparisonOp::Greater,
                    ('<', true) => ComparisonOp::LessEqual,
                    _ => ComparisonOp::Less,
                };
                tokens.push(Token::new(TokenKind::Comparison(op), op.as_str(), start));
                pos += if with_eq { 2 } else { 1 };
            }
            '=' => {
                tokens.push(Token::new(
                    TokenKind::Comparison(ComparisonOp::Equal),
                    "=",
                    start,
                ));
                pos += 1;
            }
            '!' => {
                if chars.get(pos + 1) != Some(&'=') {
                    return Err(LexError::UnexpectedChar {
                        position: start,
                        ch: c,
                    });
                }
                tokens.push(Token::new(
                    TokenKind::Comparison(ComparisonOp::NotEqual),
                    "!=",
                    start,
                ));
                pos += 2;
            }
            '"' => {
                let (token, next) = lex_string(&chars, start)?;
                tokens.push(token);
                pos = next;
            }
            '-' if chars.get(pos + 1).is_some_and(|d| d.is_ascii_digit()) => {
                let (token, next) = lex_number(&chars, start)?;
                tokens.push(token);
                pos = next;
            }
            c if c.is_ascii_digit() => {
                let (token, next) = lex_number(&chars, start)?;
                tokens.push(token);
                pos = next;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let (token, next) = lex_word(&chars, start);
                tokens.push(token);
                pos = next;
            }
            other => {
                return Err(LexError::UnexpectedChar {
                    position: start,
                    ch: other,
                });
            }
        }
    }

    Ok(tokens)
}

fn lex_string(chars: &[char], start: usize) -> Result<(Token, usize), LexError> {
    let mut value = String::new();
    let mut pos = start + 1;

    while let Some(&c) = chars.get(pos) {
        match c {
            '"' => {
                let raw: String = chars[start..=pos].iter().collect();
                return Ok((Token::new(TokenKind::String(value), raw, start), pos + 1));
            }
            '\\' => match chars.get(pos + 1) {
                Some(&escaped @ ('"' | '\\')) => {
                    value.push(escaped);
                    pos += 2;
                }
                _ => {
                    value.push('\\');
                    pos += 1;
                }
            },
            other => {
                value.push(other);
                pos += 1;
            }
        }
    }

    Err(LexError::UnterminatedString { position: start })
}

fn lex_number(chars: &[char], start: usize) -> Result<(Token, usize), LexError> {
    let mut pos = start;
    if chars[pos] == '-' {
        pos += 1;
    }
    while chars.get(pos).is_some_and(|c| c.is_ascii_digit()) {
        pos += 1;
    }
    // Fraction only when a digit follows the dot
    if chars.get(pos) == Some(&'.') && chars.get(pos + 1).is_some_and(|c| c.is_ascii_digit()) {
        pos += 1;
        while chars.get(pos).is_some_and(|c| c.is_ascii_digit()) {
            pos += 1;
        }
    }

    let raw: String = chars[start..pos].iter().collect();
    let value = raw.parse::<f64>().map_err(|_| LexError::UnexpectedChar {
        position: start,
        ch: chars[start],
    })?;
    // Overflowing literals parse as infinity, which has no rule syntax
    if !value.is_finite() {
        return Err(LexError::NumberOutOfRange { position: start });
    }
    Ok((Token::new(TokenKind::Number(value), raw, start), pos))
}

fn lex_word(chars: &[char], start: usize) -> (Token, usize) {
    let mut pos = start;
    while chars
        .get(pos)
        .is_some_and(|c| c.is_ascii_alphanumeric() || *c == '_')
    {
        pos += 1;
    }

    let raw: String = chars[start..pos].iter().collect();
    let kind = match raw.to_ascii_uppercase().as_str() {
        "AND" => TokenKind::And,
        "OR" => TokenKind::Or,
        "NOT" => TokenKind::Not,
        "TRUE" => TokenKind::Boolean(true),
        "FALSE" => TokenKind::Boolean(false),
        _ => TokenKind::Identifier(raw.clone()),
    };
    (Token::new(kind, raw, start), pos)
}
