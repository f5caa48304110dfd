//! The lexer: turns query text into the parser's token stream.
//!
//! Raw scanning is a derived [`logos`] lexer; a post-pass materializes
//! literals (including the current-input sigil `@`, which becomes the
//! deferred identity), resolves operator symbols against the binop table and
//! splits the stream on a top-level `=` into selector and mutator halves.

use crate::binop::{self, Binop};
use crate::error::Error;
use crate::value::{Deferred, Value};
use logos::Logos;
use regex::Regex;
use std::fmt;

/// A parser-facing token.
#[derive(Debug, Clone)]
pub enum Token {
    /// A literal value: number, string, regex, bool, null or the
    /// current-input sigil (a deferred identity).
    Lit(Value),
    /// A binary operator descriptor.
    Op(&'static Binop),
    /// An unquoted name: object key or function name.
    Name(String),
    /// One of `. , : [ ] { } ( )`.
    Delim(char),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Lit(v) => write!(f, "{}", v.type_name()),
            Token::Op(op) => write!(f, "'{}'", op.name),
            Token::Name(n) => write!(f, "'{n}'"),
            Token::Delim(d) => write!(f, "'{d}'"),
        }
    }
}

/// The lexed query: selector tokens plus the optional mutator half.
#[derive(Debug)]
pub struct TokenStream {
    pub selector: Vec<Token>,
    pub mutator: Option<Vec<Token>>,
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum Raw {
    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape(lex.slice()))]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| unescape(lex.slice()))]
    Str(String),

    #[regex(r"`([^`\\]|\\.)*`", |lex| { let s = lex.slice(); Some(s[1..s.len() - 1].to_string()) })]
    Pattern(String),

    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[token("@")]
    At,

    #[token("=")]
    Assign,

    #[token("**")]
    #[token("//")]
    #[token("==")]
    #[token("!=")]
    #[token("<=")]
    #[token(">=")]
    #[token("<")]
    #[token(">")]
    #[token("+")]
    #[token("-")]
    #[token("*")]
    #[token("/")]
    #[token("%")]
    #[token("&")]
    #[token("|")]
    #[token("^")]
    Operator,

    #[token(".")]
    #[token(",")]
    #[token(":")]
    #[token("[")]
    #[token("]")]
    #[token("{")]
    #[token("}")]
    #[token("(")]
    #[token(")")]
    Delimiter,
}

fn unescape(quoted: &str) -> Option<String> {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            '`' => out.push('`'),
            _ => return None,
        }
    }
    Some(out)
}

/// Lexes a query, splitting selector and mutator on a top-level `=`.
pub fn lex(source: &str) -> Result<TokenStream, Error> {
    let mut selector = Vec::new();
    let mut mutator: Option<Vec<Token>> = None;
    let mut depth = 0i32;

    let mut raw = Raw::lexer(source);
    while let Some(item) = raw.next() {
        let piece = raw.slice();
        let tok = match item.map_err(|_| Error::UnexpectedToken(piece.to_string()))? {
            Raw::Float(f) => Token::Lit(Value::Float(f)),
            Raw::Int(n) => Token::Lit(Value::Int(n)),
            Raw::Str(s) => Token::Lit(Value::Str(s)),
            Raw::Pattern(p) => {
                let re = Regex::new(&p).map_err(|e| Error::BadLiteral(e.to_string()))?;
                Token::Lit(Value::Regex(re))
            }
            Raw::True => Token::Lit(Value::Bool(true)),
            Raw::False => Token::Lit(Value::Bool(false)),
            Raw::Null => Token::Lit(Value::Null),
            Raw::Ident(name) => Token::Name(name),
            Raw::At => Token::Lit(Value::Deferred(Deferred::identity())),
            Raw::Operator => {
                let op = binop::lookup(piece)
                    .ok_or_else(|| Error::UnexpectedToken(piece.to_string()))?;
                Token::Op(op)
            }
            Raw::Delimiter => {
                let d = piece.chars().next().unwrap_or('\0');
                match d {
                    '[' | '(' | '{' => depth += 1,
                    ']' | ')' | '}' => depth -= 1,
                    _ => {}
                }
                Token::Delim(d)
            }
            Raw::Assign => {
                if depth != 0 {
                    return Err(Error::UnexpectedToken("=".to_string()));
                }
                if mutator.is_some() {
                    return Err(Error::UnexpectedToken(
                        "second '=' in query".to_string(),
                    ));
                }
                mutator = Some(Vec::new());
                continue;
            }
        };
        match &mut mutator {
            Some(m) => m.push(tok),
            None => selector.push(tok),
        }
    }
    if selector.is_empty() {
        return Err(Error::UnexpectedEnd);
    }
    if let Some(m) = &mutator {
        if m.is_empty() {
            return Err(Error::UnexpectedEnd);
        }
    }
    Ok(TokenStream { selector, mutator })
}
