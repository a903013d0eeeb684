//! Tokenizer for both query surfaces
//!
//! One token stream serves the verbose SQL-like grammar and the terse
//! grammar; the parser decides meaning positionally. Keywords are matched
//! case-insensitively. Identifiers may contain `.`, `:` and `/` so that
//! node identifiers (`function:src/a.py:foo`) lex as a single token
//! without quoting.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::{QueryError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Verbose keywords
    Select,
    From,
    Where,
    Group,
    By,
    Having,
    Order,
    Asc,
    Desc,
    Limit,
    As,
    And,
    Or,
    Not,
    Like,
    Show,
    Of,
    Depth,
    Via,
    Find,
    Calling,
    CalledBy,
    Inheriting,
    Path,
    To,
    MaxDepth,
    Describe,
    Dependencies,
    Dependents,

    // Commands shared by both surfaces
    Cycles,
    Callers,
    Callees,
    Impact,

    // Terse-only keywords
    Deps,
    Rdeps,
    Sort,

    // Aggregate functions
    Count,
    Sum,
    Avg,
    Min,
    Max,

    // Symbols
    Star,
    Comma,
    LParen,
    RParen,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Tilde,
    Amp,
    Pipe,
    Bang,
    Plus,
    Minus,

    // Literals
    Str(String),
    Int(i64),
    Float(f64),
    Ident(String),

    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token's first character in the query string
    pub offset: usize,
}

fn keyword(word: &str) -> Option<TokenKind> {
    let lowered = word.to_ascii_lowercase();
    let kind = match lowered.as_str() {
        "select" => TokenKind::Select,
        "from" => TokenKind::From,
        "where" => TokenKind::Where,
        "group" => TokenKind::Group,
        "by" => TokenKind::By,
        "having" => TokenKind::Having,
        "order" => TokenKind::Order,
        "asc" => TokenKind::Asc,
        "desc" => TokenKind::Desc,
        "limit" => TokenKind::Limit,
        "as" => TokenKind::As,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "like" => TokenKind::Like,
        "show" => TokenKind::Show,
        "of" => TokenKind::Of,
        "depth" => TokenKind::Depth,
        "via" => TokenKind::Via,
        "find" => TokenKind::Find,
        "calling" => TokenKind::Calling,
        "called_by" => TokenKind::CalledBy,
        "inheriting" => TokenKind::Inheriting,
        "path" => TokenKind::Path,
        "to" => TokenKind::To,
        "max_depth" => TokenKind::MaxDepth,
        "describe" => TokenKind::Describe,
        "dependencies" => TokenKind::Dependencies,
        "dependents" => TokenKind::Dependents,
        "cycles" => TokenKind::Cycles,
        "callers" => TokenKind::Callers,
        "callees" => TokenKind::Callees,
        "impact" => TokenKind::Impact,
        "deps" => TokenKind::Deps,
        "rdeps" => TokenKind::Rdeps,
        "sort" => TokenKind::Sort,
        "count" => TokenKind::Count,
        "sum" => TokenKind::Sum,
        "avg" => TokenKind::Avg,
        "min" => TokenKind::Min,
        "max" => TokenKind::Max,
        _ => return None,
    };
    Some(kind)
}

pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();

        let (offset, ch) = match self.chars.peek().copied() {
            Some(pair) => pair,
            None => {
                return Ok(Token {
                    kind: TokenKind::Eof,
                    offset: self.input.len(),
                })
            }
        };

        let kind = match ch {
            '\'' | '"' => return self.lex_string(offset, ch),
            c if c.is_ascii_digit() => return self.lex_number(offset),
            c if c.is_alphabetic() || c == '_' => return Ok(self.lex_word(offset)),
            '*' => self.single(TokenKind::Star),
            ',' => self.single(TokenKind::Comma),
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '~' => self.single(TokenKind::Tilde),
            '&' => self.single(TokenKind::Amp),
            '|' => self.single(TokenKind::Pipe),
            '+' => self.single(TokenKind::Plus),
            '-' => self.single(TokenKind::Minus),
            '=' => self.single(TokenKind::Eq),
            '!' => {
                self.chars.next();
                if self.peek_char() == Some('=') {
                    self.chars.next();
                    TokenKind::Ne
                } else {
                    TokenKind::Bang
                }
            }
            '<' => {
                self.chars.next();
                if self.peek_char() == Some('=') {
                    self.chars.next();
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                self.chars.next();
                if self.peek_char() == Some('=') {
                    self.chars.next();
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            other => {
                return Err(QueryError::parse(
                    offset,
                    format!("unexpected character '{}'", other),
                ))
            }
        };

        Ok(Token { kind, offset })
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.chars.next();
        kind
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
            } else {
                break;
            }
        }
    }

    fn lex_string(&mut self, offset: usize, quote: char) -> Result<Token> {
        self.chars.next();
        let mut value = String::new();
        for (_, c) in self.chars.by_ref() {
            if c == quote {
                return Ok(Token {
                    kind: TokenKind::Str(value),
                    offset,
                });
            }
            value.push(c);
        }
        Err(QueryError::parse(offset, "unterminated string literal"))
    }

    fn lex_number(&mut self, offset: usize) -> Result<Token> {
        let mut end = offset;
        let mut is_float = false;
        while let Some(&(i, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                end = i + c.len_utf8();
                self.chars.next();
            } else if c == '.' && !is_float && self.digit_follows(i) {
                is_float = true;
                end = i + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }

        let text = &self.input[offset..end];
        let kind = if is_float {
            TokenKind::Float(
                text.parse()
                    .map_err(|_| QueryError::parse(offset, format!("invalid number '{text}'")))?,
            )
        } else {
            TokenKind::Int(
                text.parse()
                    .map_err(|_| QueryError::parse(offset, format!("invalid number '{text}'")))?,
            )
        };
        Ok(Token { kind, offset })
    }

    /// Whether a digit follows the dot, making it a decimal point rather
    /// than a trailing separator.
    fn digit_follows(&self, dot_index: usize) -> bool {
        self.input[dot_index + 1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit())
    }

    fn lex_word(&mut self, offset: usize) -> Token {
        let mut end = offset;
        while let Some(&(i, c)) = self.chars.peek() {
            let continues = c.is_alphanumeric()
                || c == '_'
                || ((c == '.' || c == ':' || c == '/') && self.word_follows(i));
            if continues {
                end = i + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }

        let text = &self.input[offset..end];
        // A word containing path characters can never be a keyword.
        let kind = if text.contains(['.', ':', '/']) {
            TokenKind::Ident(text.to_string())
        } else {
            keyword(text).unwrap_or_else(|| TokenKind::Ident(text.to_string()))
        };
        Token { kind, offset }
    }

    fn word_follows(&self, sep_index: usize) -> bool {
        self.input[sep_index + 1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
    }
}

/// Tokenize a query string.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    Lexer::new(input).tokenize()
}
