//! An eager tokenizer for the Roman-numeral statement language.
//!
//! The whole source is scanned before anything is handed to the syntax
//! analyzer. Scanning never stops at a bad lexeme: each one is recorded as a
//! [`LexError`] in the output stream and scanning resumes right after it, so
//! that the analyzer can report every lexical error in one go.

use std::fmt;
use std::str::Chars;

use serde::Serialize;

/// Digits that make up a Roman-numeral constant.
const ROMAN_DIGITS: &str = "IVXLCDM";

/// Single-character arithmetic operators.
const OPERATOR_SIGNS: &str = "+-*/";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    Identifier,
    Constant,
    AssignSign,
    ComparisonSign,
    OperatorsSign,
    /// The `if` that opens a conditional.
    ConditionalOperator,
    /// `then` and `else`.
    Keyword,
    Delimiter,
    ParenthesisOpen,
    ParenthesisClose,
}

/// A location in the source text.
///
/// Positions compare by `offset` first, which is what the block locators rely
/// on when they look for a delimiter "after" some other token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    /// Byte offset from the start of the source, 0-based.
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn advance(&mut self, c: char) {
        self.offset += c.len_utf8();
        self.column += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Token {
    kind: TokenKind,
    text: String,
    position: Option<Position>,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            text: text.into(),
            position: Some(position),
        }
    }

    /// A placeholder token that does not come from any source text.
    #[allow(dead_code)]
    pub fn synthetic(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            position: None,
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    pub fn is(&self, text: &str) -> bool {
        self.text == text
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error, Serialize)]
#[error("{position}: {message}")]
pub struct LexError {
    pub message: String,
    pub position: Position,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum LexResult {
    Token(Token),
    Error(LexError),
}

struct Cursor<'a> {
    chars: Chars<'a>,
    position: Position,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars(),
            position: Position::default(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.chars.clone().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.position.advance(c);
        Some(c)
    }

    fn eat_while(&mut self, text: &mut String, predicate: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }
            text.push(c);
            self.bump();
        }
    }
}

#[tracing::instrument(level = "trace", skip_all)]
pub fn tokenize(source: &str) -> Vec<LexResult> {
    let mut cursor = Cursor::new(source);
    let mut results = vec![];

    while let Some(c) = cursor.peek() {
        let start = cursor.position;
        let token = |kind: TokenKind, text: &str| LexResult::Token(Token::new(kind, text, start));
        let error = |message: String| {
            LexResult::Error(LexError {
                message,
                position: start,
            })
        };

        // Must come before operator scanning, because slashes are also operators.
        if c == '/' && cursor.peek_second() == Some('/') {
            while cursor.peek().is_some_and(|c| c != '\n') {
                cursor.bump();
            }
            continue;
        }

        cursor.bump();
        if c.is_whitespace() {
        } else if c == ';' {
            results.push(token(TokenKind::Delimiter, ";"));
        } else if c == '(' {
            results.push(token(TokenKind::ParenthesisOpen, "("));
        } else if c == ')' {
            results.push(token(TokenKind::ParenthesisClose, ")"));
        } else if c == ':' {
            if cursor.peek() == Some('=') {
                cursor.bump();
                results.push(token(TokenKind::AssignSign, ":="));
            } else {
                results.push(error("expected '=' after ':'".to_string()));
            }
        } else if c == '<' || c == '>' || c == '=' {
            let mut sign = String::from(c);
            let second = cursor.peek();
            if (c != '=' && second == Some('=')) || (c == '<' && second == Some('>')) {
                sign.extend(cursor.bump());
            }
            results.push(token(TokenKind::ComparisonSign, &sign));
        } else if OPERATOR_SIGNS.contains(c) {
            results.push(token(TokenKind::OperatorsSign, &c.to_string()));
        } else if c.is_ascii_alphabetic() || c == '_' {
            let mut word = String::from(c);
            cursor.eat_while(&mut word, |c| c.is_ascii_alphanumeric() || c == '_');
            results.push(token(word_kind(&word), &word));
        } else if c.is_ascii_digit() {
            let mut number = String::from(c);
            cursor.eat_while(&mut number, |c| c.is_ascii_digit());
            results.push(error(format!(
                "numeric constant '{number}' must be written as a Roman numeral"
            )));
        } else {
            results.push(error(format!("unexpected character '{c}'")));
        }
    }

    results
}

fn word_kind(word: &str) -> TokenKind {
    match word {
        "if" => TokenKind::ConditionalOperator,
        "then" | "else" => TokenKind::Keyword,
        _ if word.chars().all(|c| ROMAN_DIGITS.contains(c)) => TokenKind::Constant,
        _ => TokenKind::Identifier,
    }
}

/// Splits tokenizer output into its tokens and its errors, keeping the order
/// of each.
pub fn partition(results: &[LexResult]) -> (Vec<Token>, Vec<LexError>) {
    let mut tokens = vec![];
    let mut errors = vec![];
    for result in results {
        match result {
            LexResult::Token(token) => tokens.push(token.clone()),
            LexResult::Error(error) => errors.push(error.clone()),
        }
    }
    (tokens, errors)
}
