//! Token definitions for the docopt help-text lexer
//!
//! This module defines the token kinds the stateful lexer can emit, along
//! with the token value type itself. Which kinds a given scan can produce
//! depends on the active lexer state; the full catalogue lives in the
//! state tables of [`crate::lexing::states`].

use serde::Serialize;
use std::fmt;

/// All token kinds the lexer states can emit.
///
/// `Text` and `Blank` are administrative kinds: `Text` is an opaque word
/// in prologue, free-section and description contexts, and `Blank` is a
/// space run below the `LongBlank` threshold. `Eof` is synthesized when
/// the input is exhausted and carries an empty value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    Newline,
    LongBlank,
    Blank,
    Section,
    Usage,
    ProgName,
    Short,
    Long,
    Argument,
    Ident,
    Punct,
    Default,
    Text,
    Eof,
}

impl TokenKind {
    /// The state-table name of this kind, as used in diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Newline => "NEWLINE",
            TokenKind::LongBlank => "LONG_BLANK",
            TokenKind::Blank => "BLANK",
            TokenKind::Section => "SECTION",
            TokenKind::Usage => "USAGE",
            TokenKind::ProgName => "PROG_NAME",
            TokenKind::Short => "SHORT",
            TokenKind::Long => "LONG",
            TokenKind::Argument => "ARGUMENT",
            TokenKind::Ident => "IDENT",
            TokenKind::Punct => "PUNCT",
            TokenKind::Default => "DEFAULT",
            TokenKind::Text => "TEXT",
            TokenKind::Eof => "EOF",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A position in the source buffer.
///
/// `line` and `column` are 0-based; `column` counts bytes from the start
/// of the line. `offset` is the absolute byte offset, which is what the
/// lexer's rewind operations work with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// One lexed token.
///
/// Every token except `Eof` carries a non-empty value. `state` records
/// the name of the lexer state that emitted the token; it only exists
/// for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub pos: Position,
    pub state: &'static str,
}

impl Token {
    /// Check the token kind.
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// Check for a punctuation token with the given literal value.
    pub fn is_punct(&self, value: &str) -> bool {
        self.kind == TokenKind::Punct && self.value == value
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?} at {}", self.kind, self.value, self.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_match_state_tables() {
        assert_eq!(TokenKind::LongBlank.as_str(), "LONG_BLANK");
        assert_eq!(TokenKind::ProgName.as_str(), "PROG_NAME");
        assert_eq!(TokenKind::Eof.to_string(), "EOF");
    }

    #[test]
    fn punct_predicate_checks_value() {
        let token = Token {
            kind: TokenKind::Punct,
            value: "[".to_string(),
            pos: Position::new(0, 7, 7),
            state: "state_Usage_Line",
        };
        assert!(token.is_punct("["));
        assert!(!token.is_punct("]"));
        assert!(token.is(TokenKind::Punct));
    }
}
