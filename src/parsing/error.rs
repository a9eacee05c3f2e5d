//! Parser error types
//!
//! Grammar errors carry the node kind the parser was building, the
//! offending token and a one-line message through `Display`. Lexer
//! errors are wrapped as-is. `Step` records which top-level parse step a
//! returned error belongs to, so the error list names the consumer that
//! failed.

use crate::ast::NodeKind;
use crate::lexing::{LexError, Token};
use std::fmt;

/// Everything that can go wrong while parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The lexer found no matching rule; one byte was discarded.
    Lex(LexError),
    /// End of input before any `Usage:` heading.
    UsageNotFound { token: Token },
    /// Two consecutive newlines before a program name was seen.
    MissingProgName { token: Token },
    /// The first usage line held something other than a program name.
    ExpectedProgName { token: Token },
    /// A `PROG_NAME` token with a different literal than the known one.
    ProgNameMismatch { expected: String, token: Token },
    /// A usage line start whose first word is not the program name.
    LineStartMismatch { expected: String, token: Token },
    /// A `Usage:` keyword outside the usage section.
    UsageMisplaced { node: NodeKind, token: Token },
    /// Token the active consumer has no rule for.
    UnexpectedToken { node: NodeKind, token: Token },
    /// A node whose parent kind makes the construct meaningless.
    UnexpectedParent {
        node: NodeKind,
        parent: NodeKind,
        token: Token,
    },
    /// EOF or a line start inside an unclosed group.
    UnclosedGroup {
        node: NodeKind,
        closer: char,
        token: Token,
    },
    /// `]` closing a `(` group or vice versa.
    MismatchedCloser { node: NodeKind, token: Token },
    /// A blank line inside a group.
    TwoNewlineInGroup { node: NodeKind, token: Token },
    /// `...` with nothing before it to repeat.
    RepeatWithoutChild { node: NodeKind, token: Token },
    /// `=` with no option on the left-hand side.
    AssignWithoutChild { token: Token },
    /// `=` attached to a node kind that cannot take an argument.
    AssignTarget { target: NodeKind, token: Token },
    /// `=` followed by something other than an ARGUMENT token.
    AssignExpectsArgument { node: NodeKind, token: Token },
    /// An option line that ended before naming any option.
    EmptyOptionLine { token: Token },
    /// A `,` with no alias on its left.
    EmptyAlternative { node: NodeKind, token: Token },
    /// A consumer found the tree in a shape it cannot start from.
    WrongNode {
        expected: NodeKind,
        actual: NodeKind,
    },
    /// A consume loop failed to restore the current node.
    LoopContract { node: NodeKind },
    /// The error budget was exhausted.
    TooManyErrors,
    /// The run flag was cleared; all loops are winding down.
    Stopped { node: NodeKind },
    /// An error as recorded by the top-level driver, tagged with the
    /// parse step it came from.
    Step {
        name: &'static str,
        inner: Box<ParseError>,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Lex(e) => write!(f, "{e}"),
            ParseError::UsageNotFound { .. } => {
                write!(f, "EOF encountered while parsing Prologue, without 'Usage:' found")
            }
            ParseError::MissingProgName { token } => write!(
                f,
                "PROG_NAME not defined while leaving on 2 consecutive NEWLINE: {token}"
            ),
            ParseError::ExpectedProgName { token } => {
                write!(f, "expecting PROG_NAME, got: {token}")
            }
            ParseError::ProgNameMismatch { expected, token } => write!(
                f,
                "PROG_NAME encountered with a distinct value, expected {expected:?}, invalid token: {token}"
            ),
            ParseError::LineStartMismatch { expected, token } => write!(
                f,
                "usage line must start with the program name {expected:?}, invalid token: {token}"
            ),
            ParseError::UsageMisplaced { node, token } => {
                write!(f, "{node}: USAGE invalid token: {token}")
            }
            ParseError::UnexpectedToken { node, token } => {
                write!(f, "{node}: unmatched token: {token}")
            }
            ParseError::UnexpectedParent {
                node,
                parent,
                token,
            } => write!(f, "{node}: unexpected parent node {parent}: {token}"),
            ParseError::UnclosedGroup {
                node,
                closer,
                token,
            } => write!(
                f,
                "{node}: {} unexpected, missing closing bracket '{closer}'",
                token.kind
            ),
            ParseError::MismatchedCloser { node, token } => write!(
                f,
                "{node}: closing {:?} unexpected, invalid token: {token}",
                token.value
            ),
            ParseError::TwoNewlineInGroup { node, token } => write!(
                f,
                "{node}: 2 consecutive NEWLINE invalid token: {token}"
            ),
            ParseError::RepeatWithoutChild { node, token } => write!(
                f,
                "{node}: ellipsis not expected on a node without children, invalid token: {token}"
            ),
            ParseError::AssignWithoutChild { token } => write!(
                f,
                "assignment requires an option child on the current node, invalid token: {token}"
            ),
            ParseError::AssignTarget { target, token } => write!(
                f,
                "node {target} cannot have assignment '=', invalid token: {token}"
            ),
            ParseError::AssignExpectsArgument { node, token } => write!(
                f,
                "{node}: assignment must be followed by ARGUMENT, invalid token: {token}"
            ),
            ParseError::EmptyOptionLine { token } => {
                write!(f, "Option_line: unexpected empty option, invalid token: {token}")
            }
            ParseError::EmptyAlternative { node, token } => write!(
                f,
                "{node}: comma unexpected without alternative option name, invalid token: {token}"
            ),
            ParseError::WrongNode { expected, actual } => {
                write!(f, "wrong node type: {actual}, expected {expected}")
            }
            ParseError::LoopContract { node } => {
                write!(f, "consume loop did not restore current node: {node}")
            }
            ParseError::TooManyErrors => write!(f, "too many errors, leaving"),
            ParseError::Stopped { node } => write!(f, "{node}: parser stopped"),
            ParseError::Step { name, inner } => write!(f, "{name}: {inner}"),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Lex(e) => Some(e),
            ParseError::Step { inner, .. } => Some(inner),
            _ => None,
        }
    }
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError::Lex(e)
    }
}

/// Errors constructing a parser.
#[derive(Debug, Clone, PartialEq)]
pub enum InitError {
    /// The lexer state tables could not be set up.
    Lexer(LexError),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::Lexer(e) => write!(f, "failed to initialize lexer: {e}"),
        }
    }
}

impl std::error::Error for InitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InitError::Lexer(e) => Some(e),
        }
    }
}
