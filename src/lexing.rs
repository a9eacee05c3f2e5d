//! Lexing
//!
//! The docopt front end tokenizes under a small set of named lexer
//! states, one per document section. A state is an ordered regex rule
//! list; the parser switches states as it crosses section boundaries
//! and rewinds the lexer whenever buffered lookahead has to be re-read
//! under the new rules.
//!
//! The pipeline differs from a conventional fixed-alphabet lexer in one
//! way: after the program name is discovered on the first usage line,
//! the `PROG_NAME` rule is recompiled to match only that literal, in
//! every state that declares it. Line starts repeating the literal then
//! open new usage lines, while everything else keeps lexing as commands,
//! options and arguments.

pub mod location;
pub mod state_lexer;
pub mod states;
pub mod tokens;

pub use location::SourceLocation;
pub use state_lexer::{LexError, StateLexer};
pub use tokens::{Position, Token, TokenKind};

/// Tokenize a buffer under `state_Prologue`, stepping over unmatched
/// bytes. A debugging convenience for tests and the inspection CLI; the
/// parser drives its own state changes and never uses this.
pub fn tokenize(source: &[u8]) -> Vec<Token> {
    let mut lexer = StateLexer::new(source, states::STATE_PROLOGUE)
        .expect("prologue state exists in the tables");
    let mut tokens = Vec::new();
    loop {
        match lexer.next() {
            Ok(token) => {
                let eof = token.kind == TokenKind::Eof;
                tokens.push(token);
                if eof {
                    break;
                }
            }
            Err(_) => lexer.discard(1),
        }
    }
    tokens
}
