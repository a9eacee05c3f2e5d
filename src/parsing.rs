//! Parsing
//!
//! The recursive-descent front end over the stateful lexer. The two are
//! mutually recursive by design: the parser switches lexer states as it
//! crosses section boundaries, and the lexer learns the program name as
//! a dynamic rule once the parser discovers it, which in turn shapes how
//! later usage lines tokenize.
//!
//! Entry point: [`DocoptParser::new`] over a byte buffer, then
//! [`DocoptParser::parse`]. The resulting tree and any recorded errors
//! stay readable on the parser.

pub mod error;
pub mod parser;
pub mod reason;

pub use error::{InitError, ParseError};
pub use parser::{DocoptParser, MAX_ERROR};
pub use reason::Reason;
