//! # docopt-lang
//!
//! A front end for the docopt convention, where a program's help text
//! *is* the formal grammar of its command line. The crate parses such a
//! document into an abstract syntax tree that a downstream argv matcher
//! can bind values against.
//!
//! Two cooperating stages do the work:
//!
//! 1. A stateful lexer whose active rule set follows the document
//!    section being read, including a rule that is recompiled at runtime
//!    to the program's own name ([`lexing`]).
//! 2. A recursive-descent parser built on a generic consume loop, which
//!    assembles the tree while honoring docopt's positional and
//!    indentation conventions ([`parsing`]).
//!
//! ```
//! use docopt_lang::DocoptParser;
//!
//! let mut parser = DocoptParser::new(b"Usage: naval_fate ship new <name>...\n").unwrap();
//! parser.parse();
//! assert!(parser.errors().is_empty());
//! assert_eq!(parser.prog_name(), "naval_fate");
//! ```

pub mod ast;
pub mod lexing;
pub mod options;
pub mod parsing;
pub mod testing;

pub use ast::{AstNode, DocoptAst, NodeId, NodeKind};
pub use lexing::{LexError, Position, StateLexer, Token, TokenKind};
pub use options::{OptionRule, OptionsError, OptionsMap};
pub use parsing::{DocoptParser, InitError, ParseError, Reason};
