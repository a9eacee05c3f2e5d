//! The docopt abstract syntax tree
//!
//! Nodes carry a kind tag, an optional originating token, a repeat flag
//! set by `...`, and parent/child links. The tree is built strictly
//! during parsing and never mutated afterwards; the handful of in-flight
//! transforms (alternative-group surgery, alias grouping) re-parent
//! existing nodes but never delete any.

pub mod node;
pub mod treeviz;

pub use node::{AstNode, DocoptAst, NodeId, NodeKind};
pub use treeviz::to_treeviz_str;
