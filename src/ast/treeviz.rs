//! Treeviz formatter for docopt ASTs
//!
//! One line per node, two-space indentation per depth. Terminal nodes
//! show their token value with debug quoting so newlines stay on one
//! line; repeated nodes get a trailing ellipsis marker. The format is
//! what the inspection CLI prints and what the snapshot tests pin down.

use super::node::{DocoptAst, NodeId};
use std::fmt::Write;

/// Render the whole tree, root first.
pub fn to_treeviz_str(ast: &DocoptAst) -> String {
    let mut out = String::new();
    if let Some(root) = ast.root() {
        append_node(ast, &mut out, root, 0);
    }
    out
}

fn append_node(ast: &DocoptAst, out: &mut String, id: NodeId, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push_str(ast.kind(id).as_str());
    if let Some(token) = ast.token(id) {
        let _ = write!(out, " {:?}", token.value);
    }
    if ast.repeat(id) {
        out.push_str(" ...");
    }
    out.push('\n');
    for &child in ast.children(id) {
        append_node(ast, out, child, depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::node::NodeKind;
    use crate::lexing::{Position, Token, TokenKind};

    fn token(kind: TokenKind, value: &str) -> Token {
        Token {
            kind,
            value: value.to_string(),
            pos: Position::new(0, 0, 0),
            state: "state_Usage_Line",
        }
    }

    #[test]
    fn renders_tokens_and_repeat_markers() {
        let mut ast = DocoptAst::new();
        let root = ast.add_root(NodeKind::Root, None);
        let expr = ast.add_child(root, NodeKind::UsageExpr, None);
        let file = ast.add_child(
            expr,
            NodeKind::UsageArgument,
            Some(token(TokenKind::Argument, "FILE")),
        );
        ast.set_repeat(file, true);

        assert_eq!(
            to_treeviz_str(&ast),
            "Root\n  Usage_Expr\n    Usage_argument \"FILE\" ...\n"
        );
    }

    #[test]
    fn empty_tree_renders_empty() {
        assert_eq!(to_treeviz_str(&DocoptAst::new()), "");
    }
}
