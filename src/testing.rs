//! Test support utilities
//!
//! Helpers shared by the module tests and the integration suite: a
//! one-call parse helper, tree navigation shortcuts, and a parent/child
//! consistency walker for the structural invariants.

use crate::ast::{DocoptAst, NodeId, NodeKind};
use crate::parsing::DocoptParser;

/// Parse a source string and return the finished parser.
pub fn parse_source(source: &str) -> DocoptParser<'_> {
    let mut parser = DocoptParser::new(source.as_bytes()).expect("parser init");
    parser.parse();
    parser
}

/// Kinds of the direct children of `id`, in order.
pub fn child_kinds(ast: &DocoptAst, id: NodeId) -> Vec<NodeKind> {
    ast.children(id).iter().map(|&c| ast.kind(c)).collect()
}

/// The `index`-th child of `id`; panics with a readable message.
pub fn child(ast: &DocoptAst, id: NodeId, index: usize) -> NodeId {
    *ast.children(id).get(index).unwrap_or_else(|| {
        panic!(
            "{} has {} children, wanted index {index}",
            ast.kind(id),
            ast.children(id).len()
        )
    })
}

/// Walk a path of child kinds from `id`, taking the first match at each
/// step.
pub fn descend(ast: &DocoptAst, id: NodeId, path: &[NodeKind]) -> NodeId {
    let mut current = id;
    for &kind in path {
        current = ast.find_child(current, kind).unwrap_or_else(|| {
            panic!("{} has no {kind} child", ast.kind(current))
        });
    }
    current
}

/// The usage section of a parsed tree.
pub fn usage_section(parser: &DocoptParser<'_>) -> NodeId {
    parser.usage_node().expect("document has a Usage_section")
}

/// Check that every non-root node is referenced exactly once as a child
/// and that parent pointers agree with the child lists.
pub fn assert_parent_child_consistent(ast: &DocoptAst) {
    let Some(root) = ast.root() else {
        return;
    };
    let mut reference_counts = vec![0usize; ast.len()];
    for id in ast.node_ids() {
        for &c in ast.children(id) {
            reference_counts[c.index()] += 1;
            assert_eq!(
                ast.parent(c),
                Some(id),
                "{} child has a stale parent pointer",
                ast.kind(id)
            );
        }
    }
    assert_eq!(reference_counts[root.index()], 0, "root must be unreferenced");
    for id in ast.node_ids().skip(1) {
        assert_eq!(
            reference_counts[id.index()],
            1,
            "{} referenced {} times",
            ast.kind(id),
            reference_counts[id.index()]
        );
    }
}
