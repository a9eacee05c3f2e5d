//! AST node types and the docopt tree arena
//!
//! The tree is doubly linked: children know their parent and parents
//! own an ordered child list. Nodes live in an arena and are addressed
//! by integer ids, so re-parenting during the alternative-group
//! transforms is a matter of updating indices, with no reference-count
//! cycles involved.

use crate::lexing::Token;
use std::fmt;

/// The closed set of docopt AST node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Root,
    Prologue,
    PrologueNode,
    UsageSection,
    Usage,
    UsageLine,
    ProgName,
    UsageExpr,
    UsageCommand,
    UsageArgument,
    UsageShortOption,
    UsageLongOption,
    UsageOptionalGroup,
    UsageRequiredGroup,
    OptionsSection,
    SectionName,
    OptionsNode,
    OptionLine,
    OptionShort,
    OptionLong,
    OptionArgument,
    OptionAlternativeGroup,
    OptionDescription,
    DescriptionNode,
    FreeSection,
    SectionNode,
    OptionDefault,
    NoneNode,
}

impl NodeKind {
    /// The language-level tag name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Root => "Root",
            NodeKind::Prologue => "Prologue",
            NodeKind::PrologueNode => "Prologue_node",
            NodeKind::UsageSection => "Usage_section",
            NodeKind::Usage => "Usage",
            NodeKind::UsageLine => "Usage_line",
            NodeKind::ProgName => "Prog_name",
            NodeKind::UsageExpr => "Usage_Expr",
            NodeKind::UsageCommand => "Usage_command",
            NodeKind::UsageArgument => "Usage_argument",
            NodeKind::UsageShortOption => "Usage_short_option",
            NodeKind::UsageLongOption => "Usage_long_option",
            NodeKind::UsageOptionalGroup => "Usage_optional_group",
            NodeKind::UsageRequiredGroup => "Usage_required_group",
            NodeKind::OptionsSection => "Options_section",
            NodeKind::SectionName => "Section_name",
            NodeKind::OptionsNode => "Options_node",
            NodeKind::OptionLine => "Option_line",
            NodeKind::OptionShort => "Option_short",
            NodeKind::OptionLong => "Option_long",
            NodeKind::OptionArgument => "Option_argument",
            NodeKind::OptionAlternativeGroup => "Option_alternative_group",
            NodeKind::OptionDescription => "Option_description",
            NodeKind::DescriptionNode => "Description_node",
            NodeKind::FreeSection => "Free_section",
            NodeKind::SectionNode => "Section_node",
            NodeKind::OptionDefault => "Option_default",
            NodeKind::NoneNode => "NONE_node",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arena id of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One node of the tree.
#[derive(Debug, Clone)]
pub struct AstNode {
    pub kind: NodeKind,
    pub token: Option<Token>,
    pub repeat: bool,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// The docopt AST, an arena owning every node. The first node added is
/// the root.
#[derive(Debug, Clone, Default)]
pub struct DocoptAst {
    nodes: Vec<AstNode>,
}

impl DocoptAst {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// All node ids, in creation order (the root first).
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    /// The root node, once one was added.
    pub fn root(&self) -> Option<NodeId> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(NodeId(0))
        }
    }

    /// Add the root node. Must be the first node added.
    pub fn add_root(&mut self, kind: NodeKind, token: Option<Token>) -> NodeId {
        assert!(self.nodes.is_empty(), "root must be the first node");
        self.push_node(kind, token, None)
    }

    /// Append a child under `parent` and return its id.
    pub fn add_child(&mut self, parent: NodeId, kind: NodeKind, token: Option<Token>) -> NodeId {
        let id = self.push_node(kind, token, Some(parent));
        self.nodes[parent.0].children.push(id);
        id
    }

    fn push_node(&mut self, kind: NodeKind, token: Option<Token>, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(AstNode {
            kind,
            token,
            repeat: false,
            parent,
            children: Vec::new(),
        });
        id
    }

    pub fn node(&self, id: NodeId) -> &AstNode {
        &self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.0].kind
    }

    pub fn token(&self, id: NodeId) -> Option<&Token> {
        self.nodes[id.0].token.as_ref()
    }

    /// Token value of a terminal node, empty for structural nodes.
    pub fn token_value(&self, id: NodeId) -> &str {
        self.nodes[id.0]
            .token
            .as_ref()
            .map(|t| t.value.as_str())
            .unwrap_or("")
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn repeat(&self, id: NodeId) -> bool {
        self.nodes[id.0].repeat
    }

    pub fn set_repeat(&mut self, id: NodeId, repeat: bool) {
        self.nodes[id.0].repeat = repeat;
    }

    /// First child of `id` with the given kind.
    pub fn find_child(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.children(id).iter().copied().find(|&c| self.kind(c) == kind)
    }

    /// Detach and return the children of `parent` from index `start` on.
    /// The detached nodes keep their old parent pointer until adopted.
    pub fn take_children_from(&mut self, parent: NodeId, start: usize) -> Vec<NodeId> {
        self.nodes[parent.0].children.split_off(start)
    }

    /// Append `children` under `new_parent`, re-pointing their parent.
    pub fn adopt_children(&mut self, new_parent: NodeId, children: Vec<NodeId>) {
        for &child in &children {
            self.nodes[child.0].parent = Some(new_parent);
        }
        self.nodes[new_parent.0].children.extend(children);
    }

    /// Interpose a node of `kind` between `id` and its current children:
    /// the new node adopts all of them and becomes the sole child of
    /// `id`. Returns the new node.
    pub fn replace_children_with_group(&mut self, id: NodeId, kind: NodeKind) -> NodeId {
        let old_children = std::mem::take(&mut self.nodes[id.0].children);
        let group = self.push_node(kind, None, Some(id));
        self.nodes[id.0].children.push(group);
        self.adopt_children(group, old_children);
        group
    }
}
