//! Node handles and traversal.

use std::fmt;

use tracing::trace;

use super::{ChildId, NodeData, NodeId, Span, SyntaxTree, Token};
use crate::kind::NodeKind;

/// A non-terminal element of a [`SyntaxTree`].
#[derive(Clone, Copy)]
pub struct Node<'t> {
    tree: &'t SyntaxTree,
    id: NodeId,
}

/// A direct child of a node: either a node or a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element<'t> {
    /// A nested node.
    Node(Node<'t>),
    /// A token.
    Token(Token<'t>),
}

impl<'t> Element<'t> {
    fn new(tree: &'t SyntaxTree, child: ChildId) -> Self {
        match child {
            ChildId::Node(id) => Self::Node(Node::new(tree, id)),
            ChildId::Token(id) => Self::Token(Token::new(tree, id)),
        }
    }

    /// The node, if this child is one.
    #[must_use]
    pub fn as_node(self) -> Option<Node<'t>> {
        match self {
            Self::Node(node) => Some(node),
            Self::Token(_) => None,
        }
    }

    /// The token, if this child is one.
    #[must_use]
    pub fn as_token(self) -> Option<Token<'t>> {
        match self {
            Self::Node(_) => None,
            Self::Token(token) => Some(token),
        }
    }

    /// Source span of the child.
    #[must_use]
    pub fn span(self) -> Span {
        match self {
            Self::Node(node) => node.span(),
            Self::Token(token) => token.span(),
        }
    }

    /// Source text of the child.
    #[must_use]
    pub fn text(self) -> &'t str {
        match self {
            Self::Node(node) => node.text(),
            Self::Token(token) => token.value(),
        }
    }
}

impl<'t> Node<'t> {
    pub(super) fn new(tree: &'t SyntaxTree, id: NodeId) -> Self {
        Self { tree, id }
    }

    fn data(&self) -> &'t NodeData {
        self.tree.node_data(self.id)
    }

    /// Id of this node within its tree.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The tree this node belongs to.
    #[must_use]
    pub fn tree(&self) -> &'t SyntaxTree {
        self.tree
    }

    /// Kind of this node.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.data().kind
    }

    /// Grammar name of this node's kind, e.g. `"n_STATEMENT"`.
    #[must_use]
    pub fn kind_name(&self) -> &'t str {
        // kinds are checked against the grammar when the tree is built
        self.tree.grammar.node_kind_name(self.kind()).unwrap_or_default()
    }

    /// Whether this node is of the given kind.
    #[must_use]
    pub fn is(&self, kind: NodeKind) -> bool {
        self.kind() == kind
    }

    /// Byte span from the start of the first token to the end of the last.
    ///
    /// Nodes without any token descendants have [`Span::EMPTY`].
    #[must_use]
    pub fn span(&self) -> Span {
        self.data().span.unwrap_or(Span::EMPTY)
    }

    /// Whether any token lies below this node.
    #[must_use]
    pub fn has_tokens(&self) -> bool {
        self.data().span.is_some()
    }

    /// Source text covered by this node, including whitespace and comments.
    #[must_use]
    pub fn text(&self) -> &'t str {
        self.tree.slice(self.span()).unwrap_or_default()
    }

    /// Token values of this node with trivia (whitespace, comments) left out.
    #[must_use]
    pub fn semantic_text(&self) -> String {
        self.tokens()
            .into_iter()
            .filter(|token| !token.is_trivia())
            .map(|token| token.value())
            .collect()
    }

    /// 1-based line of the node's first token.
    #[must_use]
    pub fn line_number(&self) -> Option<usize> {
        self.data().span.map(|span| self.tree.line_of(span.start))
    }

    /// The parent node; `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Node<'t>> {
        self.data().parent.map(|id| Node::new(self.tree, id))
    }

    /// Number of direct children.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.data().children.len()
    }

    /// Direct children in document order.
    pub fn children(&self) -> impl DoubleEndedIterator<Item = Element<'t>> + use<'t> {
        let tree = self.tree;
        self.data()
            .children
            .iter()
            .map(move |child| Element::new(tree, *child))
    }

    /// The direct child at `index`.
    #[must_use]
    pub fn child(&self, index: usize) -> Option<Element<'t>> {
        self.data()
            .children
            .get(index)
            .map(|child| Element::new(self.tree, *child))
    }

    /// Direct children that are nodes.
    pub fn child_nodes(&self) -> impl DoubleEndedIterator<Item = Node<'t>> + use<'t> {
        self.children().filter_map(Element::as_node)
    }

    /// The first direct child node of the given kind.
    #[must_use]
    pub fn child_of_kind(&self, kind: NodeKind) -> Option<Node<'t>> {
        self.child_nodes().find(|child| child.is(kind))
    }

    /// All nodes below this one, depth-first in document order.
    #[must_use]
    pub fn descendants(&self) -> Descendants<'t> {
        Descendants {
            tree: self.tree,
            stack: self.child_ids_reversed().collect(),
        }
    }

    /// Descendants of the given kind in document order.
    ///
    /// A kind that does not occur yields an empty list.
    #[must_use]
    pub fn select_descendants_of_kind(&self, kind: NodeKind) -> Vec<Node<'t>> {
        self.descendants().filter(|node| node.is(kind)).collect()
    }

    /// Descendants of any of the given kinds in document order.
    #[must_use]
    pub fn select_descendants_of_kinds(&self, kinds: &[NodeKind]) -> Vec<Node<'t>> {
        self.descendants()
            .filter(|node| kinds.contains(&node.kind()))
            .collect()
    }

    /// Descendants whose kind has the given grammar name.
    ///
    /// A name the grammar does not define yields an empty list.
    #[must_use]
    pub fn select_descendants_named(&self, name: &str) -> Vec<Node<'t>> {
        match self.tree.node_kind(name) {
            Some(kind) => self.select_descendants_of_kind(kind),
            None => {
                trace!(name, grammar = self.tree.grammar.name(), "Unknown node kind name");
                Vec::new()
            }
        }
    }

    /// All tokens below this node in document order.
    #[must_use]
    pub fn tokens(&self) -> Vec<Token<'t>> {
        self.walk_tokens().collect()
    }

    /// The first token below this node.
    #[must_use]
    pub fn first_token(&self) -> Option<Token<'t>> {
        self.walk_tokens().next()
    }

    fn walk_tokens(&self) -> impl Iterator<Item = Token<'t>> + use<'t> {
        let tree = self.tree;
        let mut stack: Vec<ChildId> = self.data().children.iter().rev().copied().collect();
        std::iter::from_fn(move || {
            while let Some(child) = stack.pop() {
                match child {
                    ChildId::Token(id) => return Some(Token::new(tree, id)),
                    ChildId::Node(id) => stack.extend(tree.node_data(id).children.iter().rev()),
                }
            }
            None
        })
    }

    fn child_ids_reversed(&self) -> impl Iterator<Item = NodeId> + use<'t> {
        self.data().children.iter().rev().filter_map(|child| child.node())
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id.0)
            .field("kind", &self.kind_name())
            .field("span", &self.span())
            .finish()
    }
}

/// Depth-first iterator over the descendants of a node.
pub struct Descendants<'t> {
    tree: &'t SyntaxTree,
    stack: Vec<NodeId>,
}

impl<'t> Iterator for Descendants<'t> {
    type Item = Node<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = Node::new(self.tree, id);
        self.stack.extend(node.child_ids_reversed());
        Some(node)
    }
}
