//! The immutable syntax tree.
//!
//! A [`SyntaxTree`] owns the source text, the flat token stream and every
//! node. Nodes and tokens are stored in arenas and handed out as lightweight
//! [`Node`] and [`Token`] handles that borrow the tree, so queries never
//! allocate per element and a finished tree can be shared across threads.
//!
//! ## Invariants
//!
//! Construction either produces a tree satisfying all of these or fails with
//! [`Error::MalformedTree`](crate::Error::MalformedTree):
//!
//! - every kind id is known to the grammar
//! - every token lies within the source text, on character boundaries, and
//!   token offsets never decrease along the stream
//! - every token index referenced by a node exists, and no token has two
//!   parents
//! - nodes form a single tree below one root, stored in document order

mod build;
mod node;
mod token;

pub use node::{Descendants, Element, Node};
pub use token::Token;

use std::ops::Range;
use std::sync::Arc;

use crate::client::ParserClient;
use crate::error::{Error, Result};
use crate::grammar::Grammar;
use crate::kind::{NodeKind, TokenKind};
use crate::payload::ParseResult;

/// Index of a node within its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Extract the raw index.
    #[must_use]
    pub fn as_usize(self) -> usize {
        self.0
    }
}

/// Index of a token within the tree's token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(usize);

impl TokenId {
    /// Extract the raw index.
    #[must_use]
    pub fn as_usize(self) -> usize {
        self.0
    }
}

/// A half-open byte range `[start, end)` in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// First byte covered.
    pub start: usize,
    /// One past the last byte covered.
    pub end: usize,
}

impl Span {
    /// The span of a node without tokens.
    pub const EMPTY: Self = Self { start: 0, end: 0 };

    /// Create a span, returning `None` if `end` is before `start`.
    #[must_use]
    pub fn new(start: usize, end: usize) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(self) -> usize {
        self.end - self.start
    }

    /// Whether the span covers no bytes.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.start == self.end
    }

    /// Whether `offset` falls inside the span.
    #[must_use]
    pub fn contains(self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// The smallest span covering both.
    #[must_use]
    pub fn cover(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// The span as a range usable for slicing.
    #[must_use]
    pub fn range(self) -> Range<usize> {
        self.start..self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChildId {
    Node(NodeId),
    Token(TokenId),
}

impl ChildId {
    fn node(self) -> Option<NodeId> {
        match self {
            Self::Node(id) => Some(id),
            Self::Token(_) => None,
        }
    }
}

#[derive(Debug)]
struct TokenData {
    kind: TokenKind,
    value: String,
    span: Span,
    parent: Option<NodeId>,
}

#[derive(Debug)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<ChildId>,
    /// `None` when the node has no token descendants.
    span: Option<Span>,
}

/// A parsed source file: source text, tokens and nodes.
#[derive(Debug)]
pub struct SyntaxTree {
    source: String,
    grammar: Arc<Grammar>,
    tokens: Vec<TokenData>,
    /// Preorder; index 0 is the root.
    nodes: Vec<NodeData>,
    line_starts: Vec<usize>,
}

/// A single statement parsed from a fragment, together with its tree.
#[derive(Debug)]
pub struct Statement {
    tree: SyntaxTree,
    statement: NodeId,
}

impl Statement {
    /// The statement node.
    #[must_use]
    pub fn node(&self) -> Node<'_> {
        Node::new(&self.tree, self.statement)
    }

    /// The tree of the wrapped fragment.
    #[must_use]
    pub fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    /// Give up the statement handle and keep the tree.
    #[must_use]
    pub fn into_tree(self) -> SyntaxTree {
        self.tree
    }
}

impl SyntaxTree {
    /// Build a tree from a decoded parse result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedTree`] if the parse result is inconsistent
    /// with itself, the source text or the grammar.
    pub fn from_parse_result(
        result: ParseResult,
        source: impl Into<String>,
        grammar: Arc<Grammar>,
    ) -> Result<Self> {
        build::build(result, source.into(), grammar)
    }

    /// Run the external parser on `source` and build its tree.
    ///
    /// # Errors
    ///
    /// Returns whatever [`ParserClient::parse`] returns.
    pub fn parse(client: &ParserClient, source: &str) -> Result<Self> {
        client.parse(source)
    }

    /// Parse a fragment such as `"x = 1"` as exactly one statement.
    ///
    /// The fragment is wrapped by the grammar (prefix, terminator) before
    /// parsing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the wrapped fragment contains zero or
    /// several statements, and any parse error otherwise.
    pub fn new_statement_from_string(client: &ParserClient, fragment: &str) -> Result<Statement> {
        let source = client.grammar().wrap_fragment(fragment);
        let tree = client.parse(&source)?;

        let statement = {
            let kind = tree.grammar.statement_kind();
            let statements = tree.root().select_descendants_of_kind(kind);
            if statements.len() != 1 {
                return Err(Error::validation(format!(
                    "fragment does not parse into exactly one statement (found {})",
                    statements.len()
                )));
            }
            statements[0].id()
        };

        Ok(Statement { tree, statement })
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> Node<'_> {
        Node::new(self, NodeId(0))
    }

    /// The source text this tree was built from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The grammar the kinds of this tree belong to.
    #[must_use]
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Number of nodes, including the root.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of tokens in the stream.
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// The node with the given id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<Node<'_>> {
        (id.0 < self.nodes.len()).then(|| Node::new(self, id))
    }

    /// The token with the given id.
    #[must_use]
    pub fn token(&self, id: TokenId) -> Option<Token<'_>> {
        (id.0 < self.tokens.len()).then(|| Token::new(self, id))
    }

    /// All tokens in stream order.
    pub fn tokens(&self) -> impl ExactSizeIterator<Item = Token<'_>> + '_ {
        (0..self.tokens.len()).map(move |index| Token::new(self, TokenId(index)))
    }

    /// The token covering `offset`, if any.
    #[must_use]
    pub fn token_at_offset(&self, offset: usize) -> Option<Token<'_>> {
        let index = self
            .tokens
            .partition_point(|token| token.span.start <= offset)
            .checked_sub(1)?;
        self.tokens[index]
            .span
            .contains(offset)
            .then(|| Token::new(self, TokenId(index)))
    }

    /// Look up a node kind by name.
    #[must_use]
    pub fn node_kind(&self, name: &str) -> Option<NodeKind> {
        self.grammar.node_kind(name)
    }

    /// Look up a token kind by name.
    #[must_use]
    pub fn token_kind(&self, name: &str) -> Option<TokenKind> {
        self.grammar.token_kind(name)
    }

    /// Name of a node kind, if the grammar knows it.
    #[must_use]
    pub fn node_kind_name(&self, kind: NodeKind) -> Option<&str> {
        self.grammar.node_kind_name(kind)
    }

    /// Name of a token kind, if the grammar knows it.
    #[must_use]
    pub fn token_kind_name(&self, kind: TokenKind) -> Option<&str> {
        self.grammar.token_kind_name(kind)
    }

    /// The source text covered by `span`.
    ///
    /// Returns `None` if the span is out of bounds or splits a character.
    #[must_use]
    pub fn slice(&self, span: Span) -> Option<&str> {
        self.source.get(span.range())
    }

    /// 1-based line number of a byte offset.
    #[must_use]
    pub fn line_of(&self, offset: usize) -> usize {
        self.line_starts.partition_point(|&start| start <= offset)
    }

    fn node_data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    fn token_data(&self, id: TokenId) -> &TokenData {
        &self.tokens[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_constructor_rejects_reversed_ranges() {
        assert_eq!(Span::new(3, 5), Some(Span { start: 3, end: 5 }));
        assert_eq!(Span::new(5, 3), None);
        assert!(Span::new(4, 4).expect("empty span").is_empty());
    }

    #[test]
    fn cover_takes_outermost_bounds() {
        let a = Span { start: 2, end: 4 };
        let b = Span { start: 6, end: 9 };
        assert_eq!(a.cover(b), Span { start: 2, end: 9 });
        assert_eq!(b.cover(a), Span { start: 2, end: 9 });
    }

    #[test]
    fn contains_is_half_open() {
        let span = Span { start: 2, end: 4 };
        assert!(!span.contains(1));
        assert!(span.contains(2));
        assert!(span.contains(3));
        assert!(!span.contains(4));
    }
}
