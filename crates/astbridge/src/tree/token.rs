//! Token handles.

use std::fmt;

use super::{Node, Span, SyntaxTree, TokenData, TokenId};
use crate::kind::TokenKind;

/// A terminal element of a [`SyntaxTree`].
#[derive(Clone, Copy)]
pub struct Token<'t> {
    tree: &'t SyntaxTree,
    id: TokenId,
}

impl<'t> Token<'t> {
    pub(super) fn new(tree: &'t SyntaxTree, id: TokenId) -> Self {
        Self { tree, id }
    }

    fn data(&self) -> &'t TokenData {
        self.tree.token_data(self.id)
    }

    /// Position of this token in the stream.
    #[must_use]
    pub fn id(&self) -> TokenId {
        self.id
    }

    /// Kind of this token.
    #[must_use]
    pub fn kind(&self) -> TokenKind {
        self.data().kind
    }

    /// Grammar name of this token's kind, e.g. `"T_VARIABLE"`.
    #[must_use]
    pub fn kind_name(&self) -> &'t str {
        self.tree
            .grammar
            .token_kind_name(self.kind())
            .unwrap_or_default()
    }

    /// Literal text of the token.
    #[must_use]
    pub fn value(&self) -> &'t str {
        &self.data().value
    }

    /// Byte offset of the token in the source.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.data().span.start
    }

    /// Byte span of the token.
    #[must_use]
    pub fn span(&self) -> Span {
        self.data().span
    }

    /// 1-based line the token starts on.
    #[must_use]
    pub fn line_number(&self) -> usize {
        self.tree.line_of(self.offset())
    }

    /// Whether the grammar treats this token as whitespace or a comment.
    #[must_use]
    pub fn is_trivia(&self) -> bool {
        self.tree.grammar.is_trivia(self.kind())
    }

    /// The node this token is a child of.
    ///
    /// `None` for tokens in the stream that no node references.
    #[must_use]
    pub fn parent(&self) -> Option<Node<'t>> {
        self.data().parent.map(|id| Node::new(self.tree, id))
    }
}

impl PartialEq for Token<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for Token<'_> {}

impl fmt::Debug for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("id", &self.id.0)
            .field("kind", &self.kind_name())
            .field("value", &self.value())
            .field("offset", &self.offset())
            .finish()
    }
}
