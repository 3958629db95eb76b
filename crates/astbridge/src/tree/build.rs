//! Materializing a [`ParseResult`] into a [`SyntaxTree`].

use std::sync::Arc;

use tracing::debug;

use super::{ChildId, NodeData, NodeId, Span, SyntaxTree, TokenData, TokenId};
use crate::error::{Error, Result};
use crate::grammar::Grammar;
use crate::kind::{NodeKind, TokenKind};
use crate::payload::{ChildRef, NodeRecord, ParseResult, TokenRecord};

pub(super) fn build(result: ParseResult, source: String, grammar: Arc<Grammar>) -> Result<SyntaxTree> {
    let mut tokens = build_tokens(result.stream, &source, &grammar)?;
    let mut nodes = materialize(result.tree, &mut tokens, &grammar)?;
    compute_spans(&mut nodes, &tokens);
    let line_starts = line_starts(&source);

    debug!(
        grammar = grammar.name(),
        nodes = nodes.len(),
        tokens = tokens.len(),
        source_bytes = source.len(),
        "Built syntax tree"
    );

    Ok(SyntaxTree {
        source,
        grammar,
        tokens,
        nodes,
        line_starts,
    })
}

fn build_tokens(stream: Vec<TokenRecord>, source: &str, grammar: &Grammar) -> Result<Vec<TokenData>> {
    let mut tokens = Vec::with_capacity(stream.len());
    let mut previous_offset = 0;

    for (index, record) in stream.into_iter().enumerate() {
        if !grammar.token_kinds().contains(record.kind) {
            return Err(Error::malformed(format!(
                "token {index} has kind {} which grammar '{}' does not define",
                record.kind,
                grammar.name()
            )));
        }

        let end = record
            .offset
            .checked_add(record.value.len())
            .filter(|end| *end <= source.len())
            .ok_or_else(|| {
                Error::malformed(format!(
                    "token {index} ({} bytes at offset {}) extends past the end of the {}-byte source",
                    record.value.len(),
                    record.offset,
                    source.len()
                ))
            })?;

        if !source.is_char_boundary(record.offset) || !source.is_char_boundary(end) {
            return Err(Error::malformed(format!(
                "token {index} ({}..{end}) splits a character of the source",
                record.offset
            )));
        }

        if record.offset < previous_offset {
            return Err(Error::malformed(format!(
                "token {index} at offset {} precedes the previous token at offset {previous_offset}",
                record.offset
            )));
        }
        previous_offset = record.offset;

        tokens.push(TokenData {
            kind: TokenKind(record.kind),
            value: record.value,
            span: Span {
                start: record.offset,
                end,
            },
            parent: None,
        });
    }

    Ok(tokens)
}

/// Turn the nested description into preorder node storage.
///
/// Iterative so that deeply nested input cannot overflow the stack.
fn materialize(root: NodeRecord, tokens: &mut [TokenData], grammar: &Grammar) -> Result<Vec<NodeData>> {
    let mut nodes = Vec::new();
    let root_id = push_node(&mut nodes, root.kind, None, grammar)?;
    let mut stack = vec![(root_id, root.children.into_iter())];

    loop {
        let Some((parent, children)) = stack.last_mut() else {
            break;
        };
        let parent = *parent;
        let Some(child) = children.next() else {
            stack.pop();
            continue;
        };

        match child {
            ChildRef::Token(index) => {
                let token_count = tokens.len();
                let token = tokens.get_mut(index).ok_or_else(|| {
                    Error::malformed(format!(
                        "node {} references token {index}, but the stream has {token_count} tokens",
                        parent.0
                    ))
                })?;
                if let Some(owner) = token.parent {
                    return Err(Error::malformed(format!(
                        "token {index} is a child of both node {} and node {}",
                        owner.0, parent.0
                    )));
                }
                token.parent = Some(parent);
                nodes[parent.0].children.push(ChildId::Token(TokenId(index)));
            }
            ChildRef::Node(record) => {
                let id = push_node(&mut nodes, record.kind, Some(parent), grammar)?;
                nodes[parent.0].children.push(ChildId::Node(id));
                stack.push((id, record.children.into_iter()));
            }
            ChildRef::Invalid(raw) => {
                return Err(Error::malformed(format!(
                    "child of node {} is neither a token index nor a node record: {raw}",
                    parent.0
                )));
            }
        }
    }

    Ok(nodes)
}

fn push_node(
    nodes: &mut Vec<NodeData>,
    kind: u32,
    parent: Option<NodeId>,
    grammar: &Grammar,
) -> Result<NodeId> {
    let id = NodeId(nodes.len());
    if !grammar.node_kinds().contains(kind) {
        return Err(Error::malformed(format!(
            "node {} has kind {kind} which grammar '{}' does not define",
            id.0,
            grammar.name()
        )));
    }
    nodes.push(NodeData {
        kind: NodeKind(kind),
        parent,
        children: Vec::new(),
        span: None,
    });
    Ok(id)
}

/// Children always have larger ids than their parent, so a reverse sweep
/// sees every child span before it is needed.
fn compute_spans(nodes: &mut [NodeData], tokens: &[TokenData]) {
    for index in (0..nodes.len()).rev() {
        let span = nodes[index]
            .children
            .iter()
            .filter_map(|child| match child {
                ChildId::Token(token) => Some(tokens[token.0].span),
                ChildId::Node(node) => nodes[node.0].span,
            })
            .reduce(Span::cover);
        nodes[index].span = span;
    }
}

fn line_starts(source: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(source.match_indices('\n').map(|(index, _)| index + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::KindTable;

    fn grammar() -> Arc<Grammar> {
        let nodes = KindTable::from_entries([(10, "ROOT"), (11, "STMT"), (12, "EMPTY")])
            .expect("nodes");
        let tokens = KindTable::from_entries([(1, "WORD"), (2, "SPACE")]).expect("tokens");
        Arc::new(Grammar::new("test", nodes, tokens, "STMT").expect("grammar"))
    }

    fn token(kind: u32, value: &str, offset: usize) -> TokenRecord {
        TokenRecord::new(kind, value, offset)
    }

    #[test]
    fn line_starts_follow_newlines() {
        assert_eq!(line_starts("a\nbc\n"), vec![0, 2, 5]);
        assert_eq!(line_starts(""), vec![0]);
    }

    #[test]
    fn nodes_are_stored_in_preorder() {
        let result = ParseResult {
            tree: NodeRecord::new(
                10,
                vec![
                    ChildRef::Node(NodeRecord::new(11, vec![ChildRef::Token(0)])),
                    ChildRef::Token(1),
                    ChildRef::Node(NodeRecord::new(11, vec![ChildRef::Token(2)])),
                ],
            ),
            stream: vec![token(1, "a", 0), token(2, " ", 1), token(1, "b", 2)],
        };

        let tree = build(result, "a b".to_string(), grammar()).expect("valid tree");

        let kinds: Vec<u32> = tree.nodes.iter().map(|n| n.kind.0).collect();
        assert_eq!(kinds, vec![10, 11, 11]);
        assert_eq!(tree.nodes[1].parent, Some(NodeId(0)));
        assert_eq!(tree.tokens[1].parent, Some(NodeId(0)));
        assert_eq!(tree.nodes[0].span, Some(Span { start: 0, end: 3 }));
    }

    #[test]
    fn node_without_tokens_has_no_span() {
        let result = ParseResult {
            tree: NodeRecord::new(10, vec![ChildRef::Node(NodeRecord::new(12, vec![]))]),
            stream: vec![],
        };

        let tree = build(result, String::new(), grammar()).expect("valid tree");

        assert_eq!(tree.nodes[0].span, None);
        assert_eq!(tree.nodes[1].span, None);
    }

    #[test]
    fn zero_length_token_at_end_of_source_is_in_bounds() {
        let result = ParseResult {
            tree: NodeRecord::new(10, vec![ChildRef::Token(0), ChildRef::Token(1)]),
            stream: vec![token(1, "ab", 0), token(2, "", 2)],
        };

        let tree = build(result, "ab".to_string(), grammar()).expect("valid tree");
        assert_eq!(tree.nodes[0].span, Some(Span { start: 0, end: 2 }));
    }

    #[test]
    fn multibyte_split_is_rejected() {
        let result = ParseResult {
            tree: NodeRecord::new(10, vec![ChildRef::Token(0)]),
            stream: vec![token(1, "x", 1)],
        };

        let error = build(result, "é".to_string(), grammar()).expect_err("should fail");
        assert!(matches!(error, Error::MalformedTree(_)));
    }
}
