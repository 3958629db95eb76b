//! Grammar description shipped alongside the external parser.
//!
//! A grammar names every node and token kind the parser can emit, and records
//! the few syntactic facts the tree layer needs: which node kind is a
//! statement, how to wrap a fragment into a parseable unit, and which tokens
//! carry no meaning (whitespace, comments).

use std::collections::HashSet;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::kind::{KindTable, NodeKind, TokenKind};

const DEFAULT_STATEMENT_TERMINATOR: &str = ";\n";

/// Kind tables and syntactic conventions of one parser version.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawGrammar")]
pub struct Grammar {
    name: String,
    node_kinds: KindTable,
    token_kinds: KindTable,
    statement_kind: NodeKind,
    fragment_prefix: String,
    statement_terminator: String,
    trivia: HashSet<TokenKind>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGrammar {
    name: String,
    node_kinds: KindTable,
    token_kinds: KindTable,
    statement_kind: String,
    #[serde(default)]
    fragment_prefix: String,
    #[serde(default = "default_statement_terminator")]
    statement_terminator: String,
    #[serde(default)]
    trivia_tokens: Vec<String>,
}

fn default_statement_terminator() -> String {
    DEFAULT_STATEMENT_TERMINATOR.to_string()
}

impl TryFrom<RawGrammar> for Grammar {
    type Error = String;

    fn try_from(raw: RawGrammar) -> std::result::Result<Self, Self::Error> {
        let statement_kind = raw.node_kinds.id(&raw.statement_kind).ok_or_else(|| {
            format!(
                "statement kind '{}' is not a node kind of grammar '{}'",
                raw.statement_kind, raw.name
            )
        })?;

        let trivia = raw
            .trivia_tokens
            .iter()
            .map(|name| {
                raw.token_kinds.id(name).map(TokenKind).ok_or_else(|| {
                    format!("trivia token '{name}' is not a token kind of grammar '{}'", raw.name)
                })
            })
            .collect::<std::result::Result<HashSet<_>, _>>()?;

        if raw.statement_terminator.is_empty() {
            return Err(format!("grammar '{}' has an empty statement terminator", raw.name));
        }

        Ok(Self {
            name: raw.name,
            node_kinds: raw.node_kinds,
            token_kinds: raw.token_kinds,
            statement_kind: NodeKind(statement_kind),
            fragment_prefix: raw.fragment_prefix,
            statement_terminator: raw.statement_terminator,
            trivia,
        })
    }
}

impl Grammar {
    /// Build a grammar from kind tables.
    ///
    /// Uses an empty fragment prefix, `";\n"` as the statement terminator and
    /// no trivia tokens; see the `with_*` methods to change them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `statement_kind` is not one of the node
    /// kinds.
    pub fn new(
        name: impl Into<String>,
        node_kinds: KindTable,
        token_kinds: KindTable,
        statement_kind: &str,
    ) -> Result<Self> {
        RawGrammar {
            name: name.into(),
            node_kinds,
            token_kinds,
            statement_kind: statement_kind.to_string(),
            fragment_prefix: String::new(),
            statement_terminator: default_statement_terminator(),
            trivia_tokens: Vec::new(),
        }
        .try_into()
        .map_err(Error::Config)
    }

    /// Set the text prepended to fragments before parsing (e.g. `"<?php "`).
    #[must_use]
    pub fn with_fragment_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.fragment_prefix = prefix.into();
        self
    }

    /// Set the text that terminates a statement.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the terminator is empty.
    pub fn with_statement_terminator(mut self, terminator: impl Into<String>) -> Result<Self> {
        let terminator = terminator.into();
        if terminator.is_empty() {
            return Err(Error::Config(format!(
                "grammar '{}' has an empty statement terminator",
                self.name
            )));
        }
        self.statement_terminator = terminator;
        Ok(self)
    }

    /// Mark token kinds as trivia (whitespace, comments).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for names that are not token kinds.
    pub fn with_trivia(mut self, names: &[&str]) -> Result<Self> {
        for name in names {
            let kind = self.token_kind(name).ok_or_else(|| {
                Error::Config(format!(
                    "trivia token '{name}' is not a token kind of grammar '{}'",
                    self.name
                ))
            })?;
            self.trivia.insert(kind);
        }
        Ok(self)
    }

    /// Grammar name, e.g. `"php"`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All node kinds.
    #[must_use]
    pub fn node_kinds(&self) -> &KindTable {
        &self.node_kinds
    }

    /// All token kinds.
    #[must_use]
    pub fn token_kinds(&self) -> &KindTable {
        &self.token_kinds
    }

    /// Name of a node kind.
    #[must_use]
    pub fn node_kind_name(&self, kind: NodeKind) -> Option<&str> {
        self.node_kinds.name(kind.0)
    }

    /// Name of a token kind.
    #[must_use]
    pub fn token_kind_name(&self, kind: TokenKind) -> Option<&str> {
        self.token_kinds.name(kind.0)
    }

    /// Look up a node kind by name.
    #[must_use]
    pub fn node_kind(&self, name: &str) -> Option<NodeKind> {
        self.node_kinds.id(name).map(NodeKind)
    }

    /// Look up a token kind by name.
    #[must_use]
    pub fn token_kind(&self, name: &str) -> Option<TokenKind> {
        self.token_kinds.id(name).map(TokenKind)
    }

    /// The node kind of a single statement.
    #[must_use]
    pub fn statement_kind(&self) -> NodeKind {
        self.statement_kind
    }

    /// Whether tokens of this kind are whitespace or comments.
    #[must_use]
    pub fn is_trivia(&self, kind: TokenKind) -> bool {
        self.trivia.contains(&kind)
    }

    /// Turn a statement fragment into a complete parseable unit.
    ///
    /// Trailing whitespace and trailing copies of the terminator's visible
    /// characters are stripped before the prefix and terminator are added, so
    /// `"x = 1;"` and `"x = 1"` wrap identically.
    #[must_use]
    pub fn wrap_fragment(&self, fragment: &str) -> String {
        let mut body = fragment.trim_end();
        let visible = self.statement_terminator.trim();
        if !visible.is_empty() {
            body = body.trim_end_matches(visible);
        }
        format!(
            "{}{}{}",
            self.fragment_prefix, body, self.statement_terminator
        )
    }
}
