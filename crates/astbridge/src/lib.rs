//! # Astbridge: Syntax Trees from External Parsers
//!
//! Astbridge runs an external parser executable on source text, decodes the
//! JSON parse result it prints, and turns it into an immutable, navigable
//! [`SyntaxTree`] of nodes and tokens. Analysis code never talks to the
//! parser directly.
//!
//! ## Design Philosophy
//!
//! - **The parser is a black box** - Source goes in on stdin, JSON comes out on stdout
//! - **Data-driven grammars** - Kind ids and names come from a YAML [`Grammar`], not code
//! - **Honest failures** - Syntax errors and broken tooling are different [`Error`]s
//! - **All or nothing** - A tree is either fully valid or not built at all
//!
//! ## Quick Start
//!
//! ```no_run
//! use astbridge::{ParserClient, ParserConfig};
//! use std::path::Path;
//!
//! let config = ParserConfig::load(Path::new("astbridge.yaml"))?;
//! let client = ParserClient::new(config)?;
//!
//! let tree = client.parse("<?php\necho 1;\n")?;
//! for statement in tree.root().select_descendants_named("n_STATEMENT") {
//!     println!("line {:?}: {}", statement.line_number(), statement.text());
//! }
//!
//! let assignment = client.parse_statement("$x = 1")?;
//! println!("{}", assignment.node().semantic_text());
//! # Ok::<(), astbridge::Error>(())
//! ```

mod client;
mod config;
mod error;
mod grammar;
mod kind;
mod payload;
mod tree;

pub use client::{
    CancelToken, Invocation, ParserClient, ProcessRunner, ToolOutput, ToolRunner,
};
pub use config::{BINARY_ENV_VAR, DEFAULT_CONFIG_FILE, ParserConfig};
pub use error::{Error, ErrorCategory, Result};
pub use grammar::Grammar;
pub use kind::{KindTable, NodeKind, TokenKind};
pub use payload::{ChildRef, NodeRecord, ParseResult, TokenRecord};
pub use tree::{
    Descendants, Element, Node, NodeId, Span, Statement, SyntaxTree, Token, TokenId,
};
