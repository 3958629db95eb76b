//! Client for the external parser.
//!
//! [`ParserClient`] owns a [`ParserConfig`] and a [`ToolRunner`]. Each parse
//! checks that the parser is available, runs it with the source on stdin,
//! classifies the outcome and decodes stdout into a [`ParseResult`].

mod availability;
mod classify;
mod runner;

use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, trace};

pub use runner::{CancelToken, Invocation, ProcessRunner, ToolOutput, ToolRunner};

use crate::config::ParserConfig;
use crate::error::{Error, Result};
use crate::grammar::Grammar;
use crate::payload::ParseResult;
use crate::tree::{Statement, SyntaxTree};
use classify::SyntaxErrorPattern;

/// Runs the configured external parser and builds syntax trees from it.
///
/// The client holds no per-parse state and can be shared across threads.
#[derive(Clone)]
pub struct ParserClient {
    config: ParserConfig,
    grammar: Arc<Grammar>,
    runner: Arc<dyn ToolRunner>,
    syntax_errors: SyntaxErrorPattern,
}

impl fmt::Debug for ParserClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserClient")
            .field("tool", &self.config.tool_name)
            .field("binary", &self.config.binary)
            .field("grammar", &self.grammar.name())
            .finish_non_exhaustive()
    }
}

impl ParserClient {
    /// Create a client that spawns the configured binary.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the tool name cannot be turned into a
    /// syntax error pattern.
    pub fn new(config: ParserConfig) -> Result<Self> {
        Self::with_runner(config, Arc::new(ProcessRunner))
    }

    /// Create a client that runs the parser through `runner`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the tool name cannot be turned into a
    /// syntax error pattern.
    pub fn with_runner(config: ParserConfig, runner: Arc<dyn ToolRunner>) -> Result<Self> {
        let syntax_errors = SyntaxErrorPattern::new(&config.tool_name)?;
        let grammar = Arc::new(config.grammar.clone());
        Ok(Self {
            config,
            grammar,
            runner,
            syntax_errors,
        })
    }

    /// The configuration this client was created with.
    #[must_use]
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// The grammar shared by every tree this client builds.
    #[must_use]
    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    /// Check that the parser reports the expected version, building it if
    /// needed.
    ///
    /// Runs implicitly before every parse; a success is remembered for the
    /// rest of the process.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BuildRequired`] if the parser is missing or outdated
    /// and could not be rebuilt.
    pub fn ensure_available(&self) -> Result<()> {
        availability::ensure_available(self.runner.as_ref(), &self.config)
    }

    /// The version the parser reports right now, if it runs at all.
    #[must_use]
    pub fn version(&self) -> Option<String> {
        availability::probe_version(self.runner.as_ref(), &self.config)
    }

    /// Run the parser and decode its output without building a tree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Syntax`] if the parser rejects the source,
    /// [`Error::Decode`] if its output is not a parse result, and
    /// [`Error::InternalTool`], [`Error::BuildRequired`] or a process error
    /// if the parser could not do its job.
    pub fn run(&self, source: &str) -> Result<ParseResult> {
        self.invoke(source, None)
    }

    /// Parse `source` into a syntax tree.
    ///
    /// # Errors
    ///
    /// Everything [`run`](Self::run) returns, plus [`Error::MalformedTree`] if
    /// the parser's output is inconsistent.
    pub fn parse(&self, source: &str) -> Result<SyntaxTree> {
        let result = self.invoke(source, None)?;
        SyntaxTree::from_parse_result(result, source, Arc::clone(&self.grammar))
    }

    /// Parse `source`, killing the parser if `cancel` fires first.
    ///
    /// # Errors
    ///
    /// Everything [`parse`](Self::parse) returns, plus [`Error::Cancelled`].
    pub fn parse_cancellable(&self, source: &str, cancel: &CancelToken) -> Result<SyntaxTree> {
        let result = self.invoke(source, Some(cancel))?;
        SyntaxTree::from_parse_result(result, source, Arc::clone(&self.grammar))
    }

    /// Parse many sources in parallel.
    ///
    /// Results come back in the order of `sources`; one failure does not
    /// affect the others.
    pub fn parse_many<S>(&self, sources: &[S]) -> Vec<Result<SyntaxTree>>
    where
        S: AsRef<str> + Sync,
    {
        debug!(count = sources.len(), "Parsing sources in parallel");
        sources
            .par_iter()
            .map(|source| self.parse(source.as_ref()))
            .collect()
    }

    /// Parse a fragment such as `"x = 1"` as exactly one statement.
    ///
    /// # Errors
    ///
    /// See [`SyntaxTree::new_statement_from_string`].
    pub fn parse_statement(&self, fragment: &str) -> Result<Statement> {
        SyntaxTree::new_statement_from_string(self, fragment)
    }

    fn invoke(&self, source: &str, cancel: Option<&CancelToken>) -> Result<ParseResult> {
        self.ensure_available()?;
        trace!(tool = %self.config.tool_name, bytes = source.len(), "Invoking parser");

        let invocation = Invocation {
            stdin: source.as_bytes(),
            timeout: self.config.timeout(),
            cancel,
            ..Invocation::new(&self.config.binary, &[])
        };
        let output = self.runner.run(&invocation)?;
        let stdout = self.syntax_errors.classify(output)?;

        ParseResult::from_json(&stdout).map_err(|source| Error::Decode {
            tool: self.config.tool_name.clone(),
            source,
            payload: String::from_utf8_lossy(&stdout).into_owned(),
        })
    }
}
