//! Error types for astbridge operations.
//!
//! Failures are split along the same line a caller has to draw when deciding
//! what to do with them:
//!
//! - **Input problems**: the source text was invalid ([`Error::Syntax`]) or the
//!   caller broke a contract ([`Error::Validation`]). These are expected during
//!   normal use and usually end up in front of the end user.
//! - **Internal problems**: the external parser crashed, produced output in the
//!   wrong shape, emitted an inconsistent tree, or is missing altogether. These
//!   carry the raw diagnostics (stderr, payload) needed to debug the
//!   environment.
//!
//! No variant ever accompanies a partially built tree.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Result type for astbridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for astbridge operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The source text does not parse.
    #[error("{tool} parse error on line {line}: {message}")]
    Syntax {
        /// Name of the parser that rejected the input.
        tool: String,
        /// 1-based line number reported by the parser.
        line: u32,
        /// The parser's message, without the line suffix.
        message: String,
        /// Full trimmed stderr of the parser.
        stderr: String,
    },

    /// The external parser failed for a reason unrelated to the input.
    #[error("{tool} failed ({}): {stderr}", describe_exit(.exit_code))]
    InternalTool {
        /// Name of the parser that failed.
        tool: String,
        /// Exit code, or `None` if the process was killed by a signal.
        exit_code: Option<i32>,
        /// Raw stderr of the process.
        stderr: String,
    },

    /// The parser exited successfully but its output could not be decoded.
    #[error("failed to decode {tool} output: {source}")]
    Decode {
        /// Name of the parser whose output was rejected.
        tool: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
        /// The raw stdout that failed to decode.
        payload: String,
    },

    /// The decoded parse result is internally inconsistent.
    #[error("malformed syntax tree: {0}")]
    MalformedTree(String),

    /// The parser binary is missing or outdated and could not be rebuilt.
    #[error("{instructions}")]
    BuildRequired {
        /// Human-readable remediation steps.
        instructions: String,
        /// The failure of the automatic build attempt, if one was made.
        #[source]
        source: Option<Box<Error>>,
    },

    /// A caller-level expectation about the parse result was not met.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The build command succeeded but the parser still reports the wrong version.
    #[error("{program} reports {} instead of '{expected}' after the build", describe_version(.found))]
    VersionMismatch {
        /// The parser that was rebuilt.
        program: String,
        /// The version the configuration asks for.
        expected: String,
        /// What the parser reported, or `None` if it could not be probed.
        found: Option<String>,
    },

    /// The parser executable does not exist.
    #[error("{program} not found")]
    ToolNotFound {
        /// The program that could not be found.
        program: String,
    },

    /// The parser process could not be started.
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        /// The program that failed to spawn.
        program: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The parser did not finish in time and was killed.
    #[error("{program} did not finish within {after:?}")]
    Timeout {
        /// The program that was killed.
        program: String,
        /// The configured time limit.
        after: Duration,
    },

    /// The caller cancelled the parse and the parser was killed.
    #[error("{program} invocation was cancelled")]
    Cancelled {
        /// The program that was killed.
        program: String,
    },

    /// I/O error while talking to the parser process or reading files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid configuration or grammar description.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Whether an error is the caller's problem or the environment's.
///
/// Mirrors the 4xx/5xx split: input errors can be fixed by changing the
/// source or the call, internal errors need someone to look at the setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid source text or a violated caller contract.
    Input,
    /// Broken, missing or incompatible parser, or an I/O failure.
    Internal,
}

impl Error {
    /// Create a malformed tree error.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedTree(reason.into())
    }

    /// Create a validation error.
    #[must_use]
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    /// Create an internal tool error from a raw exit code and stderr.
    #[must_use]
    pub fn internal_tool(tool: &str, exit_code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self::InternalTool {
            tool: tool.to_string(),
            exit_code,
            stderr: stderr.into(),
        }
    }

    /// Create a "build required" error with remediation instructions.
    #[must_use]
    pub fn build_required(instructions: impl Into<String>, source: Option<Error>) -> Self {
        Self::BuildRequired {
            instructions: instructions.into(),
            source: source.map(Box::new),
        }
    }

    /// Classify this error as an input or internal problem.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Syntax { .. } | Self::Validation(_) => ErrorCategory::Input,
            _ => ErrorCategory::Internal,
        }
    }

    /// Returns `true` if the source text or the call itself was at fault.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        self.category() == ErrorCategory::Input
    }

    /// Returns `true` if the parser or its environment was at fault.
    #[must_use]
    pub fn is_internal_error(&self) -> bool {
        self.category() == ErrorCategory::Internal
    }

    /// The line number of a syntax error, if this is one.
    #[must_use]
    pub fn syntax_line(&self) -> Option<u32> {
        match self {
            Self::Syntax { line, .. } => Some(*line),
            _ => None,
        }
    }
}

#[allow(clippy::ref_option)] // thiserror passes fields by reference
fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

#[allow(clippy::ref_option)]
fn describe_version(found: &Option<String>) -> String {
    match found {
        Some(version) => format!("'{version}'"),
        None => "no version".to_string(),
    }
}
