//! Classifying finished parser runs.
//!
//! | Exit code | stderr                                        | Outcome                 |
//! |-----------|-----------------------------------------------|-------------------------|
//! | 0         | anything                                      | stdout is decoded       |
//! | 1         | `<Tool> Parse Error: <message> on line <N>`   | [`Error::Syntax`]       |
//! | 1         | anything else                                 | [`Error::InternalTool`] |
//! | other     | anything                                      | [`Error::InternalTool`] |

use regex::Regex;
use tracing::debug;

use super::runner::ToolOutput;
use crate::error::{Error, Result};

/// Recognizes the syntax error report of one parser.
#[derive(Debug, Clone)]
pub(crate) struct SyntaxErrorPattern {
    tool: String,
    regex: Regex,
}

impl SyntaxErrorPattern {
    pub(crate) fn new(tool: &str) -> Result<Self> {
        let pattern = format!(
            r"(?s)^{} Parse Error: (.*) on line (\d+)",
            regex::escape(tool)
        );
        let regex = Regex::new(&pattern).map_err(|e| {
            Error::Config(format!("invalid syntax error pattern for '{tool}': {e}"))
        })?;
        Ok(Self {
            tool: tool.to_string(),
            regex,
        })
    }

    /// Turn a finished run into its stdout or a classified failure.
    pub(crate) fn classify(&self, output: ToolOutput) -> Result<Vec<u8>> {
        match output.exit_code {
            Some(0) => Ok(output.stdout),
            Some(1) => {
                let stderr = output.stderr_lossy();
                match self.syntax_error(&stderr) {
                    Some(error) => {
                        debug!(tool = %self.tool, line = error.syntax_line(), "Parser rejected input");
                        Err(error)
                    }
                    None => Err(self.internal(Some(1), stderr)),
                }
            }
            code => Err(self.internal(code, output.stderr_lossy())),
        }
    }

    fn syntax_error(&self, stderr: &str) -> Option<Error> {
        let captures = self.regex.captures(stderr)?;
        let line = captures[2].parse().ok()?;
        Some(Error::Syntax {
            tool: self.tool.clone(),
            line,
            message: captures[1].trim().to_string(),
            stderr: stderr.trim().to_string(),
        })
    }

    fn internal(&self, exit_code: Option<i32>, stderr: String) -> Error {
        debug!(tool = %self.tool, exit_code = ?exit_code, "Parser failed");
        Error::internal_tool(&self.tool, exit_code, stderr)
    }
}
