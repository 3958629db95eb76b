//! Common display utilities for CLI commands.

use std::env;

use colored::Colorize;

/// Environment variable that switches tree connectors to plain ASCII.
const ASCII_ENV_VAR: &str = "ASTBRIDGE_ASCII";

/// How to decorate terminal output.
#[derive(Debug, Clone, Copy)]
pub struct Style {
    /// Use `|--` instead of box-drawing characters.
    pub use_ascii: bool,
    /// Emit ANSI colors.
    pub use_colors: bool,
}

impl Style {
    /// Read the style from `ASTBRIDGE_ASCII` and `NO_COLOR`.
    pub fn from_env() -> Self {
        let use_ascii = match env::var(ASCII_ENV_VAR) {
            Ok(v) if v == "1" || v.eq_ignore_ascii_case("true") => true,
            Ok(v) if v == "0" || v.eq_ignore_ascii_case("false") || v.is_empty() => false,
            Ok(v) => {
                tracing::warn!(
                    env_var = ASCII_ENV_VAR,
                    value = %v,
                    "Invalid value (expected '1', 'true', '0', or 'false'), using default"
                );
                false
            }
            Err(_) => false,
        };

        // Respect NO_COLOR standard (https://no-color.org/)
        let use_colors = env::var("NO_COLOR").is_err();

        Self {
            use_ascii,
            use_colors,
        }
    }

    /// Branch, corner, pipe and blank segments for tree prefixes.
    pub fn connectors(self) -> [&'static str; 4] {
        if self.use_ascii {
            ["|-- ", "`-- ", "|   ", "    "]
        } else {
            ["├── ", "└── ", "│   ", "    "]
        }
    }

    /// Node kind names (cyan, bold).
    pub fn node_kind(self, text: &str) -> String {
        if self.use_colors {
            text.cyan().bold().to_string()
        } else {
            text.to_string()
        }
    }

    /// Token kind names (green).
    pub fn token_kind(self, text: &str) -> String {
        if self.use_colors {
            text.green().to_string()
        } else {
            text.to_string()
        }
    }

    /// Connectors, spans and other secondary text.
    pub fn muted(self, text: &str) -> String {
        if self.use_colors {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }
}

/// Shorten `text` to its first line and at most `max` characters.
pub fn preview(text: &str, max: usize) -> String {
    let first_line = text.lines().next().unwrap_or_default();
    let mut chars = first_line.chars();
    let shortened: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() || first_line.len() < text.trim_end().len() {
        format!("{shortened}…")
    } else {
        shortened
    }
}
