//! Configuration for the external parser.
//!
//! A configuration file (YAML) names the parser binary, how to probe and
//! rebuild it, and carries the grammar description that matches it:
//!
//! ```yaml
//! tool_name: XHPAST
//! binary: bin/xhpast
//! expected_version: "xhpast version 5.5.8/1g"
//! build_command: ["scripts/build_xhpast.sh"]
//! timeout_secs: 30
//! grammar:
//!   name: php
//!   statement_kind: n_STATEMENT
//!   node_kinds: { 9000: n_PROGRAM, 9002: n_STATEMENT }
//!   token_kinds: { 1: T_OPEN_TAG }
//! ```
//!
//! Relative paths are resolved against the directory of the configuration
//! file. The `ASTBRIDGE_BINARY` environment variable overrides `binary`.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::grammar::Grammar;

/// Environment variable that overrides the configured parser binary.
pub const BINARY_ENV_VAR: &str = "ASTBRIDGE_BINARY";

/// Default configuration file name looked up by the CLI.
pub const DEFAULT_CONFIG_FILE: &str = "astbridge.yaml";

/// How to invoke, probe and rebuild the external parser.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParserConfig {
    /// Name the parser uses in its error messages (`"<tool_name> Parse Error: ..."`).
    pub tool_name: String,
    /// Path to the parser executable.
    pub binary: PathBuf,
    /// Flag that makes the parser print its version.
    #[serde(default = "default_version_flag")]
    pub version_flag: String,
    /// Version string the parser must report; `None` skips the check.
    #[serde(default)]
    pub expected_version: Option<String>,
    /// Program and arguments that rebuild the parser.
    #[serde(default)]
    pub build_command: Vec<String>,
    /// Custom remediation text shown when the parser is unavailable.
    #[serde(default)]
    pub build_instructions: Option<String>,
    /// Kill the parser if it runs longer than this.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Kill the build command if it runs longer than this.
    #[serde(default = "default_build_timeout_secs")]
    pub build_timeout_secs: u64,
    /// Whether to run the version check before parsing.
    #[serde(default = "default_check_version")]
    pub check_version: bool,
    /// Kinds and conventions of the parser's grammar.
    pub grammar: Grammar,
}

fn default_version_flag() -> String {
    "--version".to_string()
}

fn default_build_timeout_secs() -> u64 {
    600
}

fn default_check_version() -> bool {
    true
}

impl ParserConfig {
    /// Create a configuration with default probing settings.
    #[must_use]
    pub fn new(tool_name: impl Into<String>, binary: impl Into<PathBuf>, grammar: Grammar) -> Self {
        Self {
            tool_name: tool_name.into(),
            binary: binary.into(),
            version_flag: default_version_flag(),
            expected_version: None,
            build_command: Vec::new(),
            build_instructions: None,
            timeout_secs: None,
            build_timeout_secs: default_build_timeout_secs(),
            check_version: default_check_version(),
            grammar,
        }
    }

    /// Require the parser to report this version.
    #[must_use]
    pub fn with_expected_version(mut self, version: impl Into<String>) -> Self {
        self.expected_version = Some(version.into());
        self
    }

    /// Set the command used to rebuild an outdated parser.
    #[must_use]
    pub fn with_build_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.build_command = command.into_iter().map(Into::into).collect();
        self
    }

    /// Kill the parser after this many seconds.
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Load a configuration file and apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read and [`Error::Config`]
    /// if it is not a valid configuration.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("cannot read config '{}': {e}", path.display()),
            ))
        })?;

        let mut config = Self::from_yaml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.apply_env_overrides();

        debug!(
            config = %path.display(),
            tool = %config.tool_name,
            binary = %config.binary.display(),
            grammar = config.grammar.name(),
            "Loaded parser configuration"
        );
        Ok(config)
    }

    /// Parse a configuration from YAML text without touching the environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for invalid YAML or an invalid grammar.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| Error::Config(e.to_string()))?;
        if config.tool_name.trim().is_empty() {
            return Err(Error::Config("tool_name must not be empty".to_string()));
        }
        Ok(config)
    }

    /// Replace `binary` with `ASTBRIDGE_BINARY` if it is set.
    pub fn apply_env_overrides(&mut self) {
        if let Some(binary) = env::var_os(BINARY_ENV_VAR).filter(|v| !v.is_empty()) {
            debug!(
                env_var = BINARY_ENV_VAR,
                binary = %Path::new(&binary).display(),
                "Overriding parser binary from environment"
            );
            self.binary = PathBuf::from(binary);
        }
    }

    /// Resolve relative paths against `base`.
    ///
    /// Bare program names (no directory component) are left alone so they can
    /// still be found through `PATH`.
    pub fn resolve_paths(&mut self, base: &Path) {
        self.binary = resolve_against(base, &self.binary);
        if let Some(program) = self.build_command.first_mut() {
            *program = resolve_against(base, Path::new(program))
                .to_string_lossy()
                .into_owned();
        }
    }

    /// The configured time limit for one parser run.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// The time limit for one run of the build command.
    #[must_use]
    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.build_timeout_secs)
    }

    /// Whether the version check should run at all.
    #[must_use]
    pub fn version_check_enabled(&self) -> bool {
        self.check_version && self.expected_version.is_some()
    }

    /// Human-readable steps to get a working parser binary.
    #[must_use]
    pub fn build_instructions(&self) -> String {
        if let Some(custom) = &self.build_instructions {
            return custom.clone();
        }

        let mut text = format!(
            "Your version of '{}' is unbuilt or out of date.",
            self.binary.display()
        );
        if self.build_command.is_empty() {
            if let Some(expected) = &self.expected_version {
                text.push_str(&format!(
                    " Install a build that reports '{expected}' for `{} {}`.",
                    self.binary.display(),
                    self.version_flag
                ));
            }
        } else {
            text.push_str(&format!(
                " Run this command to build it:\n\n  $ {}\n",
                self.build_command.join(" ")
            ));
        }
        text
    }
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    let is_bare_name = path.components().count() == 1 && path.parent() == Some(Path::new(""));
    if path.is_absolute() || is_bare_name {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
tool_name: XHPAST
binary: bin/xhpast
expected_version: "xhpast version 5.5.8/1g"
build_command: ["scripts/build_xhpast.sh", "--fast"]
timeout_secs: 30
grammar:
  name: php
  statement_kind: n_STATEMENT
  node_kinds:
    9000: n_PROGRAM
    9002: n_STATEMENT
  token_kinds:
    1: T_OPEN_TAG
"#;

    #[test]
    fn parses_all_fields() {
        let config = ParserConfig::from_yaml_str(CONFIG).expect("valid config");

        assert_eq!(config.tool_name, "XHPAST");
        assert_eq!(config.version_flag, "--version");
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.build_timeout(), Duration::from_secs(600));
        assert!(config.version_check_enabled());
        assert_eq!(config.grammar.name(), "php");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let yaml = format!("{CONFIG}colour: blue\n");
        assert!(matches!(
            ParserConfig::from_yaml_str(&yaml),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn relative_paths_resolve_against_config_directory() {
        let mut config = ParserConfig::from_yaml_str(CONFIG).expect("valid config");
        config.resolve_paths(Path::new("/opt/php"));

        assert_eq!(config.binary, PathBuf::from("/opt/php/bin/xhpast"));
        assert_eq!(config.build_command[0], "/opt/php/scripts/build_xhpast.sh");
        assert_eq!(config.build_command[1], "--fast");
    }

    #[test]
    fn bare_program_names_are_left_for_path_lookup() {
        assert_eq!(
            resolve_against(Path::new("/opt"), Path::new("xhpast")),
            PathBuf::from("xhpast")
        );
    }

    #[test]
    fn build_instructions_mention_build_command() {
        let config = ParserConfig::from_yaml_str(CONFIG).expect("valid config");
        let text = config.build_instructions();

        assert!(text.contains("unbuilt or out of date"));
        assert!(text.contains("$ scripts/build_xhpast.sh --fast"));
    }

    #[test]
    fn version_check_disabled_without_expected_version() {
        let mut config = ParserConfig::from_yaml_str(CONFIG).expect("valid config");
        config.expected_version = None;
        assert!(!config.version_check_enabled());
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("astbridge.yaml");
        std::fs::write(&path, CONFIG).expect("write config");

        let config = ParserConfig::load(&path).expect("load config");

        // ASTBRIDGE_BINARY may be set in the environment running the tests
        if env::var_os(BINARY_ENV_VAR).is_none() {
            assert_eq!(config.binary, dir.path().join("bin/xhpast"));
        }
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let result = ParserConfig::load(Path::new("/definitely/not/here.yaml"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn shipped_example_config_is_valid() {
        let config = ParserConfig::from_yaml_str(include_str!("../astbridge.example.yaml"))
            .expect("example config should parse");

        assert_eq!(config.tool_name, "XHPAST");
        assert_eq!(config.build_command, ["make", "-C", "support/xhpast"]);
        assert_eq!(config.build_timeout(), Duration::from_secs(300));
        assert!(config.grammar.is_trivia(
            config.grammar.token_kind("T_WHITESPACE").expect("whitespace kind")
        ));
    }
}
