//! Shared test utilities for astbridge integration tests.
//!
//! The "mini" language stands in for a real parser binary:
//!
//! ```text
//! x = 1;   # comment
//! y = x;
//! ```
//!
//! Statements are everything up to a `;`. [`MiniParser`] tokenizes and parses
//! it in-process and answers like an external parser would.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use astbridge::{
    CancelToken, Error, Grammar, Invocation, KindTable, ParseResult, ParserClient, ParserConfig, Result,
    SyntaxTree, ToolOutput, ToolRunner,
};
use serde_json::{Value, json};

pub const PROGRAM: u32 = 100;
pub const STATEMENT_LIST: u32 = 101;
pub const STATEMENT: u32 = 102;
pub const EXPR: u32 = 103;

pub const WHITESPACE: u32 = 1;
pub const NAME: u32 = 2;
pub const NUMBER: u32 = 3;
pub const EQUALS: u32 = 4;
pub const SEMICOLON: u32 = 5;
pub const COMMENT: u32 = 6;

pub const MINI_VERSION: &str = "mini 1.0";

/// Grammar of the mini language.
pub fn mini_grammar() -> Grammar {
    let nodes = KindTable::from_entries([
        (PROGRAM, "PROGRAM"),
        (STATEMENT_LIST, "STATEMENT_LIST"),
        (STATEMENT, "STATEMENT"),
        (EXPR, "EXPR"),
    ])
    .expect("node kinds");
    let tokens = KindTable::from_entries([
        (WHITESPACE, "WHITESPACE"),
        (NAME, "NAME"),
        (NUMBER, "NUMBER"),
        (EQUALS, "EQUALS"),
        (SEMICOLON, "SEMICOLON"),
        (COMMENT, "COMMENT"),
    ])
    .expect("token kinds");

    Grammar::new("mini", nodes, tokens, "STATEMENT")
        .expect("grammar")
        .with_statement_terminator(";\n")
        .expect("terminator")
        .with_trivia(&["WHITESPACE", "COMMENT"])
        .expect("trivia")
}

/// A parser binary path no other test uses.
///
/// Availability is cached per binary for the whole test process.
pub fn unique_binary(label: &str) -> String {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    format!("/mini/{label}-{}", NEXT.fetch_add(1, Ordering::SeqCst))
}

/// Configuration for the mini parser without a version check.
pub fn mini_config(label: &str) -> ParserConfig {
    ParserConfig::new("Mini", unique_binary(label), mini_grammar())
}

/// Client backed by a fresh [`MiniParser`].
pub fn mini_client() -> (ParserClient, Arc<MiniParser>) {
    client_with(mini_config("client"), MiniParser::new())
}

/// Client for `config` backed by `runner`.
pub fn client_with<R: ToolRunner + 'static>(
    config: ParserConfig,
    runner: R,
) -> (ParserClient, Arc<R>) {
    let runner = Arc::new(runner);
    let client = ParserClient::with_runner(config, Arc::clone(&runner) as Arc<dyn ToolRunner>)
        .expect("client");
    (client, runner)
}

/// Build a tree straight from a JSON parse result.
pub fn tree_from_json(payload: &Value, source: &str) -> Result<SyntaxTree> {
    let bytes = serde_json::to_vec(payload).expect("serializable payload");
    let result = ParseResult::from_json(&bytes).expect("well-formed parse result");
    SyntaxTree::from_parse_result(result, source, Arc::new(mini_grammar()))
}

/// In-process stand-in for a mini language parser executable.
#[derive(Debug, Default)]
pub struct MiniParser {
    pub parses: AtomicUsize,
    pub probes: AtomicUsize,
}

impl MiniParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse_count(&self) -> usize {
        self.parses.load(Ordering::SeqCst)
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

impl ToolRunner for MiniParser {
    fn run(&self, invocation: &Invocation<'_>) -> Result<ToolOutput> {
        if is_version_probe(invocation) {
            self.probes.fetch_add(1, Ordering::SeqCst);
            return Ok(ToolOutput::success(format!("{MINI_VERSION}\n")));
        }

        if invocation.cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(Error::Cancelled {
                program: invocation.program.display().to_string(),
            });
        }

        self.parses.fetch_add(1, Ordering::SeqCst);
        let source = String::from_utf8_lossy(invocation.stdin);
        Ok(match parse_mini(&source) {
            Ok(payload) => ToolOutput::success(payload.to_string()),
            Err(report) => ToolOutput::failure(1, report),
        })
    }
}

/// Runner that answers every parse with the same output.
#[derive(Debug)]
pub struct ScriptedRunner {
    pub output: ToolOutput,
    pub parses: AtomicUsize,
}

impl ScriptedRunner {
    pub fn new(output: ToolOutput) -> Self {
        Self {
            output,
            parses: AtomicUsize::new(0),
        }
    }

    pub fn failing(exit_code: i32, stderr: &str) -> Self {
        Self::new(ToolOutput::failure(exit_code, stderr))
    }

    pub fn printing(stdout: &str) -> Self {
        Self::new(ToolOutput::success(stdout))
    }
}

impl ToolRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation<'_>) -> Result<ToolOutput> {
        if is_version_probe(invocation) {
            return Ok(ToolOutput::success(MINI_VERSION));
        }
        self.parses.fetch_add(1, Ordering::SeqCst);
        Ok(self.output.clone())
    }
}

/// Runner for a parser binary that does not exist.
#[derive(Debug, Default)]
pub struct MissingRunner;

impl ToolRunner for MissingRunner {
    fn run(&self, invocation: &Invocation<'_>) -> Result<ToolOutput> {
        Err(Error::ToolNotFound {
            program: invocation.program.display().to_string(),
        })
    }
}

fn is_version_probe(invocation: &Invocation<'_>) -> bool {
    invocation.args.first().map(String::as_str) == Some("--version")
}

fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}

/// Tokenize and parse mini source into the parser's JSON output.
///
/// Returns the parser's stderr report on a syntax error.
pub fn parse_mini(source: &str) -> std::result::Result<Value, String> {
    let stream = tokenize(source)?;

    let mut list = Vec::new();
    let mut open: Option<Vec<Value>> = None;
    for (index, (kind, _, _)) in stream.iter().enumerate() {
        let trivia = *kind == WHITESPACE || *kind == COMMENT;
        if *kind == SEMICOLON {
            let expr = open.take().unwrap_or_default();
            list.push(json!({
                "kind": STATEMENT,
                "children": [{"kind": EXPR, "children": expr}, index],
            }));
        } else if trivia && open.is_none() {
            list.push(json!(index));
        } else {
            open.get_or_insert_with(Vec::new).push(json!(index));
        }
    }

    if let Some(unterminated) = open {
        let first = unterminated[0].as_u64().expect("token index") as usize;
        let line = line_of(source, stream[first].2);
        return Err(format!(
            "Mini Parse Error: unterminated statement on line {line}"
        ));
    }

    let stream: Vec<Value> = stream
        .into_iter()
        .map(|(kind, value, offset)| json!({"kind": kind, "value": value, "offset": offset}))
        .collect();

    Ok(json!({
        "tree": {"kind": PROGRAM, "children": [{"kind": STATEMENT_LIST, "children": list}]},
        "stream": stream,
    }))
}

fn tokenize(source: &str) -> std::result::Result<Vec<(u32, &str, usize)>, String> {
    let mut tokens = Vec::new();
    let mut rest = source.char_indices().peekable();

    while let Some(&(start, c)) = rest.peek() {
        let kind = match c {
            c if c.is_whitespace() => WHITESPACE,
            '#' => COMMENT,
            c if c.is_ascii_alphabetic() || c == '_' || c == '$' => NAME,
            c if c.is_ascii_digit() => NUMBER,
            '=' => EQUALS,
            ';' => SEMICOLON,
            other => {
                return Err(format!(
                    "Mini Parse Error: unexpected '{other}' on line {}",
                    line_of(source, start)
                ));
            }
        };

        rest.next();
        let continues = |c: char| match kind {
            WHITESPACE => c.is_whitespace(),
            COMMENT => c != '\n',
            NAME => c.is_ascii_alphanumeric() || c == '_',
            NUMBER => c.is_ascii_digit(),
            _ => false,
        };
        while rest.next_if(|&(_, c)| continues(c)).is_some() {}

        let end = rest.peek().map_or(source.len(), |&(i, _)| i);
        tokens.push((kind, &source[start..end], start));
    }

    Ok(tokens)
}
