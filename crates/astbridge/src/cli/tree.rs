//! `astbridge tree` command implementation.

use std::io::{self, Write};
use std::path::Path;

use astbridge::{Element, Node, SyntaxTree, Token};
use serde_json::{Value, json};

use super::display::Style;

/// Run the tree command.
pub fn run(config: &Path, file: &Path, as_json: bool) -> anyhow::Result<()> {
    let client = super::load_client(config)?;
    let source = super::read_source(file)?;
    let tree = client.parse(&source)?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if as_json {
        let output = serde_json::to_string_pretty(&tree_to_json(&tree))?;
        writeln!(handle, "{output}")?;
    } else {
        print_tree(&mut handle, &tree, Style::from_env())?;
    }
    Ok(())
}

/// Render the tree with connector lines:
///
/// ```text
/// n_PROGRAM [0..14]
/// ├── T_OPEN_TAG "<?php\n"
/// └── n_STATEMENT_LIST [6..14]
///     └── n_STATEMENT [6..14]
/// ```
fn print_tree<W: Write>(w: &mut W, tree: &SyntaxTree, style: Style) -> io::Result<()> {
    let root = tree.root();
    writeln!(w, "{}", node_label(root, style))?;
    print_children(w, root, &mut Vec::new(), style)
}

/// `open` tracks which ancestor levels still have siblings below.
fn print_children<W: Write>(
    w: &mut W,
    node: Node<'_>,
    open: &mut Vec<bool>,
    style: Style,
) -> io::Result<()> {
    let [branch, corner, pipe, space] = style.connectors();
    let count = node.child_count();

    for (i, child) in node.children().enumerate() {
        let is_last = i + 1 == count;

        let prefix: String = open
            .iter()
            .map(|&has_more| style.muted(if has_more { pipe } else { space }))
            .collect();
        let connector = style.muted(if is_last { corner } else { branch });

        match child {
            Element::Node(child) => {
                writeln!(w, "{prefix}{connector}{}", node_label(child, style))?;
                open.push(!is_last);
                print_children(w, child, open, style)?;
                open.pop();
            }
            Element::Token(token) => {
                writeln!(w, "{prefix}{connector}{}", token_label(token, style))?;
            }
        }
    }
    Ok(())
}

fn node_label(node: Node<'_>, style: Style) -> String {
    let span = node.span();
    format!(
        "{} {}",
        style.node_kind(node.kind_name()),
        style.muted(&format!("[{}..{}]", span.start, span.end))
    )
}

fn token_label(token: Token<'_>, style: Style) -> String {
    format!("{} {:?}", style.token_kind(token.kind_name()), token.value())
}

fn tree_to_json(tree: &SyntaxTree) -> Value {
    node_to_json(tree.root())
}

fn node_to_json(node: Node<'_>) -> Value {
    let span = node.span();
    let children: Vec<Value> = node
        .children()
        .map(|child| match child {
            Element::Node(child) => node_to_json(child),
            Element::Token(token) => json!({
                "token": token.kind_name(),
                "value": token.value(),
                "offset": token.offset(),
            }),
        })
        .collect();

    json!({
        "kind": node.kind_name(),
        "span": [span.start, span.end],
        "children": children,
    })
}
