//! `astbridge select` command implementation.

use std::path::Path;

use anyhow::bail;

use super::display::{Style, preview};

const PREVIEW_CHARS: usize = 60;

/// Run the select command.
pub fn run(config: &Path, file: &Path, kind_name: &str) -> anyhow::Result<()> {
    let client = super::load_client(config)?;
    if client.grammar().node_kind(kind_name).is_none() {
        bail!(
            "'{kind_name}' is not a node kind of grammar '{}' (see `astbridge kinds`)",
            client.grammar().name()
        );
    }

    let source = super::read_source(file)?;
    let tree = client.parse(&source)?;
    let style = Style::from_env();

    let nodes = tree.root().select_descendants_named(kind_name);
    if nodes.is_empty() {
        println!("{}", style.muted(&format!("No {kind_name} nodes found")));
        return Ok(());
    }

    for node in &nodes {
        let line = node
            .line_number()
            .map_or_else(|| "-".to_string(), |line| line.to_string());
        println!(
            "  {:>5}  {}",
            style.muted(&line),
            preview(node.text(), PREVIEW_CHARS)
        );
    }
    println!();
    println!("{} {kind_name} node(s)", nodes.len());
    Ok(())
}
