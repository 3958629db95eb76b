//! `astbridge kinds` command implementation.

use std::path::Path;

use astbridge::{NodeKind, TokenKind};
use colored::Colorize;

/// Run the kinds command.
pub fn run(config: &Path) -> anyhow::Result<()> {
    let config = super::load_config(config)?;
    let grammar = &config.grammar;

    println!(
        "{} ({} node kinds, {} token kinds)",
        format!("Grammar {}", grammar.name()).cyan().bold(),
        grammar.node_kinds().len(),
        grammar.token_kinds().len()
    );
    println!();

    println!("  {}", "Node kinds".white().bold());
    for (id, name) in grammar.node_kinds().iter() {
        let marker = if grammar.statement_kind() == NodeKind(id) {
            " (statement)".dimmed().to_string()
        } else {
            String::new()
        };
        println!("    {id:>6}  {name}{marker}");
    }
    println!();

    println!("  {}", "Token kinds".white().bold());
    for (id, name) in grammar.token_kinds().iter() {
        let marker = if grammar.is_trivia(TokenKind(id)) {
            " (trivia)".dimmed().to_string()
        } else {
            String::new()
        };
        println!("    {id:>6}  {name}{marker}");
    }
    Ok(())
}
