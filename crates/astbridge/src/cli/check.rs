//! `astbridge check` command implementation.

use std::path::Path;

use colored::Colorize;

/// Run the check command.
pub fn run(config: &Path) -> anyhow::Result<()> {
    let client = super::load_client(config)?;
    let config = client.config();

    println!("{}", "Astbridge Parser Status".cyan().bold());
    println!();
    println!("  {}: {}", "Tool".white().bold(), config.tool_name);
    println!("  {}: {}", "Binary".white().bold(), config.binary.display());
    println!(
        "  {}: {}",
        "Grammar".white().bold(),
        client.grammar().name()
    );
    println!(
        "  {}: {}",
        "Expected".white().bold(),
        config.expected_version.as_deref().unwrap_or("any")
    );
    println!(
        "  {}: {}",
        "Reported".white().bold(),
        client
            .version()
            .unwrap_or_else(|| "not runnable".red().to_string())
    );
    println!();

    client.ensure_available()?;
    println!("  {}", "Parser is ready".green());
    Ok(())
}
