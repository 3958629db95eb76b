//! CLI command implementations.

mod display;

pub mod check;
pub mod kinds;
pub mod select;
pub mod tree;

use std::path::Path;

use anyhow::Context;
use astbridge::{ParserClient, ParserConfig};

/// Load the configuration file and create a client for it.
fn load_client(config: &Path) -> anyhow::Result<ParserClient> {
    let config = load_config(config)?;
    ParserClient::new(config).context("failed to create parser client")
}

fn load_config(path: &Path) -> anyhow::Result<ParserConfig> {
    ParserConfig::load(path)
        .with_context(|| format!("failed to load configuration '{}'", path.display()))
}

fn read_source(file: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("failed to read '{}'", file.display()))
}
