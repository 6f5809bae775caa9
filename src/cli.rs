//! Command-line flags.

use crate::config::Config;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

/// Compose chat messages in the terminal, with foldable paste snippets
#[derive(Parser, Debug, Default)]
#[command(name = "quill", version, about)]
pub struct Cli {
    /// Config file (default: <config dir>/quill/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Visible rows of the collapsed composer
    #[arg(long = "max-rows", value_name = "N")]
    pub max_rows: Option<usize>,

    /// Files to attach before the first message
    #[arg(long, value_name = "PATH", num_args = 1..)]
    pub attach: Vec<PathBuf>,

    /// Append every sent message to this file as a JSON line
    #[arg(long, value_name = "PATH")]
    pub transcript: Option<PathBuf>,
}

impl Cli {
    /// Load config from `--config` or the default path, then apply flag
    /// overrides.
    ///
    /// Precedence (highest to lowest):
    /// 1. CLI flags
    /// 2. Config file
    /// 3. Built-in defaults
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };
        if let Some(rows) = self.max_rows {
            config.maximum_rows = rows;
        }
        config.validate().context("Invalid command-line override")?;
        Ok(config)
    }
}
