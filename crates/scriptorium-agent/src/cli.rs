//! Command-line interface.

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

use scriptorium_ingestion::Metadata;

#[derive(Parser, Debug)]
#[command(name = "scriptorium", version, about = "Collect and normalise content for script generation")]
pub struct Cli {
    /// Generation parameter forwarded with each published message (repeatable)
    #[arg(long = "params", value_name = "KEY=VALUE", value_parser = parse_param, global = true)]
    pub params: Vec<(String, Value)>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Collect Wikipedia or PubMed articles
    Url {
        #[arg(required = true)]
        urls: Vec<String>,
        /// Also list related Wikipedia articles
        #[arg(long)]
        related: bool,
    },
    /// Collect PDF, DOCX or TXT files
    File {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Collect a video script from a file, or from stdin with `-`
    Script {
        source: String,
        #[arg(long)]
        title: Option<String>,
    },
}

impl Cli {
    pub fn generation_params(&self) -> Metadata {
        self.params.iter().cloned().collect()
    }
}

/// `key=value`. The value is read as JSON when it parses, otherwise kept as a string.
pub fn parse_param(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
