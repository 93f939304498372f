//! nlq - translate analytic English questions from the command line
//!
//! Reads a schema file, then translates either the QUERY argument or one
//! sentence per stdin line, writing one JSON envelope per sentence to stdout.
//! A stdin line of `:reload` re-reads the schema file.

use anyhow::{anyhow, Context};
use clap::Parser;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{info, warn};

mod catalog;
mod config;
mod logging;
mod query;

use catalog::SchemaStore;
use config::Config;
use query::{TargetMode, Translator};

/// Held by tests that set or clear process environment variables
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[derive(Parser)]
#[command(name = "nlq")]
#[command(version, about = "Translate analytic English questions into SQL or aggregation pipelines")]
struct Cli {
    /// Sentence to translate (reads stdin lines when omitted)
    query: Option<String>,

    /// Configuration file
    #[arg(short, long, env = "NLQ_CONFIG")]
    config: Option<PathBuf>,

    /// Schema file (YAML or JSON)
    #[arg(short, long)]
    schema: Option<PathBuf>,

    /// Output target
    #[arg(short, long, value_enum)]
    target: Option<TargetMode>,

    /// Loaded tables, comma-separated (default: all)
    #[arg(long, value_delimiter = ',')]
    tables: Option<Vec<String>>,

    /// Print the schema catalog as markdown and exit
    #[arg(long)]
    describe: bool,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None => Config::from_env()?,
    };
    config.apply_logging_env();
    logging::init()?;

    if let Some(target) = cli.target {
        config.translator.target = target;
    }
    if let Some(schema) = cli.schema {
        config.schema.path = Some(schema.display().to_string());
    }
    if let Some(tables) = cli.tables {
        config.schema.tables = tables.into_iter().filter(|t| !t.trim().is_empty()).collect();
    }

    let schema_path = config
        .schema
        .path
        .clone()
        .ok_or_else(|| anyhow!("no schema file: pass --schema or set NLQ_SCHEMA_PATH"))?;
    let store = SchemaStore::open(&schema_path).with_context(|| format!("loading schema {}", schema_path))?;

    if cli.describe {
        print!("{}", store.to_markdown());
        return Ok(());
    }

    let translator = Translator::new(
        config.translator.target,
        config.translator.options(),
        config.schema.tables.clone(),
    );

    if let Some(sentence) = cli.query {
        println!("{}", translator.envelope(&sentence, &store.snapshot()));
        return Ok(());
    }

    info!(mode = ?config.translator.target, "Reading sentences from stdin");
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for line in std::io::stdin().lock().lines() {
        let line = line?;
        let sentence = line.trim();
        if sentence.is_empty() {
            continue;
        }
        if sentence == ":reload" {
            if let Err(e) = store.reload() {
                warn!(error = %e, "Schema reload failed, keeping previous snapshot");
            }
            continue;
        }
        writeln!(out, "{}", translator.envelope(sentence, &store.snapshot()))?;
        out.flush()?;
    }

    Ok(())
}
