//! Command line runner for the execution engine.
//!
//! Executes one source file through the same engine the server hosts and
//! prints the canonical JSON outcome to stdout, which makes it handy for
//! trying out instrumentation changes without standing up the HTTP server.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::LevelFilter;

use tracelab_core::{Dispatcher, EngineConfig, Language};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Run a source file through the tracelab engine")]
struct Cli {
    /// Source file to execute.
    file: PathBuf,

    #[clap(
        long,
        short = 'L',
        help = "Language of the submission (inferred from the file extension when omitted)"
    )]
    language: Option<String>,

    #[clap(long, short, help = "Path to the engine configuration YAML file")]
    config: Option<String>,

    #[clap(long, short, default_value = "warn")]
    log_level: String,

    #[clap(long, help = "Pretty-print the JSON outcome")]
    pretty: bool,
}

fn resolve_language(cli: &Cli) -> Result<Language> {
    if let Some(language) = &cli.language {
        return language
            .parse::<Language>()
            .map_err(|e| anyhow!(e.to_string()));
    }
    let extension = cli
        .file
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| anyhow!("cannot infer a language: {} has no extension", cli.file.display()))?;
    Language::from_extension(extension).ok_or_else(|| {
        anyhow!(
            "cannot infer a language from '.{}'; pass --language explicitly",
            extension
        )
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level_filter = cli.log_level.parse().unwrap_or(LevelFilter::Warn);
    env_logger::Builder::new()
        .filter_level(log_level_filter)
        .init();

    let language = resolve_language(&cli)?;
    let code = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("failed to read {}", cli.file.display()))?;

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::load(),
    };
    config.validate()?;

    log::info!("executing {} as {}", cli.file.display(), language);
    let dispatcher = Dispatcher::new(config);
    let outcome = dispatcher.execute(language, &code).await?;

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&outcome)?
    } else {
        serde_json::to_string(&outcome)?
    };
    println!("{}", rendered);
    Ok(())
}
