//! CLI entry point for the Shloka backend: build the verse index and query it.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use shloka_core::{
    app_data_dir, build_index, enrich, load_config, set_index_prefix, status, watch_corpus,
    BuildOptions, Config, Enrichment, OllamaClient, QueryResult, SemanticIndex,
};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "shloka")]
#[command(about = "Shloka: find the Bhagavatam verse closest to your question")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show backend status (for dev).
    Status,
    /// Show where Shloka stores its config and index (app data directory).
    DataDir,
    /// Print the effective configuration.
    Config,
    /// Persist the index prefix used when `--prefix` is not given.
    SetPrefix {
        #[arg(value_name = "PREFIX")]
        prefix: PathBuf,
    },
    /// Build the index from a CSV corpus and save it.
    Build {
        /// Corpus CSV file, or a directory of CSV files.
        #[arg(long, value_name = "PATH")]
        corpus: PathBuf,
        /// Index prefix (defaults to the configured one).
        #[arg(long)]
        prefix: Option<PathBuf>,
    },
    /// Find the verses closest to a free-text query.
    Query {
        #[arg(value_name = "TEXT")]
        text: String,
        #[arg(long)]
        prefix: Option<PathBuf>,
        /// Number of verses to return.
        #[arg(short, long, default_value_t = 1)]
        k: usize,
        /// Skip the generated explanation and purport summary.
        #[arg(long)]
        no_enrich: bool,
        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Rebuild the index whenever the corpus changes.
    Watch {
        #[arg(long, value_name = "PATH")]
        corpus: PathBuf,
        #[arg(long)]
        prefix: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct QueryOutput<'a> {
    #[serde(flatten)]
    result: &'a QueryResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    enrichment: Option<Enrichment>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok();
    fmt()
        .with_env_filter(env_filter(rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config();

    match cli.command.unwrap_or(Commands::Status) {
        Commands::Status => {
            println!("Shloka backend");
            println!("  core: {}", status());
        }
        Commands::DataDir => match app_data_dir() {
            Some(p) => println!("{}", p.display()),
            None => anyhow::bail!("could not determine app data directory"),
        },
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            if let Some(prefix) = config.index_prefix() {
                println!("index prefix: {}", prefix.display());
            }
        }
        Commands::SetPrefix { prefix } => {
            set_index_prefix(&prefix)?;
            println!("Index prefix set to {}", prefix.display());
        }
        Commands::Build { corpus, prefix } => {
            let prefix = resolve_prefix(prefix, &config)?;
            let client = OllamaClient::from_config(&config)?;
            rebuild(&corpus, &prefix, &client, &config).await?;
        }
        Commands::Query {
            text,
            prefix,
            k,
            no_enrich,
            json,
        } => {
            let prefix = resolve_prefix(prefix, &config)?;
            let client = OllamaClient::from_config(&config)?;
            let index = SemanticIndex::open(&prefix)?;
            let results = index.query(&text, &client, k).await?;

            let mut outputs = Vec::with_capacity(results.len());
            for result in &results {
                let enrichment = if no_enrich {
                    None
                } else {
                    Some(enrich(result, &client).await)
                };
                outputs.push(QueryOutput { result, enrichment });
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&outputs)?);
            } else {
                for out in &outputs {
                    print_result(out);
                }
            }
        }
        Commands::Watch { corpus, prefix } => {
            let prefix = resolve_prefix(prefix, &config)?;
            let client = OllamaClient::from_config(&config)?;
            rebuild(&corpus, &prefix, &client, &config).await?;

            let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
            let _watcher = watch_corpus(&corpus, move || {
                let _ = tx.send(());
            })?;
            println!("Watching {} (Ctrl+C to stop)", corpus.display());
            while rx.recv().await.is_some() {
                if let Err(e) = rebuild(&corpus, &prefix, &client, &config).await {
                    tracing::error!(error = %e, "rebuild failed; previous index kept");
                }
            }
        }
    }
    Ok(())
}

/// `RUST_LOG` wins when set and valid; otherwise `shloka=info`.
fn env_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|s| !s.trim().is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

const DEFAULT_LOG_FILTER: &str = "shloka=info";

fn resolve_prefix(prefix: Option<PathBuf>, config: &Config) -> anyhow::Result<PathBuf> {
    prefix
        .or_else(|| config.index_prefix())
        .context("no index prefix given and no app data directory available")
}

/// Builds the full index from `corpus` and overwrites the pair at `prefix`.
async fn rebuild(
    corpus: &Path,
    prefix: &Path,
    client: &OllamaClient,
    config: &Config,
) -> anyhow::Result<()> {
    let report = build_index(corpus, client, BuildOptions::from(config))
        .await
        .with_context(|| format!("building index from {}", corpus.display()))?;
    let index = SemanticIndex::new(report.store, report.table)?;
    index.save(prefix)?;

    println!(
        "Indexed {} verse(s) from {} into {}",
        index.len(),
        corpus.display(),
        prefix.display()
    );
    if !report.dropped.is_empty() {
        println!("  dropped {} incomplete row(s)", report.dropped.len());
    }
    Ok(())
}

fn print_result(out: &QueryOutput<'_>) {
    let r = &out.result.record;
    println!("\nCanto {}, Chapter {}", r.canto, r.chapter);
    println!("  Sanskrit:    {}", r.sanskrit);
    println!("  Translation: {}", r.translation);
    println!(
        "  Purport:     {}",
        r.purport.as_deref().unwrap_or("No purport available.")
    );
    if let Some(e) = &out.enrichment {
        println!("  Explanation: {}", e.explanation);
        println!("  Summary:     {}", e.purport_summary);
    }
    println!("  Distance:    {:.4}", out.result.distance);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_overrides_default_level() {
        assert_eq!(env_filter(Some("shloka=debug")).to_string(), "shloka=debug");
        assert_eq!(env_filter(Some("shloka=warn")).to_string(), "shloka=warn");
    }

    #[test]
    fn default_filter_without_rust_log() {
        assert_eq!(env_filter(None).to_string(), DEFAULT_LOG_FILTER);
        assert_eq!(env_filter(Some("  ")).to_string(), DEFAULT_LOG_FILTER);
    }
}
