use anyhow::{bail, Result};
use clap::{CommandFactory, Parser, Subcommand};
use mnemo_core::{Config, DocId, Field, Mnemo, SearchHit};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

mod import;

#[derive(Parser)]
#[command(name = "mnemo")]
#[command(version, disable_version_flag = true, about = "Store short documents and search them with BM25", long_about = None)]
struct Cli {
    /// Show version
    #[arg(short = 'v', long = "version")]
    show_version: bool,
    /// YAML config file (defaults to ./config.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Database path, overrides config and MNEMO_DB_PATH
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a document and index it
    Insert {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        body: String,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        occurrence: i64,
    },
    /// Delete a document by id
    Delete { id: DocId },
    /// Fetch a document by id
    Get { id: DocId },
    /// Ranked full-text search
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Case-insensitive substring match on one field, unranked
    Exact {
        /// `title` or `body`
        #[arg(long, default_value = "body")]
        field: Field,
        substring: String,
    },
    /// Import documents from JSON/JSONL files or a directory of them
    Import {
        #[arg(long)]
        input: PathBuf,
    },
    /// Print index statistics
    Stats,
}

#[derive(Serialize)]
struct SearchResponse<'a> {
    query: &'a str,
    total_hits: usize,
    results: &'a [SearchHit],
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();
    let cli = Cli::parse();
    if cli.show_version {
        println!("mnemo version {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let mut config = Config::load_from(cli.config.as_deref(), std::env::vars())?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    let mnemo = Mnemo::open(&config)?;

    match command {
        Commands::Insert { title, body, occurrence } => {
            let id = mnemo.insert(&title, &body, occurrence)?;
            mnemo.checkpoint()?;
            print_json(&serde_json::json!({ "id": id }))
        }
        Commands::Delete { id } => {
            mnemo.delete(id)?;
            mnemo.checkpoint()?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
        Commands::Get { id } => match mnemo.get(id)? {
            Some(doc) => print_json(&doc),
            None => bail!("document {id} not found"),
        },
        Commands::Search { query, limit } => {
            let hits = mnemo.search(&query)?;
            let shown = &hits[..hits.len().min(limit)];
            print_json(&SearchResponse { query: &query, total_hits: hits.len(), results: shown })
        }
        Commands::Exact { field, substring } => print_json(&mnemo.search_exact(field, &substring)?),
        Commands::Import { input } => {
            let imported = import::import_path(&mnemo, &input)?;
            mnemo.checkpoint()?;
            tracing::info!(imported, input = %input.display(), "import complete");
            print_json(&serde_json::json!({ "imported": imported }))
        }
        Commands::Stats => {
            let stats = mnemo.index().stats();
            print_json(&serde_json::json!({
                "documents": mnemo.len(),
                "indexed": stats.num_docs,
                "terms": stats.num_terms,
                "avg_doc_len": stats.avg_doc_len,
            }))
        }
    }
}
