//! CLI interface for the vector store

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use storex::document::{metadata_from_json, metadata_to_json};
use storex::persistence::FORMAT_VERSION;
use storex::{
    parse_embedding, Engine, FlatSearchEngine, LshParams, LshSearchEngine, Metadata,
    MetadataFilter, SearchEngine, SimilarityMetric, VectorStore,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "storex")]
#[command(about = "An embeddable vector database", long_about = None)]
struct Cli {
    /// Store file. Created on first save if missing.
    #[arg(long, global = true, default_value = "storex.db")]
    store: PathBuf,

    /// Do not write changes back to the store file
    #[arg(long, global = true)]
    no_auto_save: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy)]
enum EngineType {
    Flat,
    Lsh,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert a document
    Insert {
        /// Embedding as comma-separated values (e.g., "1.0,2.0,3.0")
        #[arg(short, long)]
        vector: String,
        /// Metadata as a JSON object (e.g., '{"lang": "en"}')
        #[arg(short, long)]
        metadata: Option<String>,
    },
    /// Search for similar documents
    Search {
        /// Query embedding as comma-separated values
        query: String,
        /// Number of results to return
        #[arg(short, long, default_value = "5")]
        k: usize,
        /// Similarity metric: cosine, dot or euclidean
        #[arg(long, default_value = "cosine")]
        metric: SimilarityMetric,
        #[arg(long, value_enum, default_value = "flat")]
        engine: EngineType,
        /// LSH hash tables
        #[arg(long, default_value = "10")]
        tables: usize,
        /// LSH hyperplanes per table
        #[arg(long, default_value = "8")]
        hashes: usize,
        /// LSH seed
        #[arg(long)]
        seed: Option<u64>,
        /// Metadata filter as JSON (e.g., '{"op": "EQ", "field": "lang", "value": "en"}')
        #[arg(long)]
        filter: Option<String>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// List documents whose metadata matches a filter, in insertion order
    Find {
        /// Metadata filter as JSON
        filter: String,
        /// Maximum number of documents to print
        #[arg(short, long, default_value = "10")]
        k: usize,
    },
    /// List all documents
    List,
    /// Show store statistics
    Info,
    /// Remove every document
    Clear,
}

fn parse_metadata(raw: Option<&str>) -> Result<Metadata> {
    match raw {
        None => Ok(Metadata::new()),
        Some(s) => {
            let value: serde_json::Value =
                serde_json::from_str(s).context("metadata is not valid JSON")?;
            Ok(metadata_from_json(&value)?)
        }
    }
}

fn parse_filter(raw: Option<&str>) -> Result<Option<MetadataFilter>> {
    raw.map(|s| {
        let value: serde_json::Value =
            serde_json::from_str(s).context("filter is not valid JSON")?;
        Ok(MetadataFilter::from_json(&value)?)
    })
    .transpose()
}

fn run(mut store: VectorStore, command: Commands) -> Result<()> {
    match command {
        Commands::Insert { vector, metadata } => {
            let embedding = parse_embedding(&vector)?;
            let metadata = parse_metadata(metadata.as_deref())?;
            let id = store.insert(embedding, metadata)?;
            println!("Inserted document with ID: {}", id);
        }
        Commands::Search {
            query,
            k,
            metric,
            engine,
            tables,
            hashes,
            seed,
            filter,
            json,
        } => {
            let q = parse_embedding(&query)?;
            let filter = parse_filter(filter.as_deref())?;

            let engine: Engine<'_> = match engine {
                EngineType::Flat => FlatSearchEngine::new(&store, metric).into(),
                EngineType::Lsh => {
                    let mut params = LshParams::new(tables, hashes);
                    params.seed = seed;
                    LshSearchEngine::new(&store, metric, params)?.into()
                }
            };
            let results = engine.search(&q, k, filter.as_ref())?;

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else if results.is_empty() {
                println!("No results found");
            } else {
                println!("Top {} results ({}):", results.len(), metric);
                for (i, result) in results.iter().enumerate() {
                    println!(
                        "{}. {} (score: {:.4}) {}",
                        i + 1,
                        result.document.id,
                        result.score,
                        metadata_to_json(&result.document.metadata)
                    );
                }
            }
        }
        Commands::Find { filter, k } => {
            let filter = parse_filter(Some(&filter))?.context("filter is required")?;
            let found = store.find(&filter, k);
            if found.is_empty() {
                println!("No matching documents");
            } else {
                for doc in found {
                    println!("  - {} {}", doc.id, metadata_to_json(&doc.metadata));
                }
            }
        }
        Commands::List => {
            if store.is_empty() {
                println!("No documents in store");
            } else {
                println!("Documents ({} total):", store.len());
                for doc in store.documents() {
                    println!("  - {} {}", doc.id, metadata_to_json(&doc.metadata));
                }
            }
        }
        Commands::Info => {
            println!("Path:       {}", store.path().map_or("-".into(), |p| p.display().to_string()));
            println!("Documents:  {}", store.len());
            match store.dimension() {
                Some(dim) => println!("Dimension:  {}", dim),
                None => println!("Dimension:  unset"),
            }
            println!("Format:     v{}", FORMAT_VERSION);
            println!("Auto-save:  {}", store.auto_save());
        }
        Commands::Clear => {
            let removed = store.len();
            store.clear();
            println!("Removed {} documents", removed);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storex=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let store = VectorStore::open(cli.store.clone(), !cli.no_auto_save)
        .with_context(|| format!("failed to open store {}", cli.store.display()))?;
    info!(path = %cli.store.display(), documents = store.len(), "opened store");

    run(store, cli.command)
}
