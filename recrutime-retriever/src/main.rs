use clap::{Parser, Subcommand};
use recrutime_retriever::retrieval::{
    chunking_strategy::ChunkingStrategy,
    knowledge_base::KnowledgeBase,
    search_engine::SearchEngine,
    term_index::{DEFAULT_TOP_K, IndexConfig},
};
use recrutime_context::text::{DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// A CLI tool to index and query a recrutime knowledge folder.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory containing the knowledge documents
    #[arg(short, long, env = "KNOWLEDGE_DIR", default_value = "knowledge")]
    knowledge_dir: PathBuf,

    /// Maximum chunk size in characters
    #[arg(long, env = "RECRUTIME_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Overlap between slices of an oversized paragraph
    #[arg(long, env = "RECRUTIME_OVERLAP", default_value_t = DEFAULT_OVERLAP)]
    overlap: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the index and print its statistics
    Index {
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Rank knowledge chunks against a query
    Search {
        /// Free-text query
        query: String,
        /// Maximum number of results
        #[arg(short, long, default_value_t = DEFAULT_TOP_K)]
        limit: usize,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// List the documents in the knowledge folder
    Docs {
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum OutputFormat {
    Summary,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(OutputFormat::Summary),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let config = IndexConfig::new(args.knowledge_dir.clone())
        .with_chunk_size(args.chunk_size)
        .with_overlap(args.overlap);

    match args.command {
        Commands::Index { format } => {
            let engine = SearchEngine::new(config);
            let index = engine.rebuild();
            let stats = index.stats();

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(stats)?),
                OutputFormat::Summary => {
                    println!("Indexed {}", args.knowledge_dir.display());
                    println!("  Documents: {}", stats.documents_indexed);
                    println!("  Skipped:   {}", stats.documents_skipped);
                    println!("  Chunks:    {}", stats.chunks);
                    println!("  Terms:     {}", stats.vocabulary);
                }
            }
        }
        Commands::Search {
            query,
            limit,
            format,
        } => {
            let engine = SearchEngine::new(config);
            let results = engine.search(&query, limit);

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
                OutputFormat::Summary => {
                    println!("Found {} results for {:?}:", results.len(), query);
                    for result in results {
                        let preview: String = result.content.chars().take(100).collect();
                        println!(
                            "  {:.4} | {} | {}",
                            result.score,
                            result.chunk_id,
                            preview.replace('\n', " ")
                        );
                    }
                }
            }
        }
        Commands::Docs { format } => {
            let knowledge_base = KnowledgeBase::new(
                args.knowledge_dir.clone(),
                ChunkingStrategy::new(config.chunking_config),
            );
            let files = knowledge_base.list()?;

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&files)?),
                OutputFormat::Summary => {
                    println!("{} documents in {}:", files.len(), args.knowledge_dir.display());
                    for file in files {
                        println!(
                            "  {} | {} bytes | {}",
                            file.name,
                            file.size,
                            file.modified.to_rfc3339()
                        );
                    }
                }
            }
        }
    }

    Ok(())
}
