//! pdf-rag-agent command line
//!
//! Run with: cargo run -p pdf-rag-agent --features cli -- index --working-dir ./rag_data docs/

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_rag_agent::ingestion::discover_pdfs;
use pdf_rag_agent::{AgentConfig, DocumentAgent, DocumentRecord, EngineState};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pdf-rag-agent")]
#[command(about = "Extract, summarize, classify and index PDF documents")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract and derive without indexing
    Process {
        /// PDF files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Extract, derive and index into the knowledge store
    Index {
        /// Knowledge store directory (default: from config)
        #[arg(short, long)]
        working_dir: Option<PathBuf>,

        /// PDF files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Ask a question over the indexed documents
    Query {
        /// Knowledge store directory (default: from config)
        #[arg(short, long)]
        working_dir: Option<PathBuf>,

        /// Number of passages to retrieve
        #[arg(short = 'k', long, default_value = "5")]
        top_k: usize,

        /// Question to answer
        question: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "pdf_rag_agent=debug"
    } else {
        "pdf_rag_agent=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &cli.config {
        Some(path) => AgentConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AgentConfig::default(),
    };

    match cli.command {
        Commands::Process { paths } => {
            let agent = DocumentAgent::new(config)?;
            let files = collect_pdfs(&paths)?;
            let records = run_with_progress(&agent, &files, false).await;
            print_json(&records)?;
        }
        Commands::Index { working_dir, paths } => {
            let agent = DocumentAgent::new(config)?;
            init_engine(&agent, working_dir).await;
            let files = collect_pdfs(&paths)?;
            let records = run_with_progress(&agent, &files, true).await;

            let searchable = records.iter().filter(|r| r.is_searchable()).count();
            tracing::info!("{} of {} documents submitted for indexing", searchable, records.len());
            print_json(&records)?;
        }
        Commands::Query {
            working_dir,
            top_k,
            question,
        } => {
            let agent = DocumentAgent::new(config)?;
            if let EngineState::Failed { reason } = init_engine(&agent, working_dir).await {
                anyhow::bail!("RAG engine unavailable: {}", reason);
            }
            let answer = agent.query(&question, top_k).await?;
            print_json(&answer)?;
        }
    }

    Ok(())
}

async fn init_engine(agent: &DocumentAgent, working_dir: Option<PathBuf>) -> EngineState {
    let dir = working_dir.unwrap_or_else(|| agent.config().agent.working_dir.clone());
    let state = agent.initialize_engine(&dir).await;
    if !state.is_ready() {
        tracing::warn!("RAG engine state: {:?}", state);
    }
    state
}

fn collect_pdfs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            files.extend(discover_pdfs(input));
        } else {
            // Files are passed through so a missing path shows up as an error record
            files.push(input.clone());
        }
    }
    if files.is_empty() {
        anyhow::bail!("No PDF files found");
    }
    Ok(files)
}

async fn run_with_progress(
    agent: &DocumentAgent,
    files: &[PathBuf],
    index: bool,
) -> Vec<DocumentRecord> {
    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let on_record = |record: &DocumentRecord| {
        pb.set_message(record.source_path().display().to_string());
        pb.inc(1);
    };
    let records = if index {
        agent.process_and_index_batch_with(files, on_record).await
    } else {
        agent.process_batch_with(files, on_record).await
    };

    pb.finish_with_message("done");
    records
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
