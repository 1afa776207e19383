use advisor_rag_core::{
    cancel_pair, ingest_path, ChromaStore, ChunkingConfig, DocumentExtractor, IdStrategy,
    OllamaEmbedder, OllamaGenerator, PipelineSettings, RagConfig, RagOrchestrator,
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "advisor-rag", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Ollama API base URL (embeddings and generation)
    #[arg(long, env = "ADVISOR_OLLAMA_URL", default_value = advisor_rag_core::config::DEFAULT_OLLAMA_URL)]
    ollama_url: String,

    /// Model used to embed chunks and questions
    #[arg(long, env = "ADVISOR_EMBEDDING_MODEL", default_value = advisor_rag_core::config::DEFAULT_MODEL)]
    embedding_model: String,

    /// Model used to generate answers
    #[arg(long, env = "ADVISOR_GENERATION_MODEL", default_value = advisor_rag_core::config::DEFAULT_MODEL)]
    generation_model: String,

    /// Chroma database base URL
    #[arg(long, env = "ADVISOR_CHROMA_URL", default_value = advisor_rag_core::config::DEFAULT_CHROMA_URL)]
    chroma_url: String,

    /// Chroma collection id
    #[arg(long, env = "ADVISOR_COLLECTION_ID")]
    collection_id: String,

    /// Words per chunk
    #[arg(long, default_value_t = 100)]
    chunk_size: usize,

    /// Words shared by consecutive chunks
    #[arg(long, default_value_t = 20)]
    overlap_size: usize,

    /// Number of neighbors placed in the prompt
    #[arg(long, default_value_t = advisor_rag_core::config::DEFAULT_TOP_K)]
    top_k: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 600)]
    timeout_secs: u64,

    /// Embedding requests in flight during ingestion
    #[arg(long, default_value_t = 4)]
    embed_concurrency: usize,

    /// Chunk id scheme: content-hash (re-ingest overwrites) or random (re-ingest duplicates)
    #[arg(long, default_value = "content-hash")]
    id_strategy: IdStrategy,

    /// Expected embedding length; checked on every batch and query when set
    #[arg(long)]
    embedding_dimensions: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Extract, chunk, embed and store a document or a folder of documents.
    Ingest {
        /// File or folder (pdf, txt, md).
        #[arg(long)]
        path: PathBuf,
    },
    /// Chunk, embed and store raw text.
    IngestText {
        #[arg(long)]
        text: String,
        /// Identifier the chunk ids are derived from.
        #[arg(long, default_value = advisor_rag_core::DEFAULT_SOURCE_ID)]
        source_id: String,
    },
    /// Answer a question from the stored documents.
    Ask {
        #[arg(long)]
        query: String,
        /// Print the retrieved context and distances.
        #[arg(long, default_value_t = false)]
        explain: bool,
    },
}

impl Cli {
    fn config(&self) -> RagConfig {
        RagConfig {
            embedding_endpoint: self.ollama_url.clone(),
            generation_endpoint: self.ollama_url.clone(),
            embedding_model: self.embedding_model.clone(),
            generation_model: self.generation_model.clone(),
            store_endpoint: self.chroma_url.clone(),
            collection_id: self.collection_id.clone(),
            chunking: ChunkingConfig {
                chunk_size: self.chunk_size,
                overlap_size: self.overlap_size,
            },
            top_k: self.top_k,
            request_timeout: Duration::from_secs(self.timeout_secs),
            embed_concurrency: self.embed_concurrency,
            id_strategy: self.id_strategy,
            embedding_dimensions: self.embedding_dimensions,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = cli.config();
    config.validate()?;

    let client = config.http_client()?;
    let rag = RagOrchestrator::new(
        OllamaEmbedder::from_config(client.clone(), &config),
        ChromaStore::from_config(client.clone(), &config),
        OllamaGenerator::from_config(client, &config),
        PipelineSettings::from(&config),
    );
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        collection = %config.collection_id,
        "advisor-rag boot"
    );

    let (cancel, signal) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; cancelling");
            cancel.cancel();
        }
    });

    match cli.command {
        Command::Ingest { path } => {
            let report = signal
                .run(ingest_path(&rag, &DocumentExtractor, &path))
                .await?;

            for skipped in &report.skipped_files {
                warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped document");
            }
            for document in &report.documents {
                println!(
                    "{}: {} chunks at {} ({})",
                    document.source_id,
                    document.chunk_count,
                    document.ingested_at.to_rfc3339(),
                    document.message()
                );
            }
            info!(
                documents = report.documents.len(),
                chunks = report.chunk_count(),
                skipped = report.skipped_files.len(),
                "ingestion finished"
            );
        }
        Command::IngestText { text, source_id } => {
            let report = rag.ingest_cancellable(&source_id, &text, &signal).await?;
            println!(
                "{} chunks ingested at {} ({})",
                report.chunk_count,
                report.ingested_at.to_rfc3339(),
                report.message()
            );
        }
        Command::Ask { query, explain } => match rag.answer_cancellable(&query, &signal).await {
            Ok(answer) => {
                println!("{}", answer.text);
                if explain {
                    let neighbors = &answer.neighbors;
                    for (rank, (text, distance)) in neighbors
                        .ranked_texts()
                        .iter()
                        .zip(neighbors.distances())
                        .enumerate()
                    {
                        println!("explain: rank={} distance={distance:.4}\n{text}", rank + 1);
                    }
                }
            }
            Err(failure) => {
                error!(error = %failure, service = ?failure.service(), "answer failed");
                println!("{}", failure.answer_diagnostic());
                return Ok(ExitCode::FAILURE);
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}
