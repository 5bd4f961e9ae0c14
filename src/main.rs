use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use minutes::{
    ChunkConfig, Chunker, CompletionConfig, DEFAULT_SCHEMA_PATH, DocumentKind, MapConfig,
    MeetingMetadata, PipelineConfig, ProtocolPipeline, RetryPolicy, ValidationSchema,
    load_metadata, load_transcript, write_protocol,
};

#[derive(Parser)]
#[command(name = "minutes")]
#[command(author, version, about = "Meeting protocol generation from transcripts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a meeting protocol (Markdown + JSON) from a transcript
    Generate {
        /// Transcript file (.json segments or plain text)
        #[arg(short, long)]
        input: PathBuf,

        /// Meeting metadata file (JSON)
        #[arg(short, long)]
        metadata: Option<PathBuf>,

        /// JSON Schema for the protocol document
        #[arg(long, default_value = DEFAULT_SCHEMA_PATH)]
        schema: PathBuf,

        /// Skip schema validation entirely
        #[arg(long)]
        no_schema: bool,

        /// Directory for the generated files
        #[arg(short, long, default_value = "protocols")]
        output_dir: PathBuf,

        /// Maximum tokens per chunk
        #[arg(long, default_value = "550")]
        max_tokens: usize,

        /// Tokens shared between consecutive chunks
        #[arg(long, default_value = "100")]
        overlap: usize,

        /// Maximum concurrent extraction calls
        #[arg(long, default_value = "5")]
        workers: usize,

        /// Model name (overrides MINUTES_MODEL)
        #[arg(long)]
        model: Option<String>,

        /// Attempts per model call
        #[arg(long, default_value = "3")]
        max_retries: u32,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show how a transcript would be chunked, without calling the model
    Chunk {
        /// Transcript file (.json segments or plain text)
        #[arg(short, long)]
        input: PathBuf,

        /// Maximum tokens per chunk
        #[arg(long, default_value = "550")]
        max_tokens: usize,

        /// Tokens shared between consecutive chunks
        #[arg(long, default_value = "100")]
        overlap: usize,

        /// tiktoken encoding
        #[arg(long, default_value = "cl100k_base")]
        encoding: String,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            input,
            metadata,
            schema,
            no_schema,
            output_dir,
            max_tokens,
            overlap,
            workers,
            model,
            max_retries,
            verbose,
        } => {
            setup_logging(verbose);
            let schema = if no_schema { None } else { Some(schema) };
            let config = PipelineConfig {
                chunk: ChunkConfig {
                    max_tokens,
                    overlap_tokens: overlap,
                    ..Default::default()
                },
                retry: RetryPolicy::new(max_retries),
                map: MapConfig {
                    max_workers: workers,
                    ..Default::default()
                },
                ..Default::default()
            };
            generate_protocol(input, metadata, schema, output_dir, model, config).await
        }
        Commands::Chunk {
            input,
            max_tokens,
            overlap,
            encoding,
            verbose,
        } => {
            setup_logging(verbose);
            show_chunks(
                input,
                ChunkConfig {
                    max_tokens,
                    overlap_tokens: overlap,
                    encoding,
                },
            )
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

async fn generate_protocol(
    input: PathBuf,
    metadata_path: Option<PathBuf>,
    schema_path: Option<PathBuf>,
    output_dir: PathBuf,
    model: Option<String>,
    config: PipelineConfig,
) -> Result<()> {
    info!("Loading transcript from {:?}", input);
    let source = load_transcript(&input).context("Failed to load input transcript")?;

    let metadata = match &metadata_path {
        Some(path) => load_metadata(path).context("Failed to load meeting metadata")?,
        None => {
            warn!("No metadata file given; using defaults");
            MeetingMetadata::default()
        }
    };

    let schema = ValidationSchema::resolve(schema_path.as_deref());

    let mut completion = CompletionConfig::from_env()?;
    if let Some(model) = model {
        completion.model = model;
    }
    info!("Using model {} at {}", completion.model, completion.base_url);

    let pipeline = ProtocolPipeline::connect(&completion, config)?;
    let output = pipeline
        .run(&source, &metadata, &schema)
        .await
        .context("Protocol generation failed")?;

    let files = write_protocol(&output_dir, &metadata, &output)
        .context("Failed to write protocol files")?;

    match output.kind {
        DocumentKind::Generated => info!(
            "Complete (run {}): {} chunks, {} schema violations",
            output.run_id,
            output.chunk_count,
            output.document.schema_validation_errors.len()
        ),
        DocumentKind::Fallback => warn!(
            "Complete (run {}) with fallback protocol: {}",
            output.run_id,
            output.document.error.as_deref().unwrap_or("unknown error")
        ),
    }
    println!("{}", files.markdown.display());
    println!("{}", files.json.display());

    Ok(())
}

fn show_chunks(input: PathBuf, config: ChunkConfig) -> Result<()> {
    info!("Chunking transcript from {:?}", input);
    let source = load_transcript(&input).context("Failed to load input transcript")?;

    let chunker = Chunker::new(config);
    let chunks = chunker.chunk(&source);

    println!("Chunk Plan");
    println!("==========");
    println!("Transcript shape: {}", source.shape());
    println!("Encoder: {}", chunker.encoder_name());
    println!(
        "Window: {} tokens, overlap {}",
        chunker.config().window(),
        chunker.config().overlap_tokens
    );
    println!("Chunks: {}", chunks.len());
    println!();

    for chunk in &chunks {
        let preview: String = chunk.text.chars().take(72).collect();
        println!(
            "[{:>3}] {:>6} chars | {}",
            chunk.index,
            chunk.text.chars().count(),
            preview.replace('\n', " ")
        );
    }

    Ok(())
}
