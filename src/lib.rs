pub mod error;
pub mod io;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod schema;
pub mod stages;
pub mod tokenizer;

pub use error::{GatewayError, PipelineError, SchemaError, TransportError};
pub use io::{load_metadata, load_transcript, render_markdown, write_protocol, ProtocolFiles};
pub use llm::{CompletionConfig, CompletionGateway, OpenAiTransport, RetryPolicy};
pub use models::{
    Chunk, DocumentKind, MapResult, MeetingMetadata, ProtocolDocument, ReducedResult,
    TranscriptSource,
};
pub use pipeline::{PipelineConfig, PipelineOutput, ProtocolPipeline};
pub use schema::{SchemaDefinition, ValidationSchema, DEFAULT_SCHEMA_PATH};
pub use stages::{
    ChunkConfig, Chunker, MapConfig, MapStage, ReduceConfig, ReduceStage, RefineConfig,
    RefineStage,
};
pub use tokenizer::{TiktokenEncoder, TokenEncoder};
