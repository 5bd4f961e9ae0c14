//! Error types for the protocol pipeline.
//!
//! Only [`PipelineError`] ever escapes a pipeline run. Everything else is
//! absorbed by the stages into degraded but well-formed data.

use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single request to the completion service
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to completion service failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed completion service response: {0}")]
    Malformed(String),
}

/// Failure of the retrying gateway
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Structured output was requested and the model returned nothing.
    /// Never retried.
    #[error("completion service returned empty content when JSON output was expected")]
    EmptyContent,

    #[error("completion failed after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: TransportError,
    },
}

/// Problems obtaining a usable schema
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read schema file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("schema is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("schema could not be compiled: {0}")]
    Compile(String),
}

/// Errors that abort a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The completion client could not be set up before any stage ran
    #[error("completion client could not be initialized: {0}")]
    ClientInit(String),

    /// Refine output was unparseable and the fallback document does not
    /// satisfy the schema either
    #[error(
        "model response could not be parsed ({parse_error}) and the fallback document failed schema validation: {validation_error}"
    )]
    FallbackInvalid {
        parse_error: String,
        validation_error: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
