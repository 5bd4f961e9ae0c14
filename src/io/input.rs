use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use crate::models::{MeetingMetadata, TranscriptSource};

/// Load a transcript. `.json` files are parsed into any supported shape;
/// anything else is read as plain text.
pub fn load_transcript(path: &Path) -> Result<TranscriptSource> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;

    if has_json_extension(path) {
        parse_transcript_json(&content)
    } else {
        Ok(TranscriptSource::Text(content))
    }
}

/// Parse a transcript from JSON text
pub fn parse_transcript_json(json: &str) -> Result<TranscriptSource> {
    let source: TranscriptSource =
        serde_json::from_str(json).context("Failed to parse transcript JSON")?;
    if let TranscriptSource::Unrecognized(_) = source {
        warn!("Transcript JSON has no recognizable text fields");
    }
    Ok(source)
}

/// Load meeting metadata from a JSON file
pub fn load_metadata(path: &Path) -> Result<MeetingMetadata> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    let metadata: MeetingMetadata =
        serde_json::from_str(&content).context("Failed to parse meeting metadata JSON")?;

    if metadata.has_malformed_date() {
        warn!(
            "Meeting date {:?} is not YYYY-MM-DD; keeping it as given",
            metadata.date
        );
    }
    Ok(metadata)
}

fn has_json_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}
