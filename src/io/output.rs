use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::error::PipelineError;
use crate::models::MeetingMetadata;
use crate::pipeline::PipelineOutput;

/// Longest title fragment used in output file names
const MAX_TITLE_CHARS: usize = 50;

/// Paths written by [`write_protocol`]
#[derive(Debug, Clone)]
pub struct ProtocolFiles {
    pub markdown: PathBuf,
    pub json: PathBuf,
}

/// `<date>_<title>` for output files. The date falls back to today when
/// missing or malformed.
pub fn protocol_basename(metadata: &MeetingMetadata) -> String {
    let date = metadata
        .parsed_date()
        .unwrap_or_else(|| Local::now().date_naive());
    format!("{}_{}", date.format("%Y-%m-%d"), sanitize_title(metadata.title_or_default()))
}

/// Keep `[A-Za-z0-9 _-]`, turn spaces into underscores, cap the length
fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect();
    let cleaned: String = cleaned
        .trim()
        .chars()
        .take(MAX_TITLE_CHARS)
        .map(|c| if c == ' ' { '_' } else { c })
        .collect();

    if cleaned.is_empty() {
        "protocol".to_string()
    } else {
        cleaned
    }
}

/// Write the Markdown and JSON renditions of a run into `dir`
pub fn write_protocol(
    dir: &Path,
    metadata: &MeetingMetadata,
    output: &PipelineOutput,
) -> Result<ProtocolFiles, PipelineError> {
    std::fs::create_dir_all(dir)?;

    let base = protocol_basename(metadata);
    let files = ProtocolFiles {
        markdown: dir.join(format!("{}.md", base)),
        json: dir.join(format!("{}.json", base)),
    };

    std::fs::write(&files.markdown, &output.markdown)?;
    let json = serde_json::to_string_pretty(&output.document).map_err(std::io::Error::other)?;
    std::fs::write(&files.json, json)?;

    info!("Wrote protocol to {:?} and {:?}", files.markdown, files.json);
    Ok(files)
}
