use serde::{Deserialize, Serialize};

use super::lenient::{decision_texts, lenient_string, readable_items, scalar_text};

/// Text used for the single chunk emitted when a transcript has no content
pub const NO_CONTENT_SENTINEL: &str = "No transcription text available";

/// A token-bounded slice of the concatenated transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position in the chunk sequence; results are reassembled by this index
    pub index: usize,
    pub text: String,
}

impl Chunk {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// The "no content" chunk
    pub fn sentinel() -> Self {
        Self::new(0, NO_CONTENT_SENTINEL)
    }

    pub fn is_sentinel(&self) -> bool {
        self.index == 0 && self.text == NO_CONTENT_SENTINEL
    }
}

/// An action item as extracted from transcript text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEntry {
    /// Person responsible
    #[serde(default, deserialize_with = "lenient_string")]
    pub who: String,
    /// Task description; also the deduplication key
    #[serde(default, deserialize_with = "lenient_string")]
    pub what: String,
    /// Due date (YYYY-MM-DD) if one was mentioned
    #[serde(default, deserialize_with = "scalar_text")]
    pub due: Option<String>,
}

impl ActionEntry {
    pub fn new(who: &str, what: &str, due: Option<&str>) -> Self {
        Self {
            who: who.to_string(),
            what: what.to_string(),
            due: due.map(str::to_string),
        }
    }
}

/// Per-chunk extraction output from the map stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapResult {
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: String,
    #[serde(default, deserialize_with = "decision_texts")]
    pub decisions: Vec<String>,
    #[serde(default, deserialize_with = "readable_items")]
    pub actions: Vec<ActionEntry>,
    /// Set on stubs standing in for a failed extraction
    #[serde(skip)]
    pub degraded: bool,
}

impl MapResult {
    /// Stub result for a chunk whose extraction failed; the error text
    /// travels in `summary` and the lists stay empty.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            summary: message.into(),
            decisions: vec![],
            actions: vec![],
            degraded: true,
        }
    }

    pub fn has_findings(&self) -> bool {
        !self.decisions.is_empty() || !self.actions.is_empty()
    }
}

/// Consolidated decisions and actions from the reduce stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReducedResult {
    #[serde(default, deserialize_with = "decision_texts")]
    pub decisions: Vec<String>,
    #[serde(default, deserialize_with = "readable_items")]
    pub actions: Vec<ActionEntry>,
}
