use serde::{Deserialize, Serialize};

use super::lenient::{lenient_seconds, lenient_string, scalar_text};

/// A single diarized segment as produced by the speech-to-text collaborator.
///
/// Only `text` has to be readable; a speaker id or timestamp of an
/// unexpected type reads as `None` instead of rejecting the segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Speaker label (e.g. "SPEAKER_01"; numeric ids become "0", "1", ..)
    #[serde(default, deserialize_with = "scalar_text")]
    pub speaker: Option<String>,
    /// Spoken text - the only field the pipeline reads
    #[serde(default, deserialize_with = "lenient_string")]
    pub text: String,
    /// Start time in seconds
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub start: Option<f64>,
    /// End time in seconds
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub end: Option<f64>,
}

impl TranscriptSegment {
    pub fn new(speaker: &str, text: &str, start: f64, end: f64) -> Self {
        Self {
            speaker: Some(speaker.to_string()),
            text: text.to_string(),
            start: Some(start),
            end: Some(end),
        }
    }
}

/// One element of a segment list: either a segment record or a bare string
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SegmentEntry {
    Segment(TranscriptSegment),
    Text(String),
    /// Anything else in the list; carries no text
    Other(serde_json::Value),
}

impl SegmentEntry {
    fn text(&self) -> Option<&str> {
        match self {
            SegmentEntry::Segment(segment) => Some(segment.text.as_str()),
            SegmentEntry::Text(text) => Some(text.as_str()),
            SegmentEntry::Other(_) => None,
        }
    }
}

/// Container shapes that hold a segment list under a key
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NestedOutput {
    /// `{"output": [ ...segments ]}`
    Segments(Vec<SegmentEntry>),
    /// `{"output": {"segments": [ ...segments ]}}`
    Container { segments: Vec<SegmentEntry> },
}

/// Transcript as handed to the chunker.
///
/// Transcripts arrive as plain text, as a flat segment list, or nested under
/// an `output`/`segments` key. Each variant knows how to yield its texts in
/// original order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TranscriptSource {
    Text(String),
    Segments(Vec<SegmentEntry>),
    Nested {
        #[serde(default)]
        output: Option<NestedOutput>,
        #[serde(default)]
        segments: Option<Vec<SegmentEntry>>,
    },
    /// A JSON value none of the known shapes match
    Unrecognized(serde_json::Value),
}

impl TranscriptSource {
    pub fn from_segments(segments: Vec<TranscriptSegment>) -> Self {
        TranscriptSource::Segments(segments.into_iter().map(SegmentEntry::Segment).collect())
    }

    /// Non-blank texts in original order
    pub fn texts(&self) -> Vec<&str> {
        let entries: &[SegmentEntry] = match self {
            TranscriptSource::Text(text) => {
                return if text.trim().is_empty() {
                    vec![]
                } else {
                    vec![text.as_str()]
                };
            }
            TranscriptSource::Segments(entries) => entries,
            TranscriptSource::Nested { output, segments } => match (output, segments) {
                (Some(NestedOutput::Segments(entries)), _) => entries,
                (Some(NestedOutput::Container { segments }), _) => segments,
                (None, Some(entries)) => entries,
                (None, None) => &[],
            },
            TranscriptSource::Unrecognized(_) => &[],
        };

        entries
            .iter()
            .filter_map(SegmentEntry::text)
            .filter(|text| !text.trim().is_empty())
            .collect()
    }

    /// All texts joined by a single space, or `None` if nothing was extractable
    pub fn joined_text(&self) -> Option<String> {
        let texts = self.texts();
        if texts.is_empty() {
            None
        } else {
            Some(texts.join(" "))
        }
    }

    /// Short label for logging
    pub fn shape(&self) -> &'static str {
        match self {
            TranscriptSource::Text(_) => "plain text",
            TranscriptSource::Segments(_) => "segment list",
            TranscriptSource::Nested { .. } => "nested segment list",
            TranscriptSource::Unrecognized(_) => "unrecognized",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_segment_list() {
        let json = r#"[
            {"start": 0.0, "end": 5.0, "speaker": "SPEAKER_01", "text": "Good afternoon."},
            {"start": 5.5, "end": 8.0, "speaker": "SPEAKER_02", "text": "Let's begin."},
            {"start": 8.5, "end": 9.0, "speaker": "SPEAKER_01", "text": ""}
        ]"#;
        let source: TranscriptSource = serde_json::from_str(json).unwrap();

        assert_eq!(source.shape(), "segment list");
        assert_eq!(source.texts(), vec!["Good afternoon.", "Let's begin."]);
        assert_eq!(
            source.joined_text().as_deref(),
            Some("Good afternoon. Let's begin.")
        );
    }

    #[test]
    fn test_numeric_speakers_and_string_timestamps() {
        let json = r#"[
            {"speaker": 0, "text": "Approve the budget."},
            {"speaker": "1", "start": "2.0", "end": [3], "text": "Agreed."}
        ]"#;
        let source: TranscriptSource = serde_json::from_str(json).unwrap();

        assert_eq!(source.texts(), vec!["Approve the budget.", "Agreed."]);
        let TranscriptSource::Segments(entries) = &source else {
            panic!("expected a segment list, got {}", source.shape());
        };
        match &entries[1] {
            SegmentEntry::Segment(segment) => {
                assert_eq!(segment.speaker.as_deref(), Some("1"));
                assert_eq!(segment.start, Some(2.0));
                assert_eq!(segment.end, None);
            }
            other => panic!("expected a segment, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_under_output() {
        let json = r#"{"output": [{"text": "first"}, "second"]}"#;
        let source: TranscriptSource = serde_json::from_str(json).unwrap();
        assert_eq!(source.texts(), vec!["first", "second"]);

        let json = r#"{"output": {"segments": [{"text": "a"}, {"text": "b"}]}}"#;
        let source: TranscriptSource = serde_json::from_str(json).unwrap();
        assert_eq!(source.joined_text().as_deref(), Some("a b"));
    }

    #[test]
    fn test_nested_under_segments() {
        let json = r#"{"language": "en", "segments": [{"text": "hello"}]}"#;
        let source: TranscriptSource = serde_json::from_str(json).unwrap();
        assert_eq!(source.texts(), vec!["hello"]);
    }

    #[test]
    fn test_plain_text() {
        let source = TranscriptSource::Text("just words".to_string());
        assert_eq!(source.joined_text().as_deref(), Some("just words"));

        let blank = TranscriptSource::Text("   ".to_string());
        assert!(blank.joined_text().is_none());
    }

    #[test]
    fn test_unextractable_shapes() {
        let source: TranscriptSource = serde_json::from_str("42").unwrap();
        assert!(source.joined_text().is_none());

        let source: TranscriptSource = serde_json::from_str(r#"{"other": true}"#).unwrap();
        assert!(source.joined_text().is_none());

        let source: TranscriptSource = serde_json::from_str(r#"[1, 2, {"speaker": "A"}]"#).unwrap();
        assert!(source.joined_text().is_none());
    }
}
