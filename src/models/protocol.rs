use serde::{Deserialize, Deserializer, Serialize};

use super::ActionEntry;
use super::lenient::{decision_texts, lenient_string, readable_items};

/// Default status for newly recorded action items
pub const DEFAULT_ACTION_STATUS: &str = "Open";

/// Header block of the protocol
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtocolMetadata {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolParticipant {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default = "default_present")]
    pub present: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgendaItem {
    #[serde(default, alias = "title", deserialize_with = "lenient_string")]
    pub topic: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub discussion_summary: String,
    #[serde(default, deserialize_with = "decision_texts")]
    pub decisions_made: Vec<String>,
    #[serde(default, deserialize_with = "readable_items")]
    pub action_items_assigned: Vec<ActionEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    #[serde(default, alias = "decision_id", deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(alias = "text", deserialize_with = "lenient_string")]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    #[serde(default, alias = "action_id", deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, alias = "assigned_to", alias = "who", deserialize_with = "lenient_string")]
    pub assignee: String,
    #[serde(alias = "what", deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, alias = "due", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default = "default_status", deserialize_with = "lenient_status")]
    pub status: String,
}

/// The pipeline's terminal artifact.
///
/// Model-generated and fallback documents share this shape; a fallback
/// always carries `error` and usually `raw_response`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtocolDocument {
    #[serde(default)]
    pub metadata: ProtocolMetadata,
    #[serde(default)]
    pub participants: Vec<ProtocolParticipant>,
    #[serde(default)]
    pub agenda_items: Vec<AgendaItem>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: String,
    #[serde(default)]
    pub decisions: Vec<Decision>,
    #[serde(default)]
    pub action_items: Vec<ActionItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Unparsed model output kept for diagnosis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    /// Schema violations found on an otherwise usable document
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schema_validation_errors: Vec<String>,
    /// Informational annotations (e.g. validation skipped)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl ProtocolDocument {
    pub fn has_errors(&self) -> bool {
        self.error.is_some() || !self.schema_validation_errors.is_empty()
    }
}

/// Which path of the refine stage produced a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Parsed from model output
    Generated,
    /// Built locally after the model output could not be used
    Fallback,
}

fn default_present() -> bool {
    true
}

fn default_status() -> String {
    DEFAULT_ACTION_STATUS.to_string()
}

fn lenient_status<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let status = lenient_string(deserializer)?;
    if status.trim().is_empty() {
        Ok(default_status())
    } else {
        Ok(status)
    }
}
