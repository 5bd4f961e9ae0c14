use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::io::render_markdown;
use crate::llm::{
    ChatMessage, CompletionGateway, CompletionOptions, REFINE_SYSTEM_PROMPT, build_refine_prompt,
};
use crate::models::{
    ActionItem, AgendaItem, DEFAULT_ACTION_STATUS, Decision, DocumentKind, MeetingMetadata,
    ProtocolDocument, ProtocolMetadata, ProtocolParticipant, ReducedResult,
};
use crate::schema::ValidationSchema;

const FALLBACK_SUMMARY: &str = "The structured protocol could not be generated automatically. \
     The consolidated decisions and action items are listed below.";
const FALLBACK_AGENDA_SUMMARY: &str = "Not available.";

/// Configuration for the refine stage
#[derive(Debug, Clone)]
pub struct RefineConfig {
    pub temperature: f64,
    pub timeout: Duration,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            timeout: Duration::from_secs(90),
        }
    }
}

/// Final document plus its Markdown rendition
#[derive(Debug, Clone)]
pub struct RefineOutput {
    pub markdown: String,
    pub document: ProtocolDocument,
    pub kind: DocumentKind,
}

impl RefineOutput {
    fn new(document: ProtocolDocument, kind: DocumentKind) -> Self {
        Self {
            markdown: render_markdown(&document),
            document,
            kind,
        }
    }
}

/// Assembles the final protocol document
pub struct RefineStage {
    gateway: Arc<CompletionGateway>,
    config: RefineConfig,
}

impl RefineStage {
    pub fn new(gateway: Arc<CompletionGateway>, config: RefineConfig) -> Self {
        Self { gateway, config }
    }

    /// Ask the model for the protocol document, falling back to a locally
    /// built one when its output is unusable.
    ///
    /// Schema violations on a generated document are recorded on it. The
    /// run only fails when the fallback document itself violates the schema.
    pub async fn refine(
        &self,
        reduced: &ReducedResult,
        metadata: &MeetingMetadata,
        schema: &ValidationSchema,
    ) -> Result<RefineOutput, PipelineError> {
        if metadata.has_malformed_date() {
            warn!(
                "Meeting date {:?} is not YYYY-MM-DD; passing it through as given",
                metadata.date
            );
        }

        let messages = vec![
            ChatMessage::system(REFINE_SYSTEM_PROMPT),
            ChatMessage::user(build_refine_prompt(metadata, &reduced.decisions, &reduced.actions)),
        ];
        let options = CompletionOptions::json(self.config.temperature, self.config.timeout);

        let (parse_error, raw) = match self.gateway.complete(messages, &options).await {
            Ok(raw) => match parse_document(&raw, schema) {
                Ok(document) => {
                    info!(
                        "Refine stage: generated protocol with {} agenda items, {} schema violations",
                        document.agenda_items.len(),
                        document.schema_validation_errors.len()
                    );
                    return Ok(RefineOutput::new(document, DocumentKind::Generated));
                }
                Err(e) => {
                    warn!("Could not use refine response: {}", e);
                    debug!("Unusable refine response: {}", raw);
                    (e, raw)
                }
            },
            Err(e) => {
                warn!("Refine call failed after retries: {}", e);
                (e.to_string(), String::new())
            }
        };

        let mut document = build_fallback_document(reduced, metadata, &parse_error, &raw);

        match schema {
            ValidationSchema::Available(definition) => {
                let value = serde_json::to_value(&document).map_err(|e| {
                    PipelineError::FallbackInvalid {
                        parse_error: parse_error.clone(),
                        validation_error: e.to_string(),
                    }
                })?;
                if let Err(violations) = definition.validate(&value) {
                    let validation_error = violations.join("; ");
                    warn!("Fallback document failed schema validation: {}", validation_error);
                    return Err(PipelineError::FallbackInvalid {
                        parse_error,
                        validation_error,
                    });
                }
                info!(
                    "Refine stage: fallback document passed schema validation ({})",
                    definition
                        .source()
                        .map_or_else(|| "inline schema".to_string(), |p| p.display().to_string())
                );
            }
            ValidationSchema::Unavailable { path, reason } => {
                document.notes.push(format!(
                    "Fallback document was not validated: schema {} is unavailable ({})",
                    path.display(),
                    reason
                ));
                info!("Refine stage: fallback document built without validation");
            }
            ValidationSchema::Absent => {
                document
                    .notes
                    .push("Fallback document was not validated: no schema was supplied".to_string());
                info!("Refine stage: fallback document built without validation");
            }
        }

        Ok(RefineOutput::new(document, DocumentKind::Fallback))
    }
}

/// Parse, validate and type the model's output. Returns the reason the
/// output is unusable on failure.
fn parse_document(raw: &str, schema: &ValidationSchema) -> Result<ProtocolDocument, String> {
    let value: Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    if !value.is_object() {
        return Err(format!("expected a JSON object, found {}", json_kind(&value)));
    }

    let violations = match schema {
        ValidationSchema::Available(definition) => definition.validate(&value).err(),
        _ => None,
    };

    let mut document: ProtocolDocument =
        serde_json::from_value(value).map_err(|e| format!("unexpected document shape: {}", e))?;

    match schema {
        ValidationSchema::Available(_) => {
            if let Some(violations) = violations {
                warn!("Generated protocol violates the schema in {} places", violations.len());
                document.schema_validation_errors.extend(violations);
            }
        }
        ValidationSchema::Unavailable { path, reason } => {
            document.notes.push(format!(
                "Protocol was not validated: schema {} is unavailable ({})",
                path.display(),
                reason
            ));
        }
        ValidationSchema::Absent => {}
    }

    Ok(document)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Build the protocol document locally from consolidated findings and
/// metadata. Deterministic: equal inputs give equal documents.
pub fn build_fallback_document(
    reduced: &ReducedResult,
    metadata: &MeetingMetadata,
    parse_error: &str,
    raw_response: &str,
) -> ProtocolDocument {
    let field = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or("N/A")
            .to_string()
    };

    let attendees = metadata.participants.present().iter().map(|a| (a, true));
    let absentees = metadata.participants.absent().iter().map(|a| (a, false));
    let participants = attendees
        .chain(absentees)
        .map(|(attendee, present)| ProtocolParticipant {
            name: attendee.name.clone(),
            role: attendee.role.clone(),
            present,
        })
        .collect();

    let agenda_items = metadata
        .agenda
        .iter()
        .map(|topic| AgendaItem {
            topic: topic.clone(),
            discussion_summary: FALLBACK_AGENDA_SUMMARY.to_string(),
            ..Default::default()
        })
        .collect();

    let decisions = reduced
        .decisions
        .iter()
        .enumerate()
        .map(|(i, description)| Decision {
            id: format!("D{:03}", i + 1),
            description: description.clone(),
        })
        .collect();

    let action_items = reduced
        .actions
        .iter()
        .enumerate()
        .map(|(i, action)| ActionItem {
            id: format!("A{:03}", i + 1),
            assignee: action.who.clone(),
            description: action.what.clone(),
            due_date: action.due.clone().filter(|d| !d.trim().is_empty()),
            status: DEFAULT_ACTION_STATUS.to_string(),
        })
        .collect();

    ProtocolDocument {
        metadata: ProtocolMetadata {
            title: metadata.title_or_default().to_string(),
            date: field(&metadata.date),
            location: Some(field(&metadata.location)),
            organizer: Some(field(&metadata.organizer)),
        },
        participants,
        agenda_items,
        summary: FALLBACK_SUMMARY.to_string(),
        decisions,
        action_items,
        error: Some(format!("Failed to parse LLM response as JSON: {}", parse_error)),
        raw_response: Some(raw_response.to_string()),
        ..Default::default()
    }
}
