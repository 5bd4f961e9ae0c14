use crate::models::{ActionEntry, ActionItem, ProtocolDocument};

const NOT_AVAILABLE: &str = "N/A";

/// Render a protocol document as Markdown.
///
/// Works the same for generated and fallback documents; the error section
/// only appears when the document carries an error or schema violations.
pub fn render_markdown(doc: &ProtocolDocument) -> String {
    let mut parts: Vec<String> = Vec::new();
    let meta = &doc.metadata;

    parts.push(format!("# Meeting Protocol: {}", or_na(&meta.title)));
    parts.push(format!("**Date:** {}", or_na(&meta.date)));
    parts.push(format!(
        "**Location:** {}",
        or_na(meta.location.as_deref().unwrap_or_default())
    ));
    parts.push(format!(
        "**Organizer:** {}",
        or_na(meta.organizer.as_deref().unwrap_or_default())
    ));

    parts.push("## Participants".to_string());
    if doc.participants.is_empty() {
        parts.push("- None listed".to_string());
    } else {
        let lines: Vec<String> = doc
            .participants
            .iter()
            .map(|p| {
                let role = p.role.as_deref().filter(|r| !r.is_empty()).unwrap_or("Participant");
                if p.present {
                    format!("- {} ({})", p.name, role)
                } else {
                    format!("- {} ({}, absent)", p.name, role)
                }
            })
            .collect();
        parts.push(lines.join("\n"));
    }

    parts.push("## Agenda Items".to_string());
    if doc.agenda_items.is_empty() {
        parts.push("- None listed".to_string());
    }
    for item in &doc.agenda_items {
        let topic = if item.topic.trim().is_empty() {
            "Unnamed Agenda Item"
        } else {
            item.topic.as_str()
        };
        parts.push(format!("### {}", topic));
        parts.push(format!("**Summary:** {}", or_na(&item.discussion_summary)));
        if !item.decisions_made.is_empty() {
            let mut block = String::from("**Decisions:**");
            for decision in &item.decisions_made {
                block.push_str(&format!("\n  - {}", decision));
            }
            parts.push(block);
        }
        if !item.action_items_assigned.is_empty() {
            let mut block = String::from("**Action Items:**");
            for action in &item.action_items_assigned {
                block.push_str(&format!("\n  - {}", agenda_action_line(action)));
            }
            parts.push(block);
        }
    }

    parts.push("## Overall Summary".to_string());
    if doc.summary.trim().is_empty() {
        parts.push("No overall summary provided.".to_string());
    } else {
        parts.push(doc.summary.clone());
    }

    parts.push("## Global Decisions".to_string());
    if doc.decisions.is_empty() {
        parts.push("- None recorded".to_string());
    } else {
        let lines: Vec<String> = doc
            .decisions
            .iter()
            .map(|d| format!("- {} (ID: {})", d.description, or_na(&d.id)))
            .collect();
        parts.push(lines.join("\n"));
    }

    parts.push("## Global Action Items".to_string());
    if doc.action_items.is_empty() {
        parts.push("- None recorded".to_string());
    } else {
        let lines: Vec<String> = doc.action_items.iter().map(global_action_line).collect();
        parts.push(lines.join("\n"));
    }

    if doc.has_errors() {
        parts.push("## Errors Encountered".to_string());
        let mut lines: Vec<String> = Vec::new();
        if let Some(error) = &doc.error {
            lines.push(format!("- {}", error));
        }
        for violation in &doc.schema_validation_errors {
            lines.push(format!("- Schema validation: {}", violation));
        }
        parts.push(lines.join("\n"));

        if let Some(raw) = doc.raw_response.as_deref().filter(|r| !r.trim().is_empty()) {
            parts.push(format!("Raw model response:\n\n```\n{}\n```", raw.trim_end()));
        }
    }

    if !doc.notes.is_empty() {
        parts.push("## Notes".to_string());
        let lines: Vec<String> = doc.notes.iter().map(|n| format!("- {}", n)).collect();
        parts.push(lines.join("\n"));
    }

    parts.join("\n\n")
}

fn agenda_action_line(action: &ActionEntry) -> String {
    format!(
        "{} (Assigned: {}, Due: {})",
        or_na(&action.what),
        or_na(&action.who),
        or_na(action.due.as_deref().unwrap_or_default())
    )
}

fn global_action_line(action: &ActionItem) -> String {
    format!(
        "- {} (Assigned: {}, Due: {}, Status: {}, ID: {})",
        or_na(&action.description),
        or_na(&action.assignee),
        or_na(action.due_date.as_deref().unwrap_or_default()),
        action.status,
        or_na(&action.id)
    )
}

fn or_na(value: &str) -> &str {
    if value.trim().is_empty() {
        NOT_AVAILABLE
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AgendaItem, Decision, ProtocolMetadata, ProtocolParticipant};

    fn sample() -> ProtocolDocument {
        ProtocolDocument {
            metadata: ProtocolMetadata {
                title: "Board meeting".to_string(),
                date: "2025-07-20".to_string(),
                location: Some("Room 4".to_string()),
                organizer: None,
            },
            participants: vec![
                ProtocolParticipant {
                    name: "Anna".to_string(),
                    role: Some("Chair".to_string()),
                    present: true,
                },
                ProtocolParticipant {
                    name: "Clara".to_string(),
                    role: None,
                    present: false,
                },
            ],
            agenda_items: vec![AgendaItem {
                topic: "Budget".to_string(),
                discussion_summary: "Reviewed Q3".to_string(),
                decisions_made: vec!["Approve budget".to_string()],
                action_items_assigned: vec![ActionEntry::new("Anna", "Send figures", None)],
            }],
            summary: "Short meeting.".to_string(),
            decisions: vec![Decision {
                id: "D001".to_string(),
                description: "Approve budget".to_string(),
            }],
            action_items: vec![ActionItem {
                id: "A001".to_string(),
                assignee: "Anna".to_string(),
                description: "Send figures".to_string(),
                due_date: Some("2025-07-25".to_string()),
                status: "Open".to_string(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_render_sections_in_order() {
        let md = render_markdown(&sample());

        let headings = [
            "# Meeting Protocol: Board meeting",
            "**Date:** 2025-07-20",
            "**Location:** Room 4",
            "**Organizer:** N/A",
            "## Participants",
            "## Agenda Items",
            "### Budget",
            "## Overall Summary",
            "## Global Decisions",
            "## Global Action Items",
        ];
        let mut last = 0;
        for heading in headings {
            let pos = md.find(heading).unwrap_or_else(|| panic!("missing {heading}"));
            assert!(pos >= last, "{heading} out of order");
            last = pos;
        }

        assert!(md.contains("- Anna (Chair)"));
        assert!(md.contains("- Clara (Participant, absent)"));
        assert!(md.contains("  - Send figures (Assigned: Anna, Due: N/A)"));
        assert!(md.contains("- Approve budget (ID: D001)"));
        assert!(md.contains(
            "- Send figures (Assigned: Anna, Due: 2025-07-25, Status: Open, ID: A001)"
        ));
        assert!(!md.contains("## Errors Encountered"));
    }

    #[test]
    fn test_render_empty_document_uses_placeholders() {
        let md = render_markdown(&ProtocolDocument::default());
        assert!(md.contains("# Meeting Protocol: N/A"));
        assert_eq!(md.matches("- None listed").count(), 2);
        assert_eq!(md.matches("- None recorded").count(), 2);
        assert!(md.contains("No overall summary provided."));
    }

    #[test]
    fn test_render_errors_and_notes() {
        let doc = ProtocolDocument {
            error: Some("Failed to parse LLM response as JSON".to_string()),
            raw_response: Some("not json {[".to_string()),
            schema_validation_errors: vec!["/summary: 5 is not of type \"string\"".to_string()],
            notes: vec!["Fallback document was not validated".to_string()],
            ..sample()
        };
        let md = render_markdown(&doc);

        assert!(md.contains("## Errors Encountered\n\n- Failed to parse LLM response as JSON"));
        assert!(md.contains("- Schema validation: /summary"));
        assert!(md.contains("```\nnot json {[\n```"));
        assert!(md.contains("## Notes\n\n- Fallback document was not validated"));
    }
}
