use crate::models::{ActionEntry, MapResult, MeetingMetadata};

/// System prompt for per-chunk extraction (map stage)
pub const MAP_SYSTEM_PROMPT: &str = r#"You are a meeting secretary. Analyze this meeting segment and extract:
1. A concise summary
2. Any decisions made
3. Any action items/tasks assigned

Return a JSON object with exactly this structure:
{
    "summary": "Brief summary of key points",
    "decisions": ["List of decisions made"],
    "actions": [
        {"who": "Person name", "what": "Task description", "due": "YYYY-MM-DD or null"}
    ]
}

Use empty arrays when there are no decisions or actions. Do not invent content."#;

/// System prompt for consolidation (reduce stage)
pub const REDUCE_SYSTEM_PROMPT: &str = r#"Combine these meeting segment summaries, decisions, and actions into a unified list of decisions and actions.
Remove or merge duplicates (similarity >= 80% for human understanding, be precise).
Ensure the output maintains all unique decisions and actions.

Output format must be a JSON object with these keys:
{
    "decisions": ["List of unique decisions"],
    "actions": [
        {"who": "Person name", "what": "Task description", "due": "YYYY-MM-DD or null"}
    ]
}"#;

/// System prompt for final document assembly (refine stage)
pub const REFINE_SYSTEM_PROMPT: &str = "You are an expert meeting secretary, tasked with producing a final, structured meeting protocol in JSON format according to the user's detailed instructions.";

/// Build the user prompt for one chunk
pub fn build_map_prompt(chunk_text: &str) -> String {
    format!("Meeting segment text:\n\n{}", chunk_text)
}

/// Build the user prompt for the semantic merge.
///
/// `decisions` and `actions` are the syntactically pre-merged lists.
pub fn build_reduce_prompt(
    map_results: &[MapResult],
    decisions: &[String],
    actions: &[ActionEntry],
) -> String {
    let summaries: Vec<&str> = map_results
        .iter()
        .map(|r| r.summary.trim())
        .filter(|s| !s.is_empty())
        .collect();

    let mut prompt = String::new();
    prompt.push_str("Combined meeting data:\n\n");
    prompt.push_str("## Combined Summaries\n");
    prompt.push_str(&summaries.join("\n\n"));
    prompt.push_str("\n\n## Extracted Decisions\n");
    prompt.push_str(&to_pretty_json(decisions));
    prompt.push_str("\n\n## Extracted Actions\n");
    prompt.push_str(&to_pretty_json(actions));
    prompt.push('\n');
    prompt
}

/// Build the refinement prompt embedding metadata and consolidated findings
pub fn build_refine_prompt(
    metadata: &MeetingMetadata,
    decisions: &[String],
    actions: &[ActionEntry],
) -> String {
    let participants: Vec<String> = metadata
        .participants
        .present()
        .iter()
        .map(|p| format!("- {} ({})", p.name, p.role.as_deref().unwrap_or("Participant")))
        .collect();

    let agenda: Vec<String> = metadata
        .agenda
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item))
        .collect();

    let decision_lines: Vec<String> = decisions.iter().map(|d| format!("- {}", d)).collect();

    let action_lines: Vec<String> = actions
        .iter()
        .map(|a| {
            format!(
                "- Task: {}, Assigned to: {}, Due: {}",
                a.what,
                if a.who.is_empty() { "N/A" } else { a.who.as_str() },
                a.due.as_deref().unwrap_or("N/A")
            )
        })
        .collect();

    let mut prompt = String::new();
    prompt.push_str("Generate a formal meeting protocol in JSON format based on the following information.\n");
    prompt.push_str("Focus on clarity, completeness, and formal tone.\n\n");

    prompt.push_str(&format!("Meeting Title: {}\n", metadata.title_or_default()));
    prompt.push_str(&format!("Date: {}\n", metadata.date.as_deref().unwrap_or("N/A")));
    prompt.push_str(&format!("Location: {}\n", metadata.location.as_deref().unwrap_or("N/A")));
    prompt.push_str(&format!("Organizer: {}\n\n", metadata.organizer.as_deref().unwrap_or("N/A")));

    push_section(&mut prompt, "Participants", &participants, "- (No participants listed)");
    push_section(&mut prompt, "Agenda", &agenda, "- (No agenda items listed)");
    push_section(&mut prompt, "Key Decisions Made", &decision_lines, "- (No decisions recorded)");
    push_section(&mut prompt, "Action Items", &action_lines, "- (No action items recorded)");

    prompt.push_str(REFINE_OUTPUT_INSTRUCTIONS);
    prompt
}

const REFINE_OUTPUT_INSTRUCTIONS: &str = r#"Please generate a JSON object with the following main keys:
- "metadata": { "title": "...", "date": "...", "location": "..." (if known, else "N/A"), "organizer": "..." (if known, else "N/A") }
- "participants": [ { "name": "...", "role": "...", "present": true/false (assume true if listed) } ]
- "agenda_items": [ { "topic": "...", "discussion_summary": "Brief summary of discussion on this topic.", "decisions_made": ["relevant decision", ...], "action_items_assigned": [ { "who": "...", "what": "...", "due": "..." } ] } ]
- "summary": "Overall concise summary of the meeting's main outcomes and discussions."
- "decisions": [ { "id": "D001", "description": "..." } ] (global decisions not tied to a specific agenda item)
- "action_items": [ { "id": "A001", "assignee": "...", "description": "...", "due_date": "...", "status": "Open" } ] (global actions)

Important considerations for JSON content:
- If decisions or actions can be linked to specific agenda items, list them under that agenda item. Otherwise, list them in the global "decisions" and "action_items" arrays.
- Ensure all provided decisions and actions are included either globally or under an agenda item.
- Provide unique IDs for decisions and action items (e.g., D001, A001).
- Dates should be in YYYY-MM-DD format.
"#;

fn push_section(prompt: &mut String, title: &str, lines: &[String], empty: &str) {
    prompt.push_str(title);
    prompt.push_str(":\n");
    if lines.is_empty() {
        prompt.push_str(empty);
    } else {
        prompt.push_str(&lines.join("\n"));
    }
    prompt.push_str("\n\n");
}

fn to_pretty_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "[]".to_string())
}
