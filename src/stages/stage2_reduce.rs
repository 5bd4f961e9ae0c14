use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::llm::{
    ChatMessage, CompletionGateway, CompletionOptions, REDUCE_SYSTEM_PROMPT, build_reduce_prompt,
};
use crate::models::{ActionEntry, MapResult, ReducedResult};

/// Configuration for the reduce stage
#[derive(Debug, Clone)]
pub struct ReduceConfig {
    pub temperature: f64,
    pub timeout: Duration,
}

impl Default for ReduceConfig {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            timeout: Duration::from_secs(90),
        }
    }
}

/// Consolidates per-chunk results into one deduplicated set
pub struct ReduceStage {
    gateway: Arc<CompletionGateway>,
    config: ReduceConfig,
}

/// Exact-string union of all decisions, blanks dropped, sorted
pub fn merge_decisions(map_results: &[MapResult]) -> Vec<String> {
    dedup_decisions(map_results.iter().flat_map(|r| r.decisions.iter().cloned()))
}

/// All actions in chunk order, keeping the first occurrence of each `what`
pub fn merge_actions(map_results: &[MapResult]) -> Vec<ActionEntry> {
    dedup_actions(map_results.iter().flat_map(|r| r.actions.iter().cloned()))
}

fn dedup_decisions(decisions: impl IntoIterator<Item = String>) -> Vec<String> {
    decisions
        .into_iter()
        .filter(|d| !d.trim().is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn dedup_actions(actions: impl IntoIterator<Item = ActionEntry>) -> Vec<ActionEntry> {
    let mut seen = HashSet::new();
    actions
        .into_iter()
        .filter(|a| !a.what.trim().is_empty())
        .filter(|a| seen.insert(a.what.clone()))
        .collect()
}

impl ReduceStage {
    pub fn new(gateway: Arc<CompletionGateway>, config: ReduceConfig) -> Self {
        Self { gateway, config }
    }

    /// Syntactic pre-merge followed by one semantic merge call.
    ///
    /// Never fails. When the model call or its JSON is unusable the error
    /// text leads `decisions`, followed by the pre-merged findings.
    pub async fn reduce(&self, map_results: &[MapResult]) -> ReducedResult {
        let decisions = merge_decisions(map_results);
        let actions = merge_actions(map_results);
        info!(
            "Reduce stage: {} results pre-merged to {} decisions, {} actions",
            map_results.len(),
            decisions.len(),
            actions.len()
        );

        let messages = vec![
            ChatMessage::system(REDUCE_SYSTEM_PROMPT),
            ChatMessage::user(build_reduce_prompt(map_results, &decisions, &actions)),
        ];
        let options = CompletionOptions::json(self.config.temperature, self.config.timeout);

        let failure = match self.gateway.complete(messages, &options).await {
            Ok(raw) => match serde_json::from_str::<ReducedResult>(&raw) {
                Ok(merged) => {
                    let result = ReducedResult {
                        decisions: dedup_decisions(merged.decisions),
                        actions: dedup_actions(merged.actions),
                    };
                    info!(
                        "Reduce stage complete: {} decisions, {} actions",
                        result.decisions.len(),
                        result.actions.len()
                    );
                    return result;
                }
                Err(e) => {
                    warn!("Could not parse reduce response as JSON: {}", e);
                    debug!("Unparseable reduce response: {}", raw);
                    format!("Error in reduce stage: could not parse LLM JSON response. Details: {}", e)
                }
            },
            Err(e) => {
                warn!("Reduce call failed after retries: {}", e);
                format!("Error in reduce stage: {}", e)
            }
        };

        let mut degraded = Vec::with_capacity(decisions.len() + 1);
        degraded.push(failure);
        degraded.extend(decisions);
        ReducedResult {
            decisions: degraded,
            actions,
        }
    }
}
