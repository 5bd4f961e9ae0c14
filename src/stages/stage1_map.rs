use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::llm::{
    ChatMessage, CompletionGateway, CompletionOptions, MAP_SYSTEM_PROMPT, build_map_prompt,
};
use crate::models::{Chunk, MapResult};

/// Configuration for the map stage
#[derive(Debug, Clone)]
pub struct MapConfig {
    /// Upper bound on concurrent extraction calls
    pub max_workers: usize,
    pub temperature: f64,
    /// Per-call timeout
    pub timeout: Duration,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            max_workers: 5,
            temperature: 0.2,
            timeout: Duration::from_secs(120),
        }
    }
}

impl MapConfig {
    /// min(max_workers, available parallelism), at least one
    pub fn pool_size(&self) -> usize {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        self.max_workers.min(cores).max(1)
    }
}

/// Per-chunk extraction of summary, decisions and actions
#[derive(Clone)]
pub struct MapStage {
    gateway: Arc<CompletionGateway>,
    config: MapConfig,
}

impl MapStage {
    pub fn new(gateway: Arc<CompletionGateway>, config: MapConfig) -> Self {
        Self { gateway, config }
    }

    /// Extract from one chunk. Never fails: parse and gateway errors come
    /// back as a stub whose summary carries the error.
    pub async fn map_chunk(&self, chunk_text: &str) -> MapResult {
        let messages = vec![
            ChatMessage::system(MAP_SYSTEM_PROMPT),
            ChatMessage::user(build_map_prompt(chunk_text)),
        ];
        let options = CompletionOptions::json(self.config.temperature, self.config.timeout);

        let raw = match self.gateway.complete(messages, &options).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Map call failed after retries: {}", e);
                return MapResult::failed(format!("Error processing segment: {}", e));
            }
        };

        match serde_json::from_str::<MapResult>(&raw) {
            Ok(result) => result,
            Err(e) => {
                warn!("Could not parse map response as JSON: {}", e);
                debug!("Unparseable map response: {}", raw);
                MapResult::failed(format!(
                    "Error: Could not parse LLM JSON response. Details: {}",
                    e
                ))
            }
        }
    }

    /// Map every chunk with bounded parallelism.
    ///
    /// `result[i]` always comes from `chunks[i]`, whatever order the calls
    /// complete in.
    pub async fn run(&self, chunks: &[Chunk]) -> Vec<MapResult> {
        let pool_size = self.config.pool_size();
        info!(
            "Map stage: {} chunks on {} workers",
            chunks.len(),
            pool_size
        );

        let permits = Arc::new(Semaphore::new(pool_size));
        let mut handles = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            let stage = self.clone();
            let permits = Arc::clone(&permits);
            let text = chunk.text.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                stage.map_chunk(&text).await
            }));
        }

        // Slot i belongs to chunks[i]; handles are joined by position
        let mut slots: Vec<Option<MapResult>> = vec![None; chunks.len()];
        for (slot, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(result) => {
                    debug!(
                        "Chunk {}: {} decisions, {} actions",
                        chunks[slot].index,
                        result.decisions.len(),
                        result.actions.len()
                    );
                    slots[slot] = Some(result);
                }
                Err(e) => warn!("Map worker for chunk {} failed: {}", chunks[slot].index, e),
            }
        }

        let results: Vec<MapResult> = slots
            .into_iter()
            .zip(chunks)
            .map(|(slot, chunk)| {
                slot.unwrap_or_else(|| {
                    MapResult::failed(format!(
                        "Error in map stage: chunk {} produced no result",
                        chunk.index
                    ))
                })
            })
            .collect();

        let degraded = results.iter().filter(|r| r.degraded).count();
        info!("Map stage complete: {} results, {} degraded", results.len(), degraded);
        results
    }
}
