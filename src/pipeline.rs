//! End-to-end run: chunk, map, reduce, refine.

use std::sync::Arc;

use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::llm::{CompletionConfig, CompletionGateway, OpenAiTransport, RetryPolicy};
use crate::models::{Chunk, DocumentKind, MeetingMetadata, ProtocolDocument, TranscriptSource};
use crate::schema::ValidationSchema;
use crate::stages::{
    ChunkConfig, Chunker, MapConfig, MapStage, ReduceConfig, ReduceStage, RefineConfig,
    RefineStage,
};

/// Settings for every stage of a run
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub chunk: ChunkConfig,
    /// Used by [`ProtocolPipeline::connect`]; a gateway passed to
    /// [`ProtocolPipeline::new`] keeps its own policy
    pub retry: RetryPolicy,
    pub map: MapConfig,
    pub reduce: ReduceConfig,
    pub refine: RefineConfig,
}

/// Result of one run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub run_id: Uuid,
    pub chunk_count: usize,
    pub markdown: String,
    pub document: ProtocolDocument,
    pub kind: DocumentKind,
}

/// Map-reduce-refine protocol generator.
///
/// Holds no per-run state; one instance can serve any number of runs.
pub struct ProtocolPipeline {
    chunker: Chunker,
    map: MapStage,
    reduce: ReduceStage,
    refine: RefineStage,
}

impl ProtocolPipeline {
    pub fn new(gateway: Arc<CompletionGateway>, config: PipelineConfig) -> Self {
        info!(
            "Pipeline using model {} ({} attempts per call)",
            gateway.model(),
            gateway.retry_policy().attempts()
        );
        Self {
            chunker: Chunker::new(config.chunk),
            map: MapStage::new(Arc::clone(&gateway), config.map),
            reduce: ReduceStage::new(Arc::clone(&gateway), config.reduce),
            refine: RefineStage::new(gateway, config.refine),
        }
    }

    /// Build a pipeline talking to an OpenAI-compatible service
    pub fn connect(completion: &CompletionConfig, config: PipelineConfig) -> Result<Self, PipelineError> {
        let transport = OpenAiTransport::new(completion)?;
        let gateway = CompletionGateway::new(
            Arc::new(transport),
            completion.model.clone(),
            config.retry.clone(),
        );
        Ok(Self::new(Arc::new(gateway), config))
    }

    /// Replace the chunker, e.g. to use a different encoder
    pub fn with_chunker(mut self, chunker: Chunker) -> Self {
        self.chunker = chunker;
        self
    }

    /// Run all stages over one transcript.
    ///
    /// Fails only when the refine stage has to fall back and the fallback
    /// document violates `schema`.
    pub async fn run(
        &self,
        source: &TranscriptSource,
        metadata: &MeetingMetadata,
        schema: &ValidationSchema,
    ) -> Result<PipelineOutput, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("protocol_run", run_id = %run_id);

        async move {
            info!(
                "Generating protocol for \"{}\" from {} transcript",
                metadata.title_or_default(),
                source.shape()
            );

            info!("Stage 0: Chunking transcript...");
            let chunks = self.chunker.chunk(source);
            if chunks.first().is_some_and(Chunk::is_sentinel) {
                warn!("Transcript has no text; the protocol will be built from an empty meeting");
            }

            info!("Stage 1: Extracting from {} chunks...", chunks.len());
            let map_results = self.map.run(&chunks).await;

            info!("Stage 2: Consolidating findings...");
            let reduced = self.reduce.reduce(&map_results).await;

            info!("Stage 3: Assembling protocol...");
            let refined = self.refine.refine(&reduced, metadata, schema).await?;

            info!(
                "Protocol complete ({:?}, {} decisions, {} action items)",
                refined.kind,
                refined.document.decisions.len(),
                refined.document.action_items.len()
            );

            Ok::<_, PipelineError>(PipelineOutput {
                run_id,
                chunk_count: chunks.len(),
                markdown: refined.markdown,
                document: refined.document,
                kind: refined.kind,
            })
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::{RecordingSleeper, ScriptedTransport, Step, user_text};
    use crate::llm::{CompletionRequest, MAP_SYSTEM_PROMPT, REDUCE_SYSTEM_PROMPT};
    use crate::models::{NO_CONTENT_SENTINEL, TranscriptSegment};
    use crate::tokenizer::testing::CharEncoder;
    use serde_json::json;

    fn pipeline(transport: Arc<ScriptedTransport>, attempts: u32) -> ProtocolPipeline {
        let gateway = CompletionGateway::new(transport, "test-model".to_string(), RetryPolicy::new(attempts))
            .with_sleeper(Arc::new(RecordingSleeper::default()));
        let config = PipelineConfig {
            chunk: ChunkConfig {
                max_tokens: 40,
                overlap_tokens: 5,
                ..Default::default()
            },
            ..Default::default()
        };
        let chunker = Chunker::with_encoder(config.chunk.clone(), Box::new(CharEncoder));
        ProtocolPipeline::new(Arc::new(gateway), config).with_chunker(chunker)
    }

    fn system_prompt(request: &CompletionRequest) -> &str {
        request.messages[0].content.as_str()
    }

    fn scripted_service(request: &CompletionRequest) -> Step {
        let reply = if system_prompt(request) == MAP_SYSTEM_PROMPT {
            json!({
                "summary": "Budget discussed",
                "decisions": ["Approve budget"],
                "actions": [{"who": "Anna", "what": "Send figures", "due": null}]
            })
        } else if system_prompt(request) == REDUCE_SYSTEM_PROMPT {
            json!({
                "decisions": ["Approve budget"],
                "actions": [{"who": "Anna", "what": "Send figures", "due": "2025-07-25"}]
            })
        } else {
            json!({
                "metadata": {"title": "Board meeting", "date": "2025-07-20"},
                "participants": [],
                "agenda_items": [],
                "summary": "Budget approved.",
                "decisions": [{"id": "D001", "description": "Approve budget"}],
                "action_items": [{"id": "A001", "assignee": "Anna", "description": "Send figures",
                                  "due_date": "2025-07-25", "status": "Open"}]
            })
        };
        Step::Reply(reply.to_string())
    }

    #[tokio::test]
    async fn test_full_run() {
        let transport = Arc::new(ScriptedTransport::respond(scripted_service));
        let source = TranscriptSource::from_segments(vec![
            TranscriptSegment::new("SPEAKER_01", "Good afternoon, let's look at the budget.", 0.0, 4.0),
            TranscriptSegment::new("SPEAKER_02", "I propose we approve it as drafted.", 4.5, 8.0),
            TranscriptSegment::new("SPEAKER_01", "Agreed. Anna will send the figures.", 8.5, 12.0),
        ]);
        let metadata = MeetingMetadata {
            title: Some("Board meeting".to_string()),
            date: Some("2025-07-20".to_string()),
            ..Default::default()
        };

        let output = pipeline(transport.clone(), 3)
            .run(&source, &metadata, &ValidationSchema::Absent)
            .await
            .unwrap();

        assert!(output.chunk_count > 1);
        assert_eq!(output.kind, DocumentKind::Generated);
        assert_eq!(output.document.decisions[0].description, "Approve budget");
        assert!(output.markdown.contains("- Send figures (Assigned: Anna, Due: 2025-07-25"));
        // one call per chunk, then reduce and refine
        assert_eq!(transport.calls(), output.chunk_count + 2);
    }

    #[tokio::test]
    async fn test_empty_transcript_degrades_without_failing() {
        let transport = Arc::new(ScriptedTransport::always(Step::ServerError(500)));

        let output = pipeline(transport.clone(), 1)
            .run(
                &TranscriptSource::Segments(vec![]),
                &MeetingMetadata::default(),
                &ValidationSchema::Absent,
            )
            .await
            .unwrap();

        assert_eq!(output.chunk_count, 1);
        assert_eq!(output.kind, DocumentKind::Fallback);
        assert!(output.document.error.is_some());
        assert!(output.markdown.contains("## Errors Encountered"));
        assert!(output.markdown.contains("# Meeting Protocol: Meeting Protocol"));

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert!(user_text(&requests[0]).ends_with(NO_CONTENT_SENTINEL));
    }

    #[tokio::test]
    async fn test_runs_get_distinct_ids() {
        let transport = Arc::new(ScriptedTransport::respond(scripted_service));
        let pipeline = pipeline(transport, 1);
        let source = TranscriptSource::Text("Short meeting.".to_string());
        let metadata = MeetingMetadata::default();

        let first = pipeline.run(&source, &metadata, &ValidationSchema::Absent).await.unwrap();
        let second = pipeline.run(&source, &metadata, &ValidationSchema::Absent).await.unwrap();
        assert_ne!(first.run_id, second.run_id);
    }
}
