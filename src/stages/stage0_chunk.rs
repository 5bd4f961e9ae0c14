use tracing::{debug, info, warn};

use crate::models::{Chunk, TranscriptSource};
use crate::tokenizer::{TiktokenEncoder, TokenEncoder};

/// Characters assumed per token when no encoder is available
pub const CHARS_PER_TOKEN: usize = 4;

/// Tokens a window may shed at either edge to land on a decodable boundary
const MAX_BOUNDARY_TRIM: usize = 3;

/// Configuration for chunking
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Maximum tokens per chunk
    pub max_tokens: usize,
    /// Tokens shared between consecutive chunks
    pub overlap_tokens: usize,
    /// tiktoken encoding name
    pub encoding: String,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_tokens: 550, // roughly two pages of speech
            overlap_tokens: 100,
            encoding: "cl100k_base".to_string(),
        }
    }
}

impl ChunkConfig {
    /// Window size, never zero
    pub fn window(&self) -> usize {
        self.max_tokens.max(1)
    }

    /// Advance between windows. An overlap that would stall the window
    /// yields non-overlapping windows instead.
    pub fn step(&self) -> usize {
        let window = self.window();
        if self.overlap_tokens < window {
            window - self.overlap_tokens
        } else {
            window
        }
    }

    /// Upper bound on chunk count for a stream of `total` tokens
    pub fn max_chunks(&self, total: usize) -> usize {
        total.div_ceil(self.step()).max(1)
    }
}

/// Splits transcripts into overlapping token windows
pub struct Chunker {
    config: ChunkConfig,
    encoder: Option<Box<dyn TokenEncoder>>,
}

impl Chunker {
    /// Load the configured encoding; an unavailable encoder degrades to
    /// character windows rather than failing.
    pub fn new(config: ChunkConfig) -> Self {
        let encoder = match TiktokenEncoder::for_encoding(&config.encoding) {
            Ok(encoder) => Some(Box::new(encoder) as Box<dyn TokenEncoder>),
            Err(e) => {
                warn!(
                    "Tokenizer {} unavailable ({}), falling back to character windows",
                    config.encoding, e
                );
                None
            }
        };
        Self { config, encoder }
    }

    pub fn with_encoder(config: ChunkConfig, encoder: Box<dyn TokenEncoder>) -> Self {
        Self {
            config,
            encoder: Some(encoder),
        }
    }

    /// Chunker that always uses character windows
    pub fn character_based(config: ChunkConfig) -> Self {
        Self {
            config,
            encoder: None,
        }
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Name of the active encoder, or "characters" in fallback mode
    pub fn encoder_name(&self) -> &str {
        self.encoder.as_deref().map_or("characters", |e| e.name())
    }

    /// Split a transcript into ordered chunks.
    ///
    /// Never returns an empty list: a transcript without text yields the
    /// single sentinel chunk.
    pub fn chunk(&self, source: &TranscriptSource) -> Vec<Chunk> {
        let Some(text) = source.joined_text() else {
            warn!("Could not extract any text from {} transcript", source.shape());
            return vec![Chunk::sentinel()];
        };

        let texts = match &self.encoder {
            Some(encoder) => self.token_windows(encoder.as_ref(), &text),
            None => self.char_windows(&text),
        };

        let chunks: Vec<Chunk> = texts
            .into_iter()
            .filter(|t| !t.is_empty())
            .enumerate()
            .map(|(index, text)| Chunk::new(index, text))
            .collect();

        if chunks.is_empty() {
            warn!("No processable text after tokenization");
            return vec![Chunk::sentinel()];
        }

        info!(
            "Split {} chars into {} chunks ({} tokens, {} overlap, {})",
            text.chars().count(),
            chunks.len(),
            self.config.window(),
            self.config.overlap_tokens,
            self.encoder_name()
        );
        chunks
    }

    fn token_windows(&self, encoder: &dyn TokenEncoder, text: &str) -> Vec<String> {
        let tokens = encoder.encode(text);
        window_bounds(tokens.len(), self.config.window(), self.config.step())
            .into_iter()
            .filter_map(|(start, end)| decode_window(encoder, &tokens, start, end))
            .collect()
    }

    fn char_windows(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let window = self.config.window().saturating_mul(CHARS_PER_TOKEN);
        let step = self.config.step().saturating_mul(CHARS_PER_TOKEN);
        window_bounds(chars.len(), window, step)
            .into_iter()
            .map(|(start, end)| chars[start..end].iter().collect())
            .collect()
    }
}

/// `[start, end)` windows of `window` items advancing by `step`, ending with
/// the window that reaches `total`
fn window_bounds(total: usize, window: usize, step: usize) -> Vec<(usize, usize)> {
    let window = window.max(1);
    let step = step.clamp(1, window);
    let mut bounds = Vec::new();
    let mut start = 0;

    while start < total {
        let end = start.saturating_add(window).min(total);
        bounds.push((start, end));
        if end == total {
            break;
        }
        start += step;
    }

    bounds
}

/// Decode `tokens[start..end]`, narrowing the window by up to
/// [`MAX_BOUNDARY_TRIM`] tokens per edge when it splits a character.
fn decode_window(
    encoder: &dyn TokenEncoder,
    tokens: &[u32],
    start: usize,
    end: usize,
) -> Option<String> {
    for trim_start in 0..=MAX_BOUNDARY_TRIM {
        for trim_end in 0..=MAX_BOUNDARY_TRIM {
            let (s, e) = (start + trim_start, end.saturating_sub(trim_end));
            if s >= e {
                continue;
            }
            if let Ok(text) = encoder.decode(&tokens[s..e]) {
                if trim_start + trim_end > 0 {
                    debug!("Window {}..{} narrowed to {}..{} to decode", start, end, s, e);
                }
                return Some(text);
            }
        }
    }
    warn!("Dropping undecodable token window {}..{}", start, end);
    None
}
