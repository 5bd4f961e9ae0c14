use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{ChatMessage, CompletionRequest, CompletionTransport};
use crate::error::{GatewayError, TransportError};

/// Exponential backoff policy for completion calls.
///
/// Attempt `n` (0-based) that fails waits `base_delay * multiplier^n`,
/// capped at `max_delay`, before attempt `n + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Attempts actually made; zero is treated as one
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay after failed attempt `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt as i32);
        let delay = self.base_delay.as_secs_f64() * factor;
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }

    /// Every delay a call that always fails will wait, in order
    pub fn schedule(&self) -> Vec<Duration> {
        (0..self.attempts() - 1).map(|n| self.delay_for(n)).collect()
    }
}

/// Waits between attempts; swapped for a recording clock in tests
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Per-call sampling and output options
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub temperature: f64,
    pub expect_json: bool,
    pub timeout: Duration,
}

impl CompletionOptions {
    pub fn json(temperature: f64, timeout: Duration) -> Self {
        Self {
            temperature,
            expect_json: true,
            timeout,
        }
    }
}

/// The only path to the completion service.
///
/// Holds shared read-only configuration; concurrent calls need no locking.
pub struct CompletionGateway {
    transport: Arc<dyn CompletionTransport>,
    model: String,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl CompletionGateway {
    pub fn new(transport: Arc<dyn CompletionTransport>, model: String, retry: RetryPolicy) -> Self {
        Self {
            transport,
            model,
            retry,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the clock used between attempts
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Run one completion, retrying transport failures with backoff.
    ///
    /// Blank content with `expect_json` set fails immediately with
    /// [`GatewayError::EmptyContent`].
    pub async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: &CompletionOptions,
    ) -> Result<String, GatewayError> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: options.temperature,
            expect_json: options.expect_json,
            timeout: options.timeout,
        };

        let attempts = self.retry.attempts();
        let mut last_error: Option<TransportError> = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.retry.delay_for(attempt - 1);
                debug!("Retry {} of {} in {:?}", attempt, attempts - 1, delay);
                self.sleeper.sleep(delay).await;
            }

            match self.transport.complete(&request).await {
                Ok(content) => {
                    if content.trim().is_empty() {
                        if request.expect_json {
                            return Err(GatewayError::EmptyContent);
                        }
                        warn!("Completion service returned empty content for model {}", self.model);
                    }
                    return Ok(content);
                }
                Err(e) => {
                    warn!(
                        "Completion attempt {}/{} failed: {}",
                        attempt + 1,
                        attempts,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(GatewayError::Exhausted {
            attempts,
            source: last_error
                .unwrap_or_else(|| TransportError::Malformed("no attempt was made".to_string())),
        })
    }
}
