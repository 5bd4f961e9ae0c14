//! In-memory completion service and clock for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{CompletionRequest, CompletionTransport, Sleeper};
use crate::error::TransportError;

/// What the fake service does for one request
#[derive(Debug, Clone)]
pub enum Step {
    Reply(String),
    /// Reply after a real delay, to shuffle completion order
    ReplyAfter(Duration, String),
    ServerError(u16),
}

type Responder = Box<dyn Fn(&CompletionRequest) -> Step + Send + Sync>;

enum Script {
    Queue(Mutex<VecDeque<Step>>),
    Always(Step),
    Respond(Responder),
}

pub struct ScriptedTransport {
    script: Script,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedTransport {
    /// Play the steps in order; once exhausted every call fails with 500
    pub fn new(steps: Vec<Step>) -> Self {
        Self::with_script(Script::Queue(Mutex::new(steps.into())))
    }

    pub fn always(step: Step) -> Self {
        Self::with_script(Script::Always(step))
    }

    /// Decide the step from the request itself
    pub fn respond<F>(responder: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Step + Send + Sync + 'static,
    {
        Self::with_script(Script::Respond(Box::new(responder)))
    }

    fn with_script(script: Script) -> Self {
        Self {
            script,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionTransport for ScriptedTransport {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, TransportError> {
        self.requests.lock().unwrap().push(request.clone());

        let step = match &self.script {
            Script::Queue(queue) => queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Step::ServerError(500)),
            Script::Always(step) => step.clone(),
            Script::Respond(responder) => responder(request),
        };

        match step {
            Step::Reply(content) => Ok(content),
            Step::ReplyAfter(delay, content) => {
                tokio::time::sleep(delay).await;
                Ok(content)
            }
            Step::ServerError(status) => Err(TransportError::Status {
                status,
                body: "scripted failure".to_string(),
            }),
        }
    }
}

/// Records requested delays instead of sleeping
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn recorded(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/// Text of the last user message in a request
pub fn user_text(request: &CompletionRequest) -> &str {
    request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == super::Role::User)
        .map(|m| m.content.as_str())
        .unwrap_or("")
}
