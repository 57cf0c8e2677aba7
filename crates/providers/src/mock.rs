//! Scripted in-memory provider for deterministic tests.
//!
//! Responses and errors are queued ahead of time; every request is
//! recorded so tests can assert on the exact message sequences the
//! orchestrator sent (tool declarations, tool-result messages, ids).

use std::collections::VecDeque;

use parking_lot::Mutex;

use aqm_domain::{Error, Result};

use crate::traits::{CompletionRequest, CompletionResponse, LlmProvider};

#[derive(Default)]
pub struct MockProvider {
    script: Mutex<VecDeque<Result<CompletionResponse>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, resp: CompletionResponse) {
        self.script.lock().push_back(Ok(resp));
    }

    pub fn push_error(&self, err: Error) {
        self.script.lock().push_back(Err(err));
    }

    /// Shorthand for a plain-text assistant turn.
    pub fn push_text(&self, text: &str) {
        self.push_response(CompletionResponse {
            content: text.to_owned(),
            tool_calls: Vec::new(),
            model: "mock".into(),
            finish_reason: Some("stop".into()),
        });
    }

    /// Number of completion calls made so far.
    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockProvider {
    async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse> {
        self.requests.lock().push(req.clone());
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Other("mock provider script exhausted".into())))
    }

    fn provider_id(&self) -> &str {
        "mock"
    }
}
