//! Scripted classifier for tests and dry runs.

use super::Classifier;
use crate::error::ClassifyError;
use crate::prompts::Message;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Answers calls from a queue of scripted responses, then from an optional
/// fallback. Every call is recorded.
#[derive(Default)]
pub struct StubClassifier {
    responses: Mutex<VecDeque<Result<String, String>>>,
    fallback: Option<String>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl StubClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful answer.
    pub fn respond(self, answer: impl Into<String>) -> Self {
        self.push(Ok(answer.into()))
    }

    /// Queue a transport failure.
    pub fn fail(self, reason: impl Into<String>) -> Self {
        self.push(Err(reason.into()))
    }

    /// Answer used once the queue is drained.
    pub fn with_fallback(mut self, answer: impl Into<String>) -> Self {
        self.fallback = Some(answer.into());
        self
    }

    fn push(self, entry: Result<String, String>) -> Self {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(entry);
        }
        self
    }

    /// Number of calls made so far.
    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    /// Messages of every call, in order.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Classifier for StubClassifier {
    fn classify(&self, messages: &[Message]) -> Result<String, ClassifyError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages.to_vec());
        }
        let next = self
            .responses
            .lock()
            .map_err(|_| ClassifyError::Transport("stub state poisoned".into()))?
            .pop_front();
        match next {
            Some(Ok(answer)) => Ok(answer),
            Some(Err(reason)) => Err(ClassifyError::Transport(reason)),
            None => self.fallback.clone().ok_or(ClassifyError::EmptyResponse),
        }
    }

    fn name(&self) -> &str {
        "stub"
    }
}
