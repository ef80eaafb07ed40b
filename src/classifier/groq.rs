//! OpenAI-compatible chat completions client (Groq by default).

use super::Classifier;
use crate::config::LlmConfig;
use crate::error::ClassifyError;
use crate::prompts::Message;
use crate::tokens::TokenCounter;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct GroqClassifier {
    agent: ureq::Agent,
    endpoint: String,
    api_key: Option<String>,
    config: LlmConfig,
    counter: Arc<dyn TokenCounter>,
}

#[derive(Deserialize)]
struct Completion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl GroqClassifier {
    /// Build a client, reading the API key from `config.api_key_env`. The
    /// counter is shared with the batcher so both agree on prompt sizes.
    ///
    /// A missing key is only an error once a request is actually made, so
    /// runs answered entirely from the cache work offline.
    pub fn from_env(config: &LlmConfig, counter: Arc<dyn TokenCounter>) -> Self {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.is_empty());
        if api_key.is_none() {
            warn!(env_var = %config.api_key_env, "No API key set, uncached classifications will fail");
        }
        Self::new(config, api_key, counter)
    }

    pub fn new(config: &LlmConfig, api_key: Option<String>, counter: Arc<dyn TokenCounter>) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .new_agent();
        Self {
            agent,
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            api_key,
            config: config.clone(),
            counter,
        }
    }

    /// Reject prompts that leave no room for the response.
    fn check_input(&self, messages: &[Message]) -> Result<usize, ClassifyError> {
        let tokens: usize = messages.iter().map(|m| self.counter.count(&m.content)).sum();
        let limit = self.config.max_input_tokens();
        if tokens > limit {
            return Err(ClassifyError::InputTooLong { tokens, limit });
        }
        Ok(tokens)
    }

    fn request_body(&self, messages: &[Message]) -> serde_json::Value {
        json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_response_tokens,
        })
    }
}

/// Pull the first choice's message content out of a completion response.
fn parse_completion(body: &str) -> Result<String, ClassifyError> {
    let completion: Completion = serde_json::from_str(body)
        .map_err(|e| ClassifyError::Transport(format!("malformed completion: {e}")))?;
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(ClassifyError::EmptyResponse)
}

impl Classifier for GroqClassifier {
    fn classify(&self, messages: &[Message]) -> Result<String, ClassifyError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ClassifyError::MissingApiKey {
                env_var: self.config.api_key_env.clone(),
            })?;
        let tokens = self.check_input(messages)?;
        debug!(model = %self.config.model, tokens, "Sending classification request");

        let body = self.request_body(messages);
        let mut response = self
            .agent
            .post(&self.endpoint)
            .header("Authorization", &format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .send(body.to_string())
            .map_err(|e| ClassifyError::Transport(e.to_string()))?;
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ClassifyError::Transport(e.to_string()))?;
        parse_completion(&text)
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::WhitespaceCounter;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn client(context_window: usize, max_response_tokens: usize) -> GroqClassifier {
        let config = LlmConfig {
            context_window,
            max_response_tokens,
            ..LlmConfig::default()
        };
        GroqClassifier::new(&config, Some("key".into()), Arc::new(WhitespaceCounter))
    }

    #[test]
    fn test_rejects_long_input_before_sending() {
        let groq = client(10, 6);
        let messages = [Message::system("one two"), Message::user("three four five")];
        match groq.classify(&messages) {
            Err(ClassifyError::InputTooLong { tokens, limit }) => {
                assert_eq!(tokens, 5);
                assert_eq!(limit, 4);
            }
            other => panic!("expected InputTooLong, got {other:?}"),
        }
    }

    struct Tally(AtomicUsize);

    impl TokenCounter for Tally {
        fn count(&self, text: &str) -> usize {
            self.0.fetch_add(1, Ordering::SeqCst);
            text.split_whitespace().count()
        }
    }

    #[test]
    fn test_counter_is_shared_with_caller() {
        let counter = Arc::new(Tally(AtomicUsize::new(0)));
        let config = LlmConfig {
            context_window: 3,
            max_response_tokens: 1,
            ..LlmConfig::default()
        };
        let groq = GroqClassifier::new(&config, Some("key".into()), counter.clone());

        assert!(matches!(
            groq.classify(&[Message::user("one two three")]),
            Err(ClassifyError::InputTooLong { tokens: 3, limit: 2 })
        ));
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert_eq!(Arc::strong_count(&counter), 2);
    }

    #[test]
    fn test_request_body_shape() {
        let groq = client(8192, 2048);
        let body = groq.request_body(&[Message::user("hi")]);
        assert_eq!(body["model"], "llama3-70b-8192");
        assert_eq!(body["max_tokens"], 2048);
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hi");
        assert_eq!(groq.endpoint, "https://api.groq.com/openai/v1/chat/completions");
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "{\"a\": \"b\"}"}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), r#"{"a": "b"}"#);
        assert!(matches!(
            parse_completion(r#"{"choices": []}"#),
            Err(ClassifyError::EmptyResponse)
        ));
        assert!(matches!(
            parse_completion("<html>"),
            Err(ClassifyError::Transport(_))
        ));
    }

    #[test]
    fn test_missing_key() {
        let config = LlmConfig {
            api_key_env: "TASK_INSIGHT_TEST_UNSET_KEY".into(),
            ..LlmConfig::default()
        };
        let groq = GroqClassifier::from_env(&config, Arc::new(WhitespaceCounter));
        assert!(matches!(
            groq.classify(&[Message::user("hi")]),
            Err(ClassifyError::MissingApiKey { .. })
        ));
    }
}
