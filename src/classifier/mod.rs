//! External classification call.
//!
//! The pipeline only sees the [`Classifier`] trait: messages in, free text
//! out. [`GroqClassifier`] talks to an OpenAI-compatible chat completions
//! endpoint; [`StubClassifier`] replays scripted answers without network
//! access.

mod groq;
mod stub;

pub use groq::GroqClassifier;
pub use stub::StubClassifier;

use crate::error::ClassifyError;
use crate::prompts::Message;

/// Sends one batch of role-tagged messages and returns the raw answer.
pub trait Classifier: Send + Sync {
    fn classify(&self, messages: &[Message]) -> Result<String, ClassifyError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}
