//! Token counting for batch budgets.

use tiktoken_rs::CoreBPE;

/// Counts tokens in rendered prompt text. Implementations must be
/// deterministic: the same text always yields the same count.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// The `cl100k_base` byte-pair encoding.
pub struct Cl100kCounter {
    bpe: CoreBPE,
}

impl Cl100kCounter {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            bpe: tiktoken_rs::cl100k_base()?,
        })
    }
}

impl TokenCounter for Cl100kCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

/// One token per whitespace-separated word. Cheap and predictable, used
/// where exact model tokenization does not matter.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceCounter;

impl TokenCounter for WhitespaceCounter {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_counter() {
        assert_eq!(WhitespaceCounter.count("a  b\nc"), 3);
        assert_eq!(WhitespaceCounter.count(""), 0);
    }

    #[test]
    fn test_cl100k_is_deterministic() {
        let counter = Cl100kCounter::new().unwrap();
        let text = "Fix the login redirect loop";
        let first = counter.count(text);
        assert!(first > 0);
        assert_eq!(counter.count(text), first);
        assert_eq!(counter.count(""), 0);
    }
}
