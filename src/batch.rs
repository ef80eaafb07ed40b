//! Token-bounded batching of classification items.
//!
//! Items are appended one at a time to a running batch; after each append the
//! batch is rendered through its prompt and the tokens of all message
//! contents are summed. When that sum exceeds the budget the running batch
//! (without the new item) is emitted and the new item starts the next one.
//! An item that overflows on its own is still sent, alone.

use crate::prompts::{Message, Prompts, QueryKind};
use crate::tokens::TokenCounter;
use serde::Serialize;
use tracing::debug;

/// Something that can be sent in a classification batch.
pub trait QueryItem: Serialize + Clone {
    /// Smaller rendering used for an item that starts a new batch after an
    /// overflow. Defaults to the item itself.
    fn compacted(&self) -> Self {
        self.clone()
    }
}

impl QueryItem for String {}

/// Items bundled for one classification call, with their rendered messages.
#[derive(Debug, Clone)]
pub struct Batch<T> {
    pub items: Vec<T>,
    pub messages: Vec<Message>,
    pub token_count: usize,
}

impl<T> Batch<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Packs items for a query kind.
pub struct Batcher<'a> {
    prompts: &'a Prompts,
    counter: &'a dyn TokenCounter,
}

impl<'a> Batcher<'a> {
    pub fn new(prompts: &'a Prompts, counter: &'a dyn TokenCounter) -> Self {
        Self { prompts, counter }
    }

    /// Total tokens across all message contents.
    pub fn count_messages(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| self.counter.count(&m.content)).sum()
    }

    fn seal<T: QueryItem>(&self, kind: QueryKind, items: Vec<T>) -> Result<Batch<T>, serde_json::Error> {
        let messages = self.prompts.render(kind, &items)?;
        let token_count = self.count_messages(&messages);
        Ok(Batch {
            items,
            messages,
            token_count,
        })
    }

    /// Pack `items` under a single budget, preserving their order.
    pub fn pack<T: QueryItem>(
        &self,
        kind: QueryKind,
        items: &[T],
        budget: usize,
    ) -> Result<Vec<Batch<T>>, serde_json::Error> {
        let mut batches = Vec::new();
        let mut current: Vec<T> = Vec::new();

        for item in items {
            current.push(item.clone());
            let tokens = self.count_messages(&self.prompts.render(kind, &current)?);
            if tokens <= budget {
                continue;
            }

            current.pop();
            if !current.is_empty() {
                batches.push(self.seal(kind, std::mem::take(&mut current))?);
            }
            current.push(item.compacted());
        }

        if !current.is_empty() {
            batches.push(self.seal(kind, current)?);
        }
        Ok(batches)
    }

    /// Pack under each budget tier in turn, stopping at the first tier that
    /// yields a non-empty batch. Returns no batches if none does.
    pub fn plan<T: QueryItem>(
        &self,
        kind: QueryKind,
        items: &[T],
        tiers: &[usize],
    ) -> Result<Vec<Batch<T>>, serde_json::Error> {
        for (i, &budget) in tiers.iter().enumerate() {
            let batches = self.pack(kind, items, budget)?;
            if batches.iter().any(|b| !b.is_empty()) {
                debug!(kind = %kind, budget, batches = batches.len(), "Planned batches");
                return Ok(batches);
            }
            if let Some(next) = tiers.get(i + 1) {
                debug!(kind = %kind, budget = next, "Retrying with next budget tier");
            }
        }
        Ok(Vec::new())
    }
}
