//! The classification pipeline.
//!
//! ```text
//! tasks ─► code/non-code filter ─► enrichment ─► windows ─► candidates
//!                                                               │
//!          correlated tasks ◄── restoration ◄── commit links ◄──┘
//! ```
//!
//! Each stage builds a new collection. Classifier failures are downgraded
//! to "no answer" with a warning so a run always produces output; malformed
//! code/non-code answers and window extraction failures abort it.

use crate::batch::{Batcher, QueryItem};
use crate::cache::ReplayCache;
use crate::classifier::Classifier;
use crate::config::BatchingConfig;
use crate::correlate::{CommitLinkItem, correlate_cached};
use crate::error::{PipelineError, Result};
use crate::prompts::{Prompts, QueryKind};
use crate::reconcile::{
    filter_code_tasks, merge_correlation, merge_enrichment, restore_correlation,
    restore_enrichment, to_double_quotes, to_single_quotes,
};
use crate::response;
use crate::tokens::TokenCounter;
use crate::types::{Commit, CorrelatedTask, EnrichedTask, Task};
use crate::window::{WindowParams, extract_windows};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{info, warn};

/// Artifact stem of the code/non-code answers.
pub const TASK_TYPE_STEM: &str = "task_type";
/// Artifact stem of the enrichment answers.
pub const ENRICHMENT_STEM: &str = "detailed_task_type";

/// Artifact stem of the commit-link answers for the `index`-th candidate.
pub fn commit_links_stem(index: usize) -> String {
    format!("task_{index}")
}

pub struct Pipeline<'a> {
    classifier: &'a dyn Classifier,
    counter: &'a dyn TokenCounter,
    prompts: &'a Prompts,
    cache: ReplayCache,
    batching: BatchingConfig,
    windows: WindowParams,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        classifier: &'a dyn Classifier,
        counter: &'a dyn TokenCounter,
        prompts: &'a Prompts,
        cache: ReplayCache,
    ) -> Self {
        Self {
            classifier,
            counter,
            prompts,
            cache,
            batching: BatchingConfig::default(),
            windows: WindowParams::default(),
        }
    }

    pub fn with_batching(mut self, batching: BatchingConfig) -> Self {
        self.batching = batching;
        self
    }

    pub fn with_windows(mut self, windows: WindowParams) -> Self {
        self.windows = windows;
        self
    }

    /// Batch, classify and parse `items`. A failed classification yields no
    /// answers.
    fn query<T: QueryItem>(&self, kind: QueryKind, stem: &str, items: &[T]) -> Result<Vec<Value>> {
        let batches = Batcher::new(self.prompts, self.counter)
            .plan(kind, items, &kind.budget_tiers(&self.batching))
            .map_err(PipelineError::Render)?;
        if batches.is_empty() {
            return Ok(Vec::new());
        }

        match self.cache.run(stem, &batches, self.classifier) {
            Ok(answers) => Ok(answers),
            Err(e) => {
                warn!(kind = %kind, stem, "Classification failed, continuing without answers: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Keep the tasks the classifier labels code-related.
    pub fn code_tasks(&self, tasks: Vec<Task>) -> Result<Vec<Task>> {
        let titles: Vec<String> = tasks.iter().map(|t| to_double_quotes(&t.title)).collect();
        let answers = self.query(QueryKind::TaskType, TASK_TYPE_STEM, &titles)?;

        let mut labels = Vec::new();
        for answer in &answers {
            labels.extend(response::task_types(answer)?);
        }

        let total = tasks.len();
        let kept = filter_code_tasks(tasks, &labels);
        info!(total, code_related = kept.len(), "Filtered code-related tasks");
        Ok(kept)
    }

    /// Attach categories and focus areas. Every input task comes back.
    pub fn enrich(&self, tasks: &[Task]) -> Result<Vec<EnrichedTask>> {
        let mut seen = HashSet::new();
        let titles: Vec<String> = tasks
            .iter()
            .map(|t| to_single_quotes(&t.title))
            .filter(|title| seen.insert(title.clone()))
            .collect();
        let answers = self.query(QueryKind::Enrichment, ENRICHMENT_STEM, &titles)?;

        let entries: Vec<_> = answers.iter().flat_map(response::enrichments).collect();
        let merged = merge_enrichment(tasks, &entries);
        let classified = merged.len();
        let enriched = restore_enrichment(tasks, merged);
        info!(tasks = enriched.len(), classified, "Enriched tasks");
        Ok(enriched)
    }

    /// Link tasks to the commits that implement them. Every input task comes
    /// back, with an empty commit list when nothing was confirmed.
    pub fn correlate_with_commits(
        &self,
        enriched: &[EnrichedTask],
        commits: &[Commit],
    ) -> Result<Vec<CorrelatedTask>> {
        let tasks: Vec<Task> = enriched.iter().map(|e| e.task.clone()).collect();
        let specs = extract_windows(&tasks, &self.windows)?;
        let candidates = correlate_cached(&self.cache, &specs, commits)?;

        let mut links = Vec::new();
        for (index, candidate) in candidates.iter().enumerate() {
            let item = CommitLinkItem::from_candidates(candidate, self.windows.keyword_limit);
            let answers = self.query(QueryKind::CommitLinks, &commit_links_stem(index), &[item])?;
            links.extend(answers.iter().flat_map(response::commit_links));
        }

        let merged = merge_correlation(&candidates, &links, enriched);
        let linked = merged.len();
        let correlated = restore_correlation(enriched, merged);
        info!(
            tasks = correlated.len(),
            candidates = candidates.len(),
            linked,
            "Correlated tasks with commits"
        );
        Ok(correlated)
    }

    /// All stages, source tasks to correlated tasks.
    pub fn run(&self, tasks: Vec<Task>, commits: &[Commit]) -> Result<Vec<CorrelatedTask>> {
        let code = self.code_tasks(tasks)?;
        let enriched = self.enrich(&code)?;
        self.correlate_with_commits(&enriched, commits)
    }
}
