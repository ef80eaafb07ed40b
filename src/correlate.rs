//! Commit correlation.
//!
//! Gates every commit by each task's windows and keeps the tasks that end up
//! with at least one candidate. The result is stored as a single artifact
//! keyed by a hash of its inputs.

use crate::batch::QueryItem;
use crate::cache::{ReplayCache, sha256_hex};
use crate::error::CacheError;
use crate::keywords;
use crate::types::{Commit, FileChange, TaskCandidates, WindowSpec};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Artifact name of the stored candidate sets.
pub const CANDIDATES_ARTIFACT: &str = "add_commits_to_tasks.json";

/// Commits that fall in any of a task's windows, for every task that has
/// at least one.
pub fn correlate(specs: &[WindowSpec], commits: &[Commit]) -> Vec<TaskCandidates> {
    specs
        .iter()
        .filter_map(|spec| {
            let matched: Vec<Commit> = commits
                .iter()
                .filter(|commit| spec.date_ranges.iter().any(|r| r.contains(commit.created_at)))
                .cloned()
                .collect();
            if matched.is_empty() {
                return None;
            }
            Some(TaskCandidates {
                id: spec.id.clone(),
                title: spec.title.clone(),
                keywords: spec.keywords.clone(),
                commits: matched,
            })
        })
        .collect()
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    input_hash: String,
    tasks: Vec<TaskCandidates>,
}

fn input_hash(specs: &[WindowSpec], commits: &[Commit]) -> String {
    let rendered = serde_json::to_vec(&(specs, commits)).unwrap_or_default();
    sha256_hex(&rendered)
}

/// [`correlate`], reusing the stored result when its inputs are unchanged.
pub fn correlate_cached(
    cache: &ReplayCache,
    specs: &[WindowSpec],
    commits: &[Commit],
) -> Result<Vec<TaskCandidates>, CacheError> {
    let hash = input_hash(specs, commits);

    if let Some(stored) = cache.load_document(CANDIDATES_ARTIFACT)? {
        match serde_json::from_value::<Envelope>(stored) {
            Ok(envelope) if envelope.input_hash == hash => {
                debug!(tasks = envelope.tasks.len(), "Reusing stored commit candidates");
                return Ok(envelope.tasks);
            }
            Ok(_) => info!("Inputs changed since the stored commit candidates, recomputing"),
            Err(e) => warn!("Ignoring unreadable commit candidates: {}", e),
        }
    }

    let tasks = correlate(specs, commits);
    let envelope = Envelope {
        input_hash: hash,
        tasks,
    };
    let value = serde_json::to_value(&envelope).map_err(|source| CacheError::Corrupt {
        path: cache.dir().join(CANDIDATES_ARTIFACT),
        source,
    })?;
    cache.store_document(CANDIDATES_ARTIFACT, &value)?;
    info!(tasks = envelope.tasks.len(), "Correlated tasks with commits");
    Ok(envelope.tasks)
}

/// A file change as sent to the classifier: full, or compacted to one string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileEntry {
    Full(FileChange),
    Compact(String),
}

/// A candidate commit as sent to the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitView {
    #[serde(rename = "commitId")]
    pub id: String,
    /// Keyword summary of the commit message.
    pub message: String,
    pub files: Vec<FileEntry>,
}

/// One task with its candidate commits, as sent to the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitLinkItem {
    pub keywords: String,
    pub title: String,
    pub commits: Vec<CommitView>,
}

impl CommitLinkItem {
    pub fn from_candidates(candidates: &TaskCandidates, keyword_limit: usize) -> Self {
        Self {
            keywords: candidates.keywords.clone(),
            title: candidates.title.clone(),
            commits: candidates
                .commits
                .iter()
                .map(|commit| CommitView {
                    id: commit.id.clone(),
                    message: keywords::summarize(&commit.message, keyword_limit),
                    files: commit.files.iter().cloned().map(FileEntry::Full).collect(),
                })
                .collect(),
        }
    }
}

impl QueryItem for CommitLinkItem {
    fn compacted(&self) -> Self {
        let mut item = self.clone();
        for commit in &mut item.commits {
            for file in &mut commit.files {
                if let FileEntry::Full(change) = file {
                    *file = FileEntry::Compact(change.compact());
                }
            }
        }
        item
    }
}
