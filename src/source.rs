//! Task and commit sources.
//!
//! Both sources are read-only JSON arrays. Tasks can be narrowed to one
//! assignee, commits to one author.

use crate::config::Profile;
use crate::error::SourceError;
use crate::types::{Commit, Task};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{debug, info};

fn read_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, SourceError> {
    let content = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| SourceError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Read all tasks from a JSON array file.
pub fn read_tasks(path: &Path) -> Result<Vec<Task>, SourceError> {
    let tasks: Vec<Task> = read_array(path)?;
    debug!(path = %path.display(), count = tasks.len(), "Read tasks");
    Ok(tasks)
}

/// Read all commits from a JSON array file.
pub fn read_commits(path: &Path) -> Result<Vec<Commit>, SourceError> {
    let commits: Vec<Commit> = read_array(path)?;
    debug!(path = %path.display(), count = commits.len(), "Read commits");
    Ok(commits)
}

/// Tasks assigned to `assignee_id` (all tasks when empty) that have a status
/// history, capped at `limit`.
pub fn select_tasks(tasks: Vec<Task>, assignee_id: &str, limit: Option<usize>) -> Vec<Task> {
    tasks
        .into_iter()
        .filter(|task| assignee_id.is_empty() || task.assignees.iter().any(|a| a == assignee_id))
        .filter(|task| !task.status_edits.is_empty())
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}

/// Commits authored by `author` (all commits when empty).
pub fn select_commits(commits: Vec<Commit>, author: &str) -> Vec<Commit> {
    if author.is_empty() {
        return commits;
    }
    commits.into_iter().filter(|c| c.author == author).collect()
}

/// Load both sources for a profile.
pub fn load_profile_sources(
    tasks_path: &Path,
    commits_path: &Path,
    profile: &Profile,
    limit: Option<usize>,
) -> Result<(Vec<Task>, Vec<Commit>), SourceError> {
    let tasks = select_tasks(read_tasks(tasks_path)?, &profile.assignee_id, limit);
    let commits = select_commits(read_commits(commits_path)?, &profile.git_author);
    info!(
        tasks = tasks.len(),
        commits = commits.len(),
        "Loaded sources"
    );
    Ok((tasks, commits))
}
