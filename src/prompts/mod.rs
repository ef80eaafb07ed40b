//! Classification prompts.
//!
//! Each query kind has a system prompt and a user template. Templates are
//! markdown files containing an `{items}` placeholder, which is replaced by
//! the batch items rendered as pretty JSON.
//!
//! Templates are loaded from layered directories (user overrides project
//! overrides defaults):
//! 1. ~/.task-insight/prompts/
//! 2. task-insight/prompts/
//! 3. defaults/prompts/, embedded at compile time
//!
//! Rendered messages are part of each cache artifact's hash, so editing a
//! template invalidates the artifacts it produced.

use crate::config::{BatchingConfig, ConfigPaths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Default templates embedded at compile time.
pub mod defaults {
    pub const TASK_TYPE: &str = include_str!("../../defaults/prompts/task_type.md");
    pub const ENRICHMENT: &str = include_str!("../../defaults/prompts/enrichment.md");
    pub const COMMIT_LINKS: &str = include_str!("../../defaults/prompts/commit_links.md");
}

/// Placeholder replaced by the rendered items.
pub const ITEMS_PLACEHOLDER: &str = "{items}";

/// Label of tasks that need code commits.
pub const CODE_RELATED: &str = "Code-Related";

/// Categories an enrichment entry may use.
pub const CATEGORIES: [&str; 7] = [
    "Bug Fixes",
    "Testing & Code Review",
    "Optimization",
    "Feature",
    "Code Refactoring",
    "Dependencies",
    "Documentation & General",
];

/// Focus areas an enrichment entry may use.
pub const FOCUS_AREAS: [&str; 7] = [
    "Frontend",
    "Backend",
    "DevOps & Cloud",
    "Database",
    "Security",
    "AI",
    "Embedded",
];

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A role-tagged chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// The three classification queries of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// Code-related vs. non-code-related, keyed by title.
    TaskType,
    /// Categories and focus areas, keyed by title.
    Enrichment,
    /// Which candidate commits belong to a task.
    CommitLinks,
}

impl QueryKind {
    pub const ALL: [QueryKind; 3] = [
        QueryKind::TaskType,
        QueryKind::Enrichment,
        QueryKind::CommitLinks,
    ];

    /// Template file name, without extension.
    pub fn name(self) -> &'static str {
        match self {
            QueryKind::TaskType => "task_type",
            QueryKind::Enrichment => "enrichment",
            QueryKind::CommitLinks => "commit_links",
        }
    }

    fn default_system(self) -> &'static str {
        match self {
            QueryKind::TaskType | QueryKind::Enrichment => {
                "You are an all-knowing product owner. Your goal is to accurately categorize task titles related to software development."
            }
            QueryKind::CommitLinks => {
                "You are an all-knowing developer. Your goal is to accurately determine if commits belong to a specific task."
            }
        }
    }

    fn default_template(self) -> &'static str {
        match self {
            QueryKind::TaskType => defaults::TASK_TYPE,
            QueryKind::Enrichment => defaults::ENRICHMENT,
            QueryKind::CommitLinks => defaults::COMMIT_LINKS,
        }
    }

    /// Budget tiers tried in order. Classification of bare titles starts
    /// with a small budget so that many short batches are sent; commit
    /// links only ever use the nominal budget.
    pub fn budget_tiers(self, batching: &BatchingConfig) -> Vec<usize> {
        match self {
            QueryKind::TaskType => vec![batching.task_type_budget, batching.max_tokens],
            QueryKind::Enrichment => vec![batching.enrichment_budget, batching.max_tokens],
            QueryKind::CommitLinks => vec![batching.max_tokens],
        }
    }
}

impl std::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
struct PromptPair {
    system: String,
    template: String,
}

/// System prompts and user templates for every query kind.
#[derive(Debug, Clone)]
pub struct Prompts {
    task_type: PromptPair,
    enrichment: PromptPair,
    commit_links: PromptPair,
}

impl Default for Prompts {
    fn default() -> Self {
        let pair = |kind: QueryKind| PromptPair {
            system: kind.default_system().to_string(),
            template: kind.default_template().to_string(),
        };
        Self {
            task_type: pair(QueryKind::TaskType),
            enrichment: pair(QueryKind::Enrichment),
            commit_links: pair(QueryKind::CommitLinks),
        }
    }
}

impl Prompts {
    /// Load templates, letting `prompts/{kind}.md` in the user or project
    /// directory override the embedded default.
    pub fn load(paths: &ConfigPaths) -> Self {
        let mut prompts = Self::default();
        for kind in QueryKind::ALL {
            let found = [paths.user_dir.as_deref(), paths.project_dir.as_deref()]
                .into_iter()
                .flatten()
                .find_map(|dir| read_override(dir, kind));
            if let Some(template) = found {
                prompts.pair_mut(kind).template = template;
            }
        }
        prompts
    }

    /// Replace one kind's prompts.
    pub fn with_template(
        mut self,
        kind: QueryKind,
        system: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        *self.pair_mut(kind) = PromptPair {
            system: system.into(),
            template: template.into(),
        };
        self
    }

    fn pair(&self, kind: QueryKind) -> &PromptPair {
        match kind {
            QueryKind::TaskType => &self.task_type,
            QueryKind::Enrichment => &self.enrichment,
            QueryKind::CommitLinks => &self.commit_links,
        }
    }

    fn pair_mut(&mut self, kind: QueryKind) -> &mut PromptPair {
        match kind {
            QueryKind::TaskType => &mut self.task_type,
            QueryKind::Enrichment => &mut self.enrichment,
            QueryKind::CommitLinks => &mut self.commit_links,
        }
    }

    /// Render `items` into the messages of one classification call. An
    /// empty system prompt is left out.
    pub fn render<T: Serialize>(
        &self,
        kind: QueryKind,
        items: &[T],
    ) -> Result<Vec<Message>, serde_json::Error> {
        let pair = self.pair(kind);
        let rendered = serde_json::to_string_pretty(items)?;
        let user = pair.template.replace(ITEMS_PLACEHOLDER, &rendered);

        let mut messages = Vec::with_capacity(2);
        if !pair.system.is_empty() {
            messages.push(Message::system(pair.system.clone()));
        }
        messages.push(Message::user(user));
        Ok(messages)
    }
}

fn read_override(dir: &Path, kind: QueryKind) -> Option<String> {
    let path = dir.join("prompts").join(format!("{}.md", kind.name()));
    let content = std::fs::read_to_string(&path).ok()?;
    debug!(kind = %kind, path = %path.display(), "Using prompt override");
    Some(content)
}
