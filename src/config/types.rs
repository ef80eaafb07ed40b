//! Configuration types and structures.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub profiles: ProfilesConfig,

    #[serde(default)]
    pub windows: WindowsConfig,

    #[serde(default)]
    pub batching: BatchingConfig,

    #[serde(default)]
    pub llm: LlmConfig,
}

impl Config {
    /// Load configuration from a single YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Resolve a profile by name, falling back to the default profile.
    pub fn profile(&self, name: Option<&str>) -> Result<&Profile> {
        let name = name
            .or(self.profiles.default_profile.as_deref())
            .ok_or_else(|| anyhow!("No profile given and no default_profile configured"))?;
        self.profiles
            .entries
            .get(name)
            .ok_or_else(|| anyhow!("No details found for profile: {}", name))
    }

    /// Batch budgets with every tier capped at the classifier's input limit,
    /// so no batch is planned that the classifier would refuse unsent.
    pub fn effective_batching(&self) -> BatchingConfig {
        let limit = self.llm.max_input_tokens();
        BatchingConfig {
            max_tokens: self.batching.max_tokens.min(limit),
            task_type_budget: self.batching.task_type_budget.min(limit),
            enrichment_budget: self.batching.enrichment_budget.min(limit),
        }
    }
}

/// Locations of the input documents and the pipeline output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// JSON array of task documents.
    #[serde(default = "default_tasks_path")]
    pub tasks_path: PathBuf,

    /// JSON array of commit documents.
    #[serde(default = "default_commits_path")]
    pub commits_path: PathBuf,

    /// File name of the correlated output, relative to the profile's cache dir.
    #[serde(default = "default_output_file")]
    pub output_file: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            tasks_path: default_tasks_path(),
            commits_path: default_commits_path(),
            output_file: default_output_file(),
        }
    }
}

fn default_tasks_path() -> PathBuf {
    PathBuf::from("data/tasks.json")
}

fn default_commits_path() -> PathBuf {
    PathBuf::from("data/commits.json")
}

fn default_output_file() -> String {
    "correlated_tasks.json".to_string()
}

/// A person (or whole organization, when ids are empty) to run the pipeline for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    /// Assignee id used to filter tasks. Empty means all tasks.
    #[serde(default)]
    pub assignee_id: String,

    /// Commit author used to filter commits. Empty means all commits.
    #[serde(default)]
    pub git_author: String,

    /// Directory holding this profile's cache artifacts and output.
    pub cache_dir: PathBuf,
}

/// Named run profiles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilesConfig {
    #[serde(default)]
    pub default_profile: Option<String>,

    #[serde(default)]
    pub entries: BTreeMap<String, Profile>,

    /// Only process the first N tasks of the source.
    #[serde(default)]
    pub task_limit: Option<usize>,
}

/// Correlation window widths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowsConfig {
    /// Hours before an event during which commits may belong to it.
    #[serde(default = "default_lead_hours")]
    pub lead_hours: i64,

    /// Hours after an event during which commits may belong to it.
    #[serde(default = "default_trail_hours")]
    pub trail_hours: i64,

    /// Keywords kept in a task summary.
    #[serde(default = "default_keyword_limit")]
    pub keyword_limit: usize,
}

impl Default for WindowsConfig {
    fn default() -> Self {
        Self {
            lead_hours: default_lead_hours(),
            trail_hours: default_trail_hours(),
            keyword_limit: default_keyword_limit(),
        }
    }
}

fn default_lead_hours() -> i64 {
    24
}

fn default_trail_hours() -> i64 {
    3
}

fn default_keyword_limit() -> usize {
    crate::keywords::DEFAULT_KEYWORD_LIMIT
}

/// Token budgets for classification batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchingConfig {
    /// Nominal budget, the last tier for every query kind.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// First-tier budget for code/non-code classification.
    #[serde(default = "default_task_type_budget")]
    pub task_type_budget: usize,

    /// First-tier budget for category/focus-area enrichment.
    #[serde(default = "default_enrichment_budget")]
    pub enrichment_budget: usize,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            task_type_budget: default_task_type_budget(),
            enrichment_budget: default_enrichment_budget(),
        }
    }
}

fn default_max_tokens() -> usize {
    8192
}

fn default_task_type_budget() -> usize {
    700
}

fn default_enrichment_budget() -> usize {
    600
}

/// Chat-completions endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_max_response_tokens")]
    pub max_response_tokens: usize,

    #[serde(default = "default_context_window")]
    pub context_window: usize,

    #[serde(default)]
    pub temperature: f64,

    /// Global timeout for one classification request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            max_response_tokens: default_max_response_tokens(),
            context_window: default_context_window(),
            temperature: 0.0,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    /// Tokens left for the prompt once the response is reserved.
    pub fn max_input_tokens(&self) -> usize {
        self.context_window.saturating_sub(self.max_response_tokens)
    }
}

fn default_api_base() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_model() -> String {
    "llama3-70b-8192".to_string()
}

fn default_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

fn default_max_response_tokens() -> usize {
    2048
}

fn default_context_window() -> usize {
    8192
}

fn default_timeout_secs() -> u64 {
    120
}
