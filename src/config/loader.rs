//! Configuration loader with tier-based merging.

use super::merge::deep_merge_all;
use super::types::Config;
use anyhow::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "TASK_INSIGHT_CONFIG_PATH";

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    Defaults = 0,
    /// `$CWD/task-insight/config.yaml`
    Project = 1,
    /// `~/.task-insight/config.yaml`
    User = 2,
    Environment = 3,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::Project => write!(f, "project"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::Environment => write!(f, "environment"),
        }
    }
}

/// Directories searched for `config.yaml`.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub project_dir: Option<PathBuf>,
    pub user_dir: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover configuration directories from the environment.
    pub fn discover() -> Self {
        let user_dir = std::env::var("TASK_INSIGHT_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".task-insight")));

        let project_dir = std::env::var("TASK_INSIGHT_PROJECT_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from("task-insight")));

        Self {
            project_dir,
            user_dir,
        }
    }

    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
        }
    }
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover()
    }
}

/// Loads configuration from all tiers.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub paths: ConfigPaths,
    config: Config,
    /// Files that contributed to the configuration, with their tier.
    sources: Vec<(ConfigTier, PathBuf)>,
}

impl ConfigLoader {
    /// Load using discovered paths. An explicit file (argument or
    /// `TASK_INSIGHT_CONFIG_PATH`) replaces the file tiers entirely.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from));

        match explicit {
            Some(path) => {
                let mut config = Config::load(&path)?;
                Self::apply_env_overrides(&mut config);
                Ok(Self {
                    paths: ConfigPaths::discover(),
                    config,
                    sources: vec![(ConfigTier::Project, path)],
                })
            }
            None => Self::load_with_paths(ConfigPaths::discover()),
        }
    }

    /// Load with explicit tier directories.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        let mut tiers: Vec<Value> = vec![serde_json::to_value(Config::default())?];
        let mut sources = Vec::new();

        for (tier, dir) in [
            (ConfigTier::Project, paths.project_dir.as_deref()),
            (ConfigTier::User, paths.user_dir.as_deref()),
        ] {
            let Some(dir) = dir else { continue };
            let file = dir.join("config.yaml");
            if let Some(value) = read_yaml_tier(&file) {
                debug!(tier = %tier, path = %file.display(), "Loaded config tier");
                tiers.push(value);
                sources.push((tier, file));
            }
        }

        let mut config: Config = serde_json::from_value(deep_merge_all(tiers))?;
        Self::apply_env_overrides(&mut config);

        Ok(Self {
            paths,
            config,
            sources,
        })
    }

    fn apply_env_overrides(config: &mut Config) {
        if let Ok(path) = std::env::var("TASK_INSIGHT_TASKS_PATH") {
            config.sources.tasks_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("TASK_INSIGHT_COMMITS_PATH") {
            config.sources.commits_path = PathBuf::from(path);
        }
        if let Ok(model) = std::env::var("TASK_INSIGHT_MODEL") {
            config.llm.model = model;
        }
        if let Ok(base) = std::env::var("TASK_INSIGHT_API_BASE") {
            config.llm.api_base = base;
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    /// Files that contributed, lowest tier first.
    pub fn sources(&self) -> &[(ConfigTier, PathBuf)] {
        &self.sources
    }
}

/// Read one YAML tier. Missing files are skipped silently, unreadable ones
/// with a warning.
fn read_yaml_tier(path: &Path) -> Option<Value> {
    if !path.exists() {
        return None;
    }
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Skipping unreadable config {}: {}", path.display(), e);
            return None;
        }
    };
    match serde_yaml::from_str::<Value>(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Skipping invalid config {}: {}", path.display(), e);
            None
        }
    }
}
