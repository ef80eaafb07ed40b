//! Configuration system.
//!
//! Configuration is merged field by field from four tiers:
//! 1. **Defaults** - compiled in
//! 2. **Project** - `$CWD/task-insight/config.yaml`
//! 3. **User** - `~/.task-insight/config.yaml`
//! 4. **Environment** - variables below
//!
//! ## Environment Variables
//! - `TASK_INSIGHT_CONFIG_PATH` - Explicit config file (replaces the file tiers)
//! - `TASK_INSIGHT_PROJECT_DIR` / `TASK_INSIGHT_USER_DIR` - Tier directories
//! - `TASK_INSIGHT_TASKS_PATH` / `TASK_INSIGHT_COMMITS_PATH` - Source documents
//! - `TASK_INSIGHT_MODEL` / `TASK_INSIGHT_API_BASE` - Classifier endpoint
//!
//! The API key itself is read from the variable named by `llm.api_key_env`.

mod loader;
mod merge;
mod types;

pub use loader::{CONFIG_PATH_ENV, ConfigLoader, ConfigPaths, ConfigTier};
pub use merge::{deep_merge, deep_merge_all};
pub use types::*;
