//! Output formatting utilities for markdown and JSON.

use crate::distribute::AssigneeLoad;
use crate::types::{CorrelatedTask, WindowSpec};
use clap::ValueEnum;
use serde::Serialize;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Output format for printed results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    #[value(alias = "md")]
    Markdown,
}

/// Render records as pretty JSON.
pub fn to_json<T: Serialize>(records: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(records)
}

/// Format a task's correlation windows as markdown.
pub fn format_window_markdown(spec: &WindowSpec) -> String {
    let mut md = String::new();

    md.push_str(&format!("## Task: {}\n", spec.title));
    md.push_str(&format!("- **id**: `{}`\n", spec.id));
    if !spec.keywords.is_empty() {
        md.push_str(&format!("- **keywords**: {}\n", spec.keywords));
    }

    if spec.date_ranges.is_empty() {
        md.push_str("- **windows**: none\n");
    } else {
        md.push_str("- **windows**:\n");
        for range in &spec.date_ranges {
            md.push_str(&format!(
                "  - {} → {}\n",
                range.start().format(TIME_FORMAT),
                range.end().format(TIME_FORMAT)
            ));
        }
    }

    md
}

/// Format all windows as markdown.
pub fn format_windows_markdown(specs: &[WindowSpec]) -> String {
    let mut md = format!("# Windows ({})\n\n", specs.len());
    for spec in specs {
        md.push_str(&format_window_markdown(spec));
        md.push('\n');
    }
    md
}

/// Format correlated tasks as markdown.
pub fn format_correlated_markdown(records: &[CorrelatedTask]) -> String {
    let mut md = format!("# Correlated tasks ({})\n\n", records.len());

    for record in records {
        md.push_str(&format!("## Task: {}\n", record.title()));
        md.push_str(&format!("- **id**: `{}`\n", record.id()));
        if !record.enriched.categories.is_empty() {
            md.push_str(&format!(
                "- **categories**: {}\n",
                record.enriched.categories.join(", ")
            ));
        }
        if !record.enriched.focus_areas.is_empty() {
            md.push_str(&format!(
                "- **focus areas**: {}\n",
                record.enriched.focus_areas.join(", ")
            ));
        }
        for commit in &record.commits {
            let summary = commit.message.lines().next().unwrap_or_default();
            md.push_str(&format!("- commit `{}`: {}\n", commit.id, summary));
        }
        md.push('\n');
    }

    md
}

/// Format a workload distribution as markdown.
pub fn format_distribution_markdown(loads: &[AssigneeLoad]) -> String {
    let mut md = String::from("# Distribution\n\n");

    for load in loads {
        md.push_str(&format!(
            "## {} ({} tasks, {:.2}h)\n",
            load.assignee,
            load.tasks.len(),
            load.hours
        ));
        for task in &load.tasks {
            md.push_str(&format!(
                "- `{}` {} (class {})\n",
                task.task_id,
                task.title,
                u8::from(task.predicted_class)
            ));
        }
        md.push('\n');
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Commit, DateRange, EnrichedTask, Task};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_window_markdown() {
        let spec = WindowSpec {
            id: "t1".into(),
            title: "Add export".into(),
            date_ranges: vec![DateRange::new(
                Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 2, 12, 30, 0).unwrap(),
            )],
            keywords: "export csv".into(),
        };
        let md = format_window_markdown(&spec);
        assert!(md.starts_with("## Task: Add export\n"));
        assert!(md.contains("- **keywords**: export csv\n"));
        assert!(md.contains("  - 2024-01-01 09:00 → 2024-01-02 12:30\n"));
    }

    #[test]
    fn test_correlated_markdown() {
        let task: Task = serde_json::from_value(serde_json::json!({
            "_id": "t1",
            "title": "Add export",
            "createdAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        let commit = Commit {
            id: "c1".into(),
            author: "dev".into(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            message: "Add CSV export\n\nLonger body".into(),
            files: vec![],
        };
        let linked = CorrelatedTask {
            enriched: EnrichedTask {
                task: task.clone(),
                categories: vec!["Feature".into()],
                focus_areas: vec!["Backend".into()],
            },
            commits: vec![commit],
        };
        let unlinked = CorrelatedTask::unlinked(EnrichedTask::unclassified(task));

        let md = format_correlated_markdown(&[linked, unlinked]);
        assert!(md.starts_with("# Correlated tasks (2)\n"));
        assert!(md.contains("- **categories**: Feature\n"));
        assert!(md.contains("- **focus areas**: Backend\n"));
        assert!(md.contains("- commit `c1`: Add CSV export\n"));
        assert!(!md.contains("Longer body"));
        assert_eq!(md.matches("- commit ").count(), 1);
    }

    #[test]
    fn test_empty_windows() {
        let spec = WindowSpec {
            id: "t1".into(),
            title: "x".into(),
            date_ranges: vec![],
            keywords: String::new(),
        };
        let md = format_windows_markdown(&[spec]);
        assert!(md.starts_with("# Windows (1)\n"));
        assert!(md.contains("- **windows**: none\n"));
        assert!(!md.contains("keywords"));
    }
}
