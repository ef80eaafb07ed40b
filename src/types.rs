//! Core record types for the task/commit correlation pipeline.
//!
//! Source documents use the camelCase field names of the project-management
//! export (`_id`, `createdAt`, `statusEdits`, ...). Enrichment fields added by
//! the pipeline (`categories`, `focus_areas`, `commits`) keep the names the
//! downstream effort dataset expects.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Timestamps are always UTC.
pub type Timestamp = DateTime<Utc>;

/// The fixed task lifecycle, in order.
pub const LIFECYCLE: [&str; 5] = [
    "Backlog",
    "Sprint Planning",
    "In Progress",
    "Delivered",
    "Accepted",
];

/// Terminal lifecycle stage.
pub const ACCEPTED: &str = "Accepted";

/// Position of a status in the lifecycle, or `None` for statuses outside it
/// (e.g. "Archived").
pub fn lifecycle_index(status: &str) -> Option<usize> {
    LIFECYCLE.iter().position(|stage| *stage == status)
}

/// A single status transition recorded on a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEdit {
    #[serde(default)]
    pub from: Option<String>,
    pub to: String,
    pub created_at: Timestamp,
}

/// A change of points (estimated or burned) recorded on a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsEdit {
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_points: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_points: Option<f64>,
}

/// A task comment. Only the body takes part in keyword extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Point totals of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Points {
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub done: f64,
}

/// A project-management task as read from the task source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub created_at: Timestamp,
    #[serde(default)]
    pub status_edits: Vec<StatusEdit>,
    #[serde(default)]
    pub points_burned_edits: Vec<PointsEdit>,
    #[serde(default)]
    pub points_estimated_edits: Vec<PointsEdit>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub assignees: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Points>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

impl Task {
    /// Bodies of all comments that have one, joined by single spaces.
    pub fn comments_text(&self) -> String {
        self.comments
            .iter()
            .filter_map(|c| c.body.as_deref())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A file touched by a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub filename: String,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
}

impl FileChange {
    /// Compact `+adds -dels filename` form used when a prompt overflows.
    pub fn compact(&self) -> String {
        format!("+{} -{} {}", self.additions, self.deletions, self.filename)
    }
}

/// A source-control commit. Commits are never mutated, only copied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub author: String,
    pub created_at: Timestamp,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub files: Vec<FileChange>,
}

/// Closed time interval `[start, end]` with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: Timestamp,
    end: Timestamp,
}

impl DateRange {
    /// Build a range; the bounds are swapped if given out of order.
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Widen an event timestamp to `[event - lead, event + trail]`.
    pub fn around(event: Timestamp, lead: Duration, trail: Duration) -> Self {
        Self::new(event - lead, event + trail)
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    /// Inclusive containment check.
    pub fn contains(&self, ts: Timestamp) -> bool {
        self.start <= ts && ts <= self.end
    }
}

/// Per-task correlation window produced by the extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub id: String,
    pub title: String,
    pub date_ranges: Vec<DateRange>,
    pub keywords: String,
}

/// A task together with the commits that fell inside its windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCandidates {
    pub id: String,
    pub title: String,
    pub keywords: String,
    pub commits: Vec<Commit>,
}

/// A task after the enrichment stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedTask {
    #[serde(flatten)]
    pub task: Task,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub focus_areas: Vec<String>,
}

impl EnrichedTask {
    /// A task the classifier never categorized.
    pub fn unclassified(task: Task) -> Self {
        Self {
            task,
            categories: Vec::new(),
            focus_areas: Vec::new(),
        }
    }
}

/// A task after commit correlation: the final pipeline record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedTask {
    #[serde(flatten)]
    pub enriched: EnrichedTask,
    #[serde(default)]
    pub commits: Vec<Commit>,
}

impl CorrelatedTask {
    /// A task with no confirmed commits.
    pub fn unlinked(enriched: EnrichedTask) -> Self {
        Self {
            enriched,
            commits: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.enriched.task.id
    }

    pub fn title(&self) -> &str {
        &self.enriched.task.title
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(hour: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_lifecycle_index() {
        assert_eq!(lifecycle_index("Backlog"), Some(0));
        assert_eq!(lifecycle_index("Accepted"), Some(4));
        assert_eq!(lifecycle_index("Archived"), None);
    }

    #[test]
    fn test_date_range_orders_bounds() {
        let range = DateRange::new(ts(10), ts(2));
        assert_eq!(range.start(), ts(2));
        assert_eq!(range.end(), ts(10));
        assert!(range.contains(ts(2)));
        assert!(range.contains(ts(10)));
        assert!(!range.contains(ts(11)));
    }

    #[test]
    fn test_task_deserializes_source_format() {
        let json = r#"{
            "_id": "t1",
            "title": "Fix login",
            "body": "Users cannot log in",
            "createdAt": "2024-03-01T09:00:00.000Z",
            "statusEdits": [
                {"from": "Backlog", "to": "In Progress", "createdAt": "2024-03-01T10:00:00.000Z"}
            ],
            "comments": [{"body": "on it"}, {}],
            "points": {"total": 2, "done": 1.5}
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.id, "t1");
        assert_eq!(task.status_edits.len(), 1);
        assert_eq!(task.status_edits[0].created_at, ts(10));
        assert_eq!(task.comments_text(), "on it");
        assert_eq!(task.points.unwrap().done, 1.5);
    }

    #[test]
    fn test_correlated_task_flattens_fields() {
        let task: Task = serde_json::from_str(
            r#"{"_id": "t1", "title": "x", "createdAt": "2024-03-01T09:00:00Z"}"#,
        )
        .unwrap();
        let record = CorrelatedTask::unlinked(EnrichedTask::unclassified(task));
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["_id"], "t1");
        assert_eq!(value["categories"], serde_json::json!([]));
        assert_eq!(value["focus_areas"], serde_json::json!([]));
        assert_eq!(value["commits"], serde_json::json!([]));

        let back: CorrelatedTask = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_file_change_compact_form() {
        let file = FileChange {
            filename: "src/lib.rs".into(),
            additions: 12,
            deletions: 3,
        };
        assert_eq!(file.compact(), "+12 -3 src/lib.rs");
    }
}
