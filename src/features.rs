//! Effort dataset derivation.
//!
//! Turns correlated tasks into flat feature records for effort prediction.
//! Field names follow the camelCase convention of the dataset consumers.

use crate::types::{CorrelatedTask, StatusEdit};
use serde::{Deserialize, Serialize};

/// How labels are folded into a small vocabulary. Labels not listed pass
/// through unchanged; labels mapped to [`AMBIGUOUS_LABEL`] are dropped.
pub const LABEL_MAPPINGS: &[(&str, &str)] = &[
    ("bug", "bug"),
    ("invalid", "fix"),
    ("🔨refactor", "refactor"),
    ("↩️ review", "review"),
    ("enhancement", "feature"),
    ("🧹chore", "review"),
    ("💼 internal", "review"),
    ("design", "design"),
    ("feature", "feature"),
    ("java", "feature"),
    ("c#", "feature"),
    ("bitbucket", "feature"),
    ("documentation", "review"),
    ("need_feedback", "communication"),
    ("php", "feature"),
    ("github", "feature"),
    ("🚧 wait others", "communication"),
    ("gitlab", "feature"),
    ("python", "feature"),
    ("azure devops", "feature"),
    ("social media", "todo"),
    ("planning", "review"),
    ("newsletter", "todo"),
    ("duplicate", "refactor"),
    ("internal", "todo"),
    ("website", "todo"),
    ("content creation", "todo"),
    ("js", "feature"),
    ("gitlab-private", "feature"),
    ("testing", "review"),
    ("Backlog", "other"),
    ("Publication", "review"),
    ("Upcoming", "feature"),
    ("Management", "todo"),
    ("Devops", "feature"),
    ("SW", "todo"),
    ("Web", "todo"),
    ("Accepted", "other"),
    ("Under review", "review"),
    ("Submitted", "other"),
    ("HW", "todo"),
    ("Deliverable", "todo"),
    ("Sprint 3", "feature"),
    ("Sprint 4", "feature"),
    ("Sprint", "feature"),
    ("Sprint 2", "feature"),
    ("Sprint 1", "feature"),
    ("Published", "other"),
    ("Design-Print", "design"),
    ("Other", "other"),
    ("version 2.0", "other"),
    ("version 3.0", "other"),
    ("back-end", "other"),
    ("main task", "feature"),
    ("front-end", "other"),
    ("investigation", "review"),
    ("In progress", "other"),
    ("question", "communication"),
    ("exploration", "feature"),
    ("help wanted", "communication"),
    ("test", "review"),
    ("chore", "todo"),
    ("dependency", "fix"),
    ("stream-sim", "feature"),
    ("Document", "review"),
    ("tektrain-api", "todo"),
    ("UI", "other"),
    ("#not-yet", "other"),
    ("urgent", "fix"),
    ("AUTH", "other"),
    ("Delivered", "other"),
    ("usability", "fix"),
    ("paas", "fix"),
    ("New sprint", "feature"),
    ("wontfix", "fix"),
    ("MustFix", "fix"),
    ("Platform", "other"),
    ("null", "other"),
];

pub const AMBIGUOUS_LABEL: &str = "other";

/// Statuses that count towards flow deviations, in order.
const NORMAL_FLOW: [&str; 4] = ["Sprint Planning", "In Progress", "Delivered", "Accepted"];

/// Statuses ignored when counting flow deviations.
const OFF_FLOW: [&str; 2] = ["Backlog", "Archived"];

/// Coarse completion effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum EffortClass {
    Fast = 1,
    Medium = 2,
    Slow = 3,
}

impl EffortClass {
    /// Class of a task that burned `points`.
    pub fn from_points(points: f64) -> Self {
        if points <= 0.5 {
            EffortClass::Fast
        } else if points <= 2.0 {
            EffortClass::Medium
        } else {
            EffortClass::Slow
        }
    }

    /// Hours a task of this class is expected to take.
    pub fn hours(self) -> f64 {
        match self {
            EffortClass::Fast => 0.25,
            EffortClass::Medium => 1.25,
            EffortClass::Slow => 2.5,
        }
    }
}

impl From<EffortClass> for u8 {
    fn from(class: EffortClass) -> Self {
        class as u8
    }
}

impl TryFrom<u8> for EffortClass {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(EffortClass::Fast),
            2 => Ok(EffortClass::Medium),
            3 => Ok(EffortClass::Slow),
            other => Err(format!("effort class must be 1, 2 or 3, got {other}")),
        }
    }
}

/// One row of the effort dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFeatures {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub assignees: Vec<String>,
    #[serde(rename = "categories", default)]
    pub categories: Vec<String>,
    #[serde(rename = "focus_areas", default)]
    pub focus_areas: Vec<String>,
    pub labels: Vec<String>,
    pub number_of_labels: usize,
    pub priority: Option<u8>,
    pub due_date: u8,
    pub expected_points: f64,
    pub burned_points: f64,
    pub points_estimated_number_of_edits: usize,
    pub points_estimated_edits_total_difference: f64,
    pub points_burned_number_of_edits: usize,
    pub number_of_comments: usize,
    pub number_of_commits: usize,
    pub total_additions: u64,
    pub total_deletions: u64,
    pub number_of_files_changed: usize,
    pub commit_messages: String,
    pub status_deviate_from_flow: usize,
    pub class: EffortClass,
}

/// Map raw labels, drop ambiguous ones and duplicates, keep first-seen order.
pub fn align_labels(labels: &[String]) -> Vec<String> {
    let mut aligned: Vec<String> = Vec::new();
    for label in labels {
        let mapped = LABEL_MAPPINGS
            .iter()
            .find(|(raw, _)| raw == label)
            .map_or(label.as_str(), |(_, mapped)| mapped);
        if mapped != AMBIGUOUS_LABEL && !aligned.iter().any(|l| l == mapped) {
            aligned.push(mapped.to_string());
        }
    }
    aligned
}

/// Numeric priority: none 0, low 1, medium 2, high 3.
pub fn priority_rank(priority: Option<&str>) -> Option<u8> {
    match priority? {
        "none" => Some(0),
        "low" => Some(1),
        "medium" => Some(2),
        "high" => Some(3),
        _ => None,
    }
}

/// Round to the nearest half point.
pub fn round_half(points: f64) -> f64 {
    (points * 2.0).round() / 2.0
}

/// Number of backward moves through the normal flow.
///
/// A move counts when it goes back from a stage at or before the furthest
/// stage reached so far. Moves touching Backlog or Archived, and no-op
/// moves, are ignored.
pub fn status_deviations(edits: &[StatusEdit]) -> usize {
    let flow_index = |status: Option<&str>| -> i64 {
        status
            .and_then(|s| NORMAL_FLOW.iter().position(|stage| *stage == s))
            .map_or(-1, |i| i as i64)
    };

    let mut furthest = 0;
    let mut deviations = 0;
    for edit in edits {
        let from = edit.from.as_deref();
        let to = edit.to.as_str();
        let off_flow = from.is_some_and(|f| OFF_FLOW.contains(&f)) || OFF_FLOW.contains(&to);
        if off_flow || from == Some(to) {
            continue;
        }
        let from_index = flow_index(from);
        let to_index = flow_index(Some(to));
        if from_index <= furthest && to_index < from_index {
            deviations += 1;
        }
        furthest = furthest.max(to_index);
    }
    deviations
}

/// Derive the feature row of a correlated task, or `None` for tasks that
/// carry no points at all.
pub fn derive(record: &CorrelatedTask) -> Option<TaskFeatures> {
    let task = &record.enriched.task;
    let points = task.points.unwrap_or_default();
    if points.total == 0.0 && points.done == 0.0 {
        return None;
    }

    let estimated = &task.points_estimated_edits;
    let estimate_drift = match (estimated.first(), estimated.last()) {
        (Some(first), Some(last)) => {
            last.to_points.unwrap_or_default() - first.from_points.unwrap_or_default()
        }
        _ => 0.0,
    };

    let files = record.commits.iter().flat_map(|c| &c.files);
    let burned_points = round_half(points.done);

    Some(TaskFeatures {
        id: task.id.clone(),
        title: task.title.clone(),
        body: task.body.clone().unwrap_or_default(),
        comments: task.comments_text(),
        assignees: task.assignees.clone(),
        categories: record.enriched.categories.clone(),
        focus_areas: record.enriched.focus_areas.clone(),
        labels: align_labels(&task.labels),
        number_of_labels: task.labels.len(),
        priority: priority_rank(task.priority.as_deref()),
        due_date: u8::from(task.due_date.is_some()),
        expected_points: round_half(points.total),
        burned_points,
        points_estimated_number_of_edits: estimated.len(),
        points_estimated_edits_total_difference: estimate_drift,
        points_burned_number_of_edits: task.points_burned_edits.len(),
        number_of_comments: task.comments.len(),
        number_of_commits: record.commits.len(),
        total_additions: files.clone().map(|f| f.additions).sum(),
        total_deletions: files.clone().map(|f| f.deletions).sum(),
        number_of_files_changed: files.count(),
        commit_messages: record
            .commits
            .iter()
            .map(|c| c.message.as_str())
            .collect::<Vec<_>>()
            .join(" | "),
        status_deviate_from_flow: status_deviations(&task.status_edits),
        class: EffortClass::from_points(burned_points),
    })
}

/// Feature rows of every task that carries points.
pub fn derive_all(records: &[CorrelatedTask]) -> Vec<TaskFeatures> {
    records.iter().filter_map(derive).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Commit, EnrichedTask, FileChange, Task};
    use chrono::{TimeZone, Utc};

    fn edit(from: Option<&str>, to: &str) -> StatusEdit {
        StatusEdit {
            from: from.map(String::from),
            to: to.into(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn record(task: serde_json::Value, commits: Vec<Commit>) -> CorrelatedTask {
        let task: Task = serde_json::from_value(task).unwrap();
        CorrelatedTask {
            enriched: EnrichedTask {
                task,
                categories: vec!["Feature".into()],
                focus_areas: vec!["Backend".into()],
            },
            commits,
        }
    }

    #[test]
    fn test_effort_classes() {
        assert_eq!(EffortClass::from_points(0.5), EffortClass::Fast);
        assert_eq!(EffortClass::from_points(2.0), EffortClass::Medium);
        assert_eq!(EffortClass::from_points(2.5), EffortClass::Slow);
        assert_eq!(serde_json::to_value(EffortClass::Medium).unwrap(), 2);
        assert!(serde_json::from_value::<EffortClass>(serde_json::json!(4)).is_err());
    }

    #[test]
    fn test_align_labels() {
        let labels: Vec<String> = ["enhancement", "feature", "Backlog", "custom", "bug"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(align_labels(&labels), vec!["feature", "custom", "bug"]);
    }

    #[test]
    fn test_round_half() {
        assert_eq!(round_half(1.2), 1.0);
        assert_eq!(round_half(1.3), 1.5);
        assert_eq!(round_half(1.75), 2.0);
    }

    #[test]
    fn test_status_deviations() {
        let edits = vec![
            edit(Some("Backlog"), "Sprint Planning"),
            edit(Some("Sprint Planning"), "In Progress"),
            edit(Some("In Progress"), "Delivered"),
            edit(Some("Delivered"), "In Progress"),
            edit(Some("In Progress"), "In Progress"),
            edit(Some("In Progress"), "Delivered"),
            edit(Some("Delivered"), "Accepted"),
        ];
        assert_eq!(status_deviations(&edits), 1);
        assert_eq!(status_deviations(&[edit(None, "Accepted")]), 0);
    }

    #[test]
    fn test_derive_features() {
        let commits = vec![
            Commit {
                id: "c1".into(),
                author: "a".into(),
                created_at: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
                message: "first".into(),
                files: vec![
                    FileChange { filename: "a.rs".into(), additions: 3, deletions: 1 },
                    FileChange { filename: "b.rs".into(), additions: 2, deletions: 0 },
                ],
            },
            Commit {
                id: "c2".into(),
                author: "a".into(),
                created_at: Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap(),
                message: "second".into(),
                files: vec![FileChange { filename: "a.rs".into(), additions: 1, deletions: 4 }],
            },
        ];
        let r = record(
            serde_json::json!({
                "_id": "t1",
                "title": "Add export",
                "createdAt": "2024-01-01T00:00:00Z",
                "labels": ["enhancement", "Other"],
                "priority": "high",
                "dueDate": "2024-02-01",
                "points": {"total": 3.2, "done": 2.2},
                "pointsEstimatedEdits": [
                    {"createdAt": "2024-01-01T00:00:00Z", "fromPoints": 1, "toPoints": 2},
                    {"createdAt": "2024-01-02T00:00:00Z", "fromPoints": 2, "toPoints": 3}
                ],
                "comments": [{"body": "ok"}]
            }),
            commits,
        );
        let f = derive(&r).unwrap();
        assert_eq!(f.labels, vec!["feature"]);
        assert_eq!(f.number_of_labels, 2);
        assert_eq!(f.priority, Some(3));
        assert_eq!(f.due_date, 1);
        assert_eq!(f.expected_points, 3.0);
        assert_eq!(f.burned_points, 2.0);
        assert_eq!(f.points_estimated_number_of_edits, 2);
        assert_eq!(f.points_estimated_edits_total_difference, 2.0);
        assert_eq!(f.total_additions, 6);
        assert_eq!(f.total_deletions, 5);
        assert_eq!(f.number_of_files_changed, 3);
        assert_eq!(f.commit_messages, "first | second");
        assert_eq!(f.class, EffortClass::Medium);
    }

    #[test]
    fn test_pointless_tasks_are_excluded() {
        let zero = record(
            serde_json::json!({
                "_id": "t1", "title": "x", "createdAt": "2024-01-01T00:00:00Z",
                "points": {"total": 0, "done": 0}
            }),
            vec![],
        );
        let missing = record(
            serde_json::json!({"_id": "t2", "title": "y", "createdAt": "2024-01-01T00:00:00Z"}),
            vec![],
        );
        assert!(derive_all(&[zero, missing]).is_empty());
    }
}
