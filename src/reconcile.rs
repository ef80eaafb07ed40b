//! Merging classifier answers back onto the task collection.
//!
//! Answers are keyed by title and may be partial: the classifier can skip a
//! title, misspell it, or answer with labels outside the allowed vocabulary.
//! Every merge is therefore followed by a restoration pass that reinserts,
//! with empty defaults, each input task the merge lost. Restoration counts
//! identifiers, so duplicated tasks survive as duplicates and the output
//! always has exactly as many records as the input.

use crate::prompts::CODE_RELATED;
use crate::response::{CommitLinks, Enrichment};
use crate::types::{CorrelatedTask, EnrichedTask, Task, TaskCandidates};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Title normalization of the code/non-code stage.
pub fn to_double_quotes(title: &str) -> String {
    title.replace('\'', "\"")
}

/// Title normalization of the enrichment stage.
pub fn to_single_quotes(title: &str) -> String {
    title.replace('"', "'")
}

/// Keep the tasks whose title was labelled code-related.
pub fn filter_code_tasks(tasks: Vec<Task>, labels: &[(String, String)]) -> Vec<Task> {
    let labels: HashMap<String, &str> = labels
        .iter()
        .map(|(title, label)| (to_double_quotes(title), label.as_str()))
        .collect();
    tasks
        .into_iter()
        .filter(|task| labels.get(&to_double_quotes(&task.title)) == Some(&CODE_RELATED))
        .collect()
}

/// Attach categories and focus areas to every task whose title has an
/// entry. Tasks without one are left out; see [`restore_enrichment`].
pub fn merge_enrichment(tasks: &[Task], entries: &[Enrichment]) -> Vec<EnrichedTask> {
    let by_title: HashMap<String, &Enrichment> = entries
        .iter()
        .map(|entry| (to_single_quotes(&entry.title), entry))
        .collect();
    tasks
        .iter()
        .filter_map(|task| {
            let entry = by_title.get(&to_single_quotes(&task.title))?;
            Some(EnrichedTask {
                task: task.clone(),
                categories: entry.categories.clone(),
                focus_areas: entry.focus_areas.clone(),
            })
        })
        .collect()
}

/// Narrow each candidate's commits to the ids the classifier confirmed and
/// attach them to the enriched record with the same id. Candidates left
/// without commits are dropped; see [`restore_correlation`].
pub fn merge_correlation(
    candidates: &[TaskCandidates],
    links: &[CommitLinks],
    enriched: &[EnrichedTask],
) -> Vec<CorrelatedTask> {
    let mut confirmed: HashMap<&str, HashSet<&str>> = HashMap::new();
    for link in links {
        confirmed
            .entry(link.title.as_str())
            .or_default()
            .extend(link.commit_ids.iter().map(String::as_str));
    }
    let records: HashMap<&str, &EnrichedTask> = enriched
        .iter()
        .rev()
        .map(|record| (record.task.id.as_str(), record))
        .collect();

    candidates
        .iter()
        .filter_map(|candidate| {
            let ids = confirmed.get(candidate.title.as_str())?;
            let commits: Vec<_> = candidate
                .commits
                .iter()
                .filter(|commit| ids.contains(commit.id.as_str()))
                .cloned()
                .collect();
            if commits.is_empty() {
                return None;
            }
            let record = records.get(candidate.id.as_str())?;
            Some(CorrelatedTask {
                enriched: (*record).clone(),
                commits,
            })
        })
        .collect()
}

/// Reinsert enriched tasks the merge lost, uncategorized.
pub fn restore_enrichment(original: &[Task], merged: Vec<EnrichedTask>) -> Vec<EnrichedTask> {
    restore(
        original,
        merged,
        |task| task.id.as_str(),
        |record| record.task.id.as_str(),
        |task| EnrichedTask::unclassified(task.clone()),
    )
}

/// Reinsert correlated tasks the merge lost, without commits.
pub fn restore_correlation(
    original: &[EnrichedTask],
    merged: Vec<CorrelatedTask>,
) -> Vec<CorrelatedTask> {
    restore(
        original,
        merged,
        |record| record.task.id.as_str(),
        |record| record.id(),
        |record| CorrelatedTask::unlinked(record.clone()),
    )
}

/// Merged records first, in their order, then the missing originals in
/// theirs. Records that do not correspond to an outstanding original are
/// discarded.
fn restore<T, R>(
    original: &[T],
    merged: Vec<R>,
    original_id: impl Fn(&T) -> &str,
    merged_id: impl Fn(&R) -> &str,
    restored: impl Fn(&T) -> R,
) -> Vec<R> {
    let mut owed: HashMap<&str, usize> = HashMap::new();
    for item in original {
        *owed.entry(original_id(item)).or_default() += 1;
    }

    let mut output = Vec::with_capacity(original.len());
    for record in merged {
        match owed.get_mut(merged_id(&record)) {
            Some(count) if *count > 0 => {
                *count -= 1;
                output.push(record);
            }
            _ => debug!(id = merged_id(&record), "Discarding record with no matching input"),
        }
    }

    let mut restored_count = 0;
    for item in original {
        match owed.get_mut(original_id(item)) {
            Some(count) if *count > 0 => {
                *count -= 1;
                output.push(restored(item));
                restored_count += 1;
            }
            _ => {}
        }
    }
    if restored_count > 0 {
        debug!(restored = restored_count, "Restored tasks missing from classifier output");
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Commit, Timestamp};
    use chrono::{TimeZone, Utc};

    fn created() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
    }

    fn task(id: &str, title: &str) -> Task {
        serde_json::from_value(serde_json::json!({
            "_id": id,
            "title": title,
            "createdAt": "2024-02-01T00:00:00Z"
        }))
        .unwrap()
    }

    fn commit(id: &str) -> Commit {
        Commit {
            id: id.into(),
            author: "a".into(),
            created_at: created(),
            message: String::new(),
            files: vec![],
        }
    }

    fn enrichment(title: &str, category: &str) -> Enrichment {
        Enrichment {
            title: title.into(),
            categories: vec![category.into()],
            focus_areas: vec!["Backend".into()],
        }
    }

    #[test]
    fn test_quote_normalizations_stay_distinct() {
        assert_eq!(to_double_quotes("it's \"x\""), "it\"s \"x\"");
        assert_eq!(to_single_quotes("it's \"x\""), "it's 'x'");
    }

    #[test]
    fn test_filter_code_tasks_normalizes_titles() {
        let tasks = vec![task("1", "Fix 'login'"), task("2", "Plan sprint"), task("3", "Other")];
        let labels = vec![
            ("Fix \"login\"".to_string(), "Code-Related".to_string()),
            ("Plan sprint".to_string(), "Non-Code-Related".to_string()),
        ];
        let kept = filter_code_tasks(tasks, &labels);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "1");
    }

    #[test]
    fn test_omitted_task_is_restored_uncategorized() {
        let tasks = vec![task("a", "Task A"), task("b", "Task B")];
        let merged = merge_enrichment(&tasks, &[enrichment("Task A", "Feature")]);
        let restored = restore_enrichment(&tasks, merged);

        assert_eq!(restored.len(), 2);
        let b = restored.iter().find(|r| r.task.id == "b").unwrap();
        assert!(b.categories.is_empty());
        assert!(b.focus_areas.is_empty());
        let a = restored.iter().find(|r| r.task.id == "a").unwrap();
        assert_eq!(a.categories, vec!["Feature"]);
    }

    #[test]
    fn test_enrichment_matches_quoted_titles() {
        let tasks = vec![task("a", "Rename \"user\" table")];
        let merged = merge_enrichment(&tasks, &[enrichment("Rename 'user' table", "Feature")]);
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_enrichment_replaces_existing_fields() {
        let tasks = vec![task("a", "A")];
        let first = merge_enrichment(&tasks, &[enrichment("A", "Feature")]);
        let second = merge_enrichment(
            &[first[0].task.clone()],
            &[enrichment("A", "Bug Fixes")],
        );
        assert_eq!(second[0].categories, vec!["Bug Fixes"]);
    }

    #[test]
    fn test_restoration_preserves_cardinality() {
        let tasks = vec![
            task("a", "A"),
            task("b", "B"),
            task("a", "A"),
            task("c", "C"),
            task("d", "D"),
        ];
        let answers: Vec<Vec<Enrichment>> = vec![
            vec![],
            vec![enrichment("A", "Feature")],
            vec![enrichment("Z", "Feature"), enrichment("C", "Feature")],
            vec![
                enrichment("A", "Feature"),
                enrichment("B", "Feature"),
                enrichment("C", "Feature"),
                enrichment("D", "Feature"),
            ],
        ];
        for answer in answers {
            let merged = merge_enrichment(&tasks, &answer);
            assert_eq!(restore_enrichment(&tasks, merged).len(), tasks.len());
        }

        // Records that match nothing are discarded, duplicates counted.
        let foreign = vec![
            EnrichedTask::unclassified(task("x", "X")),
            EnrichedTask::unclassified(task("a", "A")),
            EnrichedTask::unclassified(task("a", "A")),
            EnrichedTask::unclassified(task("a", "A")),
        ];
        let restored = restore_enrichment(&tasks, foreign);
        assert_eq!(restored.len(), tasks.len());
        assert_eq!(restored.iter().filter(|r| r.task.id == "a").count(), 2);
    }

    #[test]
    fn test_correlation_merge_and_restore() {
        let enriched: Vec<EnrichedTask> = ["a", "b", "c"]
            .iter()
            .map(|id| EnrichedTask::unclassified(task(id, &format!("Task {id}"))))
            .collect();
        let candidates = vec![
            TaskCandidates {
                id: "a".into(),
                title: "Task a".into(),
                keywords: String::new(),
                commits: vec![commit("c1"), commit("c2"), commit("c3")],
            },
            TaskCandidates {
                id: "b".into(),
                title: "Task b".into(),
                keywords: String::new(),
                commits: vec![commit("c4")],
            },
        ];
        let links = vec![
            CommitLinks {
                title: "Task a".into(),
                commit_ids: vec!["c1".into()],
            },
            CommitLinks {
                title: "Task a".into(),
                commit_ids: vec!["c3".into(), "c9".into()],
            },
            CommitLinks {
                title: "Task b".into(),
                commit_ids: vec![],
            },
        ];

        let merged = merge_correlation(&candidates, &links, &enriched);
        assert_eq!(merged.len(), 1);
        let ids: Vec<&str> = merged[0].commits.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c3"]);

        let restored = restore_correlation(&enriched, merged);
        assert_eq!(restored.len(), 3);
        assert!(restored.iter().filter(|r| r.id() != "a").all(|r| r.commits.is_empty()));
    }
}
