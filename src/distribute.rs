//! Greedy workload distribution.
//!
//! Each task goes to the assignee whose accumulated hours plus the task's
//! predicted hours is smallest. Predictions come from an [`EffortPredictor`].

use crate::features::{EffortClass, TaskFeatures};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Predicts how long an assignee would take on a task.
pub trait EffortPredictor {
    fn predict(&self, task: &TaskFeatures, assignee: &str) -> EffortClass;
}

/// Scales a task's expected points by how each assignee's burned points
/// historically compared to their estimates.
#[derive(Debug, Clone, Default)]
pub struct HistoricalPredictor {
    ratios: HashMap<String, f64>,
}

impl HistoricalPredictor {
    /// Learn burned/expected ratios from past tasks. Assignees without
    /// estimated history get a ratio of 1.
    pub fn from_history(history: &[TaskFeatures]) -> Self {
        let mut totals: HashMap<&str, (f64, f64)> = HashMap::new();
        for task in history {
            for assignee in &task.assignees {
                let entry = totals.entry(assignee.as_str()).or_default();
                entry.0 += task.burned_points;
                entry.1 += task.expected_points;
            }
        }
        let ratios = totals
            .into_iter()
            .filter(|(_, (_, expected))| *expected > 0.0)
            .map(|(assignee, (burned, expected))| (assignee.to_string(), burned / expected))
            .collect();
        Self { ratios }
    }

    pub fn ratio(&self, assignee: &str) -> f64 {
        self.ratios.get(assignee).copied().unwrap_or(1.0)
    }
}

impl EffortPredictor for HistoricalPredictor {
    fn predict(&self, task: &TaskFeatures, assignee: &str) -> EffortClass {
        EffortClass::from_points(task.expected_points * self.ratio(assignee))
    }
}

/// A task placed with an assignee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub task_id: String,
    pub title: String,
    pub assigned_to: String,
    pub burned_points: f64,
    pub expected_points: f64,
    pub class: EffortClass,
    pub original_assignees: Vec<String>,
    pub predicted_class: EffortClass,
}

/// Everything placed with one assignee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssigneeLoad {
    pub assignee: String,
    pub hours: f64,
    pub tasks: Vec<Assignment>,
}

/// Place every task greedily. Ties go to the assignee listed first.
pub fn distribute(
    tasks: &[TaskFeatures],
    assignees: &[String],
    predictor: &dyn EffortPredictor,
) -> Vec<AssigneeLoad> {
    let mut loads: Vec<AssigneeLoad> = assignees
        .iter()
        .map(|assignee| AssigneeLoad {
            assignee: assignee.clone(),
            hours: 0.0,
            tasks: Vec::new(),
        })
        .collect();
    if loads.is_empty() {
        warn!(tasks = tasks.len(), "No assignees to distribute tasks to");
        return loads;
    }

    for task in tasks {
        let mut best: Option<(usize, EffortClass, f64)> = None;
        for (index, load) in loads.iter().enumerate() {
            let class = predictor.predict(task, &load.assignee);
            let total = load.hours + class.hours();
            if best.is_none_or(|(_, _, best_total)| total < best_total) {
                best = Some((index, class, total));
            }
        }
        let Some((index, predicted_class, total)) = best else {
            continue;
        };

        let load = &mut loads[index];
        load.hours = total;
        load.tasks.push(Assignment {
            task_id: task.id.clone(),
            title: task.title.clone(),
            assigned_to: load.assignee.clone(),
            burned_points: task.burned_points,
            expected_points: task.expected_points,
            class: task.class,
            original_assignees: task.assignees.clone(),
            predicted_class,
        });
        debug!(task = %task.id, assignee = %load.assignee, hours = total, "Assigned task");
    }
    loads
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(id: &str, expected: f64, burned: f64, assignees: &[&str]) -> TaskFeatures {
        TaskFeatures {
            id: id.into(),
            title: format!("task {id}"),
            body: String::new(),
            comments: String::new(),
            assignees: assignees.iter().map(|a| a.to_string()).collect(),
            categories: vec![],
            focus_areas: vec![],
            labels: vec![],
            number_of_labels: 0,
            priority: None,
            due_date: 0,
            expected_points: expected,
            burned_points: burned,
            points_estimated_number_of_edits: 0,
            points_estimated_edits_total_difference: 0.0,
            points_burned_number_of_edits: 0,
            number_of_comments: 0,
            number_of_commits: 0,
            total_additions: 0,
            total_deletions: 0,
            number_of_files_changed: 0,
            commit_messages: String::new(),
            status_deviate_from_flow: 0,
            class: EffortClass::from_points(burned),
        }
    }

    struct Fixed(HashMap<String, EffortClass>);

    impl EffortPredictor for Fixed {
        fn predict(&self, _task: &TaskFeatures, assignee: &str) -> EffortClass {
            self.0[assignee]
        }
    }

    #[test]
    fn test_historical_ratios() {
        let history = vec![
            features("1", 2.0, 4.0, &["slow"]),
            features("2", 2.0, 1.0, &["quick"]),
            features("3", 0.0, 1.0, &["unknown"]),
        ];
        let predictor = HistoricalPredictor::from_history(&history);
        assert_eq!(predictor.ratio("slow"), 2.0);
        assert_eq!(predictor.ratio("quick"), 0.5);
        assert_eq!(predictor.ratio("unknown"), 1.0);

        let task = features("4", 2.0, 0.0, &[]);
        assert_eq!(predictor.predict(&task, "slow"), EffortClass::Slow);
        assert_eq!(predictor.predict(&task, "quick"), EffortClass::Medium);

        let small = features("5", 1.0, 0.0, &[]);
        assert_eq!(predictor.predict(&small, "quick"), EffortClass::Fast);
        assert_eq!(predictor.predict(&small, "unknown"), EffortClass::Medium);
    }

    #[test]
    fn test_load_uses_the_chosen_assignees_prediction() {
        let predictor = Fixed(HashMap::from([
            ("a".to_string(), EffortClass::Fast),
            ("b".to_string(), EffortClass::Slow),
        ]));
        let tasks: Vec<TaskFeatures> = (0..3).map(|i| features(&i.to_string(), 1.0, 1.0, &[])).collect();
        let loads = distribute(&tasks, &["a".into(), "b".into()], &predictor);

        // a: 0.25, 0.5, 0.75 stays below b's 2.5 for every task.
        assert_eq!(loads[0].tasks.len(), 3);
        assert_eq!(loads[0].hours, 0.75);
        assert!(loads[0].tasks.iter().all(|t| t.predicted_class == EffortClass::Fast));
        assert!(loads[1].tasks.is_empty());
        assert_eq!(loads[1].hours, 0.0);
    }

    #[test]
    fn test_ties_go_to_first_assignee() {
        let predictor = HistoricalPredictor::default();
        let tasks = vec![features("1", 1.0, 1.0, &[]), features("2", 1.0, 1.0, &[])];
        let loads = distribute(&tasks, &["a".into(), "b".into()], &predictor);
        assert_eq!(loads[0].tasks[0].task_id, "1");
        assert_eq!(loads[1].tasks[0].task_id, "2");
    }

    #[test]
    fn test_no_assignees() {
        let tasks = vec![features("1", 1.0, 1.0, &[])];
        assert!(distribute(&tasks, &[], &HistoricalPredictor::default()).is_empty());
    }
}
