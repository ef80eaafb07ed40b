//! Temporal window extraction.
//!
//! For each task this derives the set of date ranges during which a commit
//! could plausibly belong to it: every forward status transition and every
//! point burn opens a window of `[event - lead, event + trail]`, the windows are
//! merged, and the result is clipped to the task's lifetime.

use crate::config::WindowsConfig;
use crate::error::WindowError;
use crate::keywords;
use crate::types::{ACCEPTED, DateRange, StatusEdit, Task, Timestamp, WindowSpec, lifecycle_index};
use chrono::Duration;
use tracing::debug;

/// Window widths and keyword limit used by the extractor.
#[derive(Debug, Clone, Copy)]
pub struct WindowParams {
    pub lead: Duration,
    pub trail: Duration,
    pub keyword_limit: usize,
}

impl Default for WindowParams {
    fn default() -> Self {
        Self {
            lead: Duration::hours(24),
            trail: Duration::hours(3),
            keyword_limit: keywords::DEFAULT_KEYWORD_LIMIT,
        }
    }
}

impl From<&WindowsConfig> for WindowParams {
    fn from(config: &WindowsConfig) -> Self {
        Self {
            lead: Duration::hours(config.lead_hours),
            trail: Duration::hours(config.trail_hours),
            keyword_limit: config.keyword_limit,
        }
    }
}

/// Keep only the edits that move forward through the lifecycle.
///
/// The first edit always survives and seeds the reference status. Each later
/// edit survives only when both the reference and its target are lifecycle
/// stages and the target comes strictly later. A discarded edit never
/// becomes the reference, so a seed outside the lifecycle keeps every later
/// edit out.
pub fn forward_transitions(edits: &[StatusEdit]) -> Vec<&StatusEdit> {
    let Some((first, rest)) = edits.split_first() else {
        return Vec::new();
    };
    let mut kept = vec![first];
    let mut last = lifecycle_index(&first.to);

    for edit in rest {
        let target = lifecycle_index(&edit.to);
        match (last, target) {
            (Some(prev), Some(next)) if prev < next => {
                kept.push(edit);
                last = target;
            }
            _ => {}
        }
    }
    kept
}

/// Timestamp at which work on the task is considered finished.
///
/// When the final edit moves the task into "Accepted", the acceptance itself
/// is review noise, so the previous edit marks the end of work.
pub fn end_of_work(task: &Task) -> Result<Timestamp, WindowError> {
    match task.status_edits.as_slice() {
        [] => Err(WindowError::NoStatusEdits {
            task_id: task.id.clone(),
        }),
        [.., previous, last] if last.to == ACCEPTED => Ok(previous.created_at),
        [.., last] => Ok(last.created_at),
    }
}

/// Merge overlapping or touching ranges into a minimal sorted disjoint set.
pub fn merge_ranges(mut ranges: Vec<DateRange>) -> Vec<DateRange> {
    ranges.sort_by_key(|r| r.start());

    let mut merged: Vec<DateRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(current) if range.start() <= current.end() => {
                *current = DateRange::new(current.start(), current.end().max(range.end()));
            }
            _ => merged.push(range),
        }
    }
    merged
}

/// Clip ranges to the lifetime `[created_at, lifetime_end]`.
///
/// A range straddling `created_at` is truncated to start there. A range that
/// starts inside the lifetime is kept whole, even if it runs past the end.
/// Everything else is dropped.
pub fn clip_ranges(
    ranges: Vec<DateRange>,
    created_at: Timestamp,
    lifetime_end: Timestamp,
) -> Vec<DateRange> {
    ranges
        .into_iter()
        .filter_map(|range| {
            if range.start() < created_at && created_at < range.end() {
                Some(DateRange::new(created_at, range.end()))
            } else if created_at <= range.start() && range.start() <= lifetime_end {
                Some(range)
            } else {
                None
            }
        })
        .collect()
}

/// Derive the window spec for a single task.
pub fn extract_window(task: &Task, params: &WindowParams) -> Result<WindowSpec, WindowError> {
    let lifetime_end = end_of_work(task)? + params.trail;

    let raw: Vec<DateRange> = task
        .points_burned_edits
        .iter()
        .map(|edit| edit.created_at)
        .chain(
            forward_transitions(&task.status_edits)
                .into_iter()
                .map(|edit| edit.created_at),
        )
        .map(|event| DateRange::around(event, params.lead, params.trail))
        .collect();

    let date_ranges = clip_ranges(merge_ranges(raw), task.created_at, lifetime_end);

    let text = format!(
        "{} {}",
        task.body.as_deref().unwrap_or_default(),
        task.comments_text()
    );

    Ok(WindowSpec {
        id: task.id.clone(),
        title: task.title.clone(),
        date_ranges,
        keywords: keywords::summarize(&text, params.keyword_limit),
    })
}

/// Derive window specs for a batch of tasks.
///
/// One malformed task fails the whole batch.
pub fn extract_windows(tasks: &[Task], params: &WindowParams) -> Result<Vec<WindowSpec>, WindowError> {
    let specs = tasks
        .iter()
        .map(|task| extract_window(task, params))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(tasks = specs.len(), "Extracted correlation windows");
    Ok(specs)
}
