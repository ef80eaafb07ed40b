//! Interpreting classifier answers.
//!
//! Answers are free text that should contain one JSON document. The payload
//! is cut out of any code fence or surrounding prose, parsed, and then read
//! according to its query kind.

use crate::error::ResponseError;
use crate::prompts::{CATEGORIES, FOCUS_AREAS};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Extract and parse the JSON payload of a classifier answer.
pub fn extract_payload(text: &str) -> Result<Value, ResponseError> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    let candidate = fenced_block(trimmed)
        .or_else(|| delimited_span(trimmed))
        .ok_or(ResponseError::NoPayload)?;
    Ok(serde_json::from_str(candidate.trim())?)
}

/// Contents of the first ``` fence, without its language tag.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")? + 3;
    let rest = &text[start..];
    let body_start = rest.find('\n').map(|i| i + 1).unwrap_or(0);
    let rest = &rest[body_start..];
    let end = rest.find("```")?;
    Some(&rest[..end])
}

/// From the first opening bracket to the last matching closing one.
fn delimited_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let close = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Read a task-type answer: a mapping of title to label.
pub fn task_types(value: &Value) -> Result<Vec<(String, String)>, ResponseError> {
    let map = value.as_object().ok_or_else(|| {
        ResponseError::UnexpectedShape(format!("expected a mapping, got {}", kind_of(value)))
    })?;
    map.iter()
        .map(|(title, label)| match label {
            Value::String(label) => Ok((title.clone(), label.clone())),
            other => Err(ResponseError::UnexpectedShape(format!(
                "label of {title:?} is {}, not a string",
                kind_of(other)
            ))),
        })
        .collect()
}

/// One title's categories and focus areas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    pub title: String,
    pub categories: Vec<String>,
    pub focus_areas: Vec<String>,
}

#[derive(Deserialize)]
struct EnrichmentDetails {
    #[serde(rename = "Categories", default)]
    categories: Vec<String>,
    #[serde(rename = "FocusArea", default)]
    focus_areas: Vec<String>,
}

/// Read an enrichment answer. Entries that are malformed or use a category
/// or focus area outside the allowed vocabularies are dropped.
pub fn enrichments(value: &Value) -> Vec<Enrichment> {
    let Some(map) = value.as_object() else {
        debug!(got = kind_of(value), "Enrichment answer is not a mapping");
        return Vec::new();
    };

    map.iter()
        .filter_map(|(title, details)| {
            let details: EnrichmentDetails = serde_json::from_value(details.clone()).ok()?;
            let allowed = details.categories.iter().all(|c| CATEGORIES.contains(&c.as_str()))
                && details.focus_areas.iter().all(|f| FOCUS_AREAS.contains(&f.as_str()));
            if !allowed {
                debug!(title = %title, "Dropping enrichment outside the allowed vocabularies");
                return None;
            }
            Some(Enrichment {
                title: title.clone(),
                categories: details.categories,
                focus_areas: details.focus_areas,
            })
        })
        .collect()
}

/// Commits the classifier confirmed for one task title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitLinks {
    pub title: String,
    #[serde(default)]
    pub commit_ids: Vec<String>,
}

/// Read a commit-link answer: a list of `{title, commit_ids}`. A single
/// object is accepted as a one-element list; malformed entries are skipped.
pub fn commit_links(value: &Value) -> Vec<CommitLinks> {
    let entries = match value {
        Value::Array(entries) => entries.as_slice(),
        Value::Object(_) => std::slice::from_ref(value),
        other => {
            debug!(got = kind_of(other), "Commit-link answer is not a list");
            return Vec::new();
        }
    };
    entries
        .iter()
        .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
