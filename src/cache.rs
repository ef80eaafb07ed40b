//! Classification cache and replay.
//!
//! Every batch's parsed answer is written to its own artifact,
//! `{stem}_{n}-{hash}.json`, where `n` is the 1-based batch index and `hash`
//! the first 16 hex characters of the SHA-256 of the rendered messages.
//! Reruns load matching artifacts instead of calling the classifier, so an
//! interrupted run resumes at the first batch without an artifact.

use crate::batch::Batch;
use crate::classifier::Classifier;
use crate::error::CacheError;
use crate::prompts::Message;
use crate::response::extract_payload;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Hex characters of the message hash kept in artifact names.
pub const HASH_PREFIX_LEN: usize = 16;

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Content hash of a rendered batch.
pub fn messages_hash(messages: &[Message]) -> String {
    let rendered = serde_json::to_string(messages).unwrap_or_default();
    let mut hash = sha256_hex(rendered.as_bytes());
    hash.truncate(HASH_PREFIX_LEN);
    hash
}

/// Artifact store for one profile.
#[derive(Debug, Clone)]
pub struct ReplayCache {
    dir: PathBuf,
    refresh: bool,
}

impl ReplayCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            refresh: false,
        }
    }

    /// Ignore existing artifacts and overwrite them.
    pub fn refreshing(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the artifact for batch `index` (0-based).
    pub fn artifact_path(&self, stem: &str, index: usize, messages: &[Message]) -> PathBuf {
        self.dir
            .join(format!("{stem}_{}-{}.json", index + 1, messages_hash(messages)))
    }

    /// Answer every batch, from artifacts where possible.
    ///
    /// Batches are processed in order and each fresh answer is persisted
    /// before the next call. The first failure aborts the run; artifacts
    /// written up to that point stay on disk.
    pub fn run<T>(
        &self,
        stem: &str,
        batches: &[Batch<T>],
        classifier: &dyn Classifier,
    ) -> Result<Vec<Value>, CacheError> {
        self.ensure_dir()?;

        let mut results = Vec::with_capacity(batches.len());
        let mut announced = false;
        for (index, batch) in batches.iter().enumerate() {
            let path = self.artifact_path(stem, index, &batch.messages);

            if !self.refresh && path.exists() {
                if !announced {
                    info!(path = %path.display(), "Loading cached classifications");
                    announced = true;
                }
                results.push(read_artifact(&path)?);
                continue;
            }

            debug!(
                stem,
                batch = index + 1,
                tokens = batch.token_count,
                classifier = classifier.name(),
                "Requesting classification"
            );
            let answer = classifier
                .classify(&batch.messages)
                .map_err(|source| CacheError::Classify { index, source })?;
            let payload =
                extract_payload(&answer).map_err(|source| CacheError::Response { index, source })?;
            write_artifact(&path, &payload)?;
            results.push(payload);
        }
        Ok(results)
    }

    /// Read a whole-document artifact, if present and not refreshing.
    pub fn load_document(&self, name: &str) -> Result<Option<Value>, CacheError> {
        let path = self.dir.join(name);
        if self.refresh || !path.exists() {
            return Ok(None);
        }
        read_artifact(&path).map(Some)
    }

    /// Persist a whole-document artifact.
    pub fn store_document(&self, name: &str, value: &Value) -> Result<PathBuf, CacheError> {
        self.ensure_dir()?;
        let path = self.dir.join(name);
        write_artifact(&path, value)?;
        Ok(path)
    }

    fn ensure_dir(&self) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| CacheError::Io {
            path: self.dir.clone(),
            source,
        })
    }
}

fn read_artifact(path: &Path) -> Result<Value, CacheError> {
    let content = std::fs::read_to_string(path).map_err(|source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| CacheError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

fn write_artifact(path: &Path, value: &Value) -> Result<(), CacheError> {
    let io_err = |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    };
    let content = serde_json::to_string(value).map_err(|e| io_err(e.into()))?;
    std::fs::write(path, content).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::StubClassifier;
    use tempfile::TempDir;

    fn batch(text: &str) -> Batch<String> {
        Batch {
            items: vec![text.to_string()],
            messages: vec![Message::user(text)],
            token_count: 1,
        }
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(messages_hash(&[Message::user("x")]).len(), HASH_PREFIX_LEN);
    }

    #[test]
    fn test_second_run_makes_no_calls() {
        let temp = TempDir::new().unwrap();
        let cache = ReplayCache::new(temp.path());
        let batches = vec![batch("one"), batch("two")];

        let first_stub = StubClassifier::new().respond("{\"a\": 1}").respond("{\"b\": 2}");
        let first = cache.run("task_type", &batches, &first_stub).unwrap();
        assert_eq!(first_stub.calls(), 2);

        let second_stub = StubClassifier::new();
        let second = cache.run("task_type", &batches, &second_stub).unwrap();
        assert_eq!(second_stub.calls(), 0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_failure_keeps_earlier_artifacts_and_resumes() {
        let temp = TempDir::new().unwrap();
        let cache = ReplayCache::new(temp.path());
        let batches = vec![batch("one"), batch("two")];

        let failing = StubClassifier::new().respond("[1]").fail("connection reset");
        let err = cache.run("links", &batches, &failing).unwrap_err();
        assert!(matches!(err, CacheError::Classify { index: 1, .. }));
        assert!(cache.artifact_path("links", 0, &batches[0].messages).exists());
        assert!(!cache.artifact_path("links", 1, &batches[1].messages).exists());

        let resumed = StubClassifier::new().respond("[2]");
        let results = cache.run("links", &batches, &resumed).unwrap();
        assert_eq!(resumed.calls(), 1);
        assert_eq!(results, vec![serde_json::json!([1]), serde_json::json!([2])]);
    }

    #[test]
    fn test_changed_messages_miss_the_cache() {
        let temp = TempDir::new().unwrap();
        let cache = ReplayCache::new(temp.path());

        let stub = StubClassifier::new().with_fallback("{}");
        cache.run("s", &[batch("one")], &stub).unwrap();
        cache.run("s", &[batch("uno")], &stub).unwrap();
        assert_eq!(stub.calls(), 2);
    }

    #[test]
    fn test_refresh_overwrites() {
        let temp = TempDir::new().unwrap();
        let batches = vec![batch("one")];
        let cache = ReplayCache::new(temp.path());
        cache
            .run("s", &batches, &StubClassifier::new().respond("{\"v\": 1}"))
            .unwrap();

        let refreshing = cache.clone().refreshing(true);
        let stub = StubClassifier::new().respond("{\"v\": 2}");
        let results = refreshing.run("s", &batches, &stub).unwrap();
        assert_eq!(stub.calls(), 1);
        assert_eq!(results[0]["v"], 2);

        let reread = cache.run("s", &batches, &StubClassifier::new()).unwrap();
        assert_eq!(reread[0]["v"], 2);
    }

    #[test]
    fn test_unparseable_answer_is_response_error() {
        let temp = TempDir::new().unwrap();
        let cache = ReplayCache::new(temp.path());
        let stub = StubClassifier::new().respond("I cannot help with that");
        let err = cache.run("s", &[batch("one")], &stub).unwrap_err();
        assert!(matches!(err, CacheError::Response { index: 0, .. }));
    }

    #[test]
    fn test_corrupt_artifact() {
        let temp = TempDir::new().unwrap();
        let cache = ReplayCache::new(temp.path());
        let batches = vec![batch("one")];
        std::fs::write(cache.artifact_path("s", 0, &batches[0].messages), "{oops").unwrap();
        let err = cache.run("s", &batches, &StubClassifier::new()).unwrap_err();
        assert!(matches!(err, CacheError::Corrupt { .. }));
    }
}
