//! Output documents.
//!
//! Every command that produces records writes them wrapped in a small
//! envelope recording when and by what they were generated. Files ending in
//! `.gz` are gzip-compressed; readers detect compression by magic bytes and
//! also accept a bare JSON array of records.

use crate::error::{PipelineError, Result};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Document format version (semver).
pub const DOCUMENT_VERSION: &str = "1.0.0";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document<T> {
    /// Document format version (semver)
    pub document_version: String,

    /// ISO 8601 timestamp of generation
    pub generated_at: String,

    /// Tool name and version that produced the document
    pub generated_by: String,

    /// Profile the records were produced for, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    pub records: Vec<T>,
}

impl<T> Document<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self {
            document_version: DOCUMENT_VERSION.to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            generated_by: format!("task-insight v{}", env!("CARGO_PKG_VERSION")),
            profile: None,
            records,
        }
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Stored<T> {
    Document(Document<T>),
    Records(Vec<T>),
}

/// Whether `path` should be written gzip-compressed.
pub fn is_gzip_path(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

/// Write a document as pretty JSON, gzipped for `.gz` paths.
pub fn write_document<T: Serialize>(path: &Path, document: &Document<T>) -> Result<()> {
    let output_err = |source| PipelineError::Output {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(output_err)?;
    }
    let json = serde_json::to_string_pretty(document).map_err(PipelineError::Render)?;
    let file = File::create(path).map_err(output_err)?;

    if is_gzip_path(path) {
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(json.as_bytes()).map_err(output_err)?;
        encoder.finish().map_err(output_err)?;
    } else {
        let mut writer = BufWriter::new(file);
        writer.write_all(json.as_bytes()).map_err(output_err)?;
        writer.flush().map_err(output_err)?;
    }
    Ok(())
}

/// Read the records of a document (plain or gzipped JSON).
pub fn read_records<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let stored: Stored<T> = if bytes.starts_with(&GZIP_MAGIC) {
        serde_json::from_reader(GzDecoder::new(bytes.as_slice()))?
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok(match stored {
        Stored::Document(document) => document.records,
        Stored::Records(records) => records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_document_metadata() {
        let document = Document::new(vec![1, 2]).with_profile("alice");
        assert_eq!(document.document_version, DOCUMENT_VERSION);
        assert!(document.generated_by.starts_with("task-insight v"));
        assert_eq!(document.profile.as_deref(), Some("alice"));
    }

    #[test]
    fn test_gzip_output_is_detected_on_read() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out/records.json.gz");
        write_document(&path, &Document::new(vec!["a".to_string()])).unwrap();

        let raw = std::fs::read(&path).unwrap();
        assert!(raw.starts_with(&GZIP_MAGIC));
        let records: Vec<String> = read_records(&path).unwrap();
        assert_eq!(records, vec!["a"]);
    }

    #[test]
    fn test_bare_array_is_accepted() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("records.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        let records: Vec<u32> = read_records(&path).unwrap();
        assert_eq!(records, vec![1, 2, 3]);
    }
}
