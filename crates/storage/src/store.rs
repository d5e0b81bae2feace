use crate::StorageError;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

const RECORD_SCHEMA_VERSION: u32 = 1;

/// Named collections a document is spread across.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Pages,
    TextItems,
    ImageItems,
    ShapeItems,
    FormFields,
    Annotations,
    PdfTextSpans,
    History,
}

impl Collection {
    pub const ALL: [Collection; 8] = [
        Collection::Pages,
        Collection::TextItems,
        Collection::ImageItems,
        Collection::ShapeItems,
        Collection::FormFields,
        Collection::Annotations,
        Collection::PdfTextSpans,
        Collection::History,
    ];

    /// Wire name, matching the saved-file keys.
    pub fn name(self) -> &'static str {
        match self {
            Collection::Pages => "pages",
            Collection::TextItems => "textItems",
            Collection::ImageItems => "imageItems",
            Collection::ShapeItems => "shapeItems",
            Collection::FormFields => "formFields",
            Collection::Annotations => "annotations",
            Collection::PdfTextSpans => "pdfTextSpans",
            Collection::History => "history",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Minimal keyed record storage.
pub trait RecordStore {
    fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>, StorageError>;

    fn put(&mut self, collection: Collection, key: &str, value: Value) -> Result<(), StorageError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: HashMap<(Collection, String), Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.records.get(&(collection, key.to_owned())).cloned())
    }

    fn put(&mut self, collection: Collection, key: &str, value: Value) -> Result<(), StorageError> {
        self.records.insert((collection, key.to_owned()), value);
        Ok(())
    }
}

/// One JSON file per record under `<root>/<collection>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecordEnvelope {
    version: u32,
    record: Value,
}

impl FileStore {
    pub fn from_default_project() -> Result<Self, StorageError> {
        let dirs = ProjectDirs::from("dev", "Pagesmith", "Pagesmith")
            .ok_or(StorageError::NoDataDirectory)?;

        Ok(Self { root: dirs.data_local_dir().join("records") })
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, collection: Collection, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }
        Ok(self.root.join(collection.name()).join(format!("{key}.json")))
    }
}

impl RecordStore for FileStore {
    fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>, StorageError> {
        let path = self.record_path(collection, key)?;
        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path)?;
        let envelope: RecordEnvelope = serde_json::from_slice(&bytes)?;
        if envelope.version > RECORD_SCHEMA_VERSION {
            log::warn!(
                "{} was written by a newer schema (v{}); reading anyway",
                path.display(),
                envelope.version
            );
        }
        Ok(Some(envelope.record))
    }

    fn put(&mut self, collection: Collection, key: &str, value: Value) -> Result<(), StorageError> {
        let path = self.record_path(collection, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let envelope = RecordEnvelope { version: RECORD_SCHEMA_VERSION, record: value };
        let bytes = serde_json::to_vec_pretty(&envelope)?;

        // Readers only ever see the previous or the new record.
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, bytes)?;
        fs::rename(&temp_path, &path)?;
        Ok(())
    }
}
