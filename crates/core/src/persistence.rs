//! Saving and loading documents as checksummed JSON files.

use crate::codec::{self, CodecError, EncodedDocument, ImportOutcome, ImportPolicy};
use chrono::{DateTime, Utc};
use doc_model::Document;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const DOCUMENT_EXTENSION: &str = "json";

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> PersistenceError + '_ {
    move |source| PersistenceError::Io { path: path.to_path_buf(), source }
}

/// Encodes `document` and writes it atomically through a sibling temp file.
pub fn save_document(
    path: &Path,
    document: &Document,
    saved_at: DateTime<Utc>,
) -> PersistenceResult<EncodedDocument> {
    let encoded = codec::encode(document, saved_at)?;

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, &encoded.text).map_err(io_error(&temp_path))?;
    fs::rename(&temp_path, path).map_err(io_error(path))?;

    log::info!("saved document to {}", path.display());
    Ok(encoded)
}

pub fn load_document(path: &Path, policy: ImportPolicy) -> PersistenceResult<ImportOutcome> {
    let text = fs::read_to_string(path).map_err(io_error(path))?;
    let outcome = codec::import(&text, policy)?;

    if !outcome.report.ok {
        log::warn!(
            "{} failed verification ({}); loaded anyway",
            path.display(),
            outcome.report.failure.map_or("unknown", |failure| failure.as_str())
        );
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::VerifyFailure;
    use doc_model::TextItem;

    #[test]
    fn save_and_load_round_trip() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("nested").join("layout.json");

        let mut doc = Document::with_page_count(2);
        doc.add(TextItem::new("hello", 1, 0.5, 0.5)).expect("add");

        save_document(&path, &doc, Utc::now()).expect("save should succeed");
        assert!(!path.with_extension("tmp").exists());

        let outcome = load_document(&path, ImportPolicy::Strict).expect("load should succeed");
        assert!(outcome.report.ok);
        assert_eq!(outcome.decoded.document, doc);
    }

    #[test]
    fn strict_load_rejects_hand_edited_file() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("layout.json");
        save_document(&path, &Document::new(), Utc::now()).expect("save should succeed");

        let text = fs::read_to_string(&path).expect("read");
        fs::write(&path, format!("{text}\n")).expect("write");

        let err = load_document(&path, ImportPolicy::Strict).expect_err("should be rejected");
        assert!(matches!(
            err,
            PersistenceError::Codec(CodecError::Rejected(VerifyFailure::RawMismatch))
        ));

        let outcome = load_document(&path, ImportPolicy::AllowMismatch).expect("override");
        assert_eq!(outcome.decoded.document.page_count(), 1);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_document(Path::new("/nonexistent/pagesmith.json"), ImportPolicy::Strict)
            .expect_err("missing file should fail");
        assert!(err.to_string().contains("/nonexistent/pagesmith.json"));
    }
}
