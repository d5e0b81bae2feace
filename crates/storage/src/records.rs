//! Spreading a document across record collections and reading it back.

use crate::store::{Collection, RecordStore};
use crate::StorageError;
use doc_model::{Document, HistoryStacks, TextSpan};
use pagesmith_core::codec::{self, DecodedDocument};
use pagesmith_core::{EditorConfig, EditorSession};
use serde_json::{Map, Value};

const DOCUMENT_COLLECTIONS: [Collection; 6] = [
    Collection::Pages,
    Collection::TextItems,
    Collection::ImageItems,
    Collection::ShapeItems,
    Collection::FormFields,
    Collection::Annotations,
];

pub fn save_document(
    store: &mut impl RecordStore,
    key: &str,
    document: &Document,
) -> Result<(), StorageError> {
    store.put(Collection::Pages, key, serde_json::to_value(document.pages())?)?;
    store.put(Collection::TextItems, key, serde_json::to_value(document.text_items())?)?;
    store.put(Collection::ImageItems, key, serde_json::to_value(document.image_items())?)?;
    store.put(Collection::ShapeItems, key, serde_json::to_value(document.shape_items())?)?;
    store.put(Collection::FormFields, key, serde_json::to_value(document.form_fields())?)?;
    store.put(Collection::Annotations, key, serde_json::to_value(document.annotations())?)?;
    log::debug!("stored document {key} ({} elements)", document.element_count());
    Ok(())
}

/// Reads whichever document collections exist for `key` and rebuilds a
/// valid document from them. Returns `None` when none exist.
///
/// Records go through the same self-healing path as saved files: missing or
/// malformed pages are rebuilt from the flat collections, and unreadable
/// elements are dropped.
pub fn load_document(
    store: &impl RecordStore,
    key: &str,
) -> Result<Option<DecodedDocument>, StorageError> {
    let mut payload = Map::new();
    for collection in DOCUMENT_COLLECTIONS {
        if let Some(record) = store.get(collection, key)? {
            payload.insert(collection.name().to_owned(), record);
        }
    }

    if payload.is_empty() {
        return Ok(None);
    }

    let decoded = codec::decode_value(&Value::Object(payload));
    if decoded.skipped > 0 {
        log::warn!("document {key}: dropped {} unreadable records", decoded.skipped);
    }
    Ok(Some(decoded))
}

pub fn save_text_spans(
    store: &mut impl RecordStore,
    key: &str,
    spans: &[TextSpan],
) -> Result<(), StorageError> {
    store.put(Collection::PdfTextSpans, key, serde_json::to_value(spans)?)
}

/// Loads extracted text spans, skipping entries that do not parse.
pub fn load_text_spans(store: &impl RecordStore, key: &str) -> Result<Vec<TextSpan>, StorageError> {
    let Some(Value::Array(entries)) = store.get(Collection::PdfTextSpans, key)? else {
        return Ok(Vec::new());
    };

    Ok(entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(span) => Some(span),
            Err(err) => {
                log::warn!("skipping unreadable text span: {err}");
                None
            }
        })
        .collect())
}

pub fn save_history(
    store: &mut impl RecordStore,
    key: &str,
    stacks: &HistoryStacks,
) -> Result<(), StorageError> {
    store.put(Collection::History, key, serde_json::to_value(stacks)?)
}

/// Loads persisted undo/redo stacks. A corrupt history record is discarded
/// rather than blocking the document from opening.
pub fn load_history(store: &impl RecordStore, key: &str) -> Result<HistoryStacks, StorageError> {
    let Some(record) = store.get(Collection::History, key)? else {
        return Ok(HistoryStacks::new());
    };

    match serde_json::from_value(record) {
        Ok(stacks) => Ok(stacks),
        Err(err) => {
            log::warn!("discarding unreadable history for {key}: {err}");
            Ok(HistoryStacks::new())
        }
    }
}

/// Stores the session's document and history under `key`.
pub fn persist_session(
    store: &mut impl RecordStore,
    key: &str,
    session: &EditorSession,
) -> Result<(), StorageError> {
    save_document(store, key, &session.document())?;
    save_history(store, key, session.history_stacks())
}

/// Rebuilds a session from `key`, with its history pruned to the pages the
/// document actually has.
pub fn hydrate_session(
    store: &impl RecordStore,
    key: &str,
    config: EditorConfig,
) -> Result<Option<EditorSession>, StorageError> {
    let Some(decoded) = load_document(store, key)? else {
        return Ok(None);
    };

    let mut session = EditorSession::with_document(decoded.document, config);
    session.restore_history(load_history(store, key)?);
    Ok(Some(session))
}
