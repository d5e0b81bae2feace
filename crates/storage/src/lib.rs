//! Record-store persistence for documents, extracted text spans and undo
//! history.

pub mod records;
pub mod store;

pub use records::{
    hydrate_session, load_document, load_history, load_text_spans, persist_session,
    save_document, save_history, save_text_spans,
};
pub use store::{Collection, FileStore, MemoryStore, RecordStore};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve local data directory")]
    NoDataDirectory,
    #[error("invalid record key: {0:?}")]
    InvalidKey(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
