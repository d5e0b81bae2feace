//! Pagesmith Core Library
//!
//! Editing state on top of the document model: checksummed persistence,
//! per-page undo history and the editor session that ties them together.

pub mod checksum;
pub mod codec;
pub mod config;
pub mod history;
pub mod persistence;
pub mod session;

pub use checksum::{
    blank_raw_checksum, canonicalize, compute_canonical_checksum, compute_raw_checksum,
    sha256_hex,
};
pub use codec::{
    decode, decode_value, encode, import, verify, CodecError, DecodedDocument, EncodedDocument,
    ImportOutcome, ImportPolicy, PersistedDocument, VerificationReport, VerifyFailure,
    DOCUMENT_VERSION,
};
pub use config::{ConfigError, EditorConfig};
pub use history::{HistoryManager, DEFAULT_MAX_DEPTH};
pub use persistence::{load_document, save_document, PersistenceError, PersistenceResult};
pub use session::{EditorSession, SessionError, SessionResult};
