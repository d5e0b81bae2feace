//! PDF export of a page document.

pub mod assets;
pub mod color;
pub mod export;
pub mod fonts;
mod forms;
pub mod manifest;
pub mod options;
mod painter;

pub use assets::{AssetError, AssetLoader, DefaultAssetLoader, EmbeddableImage};
pub use export::{export_document, ExportArtifact, ExportWarning};
pub use manifest::{read_manifest, ExportManifest, ManifestPage, MANIFEST_FILE_NAME};
pub use options::ExportOptions;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
    #[error("PDF has no {} attachment", MANIFEST_FILE_NAME)]
    MissingManifest,
    #[error("invalid page size {width}x{height}")]
    InvalidPageSize { width: f64, height: f64 },
}
