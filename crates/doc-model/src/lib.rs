pub mod coords;
pub mod document;
pub mod element;
pub mod history;
pub mod reindex;
pub mod serde_util;
pub mod span;

pub use coords::{
    to_export_rect, to_export_space, to_normalized, to_pixel, ExportRect, NormRect, PixelRect,
    SurfaceSize,
};
pub use document::{Document, DocumentError, DocumentParts, Page};
pub use element::{
    paint_order, AnnotationItem, AnnotationKind, AnnotationSpan, Element, ElementKind,
    FormFieldItem, FormFieldKind, ImageItem, Layer, NormPoint, PageElement, PixelCache,
    ShapeItem, ShapeKind, TextItem,
};
pub use history::{HistoryStacks, PageHistory, Snapshot};
pub use span::TextSpan;

use serde::{Deserialize, Serialize};

/// Fixed page geometry of a document, in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl Default for PageSize {
    fn default() -> Self {
        Self::A4
    }
}

impl PageSize {
    pub const A4: PageSize = PageSize { width: 595.0, height: 842.0 };

    pub fn surface(self) -> SurfaceSize {
        SurfaceSize::new(self.width, self.height)
    }
}
