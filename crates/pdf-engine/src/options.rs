use doc_model::PageSize;

/// Export options for PDF output
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    /// Page geometry in points; every page shares it
    pub page_size: PageSize,

    /// Attach `manifest.json` for lossless re-import
    pub embed_manifest: bool,

    /// Document title written to the info dictionary
    pub title: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { page_size: PageSize::A4, embed_manifest: true, title: None }
    }
}

impl ExportOptions {
    pub fn with_page_size(mut self, page_size: PageSize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn without_manifest(mut self) -> Self {
        self.embed_manifest = false;
        self
    }
}
