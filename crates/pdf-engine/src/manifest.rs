//! The `manifest.json` attachment: every emitted element with its full
//! normalized record, so an exported PDF can be turned back into a document.

use crate::ExportError;
use doc_model::{
    AnnotationItem, Document, FormFieldItem, ImageItem, Page, PageSize, ShapeItem, TextItem,
};
use lopdf::{dictionary, Dictionary, Document as PdfDocument, Object, ObjectId, Stream};
use serde::{Deserialize, Serialize};

pub const MANIFEST_FILE_NAME: &str = "manifest.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestPage {
    #[serde(default)]
    pub texts: Vec<TextItem>,
    #[serde(default)]
    pub images: Vec<ImageItem>,
    #[serde(default)]
    pub shapes: Vec<ShapeItem>,
    #[serde(default)]
    pub form_fields: Vec<FormFieldItem>,
    #[serde(default)]
    pub annotations: Vec<AnnotationItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportManifest {
    pub page_size: PageSize,
    pub pages: Vec<ManifestPage>,
}

impl ExportManifest {
    pub fn new(page_size: PageSize) -> Self {
        Self { page_size, pages: Vec::new() }
    }

    pub fn element_count(&self) -> usize {
        self.pages
            .iter()
            .map(|page| {
                page.texts.len()
                    + page.images.len()
                    + page.shapes.len()
                    + page.form_fields.len()
                    + page.annotations.len()
            })
            .sum()
    }

    /// Rebuilds a document with one page per manifest page.
    pub fn into_document(self) -> Document {
        let pages = self
            .pages
            .into_iter()
            .map(|page| Page {
                text_items: page.texts,
                image_items: page.images,
                shape_items: page.shapes,
                form_fields: page.form_fields,
                annotations: page.annotations,
            })
            .collect();
        Document::from_pages(pages)
    }
}

/// Adds the manifest as a document-level embedded file and returns the
/// `Names` dictionary entry for the catalog.
pub(crate) fn embed(
    doc: &mut PdfDocument,
    manifest: &ExportManifest,
) -> Result<Dictionary, ExportError> {
    let bytes = serde_json::to_vec_pretty(manifest)?;
    let size = i64::try_from(bytes.len()).unwrap_or(i64::MAX);

    let file_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "EmbeddedFile",
            "Params" => dictionary! { "Size" => size },
        },
        bytes,
    ));

    let spec_id = doc.add_object(dictionary! {
        "Type" => "Filespec",
        "F" => Object::string_literal(MANIFEST_FILE_NAME),
        "UF" => Object::string_literal(MANIFEST_FILE_NAME),
        "Desc" => Object::string_literal("Normalized element geometry for re-import"),
        "EF" => dictionary! { "F" => file_id },
    });

    Ok(dictionary! {
        "EmbeddedFiles" => dictionary! {
            "Names" => vec![Object::string_literal(MANIFEST_FILE_NAME), spec_id.into()],
        },
    })
}

fn resolve<'a>(doc: &'a PdfDocument, object: &'a Object) -> Result<&'a Object, ExportError> {
    match object {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}

fn resolve_dict<'a>(
    doc: &'a PdfDocument,
    dict: &'a Dictionary,
    key: &[u8],
) -> Result<&'a Dictionary, ExportError> {
    Ok(resolve(doc, dict.get(key)?)?.as_dict()?)
}

fn find_file_spec(doc: &PdfDocument) -> Result<Option<ObjectId>, ExportError> {
    let root = resolve(doc, doc.trailer.get(b"Root")?)?.as_dict()?;
    let Ok(names) = resolve_dict(doc, root, b"Names") else {
        return Ok(None);
    };
    let Ok(embedded) = resolve_dict(doc, names, b"EmbeddedFiles") else {
        return Ok(None);
    };
    let entries = resolve(doc, embedded.get(b"Names")?)?.as_array()?;

    for pair in entries.chunks(2) {
        let [name, spec] = pair else { continue };
        if resolve(doc, name)?.as_str().ok() == Some(MANIFEST_FILE_NAME.as_bytes()) {
            return Ok(spec.as_reference().ok());
        }
    }
    Ok(None)
}

/// Extracts and parses the embedded manifest of an exported PDF.
pub fn read_manifest(pdf_bytes: &[u8]) -> Result<ExportManifest, ExportError> {
    let doc = PdfDocument::load_mem(pdf_bytes)?;
    let spec_id = find_file_spec(&doc)?.ok_or(ExportError::MissingManifest)?;

    let spec = doc.get_dictionary(spec_id)?;
    let files = resolve_dict(&doc, spec, b"EF")?;
    let stream = resolve(&doc, files.get(b"F")?)?.as_stream()?;

    let bytes = if stream.dict.has(b"Filter") {
        stream.decompressed_content()?
    } else {
        stream.content.clone()
    };
    Ok(serde_json::from_slice(&bytes)?)
}
