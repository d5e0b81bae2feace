//! Saved-file encoding, verification and self-healing decoding.
//!
//! Encoding is a fixed pipeline: build the payload, hash it canonically,
//! render it with a blank raw checksum, hash that exact text, then render the
//! final text with both checksums filled in.

use crate::checksum::{
    blank_raw_checksum, canonical_checksum_of_value, compute_canonical_checksum,
    compute_raw_checksum, CHECKSUM_KEY, CHECKSUM_RAW_KEY,
};
use chrono::{DateTime, SecondsFormat, Utc};
use doc_model::{
    AnnotationItem, Document, DocumentParts, FormFieldItem, ImageItem, Page, ShapeItem, TextItem,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const DOCUMENT_VERSION: u32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("invalid JSON: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("serialization error: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("checksum verification failed: {0}")]
    Rejected(VerifyFailure),
}

/// On-disk representation of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedDocument {
    pub version: u32,
    pub saved_at: String,
    pub pages: Vec<Page>,
    pub text_items: Vec<TextItem>,
    pub image_items: Vec<ImageItem>,
    pub shape_items: Vec<ShapeItem>,
    pub form_fields: Vec<FormFieldItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<AnnotationItem>,
    #[serde(default)]
    pub checksum: String,
    #[serde(default)]
    pub checksum_raw: String,
}

impl PersistedDocument {
    pub fn from_document(document: &Document, saved_at: DateTime<Utc>) -> Self {
        Self {
            version: DOCUMENT_VERSION,
            saved_at: format_saved_at(saved_at),
            pages: document.pages(),
            text_items: document.text_items().to_vec(),
            image_items: document.image_items().to_vec(),
            shape_items: document.shape_items().to_vec(),
            form_fields: document.form_fields().to_vec(),
            annotations: document.annotations().to_vec(),
            checksum: String::new(),
            checksum_raw: String::new(),
        }
    }
}

pub fn format_saved_at(saved_at: DateTime<Utc>) -> String {
    saved_at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedDocument {
    pub text: String,
    pub checksum: String,
    pub checksum_raw: String,
}

fn render(document: &PersistedDocument) -> Result<String, CodecError> {
    serde_json::to_string_pretty(document).map_err(CodecError::Serialize)
}

pub fn encode(document: &Document, saved_at: DateTime<Utc>) -> Result<EncodedDocument, CodecError> {
    let mut persisted = PersistedDocument::from_document(document, saved_at);

    let checksum = compute_canonical_checksum(&persisted).map_err(CodecError::Serialize)?;
    persisted.checksum = checksum.clone();

    let blank = render(&persisted)?;
    let checksum_raw = compute_raw_checksum(&blank);
    persisted.checksum_raw = checksum_raw.clone();

    let text = render(&persisted)?;
    log::debug!(
        "encoded document: {} pages, {} elements, {} bytes",
        document.page_count(),
        document.element_count(),
        text.len()
    );

    Ok(EncodedDocument { text, checksum, checksum_raw })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerifyFailure {
    Parse,
    RawMissing,
    CanonMissing,
    RawMismatch,
    CanonMismatch,
}

impl VerifyFailure {
    pub fn as_str(self) -> &'static str {
        match self {
            VerifyFailure::Parse => "parse",
            VerifyFailure::RawMissing => "raw-missing",
            VerifyFailure::CanonMissing => "canon-missing",
            VerifyFailure::RawMismatch => "raw-mismatch",
            VerifyFailure::CanonMismatch => "canon-mismatch",
        }
    }
}

impl fmt::Display for VerifyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub ok: bool,
    pub ok_raw: bool,
    pub ok_canon: bool,
    pub failure: Option<VerifyFailure>,
    pub expected_raw: Option<String>,
    pub actual_raw: Option<String>,
    pub expected_canon: Option<String>,
    pub actual_canon: Option<String>,
}

impl VerificationReport {
    fn failed(failure: VerifyFailure) -> Self {
        Self { failure: Some(failure), ..Self::default() }
    }
}

/// Checks both checksums of a saved file. Never fails; problems are reported.
///
/// A file holding the document JSON as a string is unwrapped once, the same
/// way [`decode`] reads it.
pub fn verify(text: &str) -> VerificationReport {
    let parsed: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => return VerificationReport::failed(VerifyFailure::Parse),
    };

    if let Value::String(inner) = &parsed {
        if let Ok(unwrapped) = serde_json::from_str::<Value>(inner) {
            return verify_parsed(inner, &unwrapped);
        }
    }
    verify_parsed(text, &parsed)
}

fn verify_parsed(text: &str, parsed: &Value) -> VerificationReport {
    let Some(expected_raw) = parsed.get(CHECKSUM_RAW_KEY).and_then(Value::as_str) else {
        return VerificationReport::failed(VerifyFailure::RawMissing);
    };
    let actual_raw = compute_raw_checksum(&blank_raw_checksum(text));
    let ok_raw = expected_raw == actual_raw;

    let Some(expected_canon) = parsed.get(CHECKSUM_KEY).and_then(Value::as_str) else {
        return VerificationReport {
            ok_raw,
            expected_raw: Some(expected_raw.to_owned()),
            actual_raw: Some(actual_raw),
            ..VerificationReport::failed(VerifyFailure::CanonMissing)
        };
    };
    let actual_canon = canonical_checksum_of_value(parsed);
    let ok_canon = expected_canon == actual_canon;

    let failure = if !ok_raw {
        Some(VerifyFailure::RawMismatch)
    } else if !ok_canon {
        Some(VerifyFailure::CanonMismatch)
    } else {
        None
    };

    VerificationReport {
        ok: ok_raw && ok_canon,
        ok_raw,
        ok_canon,
        failure,
        expected_raw: Some(expected_raw.to_owned()),
        actual_raw: Some(actual_raw),
        expected_canon: Some(expected_canon.to_owned()),
        actual_canon: Some(actual_canon),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedDocument {
    pub document: Document,
    pub version: Option<u64>,
    pub saved_at: Option<String>,
    /// Pages were missing or malformed and were rebuilt from flat items.
    pub rebuilt_pages: bool,
    /// Elements dropped because they could not be read.
    pub skipped: usize,
}

/// Parses text that may be plain JSON or JSON encoded twice as a string.
fn safe_parse(text: &str) -> Result<Value, CodecError> {
    let first: Value = serde_json::from_str(text).map_err(CodecError::Parse)?;
    if let Value::String(inner) = &first {
        if let Ok(second) = serde_json::from_str::<Value>(inner) {
            log::debug!("decoded double-encoded document");
            return Ok(second);
        }
    }
    Ok(first)
}

/// Page keys in the order they are resolved; the first numeric one wins.
const PAGE_KEYS: [&str; 3] = ["index", "page", "pageIndex"];

/// Collapses an item's page reference onto `index`. Items whose winning key
/// is not a non-negative integer, or that carry none, are placed on page 0.
fn normalize_page_key(item: &mut serde_json::Map<String, Value>) {
    let page = PAGE_KEYS
        .iter()
        .find_map(|key| item.get(*key).filter(|value| value.is_number()))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    for key in PAGE_KEYS {
        item.remove(key);
    }
    item.insert("index".to_owned(), Value::from(page));
}

/// Reads every element of an array, skipping the ones that do not parse.
fn read_items<T: DeserializeOwned>(
    value: Option<&Value>,
    label: &str,
    skipped: &mut usize,
) -> Vec<T> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let mut item = item.clone();
            if let Value::Object(map) = &mut item {
                normalize_page_key(map);
            }

            match serde_json::from_value(item) {
                Ok(parsed) => Some(parsed),
                Err(err) => {
                    log::warn!("skipping unreadable {label} entry: {err}");
                    *skipped += 1;
                    None
                }
            }
        })
        .collect()
}

fn is_page_shape(page: &Value) -> bool {
    page.get("textItems").is_some_and(Value::is_array)
        && page.get("imageItems").is_some_and(Value::is_array)
}

fn read_page(page: &Value, skipped: &mut usize) -> Page {
    let shapes = page.get("shapes").or_else(|| page.get("shapeItems"));
    Page {
        text_items: read_items(page.get("textItems"), "page text", skipped),
        image_items: read_items(page.get("imageItems"), "page image", skipped),
        shape_items: read_items(shapes, "page shape", skipped),
        form_fields: read_items(page.get("formFields"), "page form field", skipped),
        annotations: read_items(page.get("annotations"), "page annotation", skipped),
    }
}

/// Rebuilds a valid document from whatever the payload carries.
///
/// Flat item arrays are the source of truth. When `pages` is well formed it
/// sets the minimum page count, and any kind whose flat array is empty is
/// lifted out of the pages instead. When `pages` is missing or malformed the
/// page count is derived from the highest item page index, with a single
/// empty page as the floor.
pub fn decode(text: &str) -> Result<DecodedDocument, CodecError> {
    Ok(decode_value(&safe_parse(text)?))
}

/// Self-healing reconstruction from an already parsed payload.
pub fn decode_value(payload: &Value) -> DecodedDocument {
    if !payload.is_object() {
        log::warn!("document payload is not an object; starting from an empty document");
    }

    let mut skipped = 0;
    let shapes = payload.get("shapeItems").or_else(|| payload.get("shapes"));
    let mut parts = DocumentParts {
        text_items: read_items(payload.get("textItems"), "text", &mut skipped),
        image_items: read_items(payload.get("imageItems"), "image", &mut skipped),
        shape_items: read_items(shapes, "shape", &mut skipped),
        form_fields: read_items(payload.get("formFields"), "form field", &mut skipped),
        annotations: read_items(payload.get("annotations"), "annotation", &mut skipped),
    };

    let well_formed_pages = match payload.get("pages") {
        Some(Value::Array(pages)) if !pages.is_empty() && pages.iter().all(is_page_shape) => {
            Some(pages)
        }
        _ => None,
    };

    let rebuilt_pages = well_formed_pages.is_none();
    let page_count = match well_formed_pages {
        Some(pages) => {
            let read: Vec<Page> = pages.iter().map(|page| read_page(page, &mut skipped)).collect();
            let from_pages = Document::from_pages(read).into_parts();
            lift_missing(&mut parts, from_pages);
            pages.len()
        }
        None => {
            log::info!("pages missing or malformed; rebuilding from flat items");
            1
        }
    };

    let version = payload.get("version").and_then(Value::as_u64);
    if version.is_some_and(|v| v > u64::from(DOCUMENT_VERSION)) {
        log::warn!("document version {version:?} is newer than supported {DOCUMENT_VERSION}");
    }

    DecodedDocument {
        document: Document::from_parts(parts, page_count),
        version,
        saved_at: payload.get("savedAt").and_then(Value::as_str).map(str::to_owned),
        rebuilt_pages,
        skipped,
    }
}

fn lift_missing(parts: &mut DocumentParts, from_pages: DocumentParts) {
    if parts.text_items.is_empty() {
        parts.text_items = from_pages.text_items;
    }
    if parts.image_items.is_empty() {
        parts.image_items = from_pages.image_items;
    }
    if parts.shape_items.is_empty() {
        parts.shape_items = from_pages.shape_items;
    }
    if parts.form_fields.is_empty() {
        parts.form_fields = from_pages.form_fields;
    }
    if parts.annotations.is_empty() {
        parts.annotations = from_pages.annotations;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportPolicy {
    /// Any verification failure aborts the import.
    #[default]
    Strict,
    /// Verification is reported but never blocks the import.
    AllowMismatch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutcome {
    pub decoded: DecodedDocument,
    pub report: VerificationReport,
}

pub fn import(text: &str, policy: ImportPolicy) -> Result<ImportOutcome, CodecError> {
    let report = verify(text);

    if let Some(failure) = report.failure {
        match policy {
            ImportPolicy::Strict => return Err(CodecError::Rejected(failure)),
            ImportPolicy::AllowMismatch => {
                log::warn!("importing document despite failed verification: {failure}");
            }
        }
    }

    let decoded = decode(text)?;
    Ok(ImportOutcome { decoded, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use doc_model::{
        AnnotationKind, AnnotationSpan, FormFieldKind, NormRect, ShapeKind, TextItem,
    };

    fn saved_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 15, 9, 26).single().expect("valid timestamp")
    }

    fn rect(x: f64, y_top: f64, width: f64, height: f64) -> NormRect {
        NormRect { x, y_top, width, height }
    }

    fn sample_document() -> Document {
        let mut doc = Document::with_page_count(3);
        doc.add(TextItem::new("Invoice", 0, 0.1, 0.05).with_font_size(24.0)).expect("text");
        doc.add(TextItem::new("Footer", 2, 0.1, 0.95)).expect("text");
        doc.add(ImageItem::new("data:image/png;base64,iVBORw0KGgo=", 0, rect(0.6, 0.05, 0.3, 0.1)))
            .expect("image");
        let banner = ShapeItem::new(ShapeKind::Rectangle, 1, rect(-0.1, 0.2, 1.3, 0.1));
        doc.add(banner.with_fill("#eeeeee")).expect("shape");

        let mut field =
            FormFieldItem::new(FormFieldKind::Dropdown, "country", 1, rect(0.1, 0.5, 0.3, 0.04));
        field.options = vec!["NZ".to_owned(), "AU".to_owned()];
        doc.add(field).expect("field");

        doc.add(AnnotationItem::new(
            AnnotationKind::Underline,
            0,
            vec![AnnotationSpan::absolute(rect(0.1, 0.05, 0.2, 0.03))],
        ))
        .expect("annotation");
        doc
    }

    #[test]
    fn encode_then_decode_round_trips() {
        let doc = sample_document();
        let encoded = encode(&doc, saved_at()).expect("encode");

        let decoded = decode(&encoded.text).expect("decode");
        assert_eq!(decoded.document, doc);
        assert_eq!(decoded.version, Some(2));
        assert_eq!(decoded.saved_at.as_deref(), Some("2025-03-14T15:09:26.000Z"));
        assert!(!decoded.rebuilt_pages);
        assert_eq!(decoded.skipped, 0);
    }

    #[test]
    fn encoded_text_verifies() {
        let encoded = encode(&sample_document(), saved_at()).expect("encode");
        let report = verify(&encoded.text);

        assert!(report.ok, "{report:?}");
        assert_eq!(report.failure, None);
        assert_eq!(report.actual_raw.as_deref(), Some(encoded.checksum_raw.as_str()));
        assert_eq!(report.actual_canon.as_deref(), Some(encoded.checksum.as_str()));
    }

    #[test]
    fn canonical_checksum_is_deterministic() {
        let doc = sample_document();
        let first = encode(&doc, saved_at()).expect("encode");
        let second = encode(&doc, saved_at()).expect("encode");
        assert_eq!(first, second);
    }

    #[test]
    fn whitespace_edit_breaks_only_raw_checksum() {
        let encoded = encode(&sample_document(), saved_at()).expect("encode");
        let edited = encoded.text.replacen("\n", "\n ", 3);

        let report = verify(&edited);
        assert!(!report.ok);
        assert!(!report.ok_raw);
        assert!(report.ok_canon);
        assert_eq!(report.failure, Some(VerifyFailure::RawMismatch));
    }

    #[test]
    fn key_reorder_breaks_only_raw_checksum() {
        let encoded = encode(&Document::new(), saved_at()).expect("encode");
        let value: Value = serde_json::from_str(&encoded.text).expect("json");
        let mut map = value.as_object().cloned().expect("object payload");
        let version = map.remove("version").expect("version present");
        map.insert("version".to_owned(), version);

        let reordered = serde_json::to_string_pretty(&map).expect("render");
        assert_ne!(reordered, encoded.text);

        let report = verify(&reordered);
        assert!(!report.ok_raw);
        assert!(report.ok_canon);
    }

    #[test]
    fn numeric_edit_breaks_canonical_checksum() {
        let mut doc = Document::new();
        doc.add(TextItem::new("a", 0, 0.25, 0.5)).expect("text");
        let encoded = encode(&doc, saved_at()).expect("encode");

        let edited = encoded.text.replace("0.25", "0.26");
        let report = verify(&edited);
        assert!(!report.ok_canon);
        assert!(!report.ok_raw);
    }

    #[test]
    fn verify_reports_missing_fields_and_parse_errors() {
        assert_eq!(verify("{not json").failure, Some(VerifyFailure::Parse));
        assert_eq!(verify(r#"{"checksum":"x"}"#).failure, Some(VerifyFailure::RawMissing));

        let report = verify(r#"{"checksumRaw":""}"#);
        assert_eq!(report.failure, Some(VerifyFailure::CanonMissing));
        assert!(!report.ok);
    }

    #[test]
    fn flat_items_without_pages_rebuild_page_structure() {
        let text = r#"{
            "textItems": [
                {"text": "a", "xNorm": 0.1, "yNormTop": 0.1, "index": 0},
                {"text": "b", "xNorm": 0.2, "yNormTop": 0.2, "index": 0}
            ],
            "imageItems": [
                {"data": "x.png", "xNorm": 0, "yNormTop": 0,
                 "widthNorm": 0.5, "heightNorm": 0.5, "index": 2}
            ]
        }"#;

        let decoded = decode(text).expect("decode");
        let pages = decoded.document.pages();

        assert!(decoded.rebuilt_pages);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].text_items.len(), 2);
        assert!(pages[1].is_empty());
        assert_eq!(pages[2].image_items.len(), 1);
    }

    #[test]
    fn empty_payload_yields_single_empty_page() {
        let decoded = decode("{}").expect("decode");
        assert_eq!(decoded.document.page_count(), 1);
        assert_eq!(decoded.document.element_count(), 0);
    }

    #[test]
    fn malformed_pages_are_ignored() {
        let text = r#"{
            "pages": [{"textItems": []}, {"imageItems": []}],
            "textItems": [{"text": "only", "xNorm": 0, "yNormTop": 0, "index": 1}]
        }"#;

        let decoded = decode(text).expect("decode");
        assert!(decoded.rebuilt_pages);
        assert_eq!(decoded.document.page_count(), 2);
    }

    #[test]
    fn items_are_lifted_from_pages_when_flat_arrays_are_empty() {
        let text = r#"{
            "pages": [
                {"textItems": [], "imageItems": []},
                {"textItems": [{"text": "lifted", "xNorm": 0.5, "yNormTop": 0.5, "index": 7}],
                 "imageItems": []}
            ],
            "textItems": [],
            "imageItems": []
        }"#;

        let decoded = decode(text).expect("decode");
        let texts = decoded.document.text_items();
        assert_eq!(decoded.document.page_count(), 2);
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].page_index, 1);
    }

    #[test]
    fn double_encoded_json_is_accepted() {
        let inner = r#"{"textItems":[{"text":"x","xNorm":0,"yNormTop":0,"index":0}]}"#;
        let outer = serde_json::to_string(inner).expect("encode string");

        let decoded = decode(&outer).expect("decode");
        assert_eq!(decoded.document.text_items().len(), 1);
    }

    #[test]
    fn unreadable_items_are_skipped_and_missing_pages_default_to_zero() {
        let text = r#"{
            "textItems": [
                {"text": "no page", "xNorm": 0.1, "yNormTop": 0.1},
                {"text": "bad", "xNorm": "wide", "yNormTop": 0.1, "index": 0},
                {"text": "negative", "xNorm": 0.1, "yNormTop": 0.1, "index": -1}
            ]
        }"#;

        let decoded = decode(text).expect("decode");
        let texts = decoded.document.text_items();
        assert_eq!(decoded.skipped, 1);
        assert_eq!(texts.len(), 2);
        assert!(texts.iter().all(|t| t.page_index == 0));
    }

    #[test]
    fn freehand_points_accept_short_keys() {
        let text = r#"{
            "shapeItems": [{
                "type": "freehand",
                "xNorm": 0.1, "yNormTop": 0.1, "widthNorm": 0.1, "heightNorm": 0.2,
                "points": [{"x": 0.1, "y": 0.1}, {"x": 0.2, "y": 0.3}],
                "index": 0
            }]
        }"#;

        let outcome = import(text, ImportPolicy::AllowMismatch).expect("import");
        let shapes = outcome.decoded.document.shape_items();
        assert_eq!(outcome.decoded.skipped, 0);
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].points.len(), 2);
        assert_eq!(shapes[0].points[1].x_norm, 0.2);
        assert_eq!(shapes[0].points[1].y_norm, 0.3);
    }

    #[test]
    fn first_page_key_wins_when_several_are_present() {
        let text = r#"{
            "textItems": [
                {"text": "a", "xNorm": 0.1, "yNormTop": 0.1, "index": 1, "pageIndex": 1},
                {"text": "b", "xNorm": 0.1, "yNormTop": 0.1, "pageIndex": 0, "page": 2},
                {"text": "c", "xNorm": 0.1, "yNormTop": 0.1, "index": "x", "pageIndex": 1}
            ]
        }"#;

        let decoded = decode(text).expect("decode");
        let pages: Vec<usize> =
            decoded.document.text_items().iter().map(|t| t.page_index).collect();
        assert_eq!(decoded.skipped, 0);
        assert_eq!(pages, [1, 2, 1]);
        assert_eq!(decoded.document.page_count(), 3);
    }

    #[test]
    fn double_encoded_file_verifies_and_imports_strictly() {
        let encoded = encode(&sample_document(), saved_at()).expect("encode");
        let wrapped = serde_json::to_string(&encoded.text).expect("encode string");

        let report = verify(&wrapped);
        assert!(report.ok, "{report:?}");

        let outcome = import(&wrapped, ImportPolicy::Strict).expect("strict import");
        assert_eq!(outcome.decoded.document, sample_document());
    }

    #[test]
    fn hard_parse_failure_is_terminal() {
        assert!(matches!(decode("{oops"), Err(CodecError::Parse(_))));
    }

    #[test]
    fn non_finite_coordinates_survive_round_trip() {
        let mut doc = Document::new();
        doc.add(TextItem::new("edge", 0, f64::NAN, f64::INFINITY)).expect("text");

        let encoded = encode(&doc, saved_at()).expect("encode");
        assert!(encoded.text.contains("\"NaN\""));
        assert!(verify(&encoded.text).ok);

        let decoded = decode(&encoded.text).expect("decode");
        let text = &decoded.document.text_items()[0];
        assert!(text.x_norm.is_nan());
        assert_eq!(text.y_norm_top, f64::INFINITY);
    }

    #[test]
    fn strict_import_rejects_tampered_file() {
        let encoded = encode(&sample_document(), saved_at()).expect("encode");
        let tampered = encoded.text.replace("Invoice", "Invoiced");

        let err = import(&tampered, ImportPolicy::Strict).expect_err("strict import should fail");
        assert!(matches!(err, CodecError::Rejected(VerifyFailure::RawMismatch)));

        let outcome = import(&tampered, ImportPolicy::AllowMismatch).expect("override proceeds");
        assert!(!outcome.report.ok);
        assert_eq!(outcome.decoded.document.text_items()[0].text, "Invoiced");
    }

    proptest::proptest! {
        #[test]
        fn freshly_encoded_documents_always_verify(
            text in ".{0,40}",
            page in 0usize..4,
            x in -2.0f64..2.0,
            y in -2.0f64..2.0,
        ) {
            let mut doc = Document::with_page_count(4);
            doc.add(TextItem::new(text.clone(), page, x, y)).expect("text");

            let encoded = encode(&doc, saved_at()).expect("encode");
            let report = verify(&encoded.text);
            proptest::prop_assert!(report.ok, "{:?}", report.failure);

            let decoded = decode(&encoded.text).expect("decode");
            proptest::prop_assert_eq!(&decoded.document.text_items()[0].text, &text);
            proptest::prop_assert_eq!(decoded.document.text_items()[0].x_norm, x);
        }
    }
}
