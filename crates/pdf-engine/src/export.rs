//! Document to PDF export.
//!
//! Per page: clipped content (text, images, shapes, annotations), then form
//! widgets outside the clip. Every element that cannot be emitted is skipped
//! and reported as an [`ExportWarning`]; only document-level failures abort.

use crate::assets::{prepare_image, AssetError, AssetLoader};
use crate::fonts::{BODY_FONT, HELVETICA, SYMBOL_FONT};
use crate::forms::{FormBuilder, FormError, FormFonts};
use crate::manifest::{self, ExportManifest, ManifestPage};
use crate::options::ExportOptions;
use crate::painter::{PageCanvas, PaintError};
use crate::ExportError;
use doc_model::{
    paint_order, Document, ElementKind, ImageItem, NormRect, Page, PageElement, PageSize,
};
use lopdf::{dictionary, Dictionary, Document as PdfDocument, Object, ObjectId, Stream};
use std::collections::HashMap;
use std::fmt;

/// Pixel size used for SVGs placed with a zero or invalid box.
const FALLBACK_RASTER_SIZE: (u32, u32) = (1024, 768);

const PRODUCER: &str = concat!("pagesmith ", env!("CARGO_PKG_VERSION"));

/// An element that was left out of (or altered in) the exported file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportWarning {
    pub page: usize,
    pub element: ElementKind,
    pub message: String,
}

impl fmt::Display for ExportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {}: {}: {}", self.page + 1, self.element.collection_key(), self.message)
    }
}

#[derive(Debug)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub warnings: Vec<ExportWarning>,
    pub manifest: ExportManifest,
}

#[derive(Debug, thiserror::Error)]
enum ElementFailure {
    #[error(transparent)]
    Paint(#[from] PaintError),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Asset(#[from] AssetError),
}

struct PdfWriter<'a> {
    doc: PdfDocument,
    page_size: PageSize,
    assets: &'a dyn AssetLoader,
    fonts: FormFonts,
    images: HashMap<(String, u32, u32), ObjectId>,
    warnings: Vec<ExportWarning>,
}

impl<'a> PdfWriter<'a> {
    fn new(page_size: PageSize, assets: &'a dyn AssetLoader) -> Self {
        let mut doc = PdfDocument::with_version("1.7");
        let fonts = FormFonts {
            body: doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            }),
            symbol: doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "ZapfDingbats",
            }),
        };
        Self { doc, page_size, assets, fonts, images: HashMap::new(), warnings: Vec::new() }
    }

    fn warn(&mut self, page: usize, element: ElementKind, message: impl fmt::Display) {
        log::warn!("{} on page {}: {message}", element.collection_key(), page + 1);
        self.warnings.push(ExportWarning { page, element, message: message.to_string() });
    }

    /// Pixel size an image is drawn at, used to rasterize SVG.
    fn raster_size(&self, rect: NormRect) -> (u32, u32) {
        let pixels = rect.to_pixels(self.page_size.surface());
        let (width, height) = (pixels.width.round(), pixels.height.round());
        if width >= 1.0 && height >= 1.0 && width.is_finite() && height.is_finite() {
            (width.min(f64::from(u32::MAX)) as u32, height.min(f64::from(u32::MAX)) as u32)
        } else {
            FALLBACK_RASTER_SIZE
        }
    }

    /// Loads, decodes and embeds an image; repeated references share one
    /// XObject.
    fn image_xobject(&mut self, item: &ImageItem) -> Result<ObjectId, ElementFailure> {
        let rect = item.norm_rect().unwrap_or_default();
        if ![rect.x, rect.y_top, rect.width, rect.height].iter().all(|v| v.is_finite()) {
            return Err(PaintError::NonFinite.into());
        }
        let target = self.raster_size(rect);
        let key = (item.data.clone(), target.0, target.1);
        if let Some(id) = self.images.get(&key) {
            return Ok(*id);
        }

        let bytes = self.assets.load(&item.data)?;
        let image = prepare_image(&item.data, &bytes, target)?;

        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(image.width),
            "Height" => i64::from(image.height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        };
        if let Some(alpha) = image.alpha {
            let mask = self.doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => i64::from(image.width),
                    "Height" => i64::from(image.height),
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                },
                alpha,
            ));
            dict.set("SMask", mask);
        }
        let id = self.doc.add_object(Stream::new(dict, image.rgb));
        self.images.insert(key, id);
        Ok(id)
    }

    fn write_page(
        &mut self,
        index: usize,
        page: &Page,
        parent: ObjectId,
        forms: &mut FormBuilder,
    ) -> Result<(ObjectId, ManifestPage), ExportError> {
        let page_id = self.doc.new_object_id();
        let mut canvas = PageCanvas::new(self.page_size);
        let mut xobjects = Dictionary::new();
        let mut emitted = ManifestPage::default();

        canvas.push_clip();

        for text in paint_order(page.text_items.iter().filter(|t| t.layer.visible)) {
            if text.text.is_empty() {
                continue;
            }
            match canvas.text(text, &HELVETICA) {
                Ok(lossy) => {
                    if lossy {
                        self.warn(
                            index,
                            ElementKind::Text,
                            "characters outside WinAnsi were replaced with '?'",
                        );
                    }
                    emitted.texts.push(text.clone());
                }
                Err(err) => self.warn(index, ElementKind::Text, format!("skipped: {err}")),
            }
        }

        for image in paint_order(page.image_items.iter().filter(|i| i.layer.visible)) {
            let drawn = self.image_xobject(image).and_then(|id| {
                let name = format!("Im{}", id.0);
                canvas.image(&name, image.norm_rect().unwrap_or_default())?;
                xobjects.set(name, id);
                Ok(())
            });
            match drawn {
                Ok(()) => emitted.images.push(image.clone()),
                Err(err) => self.warn(index, ElementKind::Image, format!("skipped: {err}")),
            }
        }

        for shape in paint_order(page.shape_items.iter().filter(|s| s.layer.visible)) {
            match canvas.shape(shape) {
                Ok(()) => emitted.shapes.push(shape.clone()),
                Err(err) => self.warn(index, ElementKind::Shape, format!("skipped: {err}")),
            }
        }

        for annotation in paint_order(page.annotations.iter().filter(|a| a.layer.visible)) {
            if annotation.spans.is_empty() {
                self.warn(index, ElementKind::Annotation, "skipped: annotation has no spans");
                continue;
            }
            let spans = annotation.resolved_spans(&page.text_items);
            match canvas.annotation(annotation, &spans) {
                Ok(()) => emitted.annotations.push(annotation.clone()),
                Err(err) => self.warn(index, ElementKind::Annotation, format!("skipped: {err}")),
            }
        }

        canvas.pop_clip();

        let mut annots = Vec::new();
        for field in paint_order(page.form_fields.iter().filter(|f| f.layer.visible)) {
            match forms.add(&mut self.doc, page_id, field) {
                Ok(widget) => {
                    annots.push(Object::Reference(widget));
                    emitted.form_fields.push(field.clone());
                }
                Err(err) => self.warn(index, ElementKind::FormField, format!("skipped: {err}")),
            }
        }

        let mut states = Dictionary::new();
        for (name, alpha) in canvas.opacity_states() {
            states.set(
                name.as_str(),
                dictionary! {
                    "Type" => "ExtGState",
                    "ca" => Object::Real(*alpha as f32),
                    "CA" => Object::Real(*alpha as f32),
                },
            );
        }

        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), canvas.encode()?));
        let mut resources = dictionary! {
            "Font" => dictionary! {
                BODY_FONT => self.fonts.body,
                SYMBOL_FONT => self.fonts.symbol,
            },
        };
        if !xobjects.is_empty() {
            resources.set("XObject", xobjects);
        }
        if !states.is_empty() {
            resources.set("ExtGState", states);
        }

        let mut page_dict = dictionary! {
            "Type" => "Page",
            "Parent" => parent,
            "MediaBox" => vec![
                Object::Real(0.0),
                Object::Real(0.0),
                Object::Real(self.page_size.width as f32),
                Object::Real(self.page_size.height as f32),
            ],
            "Contents" => content_id,
            "Resources" => resources,
        };
        if !annots.is_empty() {
            page_dict.set("Annots", annots);
        }
        self.doc.set_object(page_id, page_dict);
        Ok((page_id, emitted))
    }
}

/// Exports `document` to PDF bytes.
///
/// Only emitted elements are recorded in the returned manifest (and in the
/// attachment, when enabled).
pub fn export_document(
    document: &Document,
    options: &ExportOptions,
    assets: &dyn AssetLoader,
) -> Result<ExportArtifact, ExportError> {
    let PageSize { width, height } = options.page_size;
    if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
        return Err(ExportError::InvalidPageSize { width, height });
    }

    let mut writer = PdfWriter::new(options.page_size, assets);
    let mut forms = FormBuilder::new(writer.fonts, options.page_size);
    let mut manifest = ExportManifest::new(options.page_size);
    let pages_id = writer.doc.new_object_id();

    let mut kids = Vec::new();
    for (index, page) in document.pages().iter().enumerate() {
        let (page_id, emitted) = writer.write_page(index, page, pages_id, &mut forms)?;
        kids.push(Object::Reference(page_id));
        manifest.pages.push(emitted);
    }

    let page_count = i64::try_from(kids.len()).unwrap_or(i64::MAX);
    writer.doc.set_object(
        pages_id,
        dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
        },
    );

    let mut catalog = dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    };
    if let Some(acroform) = forms.finish(&mut writer.doc) {
        catalog.set("AcroForm", acroform);
    }
    if options.embed_manifest {
        catalog.set("Names", manifest::embed(&mut writer.doc, &manifest)?);
    }
    let catalog_id = writer.doc.add_object(catalog);
    writer.doc.trailer.set("Root", catalog_id);

    let mut info = dictionary! { "Producer" => Object::string_literal(PRODUCER) };
    if let Some(title) = &options.title {
        info.set("Title", Object::string_literal(title.as_str()));
    }
    let info_id = writer.doc.add_object(info);
    writer.doc.trailer.set("Info", info_id);

    writer.doc.compress();
    let mut bytes = Vec::new();
    writer.doc.save_to(&mut bytes)?;

    log::info!(
        "exported {} page(s), {} element(s), {} warning(s)",
        manifest.pages.len(),
        manifest.element_count(),
        writer.warnings.len()
    );
    Ok(ExportArtifact { bytes, warnings: writer.warnings, manifest })
}
