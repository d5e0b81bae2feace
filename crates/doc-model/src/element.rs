use crate::coords::{NormRect, PixelRect, SurfaceSize};
use crate::serde_util::{lenient_f64, lenient_f64_opt};
use serde::{Deserialize, Serialize};

pub const DEFAULT_FONT_SIZE: f64 = 16.0;
pub const DEFAULT_FONT_FAMILY: &str = "Lato";
pub const DEFAULT_TEXT_COLOR: &str = "#000000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementKind {
    Text,
    Image,
    Shape,
    FormField,
    Annotation,
}

impl ElementKind {
    pub const ALL: [ElementKind; 5] = [
        ElementKind::Text,
        ElementKind::Image,
        ElementKind::Shape,
        ElementKind::FormField,
        ElementKind::Annotation,
    ];

    /// Stacking position used when an element has no explicit z-index.
    pub fn default_z_index(self) -> i32 {
        match self {
            ElementKind::Image => -100,
            ElementKind::Annotation => -50,
            ElementKind::Text | ElementKind::Shape => 0,
            ElementKind::FormField => 100,
        }
    }

    /// Key of the flat collection holding this kind in saved files and record stores.
    pub fn collection_key(self) -> &'static str {
        match self {
            ElementKind::Text => "textItems",
            ElementKind::Image => "imageItems",
            ElementKind::Shape => "shapeItems",
            ElementKind::FormField => "formFields",
            ElementKind::Annotation => "annotations",
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Default for Layer {
    fn default() -> Self {
        Self { z_index: None, visible: true, locked: false, name: None }
    }
}

impl Layer {
    pub fn effective_z_index(&self, kind: ElementKind) -> i32 {
        self.z_index.unwrap_or_else(|| kind.default_z_index())
    }
}

/// Last computed pixel geometry. Never serialized and ignored by equality.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelCache(Option<PixelRect>);

impl PixelCache {
    pub fn get(&self) -> Option<PixelRect> {
        self.0
    }

    pub fn set(&mut self, rect: PixelRect) {
        self.0 = Some(rect);
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }
}

impl PartialEq for PixelCache {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

/// Common surface of every placed element.
pub trait PageElement: Clone {
    const KIND: ElementKind;

    fn page_index(&self) -> usize;
    fn set_page_index(&mut self, page_index: usize);
    fn layer(&self) -> &Layer;

    /// Normalized bounding box, when the element has one.
    fn norm_rect(&self) -> Option<NormRect>;

    fn refresh_pixels(&mut self, _surface: SurfaceSize) {}

    fn z_index(&self) -> i32 {
        self.layer().effective_z_index(Self::KIND)
    }
}

/// Stable sort by effective z-index; equal values keep insertion order.
pub fn paint_order<'a, T: PageElement>(items: impl IntoIterator<Item = &'a T>) -> Vec<&'a T> {
    let mut sorted: Vec<&T> = items.into_iter().collect();
    sorted.sort_by_key(|item| item.z_index());
    sorted
}

macro_rules! page_element {
    ($ty:ty, $kind:expr) => {
        impl PageElement for $ty {
            const KIND: ElementKind = $kind;

            fn page_index(&self) -> usize {
                self.page_index
            }

            fn set_page_index(&mut self, page_index: usize) {
                self.page_index = page_index;
            }

            fn layer(&self) -> &Layer {
                &self.layer
            }

            fn norm_rect(&self) -> Option<NormRect> {
                Some(self.rect())
            }

            fn refresh_pixels(&mut self, surface: SurfaceSize) {
                let rect = self.rect().to_pixels(surface);
                self.pixels.set(rect);
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_font_size", with = "lenient_f64")]
    pub font_size: f64,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_text_color")]
    pub color: String,
    #[serde(default, with = "lenient_f64_opt", skip_serializing_if = "Option::is_none")]
    pub box_padding: Option<f64>,
    #[serde(with = "lenient_f64")]
    pub x_norm: f64,
    #[serde(with = "lenient_f64")]
    pub y_norm_top: f64,
    #[serde(default, with = "lenient_f64_opt", skip_serializing_if = "Option::is_none")]
    pub width_norm: Option<f64>,
    #[serde(default, with = "lenient_f64_opt", skip_serializing_if = "Option::is_none")]
    pub height_norm: Option<f64>,
    #[serde(rename = "index", alias = "pageIndex", alias = "page")]
    pub page_index: usize,
    #[serde(flatten)]
    pub layer: Layer,
    #[serde(skip)]
    pub pixels: PixelCache,
}

fn default_font_size() -> f64 {
    DEFAULT_FONT_SIZE
}

fn default_font_family() -> String {
    DEFAULT_FONT_FAMILY.to_owned()
}

fn default_text_color() -> String {
    DEFAULT_TEXT_COLOR.to_owned()
}

impl TextItem {
    pub fn new(text: impl Into<String>, page_index: usize, x_norm: f64, y_norm_top: f64) -> Self {
        Self {
            id: Some(uuid::Uuid::new_v4().to_string()),
            text: text.into(),
            font_size: DEFAULT_FONT_SIZE,
            font_family: default_font_family(),
            color: default_text_color(),
            box_padding: None,
            x_norm,
            y_norm_top,
            width_norm: None,
            height_norm: None,
            page_index,
            layer: Layer::default(),
            pixels: PixelCache::default(),
        }
    }

    pub fn with_font_size(mut self, font_size: f64) -> Self {
        self.font_size = font_size;
        self
    }

    /// Padding around the text box; defaults to a fifth of the font size.
    pub fn padding(&self) -> f64 {
        self.box_padding.unwrap_or_else(|| (self.font_size * 0.2).round())
    }

    fn rect(&self) -> NormRect {
        NormRect {
            x: self.x_norm,
            y_top: self.y_norm_top,
            width: self.width_norm.unwrap_or(0.0),
            height: self.height_norm.unwrap_or(0.0),
        }
    }
}

page_element!(TextItem, ElementKind::Text);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageItem {
    /// Data URI, URL or file path of the image.
    pub data: String,
    #[serde(with = "lenient_f64")]
    pub x_norm: f64,
    #[serde(with = "lenient_f64")]
    pub y_norm_top: f64,
    #[serde(with = "lenient_f64")]
    pub width_norm: f64,
    #[serde(with = "lenient_f64")]
    pub height_norm: f64,
    #[serde(rename = "index", alias = "pageIndex", alias = "page")]
    pub page_index: usize,
    #[serde(flatten)]
    pub layer: Layer,
    #[serde(skip)]
    pub pixels: PixelCache,
}

impl ImageItem {
    pub fn new(data: impl Into<String>, page_index: usize, rect: NormRect) -> Self {
        Self {
            data: data.into(),
            x_norm: rect.x,
            y_norm_top: rect.y_top,
            width_norm: rect.width,
            height_norm: rect.height,
            page_index,
            layer: Layer::default(),
            pixels: PixelCache::default(),
        }
    }

    fn rect(&self) -> NormRect {
        NormRect {
            x: self.x_norm,
            y_top: self.y_norm_top,
            width: self.width_norm,
            height: self.height_norm,
        }
    }
}

page_element!(ImageItem, ElementKind::Image);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShapeKind {
    Rectangle,
    Circle,
    Line,
    Arrow,
    Triangle,
    Diamond,
    Freehand,
}

impl ShapeKind {
    /// Open strokes never take a fill.
    pub fn is_fillable(self) -> bool {
        !matches!(self, ShapeKind::Line | ShapeKind::Arrow | ShapeKind::Freehand)
    }
}

/// Point of a freehand stroke, in normalized page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormPoint {
    #[serde(alias = "x", with = "lenient_f64")]
    pub x_norm: f64,
    #[serde(alias = "y", with = "lenient_f64")]
    pub y_norm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeItem {
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    #[serde(with = "lenient_f64")]
    pub x_norm: f64,
    #[serde(with = "lenient_f64")]
    pub y_norm_top: f64,
    #[serde(with = "lenient_f64")]
    pub width_norm: f64,
    #[serde(with = "lenient_f64")]
    pub height_norm: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<NormPoint>,
    #[serde(default = "default_stroke_color")]
    pub stroke_color: String,
    #[serde(default = "default_stroke_width", with = "lenient_f64")]
    pub stroke_width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(rename = "index", alias = "pageIndex", alias = "page")]
    pub page_index: usize,
    #[serde(flatten)]
    pub layer: Layer,
    #[serde(skip)]
    pub pixels: PixelCache,
}

fn default_stroke_color() -> String {
    "#000000".to_owned()
}

fn default_stroke_width() -> f64 {
    2.0
}

impl ShapeItem {
    pub fn new(kind: ShapeKind, page_index: usize, rect: NormRect) -> Self {
        Self {
            kind,
            x_norm: rect.x,
            y_norm_top: rect.y_top,
            width_norm: rect.width,
            height_norm: rect.height,
            points: Vec::new(),
            stroke_color: default_stroke_color(),
            stroke_width: default_stroke_width(),
            fill_color: None,
            page_index,
            layer: Layer::default(),
            pixels: PixelCache::default(),
        }
    }

    pub fn with_fill(mut self, color: impl Into<String>) -> Self {
        self.fill_color = Some(color.into());
        self
    }

    fn rect(&self) -> NormRect {
        NormRect {
            x: self.x_norm,
            y_top: self.y_norm_top,
            width: self.width_norm,
            height: self.height_norm,
        }
    }
}

page_element!(ShapeItem, ElementKind::Shape);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormFieldKind {
    TextInput,
    Textarea,
    Checkbox,
    Radio,
    Dropdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormFieldItem {
    #[serde(rename = "type")]
    pub kind: FormFieldKind,
    #[serde(with = "lenient_f64")]
    pub x_norm: f64,
    #[serde(with = "lenient_f64")]
    pub y_norm_top: f64,
    #[serde(with = "lenient_f64")]
    pub width_norm: f64,
    #[serde(with = "lenient_f64")]
    pub height_norm: f64,
    #[serde(default)]
    pub field_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(default = "default_field_font_size", with = "lenient_f64")]
    pub font_size: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default = "default_text_color")]
    pub text_color: String,
    #[serde(default = "default_background_color")]
    pub background_color: String,
    #[serde(default = "default_border_color")]
    pub border_color: String,
    #[serde(default = "default_border_width", with = "lenient_f64")]
    pub border_width: f64,
    #[serde(rename = "index", alias = "pageIndex", alias = "page")]
    pub page_index: usize,
    #[serde(flatten)]
    pub layer: Layer,
    #[serde(skip)]
    pub pixels: PixelCache,
}

fn default_field_font_size() -> f64 {
    14.0
}

fn default_background_color() -> String {
    "#ffffff".to_owned()
}

fn default_border_color() -> String {
    "#374151".to_owned()
}

fn default_border_width() -> f64 {
    1.0
}

impl FormFieldItem {
    pub fn new(
        kind: FormFieldKind,
        field_name: impl Into<String>,
        page_index: usize,
        rect: NormRect,
    ) -> Self {
        Self {
            kind,
            x_norm: rect.x,
            y_norm_top: rect.y_top,
            width_norm: rect.width,
            height_norm: rect.height,
            field_name: field_name.into(),
            label: None,
            placeholder: None,
            default_value: None,
            required: false,
            options: Vec::new(),
            group_name: None,
            font_size: default_field_font_size(),
            font_family: None,
            text_color: default_text_color(),
            background_color: default_background_color(),
            border_color: default_border_color(),
            border_width: default_border_width(),
            page_index,
            layer: Layer::default(),
            pixels: PixelCache::default(),
        }
    }

    fn rect(&self) -> NormRect {
        NormRect {
            x: self.x_norm,
            y_top: self.y_norm_top,
            width: self.width_norm,
            height: self.height_norm,
        }
    }
}

page_element!(FormFieldItem, ElementKind::FormField);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnnotationKind {
    Highlight,
    Strikethrough,
    Underline,
}

impl AnnotationKind {
    pub fn default_color(self) -> &'static str {
        match self {
            AnnotationKind::Highlight => "#FFFF00",
            AnnotationKind::Strikethrough => "#FF0000",
            AnnotationKind::Underline => "#0000FF",
        }
    }

    pub fn default_opacity(self) -> f64 {
        match self {
            AnnotationKind::Highlight => 0.4,
            AnnotationKind::Strikethrough | AnnotationKind::Underline => 1.0,
        }
    }
}

/// One line-sized piece of an annotation.
///
/// When the owning annotation is linked to a text element and the span has
/// relative offsets, its position follows that element instead of the
/// absolute `x_norm`/`y_norm_top`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationSpan {
    #[serde(with = "lenient_f64")]
    pub x_norm: f64,
    #[serde(with = "lenient_f64")]
    pub y_norm_top: f64,
    #[serde(with = "lenient_f64")]
    pub width_norm: f64,
    #[serde(with = "lenient_f64")]
    pub height_norm: f64,
    #[serde(default, with = "lenient_f64_opt", skip_serializing_if = "Option::is_none")]
    pub relative_x_norm: Option<f64>,
    #[serde(default, with = "lenient_f64_opt", skip_serializing_if = "Option::is_none")]
    pub relative_y_norm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, with = "lenient_f64_opt", skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, with = "lenient_f64_opt", skip_serializing_if = "Option::is_none")]
    pub ascent_ratio: Option<f64>,
    #[serde(default, with = "lenient_f64_opt", skip_serializing_if = "Option::is_none")]
    pub descent_ratio: Option<f64>,
}

impl AnnotationSpan {
    pub fn absolute(rect: NormRect) -> Self {
        Self {
            x_norm: rect.x,
            y_norm_top: rect.y_top,
            width_norm: rect.width,
            height_norm: rect.height,
            relative_x_norm: None,
            relative_y_norm: None,
            text: None,
            font_size: None,
            ascent_ratio: None,
            descent_ratio: None,
        }
    }

    pub fn rect(&self) -> NormRect {
        NormRect {
            x: self.x_norm,
            y_top: self.y_norm_top,
            width: self.width_norm,
            height: self.height_norm,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationItem {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    #[serde(default)]
    pub spans: Vec<AnnotationSpan>,
    pub color: String,
    #[serde(with = "lenient_f64")]
    pub opacity: f64,
    #[serde(rename = "index", alias = "pageIndex", alias = "page")]
    pub page_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotated_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_text_item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_linked_text_item_id: Option<String>,
    #[serde(flatten)]
    pub layer: Layer,
}

impl AnnotationItem {
    pub fn new(kind: AnnotationKind, page_index: usize, spans: Vec<AnnotationSpan>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            spans,
            color: kind.default_color().to_owned(),
            opacity: kind.default_opacity(),
            page_index,
            annotated_text: None,
            linked_text_item_id: None,
            last_linked_text_item_id: None,
            layer: Layer::default(),
        }
    }

    /// Span rectangles with linked offsets applied against `texts`.
    ///
    /// A missing link target falls back to each span's absolute position.
    pub fn resolved_spans(&self, texts: &[TextItem]) -> Vec<NormRect> {
        let anchor = self.linked_text_item_id.as_deref().and_then(|id| {
            texts.iter().find(|text| text.id.as_deref() == Some(id))
        });

        self.spans
            .iter()
            .map(|span| {
                let mut rect = span.rect();
                if let Some(text) = anchor {
                    if let Some(dx) = span.relative_x_norm {
                        rect.x = text.x_norm + dx;
                    }
                    if let Some(dy) = span.relative_y_norm {
                        rect.y_top = text.y_norm_top + dy;
                    }
                }
                rect
            })
            .collect()
    }
}

impl PageElement for AnnotationItem {
    const KIND: ElementKind = ElementKind::Annotation;

    fn page_index(&self) -> usize {
        self.page_index
    }

    fn set_page_index(&mut self, page_index: usize) {
        self.page_index = page_index;
    }

    fn layer(&self) -> &Layer {
        &self.layer
    }

    fn norm_rect(&self) -> Option<NormRect> {
        let mut spans = self.spans.iter().map(AnnotationSpan::rect);
        let first = spans.next()?;
        Some(spans.fold(first, |acc, rect| {
            let left = acc.x.min(rect.x);
            let top = acc.y_top.min(rect.y_top);
            let right = (acc.x + acc.width).max(rect.x + rect.width);
            let bottom = (acc.y_top + acc.height).max(rect.y_top + rect.height);
            NormRect { x: left, y_top: top, width: right - left, height: bottom - top }
        }))
    }
}

/// Any placed element, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Element {
    Text(TextItem),
    Image(ImageItem),
    Shape(ShapeItem),
    FormField(FormFieldItem),
    Annotation(AnnotationItem),
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Text(_) => ElementKind::Text,
            Element::Image(_) => ElementKind::Image,
            Element::Shape(_) => ElementKind::Shape,
            Element::FormField(_) => ElementKind::FormField,
            Element::Annotation(_) => ElementKind::Annotation,
        }
    }

    pub fn page_index(&self) -> usize {
        match self {
            Element::Text(item) => item.page_index,
            Element::Image(item) => item.page_index,
            Element::Shape(item) => item.page_index,
            Element::FormField(item) => item.page_index,
            Element::Annotation(item) => item.page_index,
        }
    }
}

impl From<TextItem> for Element {
    fn from(item: TextItem) -> Self {
        Element::Text(item)
    }
}

impl From<ImageItem> for Element {
    fn from(item: ImageItem) -> Self {
        Element::Image(item)
    }
}

impl From<ShapeItem> for Element {
    fn from(item: ShapeItem) -> Self {
        Element::Shape(item)
    }
}

impl From<FormFieldItem> for Element {
    fn from(item: FormFieldItem) -> Self {
        Element::FormField(item)
    }
}

impl From<AnnotationItem> for Element {
    fn from(item: AnnotationItem) -> Self {
        Element::Annotation(item)
    }
}
