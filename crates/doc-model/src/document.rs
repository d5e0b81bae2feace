use crate::coords::SurfaceSize;
use crate::element::{
    AnnotationItem, Element, FormFieldItem, ImageItem, PageElement, ShapeItem, TextItem,
};
use crate::reindex::{insert_page_items, remove_page_items};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: usize, page_count: usize },
    #[error("a document must keep at least one page")]
    LastPage,
}

/// One page's elements, grouped by kind in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(default)]
    pub text_items: Vec<TextItem>,
    #[serde(default)]
    pub image_items: Vec<ImageItem>,
    #[serde(default, rename = "shapes", alias = "shapeItems")]
    pub shape_items: Vec<ShapeItem>,
    #[serde(default)]
    pub form_fields: Vec<FormFieldItem>,
    #[serde(default)]
    pub annotations: Vec<AnnotationItem>,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.text_items.is_empty()
            && self.image_items.is_empty()
            && self.shape_items.is_empty()
            && self.form_fields.is_empty()
            && self.annotations.is_empty()
    }

    pub fn element_count(&self) -> usize {
        self.text_items.len()
            + self.image_items.len()
            + self.shape_items.len()
            + self.form_fields.len()
            + self.annotations.len()
    }
}

/// Flat element collections without a page count, as stored on disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentParts {
    pub text_items: Vec<TextItem>,
    pub image_items: Vec<ImageItem>,
    pub shape_items: Vec<ShapeItem>,
    pub form_fields: Vec<FormFieldItem>,
    pub annotations: Vec<AnnotationItem>,
}

impl DocumentParts {
    pub fn is_empty(&self) -> bool {
        self.text_items.is_empty()
            && self.image_items.is_empty()
            && self.shape_items.is_empty()
            && self.form_fields.is_empty()
            && self.annotations.is_empty()
    }

    /// Highest page index referenced by any element.
    pub fn max_page_index(&self) -> Option<usize> {
        let texts = self.text_items.iter().map(PageElement::page_index);
        let images = self.image_items.iter().map(PageElement::page_index);
        let shapes = self.shape_items.iter().map(PageElement::page_index);
        let fields = self.form_fields.iter().map(PageElement::page_index);
        let notes = self.annotations.iter().map(PageElement::page_index);
        texts.chain(images).chain(shapes).chain(fields).chain(notes).max()
    }
}

/// The live document: flat element collections plus a page count of at least one.
///
/// Every element's page index is below `page_count`. Page-count changes go
/// through [`Document::remove_page`] and [`Document::insert_page`], which
/// reindex all collections.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    page_count: usize,
    text_items: Vec<TextItem>,
    image_items: Vec<ImageItem>,
    shape_items: Vec<ShapeItem>,
    form_fields: Vec<FormFieldItem>,
    annotations: Vec<AnnotationItem>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self::with_page_count(1)
    }

    pub fn with_page_count(page_count: usize) -> Self {
        Self {
            page_count: page_count.max(1),
            text_items: Vec::new(),
            image_items: Vec::new(),
            shape_items: Vec::new(),
            form_fields: Vec::new(),
            annotations: Vec::new(),
        }
    }

    /// Builds a document from flat collections, growing the page count to cover
    /// the highest referenced page.
    pub fn from_parts(parts: DocumentParts, page_count: usize) -> Self {
        let needed = parts.max_page_index().map_or(1, |max| max + 1);
        Self {
            page_count: page_count.max(needed).max(1),
            text_items: parts.text_items,
            image_items: parts.image_items,
            shape_items: parts.shape_items,
            form_fields: parts.form_fields,
            annotations: parts.annotations,
        }
    }

    /// Flattens pages in order. Each element takes the index of the page it sits in.
    pub fn from_pages(pages: Vec<Page>) -> Self {
        let mut document = Self::with_page_count(pages.len());
        for (index, page) in pages.into_iter().enumerate() {
            document.text_items.extend(reassign(page.text_items, index));
            document.image_items.extend(reassign(page.image_items, index));
            document.shape_items.extend(reassign(page.shape_items, index));
            document.form_fields.extend(reassign(page.form_fields, index));
            document.annotations.extend(reassign(page.annotations, index));
        }
        document
    }

    pub fn into_parts(self) -> DocumentParts {
        DocumentParts {
            text_items: self.text_items,
            image_items: self.image_items,
            shape_items: self.shape_items,
            form_fields: self.form_fields,
            annotations: self.annotations,
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn text_items(&self) -> &[TextItem] {
        &self.text_items
    }

    pub fn image_items(&self) -> &[ImageItem] {
        &self.image_items
    }

    pub fn shape_items(&self) -> &[ShapeItem] {
        &self.shape_items
    }

    pub fn form_fields(&self) -> &[FormFieldItem] {
        &self.form_fields
    }

    pub fn annotations(&self) -> &[AnnotationItem] {
        &self.annotations
    }

    pub fn set_text_items(&mut self, items: Vec<TextItem>) {
        self.text_items = items;
        self.grow_to_fit();
    }

    pub fn set_image_items(&mut self, items: Vec<ImageItem>) {
        self.image_items = items;
        self.grow_to_fit();
    }

    pub fn set_shape_items(&mut self, items: Vec<ShapeItem>) {
        self.shape_items = items;
        self.grow_to_fit();
    }

    pub fn set_annotations(&mut self, items: Vec<AnnotationItem>) {
        self.annotations = items;
        self.grow_to_fit();
    }

    pub fn set_form_fields(&mut self, items: Vec<FormFieldItem>) {
        self.form_fields = items;
        self.grow_to_fit();
    }

    pub fn page(&self, index: usize) -> Option<Page> {
        if index >= self.page_count {
            return None;
        }

        Some(Page {
            text_items: on_page(&self.text_items, index),
            image_items: on_page(&self.image_items, index),
            shape_items: on_page(&self.shape_items, index),
            form_fields: on_page(&self.form_fields, index),
            annotations: on_page(&self.annotations, index),
        })
    }

    pub fn pages(&self) -> Vec<Page> {
        let mut pages = vec![Page::default(); self.page_count];
        for item in &self.text_items {
            pages[item.page_index].text_items.push(item.clone());
        }
        for item in &self.image_items {
            pages[item.page_index].image_items.push(item.clone());
        }
        for item in &self.shape_items {
            pages[item.page_index].shape_items.push(item.clone());
        }
        for item in &self.form_fields {
            pages[item.page_index].form_fields.push(item.clone());
        }
        for item in &self.annotations {
            pages[item.page_index].annotations.push(item.clone());
        }
        pages
    }

    pub fn add(&mut self, element: impl Into<Element>) -> Result<(), DocumentError> {
        let element = element.into();
        self.check_page(element.page_index())?;

        match element {
            Element::Text(item) => self.text_items.push(item),
            Element::Image(item) => self.image_items.push(item),
            Element::Shape(item) => self.shape_items.push(item),
            Element::FormField(item) => self.form_fields.push(item),
            Element::Annotation(item) => self.annotations.push(item),
        }
        Ok(())
    }

    /// Appends an empty page and returns its index.
    pub fn push_page(&mut self) -> usize {
        self.page_count += 1;
        self.page_count - 1
    }

    /// Inserts an empty page at `at` (which may equal the page count).
    pub fn insert_page(&mut self, at: usize) -> Result<(), DocumentError> {
        if at > self.page_count {
            return Err(DocumentError::PageOutOfRange { page: at, page_count: self.page_count });
        }

        insert_page_items(&mut self.text_items, at);
        insert_page_items(&mut self.image_items, at);
        insert_page_items(&mut self.shape_items, at);
        insert_page_items(&mut self.form_fields, at);
        insert_page_items(&mut self.annotations, at);
        self.page_count += 1;
        Ok(())
    }

    pub fn remove_page(&mut self, index: usize) -> Result<(), DocumentError> {
        self.check_page(index)?;
        if self.page_count == 1 {
            return Err(DocumentError::LastPage);
        }

        remove_page_items(&mut self.text_items, index);
        remove_page_items(&mut self.image_items, index);
        remove_page_items(&mut self.shape_items, index);
        remove_page_items(&mut self.form_fields, index);
        remove_page_items(&mut self.annotations, index);
        self.page_count -= 1;
        Ok(())
    }

    /// Recomputes every element's pixel cache for a surface of the given size.
    pub fn refresh_pixel_cache(&mut self, surface: SurfaceSize) {
        self.text_items.iter_mut().for_each(|item| item.refresh_pixels(surface));
        self.image_items.iter_mut().for_each(|item| item.refresh_pixels(surface));
        self.shape_items.iter_mut().for_each(|item| item.refresh_pixels(surface));
        self.form_fields.iter_mut().for_each(|item| item.refresh_pixels(surface));
    }

    pub fn element_count(&self) -> usize {
        self.text_items.len()
            + self.image_items.len()
            + self.shape_items.len()
            + self.form_fields.len()
            + self.annotations.len()
    }

    pub fn check_page(&self, page: usize) -> Result<(), DocumentError> {
        if page >= self.page_count {
            return Err(DocumentError::PageOutOfRange { page, page_count: self.page_count });
        }
        Ok(())
    }

    fn grow_to_fit(&mut self) {
        let parts_max = [
            self.text_items.iter().map(PageElement::page_index).max(),
            self.image_items.iter().map(PageElement::page_index).max(),
            self.shape_items.iter().map(PageElement::page_index).max(),
            self.form_fields.iter().map(PageElement::page_index).max(),
            self.annotations.iter().map(PageElement::page_index).max(),
        ];
        if let Some(max) = parts_max.into_iter().flatten().max() {
            if max >= self.page_count {
                log::warn!("element references page {max}; growing document to {} pages", max + 1);
                self.page_count = max + 1;
            }
        }
    }
}

fn on_page<T: PageElement>(items: &[T], index: usize) -> Vec<T> {
    items.iter().filter(|item| item.page_index() == index).cloned().collect()
}

fn reassign<T: PageElement>(items: Vec<T>, index: usize) -> impl Iterator<Item = T> {
    items.into_iter().map(move |mut item| {
        item.set_page_index(index);
        item
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::NormRect;
    use crate::element::{ShapeKind, TextItem};

    fn text_on(page: usize) -> TextItem {
        TextItem::new(format!("p{page}"), page, 0.0, 0.0)
    }

    #[test]
    fn new_document_has_one_empty_page() {
        let doc = Document::new();
        assert_eq!(doc.page_count(), 1);
        assert!(doc.pages()[0].is_empty());
    }

    #[test]
    fn add_rejects_out_of_range_page() {
        let mut doc = Document::with_page_count(2);
        let err = doc.add(text_on(2)).expect_err("page 2 should be rejected");
        assert_eq!(err, DocumentError::PageOutOfRange { page: 2, page_count: 2 });
    }

    #[test]
    fn remove_page_reindexes_every_collection() {
        let mut doc = Document::with_page_count(3);
        for page in [0, 1, 1, 2] {
            doc.add(text_on(page)).expect("add text");
        }
        doc.add(ShapeItem::new(ShapeKind::Rectangle, 2, NormRect::default())).expect("add shape");

        doc.remove_page(1).expect("remove should succeed");

        assert_eq!(doc.page_count(), 2);
        let pages: Vec<usize> = doc.text_items().iter().map(|t| t.page_index).collect();
        assert_eq!(pages, vec![0, 1]);
        assert_eq!(doc.shape_items()[0].page_index, 1);
    }

    #[test]
    fn last_page_cannot_be_removed() {
        let mut doc = Document::new();
        assert_eq!(doc.remove_page(0), Err(DocumentError::LastPage));
        assert_eq!(
            doc.remove_page(4),
            Err(DocumentError::PageOutOfRange { page: 4, page_count: 1 })
        );
    }

    #[test]
    fn insert_page_shifts_later_pages() {
        let mut doc = Document::with_page_count(2);
        doc.add(text_on(0)).expect("add");
        doc.add(text_on(1)).expect("add");

        doc.insert_page(1).expect("insert should succeed");

        assert_eq!(doc.page_count(), 3);
        assert!(doc.page(1).expect("page 1").is_empty());
        assert_eq!(doc.page(2).expect("page 2").text_items[0].text, "p1");
        assert!(doc.insert_page(9).is_err());
    }

    #[test]
    fn pages_round_trip_through_from_pages() {
        let mut doc = Document::with_page_count(3);
        doc.add(text_on(0)).expect("add");
        doc.add(text_on(2)).expect("add");

        let rebuilt = Document::from_pages(doc.pages());
        assert_eq!(rebuilt, doc);
    }

    #[test]
    fn from_parts_grows_to_highest_page() {
        let parts = DocumentParts { text_items: vec![text_on(0), text_on(4)], ..Default::default() };
        let doc = Document::from_parts(parts, 1);
        assert_eq!(doc.page_count(), 5);
    }

    #[test]
    fn refresh_pixel_cache_uses_surface_size() {
        let mut doc = Document::new();
        doc.add(crate::element::ImageItem::new(
            "a.png",
            0,
            NormRect { x: 0.25, y_top: 0.5, width: 0.5, height: 0.25 },
        ))
        .expect("add");

        doc.refresh_pixel_cache(SurfaceSize::new(200.0, 400.0));

        let rect = doc.image_items()[0].pixels.get().expect("cache populated");
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (50.0, 200.0, 100.0, 100.0));
    }
}
