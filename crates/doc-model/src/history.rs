use crate::element::{AnnotationItem, ImageItem, PageElement, ShapeItem, TextItem};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Immutable copy of one page's element collections, taken for undo/redo.
///
/// Text and image items are always captured. Shapes and annotations are
/// captured only when their sources are bound, and `None` means the
/// collection is left alone on write-back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub page_index: usize,
    pub text_items: Vec<TextItem>,
    pub image_items: Vec<ImageItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_items: Option<Vec<ShapeItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Vec<AnnotationItem>>,
}

impl Snapshot {
    pub fn item_count(&self) -> usize {
        self.text_items.len()
            + self.image_items.len()
            + self.shape_items.as_ref().map_or(0, Vec::len)
            + self.annotations.as_ref().map_or(0, Vec::len)
    }

    pub(crate) fn for_each_page_ref(&mut self, mut f: impl FnMut(&mut usize)) {
        f(&mut self.page_index);
        self.text_items.iter_mut().for_each(|item| touch(item, &mut f));
        self.image_items.iter_mut().for_each(|item| touch(item, &mut f));
        if let Some(shapes) = self.shape_items.as_mut() {
            shapes.iter_mut().for_each(|item| touch(item, &mut f));
        }
        if let Some(annotations) = self.annotations.as_mut() {
            annotations.iter_mut().for_each(|item| touch(item, &mut f));
        }
    }

    pub(crate) fn retain_items(&mut self, keep: impl Fn(usize) -> bool) {
        self.text_items.retain(|item| keep(item.page_index()));
        self.image_items.retain(|item| keep(item.page_index()));
        if let Some(shapes) = self.shape_items.as_mut() {
            shapes.retain(|item| keep(item.page_index()));
        }
        if let Some(annotations) = self.annotations.as_mut() {
            annotations.retain(|item| keep(item.page_index()));
        }
    }
}

fn touch<T: PageElement>(item: &mut T, f: &mut impl FnMut(&mut usize)) {
    let mut page = item.page_index();
    f(&mut page);
    item.set_page_index(page);
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageHistory {
    pub undo: Vec<Snapshot>,
    pub redo: Vec<Snapshot>,
}

impl PageHistory {
    pub fn is_empty(&self) -> bool {
        self.undo.is_empty() && self.redo.is_empty()
    }
}

/// Undo/redo stacks keyed by page index.
pub type HistoryStacks = BTreeMap<usize, PageHistory>;
