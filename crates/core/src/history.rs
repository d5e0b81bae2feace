//! Per-page undo/redo over element collections owned elsewhere.
//!
//! The manager never holds references into live collections. It reads and
//! writes them through accessors registered with [`HistoryManager::bind_sources`]
//! (and optionally [`HistoryManager::bind_shapes`] /
//! [`HistoryManager::bind_annotations`]), and keeps deep copies on its stacks.
//! Rebinding replaces the accessors and leaves the stacks alone.

use doc_model::reindex::{remap_stacks_after_insertion, remap_stacks_after_removal};
use doc_model::{
    AnnotationItem, Document, HistoryStacks, ImageItem, PageElement, PageHistory, ShapeItem,
    Snapshot, TextItem,
};
use std::cell::RefCell;
use std::rc::Rc;

pub const DEFAULT_MAX_DEPTH: usize = 100;

type Getter<T> = Box<dyn Fn() -> Vec<T>>;
type Setter<T> = Box<dyn FnMut(Vec<T>)>;

struct Accessors<T> {
    get: Getter<T>,
    set: Setter<T>,
}

impl<T: PageElement> Accessors<T> {
    fn new(get: impl Fn() -> Vec<T> + 'static, set: impl FnMut(Vec<T>) + 'static) -> Self {
        Self { get: Box::new(get), set: Box::new(set) }
    }

    fn page_slice(&self, page: usize) -> Vec<T> {
        (self.get)().into_iter().filter(|item| item.page_index() == page).collect()
    }

    /// Replaces exactly `page`'s items, keeping every other page's items in place.
    fn write_back(&mut self, page: usize, items: Vec<T>) {
        let mut all: Vec<T> =
            (self.get)().into_iter().filter(|item| item.page_index() != page).collect();
        all.extend(items);
        (self.set)(all);
    }
}

fn bound<'a, T>(accessors: &'a Option<Accessors<T>>, what: &str) -> &'a Accessors<T> {
    match accessors {
        Some(accessors) => accessors,
        None => panic!("history {what} sources used before bind_sources"),
    }
}

fn bound_mut<'a, T>(accessors: &'a mut Option<Accessors<T>>, what: &str) -> &'a mut Accessors<T> {
    match accessors {
        Some(accessors) => accessors,
        None => panic!("history {what} sources used before bind_sources"),
    }
}

pub struct HistoryManager {
    stacks: HistoryStacks,
    max_depth: usize,
    texts: Option<Accessors<TextItem>>,
    images: Option<Accessors<ImageItem>>,
    shapes: Option<Accessors<ShapeItem>>,
    annotations: Option<Accessors<AnnotationItem>>,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HistoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryManager")
            .field("pages", &self.stacks.len())
            .field("max_depth", &self.max_depth)
            .field("bound", &self.is_bound())
            .finish()
    }
}

impl HistoryManager {
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            stacks: HistoryStacks::new(),
            max_depth: max_depth.max(1),
            texts: None,
            images: None,
            shapes: None,
            annotations: None,
        }
    }

    pub fn bind_sources(
        &mut self,
        get_text: impl Fn() -> Vec<TextItem> + 'static,
        get_images: impl Fn() -> Vec<ImageItem> + 'static,
        set_text: impl FnMut(Vec<TextItem>) + 'static,
        set_images: impl FnMut(Vec<ImageItem>) + 'static,
    ) {
        self.texts = Some(Accessors::new(get_text, set_text));
        self.images = Some(Accessors::new(get_images, set_images));
    }

    pub fn bind_shapes(
        &mut self,
        get: impl Fn() -> Vec<ShapeItem> + 'static,
        set: impl FnMut(Vec<ShapeItem>) + 'static,
    ) {
        self.shapes = Some(Accessors::new(get, set));
    }

    pub fn bind_annotations(
        &mut self,
        get: impl Fn() -> Vec<AnnotationItem> + 'static,
        set: impl FnMut(Vec<AnnotationItem>) + 'static,
    ) {
        self.annotations = Some(Accessors::new(get, set));
    }

    /// Binds every collection of a shared document.
    pub fn bind_document(&mut self, document: &Rc<RefCell<Document>>) {
        let (get_text, set_text) = (Rc::clone(document), Rc::clone(document));
        let (get_images, set_images) = (Rc::clone(document), Rc::clone(document));
        self.bind_sources(
            move || get_text.borrow().text_items().to_vec(),
            move || get_images.borrow().image_items().to_vec(),
            move |items| set_text.borrow_mut().set_text_items(items),
            move |items| set_images.borrow_mut().set_image_items(items),
        );

        let (get, set) = (Rc::clone(document), Rc::clone(document));
        self.bind_shapes(
            move || get.borrow().shape_items().to_vec(),
            move |items| set.borrow_mut().set_shape_items(items),
        );

        let (get, set) = (Rc::clone(document), Rc::clone(document));
        self.bind_annotations(
            move || get.borrow().annotations().to_vec(),
            move |items| set.borrow_mut().set_annotations(items),
        );
    }

    pub fn is_bound(&self) -> bool {
        self.texts.is_some() && self.images.is_some()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn capture(&self, page: usize) -> Snapshot {
        Snapshot {
            page_index: page,
            text_items: bound(&self.texts, "text").page_slice(page),
            image_items: bound(&self.images, "image").page_slice(page),
            shape_items: self.shapes.as_ref().map(|shapes| shapes.page_slice(page)),
            annotations: self.annotations.as_ref().map(|notes| notes.page_slice(page)),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        let page = snapshot.page_index;
        bound_mut(&mut self.texts, "text").write_back(page, snapshot.text_items);
        bound_mut(&mut self.images, "image").write_back(page, snapshot.image_items);
        if let (Some(shapes), Some(items)) = (self.shapes.as_mut(), snapshot.shape_items) {
            shapes.write_back(page, items);
        }
        if let (Some(notes), Some(items)) = (self.annotations.as_mut(), snapshot.annotations) {
            notes.write_back(page, items);
        }
    }

    fn push_bounded(stack: &mut Vec<Snapshot>, snapshot: Snapshot, max_depth: usize) {
        stack.push(snapshot);
        if stack.len() > max_depth {
            let overflow = stack.len() - max_depth;
            stack.drain(..overflow);
        }
    }

    /// Records the current state of `page` ahead of a destructive edit and
    /// clears that page's redo stack.
    pub fn push_snapshot_to_undo(&mut self, page: usize) {
        let snapshot = self.capture(page);
        let max_depth = self.max_depth;
        let history = self.stacks.entry(page).or_default();
        Self::push_bounded(&mut history.undo, snapshot, max_depth);
        history.redo.clear();
        log::trace!("history: pushed undo for page {page} (depth {})", history.undo.len());
    }

    pub fn undo(&mut self, page: usize) -> bool {
        self.step(page, Direction::Undo)
    }

    pub fn redo(&mut self, page: usize) -> bool {
        self.step(page, Direction::Redo)
    }

    fn step(&mut self, page: usize, direction: Direction) -> bool {
        let available = match direction {
            Direction::Undo => self.can_undo(page),
            Direction::Redo => self.can_redo(page),
        };
        if !available {
            return false;
        }

        let current = self.capture(page);
        let max_depth = self.max_depth;
        let Some(history) = self.stacks.get_mut(&page) else {
            return false;
        };
        let (from, to) = match direction {
            Direction::Undo => (&mut history.undo, &mut history.redo),
            Direction::Redo => (&mut history.redo, &mut history.undo),
        };
        let Some(snapshot) = from.pop() else {
            return false;
        };
        Self::push_bounded(to, current, max_depth);

        self.restore(snapshot);
        log::debug!("history: {direction:?} applied on page {page}");
        true
    }

    pub fn can_undo(&self, page: usize) -> bool {
        self.stacks.get(&page).is_some_and(|history| !history.undo.is_empty())
    }

    pub fn can_redo(&self, page: usize) -> bool {
        self.stacks.get(&page).is_some_and(|history| !history.redo.is_empty())
    }

    pub fn undo_depth(&self, page: usize) -> usize {
        self.stacks.get(&page).map_or(0, |history| history.undo.len())
    }

    pub fn redo_depth(&self, page: usize) -> usize {
        self.stacks.get(&page).map_or(0, |history| history.redo.len())
    }

    /// Drops the removed page's stacks and shifts everything above it down.
    pub fn purge_removed_page(&mut self, removed: usize) {
        remap_stacks_after_removal(&mut self.stacks, removed);
    }

    pub fn shift_for_inserted_page(&mut self, at: usize) {
        remap_stacks_after_insertion(&mut self.stacks, at);
    }

    /// Forgets history for pages at or beyond `page_count`.
    pub fn retain_pages(&mut self, page_count: usize) {
        self.stacks.retain(|page, _| *page < page_count);
    }

    pub fn stacks(&self) -> &HistoryStacks {
        &self.stacks
    }

    pub fn page_history(&self, page: usize) -> Option<&PageHistory> {
        self.stacks.get(&page)
    }

    pub fn restore_stacks(&mut self, stacks: HistoryStacks) {
        self.stacks = stacks;
        for history in self.stacks.values_mut() {
            let overflow = history.undo.len().saturating_sub(self.max_depth);
            history.undo.drain(..overflow);
            let overflow = history.redo.len().saturating_sub(self.max_depth);
            history.redo.drain(..overflow);
        }
    }

    pub fn clear(&mut self) {
        self.stacks.clear();
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Undo,
    Redo,
}
