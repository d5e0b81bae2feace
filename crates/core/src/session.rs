//! An open document together with its undo history.

use crate::codec::{self, CodecError, EncodedDocument, ImportOutcome, ImportPolicy};
use crate::config::EditorConfig;
use crate::history::HistoryManager;
use crate::persistence::{self, PersistenceError};
use chrono::{DateTime, Utc};
use doc_model::{Document, DocumentError, Element, HistoryStacks};
use std::cell::{Ref, RefCell};
use std::path::Path;
use std::rc::Rc;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Owns the live document and routes every page edit through history.
///
/// The document sits behind `Rc<RefCell<_>>` so the history accessors can
/// read and write it without holding a borrow between calls.
#[derive(Debug)]
pub struct EditorSession {
    document: Rc<RefCell<Document>>,
    history: HistoryManager,
    config: EditorConfig,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl EditorSession {
    pub fn new(config: EditorConfig) -> Self {
        Self::with_document(Document::new(), config)
    }

    pub fn with_document(document: Document, config: EditorConfig) -> Self {
        let document = Rc::new(RefCell::new(document));
        let mut history = HistoryManager::with_max_depth(config.history_depth);
        history.bind_document(&document);
        Self { document, history, config }
    }

    pub fn document(&self) -> Ref<'_, Document> {
        self.document.borrow()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn page_count(&self) -> usize {
        self.document.borrow().page_count()
    }

    /// Applies `edit` to the document after recording `page` for undo.
    ///
    /// The closure must confine its changes to `page`; only that page is
    /// restored by a later undo.
    pub fn edit<R>(
        &mut self,
        page: usize,
        edit: impl FnOnce(&mut Document) -> R,
    ) -> SessionResult<R> {
        self.document.borrow().check_page(page)?;
        self.history.push_snapshot_to_undo(page);
        let result = edit(&mut *self.document.borrow_mut());
        Ok(result)
    }

    pub fn add_element(&mut self, element: impl Into<Element>) -> SessionResult<()> {
        let element = element.into();
        let page = element.page_index();
        self.document.borrow().check_page(page)?;
        self.history.push_snapshot_to_undo(page);
        self.document.borrow_mut().add(element)?;
        Ok(())
    }

    pub fn undo(&mut self, page: usize) -> bool {
        self.history.undo(page)
    }

    pub fn redo(&mut self, page: usize) -> bool {
        self.history.redo(page)
    }

    pub fn add_page(&mut self) -> usize {
        self.document.borrow_mut().push_page()
    }

    pub fn insert_page(&mut self, at: usize) -> SessionResult<()> {
        self.document.borrow_mut().insert_page(at)?;
        self.history.shift_for_inserted_page(at);
        Ok(())
    }

    pub fn remove_page(&mut self, index: usize) -> SessionResult<()> {
        self.document.borrow_mut().remove_page(index)?;
        self.history.purge_removed_page(index);
        Ok(())
    }

    /// Swaps in a new document, rebinding history to it and dropping the
    /// stacks of pages the new document does not have.
    pub fn replace_document(&mut self, document: Document) {
        self.document = Rc::new(RefCell::new(document));
        self.history.bind_document(&self.document);
        let page_count = self.page_count();
        self.history.retain_pages(page_count);
    }

    pub fn history_stacks(&self) -> &HistoryStacks {
        self.history.stacks()
    }

    pub fn restore_history(&mut self, stacks: HistoryStacks) {
        self.history.restore_stacks(stacks);
        let page_count = self.page_count();
        self.history.retain_pages(page_count);
    }

    pub fn current_snapshot(&self, saved_at: DateTime<Utc>) -> SessionResult<EncodedDocument> {
        Ok(codec::encode(&self.document.borrow(), saved_at)?)
    }

    /// Replaces the open document with one decoded from `text`.
    ///
    /// On rejection the open document is left untouched.
    pub fn replace_with_snapshot(
        &mut self,
        text: &str,
        policy: ImportPolicy,
    ) -> SessionResult<ImportOutcome> {
        let mut outcome = codec::import(text, policy)?;
        let document = std::mem::take(&mut outcome.decoded.document);
        self.replace_document(document);
        outcome.decoded.document = self.document.borrow().clone();
        Ok(outcome)
    }

    pub fn save(&self, path: &Path) -> SessionResult<EncodedDocument> {
        Ok(persistence::save_document(path, &self.document.borrow(), Utc::now())?)
    }

    /// Opens `path` with the configured import policy.
    pub fn open(&mut self, path: &Path) -> SessionResult<ImportOutcome> {
        let mut outcome = persistence::load_document(path, self.config.import_policy())?;
        let document = std::mem::take(&mut outcome.decoded.document);
        self.replace_document(document);
        outcome.decoded.document = self.document.borrow().clone();
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::VerifyFailure;
    use doc_model::{ImageItem, NormRect, ShapeItem, ShapeKind, TextItem};

    fn rect() -> NormRect {
        NormRect { x: 0.1, y_top: 0.1, width: 0.2, height: 0.2 }
    }

    fn session_with_pages(pages: usize) -> EditorSession {
        EditorSession::with_document(Document::with_page_count(pages), EditorConfig::default())
    }

    #[test]
    fn add_then_undo_then_redo() {
        let mut session = session_with_pages(1);
        session.add_element(TextItem::new("a", 0, 0.1, 0.1)).expect("add");
        assert_eq!(session.document().text_items().len(), 1);

        assert!(session.undo(0));
        assert!(session.document().text_items().is_empty());

        assert!(session.redo(0));
        assert_eq!(session.document().text_items()[0].text, "a");
    }

    #[test]
    fn edit_rejects_out_of_range_page_without_touching_history() {
        let mut session = session_with_pages(1);
        let err = session.edit(3, |_| ()).expect_err("page 3 does not exist");
        assert!(matches!(err, SessionError::Document(DocumentError::PageOutOfRange { .. })));
        assert!(!session.history().can_undo(3));
    }

    #[test]
    fn edit_closure_changes_are_undoable() {
        let mut session = session_with_pages(1);
        session.add_element(ShapeItem::new(ShapeKind::Rectangle, 0, rect())).unwrap();

        session
            .edit(0, |doc| {
                let mut shapes = doc.shape_items().to_vec();
                shapes[0].stroke_width = 9.0;
                doc.set_shape_items(shapes);
            })
            .expect("edit");
        assert_eq!(session.document().shape_items()[0].stroke_width, 9.0);

        assert!(session.undo(0));
        assert_eq!(session.document().shape_items()[0].stroke_width, 2.0);
    }

    #[test]
    fn removing_a_page_purges_and_shifts_history() {
        let mut session = session_with_pages(3);
        session.add_element(TextItem::new("p1", 1, 0.0, 0.0)).unwrap();
        session.add_element(ImageItem::new("data:,", 2, rect())).unwrap();

        session.remove_page(1).expect("remove");

        assert_eq!(session.page_count(), 2);
        assert!(!session.history().can_undo(2));
        assert!(session.history().can_undo(1));

        assert!(session.undo(1));
        assert!(session.document().image_items().is_empty());
    }

    #[test]
    fn inserting_a_page_moves_history_with_its_page() {
        let mut session = session_with_pages(2);
        session.add_element(TextItem::new("p1", 1, 0.0, 0.0)).unwrap();

        session.insert_page(0).expect("insert");

        assert!(session.history().can_undo(2));
        assert!(!session.history().can_undo(1));
        assert!(session.undo(2));
        assert!(session.document().text_items().is_empty());
    }

    #[test]
    fn replace_with_snapshot_round_trips_and_keeps_history_bound() {
        let mut session = session_with_pages(2);
        session.add_element(TextItem::new("keep", 1, 0.3, 0.4)).unwrap();
        let encoded = session.current_snapshot(Utc::now()).expect("encode");

        let mut other = session_with_pages(1);
        other.add_element(TextItem::new("old", 0, 0.0, 0.0)).unwrap();
        let outcome =
            other.replace_with_snapshot(&encoded.text, ImportPolicy::Strict).expect("import");

        assert!(outcome.report.ok);
        assert_eq!(*other.document(), *session.document());

        // Page 0's stack survived; undo now writes into the new document.
        assert!(other.undo(0));
        assert_eq!(other.document().text_items().len(), 1);
        assert_eq!(other.document().text_items()[0].text, "keep");
    }

    #[test]
    fn rejected_snapshot_leaves_document_alone() {
        let mut session = session_with_pages(1);
        session.add_element(TextItem::new("stay", 0, 0.0, 0.0)).unwrap();
        let encoded = session.current_snapshot(Utc::now()).unwrap();
        let tampered = encoded.text.replace("stay", "gone");

        let err = session
            .replace_with_snapshot(&tampered, ImportPolicy::Strict)
            .expect_err("tampered text should be rejected");
        assert!(matches!(
            err,
            SessionError::Codec(CodecError::Rejected(VerifyFailure::RawMismatch))
        ));
        assert_eq!(session.document().text_items()[0].text, "stay");
    }

    #[test]
    fn save_and_open_through_config_policy() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("doc.json");

        let mut session = session_with_pages(2);
        session.add_element(TextItem::new("saved", 1, 0.5, 0.5)).unwrap();
        session.save(&path).expect("save");

        let mut reopened = EditorSession::default();
        let outcome = reopened.open(&path).expect("open");
        assert!(outcome.report.ok);
        assert_eq!(reopened.page_count(), 2);
        assert_eq!(reopened.document().text_items()[0].text, "saved");
    }
}
