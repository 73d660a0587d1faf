use std::path::{Path, PathBuf};

use tracing::debug;

use crate::document::Document;
use crate::history::{SnapshotStore, Surface};
use crate::stats::TextStats;

/// State of one editing session: the visible document, its snapshot
/// history and the file it is bound to.
///
/// All history traffic goes through here. Input handlers mutate the
/// document and then call [`dispatch_edits`](Session::dispatch_edits),
/// which forwards the document's edit notification to the store.
#[derive(Debug)]
pub struct Session {
    document: Document,
    history: SnapshotStore,
    path: Option<PathBuf>,
    saved_text: String,
}

impl Session {
    pub fn new(tab_size: usize, max_depth: Option<usize>) -> Self {
        Self::with_text("", None, tab_size, max_depth)
    }

    /// Start a session on `text` with empty history.
    pub fn with_text(
        text: &str,
        path: Option<PathBuf>,
        tab_size: usize,
        max_depth: Option<usize>,
    ) -> Self {
        Session {
            document: Document::with_text(text, tab_size),
            history: SnapshotStore::new(text).with_max_depth(max_depth),
            path,
            saved_text: text.to_string(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn history(&self) -> &SnapshotStore {
        &self.history
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn text(&self) -> String {
        self.document.text()
    }

    /// Forward a pending edit notification to the history.
    ///
    /// Returns whether there was one.
    pub fn dispatch_edits(&mut self) -> bool {
        if !self.document.take_edit() {
            return false;
        }
        let current = self.document.text();
        self.history.record_edit(&current);
        true
    }

    pub fn undo(&mut self) -> bool {
        self.dispatch_edits();
        self.history.undo(&mut self.document)
    }

    pub fn redo(&mut self) -> bool {
        self.dispatch_edits();
        self.history.redo(&mut self.document)
    }

    /// Clear the document. The previous text stays undoable.
    pub fn new_document(&mut self) {
        self.dispatch_edits();
        self.history.reset(&mut self.document, String::new());
        self.path = None;
        self.saved_text.clear();
        debug!("new document");
    }

    /// Show `text` loaded from `path`. The previous text stays undoable.
    pub fn load(&mut self, path: PathBuf, text: String) {
        self.dispatch_edits();
        self.saved_text.clone_from(&text);
        self.history.reset(&mut self.document, text);
        debug!(path = %path.display(), "document loaded");
        self.path = Some(path);
    }

    /// Record that `text` was written to `path`.
    pub fn mark_saved(&mut self, path: PathBuf, text: String) {
        self.path = Some(path);
        self.saved_text = text;
    }

    pub fn is_modified(&self) -> bool {
        self.document.text() != self.saved_text
    }

    pub fn stats(&self) -> TextStats {
        TextStats::of(&self.document.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_str(session: &mut Session, s: &str) {
        for c in s.chars() {
            session.document_mut().insert_char(c);
            session.dispatch_edits();
        }
    }

    #[test]
    fn each_keystroke_is_one_undo_step() {
        let mut session = Session::new(4, None);
        type_str(&mut session, "abc");
        assert_eq!(session.history().undo_depth(), 3);

        session.undo();
        assert_eq!(session.text(), "ab");
        session.undo();
        assert_eq!(session.text(), "a");
        session.redo();
        assert_eq!(session.text(), "ab");
    }

    #[test]
    fn restore_does_not_record_history() {
        let mut session = Session::new(4, None);
        type_str(&mut session, "ab");
        session.undo();
        assert!(!session.dispatch_edits());
        assert_eq!(session.history().undo_depth(), 1);
        assert_eq!(session.history().redo_depth(), 1);
    }

    #[test]
    fn undo_flushes_pending_edit_first() {
        let mut session = Session::new(4, None);
        session.document_mut().insert_char('x');
        session.undo();
        assert_eq!(session.text(), "");
        session.redo();
        assert_eq!(session.text(), "x");
    }

    #[test]
    fn new_document_is_undoable() {
        let mut session = Session::with_text("keep me", Some("a.txt".into()), 4, None);
        session.new_document();
        assert_eq!(session.text(), "");
        assert!(session.path().is_none());

        session.undo();
        assert_eq!(session.text(), "keep me");
    }

    #[test]
    fn load_binds_path_and_clears_modified() {
        let mut session = Session::new(4, None);
        type_str(&mut session, "scratch");
        assert!(session.is_modified());

        session.load("b.kt".into(), "val x = 1".into());
        assert_eq!(session.text(), "val x = 1");
        assert_eq!(session.path(), Some(Path::new("b.kt")));
        assert!(!session.is_modified());
        assert!(!session.history().can_redo());

        session.undo();
        assert_eq!(session.text(), "scratch");
        assert!(session.is_modified());
    }

    #[test]
    fn mark_saved_tracks_text() {
        let mut session = Session::new(4, None);
        type_str(&mut session, "hi");
        let text = session.text();
        session.mark_saved("hi.txt".into(), text);
        assert!(!session.is_modified());
        type_str(&mut session, "!");
        assert!(session.is_modified());
    }

    #[test]
    fn stats_follow_document() {
        let mut session = Session::new(4, None);
        type_str(&mut session, "two words");
        assert_eq!(session.stats(), TextStats { words: 2, chars: 9 });
    }

    #[test]
    fn crlf_file_round_trips_unmodified() {
        let mut session = Session::new(4, None);
        session.load("win.txt".into(), "one\r\ntwo\r\n".into());
        assert!(!session.is_modified());
        assert_eq!(session.text(), "one\r\ntwo\r\n");

        type_str(&mut session, "x");
        session.undo();
        assert_eq!(session.text(), "one\r\ntwo\r\n");
        assert!(!session.is_modified());
    }
}
