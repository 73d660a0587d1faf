//! Full-text snapshot history for undo and redo.
//!
//! Every entry is the entire document text; there is no diffing. The
//! store keeps a *baseline*, the text it last knew to be visible, so a
//! recorded edit pushes the text as it was before the edit:
//!
//! ```text
//! edits "a", "ab", "abc"
//!   undo:     ["", "a", "ab"]    redo: []       visible: "abc"
//! undo
//!   undo:     ["", "a"]          redo: ["abc"]  visible: "ab"
//! redo
//!   undo:     ["", "a", "ab"]    redo: []       visible: "abc"
//! ```
//!
//! Writes the store makes into the [`Surface`] happen with the
//! suppression flag raised. The surface's edit notification is drained
//! inside that window and fed back to [`SnapshotStore::record_edit`],
//! which ignores it, so a restored snapshot is never captured as a new
//! user edit.

use std::collections::VecDeque;
use std::fmt;

use tracing::{debug, trace};

/// The visible text area the store restores snapshots into.
pub trait Surface {
    /// Current visible text.
    fn text(&self) -> String;

    /// Replace the visible text.
    fn set_text(&mut self, text: &str);

    /// Drain the pending edit notification, if any.
    ///
    /// The notification carries no payload; the receiver re-reads
    /// [`text`](Surface::text).
    fn take_edit(&mut self) -> bool;
}

/// Whether the store is accepting recorded edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryState {
    Idle,
    Restoring,
}

/// Undo/redo stacks of full-document snapshots.
///
/// # Invariants
///
/// 1. The redo stack is non-empty only after an undo and before the
///    next recorded edit.
/// 2. Nothing is pushed onto the undo stack while restoring.
/// 3. `undo_depth() <= max_depth` whenever a cap is configured.
pub struct SnapshotStore {
    undo_stack: VecDeque<String>,
    redo_stack: Vec<String>,
    baseline: String,
    suppressed: bool,
    max_depth: Option<usize>,
}

impl fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("undo_depth", &self.undo_stack.len())
            .field("redo_depth", &self.redo_stack.len())
            .field("baseline_len", &self.baseline.len())
            .field("suppressed", &self.suppressed)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl SnapshotStore {
    /// Create an unbounded store whose baseline is `initial`.
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            baseline: initial.into(),
            suppressed: false,
            max_depth: None,
        }
    }

    /// Cap the undo stack at `max_depth` snapshots, evicting the oldest.
    ///
    /// `None` keeps history unbounded.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self.enforce_depth();
        self
    }

    /// Record a committed change whose resulting text is `current`.
    ///
    /// Ignored while restoring. Otherwise the previous baseline becomes
    /// an undo snapshot and the redo stack is cleared.
    pub fn record_edit(&mut self, current: &str) {
        if self.suppressed {
            trace!("ignoring edit notification while restoring");
            return;
        }
        let previous = std::mem::replace(&mut self.baseline, current.to_owned());
        self.push_undo(previous);
        self.redo_stack.clear();
    }

    /// Restore the most recent undo snapshot into `surface`.
    ///
    /// Returns `false` and leaves everything untouched when there is
    /// nothing to undo.
    pub fn undo<S: Surface>(&mut self, surface: &mut S) -> bool {
        let Some(snapshot) = self.undo_stack.pop_back() else {
            trace!("undo stack empty");
            return false;
        };
        self.redo_stack.push(surface.text());
        self.restore(surface, snapshot);
        debug!(
            undo = self.undo_stack.len(),
            redo = self.redo_stack.len(),
            "undo"
        );
        true
    }

    /// Re-apply the most recently undone snapshot.
    pub fn redo<S: Surface>(&mut self, surface: &mut S) -> bool {
        let Some(snapshot) = self.redo_stack.pop() else {
            trace!("redo stack empty");
            return false;
        };
        self.push_undo(surface.text());
        self.restore(surface, snapshot);
        debug!(
            undo = self.undo_stack.len(),
            redo = self.redo_stack.len(),
            "redo"
        );
        true
    }

    /// Replace the whole document, keeping the old text undoable.
    ///
    /// Used for new-document and load actions.
    pub fn reset<S: Surface>(&mut self, surface: &mut S, text: impl Into<String>) {
        self.push_undo(surface.text());
        self.redo_stack.clear();
        self.restore(surface, text.into());
        debug!(undo = self.undo_stack.len(), "reset");
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Text the store last knew to be visible.
    #[must_use]
    pub fn baseline(&self) -> &str {
        &self.baseline
    }

    #[must_use]
    pub fn state(&self) -> HistoryState {
        if self.suppressed {
            HistoryState::Restoring
        } else {
            HistoryState::Idle
        }
    }

    #[must_use]
    pub fn is_restoring(&self) -> bool {
        self.suppressed
    }

    fn restore<S: Surface>(&mut self, surface: &mut S, text: String) {
        self.suppressed = true;
        surface.set_text(&text);
        if surface.take_edit() {
            let echoed = surface.text();
            self.record_edit(&echoed);
        }
        self.baseline = text;
        self.suppressed = false;
    }

    fn push_undo(&mut self, snapshot: String) {
        self.undo_stack.push_back(snapshot);
        self.enforce_depth();
    }

    fn enforce_depth(&mut self) {
        if let Some(max) = self.max_depth {
            while self.undo_stack.len() > max {
                self.undo_stack.pop_front();
            }
        }
    }
}
