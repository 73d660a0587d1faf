//! Terminal text editor with full-snapshot undo and redo.
//!
//! The history lives in [`history::SnapshotStore`]; [`session::Session`]
//! ties it to the visible [`document::Document`]; [`editor::Editor`] is
//! the crossterm front-end.

pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod files;
pub mod highlight;
pub mod history;
pub mod logging;
pub mod session;
pub mod stats;

pub use config::Config;
pub use error::{Error, Result};
pub use history::{HistoryState, SnapshotStore, Surface};
pub use session::Session;
