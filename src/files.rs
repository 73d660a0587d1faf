//! Asynchronous open and save.
//!
//! Requests run as tasks on a tokio runtime. Each one reports back with a
//! [`FileEvent`] on a channel that the editor loop drains between key
//! events, so the document and its history are only touched on the UI
//! thread.

use std::path::{Path, PathBuf};

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::FileError;

/// Completion of a file request.
#[derive(Debug)]
pub enum FileEvent {
    Opened {
        path: PathBuf,
        result: Result<String, FileError>,
    },
    Saved {
        path: PathBuf,
        /// Contents that were written.
        text: String,
        /// Bytes written.
        result: Result<usize, FileError>,
    },
}

pub struct FileService {
    handle: Handle,
    tx: mpsc::UnboundedSender<FileEvent>,
    rx: mpsc::UnboundedReceiver<FileEvent>,
}

impl FileService {
    pub fn new(handle: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        FileService { handle, tx, rx }
    }

    pub fn open(&self, path: PathBuf) {
        debug!(path = %path.display(), "open requested");
        let tx = self.tx.clone();
        self.handle.spawn(async move {
            let result = read_text(&path).await;
            // The receiver lives as long as the editor; a failed send means
            // the editor has already shut down.
            let _ = tx.send(FileEvent::Opened { path, result });
        });
    }

    pub fn save(&self, path: PathBuf, text: String) {
        debug!(path = %path.display(), bytes = text.len(), "save requested");
        let tx = self.tx.clone();
        self.handle.spawn(async move {
            let result = write_text(&path, &text).await;
            let _ = tx.send(FileEvent::Saved { path, text, result });
        });
    }

    /// Next finished request, if one is ready.
    pub fn try_next(&mut self) -> Option<FileEvent> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next finished request.
    pub async fn next(&mut self) -> Option<FileEvent> {
        self.rx.recv().await
    }
}

pub async fn read_text(path: &Path) -> Result<String, FileError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| FileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8(bytes).map_err(|_| FileError::Encoding {
        path: path.to_path_buf(),
    })?;
    info!(path = %path.display(), bytes = text.len(), "file read");
    Ok(text)
}

pub async fn write_text(path: &Path, text: &str) -> Result<usize, FileError> {
    let write_err = |source| FileError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    tokio::fs::write(path, text).await.map_err(write_err)?;
    info!(path = %path.display(), bytes = text.len(), "file written");
    Ok(text.len())
}
