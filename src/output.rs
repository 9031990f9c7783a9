//! Where exports end up: file downloads and the clipboard.

use crate::data_url::DataUrl;
use crate::dom::{Document, Element, ElementKind};
use crate::export::ImageBlob;
use crate::lock;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to save {filename}: {source}")]
    Download {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    #[error("clipboard rejected {mime}: {reason}")]
    Clipboard { mime: String, reason: String },
}

/// Receives downloaded files.
pub trait DownloadSink: Send + Sync {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, OutputError>;
}

/// Saves downloads into a directory, creating it if needed.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectorySink {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, OutputError> {
        let io_err = |source| OutputError::Download {
            filename: filename.to_string(),
            source,
        };
        // Only the final path component is honoured.
        let name = Path::new(filename)
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("download"));
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(io_err)?;
        }
        let path = self.dir.join(name);
        fs::write(&path, bytes).map_err(io_err)?;
        Ok(path)
    }
}

/// Downloads `url` as `filename` through a transient anchor element.
///
/// The anchor is added to the document, activated, and removed again whether or not the
/// save succeeded.
pub fn trigger_download(
    document: &Mutex<Document>,
    sink: &dyn DownloadSink,
    url: &DataUrl,
    filename: &str,
) -> Result<PathBuf, OutputError> {
    let anchor_id = {
        let mut doc = lock(document);
        let id = doc.unique_id("qr-download");
        let mut anchor = Element::new(&id, ElementKind::Anchor);
        anchor.visible = false;
        anchor.href = Some(url.to_string());
        anchor.download = Some(filename.to_string());
        doc.insert(anchor)
    };
    let result = sink.save(filename, url.bytes());
    lock(document).remove(&anchor_id);
    if let Ok(path) = &result {
        info!("Downloaded {} to {}", filename, path.display());
    }
    result
}

/// One typed entry for the system clipboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardItem {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl From<ImageBlob> for ClipboardItem {
    fn from(blob: ImageBlob) -> Self {
        Self {
            mime: blob.mime,
            bytes: blob.bytes,
        }
    }
}

pub trait Clipboard: Send + Sync {
    /// Replaces the clipboard contents with `items`.
    fn write(&self, items: Vec<ClipboardItem>) -> Result<(), OutputError>;
}

/// In-process clipboard holding the last write.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    items: Mutex<Vec<ClipboardItem>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> Vec<ClipboardItem> {
        lock(&self.items).clone()
    }
}

impl Clipboard for MemoryClipboard {
    fn write(&self, items: Vec<ClipboardItem>) -> Result<(), OutputError> {
        if let Some(item) = items.iter().find(|i| !i.mime.starts_with("image/")) {
            return Err(OutputError::Clipboard {
                mime: item.mime.clone(),
                reason: "only images are supported".to_string(),
            });
        }
        *lock(&self.items) = items;
        Ok(())
    }
}
