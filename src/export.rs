//! High-resolution export.
//!
//! Every export renders the symbol again, off-screen, at `export_size`. The preview is
//! never reused: it is deliberately small, while downloads and clipboard images need
//! full quality.

use crate::config::{Color, WidgetConfig};
use crate::data_url::DataUrl;
use crate::dom::{Document, Element, ElementKind};
use crate::engine::Rendered;
use crate::helper;
use crate::loader::{LibraryLoader, LoadError};
use crate::lock;
use crate::render::{render_symbol, symbol_options, RenderError};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExportError {
    #[error("nothing to export")]
    EmptyText,

    #[error("unknown export format {0:?}")]
    UnknownFormat(String),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("rendered symbol could not be read back: {0}")]
    Unreadable(String),

    #[error("failed to encode export: {0}")]
    Image(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Png,
    Jpg,
    /// PNG blob destined for the clipboard.
    Copy,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpg => "jpg",
            ExportFormat::Copy => "copy",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "jpg" | "jpeg" => Ok(ExportFormat::Jpg),
            "copy" => Ok(ExportFormat::Copy),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

/// A binary image ready for the clipboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlob {
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// The product of one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportArtifact {
    DataUrl(DataUrl),
    Blob(ImageBlob),
}

impl ExportArtifact {
    pub fn mime(&self) -> &str {
        match self {
            ExportArtifact::DataUrl(url) => url.mime(),
            ExportArtifact::Blob(blob) => &blob.mime,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            ExportArtifact::DataUrl(url) => url.bytes(),
            ExportArtifact::Blob(blob) => &blob.bytes,
        }
    }
}

/// Hidden element hosting an export render. Removed from the document when dropped.
struct WorkArea {
    document: Arc<Mutex<Document>>,
    id: String,
}

impl WorkArea {
    fn attach(document: &Arc<Mutex<Document>>) -> Self {
        let id = {
            let mut doc = lock(document);
            let id = doc.unique_id("qr-export");
            let mut element = Element::new(&id, ElementKind::WorkArea);
            element.visible = false;
            doc.insert(element)
        };
        Self {
            document: document.clone(),
            id,
        }
    }
}

impl Drop for WorkArea {
    fn drop(&mut self) {
        lock(&self.document).remove(&self.id);
    }
}

pub struct Exporter {
    config: Arc<WidgetConfig>,
    loader: Arc<LibraryLoader>,
    document: Arc<Mutex<Document>>,
}

impl Exporter {
    pub fn new(
        config: Arc<WidgetConfig>,
        loader: Arc<LibraryLoader>,
        document: Arc<Mutex<Document>>,
    ) -> Self {
        Self {
            config,
            loader,
            document,
        }
    }

    /// Renders `text` off-screen at export resolution and encodes it as `format`.
    ///
    /// `png` and `jpg` yield a [`DataUrl`], `copy` yields an `image/png` [`ImageBlob`]
    /// with transparency preserved. The off-screen work area is removed on every path.
    pub async fn generate_export(
        &self,
        text: &str,
        format: ExportFormat,
    ) -> Result<ExportArtifact, ExportError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ExportError::EmptyText);
        }
        let engine = self.loader.ensure_loaded().await?;

        let _work_area = WorkArea::attach(&self.document);
        let size = self.config.export_size;
        debug!("Rendering {} export at {}x{}", format, size, size);
        let rendered = render_symbol(
            engine,
            symbol_options(&self.config, text, size),
            self.config.primitive,
            self.config.settle_timeout(),
        )
        .await?;

        let quality = self.config.jpeg_quality;
        let artifact = tokio::task::spawn_blocking(move || extract(&rendered, format, quality))
            .await
            .map_err(|e| ExportError::Unreadable(e.to_string()))??;
        info!("Exported {} ({} bytes)", format, artifact.bytes().len());
        Ok(artifact)
    }
}

fn extract(
    rendered: &Rendered,
    format: ExportFormat,
    quality: u8,
) -> Result<ExportArtifact, ExportError> {
    let (width, height) = rendered.dimensions();
    if width == 0 || height == 0 {
        return Err(ExportError::Unreadable("empty primitive".to_string()));
    }
    let image_err = |e: image::ImageError| ExportError::Image(e.to_string());
    let pixels = || rendered.to_rgba().map_err(|e| ExportError::Unreadable(e.to_string()));

    match format {
        ExportFormat::Png => {
            let png = rendered.to_png().map_err(image_err)?;
            Ok(ExportArtifact::DataUrl(DataUrl::new("image/png", png)))
        }
        ExportFormat::Jpg => {
            // JPEG has no alpha: composite onto opaque white first.
            let flat = helper::flatten_onto(&pixels()?, Color::WHITE);
            let jpeg = helper::encode_jpeg(&flat, quality).map_err(image_err)?;
            Ok(ExportArtifact::DataUrl(DataUrl::new("image/jpeg", jpeg)))
        }
        ExportFormat::Copy => {
            let png = helper::encode_png(&pixels()?).map_err(image_err)?;
            Ok(ExportArtifact::Blob(ImageBlob {
                mime: "image/png".to_string(),
                bytes: png,
            }))
        }
    }
}
