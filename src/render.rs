//! On-screen preview rendering.

use crate::config::{Primitive, WidgetConfig};
use crate::data_url::DataUrl;
use crate::dom::{Content, Document, OPTIONS_ID, PREVIEW_CARD_ID, PREVIEW_ID};
use crate::engine::{EncodeError, Rendered, SymbolEngine, SymbolOptions};
use crate::loader::{LibraryLoader, LoadError};
use crate::lock;
use image::RgbaImage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const LOAD_FAILED_MESSAGE: &str = "Could not load QR code engine.";
pub const RENDER_FAILED_MESSAGE: &str = "Error generating QR code.";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("nothing to render")]
    EmptyText,

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("failed to generate QR code: {0}")]
    Encode(#[from] EncodeError),

    #[error("render did not complete within {0:?}")]
    Timeout(Duration),

    #[error("render task failed: {0}")]
    Task(String),
}

/// Monotonic request counter. Each input change takes a new token; only work carrying
/// the newest token may touch the preview.
#[derive(Debug, Default)]
pub struct Generations(AtomicU64);

impl Generations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new generation and returns its token.
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, token: u64) -> bool {
        self.current() == token
    }
}

/// The live preview: what the preview container shows and what exports may refer to.
#[derive(Debug, Clone)]
pub struct PreviewHandle {
    text: Arc<str>,
    generation: u64,
    rendered: Arc<Rendered>,
    data_url: Arc<DataUrl>,
}

impl PreviewHandle {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn rendered(&self) -> &Rendered {
        &self.rendered
    }

    /// PNG data URL of the preview image.
    pub fn data_url(&self) -> &DataUrl {
        &self.data_url
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.rendered.dimensions()
    }

    pub fn to_rgba(&self) -> Result<RgbaImage, image::ImageError> {
        self.rendered.to_rgba()
    }
}

/// Result of a render request that did not fail.
#[derive(Debug, Clone)]
pub enum RenderOutcome {
    Shown(PreviewHandle),
    /// A newer request arrived while this one was running; its result was dropped.
    Superseded,
    /// The input was emptied and the preview taken down.
    Cleared,
}

/// Runs one engine render on the blocking pool, bounded by `timeout`.
pub(crate) async fn render_symbol(
    engine: Arc<dyn SymbolEngine>,
    options: SymbolOptions,
    primitive: Primitive,
    timeout: Duration,
) -> Result<Rendered, RenderError> {
    let task = tokio::task::spawn_blocking(move || engine.render(&options, primitive));
    match tokio::time::timeout(timeout, task).await {
        Err(_) => Err(RenderError::Timeout(timeout)),
        Ok(Err(join)) => Err(RenderError::Task(join.to_string())),
        Ok(Ok(result)) => result.map_err(RenderError::from),
    }
}

pub(crate) fn symbol_options(config: &WidgetConfig, text: &str, size: u32) -> SymbolOptions {
    SymbolOptions {
        text: text.to_string(),
        width: size,
        height: size,
        color_dark: config.color_dark,
        color_light: config.color_light,
        correct_level: config.correct_level,
    }
}

/// Builds low-resolution previews into the preview container.
pub struct Renderer {
    config: Arc<WidgetConfig>,
    loader: Arc<LibraryLoader>,
    document: Arc<Mutex<Document>>,
    generations: Arc<Generations>,
    current: Mutex<Option<PreviewHandle>>,
}

impl Renderer {
    pub fn new(
        config: Arc<WidgetConfig>,
        loader: Arc<LibraryLoader>,
        document: Arc<Mutex<Document>>,
        generations: Arc<Generations>,
    ) -> Self {
        Self {
            config,
            loader,
            document,
            generations,
            current: Mutex::new(None),
        }
    }

    /// The preview currently on screen, if any.
    pub fn current(&self) -> Option<PreviewHandle> {
        lock(&self.current).clone()
    }

    /// Drops the current preview and hides the preview card and options.
    pub fn clear(&self) {
        let mut doc = lock(&self.document);
        *lock(&self.current) = None;
        doc.set_visible(PREVIEW_CARD_ID, false);
        doc.set_content(PREVIEW_ID, Content::Empty);
        doc.set_visible(PREVIEW_ID, false);
        doc.set_visible(OPTIONS_ID, false);
    }

    /// Renders `text` into the preview container on behalf of request `token`.
    ///
    /// The container is emptied before the new symbol is built. If `token` stops being the
    /// newest generation at any point, the request finishes with
    /// [`RenderOutcome::Superseded`] and leaves the document alone.
    pub async fn show_preview(
        &self,
        text: &str,
        token: u64,
    ) -> Result<RenderOutcome, RenderError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(RenderError::EmptyText);
        }

        let engine = match self.loader.ensure_loaded().await {
            Ok(engine) => engine,
            Err(err) => {
                self.show_error(token, LOAD_FAILED_MESSAGE);
                return Err(err.into());
            }
        };

        if !self.prepare_container(token) {
            debug!("Preview #{} superseded before render", token);
            return Ok(RenderOutcome::Superseded);
        }

        let options = symbol_options(&self.config, text, self.config.preview_size);
        let rendered = render_symbol(
            engine,
            options,
            self.config.primitive,
            self.config.settle_timeout(),
        )
        .await
        .and_then(|rendered| {
            let png = rendered
                .to_png()
                .map_err(|e| RenderError::Encode(EncodeError::Image(e.to_string())))?;
            Ok((rendered, png))
        });

        match rendered {
            Ok((rendered, png)) => {
                let handle = PreviewHandle {
                    text: Arc::from(text),
                    generation: token,
                    rendered: Arc::new(rendered),
                    data_url: Arc::new(DataUrl::new("image/png", png)),
                };
                let shown = self.if_current(token, |doc, current| {
                    *current = Some(handle.clone());
                    doc.set_content(PREVIEW_ID, Content::Preview(handle.clone()));
                });
                if !shown {
                    debug!("Preview #{} superseded after render", token);
                    return Ok(RenderOutcome::Superseded);
                }
                debug!("Preview #{} shown ({} chars)", token, text.chars().count());
                Ok(RenderOutcome::Shown(handle))
            }
            Err(err) => {
                if !self.show_error(token, RENDER_FAILED_MESSAGE) {
                    debug!("Preview #{} superseded after render", token);
                    return Ok(RenderOutcome::Superseded);
                }
                warn!("Preview #{} failed: {}", token, err);
                Err(err)
            }
        }
    }

    /// Applies `update` only while `token` is the newest generation.
    ///
    /// The document lock is held from the generation check until the update is done.
    /// `clear` takes the same lock, so a clear either lands before the check (and the update
    /// is skipped) or waits until the update is finished and then wipes it.
    fn if_current<F>(&self, token: u64, update: F) -> bool
    where
        F: FnOnce(&mut Document, &mut Option<PreviewHandle>),
    {
        let mut doc = lock(&self.document);
        if !self.generations.is_current(token) {
            return false;
        }
        let mut current = lock(&self.current);
        update(&mut doc, &mut current);
        true
    }

    fn prepare_container(&self, token: u64) -> bool {
        self.if_current(token, |doc, current| {
            *current = None;
            doc.set_visible(PREVIEW_CARD_ID, true);
            doc.set_content(PREVIEW_ID, Content::Empty);
            doc.set_visible(PREVIEW_ID, true);
            // Options sit right below the freshly built preview.
            doc.append_child(PREVIEW_CARD_ID, OPTIONS_ID);
            doc.set_visible(OPTIONS_ID, true);
        })
    }

    fn show_error(&self, token: u64, message: &str) -> bool {
        self.if_current(token, |doc, current| {
            *current = None;
            doc.set_visible(PREVIEW_CARD_ID, true);
            doc.set_content(PREVIEW_ID, Content::Error(message.to_string()));
            doc.set_visible(PREVIEW_ID, true);
            doc.set_visible(OPTIONS_ID, false);
        })
    }
}
