//! The preview widget: input handling, option actions and their wiring.
//!
//! ```rust,no_run
//! use qirust_preview::dom::Document;
//! use qirust_preview::widget::{Widget, WidgetParts};
//! use std::sync::{Arc, Mutex};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let document = Arc::new(Mutex::new(Document::host_page()));
//! let widget = Widget::mount(document, WidgetParts::default())?;
//! widget.type_text("https://example.com").await;
//! widget.click("download-png").await;
//! # Ok(())
//! # }
//! ```

use crate::config::WidgetConfig;
use crate::dom::{
    Content, Document, Element, ElementKind, BANNER_ID, BUTTON_CLASS, COPY_ID, FORM_ID, INPUT_ID,
    OPTIONS_ID, PREVIEW_CARD_ID, PREVIEW_ID,
};
use crate::export::{ExportArtifact, ExportError, ExportFormat, Exporter};
use crate::feedback::FeedbackTip;
use crate::loader::{BuiltinSource, EngineSource, LibraryLoader};
use crate::lock;
use crate::output::{
    trigger_download, Clipboard, ClipboardItem, DirectorySink, DownloadSink, MemoryClipboard,
    OutputError,
};
use crate::render::{Generations, PreviewHandle, RenderError, RenderOutcome, Renderer};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, warn};

pub const COPIED_MESSAGE: &str = "Copied!";
pub const EXPORT_FAILED_MESSAGE: &str = "Export failed";

/// Hooks the widget cannot run without, in lookup order.
pub const REQUIRED_HOOKS: [(&str, &str); 6] = [
    ("form", FORM_ID),
    ("urlInput", INPUT_ID),
    ("preview", PREVIEW_ID),
    ("options", OPTIONS_ID),
    ("previewCard", PREVIEW_CARD_ID),
    ("copyButton", COPY_ID),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InitError {
    #[error("required elements not found: {}", .missing.join(", "))]
    MissingHooks { missing: Vec<String> },
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("export produced {0} where {1} was expected")]
    UnexpectedArtifact(&'static str, &'static str),
}

/// Whether the input currently holds any text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    Empty,
    Populated,
}

/// Collaborators injected into a widget.
pub struct WidgetParts {
    pub config: WidgetConfig,
    pub source: Arc<dyn EngineSource>,
    pub downloads: Arc<dyn DownloadSink>,
    pub clipboard: Arc<dyn Clipboard>,
}

impl Default for WidgetParts {
    fn default() -> Self {
        Self {
            config: WidgetConfig::default(),
            source: Arc::new(BuiltinSource),
            downloads: Arc::new(DirectorySink::new(".")),
            clipboard: Arc::new(MemoryClipboard::new()),
        }
    }
}

/// What a click resolved to and how it ended.
#[derive(Debug)]
pub enum ActionOutcome {
    /// The click did not hit an option control, or there was no text.
    Ignored,
    Downloaded(PathBuf),
    Copied,
    Failed(ActionError),
}

pub struct Widget {
    config: Arc<WidgetConfig>,
    document: Arc<Mutex<Document>>,
    loader: Arc<LibraryLoader>,
    generations: Arc<Generations>,
    state: Mutex<InputState>,
    renderer: Renderer,
    exporter: Exporter,
    tip: FeedbackTip,
    downloads: Arc<dyn DownloadSink>,
    clipboard: Arc<dyn Clipboard>,
}

impl Widget {
    /// Attaches the widget to `document`.
    ///
    /// Every hook in [`REQUIRED_HOOKS`] must exist. Otherwise a banner naming each hook and
    /// whether it was found is inserted at the top of the page and no widget is created.
    pub fn mount(document: Arc<Mutex<Document>>, parts: WidgetParts) -> Result<Self, InitError> {
        {
            let mut doc = lock(&document);
            let missing: Vec<String> = REQUIRED_HOOKS
                .iter()
                .filter(|(_, id)| !doc.contains(id))
                .map(|(name, _)| name.to_string())
                .collect();
            if !missing.is_empty() {
                let report = REQUIRED_HOOKS
                    .iter()
                    .map(|(name, id)| format!("{}: {}", name, doc.contains(id)))
                    .collect::<Vec<_>>()
                    .join(", ");
                warn!("Widget not mounted; missing {}", missing.join(", "));
                doc.insert(
                    Element::new(BANNER_ID, ElementKind::Banner).with_content(Content::Error(
                        format!("Widget loaded, but one or more elements not found! {report}"),
                    )),
                );
                return Err(InitError::MissingHooks { missing });
            }

            doc.set_visible(PREVIEW_CARD_ID, false);
            doc.set_content(PREVIEW_ID, Content::Empty);
            doc.set_visible(PREVIEW_ID, false);
            doc.set_visible(OPTIONS_ID, false);
        }

        let config = Arc::new(parts.config);
        let loader = Arc::new(LibraryLoader::new(parts.source));
        let generations = Arc::new(Generations::new());
        let renderer = Renderer::new(
            config.clone(),
            loader.clone(),
            document.clone(),
            generations.clone(),
        );
        let exporter = Exporter::new(config.clone(), loader.clone(), document.clone());
        let tip = FeedbackTip::new(document.clone(), config.tip_duration());
        debug!("Widget mounted");

        Ok(Self {
            config,
            document,
            loader,
            generations,
            state: Mutex::new(InputState::Empty),
            renderer,
            exporter,
            tip,
            downloads: parts.downloads,
            clipboard: parts.clipboard,
        })
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn document(&self) -> &Arc<Mutex<Document>> {
        &self.document
    }

    pub fn loader(&self) -> &LibraryLoader {
        &self.loader
    }

    pub fn state(&self) -> InputState {
        *lock(&self.state)
    }

    /// The trimmed input value.
    pub fn query_text(&self) -> String {
        lock(&self.document)
            .value(INPUT_ID)
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    }

    /// The preview currently displayed, if any.
    pub fn preview(&self) -> Option<PreviewHandle> {
        self.renderer.current()
    }

    /// Text of the feedback tip while it is visible.
    pub fn tip_text(&self) -> Option<String> {
        self.tip.visible_text()
    }

    /// Replaces the input value and handles the resulting input event.
    pub async fn type_text(&self, value: &str) -> Result<RenderOutcome, RenderError> {
        lock(&self.document).set_value(INPUT_ID, value);
        self.on_input().await
    }

    /// Handles an input event on the text field.
    ///
    /// Empty text hides the preview and options and yields [`RenderOutcome::Cleared`]. Any
    /// other text starts a new render generation; overlapping renders for older text are
    /// discarded.
    pub async fn on_input(&self) -> Result<RenderOutcome, RenderError> {
        let text = self.query_text();
        let token = self.generations.advance();

        if text.is_empty() {
            *lock(&self.state) = InputState::Empty;
            self.renderer.clear();
            debug!("Input cleared (#{})", token);
            return Ok(RenderOutcome::Cleared);
        }

        *lock(&self.state) = InputState::Populated;
        self.renderer.show_preview(&text, token).await
    }

    /// Handles a click on element `target`.
    pub async fn click(&self, target: &str) -> ActionOutcome {
        let Some(format) = self.resolve_action(target) else {
            return ActionOutcome::Ignored;
        };
        let text = self.query_text();
        if text.is_empty() {
            return ActionOutcome::Ignored;
        }
        self.run_action(&text, format).await
    }

    /// Maps a click target to the export it requests.
    pub fn resolve_action(&self, target: &str) -> Option<ExportFormat> {
        let doc = lock(&self.document);
        if doc.is_within(target, COPY_ID) {
            return Some(ExportFormat::Copy);
        }
        if !doc.is_within(target, OPTIONS_ID) {
            return None;
        }
        let button = doc.closest(target, |e| e.has_class(BUTTON_CLASS))?;
        match button.format.as_deref()?.parse() {
            Ok(ExportFormat::Copy) | Err(_) => None,
            Ok(format) => Some(format),
        }
    }

    /// Runs one export action and reports the result through the tooltip.
    pub async fn run_action(&self, text: &str, format: ExportFormat) -> ActionOutcome {
        let result = match format {
            ExportFormat::Png => {
                self.tip.show("Downloading PNG...");
                self.download(text, format, &self.config.png_filename).await
            }
            ExportFormat::Jpg => {
                self.tip.show("Downloading JPG...");
                self.download(text, format, &self.config.jpg_filename).await
            }
            ExportFormat::Copy => {
                // Shown before the copy completes.
                self.tip.show(COPIED_MESSAGE);
                self.copy(text).await.map(|()| ActionOutcome::Copied)
            }
        };
        result.unwrap_or_else(|err| {
            warn!("{} action failed: {}", format, err);
            self.tip.show(EXPORT_FAILED_MESSAGE);
            ActionOutcome::Failed(err)
        })
    }

    async fn download(
        &self,
        text: &str,
        format: ExportFormat,
        filename: &str,
    ) -> Result<ActionOutcome, ActionError> {
        let url = match self.exporter.generate_export(text, format).await? {
            ExportArtifact::DataUrl(url) => url,
            ExportArtifact::Blob(_) => {
                return Err(ActionError::UnexpectedArtifact("a blob", "a data URL"))
            }
        };
        let path = trigger_download(&self.document, self.downloads.as_ref(), &url, filename)?;
        Ok(ActionOutcome::Downloaded(path))
    }

    async fn copy(&self, text: &str) -> Result<(), ActionError> {
        let blob = match self.exporter.generate_export(text, ExportFormat::Copy).await? {
            ExportArtifact::Blob(blob) => blob,
            ExportArtifact::DataUrl(_) => {
                return Err(ActionError::UnexpectedArtifact("a data URL", "a blob"))
            }
        };
        self.clipboard.write(vec![ClipboardItem::from(blob)])?;
        Ok(())
    }
}
