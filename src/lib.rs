//! # qirust-preview
//!
//! A live QR code preview widget: as text is typed, a small preview symbol is rendered,
//! and the symbol can be downloaded as PNG or JPEG or copied to the clipboard.
//!
//! QR encoding itself comes from an external engine made available once through
//! [`loader::LibraryLoader`]. This crate owns the asset pipeline around it: rendering a
//! preview into a host document, re-rendering at high resolution for export, and
//! converting the result into the requested encoding.
//!
//! ## Features
//!
//! - One-shot asynchronous engine loading shared by every caller.
//! - 200x200 previews that are always rebuilt from scratch; results of superseded
//!   renders are discarded.
//! - 1024x1024 exports as PNG, JPEG (flattened onto white) or a PNG clipboard image
//!   (transparency kept).
//! - Typed errors for every failure, including export read-back.
//! - Configuration through TOML.
//!
//! ## Example
//!
//! ```rust,no_run
//! use qirust_preview::dom::Document;
//! use qirust_preview::widget::{ActionOutcome, Widget, WidgetParts};
//! use std::sync::{Arc, Mutex};
//!
//! #[tokio::main]
//! async fn main() {
//!     let document = Arc::new(Mutex::new(Document::host_page()));
//!     let widget =
//!         Widget::mount(document, WidgetParts::default()).expect("host page is complete");
//!
//!     widget.type_text("https://example.com").await.expect("preview");
//!     if let ActionOutcome::Downloaded(path) = widget.click("download-png").await {
//!         println!("saved {}", path.display());
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - [`loader`]: one-shot engine loading.
//! - [`engine`]: the symbol engine seam and the `qrcode`-backed engine.
//! - [`render`]: on-screen preview rendering.
//! - [`export`]: off-screen high-resolution export.
//! - [`widget`]: input and action controllers.
//! - [`dom`]: the headless host document.
//! - [`helper`]: raster utilities (drawing, PNG/JPEG encoding, terminal output).

pub mod config;
pub mod data_url;
pub mod dom;
pub mod engine;
pub mod export;
pub mod feedback;
pub mod helper;
pub mod loader;
pub mod logging;
pub mod output;
pub mod render;
pub mod widget;

pub use config::WidgetConfig;
pub use export::{ExportArtifact, ExportError, ExportFormat};
pub use render::{PreviewHandle, RenderError, RenderOutcome};
pub use widget::{ActionOutcome, InitError, Widget, WidgetParts};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks `mutex`, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
