use qirust_preview::config::{Color, CorrectLevel, Primitive, WidgetConfig};
use qirust_preview::dom::{
    Content, Document, BANNER_ID, COPY_ID, OPTIONS_ID, PREVIEW_CARD_ID, PREVIEW_ID,
};
use qirust_preview::engine::{EncodeError, QrcodeEngine, SymbolEngine, SymbolMatrix};
use qirust_preview::loader::{EngineFuture, EngineSource};
use qirust_preview::output::{DirectorySink, MemoryClipboard};
use qirust_preview::widget::{
    ActionOutcome, InitError, Widget, WidgetParts, COPIED_MESSAGE, EXPORT_FAILED_MESSAGE,
};
use qirust_preview::{ExportFormat, RenderOutcome};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Engine that stalls on one particular text.
struct StallingEngine {
    stall_on: &'static str,
    stall: Duration,
}

impl SymbolEngine for StallingEngine {
    fn name(&self) -> &str {
        "stalling"
    }

    fn encode(&self, text: &str, level: CorrectLevel) -> Result<SymbolMatrix, EncodeError> {
        if text == self.stall_on {
            std::thread::sleep(self.stall);
        }
        QrcodeEngine.encode(text, level)
    }
}

/// Source that counts fetches and hands out a [`StallingEngine`] after a delay.
struct CountingSource {
    fetches: Arc<AtomicUsize>,
    delay: Duration,
    stall_on: &'static str,
}

impl EngineSource for CountingSource {
    fn location(&self) -> &str {
        "test:counting"
    }

    fn fetch(&self) -> EngineFuture {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let (delay, stall_on) = (self.delay, self.stall_on);
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            Ok(Arc::new(StallingEngine {
                stall_on,
                stall: Duration::from_millis(150),
            }) as Arc<dyn SymbolEngine>)
        })
    }
}

struct Harness {
    widget: Widget,
    clipboard: Arc<MemoryClipboard>,
    dir: tempfile::TempDir,
}

fn harness_with(mut config: WidgetConfig, source: Option<Arc<dyn EngineSource>>) -> Harness {
    // Keep tips up for the whole test.
    config.tip_duration_ms = 60_000;
    let dir = tempfile::tempdir().unwrap();
    let clipboard = Arc::new(MemoryClipboard::new());
    let mut parts = WidgetParts {
        config,
        downloads: Arc::new(DirectorySink::new(dir.path())),
        clipboard: clipboard.clone(),
        ..WidgetParts::default()
    };
    if let Some(source) = source {
        parts.source = source;
    }
    let document = Arc::new(Mutex::new(Document::host_page()));
    let widget = Widget::mount(document, parts).unwrap();
    Harness {
        widget,
        clipboard,
        dir,
    }
}

fn harness() -> Harness {
    harness_with(WidgetConfig::default(), None)
}

fn preview_text(widget: &Widget) -> Option<String> {
    let doc = widget.document().lock().unwrap();
    doc.content(PREVIEW_ID)
        .and_then(Content::preview)
        .map(|p| p.text().to_string())
}

/// Samples the centre of every module and compares it with the encoded symbol.
fn matches_symbol(img: &image::GrayImage, text: &str) -> bool {
    let matrix = QrcodeEngine.encode(text, CorrectLevel::High).unwrap();
    let n = matrix.width() as u32;
    let size = img.width();
    (0..n).all(|my| {
        (0..n).all(|mx| {
            let x = (2 * mx + 1) * size / (2 * n);
            let y = (2 * my + 1) * size / (2 * n);
            let dark = img.get_pixel(x, y)[0] < 128;
            dark == matrix.get(mx as i64, my as i64)
        })
    })
}

#[tokio::test]
async fn preview_follows_latest_input() {
    let h = harness();
    h.widget.type_text("https://example.com").await.unwrap();
    h.widget.type_text("https://example.com/a").await.unwrap();

    assert_eq!(preview_text(&h.widget).as_deref(), Some("https://example.com/a"));
    let doc = h.widget.document().lock().unwrap();
    assert!(doc.is_visible(PREVIEW_CARD_ID));
    assert!(doc.is_visible(PREVIEW_ID));
    assert!(doc.is_visible(OPTIONS_ID));
    assert!(doc.is_within(OPTIONS_ID, PREVIEW_CARD_ID));
}

#[tokio::test]
async fn clearing_input_leaves_no_preview() {
    let h = harness();
    h.widget.type_text("hello").await.unwrap();
    assert!(matches!(
        h.widget.type_text("  ").await,
        Ok(RenderOutcome::Cleared)
    ));

    assert!(h.widget.preview().is_none());
    let doc = h.widget.document().lock().unwrap();
    assert!(!doc.is_visible(PREVIEW_CARD_ID));
    assert!(!doc.is_visible(PREVIEW_ID));
    assert!(!doc.is_visible(OPTIONS_ID));
    assert!(doc.content(PREVIEW_ID).unwrap().is_empty());
}

#[tokio::test]
async fn rapid_inputs_settle_on_the_newest() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let source: Arc<dyn EngineSource> = Arc::new(CountingSource {
        fetches: fetches.clone(),
        delay: Duration::from_millis(1),
        stall_on: "a",
    });
    let h = harness_with(WidgetConfig::default(), Some(source));
    h.widget.loader().ensure_loaded().await.unwrap();

    let (first, second) = tokio::join!(h.widget.type_text("a"), h.widget.type_text("ab"));
    assert!(matches!(first, Ok(RenderOutcome::Superseded)));
    assert!(matches!(second, Ok(RenderOutcome::Shown(_))));
    assert_eq!(preview_text(&h.widget).as_deref(), Some("ab"));
    assert_eq!(h.widget.preview().unwrap().text(), "ab");
}

#[tokio::test]
async fn concurrent_loads_fetch_once() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let source: Arc<dyn EngineSource> = Arc::new(CountingSource {
        fetches: fetches.clone(),
        delay: Duration::from_millis(50),
        stall_on: "",
    });
    let h = harness_with(WidgetConfig::default(), Some(source));

    let (first, second) = tokio::join!(h.widget.type_text("one"), h.widget.type_text("two"));
    assert!(first.is_ok() && second.is_ok());
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    assert_eq!(h.widget.loader().fetch_count(), 1);
    assert_eq!(preview_text(&h.widget).as_deref(), Some("two"));
}

#[test]
fn missing_hook_shows_banner() {
    let mut doc = Document::host_page();
    doc.remove(COPY_ID);
    let document = Arc::new(Mutex::new(doc));

    let err = Widget::mount(document.clone(), WidgetParts::default()).err().unwrap();
    assert_eq!(
        err,
        InitError::MissingHooks {
            missing: vec!["copyButton".to_string()]
        }
    );
    let doc = document.lock().unwrap();
    assert!(doc.contains(BANNER_ID));
    // Hooks were left untouched.
    assert!(doc.is_visible(PREVIEW_CARD_ID));
}

#[tokio::test]
async fn png_and_jpg_downloads_carry_the_same_symbol() {
    let h = harness();
    let text = "https://example.com/qr";
    h.widget.type_text(text).await.unwrap();

    let ActionOutcome::Downloaded(png_path) = h.widget.click("download-png").await else {
        panic!("png download failed");
    };
    assert_eq!(h.widget.tip_text().as_deref(), Some("Downloading PNG..."));
    let ActionOutcome::Downloaded(jpg_path) = h.widget.click("download-jpg").await else {
        panic!("jpg download failed");
    };
    assert_eq!(png_path, h.dir.path().join("qrcode.png"));
    assert_eq!(jpg_path, h.dir.path().join("qrcode.jpg"));

    let png_bytes = std::fs::read(&png_path).unwrap();
    let jpg_bytes = std::fs::read(&jpg_path).unwrap();
    assert_ne!(png_bytes, jpg_bytes);

    let png = image::load_from_memory(&png_bytes).unwrap();
    let jpg = image::load_from_memory(&jpg_bytes).unwrap();
    assert_eq!((png.width(), png.height()), (1024, 1024));
    assert_eq!((jpg.width(), jpg.height()), (1024, 1024));
    assert!(matches_symbol(&png.to_luma8(), text));
    assert!(matches_symbol(&jpg.to_luma8(), text));
}

#[tokio::test]
async fn copy_writes_one_png_with_alpha() {
    let config = WidgetConfig {
        color_light: Color::TRANSPARENT,
        primitive: Primitive::Surface,
        export_size: 256,
        ..WidgetConfig::default()
    };
    let h = harness_with(config, None);
    h.widget.type_text("copy me").await.unwrap();

    assert!(matches!(h.widget.click(COPY_ID).await, ActionOutcome::Copied));
    assert_eq!(h.widget.tip_text().as_deref(), Some(COPIED_MESSAGE));

    let items = h.clipboard.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].mime, "image/png");
    let img = image::load_from_memory(&items[0].bytes).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (256, 256));
    assert!(img.pixels().any(|p| p[3] == 0));
}

#[tokio::test]
async fn failed_export_is_reported() {
    let h = harness();
    assert!(h.widget.type_text(&"x".repeat(4000)).await.is_err());
    {
        let doc = h.widget.document().lock().unwrap();
        assert!(doc.content(PREVIEW_ID).and_then(Content::error).is_some());
    }

    let outcome = h.widget.run_action(&"x".repeat(4000), ExportFormat::Png).await;
    assert!(matches!(outcome, ActionOutcome::Failed(_)));
    assert_eq!(h.widget.tip_text().as_deref(), Some(EXPORT_FAILED_MESSAGE));
    assert!(!h.dir.path().join("qrcode.png").exists());

    // The widget recovers on the next input.
    assert!(matches!(h.widget.type_text("fine").await, Ok(RenderOutcome::Shown(_))));
}
