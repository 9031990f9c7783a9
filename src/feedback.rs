//! Transient feedback tooltip ("Copied!", "Downloading PNG...").

use crate::dom::{Content, Document, Element, ElementKind, TOOLTIP_ID};
use crate::lock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// Singleton tooltip element that hides itself after a fixed delay.
pub struct FeedbackTip {
    document: Arc<Mutex<Document>>,
    duration: Duration,
    // Bumped on every show; a pending hide only applies to the message it was scheduled for.
    shown: Arc<AtomicU64>,
}

impl FeedbackTip {
    pub fn new(document: Arc<Mutex<Document>>, duration: Duration) -> Self {
        Self {
            document,
            duration,
            shown: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Shows `message`, creating the tooltip element on first use.
    pub fn show(&self, message: &str) {
        {
            let mut doc = lock(&self.document);
            if !doc.contains(TOOLTIP_ID) {
                doc.insert(Element::new(TOOLTIP_ID, ElementKind::Tooltip));
            }
            doc.set_content(TOOLTIP_ID, Content::Text(message.to_string()));
            doc.set_visible(TOOLTIP_ID, true);
        }
        let seq = self.shown.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Tip: {}", message);

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("No runtime; tip stays until replaced");
            return;
        };
        let document = self.document.clone();
        let shown = self.shown.clone();
        let duration = self.duration;
        handle.spawn(async move {
            tokio::time::sleep(duration).await;
            if shown.load(Ordering::SeqCst) == seq {
                lock(&document).set_visible(TOOLTIP_ID, false);
            }
        });
    }

    /// Text currently displayed, if the tip is visible.
    pub fn visible_text(&self) -> Option<String> {
        let doc = lock(&self.document);
        if !doc.is_visible(TOOLTIP_ID) {
            return None;
        }
        doc.content(TOOLTIP_ID)
            .and_then(Content::text)
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tip(ms: u64) -> FeedbackTip {
        FeedbackTip::new(Arc::new(Mutex::new(Document::new())), Duration::from_millis(ms))
    }

    #[tokio::test]
    async fn test_tip_expires() {
        let tip = tip(30);
        tip.show("Copied!");
        assert_eq!(tip.visible_text().as_deref(), Some("Copied!"));
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(tip.visible_text(), None);
    }

    #[tokio::test]
    async fn test_newer_message_outlives_older_timer() {
        let tip = tip(80);
        tip.show("Downloading PNG...");
        tokio::time::sleep(Duration::from_millis(50)).await;
        tip.show("Copied!");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(tip.visible_text().as_deref(), Some("Copied!"));
    }

    #[test]
    fn test_single_tooltip_element() {
        let tip = tip(10);
        tip.show("one");
        tip.show("two");
        let doc = tip.document.lock().unwrap();
        assert_eq!(doc.elements_of_kind(ElementKind::Tooltip).count(), 1);
    }
}
