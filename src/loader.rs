//! One-shot asynchronous loading of the symbol engine.
//!
//! The first caller of [`LibraryLoader::ensure_loaded`] starts the fetch; every caller that
//! arrives while it is in flight waits on the same pending load. The outcome, success or
//! failure, is kept for the lifetime of the loader: a failed load is not retried.

use crate::engine::{QrcodeEngine, SymbolEngine};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

/// The symbol engine could not be made available.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("could not load QR code engine from {location}: {reason}")]
pub struct LoadError {
    pub location: String,
    pub reason: String,
}

pub type EngineFuture =
    Pin<Box<dyn Future<Output = Result<Arc<dyn SymbolEngine>, LoadError>> + Send + 'static>>;

/// Somewhere a symbol engine can be fetched from.
pub trait EngineSource: Send + Sync {
    /// Where the engine comes from, for diagnostics.
    fn location(&self) -> &str;

    /// Starts a fetch. Called at most once per [`LibraryLoader`].
    fn fetch(&self) -> EngineFuture;
}

/// Source handing out the statically linked [`QrcodeEngine`].
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinSource;

impl EngineSource for BuiltinSource {
    fn location(&self) -> &str {
        "builtin:qrcode"
    }

    fn fetch(&self) -> EngineFuture {
        Box::pin(async { Ok(Arc::new(QrcodeEngine) as Arc<dyn SymbolEngine>) })
    }
}

/// Gate that makes the engine available exactly once.
pub struct LibraryLoader {
    source: Arc<dyn EngineSource>,
    engine: OnceCell<Result<Arc<dyn SymbolEngine>, LoadError>>,
    fetches: AtomicUsize,
}

impl LibraryLoader {
    pub fn new(source: Arc<dyn EngineSource>) -> Self {
        Self {
            source,
            engine: OnceCell::new(),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Resolves once the engine is available.
    ///
    /// Returns immediately when a previous load finished, joins a load in flight, and
    /// otherwise starts the single fetch.
    pub async fn ensure_loaded(&self) -> Result<Arc<dyn SymbolEngine>, LoadError> {
        self.engine
            .get_or_init(|| async {
                let count = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
                debug!("Fetching QR engine from {} (fetch #{})", self.source.location(), count);
                match self.source.fetch().await {
                    Ok(engine) => {
                        info!("QR engine '{}' ready", engine.name());
                        Ok(engine)
                    }
                    Err(err) => {
                        error!("{}", err);
                        Err(err)
                    }
                }
            })
            .await
            .clone()
    }

    /// The engine, if a load already succeeded.
    pub fn engine(&self) -> Option<Arc<dyn SymbolEngine>> {
        self.engine.get().and_then(|result| result.as_ref().ok().cloned())
    }

    pub fn is_loaded(&self) -> bool {
        self.engine().is_some()
    }

    /// Number of fetches started. Never exceeds one.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl Default for LibraryLoader {
    fn default() -> Self {
        Self::new(Arc::new(BuiltinSource))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::CorrectLevel;
    use crate::engine::{EncodeError, SymbolMatrix};
    use std::time::Duration;

    /// Engine that sleeps before every encode.
    pub(crate) struct SleepyEngine(pub Duration);

    impl SymbolEngine for SleepyEngine {
        fn name(&self) -> &str {
            "sleepy"
        }

        fn encode(&self, text: &str, level: CorrectLevel) -> Result<SymbolMatrix, EncodeError> {
            std::thread::sleep(self.0);
            QrcodeEngine.encode(text, level)
        }
    }

    /// Source handing out a [`SleepyEngine`] without delay.
    pub(crate) struct SleepySource(pub Duration);

    impl EngineSource for SleepySource {
        fn location(&self) -> &str {
            "test:sleepy"
        }

        fn fetch(&self) -> EngineFuture {
            let stall = self.0;
            Box::pin(async move { Ok(Arc::new(SleepyEngine(stall)) as Arc<dyn SymbolEngine>) })
        }
    }

    /// Source that takes a while and can be told to fail.
    pub(crate) struct SlowSource {
        pub delay: Duration,
        pub fail: bool,
    }

    impl EngineSource for SlowSource {
        fn location(&self) -> &str {
            "test:slow"
        }

        fn fetch(&self) -> EngineFuture {
            let (delay, fail) = (self.delay, self.fail);
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                if fail {
                    Err(LoadError {
                        location: "test:slow".to_string(),
                        reason: "network unreachable".to_string(),
                    })
                } else {
                    Ok(Arc::new(QrcodeEngine) as Arc<dyn SymbolEngine>)
                }
            })
        }
    }

    #[tokio::test]
    async fn test_builtin_loads_once() {
        let loader = LibraryLoader::default();
        assert!(!loader.is_loaded());
        loader.ensure_loaded().await.unwrap();
        loader.ensure_loaded().await.unwrap();
        assert!(loader.is_loaded());
        assert_eq!(loader.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_fetch() {
        let loader = LibraryLoader::new(Arc::new(SlowSource {
            delay: Duration::from_millis(50),
            fail: false,
        }));
        let (a, b, c) = tokio::join!(
            loader.ensure_loaded(),
            loader.ensure_loaded(),
            loader.ensure_loaded()
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(loader.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_sticky() {
        let loader = LibraryLoader::new(Arc::new(SlowSource {
            delay: Duration::from_millis(1),
            fail: true,
        }));
        let first = loader.ensure_loaded().await.err().unwrap();
        let second = loader.ensure_loaded().await.err().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.reason, "network unreachable");
        assert_eq!(loader.fetch_count(), 1);
        assert!(loader.engine().is_none());
    }
}
