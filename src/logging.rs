//! Logging setup for the demo host, using `tracing` and `tracing-subscriber`.
//!
//! The library itself only emits events:
//!
//! - `error`: engine load failures
//! - `warn`: failed renders, failed actions, missing hooks
//! - `info`: engine ready, finished exports and downloads
//! - `debug`: pipeline steps (render generations, tips, work areas)

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Configuration for logging behavior.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level_filter: LevelFilter,
    /// Let `RUST_LOG` override `level_filter` when set.
    pub use_env_filter: bool,
    pub with_target: bool,
    pub with_ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level_filter: LevelFilter::WARN,
            use_env_filter: true,
            with_target: false,
            with_ansi: true,
        }
    }
}

impl LogConfig {
    /// Maps `-v` / `-q` counts to a level, starting at `warn`.
    #[must_use]
    pub fn from_verbosity(verbose: u8, quiet: u8) -> Self {
        let level_filter = match (verbose as i16) - (quiet as i16) {
            i16::MIN..=-2 => LevelFilter::OFF,
            -1 => LevelFilter::ERROR,
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        };
        Self {
            level_filter,
            use_env_filter: verbose == 0 && quiet == 0,
            ..Self::default()
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let fallback = || EnvFilter::new(self.level_filter.to_string());
        if self.use_env_filter {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback())
        } else {
            fallback()
        }
    }
}

/// Installs the global subscriber. Logs go to stderr so stdout stays free for symbols.
pub fn init_logging(config: &LogConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.with_target)
        .with_ansi(config.with_ansi)
        .compact();

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt_layer)
        .try_init()
}
