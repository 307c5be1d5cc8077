//! Logging setup.
//!
//! Console output always; a daily-rolling file as well when `logging.dir` is
//! configured. `RUST_LOG` overrides the configured filter.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingSection;

/// File name prefix of the daily log (`hostweave.log.YYYY-MM-DD`).
pub const LOG_FILE_PREFIX: &str = "hostweave.log";

/// Install the global subscriber. Keep the returned guard alive for the
/// process lifetime so buffered file lines get flushed.
pub fn init(cfg: &LoggingSection) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.filter));

    let (file_layer, guard) = match &cfg.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init();
    if installed.is_err() {
        tracing::debug!("global subscriber already installed");
    }
    guard
}
