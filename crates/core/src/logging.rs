use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::storage::StorageLayout;

/// Install the global subscriber: a daily rolling `<component>.log.<date>`
/// under the layout's `logs/` and, when `to_stderr` is set, a stderr layer.
///
/// Keep the returned guard alive until exit or buffered lines are lost. A
/// second call keeps the first subscriber.
pub fn init_logging(layout: &StorageLayout, component: &str, to_stderr: bool) -> WorkerGuard {
    let log_dir = layout.logs_dir();
    let _ = std::fs::create_dir_all(&log_dir);

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, component));

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_thread_names(true);
    let stderr_layer = to_stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init();

    guard
}
