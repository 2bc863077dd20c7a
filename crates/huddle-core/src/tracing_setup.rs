use std::fs::OpenOptions;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize the global tracing subscriber.
///
/// Filter comes from `HUDDLE_LOG` (default `info`). Setting
/// `HUDDLE_LOG_FILE` adds an append-mode file layer at debug level, useful
/// when the embedding UI owns the terminal. Safe to call once; a second
/// call is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("HUDDLE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(fmt::layer().with_filter(filter));

    if let Some(log_path) = std::env::var_os("HUDDLE_LOG_FILE") {
        match OpenOptions::new().create(true).append(true).open(&log_path) {
            Ok(file) => {
                let file_layer = fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_target(true)
                    .with_filter(tracing_subscriber::filter::LevelFilter::DEBUG);
                let _ = registry.with(file_layer).try_init();
                return;
            }
            Err(err) => {
                eprintln!("failed to open log file {log_path:?}: {err}");
            }
        }
    }

    let _ = registry.try_init();
}
