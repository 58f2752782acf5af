use crate::config::AppConfig;
use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

pub fn tracing_log_path() -> PathBuf {
    env::var("VOICEGATE_TRACE_LOG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("voicegate_trace.jsonl"))
}

fn file_logging_enabled(config: &AppConfig) -> bool {
    config.logs && !config.no_logs
}

/// Install the global subscriber once: compact stderr output, plus a JSON
/// lines file when `--logs` is on. Later calls are no-ops.
pub fn init_tracing(config: &AppConfig) {
    let level = LevelFilter::from_level(config.log_level.into());
    let with_file = file_logging_enabled(config);

    let _ = TRACING_INIT.get_or_init(|| {
        let stderr_layer = tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(level);

        let file_layer = if with_file {
            let path = tracing_log_path();
            match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => Some(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_timer(UtcTime::rfc_3339())
                        .with_writer(Mutex::new(file))
                        .with_current_span(false)
                        .with_span_list(false)
                        .with_filter(level),
                ),
                Err(err) => {
                    eprintln!("voicegate: cannot open trace log {}: {err}", path.display());
                    None
                }
            }
        } else {
            None
        };

        let _ = tracing_subscriber::registry()
            .with(stderr_layer)
            .with(file_layer)
            .try_init();
    });
}
