//! Process-wide `tracing` subscriber for the relay binary.
//!
//! The subscriber has two layers. An `EnvFilter` takes its directives from
//! `RUST_LOG` when set, otherwise from `logging.level`. One formatting layer
//! writes either JSON lines (`logging.format = "json"`) or pretty text.
//! Output goes to stdout unless `logging.file_path` names a file, which is
//! opened in append mode so restarts keep earlier history.

use std::fs::{File, OpenOptions};
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::config::LoggingConfig;

type FormatLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber described by `config`.
///
/// Fails on an unknown level, an unopenable log file, or when a global
/// subscriber is already installed (a second call from tests or an
/// embedding process returns an error instead of panicking).
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let level = parse_log_level(&config.level)?;
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    let file = config.file_path.as_deref().map(open_log_file).transpose()?;
    let layer = format_layer(config.format.as_str() == "json", file);

    tracing_subscriber::registry()
        .with(layer)
        .with(env_filter)
        .try_init()?;
    Ok(())
}

/// JSON carries span context and source location for log shipping. Pretty
/// output drops ANSI colours when it is going to a file.
fn format_layer(json: bool, file: Option<Arc<File>>) -> FormatLayer {
    if json {
        let layer = fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_file(true)
            .with_line_number(true);
        match file {
            Some(file) => layer.with_writer(file).boxed(),
            None => layer.boxed(),
        }
    } else {
        let layer = fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(false)
            .with_line_number(false);
        match file {
            Some(file) => layer.with_ansi(false).with_writer(file).boxed(),
            None => layer.boxed(),
        }
    }
}

fn open_log_file(path: &str) -> anyhow::Result<Arc<File>> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| anyhow::anyhow!("Failed to open log file {path}: {e}"))?;
    Ok(Arc::new(file))
}

fn parse_log_level(level: &str) -> anyhow::Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(anyhow::anyhow!("Invalid log level: {level}")),
    }
}
