use std::path::Path;

use tracing_appender::rolling;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialize the tracing/logging system.
///
/// Sets up an optional stderr layer and an optional daily-rolling file layer.
/// The dashboard owns the terminal, so it runs with `console = false`.
pub fn init_logging(log_level: &str, log_file: Option<&Path>, structured: bool, console: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let mut layers: Vec<BoxedLayer> = Vec::new();

    if console {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true);
        layers.push(if structured {
            fmt_layer
                .json()
                .with_span_events(FmtSpan::CLOSE)
                .boxed()
        } else {
            fmt_layer.with_ansi(true).boxed()
        });
    }

    if let Some(log_path) = log_file {
        let dir = log_path.parent().unwrap_or(Path::new("."));
        let filename = log_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "copilot-pulse.log".to_string());

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(rolling::daily(dir, &filename))
            .with_target(true)
            .with_ansi(false);
        layers.push(if structured {
            file_layer.json().boxed()
        } else {
            file_layer.boxed()
        });
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .init();
}
