//! Logging initialization for QueryBridge.
//!
//! Supports three formats:
//! - `pretty`: multi-line human-readable output
//! - `component`: `[timestamp] [LEVEL] target message {fields}`, compact and grep-friendly;
//!   use the [`log_component!`] macro to add a `component` field for per-subsystem filtering
//! - `json`: structured JSON lines for log aggregators
//!
//! Logs always go to stderr (or the configured file) so the frame stream on
//! stdout stays clean.

use std::fs::File;

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{BridgeError, Result};

/// Initialize the global tracing subscriber from config.
///
/// Call this once at startup before any tracing events are emitted.
/// `RUST_LOG` wins over `cfg.level` when set.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened or a subscriber is
/// already installed.
pub fn init_logging(cfg: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.level));

    let file = match &cfg.file {
        Some(path) => Some(
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?,
        ),
        None => None,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = match (cfg.format, file) {
        (LogFormat::Json, Some(file)) => builder.json().with_writer(FileWriter(file)).try_init(),
        (LogFormat::Json, None) => builder.json().with_writer(std::io::stderr).try_init(),
        (LogFormat::Pretty, Some(file)) => {
            builder.pretty().with_writer(FileWriter(file)).try_init()
        }
        (LogFormat::Pretty, None) => builder.pretty().with_writer(std::io::stderr).try_init(),
        // Component-tagged events are emitted via `log_component!`, which adds
        // a structured `component` field; no custom layer needed.
        (LogFormat::Component, Some(file)) => {
            builder.compact().with_writer(FileWriter(file)).try_init()
        }
        (LogFormat::Component, None) => builder.compact().with_writer(std::io::stderr).try_init(),
    };

    installed.map_err(|e| BridgeError::Config(format!("failed to install logger: {}", e)))
}

/// Hands each event a fresh handle to the shared log file.
struct FileWriter(File);

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for FileWriter {
    type Writer = Box<dyn std::io::Write + 'a>;

    fn make_writer(&'a self) -> Self::Writer {
        match self.0.try_clone() {
            Ok(file) => Box::new(file),
            Err(_) => Box::new(std::io::sink()),
        }
    }
}

/// Emit a component-tagged tracing event.
///
/// Works with any tracing level (`trace`, `debug`, `info`, `warn`, `error`).
///
/// ```
/// # use querybridge::log_component;
/// log_component!(info, "router", "route decided");
/// log_component!(warn, "window", "budget exceeded by kept turns", cost = 6100u64, budget = 6000u64);
/// ```
#[macro_export]
macro_rules! log_component {
    ($level:ident, $component:expr, $msg:expr) => {
        tracing::$level!(component = $component, $msg)
    };
    ($level:ident, $component:expr, $msg:expr, $($key:ident = $val:expr),+ $(,)?) => {
        tracing::$level!(component = $component, $($key = $val,)+ $msg)
    };
}
