//! Logging setup, mirroring the teacher's `infra_common::logging::setup`.

use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Configuration for the process-wide `tracing` subscriber.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level to emit.
    pub level: Level,
    /// Emit JSON instead of the human-readable formatter.
    pub json: bool,
    /// Include file and line number in each event.
    pub file_info: bool,
    /// Log span enter/exit events.
    pub log_spans: bool,
    /// Name attached to every event, useful when several daemons share a
    /// log aggregator.
    pub app_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json: false,
            file_info: false,
            log_spans: false,
            app_name: "corephone".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Start from a level and application name; everything else defaults.
    pub fn new(level: Level, app_name: impl Into<String>) -> Self {
        Self {
            level,
            app_name: app_name.into(),
            ..Default::default()
        }
    }

    /// Switch to JSON output.
    pub fn with_json(mut self) -> Self {
        self.json = true;
        self
    }

    /// Include file/line in each event.
    pub fn with_file_info(mut self) -> Self {
        self.file_info = true;
        self
    }

    /// Log span enter/exit transitions.
    pub fn with_spans(mut self) -> Self {
        self.log_spans = true;
        self
    }

    /// Parse the level from the `RUST_LOG`-style string the surrounding
    /// CLI binary would pass through, falling back to the current level
    /// on a malformed value rather than failing startup over a logging
    /// typo.
    pub fn with_level_str(mut self, level: &str) -> Self {
        if let Ok(parsed) = Level::from_str(level) {
            self.level = parsed;
        }
        self
    }
}

/// Raised when a global `tracing` subscriber is already installed.
#[derive(Debug, thiserror::Error)]
#[error("a global tracing subscriber is already installed")]
pub struct LoggingAlreadyInitialized;

/// Install a global `tracing` subscriber built from `config`. Safe to call
/// once per process; a second call returns [`LoggingAlreadyInitialized`]
/// rather than panicking, so a library embedding this crate (e.g. in
/// tests) can ignore the error.
pub fn setup_logging(config: LoggingConfig) -> Result<(), LoggingAlreadyInitialized> {
    let filter = EnvFilter::builder()
        .with_default_directive(config.level.into())
        .from_env_lossy();

    let span_events = if config.log_spans {
        FmtSpan::ACTIVE
    } else {
        FmtSpan::NONE
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(span_events)
        .with_file(config.file_info)
        .with_line_number(config.file_info);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|_| LoggingAlreadyInitialized)
}
