//! Structured logging for the OLSR simulator
//!
//! Every node of a simulation run logs through `tracing`; this crate installs
//! the subscriber that turns those events into either human-readable console
//! output or JSON lines, optionally mirrored to a file.
//!
//! # Features
//!
//! - **JSONL Output**: Structured JSON lines for later analysis (default)
//! - **Node Context**: [`NodeContext`] spans tag every event with the node id
//! - **File Output**: Single-file or daily/hourly rotation via tracing-appender
//!
//! # Quick Start
//!
//! ```ignore
//! use olsr_logging::{LogConfig, OlsrSubscriberBuilder};
//!
//! // JSONL to the console
//! let _guard = OlsrSubscriberBuilder::new().try_init()?;
//!
//! // Development mode with pretty human-readable output
//! let _guard = OlsrSubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .try_init()?;
//! ```

pub mod config;
pub mod context;

pub use config::{ConsoleConfig, FileConfig, JsonlConfig, LogConfig, RotationStrategy};
pub use context::NodeContext;
pub use tracing_appender::non_blocking::WorkerGuard;

use std::fs::{self, File};

use tracing_appender::non_blocking::NonBlocking;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Errors raised while installing the subscriber
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("invalid filter directive: {0}")]
    Directive(#[from] ParseError),

    #[error("log file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid log configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("a global subscriber is already installed")]
    AlreadyInitialized(#[from] TryInitError),
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Builder for configuring and initializing the logging subscriber
///
/// By default, console output uses JSONL format. Use `LogConfig::development()`
/// for human-readable pretty output during development.
pub struct OlsrSubscriberBuilder {
    config: LogConfig,
}

impl OlsrSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// Current configuration
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Build the level filter: `RUST_LOG` if set, else the configured level
    /// plus per-target overrides
    fn env_filter(&self) -> Result<EnvFilter, LogError> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        let mut filter = EnvFilter::try_new(&self.config.default_level)?;
        for directive in self.config.target_directives() {
            filter = filter.add_directive(directive.parse()?);
        }
        Ok(filter)
    }

    fn console_layer(&self) -> BoxedLayer {
        let jsonl = &self.config.jsonl;
        if self.config.console.pretty {
            tracing_subscriber::fmt::layer()
                .with_ansi(self.config.console.ansi)
                .with_target(true)
                .with_writer(std::io::stderr)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(jsonl.include_spans)
                .flatten_event(jsonl.flatten_events)
                .with_file(jsonl.include_location)
                .with_line_number(jsonl.include_location)
                .with_thread_ids(jsonl.include_thread_info)
                .with_writer(std::io::stderr)
                .boxed()
        }
    }

    fn file_layer(&self, writer: NonBlocking) -> BoxedLayer {
        let jsonl = &self.config.jsonl;
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(jsonl.include_spans)
            .flatten_event(jsonl.flatten_events)
            .with_file(jsonl.include_location)
            .with_line_number(jsonl.include_location)
            .with_thread_ids(jsonl.include_thread_info)
            .with_writer(writer)
            .boxed()
    }

    /// Install the subscriber globally
    ///
    /// The returned guard flushes the file writer on drop and must be kept
    /// alive for the duration of the program when file output is enabled.
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LogError> {
        let env_filter = self.env_filter()?;

        let mut layers: Vec<BoxedLayer> = Vec::new();
        let mut guard = None;

        if self.config.console.enabled {
            layers.push(self.console_layer());
        }
        if let Some(file_config) = &self.config.file {
            let (writer, file_guard) = file_writer(file_config)?;
            layers.push(self.file_layer(writer));
            guard = Some(file_guard);
        }

        Registry::default().with(layers).with(env_filter).try_init()?;
        Ok(guard)
    }
}

impl Default for OlsrSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Create the file writer; a non-rotating file is truncated, rotating files
/// are appended to
fn file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LogError> {
    fs::create_dir_all(&config.directory)?;
    let rotation = match config.rotation {
        RotationStrategy::Never => {
            let path = config.directory.join(format!("{}.log", config.prefix));
            let file = File::create(path)?;
            return Ok(tracing_appender::non_blocking(file));
        }
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
    };
    let appender = RollingFileAppender::new(rotation, &config.directory, &config.prefix);
    Ok(tracing_appender::non_blocking(appender))
}

/// Initialize logging for testing (minimal output); repeated calls are no-ops
pub fn init_testing() {
    let _ = OlsrSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_creation() {
        let builder = OlsrSubscriberBuilder::new();
        assert_eq!(builder.config().default_level, "info");
    }

    #[test]
    fn test_default_is_jsonl() {
        let builder = OlsrSubscriberBuilder::new();
        assert!(!builder.config().console.pretty);
    }

    #[test]
    fn test_builder_with_config() {
        let builder = OlsrSubscriberBuilder::new().with_config(LogConfig::development());
        assert_eq!(builder.config().default_level, "debug");
        assert!(builder.config().console.pretty);
    }

    #[test]
    fn test_builder_with_level_and_console() {
        let builder = OlsrSubscriberBuilder::new()
            .with_level("trace")
            .with_console(false);
        assert_eq!(builder.config().default_level, "trace");
        assert!(!builder.config().console.enabled);
    }

    #[test]
    fn test_invalid_target_directive_is_rejected() {
        let mut config = LogConfig::testing();
        config.targets.insert("olsr_node".to_string(), "loud".to_string());
        let builder = OlsrSubscriberBuilder::new().with_config(config);
        if std::env::var("RUST_LOG").is_err() {
            assert!(matches!(builder.env_filter(), Err(LogError::Directive(_))));
        }
    }

    #[test]
    fn test_never_rotation_creates_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = FileConfig {
            directory: dir.path().join("logs"),
            prefix: "run".to_string(),
            rotation: RotationStrategy::Never,
        };
        let (_writer, _guard) = file_writer(&config).unwrap();
        assert!(dir.path().join("logs").join("run.log").exists());
    }
}
