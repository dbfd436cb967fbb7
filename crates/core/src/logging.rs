//! Logging setup on top of the tracing ecosystem.
//!
//! # Environment Variables
//!
//! - `ROSTER_LOG`: Filter directive (like `RUST_LOG`), e.g., `roster_store=debug`
//! - `ROSTER_LOG_FORMAT`: Output format for stderr: `pretty`, `json`, `compact`
//! - `ROSTER_LOG_DIR`: Directory for file logs (default `~/.roster/logs`)
//!
//! # Configuration
//!
//! Logging is configured via the `[logging]` section in `roster.toml`:
//!
//! ```toml
//! [logging]
//! level = "warn"
//! format = "pretty"
//!
//! [logging.file]
//! enabled = false
//! level = "debug"
//! ```
//!
//! # Example
//!
//! ```no_run
//! use roster_core::logging;
//!
//! // Keep the guard alive for as long as file logs should be flushed
//! let _guard = logging::init_logging(None)?;
//! # Ok::<(), roster_core::Error>(())
//! ```

use crate::Error;
use crate::config::{FileLoggingConfig, LoggingConfig as ConfigLoggingConfig};
use std::env;
use std::io;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log output format for stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Pretty, human-readable output with colors (default for TTY)
    #[default]
    Pretty,
    /// JSON output (one line per event)
    Json,
    /// Compact, single-line output
    Compact,
}

impl LogFormat {
    /// All available log formats.
    pub const VALUES: &[LogFormat] = &[LogFormat::Pretty, LogFormat::Json, LogFormat::Compact];

    /// Parse a log format from a string.
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(LogFormat::Pretty),
            "json" => Some(LogFormat::Json),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
            LogFormat::Compact => "compact",
        }
    }
}

/// Logging configuration resolved from roster.toml and command-line flags.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default log level for stderr output.
    pub level: String,
    /// Output format for stderr.
    pub format: LogFormat,
    /// File logging configuration (optional).
    pub file: Option<FileLoggingConfig>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "warn".to_string(), format: LogFormat::default(), file: None }
    }
}

impl From<ConfigLoggingConfig> for LoggingConfig {
    fn from(config: ConfigLoggingConfig) -> Self {
        let format = LogFormat::parse_str(&config.format).unwrap_or_default();

        Self { level: config.level, format, file: if config.file.enabled { Some(config.file) } else { None } }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_file_logging(mut self, config: FileLoggingConfig) -> Self {
        self.file = Some(config);
        self
    }

    /// Build an EnvFilter from this config and environment variables.
    fn build_env_filter(&self) -> EnvFilter {
        let filter = env::var("ROSTER_LOG")
            .ok()
            .or_else(|| env::var("RUST_LOG").ok())
            .unwrap_or_else(|| self.level.clone());

        EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new(&self.level))
    }

    /// Filter for the file layer, if file logging is on.
    ///
    /// Independent of the stderr level, so the file can be more verbose.
    fn build_file_filter(&self) -> Option<EnvFilter> {
        let file = self.file.as_ref()?;
        Some(EnvFilter::try_new(&file.level).unwrap_or_else(|_| EnvFilter::new("debug")))
    }

    fn is_tty() -> bool {
        atty::is(atty::Stream::Stderr)
    }

    /// Determine the appropriate format for stderr output.
    ///
    /// `ROSTER_LOG_FORMAT` wins; a non-TTY stderr downgrades pretty to compact.
    fn detect_format(&self) -> LogFormat {
        if let Ok(fmt_str) = env::var("ROSTER_LOG_FORMAT")
            && let Some(fmt) = LogFormat::parse_str(&fmt_str)
        {
            return fmt;
        }

        match self.format {
            LogFormat::Pretty if !Self::is_tty() => LogFormat::Compact,
            other => other,
        }
    }

    fn get_log_dir() -> Result<PathBuf, Error> {
        if let Ok(custom_dir) = env::var("ROSTER_LOG_DIR") {
            return Ok(PathBuf::from(custom_dir));
        }

        let home = env::var("HOME")
            .or_else(|_| env::var("USERPROFILE"))
            .map_err(|_| Error::Config("Could not determine home directory".to_string()))?;

        Ok(PathBuf::from(home).join(".roster").join("logs"))
    }
}

/// Initialize the global tracing subscriber.
///
/// Installs a stderr layer in the detected format behind the env-driven
/// filter and, when file logging is enabled, a daily-rolling JSON file layer
/// behind its own `file.level` filter. The returned guard flushes the file
/// writer on drop and must outlive all logging.
pub fn init_logging(config: Option<LoggingConfig>) -> Result<Option<WorkerGuard>, Error> {
    let config = config.unwrap_or_default();
    let env_filter = config.build_env_filter();

    let stderr_layer: Box<dyn Layer<Registry> + Send + Sync> = match config.detect_format() {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(io::stderr)
            .with_ansi(true)
            .with_filter(env_filter)
            .boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(io::stderr).with_filter(env_filter).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_writer(io::stderr).with_filter(env_filter).boxed(),
    };

    let mut guard = None;
    let file_layer = match config.build_file_filter() {
        Some(file_filter) => {
            let log_dir = LoggingConfig::get_log_dir()?;
            std::fs::create_dir_all(&log_dir)
                .map_err(|e| Error::Config(format!("Failed to create log directory: {}", e)))?;

            let file_appender = tracing_appender::rolling::daily(log_dir, "roster.log");
            let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);
            guard = Some(file_guard);

            Some(fmt::layer().json().with_writer(non_blocking).with_filter(file_filter))
        }
        None => None,
    };

    Registry::default()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to install subscriber: {}", e)))?;

    Ok(guard)
}

/// Sanitize file paths for logging (home directory collapsed to `~`).
pub fn sanitize_path(path: &std::path::Path) -> String {
    if let Ok(home) = env::var("HOME")
        && let Ok(stripped) = path.strip_prefix(&home)
    {
        return format!("~/{}", stripped.display());
    }

    path.display().to_string()
}
