//! # Logging & Tracing Infrastructure
//!
//! Provides structured logging with the `tracing` crate, supporting:
//! - JSON, pretty-print and compact output formats
//! - Crate-level filtering
//! - Span contexts around the run phases
//!
//! ## Overview
//!
//! This module configures the `tracing-subscriber` stack used by binaries that
//! embed the sync core. Library crates only emit events; installing a
//! subscriber is the host's decision and happens once at startup.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_traits::time::LogLevel;
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = LoggingConfig::default()
//!         .with_format(LogFormat::Pretty)
//!         .with_level(LogLevel::Debug);
//!
//!     init_logging(config).expect("Failed to initialize logging");
//!
//!     tracing::info!("Upload started");
//! }
//! ```

use crate::error::{Error, Result};

use bridge_traits::time::LogLevel;

use std::io;

use tracing_subscriber::fmt::{self, format::FmtSpan};
use tracing_subscriber::{
    filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry,
};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format with colors
    Pretty,
    /// Structured JSON format for machine parsing
    Json,
    /// Compact format for production
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Json;
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// Minimum log level
    pub level: LogLevel,
    /// Custom filter string (e.g., "core_sync=debug,provider_local_folder=trace")
    pub filter: Option<String>,
    /// Enable span contexts
    pub enable_spans: bool,
    /// Display target module in logs
    pub display_target: bool,
    /// Display thread info
    pub display_thread_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            enable_spans: true,
            display_target: true,
            display_thread_info: false,
        }
    }
}

impl LoggingConfig {
    /// Set log format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set minimum log level
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Set custom filter string
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Enable or disable span contexts
    pub fn with_spans(mut self, enable: bool) -> Self {
        self.enable_spans = enable;
        self
    }

    /// Enable or disable target display
    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }

    /// Enable or disable thread info
    pub fn with_thread_info(mut self, display: bool) -> Self {
        self.display_thread_info = display;
        self
    }
}

/// Initialize the logging system
///
/// This should be called once during application startup. Subsequent calls
/// will return an error.
///
/// # Errors
///
/// Returns an error if:
/// - Logging is already initialized
/// - The filter string is invalid
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;

    tracing_subscriber::registry()
        .with(build_layer(&config))
        .with(filter)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn build_layer(config: &LoggingConfig) -> BoxedLayer {
    match config.format {
        LogFormat::Pretty => pretty_layer(config),
        LogFormat::Json => json_layer(config),
        LogFormat::Compact => compact_layer(config),
    }
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let base_level = config.level.as_str();

    let filter_string = if let Some(custom_filter) = &config.filter {
        custom_filter.clone()
    } else {
        // Our crates at the requested level, everything else at warn
        [
            "photo_sync_workspace",
            "core_runtime",
            "bridge_traits",
            "core_sync",
            "provider_local_folder",
        ]
        .iter()
        .map(|target| format!("{}={}", target, base_level))
        .chain(std::iter::once("warn".to_string()))
        .collect::<Vec<_>>()
        .join(",")
    };

    EnvFilter::try_new(filter_string)
        .map_err(|e| Error::Config(format!("Invalid log filter: {}", e)))
}

fn pretty_layer(config: &LoggingConfig) -> BoxedLayer {
    let span_events = if config.enable_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    fmt::layer()
        .pretty()
        .with_target(config.display_target)
        .with_thread_ids(config.display_thread_info)
        .with_thread_names(config.display_thread_info)
        .with_span_events(span_events)
        .with_writer(io::stderr)
        .boxed()
}

fn json_layer(config: &LoggingConfig) -> BoxedLayer {
    fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(config.enable_spans)
        .with_span_list(config.enable_spans)
        .with_target(config.display_target)
        .with_thread_ids(config.display_thread_info)
        .with_writer(io::stderr)
        .boxed()
}

fn compact_layer(config: &LoggingConfig) -> BoxedLayer {
    fmt::layer()
        .compact()
        .with_target(config.display_target)
        .with_thread_names(config.display_thread_info)
        .with_writer(io::stderr)
        .boxed()
}

/// Strip a file path to its last component
///
/// Useful when logging file operations:
///
/// ```
/// use core_runtime::logging::strip_path;
///
/// assert_eq!(strip_path("/Users/jo/Pictures/IMG_0001.JPG"), "IMG_0001.JPG");
/// ```
pub fn strip_path(path: &str) -> &str {
    bridge_traits::source::base_name(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_builder() {
        let config = LoggingConfig::default()
            .with_format(LogFormat::Json)
            .with_level(LogLevel::Debug)
            .with_filter("core_sync=trace")
            .with_spans(false)
            .with_target(true)
            .with_thread_info(true);

        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.filter, Some("core_sync=trace".to_string()));
        assert!(!config.enable_spans);
        assert!(config.display_target);
        assert!(config.display_thread_info);
    }

    #[test]
    fn test_strip_path() {
        assert_eq!(strip_path("/home/user/photos/a.jpg"), "a.jpg");
        assert_eq!(strip_path("C:\\Users\\Jo\\Pictures\\a.jpg"), "a.jpg");
        assert_eq!(strip_path("a.jpg"), "a.jpg");
        assert_eq!(strip_path("/var/log/"), "");
    }

    #[test]
    fn test_default_format() {
        #[cfg(debug_assertions)]
        assert_eq!(LogFormat::default(), LogFormat::Pretty);

        #[cfg(not(debug_assertions))]
        assert_eq!(LogFormat::default(), LogFormat::Json);
    }

    #[test]
    fn test_build_filter() {
        let config = LoggingConfig::default().with_level(LogLevel::Debug);
        let filter = build_filter(&config).unwrap();
        let rendered = filter.to_string();
        assert!(rendered.contains("core_sync=debug"));
        assert!(rendered.contains("provider_local_folder=debug"));
    }

    #[test]
    fn test_build_custom_filter() {
        let config = LoggingConfig::default().with_filter("core_sync=trace");
        let filter = build_filter(&config).unwrap();
        assert!(filter.to_string().contains("core_sync=trace"));
    }

    fn emit_through(config: LoggingConfig) {
        let subscriber = tracing_subscriber::registry()
            .with(build_layer(&config))
            .with(build_filter(&config).unwrap());

        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("finalize", dry_run = true);
            let _enter = span.enter();
            tracing::info!(uploaded = 3, "Upload run finished");
            tracing::debug!(file = %strip_path("/photos/a.jpg"), "Removed local file");
        });
    }

    #[test]
    fn test_each_format_builds_a_working_subscriber() {
        for format in [LogFormat::Pretty, LogFormat::Json, LogFormat::Compact] {
            emit_through(
                LoggingConfig::default()
                    .with_format(format)
                    .with_level(LogLevel::Debug)
                    .with_thread_info(true),
            );
            emit_through(LoggingConfig::default().with_format(format).with_spans(false));
        }
    }

    #[test]
    fn test_build_invalid_filter() {
        let config = LoggingConfig::default().with_filter("core_sync=[");
        assert!(build_filter(&config).is_err());
    }
}
