//! Logging infrastructure - structured tracing across the host boundary
//!
//! Design: Uses `tracing` for structured, contextual logging with:
//! - Configurable log level from the environment
//! - Zero-cost when disabled
//! - Human-readable or JSON output to stderr or a file

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

// Re-export tracing macros for use throughout the bindings
pub use tracing::{debug, error, info, trace, warn};

use crate::callbacks::Token;
use crate::error::BindingError;

/// Global logging state
static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default log level
    pub level: Level,
    /// Log file path; stderr when absent
    pub log_path: Option<PathBuf>,
    /// Enable JSON format (vs human-readable)
    pub json_format: bool,
    /// Show span events (enter/exit)
    pub show_spans: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            log_path: None,
            json_format: false,
            show_spans: false,
        }
    }
}

/// Parse a level name, case-insensitively
pub fn parse_level(name: &str) -> Option<Level> {
    match name.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

impl LogConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // GLIRC_LUA_LOG_LEVEL: trace, debug, info, warn, error
        if let Ok(level_str) = std::env::var("GLIRC_LUA_LOG_LEVEL") {
            config.level = parse_level(&level_str).unwrap_or(Level::INFO);
        }

        // GLIRC_LUA_LOG_FILE: path to log file
        if let Ok(path) = std::env::var("GLIRC_LUA_LOG_FILE") {
            config.log_path = Some(PathBuf::from(path));
        }

        // GLIRC_LUA_LOG_JSON: enable JSON format
        config.json_format = std::env::var("GLIRC_LUA_LOG_JSON").is_ok();

        // GLIRC_LUA_LOG_SPANS: show span events
        config.show_spans = std::env::var("GLIRC_LUA_LOG_SPANS").is_ok();

        config
    }

    /// Verbose logging for debugging an extension
    pub fn debug() -> Self {
        Self {
            level: Level::TRACE,
            log_path: Some(PathBuf::from("glirc_lua.log")),
            json_format: false,
            show_spans: true,
        }
    }
}

/// Initialize logging with configuration from the environment
pub fn init() {
    init_with_config(LogConfig::from_env());
}

/// Initialize logging with custom configuration. Only the first call has
/// any effect; a subscriber installed by the embedder is left alone.
pub fn init_with_config(config: LogConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "glirc_lua={level},glirc_lua_runtime={level}",
                level = config.level.as_str().to_lowercase()
            ))
        });

        let output = match &config.log_path {
            Some(path) => fmt_layer(file_appender(path), &config),
            None => fmt_layer(io::stderr, &config),
        };

        tracing_subscriber::registry()
            .with(output)
            .with(env_filter)
            .try_init()
            .ok(); // Ignore error if already initialized
    });
}

fn file_appender(path: &Path) -> tracing_appender::rolling::RollingFileAppender {
    let directory = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path.file_name().unwrap_or_else(|| OsStr::new("glirc_lua.log"));
    tracing_appender::rolling::never(directory, file_name)
}

fn fmt_layer<W>(writer: W, config: &LogConfig) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let span_events = if config.show_spans {
        FmtSpan::ENTER | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = fmt::layer()
        .with_writer(writer)
        .with_span_events(span_events)
        .with_target(true)
        .with_thread_ids(cfg!(debug_assertions));

    if config.json_format {
        layer.json().boxed()
    } else {
        layer.compact().boxed()
    }
}

/// Check if logging is initialized
pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}

// ============================================================================
// Boundary events
// ============================================================================

/// Log a call into the host
#[inline]
pub fn log_host_call(operation: &str, args: usize) {
    debug!(event = "host_call", operation, args, "calling host");
}

/// Log a host call that reported failure
pub fn log_host_failure(operation: &str, err: &BindingError) {
    warn!(
        event = "host_failure",
        operation,
        kind = err.kind(),
        error = %err,
        "host call failed"
    );
}

/// Log a completed import of host-owned data
#[inline]
pub fn log_import(kind: &str, count: usize) {
    trace!(event = "import", kind, count, "imported host buffer");
}

/// Log the release of a host allocation
#[inline]
pub fn log_release(kind: &str) {
    trace!(event = "release", kind, "released host buffer");
}

#[inline]
pub fn log_token_registered(token: Token, pending: usize) {
    trace!(event = "token_registered", token = token.get(), pending, "callback registered");
}

#[inline]
pub fn log_token_resolved(token: Token) {
    trace!(event = "token_resolved", token = token.get(), "callback resolved");
}

#[inline]
pub fn log_token_cancelled(token: Token) {
    trace!(event = "token_cancelled", token = token.get(), "callback cancelled");
}

/// Log delivery of a token that is not registered. Well-formed hosts never
/// do this; after shutdown it is expected for timers still in flight.
pub fn log_stale_token(token: Token) {
    warn!(
        event = "stale_token",
        token = token.get(),
        "callback token not registered; ignoring delivery"
    );
}

pub fn log_registry_shutdown(dropped: usize) {
    debug!(event = "registry_shutdown", dropped, "callback registry shut down");
}

/// Log a timer handed to the host
pub fn log_timer_scheduled(token: Token, delay_ms: u64) {
    debug!(event = "timer_scheduled", token = token.get(), delay_ms, "timer scheduled");
}

/// Log a script callback that failed while being delivered
pub fn log_callback_failure(token: Token, message: &str) {
    error!(
        event = "callback_failure",
        token = token.get(),
        error = message,
        "script callback failed"
    );
}
